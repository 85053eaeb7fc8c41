//! Error types for IGT optimization.

use thiserror::Error;

/// Result type alias for IGT optimizer operations.
pub type Result<T> = std::result::Result<T, IgtError>;

/// Errors that can occur while building or driving the optimizer.
#[derive(Debug, Error)]
pub enum IgtError {
    /// Invalid hyperparameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A parameter was registered more than once.
    #[error("parameter {id:?} is registered more than once")]
    DuplicateParameter {
        /// Id of the offending tensor.
        id: candle_core::TensorId,
    },

    /// Gradient shape differs from its parameter.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Shape of the parameter.
        expected: Vec<usize>,
        /// Shape of the gradient.
        actual: Vec<usize>,
    },

    /// Gradient dtype differs from its parameter.
    #[error("dtype mismatch: expected {expected:?}, got {actual:?}")]
    DTypeMismatch {
        /// Dtype of the parameter.
        expected: candle_core::DType,
        /// Dtype of the gradient.
        actual: candle_core::DType,
    },

    /// Candle tensor operation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

impl From<IgtError> for candle_core::Error {
    fn from(err: IgtError) -> Self {
        match err {
            IgtError::Tensor(inner) => inner,
            other => Self::Msg(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = IgtError::InvalidConfig("Invalid delta value: 0".to_string());
        assert_eq!(err.to_string(), "invalid configuration: Invalid delta value: 0");
    }

    #[test]
    fn test_duplicate_parameter_message() {
        let id = candle_core::Tensor::new(&[1.0f32], &candle_core::Device::Cpu)
            .unwrap()
            .id();
        let err = IgtError::DuplicateParameter { id };
        assert!(err.to_string().ends_with("is registered more than once"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = IgtError::ShapeMismatch {
            expected: vec![2],
            actual: vec![3],
        };
        assert_eq!(err.to_string(), "shape mismatch: expected [2], got [3]");
    }

    #[test]
    fn test_into_candle_error() {
        let err: candle_core::Error = IgtError::InvalidConfig("bad lr".to_string()).into();
        assert!(err.to_string().contains("bad lr"));
    }
}
