//! Hyperparameters for the IGT optimizer.
//!
//! [`IgtConfig`] is validated eagerly: an optimizer is never built from a
//! configuration that fails [`IgtConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::error::{IgtError, Result};

const fn default_delta() -> f64 {
    1.0
}

/// Configuration shared by every parameter of a group.
///
/// The learning rate has no default and must be supplied, both through
/// [`IgtConfig::new`] and when deserializing.
///
/// # Example
///
/// ```
/// use igt_optim_rs::IgtConfig;
///
/// let config = IgtConfig::new(0.1)
///     .with_momentum(0.9)
///     .with_nesterov(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IgtConfig {
    /// Learning rate.
    pub lr: f64,

    /// Momentum factor. Zero disables momentum entirely.
    #[serde(default)]
    pub momentum: f64,

    /// Dampening applied to the IGT velocity when accumulating momentum.
    #[serde(default)]
    pub dampening: f64,

    /// L2 penalty added to the gradient.
    #[serde(default)]
    pub weight_decay: f64,

    /// Use Nesterov momentum instead of heavyball.
    #[serde(default)]
    pub nesterov: bool,

    /// Displacement of the bias-correction schedule.
    /// Larger values make the velocity average forget faster.
    #[serde(default = "default_delta")]
    pub delta: f64,
}

impl IgtConfig {
    /// Create a configuration with the given learning rate and defaults elsewhere.
    #[must_use]
    pub const fn new(lr: f64) -> Self {
        Self {
            lr,
            momentum: 0.0,
            dampening: 0.0,
            weight_decay: 0.0,
            nesterov: false,
            delta: default_delta(),
        }
    }

    /// Set the momentum factor.
    #[must_use]
    pub const fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Set the momentum dampening.
    #[must_use]
    pub const fn with_dampening(mut self, dampening: f64) -> Self {
        self.dampening = dampening;
        self
    }

    /// Set the weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Set whether to use Nesterov momentum.
    #[must_use]
    pub const fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    /// Set the IGT delta.
    #[must_use]
    pub const fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Whether momentum buffers are kept for this configuration.
    #[must_use]
    pub fn momentum_enabled(&self) -> bool {
        self.momentum != 0.0
    }

    /// Check every hyperparameter.
    ///
    /// # Errors
    ///
    /// Returns [`IgtError::InvalidConfig`] on the first invalid value found.
    #[allow(clippy::float_cmp)]
    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(IgtError::InvalidConfig(format!(
                "Invalid learning rate: {}",
                self.lr
            )));
        }

        if !(self.momentum >= 0.0) {
            return Err(IgtError::InvalidConfig(format!(
                "Invalid momentum value: {}",
                self.momentum
            )));
        }

        if !(self.weight_decay >= 0.0) {
            return Err(IgtError::InvalidConfig(format!(
                "Invalid weight_decay value: {}",
                self.weight_decay
            )));
        }

        if !(self.delta > 0.0) {
            return Err(IgtError::InvalidConfig(format!(
                "Invalid delta value: {}",
                self.delta
            )));
        }

        if self.nesterov && (self.momentum <= 0.0 || self.dampening != 0.0) {
            return Err(IgtError::InvalidConfig(
                "Nesterov momentum requires a momentum and zero dampening".to_string(),
            ));
        }

        Ok(())
    }
}
