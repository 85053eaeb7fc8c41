//! Bias-correction schedule of implicit gradient transport.
//!
//! With `n` completed steps and displacement `delta`:
//!
//! ```text
//! gamma(n)     = n / (n + delta)
//! transport(n) = gamma(n) / (1 - gamma(n))
//! ```
//!
//! `gamma` mixes the current gradient into the velocity average, while
//! `transport` scales the velocity to project the true parameters to the
//! point where the next gradient should be evaluated.

/// Coefficients derived from a group's `delta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSchedule {
    delta: f64,
}

impl TransportSchedule {
    /// Create a schedule. `delta` is expected to be positive; see
    /// [`IgtConfig::validate`](crate::IgtConfig::validate).
    #[must_use]
    pub const fn new(delta: f64) -> Self {
        Self { delta }
    }

    /// Velocity mixing coefficient after `num_steps` steps.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn gamma(&self, num_steps: usize) -> f64 {
        let n = num_steps as f64;
        n / (n + self.delta)
    }

    /// Mixing coefficient one step ahead.
    #[must_use]
    pub fn future_gamma(&self, num_steps: usize) -> f64 {
        self.gamma(num_steps + 1)
    }

    /// Look-ahead scale for the current step count.
    #[must_use]
    pub fn transport(&self, num_steps: usize) -> f64 {
        let gamma = self.gamma(num_steps);
        gamma / (1.0 - gamma)
    }

    /// Look-ahead scale applied right after a step taken at `num_steps`.
    #[must_use]
    pub fn future_transport(&self, num_steps: usize) -> f64 {
        let future_gamma = self.future_gamma(num_steps);
        future_gamma / (1.0 - future_gamma)
    }
}
