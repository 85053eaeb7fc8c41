//! Implicit Gradient Transport with heavyball and Nesterov momentum.
//!
//! IGT keeps two views of every parameter:
//! - the **true** parameters, advanced by a bias-corrected running average of
//!   the gradients;
//! - the **transported** parameters, a look-ahead projection of the true ones
//!   that is exposed to the model while training. Gradients are evaluated at
//!   the transported point, which removes the lag of the running average.
//!
//! Evaluation must run on the true parameters, so the optimizer can switch the
//! exposed view with [`MomentumIgt::enter_evaluation`] and back with
//! [`MomentumIgt::enter_training`].
//!
//! # Example
//!
//! ```ignore
//! use igt_optim_rs::{IgtConfig, MomentumIgt};
//!
//! let mut opt = MomentumIgt::new(vars, IgtConfig::new(0.1).with_momentum(0.9))?;
//!
//! // Training
//! opt.enter_training()?; // only needed after enter_evaluation
//! let loss = model.loss(&xs, &ys)?;
//! opt.step(&loss.backward()?)?;
//!
//! // Evaluation
//! opt.enter_evaluation()?;
//! let eval_loss = model.loss(&xs_eval, &ys_eval)?;
//! ```
//!
//! Every group holds the velocity buffer, a true-parameter copy and, with
//! momentum, a momentum buffer: three extra tensors per parameter.

mod engine;
mod group;
mod mode;
mod optimizer;

pub use group::ParameterGroup;
pub use optimizer::{IgtStats, MomentumIgt, ParamHandle};

use candle_core::Tensor;

use crate::config::IgtConfig;
use crate::error::Result;
use crate::state::ParameterState;

/// Offset from the true parameters after scaling the velocities by `scale`.
///
/// - no momentum: `-lr * scale * igt_velocity`
/// - Nesterov: `-lr * scale * igt_velocity - lr * momentum * scale * momentum_velocity`
/// - heavyball: `-lr * scale * momentum_velocity`
///
/// A `scale` of one is the true-parameter update itself.
pub(crate) fn displacement(
    state: &ParameterState,
    config: &IgtConfig,
    scale: f64,
) -> Result<Tensor> {
    let step = -config.lr * scale;
    let offset = match state.momentum_velocity.as_ref() {
        None => state.igt_velocity.affine(step, 0.0)?,
        Some(momentum_velocity) if config.nesterov => {
            let igt_term = state.igt_velocity.affine(step, 0.0)?;
            igt_term.add(&momentum_velocity.affine(step * config.momentum, 0.0)?)?
        }
        Some(momentum_velocity) => momentum_velocity.affine(step, 0.0)?,
    };
    Ok(offset)
}

/// True parameters projected forward by `transport`.
pub(crate) fn transported_params(
    state: &ParameterState,
    config: &IgtConfig,
    transport: f64,
) -> Result<Tensor> {
    Ok(state
        .true_params
        .add(&displacement(state, config, transport)?)?)
}
