//! # igt-optim-rs
//!
//! Implicit Gradient Transport (IGT) for candle, with heavyball and Nesterov
//! momentum variants.
//!
//! IGT keeps a bias-corrected running average of the gradients and, instead
//! of publishing the parameters it has actually reached, publishes a
//! look-ahead ("transported") projection of them. Gradients computed at the
//! transported point correct the lag of the running average, which gives a
//! lower-variance gradient estimate at no extra backward passes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use candle_core::{Device, Var};
//! use igt_optim_rs::{IgtConfig, MomentumIgt};
//!
//! let w = Var::zeros((64, 32), candle_core::DType::F32, &Device::Cpu)?;
//! let mut opt = MomentumIgt::new(vec![w.clone()], IgtConfig::new(0.1).with_momentum(0.9))?;
//!
//! for batch in batches {
//!     let loss = model.loss(&w, &batch)?;
//!     opt.step(&loss.backward()?)?;
//! }
//!
//! opt.enter_evaluation()?;   // w now holds the true parameters
//! // ... evaluate ...
//! opt.enter_training()?;     // back to the transported parameters
//! # Ok::<(), igt_optim_rs::IgtError>(())
//! ```
//!
//! ## Update Rule
//!
//! With `n` completed steps:
//!
//! ```text
//! gamma = n / (n + delta)
//! v     = gamma * v + (1 - gamma) * g          (v = g on the first step)
//! true  = true - lr * v
//! param = true - lr * future_transport * v     future_transport = (n + 1) / delta
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Hyperparameters and their validation
//! - [`error`]: Error types and result alias
//! - [`gradients`]: Gradient containers the optimizer can read
//! - [`igt`]: The optimizer, its step and the training/evaluation switch
//! - [`schedule`]: Bias-correction coefficients
//! - [`state`]: Per-parameter buffers
//!
//! ## References
//!
//! - Arnold, S. M. R. et al. (2019). Reducing the variance in online optimization
//!   by transporting past gradients

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod gradients;
pub mod igt;
pub mod schedule;
pub mod state;

pub use config::IgtConfig;
pub use error::{IgtError, Result};
pub use gradients::GradientSource;
pub use igt::{IgtStats, MomentumIgt, ParamHandle, ParameterGroup};
pub use schedule::TransportSchedule;
pub use state::{ParameterState, ParameterStateStore};
