//! IGT update step.

use candle_core::Tensor;

use crate::config::IgtConfig;
use crate::error::{IgtError, Result};
use crate::gradients::GradientSource;
use crate::state::ParameterState;

use super::group::ParameterGroup;
use super::optimizer::MomentumIgt;
use super::{displacement, transported_params};

/// Gradient plus the weight-decay term, as a new tensor.
///
/// The caller's gradient is only read.
#[allow(clippy::float_cmp)]
fn effective_gradient(grad: &Tensor, true_params: &Tensor, weight_decay: f64) -> Result<Tensor> {
    let grad = grad.detach();
    if weight_decay == 0.0 {
        return Ok(grad);
    }
    Ok(grad.add(&true_params.affine(weight_decay, 0.0)?)?)
}

/// First step: the velocity starts from the raw gradient (`gamma = 0`).
fn bootstrap_velocity(state: &mut ParameterState, grad: &Tensor) -> Result<()> {
    state.igt_velocity = state.igt_velocity.add(grad)?;
    if let Some(momentum_velocity) = state.momentum_velocity.as_mut() {
        *momentum_velocity = momentum_velocity.add(&state.igt_velocity)?;
    }
    Ok(())
}

fn mix_velocity(
    state: &mut ParameterState,
    grad: &Tensor,
    gamma: f64,
    config: &IgtConfig,
) -> Result<()> {
    state.igt_velocity = state
        .igt_velocity
        .affine(gamma, 0.0)?
        .add(&grad.affine(1.0 - gamma, 0.0)?)?;

    if let Some(momentum_velocity) = state.momentum_velocity.as_mut() {
        *momentum_velocity = momentum_velocity
            .affine(config.momentum, 0.0)?
            .add(&state.igt_velocity.affine(1.0 - config.dampening, 0.0)?)?;
    }
    Ok(())
}

impl ParameterGroup {
    /// Check that every present gradient matches its parameter's shape,
    /// dtype and device, without touching any state.
    fn check_gradients<G: GradientSource + ?Sized>(&self, grads: &G) -> Result<()> {
        for param in &self.params {
            let Some(grad) = grads.gradient(param) else {
                continue;
            };
            if grad.dims() != param.dims() {
                return Err(IgtError::ShapeMismatch {
                    expected: param.dims().to_vec(),
                    actual: grad.dims().to_vec(),
                });
            }
            if grad.dtype() != param.dtype() {
                return Err(IgtError::DTypeMismatch {
                    expected: param.dtype(),
                    actual: grad.dtype(),
                });
            }
            if !grad.device().same_device(param.device()) {
                return Err(candle_core::Error::DeviceMismatchBinaryOp {
                    lhs: param.device().location(),
                    rhs: grad.device().location(),
                    op: "igt-step",
                }
                .into());
            }
        }
        Ok(())
    }

    /// Apply one IGT step to every parameter of the group that has a gradient.
    ///
    /// Returns the number of parameters updated. The step counter advances
    /// once regardless, and the group ends up transported.
    pub(crate) fn step<G: GradientSource + ?Sized>(&mut self, grads: &G) -> Result<usize> {
        let config = self.config;
        let schedule = self.schedule();
        let num_steps = self.num_steps;
        let gamma = schedule.gamma(num_steps);
        let future_transport = schedule.future_transport(num_steps);

        let mut updated = 0;
        for (index, param) in self.params.iter().enumerate() {
            let Some(grad) = grads.gradient(param) else {
                continue;
            };

            let state =
                self.store
                    .get_or_create(index, param.as_tensor(), config.momentum_enabled())?;
            let grad = effective_gradient(grad, &state.true_params, config.weight_decay)?;

            if num_steps == 0 {
                bootstrap_velocity(state, &grad)?;
            } else {
                mix_velocity(state, &grad, gamma, &config)?;
            }

            state.true_params = state
                .true_params
                .add(&displacement(state, &config, 1.0)?)?;
            param.set(&transported_params(state, &config, future_transport)?)?;
            updated += 1;
        }

        self.num_steps = num_steps + 1;
        self.transported = true;
        Ok(updated)
    }
}

impl MomentumIgt {
    /// Perform one optimization step with the given gradients.
    ///
    /// Parameters without a gradient are skipped, but every group's step
    /// counter advances. Afterwards all groups expose transported parameters,
    /// even if [`enter_evaluation`](Self::enter_evaluation) was called before.
    ///
    /// # Errors
    ///
    /// Returns [`IgtError::ShapeMismatch`] or [`IgtError::DTypeMismatch`] if a
    /// gradient does not match its parameter. These are detected before any
    /// group is updated, so the optimizer is left unchanged.
    pub fn step<G: GradientSource + ?Sized>(&mut self, grads: &G) -> Result<()> {
        for group in &self.groups {
            group.check_gradients(grads)?;
        }

        for (index, group) in self.groups.iter_mut().enumerate() {
            if !group.transported {
                tracing::warn!(
                    group = index,
                    "IGT step taken in evaluation mode; the group will be transported again"
                );
            }

            let updated = group.step(grads)?;
            tracing::debug!(
                group = index,
                num_steps = group.num_steps,
                updated,
                skipped = group.params.len() - updated,
                "IGT step"
            );
        }
        Ok(())
    }

    /// Run `closure` to obtain the loss and gradients, then step on them.
    ///
    /// The closure is invoked exactly once, before any gradient is read, and
    /// its loss is returned.
    ///
    /// # Errors
    ///
    /// Returns the closure's error unchanged, or any error from [`step`](Self::step).
    pub fn step_with<L, G, F>(&mut self, closure: F) -> Result<L>
    where
        G: GradientSource,
        F: FnOnce() -> Result<(L, G)>,
    {
        let (loss, grads) = closure()?;
        self.step(&grads)?;
        Ok(loss)
    }
}
