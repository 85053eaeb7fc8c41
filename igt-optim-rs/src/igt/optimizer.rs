//! The [`MomentumIgt`] optimizer.

use std::collections::HashSet;

use candle_core::backprop::GradStore;
use candle_core::Var;

use crate::config::IgtConfig;
use crate::error::{IgtError, Result};
use crate::state::ParameterState;

use super::group::ParameterGroup;

/// Opaque reference to a registered parameter.
///
/// Handles are only produced by the optimizer that owns the parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamHandle {
    group: usize,
    index: usize,
}

impl ParamHandle {
    /// Index of the parameter group.
    #[must_use]
    pub const fn group(&self) -> usize {
        self.group
    }

    /// Position of the parameter inside its group.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// Implicit Gradient Transport optimizer, with optional heavyball or
/// Nesterov momentum.
///
/// Heavyball and Nesterov follow the same conventions as SGD with momentum:
/// the momentum buffer accumulates the IGT velocity, and Nesterov adds the
/// velocity term to the momentum term in the update.
///
/// # Example
///
/// ```ignore
/// use igt_optim_rs::{IgtConfig, MomentumIgt};
///
/// let mut opt = MomentumIgt::new(vec![w.clone(), b.clone()], IgtConfig::new(0.1))?;
/// for _ in 0..steps {
///     let loss = forward(&w, &b)?;
///     opt.step(&loss.backward()?)?;
/// }
/// opt.enter_evaluation()?;
/// ```
#[derive(Debug)]
pub struct MomentumIgt {
    pub(crate) groups: Vec<ParameterGroup>,
}

impl MomentumIgt {
    /// Create an optimizer with a single parameter group.
    ///
    /// # Errors
    ///
    /// Returns [`IgtError::InvalidConfig`] if `config` fails validation and
    /// [`IgtError::DuplicateParameter`] if a variable is listed twice.
    pub fn new(vars: Vec<Var>, config: IgtConfig) -> Result<Self> {
        let mut optimizer = Self { groups: Vec::new() };
        optimizer.add_param_group(vars, config)?;
        Ok(optimizer)
    }

    /// Register another group of parameters with its own configuration.
    ///
    /// Returns the index of the new group.
    ///
    /// # Errors
    ///
    /// Returns error if `config` is invalid or a variable is already
    /// registered. The optimizer is left unchanged on error.
    pub fn add_param_group(&mut self, vars: Vec<Var>, config: IgtConfig) -> Result<usize> {
        config.validate()?;

        let mut seen: HashSet<_> = self
            .groups
            .iter()
            .flat_map(|group| group.params.iter().map(|var| var.id()))
            .collect();
        for var in &vars {
            if !seen.insert(var.id()) {
                return Err(IgtError::DuplicateParameter { id: var.id() });
            }
        }

        self.groups.push(ParameterGroup::new(vars, config));
        Ok(self.groups.len() - 1)
    }

    /// All parameter groups.
    #[must_use]
    pub fn groups(&self) -> &[ParameterGroup] {
        &self.groups
    }

    /// Group at `index`.
    #[must_use]
    pub fn group(&self, index: usize) -> Option<&ParameterGroup> {
        self.groups.get(index)
    }

    /// Handles of every registered parameter, group by group.
    pub fn handles(&self) -> impl Iterator<Item = ParamHandle> + '_ {
        self.groups.iter().enumerate().flat_map(|(group, g)| {
            (0..g.params.len()).map(move |index| ParamHandle { group, index })
        })
    }

    /// Handle of `var`, if it is registered with this optimizer.
    #[must_use]
    pub fn handle_of(&self, var: &Var) -> Option<ParamHandle> {
        self.groups.iter().enumerate().find_map(|(group, g)| {
            g.params
                .iter()
                .position(|param| param.id() == var.id())
                .map(|index| ParamHandle { group, index })
        })
    }

    /// Parameter behind `handle`.
    #[must_use]
    pub fn param(&self, handle: ParamHandle) -> Option<&Var> {
        self.groups.get(handle.group)?.params.get(handle.index)
    }

    /// Buffers of the parameter behind `handle`, once it has seen a gradient.
    #[must_use]
    pub fn state(&self, handle: ParamHandle) -> Option<&ParameterState> {
        self.groups.get(handle.group)?.state(handle.index)
    }

    /// Whether every group exposes transported parameters.
    #[must_use]
    pub fn is_training(&self) -> bool {
        self.groups.iter().all(|group| group.transported)
    }

    /// Summary of the optimizer state.
    #[must_use]
    pub fn stats(&self) -> IgtStats {
        IgtStats {
            num_groups: self.groups.len(),
            num_params: self.groups.iter().map(|g| g.params.len()).sum(),
            initialized_params: self.groups.iter().map(|g| g.store.initialized()).sum(),
            max_num_steps: self.groups.iter().map(|g| g.num_steps).max().unwrap_or(0),
            state_elements: self.groups.iter().map(|g| g.store.state_elements()).sum(),
        }
    }
}

impl candle_nn::Optimizer for MomentumIgt {
    type Config = IgtConfig;

    fn new(vars: Vec<Var>, config: IgtConfig) -> candle_core::Result<Self> {
        Ok(Self::new(vars, config)?)
    }

    fn step(&mut self, grads: &GradStore) -> candle_core::Result<()> {
        Ok(Self::step(self, grads)?)
    }

    fn learning_rate(&self) -> f64 {
        self.groups.first().map_or(0.0, |group| group.config.lr)
    }

    fn set_learning_rate(&mut self, lr: f64) {
        if !(lr.is_finite() && lr > 0.0) {
            tracing::warn!(lr, "ignoring invalid IGT learning rate");
            return;
        }
        for group in &mut self.groups {
            group.set_learning_rate(lr);
        }
    }
}

/// Optimizer statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgtStats {
    /// Number of parameter groups.
    pub num_groups: usize,
    /// Registered parameters.
    pub num_params: usize,
    /// Parameters that have received at least one gradient.
    pub initialized_params: usize,
    /// Largest step count across groups.
    pub max_num_steps: usize,
    /// Scalar elements held in optimizer buffers.
    pub state_elements: usize,
}

impl std::fmt::Display for IgtStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Groups: {} | Params: {}/{} initialized | Steps: {} | State elements: {}",
            self.num_groups,
            self.initialized_params,
            self.num_params,
            self.max_num_steps,
            self.state_elements
        )
    }
}
