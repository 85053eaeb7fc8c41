//! Per-parameter optimizer buffers.
//!
//! Each parameter group owns one [`ParameterStateStore`], indexed by the
//! position of the parameter in the group. Slots stay empty until the
//! parameter receives its first gradient.

use candle_core::Tensor;

use crate::error::Result;

/// Buffers kept for a single parameter.
#[derive(Debug, Clone)]
pub struct ParameterState {
    /// Bias-corrected running estimate of the gradient.
    pub(crate) igt_velocity: Tensor,
    /// Un-projected parameter trajectory.
    pub(crate) true_params: Tensor,
    /// Momentum accumulator, present only when momentum is enabled.
    pub(crate) momentum_velocity: Option<Tensor>,
}

impl ParameterState {
    /// Allocate state for `param`: zero velocities and a snapshot of its
    /// current value.
    ///
    /// The snapshot is a deep copy, so later writes to the parameter do not
    /// leak into `true_params`.
    ///
    /// # Errors
    ///
    /// Returns error if tensor allocation fails.
    pub fn new(param: &Tensor, momentum_enabled: bool) -> Result<Self> {
        let param = param.detach();
        let momentum_velocity = if momentum_enabled {
            Some(param.zeros_like()?)
        } else {
            None
        };

        Ok(Self {
            igt_velocity: param.zeros_like()?,
            true_params: param.copy()?,
            momentum_velocity,
        })
    }

    /// IGT velocity buffer.
    #[must_use]
    pub const fn igt_velocity(&self) -> &Tensor {
        &self.igt_velocity
    }

    /// True (un-transported) parameters.
    #[must_use]
    pub const fn true_params(&self) -> &Tensor {
        &self.true_params
    }

    /// Momentum buffer, if momentum is enabled.
    #[must_use]
    pub const fn momentum_velocity(&self) -> Option<&Tensor> {
        self.momentum_velocity.as_ref()
    }

    /// Number of scalar elements held across all buffers.
    #[must_use]
    pub fn elem_count(&self) -> usize {
        self.igt_velocity.elem_count()
            + self.true_params.elem_count()
            + self.momentum_velocity.as_ref().map_or(0, Tensor::elem_count)
    }
}

/// Position-indexed storage of [`ParameterState`]s for one group.
#[derive(Debug, Clone, Default)]
pub struct ParameterStateStore {
    slots: Vec<Option<ParameterState>>,
}

impl ParameterStateStore {
    /// Create a store with `len` empty slots.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    /// Return the state at `index`, creating it from `param` on first use.
    ///
    /// # Errors
    ///
    /// Returns error if allocating the buffers fails.
    pub fn get_or_create(
        &mut self,
        index: usize,
        param: &Tensor,
        momentum_enabled: bool,
    ) -> Result<&mut ParameterState> {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        let slot = &mut self.slots[index];
        let state = match slot.take() {
            Some(state) => state,
            None => {
                tracing::trace!(index, shape = ?param.dims(), "initializing IGT parameter state");
                ParameterState::new(param, momentum_enabled)?
            }
        };
        Ok(slot.insert(state))
    }

    /// State at `index`, if the parameter has received a gradient.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ParameterState> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Iterate over `(index, state)` for initialized slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ParameterState)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|state| (index, state)))
    }

    /// Number of initialized slots.
    #[must_use]
    pub fn initialized(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Total scalar elements held by all states.
    #[must_use]
    pub fn state_elements(&self) -> usize {
        self.iter().map(|(_, state)| state.elem_count()).sum()
    }
}
