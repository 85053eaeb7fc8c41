//! Parameter groups.

use candle_core::Var;

use crate::config::IgtConfig;
use crate::schedule::TransportSchedule;
use crate::state::{ParameterState, ParameterStateStore};

/// Parameters sharing one [`IgtConfig`], with their step counter and view flag.
#[derive(Debug)]
pub struct ParameterGroup {
    pub(crate) config: IgtConfig,
    pub(crate) params: Vec<Var>,
    pub(crate) store: ParameterStateStore,
    /// Completed steps; drives the bias correction.
    pub(crate) num_steps: usize,
    /// Whether the exposed values are the transported ones.
    pub(crate) transported: bool,
}

impl ParameterGroup {
    /// `config` must already be validated.
    pub(crate) fn new(params: Vec<Var>, config: IgtConfig) -> Self {
        let store = ParameterStateStore::with_len(params.len());
        Self {
            config,
            params,
            store,
            num_steps: 0,
            transported: true,
        }
    }

    /// Hyperparameters of the group.
    #[must_use]
    pub const fn config(&self) -> &IgtConfig {
        &self.config
    }

    /// Parameters in registration order.
    #[must_use]
    pub fn params(&self) -> &[Var] {
        &self.params
    }

    /// Number of completed steps.
    #[must_use]
    pub const fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Whether the parameters currently expose the transported values.
    #[must_use]
    pub const fn is_transported(&self) -> bool {
        self.transported
    }

    /// State of the parameter at `index`, once it has seen a gradient.
    #[must_use]
    pub fn state(&self, index: usize) -> Option<&ParameterState> {
        self.store.get(index)
    }

    /// Buffers of the whole group.
    #[must_use]
    pub const fn store(&self) -> &ParameterStateStore {
        &self.store
    }

    pub(crate) const fn schedule(&self) -> TransportSchedule {
        TransportSchedule::new(self.config.delta)
    }

    pub(crate) fn set_learning_rate(&mut self, lr: f64) {
        self.config.lr = lr;
    }
}
