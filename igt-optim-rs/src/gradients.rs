//! Gradient containers understood by the optimizer.

use std::collections::HashMap;

use candle_core::backprop::GradStore;
use candle_core::{Tensor, TensorId, Var};

/// Lookup of the current gradient of a parameter.
///
/// Returning `None` means the parameter did not take part in the backward
/// pass; the optimizer then leaves it untouched for the step.
pub trait GradientSource {
    /// Gradient for `param`, if any.
    fn gradient(&self, param: &Var) -> Option<&Tensor>;
}

impl GradientSource for GradStore {
    fn gradient(&self, param: &Var) -> Option<&Tensor> {
        self.get(param.as_tensor())
    }
}

impl GradientSource for HashMap<TensorId, Tensor> {
    fn gradient(&self, param: &Var) -> Option<&Tensor> {
        self.get(&param.id())
    }
}

impl<G: GradientSource + ?Sized> GradientSource for &G {
    fn gradient(&self, param: &Var) -> Option<&Tensor> {
        (**self).gradient(param)
    }
}
