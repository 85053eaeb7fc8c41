//! Switching the exposed parameters between training and evaluation views.

use crate::error::Result;

use super::group::ParameterGroup;
use super::optimizer::MomentumIgt;
use super::transported_params;

impl ParameterGroup {
    /// Returns whether the group changed view.
    pub(crate) fn enter_training(&mut self) -> Result<bool> {
        if self.transported {
            return Ok(false);
        }

        // With no completed step there is nothing to transport.
        if self.num_steps > 0 {
            let transport = self.schedule().transport(self.num_steps);
            for (index, state) in self.store.iter() {
                if let Some(param) = self.params.get(index) {
                    param.set(&transported_params(state, &self.config, transport)?)?;
                }
            }
        }

        self.transported = true;
        Ok(true)
    }

    /// Returns whether the group changed view.
    pub(crate) fn enter_evaluation(&mut self) -> Result<bool> {
        if !self.transported {
            return Ok(false);
        }

        for (index, state) in self.store.iter() {
            if let Some(param) = self.params.get(index) {
                param.set(&state.true_params)?;
            }
        }

        self.transported = false;
        Ok(true)
    }
}

impl MomentumIgt {
    /// Expose the transported parameters again, ready for [`step`](Self::step).
    ///
    /// Only needed after [`enter_evaluation`](Self::enter_evaluation); groups
    /// already in training mode are left alone.
    ///
    /// # Errors
    ///
    /// Returns error if a tensor operation fails.
    pub fn enter_training(&mut self) -> Result<()> {
        for (index, group) in self.groups.iter_mut().enumerate() {
            if group.enter_training()? {
                tracing::debug!(group = index, num_steps = group.num_steps, "IGT group entered training");
            }
        }
        Ok(())
    }

    /// Expose the true parameters, for evaluation or inference.
    ///
    /// Velocity buffers are untouched; calling this twice is the same as
    /// calling it once.
    ///
    /// # Errors
    ///
    /// Returns error if a tensor operation fails.
    pub fn enter_evaluation(&mut self) -> Result<()> {
        for (index, group) in self.groups.iter_mut().enumerate() {
            if group.enter_evaluation()? {
                tracing::debug!(group = index, num_steps = group.num_steps, "IGT group entered evaluation");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use candle_core::{Device, Tensor, TensorId, Var};

    use crate::config::IgtConfig;
    use crate::igt::MomentumIgt;

    fn var(value: f32) -> Var {
        Var::new(&[value], &Device::Cpu).unwrap()
    }

    fn scalar(t: &Tensor) -> f32 {
        t.flatten_all().unwrap().to_vec1::<f32>().unwrap()[0]
    }

    fn grads(var: &Var, g: f32) -> HashMap<TensorId, Tensor> {
        let mut map = HashMap::new();
        map.insert(var.id(), Tensor::new(&[g], &Device::Cpu).unwrap());
        map
    }

    fn trained(config: IgtConfig) -> (Var, MomentumIgt) {
        let w = var(1.0);
        let mut opt = MomentumIgt::new(vec![w.clone()], config).unwrap();
        opt.step(&grads(&w, 2.0)).unwrap();
        opt.step(&grads(&w, 1.0)).unwrap();
        (w, opt)
    }

    #[test]
    fn test_evaluation_exposes_true_params() {
        let (w, mut opt) = trained(IgtConfig::new(0.1));
        assert!((scalar(w.as_tensor()) - 0.35).abs() < 1e-5);

        opt.enter_evaluation().unwrap();

        assert!(!opt.groups()[0].is_transported());
        assert!((scalar(w.as_tensor()) - 0.65).abs() < 1e-5);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let (w, mut opt) = trained(IgtConfig::new(0.1).with_momentum(0.9));

        opt.enter_evaluation().unwrap();
        let once = scalar(w.as_tensor());
        let velocity_once = scalar(opt.state(opt.handle_of(&w).unwrap()).unwrap().igt_velocity());

        opt.enter_evaluation().unwrap();
        assert!((scalar(w.as_tensor()) - once).abs() < f32::EPSILON);
        let state = opt.state(opt.handle_of(&w).unwrap()).unwrap();
        assert!((scalar(state.igt_velocity()) - velocity_once).abs() < f32::EPSILON);
        assert!(!opt.is_training());
    }

    #[test]
    fn test_training_restores_transport() {
        for config in [
            IgtConfig::new(0.1),
            IgtConfig::new(0.1).with_momentum(0.9),
            IgtConfig::new(0.1).with_momentum(0.9).with_nesterov(true),
        ] {
            let (w, mut opt) = trained(config);
            let transported = scalar(w.as_tensor());

            opt.enter_evaluation().unwrap();
            opt.enter_training().unwrap();

            // transport(2) equals the look-ahead used by the last step.
            assert!(
                (scalar(w.as_tensor()) - transported).abs() < 1e-5,
                "{config:?}"
            );
            assert!(opt.is_training());
        }
    }

    #[test]
    fn test_training_is_noop_when_transported() {
        let (w, mut opt) = trained(IgtConfig::new(0.1));
        let before = scalar(w.as_tensor());

        opt.enter_training().unwrap();
        opt.enter_training().unwrap();

        assert!((scalar(w.as_tensor()) - before).abs() < f32::EPSILON);
    }

    #[test]
    fn test_round_trip_before_any_step() {
        let w = var(3.0);
        let mut opt = MomentumIgt::new(vec![w.clone()], IgtConfig::new(0.1)).unwrap();

        opt.enter_training().unwrap();
        opt.enter_evaluation().unwrap();
        assert!((scalar(w.as_tensor()) - 3.0).abs() < f32::EPSILON);

        opt.enter_training().unwrap();
        assert!((scalar(w.as_tensor()) - 3.0).abs() < f32::EPSILON);
        assert_eq!(opt.groups()[0].num_steps(), 0);
    }

    #[test]
    fn test_mode_switch_leaves_velocities() {
        let (w, mut opt) = trained(IgtConfig::new(0.1).with_momentum(0.9));
        let handle = opt.handle_of(&w).unwrap();
        let igt = scalar(opt.state(handle).unwrap().igt_velocity());
        let momentum = scalar(opt.state(handle).unwrap().momentum_velocity().unwrap());
        let true_params = scalar(opt.state(handle).unwrap().true_params());

        opt.enter_evaluation().unwrap();
        opt.enter_training().unwrap();

        let state = opt.state(handle).unwrap();
        assert!((scalar(state.igt_velocity()) - igt).abs() < f32::EPSILON);
        assert!((scalar(state.momentum_velocity().unwrap()) - momentum).abs() < f32::EPSILON);
        assert!((scalar(state.true_params()) - true_params).abs() < f32::EPSILON);
    }

    #[test]
    fn test_groups_switch_independently() {
        let a = var(1.0);
        let b = var(1.0);
        let mut opt = MomentumIgt::new(vec![a.clone()], IgtConfig::new(0.1)).unwrap();
        opt.add_param_group(vec![b.clone()], IgtConfig::new(0.2)).unwrap();

        let mut g = grads(&a, 2.0);
        g.insert(b.id(), Tensor::new(&[2.0f32], &Device::Cpu).unwrap());
        opt.step(&g).unwrap();

        opt.enter_evaluation().unwrap();
        assert!((scalar(a.as_tensor()) - 0.8).abs() < 1e-5);
        assert!((scalar(b.as_tensor()) - 0.6).abs() < 1e-5);

        opt.enter_training().unwrap();
        // transport(1) = 1: a = 0.8 - 0.1 * 2, b = 0.6 - 0.2 * 2
        assert!((scalar(a.as_tensor()) - 0.6).abs() < 1e-5);
        assert!((scalar(b.as_tensor()) - 0.2).abs() < 1e-5);
    }
}
