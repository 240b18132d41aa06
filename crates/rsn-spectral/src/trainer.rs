// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Training Loop
// ─────────────────────────────────────────────────────────────────────
//! One epoch:
//!   1. Draw a depth window per example (or reuse the frozen ones)
//!   2. Factorise Φ once
//!   3. Mean squared coefficient error and its gradient over the batch
//!   4. Reject non-finite loss or gradient
//!   5. Optimizer step on Φ and Λ
//!   6. Log the epoch

use rsn_data::Dataset;
use rsn_types::{
    DepthSchedule, DepthWindow, EpochLog, EvalReport, RsnConfig, RsnError, RsnResult,
    TrainReport,
};

use crate::gradient::batch_gradient;
use crate::model::{argmax_class, squared_error, SpectralModel};
use crate::optimizer::{build_optimizer, Optimizer};
use crate::sampler::DepthSampler;

/// Owns the model, optimizer and depth sampler across epochs.
pub struct Trainer {
    model: SpectralModel,
    optimizer: Box<dyn Optimizer>,
    sampler: DepthSampler,
    frozen: Option<Vec<DepthWindow>>,
    epoch: usize,
    pub log: Vec<EpochLog>,
}

impl Trainer {
    /// Optimizer and sampler are built from the model's config. The
    /// sampler seed is offset from the parameter seed.
    pub fn new(model: SpectralModel) -> RsnResult<Self> {
        let cfg = model.config();
        let optimizer = build_optimizer(cfg);
        let sampler = DepthSampler::new(cfg.k_max, cfg.seed.wrapping_add(1))?;
        Ok(Self {
            model,
            optimizer,
            sampler,
            frozen: None,
            epoch: 0,
            log: Vec::new(),
        })
    }

    /// Replace the optimizer built from config.
    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn model(&self) -> &SpectralModel {
        &self.model
    }

    pub fn into_model(self) -> SpectralModel {
        self.model
    }

    /// Epochs completed.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    fn windows_for(&mut self, count: usize) -> Vec<DepthWindow> {
        let schedule = self.model.config().depth_schedule;
        match schedule {
            DepthSchedule::PerEpoch => self.sampler.sample_many(count),
            DepthSchedule::Frozen => {
                // Redrawn only when the dataset size changes
                let reuse = matches!(&self.frozen, Some(w) if w.len() == count);
                if !reuse {
                    self.frozen = Some(self.sampler.sample_many(count));
                }
                self.frozen.clone().unwrap_or_default()
            }
        }
    }

    /// Run one epoch over `data`.
    pub fn train_epoch(&mut self, data: &Dataset) -> RsnResult<EpochLog> {
        check_dataset(self.model.config(), data)?;
        let windows = self.windows_for(data.len());
        let mean_window_len =
            windows.iter().map(|w| w.len() as f64).sum::<f64>() / windows.len() as f64;

        let (loss, grads, min_pivot) = {
            let op = self.model.operator()?;
            let (loss, grads) = batch_gradient(&op, data, &windows)?;
            (loss, grads, op.min_pivot())
        };

        let epoch = self.epoch + 1;
        if !loss.is_finite() || !grads.is_finite() {
            log::error!(
                "Epoch {epoch}: non-finite loss or gradient (loss={loss}, min pivot={min_pivot:.3e})"
            );
            return Err(RsnError::Numerical(format!(
                "non-finite loss or gradient at epoch {epoch}"
            )));
        }

        let grad_norm = grads.norm();
        self.optimizer.step(self.model.params_mut(), &grads);
        self.epoch = epoch;

        let entry = EpochLog {
            epoch,
            loss,
            grad_norm,
            mean_window_len,
            min_pivot,
        };
        log::info!(
            "Epoch {}/{}, loss: {:.6}",
            epoch,
            self.model.config().epochs,
            loss
        );
        log::debug!(
            "Epoch {epoch}: |grad|={grad_norm:.4e}, mean window={mean_window_len:.1}, min pivot={min_pivot:.3e}"
        );
        self.log.push(entry.clone());
        Ok(entry)
    }

    /// Run `n_epochs` epochs, stopping at the first error.
    pub fn run(&mut self, data: &Dataset, n_epochs: usize) -> RsnResult<Vec<EpochLog>> {
        let mut logs = Vec::with_capacity(n_epochs);
        for _ in 0..n_epochs {
            logs.push(self.train_epoch(data)?);
        }
        Ok(logs)
    }

    /// Train for the configured number of epochs.
    pub fn fit(&mut self, data: &Dataset) -> RsnResult<TrainReport> {
        let epochs = self.model.config().epochs;
        log::info!(
            "Training on {} examples for {} epochs ({} optimizer)",
            data.len(),
            epochs,
            self.optimizer.name()
        );
        let epochs = self.run(data, epochs)?;
        Ok(TrainReport { epochs })
    }

    /// Classify every example over the configured window.
    pub fn evaluate(&self, data: &Dataset) -> RsnResult<EvalReport> {
        evaluate(&self.model, data)
    }
}

/// Non-empty, N features per row, no more classes than the model decodes.
fn check_dataset(cfg: &RsnConfig, data: &Dataset) -> RsnResult<()> {
    if data.is_empty() {
        return Err(RsnError::Dataset("dataset is empty".to_string()));
    }
    RsnError::check_len(cfg.n_nodes, data.dim)?;
    if data.n_classes > cfg.n_classes {
        return Err(RsnError::Dataset(format!(
            "dataset has {} classes but the model decodes {}",
            data.n_classes, cfg.n_classes
        )));
    }
    Ok(())
}

/// Predictions, confusion matrix and mean loss of `model` on `data`.
pub fn evaluate(model: &SpectralModel, data: &Dataset) -> RsnResult<EvalReport> {
    let cfg = model.config();
    check_dataset(cfg, data)?;
    let op = model.operator()?;
    let mut report = EvalReport::with_classes(cfg.n_classes);
    let mut total = 0.0;
    for (row, label) in data.iter() {
        let c = op.coefficients(row, cfg.classify_window)?;
        let predicted = argmax_class(&c, cfg.n_classes)?;
        total += squared_error(&c, label);
        report.record(label, predicted)?;
    }
    report.mean_loss = total / data.len() as f64;
    log::info!(
        "Evaluated {} examples: accuracy {:.4}, mean loss {:.6}",
        data.len(),
        report.accuracy(),
        report.mean_loss
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpectralParams;
    use crate::optimizer::Sgd;
    use rsn_data::{CircleSource, DataSource, UniformSource};
    use rsn_types::{Activation, TransitionMode};

    fn uniform(count: usize, seed: u64) -> Dataset {
        UniformSource {
            count,
            dim: 4,
            n_classes: 2,
            seed,
        }
        .load()
        .unwrap()
    }

    fn cfg(seed: u64) -> RsnConfig {
        RsnConfig {
            n_nodes: 4,
            n_classes: 2,
            k_max: 20,
            epochs: 5,
            seed,
            ..RsnConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_losses_finite() {
        // Default schedule and activation: per-epoch windows, relu.
        let data = uniform(10, 1);
        let mut decreased = 0;
        for seed in 0..7 {
            let model = SpectralModel::new(cfg(seed)).unwrap();
            let mut trainer = Trainer::new(model).unwrap();
            let report = trainer.fit(&data).unwrap();
            assert_eq!(report.epochs.len(), 5);
            assert!(report.all_finite(), "seed {seed}: {:?}", report.epochs);
            assert_eq!(trainer.epoch(), 5);
            assert_eq!(trainer.log.len(), 5);
            if report.final_loss().unwrap() <= report.first_loss().unwrap() {
                decreased += 1;
            }
        }
        assert!(decreased >= 4, "epoch-5 loss <= epoch-1 loss for only {decreased}/7 seeds");
    }

    #[test]
    fn test_frozen_schedule_usually_decreases_loss() {
        let data = uniform(10, 2);
        let mut decreased = 0;
        for seed in 0..7 {
            let cfg = RsnConfig {
                k_max: 10,
                learning_rate: 0.005,
                activation: Activation::Tanh,
                depth_schedule: DepthSchedule::Frozen,
                ..cfg(seed)
            };
            let mut trainer = Trainer::new(SpectralModel::new(cfg).unwrap()).unwrap();
            let report = trainer.fit(&data).unwrap();
            if report.final_loss().unwrap() < report.first_loss().unwrap() {
                decreased += 1;
            }
        }
        assert!(decreased >= 4, "loss decreased for only {decreased}/7 seeds");
    }

    #[test]
    fn test_frozen_windows_reused() {
        let data = uniform(6, 3);
        let cfg = RsnConfig {
            depth_schedule: DepthSchedule::Frozen,
            ..cfg(0)
        };
        let mut trainer = Trainer::new(SpectralModel::new(cfg).unwrap()).unwrap();
        let first = trainer.windows_for(data.len());
        let second = trainer.windows_for(data.len());
        assert_eq!(first, second);
        assert!(first.iter().all(|w| w.k_final < 20));
    }

    #[test]
    fn test_training_is_deterministic() {
        let data = uniform(8, 4);
        let run = || {
            let mut t = Trainer::new(SpectralModel::new(cfg(9)).unwrap()).unwrap();
            t.fit(&data).unwrap();
            t.into_model().params().clone()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_eigen_mode_trains_lambda() {
        let data = uniform(10, 5);
        let cfg = RsnConfig {
            transition: TransitionMode::Eigen,
            activation: Activation::Tanh,
            ..cfg(3)
        };
        let model = SpectralModel::new(cfg).unwrap();
        let before = model.params().lambda.clone();
        let mut trainer = Trainer::new(model).unwrap();
        let report = trainer.fit(&data).unwrap();
        assert!(report.all_finite());
        assert_ne!(trainer.model().params().lambda, before);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let data = UniformSource {
            count: 5,
            dim: 3,
            n_classes: 2,
            seed: 0,
        }
        .load()
        .unwrap();
        let mut trainer = Trainer::new(SpectralModel::new(cfg(0)).unwrap()).unwrap();
        assert!(matches!(
            trainer.train_epoch(&data),
            Err(RsnError::Shape { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_too_many_classes_rejected() {
        let data = UniformSource {
            count: 5,
            dim: 4,
            n_classes: 3,
            seed: 0,
        }
        .load()
        .unwrap();
        let mut trainer = Trainer::new(SpectralModel::new(cfg(0)).unwrap()).unwrap();
        assert!(matches!(trainer.train_epoch(&data), Err(RsnError::Dataset(_))));
    }

    #[test]
    fn test_singular_phi_stops_training() {
        let params =
            SpectralParams::from_parts(4, 2, vec![1.0; 16], vec![0.5, 0.5]).unwrap();
        let model = SpectralModel::with_params(cfg(0), params).unwrap();
        let mut trainer = Trainer::new(model).unwrap();
        assert!(matches!(
            trainer.train_epoch(&uniform(4, 0)),
            Err(RsnError::SingularMatrix { .. })
        ));
        assert_eq!(trainer.epoch(), 0);
        assert!(trainer.log.is_empty());
    }

    #[test]
    fn test_divergence_reported_as_numerical() {
        // Huge Φ with identity g overflows within a few steps.
        let mut phi = vec![0.0; 16];
        for i in 0..4 {
            phi[i * 4 + i] = 1e80;
        }
        let params = SpectralParams::from_parts(4, 2, phi, vec![0.5, 0.5]).unwrap();
        let cfg = RsnConfig {
            activation: Activation::Identity,
            depth_schedule: DepthSchedule::Frozen,
            k_max: 20,
            ..cfg(0)
        };
        let model = SpectralModel::with_params(cfg, params).unwrap();
        let mut trainer = Trainer::new(model)
            .unwrap()
            .with_optimizer(Box::new(Sgd::new(0.01)));
        let data = uniform(10, 6);
        let windows = trainer.windows_for(data.len());
        assert!(windows.iter().any(|w| w.k_final >= 5));
        assert!(matches!(trainer.train_epoch(&data), Err(RsnError::Numerical(_))));
    }

    #[test]
    fn test_evaluate_circle() {
        let cfg = RsnConfig {
            n_nodes: 6,
            n_classes: 2,
            epochs: 3,
            k_max: 15,
            ..RsnConfig::default()
        };
        let data = CircleSource::new(20, 4).load().unwrap().embed(6).unwrap();
        let mut trainer = Trainer::new(SpectralModel::new(cfg).unwrap()).unwrap();
        trainer.fit(&data).unwrap();
        let report = trainer.evaluate(&data).unwrap();
        assert_eq!(report.predictions.len(), 40);
        assert!(report.predictions.iter().all(|&p| p < 2));
        let total: usize = report.confusion.iter().flatten().sum();
        assert_eq!(total, 40);
        assert!((0.0..=1.0).contains(&report.accuracy()));
        assert!(report.mean_loss.is_finite());
    }

    #[test]
    fn test_evaluate_rejects_extra_classes() {
        let model = SpectralModel::new(cfg(0)).unwrap();
        let four_class = UniformSource {
            count: 30,
            dim: 4,
            n_classes: 4,
            seed: 2,
        }
        .load()
        .unwrap();
        assert!(matches!(
            evaluate(&model, &four_class),
            Err(RsnError::Dataset(_))
        ));
    }

    #[test]
    fn test_evaluate_counts_every_row() {
        let model = SpectralModel::new(cfg(1)).unwrap();
        let data = uniform(30, 8);
        let report = evaluate(&model, &data).unwrap();
        let total: usize = report.confusion.iter().flatten().sum();
        assert_eq!(report.predictions.len(), 30);
        assert_eq!(total, 30);
    }

    #[test]
    fn test_evaluate_empty_rejected() {
        let model = SpectralModel::new(cfg(0)).unwrap();
        let empty = Dataset::new(4, 2, vec![], vec![]).unwrap();
        assert!(evaluate(&model, &empty).is_err());
    }
}
