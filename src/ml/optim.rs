// ============================================================
// Layer 5 — Optimiser and Learning-Rate Schedule
// ============================================================
// SGD with momentum over two parameter groups:
//
//   decayed  weights of rank > 1 (conv kernels, linear matrix)
//            → L2 weight decay
//   plain    rank-1 tensors (biases, batch-norm γ/β)
//            → no weight decay
//
// Burn optimisers apply one configuration to every parameter,
// so the gradients are split by rank and each group gets its
// own optimiser. Momentum state is keyed by ParamId, so the
// two optimisers never touch each other's buffers.
//
// Parameters created with require_grad = false (the fixed
// filter bank) have no gradient and are skipped by both.

use std::marker::PhantomData;

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::{
        decay::WeightDecayConfig, momentum::MomentumConfig, GradientsParams, Optimizer,
        SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::ml::model::SteganalysisNet;

#[derive(Debug, Clone)]
pub struct SgdSettings {
    pub momentum:     f64,
    pub weight_decay: f64,
}

pub struct GroupedSgd<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<SteganalysisNet<B>, B>,
{
    decayed: O,
    plain:   O,
    backend: PhantomData<B>,
}

/// Build the two-group optimiser used for training.
pub fn grouped_sgd<B: AutodiffBackend>(
    settings: &SgdSettings,
) -> GroupedSgd<B, impl Optimizer<SteganalysisNet<B>, B>> {
    let momentum = MomentumConfig::new()
        .with_momentum(settings.momentum)
        .with_dampening(0.0)
        .with_nesterov(false);

    let decayed = SgdConfig::new()
        .with_momentum(Some(momentum.clone()))
        .with_weight_decay(Some(WeightDecayConfig::new(settings.weight_decay as _)))
        .init::<B, SteganalysisNet<B>>();
    let plain = SgdConfig::new()
        .with_momentum(Some(momentum))
        .init::<B, SteganalysisNet<B>>();

    GroupedSgd { decayed, plain, backend: PhantomData }
}

impl<B, O> GroupedSgd<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<SteganalysisNet<B>, B>,
{
    pub fn step(
        &mut self,
        lr:    f64,
        model: SteganalysisNet<B>,
        grads: GradientsParams,
    ) -> SteganalysisNet<B> {
        let (decayed, plain) = split_by_rank(grads, &model);
        let model = self.decayed.step(lr, model, decayed);
        self.plain.step(lr, model, plain)
    }

    pub fn to_records(&self) -> (O::Record, O::Record) {
        (self.decayed.to_record(), self.plain.to_record())
    }

    pub fn load_records(self, decayed: O::Record, plain: O::Record) -> Self {
        Self {
            decayed: self.decayed.load_record(decayed),
            plain:   self.plain.load_record(plain),
            backend: PhantomData,
        }
    }
}

/// Move rank-1 gradients out of `grads`. Returns (rank > 1, rank 1).
pub fn split_by_rank<B: AutodiffBackend>(
    mut grads: GradientsParams,
    model:     &SteganalysisNet<B>,
) -> (GradientsParams, GradientsParams) {
    let mut splitter = RankSplitter::<B> {
        grads:   &mut grads,
        vectors: GradientsParams::new(),
        backend: PhantomData,
    };
    model.visit(&mut splitter);
    let vectors = splitter.vectors;
    (grads, vectors)
}

struct RankSplitter<'a, B: AutodiffBackend> {
    grads:   &'a mut GradientsParams,
    vectors: GradientsParams,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for RankSplitter<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if D != 1 {
            return;
        }
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id.clone()) {
            self.vectors.register::<B::InnerBackend, D>(id, grad);
        }
    }
}

// ─── Learning-rate schedule ───────────────────────────────────────────────────

/// Step decay: `lr(e) = base · γ^k`, where k counts milestones ≤ e.
///
/// The schedule is a pure function of the epoch so a resumed run picks
/// up the right rate without any stored scheduler state.
#[derive(Debug, Clone)]
pub struct MultiStepLr {
    base:       f64,
    milestones: Vec<usize>,
    gamma:      f64,
}

impl MultiStepLr {
    pub fn new(base: f64, mut milestones: Vec<usize>, gamma: f64) -> Self {
        milestones.sort_unstable();
        Self { base, milestones, gamma }
    }

    pub fn lr_at(&self, epoch: usize) -> f64 {
        let passed = self.milestones.iter().filter(|&&m| m <= epoch).count();
        self.base * self.gamma.powi(passed as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::SteganalysisNetConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_schedule_steps_at_milestones() {
        let s = MultiStepLr::new(0.01, vec![80, 140, 190], 0.1);
        assert!(close(s.lr_at(1),   0.01));
        assert!(close(s.lr_at(79),  0.01));
        assert!(close(s.lr_at(80),  0.001));
        assert!(close(s.lr_at(139), 0.001));
        assert!(close(s.lr_at(140), 0.0001));
        assert!(close(s.lr_at(250), 0.00001));
    }

    #[test]
    fn test_schedule_sorts_milestones() {
        let s = MultiStepLr::new(1.0, vec![20, 10], 0.5);
        assert!(close(s.lr_at(15), 0.5));
    }

    fn one_step_grads() -> (SteganalysisNet<TestBackend>, GradientsParams) {
        let device = Default::default();
        let model  = SteganalysisNetConfig::new().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::random(
            [2, 3, 16, 16],
            burn::tensor::Distribution::Uniform(0.0, 255.0),
            &device,
        );
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);
        let (loss, _) = model.forward_classification(images, labels);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        (model, grads)
    }

    #[test]
    fn test_split_separates_vectors_from_kernels() {
        let (model, grads) = one_step_grads();
        let (decayed, plain) = split_by_rank(grads, &model);

        // 14 conv kernels + 1 linear weight
        assert_eq!(decayed.len(), 15);
        // 14 conv biases + 1 linear bias + 14 batch norms × (γ, β)
        assert_eq!(plain.len(), 43);
    }

    #[test]
    fn test_step_leaves_filter_bank_untouched() {
        let (model, grads) = one_step_grads();
        let hpf_before  = model.preprocess.weight.val().into_data();
        let conv_before = model.fc.weight.val().into_data();

        let mut optim = grouped_sgd::<TestBackend>(&SgdSettings {
            momentum:     0.9,
            weight_decay: 5e-4,
        });
        let model = optim.step(0.01, model, grads);

        assert_eq!(model.preprocess.weight.val().into_data(), hpf_before);
        assert_ne!(model.fc.weight.val().into_data(), conv_before);
    }
}
