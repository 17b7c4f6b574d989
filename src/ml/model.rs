use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, AvgPool2d, AvgPool2dConfig},
        BatchNorm, BatchNormConfig, Initializer, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::{
        activation::relu,
        Distribution,
        module::conv2d,
        ops::ConvOptions,
    },
};

use crate::ml::filters::{FilterBank, FILTER_COUNT, KERNEL_SIZE};

/// Input channels the backbone sees: RGB × every fixed filter
pub const RESIDUAL_CHANNELS: usize = 3 * FILTER_COUNT;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SteganalysisNetConfig {
    /// Truncation threshold T applied to the filter residuals
    #[config(default = 2.0)]
    pub threshold:   f64,
    #[config(default = 2)]
    pub num_classes: usize,
}

impl SteganalysisNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SteganalysisNet<B> {
        let mut fc = LinearConfig::new(256, self.num_classes)
            .with_initializer(Initializer::Normal { mean: 0.0, std: 0.01 })
            .init(device);
        fc.bias = Some(Param::from_tensor(Tensor::zeros([self.num_classes], device)));

        SteganalysisNet {
            preprocess: HighPassFilter::new(self.threshold, device),
            group1:     PlainBlock::new(RESIDUAL_CHANNELS, 32, device),
            group2:     PooledResidualBlock::new(32, 32, device),
            group3:     GroupedResidualBlock::new(32, 64, device),
            group4:     PooledResidualBlock::new(64, 128, device),
            group5:     PlainBlock::new(128, 256, device),
            pool:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc,
        }
    }
}

/// Trainable convolution with Kaiming-normal (fan-in, ReLU gain) weights
/// and a bias drawn from U(±1/√fan_in).
fn conv<B: Backend>(
    channels: [usize; 2],
    kernel:   usize,
    stride:   usize,
    padding:  usize,
    groups:   usize,
    device:   &B::Device,
) -> Conv2d<B> {
    let mut conv = Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_groups(groups)
        .with_initializer(Initializer::KaimingNormal {
            gain:          2.0_f64.sqrt(),
            fan_out_only:  false,
        })
        .init(device);

    let bound = bias_bound(channels[0] / groups * kernel * kernel);
    conv.bias = Some(Param::from_tensor(Tensor::random(
        [channels[1]],
        Distribution::Uniform(-bound, bound),
        device,
    )));
    conv
}

fn bias_bound(fan_in: usize) -> f64 {
    1.0 / (fan_in as f64).sqrt()
}

fn norm<B: Backend>(channels: usize, device: &B::Device) -> BatchNorm<B, 2> {
    BatchNormConfig::new(channels).init(device)
}

// ─── Preprocessing ────────────────────────────────────────────────────────────

/// Fixed filter bank applied to each colour channel, then truncated.
#[derive(Module, Debug)]
pub struct HighPassFilter<B: Backend> {
    /// `[62, 1, 5, 5]`, never updated by the optimizer
    pub weight: Param<Tensor<B, 4>>,
    threshold:  f64,
}

impl<B: Backend> HighPassFilter<B> {
    pub fn new(threshold: f64, device: &B::Device) -> Self {
        let bank   = FilterBank::new();
        let weight = Tensor::<B, 4>::from_data(
            TensorData::new(bank.weights(), [bank.len(), 1, KERNEL_SIZE, KERNEL_SIZE]),
            device,
        );
        Self {
            weight: Param::from_tensor(weight).set_require_grad(false),
            threshold,
        }
    }

    /// `[N, C, H, W]` → `[N, C·62, H, W]`, channel-major
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, channels, height, width] = images.dims();
        let pad = KERNEL_SIZE / 2;

        let planes    = images.reshape([batch * channels, 1, height, width]);
        let residuals = conv2d(
            planes,
            self.weight.val(),
            None,
            ConvOptions::new([1, 1], [pad, pad], [1, 1], 1),
        );

        residuals
            .reshape([batch, channels * FILTER_COUNT, height, width])
            .clamp(-self.threshold, self.threshold)
    }
}

// ─── Backbone blocks ──────────────────────────────────────────────────────────

/// Two 3×3 conv → BN → ReLU stages, resolution unchanged.
#[derive(Module, Debug)]
pub struct PlainBlock<B: Backend> {
    conv1: Conv2d<B>,
    bn1:   BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2:   BatchNorm<B, 2>,
}

impl<B: Backend> PlainBlock<B> {
    pub fn new(input: usize, output: usize, device: &B::Device) -> Self {
        Self {
            conv1: conv([input, output], 3, 1, 1, 1, device),
            bn1:   norm(output, device),
            conv2: conv([output, output], 3, 1, 1, 1, device),
            bn2:   norm(output, device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.bn1.forward(self.conv1.forward(x)));
        relu(self.bn2.forward(self.conv2.forward(x)))
    }
}

/// Residual block that halves resolution with a 3×3 average pool on the
/// main path and a strided 1×1 convolution on the shortcut.
#[derive(Module, Debug)]
pub struct PooledResidualBlock<B: Backend> {
    conv1:       Conv2d<B>,
    bn1:         BatchNorm<B, 2>,
    conv2:       Conv2d<B>,
    bn2:         BatchNorm<B, 2>,
    pool:        AvgPool2d,
    shortcut:    Conv2d<B>,
    shortcut_bn: BatchNorm<B, 2>,
}

impl<B: Backend> PooledResidualBlock<B> {
    pub fn new(input: usize, output: usize, device: &B::Device) -> Self {
        Self {
            conv1:       conv([input, input], 3, 1, 1, 1, device),
            bn1:         norm(input, device),
            conv2:       conv([input, output], 3, 1, 1, 1, device),
            bn2:         norm(output, device),
            pool:        AvgPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_count_include_pad(true)
                .init(),
            shortcut:    conv([input, output], 1, 2, 0, 1, device),
            shortcut_bn: norm(output, device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let main = relu(self.bn1.forward(self.conv1.forward(x.clone())));
        let main = self.pool.forward(self.bn2.forward(self.conv2.forward(main)));
        let skip = self.shortcut_bn.forward(self.shortcut.forward(x));
        relu(main + skip)
    }
}

/// Bottleneck residual block whose middle 3×3 convolution is grouped
/// (32 groups) and strided.
#[derive(Module, Debug)]
pub struct GroupedResidualBlock<B: Backend> {
    conv1:       Conv2d<B>,
    bn1:         BatchNorm<B, 2>,
    conv2:       Conv2d<B>,
    bn2:         BatchNorm<B, 2>,
    conv3:       Conv2d<B>,
    bn3:         BatchNorm<B, 2>,
    shortcut:    Conv2d<B>,
    shortcut_bn: BatchNorm<B, 2>,
}

pub const GROUPS: usize = 32;

impl<B: Backend> GroupedResidualBlock<B> {
    pub fn new(input: usize, output: usize, device: &B::Device) -> Self {
        Self {
            conv1:       conv([input, output], 1, 1, 0, 1, device),
            bn1:         norm(output, device),
            conv2:       conv([output, output], 3, 2, 1, GROUPS, device),
            bn2:         norm(output, device),
            conv3:       conv([output, output], 1, 1, 0, 1, device),
            bn3:         norm(output, device),
            shortcut:    conv([input, output], 3, 2, 1, 1, device),
            shortcut_bn: norm(output, device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let main = relu(self.bn1.forward(self.conv1.forward(x.clone())));
        let main = relu(self.bn2.forward(self.conv2.forward(main)));
        let main = self.bn3.forward(self.conv3.forward(main));
        let skip = self.shortcut_bn.forward(self.shortcut.forward(x));
        relu(main + skip)
    }
}

// ─── Full network ─────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SteganalysisNet<B: Backend> {
    pub preprocess: HighPassFilter<B>,
    pub group1:     PlainBlock<B>,
    pub group2:     PooledResidualBlock<B>,
    pub group3:     GroupedResidualBlock<B>,
    pub group4:     PooledResidualBlock<B>,
    pub group5:     PlainBlock<B>,
    pub pool:       AdaptiveAvgPool2d,
    pub fc:         Linear<B>,
}

impl<B: Backend> SteganalysisNet<B> {
    /// images: [N, 3, H, W] raw pixels → logits: [N, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.preprocess.forward(images);
        let x = self.group1.forward(x);
        let x = self.group2.forward(x);
        let x = self.group3.forward(x);
        let x = self.group4.forward(x);
        let x = self.group5.forward(x);
        let x = self.pool.forward(x).flatten::<2>(1, 3);
        self.fc.forward(x)
    }

    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn images(n: usize, size: usize) -> Tensor<TestBackend, 4> {
        Tensor::random(
            [n, 3, size, size],
            burn::tensor::Distribution::Uniform(0.0, 255.0),
            &Default::default(),
        )
    }

    #[test]
    fn test_high_pass_output_is_truncated() {
        let hpf = HighPassFilter::<TestBackend>::new(2.0, &Default::default());
        let out = hpf.forward(images(2, 8));

        assert_eq!(out.dims(), [2, RESIDUAL_CHANNELS, 8, 8]);
        let max = out.abs().max().into_scalar().elem::<f32>();
        assert!(max <= 2.0 + 1e-6);
    }

    #[test]
    fn test_high_pass_channels_are_colour_major() {
        let device = Default::default();
        let hpf    = HighPassFilter::<TestBackend>::new(2.0, &device);
        let x      = images(1, 8);
        let out    = hpf.forward(x.clone());

        let pad = KERNEL_SIZE / 2;
        for c in 0..3 {
            let expected = conv2d(
                x.clone().slice([0..1, c..c + 1]),
                hpf.weight.val(),
                None,
                ConvOptions::new([1, 1], [pad, pad], [1, 1], 1),
            )
            .clamp(-2.0, 2.0);
            let actual = out
                .clone()
                .slice([0..1, c * FILTER_COUNT..(c + 1) * FILTER_COUNT]);

            let diff = (actual - expected).abs().max().into_scalar().elem::<f32>();
            assert!(diff < 1e-5, "colour {c} differs by {diff}");
        }
    }

    #[test]
    fn test_flat_image_has_zero_srm_residual_inside() {
        let hpf = HighPassFilter::<TestBackend>::new(2.0, &Default::default());
        let flat = Tensor::<TestBackend, 4>::full([1, 3, 9, 9], 100.0, &Default::default());
        let out = hpf.forward(flat);

        // SRM kernels sum to zero, so away from the zero-padded border the
        // response of every SRM filter on a constant image vanishes.
        let centre = out
            .slice([0..1, 0..30, 4..5, 4..5])
            .abs()
            .max()
            .into_scalar()
            .elem::<f32>();
        assert!(centre < 1e-3);
    }

    #[test]
    fn test_residual_blocks_halve_resolution() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([2, 32, 16, 16], &device);

        let pooled = PooledResidualBlock::<TestBackend>::new(32, 48, &device);
        assert_eq!(pooled.forward(x.clone()).dims(), [2, 48, 8, 8]);

        let grouped = GroupedResidualBlock::<TestBackend>::new(32, 64, &device);
        assert_eq!(grouped.forward(x).dims(), [2, 64, 8, 8]);
    }

    #[test]
    fn test_network_produces_two_logits_per_image() {
        let model = SteganalysisNetConfig::new().init::<TestBackend>(&Default::default());
        let out   = model.forward(images(4, 16));
        assert_eq!(out.dims(), [4, 2]);
    }

    #[test]
    fn test_conv_bias_is_bounded_by_fan_in() {
        let model = SteganalysisNetConfig::new().init::<TestBackend>(&Default::default());

        let bias  = model.group1.conv1.bias.as_ref().unwrap().val();
        let bound = bias_bound(RESIDUAL_CHANNELS * 9) as f32;
        let max   = bias.abs().max().into_scalar().elem::<f32>();
        assert!(max <= bound);
        assert!(max > 0.0);

        // Grouped 3×3: fan-in is 64 / 32 · 9
        let bias  = model.group3.conv2.bias.as_ref().unwrap().val();
        let bound = bias_bound(2 * 9) as f32;
        assert!(bias.abs().max().into_scalar().elem::<f32>() <= bound);
    }

    #[test]
    fn test_head_bias_starts_at_zero() {
        let model = SteganalysisNetConfig::new().init::<TestBackend>(&Default::default());
        let bias  = model.fc.bias.as_ref().unwrap().val();
        let sum   = bias.abs().sum().into_scalar().elem::<f32>();
        assert_eq!(sum, 0.0);
    }
}
