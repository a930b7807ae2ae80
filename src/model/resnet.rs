//! ResNet-50 for CIFAR classification.
//!
//! The standard bottleneck architecture: 7x7/2 stem, 3x3/2 max-pool, four
//! bottleneck stages of [3, 4, 6, 3] blocks, global average pooling, and an
//! optional fully connected classifier head. Without the head the network
//! outputs the pooled 2048-dimensional feature vector.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use super::Classifier;

/// Width of the pooled feature vector (512 * expansion)
pub const FEATURE_DIM: usize = 2048;

/// Bottleneck channel expansion factor
const EXPANSION: usize = 4;

/// Blocks per stage for the 50-layer variant
const STAGE_BLOCKS: [usize; 4] = [3, 4, 6, 3];

/// Configuration for the ResNet-50 network
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Number of output classes
    #[config(default = "10")]
    pub num_classes: usize,

    /// Whether to attach the fully connected classifier head
    #[config(default = "true")]
    pub include_top: bool,
}

impl ResNetConfig {
    /// Initialize the network on the given device
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        ResNet::new(self, device)
    }
}

/// Strided 1x1 projection matching the residual to the block output shape
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [1, 1])
            .with_stride([stride, stride])
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// A 1x1 -> 3x3 -> 1x1 bottleneck block with identity shortcut
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B, 2>,
    conv3: Conv2d<B>,
    bn3: BatchNorm<B, 2>,
    downsample: Option<Downsample<B>>,
    relu: Relu,
}

impl<B: Backend> Bottleneck<B> {
    fn new(in_channels: usize, mid_channels: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = mid_channels * EXPANSION;

        let conv1 = Conv2dConfig::new([in_channels, mid_channels], [1, 1])
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(mid_channels).init(device);

        let conv2 = Conv2dConfig::new([mid_channels, mid_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn2 = BatchNormConfig::new(mid_channels).init(device);

        let conv3 = Conv2dConfig::new([mid_channels, out_channels], [1, 1])
            .with_bias(false)
            .init(device);
        let bn3 = BatchNormConfig::new(out_channels).init(device);

        let downsample = if stride != 1 || in_channels != out_channels {
            Some(Downsample::new(in_channels, out_channels, stride, device))
        } else {
            None
        };

        Self {
            conv1,
            bn1,
            conv2,
            bn2,
            conv3,
            bn3,
            downsample,
            relu: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.relu.forward(self.bn2.forward(self.conv2.forward(out)));
        let out = self.bn3.forward(self.conv3.forward(out));

        self.relu.forward(out + residual)
    }
}

/// ResNet-50
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B, 2>,
    relu: Relu,
    maxpool: MaxPool2d,

    layer1: Vec<Bottleneck<B>>,
    layer2: Vec<Bottleneck<B>>,
    layer3: Vec<Bottleneck<B>>,
    layer4: Vec<Bottleneck<B>>,

    global_pool: AdaptiveAvgPool2d,

    /// Classifier head, absent when built without the top
    fc: Option<Linear<B>>,

    num_classes: usize,
}

impl<B: Backend> ResNet<B> {
    /// Create a new ResNet-50 from configuration
    pub fn new(config: &ResNetConfig, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([3, 64], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(64).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let layer1 = Self::make_stage(64, 64, STAGE_BLOCKS[0], 1, device);
        let layer2 = Self::make_stage(64 * EXPANSION, 128, STAGE_BLOCKS[1], 2, device);
        let layer3 = Self::make_stage(128 * EXPANSION, 256, STAGE_BLOCKS[2], 2, device);
        let layer4 = Self::make_stage(256 * EXPANSION, 512, STAGE_BLOCKS[3], 2, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let fc = if config.include_top {
            Some(LinearConfig::new(FEATURE_DIM, config.num_classes).init(device))
        } else {
            None
        };

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            maxpool,
            layer1,
            layer2,
            layer3,
            layer4,
            global_pool,
            fc,
            num_classes: config.num_classes,
        }
    }

    /// Build one bottleneck stage; only the first block strides
    fn make_stage(
        in_channels: usize,
        mid_channels: usize,
        blocks: usize,
        stride: usize,
        device: &B::Device,
    ) -> Vec<Bottleneck<B>> {
        let mut stage = Vec::with_capacity(blocks);
        stage.push(Bottleneck::new(in_channels, mid_channels, stride, device));
        for _ in 1..blocks {
            stage.push(Bottleneck::new(
                mid_channels * EXPANSION,
                mid_channels,
                1,
                device,
            ));
        }
        stage
    }

    /// Forward pass.
    ///
    /// Returns `[batch, num_classes]` logits with the head, or the pooled
    /// `[batch, 2048]` features without it.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let x = self.maxpool.forward(x);

        let x = self.layer1.iter().fold(x, |x, block| block.forward(x));
        let x = self.layer2.iter().fold(x, |x, block| block.forward(x));
        let x = self.layer3.iter().fold(x, |x, block| block.forward(x));
        let x = self.layer4.iter().fold(x, |x, block| block.forward(x));

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        match &self.fc {
            Some(fc) => fc.forward(x),
            None => x,
        }
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Whether the classifier head is attached
    pub fn has_top(&self) -> bool {
        self.fc.is_some()
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl<B: Backend> Classifier<B> for ResNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        ResNet::forward(self, images)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};

    #[test]
    fn test_resnet50_logits_shape() {
        let device = default_device();
        let model = ResNetConfig::new()
            .with_num_classes(100)
            .init::<DefaultBackend>(&device);

        let input = Tensor::<DefaultBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 100]);
        assert!(model.has_top());
    }

    #[test]
    fn test_resnet50_feature_shape_without_top() {
        let device = default_device();
        let model = ResNetConfig::new()
            .with_include_top(false)
            .init::<DefaultBackend>(&device);

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [1, FEATURE_DIM]);
        assert!(!model.has_top());
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = default_device();
        let model = ResNetConfig::new()
            .with_num_classes(10)
            .init::<DefaultBackend>(&device);

        let input = Tensor::<DefaultBackend, 4>::random(
            [1, 3, 32, 32],
            burn::tensor::Distribution::Default,
            &device,
        );
        let probs = model.forward_softmax(input);
        let sum: f32 = probs.into_data().to_vec::<f32>().unwrap().iter().sum();

        assert!((sum - 1.0).abs() < 1e-4);
    }
}
