//! ResNet-18 Architecture for Growth Stage Classification
//!
//! Standard ResNet-18 (four stages of two basic blocks) laid out so that the
//! module tree mirrors torchvision's parameter names. That lets ImageNet
//! weights exported from PyTorch load directly into it; only the 1000-way
//! `fc` head is swapped for one sized to the growth-stage classes.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Width of the pooled feature vector feeding the classification head
pub const FEATURE_WIDTH: usize = 512;

/// Number of ImageNet classes the published weights were trained on
pub const IMAGENET_CLASSES: usize = 1000;

/// Channel widths of the four ResNet-18 stages
pub const STAGE_WIDTHS: [usize; 4] = [64, 128, 256, FEATURE_WIDTH];

/// 1x1 projection used when a block changes resolution or width
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
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

/// Two 3x3 convolutions with a residual connection
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    pub conv1: Conv2d<B>,
    pub bn1: BatchNorm<B, 2>,
    pub conv2: Conv2d<B>,
    pub bn2: BatchNorm<B, 2>,
    pub relu: Relu,
    pub downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    /// Create a new basic block
    pub fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(out_channels).init(device);

        let conv2 = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let bn2 = BatchNormConfig::new(out_channels).init(device);

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
            relu: Relu::new(),
            downsample,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.conv1.forward(x);
        let out = self.bn1.forward(out);
        let out = self.relu.forward(out);
        let out = self.conv2.forward(out);
        let out = self.bn2.forward(out);

        self.relu.forward(out + identity)
    }
}

/// ResNet-18 classifier
///
/// Architecture:
/// - 7x7 stride-2 stem, BatchNorm, ReLU, 3x3 stride-2 max pool
/// - 4 stages of 2 basic blocks (64, 128, 256, 512 channels)
/// - Global average pooling
/// - Linear head producing one logit per class
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub conv1: Conv2d<B>,
    pub bn1: BatchNorm<B, 2>,
    pub relu: Relu,
    pub maxpool: MaxPool2d,

    pub layer1: Vec<BasicBlock<B>>,
    pub layer2: Vec<BasicBlock<B>>,
    pub layer3: Vec<BasicBlock<B>>,
    pub layer4: Vec<BasicBlock<B>>,

    pub avgpool: AdaptiveAvgPool2d,
    pub fc: Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// Create a randomly initialized ResNet-18 with `num_classes` outputs
    pub fn new(num_classes: usize, device: &B::Device) -> Self {
        Self::with_widths(num_classes, STAGE_WIDTHS, device)
    }

    /// Same topology with custom stage widths
    pub fn with_widths(num_classes: usize, widths: [usize; 4], device: &B::Device) -> Self {
        let [w1, w2, w3, w4] = widths;
        let conv1 = Conv2dConfig::new([3, w1], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(w1).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        // Resolution halves from stage 2 on
        let layer1 = Self::make_stage(w1, w1, 1, device);
        let layer2 = Self::make_stage(w1, w2, 2, device);
        let layer3 = Self::make_stage(w2, w3, 2, device);
        let layer4 = Self::make_stage(w3, w4, 2, device);

        let avgpool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc = LinearConfig::new(w4, num_classes).init(device);

        Self {
            conv1,
            bn1,
            relu: Relu::new(),
            maxpool,
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool,
            fc,
        }
    }

    fn make_stage(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        device: &B::Device,
    ) -> Vec<BasicBlock<B>> {
        vec![
            BasicBlock::new(in_channels, out_channels, stride, device),
            BasicBlock::new(out_channels, out_channels, 1, device),
        ]
    }

    /// Swap the classification head for a freshly initialized `features -> num_classes` layer
    ///
    /// Every other parameter is left untouched.
    pub fn replace_head(mut self, num_classes: usize, device: &B::Device) -> Self {
        let [features, _] = self.fc.weight.dims();
        self.fc = LinearConfig::new(features, num_classes).init(device);
        self
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.bn1.forward(x);
        let x = self.relu.forward(x);
        let x = self.maxpool.forward(x);

        let x = self.layer1.iter().fold(x, |x, block| block.forward(x));
        let x = self.layer2.iter().fold(x, |x, block| block.forward(x));
        let x = self.layer3.iter().fold(x, |x, block| block.forward(x));
        let x = self.layer4.iter().fold(x, |x, block| block.forward(x));

        // [B, 512, H, W] -> [B, 512, 1, 1] -> [B, 512]
        let x = self.avgpool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        self.fc.forward(x)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        let [_, num_classes] = self.fc.weight.dims();
        num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNet::new(4, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 4]);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_downsample_only_where_shape_changes() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNet::new(2, &device);

        assert!(model.layer1.iter().all(|b| b.downsample.is_none()));
        for stage in [&model.layer2, &model.layer3, &model.layer4] {
            assert!(stage[0].downsample.is_some());
            assert!(stage[1].downsample.is_none());
        }
    }

    #[test]
    fn test_replace_head_keeps_backbone() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNet::new(IMAGENET_CLASSES, &device);
        let stem_before = model.conv1.weight.val().into_data();

        let model = model.replace_head(3, &device);
        assert_eq!(model.num_classes(), 3);
        assert_eq!(model.conv1.weight.val().into_data(), stem_before);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 64, 64], &device);
        assert_eq!(model.forward(input).dims(), [1, 3]);
    }
}
