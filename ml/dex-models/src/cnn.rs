//! The convolutional classifier.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig, Relu};
use burn::prelude::Backend;
use burn::tensor::activation::softmax;
use burn::tensor::{Tensor, TensorData};
use dex_types::{ImageDims, Prediction, Species};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Output channels of the last convolution.
const FINAL_CHANNELS: usize = 128;

/// One step of the feature extractor, used to derive the flattened size.
#[derive(Clone, Copy)]
enum Stage {
    Conv(usize),
    Pool { kernel: usize, stride: usize },
}

/// Spatial stages in forward order.
const STAGES: [Stage; 8] = [
    Stage::Conv(3),
    Stage::Pool {
        kernel: 3,
        stride: 3,
    },
    Stage::Conv(3),
    Stage::Conv(3),
    Stage::Pool {
        kernel: 2,
        stride: 2,
    },
    Stage::Conv(2),
    Stage::Conv(2),
    Stage::Pool {
        kernel: 2,
        stride: 2,
    },
];

/// Configuration for [`DexCnn`].
///
/// # Example
///
/// ```
/// use dex_models::DexCnnConfig;
///
/// let config = DexCnnConfig::default();
/// assert_eq!(config.fc_hidden, 1024);
/// // 96x96 input leaves a 5x5x128 feature map.
/// assert_eq!(config.feature_map_size().unwrap(), 5 * 5 * 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexCnnConfig {
    /// Input image geometry.
    pub dims: ImageDims,

    /// Units in the hidden dense layer.
    pub fc_hidden: usize,

    /// Drop probability after each pooling stage.
    pub conv_dropout: f64,

    /// Drop probability after the hidden dense layer.
    pub fc_dropout: f64,

    /// Standard deviation of the normal weight initialiser.
    pub init_std: f64,
}

impl Default for DexCnnConfig {
    fn default() -> Self {
        Self {
            dims: ImageDims::default(),
            fc_hidden: 1024,
            conv_dropout: 0.25,
            fc_dropout: 0.5,
            init_std: 0.1,
        }
    }
}

impl DexCnnConfig {
    /// Creates the default configuration for the given input size.
    #[must_use]
    pub fn new(dims: ImageDims) -> Self {
        Self {
            dims,
            ..Self::default()
        }
    }

    /// Sets the hidden dense layer width.
    #[must_use]
    pub const fn with_fc_hidden(mut self, fc_hidden: usize) -> Self {
        self.fc_hidden = fc_hidden;
        self
    }

    /// Sets both dropout probabilities.
    #[must_use]
    pub const fn with_dropout(mut self, conv: f64, fc: f64) -> Self {
        self.conv_dropout = conv;
        self.fc_dropout = fc;
        self
    }

    /// Number of features entering the dense head.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the input is too small to
    /// survive every convolution and pooling stage.
    pub fn feature_map_size(&self) -> Result<usize> {
        let mut h = self.dims.height;
        let mut w = self.dims.width;

        for stage in STAGES {
            let (kernel, stride) = match stage {
                Stage::Conv(k) => (k, 1),
                Stage::Pool { kernel, stride } => (kernel, stride),
            };
            if h < kernel || w < kernel {
                return Err(ModelError::invalid_config(format!(
                    "input {} shrinks below a {kernel}x{kernel} window",
                    self.dims
                )));
            }
            h = (h - kernel) / stride + 1;
            w = (w - kernel) / stride + 1;
        }

        Ok(FINAL_CHANNELS * h * w)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !self.dims.is_valid() {
            return Err(ModelError::invalid_config(format!(
                "invalid input dimensions {}",
                self.dims
            )));
        }
        if self.fc_hidden == 0 {
            return Err(ModelError::invalid_config("fc_hidden must be > 0"));
        }
        for (name, p) in [("conv_dropout", self.conv_dropout), ("fc_dropout", self.fc_dropout)] {
            if !(0.0..1.0).contains(&p) {
                return Err(ModelError::invalid_config(format!(
                    "{name} must be in [0, 1), got {p}"
                )));
            }
        }
        if self.init_std <= 0.0 {
            return Err(ModelError::invalid_config("init_std must be > 0"));
        }
        self.feature_map_size().map(|_| ())
    }
}

/// Convolutional classifier for the five species.
///
/// Architecture (VALID padding, stride-1 convolutions):
///
/// ```text
/// conv3x3(32) -> ReLU -> maxpool3/3 -> dropout
/// conv3x3(64) -> ReLU -> conv3x3(64) -> ReLU -> maxpool2/2 -> dropout
/// conv2x2(128) -> ReLU -> conv2x2(128) -> ReLU -> maxpool2/2 -> dropout
/// flatten -> dense(1024) -> ReLU -> dropout -> dense(5)
/// ```
///
/// Dropout only fires on autodiff backends, so inference through
/// [`AutodiffModule::valid`](burn::module::AutodiffModule::valid) or a plain
/// backend is deterministic.
#[derive(Debug, Module)]
pub struct DexCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    conv4: Conv2d<B>,
    conv5: Conv2d<B>,
    pool1: MaxPool2d,
    pool2: MaxPool2d,
    pool3: MaxPool2d,
    conv_dropout: Dropout,
    fc_dropout: Dropout,
    fc1: Linear<B>,
    fc2: Linear<B>,
    activation: Relu,
}

impl<B: Backend> DexCnn<B> {
    /// Creates a freshly initialised network.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: &DexCnnConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let features = config.feature_map_size()?;
        let init = Initializer::Normal {
            mean: 0.0,
            std: config.init_std,
        };
        let conv = |c_in: usize, c_out: usize, k: usize| -> Conv2d<B> {
            Conv2dConfig::new([c_in, c_out], [k, k])
                .with_initializer(init.clone())
                .init(device)
        };
        let pool = |k: usize| MaxPool2dConfig::new([k, k]).with_strides([k, k]).init();

        Ok(Self {
            conv1: conv(config.dims.channels, 32, 3),
            conv2: conv(32, 64, 3),
            conv3: conv(64, 64, 3),
            conv4: conv(64, FINAL_CHANNELS, 2),
            conv5: conv(FINAL_CHANNELS, FINAL_CHANNELS, 2),
            pool1: pool(3),
            pool2: pool(2),
            pool3: pool(2),
            conv_dropout: DropoutConfig::new(config.conv_dropout).init(),
            fc_dropout: DropoutConfig::new(config.fc_dropout).init(),
            fc1: LinearConfig::new(features, config.fc_hidden)
                .with_initializer(init.clone())
                .init(device),
            fc2: LinearConfig::new(config.fc_hidden, Species::COUNT)
                .with_initializer(init)
                .init(device),
            activation: Relu::new(),
        })
    }

    /// Runs the forward pass.
    ///
    /// # Arguments
    ///
    /// - `images`: `[batch, channels, height, width]` scaled to `[0, 1]`
    ///
    /// # Returns
    ///
    /// Logits of shape `[batch, 5]` (not probabilities).
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(images));
        let x = self.conv_dropout.forward(self.pool1.forward(x));

        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.activation.forward(self.conv3.forward(x));
        let x = self.conv_dropout.forward(self.pool2.forward(x));

        let x = self.activation.forward(self.conv4.forward(x));
        let x = self.activation.forward(self.conv5.forward(x));
        let x = self.conv_dropout.forward(self.pool3.forward(x));

        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.fc_dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Softmax class probabilities, shape `[batch, 5]`.
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Classifies a flat NCHW buffer holding one or more images.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] if the buffer is not a whole
    /// number of `dims` images, or [`ModelError::Output`] if the network
    /// produced unusable probabilities.
    pub fn classify_batch(
        &self,
        images: Vec<f32>,
        dims: ImageDims,
        device: &B::Device,
    ) -> Result<Vec<Prediction>> {
        let input = images_to_tensor::<B>(images, dims, device)?;
        let probs = self
            .probabilities(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ModelError::output(format!("{e:?}")))?;

        probs
            .chunks(Species::COUNT)
            .map(|row| Prediction::from_probabilities(row).map_err(ModelError::from))
            .collect()
    }

    /// Classifies a single CHW image.
    ///
    /// # Errors
    ///
    /// As [`Self::classify_batch`], plus [`ModelError::ShapeMismatch`]
    /// when the buffer holds more than one image.
    pub fn classify(
        &self,
        image_chw: Vec<f32>,
        dims: ImageDims,
        device: &B::Device,
    ) -> Result<Prediction> {
        if image_chw.len() != dims.pixel_len() {
            return Err(ModelError::shape_mismatch(
                format!("{:?}", dims.chw()),
                format!("{} values", image_chw.len()),
            ));
        }
        self.classify_batch(image_chw, dims, device)?
            .pop()
            .ok_or_else(|| ModelError::output("empty prediction batch"))
    }
}

/// Wraps a flat NCHW buffer in a `[batch, channels, height, width]` tensor.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the buffer is empty or not a
/// whole number of images.
pub fn images_to_tensor<B: Backend>(
    images: Vec<f32>,
    dims: ImageDims,
    device: &B::Device,
) -> Result<Tensor<B, 4>> {
    let per_image = dims.pixel_len();
    if per_image == 0 || images.is_empty() || images.len() % per_image != 0 {
        return Err(ModelError::shape_mismatch(
            format!("multiple of {per_image} values ({dims})"),
            format!("{} values", images.len()),
        ));
    }
    let batch = images.len() / per_image;
    let [c, h, w] = dims.chw();
    Ok(Tensor::from_data(
        TensorData::new(images, [batch, c, h, w]),
        device,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::module::AutodiffModule;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;
    type TrainBackend = Autodiff<TestBackend>;

    fn small_config() -> DexCnnConfig {
        DexCnnConfig::new(ImageDims::square_rgb(48)).with_fc_hidden(16)
    }

    #[test]
    fn feature_map_size_default() {
        assert_eq!(DexCnnConfig::default().feature_map_size().unwrap(), 3200);
    }

    #[test]
    fn feature_map_size_small_input() {
        assert_eq!(small_config().feature_map_size().unwrap(), 128);
        assert!(DexCnnConfig::new(ImageDims::square_rgb(20))
            .feature_map_size()
            .is_err());
    }

    #[test]
    fn config_validation() {
        assert!(DexCnnConfig::default().validate().is_ok());
        assert!(DexCnnConfig::default().with_fc_hidden(0).validate().is_err());
        assert!(DexCnnConfig::default().with_dropout(1.0, 0.5).validate().is_err());
        assert!(DexCnnConfig::new(ImageDims::new(96, 96, 4)).validate().is_err());
    }

    #[test]
    fn dropout_rates_are_drop_probabilities() {
        let model = DexCnn::<TestBackend>::new(&small_config(), &Default::default()).unwrap();
        assert!((model.conv_dropout.prob - 0.25).abs() < f64::EPSILON);
        assert!((model.fc_dropout.prob - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serialization() {
        let config = DexCnnConfig::default();
        let json = serde_json::to_string(&config).unwrap_or_default();
        let parsed: std::result::Result<DexCnnConfig, _> = serde_json::from_str(&json);
        assert_eq!(parsed.ok(), Some(config));
    }

    #[test]
    fn forward_full_size() {
        let device = Default::default();
        let model = DexCnn::<TestBackend>::new(&DexCnnConfig::default(), &device).unwrap();
        let output = model.forward(Tensor::zeros([1, 3, 96, 96], &device));
        assert_eq!(output.dims(), [1, 5]);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let device = Default::default();
        let model = DexCnn::<TestBackend>::new(&small_config(), &device).unwrap();
        let probs = model
            .probabilities(Tensor::ones([3, 3, 48, 48], &device))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(probs.len(), 15);
        for row in probs.chunks(5) {
            assert_relative_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn classify_single_image() {
        let device = Default::default();
        let config = small_config();
        let model = DexCnn::<TestBackend>::new(&config, &device).unwrap();
        let prediction = model
            .classify(vec![0.5; config.dims.pixel_len()], config.dims, &device)
            .unwrap();
        assert!((0.0..=100.0).contains(&prediction.confidence_percent()));
        assert!(prediction.confidence >= 0.2 - 1e-6);
    }

    #[test]
    fn classify_rejects_wrong_length() {
        let device = Default::default();
        let config = small_config();
        let model = DexCnn::<TestBackend>::new(&config, &device).unwrap();
        let err = model.classify(vec![0.5; 10], config.dims, &device).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }

    #[test]
    fn images_to_tensor_shapes() {
        let device = Default::default();
        let dims = ImageDims::new(2, 3, 1);
        let tensor = images_to_tensor::<TestBackend>(vec![0.0; 12], dims, &device).unwrap();
        assert_eq!(tensor.dims(), [2, 1, 2, 3]);
        assert!(images_to_tensor::<TestBackend>(vec![0.0; 7], dims, &device).is_err());
        assert!(images_to_tensor::<TestBackend>(Vec::new(), dims, &device).is_err());
    }

    #[test]
    fn valid_model_is_deterministic() {
        let device = Default::default();
        let model = DexCnn::<TrainBackend>::new(&small_config(), &device).unwrap();
        let inference = model.valid();

        let input = Tensor::<TestBackend, 4>::ones([2, 3, 48, 48], &device);
        let a = inference.forward(input.clone()).into_data();
        let b = inference.forward(input).into_data();
        a.assert_approx_eq(&b, 5);
    }
}
