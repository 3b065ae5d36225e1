//! Classification loss and accuracy.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::Backend;
use burn::tensor::{ElementConversion, Int, Tensor, TensorData};

/// Builds a `[batch]` integer tensor of class indices.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn labels_to_tensor<B: Backend>(labels: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let data: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
    let len = data.len();
    Tensor::from_data(TensorData::new(data, [len]), device)
}

/// Mean softmax cross-entropy of `logits` (`[batch, classes]`) against
/// class indices.
///
/// The softmax is applied here; pass raw logits.
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, targets)
}

/// Number of rows whose arg-max matches the target index.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn correct_count<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch, _] = logits.dims();
    let predicted = logits.argmax(1).reshape([batch]);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>()
        .max(0) as usize
}
