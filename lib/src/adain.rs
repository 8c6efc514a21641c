//! Adaptive instance normalization.
//!
//! Content features are re-centered and re-scaled per channel so their
//! first and second order statistics match those of the style features,
//! while the spatial layout of the content is untouched.

use crate::Error;
use candle_core::{Tensor, D};

/// Added to the variance before taking the square root, keeps near constant
/// channels from dividing by zero.
pub const STD_EPSILON: f64 = 1e-5;

/// Per channel statistics of a `[batch, channels, height, width]` feature
/// tensor, both shaped `[batch, channels, 1, 1]` so they broadcast back.
pub struct ChannelStats {
    pub mean: Tensor,
    pub std: Tensor,
}

/// Computes the per channel mean and standard deviation over the spatial
/// extent of `features`.
///
/// The variance is the unbiased estimator, a 1x1 map divides by 1.
pub fn channel_stats(features: &Tensor) -> Result<ChannelStats, Error> {
    let (batch, channels, height, width) = features.dims4()?;
    let count = height * width;

    let flat = features.reshape((batch, channels, count))?;
    let mean = flat.mean_keepdim(D::Minus1)?;

    let divisor = count.saturating_sub(1).max(1) as f64;
    let var = flat
        .broadcast_sub(&mean)?
        .sqr()?
        .sum_keepdim(D::Minus1)?
        .affine(1.0 / divisor, STD_EPSILON)?;

    Ok(ChannelStats {
        mean: mean.reshape((batch, channels, 1, 1))?,
        std: var.sqrt()?.reshape((batch, channels, 1, 1))?,
    })
}

/// Rewrites the statistics of `content` to those of `style`.
///
/// `((content - mean_c) / std_c) * std_s + mean_s`, channel by channel.
/// Both tensors need the same channel count, their spatial sizes may differ.
pub fn align(content: &Tensor, style: &Tensor) -> Result<Tensor, Error> {
    let content_stats = channel_stats(content)?;
    let style_stats = channel_stats(style)?;

    let normalized = content
        .broadcast_sub(&content_stats.mean)?
        .broadcast_div(&content_stats.std)?;

    Ok(normalized
        .broadcast_mul(&style_stats.std)?
        .broadcast_add(&style_stats.mean)?)
}

/// Linear interpolation between fully stylized and untouched content
/// features, `alpha * aligned + (1 - alpha) * content`.
pub fn blend(aligned: &Tensor, content: &Tensor, alpha: f64) -> Result<Tensor, Error> {
    if alpha >= 1.0 {
        return Ok(aligned.clone());
    }
    if alpha <= 0.0 {
        return Ok(content.clone());
    }

    let stylized = aligned.affine(alpha, 0.0)?;
    Ok(stylized.add(&content.affine(1.0 - alpha, 0.0)?)?)
}
