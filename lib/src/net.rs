//! The pretrained encoder/decoder pair used for style transfer.
//!
//! The encoder is the normalised VGG-19 cut off at `relu4_1`, the decoder
//! mirrors it back to an RGB image. Both only ever run in inference mode.

use crate::Error;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Module, VarBuilder};
use std::path::Path;

/// The capability the style transfer engine needs from a network: map an
/// image tensor into feature space and back again.
///
/// Tensors are `[batch, channels, height, width]`, images are RGB with
/// values in `0..=1`.
pub trait FeatureNetwork {
    /// The device holding the network weights, inputs are moved here before
    /// being fed to `extract`
    fn device(&self) -> &Device;

    fn extract(&self, image: &Tensor) -> Result<Tensor, Error>;

    fn decode(&self, features: &Tensor) -> Result<Tensor, Error>;
}

#[derive(Clone, Copy)]
enum Stage {
    /// A convolution, 3x3 kernels get a one pixel reflection pad first
    Conv {
        index: usize,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        relu: bool,
    },
    /// 2x2 max pool with stride 2, rounding the output size up
    Pool,
    /// 2x nearest neighbour upsampling
    Upsample,
}

const fn conv(index: usize, in_channels: usize, out_channels: usize) -> Stage {
    Stage::Conv {
        index,
        in_channels,
        out_channels,
        kernel: 3,
        relu: true,
    }
}

// Indices are the positions of the layers in the sequential models the
// weights were exported from, they name the parameters.
const ENCODER: &[Stage] = &[
    Stage::Conv {
        index: 0,
        in_channels: 3,
        out_channels: 3,
        kernel: 1,
        relu: false,
    },
    conv(2, 3, 64),
    conv(5, 64, 64),
    Stage::Pool,
    conv(9, 64, 128),
    conv(12, 128, 128),
    Stage::Pool,
    conv(16, 128, 256),
    conv(19, 256, 256),
    conv(22, 256, 256),
    conv(25, 256, 256),
    Stage::Pool,
    conv(29, 256, 512),
];

const DECODER: &[Stage] = &[
    conv(1, 512, 256),
    Stage::Upsample,
    conv(5, 256, 256),
    conv(8, 256, 256),
    conv(11, 256, 256),
    conv(14, 256, 128),
    Stage::Upsample,
    conv(18, 128, 128),
    conv(21, 128, 64),
    Stage::Upsample,
    conv(25, 64, 64),
    Stage::Conv {
        index: 28,
        in_channels: 64,
        out_channels: 3,
        kernel: 3,
        relu: false,
    },
];

enum Layer {
    Conv { conv: Conv2d, pad: bool, relu: bool },
    Pool,
    Upsample,
}

struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    fn load(stages: &[Stage], vb: &VarBuilder<'_>) -> candle_core::Result<Self> {
        let layers = stages
            .iter()
            .map(|stage| {
                Ok(match *stage {
                    Stage::Conv {
                        index,
                        in_channels,
                        out_channels,
                        kernel,
                        relu,
                    } => Layer::Conv {
                        conv: candle_nn::conv2d(
                            in_channels,
                            out_channels,
                            kernel,
                            Conv2dConfig::default(),
                            vb.pp(index.to_string()),
                        )?,
                        pad: kernel > 1,
                        relu,
                    },
                    Stage::Pool => Layer::Pool,
                    Stage::Upsample => Layer::Upsample,
                })
            })
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self { layers })
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = match layer {
                Layer::Conv { conv, pad, relu } => {
                    let padded = if *pad { reflection_pad(&x)? } else { x };
                    let out = conv.forward(&padded)?;
                    if *relu {
                        out.relu()?
                    } else {
                        out
                    }
                }
                Layer::Pool => max_pool_ceil(&x)?,
                Layer::Upsample => {
                    let (_, _, h, w) = x.dims4()?;
                    x.upsample_nearest2d(h * 2, w * 2)?
                }
            };
        }
        Ok(x)
    }
}

/// Pads both spatial dimensions by one, mirroring around the edge without
/// repeating it.
fn reflection_pad(x: &Tensor) -> candle_core::Result<Tensor> {
    let (_, _, height, width) = x.dims4()?;
    let x = reflect_dim(x, 2, height)?;
    reflect_dim(&x, 3, width)
}

fn reflect_dim(x: &Tensor, dim: usize, len: usize) -> candle_core::Result<Tensor> {
    // nothing to mirror
    if len < 2 {
        return x.pad_with_same(dim, 1, 1);
    }

    let first = x.narrow(dim, 1, 1)?;
    let last = x.narrow(dim, len - 2, 1)?;
    Tensor::cat(&[&first, x, &last], dim)
}

fn max_pool_ceil(x: &Tensor) -> candle_core::Result<Tensor> {
    let (_, _, height, width) = x.dims4()?;
    let mut x = x.clone();
    // Repeating the last row/column gives the same maximum as a partial window
    if height % 2 == 1 {
        x = x.pad_with_same(2, 0, 1)?;
    }
    if width % 2 == 1 {
        x = x.pad_with_same(3, 0, 1)?;
    }
    x.max_pool2d(2)
}

/// Encoder and decoder loaded from pretrained weight files, resident on a
/// single device for their whole lifetime.
pub struct VggAutoencoder {
    encoder: Sequential,
    decoder: Sequential,
    device: Device,
}

impl VggAutoencoder {
    /// Loads both networks onto `device`.
    ///
    /// Files ending in `.safetensors` are memory mapped, anything else is read
    /// as a pickled PyTorch state dict. Failing to load either file is fatal.
    pub fn load(encoder_weights: &Path, decoder_weights: &Path, device: Device) -> Result<Self, Error> {
        let encoder_vb = var_builder(encoder_weights, &device)?;
        let decoder_vb = var_builder(decoder_weights, &device)?;

        let encoder = Sequential::load(ENCODER, &encoder_vb).map_err(|source| Error::Weights {
            path: encoder_weights.to_owned(),
            source,
        })?;
        let decoder = Sequential::load(DECODER, &decoder_vb).map_err(|source| Error::Weights {
            path: decoder_weights.to_owned(),
            source,
        })?;

        tracing::info!(
            encoder = %encoder_weights.display(),
            decoder = %decoder_weights.display(),
            device = ?device,
            "loaded style transfer networks"
        );

        Ok(Self {
            encoder,
            decoder,
            device,
        })
    }

    /// Builds the networks from already opened variable stores.
    pub fn from_var_builders(
        encoder: &VarBuilder<'_>,
        decoder: &VarBuilder<'_>,
        device: Device,
    ) -> Result<Self, Error> {
        Ok(Self {
            encoder: Sequential::load(ENCODER, encoder)?,
            decoder: Sequential::load(DECODER, decoder)?,
            device,
        })
    }
}

#[allow(unsafe_code)]
fn var_builder(path: &Path, device: &Device) -> Result<VarBuilder<'static>, Error> {
    let vb = match path.extension().and_then(|ext| ext.to_str()) {
        // SAFETY: the weight files are read-only inputs that are not
        // modified while the run is in progress
        Some("safetensors") => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)
        },
        _ => VarBuilder::from_pth(path, DType::F32, device),
    };

    vb.map_err(|source| Error::Weights {
        path: path.to_owned(),
        source,
    })
}

impl FeatureNetwork for VggAutoencoder {
    fn device(&self) -> &Device {
        &self.device
    }

    fn extract(&self, image: &Tensor) -> Result<Tensor, Error> {
        Ok(self.encoder.forward(image)?)
    }

    fn decode(&self, features: &Tensor) -> Result<Tensor, Error> {
        Ok(self.decoder.forward(features)?)
    }
}
