use crate::{adain, config::TransferConfig, net, utils, Error, FeatureNetwork};
use candle_core::{DType, Device, Tensor};
use image::RgbImage;
use std::path::PathBuf;

/// Arbitrary style transfer of one image onto another.
///
/// The engine is built once per run, validating its parameters and loading
/// the networks onto the selected device, and can then stylize any number of
/// image pairs. Calls don't share any state, the same inputs always produce
/// the same output.
///
/// # Example
/// ```no_run
/// let engine = stylize_datasets::StyleTransfer::builder()
///     .alpha(0.8)
///     .style_size(256)
///     .build()
///     .expect("failed to load networks");
///
/// let content = stylize_datasets::load_rgb_image("imgs/cat.jpg".as_ref()).unwrap();
/// let style = stylize_datasets::load_rgb_image("styles/waves.png".as_ref()).unwrap();
/// let stylized = engine.stylize(&content, &style).unwrap();
/// stylized.save("cat-stylized-waves.jpg").unwrap();
/// ```
pub struct StyleTransfer {
    network: Box<dyn FeatureNetwork>,
    params: Parameters,
}

#[derive(Clone)]
struct Parameters {
    alpha: f32,
    content_size: u32,
    style_size: u32,
    crop: bool,
    encoder_weights: PathBuf,
    decoder_weights: PathBuf,
}

impl Default for Parameters {
    fn default() -> Self {
        let config = TransferConfig::default();
        Self {
            alpha: config.alpha,
            content_size: config.content_size,
            style_size: config.style_size,
            crop: config.crop,
            encoder_weights: config.encoder_weights,
            decoder_weights: config.decoder_weights,
        }
    }
}

impl StyleTransfer {
    /// Creates a new builder with default parameters.
    pub fn builder() -> StyleTransferBuilder {
        StyleTransferBuilder::default()
    }

    /// The interpolation factor between stylized and original content
    /// features this engine was built with.
    pub fn alpha(&self) -> f32 {
        self.params.alpha
    }

    /// Transfers the style of `style` onto `content`.
    ///
    /// Both images are preprocessed independently, see
    /// `StyleTransferBuilder::content_size` and
    /// `StyleTransferBuilder::style_size`. The output has the size of the
    /// preprocessed content image.
    pub fn stylize(&self, content: &RgbImage, style: &RgbImage) -> Result<RgbImage, Error> {
        let content = self.preprocess(content, self.params.content_size);
        let style = self.preprocess(style, self.params.style_size);
        let (width, height) = content.dimensions();

        let device = self.network.device();
        let content = to_tensor(&content, device)?;
        let style = to_tensor(&style, device)?;

        let content_features = self.network.extract(&content)?;
        let style_features = self.network.extract(&style)?;

        let aligned = adain::align(&content_features, &style_features)?;
        let features = adain::blend(&aligned, &content_features, f64::from(self.params.alpha))?;

        let decoded = self.network.decode(&features)?;
        to_image(&decoded, width, height)
    }

    fn preprocess(&self, img: &RgbImage, size: u32) -> RgbImage {
        let img = utils::resize_shorter_side(img.clone(), size);
        if self.params.crop {
            utils::center_crop(img, size)
        } else {
            img
        }
    }
}

/// Converts an RGB raster into a `[1, 3, height, width]` tensor with values
/// in `0..=1` on `device`.
fn to_tensor(img: &RgbImage, device: &Device) -> Result<Tensor, Error> {
    let (width, height) = img.dimensions();
    let data: Vec<f32> = img.as_raw().iter().map(|v| f32::from(*v) / 255.0).collect();

    Ok(
        Tensor::from_vec(data, (height as usize, width as usize, 3), &Device::Cpu)?
            .permute((2, 0, 1))?
            .contiguous()?
            .unsqueeze(0)?
            .to_device(device)?,
    )
}

/// Converts a decoded `[1, 3, h, w]` tensor back into an RGB raster, clamped
/// to the displayable range and cropped to at most `width` x `height`.
fn to_image(decoded: &Tensor, width: u32, height: u32) -> Result<RgbImage, Error> {
    let (_, _, h, w) = decoded.dims4()?;
    let h = h.min(height as usize);
    let w = w.min(width as usize);

    let pixels = decoded
        .narrow(2, 0, h)?
        .narrow(3, 0, w)?
        .squeeze(0)?
        .permute((1, 2, 0))?
        .clamp(0f32, 1f32)?
        .affine(255.0, 0.0)?
        .round()?
        .to_dtype(DType::U8)?
        .to_device(&Device::Cpu)?
        .contiguous()?
        .flatten_all()?
        .to_vec1::<u8>()?;

    RgbImage::from_raw(w as u32, h as u32, pixels).ok_or_else(|| {
        Error::Tensor(candle_core::Error::Msg(format!(
            "decoded tensor doesn't hold a {}x{} RGB image",
            w, h
        )))
    })
}

/// Builds a `StyleTransfer` engine, calling `build` validates the parameters
/// and loads the networks.
#[derive(Default)]
pub struct StyleTransferBuilder {
    params: Parameters,
}

impl StyleTransferBuilder {
    /// Creates a new `StyleTransferBuilder`, can also be created via
    /// `StyleTransfer::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every parameter from a transfer config.
    pub fn config(mut self, config: &TransferConfig) -> Self {
        self.params = Parameters {
            alpha: config.alpha,
            content_size: config.content_size,
            style_size: config.style_size,
            crop: config.crop,
            encoder_weights: config.encoder_weights.clone(),
            decoder_weights: config.decoder_weights.clone(),
        };
        self
    }

    /// The degree of stylization, `1.0` fully stylizes the content while
    /// `0.0` reconstructs the content as is. Range (0.0 - 1.0)
    ///
    /// Default: 1.0
    pub fn alpha(mut self, value: f32) -> Self {
        self.params.alpha = value;
        self
    }

    /// Resizes the shorter side of content images to this many pixels before
    /// stylization, `0` keeps the original size.
    ///
    /// Default: 0
    pub fn content_size(mut self, size: u32) -> Self {
        self.params.content_size = size;
        self
    }

    /// Resizes the shorter side of style images to this many pixels before
    /// their statistics are computed, `0` keeps the original size.
    ///
    /// Default: 512
    pub fn style_size(mut self, size: u32) -> Self {
        self.params.style_size = size;
        self
    }

    /// Center crops both images to a square after resizing.
    ///
    /// Default: false
    pub fn crop(mut self, crop: bool) -> Self {
        self.params.crop = crop;
        self
    }

    /// Paths to the pretrained encoder and decoder weights.
    ///
    /// Default: `models/vgg_normalised.pth` and `models/decoder.pth`
    pub fn weights<P: Into<PathBuf>>(mut self, encoder: P, decoder: P) -> Self {
        self.params.encoder_weights = encoder.into();
        self.params.decoder_weights = decoder.into();
        self
    }

    /// Loads the pretrained networks onto the first CUDA device, if there is
    /// one, or the CPU otherwise.
    pub fn build(self) -> Result<StyleTransfer, Error> {
        self.check_parameters_validity()?;

        let device = Device::cuda_if_available(0)?;
        let network = net::VggAutoencoder::load(
            &self.params.encoder_weights,
            &self.params.decoder_weights,
            device,
        )?;

        Ok(StyleTransfer {
            network: Box::new(network),
            params: self.params,
        })
    }

    /// Creates the engine around an already constructed network instead of
    /// loading the pretrained one.
    pub fn build_with_network<N: FeatureNetwork + 'static>(
        self,
        network: N,
    ) -> Result<StyleTransfer, Error> {
        self.check_parameters_validity()?;

        Ok(StyleTransfer {
            network: Box::new(network),
            params: self.params,
        })
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.params.alpha) {
            return Err(Error::out_of_range("alpha", self.params.alpha, 0.0, 1.0));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Identity(Device);

    impl FeatureNetwork for Identity {
        fn device(&self) -> &Device {
            &self.0
        }

        fn extract(&self, image: &Tensor) -> Result<Tensor, Error> {
            Ok(image.clone())
        }

        fn decode(&self, features: &Tensor) -> Result<Tensor, Error> {
            Ok(features.clone())
        }
    }

    fn engine(builder: StyleTransferBuilder) -> StyleTransfer {
        builder.build_with_network(Identity(Device::Cpu)).unwrap()
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 10) as u8, (y * 10) as u8, ((x + y) * 5) as u8])
        })
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        for alpha in [-0.1, 1.01, f32::NAN] {
            match StyleTransfer::builder()
                .alpha(alpha)
                .build_with_network(Identity(Device::Cpu))
            {
                Err(Error::InvalidRange(ir)) => assert_eq!(ir.name, "alpha"),
                _ => panic!("alpha {} was accepted", alpha),
            }
        }
    }

    #[test]
    fn zero_alpha_reconstructs_content() {
        let st = engine(StyleTransfer::builder().alpha(0.0).style_size(0));
        let content = gradient(9, 7);
        let style = RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 50]));

        assert_eq!(st.stylize(&content, &style).unwrap(), content);
    }

    #[test]
    fn full_alpha_takes_style_statistics() {
        let st = engine(StyleTransfer::builder().style_size(0));
        let content = gradient(9, 7);
        let style = RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 50]));

        let out = st.stylize(&content, &style).unwrap();
        assert_eq!(out.dimensions(), (9, 7));
        for px in out.pixels() {
            for (got, want) in px.0.iter().zip([200u8, 10, 50].iter()) {
                assert!((i16::from(*got) - i16::from(*want)).abs() <= 2);
            }
        }
    }

    #[test]
    fn stylize_is_repeatable() {
        let st = engine(StyleTransfer::builder().alpha(0.6).style_size(8));
        let content = gradient(12, 5);
        let style = gradient(20, 20);

        let first = st.stylize(&content, &style).unwrap();
        let second = st.stylize(&content, &style).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn content_is_resized_and_cropped() {
        let st = engine(StyleTransfer::builder().content_size(4).crop(true));
        let out = st.stylize(&gradient(16, 8), &gradient(6, 6)).unwrap();
        assert_eq!(out.dimensions(), (4, 4));

        let st = engine(StyleTransfer::builder().content_size(4));
        let out = st.stylize(&gradient(16, 8), &gradient(6, 6)).unwrap();
        assert_eq!(out.dimensions(), (8, 4));
    }
}
