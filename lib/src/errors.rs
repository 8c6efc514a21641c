use std::{fmt, path::PathBuf};

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error in the image library occurred, eg failed to decode/encode
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// Io is notoriously error free with no problems, but we cover it just in case!
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A tensor operation failed while running one of the networks
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
    /// An input parameter had an invalid range specified
    #[error("{0}")]
    InvalidRange(InvalidRange),
    /// A directory that must exist before processing starts doesn't
    #[error("directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),
    /// No file matching any of the extensions was found under a root
    #[error("no images with extension(s) {extensions:?} found in '{}'", root.display())]
    EmptyDataset {
        root: PathBuf,
        extensions: Vec<String>,
    },
    /// The list of file extensions to search for was empty
    #[error("no file extensions specified")]
    NoExtensions,
    /// More distinct styles were requested per content image than exist
    #[error("{requested} style(s) requested per image, but only {available} style image(s) were found")]
    TooManyStyles { requested: usize, available: usize },
    /// An `image_dirs` entry is not a usable directory of the dataset
    #[error("image directory '{0}' is not a directory of the dataset or is blacklisted")]
    InvalidImageDir(String),
    /// The config file could not be understood
    #[error("invalid config '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },
    /// Pretrained weights could not be read, this is always fatal
    #[error("failed to load weights from '{}': {source}", path.display())]
    Weights {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },
    /// Every style drawn for a content image failed to decode
    #[error("gave up on '{}' after {attempts} style image(s) failed to decode", content.display())]
    StyleAttemptsExhausted { content: PathBuf, attempts: usize },
}

impl Error {
    /// True for errors raised while validating inputs, before any image is
    /// processed
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange(_)
                | Self::MissingDirectory(_)
                | Self::EmptyDataset { .. }
                | Self::NoExtensions
                | Self::TooManyStyles { .. }
                | Self::InvalidImageDir(_)
                | Self::Config { .. }
        )
    }

    pub(crate) fn out_of_range(name: &'static str, value: f32, min: f32, max: f32) -> Self {
        Self::InvalidRange(InvalidRange {
            min,
            max,
            value,
            name,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_range_message() {
        let err = Error::out_of_range("alpha", 1.5, 0.0, 1.0);
        assert_eq!(
            err.to_string(),
            "parameter 'alpha' - value '1.5' is outside the range of 0-1"
        );
        assert!(err.is_config());
    }

    #[test]
    fn io_errors_are_not_config_errors() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!err.is_config());
    }
}
