//! Configuration of a stylization run.
//!
//! Configs can be built in code or loaded from TOML or JSON files with
//! [`ConfigLoader`]. Every config is checked with `validate()` before any
//! image is touched.

use crate::{dataset::EntrySelection, walker::DEFAULT_EXTENSIONS, Error};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect()
}

/// Parameters of the style transfer engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Degree of stylization, 0.0 keeps the content, 1.0 fully stylizes it
    pub alpha: f32,
    /// Shorter side of content images after resizing, 0 keeps the original size
    pub content_size: u32,
    /// Shorter side of style images after resizing, 0 keeps the original size
    pub style_size: u32,
    /// Center crop images to a square after resizing
    pub crop: bool,
    pub encoder_weights: PathBuf,
    pub decoder_weights: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            content_size: 0,
            style_size: 512,
            crop: false,
            encoder_weights: PathBuf::from("models/vgg_normalised.pth"),
            decoder_weights: PathBuf::from("models/decoder.pth"),
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::out_of_range("alpha", self.alpha, 0.0, 1.0));
        }
        Ok(())
    }
}

/// Stylizes every image of a directory with `num_styles` randomly sampled
/// styles each, writing the results as new files under `output_root`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    #[serde(alias = "content_dir")]
    pub content_root: PathBuf,
    #[serde(alias = "style_dir")]
    pub style_root: PathBuf,
    #[serde(alias = "output_dir")]
    pub output_root: PathBuf,
    /// Extensions searched for in both the content and the style directory
    pub extensions: Vec<String>,
    pub num_styles: usize,
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub transfer: TransferConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::new(),
            style_root: PathBuf::new(),
            output_root: PathBuf::from("output"),
            extensions: default_extensions(),
            num_styles: 1,
            seed: None,
            transfer: TransferConfig::default(),
        }
    }
}

impl DirectoryConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.transfer.validate()?;
        require_dir(&self.content_root)?;
        require_dir(&self.style_root)?;

        if self.extensions.is_empty() {
            return Err(Error::NoExtensions);
        }
        if self.num_styles == 0 {
            return Err(Error::out_of_range("num-styles", 0.0, 1.0, f32::INFINITY));
        }

        Ok(())
    }
}

/// Copies an annotated dataset and stylizes the images of the copy in
/// place, one random style per image, keeping file names and directory
/// structure untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    #[serde(alias = "dataset_dir")]
    pub dataset_root: PathBuf,
    #[serde(alias = "target_dir")]
    pub target_root: PathBuf,
    #[serde(alias = "style_dir")]
    pub style_root: PathBuf,
    /// Top level entries of the dataset to copy, all others are left out
    pub whitelist: Option<Vec<String>>,
    /// Top level entries of the dataset to leave out, ignored when a
    /// whitelist is given
    pub blacklist: Option<Vec<String>>,
    /// Directories of the dataset to search for images, the whole copy is
    /// searched when not set
    pub image_dirs: Option<Vec<String>>,
    pub content_extensions: Vec<String>,
    pub style_extensions: Vec<String>,
    pub seed: Option<u64>,
    /// How many different styles are tried for a content image before it is
    /// given up on, when styles fail to decode
    pub max_style_attempts: usize,
    #[serde(flatten)]
    pub transfer: TransferConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::new(),
            target_root: PathBuf::new(),
            style_root: PathBuf::new(),
            whitelist: None,
            blacklist: None,
            image_dirs: None,
            content_extensions: default_extensions(),
            style_extensions: default_extensions(),
            seed: None,
            max_style_attempts: 10,
            transfer: TransferConfig::default(),
        }
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.transfer.validate()?;
        require_dir(&self.dataset_root)?;
        require_dir(&self.style_root)?;

        if self.content_extensions.is_empty() || self.style_extensions.is_empty() {
            return Err(Error::NoExtensions);
        }
        if self.max_style_attempts == 0 {
            return Err(Error::out_of_range(
                "max-style-attempts",
                0.0,
                1.0,
                f32::INFINITY,
            ));
        }

        if self.whitelist.is_some() && self.blacklist.is_some() {
            tracing::warn!("both a whitelist and a blacklist are set, ignoring the blacklist");
        }

        let selection = self.selection();
        if let Some(image_dirs) = &self.image_dirs {
            for dir in image_dirs {
                if !self.dataset_root.join(dir).is_dir() || !selection.includes(dir) {
                    return Err(Error::InvalidImageDir(dir.clone()));
                }
            }
        }

        Ok(())
    }

    /// Which top level entries of the dataset are copied.
    pub fn selection(&self) -> EntrySelection {
        match (&self.whitelist, &self.blacklist) {
            (Some(whitelist), _) => EntrySelection::Whitelist(whitelist.clone()),
            (None, Some(blacklist)) => EntrySelection::Blacklist(blacklist.clone()),
            (None, None) => EntrySelection::All,
        }
    }
}

fn require_dir(path: &Path) -> Result<(), Error> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::MissingDirectory(path.to_owned()))
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Loads configs from files, the format is picked from the file extension.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
        let format = ConfigFormat::from_extension(path).ok_or_else(|| Error::Config {
            path: path.to_owned(),
            reason: "unsupported file extension, expected .toml or .json".to_owned(),
        })?;

        if !path.is_file() {
            return Err(Error::Config {
                path: path.to_owned(),
                reason: "no such file".to_owned(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format).map_err(|reason| Error::Config {
            path: path.to_owned(),
            reason,
        })
    }

    /// Parses a config, returning the parser's message on failure.
    pub fn load_from_str<T: DeserializeOwned>(
        content: &str,
        format: ConfigFormat,
    ) -> Result<T, String> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DirectoryConfig::default();
        assert_eq!(cfg.extensions, vec!["jpg", "jpeg", "png"]);
        assert_eq!(cfg.num_styles, 1);
        assert_eq!(cfg.output_root, PathBuf::from("output"));
        assert_eq!(cfg.transfer.alpha, 1.0);
        assert_eq!(cfg.transfer.content_size, 0);
        assert_eq!(cfg.transfer.style_size, 512);
        assert!(!cfg.transfer.crop);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn dataset_config_from_toml() {
        let cfg: DatasetConfig = ConfigLoader::load_from_str(
            r#"
            dataset_dir = "/data/coco"
            target_dir = "/data/coco-stylized"
            style_root = "/data/styles"
            blacklist = ["annotations"]
            image_dirs = ["train2017"]
            alpha = 0.5
            style_size = 256
            seed = 13
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(cfg.dataset_root, PathBuf::from("/data/coco"));
        assert_eq!(cfg.target_root, PathBuf::from("/data/coco-stylized"));
        assert_eq!(cfg.blacklist, Some(vec!["annotations".to_owned()]));
        assert_eq!(cfg.image_dirs, Some(vec!["train2017".to_owned()]));
        assert_eq!(cfg.transfer.alpha, 0.5);
        assert_eq!(cfg.transfer.style_size, 256);
        assert_eq!(cfg.transfer.content_size, 0);
        assert_eq!(cfg.seed, Some(13));
        assert_eq!(cfg.max_style_attempts, 10);
        assert_eq!(cfg.content_extensions, vec!["jpg", "jpeg", "png"]);
    }

    #[test]
    fn directory_config_from_json() {
        let cfg: DirectoryConfig = ConfigLoader::load_from_str(
            r#"{"content_root": "c", "style_root": "s", "num_styles": 3, "crop": true}"#,
            ConfigFormat::Json,
        )
        .unwrap();

        assert_eq!(cfg.num_styles, 3);
        assert!(cfg.transfer.crop);
        assert_eq!(cfg.output_root, PathBuf::from("output"));
    }

    #[test]
    fn unsupported_extension() {
        let err = ConfigLoader::load_from_file::<DatasetConfig>(Path::new("cfg.py")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn whitelist_wins_over_blacklist() {
        let cfg = DatasetConfig {
            whitelist: Some(vec!["images".to_owned()]),
            blacklist: Some(vec!["images".to_owned()]),
            ..DatasetConfig::default()
        };

        assert_eq!(cfg.selection(), EntrySelection::Whitelist(vec!["images".to_owned()]));
    }

    #[test]
    fn zero_styles_is_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DirectoryConfig {
            content_root: dir.path().to_owned(),
            style_root: dir.path().to_owned(),
            num_styles: 0,
            ..DirectoryConfig::default()
        };

        match cfg.validate() {
            Err(Error::InvalidRange(ir)) => {
                assert_eq!(ir.name, "num-styles");
                assert_eq!(ir.min, 1.0);
                assert!(ir.max.is_infinite());
            }
            _ => panic!("0 styles per image was accepted"),
        }
    }

    #[test]
    fn validation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data/images")).unwrap();
        std::fs::create_dir_all(dir.path().join("styles")).unwrap();

        let valid = DatasetConfig {
            dataset_root: dir.path().join("data"),
            target_root: dir.path().join("out"),
            style_root: dir.path().join("styles"),
            image_dirs: Some(vec!["images".to_owned()]),
            ..DatasetConfig::default()
        };
        valid.validate().unwrap();

        let blacklisted = DatasetConfig {
            blacklist: Some(vec!["images".to_owned()]),
            ..valid.clone()
        };
        assert!(matches!(blacklisted.validate(), Err(Error::InvalidImageDir(_))));

        let missing = DatasetConfig {
            style_root: dir.path().join("nope"),
            ..valid.clone()
        };
        assert!(matches!(missing.validate(), Err(Error::MissingDirectory(_))));

        let no_attempts = DatasetConfig {
            max_style_attempts: 0,
            ..valid.clone()
        };
        assert!(matches!(no_attempts.validate(), Err(Error::InvalidRange(_))));

        let bad_alpha = DatasetConfig {
            transfer: TransferConfig {
                alpha: 2.0,
                ..TransferConfig::default()
            },
            ..valid
        };
        assert!(bad_alpha.validate().unwrap_err().is_config());
    }
}
