//! Drivers running a whole stylization job, one content image at a time.
//!
//! Failures to decode or stylize a single image never abort a run, they are
//! logged, recorded in the returned [`RunReport`] and processing continues
//! with the next item.

use crate::{
    config::{DatasetConfig, DirectoryConfig},
    dataset::{self, CopyReport},
    pairing::{self, Pairing, PairingPlan, StyleSampler},
    utils, walker, Error, StyleTransfer,
};
use image::RgbImage;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Name of the list of skipped content images written to the output root
pub const SKIPPED_LIST_NAME: &str = "skipped_imgs.txt";

/// Progress of a running batch
pub struct ProgressUpdate<'a> {
    /// Content images handled so far, including skipped ones
    pub current: usize,
    /// Content images in the run
    pub total: usize,
    /// The content image that was just handled
    pub path: &'a Path,
}

/// Allows a driver to update external callers with the progress of a run
pub trait BatchProgress {
    fn update(&mut self, info: ProgressUpdate<'_>);
}

impl<G> BatchProgress for G
where
    G: FnMut(ProgressUpdate<'_>),
{
    fn update(&mut self, info: ProgressUpdate<'_>) {
        self(info)
    }
}

/// A content image, or a single pairing of it, that wasn't stylized
#[derive(Debug)]
pub struct Skipped {
    pub content: PathBuf,
    /// Set when only the pairing with this style was skipped
    pub style: Option<PathBuf>,
    pub reason: String,
}

/// What a finished run did
#[derive(Debug, Default)]
pub struct RunReport {
    /// Number of images written
    pub stylized: usize,
    pub skipped: Vec<Skipped>,
}

impl RunReport {
    fn skip(&mut self, content: &Path, style: Option<&Path>, err: &Error) {
        match style {
            Some(style) => tracing::warn!(
                "skipping stylization of '{}' with '{}': {}",
                content.display(),
                style.display(),
                err
            ),
            None => tracing::warn!("skipping stylization of '{}': {}", content.display(), err),
        }

        self.skipped.push(Skipped {
            content: content.to_owned(),
            style: style.map(Path::to_path_buf),
            reason: err.to_string(),
        });
    }

    /// Writes the paths of the skipped content images to `path`, one per
    /// line.
    pub fn write_skipped(&self, path: &Path) -> Result<(), Error> {
        let mut out = std::io::BufWriter::new(fs::File::create(path)?);

        let mut last: Option<&Path> = None;
        for skipped in &self.skipped {
            if last != Some(skipped.content.as_path()) {
                writeln!(out, "{}", skipped.content.display())?;
                last = Some(&skipped.content);
            }
        }

        out.flush()?;
        Ok(())
    }
}

fn report_progress(
    progress: &mut Option<Box<dyn BatchProgress>>,
    current: usize,
    total: usize,
    path: &Path,
) {
    if let Some(progress) = progress {
        progress.update(ProgressUpdate {
            current,
            total,
            path,
        });
    }
}

/// Stylizes every image found under a content directory with a number of
/// distinct, randomly sampled styles, writing each result as a new file
/// named after both images under the output directory.
pub struct DirectoryStylizer {
    content_root: PathBuf,
    output_root: PathBuf,
    plan: PairingPlan,
}

impl DirectoryStylizer {
    /// Validates the config, discovers content and style images and draws
    /// the pairings of the whole run.
    pub fn new(config: &DirectoryConfig) -> Result<Self, Error> {
        config.validate()?;

        let content_root = config.content_root.canonicalize()?;
        let contents = walker::find_images(&content_root, &config.extensions, None)?;
        tracing::info!(
            "found {} content images in '{}'",
            contents.len(),
            content_root.display()
        );

        let styles = walker::find_images(&config.style_root, &config.extensions, None)?;
        tracing::info!(
            "found {} style images in '{}'",
            styles.len(),
            config.style_root.display()
        );

        let mut sampler = StyleSampler::new(config.seed);
        tracing::info!(seed = sampler.seed(), "pairing styles");
        let plan = PairingPlan::distinct_styles(&contents, &styles, config.num_styles, &mut sampler)?;

        fs::create_dir_all(&config.output_root)?;
        let output_root = config.output_root.canonicalize()?;

        Ok(Self {
            content_root,
            output_root,
            plan,
        })
    }

    pub fn plan(&self) -> &PairingPlan {
        &self.plan
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Runs every pairing of the plan.
    ///
    /// A content image that fails to decode is skipped entirely, a style
    /// image that fails to decode only skips that one pairing. If anything
    /// was skipped, the skipped content images are listed in
    /// `skipped_imgs.txt` in the output root.
    pub fn run(
        self,
        engine: &StyleTransfer,
        mut progress: Option<Box<dyn BatchProgress>>,
    ) -> Result<RunReport, Error> {
        let mut report = RunReport::default();
        let total = self.plan.len();

        for (i, pairing) in self.plan.iter().enumerate() {
            self.stylize_content(engine, pairing, &mut report);
            report_progress(&mut progress, i + 1, total, &pairing.content);
        }

        if !report.skipped.is_empty() {
            let list = self.output_root.join(SKIPPED_LIST_NAME);
            report.write_skipped(&list)?;
            tracing::info!(
                "{} item(s) were skipped, see '{}'",
                report.skipped.len(),
                list.display()
            );
        }

        Ok(report)
    }

    fn stylize_content(&self, engine: &StyleTransfer, pairing: &Pairing, report: &mut RunReport) {
        let content = match utils::load_rgb_image(&pairing.content) {
            Ok(img) => img,
            Err(err) => {
                report.skip(&pairing.content, None, &err);
                return;
            }
        };

        for style in &pairing.styles {
            match self.stylize_pair(engine, &content, &pairing.content, style) {
                Ok(out) => {
                    tracing::debug!("wrote '{}'", out.display());
                    report.stylized += 1;
                }
                Err(err) => report.skip(&pairing.content, Some(style), &err),
            }
        }
    }

    fn stylize_pair(
        &self,
        engine: &StyleTransfer,
        content: &RgbImage,
        content_path: &Path,
        style_path: &Path,
    ) -> Result<PathBuf, Error> {
        let style = utils::load_rgb_image(style_path)?;
        let stylized = engine.stylize(content, &style)?;

        let out = pairing::output_path(&self.content_root, content_path, style_path, &self.output_root)?;
        utils::save_rgb_image(&stylized, &out)?;
        Ok(out)
    }
}

/// Stylizes an annotated dataset: the dataset is first copied to a target
/// root, then every image of the copy is overwritten in place by its
/// stylization with one randomly drawn style, so annotations referring to
/// file names and directory layout stay valid.
pub struct DatasetStylizer {
    config: DatasetConfig,
    styles: Vec<PathBuf>,
}

impl DatasetStylizer {
    /// Validates the config and discovers the style images.
    ///
    /// The entries of the dataset that would be copied are searched for
    /// content images as well, so an empty dataset fails here before anything
    /// is written to the target root.
    pub fn new(config: DatasetConfig) -> Result<Self, Error> {
        config.validate()?;

        let entries = match &config.image_dirs {
            Some(image_dirs) => image_dirs.clone(),
            None => dataset::selected_entries(&config.dataset_root, &config.selection())?,
        };
        let contents = walker::find_images_in_entries(
            &config.dataset_root,
            &config.content_extensions,
            &entries,
        )?;
        tracing::info!(
            "found {} content images to copy from '{}'",
            contents.len(),
            config.dataset_root.display()
        );

        let styles = walker::find_images(&config.style_root, &config.style_extensions, None)?;
        tracing::info!(
            "found {} style images in '{}'",
            styles.len(),
            config.style_root.display()
        );

        Ok(Self { config, styles })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Copies the selected entries of the dataset to the target root.
    pub fn copy(&self) -> Result<CopyReport, Error> {
        dataset::copy_dataset(
            &self.config.dataset_root,
            &self.config.target_root,
            &self.config.selection(),
        )
    }

    /// Finds the content images of the copied dataset and draws one style
    /// for each of them.
    pub fn plan(&self, sampler: &mut StyleSampler) -> Result<PairingPlan, Error> {
        let contents = walker::find_images(
            &self.config.target_root,
            &self.config.content_extensions,
            self.config.image_dirs.as_deref(),
        )?;
        tracing::info!(
            "found {} content images in '{}'",
            contents.len(),
            self.config.target_root.display()
        );

        PairingPlan::single_style(&contents, &self.styles, sampler)
    }

    /// Overwrites every content image of the copied dataset with its
    /// stylization. Must run after `copy`.
    ///
    /// When a style fails to decode, a different style is drawn for the
    /// same content image, up to `max_style_attempts` styles in total,
    /// after which the content image is skipped.
    pub fn stylize(
        &self,
        engine: &StyleTransfer,
        mut progress: Option<Box<dyn BatchProgress>>,
    ) -> Result<RunReport, Error> {
        let mut sampler = StyleSampler::new(self.config.seed);
        tracing::info!(seed = sampler.seed(), "pairing styles");
        let plan = self.plan(&mut sampler)?;

        let mut report = RunReport::default();
        let total = plan.len();

        for (i, pairing) in plan.iter().enumerate() {
            match self.stylize_in_place(engine, pairing, &mut sampler) {
                Ok(()) => report.stylized += 1,
                Err(err) => report.skip(&pairing.content, None, &err),
            }
            report_progress(&mut progress, i + 1, total, &pairing.content);
        }

        Ok(report)
    }

    /// Copies the dataset, then stylizes the copy.
    pub fn run(
        &self,
        engine: &StyleTransfer,
        progress: Option<Box<dyn BatchProgress>>,
    ) -> Result<RunReport, Error> {
        self.copy()?;
        self.stylize(engine, progress)
    }

    fn stylize_in_place(
        &self,
        engine: &StyleTransfer,
        pairing: &Pairing,
        sampler: &mut StyleSampler,
    ) -> Result<(), Error> {
        let content = utils::load_rgb_image(&pairing.content)?;
        let style = self.load_style(&pairing.content, &pairing.styles[0], sampler)?;

        let stylized = engine.stylize(&content, &style)?;
        utils::save_rgb_image(&stylized, &pairing.content)
    }

    fn load_style(
        &self,
        content: &Path,
        first: &Path,
        sampler: &mut StyleSampler,
    ) -> Result<RgbImage, Error> {
        let mut failed = Vec::new();
        let mut path = first.to_owned();

        loop {
            match utils::load_rgb_image(&path) {
                Ok(img) => return Ok(img),
                Err(err) => {
                    tracing::warn!(
                        "style '{}' failed to decode, drawing another: {}",
                        path.display(),
                        err
                    );
                    if let Ok(index) = self.styles.binary_search(&path) {
                        failed.push(index);
                    }
                }
            }

            let next = if failed.len() < self.config.max_style_attempts {
                sampler.draw_excluding(self.styles.len(), &failed)
            } else {
                None
            };

            match next {
                Some(index) => path = self.styles[index].clone(),
                None => {
                    return Err(Error::StyleAttemptsExhausted {
                        content: content.to_owned(),
                        attempts: failed.len(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn skipped_list_has_one_line_per_content() {
        let dir = tempfile::tempdir().unwrap();
        let err = Error::NoExtensions;

        let mut report = RunReport::default();
        report.skip(Path::new("/c/1.jpg"), Some(Path::new("/s/a.jpg")), &err);
        report.skip(Path::new("/c/1.jpg"), Some(Path::new("/s/b.jpg")), &err);
        report.skip(Path::new("/c/2.jpg"), None, &err);

        let list = dir.path().join(SKIPPED_LIST_NAME);
        report.write_skipped(&list).unwrap();

        assert_eq!(fs::read_to_string(list).unwrap(), "/c/1.jpg\n/c/2.jpg\n");
        assert_eq!(report.skipped.len(), 3);
    }

    #[test]
    fn closures_report_progress() {
        let mut seen = Vec::new();
        {
            let mut progress = |update: ProgressUpdate<'_>| seen.push((update.current, update.total));
            progress.update(ProgressUpdate {
                current: 1,
                total: 2,
                path: Path::new("a.jpg"),
            });
        }
        assert_eq!(seen, vec![(1, 2)]);
    }
}
