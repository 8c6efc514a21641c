mod progress_window;

use structopt::StructOpt;

use progress_window::ProgressWindow;
use std::path::PathBuf;
use stylize_datasets::{
    BatchProgress, ConfigLoader, DatasetConfig, DatasetStylizer, DirectoryConfig,
    DirectoryStylizer, Error, RunReport, StyleTransfer, TransferConfig,
};

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Transfer {
    /// Degree of stylization, 0.0 keeps the content as is and 1.0 fully
    /// applies the style. Range (0.0 - 1.0)
    #[structopt(long, default_value = "1.0")]
    alpha: f32,
    /// Resizes the shorter side of content images to this size, 0 keeps the
    /// original size
    #[structopt(long, default_value = "0")]
    content_size: u32,
    /// Resizes the shorter side of style images to this size, 0 keeps the
    /// original size
    #[structopt(long, default_value = "512")]
    style_size: u32,
    /// Center crops content and style images to a square after resizing
    #[structopt(long)]
    crop: bool,
    /// Weights of the normalised VGG encoder, `.pth` or `.safetensors`
    #[structopt(long, parse(from_os_str), default_value = "models/vgg_normalised.pth")]
    encoder_weights: PathBuf,
    /// Weights of the decoder, `.pth` or `.safetensors`
    #[structopt(long, parse(from_os_str), default_value = "models/decoder.pth")]
    decoder_weights: PathBuf,
}

impl Transfer {
    fn into_config(self) -> TransferConfig {
        TransferConfig {
            alpha: self.alpha,
            content_size: self.content_size,
            style_size: self.style_size,
            crop: self.crop,
            encoder_weights: self.encoder_weights,
            decoder_weights: self.decoder_weights,
        }
    }
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Directory {
    /// Directory searched recursively for content images
    #[structopt(long, parse(from_os_str))]
    content_dir: PathBuf,
    /// Directory searched recursively for style images
    #[structopt(long, parse(from_os_str))]
    style_dir: PathBuf,
    /// Directory the stylized images are written to, mirroring the layout of
    /// the content directory
    #[structopt(long, parse(from_os_str), default_value = "output")]
    output_dir: PathBuf,
    /// The number of distinct styles applied to each content image
    #[structopt(long, default_value = "1")]
    num_styles: usize,
    /// File extensions of the content and style images, case sensitive
    #[structopt(long, default_value = "jpg,jpeg,png", use_delimiter = true)]
    extensions: Vec<String>,
    /// A seed value for the random generator, the same seed gives the same
    /// pairings and outputs
    #[structopt(long)]
    seed: Option<u64>,
    #[structopt(flatten)]
    transfer: Transfer,
    /// Don't show a progress bar
    #[structopt(long)]
    no_progress: bool,
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Dataset {
    /// Path to a `.toml` or `.json` dataset config
    #[structopt(long, parse(from_os_str))]
    config: PathBuf,
    /// Don't show a progress bar
    #[structopt(long)]
    no_progress: bool,
}

#[derive(StructOpt)]
#[structopt(
    name = "stylize-datasets",
    about = "Stylizes image datasets with arbitrary style transfer",
    rename_all = "kebab-case"
)]
enum Opt {
    /// Stylizes every image of a directory with randomly sampled styles,
    /// writing new files named after both images
    #[structopt(name = "dir")]
    Directory(Directory),
    /// Copies an annotated dataset and stylizes the images of the copy in place
    #[structopt(name = "dataset")]
    Dataset(Dataset),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        if atty::is(atty::Stream::Stderr) {
            eprintln!("\x1b[31merror\x1b[0m: {}", e);
        } else {
            eprintln!("error: {}", e);
        }

        std::process::exit(1);
    }
}

fn progress(no_progress: bool) -> Option<Box<dyn BatchProgress>> {
    if no_progress {
        None
    } else {
        Some(Box::new(ProgressWindow::new()))
    }
}

fn real_main() -> Result<(), Error> {
    let report = match Opt::from_args() {
        Opt::Directory(args) => {
            let config = DirectoryConfig {
                content_root: args.content_dir,
                style_root: args.style_dir,
                output_root: args.output_dir,
                extensions: args.extensions,
                num_styles: args.num_styles,
                seed: args.seed,
                transfer: args.transfer.into_config(),
            };

            // Discovery and pairing fail fast, before the networks are loaded
            let job = DirectoryStylizer::new(&config)?;
            let engine = StyleTransfer::builder().config(&config.transfer).build()?;

            job.run(&engine, progress(args.no_progress))?
        }
        Opt::Dataset(args) => {
            let config: DatasetConfig = ConfigLoader::load_from_file(&args.config)?;

            let job = DatasetStylizer::new(config)?;
            let engine = StyleTransfer::builder()
                .config(&job.config().transfer)
                .build()?;

            job.run(&engine, progress(args.no_progress))?
        }
    };

    summarize(&report);
    Ok(())
}

fn summarize(report: &RunReport) {
    for skipped in &report.skipped {
        match &skipped.style {
            Some(style) => tracing::warn!(
                content = %skipped.content.display(),
                style = %style.display(),
                "skipped: {}",
                skipped.reason
            ),
            None => tracing::warn!(
                content = %skipped.content.display(),
                "skipped: {}",
                skipped.reason
            ),
        }
    }

    tracing::info!(
        stylized = report.stylized,
        skipped = report.skipped.len(),
        "finished"
    );
}
