use stylize_datasets as sd;

fn main() -> Result<(), sd::Error> {
    // a dataset laid out as `images/<class>/*.jpg` next to its annotations,
    // the copy keeps the annotations but leaves out the cached previews
    let config: sd::DatasetConfig = sd::ConfigLoader::load_from_str(
        r#"
        dataset_root = "imgs/dataset"
        target_root = "out/03"
        style_root = "imgs/styles"
        blacklist = ["previews"]
        image_dirs = ["images"]
        alpha = 0.6
        seed = 3
        "#,
        sd::ConfigFormat::Toml,
    )
    .map_err(|reason| sd::Error::Config {
        path: "<inline>".into(),
        reason,
    })?;

    let job = sd::DatasetStylizer::new(config)?;
    let engine = sd::StyleTransfer::builder()
        .config(&job.config().transfer)
        .build()?;

    // copying and stylizing are separate phases, `run` does both
    let copied = job.copy()?;
    println!("copied {} files", copied.files);

    let report = job.stylize(&engine, None)?;
    println!("stylized {} images in place", report.stylized);
    Ok(())
}
