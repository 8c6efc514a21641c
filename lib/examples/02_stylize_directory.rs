use stylize_datasets as sd;

fn main() -> Result<(), sd::Error> {
    let config = sd::DirectoryConfig {
        content_root: "imgs/content".into(),
        style_root: "imgs/styles".into(),
        output_root: "out/02".into(),
        // every content image gets 3 different styles
        num_styles: 3,
        // the same seed over the same files gives the same pairings
        seed: Some(42),
        ..Default::default()
    };

    // fails before any network is loaded if a directory is empty or there
    // are fewer than 3 styles
    let job = sd::DirectoryStylizer::new(&config)?;
    let engine = sd::StyleTransfer::builder().config(&config.transfer).build()?;

    let report = job.run(
        &engine,
        Some(Box::new(|update: sd::ProgressUpdate<'_>| {
            println!("{}/{} {}", update.current, update.total, update.path.display());
        })),
    )?;

    println!(
        "wrote {} images, skipped {}",
        report.stylized,
        report.skipped.len()
    );
    Ok(())
}
