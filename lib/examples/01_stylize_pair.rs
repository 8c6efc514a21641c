use stylize_datasets as sd;

fn main() -> Result<(), sd::Error> {
    // load both networks once, the engine can then stylize any number of pairs
    let engine = sd::StyleTransfer::builder()
        .alpha(0.8)
        .style_size(512)
        .build()?;

    let content = sd::load_rgb_image("imgs/content/tom.jpg".as_ref())?;
    let style = sd::load_rgb_image("imgs/styles/waves.jpg".as_ref())?;

    let stylized = engine.stylize(&content, &style)?;

    // save the result to the disk
    sd::save_rgb_image(&stylized, "out/01.jpg".as_ref())
}
