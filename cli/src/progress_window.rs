use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressWindow {
    pb: ProgressBar,
    total_len: usize,
}

impl ProgressWindow {
    pub fn new() -> Self {
        let sty = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
            .progress_chars("##-");

        let pb = ProgressBar::new(0);
        pb.set_style(sty);

        Self { pb, total_len: 0 }
    }
}

impl Drop for ProgressWindow {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}

impl stylize_datasets::BatchProgress for ProgressWindow {
    fn update(&mut self, update: stylize_datasets::ProgressUpdate<'_>) {
        if update.total != self.total_len {
            self.total_len = update.total;
            self.pb.set_length(self.total_len as u64);
        }

        if let Some(name) = update.path.file_name() {
            self.pb.set_message(&name.to_string_lossy());
        }
        self.pb.set_position(update.current as u64);
    }
}
