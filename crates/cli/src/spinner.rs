use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shared by the up/down flows; each stage reports through
/// `set_message` so a failure message identifies where the run stopped.
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
