// Terminal feedback: a byte progress bar while chunks go out and a spinner
// while the publish request runs. Both draw to stderr so stdout stays clean
// for URLs and JSON.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const UPLOAD_TEMPLATE: &str =
    "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Progress bar for one file upload. The uploader sets its length.
pub fn upload_progress(file_name: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(UPLOAD_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(format!("Uploading {file_name}"));
    bar
}

/// Spinner shown while waiting on a single request.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_mode_hides_everything() {
        assert!(upload_progress("app.zip", true).is_hidden());
        assert!(spinner("Publishing...", true).is_hidden());
    }

    #[test]
    fn upload_template_parses() {
        assert!(ProgressStyle::with_template(UPLOAD_TEMPLATE).is_ok());
    }
}
