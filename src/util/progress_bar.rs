
use indicatif::{ProgressState, ProgressStyle};
use log::warn;

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}); ETA: {eta_precise}; Speed: {per_sec} {msg}";

/// Shared function to pull our progress bar styling, falls back to the indicatif default if the template is rejected
pub fn get_progress_style() -> ProgressStyle {
    let style = match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        Ok(style) => style,
        Err(e) => {
            warn!("Error while parsing progress bar template: {e}");
            return ProgressStyle::default_bar();
        }
    };
    style
        .with_key("percent", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.1}%", state.fraction() * 100.0);
        })
        .with_key("per_sec", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{:.0}/s", state.per_sec());
        })
        .progress_chars("##-")
}
