use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

/// A bar with the crate's standard layout, or `None` if the template is rejected.
pub fn progress_bar(len: u64, msg: &'static str) -> Option<ProgressBar> {
    let style = match ProgressStyle::default_bar()
        .template("[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
    {
        Ok(style) => style.progress_chars("##-"),
        Err(e) => {
            warn!("Progress bar disabled: {}", e);
            return None;
        }
    };

    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar.set_message(msg);
    Some(bar)
}
