use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar counting packages whose dependencies have been resolved.
/// Hidden when `visible` is false; updates never block the caller.
pub fn package_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} packages connected ({percent}%)",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}
