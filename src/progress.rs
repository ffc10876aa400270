//! Terminal progress for the import stages.
//!
//! Bars are hidden in log-only mode, where periodic log lines take their
//! place so output stays readable under `tail -f` or in CI.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Switch every stage to log lines instead of bars (`--log-only`).
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

fn log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

fn styled(pb: ProgressBar, style: ProgressStyle, msg: &str) -> ProgressBar {
    if log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

/// Bar for the normalizer's write pass, whose length is known up front.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    styled(ProgressBar::new(len), style, msg)
}

/// Spinner with a running row count, for CSV streams.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template("{msg} {spinner} {pos} rows [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = styled(ProgressBar::new_spinner(), style, msg);
    if !log_only() {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb
}

/// Text of the periodic progress line, if one is due at `current`.
fn progress_line(phase: &str, current: u64, total: Option<u64>, interval: u64) -> Option<String> {
    match total {
        Some(total) if total > 0 => (current % interval == 0 || current == total).then(|| {
            let pct = 100.0 * current as f64 / total as f64;
            format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct)
        }),
        Some(_) => None,
        None => (current % interval == 0).then(|| format!("[{}] {} rows", phase, current)),
    }
}

/// In log-only mode, log every `interval` items and at the end of a known
/// total.
pub fn log_progress(phase: &str, current: u64, total: Option<u64>, interval: u64) {
    if !log_only() || interval == 0 {
        return;
    }
    if let Some(line) = progress_line(phase, current, total, interval) {
        info!("{}", line);
    }
}
