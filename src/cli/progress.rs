use std::{borrow::Cow, sync::LazyLock, time::Duration};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub static CLI_MULTI_PROGRESS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

const STAGE_TEMPLATE: &str = "{spinner:.green} [{pos}/{len}] {msg}";

/// Spinner counting through a fixed number of stages. Messages are logged as
/// well, so a run without a terminal still leaves a trail.
pub struct StageProgress {
    bar: ProgressBar,
}

impl StageProgress {
    pub fn new(stages: u64) -> Self {
        let style = ProgressStyle::with_template(STAGE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = CLI_MULTI_PROGRESS.add(ProgressBar::new(stages).with_style(style));
        bar.enable_steady_tick(Duration::from_millis(80));
        StageProgress { bar }
    }

    /// Moves on to the next stage.
    pub fn stage(&self, msg: impl Into<Cow<'static, str>>) {
        let msg: Cow<'static, str> = msg.into();
        log::info!("{}", msg);
        self.bar.inc(1);
        self.bar.set_message(msg);
    }

    /// Updates the message without advancing.
    pub fn detail(&self, msg: impl Into<Cow<'static, str>>) {
        let msg: Cow<'static, str> = msg.into();
        log::debug!("{}", msg);
        self.bar.set_message(msg);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Clears the bar whether the run succeeded or not. Failures are reported
    /// by the caller.
    pub fn finish(self) {
        self.bar.finish_and_clear();
        CLI_MULTI_PROGRESS.remove(&self.bar);
    }
}
