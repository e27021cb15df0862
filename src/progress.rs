//! Progress rendering for apply runs.

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ui;

/// Spinner while a resource converges, one line per finished resource.
pub struct ApplyProgress {
    quiet: bool,
    /// Hide unchanged resources
    changes_only: bool,
    spinner: Option<ProgressBar>,
    description: String,
}

impl ApplyProgress {
    pub fn new(quiet: bool, changes_only: bool) -> Self {
        Self {
            quiet,
            changes_only,
            spinner: None,
            description: String::new(),
        }
    }

    fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

impl ProgressCallback for ApplyProgress {
    fn on_stage_start(&mut self, stage: &str, count: usize) {
        log::debug!("Stage {stage}: {count} resource(s)");
    }

    fn on_resource_start(&mut self, _id: &str, description: &str) {
        self.description = description.to_string();
        if !self.quiet {
            self.spinner = Some(spinner(description));
        }
    }

    fn on_resource_complete(&mut self, _id: &str, result: &ApplyResult) {
        self.clear();
        if self.quiet || (self.changes_only && !result.is_change()) {
            return;
        }
        let (glyph, verb) = ui::result_label(result);
        println!("  {glyph} {} {}", self.description, verb.dimmed());
    }

    fn on_resource_failed(&mut self, _id: &str, error: &str) {
        self.clear();
        eprintln!("  {} {} {}", "✗".red(), self.description, error.red());
    }

    fn on_stage_complete(&mut self, _stage: &str) {
        self.clear();
    }
}
