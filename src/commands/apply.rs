//! `berth apply`

use anyhow::{Result, bail};
use declarative::{CancelToken, ExecuteError, ExecuteSummary};
use fleet::PlanOptions;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::progress::ApplyProgress;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs, cancel: &CancelToken) -> Result<()> {
    let (spec, engine) = super::load(ctx)?;

    ui::header("Applying Environment");
    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
        println!();
    }

    let opts = PlanOptions {
        dry_run: args.dry_run,
        prune: args.prune,
        only: args.only,
        skip_hosts: args.skip_hosts,
    };
    let mut progress = ApplyProgress::new(ctx.quiet, ctx.verbose == 0);

    match engine.apply(&spec, &opts, cancel, &mut progress) {
        Ok(report) => {
            println!();
            if report.dry_run {
                ui::info(&format!("Would apply: {}", summary_line(&report.summary)));
            } else if report.changed() {
                ui::success(&format!("Applied: {}", summary_line(&report.summary)));
            } else {
                ui::success("Everything up to date");
            }
            Ok(())
        }
        Err(fleet::Error::Execute(ExecuteError::Cancelled { completed })) => {
            println!();
            ui::warn(&format!(
                "Cancelled after {} resource(s): {}",
                completed.total(),
                summary_line(&completed)
            ));
            bail!("apply cancelled")
        }
        Err(e) => {
            println!();
            if let fleet::Error::Execute(exec) = &e {
                ui::dim(&format!(
                    "Completed before the failure: {}",
                    summary_line(exec.completed())
                ));
            }
            Err(e.into())
        }
    }
}

/// `2 created, 1 recreated, 5 unchanged`
pub fn summary_line(summary: &ExecuteSummary) -> String {
    let parts: Vec<String> = [
        (summary.created, "created"),
        (summary.started, "started"),
        (summary.recreated, "recreated"),
        (summary.removed, "removed"),
        (summary.synced, "synced"),
        (summary.skipped, "skipped"),
        (summary.no_change, "unchanged"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{count} {label}"))
    .collect();

    if parts.is_empty() {
        "nothing to do".to_string()
    } else {
        parts.join(", ")
    }
}
