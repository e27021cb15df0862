//! `berth diff`

use anyhow::Result;
use colored::Colorize;
use declarative::{DiffSummary, group_by_type};
use fleet::PlanOptions;

use crate::Context;
use crate::cli::DiffArgs;
use crate::ui;

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let (spec, engine) = super::load(ctx)?;

    ui::header("Environment Diff");

    let opts = PlanOptions {
        dry_run: true,
        prune: args.prune,
        only: args.only,
        skip_hosts: false,
    };
    let diffs = engine.diff(&spec, &opts)?;
    let summary = DiffSummary::from_diffs(&diffs);

    // The routing table is pushed on every apply, so it alone is no change
    if diffs.iter().all(|d| d.resource_type == "proxy_sync") {
        ui::success("No changes - environment matches the specification");
        return Ok(());
    }

    for (resource_type, diffs) in group_by_type(&diffs) {
        ui::section(&resource_type);
        for diff in diffs {
            let (glyph, state) = ui::state_label(&diff.current);
            println!("  {glyph} {} {}", diff.description, state.dimmed());
        }
    }

    println!();
    ui::kv("To create", &summary.additions.to_string());
    ui::kv("To start", &summary.starts.to_string());
    ui::kv("To recreate", &summary.modifications.to_string());
    ui::kv("To remove", &summary.removals.to_string());
    if !ctx.quiet {
        println!();
        ui::dim("Run `berth apply` to converge.");
    }
    Ok(())
}
