//! `berth status`

use anyhow::Result;
use colored::Colorize;
use fleet::PlanOptions;

use crate::Context;
use crate::cli::StatusArgs;
use crate::ui;

pub fn run(ctx: &Context, args: StatusArgs) -> Result<()> {
    let (spec, engine) = super::load(ctx)?;

    ui::header("Berth Status");
    if !ctx.quiet {
        ui::kv("Network", &engine.config().network);
        ui::kv("Proxy", &engine.config().proxy_endpoint);
        let disabled = spec.sites.iter().filter(|s| s.disabled).count();
        if disabled > 0 {
            ui::kv("Disabled sites", &disabled.to_string());
        }
    }

    let opts = PlanOptions {
        dry_run: true,
        only: args.only,
        skip_hosts: true,
        ..Default::default()
    };
    let statuses = engine.status(&spec, &opts)?;

    let mut current_type = "";
    let mut pending = 0;
    for status in &statuses {
        if status.resource_type != current_type {
            current_type = status.resource_type;
            ui::section(current_type);
        }
        if !status.state.is_in_sync() && status.resource_type != "proxy_sync" {
            pending += 1;
        }
        let (glyph, state) = ui::state_label(&status.state);
        println!("  {glyph} {} {}", status.description.bold(), state.dimmed());
    }

    println!();
    if pending == 0 {
        ui::success("All resources in sync");
    } else {
        ui::warn(&format!(
            "{pending} resource(s) need attention - run `berth apply`"
        ));
    }
    Ok(())
}
