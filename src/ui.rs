use colored::{ColoredString, Colorize};
use declarative::{ApplyResult, ResourceState};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Resource glyphs
// ============================================================================

/// Glyph + verb for a finished (or, in a dry run, planned) resource
pub fn result_label(result: &ApplyResult) -> (ColoredString, String) {
    match result {
        ApplyResult::NoChange => ("·".dimmed(), "unchanged".to_string()),
        ApplyResult::Created => ("+".green(), "created".to_string()),
        ApplyResult::Started => ("▶".green(), "started".to_string()),
        ApplyResult::Recreated { reason } => ("~".yellow(), format!("recreated ({reason})")),
        ApplyResult::Removed => ("-".red(), "removed".to_string()),
        ApplyResult::Synced => ("↻".blue(), "synced".to_string()),
        ApplyResult::Skipped { reason } => ("○".dimmed(), format!("skipped ({reason})")),
    }
}

/// Glyph + description for a detected state
pub fn state_label(state: &ResourceState) -> (ColoredString, String) {
    match state {
        ResourceState::InSync { details: Some(d) } => ("✓".green(), format!("in sync ({d})")),
        ResourceState::InSync { details: None } => ("✓".green(), "in sync".to_string()),
        ResourceState::Absent => ("+".green(), "missing".to_string()),
        ResourceState::Stopped => ("▶".yellow(), "stopped".to_string()),
        ResourceState::Drifted { reason } => ("~".yellow(), format!("drifted: {reason}")),
        ResourceState::Unwanted { reason } => ("-".red(), format!("to remove: {reason}")),
        ResourceState::Unknown => ("?".blue(), "pushed on every apply".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(result_label(&ApplyResult::Created).1, "created");
        assert_eq!(
            result_label(&ApplyResult::Recreated { reason: "image".into() }).1,
            "recreated (image)"
        );
        assert_eq!(state_label(&ResourceState::Stopped).1, "stopped");
        assert_eq!(
            state_label(&ResourceState::Unwanted { reason: "old.test".into() }).1,
            "to remove: old.test"
        );
    }
}
