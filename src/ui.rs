use console::style;
use get_version::{StageOutcome, VersionResolutionError};

pub fn display_version(version: &str) {
    println!("{}", version);
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Print a resolution failure, one line per stage that came up empty
pub fn display_resolution_error(err: &VersionResolutionError) {
    match err {
        VersionResolutionError::NoVersionSourceFound { path, outcomes } => {
            display_error(&format!("No version found for {}", path.display()));
            for outcome in outcomes {
                display_outcome(outcome);
            }
        }
        other => display_error(&other.to_string()),
    }
}

fn display_outcome(outcome: &StageOutcome) {
    let mut lines = outcome.message.lines();
    eprintln!(
        "  {} {}: {}",
        style("→").yellow(),
        style(outcome.source).bold(),
        lines.next().unwrap_or_default()
    );
    for line in lines {
        eprintln!("      {}", line);
    }
}
