//! Terminal output helpers shared by the command handlers

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::use_cases::batch::{BatchResult, OutcomeKind, RepoOutcome};
use crate::common::error::DmError;
use crate::common::result::DmResult;

/// `:: message` section header
pub fn header(message: &str) {
    println!("{} {}", "::".blue().bold(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn notice(message: &str) {
    println!("{} {}", "ℹ".cyan(), message);
}

/// Print one repository outcome as it arrives
pub fn outcome(outcome: &RepoOutcome) {
    match &outcome.kind {
        OutcomeKind::Done(message) => {
            println!("{} {}: {}", "✓".green().bold(), outcome.name.bold(), message)
        }
        OutcomeKind::Skipped(reason) => {
            println!("{} {}: {}", "-".yellow(), outcome.name.bold(), reason.yellow())
        }
        OutcomeKind::Failed(error) => {
            println!("{} {}: {}", "✗".red().bold(), outcome.name.bold(), error.to_string().red())
        }
    }
}

/// Print the body of a diff/log outcome under a repository heading
pub fn outcome_with_body(outcome: &RepoOutcome) {
    match &outcome.kind {
        OutcomeKind::Done(body) => {
            println!("{}", format!("== {} ==", outcome.name).bold());
            if body.trim().is_empty() {
                println!("{}", "(no output)".dimmed());
            } else {
                println!("{}", body.trim_end());
            }
        }
        _ => self::outcome(outcome),
    }
}

/// One-line totals after a batch
pub fn batch_summary(action: &str, result: &BatchResult) {
    let line = format!(
        "{}: {} succeeded, {} skipped, {} failed",
        action,
        result.succeeded(),
        result.skipped(),
        result.failed()
    );
    if result.is_success() {
        println!("{}", line.green());
    } else {
        println!("{}", line.red());
    }
}

/// Spinner on an interactive stdout, hidden otherwise
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    if !atty::is(atty::Stream::Stdout) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Ask before a destructive action.
///
/// `assume_yes` skips the prompt; a non-interactive stdin without it is
/// treated as a refusal.
pub fn confirm(prompt: &str, assume_yes: bool) -> DmResult<()> {
    if assume_yes {
        return Ok(());
    }
    if !atty::is(atty::Stream::Stdin) {
        tracing::warn!("stdin is not a terminal; pass --yes to confirm");
        return Err(DmError::Cancelled);
    }

    let term = Term::stderr();
    term.write_str(&format!("{} {} [y/N] ", "?".yellow().bold(), prompt))?;
    let answer = term.read_line()?;
    if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
        Ok(())
    } else {
        Err(DmError::Cancelled)
    }
}

/// Paths relative to the working directory where possible
pub fn relative(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .filter(|p| !p.as_os_str().is_empty() && !p.starts_with(".."))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Tree-style listing of a test root's modules
pub fn tree(root: &str, entries: &[String]) -> String {
    let mut out = format!("{}\n", root);
    for (i, entry) in entries.iter().enumerate() {
        let branch = if i + 1 == entries.len() { "└──" } else { "├──" };
        out.push_str(&format!("{} {}\n", branch, entry));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_tree_marks_last_entry() {
        let rendered = tree(
            "tests/",
            &["admin_changelist/".to_string(), "runtests.py".to_string()],
        );
        assert_eq!(rendered, "tests/\n├── admin_changelist/\n└── runtests.py\n");
    }

    #[test]
    fn test_relative_falls_back_outside_base() {
        let base = PathBuf::from("/work/ws");
        assert_eq!(relative(Path::new("/work/ws/src/django"), &base), "src/django");
        assert_eq!(relative(Path::new("/elsewhere/x"), &base), "/elsewhere/x");
    }

    #[test]
    fn test_confirm_with_assume_yes() {
        assert!(confirm("reset everything?", true).is_ok());
    }
}
