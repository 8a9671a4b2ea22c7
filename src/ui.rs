// Terminal UI utilities

use colored::Colorize;

use crate::domain::{ImageOutcome, ImageState, PromotionState, RunSummary};

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

/// Status icon for one image outcome
fn outcome_icon(outcome: &ImageOutcome) -> &'static str {
    match &outcome.state {
        ImageState::Pulled => "✅",
        ImageState::PullFailed => "❌",
        ImageState::Promotion { state } => match state {
            PromotionState::Signed | PromotionState::Allowed => "✅",
            PromotionState::Denied => "⛔",
            PromotionState::Skipped => "⚠️ ",
            PromotionState::Failed(_) => "❌",
            _ => "…",
        },
    }
}

fn outcome_label(outcome: &ImageOutcome) -> String {
    match &outcome.state {
        ImageState::Pulled => "pulled".to_string(),
        ImageState::PullFailed => "pull failed".to_string(),
        ImageState::Promotion { state } => state.to_string(),
    }
}

/// Print the per-image result table of a workflow run
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{}",
        "════════════════════════════════════════════════════════════".bright_blue()
    );

    let title = format!(
        "{} run: {} image(s) in {:.1}s",
        summary.workflow.name(),
        summary.outcomes.len(),
        summary.duration.as_secs_f64()
    );
    if summary.all_succeeded() {
        println!("{}", format!("✅ {}", title).bright_green().bold());
    } else {
        println!("{}", format!("❌ {}", title).bright_red().bold());
    }

    println!();
    for outcome in &summary.outcomes {
        let line = format!(
            "   {} {} ({})",
            outcome_icon(outcome),
            outcome.image,
            outcome_label(outcome)
        );
        match &outcome.detail {
            Some(detail) => println!("{} {}", line, format!("- {}", detail).dimmed()),
            None => println!("{}", line),
        }
    }
    println!();
}
