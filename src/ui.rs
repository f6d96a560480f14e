use colored::*;
use terminal_size::{Width, Height, terminal_size};

use crate::session::TurnRole;

fn rule() -> String {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    "─".repeat(width.0 as usize)
}

pub fn print_scout_header(model: &str, provider: &str) {
    let line = rule();
    println!("{}", line.black().bold());

    let logo = "🔭";
    let name = "Scout".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();

    println!("  {} {} {}", logo, name, version);

    let info = format!("  {}  •  {}", model, provider).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

/// One transcript line, styled by role.
pub fn print_turn(role: TurnRole, text: &str) {
    match role {
        TurnRole::User => println!("\n{}: {}", "You".blue().bold(), text),
        TurnRole::Assistant => println!("\n{}: {}", "Scout".green().bold(), text),
    }
}

/// Nested, dimmed line for live agent progress.
pub fn print_trail(label: &str, detail: &str) {
    let detail = detail.replace('\n', " ");
    println!("    {} {} {}", "│".black().bold(), label.magenta(), detail.dimmed());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}
