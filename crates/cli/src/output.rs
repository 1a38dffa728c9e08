//! Terminal output helpers.

use colored::*;
use std::env;

/// Check if colored output should be used
fn use_colored_output() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" || term == "unknown" {
            return false;
        }
    }
    if env::var("CI").is_ok() || env::var("CONTINUOUS_INTEGRATION").is_ok() {
        return false;
    }
    true
}

/// Print a section heading
pub fn print_heading(text: &str) {
    if use_colored_output() {
        println!("{}", text.bold());
    } else {
        println!("{text}");
    }
}

/// Print a tagged message
pub fn print_colored(tag: &str, message: &str) {
    if use_colored_output() {
        println!("[{}] {message}", tag.bright_blue().bold());
    } else {
        println!("[{tag}] {message}");
    }
}

/// Print an error message on stderr
pub fn print_error(tag: &str, message: &str) {
    if use_colored_output() {
        eprintln!("[{}] {message}", tag.bright_red().bold());
    } else {
        eprintln!("[{tag}] {message}");
    }
}

pub fn print_success(tag: &str, message: &str) {
    if use_colored_output() {
        println!("[{}] {message}", tag.bright_green().bold());
    } else {
        println!("[{tag}] {message}");
    }
}

/// Renders a packed `major * 10000 + minor * 100 + micro` version number.
pub fn format_version(version: u64) -> String {
    format!(
        "{}.{}.{}",
        version / 10000,
        version / 100 % 100,
        version % 100
    )
}
