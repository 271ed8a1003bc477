// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal output styling.
//!
//! Respects NO_COLOR and FORCE_COLOR. Colors are off when output is piped.

use colored::{ColoredString, Colorize};

use crate::config::ColorMode;

/// Apply the color override. Call once at startup.
pub fn init(mode: ColorMode) {
    match mode {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn banner_ok(phase: &str) -> String {
    format!(
        "{} {} {}",
        "===".dimmed(),
        format!("{} OK", phase).green().bold(),
        "===".dimmed()
    )
}

pub fn banner_fail(phase: &str, count: usize, noun: &str) -> String {
    let msg = if count == 1 {
        format!("{} FAILED: 1 {}", phase, noun)
    } else {
        format!("{} FAILED: {} {}s", phase, count, noun)
    };
    format!("{} {} {}", "===".dimmed(), msg.red().bold(), "===".dimmed())
}

pub fn status_pass() -> ColoredString {
    "✓".green()
}

pub fn status_fail() -> ColoredString {
    "✗".red()
}

pub fn title(name: &str) -> ColoredString {
    name.bold()
}

pub fn version(v: &str) -> ColoredString {
    v.dimmed()
}

pub fn section_header(header: &str) -> ColoredString {
    header.yellow().bold()
}

pub fn command(name: &str) -> ColoredString {
    name.green()
}

pub fn arg(name: &str) -> ColoredString {
    name.cyan()
}

pub fn detail(msg: &str) -> ColoredString {
    msg.dimmed()
}

pub fn passed_count(n: usize) -> ColoredString {
    format!("{} passed", n).green()
}

pub fn failed_count(n: usize) -> ColoredString {
    if n == 0 {
        format!("{} failed", n).normal()
    } else {
        format!("{} failed", n).red()
    }
}
