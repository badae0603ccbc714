//! ANSI colour helpers for terminal output.

use antikoala_core::TierColor;
use once_cell::sync::Lazy;
use std::io::IsTerminal;

pub const RESET: &str = "\x1b[0m";
pub const GREY: &str = "\x1b[90m";
pub const BOLD: &str = "\x1b[1m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
/// 256-colour orange; plain terminals fall back to their nearest match
pub const ORANGE: &str = "\x1b[38;5;208m";

/// Colour only when stdout is a terminal and `NO_COLOR` is unset
static ENABLED: Lazy<bool> =
    Lazy::new(|| std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal());

fn enabled() -> bool {
    *ENABLED
}

pub fn code_for(color: TierColor) -> &'static str {
    match color {
        TierColor::Gray => GREY,
        TierColor::Blue => BLUE,
        TierColor::Green => GREEN,
        TierColor::Yellow => YELLOW,
        TierColor::Orange => ORANGE,
        TierColor::Red => RED,
    }
}

pub fn paint(code: &str, text: &str) -> String {
    if enabled() && !text.is_empty() {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}

pub fn tier(color: TierColor, text: &str) -> String {
    paint(code_for(color), text)
}

/// Grey placeholder for a missing value
pub fn optional(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => paint(GREY, "--:--"),
    }
}
