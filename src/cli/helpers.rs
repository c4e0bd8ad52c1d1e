//! Shared helper functions for CLI commands

use miette::Result;
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::bank::QuestionBank;
use crate::core::config::Config;

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Compact number formatting for tables (six significant digits)
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs().log10().floor() as i32;
    if !(-4..15).contains(&magnitude) {
        let formatted = format!("{:.5e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{}", trim_fraction(mantissa), exponent),
            None => formatted,
        };
    }

    let decimals = (5 - magnitude).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, value)).to_string()
}

/// Drop trailing zeros after the decimal point
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Parse a `name=value` assignment
pub fn parse_assignment(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.trim().to_string(), value))
}

/// Built-in questions plus the extra bank from `--bank` or the config
pub fn load_bank(global: &GlobalOpts, config: &Config) -> Result<QuestionBank> {
    let mut bank = QuestionBank::builtin();
    let extra = global.bank.as_deref().or(config.question_bank.as_deref());
    if let Some(path) = extra {
        extend_bank(&mut bank, path)?;
    }
    Ok(bank)
}

fn extend_bank(bank: &mut QuestionBank, path: &Path) -> Result<()> {
    let count = bank
        .extend_from_file(path)
        .map_err(|e| miette::miette!("{}", e))?;
    tracing::info!(path = %path.display(), count, "Loaded question bank");
    Ok(())
}
