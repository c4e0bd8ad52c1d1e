//! `heatlab check` command - numeric answer checking

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::format_number;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::checker::{self, check_answer, Verdict};
use crate::core::surface::TerminalSurface;

/// Tolerance used with `--expected` when none is given
const DEFAULT_TOLERANCE: f64 = 0.001;

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Exercise ID (q1, q2), or the answer itself when --expected is given
    #[arg(value_name = "EXERCISE", allow_negative_numbers = true)]
    pub exercise: Option<String>,

    /// Your answer
    #[arg(allow_negative_numbers = true)]
    pub answer: Option<String>,

    /// Check against this value instead of a registered exercise
    #[arg(long, allow_negative_numbers = true)]
    pub expected: Option<f64>,

    /// Accepted absolute difference (with --expected)
    #[arg(long, short = 't', requires = "expected")]
    pub tolerance: Option<f64>,

    /// List the registered exercises
    #[arg(long, conflicts_with_all = ["exercise", "answer", "expected"])]
    pub list: bool,
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    if args.list {
        return run_list(global);
    }

    let verdict = match (args.expected, args.exercise.as_deref(), args.answer.as_deref()) {
        (Some(expected), Some(answer), None) => {
            check_answer(expected, parse_answer(answer)?, tolerance(args.tolerance)?)
        }
        (Some(_), Some(_), Some(_)) => {
            return Err(miette::miette!(
                help = "Use `heatlab check --expected <value> <answer>`",
                "--expected takes the place of the exercise ID"
            ));
        }
        (None, Some(id), Some(answer)) => {
            let exercise = checker::exercise(id).ok_or_else(|| {
                miette::miette!(
                    help = "Run `heatlab check --list` to see the exercises",
                    "No exercise with id '{}'",
                    id
                )
            })?;
            exercise.check(parse_answer(answer)?)
        }
        _ => {
            return Err(miette::miette!(
                help = "Use `heatlab check <exercise> <answer>` or `heatlab check --expected <value> <answer>`",
                "Missing answer to check"
            ));
        }
    };

    tracing::debug!(?verdict, "Checked answer");
    report(&verdict, global)
}

fn parse_answer(text: &str) -> Result<f64> {
    text.trim()
        .parse()
        .map_err(|_| miette::miette!("'{}' is not a number", text))
}

fn tolerance(given: Option<f64>) -> Result<f64> {
    let tol = given.unwrap_or(DEFAULT_TOLERANCE);
    if !tol.is_finite() || tol < 0.0 {
        return Err(miette::miette!("Tolerance must be a non-negative number, got {}", tol));
    }
    Ok(tol)
}

fn report(verdict: &Verdict, global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(verdict).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(verdict).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Tsv => {
            println!(
                "{}\t{}\t{}\t{}",
                verdict.expected,
                verdict.got,
                verdict.tolerance,
                if verdict.passed { "pass" } else { "fail" }
            );
        }
        OutputFormat::Auto => {
            let mut surface = TerminalSurface::stdout();
            verdict.report(&mut surface);
            if global.verbose {
                println!(
                    "  {} off by {} (tolerance {})",
                    style("·").dim(),
                    format_number(verdict.delta()),
                    format_number(verdict.tolerance)
                );
            }
        }
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let exercises = checker::exercises();
    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(exercises).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(exercises).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!("{:<6} {}", style("ID").bold(), style("TITLE").bold());
            for e in exercises {
                println!("{:<6} {}", style(e.id).cyan(), e.title);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_defaults_and_rejects_negative() {
        assert_eq!(tolerance(None).unwrap(), DEFAULT_TOLERANCE);
        assert_eq!(tolerance(Some(0.5)).unwrap(), 0.5);
        assert!(tolerance(Some(-1.0)).is_err());
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer(" -184.69 ").unwrap(), -184.69);
        assert!(parse_answer("abc").is_err());
    }
}
