//! `heatlab validate` command - check lesson and bank files against their schemas

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::core::bank::QuestionBank;
use crate::lessons;
use crate::schema::registry::{DocumentKind, SchemaRegistry};
use crate::schema::validator::Validator;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Lesson or question bank YAML files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Treat every file as this kind instead of detecting it
    #[arg(long, short = 'k', value_enum)]
    pub kind: Option<DocumentKind>,

    /// Continue validation after first error
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let validator = Validator::new(&SchemaRegistry);
    let mut stats = ValidationStats::default();

    if !args.summary {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            args.paths.len()
        );
    }

    for path in &args.paths {
        stats.files_checked += 1;

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if !args.summary {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                stats.files_failed += 1;
                stats.total_errors += 1;
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        let filename = path.display().to_string();

        let result = validator
            .validate(&content, &filename, args.kind)
            .map_err(miette::Report::new)
            .and_then(|kind| semantic_check(kind, &content, &filename).map(|()| kind));

        match result {
            Ok(kind) => {
                stats.files_passed += 1;
                if !args.summary {
                    println!(
                        "{} {} ({})",
                        style("✓").green(),
                        path.display(),
                        kind
                    );
                }
            }
            Err(report) => {
                stats.files_failed += 1;
                stats.total_errors += report
                    .downcast_ref::<crate::schema::ValidationError>()
                    .map(|e| e.violation_count())
                    .unwrap_or(1);

                if !args.summary {
                    println!("{} {}", style("✗").red(), path.display());
                    println!("{:?}", report);
                }

                if !args.keep_going {
                    break;
                }
            }
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());

    if stats.files_failed > 0 {
        Err(miette::miette!(
            "Validation failed: {} file(s) with errors",
            stats.files_failed
        ))
    } else {
        println!();
        println!("{} All files passed validation!", style("✓").green().bold());
        Ok(())
    }
}

/// Checks the schema cannot express: formulas parse, identifiers resolve,
/// choices contain the answer
fn semantic_check(kind: DocumentKind, content: &str, filename: &str) -> Result<()> {
    match kind {
        DocumentKind::Lesson => {
            let gd = lessons::parse_lesson(content, filename)
                .map_err(|e| miette::miette!("{}", e))?;
            let warnings = gd.validate().map_err(|e| miette::miette!("{}", e))?;
            for warning in warnings {
                tracing::warn!(file = filename, "{}", warning);
            }
        }
        DocumentKind::Bank => {
            QuestionBank::new()
                .extend_from_yaml(content, filename)
                .map_err(|e| miette::miette!("{}", e))?;
        }
    }
    Ok(())
}
