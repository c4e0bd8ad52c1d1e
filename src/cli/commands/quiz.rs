//! `heatlab quiz` command - multiple-choice questions

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::helpers::{load_bank, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::bank::QuestionBank;
use crate::core::config::Config;
use crate::core::quiz::{Outcome, QuestionRecord, QuizWidget, RandomShuffle, Shuffler};
use crate::core::surface::{RecordingSurface, Surface, TerminalSurface};
use crate::schema::template::PageRenderer;

#[derive(Subcommand, Debug)]
pub enum QuizCommands {
    /// List available questions
    List,

    /// Ask a question
    Ask(AskArgs),

    /// Print the worked explanation of a question
    Explain(ExplainArgs),
}

#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// Question ID (see `heatlab quiz list`)
    pub id: String,

    /// Answer with this choice instead of prompting
    #[arg(long, short = 'a')]
    pub answer: Option<String>,

    /// Write an HTML fragment of the question instead of asking it
    #[arg(long, value_name = "FILE")]
    pub html: Option<PathBuf>,

    /// Seed for the choice order (overrides shuffle_seed from config)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct ExplainArgs {
    /// Question ID
    pub id: String,
}

pub fn run(cmd: QuizCommands, global: &GlobalOpts) -> Result<()> {
    let config = Config::load();
    match cmd {
        QuizCommands::List => run_list(global, &config),
        QuizCommands::Ask(args) => run_ask(args, global, &config),
        QuizCommands::Explain(args) => run_explain(args, global, &config),
    }
}

#[derive(Serialize)]
struct QuestionRow<'a> {
    id: &'a str,
    question: &'a str,
    choices: &'a [String],
}

fn run_list(global: &GlobalOpts, config: &Config) -> Result<()> {
    let bank = load_bank(global, config)?;
    let rows: Vec<QuestionRow> = bank
        .iter()
        .map(|r| QuestionRow {
            id: &r.id,
            question: &r.question,
            choices: &r.choices,
        })
        .collect();

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rows).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&rows).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<18} {:<8} {}",
                style("ID").bold(),
                style("CHOICES").bold(),
                style("QUESTION").bold()
            );
            for row in &rows {
                println!(
                    "{:<18} {:<8} {}",
                    style(row.id).cyan(),
                    row.choices.len(),
                    truncate_str(row.question, 60)
                );
            }
            if !global.quiet {
                println!();
                println!("{} question(s)", style(rows.len()).cyan());
            }
        }
    }
    Ok(())
}

fn find<'a>(bank: &'a QuestionBank, id: &str) -> Result<&'a QuestionRecord> {
    bank.get(id).ok_or_else(|| {
        miette::miette!(
            help = "Run `heatlab quiz list` to see the available questions",
            "No question with id '{}'",
            id
        )
    })
}

fn run_ask(args: AskArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let bank = load_bank(global, config)?;
    let record = find(&bank, &args.id)?;

    match args.seed.or(config.shuffle_seed) {
        Some(seed) => ask(record, &args, global, &mut RandomShuffle::seeded(seed)),
        None => ask(record, &args, global, &mut RandomShuffle::thread()),
    }
}

#[derive(Serialize)]
struct AskReport<'a> {
    id: &'a str,
    question: &'a str,
    buttons: &'a [String],
    answer: &'a str,
    outcome: Outcome,
    feedback: &'static str,
}

fn ask(
    record: &QuestionRecord,
    args: &AskArgs,
    global: &GlobalOpts,
    shuffler: &mut impl Shuffler,
) -> Result<()> {
    if let Some(path) = &args.html {
        let widget = QuizWidget::ask(record, shuffler, &mut RecordingSurface::new());
        let renderer = PageRenderer::new().map_err(|e| miette::miette!("{}", e))?;
        let html = renderer
            .render_quiz(&widget, &record.id)
            .map_err(|e| miette::miette!("{}", e))?;
        std::fs::write(path, html).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Wrote {} ({} choices)",
                style("✓").green(),
                style(path.display()).cyan(),
                widget.buttons().len()
            );
        }
        return Ok(());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let answer = args.answer.as_deref().ok_or_else(|| {
                miette::miette!("--answer is required with --format json or yaml")
            })?;
            let mut surface = RecordingSurface::new();
            let mut widget = QuizWidget::ask(record, shuffler, &mut surface);
            let outcome = answer_with(&mut widget, answer, &mut surface)?;
            let report = AskReport {
                id: &record.id,
                question: widget.question(),
                buttons: widget.buttons(),
                answer,
                outcome,
                feedback: outcome.feedback(),
            };
            if global.format == OutputFormat::Json {
                let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
                println!("{}", json);
            } else {
                let yaml = serde_yml::to_string(&report).into_diagnostic()?;
                print!("{}", yaml);
            }
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            let mut surface = TerminalSurface::stdout().quiet(global.quiet);
            let mut widget = QuizWidget::ask(record, shuffler, &mut surface);
            match &args.answer {
                Some(answer) => {
                    answer_with(&mut widget, answer, &mut surface)?;
                }
                None => {
                    if !surface.term().is_term() {
                        return Err(miette::miette!(
                            help = "Pass --answer <choice> when not running in a terminal",
                            "Cannot prompt for an answer: stdout is not a terminal"
                        ));
                    }
                    let index = Select::with_theme(&ColorfulTheme::default())
                        .items(widget.buttons())
                        .default(0)
                        .report(false)
                        .interact()
                        .into_diagnostic()?;
                    widget.activate(index, &mut surface);
                }
            }
        }
    }
    Ok(())
}

fn answer_with(
    widget: &mut QuizWidget,
    answer: &str,
    surface: &mut impl Surface,
) -> Result<Outcome> {
    let answer = answer.trim();
    widget.activate_label(answer, surface).ok_or_else(|| {
        miette::miette!(
            help = format!("Choices are: {}", widget.buttons().join(", ")),
            "'{}' is not one of the choices",
            answer
        )
    })
}

fn run_explain(args: ExplainArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let bank = load_bank(global, config)?;
    let record = find(&bank, &args.id)?;

    match &record.explanation {
        Some(text) => println!("{}", text),
        None => {
            if !global.quiet {
                println!(
                    "{} No explanation recorded for {}",
                    style("!").yellow(),
                    style(&record.id).cyan()
                );
            }
        }
    }
    Ok(())
}
