//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    check::CheckArgs, completions::CompletionsArgs, quiz::QuizCommands, sim::SimCommands,
    validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "heatlab")]
#[command(author, version, about = "Interactive heat transfer lessons")]
#[command(long_about = "Slider-driven plots, multiple-choice quizzes and answer checks for heat transfer courses.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Extra question bank (YAML list of questions)
    #[arg(long, global = true)]
    pub bank: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive plots: list, inspect, render and drive lessons
    #[command(subcommand)]
    Sim(SimCommands),

    /// Multiple-choice questions
    #[command(subcommand)]
    Quiz(QuizCommands),

    /// Check a numeric answer against an exercise or an expected value
    Check(CheckArgs),

    /// Validate lesson and question bank files against their schemas
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
}
