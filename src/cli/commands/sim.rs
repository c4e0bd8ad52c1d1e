//! `heatlab sim` command - lessons as interactive plots

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::helpers::{format_number, parse_assignment, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::graph::GraphDescription;
use crate::core::rule::UpdateRule;
use crate::core::simulation::{build_simulation, Redraw, Simulation};
use crate::lessons;
use crate::schema::template::{binding_summary, PageRenderer};

#[derive(Subcommand, Debug)]
pub enum SimCommands {
    /// List the built-in lessons
    List,

    /// Show a lesson description
    Show(ShowArgs),

    /// Render a lesson to a standalone HTML page
    Build(BuildArgs),

    /// Move sliders headlessly and print the resulting curve
    Eval(EvalArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Built-in lesson name or path to a lesson YAML file
    pub lesson: String,
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Built-in lesson name or path to a lesson YAML file
    pub lesson: String,

    /// Output file (default: <output_dir>/<lesson>.html)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct EvalArgs {
    /// Built-in lesson name or path to a lesson YAML file
    pub lesson: String,

    /// Slider value to apply, in order (e.g. --set temperature1=300)
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, f64)>,

    /// Print every point instead of a summary
    #[arg(long)]
    pub points: bool,
}

pub fn run(cmd: SimCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SimCommands::List => run_list(global),
        SimCommands::Show(args) => run_show(args, global),
        SimCommands::Build(args) => run_build(args, global),
        SimCommands::Eval(args) => run_eval(args, global),
    }
}

#[derive(Serialize)]
struct LessonRow<'a> {
    name: &'a str,
    summary: &'a str,
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let rows: Vec<LessonRow> = lessons::catalog()
        .iter()
        .map(|e| LessonRow {
            name: e.name,
            summary: e.summary,
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
                "{:<16} {}",
                style("NAME").bold(),
                style("SUMMARY").bold()
            );
            for row in &rows {
                println!(
                    "{:<16} {}",
                    style(row.name).cyan(),
                    truncate_str(row.summary, 72)
                );
            }
            if !global.quiet {
                println!();
                println!(
                    "{} lesson(s). Render one with {}",
                    style(rows.len()).cyan(),
                    style("heatlab sim build <name>").yellow()
                );
            }
        }
    }
    Ok(())
}

fn load(lesson: &str) -> Result<(GraphDescription, Simulation)> {
    let gd = lessons::resolve(lesson).map_err(|e| miette::miette!("{}", e))?;
    let sim = build_simulation(&gd).map_err(|e| miette::miette!("Cannot build '{}': {}", lesson, e))?;
    Ok((gd, sim))
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (gd, sim) = load(&args.lesson)?;

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&gd).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&gd).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!("{}", style(&gd.title).bold());
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{:<16} {:<28} {:>10} {:>10} {:>8} {:>10}",
                style("NAME").bold(),
                style("LABEL").bold(),
                style("MIN").bold(),
                style("MAX").bold(),
                style("STEP").bold(),
                style("INIT").bold()
            );
            for v in &gd.variables {
                println!(
                    "{:<16} {:<28} {:>10} {:>10} {:>8} {:>10}",
                    v.name,
                    truncate_str(&v.label, 28),
                    format_number(v.min),
                    format_number(v.max),
                    format_number(v.step),
                    format_number(v.init)
                );
            }
            println!();
            println!("  Rule:        {}", describe_rule(&gd));
            if let Some(rule) = sim.rules().first() {
                let bindings: Vec<String> = binding_summary(rule)
                    .into_iter()
                    .map(|(name, kind)| format!("{} ({})", name, kind))
                    .collect();
                println!("  Bindings:    {}", bindings.join(", "));
            }
            for c in &gd.constraints {
                println!("  Constraint:  {} < {}", c.control, c.below);
            }
            println!(
                "  Plot:        {}x{}, x [{}, {}], y [{}, {}]",
                gd.width,
                gd.height,
                format_number(gd.x_range.start),
                format_number(gd.x_range.end),
                format_number(gd.y_range.start),
                format_number(gd.y_range.end)
            );
            println!("  Points:      {}", gd.initial.len());
        }
    }
    Ok(())
}

fn describe_rule(gd: &GraphDescription) -> String {
    match &gd.rule {
        UpdateRule::Expr(formula) => format!("y = {}", formula.text()),
        UpdateRule::Script(_) => "page script".to_string(),
    }
}

fn run_build(args: BuildArgs, global: &GlobalOpts) -> Result<()> {
    let (_, sim) = load(&args.lesson)?;
    let renderer = PageRenderer::new().map_err(|e| miette::miette!("{}", e))?;
    let html = renderer
        .render_simulation(&sim)
        .map_err(|e| miette::miette!("{}", e))?;

    let output = match args.output {
        Some(path) => path,
        None => Config::load()
            .output_dir()
            .join(format!("{}.html", page_stem(&args.lesson))),
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    std::fs::write(&output, html).into_diagnostic()?;
    info!(path = %output.display(), "Wrote simulation page");

    if !global.quiet {
        println!(
            "{} Wrote {} ({} sliders)",
            style("✓").green(),
            style(output.display()).cyan(),
            sim.controls().len()
        );
    }
    Ok(())
}

/// File stem for a lesson page: the lesson name, or the stem of its file
fn page_stem(lesson: &str) -> String {
    let path = Path::new(lesson);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| lesson.to_string());
    stem.trim_end_matches(".lesson").to_string()
}

#[derive(Serialize)]
struct EvalReport<'a> {
    values: BTreeMap<String, f64>,
    revision: u64,
    deferred: bool,
    x: &'a [f64],
    y: &'a [f64],
}

fn run_eval(args: EvalArgs, global: &GlobalOpts) -> Result<()> {
    let (_, mut sim) = load(&args.lesson)?;

    let mut deferred = false;
    for (name, value) in &args.set {
        let redraw = sim
            .set_by_name(name, *value)
            .map_err(|e| miette::miette!("{}", e))?;
        if redraw == Redraw::Deferred {
            deferred = true;
        }
    }
    if deferred {
        tracing::warn!("Update rule is page script; the curve is only recomputed in the browser");
    }

    let data = sim.source().data();
    let report = EvalReport {
        values: sim.values(),
        revision: sim.source().revision(),
        deferred,
        x: &data.x,
        y: &data.y,
    };

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&report).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Tsv => print_points(&report),
        OutputFormat::Auto if args.points => print_points(&report),
        OutputFormat::Auto => {
            for (name, value) in &report.values {
                println!("{:<16} {}", style(name).cyan(), format_number(*value));
            }
            println!("{}", style("─".repeat(40)).dim());
            println!("  Points:     {}", data.len());
            match data.y_extent() {
                Some((lo, hi)) => println!(
                    "  y range:    [{}, {}]",
                    format_number(lo),
                    format_number(hi)
                ),
                None => println!("  y range:    {}", style("no finite values").yellow()),
            }
            println!("  Revision:   {}", report.revision);
        }
    }
    Ok(())
}

fn print_points(report: &EvalReport) {
    for (x, y) in report.x.iter().zip(report.y) {
        println!("{}\t{}", x, y);
    }
}
