use clap::Parser;
use heatlab::cli::{Cli, Commands, GlobalOpts};
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping to `head` exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(&global);

    match cli.command {
        Commands::Sim(cmd) => heatlab::cli::commands::sim::run(cmd, &global),
        Commands::Quiz(cmd) => heatlab::cli::commands::quiz::run(cmd, &global),
        Commands::Check(args) => heatlab::cli::commands::check::run(args, &global),
        Commands::Validate(args) => heatlab::cli::commands::validate::run(args),
        Commands::Completions(args) => heatlab::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; RUST_LOG overrides the verbosity flags
fn init_tracing(global: &GlobalOpts) {
    let default_level = if global.verbose {
        "heatlab=debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
