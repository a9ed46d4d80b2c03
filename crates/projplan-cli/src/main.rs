use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "projplan", version, about = "Roadmap scheduling CLI")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scenario scheduling
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Backlog inspection
    Backlog {
        #[command(subcommand)]
        action: commands::backlog::BacklogAction,
    },
    /// Velocity extrapolation
    Velocity {
        #[command(subcommand)]
        action: commands::velocity::VelocityAction,
    },
}

fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("PROJPLAN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("failed to initialize logging: {e}"))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let result = init_logging(cli.verbose).and_then(|()| match cli.command {
        Commands::Schedule { action } => commands::schedule::run(action),
        Commands::Backlog { action } => commands::backlog::run(action),
        Commands::Velocity { action } => commands::velocity::run(action),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
