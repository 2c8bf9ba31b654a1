//! track CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use track::cli::{commands, Cli, Commands};
use track::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // Effective JSON mode: --json or non-TTY stdout (agent pipes).
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    match &cli.command {
        Commands::Init { name, force } => {
            commands::init::execute(name.as_deref(), *force, json)
        }
        Commands::New(args) => commands::new::execute(args, db, json),
        Commands::Update(args) => commands::update::execute(args, db, json),
        Commands::Status(args) => commands::status::execute(args, db, json),
        Commands::Show { track } => commands::show::execute(track, db, json),
        Commands::Sort { track, position, target } => {
            commands::sort::execute(track, *position, target, db, json)
        }
        Commands::Delete { track, force } => commands::delete::execute(track, *force, db, json),
        Commands::Archive { track } => commands::archive::execute(track, true, db, json),
        Commands::Unarchive { track } => commands::archive::execute(track, false, db, json),
        Commands::Completions { shell } => commands::completions::execute(*shell),
    }
}
