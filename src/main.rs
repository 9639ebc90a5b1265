//! CLI binary for `taskdeck`.
//!
//! This binary is a thin wrapper that sets up logging, loads settings and
//! delegates to the library.

use std::io::{self, Read};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskdeck::cli::{self, Cli};
use taskdeck::{PluginRegistry, Session, Settings, TaskStore};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: could not load settings: {e}");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = settings.authorize_current_user() {
        eprintln!("Error: {e}");
        return ExitCode::from(1);
    }

    let path = settings.resolve_tasks_file(cli.file.as_deref());
    tracing::debug!(path = %path.display(), "using tasks file");
    let mut session = Session::new(TaskStore::new(path));
    let plugins = PluginRegistry::with_builtins();

    // Only read stdin for commands that need it (avoids blocking on terminal)
    let stdin = if cli.command.needs_stdin() { read_stdin() } else { String::new() };

    let output = cli::run(cli.command, &mut session, &plugins, &stdin);
    for line in &output.stdout {
        println!("{line}");
    }
    for line in &output.stderr {
        eprintln!("{line}");
    }
    output.exit_code
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Error reading stdin: {e}");
    }
    input
}
