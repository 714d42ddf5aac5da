use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use jotter_cli::Response;
use jotter_core::Settings;

/// Monthly markdown journal store. Reads one JSON request on stdin and
/// prints one JSON response on stdout.
#[derive(Parser, Debug)]
#[command(name = "jotter")]
#[command(version)]
struct Cli {
    /// Storage root (overrides NOTES_DIR and the settings file)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Settings file to read instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command to run when stdin is a terminal
    command: Option<String>,
}

fn main() -> ExitCode {
    jotter_core::load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.config.as_deref());

    let response = match read_input(cli.command.as_deref()) {
        Ok(input) => jotter_cli::run(&input, cli.root.as_deref(), cli.config.as_deref()),
        Err(err) => {
            error!(error = %err, "failed to read request");
            Response::failure("io", &format!("failed to read request: {err}"))
        }
    };

    match write_response(&response) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "failed to write response");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries only the JSON response.
fn init_tracing(config_file: Option<&Path>) {
    let level = match config_file {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map(|settings| settings.logging.level)
    .unwrap_or_else(|_| "warn".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Raw request text: stdin when piped, else the positional command name.
fn read_input(command: Option<&str>) -> io::Result<String> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut input = String::new();
        stdin.lock().read_to_string(&mut input)?;
        if !input.trim().is_empty() {
            return Ok(input);
        }
    }

    debug!(command = ?command, "no request on stdin");
    Ok(match command {
        Some(command) => serde_json::json!({ "command": command }).to_string(),
        None => String::new(),
    })
}

fn write_response(response: &Response) -> io::Result<()> {
    let json = response.to_json_pretty().map_err(io::Error::other)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    stdout.flush()
}
