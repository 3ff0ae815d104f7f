//! Abacus interactive shell
//!
//! Reads one expression per line from stdin and prints `Result: <value>` or
//! `Error: <message>`. Lines starting with `/` are commands:
//! - /help: this summary
//! - /list: registered operations
//! - /extensions: loaded extension modules
//! - /reload: rescan the extension directory and reload changed modules
//! - /exit, /quit: leave
//!
//! Logs go to stderr; `RUST_LOG` overrides the default `info` level.

use abacus::{Calculator, CalculatorConfig, ENV_EXTENSION_DIR};
use abacus_core::{format_number, CalcError};
use clap::Parser;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = "\
Enter an expression, e.g. 2 + 3 * 4, -(1 + 2) ^ 2, max(1, 5, 3)

Commands:
  /help        show this help
  /list        list registered operations
  /extensions  list loaded extension modules
  /reload      rescan the extension directory, reload changed modules
  /exit /quit  leave";

#[derive(Debug, Parser)]
#[command(name = "abacus-cli")]
#[command(version)]
#[command(about = "Interactive shell for the Abacus expression calculator")]
struct Args {
    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory scanned for extension modules
    #[arg(long, value_name = "DIR", env = ENV_EXTENSION_DIR)]
    extensions: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn describe_error(calc: &Calculator, err: &CalcError) -> String {
    let mut message = err.to_string();
    if let CalcError::UnknownToken(name) = err.root() {
        let similar: Vec<String> = calc.suggestions(name).into_iter().take(5).collect();
        if !similar.is_empty() {
            message.push_str(&format!(" (similar: {})", similar.join(", ")));
        }
    } else if let Some(hint) = err.suggestion() {
        message.push_str(&format!(" ({})", hint));
    }
    message
}

/// Handle one input line. Returns `false` when the shell should exit.
fn handle_line(calc: &mut Calculator, line: &str, out: &mut impl Write) -> io::Result<bool> {
    match line {
        "/exit" | "/quit" => return Ok(false),
        "/help" => writeln!(out, "{}", HELP)?,
        "/list" => {
            for name in calc.list_operations() {
                writeln!(out, "  {}", name)?;
            }
        }
        "/extensions" => {
            let infos = calc.extensions();
            if infos.is_empty() {
                writeln!(out, "No extensions loaded")?;
            }
            for info in infos {
                match serde_json::to_string(&info) {
                    Ok(json) => writeln!(out, "  {}", json)?,
                    Err(e) => writeln!(out, "  {}: {}", info.name, e)?,
                }
            }
        }
        "/reload" => {
            let mut report = calc.refresh();
            match calc.initialize() {
                Ok(scan) => {
                    report.loaded.extend(scan.loaded);
                    report.shadowed.extend(scan.shadowed);
                    report.promoted.extend(scan.promoted);
                    report.failed.extend(scan.failed);
                }
                Err(e) => writeln!(out, "Error: {}", e)?,
            }
            writeln!(
                out,
                "Reloaded: {} loaded, {} removed, {} shadowed, {} failed",
                report.loaded.len() + report.promoted.len(),
                report.removed.len(),
                report.shadowed.len(),
                report.failed.len()
            )?;
        }
        command if command.starts_with('/') => {
            writeln!(out, "Unknown command '{}', try /help", command)?
        }
        expression => match calc.calculate(expression) {
            Ok(value) => writeln!(out, "Result: {}", format_number(value))?,
            Err(e) => writeln!(out, "Error: {}", describe_error(calc, &e))?,
        },
    }
    Ok(true)
}

fn main() -> ExitCode {
    init_logging();

    let args = Args::parse();

    let mut config = match CalculatorConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(dir) = args.extensions {
        config.extension_dir = dir;
    }

    let scan_on_init = config.scan_on_init;
    let mut calc = Calculator::with_config(config);
    if scan_on_init {
        if let Err(e) = calc.initialize() {
            tracing::warn!(error = %e, "extension scan failed, continuing with builtins");
        }
    }

    tracing::info!(
        version = VERSION,
        extension_dir = %calc.config().extension_dir.display(),
        operations = calc.list_operations().len(),
        "abacus ready"
    );

    let interactive = io::stdin().is_terminal();
    if interactive {
        println!("Abacus v{}. Type /help for commands.", VERSION);
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    loop {
        if interactive {
            let _ = write!(out, "> ");
            let _ = out.flush();
        }

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match handle_line(&mut calc, line, &mut out) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to write output");
                        return ExitCode::FAILURE;
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read input");
                return ExitCode::FAILURE;
            }
        }
    }

    calc.shutdown();
    ExitCode::SUCCESS
}
