mod cli;

use std::io::{self, Write};

use anyhow::{Context, Result};
use cli::Command;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use pyinterop::{config::Config, logging, Interpreter, PythonEngine, SystemRunner, TextEncoding};
use tracing::warn;

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let cfg = Config::load();
    logging::init(&cfg.log_level(), args.verbose);

    let code = match args.command {
        Command::List { json } => list(json)?,
        Command::Check => check()?,
        Command::Run {
            python,
            encoding,
            background,
            script,
            args,
        } => {
            let python = python.or_else(|| {
                cfg.interpreter_path()
                    .map(|p| p.to_string_lossy().into_owned())
            });
            let encoding = encoding.unwrap_or_else(|| cfg.stream_encoding());
            run(python.as_deref(), encoding, background, &script, &args)?
        }
    };

    io::stdout().flush()?;
    std::process::exit(code);
}

fn list(json: bool) -> Result<i32> {
    let found: Vec<Interpreter> = pyinterop::interpreters()?.collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(0);
    }

    if found.is_empty() {
        eprintln!("No Python interpreters found on the search path");
        return Ok(0);
    }
    let color = io::stdout().is_terminal();
    for interpreter in &found {
        if color {
            println!("{:<10} {}", interpreter.version().green(), interpreter.path());
        } else {
            println!("{:<10} {}", interpreter.version(), interpreter.path());
        }
    }
    Ok(0)
}

fn check() -> Result<i32> {
    Ok(if pyinterop::has_interpreter()? { 0 } else { 1 })
}

fn run(
    python: Option<&str>,
    encoding: TextEncoding,
    background: bool,
    script: &str,
    args: &[String],
) -> Result<i32> {
    let engine = match python {
        // Explicit interpreters are trusted; `--version` only fills in the version.
        Some(path) => {
            let interpreter = pyinterop::probe(&SystemRunner, path).unwrap_or_else(|| {
                warn!(path, "interpreter does not report a Python version, using it anyway");
                Interpreter::new(path, "")
            });
            PythonEngine::with_interpreter(interpreter)
        }
        None => PythonEngine::new().context("cannot pick a default interpreter")?,
    }
    .with_encoding(encoding);

    let result = if background {
        let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
        // execute_async spawns onto the runtime, so it must run inside block_on.
        rt.block_on(async { engine.execute_async(script, args)?.await })?
    } else {
        engine.execute(script, args)?
    };

    io::stdout().write_all(result.stdout().as_bytes())?;
    io::stderr().write_all(result.stderr().as_bytes())?;
    Ok(result.exit_code())
}
