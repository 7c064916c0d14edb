use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vesper::config::Config;
use vesper::runtime::value::Value;
use vesper::session::Session;

/// Evaluation recurses on the host stack; give it room for the configured
/// call depth even in debug builds.
const STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    verbose: bool,
    repl: bool,
    echo: bool,
    input_path: Option<String>,
}

fn parse_args() -> Result<Options> {
    let mut args = std::env::args().skip(1);
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing config path after {arg}"))?;
                options.config_path = Some(PathBuf::from(path));
            }
            "--verbose" | "-v" => options.verbose = true,
            "--repl" => options.repl = true,
            "--echo" => options.echo = true,
            flag if flag.starts_with('-') => bail!("Unknown option '{flag}'"),
            _ => {
                options.input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }
    Ok(options)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn echo(values: &[Value]) {
    for value in values.iter().filter(|value| !value.is_none()) {
        println!("{value}");
    }
}

/// Runs one whole source text. Returns whether it completed without error.
fn run_source(session: &mut Session, source: &str, echo_values: bool) -> bool {
    let execution = session.run(source);
    for line in &execution.output {
        println!("{line}");
    }
    match &execution.outcome {
        Ok(values) => {
            if echo_values {
                echo(values);
            }
            true
        }
        Err(error) => {
            eprintln!("{}", session.render_error(error, source));
            false
        }
    }
}

fn repl(session: &mut Session) -> Result<ExitCode> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("vesper > ");
        io::stdout().flush().context("Flushing prompt")?;
        let Some(line) = lines.next() else {
            println!();
            return Ok(ExitCode::SUCCESS);
        };
        let line = line.context("Reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        run_source(session, &line, true);
    }
}

fn execute(options: Options) -> Result<ExitCode> {
    let mut config = match &options.config_path {
        Some(path) => Config::load(path).with_context(|| format!("Loading {}", path.display()))?,
        None => Config::default(),
    };
    if options.echo {
        config.echo_results = true;
    }
    if let Some(path) = &options.input_path {
        config.file_name = path.clone();
    }
    debug!(?config, "starting session");

    let echo_values = config.echo_results;
    let mut session = Session::new(config);
    if options.repl {
        return repl(&mut session);
    }

    let source = match &options.input_path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Reading {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
    };

    Ok(if run_source(&mut session, &source, echo_values) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let options = match parse_args() {
        Ok(options) => options,
        Err(error) => {
            eprintln!("error: {error:#}");
            return ExitCode::from(2);
        }
    };
    init_tracing(options.verbose);

    let worker = thread::Builder::new()
        .name("vesper".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || execute(options));
    let result = match worker {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(anyhow!("Interpreter thread panicked"))),
        Err(error) => Err(anyhow!(error).context("Spawning interpreter thread")),
    };
    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}
