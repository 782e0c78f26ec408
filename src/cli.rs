//! Command line configuration and dispatch.

use std::error::Error;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use derive_more::Display;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::front_end::pretty::program_to_string;
use crate::front_end::*;
use crate::middle_end::analysis::{
    analyze_program, analyze_scope, liveness::LiveVariables, printer::Printer,
    reaching_defs::ReachingDefs, Annotations, GenKill,
};
use crate::middle_end::instrumentation::{instrument, InstrumentOptions};

#[derive(Debug, Parser)]
#[command(
    name = "matflow",
    version,
    about = "Dataflow reports and profiling instrumentation for MATLAB-like code"
)]
pub struct Cli {
    /// Source file; standard input when absent.
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// More logging on stderr: -v for info, -vv for debug, -vvv for trace.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dump the syntax tree.
    Parse {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Print every statement between its IN and OUT reaching-style sets.
    Reaching {
        /// Only analyse the function with this name.
        #[arg(long)]
        function: Option<String>,
    },
    /// Print every statement between its IN and OUT "live variable" sets.
    Live {
        /// Only analyse the function with this name.
        #[arg(long)]
        function: Option<String>,
    },
    /// Print the program with profiling counters injected.
    Instrument {
        /// Do not classify names, so no call site is counted.
        #[arg(long)]
        no_classify: bool,
    },
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, ValueEnum)]
pub enum Format {
    #[display(fmt = "json")]
    Json,
    #[display(fmt = "sexp")]
    Sexp,
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum CliError {
    #[display(fmt = "no function named `{}`", _0)]
    UnknownFunction(String),
}
impl Error for CliError {}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    fn source(&self) -> io::Result<String> {
        match &self.input {
            Some(path) => std::fs::read_to_string(path),
            None => {
                let mut code = String::new();
                io::stdin().read_to_string(&mut code)?;
                Ok(code)
            }
        }
    }
}

// installs the stderr logger; RUST_LOG directives override `level`.
pub fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    // a logger installed by the embedding program wins.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Runs the selected command, writing its output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let code = cli.source()?;
    let mut program = parse(&code)?;

    match &cli.command {
        Command::Parse { format } => {
            let dump = match format {
                Format::Json => serde_json::to_string_pretty(&program)?,
                Format::Sexp => serde_lexpr::to_string(&program)?,
            };
            writeln!(out, "{dump}")?;
        }
        Command::Reaching { function } => {
            report(&ReachingDefs, &program, function.as_deref(), out)?;
        }
        Command::Live { function } => {
            report(&LiveVariables, &program, function.as_deref(), out)?;
        }
        Command::Instrument { no_classify } => {
            let options = InstrumentOptions {
                classify_calls: !no_classify,
            };
            let summary = instrument(&mut program, &options)?;
            info!(%summary, "instrumented");
            write!(out, "{}", program_to_string(&program))?;
        }
    }
    Ok(())
}

fn report<A: GenKill>(
    analysis: &A,
    program: &Program,
    function: Option<&str>,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let annotations: Annotations = match function {
        Some(name) => {
            let scope = program
                .find_function(name)
                .ok_or_else(|| CliError::UnknownFunction(name.to_string()))?;
            analyze_scope(analysis, program, scope)?
        }
        None => analyze_program(analysis, program)?,
    };
    Printer::new(analysis, program, &annotations).print(out)?;
    Ok(())
}
