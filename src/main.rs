use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use exim::envelope::EnvelopeLayout;
use exim::pipeline::{ConvertOptions, Pipeline};
use exim::resolver::{self, Invocation, Mode, UsageError};
use exim::EximError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "exim", version, about = "Etrian Odyssey tbl/mbm <-> JSON converter")]
struct Cli {
    /// Export text from a tbl/mbm file to JSON
    #[arg(short, long)]
    export: bool,
    /// Import text from a JSON file to tbl/mbm
    #[arg(short, long)]
    import: bool,
    /// The tbl uses long pointers (ignored for mbm files)
    #[arg(short, long)]
    long: bool,
    /// Export the two-line tagged layout instead of a single JSON document
    #[arg(long)]
    tagged: bool,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// [input] [output]
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let message = e.to_string();
            let first   = message.lines().next().unwrap_or("invalid arguments");
            return report_usage(&UsageError::Unrecognized(first.to_owned()));
        }
    };

    init_logging(cli.verbose);

    let invocation = Invocation {
        export:  cli.export,
        import:  cli.import,
        long:    cli.long,
        tagged:  cli.tagged,
        verbose: cli.verbose,
        paths:   cli.paths,
    };
    let resolution = match resolver::resolve(&invocation) {
        Ok(r) => r,
        Err(EximError::Usage(e)) => return report_usage(&e),
        Err(e) => return fail(&e),
    };
    if resolution.created_dir.is_some() {
        println!("Note: Created a directory for the output file.");
    }

    let layout   = if invocation.tagged { EnvelopeLayout::Tagged } else { EnvelopeLayout::Document };
    let pipeline = Pipeline::new(ConvertOptions { layout });
    let request  = &resolution.request;
    match pipeline.run(request) {
        Ok(kind) => {
            let verb = match request.mode {
                Mode::Export => "Exported",
                Mode::Import => "Imported",
            };
            println!("{verb} {kind}: {} → {}", request.input.display(), request.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Usage mistakes are reported but exit with status 0.
fn report_usage(err: &UsageError) -> ExitCode {
    match err {
        UsageError::NoArguments => print!("{}", resolver::usage(true)),
        _ => {
            eprintln!("{err}");
            if err.shows_usage() {
                print!("{}", resolver::usage(false));
            }
        }
    }
    ExitCode::SUCCESS
}

fn fail(err: &EximError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::FAILURE
}
