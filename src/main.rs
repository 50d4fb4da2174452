use anyhow::{Context as _, Result};
use clap::{Parser as ClapParser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use structlayout::analyzer::{Context, Options};
use structlayout::error::AnalysisError;
use structlayout::report::Report;
use structlayout::target::Target;
use structlayout::type_table::TypeTable;

fn parse_target(s: &str) -> Result<Target, String> {
    s.parse()
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Ron,
}

/// Shows how a Go struct is laid out in memory: the offset, size and alignment
/// of every field and the padding the compiler inserts between them.
#[derive(ClapParser, Debug)]
#[command(version)]
struct Args {
    /// Go source file containing the struct declaration.
    source_file: PathBuf,

    /// Name of the struct type to analyze.
    record_name: String,

    /// GOARCH to compute the layout for. Defaults to the host architecture.
    #[arg(short, long, value_parser = parse_target)]
    target: Option<Target>,

    /// RON file with additional named types.
    #[arg(long)]
    types: Option<PathBuf>,

    /// Also resolve types declared in the source file itself.
    #[arg(short, long, default_value_t = false)]
    local: bool,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Write the report here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn render(report: &Report, format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(report.to_string()),
        Format::Ron => {
            let mut text = report.to_ron().context("failed to serialize report")?;
            text.push('\n');
            Ok(text)
        }
    }
}

fn run(args: &Args, context: &mut Context) -> Result<std::result::Result<Report, AnalysisError>> {
    if let Some(path) = &args.types {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read type table {}", path.display()))?;
        let table = TypeTable::from_ron(&text)
            .with_context(|| format!("failed to parse type table {}", path.display()))?;

        if let Err(e) = context.load_type_table(&table) {
            return Ok(Err(e));
        }
    }

    let options = Options {
        register_local_types: args.local,
    };

    Ok(context.analyze_file(&args.source_file, &args.record_name, &options))
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let args = Args::parse();
    let target = args.target.unwrap_or_else(Target::host);

    let mut context = Context::new(target);

    let report = match run(&args, &mut context)? {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error[{}]: {e}", e.kind());
            return Ok(ExitCode::FAILURE);
        }
    };

    let rendered = render(&report, args.format)?;

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }

    Ok(ExitCode::SUCCESS)
}
