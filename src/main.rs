use clap::Parser as _;
use erdgraph::{summary, validator, Dialect, Parser};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Schema source file
    input: PathBuf,

    /// Input dialect: table-definition, ddl or auto (default: from extension, else auto)
    #[arg(short, long)]
    dialect: Option<Dialect>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,

    /// Run the validator and exit non-zero on violations
    #[arg(long)]
    validate: bool,

    /// Print a text summary instead of JSON
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let dialect = args.dialect.unwrap_or_else(|| {
        args.input
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Dialect::from_extension)
            .unwrap_or_default()
    });

    let bytes = fs::read(&args.input)
        .map_err(|e| format!("Failed to read {}: {}", args.input.display(), e))?;
    let parsed = Parser::new(dialect).parse_bytes(&bytes)?;
    tracing::info!(
        tables = parsed.schema.tables().len(),
        relationships = parsed.schema.relationships().len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed {}",
        args.input.display()
    );

    let rendered = if args.summary {
        summary::render(&parsed.schema)
    } else if args.compact {
        serde_json::to_string(&parsed.schema)? + "\n"
    } else {
        parsed.schema.to_json()? + "\n"
    };

    match &args.output {
        Some(path) => fs::write(path, &rendered)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?,
        None => print!("{}", rendered),
    }

    if args.validate {
        let violations = validator::validate(&parsed.schema);
        for v in &violations {
            eprintln!("{}", v);
        }
        if !violations.is_empty() {
            process::exit(2);
        }
    }

    Ok(())
}
