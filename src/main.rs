use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use xmlquill::config::Config;
use xmlquill::document::Document;
use xmlquill::file::loader::Reader;
use xmlquill::schema::{ParseOptions, Schema};

/// XMLQuill - Extract structured records from XML with a schema
#[derive(Parser)]
#[command(name = "xmlquill")]
#[command(version)]
#[command(about = "Extract structured records from XML documents", long_about = None)]
struct Cli {
    /// Schema file (.yaml, .yml, .json or .toml)
    schema: PathBuf,

    /// XML file to read (omit or use "-" to read from stdin)
    file: Option<String>,

    /// Start extraction at the first element matching this path
    #[arg(short, long)]
    rebase: Option<String>,

    /// Restrict extraction to the children bound to this namespace prefix
    #[arg(short, long)]
    namespace: Option<String>,

    /// Evaluate every field but emit no keys
    #[arg(long)]
    ignore: bool,

    /// Output format: json or yaml (default from config, else json)
    #[arg(short, long)]
    format: Option<String>,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the config.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_document(reader: &Reader, file: Option<&str>) -> Result<Document> {
    match file {
        Some(path) if path != "-" => reader
            .local(path)
            .with_context(|| format!("Failed to load {}", path)),
        _ => {
            if io::stdin().is_terminal() {
                bail!("No XML input: pass a file or pipe a document to stdin");
            }
            reader.from_stdin().context("Failed to read XML from stdin")
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI flags override config values
    let mut config = Config::load();
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    if cli.compact {
        config.pretty = false;
    }
    config.ignore |= cli.ignore;

    init_logging(&config);

    let schema = Schema::from_path(&cli.schema)
        .with_context(|| format!("Failed to load schema {}", cli.schema.display()))?;

    let reader = Reader::with_config(&config);
    let mut document = read_document(&reader, cli.file.as_deref())?;

    if let Some(base) = cli.rebase.as_deref() {
        document
            .rebase(Some(base))
            .with_context(|| format!("Failed to rebase on {}", base))?;
    }

    let options = ParseOptions {
        ignore: config.ignore,
    };
    let output = match cli.namespace.as_deref() {
        Some(prefix) => document.namespaced(prefix, &schema, options),
        None => document.parse(&schema, options),
    };

    let rendered = if config.wants_yaml() {
        serde_yaml::to_string(&output).context("Failed to render YAML")?
    } else if config.pretty {
        serde_json::to_string_pretty(&output).context("Failed to render JSON")?
    } else {
        serde_json::to_string(&output).context("Failed to render JSON")?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", rendered.trim_end())?;

    Ok(())
}
