use anyhow::{Context, Result, bail};
use clap::Parser;
use delimload::config::{AbortPolicy, BoolStyle, DecimalStyle, IngestConfig};
use delimload::dispatcher::Dispatcher;
use delimload::io::source::InputTarget;
use delimload::logging;
use delimload::session::Session;
use delimload::session::script::ScriptSession;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};

const EXAMPLES: &str = "\
Examples:
  delimload -f /path/to/file.csv --schema \"test.test3(a int, b int, c int)\"
  delimload -f /path/to/directory --schema \"test.test3(a int, b int, c int)\" --delim \"\\t\" --num-threads 10
  delimload -f stdin --schema \"test.test3(a int, b int, c int)\" --emit load.cql";

#[derive(Parser, Debug)]
#[command(name = "delimload")]
#[command(about = "Load delimited text into a table as CQL inserts")]
#[command(version, after_help = EXAMPLES)]
struct Args {
    /// File, directory, glob pattern, or `stdin`
    #[arg(short = 'f', long = "file")]
    input: String,

    /// Table declaration, e.g. "ks.table(a int, b text)"
    #[arg(long)]
    schema: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Field delimiter (`\t` for tab)
    #[arg(long)]
    delim: Option<String>,

    /// Delimiter may appear inside double-quoted fields
    #[arg(long)]
    delim_in_quotes: bool,

    /// Date/timestamp format (chrono syntax)
    #[arg(long)]
    date_format: Option<String>,

    /// String that stands for NULL
    #[arg(long)]
    null_string: Option<String>,

    /// Number of rows to skip
    #[arg(long)]
    skip_rows: Option<i64>,

    /// Maximum number of rows to read (-1 means all)
    #[arg(long, allow_hyphen_values = true)]
    max_rows: Option<i64>,

    /// Maximum errors to endure (-1 means unbounded)
    #[arg(long, allow_hyphen_values = true)]
    max_errors: Option<i64>,

    /// Directory for badly parsed rows
    #[arg(long)]
    bad_dir: Option<PathBuf>,

    /// Number of writes in flight before a drain
    #[arg(long)]
    num_futures: Option<usize>,

    /// Decimal delimiter: '.' or ','
    #[arg(long)]
    decimal_delim: Option<String>,

    /// Style for booleans (TRUE_FALSE, 1_0, T_F, Y_N, YES_NO)
    #[arg(long)]
    bool_style: Option<String>,

    /// Number of files loaded concurrently
    #[arg(long)]
    num_threads: Option<usize>,

    /// Milliseconds to wait for outstanding writes (0 waits forever)
    #[arg(long)]
    write_timeout_ms: Option<u64>,

    /// Do not count failed writes against the error budget
    #[arg(long)]
    ignore_write_failures: bool,

    /// What an exhausted error budget stops: isolate or halt-run
    #[arg(long)]
    abort_policy: Option<String>,

    /// Where to write the generated statements (`-` for stdout)
    #[arg(long, default_value = "-")]
    emit: String,

    /// Write the run summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// More output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

/// `-1` means unbounded; other negatives are rejected.
fn limit(value: i64, what: &str) -> Result<Option<u64>> {
    match value {
        -1 => Ok(None),
        v if v < 0 => bail!("{what} must be non-negative (or -1 for unbounded)"),
        v => Ok(Some(v as u64)),
    }
}

fn unescape_delimiter(delim: &str) -> String {
    match delim {
        "\\t" => "\t".to_string(),
        "\\|" => "|".to_string(),
        other => other.to_string(),
    }
}

fn build_config(args: &Args) -> Result<IngestConfig> {
    let mut cfg = match &args.config {
        Some(path) => IngestConfig::from_json_file(path)?,
        None => IngestConfig::default(),
    };
    if let Some(schema) = &args.schema {
        cfg.schema = schema.clone();
    }
    if cfg.schema.is_empty() {
        bail!("must provide a schema");
    }
    if let Some(d) = &args.delim {
        cfg.delimiter = unescape_delimiter(d);
    }
    if args.delim_in_quotes {
        cfg.delimiter_in_quotes = true;
    }
    if let Some(f) = &args.date_format {
        cfg.date_format = Some(f.clone());
    }
    if let Some(n) = &args.null_string {
        cfg.null_string = Some(n.clone());
    }
    if let Some(n) = args.skip_rows {
        if n < 0 {
            bail!("number of rows to skip must be non-negative");
        }
        cfg.skip_rows = n as u64;
    }
    if let Some(n) = args.max_rows {
        cfg.max_rows = limit(n, "maximum number of rows")?;
    }
    if let Some(n) = args.max_errors {
        cfg.max_errors = limit(n, "maximum number of errors")?;
    }
    if let Some(dir) = &args.bad_dir {
        cfg.bad_dir = Some(dir.clone());
    }
    if let Some(n) = args.num_futures {
        cfg.pacing_threshold = n;
    }
    if let Some(d) = &args.decimal_delim {
        cfg.decimal_style = d.parse::<DecimalStyle>()?;
    }
    if let Some(s) = &args.bool_style {
        cfg.bool_style = s.parse::<BoolStyle>()?;
    }
    if let Some(n) = args.num_threads {
        cfg.num_threads = n;
    }
    if let Some(ms) = args.write_timeout_ms {
        cfg.write_timeout_ms = (ms > 0).then_some(ms);
    }
    if args.ignore_write_failures {
        cfg.count_write_failures = false;
    }
    if let Some(p) = &args.abort_policy {
        cfg.abort_policy = p.parse::<AbortPolicy>()?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn open_session(emit: &str) -> Result<ScriptSession> {
    if emit == "-" {
        return Ok(ScriptSession::stdout());
    }
    let file = File::create(emit).with_context(|| format!("create {emit}"))?;
    Ok(ScriptSession::new(file))
}

fn run(args: Args) -> Result<bool> {
    let config = build_config(&args)?;
    let session = Arc::new(open_session(&args.emit)?);
    let dispatcher = Dispatcher::new(config, session.clone())?;
    let summary = dispatcher.run(&InputTarget::parse(&args.input))?;
    session.close();

    if let Some(path) = &args.summary_json {
        summary
            .write_json(path)
            .with_context(|| format!("write summary {}", path.display()))?;
    }
    for r in summary.incomplete() {
        warn!(source = %r.source, "{} did not complete: {:?}", r.source, r.status);
    }
    Ok(summary.is_clean())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.verbose, args.quiet) {
        eprintln!("{e}");
    }
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
