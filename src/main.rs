use annowiki::clean::CompactOptions;
use annowiki::config::{DEFAULT_MAX_FILE_SIZE, MIN_FILE_SIZE};
use annowiki::extract::{run_extraction, ExtractOptions};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "annowiki")]
#[command(about = "Extract annotated plain text from Wikipedia dumps")]
struct Cli {
    /// Path to the Wikipedia dump file (.xml or .xml.bz2)
    #[arg(short, long)]
    input: String,

    /// Output directory for generated files
    #[arg(short, long)]
    output: String,

    /// Bytes per output file before rotation (accepts K/M suffix)
    #[arg(short, long, default_value = "500K")]
    bytes: String,

    /// Compress record files with bzip2
    #[arg(short, long)]
    compress: bool,

    /// Worker threads for parallel extraction (0 = all cores)
    #[arg(short, long, default_value_t = 0)]
    workers: usize,

    /// URL prefix for article links
    #[arg(short, long, default_value = annowiki::config::DEFAULT_URL_PREFIX)]
    prefix: String,

    /// Keep annotations whose target contains a #fragment
    #[arg(short, long)]
    keep_anchors: bool,

    /// Drop bulleted list lines instead of keeping their text
    #[arg(long)]
    drop_lists: bool,

    /// Drop numbered list lines instead of keeping their text
    #[arg(long)]
    drop_enumerations: bool,

    /// Drop table remnants instead of keeping their text
    #[arg(long)]
    drop_tables: bool,

    /// Drop indented lines instead of keeping their text
    #[arg(long)]
    drop_indents: bool,

    /// Limit number of pages to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parses a size argument like `500K`, `2M` or a plain byte count.
fn parse_file_size(arg: &str) -> Result<u64> {
    let arg = arg.trim();
    let (digits, multiplier) = match arg.chars().last() {
        Some('k') | Some('K') => (&arg[..arg.len() - 1], 1024),
        Some('m') | Some('M') => (&arg[..arg.len() - 1], 1024 * 1024),
        _ => (arg, 1),
    };
    let size = digits
        .parse::<u64>()
        .with_context(|| format!("Invalid size: {}", arg))?
        * multiplier;
    if size < MIN_FILE_SIZE {
        bail!(
            "Output file size must be at least {}K, got: {}",
            MIN_FILE_SIZE / 1024,
            arg
        );
    }
    Ok(size)
}

fn run(cli: Cli) -> Result<()> {
    let max_file_size = if cli.bytes.is_empty() {
        DEFAULT_MAX_FILE_SIZE
    } else {
        parse_file_size(&cli.bytes)?
    };

    if !cli.prefix.ends_with('/') {
        bail!("URL prefix must end with '/': {}", cli.prefix);
    }

    if cli.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.workers)
            .thread_name(|i| format!("annowiki-worker-{}", i))
            .build_global()
            .context("Failed to configure worker pool")?;
    }

    let opts = ExtractOptions {
        url_prefix: cli.prefix,
        keep_anchors: cli.keep_anchors,
        compact: CompactOptions {
            drop_lists: cli.drop_lists,
            drop_enumerations: cli.drop_enumerations,
            drop_tables: cli.drop_tables,
            drop_indents: cli.drop_indents,
        },
    };

    let start = Instant::now();
    let stats = run_extraction(
        &cli.input,
        &cli.output,
        &opts,
        cli.compress,
        max_file_size,
        cli.limit,
    )?;
    let duration = start.elapsed();
    info!(duration_secs = duration.as_secs_f64(), "Extraction complete");

    println!();
    println!("=== Summary ===");
    println!("Extraction time:    {:.2}s", duration.as_secs_f64());
    println!();
    println!("Articles written:   {}", stats.articles());
    println!("Annotations:        {}", stats.annotations());
    println!("Anchors dropped:    {}", stats.anchors());
    println!("Invalid links:      {}", stats.invalid());
    println!("Redirects:          {}", stats.redirects());
    println!("Category pages:     {}", stats.categories());
    println!("Pages rejected:     {}", stats.rejected());
    println!("Pages skipped:      {}", stats.skipped());
    println!("Empty articles:     {}", stats.empty());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    match run(cli) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
