use clap::{Parser, Subcommand};
use site2zim::archive::DirectoryWriter;
use site2zim::config::{self, ConvertConfig};
use site2zim::{naming, output, pipeline, report};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Flags shared by `convert` and `check`. Each one overrides the config key
/// of the same name.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Root directory of the mirrored site
    site: PathBuf,

    /// Config file (default: ./site2zim.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the archive and report are written to
    #[arg(long, default_value = "zim")]
    output: PathBuf,

    /// Archive name; derived from the title when omitted
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    creator: Option<String>,

    #[arg(long)]
    publisher: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// ISO 639-3 language code, e.g. "eng"
    #[arg(long)]
    language: Option<String>,

    /// Image stored as the archive illustration
    #[arg(long)]
    icon: Option<PathBuf>,

    /// Entry the archive opens on
    #[arg(long)]
    main_page: Option<String>,

    /// Re-encode JPEG and PNG images, keeping the result when smaller
    #[arg(long)]
    optimize_images: bool,

    /// Downscale wider images to this width (with --optimize-images)
    #[arg(long)]
    max_image_width: Option<u32>,

    /// JPEG quality 1-100 (with --optimize-images)
    #[arg(long)]
    image_quality: Option<u32>,

    /// Worker threads, capped at the core count
    #[arg(long)]
    max_processes: Option<usize>,

    /// Run every check and report, but write no archive
    #[arg(long)]
    dry_run: bool,

    /// Also write conversion_report.html and conversion_report.json
    #[arg(long)]
    report: bool,
}

#[derive(Parser)]
#[command(name = "site2zim")]
#[command(about = "Turn a mirrored website into an offline archive namespace")]
#[command(long_about = "\
Turn a mirrored website into an offline archive namespace

The site directory is walked, every file is labelled with a content type,
site-absolute references in HTML and CSS are rewritten to relative ones, and
every reference is checked against the files that exist. Problems are
reported, never fixed by guessing.

  mirror/
  ├── index.html         /css/style.css  →  css/style.css
  ├── css/style.css
  └── blog/
      └── post1.html     /images/a.png   →  ../images/a.png

Settings come from stock defaults, then site2zim.toml, then flags.

Run 'site2zim gen-config' to generate a documented site2zim.toml.")]
#[command(version)]
struct Cli {
    /// Log debug detail
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log errors only
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every stage and write the archive
    Convert(RunArgs),
    /// Run every check and print the report; writes nothing
    Check(RunArgs),
    /// Print a stock site2zim.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Convert(args) => {
            let config = load(&args)?;
            run(&args, &config)?;
        }
        Command::Check(args) => {
            let mut config = load(&args)?;
            config.dry_run = true;
            run(&args, &config)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Default level `info`; `RUST_LOG` wins over the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(args: &RunArgs) -> Result<ConvertConfig, config::ConfigError> {
    let mut config = config::load_config(args.config.as_deref(), overrides(args))?;
    if config.name.is_none() {
        config.name = config
            .title
            .as_deref()
            .and_then(naming::sanitize_archive_name);
    }
    Ok(config)
}

/// Flags the user actually passed, as a TOML table keyed like the config file.
fn overrides(args: &RunArgs) -> toml::Value {
    let mut table = toml::Table::new();
    let strings = [
        ("name", &args.name),
        ("title", &args.title),
        ("creator", &args.creator),
        ("publisher", &args.publisher),
        ("description", &args.description),
        ("language", &args.language),
        ("main-page", &args.main_page),
    ];
    for (key, value) in strings {
        if let Some(value) = value {
            table.insert(key.to_string(), toml::Value::String(value.clone()));
        }
    }
    if let Some(icon) = &args.icon {
        table.insert(
            "icon".to_string(),
            toml::Value::String(icon.to_string_lossy().into_owned()),
        );
    }
    if let Some(width) = args.max_image_width {
        table.insert("max-image-width".to_string(), i64::from(width).into());
    }
    if let Some(quality) = args.image_quality {
        table.insert("image-quality".to_string(), i64::from(quality).into());
    }
    if let Some(processes) = args.max_processes {
        let processes = i64::try_from(processes).unwrap_or(i64::MAX);
        table.insert("max-processes".to_string(), processes.into());
    }
    for (key, set) in [
        ("optimize-images", args.optimize_images),
        ("dry-run", args.dry_run),
        ("report", args.report),
    ] {
        if set {
            table.insert(key.to_string(), true.into());
        }
    }
    toml::Value::Table(table)
}

fn run(args: &RunArgs, config: &ConvertConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.dry_run {
        println!("==> Checking {}", args.site.display());
    } else {
        println!("==> Converting {}", args.site.display());
    }

    let mut writer = DirectoryWriter::new(&args.output);
    let conversion = pipeline::convert(&args.site, config, Some(&mut writer))?;
    output::print_report(&conversion.report);

    let report_path = if config.report {
        let title = config
            .title
            .clone()
            .unwrap_or_else(|| site_label(&args.site));
        Some(report::write_report(
            &conversion.report,
            &title,
            &args.output,
        )?)
    } else {
        None
    };

    println!();
    output::print_artifacts(writer.written(), report_path.as_deref());
    if conversion.report.is_clean() {
        println!("==> No findings");
    } else {
        println!("==> {} findings", conversion.report.findings.len());
    }
    Ok(())
}

/// Report title fallback for runs without metadata.
fn site_label(site: &Path) -> String {
    site.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| site.display().to_string())
}
