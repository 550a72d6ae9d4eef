//! tw5md - TiddlyWiki5 to Markdown (and anything pandoc writes)
//!
//! Usage:
//!   tw5md convert -f tiddler.tid > tiddler.md
//!   tw5md list wiki.html --tag math
//!   tw5md show wiki.html "My tiddler" -o tiddler.html
//!   tw5md export wiki.html -o notes.pdf --sort modified -- --toc
//!   tw5md random wiki.html --exclude-tag draft

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use tw5md::config::ExportConfig;
use tw5md::converter::{BuiltinConverter, DocumentConverter, OutputFormat};
use tw5md::export::{export_markdown, export_tiddler, BatchExporter, ExportOptions, SortKey};
use tw5md::tiddler::Tiddler;
use tw5md::transducer::Transducer;
use tw5md::wiki::{TiddlerFilter, TiddlyWiki};

#[derive(Parser)]
#[command(name = "tw5md")]
#[command(about = "Convert TiddlyWiki5 markup and wikis to Markdown and other formats")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: <config dir>/tw5md/tw5md.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write the log to this file
    #[arg(long, global = true, value_name = "FILE")]
    logfile: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Args, Clone, Debug, Default)]
struct FilterArgs {
    /// Only tiddlers carrying one of these tags
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Skip tiddlers carrying any of these tags
    #[arg(long = "exclude-tag", value_name = "TAG")]
    exclude_tags: Vec<String>,

    /// Only tiddlers whose title starts with this prefix
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,
}

impl From<FilterArgs> for TiddlerFilter {
    fn from(args: FilterArgs) -> Self {
        TiddlerFilter {
            include_tags: args.tags,
            exclude_tags: args.exclude_tags,
            title_prefix: args.prefix,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
enum ReportFormat {
    /// JSON format
    Json,
    /// Human-readable text
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert tw5 markup to Markdown
    Convert {
        /// Input file with tw5 markup (reads from stdin if not specified)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Output Markdown file (writes to stdout if not specified)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// List the tiddlers of a wiki
    List {
        /// Saved TiddlyWiki html file
        wiki: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Export one tiddler
    Show {
        wiki: PathBuf,

        /// Title of the tiddler
        title: String,

        /// Output file (writes Markdown to stdout if not specified)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Output format (default: from the output extension)
        #[arg(long)]
        format: Option<String>,

        /// Use the built-in converter instead of pandoc (md and html only)
        #[arg(long)]
        builtin: bool,
    },

    /// Export many tiddlers into one document
    Export {
        wiki: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Output format (default: from the output extension)
        #[arg(long)]
        format: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Order of tiddlers: created, modified or title
        #[arg(long)]
        sort: Option<SortKey>,

        /// Concurrent conversions
        #[arg(short, long)]
        workers: Option<usize>,

        /// Keep characters beyond Latin-1 in PDF output
        #[arg(long)]
        keep_unicode: bool,

        /// Use the built-in converter instead of pandoc (md and html only)
        #[arg(long)]
        builtin: bool,

        /// Write the batch report to this file
        #[arg(long, value_name = "REPORT_FILE")]
        report: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        report_format: ReportFormat,

        /// Extra arguments for pandoc
        #[arg(last = true)]
        pandoc_args: Vec<String>,
    },

    /// Print a random tiddler as Markdown
    Random {
        wiki: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Use the built-in converter instead of pandoc (HTML tiddlers are
        /// then reported instead of printed)
        #[arg(long)]
        builtin: bool,
    },
}

fn init_logger(filter_level: log::LevelFilter, logfile: Option<&Path>) -> Result<()> {
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![simplelog::TermLogger::new(
        filter_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )];
    if let Some(filename) = logfile {
        let file = File::create(filename)
            .with_context(|| format!("cannot create log file {}", filename.display()))?;
        loggers.push(simplelog::WriteLogger::new(
            filter_level,
            simplelog::Config::default(),
            file,
        ));
    }
    simplelog::CombinedLogger::init(loggers)?;
    Ok(())
}

fn resolve_format(format: Option<&str>, output: Option<&Path>) -> OutputFormat {
    match (format, output) {
        (Some(name), _) => OutputFormat::from_name(name),
        (None, Some(path)) => OutputFormat::from_path(path).unwrap_or_default(),
        (None, None) => OutputFormat::Markdown,
    }
}

fn select_converter(config: &ExportConfig, builtin: bool, extra_args: &[String]) -> Arc<dyn DocumentConverter> {
    if builtin {
        Arc::new(BuiltinConverter::new())
    } else {
        Arc::new(config.pandoc().with_args(extra_args.iter().cloned()))
    }
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(
                File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
            );
            writer.write_all(bytes)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            writer.write_all(bytes)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn load_wiki(path: &Path) -> Result<TiddlyWiki> {
    let wiki = TiddlyWiki::from_file(path)?;
    log::debug!(
        "loaded {} tiddler(s) from {}",
        wiki.len(),
        path.display()
    );
    Ok(wiki)
}

fn selected(wiki: &TiddlyWiki, filter: FilterArgs) -> Vec<Tiddler> {
    let filter = TiddlerFilter::from(filter);
    wiki.filter(|t| filter.matches(t))
        .into_iter()
        .cloned()
        .collect()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logger(cli.verbose.log_level_filter(), cli.logfile.as_deref())?;

    let config = match &cli.config {
        Some(path) => ExportConfig::load_from(path)?,
        None => ExportConfig::load()?,
    };

    match cli.command {
        Commands::Convert { file, output } => {
            let input = match &file {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let markdown = Transducer::new().convert(&input)?;
            write_output(output.as_deref(), markdown.as_bytes())?;
        }

        Commands::List { wiki, filter } => {
            let wiki = load_wiki(&wiki)?;
            for tiddler in selected(&wiki, filter) {
                println!("{}", tiddler.summary());
            }
        }

        Commands::Show {
            wiki,
            title,
            output,
            format,
            builtin,
        } => {
            let wiki = load_wiki(&wiki)?;
            let tiddler = wiki
                .find(|t| t.title == title)
                .ok_or_else(|| anyhow!("no tiddler titled '{}'", title))?;
            let format = resolve_format(format.as_deref(), output.as_deref());
            let options = ExportOptions::new(format);
            let converter = select_converter(&config, builtin, &[]);
            let bytes = export_tiddler(tiddler, converter.as_ref(), &options)?;
            write_output(output.as_deref(), &bytes)?;
        }

        Commands::Export {
            wiki,
            output,
            format,
            filter,
            sort,
            workers,
            keep_unicode,
            builtin,
            report,
            report_format,
            pandoc_args,
        } => {
            let wiki = load_wiki(&wiki)?;
            let tiddlers = selected(&wiki, filter);
            if tiddlers.is_empty() {
                bail!("no tiddlers match the given filters");
            }

            let format = resolve_format(format.as_deref(), Some(output.as_path()));
            let mut options = ExportOptions::new(format)
                .with_title(wiki.title.clone().unwrap_or_default())
                .with_subtitle(
                    wiki.subtitle
                        .clone()
                        .or_else(|| config.subtitle.clone())
                        .unwrap_or_default(),
                )
                .with_sort_key(sort.unwrap_or(config.sort_key));
            if let Some(workers) = workers.or(config.workers) {
                options = options.with_workers(workers);
            }
            if keep_unicode {
                options = options.with_latin1(false);
            }

            let exporter = BatchExporter::new(select_converter(&config, builtin, &pandoc_args), options);
            let outcome = exporter.run(tiddlers).await?;
            write_output(Some(output.as_path()), &outcome.document)?;

            eprint!("{}", outcome.report.to_text());
            eprintln!("✓ Output written to {}", output.display());

            if let Some(report_path) = report {
                let content = match report_format {
                    ReportFormat::Json => outcome.report.to_json()?,
                    ReportFormat::Text => outcome.report.to_text(),
                };
                fs::write(&report_path, content)
                    .with_context(|| format!("cannot write report {}", report_path.display()))?;
            }

            if !outcome.report.is_complete() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Random {
            wiki,
            filter,
            builtin,
        } => {
            let wiki = load_wiki(&wiki)?;
            let filter = TiddlerFilter::from(filter);
            let mut rng = rand::rng();
            let tiddler = wiki
                .random(&mut rng, |t| filter.matches(t))
                .ok_or_else(|| anyhow!("no tiddlers match the given filters"))?;
            let converter = select_converter(&config, builtin, &[]);
            let markdown = export_markdown(tiddler, converter.as_ref(), &ExportOptions::default())?;
            println!("{}", markdown);
        }
    }

    Ok(ExitCode::SUCCESS)
}
