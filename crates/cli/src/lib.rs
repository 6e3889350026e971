use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wikitrans_chunker::{Chunk, Chunker, ChunkerConfig};
use wikitrans_wikitext::mask_templates;

pub mod audit;
pub mod config;
pub mod endpoints;
pub mod mediawiki;
pub mod pipeline;
pub mod store;
pub mod translator;

use crate::audit::AuditLog;
use crate::config::{Settings, TranslatorKind};
use crate::endpoints::{derive_endpoints_and_title, endpoint_for_lang, verify_tls};
use crate::mediawiki::MediaWikiClient;
use crate::pipeline::{PipelineOptions, PipelineSummary, StoreResolver, TranslationPipeline};
use crate::store::{DirectoryStore, PageStore};
use crate::translator::{OpenAiTranslator, StubTranslator, Translator};

/// Source language of directory stores when `--source-lang` is not given
const DEFAULT_SOURCE_LANG: &str = "fr";
const PREVIEW_CHARS: usize = 80;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "wikitrans")]
#[command(about = "Translate MediaWiki pages without breaking their markup", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a wikitext document into token-bounded chunks
    Chunk(ChunkArgs),

    /// Mask template names and parameter keys (JSON output)
    Mask(MaskArgs),

    /// Translate pages into another language edition
    Translate(TranslateArgs),
}

#[derive(Args)]
struct ChunkArgs {
    /// Wikitext file, or `-` for stdin
    input: PathBuf,

    /// Token budget per chunk (defaults to MAX_TOKENS_PER_CHUNK)
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MaskArgs {
    /// Wikitext file, or `-` for stdin
    input: PathBuf,
}

#[derive(Args)]
#[command(group(ArgGroup::new("pages").required(true).args(["page", "input"])))]
struct TranslateArgs {
    /// A single page title or URL
    #[arg(long)]
    page: Option<String>,

    /// File with one page title or URL per line
    #[arg(long)]
    input: Option<PathBuf>,

    /// Language of the edition to publish into
    #[arg(long)]
    target_lang: String,

    /// Source language (default: first host label of the endpoint, or `fr` for directories)
    #[arg(long)]
    source_lang: Option<String>,

    /// Translate without writing any page
    #[arg(long)]
    dry_run: bool,

    /// Retranslate pages that are already translated
    #[arg(long)]
    force: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    no_verify_ssl: bool,

    /// Read source pages from a directory instead of a wiki
    #[arg(long, requires = "target_dir")]
    source_dir: Option<PathBuf>,

    /// Write translated pages to a directory instead of a wiki
    #[arg(long, requires = "source_dir")]
    target_dir: Option<PathBuf>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON output
    let json_output = match &cli.command {
        Commands::Chunk(args) => args.json,
        Commands::Mask(_) => true,
        Commands::Translate(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Chunk(args) => run_chunk(args)?,
        Commands::Mask(args) => run_mask(args)?,
        Commands::Translate(args) => run_translate(args).await?,
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read wikitext from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_chunk(args: ChunkArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let max_tokens = match args.max_tokens {
        Some(max) => max,
        None => Settings::load()?.max_tokens_per_chunk,
    };
    let chunker = Chunker::try_new(ChunkerConfig::with_max_tokens(max_tokens))?;
    let chunks = chunker.chunk_text(&text);

    if args.json {
        return print_stdout(&serde_json::to_string_pretty(&chunks)?);
    }

    let mut out = Chunker::get_stats(&chunks).to_string();
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] {} ~{} tokens: {}",
            i + 1,
            chunk.kind.as_str(),
            chunk.estimated_tokens,
            preview(chunk)
        ));
    }
    print_stdout(&out)
}

/// First characters of a chunk on a single line
fn preview(chunk: &Chunk) -> String {
    let flat: String = chunk
        .content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

fn run_mask(args: MaskArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let masked = mask_templates(&text);
    let out = json!({
        "masked": masked.text,
        "mapping": masked.mapping,
        "protected": masked.protected,
    });
    print_stdout(&serde_json::to_string_pretty(&out)?)
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let settings = Settings::load()?;
    let translator = build_translator(&settings)?;
    let audit = AuditLog::open(settings.log_csv_path.clone())?;
    log::info!(
        "Translator: {} | Audit log: {}",
        translator.name(),
        audit.path().display()
    );

    let lines: Vec<String> = match (&args.page, &args.input) {
        (Some(page), _) => vec![page.clone()],
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        (None, None) => anyhow::bail!("Either --page or --input is required"),
    };

    let new_pipeline = |source: Arc<dyn PageStore>,
                        target: Arc<dyn PageStore>,
                        source_lang: String|
     -> Result<TranslationPipeline> {
        let options = PipelineOptions {
            source_lang,
            target_lang: args.target_lang.clone(),
            dry_run: args.dry_run,
            force: args.force,
        };
        let chunker = Chunker::try_new(ChunkerConfig::with_max_tokens(settings.max_tokens_per_chunk))?;
        Ok(TranslationPipeline::new(source, target, translator.clone(), options)
            .with_chunker(chunker)
            .with_audit(audit.clone()))
    };

    let mut summary = PipelineSummary::default();
    if let (Some(source_dir), Some(target_dir)) = (&args.source_dir, &args.target_dir) {
        let source_lang = args
            .source_lang
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE_LANG.to_string());
        let mut pipeline = new_pipeline(
            Arc::new(DirectoryStore::new(source_dir)),
            Arc::new(DirectoryStore::new(target_dir)),
            source_lang,
        )?;
        summary += pipeline.process_pages(&lines).await;
    } else {
        // Pages sharing endpoints and language go through one pipeline, in input order
        let mut groups: Vec<((String, String, String), Vec<String>)> = Vec::new();
        for line in lines.iter().map(|l| l.trim()) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let page = match derive_endpoints_and_title(
                line,
                &args.target_lang,
                settings.mediawiki_api_endpoint.as_deref(),
            ) {
                Ok(page) => page,
                Err(e) => {
                    log::error!("Skipping '{line}': {e:#}");
                    summary.errors += 1;
                    continue;
                }
            };
            let source_lang = args.source_lang.clone().unwrap_or(page.source_lang);
            let key = (page.source_endpoint, page.target_endpoint, source_lang);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, titles)) => titles.push(page.title),
                None => groups.push((key, vec![page.title])),
            }
        }

        for ((source_ep, target_ep, source_lang), titles) in groups {
            log::info!("{source_ep} ({source_lang}) -> {target_ep} ({})", args.target_lang);
            let source = MediaWikiClient::new(
                &source_ep,
                verify_tls(&source_ep, args.no_verify_ssl),
                settings.credentials(),
            )?;
            let target = MediaWikiClient::new(
                &target_ep,
                verify_tls(&target_ep, args.no_verify_ssl),
                settings.credentials(),
            )?;
            let mut pipeline = new_pipeline(Arc::new(source), Arc::new(target), source_lang)?
                .with_store_resolver(edition_resolver(
                    source_ep.clone(),
                    args.no_verify_ssl,
                    settings.credentials(),
                ));
            summary += pipeline.process_pages(&titles).await;
        }
    }

    print_stdout(&summary.to_string())
}

fn build_translator(settings: &Settings) -> Result<Arc<dyn Translator>> {
    match settings.translator {
        TranslatorKind::Stub => {
            log::warn!("Stub translator selected: pages are copied untranslated");
            Ok(Arc::new(StubTranslator))
        }
        TranslatorKind::OpenAi => {
            let key = settings
                .openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required (or set WIKITRANS_TRANSLATOR=stub)")?;
            Ok(Arc::new(OpenAiTranslator::new(
                key,
                &settings.openai_base_url,
                &settings.openai_model,
                settings.temperature,
            )?))
        }
    }
}

/// Clients for the other language editions of the wiki behind `endpoint`
fn edition_resolver(
    endpoint: String,
    no_verify_ssl: bool,
    credentials: Option<(String, String)>,
) -> StoreResolver {
    Box::new(move |lang: &str| -> Result<Option<Arc<dyn PageStore>>> {
        let edition = endpoint_for_lang(&endpoint, lang)?;
        let client = MediaWikiClient::new(
            &edition,
            verify_tls(&edition, no_verify_ssl),
            credentials.clone(),
        )?;
        Ok(Some(Arc::new(client) as Arc<dyn PageStore>))
    })
}
