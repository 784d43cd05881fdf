//! Entox CLI - Command-line interface
//!
//! Usage:
//!   entox extract --treebank parses.conllu --text "Valproic acid induces seizures."
//!   entox batch --treebank parses.conllu --documents abstracts.jsonl
//!   entox fetch 12345 67890
//!   entox verbs

mod pubmed;

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use entox_core::{AppConfig, CausalVerbs, Document, LoggingConfig, DEFAULT_CAUSAL_VERBS};
use entox_extractor::{
    analyze, sentence_rows, summarize, CausalExtractor, ExtractionConfig, NlpPipeline,
    TreebankPipeline,
};
use once_cell::sync::OnceCell;
use serde_json::json;

use crate::pubmed::PubMedFetcher;

static PIPELINE: OnceCell<Arc<dyn NlpPipeline>> = OnceCell::new();

#[derive(Parser)]
#[command(name = "entox")]
#[command(about = "Extract cause -> verb -> effect relations from biomedical text")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the extraction commands
#[derive(clap::Args)]
struct ExtractionArgs {
    /// CoNLL-U treebank serving the parses
    #[arg(long)]
    treebank: Option<PathBuf>,

    /// Entity type of the cause
    #[arg(long)]
    cause: Option<String>,

    /// Entity type of the effect
    #[arg(long)]
    effect: Option<String>,

    /// Comma-separated causal verb lemmas
    #[arg(long)]
    verbs: Option<String>,

    /// Run the matcher on every sentence
    #[arg(long)]
    no_prefilter: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract relations from one text
    Extract {
        #[command(flatten)]
        args: ExtractionArgs,

        /// Text to analyze
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        text: Option<String>,

        /// File holding the text to analyze
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Report matches for every sentence of a document collection
    Batch {
        #[command(flatten)]
        args: ExtractionArgs,

        /// JSON lines file of {"id", "text"} documents
        #[arg(long)]
        documents: PathBuf,
    },
    /// Fetch abstracts from PubMed
    Fetch {
        /// PubMed identifiers
        #[arg(required = true)]
        pmids: Vec<String>,
    },
    /// List the default causal verb lemmas
    Verbs,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "entox={level},entox_extractor={level}",
            level = logging.level
        )
        .into()
    });

    // stdout carries results; logs go to stderr
    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Load the treebank once per process
fn pipeline(path: &Path) -> anyhow::Result<Arc<dyn NlpPipeline>> {
    PIPELINE
        .get_or_try_init(|| {
            let pipeline = TreebankPipeline::from_file(path)?;
            Ok::<_, anyhow::Error>(Arc::new(pipeline) as Arc<dyn NlpPipeline>)
        })
        .cloned()
}

fn build_extractor(config: &AppConfig, args: &ExtractionArgs) -> anyhow::Result<CausalExtractor> {
    let mut extraction = ExtractionConfig::from(&config.extraction);
    if let Some(cause) = &args.cause {
        extraction.cause = cause.parse()?;
    }
    if let Some(effect) = &args.effect {
        extraction.effect = effect.parse()?;
    }
    if let Some(verbs) = &args.verbs {
        extraction.causal_verbs = CausalVerbs::parse_list(verbs)?;
    }
    if args.no_prefilter {
        extraction.prefilter = false;
    }

    let path = args
        .treebank
        .as_ref()
        .or(config.pipeline.treebank.as_ref())
        .context("no treebank given (use --treebank or ENTOX_TREEBANK)")?;

    Ok(CausalExtractor::new(pipeline(path)?, extraction)?)
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut documents = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid document", path.display(), number + 1))?;
        documents.push(document);
    }
    Ok(documents)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Extract { args, text, input } => {
            let extractor = build_extractor(&config, &args)?;
            let text = match (text, input) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("either --text or --input is required"),
            };

            let extraction = extractor.extract_document(&Document::new("input", text));
            serde_json::to_writer_pretty(&mut out, &json!({ "relationships": extraction }))?;
            writeln!(out)?;
        }
        Commands::Batch { args, documents } => {
            let extractor = build_extractor(&config, &args)?;
            let documents = read_documents(&documents)?;

            let rows = sentence_rows(extractor.pipeline().as_ref(), &documents);
            let reports = analyze(&extractor, &rows);
            for report in &reports {
                serde_json::to_writer(&mut out, report)?;
                writeln!(out)?;
            }

            let summary = summarize(&rows, &reports);
            tracing::info!(
                documents = summary.documents,
                sentences = summary.sentences,
                matched_sentences = summary.matched_sentences,
                relations = summary.relations,
                "batch complete"
            );
        }
        Commands::Fetch { pmids } => {
            let fetcher = PubMedFetcher::new(config.fetch.clone())?;
            for pmid in &pmids {
                match fetcher.fetch_abstract(pmid).await {
                    Ok(fetched) => {
                        serde_json::to_writer(&mut out, &fetched)?;
                        writeln!(out)?;
                    }
                    Err(e) => tracing::error!(pmid = %pmid, error = %e, "fetch failed"),
                }
            }
        }
        Commands::Verbs => {
            for verb in DEFAULT_CAUSAL_VERBS {
                writeln!(out, "{verb}")?;
            }
        }
    }

    Ok(())
}
