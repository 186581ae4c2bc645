use std::env;
use std::process::ExitCode;
use std::path::PathBuf;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docqa_core::chunker::{load_text_sources, Chunker, ChunkingConfig};
use docqa_core::config::Settings;
use docqa_core::error::Error;
use docqa_core::traits::AnswerGenerator;
use docqa_hybrid::{ChatCompletionsGenerator, FsArtifactStore, HybridRetriever, RagPipeline};

const USAGE: &str = "Usage: docqa <ingest [path] | ask \"<question>\" [--k N] [--explain]>";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_args() -> anyhow::Result<(String, Vec<String>)> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        bail!(USAGE);
    }
    let cmd = args.remove(0);
    Ok((cmd, args))
}

fn load_settings() -> anyhow::Result<Settings> {
    let base = env::current_dir()?;
    let settings = Settings::load().context("loading configuration")?;
    Ok(settings.resolve_paths(&base))
}

fn build_pipeline(settings: Settings) -> anyhow::Result<RagPipeline> {
    let generator = match &settings.generator {
        Some(g) => Some(Box::new(ChatCompletionsGenerator::new(g.clone())?) as Box<dyn AnswerGenerator>),
        None => None,
    };
    let store = FsArtifactStore::new(&settings.storage_dir);
    Ok(RagPipeline::new(Box::new(store), settings, generator)?)
}

fn ingest(settings: Settings, args: &[String]) -> anyhow::Result<()> {
    let source = args.first().map_or_else(|| settings.data_dir.clone(), PathBuf::from);
    println!("Ingesting from {}", source.display());
    let documents = load_text_sources(&source)?;
    if documents.is_empty() {
        bail!("no .txt or .md files under {}", source.display());
    }

    let chunker = Chunker::new(ChunkingConfig {
        chunk_size: settings.chunk_size,
        overlap: settings.chunk_overlap,
    });
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut chunks = Vec::new();
    for doc in &documents {
        pb.set_message(doc.name.clone());
        let produced = chunker.chunk(&doc.content);
        tracing::debug!(file = %doc.path.display(), chunks = produced.len(), "chunked");
        chunks.extend(produced);
        pb.inc(1);
    }
    pb.finish_with_message("chunked");

    let pipeline = build_pipeline(settings)?;
    let count = pipeline.ingest_chunks(&chunks)?;
    println!("Ingest complete ({} files, {} chunks)", documents.len(), count);
    Ok(())
}

fn ask(settings: Settings, args: &[String]) -> anyhow::Result<()> {
    let mut question = None;
    let mut k = None;
    let mut explain = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--k" => {
                let value = iter.next().context("--k needs a value")?;
                k = Some(value.parse::<usize>().context("--k must be a positive integer")?);
            }
            "--explain" => explain = true,
            other if question.is_none() => question = Some(other.to_string()),
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }
    let Some(question) = question else { bail!(USAGE) };

    let pipeline = build_pipeline(settings)?;
    if explain {
        let set = pipeline.snapshot()?;
        let k = k.unwrap_or(pipeline.settings().top_k_retrieval);
        let breakdown = HybridRetriever::new().score(&set, &question)?;
        for candidate in HybridRetriever::new().retrieve(&set, &question, k)? {
            let id = candidate.id;
            println!(
                "#{id:<4} fused={:.4} bm25={:.4} tfidf={:.4}",
                breakdown.fused[id], breakdown.lexical[id], breakdown.vector[id]
            );
        }
        println!();
    }

    if pipeline.settings().generator.is_some() {
        println!("{}", pipeline.answer(&question)?);
    } else {
        let passages = pipeline.retrieve_passages(&question, k)?;
        println!("{}", serde_json::to_string_pretty(&passages)?);
    }
    Ok(())
}

/// Library errors are reported through their public message; internals of
/// unexpected failures only reach the log.
fn report(err: &anyhow::Error) -> (String, u8) {
    match err.downcast_ref::<Error>() {
        Some(e) if e.kind().is_client_fault() => (e.public_message(), 2),
        Some(e) => (e.public_message(), 1),
        None => (format!("{err:#}"), 1),
    }
}

fn run() -> anyhow::Result<()> {
    let (cmd, args) = parse_args()?;
    let settings = load_settings()?;
    match cmd.as_str() {
        "ingest" => ingest(settings, &args),
        "ask" => ask(settings, &args),
        _ => bail!("unknown command '{cmd}'\n{USAGE}"),
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (message, code) = report(&err);
            eprintln!("Error: {message}");
            ExitCode::from(code)
        }
    }
}
