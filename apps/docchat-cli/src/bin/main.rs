use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use docchat_core::config::Config;
use docchat_core::types::StreamEvent;
use docchat_embed::default_embedder;
use docchat_ingest::Ingestor;
use docchat_llm::default_generator;
use docchat_query::QueryEngine;

const DEFAULT_INDEX_PATH: &str = "data/index/docchat_index.json";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|ingest-dir|ask|stream> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn index_path(config: &Config) -> PathBuf {
    docchat_core::config::expand_path(
        config.get_or("index.path", DEFAULT_INDEX_PATH.to_string()),
    )
}

fn build_engine(config: &Config) -> anyhow::Result<Arc<QueryEngine>> {
    let embedder = default_embedder(config)?;
    let generator = default_generator(config)?;
    let top_k = config.get_or("query.top_k", docchat_query::DEFAULT_TOP_K);
    Ok(Arc::new(
        QueryEngine::new(embedder, generator, index_path(config)).with_top_k(top_k),
    ))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let Some(path) = args.first().map(PathBuf::from) else {
                eprintln!("Usage: docchat ingest <file>");
                std::process::exit(1);
            };
            let ingestor = Ingestor::new(default_embedder(&config)?, index_path(&config));
            let report = ingestor.ingest(&path)?;
            println!("✅ Ingested {} ({} chunks)", path.display(), report.chunks);
        }
        "ingest-dir" => {
            let Some(dir) = args.first().map(PathBuf::from) else {
                eprintln!("Usage: docchat ingest-dir <dir>");
                std::process::exit(1);
            };
            let ingestor = Ingestor::new(default_embedder(&config)?, index_path(&config));
            let report = ingestor.ingest_dir(&dir)?;
            println!(
                "✅ Ingested {} documents ({} chunks) from {}",
                report.documents,
                report.chunks,
                dir.display()
            );
        }
        "ask" => {
            let Some(query) = args.first().cloned() else {
                eprintln!("Usage: docchat ask \"<question>\"");
                std::process::exit(1);
            };
            let engine = build_engine(&config)?;
            let answer = engine.answer(&query)?;
            println!("{}", answer.text.trim());
            for source in &answer.sources {
                println!("  source: {} (page {})", source.doc_id, source.page);
            }
        }
        "stream" => {
            let Some(query) = args.first().cloned() else {
                eprintln!("Usage: docchat stream \"<question>\"");
                std::process::exit(1);
            };
            let engine = build_engine(&config)?;
            for event in engine.answer_stream(&query) {
                match event {
                    StreamEvent::Token { text } => {
                        print!("{}", text);
                        std::io::stdout().flush()?;
                    }
                    StreamEvent::Sources { sources } => {
                        println!();
                        for source in &sources {
                            println!("  source: {} (page {})", source.doc_id, source.page);
                        }
                    }
                    StreamEvent::Done => {}
                    StreamEvent::Error { message } => {
                        eprintln!("Error: {}", message);
                        std::process::exit(1);
                    }
                }
            }
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
