use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use agrorag_core::config::{Config, EngineConfig, ProviderConfig};
use agrorag_core::history::History;
use agrorag_core::types::{Answer, DocumentStats};
use agrorag_embed::{get_default_embedder, OpenAiGenerator};
use agrorag_engine::{dense_engine, sparse_engine, Composer, Engine};
use agrorag_text::SparseRetriever;
use agrorag_vector::DenseRetriever;

const DEFAULT_DOCUMENT: &str = "recomendaciones.pdf";
const PREVIEW_CHARS: usize = 500;

#[derive(Parser)]
#[command(name = "agrorag", about = "Ask questions about the recommendations document")]
struct Cli {
    /// Directory holding config.toml / config.<env>.toml (default: current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Source document (PDF or text); overrides `data.document`
    #[arg(long, short, global = true)]
    document: Option<PathBuf>,

    #[arg(long, short, global = true, value_enum, default_value_t = Mode::Extractive)]
    mode: Mode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question
    Ask {
        question: String,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Answer questions read line by line from stdin
    Chat,
    /// Show document statistics
    Inspect,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// TF-IDF retrieval, top chunk returned verbatim
    Extractive,
    /// TF-IDF retrieval, key concepts and best sentence
    KeyTerms,
    /// Embedding retrieval, answer generated from the retrieved context
    Generative,
}

enum AnyEngine {
    Sparse(Engine<SparseRetriever>),
    Dense(Engine<DenseRetriever>),
}

impl AnyEngine {
    fn open(mode: Mode, path: &Path, engine: EngineConfig, provider: &ProviderConfig) -> anyhow::Result<Self> {
        let built = match mode {
            Mode::Extractive => Self::Sparse(sparse_engine(path, engine, Composer::Extractive)?),
            Mode::KeyTerms => {
                let composer = Composer::key_terms(engine.key_terms, engine.fallback_prefix_chars);
                Self::Sparse(sparse_engine(path, engine, composer)?)
            }
            Mode::Generative => {
                let embedder = get_default_embedder(provider).context("embedding provider unavailable")?;
                let generator = match OpenAiGenerator::from_config(provider) {
                    Ok(g) => Some(Box::new(g) as Box<dyn agrorag_core::traits::Generator>),
                    Err(e) => {
                        tracing::warn!(error = %e, "generation provider unavailable");
                        None
                    }
                };
                let composer = Composer::generative_or_extractive(generator, provider.answer_language.clone());
                Self::Dense(dense_engine(path, engine, provider, embedder, composer)?)
            }
        };
        Ok(built)
    }

    fn answer(&mut self, question: &str) -> agrorag_core::Result<Answer> {
        match self {
            Self::Sparse(e) => e.answer(question),
            Self::Dense(e) => e.answer(question),
        }
    }

    fn stats(&mut self) -> agrorag_core::Result<DocumentStats> {
        match self {
            Self::Sparse(e) => e.stats(),
            Self::Dense(e) => e.stats(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn print_answer(answer: &Answer) {
    println!("Relevance: {} ({:.1}%)", answer.tier.label(), answer.confidence * 100.0);
    if !answer.key_terms.is_empty() {
        println!("Key concepts: {}", answer.key_terms.join(", "));
    }
    println!("\n{}\n", answer.text);
    for (i, hit) in answer.supporting.iter().enumerate() {
        println!("--- Section {} (similarity: {:.1}%)", i + 1, hit.score * 100.0);
        println!("{}", hit.preview(PREVIEW_CHARS));
    }
}

fn chat(engine: &mut AnyEngine) -> anyhow::Result<()> {
    let mut history = History::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        match line.trim() {
            ":quit" | ":q" => break,
            ":clear" => {
                history.clear();
                println!("History cleared.");
            }
            ":history" => {
                for exchange in history.recent() {
                    println!("- {} [{}]", exchange.title(), exchange.answer.tier.label());
                }
            }
            "" => {}
            question => match engine.answer(question) {
                Ok(answer) => {
                    print_answer(&answer);
                    history.push(question, answer);
                }
                Err(e) => eprintln!("Error: {}", e),
            },
        }
        print!("> ");
        stdout.flush()?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config_dir {
        Some(dir) => Config::load_from(dir)?,
        None => Config::load()?,
    };
    let engine_cfg = config.engine()?;
    let provider_cfg = config.provider()?;
    let document = cli
        .document
        .clone()
        .or_else(|| config.document_path())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENT));

    let mut engine = AnyEngine::open(cli.mode, &document, engine_cfg, &provider_cfg)
        .with_context(|| format!("cannot open {}", document.display()))?;

    match cli.command {
        Command::Ask { question, json } => {
            let answer = engine.answer(&question)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print_answer(&answer);
            }
        }
        Command::Chat => chat(&mut engine)?,
        Command::Inspect => {
            let stats = engine.stats()?;
            println!("Document: {}", document.display());
            println!("Characters: {}", stats.characters);
            println!("Sections:   {}", stats.sections);
            println!("Words:      {}", stats.words);
        }
    }
    Ok(())
}
