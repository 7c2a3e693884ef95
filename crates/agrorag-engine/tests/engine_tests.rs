use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use agrorag_core::config::{EngineConfig, ProviderConfig};
use agrorag_core::error::{Error, Result};
use agrorag_core::traits::{Generator, SearchIndex};
use agrorag_core::types::{Chunk, Document, RelevanceTier, ScoredChunk};
use agrorag_embed::HashEmbedder;
use agrorag_engine::compose::{best_sentence, split_sentences, INSUFFICIENT, NOT_FOUND};
use agrorag_engine::prompt::build_prompt;
use agrorag_engine::{dense_engine, sparse_engine, Composer, Engine};
use agrorag_text::SparseRetriever;
use agrorag_vector::DenseRetriever;

const GUIDE: &str = "\
El pH del agua bajo indica acidez. Se recomienda encalar el suelo antes de sembrar. \
Un valor alto de aluminio intercambiable es tóxico para las raíces. Aplique cal dolomita para neutralizar el aluminio. \
La completitud mide la proporción de datos presentes en cada muestra. Una completitud baja exige revisar el muestreo. \
El coeficiente de variación cercano a cero indica datos homogéneos. Un valor mayor a doscientos por ciento indica datos muy dispersos.";

fn small_chunks() -> EngineConfig {
    EngineConfig { chunk_size: 20, chunk_overlap: 5, ..EngineConfig::default() }
}

fn sparse(text: &str, config: EngineConfig, composer: Composer) -> Engine<SparseRetriever> {
    let retriever = SparseRetriever::from_config(&config);
    Engine::new(Document::from_text("guia", text), config, retriever, composer).expect("engine")
}

fn chunk(index: usize, content: &str) -> Chunk {
    Chunk {
        id: format!("d:{index}"),
        doc_id: "d".into(),
        content: content.into(),
        chunk_index: index,
        total_chunks: 1,
        word_count: content.split_whitespace().count(),
    }
}

struct StubIndex {
    chunks: Vec<Chunk>,
    weights: Vec<(String, f32)>,
}

impl SearchIndex for StubIndex {
    fn chunks(&self) -> &[Chunk] { &self.chunks }
    fn term_weights(&self, _chunk_index: usize) -> Vec<(String, f32)> { self.weights.clone() }
}

struct RecordingGenerator {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Generator for RecordingGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::dependency("chat completion", "invalid credential"))
    }
}

#[test]
fn empty_query_is_rejected_before_indexing() {
    let mut engine = sparse(GUIDE, small_chunks(), Composer::Extractive);
    for q in ["", "   \n\t"] {
        assert!(matches!(engine.answer(q), Err(Error::Validation(_))));
    }
    assert_eq!(engine.builds(), 0);
}

#[test]
fn invalid_config_fails_at_construction() {
    let config = EngineConfig { chunk_size: 10, chunk_overlap: 12, ..EngineConfig::default() };
    let retriever = SparseRetriever::default();
    let result = Engine::new(Document::from_text("g", GUIDE), config, retriever, Composer::Extractive);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn extractive_answer_returns_top_chunk_with_confidence() {
    let mut engine = sparse(GUIDE, small_chunks(), Composer::Extractive);
    let answer = engine.answer("¿Qué hacer con un valor alto de aluminio intercambiable?").expect("answer");

    assert!(!answer.supporting.is_empty());
    assert!(answer.supporting.len() <= 3);
    assert!(answer.text.ends_with(&answer.supporting[0].chunk.content));
    assert!(answer.supporting[0].chunk.content.contains("aluminio"));
    let mean = answer.supporting.iter().map(|h| h.score).sum::<f32>() / answer.supporting.len() as f32;
    assert!((answer.confidence - mean).abs() < 1e-6);
    assert_eq!(answer.tier, RelevanceTier::from_confidence(answer.confidence));
    assert!(answer.key_terms.is_empty());
}

#[test]
fn index_is_built_once_per_fingerprint() {
    let mut engine = sparse(GUIDE, small_chunks(), Composer::Extractive);
    engine.answer("aluminio").expect("first");
    engine.answer("completitud").expect("second");
    assert_eq!(engine.builds(), 1);

    engine.set_chunking(12, 3).expect("valid chunking");
    engine.answer("aluminio").expect("third");
    assert_eq!(engine.builds(), 2);

    engine.set_document(Document::from_text("otra", "El potasio regula el agua en la planta."));
    assert_eq!(engine.document().id, "otra");
    engine.answer("potasio").expect("fourth");
    assert_eq!(engine.builds(), 3);

    assert!(matches!(engine.set_chunking(4, 4), Err(Error::Configuration(_))));
    assert_eq!(engine.config().chunk_size, 12);
}

#[test]
fn unknown_terms_give_zero_confidence_not_error() {
    let mut engine = sparse("aluminio", small_chunks(), Composer::Extractive);
    let answer = engine.answer("potasio").expect("answer");
    assert_eq!(answer.text, NOT_FOUND);
    assert_eq!(answer.confidence, 0.0);
    assert!(answer.is_empty_match());
}

#[test]
fn zero_similarity_dense_hits_give_not_found() {
    let config = EngineConfig { chunk_size: 6, chunk_overlap: 2, ..EngineConfig::default() };
    let retriever = DenseRetriever::new(Box::new(HashEmbedder::new(4096)));
    let doc = Document::from_text("muestra", "El aluminio es alto en la muestra dos.");
    let composer = Composer::generative_or_extractive(None, "Spanish");
    let mut engine = Engine::new(doc, config, retriever, composer).expect("engine");

    let answer = engine.answer("potasio").expect("answer");
    assert_eq!(answer.text, NOT_FOUND);
    assert_eq!(answer.confidence, 0.0);
    assert_eq!(answer.tier, RelevanceTier::Low);
    assert!(answer.is_empty_match());
}

#[test]
fn key_terms_ignore_hits_without_signal() {
    let index = StubIndex { chunks: vec![chunk(0, "El aluminio es alto.")], weights: vec![("aluminio".into(), 1.0)] };
    let hits = vec![ScoredChunk { chunk: chunk(0, "El aluminio es alto."), score: 0.0 }];
    let answer = Composer::key_terms(5, 10).compose("potasio", hits, &index).expect("compose");
    assert_eq!(answer.text, NOT_FOUND);
    assert!(answer.key_terms.is_empty());
}

#[test]
fn empty_document_fails_with_indexing_error() {
    let mut engine = sparse("", small_chunks(), Composer::Extractive);
    assert!(matches!(engine.answer("aluminio"), Err(Error::Indexing(_))));
    assert!(matches!(engine.stats(), Err(Error::Indexing(_))));
}

#[test]
fn answers_are_deterministic() {
    let q = "coeficiente de variación de los datos";
    let a = sparse(GUIDE, small_chunks(), Composer::key_terms(5, 120)).answer(q).expect("a");
    let b = sparse(GUIDE, small_chunks(), Composer::key_terms(5, 120)).answer(q).expect("b");
    assert_eq!(a.text, b.text);
    assert_eq!(a.key_terms, b.key_terms);
    assert_eq!(a.supporting, b.supporting);
    assert_eq!(a.confidence, b.confidence);
}

#[test]
fn key_terms_answer_is_a_sentence_of_the_top_chunk() {
    let mut engine = sparse(GUIDE, small_chunks(), Composer::key_terms(5, 120));
    let answer = engine.answer("cal dolomita para el aluminio").expect("answer");
    assert!(!answer.key_terms.is_empty());
    assert!(answer.key_terms.len() <= 5);
    let top = &answer.supporting[0].chunk.content;
    assert!(top.contains(&answer.text), "answer is taken from the top chunk");
    let lowered = answer.text.to_lowercase();
    assert!(answer.key_terms.iter().any(|t| lowered.contains(t.as_str())));
}

#[test]
fn key_terms_prefer_heaviest_concept_then_sentence_order() {
    let text = "Primera frase sin nada. El calcio sube el pH. El aluminio baja el pH! Fin";
    let concepts = vec!["aluminio".to_string(), "ph".to_string()];
    assert_eq!(best_sentence(text, &concepts).as_deref(), Some("El aluminio baja el pH!"));
    let concepts = vec!["ph".to_string()];
    assert_eq!(best_sentence(text, &concepts).as_deref(), Some("El calcio sube el pH."));
    assert_eq!(best_sentence(text, &["potasio".to_string()]), None);
}

#[test]
fn key_terms_fall_back_to_prefix() {
    let content = "Texto sin coincidencias con los conceptos del indice y bastante largo";
    let index = StubIndex { chunks: vec![chunk(0, content)], weights: vec![("nitrogeno".into(), 0.9)] };
    let hits = vec![ScoredChunk { chunk: chunk(0, content), score: 0.5 }];
    let answer = Composer::key_terms(5, 10).compose("q", hits, &index).expect("compose");
    assert_eq!(answer.text, "Texto sin...");
    assert_eq!(answer.key_terms, vec!["nitrogeno"]);
}

#[test]
fn sentences_split_on_terminal_punctuation() {
    let sentences = split_sentences("Valor 3.5 en la muestra. ¿Es alto? ¡Sí! Revisar...  fin");
    assert_eq!(sentences, vec!["Valor 3.5 en la muestra.", "¿Es alto?", "¡Sí!", "Revisar...", "fin"]);
}

#[test]
fn confidence_of_exactly_point_three_is_medium() {
    let index = StubIndex { chunks: vec![chunk(0, "El aluminio es alto.")], weights: Vec::new() };
    let hits = vec![ScoredChunk { chunk: chunk(0, "El aluminio es alto."), score: 0.3 }];
    let answer = Composer::Extractive.compose("aluminio", hits, &index).expect("compose");
    assert_eq!(answer.tier, RelevanceTier::Medium);
    assert!(answer.text.starts_with("Encontré información que podría estar relacionada"));
}

#[test]
fn generative_answer_sends_context_and_question() {
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let generator = RecordingGenerator { reply: "  Aplique cal dolomita.  ".into(), prompts: Arc::clone(&prompts) };
    let composer = Composer::generative_or_extractive(Some(Box::new(generator)), "Spanish");
    assert_eq!(composer.name(), "generative");
    let mut engine = sparse(GUIDE, small_chunks(), composer);

    let answer = engine.answer("¿Cómo neutralizar el aluminio?").expect("answer");
    assert_eq!(answer.text, "Aplique cal dolomita.");
    let prompts = prompts.lock().expect("lock");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Question: ¿Cómo neutralizar el aluminio?"));
    assert!(prompts[0].contains(&answer.supporting[0].chunk.content));
    assert!(prompts[0].contains("Always answer in Spanish"));
}

#[test]
fn blank_generation_becomes_insufficient_information() {
    let generator = RecordingGenerator { reply: "   ".into(), prompts: Arc::new(Mutex::new(Vec::new())) };
    let mut engine = sparse(GUIDE, small_chunks(), Composer::Generative { generator: Box::new(generator), language: "Spanish".into() });
    assert_eq!(engine.answer("aluminio").expect("answer").text, INSUFFICIENT);
}

#[test]
fn generator_failure_is_surfaced() {
    let composer = Composer::Generative { generator: Box::new(FailingGenerator), language: "Spanish".into() };
    let mut engine = sparse(GUIDE, small_chunks(), composer);
    let err = engine.answer("aluminio").unwrap_err();
    assert!(matches!(err, Error::Dependency { .. }));
    assert!(!err.is_caller_error());
}

#[test]
fn missing_generator_degrades_to_extractive() {
    assert_eq!(Composer::generative_or_extractive(None, "Spanish").name(), "extractive");
}

#[test]
fn prompt_template_contains_grounding_instructions() {
    let prompt = build_prompt("contexto", "pregunta", "Spanish");
    assert!(prompt.contains("Context:\ncontexto\n\nQuestion: pregunta\n\nAnswer:"));
    assert!(prompt.contains("does not contain enough information"));
}

#[test]
fn engines_open_documents_from_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("recomendaciones.txt");
    fs::write(&path, GUIDE).unwrap();

    let mut lexical = sparse_engine(&path, small_chunks(), Composer::Extractive).expect("sparse");
    let stats = lexical.stats().expect("stats");
    assert_eq!(stats.words, GUIDE.split_whitespace().count());
    assert!(stats.sections > 1);

    let generator = RecordingGenerator { reply: "Respuesta.".into(), prompts: Arc::new(Mutex::new(Vec::new())) };
    let composer = Composer::Generative { generator: Box::new(generator), language: "Spanish".into() };
    let mut dense = dense_engine(&path, small_chunks(), &ProviderConfig::default(), Box::new(HashEmbedder::new(256)), composer)
        .expect("dense");
    let answer = dense.answer("aluminio intercambiable").expect("answer");
    assert_eq!(answer.text, "Respuesta.");
    assert_eq!(answer.supporting.len(), 3);
    assert!(answer.supporting[0].chunk.content.contains("aluminio"));

    let missing = sparse_engine(&tmp.path().join("no.pdf"), small_chunks(), Composer::Extractive);
    assert!(matches!(missing, Err(Error::NotFound(_))));
}
