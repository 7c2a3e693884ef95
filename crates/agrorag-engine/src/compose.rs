//! Response composition policies.
//!
//! Every policy returns non-empty text, a confidence (mean score of the
//! considered hits) and the supporting hits in rank order. No hit scoring
//! above 0 is a successful answer with confidence 0 and no supporting hits.

use agrorag_core::error::Result;
use agrorag_core::traits::{Generator, SearchIndex};
use agrorag_core::types::{mean_score, Answer, RelevanceTier, ScoredChunk};

use crate::prompt::build_prompt;

pub const NOT_FOUND: &str = "No encontré información relevante en el documento para tu pregunta.";
pub const INSUFFICIENT: &str = "No tengo suficiente información en el documento para responder esta pregunta.";

pub enum Composer {
    /// Top chunk verbatim, prefixed according to the relevance tier.
    Extractive,
    /// First sentence of the top chunk mentioning one of its key terms.
    KeyTerms { max_terms: usize, fallback_chars: usize },
    /// Free text from an external generator, grounded on the top chunks.
    Generative { generator: Box<dyn Generator>, language: String },
}

impl Composer {
    pub fn key_terms(max_terms: usize, fallback_chars: usize) -> Self {
        Self::KeyTerms { max_terms, fallback_chars }
    }

    /// Generative when a generator is available, extractive otherwise.
    pub fn generative_or_extractive(generator: Option<Box<dyn Generator>>, language: impl Into<String>) -> Self {
        match generator {
            Some(generator) => Self::Generative { generator, language: language.into() },
            None => {
                tracing::warn!("no generator configured, answers fall back to extractive excerpts");
                Self::Extractive
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Extractive => "extractive",
            Self::KeyTerms { .. } => "key-terms",
            Self::Generative { .. } => "generative",
        }
    }

    pub fn compose(&self, question: &str, hits: Vec<ScoredChunk>, index: &dyn SearchIndex) -> Result<Answer> {
        if hits.iter().all(|h| h.score <= 0.0) {
            tracing::debug!(hits = hits.len(), "no hit above zero similarity");
            return Ok(not_found());
        }
        let confidence = mean_score(&hits);
        let tier = RelevanceTier::from_confidence(confidence);
        let (text, key_terms) = match self {
            Self::Extractive => (format!("{}\n\n{}", preface(tier), hits[0].chunk.content), Vec::new()),
            Self::KeyTerms { max_terms, fallback_chars } => {
                let top = &hits[0].chunk;
                let concepts: Vec<String> = index
                    .term_weights(top.chunk_index)
                    .into_iter()
                    .take(*max_terms)
                    .map(|(term, _)| term)
                    .collect();
                let sentence = best_sentence(&top.content, &concepts)
                    .unwrap_or_else(|| prefix(&top.content, *fallback_chars));
                (sentence, concepts)
            }
            Self::Generative { generator, language } => {
                let context = hits.iter().map(|h| h.chunk.content.as_str()).collect::<Vec<_>>().join("\n\n");
                let generated = generator.generate(&build_prompt(&context, question, language))?;
                let generated = generated.trim();
                if generated.is_empty() {
                    tracing::warn!("generator returned blank text");
                    (INSUFFICIENT.to_string(), Vec::new())
                } else {
                    (generated.to_string(), Vec::new())
                }
            }
        };
        if tier == RelevanceTier::Low {
            tracing::warn!(confidence, "low relevance answer");
        }
        Ok(Answer { text, confidence, tier, key_terms, supporting: hits })
    }
}

fn not_found() -> Answer {
    Answer {
        text: NOT_FOUND.to_string(),
        confidence: 0.0,
        tier: RelevanceTier::Low,
        key_terms: Vec::new(),
        supporting: Vec::new(),
    }
}

fn preface(tier: RelevanceTier) -> &'static str {
    match tier {
        RelevanceTier::High => "Basándome en el documento, encontré la siguiente información relevante:",
        RelevanceTier::Medium => "Encontré información que podría estar relacionada con tu pregunta:",
        RelevanceTier::Low => "La información encontrada tiene baja relevancia. Te muestro lo más cercano a tu consulta:",
    }
}

/// Splits after `.`, `!` or `?` when followed by whitespace or the end of text.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Concepts are tried heaviest first; for each, sentences in text order.
pub fn best_sentence(text: &str, concepts: &[String]) -> Option<String> {
    let sentences = split_sentences(text);
    let lowered: Vec<String> = sentences.iter().map(|s| s.to_lowercase()).collect();
    concepts.iter().find_map(|concept| {
        let concept = concept.to_lowercase();
        lowered.iter().position(|s| s.contains(&concept)).map(|i| sentences[i].to_string())
    })
}

fn prefix(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", text[..byte].trim_end()),
        None => text.to_string(),
    }
}
