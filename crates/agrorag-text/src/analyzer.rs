use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

use agrorag_core::config::StopwordPolicy;

/// Shortest token kept by the analyzer, in characters.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Turns text into the term sequence shared by indexing and querying:
/// lower-cased alphanumeric runs, stopwords removed, optionally extended with
/// adjacent-pair bigrams.
#[derive(Clone)]
pub struct Analyzer {
    inner: TextAnalyzer,
    ngram_max: usize,
}

impl Analyzer {
    pub fn new(stopwords: StopwordPolicy, ngram_max: usize) -> Self {
        let builder = TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser);
        let inner = match stopword_filter(stopwords) {
            Some(filter) => builder.filter(filter).build(),
            None => builder.build(),
        };
        Self { inner, ngram_max: ngram_max.clamp(1, 2) }
    }

    /// Unigrams in text order.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.inner.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            let token = &stream.token().text;
            if token.chars().count() >= MIN_TOKEN_CHARS {
                tokens.push(token.clone());
            }
        }
        tokens
    }

    /// Unigrams followed by bigrams when `ngram_max` is 2.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.tokens(text);
        if self.ngram_max < 2 {
            return tokens;
        }
        let bigrams: Vec<String> = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
        let mut terms = tokens;
        terms.extend(bigrams);
        terms
    }
}

fn stopword_filter(policy: StopwordPolicy) -> Option<StopWordFilter> {
    let language = match policy {
        StopwordPolicy::None => return None,
        StopwordPolicy::Spanish => Language::Spanish,
        StopwordPolicy::English => Language::English,
    };
    StopWordFilter::new(language)
}
