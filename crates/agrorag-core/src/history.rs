//! Caller-owned, append-only record of answered questions.

use serde::{Deserialize, Serialize};

use crate::types::Answer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: Answer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    exchanges: Vec<Exchange>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: Answer) {
        self.exchanges.push(Exchange { question: question.into(), answer });
    }

    /// Most recent first.
    pub fn recent(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }
}

impl Exchange {
    /// Question shortened to 60 characters for list views.
    pub fn title(&self) -> String {
        crate::types::truncate_chars(&self.question, 60)
    }
}
