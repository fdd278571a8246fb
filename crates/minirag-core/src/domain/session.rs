use std::collections::VecDeque;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Recent question/answer turns for one user or session.
///
/// Owned by whichever front end keeps the conversation; the core only reads
/// it or appends to it when handed a reference.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl SessionHistory {
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns),
            max_turns,
        }
    }

    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        if self.turns.len() == self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, turn) in self.turns.iter().enumerate() {
            let n = i + 1;
            let _ = write!(out, "Q{n}: {}\nA{n}: {}\n\n", turn.question, turn.answer);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keeps_only_last_turns() {
        let mut history = SessionHistory::new(3);
        for i in 0..5 {
            history.record(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(history.len(), 3);
        let questions: Vec<_> = history.turns().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn test_render_numbers_turns() {
        let mut history = SessionHistory::new(3);
        history.record("What color is the sky?", "Blue.");
        assert_eq!(history.render(), "Q1: What color is the sky?\nA1: Blue.\n\n");
    }
}
