//! Splits document text into bounded, non-overlapping chunks.
//!
//! Boundaries are tried coarse to fine: paragraphs, sentences, words, and
//! finally a hard cut at `max_len` characters. Every chunk is a contiguous
//! slice of the source with its surrounding whitespace trimmed, so the
//! chunks appear in the source in order and only whitespace lies between
//! them. Lengths are counted in Unicode scalar values. Output is a pure
//! function of `(text, max_len)`.

use std::ops::Range;

use crate::error::{RagError, Result};

/// Byte range into the source text.
type Span = Range<usize>;

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_len: usize,
}

impl Chunker {
    pub fn new(max_len: usize) -> Result<Self> {
        if max_len == 0 {
            return Err(RagError::Config("chunk max length must be at least 1".into()));
        }
        Ok(Self { max_len })
    }

    pub const fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut packer = Packer::new(text, self.max_len);

        for paragraph in paragraph_spans(text) {
            if self.fits(text, &paragraph) {
                packer.push(paragraph);
                continue;
            }
            for sentence in sentence_spans(text, paragraph) {
                if self.fits(text, &sentence) {
                    packer.push(sentence);
                    continue;
                }
                for word in word_spans(text, sentence) {
                    for piece in hard_split(text, word, self.max_len) {
                        packer.push(piece);
                    }
                }
            }
        }

        packer.finish()
    }

    fn fits(&self, text: &str, span: &Span) -> bool {
        char_len(&text[span.clone()]) <= self.max_len
    }
}

/// Convenience wrapper over [`Chunker`]; a zero `max_len` is treated as 1.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    Chunker { max_len: max_len.max(1) }.chunk(text)
}

/// Greedily extends the current chunk over consecutive pieces while the
/// source slice from its first piece to the new piece stays within `max_len`.
struct Packer<'a> {
    text: &'a str,
    max_len: usize,
    chunks: Vec<String>,
    current: Option<Span>,
    current_len: usize,
}

impl<'a> Packer<'a> {
    const fn new(text: &'a str, max_len: usize) -> Self {
        Self {
            text,
            max_len,
            chunks: Vec::new(),
            current: None,
            current_len: 0,
        }
    }

    /// `piece` is trimmed, non-empty, within `max_len` and starts after the
    /// previous piece.
    fn push(&mut self, piece: Span) {
        if let Some(current) = &mut self.current {
            let extended = self.current_len + char_len(&self.text[current.end..piece.end]);
            if extended <= self.max_len {
                current.end = piece.end;
                self.current_len = extended;
                return;
            }
            self.flush();
        }
        self.current_len = char_len(&self.text[piece.clone()]);
        self.current = Some(piece);
    }

    fn flush(&mut self) {
        if let Some(span) = self.current.take() {
            self.chunks.push(self.text[span].to_string());
        }
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn trimmed(text: &str, span: Span) -> Option<Span> {
    let slice = &text[span.clone()];
    let start = span.start + (slice.len() - slice.trim_start().len());
    let end = span.end - (slice.len() - slice.trim_end().len());
    (start < end).then_some(start..end)
}

/// Blocks separated by one or more blank lines.
fn paragraph_spans(text: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut blank_run_start: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            blank_run_start.get_or_insert(offset);
        } else if let Some(end) = blank_run_start.take() {
            out.extend(trimmed(text, start..end));
            start = offset;
        }
        offset += line.len();
    }
    out.extend(trimmed(text, start..text.len()));
    out
}

/// Sentences end at `.`, `!` or `?` followed by whitespace or the end of the span.
fn sentence_spans(text: &str, span: Span) -> Vec<Span> {
    let mut out = Vec::new();
    let mut start = span.start;
    let mut chars = text[span.clone()].char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                let end = span.start + i + c.len_utf8();
                out.extend(trimmed(text, start..end));
                start = end;
            }
        }
    }
    out.extend(trimmed(text, start..span.end));
    out
}

fn word_spans(text: &str, span: Span) -> Vec<Span> {
    let mut out = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in text[span.clone()].char_indices() {
        let at = span.start + i;
        match (c.is_whitespace(), word_start) {
            (true, Some(start)) => {
                out.push(start..at);
                word_start = None;
            }
            (false, None) => word_start = Some(at),
            _ => {}
        }
    }
    if let Some(start) = word_start {
        out.push(start..span.end);
    }
    out
}

fn hard_split(text: &str, span: Span, max_len: usize) -> Vec<Span> {
    let mut pieces = Vec::new();
    let mut start = span.start;
    let mut count = 0;

    for (i, _) in text[span.clone()].char_indices() {
        let at = span.start + i;
        if count == max_len {
            pieces.push(start..at);
            start = at;
            count = 0;
        }
        count += 1;
    }
    if start < span.end {
        pieces.push(start..span.end);
    }
    pieces
}
