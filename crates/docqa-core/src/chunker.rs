use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::types::SourceDocument;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk, carried overlap included.
    pub chunk_size: usize,
    /// Characters copied from the end of one chunk to the start of the next.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

/// Greedy sentence packer.
///
/// Sentences are appended to the current chunk until the next one would push
/// it past `chunk_size`; the chunk is then emitted and the next one starts
/// with the tail of the previous chunk. Sentences too long to fit are split
/// on whitespace first.
#[derive(Debug, Default, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        for sentence in split_sentences(text) {
            for piece in self.fit_pieces(&sentence) {
                let extra = if current.is_empty() { 0 } else { 1 };
                if char_len(&current) + extra + char_len(&piece) > self.config.chunk_size {
                    let done = current.trim();
                    let tail = tail_chars(done, self.config.overlap).trim_start().to_string();
                    if !done.is_empty() {
                        chunks.push(done.to_string());
                    }
                    current = tail;
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            }
        }
        let last = current.trim();
        if !last.is_empty() {
            chunks.push(last.to_string());
        }
        chunks
    }

    /// Longest piece that still fits after a carried overlap and a separator.
    fn max_piece(&self) -> usize {
        self.config.chunk_size.saturating_sub(self.config.overlap + 1).max(1)
    }

    fn fit_pieces(&self, sentence: &str) -> Vec<String> {
        let max = self.max_piece();
        if char_len(sentence) <= max {
            return vec![sentence.to_string()];
        }
        let mut pieces = Vec::new();
        let mut buf = String::new();
        for word in sentence.split_whitespace() {
            for part in split_word(word, max) {
                let extra = if buf.is_empty() { 0 } else { 1 };
                if !buf.is_empty() && char_len(&buf) + extra + char_len(&part) > max {
                    pieces.push(std::mem::take(&mut buf));
                }
                if !buf.is_empty() {
                    buf.push(' ');
                }
                buf.push_str(&part);
            }
        }
        if !buf.is_empty() {
            pieces.push(buf);
        }
        pieces
    }
}

/// Split on sentence terminators followed by whitespace, and on blank lines.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut buf = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        buf.push(c);
        let next = chars.peek().copied();
        let terminal = matches!(c, '.' | '!' | '?') && next.map_or(true, char::is_whitespace);
        let paragraph = c == '\n' && next == Some('\n');
        if terminal || paragraph {
            push_trimmed(&mut sentences, &buf);
            buf.clear();
        }
    }
    push_trimmed(&mut sentences, &buf);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if !s.is_empty() {
        out.push(s);
    }
}

fn split_word(word: &str, max: usize) -> Vec<String> {
    if char_len(word) <= max {
        return vec![word.to_string()];
    }
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let total = char_len(s);
    if total <= n {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

/// Read a text file, or every text file below a directory in path order.
pub fn load_text_sources(path: &Path) -> Result<Vec<SourceDocument>> {
    if !path.exists() {
        return Err(Error::not_found(format!("{} does not exist", path.display())));
    }
    let files = if path.is_file() { vec![path.to_path_buf()] } else { list_text_files(path) };
    let mut docs = Vec::with_capacity(files.len());
    for file in files {
        let content = read_file_content(&file)?;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        tracing::debug!(file = %file.display(), bytes = content.len(), "loaded source");
        docs.push(SourceDocument { name, path: file, content });
    }
    Ok(docs)
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminators_and_blank_lines() {
        let s = split_sentences("One. Two!  Three?\n\nHeading\nbody v1.2 text");
        assert_eq!(s, vec!["One.", "Two!", "Three?", "Heading body v1.2 text"]);
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail_chars("héllo wörld", 5), "wörld");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("ab", 0), "");
    }

    #[test]
    fn long_words_are_split() {
        assert_eq!(split_word("abcdefg", 3), vec!["abc", "def", "g"]);
    }
}
