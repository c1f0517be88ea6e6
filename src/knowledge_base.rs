use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::constants::{MATCH_CANDIDATES, MATCH_CUTOFF};
use crate::error::{KbResult, KnowledgeBaseError};

/// One stored question with every answer taught for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    // The on-disk key is "questions" even though it holds a single question.
    #[serde(rename = "questions")]
    pub question: String,
    #[serde(default)]
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub questions: Vec<Entry>,
}

/// Lowercases and trims a question so lookups and learning agree.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Character-level similarity in `[0, 1]`.
fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Word-level similarity used to rank the close candidates.
fn word_overlap(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the knowledge base at `path`. A missing file yields an empty base.
    ///
    /// Stored questions are normalised on the way in; entries that collapse
    /// to the same question have their answers merged in file order.
    pub async fn load(path: impl AsRef<Path>) -> KbResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No knowledge base at {}, starting empty", path_str);
                return Ok(Self::new());
            }
            Err(source) => return Err(KnowledgeBaseError::Io { path: path_str, source }),
        };
        let stored: Self = serde_json::from_str(&raw)
            .map_err(|source| KnowledgeBaseError::Malformed { path: path_str.clone(), source })?;

        let mut kb = Self::new();
        for entry in stored.questions {
            kb.merge(Entry {
                question: normalize(&entry.question),
                answers: entry.answers,
            });
        }
        info!("Loaded {} questions from {}", kb.len(), path_str);
        Ok(kb)
    }

    /// Writes the base as pretty JSON, replacing the file atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> KbResult<()> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let io_err = |source| KnowledgeBaseError::Io { path: path_str.clone(), source };

        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        if let Err(source) = tokio::fs::rename(&tmp, path).await {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                warn!("Failed to remove {}: {}", tmp.to_string_lossy(), e);
            }
            return Err(io_err(source));
        }
        debug!("Saved {} questions to {}", self.len(), path_str);
        Ok(())
    }

    fn merge(&mut self, entry: Entry) {
        match self.questions.iter_mut().find(|e| e.question == entry.question) {
            Some(existing) => existing.answers.extend(entry.answers),
            None => self.questions.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Finds the stored question closest to `question`.
    ///
    /// Questions scoring at least [`MATCH_CUTOFF`] are candidates; the best
    /// [`MATCH_CANDIDATES`] of them are re-ranked by word overlap.
    pub fn find_best_match(&self, question: &str) -> Option<&str> {
        let mut candidates: Vec<(&str, f64)> = self
            .questions
            .iter()
            .map(|entry| (entry.question.as_str(), similarity(question, &entry.question)))
            .filter(|(_, score)| *score >= MATCH_CUTOFF)
            .collect();

        candidates.sort_by(|a, b| descending(a.1, b.1));
        candidates.truncate(MATCH_CANDIDATES);

        // Stable sort keeps the character ranking for equal word overlap.
        candidates.sort_by(|a, b| descending(word_overlap(question, a.0), word_overlap(question, b.0)));

        let best = candidates.first().map(|(q, _)| *q);
        debug!(?question, ?best, "Knowledge base lookup");
        best
    }

    /// Picks one of the answers stored for exactly `question`.
    pub fn answer_for<R: Rng + ?Sized>(&self, question: &str, rng: &mut R) -> Option<&str> {
        self.questions
            .iter()
            .find(|entry| entry.question == question)
            .and_then(|entry| entry.answers.choose(rng))
            .map(String::as_str)
    }

    /// Records `answer` for `question`, creating the entry when needed.
    pub fn learn(&mut self, question: &str, answer: &str) {
        self.merge(Entry {
            question: question.to_string(),
            answers: vec![answer.to_string()],
        });
    }
}
