use crate::extract::{ExtractorFactory, FileContent, FileType};
use crate::index::FileIndex;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Where a document came from, for documents split out of a larger file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSource {
    pub document: String,
    pub chunk_index: usize,
}

/// A document handed to a retriever for scoring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    /// Caller-supplied identifier; assigned automatically when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub filename: String,
    pub file_type: FileType,
    pub content: FileContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DocumentSource>,
}

/// One search hit with its relevance score
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetrievedDocument {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    pub content: FileContent,
    pub relevance_score: f64,
}

/// A scoring backend: documents go in, ranked hits come out
pub trait Retriever {
    /// Register a document and return its id
    fn add_document(&mut self, document: IndexedDocument) -> String;
    /// Rank documents against the query, best first, at most `top_k`
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedDocument>;
}

/// Lowercased alphanumeric-and-underscore runs
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

struct StoredDocument {
    id: String,
    doc: IndexedDocument,
}

/// TF-IDF keyword retrieval over an inverted index.
///
/// Score is `tf * ln(N / df)` summed per query term, where N is the full
/// corpus size. Ties keep insertion order, so ranking is deterministic
/// across rebuilds of the same corpus.
#[derive(Default)]
pub struct KeywordRetriever {
    documents: Vec<StoredDocument>,
    // term -> document id -> term count
    inverted: HashMap<String, HashMap<String, usize>>,
}

impl KeywordRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Retriever for KeywordRetriever {
    fn add_document(&mut self, mut document: IndexedDocument) -> String {
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| self.documents.len().to_string());
        document.id = Some(id.clone());

        for token in tokenize(&document.content.canonical_text()) {
            *self
                .inverted
                .entry(token)
                .or_default()
                .entry(id.clone())
                .or_insert(0) += 1;
        }

        self.documents.push(StoredDocument {
            id: id.clone(),
            doc: document,
        });
        id
    }

    fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedDocument> {
        let tokens = tokenize(query);
        if tokens.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let total = self.documents.len() as f64;
        let mut scores: HashMap<&str, f64> = HashMap::new();
        for token in &tokens {
            if let Some(postings) = self.inverted.get(token) {
                let idf = (total / postings.len() as f64).ln();
                for (doc_id, count) in postings {
                    *scores.entry(doc_id.as_str()).or_insert(0.0) += *count as f64 * idf;
                }
            }
        }

        // Walk documents in insertion order so equal scores keep a stable rank
        let mut ranked: Vec<(usize, f64)> = self
            .documents
            .iter()
            .enumerate()
            .filter_map(|(idx, stored)| {
                scores.get(stored.id.as_str()).map(|score| (idx, *score))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .map(|(idx, score)| {
                let stored = &self.documents[idx];
                RetrievedDocument {
                    id: stored.id.clone(),
                    filename: stored.doc.filename.clone(),
                    file_type: stored.doc.file_type,
                    content: stored.doc.content.clone(),
                    relevance_score: score,
                }
            })
            .collect()
    }
}

/// Fans a query out to several retrievers and merges the ranked hits,
/// deduplicating by id (first occurrence wins)
#[derive(Default)]
pub struct CombinedRetriever {
    retrievers: Vec<Box<dyn Retriever + Send>>,
    assigned: usize,
}

impl CombinedRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, retriever: Box<dyn Retriever + Send>) {
        self.retrievers.push(retriever);
    }
}

impl Retriever for CombinedRetriever {
    fn add_document(&mut self, mut document: IndexedDocument) -> String {
        let id = document.id.clone().unwrap_or_else(|| {
            let id = self.assigned.to_string();
            self.assigned += 1;
            id
        });
        document.id = Some(id.clone());

        for retriever in &mut self.retrievers {
            retriever.add_document(document.clone());
        }
        id
    }

    fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedDocument> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<RetrievedDocument> = Vec::new();
        for retriever in &self.retrievers {
            for hit in retriever.retrieve(query, top_k) {
                if seen.insert(hit.id.clone()) {
                    merged.push(hit);
                }
            }
        }
        merged.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
        });
        merged.truncate(top_k);
        merged
    }
}

/// Build a keyword retriever by re-extracting every file the index knows.
/// Files that fail to extract are skipped with a warning; document ids are
/// the absolute file paths.
pub async fn rebuild_from_index(index: &FileIndex) -> Result<KeywordRetriever> {
    let mut retriever = KeywordRetriever::new();
    for record in index.all_files() {
        if record.file_type == FileType::Unknown {
            continue;
        }
        let source = match ExtractorFactory::for_type(&record.path, record.file_type) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", record.path.display(), e);
                continue;
            }
        };
        let content = match source.extract().await {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", record.path.display(), e);
                continue;
            }
        };
        retriever.add_document(IndexedDocument {
            id: Some(record.path.display().to_string()),
            filename: record.filename.clone(),
            file_type: record.file_type,
            content,
            source: None,
        });
    }
    Ok(retriever)
}

/// Find the window of `2 * radius` characters around the densest cluster
/// of query terms, for display under a search hit. Newlines are flattened
/// to spaces. Returns None when no term occurs in the content.
pub fn find_snippet(content: &str, terms: &[String], radius: usize) -> Option<String> {
    if content.is_empty() || terms.is_empty() {
        return None;
    }

    let flattened: String = content
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let lowered = flattened.to_lowercase();

    // Candidate window starts: every occurrence of every term, widened by
    // the radius. Offsets index the lowered copy; they are only used to
    // slice it, so the original/lowered length difference does not matter.
    let mut starts: Vec<usize> = Vec::new();
    for term in terms {
        let term = term.to_lowercase();
        if term.is_empty() {
            continue;
        }
        let mut from = 0;
        while let Some(pos) = lowered[from..].find(&term) {
            let pos = from + pos;
            starts.push(pos.saturating_sub(radius));
            from = next_char_boundary(&lowered, pos + 1);
            if from >= lowered.len() {
                break;
            }
        }
    }
    if starts.is_empty() {
        return None;
    }

    let window = radius * 2;
    let mut best_start = 0;
    let mut best_count = 0;
    for &start in &starts {
        let start = prev_char_boundary(&lowered, start);
        let end = next_char_boundary(&lowered, (start + window).min(lowered.len()));
        let slice = &lowered[start..end];
        let count: usize = terms
            .iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|t| slice.matches(&t).count())
            .sum();
        if count > best_count {
            best_count = count;
            best_start = start;
        }
    }

    let start = prev_char_boundary(&flattened, best_start);
    let end = next_char_boundary(&flattened, (start + window).min(flattened.len()));
    Some(flattened[start..end].trim().to_string())
}

fn prev_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
