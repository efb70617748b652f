//! The Vector Store (C2): hybrid BM25/dense retrieval over a pre-indexed,
//! immutable-after-build document corpus (§4.2).

use std::collections::HashMap;

use crate::config::RetrievalMethod;
use crate::domain::{ChunkMetadata, DocumentChunk, RetrievalHit, RetrievalMethodUsed};

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// Case-fold, strip punctuation, but keep runs of uppercase letters (e.g.
/// "SAR", "S.A.R.") as a single token once punctuation is stripped —
/// resolving §9's open tokenizer question by treating acronyms as
/// ordinary alphanumeric tokens after stripping the separating dots, so
/// "S.A.R." and "SAR" both tokenize to `sar`.
pub fn tokenize(text: &str) -> Vec<String> {
    // Drop a '.' that sits between two letters before the general split,
    // so "S.A.R." loses its internal dots and merges with "SAR" below,
    // while a dot ending a sentence (followed by a space or nothing)
    // still acts as a separator.
    let chars: Vec<char> = text.chars().collect();
    let mut stripped = String::with_capacity(chars.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '.' {
            let prev_alpha = i > 0 && chars[i - 1].is_alphabetic();
            let next_alpha = chars.get(i + 1).is_some_and(|c| c.is_alphabetic());
            if prev_alpha && next_alpha {
                continue;
            }
        }
        stripped.push(ch);
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in stripped.chars() {
        if ch.is_alphanumeric() {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct IndexedChunk {
    chunk: DocumentChunk,
    tokens: Vec<String>,
    term_freqs: HashMap<String, u32>,
    doc_len: usize,
}

/// Immutable-after-build retrieval index (§4.2, §5). Construction happens
/// once via [`VectorStore::build`]; `search` is the only operation
/// thereafter.
pub struct VectorStore {
    chunks: Vec<IndexedChunk>,
    doc_freq: HashMap<String, u32>,
    avg_doc_len: f64,
    embedding_dim: Option<usize>,
    method: RetrievalMethod,
}

/// Non-fatal error surfaced in an `AgentResult` trace when retrieval
/// degrades (§4.2: "never aborts the investigation").
#[derive(Debug, Clone)]
pub struct RetrievalError(pub String);

impl std::fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "retrieval error: {}", self.0)
    }
}

impl VectorStore {
    /// Build an index from ingested chunks. Ingestion itself (PDF
    /// extraction, chunking) is out of scope (§1); this only tokenizes for
    /// BM25 and records each chunk's embedding for the dense path.
    pub fn build(chunks: Vec<DocumentChunk>, method: RetrievalMethod) -> Result<Self, String> {
        let embedding_dim = chunks
            .iter()
            .find_map(|c| c.embedding.as_ref().map(|e| e.len()));
        if let Some(dim) = embedding_dim {
            for c in &chunks {
                if let Some(e) = &c.embedding {
                    if e.len() != dim {
                        return Err(format!(
                            "chunk {} has embedding dimension {}, expected {}",
                            c.id,
                            e.len(),
                            dim
                        ));
                    }
                }
            }
        }

        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0usize;
        let mut indexed = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let tokens = tokenize(&chunk.text);
            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for t in &tokens {
                *term_freqs.entry(t.clone()).or_insert(0) += 1;
            }
            for t in term_freqs.keys() {
                *doc_freq.entry(t.clone()).or_insert(0) += 1;
            }
            total_len += tokens.len();
            indexed.push(IndexedChunk {
                chunk,
                doc_len: tokens.len(),
                tokens,
                term_freqs,
            });
        }

        let avg_doc_len = if indexed.is_empty() {
            0.0
        } else {
            total_len as f64 / indexed.len() as f64
        };

        Ok(Self {
            chunks: indexed,
            doc_freq,
            avg_doc_len,
            embedding_dim,
            method,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn bm25_score(&self, query_tokens: &[String], doc: &IndexedChunk) -> f64 {
        let n = self.chunks.len() as f64;
        let mut score = 0.0;
        for term in query_tokens {
            let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
            if df == 0.0 {
                continue;
            }
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            let tf = *doc.term_freqs.get(term).unwrap_or(&0) as f64;
            let denom = tf + K1 * (1.0 - B + B * (doc.doc_len as f64 / self.avg_doc_len.max(1.0)));
            if denom > 0.0 {
                score += idf * (tf * (K1 + 1.0)) / denom;
            }
        }
        score
    }

    fn search_bm25(&self, query: &str, k: usize) -> Vec<RetrievalHit> {
        let query_tokens = tokenize(query);
        let mut scored: Vec<(f64, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|doc| (self.bm25_score(&query_tokens, doc), doc))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.chunk.id.cmp(&b.1.chunk.id))
        });
        scored
            .into_iter()
            .take(k)
            .map(|(score, doc)| RetrievalHit {
                chunk: doc.chunk.clone(),
                score,
                method: RetrievalMethodUsed::Bm25,
            })
            .collect()
    }

    fn search_dense(&self, query_embedding: &[f32], k: usize, fallback: bool) -> Vec<RetrievalHit> {
        let mut scored: Vec<(f64, &IndexedChunk)> = self
            .chunks
            .iter()
            .filter_map(|doc| {
                let embedding = doc.chunk.embedding.as_ref()?;
                Some((cosine_similarity(query_embedding, embedding), doc))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.chunk.id.cmp(&b.1.chunk.id))
        });
        let method = if fallback {
            RetrievalMethodUsed::Fallback
        } else {
            RetrievalMethodUsed::Dense
        };
        scored
            .into_iter()
            .take(k)
            .map(|(score, doc)| RetrievalHit {
                chunk: doc.chunk.clone(),
                score,
                method,
            })
            .collect()
    }

    /// `search(query, k)` per §4.2. `query_embedding` is required only when
    /// the dense path is actually exercised (forced, or BM25 fell back);
    /// callers without an embedding provider configured pass `&[]`, in
    /// which case a dense fallback degrades to an empty hit list plus a
    /// [`RetrievalError`], matching the "dense errors return an empty hit
    /// list" failure semantics.
    pub fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> (Vec<RetrievalHit>, Option<RetrievalError>) {
        match self.method {
            RetrievalMethod::Bm25Only => (self.search_bm25(query, k), None),
            RetrievalMethod::DenseOnly => self.dense_or_error(query_embedding, k, false),
            RetrievalMethod::Auto => {
                let hits = self.search_bm25(query, k);
                if !hits.is_empty() {
                    (hits, None)
                } else {
                    self.dense_or_error(query_embedding, k, true)
                }
            }
        }
    }

    fn dense_or_error(
        &self,
        query_embedding: &[f32],
        k: usize,
        fallback: bool,
    ) -> (Vec<RetrievalHit>, Option<RetrievalError>) {
        if query_embedding.is_empty() || self.embedding_dim.is_none() {
            return (
                Vec::new(),
                Some(RetrievalError("no query embedding available for dense search".to_string())),
            );
        }
        if let Some(dim) = self.embedding_dim {
            if query_embedding.len() != dim {
                return (
                    Vec::new(),
                    Some(RetrievalError(format!(
                        "query embedding dimension {} does not match corpus dimension {}",
                        query_embedding.len(),
                        dim
                    ))),
                );
            }
        }
        (self.search_dense(query_embedding, k, fallback), None)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

fn make_chunk(id: &str, text: &str, embedding: Option<Vec<f32>>) -> DocumentChunk {
    DocumentChunk {
        id: id.to_string(),
        text: text.to_string(),
        metadata: ChunkMetadata {
            filename: format!("{}.txt", id),
            content_category: "sar_guidance".to_string(),
            jurisdiction: None,
            source_agency: None,
        },
        embedding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_and_dotted_form_tokenize_identically() {
        assert_eq!(tokenize("SAR"), tokenize("S.A.R."));
    }

    #[test]
    fn bm25_ranks_matching_chunk_first() {
        let chunks = vec![
            make_chunk("a", "suspicious activity report filing thresholds", None),
            make_chunk("b", "unrelated office supplies invoice text", None),
        ];
        let store = VectorStore::build(chunks, RetrievalMethod::Bm25Only).unwrap();
        let (hits, err) = store.search("suspicious activity report", &[], 5);
        assert!(err.is_none());
        assert_eq!(hits[0].chunk.id, "a");
    }

    #[test]
    fn auto_falls_back_to_dense_on_zero_bm25_hits() {
        let chunks = vec![make_chunk("a", "zzz", Some(vec![1.0, 0.0]))];
        let store = VectorStore::build(chunks, RetrievalMethod::Auto).unwrap();
        let (hits, err) = store.search("nonmatching query terms", &[1.0, 0.0], 5);
        assert!(err.is_none());
        assert_eq!(hits[0].method, RetrievalMethodUsed::Fallback);
    }

    #[test]
    fn dense_without_embedding_is_empty_with_error() {
        let chunks = vec![make_chunk("a", "zzz", None)];
        let store = VectorStore::build(chunks, RetrievalMethod::DenseOnly).unwrap();
        let (hits, err) = store.search("query", &[], 5);
        assert!(hits.is_empty());
        assert!(err.is_some());
    }

    #[test]
    fn ties_break_by_chunk_id_ascending() {
        let chunks = vec![
            make_chunk("b", "fraud fraud fraud", None),
            make_chunk("a", "fraud fraud fraud", None),
        ];
        let store = VectorStore::build(chunks, RetrievalMethod::Bm25Only).unwrap();
        let (hits, _) = store.search("fraud", &[], 5);
        assert_eq!(hits[0].chunk.id, "a");
    }
}
