//! End-to-end retrieval routing checks for the hybrid Vector Store (§4.2,
//! §8 testable property 4: "if BM25 returns >=1 hit, the response is
//! identical to search(method=bm25)").

use investigator::config::RetrievalMethod;
use investigator::domain::{ChunkMetadata, DocumentChunk, RetrievalMethodUsed};
use investigator::vector_store::VectorStore;

fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> DocumentChunk {
    DocumentChunk {
        id: id.to_string(),
        text: text.to_string(),
        metadata: ChunkMetadata {
            filename: format!("{}.txt", id),
            content_category: "sar_guidance".to_string(),
            jurisdiction: Some("US".to_string()),
            source_agency: Some("FinCEN".to_string()),
        },
        embedding: Some(embedding),
    }
}

fn sample_corpus() -> Vec<DocumentChunk> {
    vec![
        chunk("c1", "Suspicious Activity Report SAR filing requirements for structuring", vec![1.0, 0.0, 0.0]),
        chunk("c2", "FATF recommendations on offshore shell company due diligence", vec![0.0, 1.0, 0.0]),
        chunk("c3", "General guidance unrelated to fraud or compliance topics", vec![0.0, 0.0, 1.0]),
    ]
}

#[test]
fn auto_method_returns_bm25_hits_when_available() {
    let store = VectorStore::build(sample_corpus(), RetrievalMethod::Auto).unwrap();
    let (hits, err) = store.search("SAR structuring", &[], 10);
    assert!(err.is_none());
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk.id, "c1");
    assert_eq!(hits[0].method, RetrievalMethodUsed::Bm25);
}

#[test]
fn auto_matches_forced_bm25_whenever_bm25_has_hits() {
    let auto_store = VectorStore::build(sample_corpus(), RetrievalMethod::Auto).unwrap();
    let bm25_store = VectorStore::build(sample_corpus(), RetrievalMethod::Bm25Only).unwrap();

    let (auto_hits, _) = auto_store.search("shell company offshore", &[], 10);
    let (bm25_hits, _) = bm25_store.search("shell company offshore", &[], 10);

    let auto_ids: Vec<&str> = auto_hits.iter().map(|h| h.chunk.id.as_str()).collect();
    let bm25_ids: Vec<&str> = bm25_hits.iter().map(|h| h.chunk.id.as_str()).collect();
    assert_eq!(auto_ids, bm25_ids);
}

#[test]
fn auto_falls_back_to_dense_on_zero_bm25_hits() {
    let store = VectorStore::build(sample_corpus(), RetrievalMethod::Auto).unwrap();
    // no query token overlaps any indexed chunk at all
    let (hits, err) = store.search("xyzzy plugh quux", &[0.0, 1.0, 0.0], 10);
    assert!(err.is_none());
    assert!(!hits.is_empty());
    assert_eq!(hits[0].method, RetrievalMethodUsed::Fallback);
    assert_eq!(hits[0].chunk.id, "c2");
}

#[test]
fn dense_only_without_an_embedding_degrades_to_empty_with_an_error() {
    let store = VectorStore::build(sample_corpus(), RetrievalMethod::DenseOnly).unwrap();
    let (hits, err) = store.search("anything", &[], 5);
    assert!(hits.is_empty());
    assert!(err.is_some());
}

#[test]
fn acronym_and_punctuated_form_tokenize_identically() {
    let store = VectorStore::build(sample_corpus(), RetrievalMethod::Bm25Only).unwrap();
    let (hits_acronym, _) = store.search("SAR", &[], 10);
    let (hits_punctuated, _) = store.search("S.A.R.", &[], 10);
    assert!(!hits_acronym.is_empty());
    assert_eq!(hits_acronym[0].chunk.id, hits_punctuated.first().map(|h| h.chunk.id.as_str()).unwrap_or(""));
}

#[test]
fn ties_break_by_ascending_chunk_id() {
    let identical = vec![
        chunk("z-last", "fraud investigation guidance", vec![1.0, 0.0, 0.0]),
        chunk("a-first", "fraud investigation guidance", vec![1.0, 0.0, 0.0]),
    ];
    let store = VectorStore::build(identical, RetrievalMethod::Bm25Only).unwrap();
    let (hits, _) = store.search("fraud investigation guidance", &[], 10);
    assert_eq!(hits[0].chunk.id, "a-first");
    assert_eq!(hits[1].chunk.id, "z-last");
}
