use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scholar_core::traits::VectorIndex;
use scholar_core::types::{KnnQuery, PaperId, PaperRecord};
use scholar_core::vector_math::l2_norm;
use scholar_core::{Error, Result};
use scholar_vector::{EmbeddingSearcher, SearchOptions};

/// In-memory index: ANN returns ids in insertion order (truncated to `k`),
/// multi-get returns the stored records.
#[derive(Default)]
struct MemoryIndex {
    order: Vec<PaperId>,
    docs: HashMap<PaperId, PaperRecord>,
    knn_calls: AtomicUsize,
    mget_calls: AtomicUsize,
    last_knn: Mutex<Option<KnnQuery>>,
}

impl MemoryIndex {
    fn with(papers: Vec<(&str, Option<Vec<f32>>)>) -> Arc<Self> {
        let mut index = Self::default();
        for (id, embedding) in papers {
            index.order.push(id.to_string());
            index.docs.insert(id.to_string(), PaperRecord { id: id.into(), title: format!("Paper {id}"), embedding, ..PaperRecord::default() });
        }
        Arc::new(index)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn knn_ids(&self, query: &KnnQuery) -> Result<Vec<PaperId>> {
        self.knn_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_knn.lock().unwrap() = Some(query.clone());
        Ok(self.order.iter().take(query.k).cloned().collect())
    }

    async fn multi_get(&self, ids: &[PaperId]) -> Result<Vec<PaperRecord>> {
        self.mget_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ids.iter().filter_map(|id| self.docs.get(id).cloned()).collect())
    }
}

fn ids(results: &[scholar_core::types::ScoredCandidate]) -> Vec<&str> {
    results.iter().map(|r| r.paper.id.as_str()).collect()
}

fn corpus() -> Arc<MemoryIndex> {
    MemoryIndex::with(vec![
        ("far", Some(vec![-1.0, 0.0, 0.0])),
        ("mid", Some(vec![1.0, 1.0, 0.0])),
        ("near", Some(vec![10.0, 0.5, 0.0])),
        ("ortho", Some(vec![0.0, 0.0, 3.0])),
        ("novec", None),
        ("wrongdim", Some(vec![1.0, 0.0])),
    ])
}

#[tokio::test]
async fn reranks_by_exact_cosine() {
    let index = corpus();
    let searcher = EmbeddingSearcher::new(index.clone());
    let results = searcher
        .search(&[2.0, 0.0, 0.0], SearchOptions { top_k: 10, min_cosine: -1.0, candidate_pool: 100 })
        .await
        .unwrap();

    assert_eq!(ids(&results), ["near", "mid", "ortho", "far"], "missing and mismatched vectors dropped");
    for w in results.windows(2) {
        assert!(w[0].score() >= w[1].score(), "non-increasing scores");
    }
    assert!(results.iter().all(|r| r.paper.embedding.is_none()), "vectors are not returned");

    let knn = index.last_knn.lock().unwrap().clone().unwrap();
    assert!((l2_norm(&knn.vector) - 1.0).abs() < 1e-6, "ANN receives the normalized vector");
    assert_eq!(knn.k, 100);
    assert_eq!(index.mget_calls.load(Ordering::SeqCst), 1, "one bulk lookup");
}

#[tokio::test]
async fn respects_floor_and_top_k() {
    let searcher = EmbeddingSearcher::new(corpus());
    let floor = 0.5;
    let results = searcher.search(&[1.0, 0.0, 0.0], SearchOptions { top_k: 10, min_cosine: floor, candidate_pool: 100 }).await.unwrap();
    assert_eq!(ids(&results), ["near", "mid"]);
    assert!(results.iter().all(|r| r.score() >= floor));

    let top1 = searcher.search(&[1.0, 0.0, 0.0], SearchOptions { top_k: 1, min_cosine: -1.0, candidate_pool: 100 }).await.unwrap();
    assert_eq!(ids(&top1), ["near"]);
}

#[tokio::test]
async fn candidate_pool_bounds_recall() {
    let searcher = EmbeddingSearcher::new(corpus());
    // Only "far" and "mid" are in a pool of two.
    let results = searcher.search(&[1.0, 0.0, 0.0], SearchOptions { top_k: 10, min_cosine: -1.0, candidate_pool: 2 }).await.unwrap();
    assert_eq!(ids(&results), ["mid", "far"]);
}

#[tokio::test]
async fn equal_scores_keep_ann_order() {
    let index = MemoryIndex::with(vec![("b", Some(vec![1.0, 0.0])), ("a", Some(vec![2.0, 0.0])), ("c", Some(vec![0.5, 0.0]))]);
    let results = EmbeddingSearcher::new(index).search(&[1.0, 0.0], SearchOptions::default()).await.unwrap();
    assert_eq!(ids(&results), ["b", "a", "c"]);
}

#[tokio::test]
async fn empty_pool_or_empty_index_is_empty_result() {
    let index = corpus();
    let searcher = EmbeddingSearcher::new(index.clone());
    let none = searcher.search(&[1.0, 0.0, 0.0], SearchOptions { candidate_pool: 0, ..SearchOptions::default() }).await.unwrap();
    assert!(none.is_empty());
    assert_eq!(index.knn_calls.load(Ordering::SeqCst), 0);

    let empty = EmbeddingSearcher::new(MemoryIndex::with(vec![]));
    assert!(empty.search(&[1.0, 0.0, 0.0], SearchOptions::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_vector_is_rejected_before_network() {
    let index = corpus();
    let err = EmbeddingSearcher::new(index.clone()).search(&[], SearchOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(index.knn_calls.load(Ordering::SeqCst), 0);
    assert_eq!(index.mget_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_query_vector_scores_zero() {
    let results = EmbeddingSearcher::new(corpus())
        .search(&[0.0, 0.0, 0.0], SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.score() == 0.0));
}
