//! Rendering of typed queries into the OpenSearch query DSL.

use serde_json::{json, Value};

use scholar_core::types::{KnnQuery, LexicalQuery, PaperId};

pub fn knn_body(query: &KnnQuery, vector_field: &str) -> Value {
    json!({
        "size": query.k,
        "_source": { "excludes": [vector_field] },
        "query": {
            "knn": { vector_field: { "vector": query.vector, "k": query.k } }
        }
    })
}

pub fn mget_body(ids: &[PaperId]) -> Value {
    json!({ "ids": ids })
}

/// `title^5` style field list for `multi_match`.
fn boosted_fields(query: &LexicalQuery) -> Vec<String> {
    query
        .fields
        .iter()
        .map(|f| if (f.boost - 1.0).abs() < f32::EPSILON { f.field.to_string() } else { format!("{}^{}", f.field, f.boost) })
        .collect()
}

pub fn lexical_body(query: &LexicalQuery, vector_field: &str) -> Value {
    json!({
        "size": query.size,
        "_source": { "excludes": [vector_field] },
        "query": {
            "bool": {
                "should": [
                    {
                        "multi_match": {
                            "query": query.text,
                            "fields": boosted_fields(query),
                            "type": "best_fields",
                            "fuzziness": "AUTO"
                        }
                    },
                    {
                        "match_phrase": {
                            query.phrase_field: { "query": query.text, "boost": query.phrase_boost }
                        }
                    }
                ],
                "minimum_should_match": 1
            }
        }
    })
}
