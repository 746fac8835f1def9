use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use scholar_core::config::IndexSettings;
use scholar_core::traits::{LexicalIndex, VectorIndex};
use scholar_core::types::{FieldBoost, KnnQuery, LexicalQuery};
use scholar_core::Error;
use scholar_index::OpenSearchClient;

/// Script entry that reads the request and closes the socket unanswered.
const DROP: u16 = 0;

/// Minimal HTTP/1.1 server answering each connection with the next scripted
/// `(status, body)` and recording request paths and bodies.
struct ScriptedServer {
    url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

async fn serve(script: Vec<(u16, String)>) -> ScriptedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    tokio::spawn(async move {
        for (status, body) in script {
            let (mut socket, _) = listener.accept().await.unwrap();
            let (path, request_body) = read_request(&mut socket).await;
            seen.lock().unwrap().push((path, request_body));
            if status == DROP {
                drop(socket);
                continue;
            }
            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });
    ScriptedServer { url, requests }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> (String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if n == 0 {
            break buf.len();
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
    (path, String::from_utf8_lossy(&buf[header_end..]).to_string())
}

fn client_for(url: &str) -> OpenSearchClient {
    OpenSearchClient::new(&IndexSettings { host: url.to_string(), ..IndexSettings::default() }).unwrap()
}

fn lexical(text: &str) -> LexicalQuery {
    LexicalQuery {
        text: text.into(),
        fields: vec![FieldBoost { field: "title", boost: 5.0 }],
        phrase_field: "title",
        phrase_boost: 10.0,
        size: 10,
    }
}

#[tokio::test]
async fn knn_then_mget_round_trip() {
    let server = serve(vec![
        (200, json!({"hits": {"hits": [{"_id": "a"}, {"_id": "b"}]}}).to_string()),
        (200, json!({"docs": [{"_id": "a", "found": true, "_source": {"title": "A", "embedding": [1.0, 0.0]}}]}).to_string()),
    ])
    .await;
    let client = client_for(&server.url);

    let ids = client.knn_ids(&KnnQuery { vector: vec![1.0, 0.0], k: 2 }).await.unwrap();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    let papers = client.multi_get(&ids).await.unwrap();
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].embedding, Some(vec![1.0, 0.0]));

    let requests = server.requests.lock().unwrap().clone();
    assert_eq!(requests[0].0, "/semantic-scholar-papers/_search");
    assert_eq!(requests[1].0, "/semantic-scholar-papers/_mget");
    let mget: serde_json::Value = serde_json::from_str(&requests[1].1).unwrap();
    assert_eq!(mget["ids"], json!(["a", "b"]));
}

#[tokio::test]
async fn service_unavailable_is_busy() {
    let server = serve(vec![(503, "{\"error\":\"overloaded\"}".to_string())]).await;
    let err = client_for(&server.url).search_lexical(&lexical("q")).await.unwrap_err();
    assert!(err.is_busy(), "got {err:?}");
}

#[tokio::test]
async fn other_statuses_are_upstream_errors() {
    let server = serve(vec![(400, "{\"error\":\"parse\"}".to_string())]).await;
    let err = client_for(&server.url).search_lexical(&lexical("q")).await.unwrap_err();
    match err {
        Error::Upstream { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("parse"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = OpenSearchClient::new(&IndexSettings { host: url, max_retries: 1, ..IndexSettings::default() }).unwrap();
    let err = client.knn_ids(&KnnQuery { vector: vec![1.0], k: 1 }).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn dropped_connection_is_retried_then_succeeds() {
    let server = serve(vec![
        (DROP, String::new()),
        (200, json!({"hits": {"hits": [{"_id": "a"}]}}).to_string()),
    ])
    .await;
    let ids = client_for(&server.url).knn_ids(&KnnQuery { vector: vec![1.0], k: 1 }).await.unwrap();
    assert_eq!(ids, vec!["a".to_string()]);
    assert_eq!(server.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn transport_retries_stop_after_max_retries() {
    let server = serve(vec![(DROP, String::new()), (DROP, String::new()), (DROP, String::new())]).await;
    let client =
        OpenSearchClient::new(&IndexSettings { host: server.url.clone(), max_retries: 2, ..IndexSettings::default() })
            .unwrap();
    let err = client.search_lexical(&lexical("q")).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert_eq!(server.requests.lock().unwrap().len(), 3, "one attempt plus two retries");
}

#[tokio::test]
async fn http_errors_are_not_transport_retried() {
    let server = serve(vec![(500, "{}".to_string()), (200, json!({"hits": {"hits": []}}).to_string())]).await;
    let err = client_for(&server.url).search_lexical(&lexical("q")).await.unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 500, .. }), "got {err:?}");
    assert_eq!(server.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_mget_skips_network() {
    let client = client_for("http://127.0.0.1:9");
    assert!(client.multi_get(&[]).await.unwrap().is_empty());
}

#[test]
fn host_without_scheme_defaults_to_https() {
    let client = OpenSearchClient::new(&IndexSettings { host: "search.example.org/".into(), ..IndexSettings::default() }).unwrap();
    assert_eq!(client.base_url(), "https://search.example.org");
    assert!(OpenSearchClient::new(&IndexSettings::default()).is_err());
}
