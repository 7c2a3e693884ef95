use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use agrorag_core::config::ProviderConfig;
use agrorag_core::error::Error;
use agrorag_core::traits::{Embedder, Generator};
use agrorag_embed::{HashEmbedder, OpenAiEmbedder, OpenAiGenerator};

/// Reads one HTTP request (headers plus `Content-Length` body).
fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }
}

/// Local endpoint answering a single request with `body` as JSON.
fn serve_once(body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else { return };
        read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
    });
    format!("http://{addr}")
}

fn embeddings_body(dims: &[usize]) -> String {
    let data: Vec<String> = dims
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &d)| format!("{{\"index\":{i},\"embedding\":[{}]}}", vec!["0.5"; d].join(",")))
        .collect();
    format!("{{\"data\":[{}]}}", data.join(","))
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(256);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 256);
    assert_eq!(embedder.dim(), 256);
    assert_eq!(embedder.embedder_id(), "hash:xx64:d256");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hash_embedder_shared_words_are_closer() {
    let embedder = HashEmbedder::new(512);
    let q = embedder.embed_text("aluminio alto");
    let near = embedder.embed_text("El aluminio es alto en la muestra");
    let far = embedder.embed_text("coeficiente de variación");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn hash_embedder_blank_text_is_zero_vector() {
    let v = HashEmbedder::new(8).embed_text("  ¿? ");
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn missing_credential_is_dependency_error() {
    let cfg = ProviderConfig { api_key_env: "AGRORAG_TEST_KEY_THAT_IS_NEVER_SET".to_string(), ..ProviderConfig::default() };
    assert!(matches!(OpenAiEmbedder::from_config(&cfg), Err(Error::Dependency { .. })));
    assert!(matches!(OpenAiGenerator::from_config(&cfg), Err(Error::Dependency { .. })));
}

#[test]
fn unreachable_endpoint_is_dependency_error_with_cause() {
    let embedder = OpenAiEmbedder::new("http://127.0.0.1:9", "sk-test".to_string(), "text-embedding-3-small", Duration::from_secs(2))
        .expect("client");
    let err = embedder.embed_batch(&["suelo".to_string()]).unwrap_err();
    assert!(matches!(err, Error::Dependency { .. }));
    assert!(std::error::Error::source(&err).is_some(), "cause is preserved");

    let generator = OpenAiGenerator::new("http://127.0.0.1:9", "sk-test".to_string(), "gpt-4o-mini", 0.1, Duration::from_secs(2))
        .expect("client");
    assert!(matches!(generator.generate("hola"), Err(Error::Dependency { .. })));
}

#[test]
fn empty_batch_needs_no_request() {
    let embedder = OpenAiEmbedder::new("http://127.0.0.1:9", "sk-test".to_string(), "text-embedding-3-large", Duration::from_secs(1))
        .expect("client");
    assert_eq!(embedder.dim(), 3072);
    assert!(embedder.embed_batch(&[]).expect("empty").is_empty());
}

#[test]
fn unknown_model_takes_its_size_from_the_response() {
    let base = serve_once(embeddings_body(&[768, 768]));
    let embedder = OpenAiEmbedder::new(&base, "sk-test".to_string(), "nomic-embed-text", Duration::from_secs(5))
        .expect("client");
    assert_eq!(embedder.dim(), 0);

    let embs = embedder.embed_batch(&["suelo".to_string(), "agua".to_string()]).expect("embed");
    assert_eq!(embs.len(), 2);
    assert!(embs.iter().all(|v| v.len() == 768));
    assert_eq!(embedder.dim(), 768);
}

#[test]
fn configured_size_must_match_the_response() {
    let base = serve_once(embeddings_body(&[768]));
    let cfg = ProviderConfig {
        base_url: base,
        embedding_model: "nomic-embed-text".to_string(),
        embedding_dim: Some(1024),
        api_key_env: "AGRORAG_TEST_CONFIGURED_DIM_KEY".to_string(),
        ..ProviderConfig::default()
    };
    std::env::set_var("AGRORAG_TEST_CONFIGURED_DIM_KEY", "sk-test");
    let embedder = OpenAiEmbedder::from_config(&cfg).expect("client");
    assert_eq!(embedder.dim(), 1024);
    let err = embedder.embed_batch(&["suelo".to_string()]).unwrap_err();
    assert!(matches!(err, Error::Dependency { .. }));
    assert!(err.to_string().contains("got 768 expected 1024"));
}

#[test]
fn silent_endpoint_times_out_with_dependency_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(Duration::from_secs(10));
            drop(stream);
        }
    });

    let embedder = OpenAiEmbedder::new(&format!("http://{addr}"), "sk-test".to_string(), "text-embedding-3-small", Duration::from_secs(1))
        .expect("client");
    let start = Instant::now();
    let err = embedder.embed_batch(&["suelo".to_string()]).unwrap_err();
    let elapsed = start.elapsed();
    assert!(matches!(err, Error::Dependency { .. }));
    assert!(elapsed < Duration::from_secs(5), "request gave up after {elapsed:?}");
}
