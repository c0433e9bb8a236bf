//! End-to-end protocol tests over real TCP connections.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use memt_server::{lm, BeamDecoder, Server};

/// Start a service over a small n-gram table model on an ephemeral port.
async fn start_service(dir: &Path) -> SocketAddr {
    let model_path = dir.join("model");
    std::fs::write(
        &model_path,
        "-0.1 the\n-0.2 cat\n-0.3 sat\n-0.05 the cat\n-0.05 cat sat\n-8.0 dog\n",
    )
    .unwrap();
    let model = lm::load("sri", &model_path, 2).unwrap();
    let server = Server::bind(0, model, Arc::new(BeamDecoder)).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

/// Send one request configuration and collect the full response.
async fn send_request(addr: SocketAddr, config: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(config.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

struct RequestFiles {
    matched: PathBuf,
    one_best: PathBuf,
    oracle_prefix: String,
}

impl RequestFiles {
    fn new(dir: &Path, matched_contents: &str) -> Self {
        let matched = dir.join("matched");
        std::fs::write(&matched, matched_contents).unwrap();
        Self {
            matched,
            one_best: dir.join("one_best"),
            oracle_prefix: format!("{}/oracle.", dir.display()),
        }
    }

    fn config(&self, extra: &str) -> String {
        format!(
            "score.lm = 1.0\n\
             score.alignment = 1.0\n\
             score.ngram = 0.1\n\
             score.overlap = 0.1\n\
             output.one_best = {}\n\
             input.matched_file = {}\n\
             input.confidence = 0.5 0.5\n\
             {extra}",
            self.one_best.display(),
            self.matched.display(),
        )
    }
}

#[tokio::test]
async fn valid_request_decodes_and_reports_done() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat sat\nthe dog sat\n\nthe cat\nthe cat\n");

    let response = send_request(addr, &files.config("")).await;
    assert_eq!(response, "Done\n");

    let one_best = std::fs::read_to_string(&files.one_best).unwrap();
    let lines: Vec<&str> = one_best.lines().collect();
    assert_eq!(lines.len(), 2, "one write per input sentence");
    assert_eq!(lines[0], "the cat sat");
    assert_eq!(lines[1], "the cat");
}

#[tokio::test]
async fn oracle_files_written_per_sentence_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat\nthe cat\n\nthe\nthe\n\ncat\ncat\n");

    let extra = format!(
        "output.nbest = 3\noutput.oracle_prefix = {}\n",
        files.oracle_prefix
    );
    let response = send_request(addr, &files.config(&extra)).await;
    assert_eq!(response, "Done\n");

    assert_eq!(std::fs::read_to_string(&files.one_best).unwrap().lines().count(), 3);
    for index in 0..3 {
        let path = format!("{}{index}", files.oracle_prefix);
        assert!(Path::new(&path).exists(), "missing oracle file {path}");
    }
    assert!(!Path::new(&format!("{}3", files.oracle_prefix)).exists());
}

#[tokio::test]
async fn missing_mandatory_key_is_reported_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat\nthe cat\n");

    let config: String = files
        .config("")
        .lines()
        .filter(|line| !line.starts_with("score.overlap"))
        .map(|line| format!("{line}\n"))
        .collect();
    let response = send_request(addr, &config).await;
    assert!(response.contains("score.overlap"), "response: {response:?}");
    assert!(response.contains("got it 0"), "response: {response:?}");
    assert!(!files.one_best.exists(), "rejected request wrote output");
}

#[tokio::test]
async fn duplicated_mandatory_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat\nthe cat\n");

    let response = send_request(addr, &files.config("score.lm = 2.0\n")).await;
    assert!(response.contains("score.lm"), "response: {response:?}");
    assert!(response.contains("got it 2"), "response: {response:?}");
}

#[tokio::test]
async fn bad_request_does_not_poison_the_accept_loop() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat\nthe cat\n");

    let rejected = send_request(addr, "complete nonsense\n").await;
    assert!(!rejected.is_empty());
    assert_ne!(rejected, "Done\n");

    let accepted = send_request(addr, &files.config("")).await;
    assert_eq!(accepted, "Done\n", "loop should survive a bad request");
}

#[tokio::test]
async fn runtime_fault_abandons_connection_but_not_service() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat\nthe cat\n");

    // Valid configuration pointing at a matched file that does not exist:
    // passes validation, fails in the pipeline, gets no reply at all.
    let broken = files.config("").replace(
        &format!("input.matched_file = {}", files.matched.display()),
        &format!("input.matched_file = {}/no-such-file", dir.path().display()),
    );

    let response = send_request(addr, &broken).await;
    assert_eq!(response, "", "runtime faults are not relayed to the client");

    let next = send_request(addr, &files.config("")).await;
    assert_eq!(next, "Done\n", "service should continue after a fault");
}

#[tokio::test]
async fn confidence_residue_echoes_offending_string() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_service(dir.path()).await;
    let files = RequestFiles::new(dir.path(), "the cat\nthe cat\n");

    let config = files.config("").replace("0.5 0.5", "0.5 half");
    let response = send_request(addr, &config).await;
    assert!(response.contains("0.5 half"), "response: {response:?}");
    assert!(!files.one_best.exists());
}
