//! Built-in executor behavior, exercised directly through the executor
//! calling convention with a detached handle.

use serde_json::json;

use jobq_lite::jobs::{JobHandle, TaskParams};
use jobq_lite::tasks::{cpu, io, util};

fn params(pairs: &[(&str, &str)]) -> TaskParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn handle() -> JobHandle {
    JobHandle::detached("test-job")
}

// ---------------------------------------------------------------------------
// CPU-bound
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_isprime() {
    let result = cpu::isprime(params(&[("n", "97")]), handle()).await.unwrap();
    assert_eq!(result, json!({ "n": 97, "is_prime": true }));

    let result = cpu::isprime(params(&[("n", "100")]), handle()).await.unwrap();
    assert_eq!(result["is_prime"], false);

    let result = cpu::isprime(params(&[("n", "1")]), handle()).await.unwrap();
    assert_eq!(result["is_prime"], false);

    let result = cpu::isprime(params(&[("n", "2")]), handle()).await.unwrap();
    assert_eq!(result["is_prime"], true);
}

#[tokio::test]
async fn test_isprime_requires_n() {
    let err = cpu::isprime(params(&[]), handle()).await.unwrap_err();
    assert!(err.to_string().contains("missing parameter 'n'"), "got: {err}");

    let err = cpu::isprime(params(&[("n", "abc")]), handle()).await.unwrap_err();
    assert!(err.to_string().contains("'n'"), "got: {err}");
}

#[tokio::test]
async fn test_factor() {
    let result = cpu::factor(params(&[("n", "360")]), handle()).await.unwrap();
    assert_eq!(result["factors"], json!([[2, 3], [3, 2], [5, 1]]));

    let result = cpu::factor(params(&[("n", "13")]), handle()).await.unwrap();
    assert_eq!(result["factors"], json!([[13, 1]]));

    let err = cpu::factor(params(&[("n", "1")]), handle()).await.unwrap_err();
    assert!(err.to_string().contains(">= 2"));
}

#[tokio::test]
async fn test_fibonacci() {
    let result = cpu::fibonacci(params(&[("n", "10")]), handle()).await.unwrap();
    assert_eq!(result["result"], "55");

    let result = cpu::fibonacci(params(&[("n", "0")]), handle()).await.unwrap();
    assert_eq!(result["result"], "0");

    let err = cpu::fibonacci(params(&[("n", "187")]), handle()).await.unwrap_err();
    assert!(err.to_string().contains("186"));
}

#[tokio::test]
async fn test_random_within_bounds() {
    let result = cpu::random(params(&[("count", "5"), ("min", "1"), ("max", "3")]), handle())
        .await
        .unwrap();
    let numbers = result["numbers"].as_array().unwrap();
    assert_eq!(numbers.len(), 5);
    for n in numbers {
        let n = n.as_i64().unwrap();
        assert!((1..=3).contains(&n), "out of range: {n}");
    }

    let err = cpu::random(params(&[("min", "5"), ("max", "1")]), handle())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("min"));
}

// ---------------------------------------------------------------------------
// I/O-bound
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_data_path_validation() {
    assert!(io::data_path("ok.txt").is_ok());
    assert!(io::data_path("").is_err());
    assert!(io::data_path("../etc/passwd").is_err());
    assert!(io::data_path("a/b.txt").is_err());
    assert!(io::data_path("a\\b.txt").is_err());
}

#[tokio::test]
async fn test_word_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.txt");
    std::fs::write(&path, "hello world\nsecond line here\n").unwrap();

    let (lines, words, bytes) = io::word_count_at(&path).await.unwrap();
    assert_eq!(lines, 2);
    assert_eq!(words, 5);
    assert_eq!(bytes, 29);
}

#[tokio::test]
async fn test_word_count_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = io::word_count_at(&dir.path().join("absent.txt")).await.unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}

#[tokio::test]
async fn test_grep() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    std::fs::write(&path, "error: one\nok\nerror: two\n").unwrap();

    let (matches, lines) = io::grep_at(&path, "error").await.unwrap();
    assert_eq!(matches, 2);
    assert_eq!(lines, vec!["error: one", "error: two"]);

    let (matches, lines) = io::grep_at(&path, "absent").await.unwrap();
    assert_eq!(matches, 0);
    assert!(lines.is_empty());
}

#[tokio::test]
async fn test_hash_file_known_vector() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abc.txt");
    std::fs::write(&path, "abc").unwrap();

    let hash = io::hash_file_at(&path).await.unwrap();
    assert_eq!(
        hash,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[tokio::test]
async fn test_compress_writes_gz() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::write(&path, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".repeat(64)).unwrap();

    let (output, size) = io::compress_at(&path).await.unwrap();
    assert!(output.ends_with("data.txt.gz"));
    assert!(output.exists());
    assert!(size > 0);
    assert!(
        size < 2048,
        "repetitive input should compress well, got {size} bytes"
    );
}

#[tokio::test]
async fn test_sort_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nums.txt");
    std::fs::write(&path, "3\n1\nnot-a-number\n2\n").unwrap();

    let (output, count) = io::sort_file_at(&path, &handle()).await.unwrap();
    assert_eq!(count, 3, "non-numeric lines are dropped");
    let sorted = std::fs::read_to_string(&output).unwrap();
    assert_eq!(sorted, "1\n2\n3\n");
}

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_simulate_reports_shape() {
    let result = util::simulate(
        params(&[("seconds", "0"), ("label", "load-test")]),
        handle(),
    )
    .await
    .unwrap();
    assert_eq!(result["task"], "load-test");
    assert_eq!(result["duration"], 0);
    assert_eq!(result["status"], "completed");
}

#[tokio::test]
async fn test_sleep_zero_seconds() {
    let result = util::sleep(params(&[("seconds", "0")]), handle()).await.unwrap();
    assert_eq!(result["seconds"], 0);
}
