//! I/O-bound tasks over the server's data directory: word counting, grep,
//! hashing, compression, numeric file sorting.
//!
//! File-name parameters resolve strictly under [`DATA_DIR`]; the `*_at`
//! functions carry the actual file logic and take explicit paths.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::jobs::{JobHandle, TaskParams};

use super::require;

pub const DATA_DIR: &str = "data";

/// Resolve a user-supplied file name under the data directory. Path
/// separators and parent references are rejected.
pub fn data_path(name: &str) -> anyhow::Result<PathBuf> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        bail!("invalid filename '{name}'");
    }
    Ok(Path::new(DATA_DIR).join(name))
}

/// `wordcount`: lines, whitespace-separated words, and bytes of a file.
pub async fn wordcount(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let name = require(&params, "name")?;
    let path = data_path(name)?;
    let (lines, words, bytes) = word_count_at(&path).await?;
    handle.set_progress(100).await;
    Ok(json!({ "file": name, "lines": lines, "words": words, "bytes": bytes }))
}

pub async fn word_count_at(path: &Path) -> anyhow::Result<(u64, u64, u64)> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let lines = contents.lines().count() as u64;
    let words = contents.split_whitespace().count() as u64;
    let bytes = contents.len() as u64;
    Ok((lines, words, bytes))
}

/// `grep`: substring search, returns the match count and matching lines.
pub async fn grep(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let name = require(&params, "name")?;
    let pattern = require(&params, "pattern")?;
    let path = data_path(name)?;
    let (matches, lines) = grep_at(&path, pattern).await?;
    handle.set_progress(100).await;
    Ok(json!({ "file": name, "pattern": pattern, "matches": matches, "lines": lines }))
}

pub async fn grep_at(path: &Path, pattern: &str) -> anyhow::Result<(u64, Vec<String>)> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let matched: Vec<String> = contents
        .lines()
        .filter(|line| line.contains(pattern))
        .map(str::to_string)
        .collect();
    Ok((matched.len() as u64, matched))
}

/// `hashfile`: SHA-256 of the file contents, lowercase hex.
pub async fn hashfile(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let name = require(&params, "name")?;
    let path = data_path(name)?;
    let hash = hash_file_at(&path).await?;
    handle.set_progress(100).await;
    Ok(json!({ "file": name, "algo": "sha256", "hash": hash }))
}

pub async fn hash_file_at(path: &Path) -> anyhow::Result<String> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let digest = Sha256::digest(&contents);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// `compress`: gzip the file next to itself as `<name>.gz`.
pub async fn compress(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let name = require(&params, "name")?;
    let path = data_path(name)?;
    let (output, size) = compress_at(&path).await?;
    handle.set_progress(100).await;
    Ok(json!({ "input": name, "output": format!("{name}.gz"), "size_bytes": size, "path": output.display().to_string() }))
}

pub async fn compress_at(path: &Path) -> anyhow::Result<(PathBuf, u64)> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&contents)?;
    let compressed = encoder.finish()?;

    let mut output = path.as_os_str().to_owned();
    output.push(".gz");
    let output = PathBuf::from(output);
    let size = compressed.len() as u64;
    tokio::fs::write(&output, compressed)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok((output, size))
}

/// `sortfile`: numerically sort a file of one integer per line into
/// `<name>.sorted`. Lines that do not parse are dropped.
pub async fn sortfile(params: TaskParams, handle: JobHandle) -> anyhow::Result<Value> {
    let name = require(&params, "name")?;
    let path = data_path(name)?;
    let started = Instant::now();
    let (output, count) = sort_file_at(&path, &handle).await?;
    handle.set_progress(100).await;
    Ok(json!({
        "file": name,
        "output": format!("{name}.sorted"),
        "lines": count,
        "elapsed_ms": started.elapsed().as_millis() as u64,
        "path": output.display().to_string(),
    }))
}

pub async fn sort_file_at(path: &Path, handle: &JobHandle) -> anyhow::Result<(PathBuf, usize)> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    handle.set_progress(25).await;

    let mut numbers: Vec<i64> = contents
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    numbers.sort_unstable();
    handle.set_progress(75).await;

    let mut output = path.as_os_str().to_owned();
    output.push(".sorted");
    let output = PathBuf::from(output);
    let mut body = String::with_capacity(contents.len());
    for n in &numbers {
        body.push_str(&n.to_string());
        body.push('\n');
    }
    tokio::fs::write(&output, body)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok((output, numbers.len()))
}
