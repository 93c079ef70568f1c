//! Off-thread file fingerprinting (spec §4.9 step 1, §5 "Hashing off-thread").
//!
//! Streams the file through a running SHA-256 hash on a blocking worker
//! thread rather than the caller's cooperative-scheduling thread, per the
//! message-protocol description in spec §5: "main posts `{file, chunk
//! size}`; worker streams, updates a running hash per chunk, and posts
//! either `{result}` or `{error}`." `tokio::task::spawn_blocking` is the
//! idiomatic stand-in for that worker thread; the task is simply dropped
//! (and its `JoinHandle` awaited) on settle, which is the runtime's
//! equivalent of "the worker is terminated on settle."

use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::path::PathBuf;

/// Computes the SHA-256 fingerprint of `path`, streaming it in
/// `chunk_size`-sized reads on a blocking worker thread.
pub async fn fingerprint_file(path: PathBuf, chunk_size: usize) -> io::Result<String> {
    tokio::task::spawn_blocking(move || fingerprint_file_blocking(&path, chunk_size))
        .await
        .unwrap_or_else(|join_error| {
            Err(io::Error::other(format!(
                "fingerprint worker panicked: {join_error}"
            )))
        })
}

fn fingerprint_file_blocking(path: &std::path::Path, chunk_size: usize) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn identical_files_fingerprint_identically() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"the quick brown fox").unwrap();
        b.write_all(b"the quick brown fox").unwrap();

        let fa = fingerprint_file(a.path().to_path_buf(), 8).await.unwrap();
        let fb = fingerprint_file(b.path().to_path_buf(), 8).await.unwrap();
        assert_eq!(fa, fb);
    }

    #[tokio::test]
    async fn differing_files_fingerprint_differently() {
        let mut a = tempfile::NamedTempFile::new().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        a.write_all(b"the quick brown fox").unwrap();
        b.write_all(b"the lazy brown fox").unwrap();

        let fa = fingerprint_file(a.path().to_path_buf(), 8).await.unwrap();
        let fb = fingerprint_file(b.path().to_path_buf(), 8).await.unwrap();
        assert_ne!(fa, fb);
    }

    #[tokio::test]
    async fn fingerprinting_a_missing_file_is_an_error() {
        let result = fingerprint_file(PathBuf::from("/nonexistent/path/xyz"), 8).await;
        assert!(result.is_err());
    }
}
