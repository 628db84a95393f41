//! # The Forge: Content Identity Engine
//!
//! Computes the stable fingerprint of a byte stream: the SHA-256 digest,
//! hex-encoded. SHA-256 is the key the reputation oracle indexes files by, so
//! the same value serves as both the lookup key and the dedup key.
//!
//! ## Streaming
//! Input is consumed in fixed-size chunks through a `BufReader`; the whole
//! file is never held in memory. The only failure mode is an I/O error from
//! the underlying reader, which is returned unchanged.
//!
//! ## Example
//! ```
//! let a = forge::digest_bytes(b"hello");
//! let b = forge::digest(&mut &b"hello"[..]).unwrap();
//! assert_eq!(a, b);
//! ```

use common::Fingerprint;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Read chunk size for streaming digests.
const CHUNK: usize = 64 * 1024;

/// Digests everything `reader` yields until EOF.
///
/// Interrupted reads are retried; any other I/O error aborts the digest.
pub fn digest<R: Read>(reader: &mut R) -> io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Fingerprint::from_digest(&hasher.finalize()))
}

/// Digests an in-memory buffer.
pub fn digest_bytes(bytes: &[u8]) -> Fingerprint {
    Fingerprint::from_digest(&Sha256::digest(bytes))
}

/// Streams the file at `path` through the digest.
pub fn digest_file(path: &Path) -> io::Result<Fingerprint> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK, file);
    digest(&mut reader)
}

/// [`digest_file`] on the blocking pool, so large uploads never stall the runtime.
pub async fn digest_file_async(path: PathBuf) -> io::Result<Fingerprint> {
    tokio::task::spawn_blocking(move || digest_file(&path))
        .await
        .map_err(io::Error::other)?
}
