//! Blob Store Trait
//!
//! Document bytes live outside the database, keyed by opaque path strings.
//! The service only needs to put, fetch and remove objects and to hand out
//! time-limited links to them.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Signed URL error: {0}")]
    Url(String),

    #[error("Signature does not match")]
    SignatureInvalid,

    #[error("Signed URL expired")]
    SignatureExpired,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()>;

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Remove every listed object. Missing objects are not an error.
    async fn remove(&self, paths: &[String]) -> StorageResult<()>;

    /// Link that grants read access to `path` for `ttl`.
    fn signed_url(&self, path: &str, ttl: Duration) -> StorageResult<String>;

    /// Check a link produced by [`BlobStore::signed_url`].
    fn verify(&self, path: &str, expires: i64, signature: &str) -> StorageResult<()>;
}

/// Path segment for a user id. Ids outside `[A-Za-z0-9_-]` are hex encoded
/// behind a `~` marker so no plain id can produce the same segment.
pub fn user_segment(user_id: &str) -> String {
    let plain = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if plain {
        user_id.to_string()
    } else {
        format!("~{}", hex::encode(user_id.as_bytes()))
    }
}

/// `<user>/<millis>-<random>.<ext>`; the extension is taken from the original file name.
pub fn object_path<R: Rng + ?Sized>(
    user_id: &str,
    file_name: &str,
    timestamp_millis: i64,
    rng: &mut R,
) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let random: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    let user = user_segment(user_id);
    match extension {
        Some(ext) => format!("{}/{}-{}.{}", user, timestamp_millis, random, ext),
        None => format!("{}/{}-{}", user, timestamp_millis, random),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_object_path_keeps_extension() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = object_path("user-1", "Deed Scan.PDF", 1_700_000_000_000, &mut rng);
        assert!(path.starts_with("user-1/1700000000000-"));
        assert!(path.ends_with(".pdf"));
    }

    #[test]
    fn test_object_path_without_extension() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = object_path("user-1", "survey", 5, &mut rng);
        assert!(path.starts_with("user-1/5-"));
        assert!(!path.contains('.'));

        let odd = object_path("user-1", "plan.tar/../x", 5, &mut rng);
        assert!(!odd.contains(".."));
    }

    #[test]
    fn test_user_segment_encodes_unsafe_ids() {
        assert_eq!(user_segment("user-1"), "user-1");
        assert_eq!(user_segment("a@b.c"), "~6140622e63");
        assert_eq!(user_segment(".."), "~2e2e");
        assert_ne!(user_segment("ama@example.com"), user_segment("ama_example.com"));
    }
}
