//! Filesystem-backed blob store with HMAC-signed download links.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use crate::domain::repositories::blob_store::{BlobStore, StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    signing_key: Zeroizing<String>,
}

impl LocalBlobStore {
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        signing_key: Zeroizing<String>,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
            signing_key,
        }
    }

    /// Resolve an object key under the root, refusing anything that could escape it.
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        if path.is_empty() || path.len() > 512 {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        let allowed = path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '~'));
        if !safe || !allowed {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn signature(&self, path: &str, expires: i64) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.signing_key.as_bytes())
            .map_err(|e| StorageError::Url(format!("HMAC error: {}", e)))?;
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    /// Link for `path` that stops working at `expires` (unix seconds).
    pub fn signed_url_until(&self, path: &str, expires: i64) -> StorageResult<String> {
        self.resolve(path)?;
        let signature = hex::encode(self.signature(path, expires)?.finalize().into_bytes());

        let raw = format!(
            "{}/files/{}",
            self.public_base_url.trim_end_matches('/'),
            path
        );
        let mut url = Url::parse(&raw).map_err(|e| StorageError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);
        Ok(url.to_string())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        debug!("Stored object {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn remove(&self, paths: &[String]) -> StorageResult<()> {
        for path in paths {
            let target = self.resolve(path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => debug!("Removed object {}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Object {} already gone", path);
                }
                Err(e) => return Err(StorageError::Io(e.to_string())),
            }
        }
        Ok(())
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> StorageResult<String> {
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        self.signed_url_until(path, expires)
    }

    fn verify(&self, path: &str, expires: i64, signature: &str) -> StorageResult<()> {
        self.resolve(path)?;
        let provided = hex::decode(signature).map_err(|_| StorageError::SignatureInvalid)?;
        self.signature(path, expires)?
            .verify_slice(&provided)
            .map_err(|_| StorageError::SignatureInvalid)?;
        if expires < Utc::now().timestamp() {
            return Err(StorageError::SignatureExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::blob_store::object_path;

    fn store(tag: &str) -> LocalBlobStore {
        let root = std::env::temp_dir().join(format!(
            "landbook-blob-{}-{}",
            tag,
            uuid::Uuid::new_v4()
        ));
        LocalBlobStore::new(
            root,
            "http://localhost:3000/",
            Zeroizing::new("test-signing-key".to_string()),
        )
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = store("crud");
        store.put("user-1/1-abc.pdf", b"deed").await.unwrap();
        assert_eq!(store.get("user-1/1-abc.pdf").await.unwrap(), b"deed");

        store.remove(&["user-1/1-abc.pdf".to_string()]).await.unwrap();
        assert_eq!(
            store.get("user-1/1-abc.pdf").await,
            Err(StorageError::NotFound("user-1/1-abc.pdf".to_string()))
        );
        // Removing twice is fine.
        store.remove(&["user-1/1-abc.pdf".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_object_path_for_email_user_id() {
        let store = store("email");
        let path = object_path("ama@example.com", "deed.pdf", 7, &mut rand::thread_rng());
        store.put(&path, b"deed").await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), b"deed");

        let url = store.signed_url(&path, Duration::from_secs(60)).unwrap();
        assert!(url.contains(&format!("/files/{}?", path)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let store = store("escape");
        assert!(matches!(
            store.put("../outside.txt", b"x").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.put("/etc/passwd", b"x").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.get("user-1/a b.pdf").await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_signed_url_round_trip() {
        let store = store("sign");
        let url = store.signed_url("user-1/1-abc.pdf", Duration::from_secs(3600)).unwrap();
        assert!(url.starts_with("http://localhost:3000/files/user-1/1-abc.pdf?expires="));

        let parsed = Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        let expires: i64 = pairs["expires"].parse().unwrap();
        let signature = &pairs["signature"];

        assert!(store.verify("user-1/1-abc.pdf", expires, signature).is_ok());
        assert_eq!(
            store.verify("user-1/other.pdf", expires, signature),
            Err(StorageError::SignatureInvalid)
        );
        assert_eq!(
            store.verify("user-1/1-abc.pdf", expires + 1, signature),
            Err(StorageError::SignatureInvalid)
        );
        assert_eq!(
            store.verify("user-1/1-abc.pdf", expires, "zz"),
            Err(StorageError::SignatureInvalid)
        );
    }

    #[test]
    fn test_expired_link_rejected() {
        let store = store("expired");
        let past = Utc::now().timestamp() - 10;
        let url = store.signed_url_until("user-1/1-abc.pdf", past).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let signature = parsed
            .query_pairs()
            .find(|(k, _)| k == "signature")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(
            store.verify("user-1/1-abc.pdf", past, &signature),
            Err(StorageError::SignatureExpired)
        );
    }
}
