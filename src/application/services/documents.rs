//! Document uploads kept in the blob store, with rows pointing at them.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::required_text;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::entities::document_owner::DocumentOwner;
use crate::domain::repositories::blob_store::{object_path, BlobStore};
use crate::domain::services::calendar::Calendar;
use crate::persistence::document_repository::DocumentRepository;
use crate::persistence::ledger_repository::PaymentRepository;
use crate::persistence::models::{DocumentRecord, StoredFile};
use crate::persistence::repository::{PropertyRepository, SubdivisionRepository};

/// An uploaded file as received
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedLink {
    pub url: String,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct DocumentService {
    documents: DocumentRepository,
    properties: PropertyRepository,
    subdivisions: SubdivisionRepository,
    payments: PaymentRepository,
    blobs: Arc<dyn BlobStore>,
    calendar: Arc<dyn Calendar>,
    link_ttl: Duration,
}

impl DocumentService {
    pub fn new(
        documents: DocumentRepository,
        properties: PropertyRepository,
        subdivisions: SubdivisionRepository,
        payments: PaymentRepository,
        blobs: Arc<dyn BlobStore>,
        calendar: Arc<dyn Calendar>,
        link_ttl: Duration,
    ) -> Self {
        Self {
            documents,
            properties,
            subdivisions,
            payments,
            blobs,
            calendar,
            link_ttl,
        }
    }

    /// The owner row must belong to the caller
    async fn check_owner(&self, user_id: &str, owner: &DocumentOwner) -> ServiceResult<()> {
        let found = match owner {
            DocumentOwner::Property(id) => self.properties.get(user_id, id).await?.is_some(),
            DocumentOwner::Subdivision(id) => self.subdivisions.get(user_id, id).await?.is_some(),
            DocumentOwner::Payment(id) => self.payments.get(user_id, id).await?.is_some(),
        };
        if !found {
            return Err(ServiceError::not_found(owner.column().trim_end_matches("_id"), owner.id()));
        }
        Ok(())
    }

    /// Write the bytes under a fresh object path
    async fn store(&self, user_id: &str, upload: &Upload) -> ServiceResult<StoredFile> {
        let name = required_text(Some(upload.name.as_str()), "name")?;
        if upload.bytes.is_empty() {
            return Err(ServiceError::InvalidInput("file is empty".to_string()));
        }

        let path = {
            let millis = self.calendar.now().timestamp_millis();
            object_path(user_id, &name, millis, &mut rand::thread_rng())
        };
        self.blobs.put(&path, &upload.bytes).await?;

        Ok(StoredFile {
            name,
            file_path: path,
            file_size: upload.bytes.len() as i64,
            file_type: upload.content_type.clone(),
        })
    }

    pub async fn upload(&self, user_id: &str, owner: DocumentOwner, upload: Upload) -> ServiceResult<DocumentRecord> {
        self.check_owner(user_id, &owner).await?;
        let file = self.store(user_id, &upload).await?;

        match self.documents.create(user_id, &owner, &file).await {
            Ok(document) => {
                info!("Document {} uploaded for {} {}", document.id, owner.column(), owner.id());
                Ok(document)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.remove(&[file.file_path.clone()]).await {
                    warn!("Could not remove orphaned upload {}: {}", file.file_path, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// Swap the stored file of a document for a new upload
    pub async fn replace(&self, user_id: &str, id: &str, upload: Upload) -> ServiceResult<DocumentRecord> {
        let existing = self.get(user_id, id).await?;
        let file = self.store(user_id, &upload).await?;

        if let Err(e) = self.blobs.remove(&[existing.file_path.clone()]).await {
            warn!("Could not remove replaced file {}: {}", existing.file_path, e);
        }

        let document = self
            .documents
            .replace_file(user_id, id, &file)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", id))?;
        info!("Document {} replaced", id);
        Ok(document)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> ServiceResult<DocumentRecord> {
        self.documents
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("document", id))
    }

    /// Remove the stored file, then the row
    pub async fn delete(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        let document = self.get(user_id, id).await?;
        self.blobs.remove(&[document.file_path.clone()]).await?;
        self.documents.delete(user_id, id).await?;
        info!("Document {} deleted", id);
        Ok(())
    }

    pub async fn signed_link(&self, user_id: &str, id: &str) -> ServiceResult<SignedLink> {
        let document = self.get(user_id, id).await?;
        let url = self.blobs.signed_url(&document.file_path, self.link_ttl)?;
        Ok(SignedLink {
            url,
            expires_in: self.link_ttl.as_secs(),
        })
    }

    pub async fn list(&self, user_id: &str, owner: Option<&DocumentOwner>) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(match owner {
            Some(owner) => self.documents.list_by_owner(user_id, owner).await?,
            None => self.documents.list_all(user_id).await?,
        })
    }

    pub async fn count(&self, user_id: &str, owner: &DocumentOwner) -> ServiceResult<i64> {
        Ok(self.documents.count_by_owner(user_id, owner).await?)
    }

    /// Bytes behind a signed link
    pub async fn download(&self, path: &str, expires: i64, signature: &str) -> ServiceResult<Vec<u8>> {
        self.blobs.verify(path, expires, signature)?;
        Ok(self.blobs.get(path).await?)
    }
}

/// Content type for a stored object, from its extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("user-1/1-abc.pdf"), "application/pdf");
        assert_eq!(content_type_for("user-1/1-abc.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("user-1/1-abc"), "application/octet-stream");
    }
}
