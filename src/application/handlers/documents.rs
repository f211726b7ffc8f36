use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::application::errors::ServiceResult;
use crate::application::services::documents::{content_type_for, SignedLink, Upload};
use crate::application::state::AppState;
use crate::auth::CurrentUser;
use crate::domain::entities::document_owner::DocumentOwner;
use crate::domain::errors::ValidationError;
use crate::persistence::models::DocumentRecord;

/// Owner of a document, as query parameters
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    pub property_id: Option<String>,
    pub subdivision_id: Option<String>,
    pub payment_id: Option<String>,
}

impl OwnerQuery {
    fn owner(self) -> Result<DocumentOwner, ValidationError> {
        DocumentOwner::from_ids(self.property_id, self.subdivision_id, self.payment_id)
    }

    fn is_empty(&self) -> bool {
        self.property_id.is_none() && self.subdivision_id.is_none() && self.payment_id.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
    #[serde(flatten)]
    pub owner: OwnerQuery,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentCount {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

fn upload_from(name: String, headers: &HeaderMap, body: Bytes) -> Upload {
    Upload {
        name,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        bytes: body.to_vec(),
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<OwnerQuery>,
) -> ServiceResult<Json<Vec<DocumentRecord>>> {
    let owner = if query.is_empty() { None } else { Some(query.owner()?) };
    Ok(Json(state.documents.list(&user.id, owner.as_ref()).await?))
}

pub async fn count_documents(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<OwnerQuery>,
) -> ServiceResult<Json<DocumentCount>> {
    let owner = query.owner()?;
    let count = state.documents.count(&user.id, &owner).await?;
    Ok(Json(DocumentCount { count }))
}

/// Store the raw request body as a document
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ServiceResult<(StatusCode, Json<DocumentRecord>)> {
    let owner = query.owner.owner()?;
    let upload = upload_from(query.name, &headers, body);
    let document = state.documents.upload(&user.id, owner, upload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn replace_document(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<ReplaceQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ServiceResult<Json<DocumentRecord>> {
    let upload = upload_from(query.name, &headers, body);
    Ok(Json(state.documents.replace(&user.id, &id, upload).await?))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    state.documents.delete(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn document_url(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<SignedLink>> {
    Ok(Json(state.documents.signed_link(&user.id, &id).await?))
}

/// Serve a stored file behind a signed link. No API key is needed.
pub async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignedQuery>,
) -> ServiceResult<impl IntoResponse> {
    let bytes = state
        .documents
        .download(&path, query.expires, &query.signature)
        .await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}
