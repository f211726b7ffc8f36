use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use crate::application::errors::ServiceResult;
use crate::application::services::receipts::ReceiptView;
use crate::application::state::AppState;
use crate::auth::CurrentUser;
use crate::persistence::models::ReceiptEmailRecord;

#[derive(Debug, Deserialize)]
pub struct SendReceiptRequest {
    pub email: String,
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    state.payments.delete_payment(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch the payment's receipt, creating it on first request
pub async fn payment_receipt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(payment_id): Path<String>,
) -> ServiceResult<Json<ReceiptView>> {
    Ok(Json(state.receipts.receipt_for_payment(&user.id, &payment_id).await?))
}

pub async fn print_receipt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<impl IntoResponse> {
    let text = state.receipts.print(&user.id, &id).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

pub async fn receipt_emails(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<Vec<ReceiptEmailRecord>>> {
    Ok(Json(state.receipts.email_history(&user.id, &id).await?))
}

pub async fn send_receipt(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<SendReceiptRequest>,
) -> ServiceResult<(StatusCode, Json<ReceiptEmailRecord>)> {
    let record = state.receipts.send(&user.id, &id, &request.email).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}
