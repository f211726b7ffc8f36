use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::application::errors::ServiceResult;
use crate::application::services::catalog::SubdivisionView;
use crate::application::services::payments::{PaymentInput, PaymentLedger, RecordedPayment};
use crate::application::services::recall::RecallReport;
use crate::application::services::sales::{HoldInput, LotSaleInput, SaleOutcome};
use crate::application::state::AppState;
use crate::auth::CurrentUser;
use crate::domain::services::interest::InterestQuote;
use crate::persistence::models::*;

#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    /// Day the quote is made for, today when absent
    pub as_of: Option<NaiveDate>,
}

pub async fn get_subdivision(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<SubdivisionView>> {
    Ok(Json(state.catalog.get_subdivision(&user.id, &id).await?))
}

pub async fn update_subdivision(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(details): Json<LotDetails>,
) -> ServiceResult<Json<SubdivisionRecord>> {
    Ok(Json(state.catalog.update_subdivision(&user.id, &id, details).await?))
}

pub async fn delete_subdivision(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    state.catalog.delete_subdivision(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sell_subdivision(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<LotSaleInput>,
) -> ServiceResult<Json<SaleOutcome>> {
    Ok(Json(state.sales.sell_lot(&user.id, &id, input).await?))
}

pub async fn place_hold(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<HoldInput>,
) -> ServiceResult<Json<SaleOutcome>> {
    Ok(Json(state.sales.place_hold(&user.id, &id, input).await?))
}

pub async fn recall_subdivision(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<RecallRequest>,
) -> ServiceResult<Json<RecallReport>> {
    let report = state
        .recall
        .recall(&user.id, &id, request.reason.as_deref())
        .await?;
    Ok(Json(report))
}

pub async fn recall_history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<Vec<RecallHistoryRecord>>> {
    Ok(Json(state.recall.history(&user.id, &id).await?))
}

pub async fn list_lot_payments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<PaymentLedger>> {
    Ok(Json(state.payments.lot_ledger(&user.id, &id).await?))
}

pub async fn record_lot_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<PaymentInput>,
) -> ServiceResult<(StatusCode, Json<RecordedPayment>)> {
    let recorded = state.payments.record_lot_payment(&user.id, &id, input).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn interest_quote(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<QuoteQuery>,
) -> ServiceResult<Json<InterestQuote>> {
    Ok(Json(state.payments.interest_quote(&user.id, &id, query.as_of).await?))
}

pub async fn search_subdivisions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(filters): Query<SubdivisionSearch>,
) -> ServiceResult<Json<Vec<SearchResultRecord>>> {
    Ok(Json(state.catalog.search_subdivisions(&user.id, &filters).await?))
}
