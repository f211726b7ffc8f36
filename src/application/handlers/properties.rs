use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::application::errors::ServiceResult;
use crate::application::services::catalog::PropertyInput;
use crate::application::services::payments::{PaymentInput, PaymentLedger, RecordedPayment};
use crate::application::services::sales::PropertySaleInput;
use crate::application::state::AppState;
use crate::auth::CurrentUser;
use crate::persistence::models::*;

pub async fn list_properties(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ServiceResult<Json<Vec<PropertySummary>>> {
    Ok(Json(state.catalog.list_properties(&user.id).await?))
}

pub async fn create_property(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<PropertyInput>,
) -> ServiceResult<(StatusCode, Json<PropertyRecord>)> {
    let property = state.catalog.create_property(&user.id, input).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn get_property(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<PropertyRecord>> {
    Ok(Json(state.catalog.get_property(&user.id, &id).await?))
}

pub async fn update_property(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<PropertyInput>,
) -> ServiceResult<Json<PropertyRecord>> {
    Ok(Json(state.catalog.update_property(&user.id, &id, input).await?))
}

pub async fn delete_property(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<StatusCode> {
    state.catalog.delete_property(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sell_property(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<PropertySaleInput>,
) -> ServiceResult<Json<PropertyRecord>> {
    Ok(Json(state.sales.sell_property(&user.id, &id, input).await?))
}

pub async fn list_property_payments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<PaymentLedger>> {
    Ok(Json(state.payments.property_ledger(&user.id, &id).await?))
}

pub async fn record_property_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<PaymentInput>,
) -> ServiceResult<(StatusCode, Json<RecordedPayment>)> {
    let recorded = state.payments.record_property_payment(&user.id, &id, input).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn list_subdivisions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ServiceResult<Json<Vec<SubdivisionSummary>>> {
    Ok(Json(state.catalog.list_subdivisions(&user.id, &id).await?))
}

pub async fn create_subdivision(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(details): Json<LotDetails>,
) -> ServiceResult<(StatusCode, Json<SubdivisionRecord>)> {
    let lot = state.catalog.create_subdivision(&user.id, &id, details).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}
