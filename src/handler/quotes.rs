use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{jobdtos::{ApiResponse, PageQueryDto, PaginatedResponse}, quotedtos::*},
    error::HttpError,
    middleware::{role_check, AuthUser, UserRole},
    AppState,
};

pub fn quotes_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_quote).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Tradie])
            })),
        )
        .route(
            "/tradie",
            get(get_tradie_quotes).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Tradie])
            })),
        )
        .route(
            "/expire-due",
            post(expire_due_quotes).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Admin])
            })),
        )
        .route("/:quote_id", get(get_quote))
        .route(
            "/:quote_id/status",
            patch(update_quote_status).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer])
            })),
        )
        .route(
            "/:quote_id/withdraw",
            post(withdraw_quote).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Tradie])
            })),
        )
        .route(
            "/job/:job_id",
            get(get_quotes_by_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer])
            })),
        )
}

pub async fn create_quote(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateQuoteDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let quote = app_state
        .quote_service
        .create_quote(auth.id, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Quote submitted successfully",
        quote,
    )))
}

pub async fn get_quote(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(quote_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let quote = app_state
        .quote_service
        .get_quote(quote_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Quote retrieved successfully",
        quote,
    )))
}

pub async fn get_quotes_by_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let quotes = app_state
        .quote_service
        .get_quotes_by_job(job_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Quotes retrieved successfully",
        quotes,
    )))
}

pub async fn get_tradie_quotes(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (quotes, total) = app_state
        .quote_service
        .get_quotes_by_tradie(auth.id, page, limit)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(PaginatedResponse::new(quotes, total, page, limit)))
}

pub async fn update_quote_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(quote_id): Path<Uuid>,
    Json(body): Json<UpdateQuoteStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let quote = app_state
        .quote_service
        .update_quote_status(quote_id, body.status, body.notes)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Quote status updated successfully",
        quote,
    )))
}

pub async fn withdraw_quote(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(quote_id): Path<Uuid>,
    Json(body): Json<WithdrawQuoteDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let quote = app_state
        .quote_service
        .withdraw_quote(quote_id, auth.id, &body.reason)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Quote withdrawn successfully",
        quote,
    )))
}

pub async fn expire_due_quotes(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let expired = app_state
        .quote_service
        .expire_due_quotes()
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Expiry sweep completed",
        serde_json::json!({ "expired": expired }),
    )))
}
