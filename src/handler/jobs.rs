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
    dtos::jobdtos::*,
    error::HttpError,
    middleware::{require_role, role_check, AuthUser, UserRole},
    AppState,
};

pub fn jobs_handler() -> Router {
    Router::new()
        .route(
            "/",
            post(create_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer])
            })),
        )
        .route(
            "/search",
            post(search_jobs).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Tradie])
            })),
        )
        .route(
            "/customer",
            get(get_customer_jobs).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer])
            })),
        )
        .route(
            "/tradie",
            get(get_tradie_jobs).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Tradie])
            })),
        )
        .route("/:job_id", get(get_job).put(update_job))
        .route(
            "/:job_id/status",
            patch(update_job_status).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer])
            })),
        )
        .route(
            "/:job_id/assign",
            post(assign_tradie).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Customer])
            })),
        )
        .route(
            "/:job_id/complete",
            post(complete_job).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Tradie])
            })),
        )
        .route("/:job_id/messages", post(add_job_message))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .create_job(auth.id, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Job created successfully",
        job,
    )))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .get_job(job_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Job retrieved successfully",
        job,
    )))
}

pub async fn update_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<UpdateJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    require_role(&auth, UserRole::Customer)?;

    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .update_job(job_id, auth.id, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Job updated successfully",
        job,
    )))
}

pub async fn update_job_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<UpdateJobStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .update_job_status(job_id, body.status, body.reason, auth.id, auth.role.label())
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Job status updated successfully",
        job,
    )))
}

pub async fn assign_tradie(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<AssignTradieDto>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .job_service
        .assign_tradie(job_id, auth.id, body.tradie_id, body.quote_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Tradie assigned successfully",
        job,
    )))
}

pub async fn complete_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<CompleteJobDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .complete_job(job_id, auth.id, body.completion_notes)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Job completed successfully",
        job,
    )))
}

pub async fn add_job_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<CreateJobMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .job_service
        .add_job_message(job_id, auth.id, body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Message added successfully",
        message,
    )))
}

pub async fn search_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<SearchJobsDto>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .job_service
        .search_jobs(body)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(ApiResponse::success(
        "Jobs retrieved successfully",
        jobs,
    )))
}

pub async fn get_customer_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (jobs, total) = app_state
        .job_service
        .get_customer_jobs(auth.id, page, limit)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(PaginatedResponse::new(jobs, total, page, limit)))
}

pub async fn get_tradie_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (jobs, total) = app_state
        .job_service
        .get_tradie_jobs(auth.id, page, limit)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(PaginatedResponse::new(jobs, total, page, limit)))
}
