use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::jobmodel::*;
use crate::models::quotemodel::QuoteStatus;

//Job DTOs
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateJobDto {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: String,

    #[validate(length(min = 20, max = 2000, message = "Description must be between 20 and 2000 characters"))]
    pub description: String,

    pub category: ServiceCategory,

    #[validate(length(max = 100, message = "Sub category must be at most 100 characters"))]
    pub sub_category: String,

    pub urgency: JobUrgency,

    #[validate(range(min = 0.0, message = "Minimum budget must be positive"))]
    pub budget_min: Option<f64>,

    #[validate(range(min = 0.0, message = "Maximum budget must be positive"))]
    pub budget_max: Option<f64>,

    pub preferred_start_date: Option<DateTime<Utc>>,
    pub preferred_end_date: Option<DateTime<Utc>>,
    pub is_flexible_timing: bool,

    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,

    #[validate(email(message = "Invalid customer email"))]
    pub customer_email: String,

    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub customer_phone: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "Suburb is required"))]
    pub suburb: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,

    #[validate(length(min = 1, message = "Post code is required"))]
    pub post_code: String,

    pub latitude: f64,
    pub longitude: f64,

    pub special_requirements: Option<String>,
    pub requires_license: bool,
    pub requires_insurance: bool,

    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct UpdateJobDto {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 20, max = 2000, message = "Description must be between 20 and 2000 characters"))]
    pub description: Option<String>,

    pub category: Option<ServiceCategory>,
    pub urgency: Option<JobUrgency>,

    pub suburb: Option<String>,
    pub post_code: Option<String>,
    pub address: Option<String>,

    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,

    pub preferred_start_date: Option<DateTime<Utc>>,
    pub preferred_end_date: Option<DateTime<Utc>>,
    pub is_flexible_timing: Option<bool>,

    pub special_requirements: Option<String>,

    pub image_urls: Option<Vec<String>>,
    pub removed_image_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateJobStatusDto {
    pub status: JobStatus,

    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTradieDto {
    pub tradie_id: Uuid,
    pub quote_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteJobDto {
    #[validate(length(max = 2000, message = "Completion notes must be at most 2000 characters"))]
    pub completion_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobMessageDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub message: String,

    pub message_type: Option<MessageType>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct SearchJobsDto {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub categories: Option<Vec<ServiceCategory>>,
    pub urgency: Option<JobUrgency>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub start_date_from: Option<DateTime<Utc>>,
    pub start_date_to: Option<DateTime<Utc>>,
    pub has_budget: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQueryDto {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct JobSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ServiceCategory,
    pub sub_category: String,
    pub urgency: JobUrgency,
    pub status: JobStatus,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub suburb: String,
    pub state: String,
    pub distance_km: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub quote_count: i64,
    pub has_images: bool,
    pub preferred_start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct QuoteSummaryDto {
    pub id: Uuid,
    pub tradie_id: Uuid,
    pub tradie_business_name: String,
    pub status: QuoteStatus,
    pub total_cost: f64,
    pub estimated_duration_hours: i32,
    pub proposed_start_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
}

#[derive(Debug, Serialize)]
pub struct JobDetailDto {
    #[serde(flatten)]
    pub job: Job,
    pub images: Vec<JobImage>,
    pub quotes: Vec<QuoteSummaryDto>,
    pub recent_messages: Vec<JobMessage>,
    pub status_history: Vec<JobStatusHistory>,
}

//Response wrappers
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
            errors: None,
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            message: message.to_string(),
            data: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let total_pages = ((total as f64) / (limit as f64)).ceil() as u32;
        Self {
            success: true,
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let resp = ApiResponse::success("Job created successfully", 42);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Job created successfully");
        assert_eq!(json["data"], 42);
        assert!(json["errors"].is_null());
    }

    #[test]
    fn error_envelope_shape() {
        let resp = ApiResponse::<()>::error("Job not found");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let resp = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(resp.total_pages, 3);
    }
}
