use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::quotemodel::*;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateQuoteDto {
    pub job_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Business name is required"))]
    pub tradie_business_name: String,

    #[validate(range(min = 0.0, message = "Materials cost must be positive"))]
    pub materials_cost: f64,

    #[validate(range(min = 0.0, message = "Labour cost must be positive"))]
    pub labour_cost: f64,

    #[validate(range(min = 1, max = 2000, message = "Estimated duration must be between 1 and 2000 hours"))]
    pub estimated_duration_hours: i32,

    pub proposed_start_date: Option<DateTime<Utc>>,
    pub proposed_end_date: Option<DateTime<Utc>>,

    #[validate(length(min = 10, max = 2000, message = "Description must be between 10 and 2000 characters"))]
    pub description: String,

    pub materials_included: Option<String>,
    pub methodology: Option<String>,
    pub warranty_offered: Option<String>,

    #[validate]
    pub items: Vec<CreateQuoteItemDto>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateQuoteItemDto {
    #[validate(length(min = 1, max = 200, message = "Item description must be between 1 and 200 characters"))]
    pub description: String,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    #[validate(range(min = 0.0, message = "Unit price must be positive"))]
    pub unit_price: f64,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuoteStatusDto {
    pub status: QuoteStatus,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawQuoteDto {
    #[validate(length(min = 1, max = 500, message = "Reason must be between 1 and 500 characters"))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteDetailDto {
    #[serde(flatten)]
    pub quote: Quote,
    pub items: Vec<QuoteItem>,
}
