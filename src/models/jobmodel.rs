use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "service_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Plumbing,
    Electrical,
    Carpentry,
    Painting,
    Roofing,
    Hvac,
    Landscaping,
    Cleaning,
    Handyman,
    Emergency,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_urgency", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobUrgency {
    Normal,
    SameDay,
    Emergency,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Posted,
    QuoteRequested,
    QuoteReceived,
    Booked,
    InProgress,
    Completed,
    Cancelled,
    Disputed,
}

impl JobStatus {
    /// Permitted (from, to) pairs for customer/tradie driven status changes.
    /// The Posted -> Posted creation row is written by job creation itself,
    /// never through this check.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Posted, QuoteRequested)
                | (Posted, QuoteReceived)
                | (Posted, Cancelled)
                | (QuoteRequested, QuoteReceived)
                | (QuoteRequested, Booked)
                | (QuoteRequested, Cancelled)
                | (QuoteReceived, Booked)
                | (QuoteReceived, Cancelled)
                | (Booked, InProgress)
                | (Booked, Cancelled)
                | (Booked, Disputed)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Disputed)
                | (Completed, Disputed)
                | (Disputed, Completed)
                | (Disputed, Cancelled)
        )
    }

    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Posted => "posted",
            JobStatus::QuoteRequested => "quote_requested",
            JobStatus::QuoteReceived => "quote_received",
            JobStatus::Booked => "booked",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Disputed => "disputed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "image_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Problem,
    Reference,
    Progress,
    Completed,
    Before,
    After,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    General,
    QuoteSubmitted,
    QuoteAccepted,
    QuoteRejected,
    JobStarted,
    JobCompleted,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ServiceCategory,
    pub sub_category: String,
    pub urgency: JobUrgency,
    pub status: JobStatus,
    pub budget_min: Option<BigDecimal>,
    pub budget_max: Option<BigDecimal>,
    pub preferred_start_date: Option<DateTime<Utc>>,
    pub preferred_end_date: Option<DateTime<Utc>>,
    pub is_flexible_timing: bool,

    // Customer snapshot
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,

    // Location snapshot
    pub address: String,
    pub suburb: String,
    pub state: String,
    pub post_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_location_visible: bool,

    pub special_requirements: Option<String>,
    pub requires_license: bool,
    pub requires_insurance: bool,
    pub requires_background_check: bool,

    // Set together or both null
    pub assigned_tradie_id: Option<Uuid>,
    pub accepted_quote_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
    pub final_amount: Option<BigDecimal>,

    pub version: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobImage {
    pub id: Uuid,
    pub job_id: Uuid,
    pub image_url: String,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub image_type: ImageType,
    pub is_main_image: bool,
    pub display_order: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobMessage {
    pub id: Uuid,
    pub job_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub message: String,
    pub message_type: MessageType,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub attachment_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Append-only audit row. Written in the same transaction as every
/// Job.status mutation, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobStatusHistory {
    pub id: Uuid,
    pub job_id: Uuid,
    pub from_status: JobStatus,
    pub to_status: JobStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub changed_by: Uuid,
    pub changed_by_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_requires_a_quote_bearing_status() {
        // quotes arrive while the job is quote_requested or quote_received,
        // so both can be booked; a fresh posting cannot
        assert!(JobStatus::QuoteReceived.can_transition_to(JobStatus::Booked));
        assert!(JobStatus::QuoteRequested.can_transition_to(JobStatus::Booked));
        assert!(!JobStatus::Posted.can_transition_to(JobStatus::Booked));
        assert!(!JobStatus::InProgress.can_transition_to(JobStatus::Booked));
    }

    #[test]
    fn completion_only_from_in_progress() {
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Booked.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::QuoteReceived.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn cancelled_is_terminal() {
        for to in [
            JobStatus::Posted,
            JobStatus::QuoteRequested,
            JobStatus::QuoteReceived,
            JobStatus::Booked,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
            JobStatus::Disputed,
        ] {
            assert!(!JobStatus::Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn self_transitions_rejected() {
        assert!(!JobStatus::Posted.can_transition_to(JobStatus::Posted));
        assert!(!JobStatus::Booked.can_transition_to(JobStatus::Booked));
    }

    #[test]
    fn disputes_can_be_raised_after_booking() {
        assert!(JobStatus::Booked.can_transition_to(JobStatus::Disputed));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Disputed));
        assert!(JobStatus::Completed.can_transition_to(JobStatus::Disputed));
        assert!(!JobStatus::Posted.can_transition_to(JobStatus::Disputed));
    }
}
