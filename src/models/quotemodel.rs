use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quotes live for 7 days from submission before the expiry sweep may
/// flip them to Expired.
pub const QUOTE_VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "quote_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Pending,
    Submitted,
    Viewed,
    Accepted,
    Rejected,
    Expired,
    Withdrawn,
}

impl QuoteStatus {
    pub fn can_transition_to(self, to: QuoteStatus) -> bool {
        use QuoteStatus::*;
        matches!(
            (self, to),
            (Pending, Submitted)
                | (Pending, Withdrawn)
                | (Submitted, Viewed)
                | (Submitted, Accepted)
                | (Submitted, Rejected)
                | (Submitted, Expired)
                | (Submitted, Withdrawn)
                | (Viewed, Accepted)
                | (Viewed, Rejected)
                | (Viewed, Expired)
                | (Viewed, Withdrawn)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted
                | QuoteStatus::Rejected
                | QuoteStatus::Expired
                | QuoteStatus::Withdrawn
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quote {
    pub id: Uuid,
    pub job_id: Uuid,
    pub tradie_id: Uuid,
    pub tradie_business_name: String,
    pub status: QuoteStatus,

    pub materials_cost: BigDecimal,
    pub labour_cost: BigDecimal,
    pub total_cost: BigDecimal,
    pub pricing_breakdown: Option<String>,

    pub estimated_duration_hours: i32,
    pub proposed_start_date: Option<DateTime<Utc>>,
    pub proposed_end_date: Option<DateTime<Utc>>,

    pub description: String,
    pub materials_included: Option<String>,
    pub methodology: Option<String>,
    pub warranty_offered: Option<String>,
    pub expires_at: DateTime<Utc>,

    pub customer_viewed_at: Option<DateTime<Utc>>,
    pub customer_responded_at: Option<DateTime<Utc>>,
    pub customer_notes: Option<String>,
    pub rejection_reason: Option<String>,

    pub version: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == QuoteStatus::Submitted && self.expires_at < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuoteItem {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// total_cost = materials + labour, fixed at submission time.
pub fn quote_total(materials_cost: &BigDecimal, labour_cost: &BigDecimal) -> BigDecimal {
    materials_cost + labour_cost
}

/// Line total for a quote item: quantity x unit price.
pub fn line_total(quantity: i32, unit_price: &BigDecimal) -> BigDecimal {
    BigDecimal::from(quantity) * unit_price
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    #[test]
    fn total_is_materials_plus_labour() {
        let materials = BigDecimal::from_str("150.50").unwrap();
        let labour = BigDecimal::from_str("349.50").unwrap();
        assert_eq!(
            quote_total(&materials, &labour),
            BigDecimal::from_str("500.00").unwrap()
        );
    }

    #[test]
    fn line_total_is_quantity_times_unit_price() {
        let unit = BigDecimal::from_str("19.99").unwrap();
        assert_eq!(line_total(3, &unit), BigDecimal::from_str("59.97").unwrap());
    }

    #[test]
    fn accepted_rejected_expired_withdrawn_are_terminal() {
        for from in [
            QuoteStatus::Accepted,
            QuoteStatus::Rejected,
            QuoteStatus::Expired,
            QuoteStatus::Withdrawn,
        ] {
            assert!(from.is_terminal());
            for to in [
                QuoteStatus::Pending,
                QuoteStatus::Submitted,
                QuoteStatus::Viewed,
                QuoteStatus::Accepted,
                QuoteStatus::Rejected,
                QuoteStatus::Expired,
                QuoteStatus::Withdrawn,
            ] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn submitted_quote_can_be_viewed_then_accepted() {
        assert!(QuoteStatus::Submitted.can_transition_to(QuoteStatus::Viewed));
        assert!(QuoteStatus::Viewed.can_transition_to(QuoteStatus::Accepted));
        // but a withdrawn quote cannot be re-accepted
        assert!(!QuoteStatus::Withdrawn.can_transition_to(QuoteStatus::Accepted));
    }

    #[test]
    fn expiry_only_applies_to_submitted_quotes() {
        let now = Utc::now();
        let mut quote = sample_quote(now - Duration::days(8));
        assert!(quote.is_expired_at(now));

        quote.status = QuoteStatus::Accepted;
        assert!(!quote.is_expired_at(now));
    }

    fn sample_quote(expires_at: DateTime<Utc>) -> Quote {
        Quote {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            tradie_id: Uuid::new_v4(),
            tradie_business_name: "Smith Plumbing".to_string(),
            status: QuoteStatus::Submitted,
            materials_cost: BigDecimal::from(100),
            labour_cost: BigDecimal::from(200),
            total_cost: BigDecimal::from(300),
            pricing_breakdown: None,
            estimated_duration_hours: 8,
            proposed_start_date: None,
            proposed_end_date: None,
            description: "Replace hot water system".to_string(),
            materials_included: None,
            methodology: None,
            warranty_offered: None,
            expires_at,
            customer_viewed_at: None,
            customer_responded_at: None,
            customer_notes: None,
            rejection_reason: None,
            version: 1,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }
}
