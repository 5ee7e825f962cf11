use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::JobExt, quotedb::QuoteExt},
    dtos::quotedtos::*,
    models::{
        jobmodel::{Job, JobStatus},
        quotemodel::{Quote, QuoteStatus},
    },
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct QuoteService {
    db_client: Arc<DBClient>,
}

/// A job only accepts quotes before it is booked. Jobs that already hold
/// quotes keep accepting competing ones.
pub fn check_quote_submission(job: &Job) -> Result<(), ServiceError> {
    if !matches!(
        job.status,
        JobStatus::Posted | JobStatus::QuoteRequested | JobStatus::QuoteReceived
    ) {
        return Err(ServiceError::Validation(
            "Job is not accepting quotes".to_string(),
        ));
    }
    Ok(())
}

/// The first quote on a fresh posting moves it to QuoteReceived.
/// QuoteRequested and QuoteReceived jobs keep their status while further
/// quotes accumulate.
pub fn submission_status_flip(job: &Job) -> Option<JobStatus> {
    if job.status == JobStatus::Posted {
        Some(JobStatus::QuoteReceived)
    } else {
        None
    }
}

pub fn check_quote_transition(quote: &Quote, to: QuoteStatus) -> Result<(), ServiceError> {
    // Accepting is the booking side effect; it must go through the job
    // assign operation so assigned_tradie_id and accepted_quote_id move
    // together.
    if to == QuoteStatus::Accepted {
        return Err(ServiceError::Validation(
            "Quotes are accepted through the job assign operation".to_string(),
        ));
    }

    if !quote.status.can_transition_to(to) {
        return Err(ServiceError::InvalidQuoteTransition(quote.status, to));
    }
    Ok(())
}

pub fn check_withdrawal(quote: &Quote) -> Result<(), ServiceError> {
    if quote.status != QuoteStatus::Submitted {
        return Err(ServiceError::Validation(
            "Only submitted quotes can be withdrawn".to_string(),
        ));
    }
    Ok(())
}

impl QuoteService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn create_quote(
        &self,
        tradie_id: Uuid,
        data: CreateQuoteDto,
    ) -> Result<QuoteDetailDto, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        // Lock the job row: quote submission and quote acceptance contend
        // on the same job, and the first-quote status flip below must see a
        // stable status.
        let job = self
            .db_client
            .get_job_for_update(&mut tx, data.job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(data.job_id))?;

        check_quote_submission(&job)?;

        if self
            .db_client
            .has_tradie_quoted(tradie_id, data.job_id)
            .await?
        {
            return Err(ServiceError::Validation(
                "You have already submitted a quote for this job".to_string(),
            ));
        }

        // The unique index on (job_id, tradie_id) backstops the pre-check.
        let quote = self
            .db_client
            .insert_quote(&mut tx, tradie_id, &data.tradie_business_name, &data)
            .await
            .map_err(ServiceError::from_quote_insert)?;

        if let Some(to) = submission_status_flip(&job) {
            self.db_client
                .set_job_status(
                    &mut tx,
                    &job,
                    to,
                    Some("Quote received".to_string()),
                    None,
                    tradie_id,
                    "System",
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Created quote {} for job {} by tradie {}",
            quote.id,
            data.job_id,
            tradie_id
        );

        let items = self.db_client.get_quote_items(quote.id).await?;
        Ok(QuoteDetailDto { quote, items })
    }

    pub async fn get_quote(&self, quote_id: Uuid) -> Result<QuoteDetailDto, ServiceError> {
        let quote = self
            .db_client
            .get_quote_by_id(quote_id)
            .await?
            .ok_or(ServiceError::QuoteNotFound(quote_id))?;

        let items = self.db_client.get_quote_items(quote_id).await?;
        Ok(QuoteDetailDto { quote, items })
    }

    pub async fn get_quotes_by_job(&self, job_id: Uuid) -> Result<Vec<Quote>, ServiceError> {
        Ok(self.db_client.get_quotes_by_job(job_id).await?)
    }

    pub async fn get_quotes_by_tradie(
        &self,
        tradie_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Quote>, i64), ServiceError> {
        let offset = ((page.max(1) - 1) * limit) as i64;
        let quotes = self
            .db_client
            .get_quotes_by_tradie(tradie_id, limit as i64, offset)
            .await?;
        let total = self.db_client.count_quotes_by_tradie(tradie_id).await?;
        Ok((quotes, total))
    }

    pub async fn update_quote_status(
        &self,
        quote_id: Uuid,
        new_status: QuoteStatus,
        notes: Option<String>,
    ) -> Result<Quote, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let quote = self
            .db_client
            .get_quote_for_update(&mut tx, quote_id)
            .await?
            .ok_or(ServiceError::QuoteNotFound(quote_id))?;

        check_quote_transition(&quote, new_status)?;

        let updated = self
            .db_client
            .set_quote_status(&mut tx, quote_id, new_status, notes)
            .await?;

        tx.commit().await?;

        tracing::info!("Updated quote {} status to {:?}", quote_id, new_status);

        Ok(updated)
    }

    pub async fn withdraw_quote(
        &self,
        quote_id: Uuid,
        tradie_id: Uuid,
        reason: &str,
    ) -> Result<Quote, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let quote = self
            .db_client
            .get_quote_for_update(&mut tx, quote_id)
            .await?
            .ok_or(ServiceError::QuoteNotFound(quote_id))?;

        if quote.tradie_id != tradie_id {
            return Err(ServiceError::Unauthorized(tradie_id));
        }

        check_withdrawal(&quote)?;

        let updated = self.db_client.withdraw_quote(&mut tx, quote_id, reason).await?;

        tx.commit().await?;

        tracing::info!("Withdrew quote {} with reason: {}", quote_id, reason);

        Ok(updated)
    }

    pub async fn expire_due_quotes(&self) -> Result<u64, ServiceError> {
        let expired = self.db_client.expire_due_quotes().await?;
        if expired > 0 {
            tracing::info!("Expiry sweep flipped {} quotes to expired", expired);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{Duration, Utc};
    use crate::models::jobmodel::{JobUrgency, ServiceCategory};

    fn sample_job(status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Repaint fence".to_string(),
            description: "Back fence needs two coats before summer".to_string(),
            category: ServiceCategory::Painting,
            sub_category: "Fences".to_string(),
            urgency: JobUrgency::Normal,
            status,
            budget_min: None,
            budget_max: None,
            preferred_start_date: None,
            preferred_end_date: None,
            is_flexible_timing: true,
            customer_id: Uuid::new_v4(),
            customer_name: "Sam Customer".to_string(),
            customer_email: "sam@example.com".to_string(),
            customer_phone: "0411111111".to_string(),
            address: "2 Sample Ave".to_string(),
            suburb: "Richmond".to_string(),
            state: "VIC".to_string(),
            post_code: "3121".to_string(),
            latitude: -37.82,
            longitude: 144.99,
            is_location_visible: true,
            special_requirements: None,
            requires_license: false,
            requires_insurance: true,
            requires_background_check: false,
            assigned_tradie_id: None,
            accepted_quote_id: None,
            started_at: None,
            completed_at: None,
            completion_notes: None,
            final_amount: None,
            version: 1,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    fn sample_quote(status: QuoteStatus) -> Quote {
        Quote {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            tradie_id: Uuid::new_v4(),
            tradie_business_name: "Brush Bros".to_string(),
            status,
            materials_cost: BigDecimal::from(80),
            labour_cost: BigDecimal::from(320),
            total_cost: BigDecimal::from(400),
            pricing_breakdown: None,
            estimated_duration_hours: 6,
            proposed_start_date: None,
            proposed_end_date: None,
            description: "Prep, prime and two top coats".to_string(),
            materials_included: None,
            methodology: None,
            warranty_offered: None,
            expires_at: Utc::now() + Duration::days(7),
            customer_viewed_at: None,
            customer_responded_at: None,
            customer_notes: None,
            rejection_reason: None,
            version: 1,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    #[test]
    fn quotes_accepted_until_the_job_is_booked() {
        assert!(check_quote_submission(&sample_job(JobStatus::Posted)).is_ok());
        assert!(check_quote_submission(&sample_job(JobStatus::QuoteRequested)).is_ok());
        assert!(check_quote_submission(&sample_job(JobStatus::QuoteReceived)).is_ok());

        for status in [
            JobStatus::Booked,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
            JobStatus::Disputed,
        ] {
            assert!(check_quote_submission(&sample_job(status)).is_err());
        }
    }

    #[test]
    fn only_the_first_quote_on_a_posting_flips_the_status() {
        let posted = sample_job(JobStatus::Posted);
        assert_eq!(
            submission_status_flip(&posted),
            Some(JobStatus::QuoteReceived)
        );

        // later quotes leave the status alone
        assert_eq!(submission_status_flip(&sample_job(JobStatus::QuoteReceived)), None);
        assert_eq!(submission_status_flip(&sample_job(JobStatus::QuoteRequested)), None);
    }

    #[test]
    fn competing_quotes_accumulate_then_one_wins_at_booking() {
        use crate::service::job_service::check_assignment;

        // first tradie quotes a fresh posting; the job flips to quote_received
        let mut job = sample_job(JobStatus::Posted);
        assert!(check_quote_submission(&job).is_ok());
        let flip = submission_status_flip(&job).unwrap();
        assert!(job.status.can_transition_to(flip));
        job.status = flip;

        let tradie_a = Uuid::new_v4();
        let mut quote_a = sample_quote(QuoteStatus::Submitted);
        quote_a.job_id = job.id;
        quote_a.tradie_id = tradie_a;

        // a second tradie may still quote the same job
        assert!(check_quote_submission(&job).is_ok());
        let tradie_b = Uuid::new_v4();
        let mut quote_b = sample_quote(QuoteStatus::Submitted);
        quote_b.job_id = job.id;
        quote_b.tradie_id = tradie_b;

        // the customer books quote A; B loses the bulk rejection afterwards
        assert!(check_assignment(&job, &quote_a, tradie_a).is_ok());
        job.status = JobStatus::Booked;
        quote_b.status = QuoteStatus::Rejected;

        // a booked job takes no further quotes and B stays terminal
        assert!(check_quote_submission(&job).is_err());
        assert!(quote_b.status.is_terminal());
    }

    #[test]
    fn quote_requested_jobs_accumulate_quotes_and_stay_bookable() {
        let job = sample_job(JobStatus::QuoteRequested);
        assert!(check_quote_submission(&job).is_ok());
        assert_eq!(submission_status_flip(&job), None);
        assert!(job.status.can_transition_to(JobStatus::Booked));
    }

    #[test]
    fn status_updates_cannot_accept_a_quote_directly() {
        let quote = sample_quote(QuoteStatus::Submitted);
        let err = check_quote_transition(&quote, QuoteStatus::Accepted).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn withdrawn_quote_cannot_be_re_marked() {
        let quote = sample_quote(QuoteStatus::Withdrawn);
        assert!(matches!(
            check_quote_transition(&quote, QuoteStatus::Viewed),
            Err(ServiceError::InvalidQuoteTransition(_, _))
        ));
    }

    #[test]
    fn only_submitted_quotes_can_be_withdrawn() {
        assert!(check_withdrawal(&sample_quote(QuoteStatus::Submitted)).is_ok());

        for status in [
            QuoteStatus::Accepted,
            QuoteStatus::Rejected,
            QuoteStatus::Expired,
            QuoteStatus::Withdrawn,
            QuoteStatus::Viewed,
        ] {
            let err = check_withdrawal(&sample_quote(status)).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[test]
    fn viewing_a_submitted_quote_is_permitted() {
        let quote = sample_quote(QuoteStatus::Submitted);
        assert!(check_quote_transition(&quote, QuoteStatus::Viewed).is_ok());
        assert!(check_quote_transition(&quote, QuoteStatus::Rejected).is_ok());
    }
}
