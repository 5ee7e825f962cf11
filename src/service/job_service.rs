use std::sync::Arc;

use chrono::Utc;
use num_traits::ToPrimitive;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::{summary_preview, JobExt, JobSearchRow}, quotedb::QuoteExt},
    dtos::jobdtos::*,
    models::{jobmodel::*, quotemodel::{Quote, QuoteStatus}},
    service::error::ServiceError,
    utils::geo::haversine_km,
};

pub const REJECTED_COMPETING_REASON: &str = "Another quote was accepted";

#[derive(Debug, Clone)]
pub struct JobService {
    db_client: Arc<DBClient>,
}

/// Preconditions for accepting a quote and booking the job. Pure so the
/// guard matrix is unit-testable without a database.
pub fn check_assignment(job: &Job, quote: &Quote, tradie_id: Uuid) -> Result<(), ServiceError> {
    if quote.job_id != job.id || quote.tradie_id != tradie_id {
        return Err(ServiceError::Validation(
            "Quote not found or does not belong to the specified tradie".to_string(),
        ));
    }

    if quote.status != QuoteStatus::Submitted {
        return Err(ServiceError::Validation(
            "Quote is not in a valid status to be accepted".to_string(),
        ));
    }

    if !job.status.can_transition_to(JobStatus::Booked) {
        return Err(ServiceError::InvalidJobStatus(job.id, job.status));
    }

    Ok(())
}

pub fn check_completion(job: &Job) -> Result<(), ServiceError> {
    if job.status != JobStatus::InProgress {
        return Err(ServiceError::Validation(
            "Job must be in progress to be completed".to_string(),
        ));
    }
    Ok(())
}

pub fn check_status_transition(job: &Job, to: JobStatus) -> Result<(), ServiceError> {
    if !job.status.can_transition_to(to) {
        return Err(ServiceError::InvalidJobTransition(job.status, to));
    }
    Ok(())
}

impl JobService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn create_job(
        &self,
        customer_id: Uuid,
        data: CreateJobDto,
    ) -> Result<JobDetailDto, ServiceError> {
        let job = self.db_client.create_job(customer_id, &data).await?;

        tracing::info!("Created job {} for customer {}", job.id, customer_id);

        self.job_detail(job.id).await
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<JobDetailDto, ServiceError> {
        self.job_detail(job_id).await
    }

    pub async fn update_job(
        &self,
        job_id: Uuid,
        customer_id: Uuid,
        data: UpdateJobDto,
    ) -> Result<JobDetailDto, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(customer_id));
        }

        let updated = self.db_client.update_job(&job, &data).await?;
        if updated.is_none() {
            // Version token moved between the read and the write.
            return Err(ServiceError::ConcurrencyConflict);
        }

        self.job_detail(job_id).await
    }

    pub async fn update_job_status(
        &self,
        job_id: Uuid,
        new_status: JobStatus,
        reason: Option<String>,
        changed_by: Uuid,
        changed_by_name: &str,
    ) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let job = self
            .db_client
            .get_job_for_update(&mut tx, job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        check_status_transition(&job, new_status)?;

        let updated = self
            .db_client
            .set_job_status(&mut tx, &job, new_status, reason, None, changed_by, changed_by_name)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Updated job {} status from {} to {}",
            job_id,
            job.status.to_str(),
            new_status.to_str()
        );

        Ok(updated)
    }

    pub async fn assign_tradie(
        &self,
        job_id: Uuid,
        customer_id: Uuid,
        tradie_id: Uuid,
        quote_id: Uuid,
    ) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        // Row lock on the job serializes competing accept calls; the guards
        // below run against the locked row so no two can both pass.
        let job = self
            .db_client
            .get_job_for_update(&mut tx, job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.customer_id != customer_id {
            return Err(ServiceError::Unauthorized(customer_id));
        }

        let quote = self
            .db_client
            .get_quote_for_update(&mut tx, quote_id)
            .await?
            .ok_or_else(|| {
                ServiceError::Validation(
                    "Quote not found or does not belong to the specified tradie".to_string(),
                )
            })?;

        check_assignment(&job, &quote, tradie_id)?;

        self.db_client.accept_quote(&mut tx, quote_id).await?;
        let rejected = self
            .db_client
            .reject_competing_quotes(&mut tx, job_id, quote_id, REJECTED_COMPETING_REASON)
            .await?;
        self.db_client
            .set_job_assignment(&mut tx, job_id, tradie_id, quote_id)
            .await?;
        self.db_client
            .set_job_status(
                &mut tx,
                &job,
                JobStatus::Booked,
                Some("Quote accepted and tradie assigned".to_string()),
                None,
                customer_id,
                "Customer",
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Assigned tradie {} to job {} with quote {} ({} competing quotes rejected)",
            tradie_id,
            job_id,
            quote_id,
            rejected
        );

        self.db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn complete_job(
        &self,
        job_id: Uuid,
        tradie_id: Uuid,
        completion_notes: Option<String>,
    ) -> Result<Job, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let job = self
            .db_client
            .get_job_for_update(&mut tx, job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        if job.assigned_tradie_id != Some(tradie_id) {
            return Err(ServiceError::Unauthorized(tradie_id));
        }

        check_completion(&job)?;

        self.db_client
            .set_job_completion(&mut tx, job_id, completion_notes.clone())
            .await?;
        self.db_client
            .set_job_status(
                &mut tx,
                &job,
                JobStatus::Completed,
                Some("Job completed".to_string()),
                completion_notes,
                tradie_id,
                "Tradie",
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Completed job {}", job_id);

        self.db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn add_job_message(
        &self,
        job_id: Uuid,
        sender_id: Uuid,
        data: CreateJobMessageDto,
    ) -> Result<JobMessage, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let sender_name = if sender_id == job.customer_id {
            "Customer"
        } else {
            "Tradie"
        };

        let message = self
            .db_client
            .add_job_message(
                job_id,
                sender_id,
                sender_name,
                &data.message,
                data.message_type.unwrap_or(MessageType::General),
                data.attachment_url,
            )
            .await?;

        Ok(message)
    }

    pub async fn search_jobs(
        &self,
        filters: SearchJobsDto,
    ) -> Result<Vec<JobSummaryDto>, ServiceError> {
        let rows = self.db_client.search_jobs(&filters).await?;

        let origin = match (filters.latitude, filters.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        };

        let page = filters.page.unwrap_or(1).max(1);
        let limit = filters.limit.unwrap_or(20).clamp(1, 100);

        let summaries: Vec<JobSummaryDto> = rows
            .into_iter()
            .map(|row| job_summary(row, origin))
            .filter(|s| match filters.radius_km {
                Some(radius) => origin.is_none() || s.distance_km <= radius,
                None => true,
            })
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();

        Ok(summaries)
    }

    pub async fn get_customer_jobs(
        &self,
        customer_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Job>, i64), ServiceError> {
        let offset = ((page.max(1) - 1) * limit) as i64;
        let jobs = self
            .db_client
            .get_jobs_by_customer(customer_id, limit as i64, offset)
            .await?;
        let total = self.db_client.count_jobs_by_customer(customer_id).await?;
        Ok((jobs, total))
    }

    pub async fn get_tradie_jobs(
        &self,
        tradie_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Job>, i64), ServiceError> {
        let offset = ((page.max(1) - 1) * limit) as i64;
        let jobs = self
            .db_client
            .get_jobs_by_tradie(tradie_id, limit as i64, offset)
            .await?;
        let total = self.db_client.count_jobs_by_tradie(tradie_id).await?;
        Ok((jobs, total))
    }

    async fn job_detail(&self, job_id: Uuid) -> Result<JobDetailDto, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let images = self.db_client.get_job_images(job_id).await?;
        let quotes = self.db_client.get_quotes_by_job(job_id).await?;
        let recent_messages = self.db_client.get_recent_messages(job_id, 10).await?;
        let status_history = self.db_client.get_status_history(job_id).await?;

        let now = Utc::now();
        let quotes = quotes
            .into_iter()
            .map(|q| QuoteSummaryDto {
                id: q.id,
                tradie_id: q.tradie_id,
                tradie_business_name: q.tradie_business_name.clone(),
                status: q.status,
                total_cost: q.total_cost.to_f64().unwrap_or(0.0),
                estimated_duration_hours: q.estimated_duration_hours,
                proposed_start_date: q.proposed_start_date,
                created_at: q.created_at,
                expires_at: q.expires_at,
                is_expired: q.is_expired_at(now),
            })
            .collect();

        Ok(JobDetailDto {
            job,
            images,
            quotes,
            recent_messages,
            status_history,
        })
    }
}

fn job_summary(row: JobSearchRow, origin: Option<(f64, f64)>) -> JobSummaryDto {
    let job = row.job;
    let distance_km = origin
        .map(|(lat, lon)| haversine_km(lat, lon, job.latitude, job.longitude))
        .unwrap_or(0.0);

    JobSummaryDto {
        id: job.id,
        title: job.title,
        description: summary_preview(&job.description),
        category: job.category,
        sub_category: job.sub_category,
        urgency: job.urgency,
        status: job.status,
        budget_min: job.budget_min.as_ref().and_then(|b| b.to_f64()),
        budget_max: job.budget_max.as_ref().and_then(|b| b.to_f64()),
        suburb: job.suburb,
        state: job.state,
        distance_km,
        created_at: job.created_at,
        quote_count: row.quote_count,
        has_images: row.image_count > 0,
        preferred_start_date: job.preferred_start_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Duration;

    fn sample_job(status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Fix leaking tap".to_string(),
            description: "Kitchen tap has been dripping for a week".to_string(),
            category: ServiceCategory::Plumbing,
            sub_category: "Taps".to_string(),
            urgency: JobUrgency::Normal,
            status,
            budget_min: Some(BigDecimal::from(100)),
            budget_max: Some(BigDecimal::from(300)),
            preferred_start_date: None,
            preferred_end_date: None,
            is_flexible_timing: true,
            customer_id: Uuid::new_v4(),
            customer_name: "Jane Citizen".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: "0400000000".to_string(),
            address: "1 Example St".to_string(),
            suburb: "Parramatta".to_string(),
            state: "NSW".to_string(),
            post_code: "2150".to_string(),
            latitude: -33.8151,
            longitude: 151.0011,
            is_location_visible: true,
            special_requirements: None,
            requires_license: true,
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

    fn sample_quote(job: &Job, tradie_id: Uuid, status: QuoteStatus) -> Quote {
        Quote {
            id: Uuid::new_v4(),
            job_id: job.id,
            tradie_id,
            tradie_business_name: "Smith Plumbing".to_string(),
            status,
            materials_cost: BigDecimal::from(50),
            labour_cost: BigDecimal::from(150),
            total_cost: BigDecimal::from(200),
            pricing_breakdown: None,
            estimated_duration_hours: 3,
            proposed_start_date: None,
            proposed_end_date: None,
            description: "Replace washer and service tap".to_string(),
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
    fn assignment_accepts_a_submitted_quote_on_a_quoted_job() {
        // quotes can sit on a quote_requested job too (no status flip on
        // submission there), so both states are bookable
        for status in [JobStatus::QuoteReceived, JobStatus::QuoteRequested] {
            let job = sample_job(status);
            let tradie = Uuid::new_v4();
            let quote = sample_quote(&job, tradie, QuoteStatus::Submitted);

            assert!(check_assignment(&job, &quote, tradie).is_ok());
        }
    }

    #[test]
    fn assignment_rejects_quote_belonging_to_another_tradie() {
        let job = sample_job(JobStatus::QuoteReceived);
        let quote = sample_quote(&job, Uuid::new_v4(), QuoteStatus::Submitted);

        let err = check_assignment(&job, &quote, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn assignment_rejects_non_submitted_quotes() {
        let job = sample_job(JobStatus::QuoteReceived);
        let tradie = Uuid::new_v4();

        for status in [
            QuoteStatus::Pending,
            QuoteStatus::Viewed,
            QuoteStatus::Accepted,
            QuoteStatus::Rejected,
            QuoteStatus::Expired,
            QuoteStatus::Withdrawn,
        ] {
            let quote = sample_quote(&job, tradie, status);
            assert!(check_assignment(&job, &quote, tradie).is_err());
        }
    }

    #[test]
    fn assignment_rejects_jobs_that_cannot_be_booked() {
        let tradie = Uuid::new_v4();
        for status in [
            JobStatus::Posted,
            JobStatus::Booked,
            JobStatus::InProgress,
            JobStatus::Completed,
        ] {
            let job = sample_job(status);
            let quote = sample_quote(&job, tradie, QuoteStatus::Submitted);
            let err = check_assignment(&job, &quote, tradie).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidJobStatus(_, _)));
        }
    }

    #[test]
    fn completion_requires_in_progress() {
        assert!(check_completion(&sample_job(JobStatus::InProgress)).is_ok());
        assert!(check_completion(&sample_job(JobStatus::Booked)).is_err());
        assert!(check_completion(&sample_job(JobStatus::Completed)).is_err());
    }

    #[test]
    fn status_updates_respect_the_transition_table() {
        let job = sample_job(JobStatus::Posted);
        assert!(check_status_transition(&job, JobStatus::Cancelled).is_ok());
        assert!(matches!(
            check_status_transition(&job, JobStatus::Completed),
            Err(ServiceError::InvalidJobTransition(
                JobStatus::Posted,
                JobStatus::Completed
            ))
        ));
    }

    #[test]
    fn search_summaries_carry_distance_from_origin() {
        let job = sample_job(JobStatus::Posted);
        let row = JobSearchRow {
            job,
            quote_count: 2,
            image_count: 0,
        };

        // Origin at Sydney CBD, job at Parramatta: roughly 20km.
        let summary = job_summary(row, Some((-33.8688, 151.2093)));
        assert!(summary.distance_km > 15.0 && summary.distance_km < 25.0);
        assert_eq!(summary.quote_count, 2);
        assert!(!summary.has_images);
    }
}
