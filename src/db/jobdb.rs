use async_trait::async_trait;
use sqlx::types::BigDecimal;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::dtos::jobdtos::{CreateJobDto, SearchJobsDto, UpdateJobDto};
use crate::models::jobmodel::*;

/// Job row joined with the aggregate counts the search listing needs.
#[derive(Debug, sqlx::FromRow)]
pub struct JobSearchRow {
    #[sqlx(flatten)]
    pub job: Job,
    pub quote_count: i64,
    pub image_count: i64,
}

#[async_trait]
pub trait JobExt {
    async fn create_job(&self, customer_id: Uuid, data: &CreateJobDto) -> Result<Job, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error>;

    async fn get_job_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
    ) -> Result<Option<Job>, Error>;

    /// The single place a Job.status value is written. Bumps the version,
    /// stamps updated_at and appends exactly one status-history row in the
    /// caller's transaction.
    async fn set_job_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: &Job,
        to: JobStatus,
        reason: Option<String>,
        notes: Option<String>,
        changed_by: Uuid,
        changed_by_name: &str,
    ) -> Result<Job, Error>;

    async fn set_job_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        tradie_id: Uuid,
        quote_id: Uuid,
    ) -> Result<(), Error>;

    async fn set_job_completion(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        completion_notes: Option<String>,
    ) -> Result<(), Error>;

    /// Partial field update guarded by the optimistic version token.
    /// Returns None when the version no longer matches.
    async fn update_job(
        &self,
        job: &Job,
        data: &UpdateJobDto,
    ) -> Result<Option<Job>, Error>;

    async fn get_job_images(&self, job_id: Uuid) -> Result<Vec<JobImage>, Error>;

    async fn get_recent_messages(&self, job_id: Uuid, limit: i64) -> Result<Vec<JobMessage>, Error>;

    async fn get_status_history(&self, job_id: Uuid) -> Result<Vec<JobStatusHistory>, Error>;

    async fn add_job_message(
        &self,
        job_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        message: &str,
        message_type: MessageType,
        attachment_url: Option<String>,
    ) -> Result<JobMessage, Error>;

    async fn search_jobs(&self, filters: &SearchJobsDto) -> Result<Vec<JobSearchRow>, Error>;

    async fn get_jobs_by_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error>;

    async fn count_jobs_by_customer(&self, customer_id: Uuid) -> Result<i64, Error>;

    async fn get_jobs_by_tradie(
        &self,
        tradie_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error>;

    async fn count_jobs_by_tradie(&self, tradie_id: Uuid) -> Result<i64, Error>;
}

#[async_trait]
impl JobExt for DBClient {
    async fn create_job(&self, customer_id: Uuid, data: &CreateJobDto) -> Result<Job, Error> {
        let budget_min = data.budget_min.and_then(|b| BigDecimal::try_from(b).ok());
        let budget_max = data.budget_max.and_then(|b| BigDecimal::try_from(b).ok());

        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (title, description, category, sub_category, urgency, status,
                 budget_min, budget_max, preferred_start_date, preferred_end_date,
                 is_flexible_timing, customer_id, customer_name, customer_email,
                 customer_phone, address, suburb, state, post_code, latitude,
                 longitude, special_requirements, requires_license, requires_insurance)
            VALUES ($1, $2, $3, $4, $5, 'posted', $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.category)
        .bind(&data.sub_category)
        .bind(data.urgency)
        .bind(budget_min)
        .bind(budget_max)
        .bind(data.preferred_start_date)
        .bind(data.preferred_end_date)
        .bind(data.is_flexible_timing)
        .bind(customer_id)
        .bind(&data.customer_name)
        .bind(&data.customer_email)
        .bind(&data.customer_phone)
        .bind(&data.address)
        .bind(&data.suburb)
        .bind(&data.state)
        .bind(&data.post_code)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(&data.special_requirements)
        .bind(data.requires_license)
        .bind(data.requires_insurance)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(urls) = &data.image_urls {
            for (i, url) in urls.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO job_images
                        (job_id, image_url, image_type, is_main_image, display_order)
                    VALUES ($1, $2, 'problem', $3, $4)
                    "#,
                )
                .bind(job.id)
                .bind(url)
                .bind(i == 0)
                .bind((i + 1) as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        // Synthetic creation row so the audit trail starts at Posted.
        sqlx::query(
            r#"
            INSERT INTO job_status_history
                (job_id, from_status, to_status, reason, changed_by, changed_by_name)
            VALUES ($1, 'posted', 'posted', 'Job created', $2, 'Customer')
            "#,
        )
        .bind(job.id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_job_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
    ) -> Result<Option<Job>, Error> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(job_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn set_job_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: &Job,
        to: JobStatus,
        reason: Option<String>,
        notes: Option<String>,
        changed_by: Uuid,
        changed_by_name: &str,
    ) -> Result<Job, Error> {
        let updated = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(to)
        .fetch_one(&mut **tx)
        .await?;

        let reason = reason.unwrap_or_else(|| format!("Status changed to {}", to.to_str()));

        sqlx::query(
            r#"
            INSERT INTO job_status_history
                (job_id, from_status, to_status, reason, notes, changed_by, changed_by_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(to)
        .bind(reason)
        .bind(notes)
        .bind(changed_by)
        .bind(changed_by_name)
        .execute(&mut **tx)
        .await?;

        Ok(updated)
    }

    async fn set_job_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        tradie_id: Uuid,
        quote_id: Uuid,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET assigned_tradie_id = $2, accepted_quote_id = $3,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(job_id)
        .bind(tradie_id)
        .bind(quote_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn set_job_completion(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        completion_notes: Option<String>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET completed_at = NOW(), completion_notes = $2,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(job_id)
        .bind(completion_notes)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn update_job(
        &self,
        job: &Job,
        data: &UpdateJobDto,
    ) -> Result<Option<Job>, Error> {
        let budget_min = data
            .budget_min
            .and_then(|b| BigDecimal::try_from(b).ok())
            .or_else(|| job.budget_min.clone());
        let budget_max = data
            .budget_max
            .and_then(|b| BigDecimal::try_from(b).ok())
            .or_else(|| job.budget_max.clone());

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET title = $3,
                description = $4,
                category = $5,
                urgency = $6,
                suburb = $7,
                post_code = $8,
                address = $9,
                budget_min = $10,
                budget_max = $11,
                preferred_start_date = $12,
                preferred_end_date = $13,
                is_flexible_timing = $14,
                special_requirements = $15,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(job.version)
        .bind(data.title.as_ref().unwrap_or(&job.title))
        .bind(data.description.as_ref().unwrap_or(&job.description))
        .bind(data.category.unwrap_or(job.category))
        .bind(data.urgency.unwrap_or(job.urgency))
        .bind(data.suburb.as_ref().unwrap_or(&job.suburb))
        .bind(data.post_code.as_ref().unwrap_or(&job.post_code))
        .bind(data.address.as_ref().unwrap_or(&job.address))
        .bind(budget_min)
        .bind(budget_max)
        .bind(data.preferred_start_date.or(job.preferred_start_date))
        .bind(data.preferred_end_date.or(job.preferred_end_date))
        .bind(data.is_flexible_timing.unwrap_or(job.is_flexible_timing))
        .bind(
            data.special_requirements
                .clone()
                .or_else(|| job.special_requirements.clone()),
        )
        .fetch_optional(&mut *tx)
        .await?;

        let updated = match updated {
            Some(j) => j,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        if let Some(removed) = &data.removed_image_ids {
            for image_id in removed {
                sqlx::query(
                    "UPDATE job_images SET is_deleted = TRUE WHERE id = $1 AND job_id = $2",
                )
                .bind(image_id)
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(urls) = &data.image_urls {
            let (max_order, has_main): (Option<i32>, bool) = sqlx::query_as(
                r#"
                SELECT MAX(display_order),
                       COALESCE(BOOL_OR(is_main_image), FALSE)
                FROM job_images
                WHERE job_id = $1 AND is_deleted = FALSE
                "#,
            )
            .bind(job.id)
            .fetch_one(&mut *tx)
            .await?;
            let max_order = max_order.unwrap_or(0);

            for (i, url) in urls.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO job_images
                        (job_id, image_url, image_type, is_main_image, display_order)
                    VALUES ($1, $2, 'problem', $3, $4)
                    "#,
                )
                .bind(job.id)
                .bind(url)
                .bind(!has_main && i == 0)
                .bind(max_order + i as i32 + 1)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn get_job_images(&self, job_id: Uuid) -> Result<Vec<JobImage>, Error> {
        sqlx::query_as::<_, JobImage>(
            r#"
            SELECT * FROM job_images
            WHERE job_id = $1 AND is_deleted = FALSE
            ORDER BY display_order
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_recent_messages(&self, job_id: Uuid, limit: i64) -> Result<Vec<JobMessage>, Error> {
        sqlx::query_as::<_, JobMessage>(
            r#"
            SELECT * FROM job_messages
            WHERE job_id = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_status_history(&self, job_id: Uuid) -> Result<Vec<JobStatusHistory>, Error> {
        sqlx::query_as::<_, JobStatusHistory>(
            r#"
            SELECT * FROM job_status_history
            WHERE job_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_job_message(
        &self,
        job_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        message: &str,
        message_type: MessageType,
        attachment_url: Option<String>,
    ) -> Result<JobMessage, Error> {
        sqlx::query_as::<_, JobMessage>(
            r#"
            INSERT INTO job_messages
                (job_id, sender_id, sender_name, message, message_type, attachment_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(message)
        .bind(message_type)
        .bind(attachment_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn search_jobs(&self, filters: &SearchJobsDto) -> Result<Vec<JobSearchRow>, Error> {
        let min_budget = filters.min_budget.and_then(|b| BigDecimal::try_from(b).ok());
        let max_budget = filters.max_budget.and_then(|b| BigDecimal::try_from(b).ok());

        // Radius filtering and paging happen in the service after distances
        // are computed; the query narrows to active, matching jobs only.
        sqlx::query_as::<_, JobSearchRow>(
            r#"
            SELECT j.*,
                   (SELECT COUNT(*) FROM quotes q
                     WHERE q.job_id = j.id AND q.is_deleted = FALSE) AS quote_count,
                   (SELECT COUNT(*) FROM job_images i
                     WHERE i.job_id = j.id AND i.is_deleted = FALSE) AS image_count
            FROM jobs j
            WHERE j.is_deleted = FALSE
              AND j.status IN ('posted', 'quote_requested')
              AND ($1::service_category[] IS NULL OR j.category = ANY($1))
              AND ($2::job_urgency IS NULL OR j.urgency = $2)
              AND ($3::NUMERIC IS NULL OR j.budget_max >= $3 OR j.budget_max IS NULL)
              AND ($4::NUMERIC IS NULL OR j.budget_min <= $4 OR j.budget_min IS NULL)
              AND ($5::TIMESTAMPTZ IS NULL OR j.preferred_start_date >= $5
                   OR j.preferred_start_date IS NULL)
              AND ($6::TIMESTAMPTZ IS NULL OR j.preferred_start_date <= $6
                   OR j.preferred_start_date IS NULL)
              AND ($7::BOOLEAN IS NULL OR $7 = FALSE
                   OR j.budget_min IS NOT NULL OR j.budget_max IS NOT NULL)
            ORDER BY j.created_at
            "#,
        )
        .bind(filters.categories.as_deref())
        .bind(filters.urgency)
        .bind(min_budget)
        .bind(max_budget)
        .bind(filters.start_date_from)
        .bind(filters.start_date_to)
        .bind(filters.has_budget)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_jobs_by_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE customer_id = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_jobs_by_customer(&self, customer_id: Uuid) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE customer_id = $1 AND is_deleted = FALSE",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn get_jobs_by_tradie(
        &self,
        tradie_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, Error> {
        sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            WHERE j.is_deleted = FALSE
              AND (j.assigned_tradie_id = $1
                   OR EXISTS (SELECT 1 FROM quotes q
                               WHERE q.job_id = j.id AND q.tradie_id = $1
                                 AND q.is_deleted = FALSE))
            ORDER BY j.updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tradie_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_jobs_by_tradie(&self, tradie_id: Uuid) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM jobs j
            WHERE j.is_deleted = FALSE
              AND (j.assigned_tradie_id = $1
                   OR EXISTS (SELECT 1 FROM quotes q
                               WHERE q.job_id = j.id AND q.tradie_id = $1
                                 AND q.is_deleted = FALSE))
            "#,
        )
        .bind(tradie_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

/// Truncated description for search listings.
pub fn summary_preview(description: &str) -> String {
    if description.chars().count() > 200 {
        let truncated: String = description.chars().take(200).collect();
        format!("{truncated}...")
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_descriptions_are_truncated_with_ellipsis() {
        let long = "x".repeat(300);
        let preview = summary_preview(&long);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn short_descriptions_pass_through() {
        assert_eq!(summary_preview("leaky tap"), "leaky tap");
    }
}
