use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::types::BigDecimal;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::dtos::quotedtos::CreateQuoteDto;
use crate::models::quotemodel::*;

#[async_trait]
pub trait QuoteExt {
    /// Inserts the quote and its items inside the caller's transaction.
    /// Costs are recomputed here: total = materials + labour, line totals =
    /// quantity x unit price, expiry = now + 7 days, status Submitted.
    async fn insert_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tradie_id: Uuid,
        tradie_business_name: &str,
        data: &CreateQuoteDto,
    ) -> Result<Quote, Error>;

    async fn get_quote_by_id(&self, quote_id: Uuid) -> Result<Option<Quote>, Error>;

    async fn get_quote_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
    ) -> Result<Option<Quote>, Error>;

    async fn get_quote_items(&self, quote_id: Uuid) -> Result<Vec<QuoteItem>, Error>;

    async fn get_quotes_by_job(&self, job_id: Uuid) -> Result<Vec<Quote>, Error>;

    async fn get_quotes_by_tradie(
        &self,
        tradie_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Quote>, Error>;

    async fn count_quotes_by_tradie(&self, tradie_id: Uuid) -> Result<i64, Error>;

    async fn has_tradie_quoted(&self, tradie_id: Uuid, job_id: Uuid) -> Result<bool, Error>;

    /// Customer-response status write. Stamps responded/viewed timestamps
    /// and copies notes into rejection_reason on Rejected.
    async fn set_quote_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
        status: QuoteStatus,
        notes: Option<String>,
    ) -> Result<Quote, Error>;

    async fn accept_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
    ) -> Result<Quote, Error>;

    /// Rejects every other Submitted quote on the job. Returns how many
    /// quotes were turned away.
    async fn reject_competing_quotes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        accepted_quote_id: Uuid,
        reason: &str,
    ) -> Result<u64, Error>;

    async fn withdraw_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
        reason: &str,
    ) -> Result<Quote, Error>;

    /// The expiry sweep: flips Submitted quotes past their expiry to
    /// Expired. Invoked by the external batch collaborator.
    async fn expire_due_quotes(&self) -> Result<u64, Error>;
}

#[async_trait]
impl QuoteExt for DBClient {
    async fn insert_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tradie_id: Uuid,
        tradie_business_name: &str,
        data: &CreateQuoteDto,
    ) -> Result<Quote, Error> {
        let materials_cost =
            BigDecimal::try_from(data.materials_cost).unwrap_or_else(|_| BigDecimal::from(0));
        let labour_cost =
            BigDecimal::try_from(data.labour_cost).unwrap_or_else(|_| BigDecimal::from(0));
        let total_cost = quote_total(&materials_cost, &labour_cost);
        let expires_at = Utc::now() + Duration::days(QUOTE_VALIDITY_DAYS);

        let quote = sqlx::query_as::<_, Quote>(
            r#"
            INSERT INTO quotes
                (job_id, tradie_id, tradie_business_name, status, materials_cost,
                 labour_cost, total_cost, estimated_duration_hours,
                 proposed_start_date, proposed_end_date, description,
                 materials_included, methodology, warranty_offered, expires_at)
            VALUES ($1, $2, $3, 'submitted', $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(data.job_id)
        .bind(tradie_id)
        .bind(tradie_business_name)
        .bind(&materials_cost)
        .bind(&labour_cost)
        .bind(&total_cost)
        .bind(data.estimated_duration_hours)
        .bind(data.proposed_start_date)
        .bind(data.proposed_end_date)
        .bind(&data.description)
        .bind(&data.materials_included)
        .bind(&data.methodology)
        .bind(&data.warranty_offered)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await?;

        for item in &data.items {
            let unit_price =
                BigDecimal::try_from(item.unit_price).unwrap_or_else(|_| BigDecimal::from(0));
            let total_price = line_total(item.quantity, &unit_price);

            sqlx::query(
                r#"
                INSERT INTO quote_items
                    (quote_id, description, quantity, unit_price, total_price, notes)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(quote.id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(&unit_price)
            .bind(&total_price)
            .bind(&item.notes)
            .execute(&mut **tx)
            .await?;
        }

        Ok(quote)
    }

    async fn get_quote_by_id(&self, quote_id: Uuid) -> Result<Option<Quote>, Error> {
        sqlx::query_as::<_, Quote>(
            "SELECT * FROM quotes WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(quote_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_quote_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
    ) -> Result<Option<Quote>, Error> {
        sqlx::query_as::<_, Quote>(
            "SELECT * FROM quotes WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(quote_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn get_quote_items(&self, quote_id: Uuid) -> Result<Vec<QuoteItem>, Error> {
        sqlx::query_as::<_, QuoteItem>(
            r#"
            SELECT * FROM quote_items
            WHERE quote_id = $1 AND is_deleted = FALSE
            ORDER BY created_at
            "#,
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_quotes_by_job(&self, job_id: Uuid) -> Result<Vec<Quote>, Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            SELECT * FROM quotes
            WHERE job_id = $1 AND is_deleted = FALSE
            ORDER BY total_cost
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_quotes_by_tradie(
        &self,
        tradie_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Quote>, Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            SELECT * FROM quotes
            WHERE tradie_id = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tradie_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_quotes_by_tradie(&self, tradie_id: Uuid) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM quotes WHERE tradie_id = $1 AND is_deleted = FALSE",
        )
        .bind(tradie_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn has_tradie_quoted(&self, tradie_id: Uuid, job_id: Uuid) -> Result<bool, Error> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM quotes
                WHERE tradie_id = $1 AND job_id = $2 AND is_deleted = FALSE
            )
            "#,
        )
        .bind(tradie_id)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn set_quote_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
        status: QuoteStatus,
        notes: Option<String>,
    ) -> Result<Quote, Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quotes
            SET status = $2,
                customer_responded_at = NOW(),
                customer_viewed_at = CASE WHEN $2 = 'viewed'::quote_status
                                          THEN NOW() ELSE customer_viewed_at END,
                customer_notes = COALESCE($3, customer_notes),
                rejection_reason = CASE WHEN $2 = 'rejected'::quote_status
                                        THEN $3 ELSE rejection_reason END,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(quote_id)
        .bind(status)
        .bind(notes)
        .fetch_one(&mut **tx)
        .await
    }

    async fn accept_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
    ) -> Result<Quote, Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quotes
            SET status = 'accepted', customer_responded_at = NOW(),
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(quote_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn reject_competing_quotes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        accepted_quote_id: Uuid,
        reason: &str,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE quotes
            SET status = 'rejected', rejection_reason = $3,
                customer_responded_at = NOW(),
                version = version + 1, updated_at = NOW()
            WHERE job_id = $1 AND id != $2 AND status = 'submitted'
              AND is_deleted = FALSE
            "#,
        )
        .bind(job_id)
        .bind(accepted_quote_id)
        .bind(reason)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn withdraw_quote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        quote_id: Uuid,
        reason: &str,
    ) -> Result<Quote, Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quotes
            SET status = 'withdrawn', rejection_reason = $2,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(quote_id)
        .bind(reason)
        .fetch_one(&mut **tx)
        .await
    }

    async fn expire_due_quotes(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE quotes
            SET status = 'expired', version = version + 1, updated_at = NOW()
            WHERE status = 'submitted' AND expires_at < NOW()
              AND is_deleted = FALSE
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
