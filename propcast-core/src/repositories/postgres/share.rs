// src/repositories/postgres/share.rs

use async_trait::async_trait;
use chrono::Duration;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Pool, Postgres, Row};
use uuid::Uuid;

use crate::models::{NewShare, Share, ShareListing, ShareOutcome, ViewEvent};
use crate::repositories::ShareRepository;
use crate::Error;

const SHARE_COLUMNS: &str = r#"
    share_id, analysis_id, shared_by, shared_by_name, recipient_email, share_message,
    share_link, share_token, times_shared, times_viewed,
    first_shared_at, last_shared_at, last_viewed_at
"#;

#[derive(Clone)]
pub struct PostgresShareRepository {
    pool: Pool<Postgres>,
}

impl PostgresShareRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Shared INSERT for both upserts; `conflict` is the ON CONFLICT clause
    /// matching one of the two partial unique indexes.
    async fn upsert(&self, new: &NewShare, conflict: &str) -> Result<ShareOutcome, Error> {
        let fresh = new.to_share();
        let sql = format!(
            r#"
            INSERT INTO analysis_shares (
                share_id, analysis_id, shared_by, shared_by_name, recipient_email,
                share_message, share_link, share_token, times_shared, times_viewed,
                first_shared_at, last_shared_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, 0, $9, $9)
            {conflict}
            RETURNING {SHARE_COLUMNS}, (xmax = 0) AS inserted
            "#
        );

        let row = sqlx::query(&sql)
            .bind(fresh.share_id)
            .bind(fresh.analysis_id)
            .bind(fresh.shared_by)
            .bind(&fresh.shared_by_name)
            .bind(&fresh.recipient_email)
            .bind(&fresh.share_message)
            .bind(&fresh.share_link)
            .bind(&fresh.share_token)
            .bind(fresh.last_shared_at)
            .fetch_one(&self.pool)
            .await?;

        outcome_from_row(&row)
    }

    async fn fetch_one(&self, filter: &str, value: &str) -> Result<Option<Share>, Error> {
        let sql = format!(
            r#"
            SELECT {SHARE_COLUMNS}
            FROM analysis_shares
            WHERE {filter}
            ORDER BY last_shared_at DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, Share>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

fn outcome_from_row(row: &PgRow) -> Result<ShareOutcome, Error> {
    Ok(ShareOutcome {
        share: Share::from_row(row)?,
        created: row.try_get("inserted")?,
    })
}

#[async_trait]
impl ShareRepository for PostgresShareRepository {
    async fn upsert_for_recipient(&self, share: &NewShare) -> Result<ShareOutcome, Error> {
        self.upsert(
            share,
            r#"
            ON CONFLICT (analysis_id, recipient_email) WHERE recipient_email <> 'link-share'
            DO UPDATE SET times_shared   = analysis_shares.times_shared + 1,
                          share_message  = EXCLUDED.share_message,
                          share_link     = EXCLUDED.share_link,
                          share_token    = EXCLUDED.share_token,
                          last_shared_at = EXCLUDED.last_shared_at
            "#,
        )
            .await
    }

    async fn upsert_for_link(&self, share: &NewShare) -> Result<ShareOutcome, Error> {
        self.upsert(
            share,
            r#"
            ON CONFLICT (analysis_id, share_link) WHERE recipient_email = 'link-share'
            DO UPDATE SET times_shared   = analysis_shares.times_shared + 1,
                          share_message  = EXCLUDED.share_message,
                          last_shared_at = EXCLUDED.last_shared_at
            "#,
        )
            .await
    }

    async fn get(&self, share_id: Uuid) -> Result<Option<Share>, Error> {
        let sql = format!("SELECT {SHARE_COLUMNS} FROM analysis_shares WHERE share_id = $1");
        let row = sqlx::query_as::<_, Share>(&sql)
            .bind(share_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Share>, Error> {
        self.fetch_one("share_token = $1", token).await
    }

    async fn find_by_link_fragment(&self, fragment: &str) -> Result<Option<Share>, Error> {
        // strpos instead of LIKE so '%' and '_' in the identifier match literally
        self.fetch_one("strpos(share_link, $1) > 0", fragment).await
    }

    async fn find_by_link(&self, link: &str) -> Result<Option<Share>, Error> {
        self.fetch_one("share_link = $1", link).await
    }

    async fn list_for_analysis(&self, analysis_id: Uuid) -> Result<Vec<Share>, Error> {
        let sql = format!(
            r#"
            SELECT {SHARE_COLUMNS}
            FROM analysis_shares
            WHERE analysis_id = $1
            ORDER BY last_shared_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, Share>(&sql)
            .bind(analysis_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<ShareListing>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT s.share_id, s.analysis_id, s.shared_by, s.shared_by_name, s.recipient_email,
                   s.share_message, s.share_link, s.share_token, s.times_shared, s.times_viewed,
                   s.first_shared_at, s.last_shared_at, s.last_viewed_at,
                   a.address
            FROM analysis_shares s
            JOIN property_analyses a ON a.analysis_id = s.analysis_id
            ORDER BY s.last_shared_at DESC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(ShareListing {
                share: Share::from_row(&r)?,
                address: r.try_get("address")?,
            });
        }
        Ok(out)
    }

    async fn record_view(
        &self,
        event: &ViewEvent,
        dedupe_window: Option<Duration>,
    ) -> Result<Option<(Share, bool)>, Error> {
        let mut tx = self.pool.begin().await?;

        // concurrent views of one share serialize on this lock
        let sql = format!("SELECT {SHARE_COLUMNS} FROM analysis_shares WHERE share_id = $1 FOR UPDATE");
        let Some(share) = sqlx::query_as::<_, Share>(&sql)
            .bind(event.share_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let count = match (dedupe_window, event.ip_address.as_deref()) {
            (Some(window), Some(origin)) => {
                let row = sqlx::query(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM shared_analysis_views
                        WHERE share_id = $1 AND ip_address = $2 AND viewed_at > $3
                    ) AS seen
                    "#,
                )
                    .bind(event.share_id)
                    .bind(origin)
                    .bind(event.viewed_at - window)
                    .fetch_one(&mut *tx)
                    .await?;
                !row.try_get::<bool, _>("seen")?
            }
            _ => true,
        };

        let share = if count {
            let sql = format!(
                r#"
                UPDATE analysis_shares
                SET times_viewed = times_viewed + 1,
                    last_viewed_at = $2
                WHERE share_id = $1
                RETURNING {SHARE_COLUMNS}
                "#
            );
            sqlx::query_as::<_, Share>(&sql)
                .bind(event.share_id)
                .bind(event.viewed_at)
                .fetch_one(&mut *tx)
                .await?
        } else {
            share
        };

        sqlx::query(
            r#"
            INSERT INTO shared_analysis_views (view_id, share_id, viewed_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(event.view_id)
            .bind(event.share_id)
            .bind(event.viewed_at)
            .bind(&event.ip_address)
            .bind(&event.user_agent)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((share, count)))
    }

    async fn list_views(&self, share_id: Uuid) -> Result<Vec<ViewEvent>, Error> {
        let rows = sqlx::query_as::<_, ViewEvent>(
            r#"
            SELECT view_id, share_id, viewed_at, ip_address, user_agent
            FROM shared_analysis_views
            WHERE share_id = $1
            ORDER BY viewed_at DESC
            "#,
        )
            .bind(share_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn reset_views(&self, analysis_id: Uuid) -> Result<u64, Error> {
        let mut tx = self.pool.begin().await?;

        let reset = sqlx::query(
            r#"
            UPDATE analysis_shares
            SET times_viewed = 0,
                last_viewed_at = NULL
            WHERE analysis_id = $1
            "#,
        )
            .bind(analysis_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            r#"
            DELETE FROM shared_analysis_views v
            USING analysis_shares s
            WHERE v.share_id = s.share_id
              AND s.analysis_id = $1
            "#,
        )
            .bind(analysis_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reset)
    }
}
