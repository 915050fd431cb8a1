// src/repositories/postgres/analysis.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::models::Analysis;
use crate::repositories::AnalysisRepository;
use crate::Error;

const ANALYSIS_COLUMNS: &str = r#"
    analysis_id, user_id, address, package_name, analysis_content, analysis_model,
    api_response, agent_description, payment_intent_id, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PostgresAnalysisRepository {
    pool: Pool<Postgres>,
}

impl PostgresAnalysisRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisRepository for PostgresAnalysisRepository {
    async fn create(&self, a: &Analysis) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO property_analyses (
                analysis_id, user_id, address, package_name, analysis_content,
                analysis_model, api_response, agent_description, payment_intent_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
            .bind(a.analysis_id)
            .bind(a.user_id)
            .bind(&a.address)
            .bind(&a.package_name)
            .bind(&a.analysis_content)
            .bind(&a.analysis_model)
            .bind(&a.api_response)
            .bind(&a.agent_description)
            .bind(&a.payment_intent_id)
            .bind(a.created_at)
            .bind(a.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, analysis_id: Uuid) -> Result<Option<Analysis>, Error> {
        let sql = format!("SELECT {ANALYSIS_COLUMNS} FROM property_analyses WHERE analysis_id = $1");
        let row = sqlx::query_as::<_, Analysis>(&sql)
            .bind(analysis_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Option<Analysis>, Error> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM property_analyses WHERE analysis_id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, Analysis>(&sql)
            .bind(analysis_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_address(&self, user_id: Uuid, address: &str) -> Result<Option<Analysis>, Error> {
        let sql = format!(
            r#"
            SELECT {ANALYSIS_COLUMNS}
            FROM property_analyses
            WHERE user_id = $1 AND address = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, Analysis>(&sql)
            .bind(user_id)
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Analysis>, Error> {
        // LIMIT NULL means no limit in Postgres
        let sql = format!(
            r#"
            SELECT {ANALYSIS_COLUMNS}
            FROM property_analyses
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, Analysis>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM property_analyses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn update_content(
        &self,
        user_id: Uuid,
        analysis_id: Uuid,
        content: &str,
    ) -> Result<Option<DateTime<Utc>>, Error> {
        let row = sqlx::query(
            r#"
            UPDATE property_analyses
            SET analysis_content = $1,
                updated_at = $2
            WHERE analysis_id = $3 AND user_id = $4
            RETURNING updated_at
            "#,
        )
            .bind(content)
            .bind(Utc::now())
            .bind(analysis_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(r.try_get::<DateTime<Utc>, _>("updated_at")?)),
            None => Ok(None),
        }
    }

    async fn delete_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM property_analyses WHERE analysis_id = $1 AND user_id = $2")
            .bind(analysis_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
