// src/repositories/postgres/profile.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::AgentProfile;
use crate::repositories::ProfileRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresProfileRepository {
    pool: Pool<Postgres>,
}

impl PostgresProfileRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn create(&self, p: &AgentProfile) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO agent_profiles (
                user_id, phone, company_name, license_number, years_experience,
                awards, specialty, shortest_sale, highest_sale, avg_days_on_market,
                mission, value_proposition, selling_style,
                testimonial_1, testimonial_2, testimonial_3, community_ties,
                headshot_url, logo_url, profile_completed, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
            .bind(p.user_id)
            .bind(&p.phone)
            .bind(&p.company_name)
            .bind(&p.license_number)
            .bind(&p.years_experience)
            .bind(&p.awards)
            .bind(&p.specialty)
            .bind(&p.shortest_sale)
            .bind(&p.highest_sale)
            .bind(&p.avg_days_on_market)
            .bind(&p.mission)
            .bind(&p.value_proposition)
            .bind(&p.selling_style)
            .bind(&p.testimonial_1)
            .bind(&p.testimonial_2)
            .bind(&p.testimonial_3)
            .bind(&p.community_ties)
            .bind(&p.headshot_url)
            .bind(&p.logo_url)
            .bind(p.profile_completed)
            .bind(p.created_at)
            .bind(p.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<AgentProfile>, Error> {
        let row = sqlx::query_as::<_, AgentProfile>(
            r#"
            SELECT user_id, phone, company_name, license_number, years_experience,
                   awards, specialty, shortest_sale, highest_sale, avg_days_on_market,
                   mission, value_proposition, selling_style,
                   testimonial_1, testimonial_2, testimonial_3, community_ties,
                   headshot_url, logo_url, profile_completed, created_at, updated_at
            FROM agent_profiles
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, p: &AgentProfile) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE agent_profiles
            SET phone = $1,
                company_name = $2,
                license_number = $3,
                years_experience = $4,
                awards = $5,
                specialty = $6,
                shortest_sale = $7,
                highest_sale = $8,
                avg_days_on_market = $9,
                mission = $10,
                value_proposition = $11,
                selling_style = $12,
                testimonial_1 = $13,
                testimonial_2 = $14,
                testimonial_3 = $15,
                community_ties = $16,
                headshot_url = $17,
                logo_url = $18,
                profile_completed = $19,
                updated_at = $20
            WHERE user_id = $21
            "#,
        )
            .bind(&p.phone)
            .bind(&p.company_name)
            .bind(&p.license_number)
            .bind(&p.years_experience)
            .bind(&p.awards)
            .bind(&p.specialty)
            .bind(&p.shortest_sale)
            .bind(&p.highest_sale)
            .bind(&p.avg_days_on_market)
            .bind(&p.mission)
            .bind(&p.value_proposition)
            .bind(&p.selling_style)
            .bind(&p.testimonial_1)
            .bind(&p.testimonial_2)
            .bind(&p.testimonial_3)
            .bind(&p.community_ties)
            .bind(&p.headshot_url)
            .bind(&p.logo_url)
            .bind(p.profile_completed)
            .bind(Utc::now())
            .bind(p.user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
