// File: propcast-core/src/services/analysis_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{Analysis, NewAnalysis};
use crate::repositories::AnalysisRepository;
use crate::Error;

pub const RECENT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct RecentAnalyses {
    pub analyses: Vec<Analysis>,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub address: String,
    pub package_name: String,
    pub created_at: DateTime<Utc>,
    pub payment_intent_id: Option<String>,
    pub status: &'static str,
}

fn not_found() -> Error {
    Error::NotFound("Analysis not found.".into())
}

/// Owner-scoped access to saved analyses.
pub struct AnalysisService {
    analyses: Arc<dyn AnalysisRepository>,
}

impl AnalysisService {
    pub fn new(analyses: Arc<dyn AnalysisRepository>) -> Self {
        Self { analyses }
    }

    pub async fn save(&self, user_id: Uuid, input: NewAnalysis) -> Result<Analysis, Error> {
        let address = input.address.as_deref().map(str::trim).unwrap_or_default();
        let content = input.analysis_content.as_deref().unwrap_or_default();
        if address.is_empty() || content.is_empty() {
            return Err(Error::Validation("Address and analysis content are required.".into()));
        }

        let mut analysis = Analysis::new(user_id, address, content);
        if let Some(pkg) = input.package_name.filter(|p| !p.is_empty()) {
            analysis.package_name = pkg;
        }
        if let Some(model) = input.analysis_model.filter(|m| !m.is_empty()) {
            analysis.analysis_model = model;
        }
        if let Some(resp) = input.api_response.filter(|v| !v.is_null()) {
            analysis.api_response = resp;
        }
        analysis.agent_description = input.agent_description.filter(|d| !d.is_empty());
        analysis.payment_intent_id = input.payment_intent_id.filter(|p| !p.is_empty());

        self.analyses.create(&analysis).await?;
        info!("Saved analysis {} for user {}", analysis.analysis_id, user_id);
        Ok(analysis)
    }

    pub async fn recent(&self, user_id: Uuid) -> Result<RecentAnalyses, Error> {
        let analyses = self.analyses.list_for_user(user_id, Some(RECENT_LIMIT)).await?;
        let total_count = self.analyses.count_for_user(user_id).await?;
        Ok(RecentAnalyses { analyses, total_count })
    }

    pub async fn get(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Analysis, Error> {
        self.analyses
            .get_for_user(user_id, analysis_id)
            .await?
            .ok_or_else(not_found)
    }

    /// `None` content leaves the analysis unchanged; the current
    /// `updated_at` is returned either way.
    pub async fn update_content(
        &self,
        user_id: Uuid,
        analysis_id: Uuid,
        content: Option<&str>,
    ) -> Result<DateTime<Utc>, Error> {
        match content {
            Some(text) => self
                .analyses
                .update_content(user_id, analysis_id, text)
                .await?
                .ok_or_else(not_found),
            None => Ok(self.get(user_id, analysis_id).await?.updated_at),
        }
    }

    pub async fn delete(&self, user_id: Uuid, analysis_id: Uuid) -> Result<(), Error> {
        if self.analyses.delete_for_user(user_id, analysis_id).await? {
            info!("Deleted analysis {} of user {}", analysis_id, user_id);
            Ok(())
        } else {
            Err(not_found())
        }
    }

    pub async fn find_by_address(&self, user_id: Uuid, address: &str) -> Result<Option<Analysis>, Error> {
        self.analyses.find_by_address(user_id, address).await
    }

    pub async fn payment_history(&self, user_id: Uuid) -> Result<Vec<PaymentRecord>, Error> {
        let analyses = self.analyses.list_for_user(user_id, None).await?;
        Ok(analyses
            .iter()
            .map(|a| PaymentRecord {
                id: a.analysis_id,
                address: a.address.clone(),
                package_name: a.package_name.clone(),
                created_at: a.created_at,
                payment_intent_id: a.payment_reference(),
                status: a.payment_status(),
            })
            .collect())
    }
}
