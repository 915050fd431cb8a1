// File: propcast-core/src/services/share_registry.rs

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::integrations::templates::share_email;
use crate::integrations::Mailer;
use crate::models::{Analysis, NewShare, Recipient, ShareListing, ShareOutcome, ShareStats, User};
use crate::repositories::{AnalysisRepository, ShareRepository};
use crate::Error;

/// Package name and model stamped on analyses created implicitly by a share.
pub const PLACEHOLDER_PACKAGE: &str = "Shared Analysis";
pub const PLACEHOLDER_MODEL: &str = "shared";

/// Body of a share request as the web client sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub analysis_id: Option<Uuid>,
    pub email: Option<String>,
    pub property_address: Option<String>,
    pub analysis_content: Option<String>,
    pub share_message: Option<String>,
    pub share_link: Option<String>,
    pub shared_by: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Records shares and notifies e-mail recipients.
pub struct ShareRegistry {
    shares: Arc<dyn ShareRepository>,
    analyses: Arc<dyn AnalysisRepository>,
    mailer: Arc<dyn Mailer>,
}

impl ShareRegistry {
    pub fn new(
        shares: Arc<dyn ShareRepository>,
        analyses: Arc<dyn AnalysisRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { shares, analyses, mailer }
    }

    /// Creates the share for (analysis, recipient), or bumps the existing
    /// one. E-mail recipients are notified; a failed delivery is logged and
    /// does not fail the share.
    pub async fn create_or_update_share(
        &self,
        analysis: &Analysis,
        recipient: Recipient,
        sharer: &User,
        sharer_name: &str,
        message: &str,
        link: &str,
        content_for_mail: Option<&str>,
    ) -> Result<ShareOutcome, Error> {
        let new = NewShare {
            analysis_id: analysis.analysis_id,
            recipient: recipient.clone(),
            shared_by: sharer.user_id,
            shared_by_name: sharer_name.to_string(),
            message: message.to_string(),
            link: link.to_string(),
        };

        let outcome = match &recipient {
            Recipient::Link => self.shares.upsert_for_link(&new).await?,
            Recipient::Email(_) => self.shares.upsert_for_recipient(&new).await?,
        };
        debug!(
            "share {} for analysis {} (created={}, times_shared={})",
            outcome.share.share_id, analysis.analysis_id, outcome.created, outcome.share.times_shared
        );

        if let Recipient::Email(address) = &recipient {
            let mail = share_email(
                &analysis.address,
                sharer_name,
                message,
                content_for_mail.unwrap_or(&analysis.analysis_content),
                link,
            );
            if !self.mailer.send(address, &mail.subject, &mail.html).await {
                warn!("Failed to send share e-mail to {}", address);
            }
        }

        Ok(outcome)
    }

    /// Validates a client share request, finds (or creates) the analysis it
    /// refers to and records the share.
    pub async fn share_analysis(&self, user: &User, req: &ShareRequest) -> Result<ShareOutcome, Error> {
        let (Some(email), Some(address)) = (non_blank(&req.email), non_blank(&req.property_address)) else {
            return Err(Error::Validation("Email and property address are required.".into()));
        };

        let analysis = match req.analysis_id {
            Some(id) => self
                .analyses
                .get_for_user(user.user_id, id)
                .await?
                .ok_or_else(|| Error::NotFound("Analysis not found.".into()))?,
            None => match self.analyses.find_by_address(user.user_id, address).await? {
                Some(existing) => existing,
                None => {
                    let mut placeholder = Analysis::new(
                        user.user_id,
                        address,
                        req.analysis_content.as_deref().unwrap_or_default(),
                    );
                    placeholder.package_name = PLACEHOLDER_PACKAGE.to_string();
                    placeholder.analysis_model = PLACEHOLDER_MODEL.to_string();
                    self.analyses.create(&placeholder).await?;
                    info!(
                        "Created placeholder analysis {} for shared address '{}'",
                        placeholder.analysis_id, address
                    );
                    placeholder
                }
            },
        };

        let sharer_name = non_blank(&req.shared_by)
            .map(str::to_string)
            .unwrap_or_else(|| user.display_name());

        self.create_or_update_share(
            &analysis,
            Recipient::parse(email),
            user,
            &sharer_name,
            req.share_message.as_deref().unwrap_or_default(),
            req.share_link.as_deref().unwrap_or_default(),
            non_blank(&req.analysis_content),
        )
            .await
    }

    pub async fn get_stats(&self, analysis_id: Uuid) -> Result<ShareStats, Error> {
        let shares = self.shares.list_for_analysis(analysis_id).await?;
        let stats = ShareStats::from_shares(&shares);
        info!(
            "Share stats for {}: total_shares={}, total_views={}",
            analysis_id, stats.total_shares, stats.total_views
        );
        Ok(stats)
    }

    /// Stats for the caller's most recent analysis at `address`; zeroed when
    /// there is none.
    pub async fn get_stats_for_address(&self, user: &User, address: &str) -> Result<ShareStats, Error> {
        if address.trim().is_empty() {
            return Err(Error::Validation("Property address is required.".into()));
        }
        match self.analyses.find_by_address(user.user_id, address).await? {
            Some(analysis) => self.get_stats(analysis.analysis_id).await,
            None => Ok(ShareStats::default()),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<ShareListing>, Error> {
        self.shares.list_all().await
    }
}

