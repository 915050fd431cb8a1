// File: propcast-core/src/services/view_tracker.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Share, ViewEvent};
use crate::repositories::{AnalysisRepository, ShareRepository};
use crate::services::share_resolver::ShareResolver;
use crate::Error;

/// When a resolved access moves `times_viewed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewCountPolicy {
    /// Every resolved access counts, reloads included.
    #[default]
    EveryRequest,
    /// An origin counts at most once per `window` for a given share. The
    /// view event is appended either way.
    DedupeByOrigin { window: Duration },
}

impl ViewCountPolicy {
    /// `0` seconds means count every request.
    pub fn from_window_secs(secs: u64) -> Self {
        if secs == 0 {
            ViewCountPolicy::EveryRequest
        } else {
            ViewCountPolicy::DedupeByOrigin {
                window: Duration::seconds(secs.min(i64::MAX as u64) as i64),
            }
        }
    }
}

/// What a recipient sees when opening a shared link.
#[derive(Debug, Clone, Serialize)]
pub struct SharedView {
    pub address: String,
    pub content: String,
    pub agent_description: Option<String>,
    #[serde(rename = "sharedBy")]
    pub shared_by: String,
    #[serde(rename = "shareMessage")]
    pub share_message: String,
    #[serde(rename = "sharedAt")]
    pub shared_at: DateTime<Utc>,
    #[serde(rename = "timesViewed")]
    pub times_viewed: i32,
}

pub struct ViewTracker {
    shares: Arc<dyn ShareRepository>,
    analyses: Arc<dyn AnalysisRepository>,
    resolver: ShareResolver,
    policy: ViewCountPolicy,
}

impl ViewTracker {
    pub fn new(
        shares: Arc<dyn ShareRepository>,
        analyses: Arc<dyn AnalysisRepository>,
        resolver: ShareResolver,
        policy: ViewCountPolicy,
    ) -> Self {
        Self { shares, analyses, resolver, policy }
    }

    pub fn policy(&self) -> ViewCountPolicy {
        self.policy
    }

    fn dedupe_window(&self) -> Option<Duration> {
        match self.policy {
            ViewCountPolicy::EveryRequest => None,
            ViewCountPolicy::DedupeByOrigin { window } => Some(window),
        }
    }

    /// Appends a view event and, subject to the policy, bumps the counter.
    /// The policy check and both writes happen in one transaction. Events
    /// without an origin always count.
    pub async fn record_view(
        &self,
        share: &Share,
        origin: Option<&str>,
        client_agent: Option<&str>,
    ) -> Result<(Share, ViewEvent), Error> {
        let event = ViewEvent::new(share.share_id, origin, client_agent);
        let (updated, count) = self
            .shares
            .record_view(&event, self.dedupe_window())
            .await?
            .ok_or_else(|| Error::NotFound("Shared analysis not found.".into()))?;

        info!(
            "View recorded for share {} (counted={}, times_viewed={})",
            updated.share_id, count, updated.times_viewed
        );
        Ok((updated, event))
    }

    /// Zeroes view counters under `analysis_id` and drops their events.
    pub async fn reset(&self, analysis_id: Uuid) -> Result<u64, Error> {
        let reset = self.shares.reset_views(analysis_id).await?;
        warn!("Reset view stats of {} share(s) for analysis {}", reset, analysis_id);
        Ok(reset)
    }

    /// Resolves `identifier`, records the view and returns the analysis as
    /// shown to the recipient.
    pub async fn view_shared(
        &self,
        identifier: &str,
        request_host: Option<&str>,
        origin: Option<&str>,
        client_agent: Option<&str>,
    ) -> Result<SharedView, Error> {
        let share = self
            .resolver
            .resolve(identifier, request_host)
            .await?
            .ok_or_else(|| Error::NotFound("Shared analysis not found.".into()))?;

        let analysis = self
            .analyses
            .get(share.analysis_id)
            .await?
            .ok_or_else(|| Error::NotFound("Shared analysis not found.".into()))?;

        let (share, _) = self.record_view(&share, origin, client_agent).await?;

        Ok(SharedView {
            address: analysis.address,
            content: analysis.analysis_content,
            agent_description: analysis.agent_description,
            shared_by: share.shared_by_name,
            share_message: share.share_message,
            shared_at: share.first_shared_at,
            times_viewed: share.times_viewed,
        })
    }
}
