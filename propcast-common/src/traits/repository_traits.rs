use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{AgentProfile, Analysis, NewShare, Share, ShareListing, ShareOutcome, User, ViewEvent};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), Error>;
    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, Error>;
    async fn update(&self, user: &User) -> Result<(), Error>;
    async fn delete(&self, user_id: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn create(&self, profile: &AgentProfile) -> Result<(), Error>;
    async fn get(&self, user_id: Uuid) -> Result<Option<AgentProfile>, Error>;
    async fn update(&self, profile: &AgentProfile) -> Result<(), Error>;
}

/// Analyses are always read and written on behalf of their owner, except
/// for [`AnalysisRepository::get`], which backs public share resolution.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn create(&self, analysis: &Analysis) -> Result<(), Error>;
    async fn get(&self, analysis_id: Uuid) -> Result<Option<Analysis>, Error>;
    async fn get_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Option<Analysis>, Error>;
    /// Most recently created analysis of `user_id` with exactly this address.
    async fn find_by_address(&self, user_id: Uuid, address: &str) -> Result<Option<Analysis>, Error>;
    /// Newest first. `limit = None` returns everything.
    async fn list_for_user(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Analysis>, Error>;
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, Error>;
    /// Returns the new `updated_at`, or `None` when the analysis is not the user's.
    async fn update_content(
        &self,
        user_id: Uuid,
        analysis_id: Uuid,
        content: &str,
    ) -> Result<Option<DateTime<Utc>>, Error>;
    /// Returns false when nothing was deleted.
    async fn delete_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait ShareRepository: Send + Sync {
    /// Insert, or bump `times_shared` and overwrite message + link on the
    /// existing (analysis, recipient) row. Atomic.
    async fn upsert_for_recipient(&self, share: &NewShare) -> Result<ShareOutcome, Error>;

    /// Insert, or bump `times_shared` and overwrite the message on the
    /// existing (analysis, link) link-share row. Atomic.
    async fn upsert_for_link(&self, share: &NewShare) -> Result<ShareOutcome, Error>;

    async fn get(&self, share_id: Uuid) -> Result<Option<Share>, Error>;
    async fn find_by_token(&self, token: &str) -> Result<Option<Share>, Error>;
    /// Most recently shared row whose link contains `fragment`.
    async fn find_by_link_fragment(&self, fragment: &str) -> Result<Option<Share>, Error>;
    async fn find_by_link(&self, link: &str) -> Result<Option<Share>, Error>;

    /// Ordered by `last_shared_at` descending.
    async fn list_for_analysis(&self, analysis_id: Uuid) -> Result<Vec<Share>, Error>;
    async fn list_all(&self) -> Result<Vec<ShareListing>, Error>;

    /// Appends `event` and bumps `times_viewed` / `last_viewed_at`, all in
    /// one transaction holding the share row lock. With `dedupe_window`, the
    /// counter only moves when the event's origin has no view of this share
    /// within the window. Returns the share and whether the view counted;
    /// `None` when the share no longer exists.
    async fn record_view(
        &self,
        event: &ViewEvent,
        dedupe_window: Option<Duration>,
    ) -> Result<Option<(Share, bool)>, Error>;

    async fn list_views(&self, share_id: Uuid) -> Result<Vec<ViewEvent>, Error>;

    /// Zeroes view counters of every share under `analysis_id` and deletes
    /// their view events. Returns the number of shares touched.
    async fn reset_views(&self, analysis_id: Uuid) -> Result<u64, Error>;
}
