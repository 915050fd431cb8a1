// File: propcast-core/src/test_utils/memory.rs
//
// In-memory stand-ins for the repositories and outbound clients so service
// logic can be exercised without Postgres or network access. The share
// store mirrors the partial-unique-index upsert semantics of the SQL
// implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::http::{HttpClient, HttpResponse};
use crate::integrations::Mailer;
use crate::models::{
    AgentProfile, Analysis, NewShare, Recipient, Share, ShareListing, ShareOutcome, User, ViewEvent,
};
use crate::repositories::{AnalysisRepository, ProfileRepository, ShareRepository, UserRepository};
use crate::Error;

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, AgentProfile>,
    analyses: HashMap<Uuid, Analysis>,
    shares: Vec<Share>,
    views: Vec<ViewEvent>,
}

/// One store implementing every repository trait, so deletes cascade the
/// way the foreign keys do in Postgres.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn share_count(&self) -> usize {
        guard(&self.state).shares.len()
    }

    pub fn view_count(&self) -> usize {
        guard(&self.state).views.len()
    }

    pub fn shares(&self) -> Vec<Share> {
        guard(&self.state).shares.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> Result<(), Error> {
        let mut st = guard(&self.state);
        if st.users.values().any(|u| u.username == user.username) {
            return Err(Error::Conflict("Username already exists.".into()));
        }
        if st.users.values().any(|u| u.email == user.email) {
            return Err(Error::Conflict("Email already exists.".into()));
        }
        st.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        Ok(guard(&self.state).users.get(&user_id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(guard(&self.state)
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(guard(&self.state).users.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user: &User) -> Result<(), Error> {
        let mut st = guard(&self.state);
        if st.users.values().any(|u| u.user_id != user.user_id && u.email == user.email) {
            return Err(Error::Conflict("Email already exists.".into()));
        }
        st.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), Error> {
        let mut st = guard(&self.state);
        st.users.remove(&user_id);
        st.profiles.remove(&user_id);
        let owned: Vec<Uuid> = st
            .analyses
            .values()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.analysis_id)
            .collect();
        for id in owned {
            remove_analysis(&mut st, id);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn create(&self, profile: &AgentProfile) -> Result<(), Error> {
        guard(&self.state).profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<AgentProfile>, Error> {
        Ok(guard(&self.state).profiles.get(&user_id).cloned())
    }

    async fn update(&self, profile: &AgentProfile) -> Result<(), Error> {
        let mut next = profile.clone();
        next.updated_at = Utc::now();
        guard(&self.state).profiles.insert(profile.user_id, next);
        Ok(())
    }
}

fn remove_analysis(st: &mut State, analysis_id: Uuid) -> bool {
    let removed = st.analyses.remove(&analysis_id).is_some();
    let gone: Vec<Uuid> = st
        .shares
        .iter()
        .filter(|s| s.analysis_id == analysis_id)
        .map(|s| s.share_id)
        .collect();
    st.shares.retain(|s| s.analysis_id != analysis_id);
    st.views.retain(|v| !gone.contains(&v.share_id));
    removed
}

fn newest_first(mut analyses: Vec<Analysis>) -> Vec<Analysis> {
    analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    analyses
}

#[async_trait]
impl AnalysisRepository for MemoryStore {
    async fn create(&self, analysis: &Analysis) -> Result<(), Error> {
        guard(&self.state).analyses.insert(analysis.analysis_id, analysis.clone());
        Ok(())
    }

    async fn get(&self, analysis_id: Uuid) -> Result<Option<Analysis>, Error> {
        Ok(guard(&self.state).analyses.get(&analysis_id).cloned())
    }

    async fn get_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<Option<Analysis>, Error> {
        Ok(guard(&self.state)
            .analyses
            .get(&analysis_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn find_by_address(&self, user_id: Uuid, address: &str) -> Result<Option<Analysis>, Error> {
        let st = guard(&self.state);
        let matching = st
            .analyses
            .values()
            .filter(|a| a.user_id == user_id && a.address == address)
            .cloned()
            .collect();
        Ok(newest_first(matching).into_iter().next())
    }

    async fn list_for_user(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Analysis>, Error> {
        let st = guard(&self.state);
        let owned = st
            .analyses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        let sorted = newest_first(owned);
        Ok(match limit {
            Some(n) => sorted.into_iter().take(n.max(0) as usize).collect(),
            None => sorted,
        })
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, Error> {
        Ok(guard(&self.state)
            .analyses
            .values()
            .filter(|a| a.user_id == user_id)
            .count() as i64)
    }

    async fn update_content(
        &self,
        user_id: Uuid,
        analysis_id: Uuid,
        content: &str,
    ) -> Result<Option<DateTime<Utc>>, Error> {
        let mut st = guard(&self.state);
        match st.analyses.get_mut(&analysis_id) {
            Some(a) if a.user_id == user_id => {
                a.analysis_content = content.to_string();
                a.updated_at = Utc::now();
                Ok(Some(a.updated_at))
            }
            _ => Ok(None),
        }
    }

    async fn delete_for_user(&self, user_id: Uuid, analysis_id: Uuid) -> Result<bool, Error> {
        let mut st = guard(&self.state);
        let owned = st
            .analyses
            .get(&analysis_id)
            .is_some_and(|a| a.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        Ok(remove_analysis(&mut st, analysis_id))
    }
}

fn latest(shares: impl Iterator<Item = Share>) -> Option<Share> {
    shares.max_by_key(|s| s.last_shared_at)
}

#[async_trait]
impl ShareRepository for MemoryStore {
    async fn upsert_for_recipient(&self, new: &NewShare) -> Result<ShareOutcome, Error> {
        let mut st = guard(&self.state);
        let key = new.recipient.as_str().to_string();
        if let Some(existing) = st
            .shares
            .iter_mut()
            .find(|s| s.analysis_id == new.analysis_id && s.recipient_email == key && !s.recipient().is_link())
        {
            existing.times_shared += 1;
            existing.share_message = new.message.clone();
            existing.share_link = new.link.clone();
            existing.share_token = new.token();
            existing.last_shared_at = Utc::now();
            return Ok(ShareOutcome { share: existing.clone(), created: false });
        }
        let share = new.to_share();
        st.shares.push(share.clone());
        Ok(ShareOutcome { share, created: true })
    }

    async fn upsert_for_link(&self, new: &NewShare) -> Result<ShareOutcome, Error> {
        let mut st = guard(&self.state);
        if let Some(existing) = st.shares.iter_mut().find(|s| {
            s.analysis_id == new.analysis_id && s.recipient() == Recipient::Link && s.share_link == new.link
        }) {
            existing.times_shared += 1;
            existing.share_message = new.message.clone();
            existing.last_shared_at = Utc::now();
            return Ok(ShareOutcome { share: existing.clone(), created: false });
        }
        let share = new.to_share();
        st.shares.push(share.clone());
        Ok(ShareOutcome { share, created: true })
    }

    async fn get(&self, share_id: Uuid) -> Result<Option<Share>, Error> {
        Ok(guard(&self.state)
            .shares
            .iter()
            .find(|s| s.share_id == share_id)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Share>, Error> {
        let st = guard(&self.state);
        Ok(latest(
            st.shares
                .iter()
                .filter(|s| s.share_token.as_deref() == Some(token))
                .cloned(),
        ))
    }

    async fn find_by_link_fragment(&self, fragment: &str) -> Result<Option<Share>, Error> {
        let st = guard(&self.state);
        Ok(latest(
            st.shares
                .iter()
                .filter(|s| s.share_link.contains(fragment))
                .cloned(),
        ))
    }

    async fn find_by_link(&self, link: &str) -> Result<Option<Share>, Error> {
        let st = guard(&self.state);
        Ok(latest(st.shares.iter().filter(|s| s.share_link == link).cloned()))
    }

    async fn list_for_analysis(&self, analysis_id: Uuid) -> Result<Vec<Share>, Error> {
        let mut rows: Vec<Share> = guard(&self.state)
            .shares
            .iter()
            .filter(|s| s.analysis_id == analysis_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_shared_at.cmp(&a.last_shared_at));
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<ShareListing>, Error> {
        let st = guard(&self.state);
        let mut rows: Vec<ShareListing> = st
            .shares
            .iter()
            .filter_map(|s| {
                st.analyses.get(&s.analysis_id).map(|a| ShareListing {
                    share: s.clone(),
                    address: a.address.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.share.last_shared_at.cmp(&a.share.last_shared_at));
        Ok(rows)
    }

    async fn record_view(
        &self,
        event: &ViewEvent,
        dedupe_window: Option<Duration>,
    ) -> Result<Option<(Share, bool)>, Error> {
        let mut st = guard(&self.state);
        let count = match (dedupe_window, event.ip_address.as_deref()) {
            (Some(window), Some(origin)) => !st.views.iter().any(|v| {
                v.share_id == event.share_id
                    && v.ip_address.as_deref() == Some(origin)
                    && v.viewed_at > event.viewed_at - window
            }),
            _ => true,
        };
        let Some(share) = st.shares.iter_mut().find(|s| s.share_id == event.share_id) else {
            return Ok(None);
        };
        if count {
            share.times_viewed += 1;
            share.last_viewed_at = Some(event.viewed_at);
        }
        let snapshot = share.clone();
        st.views.push(event.clone());
        Ok(Some((snapshot, count)))
    }

    async fn list_views(&self, share_id: Uuid) -> Result<Vec<ViewEvent>, Error> {
        let mut rows: Vec<ViewEvent> = guard(&self.state)
            .views
            .iter()
            .filter(|v| v.share_id == share_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
        Ok(rows)
    }

    async fn reset_views(&self, analysis_id: Uuid) -> Result<u64, Error> {
        let mut st = guard(&self.state);
        let mut touched = Vec::new();
        for s in st.shares.iter_mut().filter(|s| s.analysis_id == analysis_id) {
            s.times_viewed = 0;
            s.last_viewed_at = None;
            touched.push(s.share_id);
        }
        st.views.retain(|v| !touched.contains(&v.share_id));
        Ok(touched.len() as u64)
    }
}

/// One request captured by [`RecordingHttpClient`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// `Value::Null` for form posts.
    pub json: Value,
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn form_value(&self, name: &str) -> Option<String> {
        self.form.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }
}

/// Answers every request with queued responses (then the fallback) and
/// keeps a copy of what was sent.
pub struct RecordingHttpClient {
    queued: Mutex<VecDeque<HttpResponse>>,
    fallback: Option<HttpResponse>,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl RecordingHttpClient {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Some(HttpResponse { status, body: body.to_string() }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request fails as if the connection was refused.
    pub fn unreachable() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, status: u16, body: &str) {
        guard(&self.queued).push_back(HttpResponse { status, body: body.to_string() });
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        guard(&self.calls).clone()
    }

    fn answer(&self, request: RecordedRequest) -> Result<HttpResponse, Error> {
        guard(&self.calls).push(request);
        if let Some(next) = guard(&self.queued).pop_front() {
            return Ok(next);
        }
        self.fallback.clone().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        })
    }
}

fn own_headers(headers: &[(&str, String)]) -> Vec<(String, String)> {
    headers.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<HttpResponse, Error> {
        self.answer(RecordedRequest {
            url: url.to_string(),
            headers: own_headers(headers),
            json: body.clone(),
            form: Vec::new(),
        })
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(&str, String)],
        form: &[(String, String)],
    ) -> Result<HttpResponse, Error> {
        self.answer(RecordedRequest {
            url: url.to_string(),
            headers: own_headers(headers),
            json: Value::Null,
            form: form.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub html: String,
}

/// Keeps every message instead of delivering it.
pub struct RecordingMailer {
    deliver: bool,
    sent: Mutex<Vec<SentMail>>,
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self { deliver: true, sent: Mutex::new(Vec::new()) }
    }

    /// Records each message but reports delivery failure.
    pub fn failing() -> Self {
        Self { deliver: false, sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        guard(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, subject: &str, html: &str) -> bool {
        guard(&self.sent).push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        self.deliver
    }
}
