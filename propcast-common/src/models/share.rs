// File: propcast-common/src/models/share.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipient value stored when a shareable link was generated instead of an
/// e-mail being sent.
pub const LINK_SHARE_RECIPIENT: &str = "link-share";

/// Path segment that precedes the share token in generated links.
pub const SHARED_PATH_SEGMENT: &str = "/shared/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Email(String),
    Link,
}

impl Recipient {
    pub fn parse(raw: &str) -> Self {
        if raw == LINK_SHARE_RECIPIENT {
            Recipient::Link
        } else {
            Recipient::Email(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Recipient::Email(addr) => addr,
            Recipient::Link => LINK_SHARE_RECIPIENT,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Recipient::Link)
    }
}

/// Pulls the identifier out of a `.../shared/<token>[/?#...]` link.
pub fn extract_share_token(link: &str) -> Option<String> {
    let start = link.find(SHARED_PATH_SEGMENT)? + SHARED_PATH_SEGMENT.len();
    let token: String = link[start..]
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();
    if token.is_empty() { None } else { Some(token) }
}

/// One row per (analysis, e-mail recipient), or per (analysis, link) for
/// link shares.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Share {
    pub share_id: Uuid,
    pub analysis_id: Uuid,
    pub shared_by: Uuid,
    pub shared_by_name: String,
    pub recipient_email: String,
    pub share_message: String,
    pub share_link: String,
    pub share_token: Option<String>,
    pub times_shared: i32,
    pub times_viewed: i32,
    pub first_shared_at: DateTime<Utc>,
    pub last_shared_at: DateTime<Utc>,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

impl Share {
    pub fn recipient(&self) -> Recipient {
        Recipient::parse(&self.recipient_email)
    }
}

/// Everything the registry needs to create a share or bump an existing one.
#[derive(Debug, Clone)]
pub struct NewShare {
    pub analysis_id: Uuid,
    pub recipient: Recipient,
    pub shared_by: Uuid,
    pub shared_by_name: String,
    pub message: String,
    pub link: String,
}

impl NewShare {
    pub fn token(&self) -> Option<String> {
        extract_share_token(&self.link)
    }

    /// The row inserted when no share exists yet for this key.
    pub fn to_share(&self) -> Share {
        let now = Utc::now();
        Share {
            share_id: Uuid::new_v4(),
            analysis_id: self.analysis_id,
            shared_by: self.shared_by,
            shared_by_name: self.shared_by_name.clone(),
            recipient_email: self.recipient.as_str().to_string(),
            share_message: self.message.clone(),
            share_link: self.link.clone(),
            share_token: self.token(),
            times_shared: 1,
            times_viewed: 0,
            first_shared_at: now,
            last_shared_at: now,
            last_viewed_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShareOutcome {
    pub share: Share,
    pub created: bool,
}

/// One resolved access to a shared analysis.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ViewEvent {
    pub view_id: Uuid,
    pub share_id: Uuid,
    pub viewed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl ViewEvent {
    pub fn new(share_id: Uuid, ip_address: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            view_id: Uuid::new_v4(),
            share_id,
            viewed_at: Utc::now(),
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientStats {
    pub email: String,
    pub shares: i64,
    pub views: i64,
    pub last_shared: DateTime<Utc>,
    pub last_viewed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareStats {
    pub total_shares: i64,
    pub total_views: i64,
    pub email_stats: Vec<RecipientStats>,
}

impl ShareStats {
    pub fn from_shares(shares: &[Share]) -> Self {
        let email_stats: Vec<RecipientStats> = shares
            .iter()
            .map(|s| RecipientStats {
                email: s.recipient_email.clone(),
                shares: i64::from(s.times_shared),
                views: i64::from(s.times_viewed),
                last_shared: s.last_shared_at,
                last_viewed: s.last_viewed_at,
            })
            .collect();

        Self {
            total_shares: email_stats.iter().map(|e| e.shares).sum(),
            total_views: email_stats.iter().map(|e| e.views).sum(),
            email_stats,
        }
    }
}

/// A share joined with the address of its analysis.
#[derive(Debug, Clone, Serialize)]
pub struct ShareListing {
    pub share: Share,
    pub address: String,
}
