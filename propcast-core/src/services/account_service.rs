// File: propcast-core/src/services/account_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, TokenKind, TokenPair, TokenService};
use crate::integrations::templates::welcome_email;
use crate::integrations::Mailer;
use crate::models::profile::{apply_profile_patch, apply_user_patch};
use crate::models::{AgentProfile, User};
use crate::repositories::{ProfileRepository, UserRepository};
use crate::Error;

/// Sign-up form. Every profile attribute may be supplied up front.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub license_number: Option<String>,
    pub years_experience: Option<String>,
    pub awards: Option<String>,
    pub specialty: Option<String>,
    pub shortest_sale: Option<String>,
    pub highest_sale: Option<String>,
    pub avg_days_on_market: Option<String>,
    pub mission: Option<String>,
    pub value_proposition: Option<String>,
    pub selling_style: Option<String>,
    pub testimonial_1: Option<String>,
    pub testimonial_2: Option<String>,
    pub testimonial_3: Option<String>,
    pub community_ties: Option<String>,
    pub headshot: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub company_name: String,
    pub license_number: String,
    pub phone: String,
    pub years_experience: String,
    pub years_experience_display: String,
    pub awards: String,
    pub specialty: String,
    pub specialty_display: String,
    pub shortest_sale: String,
    pub highest_sale: String,
    pub avg_days_on_market: String,
    pub mission: String,
    pub value_proposition: String,
    pub selling_style: String,
    pub selling_style_display: String,
    pub testimonial1: String,
    pub testimonial2: String,
    pub testimonial3: String,
    pub community_ties: String,
    pub headshot: Option<String>,
    pub logo: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&AgentProfile> for ProfileView {
    fn from(p: &AgentProfile) -> Self {
        Self {
            company_name: p.company_name.clone(),
            license_number: p.license_number.clone(),
            phone: p.phone.clone(),
            years_experience: p.years_experience.clone(),
            years_experience_display: p.experience_display().to_string(),
            awards: p.awards.clone(),
            specialty: p.specialty.clone(),
            specialty_display: p.specialty_display().to_string(),
            shortest_sale: p.shortest_sale.clone(),
            highest_sale: p.highest_sale.clone(),
            avg_days_on_market: p.avg_days_on_market.clone(),
            mission: p.mission.clone(),
            value_proposition: p.value_proposition.clone(),
            selling_style: p.selling_style.clone(),
            selling_style_display: p.selling_style_display().to_string(),
            testimonial1: p.testimonial_1.clone(),
            testimonial2: p.testimonial_2.clone(),
            testimonial3: p.testimonial_3.clone(),
            community_ties: p.community_ties.clone(),
            headshot: p.headshot_url.clone(),
            logo: p.logo_url.clone(),
            profile_completed: p.profile_completed,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile: ProfileView,
}

impl AccountView {
    pub fn new(user: &User, profile: &AgentProfile) -> Self {
        Self {
            id: user.user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile: ProfileView::from(profile),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub tokens: TokenPair,
    pub account: AccountView,
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn url(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        mailer: Arc<dyn Mailer>,
        tokens: TokenService,
    ) -> Self {
        Self { users, profiles, mailer, tokens }
    }

    pub async fn register(&self, form: Registration) -> Result<SignedIn, Error> {
        let username = form.username.as_deref().unwrap_or_default();
        let email = form.email.as_deref().unwrap_or_default();
        let password = form.password.as_deref().unwrap_or_default();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::Validation("Username, email, and password are required.".into()));
        }
        let company = form.company_name.as_deref().unwrap_or_default();
        if company.trim().is_empty() {
            return Err(Error::Validation("Company/Brokerage name is required.".into()));
        }
        if self.users.get_by_username(username).await?.is_some() {
            return Err(Error::Conflict("Username already exists.".into()));
        }
        if self.users.get_by_email(email).await?.is_some() {
            return Err(Error::Conflict("Email already exists.".into()));
        }

        let user = User::new(
            username,
            email,
            &hash_password(password)?,
            &text(&form.first_name),
            &text(&form.last_name),
        );
        self.users.create(&user).await?;

        let mut profile = AgentProfile {
            phone: text(&form.phone),
            license_number: text(&form.license_number),
            years_experience: text(&form.years_experience),
            awards: text(&form.awards),
            specialty: text(&form.specialty),
            shortest_sale: text(&form.shortest_sale),
            highest_sale: text(&form.highest_sale),
            avg_days_on_market: text(&form.avg_days_on_market),
            mission: text(&form.mission),
            value_proposition: text(&form.value_proposition),
            selling_style: text(&form.selling_style),
            testimonial_1: text(&form.testimonial_1),
            testimonial_2: text(&form.testimonial_2),
            testimonial_3: text(&form.testimonial_3),
            community_ties: text(&form.community_ties),
            headshot_url: url(&form.headshot),
            logo_url: url(&form.logo),
            ..AgentProfile::new(user.user_id, company)
        };
        profile.mark_complete(&user);

        if let Err(e) = self.profiles.create(&profile).await {
            // no user without a profile
            if let Err(cleanup) = self.users.delete(user.user_id).await {
                warn!("Failed to remove user {} after profile error: {:?}", user.user_id, cleanup);
            }
            return Err(e);
        }
        info!("Registered user '{}' ({})", user.username, user.user_id);

        let greeting_name = match user.full_name() {
            n if n.is_empty() => user.username.clone(),
            n => n,
        };
        let mail = welcome_email(&greeting_name);
        if !self.mailer.send(&user.email, &mail.subject, &mail.html).await {
            warn!("Failed to send welcome e-mail to {}", user.email);
        }

        Ok(SignedIn {
            tokens: self.tokens.issue_pair(user.user_id)?,
            account: AccountView::new(&user, &profile),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SignedIn, Error> {
        let user = match self.users.get_by_username(username).await? {
            Some(u) if verify_password(password, &u.password_hash) => u,
            _ => return Err(Error::Auth("Invalid credentials.".into())),
        };
        let profile = self
            .profiles
            .get(user.user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Profile not found. Please contact support.".into()))?;

        info!("User '{}' logged in", user.username);
        Ok(SignedIn {
            tokens: self.tokens.issue_pair(user.user_id)?,
            account: AccountView::new(&user, &profile),
        })
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        if refresh_token.is_empty() {
            return Err(Error::Validation("Refresh token is required.".into()));
        }
        self.tokens
            .refresh(refresh_token)
            .map_err(|_| Error::Auth("Invalid refresh token.".into()))
    }

    /// The user behind a bearer access token.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, Error> {
        let user_id = self.tokens.verify(access_token, TokenKind::Access)?;
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| Error::Auth("User not found.".into()))
    }

    pub async fn profile_of(&self, user_id: Uuid) -> Result<AgentProfile, Error> {
        self.profiles
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Profile not found.".into()))
    }

    pub async fn account(&self, user: &User) -> Result<AccountView, Error> {
        let profile = self.profile_of(user.user_id).await?;
        Ok(AccountView::new(user, &profile))
    }

    /// Applies the non-blank keys of `patch` to the user and profile, then
    /// re-evaluates completeness.
    pub async fn update_profile(&self, user: &User, patch: &Map<String, Value>) -> Result<AccountView, Error> {
        let current = self.profile_of(user.user_id).await?;

        let next_user = apply_user_patch(user, patch);
        if next_user.email != user.email {
            if let Some(other) = self.users.get_by_email(&next_user.email).await? {
                if other.user_id != user.user_id {
                    return Err(Error::Conflict("Email already exists.".into()));
                }
            }
        }
        self.users.update(&next_user).await?;

        let mut next_profile = apply_profile_patch(&current, patch);
        next_profile.mark_complete(&next_user);
        self.profiles.update(&next_profile).await?;

        info!("Updated profile of user {}", user.user_id);
        Ok(AccountView::new(&next_user, &next_profile))
    }
}
