use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::info;

use propcast_ai::{AgentDescriptionGenerator, CompletionClient, ProviderConfig};
use propcast_core::auth::TokenService;
use propcast_core::integrations::{HttpMailer, LogMailer, Mailer, NotionClient, StripeClient};
use propcast_core::repositories::{
    AnalysisRepository, PostgresAnalysisRepository, PostgresProfileRepository,
    PostgresShareRepository, PostgresUserRepository, ProfileRepository, ShareRepository,
    UserRepository,
};
use propcast_core::services::{
    AccountService, AnalysisService, ShareRegistry, ShareResolver, ViewTracker,
};
use propcast_core::{Database, DefaultHttpClient, Error, HttpClient};

use crate::config::Args;

/// The four stores every service is built on.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub analyses: Arc<dyn AnalysisRepository>,
    pub shares: Arc<dyn ShareRepository>,
}

impl Repositories {
    pub fn postgres(db: &Database) -> Self {
        let pool = db.pool().clone();
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(pool.clone())),
            analyses: Arc::new(PostgresAnalysisRepository::new(pool.clone())),
            shares: Arc::new(PostgresShareRepository::new(pool)),
        }
    }
}

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub analyses: Arc<AnalysisService>,
    pub shares: Arc<ShareRegistry>,
    pub views: Arc<ViewTracker>,
    pub mailer: Arc<dyn Mailer>,
    pub completions: CompletionClient,
    pub agent_descriptions: AgentDescriptionGenerator,
    pub notion: NotionClient,
    pub stripe: StripeClient,
    pub stripe_webhook_secret: String,
    pub debug_routes: bool,
}

impl AppState {
    /// Wires services from `args`. `mailer` overrides the one `args` would
    /// select.
    pub fn build(
        args: &Args,
        repos: Repositories,
        http: Arc<dyn HttpClient>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Result<Self, Error> {
        let tokens = TokenService::new(
            &args.jwt_secret,
            Duration::minutes(args.access_token_minutes),
            Duration::minutes(args.refresh_token_minutes),
        )?;

        let mailer = match mailer {
            Some(m) => m,
            None => match args.mail_api_url.as_deref().filter(|_| args.mail_enabled()) {
                Some(url) => {
                    info!("Mail delivery via {}", url);
                    Arc::new(HttpMailer::new(http.clone(), url, &args.mail_api_key, &args.mail_from))
                        as Arc<dyn Mailer>
                }
                None => {
                    info!("No mail API configured; outgoing mail is only logged.");
                    Arc::new(LogMailer)
                }
            },
        };

        let resolver = ShareResolver::new(repos.shares.clone(), &args.production_host);
        let completions = CompletionClient::new(
            ProviderConfig::new(&args.perplexity_api_key)
                .with_api_base(args.perplexity_api_base.clone()),
            http.clone(),
        );

        Ok(Self {
            accounts: Arc::new(AccountService::new(
                repos.users.clone(),
                repos.profiles.clone(),
                mailer.clone(),
                tokens,
            )),
            analyses: Arc::new(AnalysisService::new(repos.analyses.clone())),
            shares: Arc::new(ShareRegistry::new(
                repos.shares.clone(),
                repos.analyses.clone(),
                mailer.clone(),
            )),
            views: Arc::new(ViewTracker::new(
                repos.shares,
                repos.analyses,
                resolver,
                args.view_policy(),
            )),
            mailer,
            agent_descriptions: AgentDescriptionGenerator::new(completions.clone()),
            completions,
            notion: NotionClient::new(http.clone(), &args.notion_api_key, &args.notion_database_id),
            stripe: StripeClient::new(http, &args.stripe_secret_key),
            stripe_webhook_secret: args.stripe_webhook_secret.clone(),
            debug_routes: args.enable_debug_routes,
        })
    }

    /// Production wiring: Postgres repositories and a `reqwest` client.
    pub fn from_database(args: &Args, db: &Database) -> Result<Self, Error> {
        let http = DefaultHttpClient::new(StdDuration::from_secs(args.http_timeout_secs))?;
        Self::build(args, Repositories::postgres(db), Arc::new(http), None)
    }
}
