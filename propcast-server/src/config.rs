use clap::Parser;
use propcast_core::services::{ViewCountPolicy, DEFAULT_PRODUCTION_HOST};

#[derive(Parser, Debug, Clone)]
#[command(name = "propcast")]
#[command(author, version, about = "Propcast - property analysis sharing backend")]
pub struct Args {
    /// Address the HTTP server binds to
    #[arg(long, env = "PROPCAST_LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost:5432/propcast")]
    pub database_url: String,

    #[arg(long, env = "PROPCAST_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// HMAC secret for access and refresh tokens
    #[arg(long, env = "JWT_SECRET", default_value = "")]
    pub jwt_secret: String,

    #[arg(long, env = "ACCESS_TOKEN_MINUTES", default_value_t = 60)]
    pub access_token_minutes: i64,

    #[arg(long, env = "REFRESH_TOKEN_MINUTES", default_value_t = 1440)]
    pub refresh_token_minutes: i64,

    #[arg(long, env = "PERPLEXITY_API_KEY", default_value = "")]
    pub perplexity_api_key: String,

    /// Overrides the chat completion base URL (mostly for local testing)
    #[arg(long, env = "PERPLEXITY_API_BASE")]
    pub perplexity_api_base: Option<String>,

    #[arg(long, env = "NOTION_API_KEY", default_value = "")]
    pub notion_api_key: String,

    #[arg(long, env = "NOTION_DATABASE_ID", default_value = "")]
    pub notion_database_id: String,

    #[arg(long, env = "STRIPE_SECRET_KEY", default_value = "")]
    pub stripe_secret_key: String,

    #[arg(long, env = "STRIPE_WEBHOOK_SECRET", default_value = "")]
    pub stripe_webhook_secret: String,

    /// Transactional mail endpoint. Mail is only logged when unset.
    #[arg(long, env = "MAIL_API_URL")]
    pub mail_api_url: Option<String>,

    #[arg(long, env = "MAIL_API_KEY", default_value = "")]
    pub mail_api_key: String,

    #[arg(long, env = "MAIL_FROM", default_value = "noreply@propcast.local")]
    pub mail_from: String,

    /// Host tried last when resolving legacy share links
    #[arg(long, env = "PRODUCTION_HOST", default_value = DEFAULT_PRODUCTION_HOST)]
    pub production_host: String,

    /// Window in which repeat views from one origin are not counted; 0 counts every request
    #[arg(long, env = "VIEW_DEDUPE_SECONDS", default_value_t = 0)]
    pub view_dedupe_seconds: u64,

    /// Mount the reset, debug listing and test-email routes
    #[arg(long, env = "ENABLE_DEBUG_ROUTES", default_value = "false")]
    pub enable_debug_routes: bool,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,
}

impl Args {
    pub fn view_policy(&self) -> ViewCountPolicy {
        ViewCountPolicy::from_window_secs(self.view_dedupe_seconds)
    }

    pub fn mail_enabled(&self) -> bool {
        self.mail_api_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let args = Args::parse_from([
            "propcast",
            "--jwt-secret",
            "s",
            "--view-dedupe-seconds",
            "600",
            "--enable-debug-routes",
        ]);
        assert_eq!(args.http_timeout_secs, 30);
        assert!(args.enable_debug_routes);
        assert!(matches!(args.view_policy(), ViewCountPolicy::DedupeByOrigin { .. }));
        assert!(!args.mail_enabled());
    }
}
