// File: propcast-core/src/services/share_resolver.rs
//
// Maps the identifier from a `/shared/<id>` URL back to a share. Links are
// stored as the client built them, so besides the extracted token several
// reconstructed URL forms are tried in a fixed order.

use std::sync::Arc;

use tracing::debug;

use crate::models::Share;
use crate::repositories::ShareRepository;
use crate::Error;

pub const DEFAULT_PRODUCTION_HOST: &str = "real-estate-platform-wj7s.onrender.com";

/// Which lookup produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    Token,
    LinkContains,
    RequestHostHttps,
    RequestHostHttp,
    ProductionHost,
}

pub struct ShareResolver {
    shares: Arc<dyn ShareRepository>,
    production_host: String,
}

impl ShareResolver {
    pub fn new(shares: Arc<dyn ShareRepository>, production_host: &str) -> Self {
        Self {
            shares,
            production_host: production_host.to_string(),
        }
    }

    pub async fn resolve(&self, identifier: &str, request_host: Option<&str>) -> Result<Option<Share>, Error> {
        Ok(self
            .resolve_with_strategy(identifier, request_host)
            .await?
            .map(|(share, _)| share))
    }

    /// Runs the cascade and stops at the first hit. Read-only.
    pub async fn resolve_with_strategy(
        &self,
        identifier: &str,
        request_host: Option<&str>,
    ) -> Result<Option<(Share, ResolveStrategy)>, Error> {
        let id = identifier.trim();
        if id.is_empty() {
            return Ok(None);
        }

        if let Some(share) = self.shares.find_by_token(id).await? {
            return Ok(Some(hit(share, ResolveStrategy::Token, id)));
        }
        if let Some(share) = self.shares.find_by_link_fragment(id).await? {
            return Ok(Some(hit(share, ResolveStrategy::LinkContains, id)));
        }

        if let Some(host) = request_host.map(str::trim).filter(|h| !h.is_empty()) {
            let https = format!("https://{host}/shared/{id}");
            if let Some(share) = self.shares.find_by_link(&https).await? {
                return Ok(Some(hit(share, ResolveStrategy::RequestHostHttps, id)));
            }
            let http = format!("http://{host}/shared/{id}");
            if let Some(share) = self.shares.find_by_link(&http).await? {
                return Ok(Some(hit(share, ResolveStrategy::RequestHostHttp, id)));
            }
        }

        let production = format!("https://{}/shared/{id}", self.production_host);
        if let Some(share) = self.shares.find_by_link(&production).await? {
            return Ok(Some(hit(share, ResolveStrategy::ProductionHost, id)));
        }

        debug!("No share matches identifier '{}'", id);
        Ok(None)
    }
}

fn hit(share: Share, strategy: ResolveStrategy, id: &str) -> (Share, ResolveStrategy) {
    debug!("Resolved '{}' to share {} via {:?}", id, share.share_id, strategy);
    (share, strategy)
}
