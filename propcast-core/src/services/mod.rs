pub mod account_service;
pub mod analysis_service;
pub mod share_registry;
pub mod share_resolver;
pub mod view_tracker;

pub use account_service::{AccountService, AccountView, ProfileView, Registration, SignedIn};
pub use analysis_service::{AnalysisService, PaymentRecord, RecentAnalyses};
pub use share_registry::{ShareRegistry, ShareRequest};
pub use share_resolver::{ResolveStrategy, ShareResolver, DEFAULT_PRODUCTION_HOST};
pub use view_tracker::{SharedView, ViewCountPolicy, ViewTracker};
