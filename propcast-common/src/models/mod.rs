// File: propcast-common/src/models/mod.rs
pub mod analysis;
pub mod profile;
pub mod share;
pub mod user;

pub use analysis::{Analysis, NewAnalysis};
pub use profile::{AgentProfile, ProfileField};
pub use share::{
    NewShare, Recipient, RecipientStats, Share, ShareListing, ShareOutcome, ShareStats, ViewEvent,
    LINK_SHARE_RECIPIENT,
};
pub use user::User;
