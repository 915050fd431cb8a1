// tests/share_tracking_tests.rs

use std::sync::Arc;

use chrono::Duration;
use propcast_core::{
    models::{Analysis, Recipient, User},
    repositories::{AnalysisRepository, ShareRepository},
    services::{
        ResolveStrategy, ShareRegistry, ShareRequest, ShareResolver, ViewCountPolicy, ViewTracker,
        DEFAULT_PRODUCTION_HOST,
    },
    test_utils::memory::{MemoryStore, RecordingMailer},
    Error,
};

struct Harness {
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
    registry: ShareRegistry,
    tracker: ViewTracker,
    user: User,
}

fn harness_with(policy: ViewCountPolicy, mailer: RecordingMailer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(mailer);
    let registry = ShareRegistry::new(store.clone(), store.clone(), mailer.clone());
    let resolver = ShareResolver::new(store.clone(), DEFAULT_PRODUCTION_HOST);
    let tracker = ViewTracker::new(store.clone(), store.clone(), resolver, policy);
    Harness {
        store,
        mailer,
        registry,
        tracker,
        user: User::new("agent", "agent@example.com", "hash", "Ada", "Lovelace"),
    }
}

fn harness() -> Harness {
    harness_with(ViewCountPolicy::EveryRequest, RecordingMailer::new())
}

fn request(email: &str, address: &str, message: &str, link: &str) -> ShareRequest {
    ShareRequest {
        email: Some(email.into()),
        property_address: Some(address.into()),
        analysis_content: Some("<p>Great value</p>".into()),
        share_message: Some(message.into()),
        share_link: Some(link.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn sharing_twice_with_same_recipient_bumps_one_record() -> Result<(), Error> {
    let h = harness();
    let link = "https://app.example.com/shared/tok-1";

    let first = h.registry.share_analysis(&h.user, &request("a@x.com", "123 Main St", "Take a look", link)).await?;
    assert!(first.created);
    assert_eq!(first.share.times_shared, 1);
    assert_eq!(first.share.times_viewed, 0);

    let second = h.registry.share_analysis(&h.user, &request("a@x.com", "123 Main St", "Updated", link)).await?;
    assert!(!second.created);
    assert_eq!(second.share.share_id, first.share.share_id);
    assert_eq!(second.share.times_shared, 2);
    assert_eq!(second.share.share_message, "Updated");
    assert_eq!(second.share.first_shared_at, first.share.first_shared_at);
    assert_eq!(h.store.share_count(), 1);

    // both shares reached the recipient
    assert_eq!(h.mailer.sent().len(), 2);
    assert_eq!(h.mailer.sent()[0].subject, "Property Analysis: 123 Main St");
    Ok(())
}

#[tokio::test]
async fn link_shares_are_keyed_by_link_and_never_mailed() -> Result<(), Error> {
    let h = harness();
    let l1 = "https://app.example.com/shared/l1";
    let l2 = "https://app.example.com/shared/l2";

    let a = h.registry.share_analysis(&h.user, &request("link-share", "9 Oak Ave", "", l1)).await?;
    let b = h.registry.share_analysis(&h.user, &request("link-share", "9 Oak Ave", "", l2)).await?;
    assert_ne!(a.share.share_id, b.share.share_id);
    assert_eq!(a.share.times_shared, 1);
    assert_eq!(b.share.times_shared, 1);
    assert_eq!(a.share.recipient(), Recipient::Link);

    let again = h.registry.share_analysis(&h.user, &request("link-share", "9 Oak Ave", "hi", l1)).await?;
    assert_eq!(again.share.share_id, a.share.share_id);
    assert_eq!(again.share.times_shared, 2);
    assert!(h.mailer.sent().is_empty());

    h.tracker.view_shared("l1", None, Some("10.0.0.1"), Some("curl")).await?;
    let l2_now = ShareRepository::get(&*h.store, b.share.share_id).await?.unwrap();
    assert_eq!(l2_now.times_viewed, 0);
    Ok(())
}

#[tokio::test]
async fn full_share_view_stats_scenario() -> Result<(), Error> {
    let h = harness();
    let link = "https://app.example.com/shared/abc123";

    h.registry.share_analysis(&h.user, &request("a@x.com", "123 Main St", "Take a look", link)).await?;
    h.registry.share_analysis(&h.user, &request("a@x.com", "123 Main St", "Updated", link)).await?;

    let view = h
        .tracker
        .view_shared("abc123", Some("app.example.com"), Some("203.0.113.9"), Some("Mozilla/5.0"))
        .await?;
    assert_eq!(view.address, "123 Main St");
    assert_eq!(view.shared_by, "Ada Lovelace");
    assert_eq!(view.share_message, "Updated");
    assert_eq!(view.times_viewed, 1);
    assert_eq!(h.store.view_count(), 1);

    let stats = h.registry.get_stats_for_address(&h.user, "123 Main St").await?;
    assert_eq!(stats.total_shares, 2);
    assert_eq!(stats.total_views, 1);
    assert_eq!(stats.email_stats.len(), 1);
    assert_eq!(stats.email_stats[0].email, "a@x.com");
    assert_eq!(stats.email_stats[0].shares, 2);
    assert_eq!(stats.email_stats[0].views, 1);
    assert!(stats.email_stats[0].last_viewed.is_some());
    Ok(())
}

#[tokio::test]
async fn unresolvable_identifier_is_not_found_and_mutates_nothing() -> Result<(), Error> {
    let h = harness();
    h.registry
        .share_analysis(&h.user, &request("a@x.com", "1 Elm", "", "https://app.example.com/shared/real"))
        .await?;
    let before = h.store.shares();

    let err = h.tracker.view_shared("missing", Some("app.example.com"), None, None).await;
    assert!(matches!(err, Err(Error::NotFound(_))));
    assert!(matches!(h.tracker.view_shared("   ", None, None, None).await, Err(Error::NotFound(_))));

    let after = h.store.shares();
    assert_eq!(before[0].times_viewed, after[0].times_viewed);
    assert_eq!(h.store.view_count(), 0);
    Ok(())
}

#[tokio::test]
async fn resolver_cascade_order() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let resolver = ShareResolver::new(store.clone(), "prod.example.com");
    let user = User::new("u", "u@x.com", "h", "", "");
    let analysis = Analysis::new(user.user_id, "1 Elm", "x");
    AnalysisRepository::create(&*store, &analysis).await?;
    let mailer = Arc::new(RecordingMailer::new());
    let registry = ShareRegistry::new(store.clone(), store.clone(), mailer);

    // token extracted from the /shared/ segment
    registry
        .create_or_update_share(&analysis, Recipient::Link, &user, "u", "", "https://any.host/shared/tok9?x=1", None)
        .await?;
    let (_, how) = resolver.resolve_with_strategy("tok9", None).await?.unwrap();
    assert_eq!(how, ResolveStrategy::Token);

    // no /shared/ segment, so only a substring match can find it
    registry
        .create_or_update_share(&analysis, Recipient::Link, &user, "u", "", "https://any.host/report?id=legacy42", None)
        .await?;
    let (share, how) = resolver.resolve_with_strategy("legacy42", None).await?.unwrap();
    assert_eq!(how, ResolveStrategy::LinkContains);
    assert!(share.share_token.is_none());

    assert!(resolver.resolve("", Some("host")).await?.is_none());
    assert!(resolver.resolve("nope", Some("host")).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn every_resolution_counts_under_default_policy() -> Result<(), Error> {
    let h = harness();
    h.registry
        .share_analysis(&h.user, &request("a@x.com", "1 Elm", "", "https://h/shared/t1"))
        .await?;

    for n in 1..=3 {
        let view = h.tracker.view_shared("t1", None, Some("10.0.0.1"), None).await?;
        assert_eq!(view.times_viewed, n);
    }
    assert_eq!(h.store.view_count(), 3);
    Ok(())
}

#[tokio::test]
async fn dedupe_policy_still_logs_every_event() -> Result<(), Error> {
    let h = harness_with(
        ViewCountPolicy::DedupeByOrigin { window: Duration::minutes(30) },
        RecordingMailer::new(),
    );
    h.registry
        .share_analysis(&h.user, &request("a@x.com", "1 Elm", "", "https://h/shared/t1"))
        .await?;

    assert_eq!(h.tracker.view_shared("t1", None, Some("10.0.0.1"), None).await?.times_viewed, 1);
    assert_eq!(h.tracker.view_shared("t1", None, Some("10.0.0.1"), None).await?.times_viewed, 1);
    assert_eq!(h.tracker.view_shared("t1", None, Some("10.0.0.2"), None).await?.times_viewed, 2);
    // unknown origin cannot be deduplicated
    assert_eq!(h.tracker.view_shared("t1", None, None, None).await?.times_viewed, 3);
    assert_eq!(h.store.view_count(), 4);
    Ok(())
}

#[tokio::test]
async fn reset_zeroes_views_and_keeps_share_counts() -> Result<(), Error> {
    let h = harness();
    let a = h.registry.share_analysis(&h.user, &request("a@x.com", "1 Elm", "", "https://h/shared/t1")).await?;
    h.registry.share_analysis(&h.user, &request("b@x.com", "1 Elm", "", "https://h/shared/t2")).await?;
    h.registry.share_analysis(&h.user, &request("b@x.com", "1 Elm", "", "https://h/shared/t2")).await?;
    h.tracker.view_shared("t1", None, None, None).await?;
    h.tracker.view_shared("t2", None, None, None).await?;
    h.tracker.view_shared("t2", None, None, None).await?;
    assert_eq!(h.store.view_count(), 3);

    let reset = h.tracker.reset(a.share.analysis_id).await?;
    assert_eq!(reset, 2);
    assert_eq!(h.store.view_count(), 0);
    for share in h.store.shares() {
        assert_eq!(share.times_viewed, 0);
        assert!(share.last_viewed_at.is_none());
    }
    let stats = h.registry.get_stats(a.share.analysis_id).await?;
    assert_eq!(stats.total_shares, 3);
    assert_eq!(stats.total_views, 0);
    Ok(())
}

#[tokio::test]
async fn share_validation_and_placeholder_analysis() -> Result<(), Error> {
    let h = harness();

    let missing = ShareRequest { email: Some("a@x.com".into()), ..Default::default() };
    assert!(matches!(h.registry.share_analysis(&h.user, &missing).await, Err(Error::Validation(_))));
    assert_eq!(h.store.share_count(), 0);

    let outcome = h.registry.share_analysis(&h.user, &request("a@x.com", "77 New Rd", "", "l")).await?;
    let analysis = AnalysisRepository::get(&*h.store, outcome.share.analysis_id).await?.unwrap();
    assert_eq!(analysis.package_name, "Shared Analysis");
    assert_eq!(analysis.analysis_model, "shared");
    assert_eq!(analysis.analysis_content, "<p>Great value</p>");

    let unknown = ShareRequest {
        analysis_id: Some(uuid::Uuid::new_v4()),
        ..request("a@x.com", "77 New Rd", "", "l")
    };
    assert!(matches!(h.registry.share_analysis(&h.user, &unknown).await, Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn mail_failure_does_not_fail_the_share() -> Result<(), Error> {
    let h = harness_with(ViewCountPolicy::EveryRequest, RecordingMailer::failing());
    let mut req = request("a@x.com", "1 Elm", "", "l");
    req.shared_by = Some("Broker Bob".into());

    let outcome = h.registry.share_analysis(&h.user, &req).await?;
    assert_eq!(outcome.share.shared_by_name, "Broker Bob");
    assert_eq!(h.mailer.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn stats_for_unknown_address_are_zero() -> Result<(), Error> {
    let h = harness();
    let stats = h.registry.get_stats_for_address(&h.user, "nowhere").await?;
    assert_eq!(stats.total_shares, 0);
    assert_eq!(stats.total_views, 0);
    assert!(stats.email_stats.is_empty());
    Ok(())
}
