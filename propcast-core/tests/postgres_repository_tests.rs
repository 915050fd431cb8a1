// tests/postgres_repository_tests.rs
//
// Needs a reachable Postgres (TEST_DATABASE_URL). Run with
// `cargo test -- --ignored`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use propcast_core::{
    auth::TokenService,
    models::{AgentProfile, Analysis, NewShare, Recipient, User, ViewEvent},
    repositories::{
        AnalysisRepository, PostgresAnalysisRepository, PostgresProfileRepository,
        PostgresShareRepository, PostgresUserRepository, ProfileRepository, ShareRepository,
        UserRepository,
    },
    services::{
        AccountService, Registration, ShareResolver, ViewCountPolicy, ViewTracker,
        DEFAULT_PRODUCTION_HOST,
    },
    test_utils::{helpers::setup_test_database, memory::RecordingMailer},
    Error,
};

async fn seed(db: &propcast_core::Database) -> Result<(User, Analysis), Error> {
    let users = PostgresUserRepository::new(db.pool().clone());
    let analyses = PostgresAnalysisRepository::new(db.pool().clone());
    let user = User::new("agent", "agent@example.com", "hash", "Ada", "Lovelace");
    users.create(&user).await?;
    let analysis = Analysis::new(user.user_id, "123 Main St", "<p>report</p>");
    analyses.create(&analysis).await?;
    Ok((user, analysis))
}

fn new_share(user: &User, analysis: &Analysis, recipient: Recipient, message: &str, link: &str) -> NewShare {
    NewShare {
        analysis_id: analysis.analysis_id,
        recipient,
        shared_by: user.user_id,
        shared_by_name: user.display_name(),
        message: message.to_string(),
        link: link.to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn test_user_and_profile_repository() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let users = PostgresUserRepository::new(db.pool().clone());
    let profiles = PostgresProfileRepository::new(db.pool().clone());

    let user = User::new("jdoe", "jdoe@example.com", "hash", "Jane", "Doe");
    users.create(&user).await?;
    assert!(users.get_by_username("jdoe").await?.is_some());
    assert!(users.get_by_email("jdoe@example.com").await?.is_some());

    let dup = User::new("jdoe", "other@example.com", "hash", "", "");
    match users.create(&dup).await {
        Err(Error::Conflict(msg)) => assert_eq!(msg, "Username already exists."),
        other => panic!("unexpected {other:?}"),
    }
    let dup = User::new("jane", "jdoe@example.com", "hash", "", "");
    match users.create(&dup).await {
        Err(Error::Conflict(msg)) => assert_eq!(msg, "Email already exists."),
        other => panic!("unexpected {other:?}"),
    }

    let mut profile = AgentProfile::new(user.user_id, "Acme Realty");
    profile.highest_sale = "$2M".into();
    profiles.create(&profile).await?;
    let loaded = profiles.get(user.user_id).await?.expect("profile should exist");
    assert_eq!(loaded.company_name, "Acme Realty");
    assert_eq!(loaded.highest_sale, "$2M");

    users.delete(user.user_id).await?;
    assert!(profiles.get(user.user_id).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_share_upsert_is_single_row_per_recipient() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let (user, analysis) = seed(&db).await?;
    let shares = PostgresShareRepository::new(db.pool().clone());

    let email = Recipient::Email("a@x.com".into());
    let first = shares
        .upsert_for_recipient(&new_share(&user, &analysis, email.clone(), "Take a look", "https://h/shared/t1"))
        .await?;
    assert!(first.created);

    let second = shares
        .upsert_for_recipient(&new_share(&user, &analysis, email, "Updated", "https://h/shared/t2"))
        .await?;
    assert!(!second.created);
    assert_eq!(second.share.share_id, first.share.share_id);
    assert_eq!(second.share.times_shared, 2);
    assert_eq!(second.share.share_message, "Updated");
    assert_eq!(second.share.share_token.as_deref(), Some("t2"));

    let l1 = shares
        .upsert_for_link(&new_share(&user, &analysis, Recipient::Link, "", "https://h/shared/l1"))
        .await?;
    let l2 = shares
        .upsert_for_link(&new_share(&user, &analysis, Recipient::Link, "", "https://h/shared/l2"))
        .await?;
    assert_ne!(l1.share.share_id, l2.share.share_id);
    assert_eq!(shares.list_for_analysis(analysis.analysis_id).await?.len(), 3);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_concurrent_shares_do_not_duplicate() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let (user, analysis) = seed(&db).await?;
    let shares = PostgresShareRepository::new(db.pool().clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = shares.clone();
        let new = new_share(&user, &analysis, Recipient::Email("race@x.com".into()), "", "https://h/shared/r");
        handles.push(tokio::spawn(async move { repo.upsert_for_recipient(&new).await }));
    }
    for h in handles {
        h.await.map_err(|e| Error::Parse(e.to_string()))??;
    }

    let rows = shares.list_for_analysis(analysis.analysis_id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].times_shared, 8);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_record_view_and_reset() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let (user, analysis) = seed(&db).await?;
    let shares = PostgresShareRepository::new(db.pool().clone());

    let share = shares
        .upsert_for_recipient(&new_share(&user, &analysis, Recipient::Email("a@x.com".into()), "", "https://h/shared/v1"))
        .await?
        .share;

    assert_eq!(shares.find_by_token("v1").await?.map(|s| s.share_id), Some(share.share_id));
    assert_eq!(shares.find_by_link_fragment("shared/v").await?.map(|s| s.share_id), Some(share.share_id));
    assert!(shares.find_by_link("https://h/shared/v").await?.is_none());

    let window = Some(Duration::minutes(30));
    let (counted, was_counted) = shares
        .record_view(&ViewEvent::new(share.share_id, Some("10.0.0.1"), Some("curl")), window)
        .await?
        .expect("share exists");
    assert!(was_counted);
    assert_eq!(counted.times_viewed, 1);
    assert!(counted.last_viewed_at.is_some_and(|t| t <= Utc::now()));

    let (repeat, was_counted) = shares
        .record_view(&ViewEvent::new(share.share_id, Some("10.0.0.1"), None), window)
        .await?
        .expect("share exists");
    assert!(!was_counted);
    assert_eq!(repeat.times_viewed, 1);

    let (other, was_counted) = shares
        .record_view(&ViewEvent::new(share.share_id, Some("10.0.0.9"), None), window)
        .await?
        .expect("share exists");
    assert!(was_counted);
    assert_eq!(other.times_viewed, 2);
    assert_eq!(shares.list_views(share.share_id).await?.len(), 3);

    assert_eq!(shares.reset_views(analysis.analysis_id).await?, 1);
    let after = shares.get(share.share_id).await?.expect("share exists");
    assert_eq!(after.times_viewed, 0);
    assert_eq!(after.times_shared, 1);
    assert!(after.last_viewed_at.is_none());
    assert!(shares.list_views(share.share_id).await?.is_empty());

    let listing = shares.list_all().await?;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].address, "123 Main St");
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_analysis_delete_cascades() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let (user, analysis) = seed(&db).await?;
    let analyses = PostgresAnalysisRepository::new(db.pool().clone());
    let shares = PostgresShareRepository::new(db.pool().clone());

    let share = shares
        .upsert_for_link(&new_share(&user, &analysis, Recipient::Link, "", "https://h/shared/c1"))
        .await?
        .share;
    shares
        .record_view(&ViewEvent::new(share.share_id, None, None), None)
        .await?;

    assert_eq!(analyses.count_for_user(user.user_id).await?, 1);
    assert!(analyses.update_content(user.user_id, analysis.analysis_id, "v2").await?.is_some());
    assert!(analyses.delete_for_user(user.user_id, analysis.analysis_id).await?);
    assert!(shares.get(share.share_id).await?.is_none());
    assert!(shares.list_views(share.share_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_concurrent_views_from_one_origin_count_once() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let (user, analysis) = seed(&db).await?;
    let shares = Arc::new(PostgresShareRepository::new(db.pool().clone()));

    let deduped = shares
        .upsert_for_link(&new_share(&user, &analysis, Recipient::Link, "", "https://h/shared/d1"))
        .await?
        .share;
    let untouched = shares
        .upsert_for_link(&new_share(&user, &analysis, Recipient::Link, "", "https://h/shared/d2"))
        .await?
        .share;

    let tracker = Arc::new(ViewTracker::new(
        shares.clone(),
        Arc::new(PostgresAnalysisRepository::new(db.pool().clone())),
        ShareResolver::new(shares.clone(), DEFAULT_PRODUCTION_HOST),
        ViewCountPolicy::from_window_secs(3600),
    ));

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let tracker = tracker.clone();
        tasks.push(tokio::spawn(async move {
            tracker.view_shared("d1", None, Some("9.9.9.9"), None).await
        }));
    }
    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await.expect("task panicked")?.times_viewed);
    }

    assert!(seen.iter().all(|&n| n == 1));
    assert_eq!(shares.get(deduped.share_id).await?.map(|s| s.times_viewed), Some(1));
    assert_eq!(shares.list_views(deduped.share_id).await?.len(), 20);
    assert_eq!(shares.get(untouched.share_id).await?.map(|s| s.times_viewed), Some(0));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_concurrent_registrations_conflict_cleanly() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let svc = Arc::new(AccountService::new(
        Arc::new(PostgresUserRepository::new(db.pool().clone())),
        Arc::new(PostgresProfileRepository::new(db.pool().clone())),
        Arc::new(RecordingMailer::new()),
        TokenService::new("test-secret", Duration::minutes(5), Duration::days(1))?,
    ));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let svc = svc.clone();
        tasks.push(tokio::spawn(async move {
            svc.register(Registration {
                username: Some("racer".into()),
                email: Some(format!("racer{i}@example.com")),
                password: Some("pw".into()),
                company_name: Some("Acme".into()),
                ..Default::default()
            })
            .await
        }));
    }

    let mut registered = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(_) => registered += 1,
            Err(Error::Conflict(msg)) => assert_eq!(msg, "Username already exists."),
            Err(other) => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(registered, 1);
    Ok(())
}
