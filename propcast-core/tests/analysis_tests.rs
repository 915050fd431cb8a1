// tests/analysis_tests.rs

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use propcast_core::{
    models::{NewAnalysis, Recipient, User},
    repositories::ShareRepository,
    services::{AnalysisService, ShareRegistry},
    test_utils::memory::{MemoryStore, RecordingMailer},
    Error,
};

fn new_analysis(address: &str, content: &str) -> NewAnalysis {
    NewAnalysis {
        address: Some(address.into()),
        analysis_content: Some(content.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn save_requires_address_and_content() -> Result<(), Error> {
    let svc = AnalysisService::new(Arc::new(MemoryStore::new()));
    let user = Uuid::new_v4();

    assert!(matches!(svc.save(user, new_analysis("", "x")).await, Err(Error::Validation(_))));
    assert!(matches!(svc.save(user, new_analysis("1 Elm", "")).await, Err(Error::Validation(_))));

    let saved = svc.save(user, new_analysis("1 Elm", "<p>x</p>")).await?;
    assert_eq!(saved.package_name, "Professional");
    assert_eq!(saved.analysis_model, "sonar");
    assert_eq!(saved.api_response, json!({}));
    Ok(())
}

#[tokio::test]
async fn recent_is_capped_and_counts_everything() -> Result<(), Error> {
    let svc = AnalysisService::new(Arc::new(MemoryStore::new()));
    let user = Uuid::new_v4();
    for i in 0..12 {
        svc.save(user, new_analysis(&format!("{i} Elm St"), "c")).await?;
    }
    svc.save(Uuid::new_v4(), new_analysis("elsewhere", "c")).await?;

    let recent = svc.recent(user).await?;
    assert_eq!(recent.analyses.len(), 10);
    assert_eq!(recent.total_count, 12);
    assert!(recent
        .analyses
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
    Ok(())
}

#[tokio::test]
async fn access_is_scoped_to_owner() -> Result<(), Error> {
    let svc = AnalysisService::new(Arc::new(MemoryStore::new()));
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let saved = svc.save(owner, new_analysis("1 Elm", "v1")).await?;

    assert!(matches!(svc.get(stranger, saved.analysis_id).await, Err(Error::NotFound(_))));
    assert!(matches!(
        svc.update_content(stranger, saved.analysis_id, Some("hacked")).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(svc.delete(stranger, saved.analysis_id).await, Err(Error::NotFound(_))));

    let unchanged = svc.update_content(owner, saved.analysis_id, None).await?;
    assert_eq!(unchanged, saved.updated_at);

    svc.update_content(owner, saved.analysis_id, Some("v2")).await?;
    assert_eq!(svc.get(owner, saved.analysis_id).await?.analysis_content, "v2");
    Ok(())
}

#[tokio::test]
async fn delete_cascades_to_shares_and_views() -> Result<(), Error> {
    let store = Arc::new(MemoryStore::new());
    let svc = AnalysisService::new(store.clone());
    let registry = ShareRegistry::new(store.clone(), store.clone(), Arc::new(RecordingMailer::new()));
    let user = User::new("u", "u@x.com", "h", "", "");

    let analysis = svc.save(user.user_id, new_analysis("1 Elm", "c")).await?;
    let outcome = registry
        .create_or_update_share(&analysis, Recipient::Email("a@x.com".into()), &user, "u", "", "https://h/shared/t", None)
        .await?;
    store
        .record_view(&propcast_core::models::ViewEvent::new(outcome.share.share_id, None, None), None)
        .await?;
    assert_eq!(store.view_count(), 1);

    svc.delete(user.user_id, analysis.analysis_id).await?;
    assert_eq!(store.share_count(), 0);
    assert_eq!(store.view_count(), 0);
    Ok(())
}

#[tokio::test]
async fn payment_history_prefers_column_then_raw_response() -> Result<(), Error> {
    let svc = AnalysisService::new(Arc::new(MemoryStore::new()));
    let user = Uuid::new_v4();

    svc.save(user, NewAnalysis {
        payment_intent_id: Some("pi_col".into()),
        ..new_analysis("1 Elm", "done")
    })
    .await?;
    svc.save(user, NewAnalysis {
        api_response: Some(json!({ "payment_intent_id": "pi_raw" })),
        ..new_analysis("2 Elm", "done")
    })
    .await?;

    let history = svc.payment_history(user).await?;
    assert_eq!(history.len(), 2);
    let refs: Vec<_> = history.iter().filter_map(|r| r.payment_intent_id.clone()).collect();
    assert!(refs.contains(&"pi_col".to_string()));
    assert!(refs.contains(&"pi_raw".to_string()));
    assert!(history.iter().all(|r| r.status == "completed"));
    Ok(())
}
