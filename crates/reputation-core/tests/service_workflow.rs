//! End-to-end workflow through `ReputationService` and `LedgerSession`:
//! register an agent, collect feedback, run validations, persist, reopen.

use reputation_core::{
    Address, FeedbackFilter, FeedbackInput, Hash32, LedgerConfig, LedgerEvent, LedgerSession,
    MetadataEntry, ResponseInput, ValidationState, METRICS,
};

fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

#[tokio::test]
async fn full_agent_lifecycle_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig::new(dir.path().join("state").join("ledger.json"))
        .with_audit_log(dir.path().join("audit.jsonl"));

    let owner = addr(0x0a);
    let alice = addr(0x0b);
    let bob = addr(0x0c);
    let validator = addr(0x0d);
    let request = Hash32::digest(b"validate agent 1 output");

    let before = METRICS.snapshot();

    let mut session = LedgerSession::open(&config).await.unwrap();
    let service = session.service().clone();

    let agent = service
        .register(
            &owner,
            "ipfs://QmAgentCard",
            vec![MetadataEntry::new("agentName", b"weather-bot".to_vec())],
        )
        .await
        .unwrap();
    service
        .give_feedback(&alice, agent, FeedbackInput::rating(5, "quality", "service"))
        .await
        .unwrap();
    service
        .give_feedback(&bob, agent, FeedbackInput::rating(998, "uptime", "").with_decimals(1))
        .await
        .unwrap();
    service
        .give_feedback(&alice, agent, FeedbackInput::rating(2, "quality", ""))
        .await
        .unwrap();
    service.revoke_feedback(&alice, agent, 2).await.unwrap();
    service
        .validation_request(&owner, &validator, agent, "ipfs://QmRequest", request)
        .await
        .unwrap();
    service
        .validation_response(&validator, request, ResponseInput::new(88, "zkml"))
        .await
        .unwrap();

    assert!(session.commit().await.unwrap());
    drop(session);

    let session = LedgerSession::open(&config).await.unwrap();
    let service = session.service();

    let record = service.resolve(agent).await.unwrap();
    assert_eq!(record.owner, owner);
    assert_eq!(
        service.get_metadata(agent, "agentName").await.unwrap(),
        Some(b"weather-bot".to_vec())
    );

    assert_eq!(service.get_clients(agent).await.unwrap(), vec![alice, bob]);
    assert_eq!(service.get_last_index(agent, &alice).await.unwrap(), 2);
    assert!(service.read_feedback(agent, &alice, 2).await.unwrap().revoked);

    let quality = service
        .get_feedback_summary(agent, &FeedbackFilter::all().tag1("quality"))
        .await
        .unwrap();
    assert_eq!((quality.count, quality.summary_value), (1, 5));

    let everything = service
        .get_feedback_summary(agent, &FeedbackFilter::all())
        .await
        .unwrap();
    assert_eq!(everything.count, 2);
    assert_eq!(everything.summary_value, 1048);
    assert_eq!(everything.summary_value_decimals, 1);

    let status = service.get_validation_status(request).await.unwrap();
    assert_eq!(status.state, ValidationState::Resolved);
    assert_eq!(status.response, 88);

    let profile = service.agent_profile(agent).await.unwrap();
    assert_eq!(profile.feedback, everything);
    assert_eq!(profile.validation.count, 1);
    assert_eq!(profile.resolved_validations, 1);
    assert_eq!(profile.pending_validations, 0);

    let events = service.events_since(0).await;
    let names: Vec<_> = events.iter().map(|e| e.event.name()).collect();
    assert_eq!(
        names,
        vec![
            "registered",
            "metadata_set",
            "new_feedback",
            "new_feedback",
            "new_feedback",
            "feedback_revoked",
            "validation_request",
            "validation_response",
        ]
    );
    assert!(matches!(
        events[0].event,
        LedgerEvent::Registered { ref agent_uri, .. } if agent_uri == "ipfs://QmAgentCard"
    ));

    // other tests share the global counters, so only lower bounds hold
    let after = METRICS.snapshot();
    assert!(after.agents_registered > before.agents_registered);
    assert!(after.feedback_given >= before.feedback_given + 3);
    assert!(after.feedback_revoked > before.feedback_revoked);
    assert!(after.validations_resolved > before.validations_resolved);
}

#[tokio::test]
async fn pending_request_reads_as_zero_response() {
    let dir = tempfile::tempdir().unwrap();
    let session = LedgerSession::open(&LedgerConfig::new(dir.path().join("l.json")))
        .await
        .unwrap();
    let service = session.service();
    let owner = addr(1);
    let agent = service.register(&owner, "", vec![]).await.unwrap();
    let hash = Hash32::digest(b"pending");
    service
        .validation_request(&owner, &addr(2), agent, "ipfs://req", hash)
        .await
        .unwrap();

    let status = service.get_validation_status(hash).await.unwrap();
    assert_eq!(status.state, ValidationState::Pending);
    assert_eq!(status.response, 0);
    assert!(status.tag.is_empty());
    assert!(status.response_uri.is_empty());

    let profile = service.agent_profile(agent).await.unwrap();
    assert_eq!(profile.pending_validations, 1);
    assert_eq!(profile.validation.count, 0);
    assert_eq!(profile.validation.average_response, 0);
}
