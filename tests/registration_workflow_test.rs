//! Registration workflow tests over the in-memory database

mod helpers;

use assert_matches::assert_matches;
use uuid::Uuid;

use helpers::*;
use official_id::models::{OrganizationRole, RegistrationStatus, RsvpStatus};
use official_id::services::BatchItemError;
use official_id::utils::validation::{ValidRegistration, ValidRsvp};
use official_id::OfficialIdError;

fn submission(event_id: Uuid, email: &str) -> ValidRegistration {
    ValidRegistration {
        event_id,
        name: "Budi Santoso".to_string(),
        email: email.to_string(),
        phone: Some("081234567890".to_string()),
        institution: Some("Universitas Indonesia".to_string()),
        payment_proof_url: None,
    }
}

#[tokio::test]
async fn test_register_creates_pending_registration_and_sends_receipt() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", Some(100));
    let service = ctx.state.registrations();

    let registration = service.register(submission(event.id, "budi@example.com"), "en").await.unwrap();

    assert_eq!(registration.status, RegistrationStatus::Pending);
    assert_eq!(registration.event_id, event.id);
    assert_eq!(ctx.db.registration(registration.id).unwrap().status, RegistrationStatus::Pending);

    ctx.wait_for_notifications(1).await;
    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "budi@example.com");
    assert_eq!(sent[0].subject, "Registration for Tech Summit received");
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    service.register(submission(event.id, "budi@example.com"), "id").await.unwrap();
    let err = service.register(submission(event.id, "budi@example.com"), "id").await.unwrap_err();

    assert_matches!(err, OfficialIdError::DuplicateRegistration { .. });
}

#[tokio::test]
async fn test_register_rejects_full_event() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", Some(1));
    let service = ctx.state.registrations();

    service.register(submission(event.id, "first@example.com"), "id").await.unwrap();
    let err = service.register(submission(event.id, "second@example.com"), "id").await.unwrap_err();

    assert_matches!(err, OfficialIdError::EventFull { max_participants: 1, .. });
}

#[tokio::test]
async fn test_cancelled_registrations_free_capacity() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", Some(1));
    let service = ctx.state.registrations();

    let first = service.register(submission(event.id, "first@example.com"), "id").await.unwrap();
    service.cancel(&[first.id.to_string()], ctx.owner_id).await.unwrap();

    assert!(service.register(submission(event.id, "second@example.com"), "id").await.is_ok());
}

#[tokio::test]
async fn test_register_unknown_event() {
    let ctx = TestContext::new();
    let err = ctx
        .state
        .registrations()
        .register(submission(Uuid::new_v4(), "budi@example.com"), "id")
        .await
        .unwrap_err();

    assert_matches!(err, OfficialIdError::EventNotFound { .. });
}

#[tokio::test]
async fn test_register_keeps_payment_proof_and_backfills_profile() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    ctx.db.add_profile("budi@example.com", None, Some("Existing Co"));

    let mut input = submission(event.id, "budi@example.com");
    input.payment_proof_url = Some("https://cdn.official.id/proofs/1.jpg".to_string());
    let registration = ctx.state.registrations().register(input, "id").await.unwrap();

    let proofs = ctx.db.payment_proofs();
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0].registration_id, registration.id);

    let profile = ctx.db.profile("budi@example.com").unwrap();
    assert_eq!(profile.phone.as_deref(), Some("081234567890"));
    assert_eq!(profile.company.as_deref(), Some("Existing Co"));
}

#[tokio::test]
async fn test_payment_proof_failure_does_not_fail_registration() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    ctx.db.fail_payment_proofs(true);

    let mut input = submission(event.id, "budi@example.com");
    input.payment_proof_url = Some("https://cdn.official.id/proofs/1.jpg".to_string());

    assert!(ctx.state.registrations().register(input, "id").await.is_ok());
    assert!(ctx.db.payment_proofs().is_empty());
}

#[tokio::test]
async fn test_email_failure_does_not_fail_registration() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    ctx.mailer.fail_sends(true);

    let registration = ctx.state.registrations().register(submission(event.id, "budi@example.com"), "id").await;
    assert!(registration.is_ok());

    ctx.wait_for_notifications(1).await;
    assert_eq!(ctx.state.notifications().get_stats().total_failed, 1);
}

#[tokio::test]
async fn test_approve_issues_ticket_and_sends_it() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "budi@example.com"), "en").await.unwrap();

    let summary = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.results[0].ticket_number.as_deref(), Some("TEC00011425"));
    assert_eq!(ctx.db.registration(registration.id).unwrap().status, RegistrationStatus::Confirmed);

    ctx.wait_for_notifications(2).await;
    let approval = ctx.mailer.sent().into_iter().find(|m| m.subject.contains("TEC00011425")).unwrap();
    // Approval mails go out in the default language
    assert_eq!(approval.subject, "Tiket Anda untuk Tech Summit: TEC00011425");
    assert!(approval.html.contains("https://official.id/events/ticket/TEC00011425"));
}

#[tokio::test]
async fn test_ticket_numbers_follow_issue_order() {
    let ctx = TestContext::unlimited();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    let mut ids = Vec::new();
    for i in 0..3 {
        let registration = service.register(submission(event.id, &format!("p{i}@example.com")), "id").await.unwrap();
        ids.push(registration.id.to_string());
    }

    let summary = service.approve(&ids, ctx.owner_id).await.unwrap();
    let numbers: Vec<_> = summary.results.iter().map(|r| r.ticket_number.clone().unwrap()).collect();

    assert_eq!(numbers, ["TEC00011425", "TEC00021425", "TEC00031425"]);
    assert_eq!(ctx.db.tickets().len(), 3);
}

#[tokio::test]
async fn test_ticket_number_clash_moves_to_next_sequence() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    // A number already taken by another event with the same code and date
    ctx.db.add_ticket(Uuid::new_v4(), "TEC00011425");

    let registration = service.register(submission(event.id, "budi@example.com"), "id").await.unwrap();
    let summary = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    assert_eq!(summary.results[0].ticket_number.as_deref(), Some("TEC00021425"));
}

#[tokio::test]
async fn test_busier_event_with_same_pattern_does_not_block_approval() {
    let mut settings = test_settings();
    settings.workflow.ticket_insert_attempts = 2;
    let ctx = TestContext::with_settings(settings);
    let service = ctx.state.registrations();

    let nasional = ctx.add_event("Seminar Nasional", None);
    let mut ids = Vec::new();
    for i in 0..6 {
        let registration = service.register(submission(nasional.id, &format!("n{i}@example.com")), "id").await.unwrap();
        ids.push(registration.id.to_string());
    }
    assert_eq!(service.approve(&ids, ctx.owner_id).await.unwrap().processed, 6);

    let daerah = ctx.add_event("Seminar Daerah", None);
    let registration = service.register(submission(daerah.id, "d@example.com"), "id").await.unwrap();
    let summary = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.results[0].ticket_number.as_deref(), Some("SEM00071425"));
    assert_eq!(ctx.db.registration(registration.id).unwrap().status, RegistrationStatus::Confirmed);
}

#[tokio::test]
async fn test_concurrent_approval_issues_one_distinct_ticket_each() {
    let mut settings = test_settings();
    settings.workflow.approval_concurrency = 4;
    let ctx = TestContext::with_settings(settings);
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    let mut ids = Vec::new();
    for i in 0..10 {
        let registration = service.register(submission(event.id, &format!("c{i}@example.com")), "id").await.unwrap();
        ids.push(registration.id.to_string());
    }

    let summary = service.approve(&ids, ctx.owner_id).await.unwrap();
    assert_eq!(summary.processed, 10);
    assert_eq!(summary.failed, 0);

    let tickets = ctx.db.tickets();
    assert_eq!(tickets.len(), 10);
    for id in &ids {
        let id: Uuid = id.parse().unwrap();
        assert_eq!(tickets.iter().filter(|t| t.registration_id == id).count(), 1);
    }
    let numbers: std::collections::HashSet<_> = tickets.iter().map(|t| t.ticket_number.clone()).collect();
    assert_eq!(numbers.len(), 10);

    let reported: Vec<_> = summary.results.iter().map(|r| r.registration_id.clone()).collect();
    assert_eq!(reported, ids);
}

#[tokio::test]
async fn test_approval_reuses_ticket_already_held() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    let registration = service.register(submission(event.id, "budi@example.com"), "id").await.unwrap();
    ctx.db.add_ticket(registration.id, "TEC00421425");

    let summary = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    assert_eq!(summary.results[0].ticket_number.as_deref(), Some("TEC00421425"));
    assert_eq!(ctx.db.tickets().len(), 1);
}

#[tokio::test]
async fn test_approve_mixed_batch() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    let pending = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();
    let confirmed = service.register(submission(event.id, "b@example.com"), "id").await.unwrap();
    ctx.db.set_registration_status(confirmed.id, RegistrationStatus::Confirmed);

    let ids = vec![pending.id.to_string(), confirmed.id.to_string(), "not-a-uuid".to_string(), Uuid::new_v4().to_string()];
    let summary = service.approve(&ids, ctx.owner_id).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 3);
    assert!(summary.results[0].is_success());
    assert_eq!(summary.results[1].error, Some(BatchItemError::NotPending));
    assert_eq!(summary.results[2].error, Some(BatchItemError::InvalidId));
    assert_eq!(summary.results[3].error, Some(BatchItemError::RegistrationNotFound));
    assert_eq!(ctx.db.tickets().len(), 1);
}

#[tokio::test]
async fn test_approve_without_pending_registrations() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();

    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();
    ctx.db.set_registration_status(registration.id, RegistrationStatus::Confirmed);

    let err = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap_err();
    assert_matches!(err, OfficialIdError::NoPendingRegistrations);

    let err = service.approve(&["garbage".to_string()], ctx.owner_id).await.unwrap_err();
    assert_matches!(err, OfficialIdError::NoPendingRegistrations);

    let err = service.approve(&[], ctx.owner_id).await.unwrap_err();
    assert_matches!(err, OfficialIdError::Validation(_));
}

#[tokio::test]
async fn test_approve_requires_manager_role() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();

    let member = ctx.add_member(OrganizationRole::Member);
    let outsider = Uuid::new_v4();

    for actor in [member, outsider] {
        let summary = service.approve(&[registration.id.to_string()], actor).await.unwrap();
        assert_eq!(summary.results[0].error, Some(BatchItemError::NotPermitted));
    }
    assert_eq!(ctx.db.registration(registration.id).unwrap().status, RegistrationStatus::Pending);

    let admin = ctx.add_member(OrganizationRole::Admin);
    let summary = service.approve(&[registration.id.to_string()], admin).await.unwrap();
    assert_eq!(summary.processed, 1);
}

#[tokio::test]
async fn test_ticket_failure_reverts_confirmation() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();

    ctx.db.fail_ticket_inserts(true);
    let summary = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].error, Some(BatchItemError::TicketFailed));
    assert_eq!(ctx.db.registration(registration.id).unwrap().status, RegistrationStatus::Pending);

    // Once storage recovers the same registration can be approved again
    ctx.db.fail_ticket_inserts(false);
    let summary = service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();
    assert_eq!(summary.processed, 1);
}

#[tokio::test]
async fn test_cancel_pending_registration() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();

    let summary = service.cancel(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.results[0].ticket_number, None);
    assert_eq!(ctx.db.registration(registration.id).unwrap().status, RegistrationStatus::Cancelled);
    assert!(ctx.db.tickets().is_empty());
}

#[tokio::test]
async fn test_rsvp_upserts_attendance() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();
    service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    let first = service
        .rsvp(ValidRsvp { ticket_number: "TEC00011425".to_string(), status: RsvpStatus::HadirTepatWaktu })
        .await
        .unwrap();
    let second = service
        .rsvp(ValidRsvp { ticket_number: "TEC00011425".to_string(), status: RsvpStatus::TidakHadir })
        .await
        .unwrap();

    assert_eq!(first.registration_id, registration.id);
    assert_eq!(second.status, RsvpStatus::TidakHadir);
    assert_eq!(ctx.db.rsvps().len(), 1);
}

#[tokio::test]
async fn test_rsvp_requires_confirmed_registration() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();
    ctx.db.add_ticket(registration.id, "TEC00091425");

    let err = service
        .rsvp(ValidRsvp { ticket_number: "TEC00091425".to_string(), status: RsvpStatus::HadirTerlambat })
        .await
        .unwrap_err();
    assert_matches!(err, OfficialIdError::RegistrationNotConfirmed { .. });

    let err = service
        .rsvp(ValidRsvp { ticket_number: "XXX00001425".to_string(), status: RsvpStatus::HadirTerlambat })
        .await
        .unwrap_err();
    assert_matches!(err, OfficialIdError::TicketNotFound { .. });
}

#[tokio::test]
async fn test_participants_listing_requires_manager() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();
    service.register(submission(event.id, "b@example.com"), "id").await.unwrap();
    service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    let participants = service.list_participants(event.id, ctx.owner_id, None).await.unwrap();
    assert_eq!(participants.len(), 2);
    let approved = participants.iter().find(|p| p.registration.id == registration.id).unwrap();
    assert_eq!(approved.ticket_number.as_deref(), Some("TEC00011425"));

    let member = ctx.add_member(OrganizationRole::Member);
    let err = service.list_participants(event.id, member, None).await.unwrap_err();
    assert_matches!(err, OfficialIdError::PermissionDenied(_));

    let today = chrono::Utc::now().date_naive();
    let same_day = service.list_participants(event.id, ctx.owner_id, Some(today)).await.unwrap();
    assert_eq!(same_day.len(), 2);
    let other_day = service.list_participants(event.id, ctx.owner_id, today.pred_opt()).await.unwrap();
    assert!(other_day.is_empty());
}

#[tokio::test]
async fn test_ticket_details_lookup_is_case_insensitive() {
    let ctx = TestContext::new();
    let event = ctx.add_event("Tech Summit", None);
    let service = ctx.state.registrations();
    let registration = service.register(submission(event.id, "a@example.com"), "id").await.unwrap();
    service.approve(&[registration.id.to_string()], ctx.owner_id).await.unwrap();

    let details = service.ticket_details("tec00011425").await.unwrap();
    assert_eq!(details.ticket_number, "TEC00011425");
    assert_eq!(details.event_title, "Tech Summit");
    assert_eq!(details.participant_name, "Budi Santoso");
    assert_eq!(details.registration_status, RegistrationStatus::Confirmed);
    assert_eq!(details.rsvp_status, None);
}
