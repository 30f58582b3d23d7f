mod common;

use caredesk_core::{
    open_db_in_memory, Application, ApplicationStatus, Counts, FeedError, FeedState, Inquiry,
    ListFilter, Projection, ProjectionSnapshot, StoreError, SubmissionPayload,
};
use common::{application, inquiry, ScriptedStore};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn counts_unread_for_absent_and_new_status_only() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed(&application("Alice Moore", "alice@email.com"), None, Some(2));
    store.seed(
        &application("Brian Hall", "brian@email.com"),
        Some(ApplicationStatus::Contacted),
        Some(1),
    );

    let mut projection: Projection<Application> = Projection::new();
    projection.attach(&store).unwrap();

    let snapshot = projection.snapshot();
    assert_eq!(snapshot.state, FeedState::Live);
    assert_eq!(snapshot.counts, Counts { unread: 1, total: 2 });
}

#[test]
fn items_are_newest_first_and_missing_created_at_is_kept() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed(&inquiry("Old", "old@email.com", "hi"), None, Some(1_000));
    store.seed(&inquiry("New", "new@email.com", "hi"), None, Some(2_000));
    store.seed(&inquiry("Undated", "undated@email.com", "hi"), None, None);

    let mut projection: Projection<Inquiry> = Projection::new();
    projection.attach(&store).unwrap();

    let snapshot = projection.snapshot();
    let names = snapshot
        .items
        .iter()
        .map(|item| item.payload.full_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Undated", "New", "Old"]);
    assert!(snapshot.items[0].created_at > 2_000);
}

#[test]
fn every_write_rebuilds_and_publishes_a_new_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);

    let mut projection: Projection<Application> = Projection::new();
    let seen: Rc<RefCell<Vec<Counts>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    projection.on_change(Box::new(
        move |snapshot: &ProjectionSnapshot<Application>| sink.borrow_mut().push(snapshot.counts),
    ));
    projection.attach(&store).unwrap();

    store.seed(&application("Carla Diaz", "carla@email.com"), None, Some(1));
    store.seed(
        &application("Dan Wu", "dan@email.com"),
        Some(ApplicationStatus::Hired),
        Some(2),
    );

    assert_eq!(
        *seen.borrow(),
        vec![
            Counts::default(),
            Counts { unread: 1, total: 1 },
            Counts { unread: 1, total: 2 },
        ]
    );
    assert_eq!(projection.snapshot().revision, 3);
}

#[test]
fn feed_error_clears_view_and_zeroes_counts() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed(&application("Erin Fox", "erin@email.com"), None, Some(1));

    let mut projection: Projection<Application> = Projection::new();
    projection.attach(&store).unwrap();
    assert_eq!(projection.snapshot().counts.unread, 1);

    let denied = FeedError::PermissionDenied("missing admin claim".to_string());
    store.break_feed("applications", denied.clone());

    let snapshot = projection.snapshot();
    assert_eq!(snapshot.state, FeedState::Unavailable(denied));
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.counts, Counts::default());
    assert!(snapshot.is_unavailable());
}

#[test]
fn retry_after_feed_error_restores_live_view() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed(&application("Gia Park", "gia@email.com"), None, Some(1));

    let mut projection: Projection<Application> = Projection::new();
    projection.attach(&store).unwrap();
    store.break_feed(
        "applications",
        FeedError::Transport("connection reset".to_string()),
    );
    assert!(projection.snapshot().is_unavailable());

    store.heal_feed();
    projection.retry(&store).unwrap();

    let snapshot = projection.snapshot();
    assert_eq!(snapshot.state, FeedState::Live);
    assert_eq!(snapshot.counts, Counts { unread: 1, total: 1 });
    assert_eq!(store.listener_count("applications"), 1);
}

#[test]
fn failed_subscription_reports_unavailable_and_returns_error() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.fail_subscribe(true);

    let mut projection: Projection<Inquiry> = Projection::new();
    let err = projection.attach(&store).unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(projection.snapshot().is_unavailable());
    assert!(!projection.is_attached());
    assert_eq!(store.listener_count("contacts"), 0);
}

#[test]
fn undecodable_documents_are_skipped() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed(&application("Hana Ito", "hana@email.com"), None, Some(3));
    store.seed_raw(
        "applications",
        json!({"fullName": "Bad Status", "email": "bad@email.com", "status": "responded"}),
        Some(2),
    );
    store.seed_raw(
        "applications",
        json!({"fullName": "No Email", "email": "  "}),
        Some(1),
    );

    let mut projection: Projection<Application> = Projection::new();
    projection.attach(&store).unwrap();

    let snapshot = projection.snapshot();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.skipped, 2);
    assert_eq!(snapshot.counts, Counts { unread: 1, total: 1 });
}

#[test]
fn nameless_submissions_still_count_toward_total() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed_raw(
        "contacts",
        json!({"email": "anon@email.com", "message": "hello"}),
        Some(2),
    );
    store.seed(&inquiry("Lisa Anderson", "lisa@email.com", "hi"), None, Some(1));
    store.seed_raw(
        "applications",
        json!({"email": "x@email.com", "status": "new"}),
        Some(2),
    );
    store.seed(&application("Hana Ito", "hana@email.com"), None, Some(1));

    let mut inquiries: Projection<Inquiry> = Projection::new();
    inquiries.attach(&store).unwrap();
    let mut applications: Projection<Application> = Projection::new();
    applications.attach(&store).unwrap();

    let inquiries = inquiries.snapshot();
    assert_eq!(inquiries.skipped, 0);
    assert_eq!(inquiries.counts, Counts { unread: 2, total: 2 });
    assert_eq!(inquiries.items[0].payload.display_name(), "Anonymous");

    let applications = applications.snapshot();
    assert_eq!(applications.skipped, 0);
    assert_eq!(applications.counts, Counts { unread: 2, total: 2 });
    assert_eq!(applications.items[0].payload.display_name(), "Anonymous");
}

#[test]
fn detach_and_drop_release_the_subscription() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);

    let mut projection: Projection<Inquiry> = Projection::new();
    projection.attach(&store).unwrap();
    assert_eq!(store.listener_count("contacts"), 1);

    projection.attach(&store).unwrap();
    assert_eq!(store.listener_count("contacts"), 1, "re-attach replaces");

    projection.detach();
    assert_eq!(store.listener_count("contacts"), 0);

    store.seed(&inquiry("Ivy Lane", "ivy@email.com", "hello"), None, Some(1));
    assert_eq!(projection.snapshot().counts.total, 0, "detached view is frozen");

    let mut scoped: Projection<Inquiry> = Projection::new();
    scoped.attach(&store).unwrap();
    assert_eq!(store.listener_count("contacts"), 1);
    drop(scoped);
    assert_eq!(store.listener_count("contacts"), 0);
}

#[test]
fn filters_do_not_change_counts() {
    let conn = open_db_in_memory().unwrap();
    let store = ScriptedStore::new(&conn);
    store.seed(&inquiry("Robert Thompson", "robert@email.com", "care"), None, Some(1));
    store.seed(&inquiry("Lisa Anderson", "lisa@email.com", "rates"), None, Some(2));

    let mut projection: Projection<Inquiry> = Projection::new();
    projection.attach(&store).unwrap();

    let snapshot = projection.snapshot();
    let filter = ListFilter {
        search: Some("456-7890".to_string()),
        availability: None,
    };
    assert_eq!(snapshot.filtered(&filter).len(), 2, "phone is searchable");

    let filter = ListFilter {
        search: Some("lisa".to_string()),
        availability: None,
    };
    assert_eq!(snapshot.filtered(&filter).len(), 1);
    assert_eq!(snapshot.counts.total, 2);
}
