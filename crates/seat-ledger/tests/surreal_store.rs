//! SurrealRegistrarStore against an in-memory SurrealDB.

mod common;

use common::{at, dataset, reserve};
use seat_ledger::*;

async fn store() -> SurrealRegistrarStore {
    let store = SurrealRegistrarStore::in_memory().await.unwrap();
    store.load_dataset(&dataset()).await.unwrap();
    store
}

#[tokio::test]
async fn schema_init_is_idempotent() {
    let db = connect(&StoreConfig::in_memory()).await.unwrap();
    migrations::init_schema(&db).await.unwrap();
    migrations::init_schema(&db).await.unwrap();
}

#[tokio::test]
async fn loaded_sections_are_joined_and_ordered() {
    let store = store().await;
    let sections = store
        .sections_in_semester(&"S2025A".into())
        .await
        .unwrap();
    let ids: Vec<&str> = sections.iter().map(|s| s.offered_id.as_str()).collect();

    assert_eq!(ids, vec!["oc-alg-1", "oc-alg-2", "oc-db"]);
    assert!(sections.iter().all(|s| s.current_count == 0));
    assert_eq!(sections[2].teacher_name, "Ada");

    let active = store.active_semester().await.unwrap().unwrap();
    assert_eq!(active.semester_name, "Autumn 2025");
}

#[tokio::test]
async fn reserve_and_release_round_trip() {
    let store = store().await;
    let sid: StudentId = "s-1".into();
    let oid: OfferedId = "oc-db".into();

    reserve(&store, &sid, &oid, at(2025, 9, 2, 9, 0)).await.unwrap();
    assert_eq!(store.section(&oid).await.unwrap().unwrap().current_count, 1);
    assert_eq!(
        store
            .student_sections(&sid, &"S2025A".into())
            .await
            .unwrap()
            .len(),
        1
    );

    store.release_seat(&sid, &oid).await.unwrap();
    assert_eq!(store.section(&oid).await.unwrap().unwrap().current_count, 0);
    assert!(store.enrollment(&sid, &oid).await.unwrap().is_none());
}

#[tokio::test]
async fn full_section_is_refused_without_side_effects() {
    let store = store().await;
    let oid: OfferedId = "oc-alg-1".into();
    reserve(&store, &"s-1".into(), &oid, at(2025, 9, 2, 9, 0)).await.unwrap();

    let err = reserve(&store, &"s-2".into(), &oid, at(2025, 9, 2, 9, 1)).await.unwrap_err();

    assert!(matches!(err, StorageError::SectionFull { .. }), "got {err:?}");
    assert_eq!(store.section(&oid).await.unwrap().unwrap().current_count, 1);
    assert!(store
        .enrollment(&"s-2".into(), &oid)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn duplicate_reserve_is_refused() {
    let store = store().await;
    let sid: StudentId = "s-1".into();
    let oid: OfferedId = "oc-db".into();
    reserve(&store, &sid, &oid, at(2025, 9, 2, 9, 0)).await.unwrap();

    let err = reserve(&store, &sid, &oid, at(2025, 9, 2, 9, 5)).await.unwrap_err();

    assert!(matches!(err, StorageError::AlreadyEnrolled { .. }), "got {err:?}");
    assert_eq!(store.section(&oid).await.unwrap().unwrap().current_count, 1);
}

#[tokio::test]
async fn release_without_enrollment_is_not_enrolled() {
    let store = store().await;
    let err = store
        .release_seat(&"s-1".into(), &"oc-db".into())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotEnrolled { .. }));
}

#[tokio::test]
async fn reload_preserves_seat_count() {
    let store = store().await;
    let oid: OfferedId = "oc-db".into();
    reserve(&store, &"s-1".into(), &oid, at(2025, 9, 2, 9, 0)).await.unwrap();

    let mut again = dataset();
    for o in &mut again.offerings {
        o.classroom = "B202".into();
    }
    store.load_dataset(&again).await.unwrap();

    let section = store.section(&oid).await.unwrap().unwrap();
    assert_eq!(section.current_count, 1);
    assert_eq!(section.classroom, "B202");
}

#[tokio::test]
async fn stale_standing_is_refused_inside_the_transaction() {
    let store = store().await;
    let sid: StudentId = "s-1".into();
    let when = at(2025, 9, 2, 9, 0);
    let seen = store.standing_version(&sid).await.unwrap();
    assert_eq!(seen, StandingVersion(0));

    store.reserve_seat(&sid, &"oc-db".into(), when, seen).await.unwrap();
    assert_eq!(store.standing_version(&sid).await.unwrap(), StandingVersion(1));

    let oid: OfferedId = "oc-alg-1".into();
    let err = store.reserve_seat(&sid, &oid, when, seen).await.unwrap_err();
    assert!(matches!(err, StorageError::StaleStanding { .. }), "got {err:?}");
    assert_eq!(store.section(&oid).await.unwrap().unwrap().current_count, 0);
    assert!(store.enrollment(&sid, &oid).await.unwrap().is_none());

    store.release_seat(&sid, &"oc-db".into()).await.unwrap();
    assert_eq!(store.standing_version(&sid).await.unwrap(), StandingVersion(2));
}
