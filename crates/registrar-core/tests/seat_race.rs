//! Concurrent enrollment against a single remaining seat.

mod common;

use std::sync::Arc;

use common::{coordinator, dataset_with_racers, seat_count};
use futures::future::join_all;
use registrar_core::{Ineligibility, SeatCoordinator};
use seat_ledger::*;

const RACERS: usize = 16;

fn racer_store() -> Arc<MemoryRegistrarStore> {
    Arc::new(MemoryRegistrarStore::seeded(&dataset_with_racers(RACERS)).unwrap())
}

async fn race<S: RegistrarStore + ?Sized + 'static>(
    coordinators: Vec<Arc<SeatCoordinator<S>>>,
    offered_id: &str,
) -> Vec<registrar_core::Result<EnrollmentRecord>> {
    let attempts = (0..RACERS).map(|i| {
        let coord = Arc::clone(&coordinators[i % coordinators.len()]);
        let oid = OfferedId::from(offered_id);
        tokio::spawn(async move { coord.enroll(&format!("race-{i}").into(), &oid).await })
    });
    join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn exactly_one_racer_gets_the_last_seat() {
    let store = racer_store();
    let coord = Arc::new(coordinator(Arc::clone(&store)));

    let results = race(vec![coord], "oc-last").await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(err.is_section_full(), "unexpected error: {err}");
    }
    assert_eq!(seat_count(store.as_ref(), "oc-last").await, 1);
    assert_eq!(store.roster(&"oc-last".into()).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn separate_coordinators_share_the_storage_guard() {
    // Independent lock tables, like two processes over one database.
    let store = racer_store();
    let coordinators = (0..4)
        .map(|_| Arc::new(coordinator(Arc::clone(&store))))
        .collect();

    let results = race(coordinators, "oc-last").await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(err.is_section_full(), "unexpected error: {err}");
    }
    assert_eq!(seat_count(store.as_ref(), "oc-last").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_student_cannot_take_two_sections_of_a_course_at_once() {
    let store = racer_store();
    let coord = Arc::new(coordinator(Arc::clone(&store)));

    let a = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.enroll(&"s-lin".into(), &"oc-calc-a".into()).await })
    };
    let b = {
        let coord = Arc::clone(&coord);
        tokio::spawn(async move { coord.enroll(&"s-lin".into(), &"oc-calc-b".into()).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        err.ineligibility(),
        Some(Ineligibility::DuplicateCourseName { .. })
    ));

    let (_, standing) = coord.enrolled_sections(&"s-lin".into()).await.unwrap();
    assert_eq!(standing.sections.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn surreal_backend_holds_capacity_under_two_racers() {
    let store = Arc::new(SurrealRegistrarStore::in_memory().await.unwrap());
    store.load_dataset(&dataset_with_racers(2)).await.unwrap();

    let left = Arc::new(coordinator(Arc::clone(&store)));
    let right = Arc::new(coordinator(Arc::clone(&store)));

    let a = tokio::spawn(async move { left.enroll(&"race-0".into(), &"oc-last".into()).await });
    let b = tokio::spawn(async move { right.enroll(&"race-1".into(), &"oc-last".into()).await });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(seat_count(store.as_ref(), "oc-last").await, 1);
    assert_eq!(store.roster(&"oc-last".into()).await.unwrap().len(), 1);
}

/// Enrolls `student` in both Calculus sections at once, one request per
/// coordinator.
async fn split_calculus<S: RegistrarStore + ?Sized + 'static>(
    left: &Arc<SeatCoordinator<S>>,
    right: &Arc<SeatCoordinator<S>>,
    student: &str,
) -> [registrar_core::Result<EnrollmentRecord>; 2] {
    let a = {
        let coord = Arc::clone(left);
        let sid = StudentId::from(student);
        tokio::spawn(async move { coord.enroll(&sid, &"oc-calc-a".into()).await })
    };
    let b = {
        let coord = Arc::clone(right);
        let sid = StudentId::from(student);
        tokio::spawn(async move { coord.enroll(&sid, &"oc-calc-b".into()).await })
    };
    [a.await.unwrap(), b.await.unwrap()]
}

fn assert_one_calculus_section(results: &[registrar_core::Result<EnrollmentRecord>; 2]) {
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(
        matches!(
            err.ineligibility(),
            Some(Ineligibility::DuplicateCourseName { .. })
        ),
        "unexpected error: {err}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_coordinators_cannot_split_a_course_across_sections() {
    let store = racer_store();
    let left = Arc::new(coordinator(Arc::clone(&store)));
    let right = Arc::new(coordinator(Arc::clone(&store)));

    for i in 0..RACERS {
        let student = format!("race-{i}");
        let results = split_calculus(&left, &right, &student).await;
        assert_one_calculus_section(&results);

        let held = store
            .student_sections(&student.as_str().into(), &"S2025A".into())
            .await
            .unwrap();
        assert_eq!(held.len(), 1);
    }
    assert_eq!(
        seat_count(store.as_ref(), "oc-calc-a").await + seat_count(store.as_ref(), "oc-calc-b").await,
        RACERS as u32
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn surreal_backend_cannot_split_a_course_across_sections() {
    let store = Arc::new(SurrealRegistrarStore::in_memory().await.unwrap());
    store.load_dataset(&dataset_with_racers(4)).await.unwrap();

    let left = Arc::new(coordinator(Arc::clone(&store)));
    let right = Arc::new(coordinator(Arc::clone(&store)));

    for i in 0..4 {
        let student = format!("race-{i}");
        let results = split_calculus(&left, &right, &student).await;
        assert_one_calculus_section(&results);

        let held = store
            .student_sections(&student.as_str().into(), &"S2025A".into())
            .await
            .unwrap();
        assert_eq!(held.len(), 1, "{student} holds {held:?}");
        assert_eq!(
            store.standing_version(&student.as_str().into()).await.unwrap(),
            StandingVersion(1)
        );
    }
    assert_eq!(
        seat_count(store.as_ref(), "oc-calc-a").await + seat_count(store.as_ref(), "oc-calc-b").await,
        4
    );
}
