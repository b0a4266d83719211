//! Outcome counters and lifecycle events for enroll/drop.
//!
//! `METRICS` is process-global, so this binary holds a single test.

mod common;

use std::io;
use std::sync::{Arc, Mutex};

use common::{coordinator, memory_store};
use registrar_core::{audit_seat_counts, init_tracing, METRICS};
use tracing::Level;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines_with(&self, event: &str) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|l| l.contains(event))
            .map(str::to_string)
            .collect()
    }
}

#[tokio::test]
async fn outcomes_are_counted_and_emitted() {
    init_tracing(false, Level::DEBUG);
    METRICS.reset();

    // Current-thread runtime: the thread default covers every await below.
    let captured = Captured::default();
    let writer = captured.clone();
    let _events = tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish(),
    );

    let store = memory_store();
    store.overwrite_seat_count(&"oc-eth".into(), 30).unwrap();
    let coord = coordinator(Arc::clone(&store));

    coord.enroll(&"s-lin".into(), &"oc-db".into()).await.unwrap();
    coord.enroll(&"s-lin".into(), &"oc-db".into()).await.unwrap_err();
    coord.enroll(&"s-lin".into(), &"oc-eth".into()).await.unwrap_err();
    coord.drop(&"s-lin".into(), &"oc-db".into()).await.unwrap();
    coord.drop(&"s-lin".into(), &"oc-db".into()).await.unwrap_err();
    audit_seat_counts(store.as_ref(), &"S2025A".into()).await.unwrap();
    METRICS.flush();

    assert_eq!(METRICS.enrollments_committed(), 1);
    assert_eq!(METRICS.drops_committed(), 1);
    assert_eq!(METRICS.eligibility_rejections(), 2);
    assert_eq!(METRICS.capacity_conflicts(), 0);

    let committed = captured.lines_with("enroll.committed");
    assert_eq!(committed.len(), 1);
    assert!(committed[0].contains("registrar.seat"), "{}", committed[0]);
    assert!(committed[0].contains("oc-db"));

    let rejected = captured.lines_with("enroll.rejected");
    assert_eq!(rejected.len(), 2);
    assert!(rejected[0].contains("already_enrolled"));
    assert!(rejected[1].contains("section_full"));

    assert_eq!(captured.lines_with("drop.committed").len(), 1);
    assert!(captured.lines_with("enroll.capacity_conflict").is_empty());

    let drift = captured.lines_with("audit.drift");
    assert_eq!(drift.len(), 1);
    assert!(drift[0].contains("oc-eth"));
}
