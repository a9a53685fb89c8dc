//! Property-based tests for column packing using proptest.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use schedule_engine::{pack_columns, Event};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap()
}

/// Up to 25 events on one day, starting on 5-minute marks, 5–180 minutes long.
fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec((0i64..144, 1i64..=36), 0..25).prop_map(|ranges| {
        ranges
            .into_iter()
            .enumerate()
            .map(|(i, (start, len))| {
                let start = base() + Duration::minutes(start * 5);
                let end = start + Duration::minutes(len * 5);
                Event::new(format!("e{}", i), "Lesson", start, end, "t1", "s1").unwrap()
            })
            .collect()
    })
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: No two overlapping events share a column
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn same_column_never_overlaps(events in arb_events()) {
        let slots = pack_columns(&events);
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                if a.column == b.column {
                    let (ea, eb) = (&events[a.index], &events[b.index]);
                    prop_assert!(
                        !ea.overlaps(eb.start, eb.end),
                        "{} and {} share column {}", ea.id, eb.id, a.column
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: Every event is placed exactly once, within its column count
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn every_event_placed_once(events in arb_events()) {
        let slots = pack_columns(&events);
        prop_assert_eq!(slots.len(), events.len());

        let mut seen: Vec<usize> = slots.iter().map(|s| s.index).collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..events.len()).collect::<Vec<_>>());

        for slot in &slots {
            prop_assert!(slot.column < slot.column_count);
            prop_assert!(slot.left_percent + slot.width_percent <= 100.0 + 1e-9);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: Column count never shrinks along the scan
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn column_count_is_non_decreasing(events in arb_events()) {
        let slots = pack_columns(&events);
        for pair in slots.windows(2) {
            prop_assert!(pair[0].column_count <= pair[1].column_count);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: Packing is deterministic
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn packing_is_deterministic(events in arb_events()) {
        prop_assert_eq!(pack_columns(&events), pack_columns(&events));
    }
}
