use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::event::{OperationKind, RawEvent};

/// Collapse an arrival-ordered burst to the most relevant event per path.
///
/// Per path, a later event replaces the kept one unless the kept one is
/// strictly more relevant, so a delete is never hidden by trailing accesses
/// while equal-rank churn resolves to the latest change.
///
/// Paths come out in the order they were first seen.
pub fn keep_most_relevant(events: Vec<RawEvent>) -> Vec<RawEvent> {
    let mut slots: HashMap<_, usize> = HashMap::new();
    let mut kept: Vec<RawEvent> = Vec::new();

    for event in events {
        let event = merge_delete(event);
        match slots.entry(event.path.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(event);
            }
            Entry::Occupied(slot) => {
                let first = &mut kept[*slot.get()];
                if !should_keep_first(first, &event) {
                    *first = event;
                }
            }
        }
    }

    kept
}

/// Self-deletion and deletion share one vocabulary entry downstream.
fn merge_delete(mut event: RawEvent) -> RawEvent {
    if event.kind == OperationKind::DeleteSelf {
        event.kind = OperationKind::Delete;
    }
    event
}

/// `first` happened before `last`.
fn should_keep_first(first: &RawEvent, last: &RawEvent) -> bool {
    first.relevance() > last.relevance()
}
