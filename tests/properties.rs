//! Property tests for channel symmetry and snapshot replacement.

use lyra_sync::{
    CollectionPath, EventBus, MemoryIdentity, MemoryStore, QueryDescriptor, StoreClient,
    SyncConfig, SyncContext,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

proptest! {
    /// Subscribing then unsubscribing leaves no listener behind, for any
    /// event name and listener count.
    #[test]
    fn prop_subscribe_unsubscribe_symmetry(event in "[a-z]{1,8}", listeners in 1usize..8) {
        let bus: EventBus<u8> = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let ids: Vec<_> = (0..listeners)
            .map(|_| {
                let seen = Arc::clone(&seen);
                bus.subscribe(event.clone(), move |_: &u8| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for id in ids {
            prop_assert!(bus.unsubscribe(&event, id));
        }

        bus.publish(&event, &0);
        prop_assert_eq!(seen.load(Ordering::SeqCst), 0);
        prop_assert_eq!(bus.listener_count(&event), 0);
    }

    /// Every listener fires exactly once per publish.
    #[test]
    fn prop_fan_out_exactly_once(listeners in 1usize..16, publishes in 1usize..4) {
        let bus: EventBus<u8> = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..listeners {
            let seen = Arc::clone(&seen);
            bus.subscribe("evt", move |_: &u8| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }
        for _ in 0..publishes {
            bus.publish("evt", &0);
        }

        prop_assert_eq!(seen.load(Ordering::SeqCst), listeners * publishes);
    }

    /// After any sequence of sets and deletes, the live view equals the
    /// final store contents exactly; stale records never survive a
    /// snapshot.
    #[test]
    fn prop_snapshots_replace_wholesale(
        ops in proptest::collection::vec((any::<bool>(), 0u8..5, 0i64..100), 1..20)
    ) {
        let store = Arc::new(MemoryStore::new());
        let context = SyncContext::new(
            store.clone() as Arc<dyn StoreClient>,
            Arc::new(MemoryIdentity::new()),
            SyncConfig::default(),
        );
        let coll = CollectionPath::parse("items").unwrap();

        let mut view = context.live_query();
        view.set_target(Some(QueryDescriptor::collection(coll.clone())));

        let mut expected: BTreeMap<String, i64> = BTreeMap::new();
        for (is_set, id, value) in &ops {
            let key = format!("i{}", id);
            let path = coll.doc(&key);
            if *is_set {
                let fields = match json!({"v": value}) {
                    serde_json::Value::Object(map) => map,
                    _ => unreachable!(),
                };
                store.set(&path, fields);
                expected.insert(key, *value);
            } else {
                store.delete(&path);
                expected.remove(&key);
            }
        }

        prop_assert!(view.wait_settled(Duration::from_secs(1)));
        view.pump();

        let records = view.records().unwrap();
        prop_assert_eq!(records.len(), expected.len());
        for (record, (key, value)) in records.iter().zip(expected.iter()) {
            prop_assert_eq!(&record.id, key);
            prop_assert_eq!(record.fields["v"].as_i64(), Some(*value));
        }
    }
}
