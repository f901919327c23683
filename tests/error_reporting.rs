//! Error channel and permission diagnostic behavior.

use lyra_sync::{
    model, EventBus, MemoryIdentity, MemoryStore, Operation, PermissionError, Phase, StoreClient,
    SyncConfig, SyncContext, PERMISSION_ERROR_EVENT,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn test_context(store: &Arc<MemoryStore>) -> SyncContext {
    SyncContext::new(
        store.clone() as Arc<dyn StoreClient>,
        Arc::new(MemoryIdentity::new()),
        SyncConfig::default(),
    )
}

fn collect_errors(context: &SyncContext) -> Arc<Mutex<Vec<PermissionError>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    context
        .bus()
        .subscribe(PERMISSION_ERROR_EVENT, move |err: &PermissionError| {
            sink.lock().push(err.clone());
        });
    seen
}

fn wait_for(predicate: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

// --- Event Channel ---

#[test]
fn test_subscribe_unsubscribe_then_publish_is_silent() {
    let bus: EventBus<u32> = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let id = bus.subscribe("evt", move |n: &u32| sink.lock().push(*n));
    assert!(bus.unsubscribe("evt", id));

    bus.publish("evt", &42);
    assert!(seen.lock().is_empty());
}

#[test]
fn test_publish_fans_out_once_per_listener_in_order() {
    let bus: EventBus<u32> = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for tag in 0..5u32 {
        let sink = Arc::clone(&seen);
        bus.subscribe("evt", move |_: &u32| sink.lock().push(tag));
    }

    bus.publish("evt", &1);
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
}

// --- Subscription Denials ---

#[test]
fn test_denied_query_round_trips_through_channel() {
    let store = Arc::new(MemoryStore::new());
    store.deny("users/u1/chatSessions", &[Operation::List]);
    let context = test_context(&store);
    let seen = collect_errors(&context);

    let mut sessions = context.live_query();
    sessions.set_target(Some(model::recent_sessions("u1", 10)));
    assert!(sessions.wait_settled(Duration::from_secs(1)));

    // Inline state carries the same record the channel broadcast
    assert_eq!(sessions.state().phase(), Phase::Error);
    let inline = sessions.state().error().unwrap().clone();
    assert_eq!(
        inline.path(),
        "/databases/(default)/documents/users/u1/chatSessions"
    );
    assert_eq!(inline.operation().method(), "list");

    let broadcast = seen.lock();
    assert_eq!(broadcast.len(), 1);
    assert_eq!(broadcast[0], inline);
}

#[test]
fn test_denied_document_tagged_fetch_one() {
    let store = Arc::new(MemoryStore::new());
    store.deny("users/u1", &[Operation::Get]);
    let context = test_context(&store);
    let seen = collect_errors(&context);

    let mut profile = context.live_document();
    profile.set_target(Some(model::profile("u1")));
    assert!(profile.wait_settled(Duration::from_secs(1)));

    assert_eq!(profile.state().phase(), Phase::Error);
    let errors = seen.lock();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].operation().method(), "get");
    assert_eq!(errors[0].path(), "/databases/(default)/documents/users/u1");
}

// --- Non-blocking Writes ---

#[test]
fn test_failing_writes_never_raise_at_call_site() {
    let store = Arc::new(MemoryStore::new());
    store.deny_all("users/u1");
    let context = test_context(&store);
    let seen = collect_errors(&context);
    let writer = context.writer();

    let fields = match json!({"displayName": "Ada"}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };

    // All four helpers return immediately and quietly
    writer.create(&model::chat_sessions("u1"), fields.clone());
    writer.set(&model::profile("u1"), fields.clone());
    writer.update(&model::profile("u1"), fields.clone());
    writer.delete(&model::profile("u1"));

    // Failures surface asynchronously, one record per write
    assert!(wait_for(|| seen.lock().len() == 4, Duration::from_secs(2)));

    let methods: Vec<&str> = seen
        .lock()
        .iter()
        .map(|err| err.operation().method())
        .collect();
    assert!(methods.contains(&"create"));
    assert!(methods.contains(&"write"));
    assert!(methods.contains(&"update"));
    assert!(methods.contains(&"delete"));
}

#[test]
fn test_write_payload_included_in_diagnostic() {
    let store = Arc::new(MemoryStore::new());
    store.deny_all("tutorSettings");
    let context = test_context(&store);
    let seen = collect_errors(&context);
    let writer = context.writer();

    let fields = match json!({"subject": "algebra", "instructions": "Use number lines."}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    writer.set(&model::tutor_settings_for("algebra"), fields);

    assert!(wait_for(|| !seen.lock().is_empty(), Duration::from_secs(2)));
    let errors = seen.lock();
    let payload = errors[0].context.request_resource_data.as_ref().unwrap();
    assert_eq!(payload["instructions"], "Use number lines.");
}

#[test]
fn test_successful_writes_stay_silent() {
    let store = Arc::new(MemoryStore::new());
    let context = test_context(&store);
    let seen = collect_errors(&context);
    let writer = context.writer();

    let fields = match json!({"displayName": "Ada", "email": "ada@example.edu"}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    writer.set(&model::profile("u1"), fields);

    assert!(!wait_for(|| !seen.lock().is_empty(), Duration::from_millis(150)));
    assert!(store.get(&model::profile("u1")).is_some());
}

// --- Actor Context ---

#[test]
fn test_diagnostic_carries_actor_snapshot() {
    let store = Arc::new(MemoryStore::new());
    store.deny_all("users/u2");
    let identity = Arc::new(MemoryIdentity::new());
    identity.sign_in(lyra_sync::Actor {
        uid: "u1".to_string(),
        display_name: Some("Ada".to_string()),
        email: Some("ada@example.edu".to_string()),
        email_verified: true,
        provider_data: vec![lyra_sync::ProviderProfile {
            provider_id: "password".to_string(),
        }],
    });

    let context = SyncContext::new(
        store.clone() as Arc<dyn lyra_sync::StoreClient>,
        identity,
        SyncConfig::default(),
    );
    let seen = collect_errors(&context);

    let mut other = context.live_document();
    other.set_target(Some(model::profile("u2")));
    assert!(other.wait_settled(Duration::from_secs(1)));

    let errors = seen.lock();
    let actor = errors[0].context.auth.as_ref().unwrap();
    assert_eq!(actor.uid, "u1");
    assert!(actor.email_verified);
    assert_eq!(actor.provider_data[0].provider_id, "password");
}
