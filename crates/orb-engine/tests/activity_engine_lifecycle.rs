//! End-to-end exercises of [`ActivityEngine`] through its public API only,
//! matching `toka-kernel/tests/e2e.rs`'s style of driving a whole
//! submit/react cycle rather than a single dispatch branch.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use orb_bus_core::InMemoryBus;
use orb_engine::auth::AllowAll;
use orb_engine::{ActivityEngine, EngineConfig, Role};
use orb_store_core::{ActorStore, ReferenceStoreApi};
use orb_store_memory::MemoryStore;
use orb_transport::{ActivityTransport, ActorResolver, Cancellation, TransportError};
use orb_types::{
    activity::{Activity, ActivityType, ActivityTypeToken, ObjectProperty},
    actor::Actor,
    anchor::AnchorEvent,
    reference::ReferenceKind,
    Iri,
};
use orb_witness::EchoWitness;

/// Resolves any IRI to a minimal actor document, never fails.
#[derive(Debug, Clone, Copy, Default)]
struct StubActorResolver;

#[async_trait]
impl ActorResolver for StubActorResolver {
    async fn fetch_actor(&self, iri: &Iri, _cancel: &dyn Cancellation) -> Result<Actor, TransportError> {
        Ok(Actor::new(iri.clone(), Iri::from(format!("{iri}/inbox"))))
    }
}

/// Posts activities nowhere, returning the activity's own id.
#[derive(Debug, Clone, Copy, Default)]
struct NullTransport;

#[async_trait]
impl ActivityTransport for NullTransport {
    async fn post(&self, activity: &Activity, _exclude: &[Iri], _cancel: &dyn Cancellation) -> Result<Iri, TransportError> {
        Ok(activity.id.clone())
    }

    async fn get_signed(&self, _iri: &Iri, _cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Fatal("not supported".into()))
    }
}

/// Records every activity posted through it, and the exclude list it was
/// posted with; never fails.
#[derive(Default)]
struct RecordingTransport {
    posted: Mutex<Vec<(Activity, Vec<Iri>)>>,
}

#[async_trait]
impl ActivityTransport for RecordingTransport {
    async fn post(&self, activity: &Activity, exclude: &[Iri], _cancel: &dyn Cancellation) -> Result<Iri, TransportError> {
        self.posted.lock().unwrap().push((activity.clone(), exclude.to_vec()));
        Ok(activity.id.clone())
    }

    async fn get_signed(&self, _iri: &Iri, _cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Fatal("get_signed not supported by the test double".into()))
    }
}

fn engine(role: Role, self_iri: &str, store: Arc<MemoryStore>) -> ActivityEngine {
    let engine = ActivityEngine::new(
        role,
        EngineConfig { self_iri: Iri::from(self_iri), ..EngineConfig::default() },
        store,
        Arc::new(NullTransport),
        Arc::new(EchoWitness),
        Arc::new(InMemoryBus::default()),
        Arc::new(AllowAll),
        Arc::new(StubActorResolver),
    );
    engine.start();
    engine
}

fn follow(actor: &str, object: &str) -> Activity {
    Activity {
        id: Iri::from(format!("{actor}/activities/1")),
        activity_type: ActivityType::single(ActivityTypeToken::Follow),
        actor: Iri::from(actor),
        to: vec![Iri::from(object)],
        published: Utc::now(),
        target: None,
        object: Some(ObjectProperty::Iri(Iri::from(object))),
        start_time: None,
        end_time: None,
        result: None,
    }
}

/// A Follow accepted by the inbox both records the relationship and caches
/// the follower's actor document (spec.md §3 Ownership: borrowed actor
/// values are cached on resolution).
#[tokio::test]
async fn accepted_follow_records_relationship_and_caches_actor() {
    let store = Arc::new(MemoryStore::new());
    let inbox = engine(Role::Inbox, "https://us.test", store.clone());

    let outcome = inbox.handle(follow("https://them.test", "https://us.test")).await.unwrap();

    let reply = outcome.reply.expect("Follow produces an Accept/Reject reply");
    assert!(reply.activity_type.contains(ActivityTypeToken::Accept));
    assert!(store
        .has_reference(ReferenceKind::Follower, &Iri::from("https://us.test"), &Iri::from("https://them.test"))
        .await
        .unwrap());
    assert!(store.get_actor(&Iri::from("https://them.test")).await.unwrap().is_some());
}

/// A Create accepted on the inbox announces the new anchor to followers,
/// excluding the actor that originated it (spec.md §4.1 "Announcement
/// fan-out", the "Create + announce" scenario).
#[tokio::test]
async fn accepted_create_announces_to_followers_excluding_the_author() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let inbox = ActivityEngine::new(
        Role::Inbox,
        EngineConfig { self_iri: Iri::from("https://us.test"), ..EngineConfig::default() },
        store.clone(),
        transport.clone(),
        Arc::new(EchoWitness),
        Arc::new(InMemoryBus::default()),
        Arc::new(AllowAll),
        Arc::new(StubActorResolver),
    );
    inbox.start();

    let create = Activity {
        id: Iri::from("https://them.test/activities/1"),
        activity_type: ActivityType::single(ActivityTypeToken::Create),
        actor: Iri::from("https://them.test"),
        to: vec![],
        published: Utc::now(),
        target: None,
        object: Some(ObjectProperty::AnchorEvent(AnchorEvent {
            urls: vec![Iri::from("https://anchor/1")],
            payload: None,
            author: Iri::from("https://them.test"),
            parents: vec![],
        })),
        start_time: None,
        end_time: None,
        result: None,
    };

    inbox.handle(create).await.unwrap();

    let posted = transport.posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    let (announce, exclude) = &posted[0];
    assert!(announce.activity_type.contains(ActivityTypeToken::Announce));
    assert_eq!(announce.actor, Iri::from("https://us.test"));
    assert_eq!(*exclude, vec![Iri::from("https://them.test")]);
}
