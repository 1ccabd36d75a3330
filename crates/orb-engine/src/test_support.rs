//! Test doubles shared by this crate's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use orb_bus_core::InMemoryBus;
use orb_store_memory::MemoryStore;
use orb_transport::{ActivityTransport, ActorResolver, Cancellation, TransportError};
use orb_types::{activity::Activity, actor::Actor, Iri};
use orb_witness::EchoWitness;

use crate::auth::{AllowAll, RelationshipAuthorizer};
use crate::{ActivityEngine, EngineConfig, Role};

/// Records every activity posted through it; never fails.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    pub(crate) posted: Mutex<Vec<Activity>>,
}

#[async_trait]
impl ActivityTransport for RecordingTransport {
    async fn post(&self, activity: &Activity, _exclude: &[Iri], _cancel: &dyn Cancellation) -> Result<Iri, TransportError> {
        self.posted.lock().unwrap().push(activity.clone());
        Ok(activity.id.clone())
    }

    async fn get_signed(&self, _iri: &Iri, _cancel: &dyn Cancellation) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::Fatal("get_signed not supported by the test double".into()))
    }
}

/// Resolves any IRI to a minimal actor document, never fails.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StubActorResolver;

#[async_trait]
impl ActorResolver for StubActorResolver {
    async fn fetch_actor(&self, iri: &Iri, _cancel: &dyn Cancellation) -> Result<Actor, TransportError> {
        Ok(Actor::new(iri.clone(), Iri::from(format!("{iri}/inbox"))))
    }
}

/// Build a started engine backed by fresh in-memory collaborators, with a
/// given role and authorizer, returning the engine plus a handle to its
/// transport double for inspecting what was sent.
pub(crate) fn new_test_engine(
    role: Role,
    self_iri: &str,
    authorizer: Arc<dyn RelationshipAuthorizer>,
) -> (ActivityEngine, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let engine = ActivityEngine::new(
        role,
        EngineConfig { self_iri: Iri::from(self_iri), ..EngineConfig::default() },
        Arc::new(MemoryStore::new()),
        transport.clone(),
        Arc::new(EchoWitness),
        Arc::new(InMemoryBus::default()),
        authorizer,
        Arc::new(StubActorResolver),
    );
    engine.start();
    (engine, transport)
}

/// Convenience: a started inbox engine with the default allow-everything
/// authorizer.
pub(crate) fn new_allow_all_inbox(self_iri: &str) -> (ActivityEngine, Arc<RecordingTransport>) {
    new_test_engine(Role::Inbox, self_iri, Arc::new(AllowAll))
}
