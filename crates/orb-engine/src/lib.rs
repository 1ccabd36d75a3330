#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-engine** – The Activity Engine: inbox and outbox handlers sharing a
//! common dispatch skeleton (spec.md §4.1).
//!
//! One [`ActivityEngine`] instance manages exactly one collection (inbox or
//! outbox, per its [`Role`]); a node wires up one of each, routing inbox
//! replies (Accept/Reject/Accept-of-Offer) it produces into its outbox
//! counterpart for delivery, mirroring `toka-kernel`'s "one executor per
//! concern, composed by the runtime" layering.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use orb_bus_core::{Bus, SubscriberList};
use orb_store_core::{ActorStore, ReferenceStoreApi, StorageError};
use orb_transport::{ActivityTransport, ActorResolver, TransportError};
use orb_types::{
    activity::{Activity, ActivityType, ActivityTypeToken},
    actor::Actor,
    EngineError, Iri,
};
use orb_witness::{Witness, WitnessError};

use auth::RelationshipAuthorizer;
use lifecycle::Lifecycle;

/// Pluggable Follow/Invite authorization.
pub mod auth;
/// Inbox dispatch table.
pub mod inbox;
/// Lifecycle state machine.
pub mod lifecycle;
/// Outbox dispatch table.
pub mod outbox;
/// Inbox validation rules.
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

/// Which collection an [`ActivityEngine`] instance manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Handles activities arriving from remote actors.
    Inbox,
    /// Handles activities this node originates and sends out.
    Outbox,
}

/// Tunable engine configuration (spec.md ambient config section).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// This node's own service IRI, used for every self-identity check
    /// (Follow's `object`, Invite-witness's `target`, Accept/Reject
    /// correlation).
    pub self_iri: Iri,
    /// TTL applied to a freshly-created `in-process` anchor status row.
    pub anchor_in_process_ttl: chrono::Duration,
    /// Per-subscriber channel buffer handed to [`SubscriberList::new`].
    pub subscriber_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            self_iri: Iri::from(""),
            anchor_in_process_ttl: chrono::Duration::hours(24),
            subscriber_buffer: orb_bus_core::subscriber::DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

/// The outcome of a single `handle` call.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// The activity to deliver to this engine's own subscribers, if
    /// processing did not end in a silent ignore/dedupe.
    pub delivered: Option<Activity>,
    /// A reply activity generated by an inbox handler (Accept/Reject, or an
    /// Accept-of-Offer) that the caller must route through the node's
    /// outbox engine for delivery (spec.md §4.1 Reply protocol: "Accept/
    /// Reject replies are sent via the transport by posting them to the
    /// engine's own outbox").
    pub reply: Option<Activity>,
}

impl EngineOutcome {
    fn delivered_only(activity: Activity) -> Self {
        Self { delivered: Some(activity), reply: None }
    }

    fn ignored() -> Self {
        Self { delivered: None, reply: None }
    }

    fn with_reply(activity: Activity, reply: Activity) -> Self {
        Self { delivered: Some(activity), reply: Some(reply) }
    }
}

/// The Activity Engine: one dispatch skeleton shared by inbox and outbox
/// handlers (spec.md §4.1, §5, §6).
pub struct ActivityEngine {
    pub(crate) role: Role,
    pub(crate) config: EngineConfig,
    lifecycle: Lifecycle,
    subscribers: SubscriberList<Activity>,
    pub(crate) store: Arc<dyn ReferenceStoreApi>,
    pub(crate) transport: Arc<dyn ActivityTransport>,
    pub(crate) witness: Arc<dyn Witness>,
    pub(crate) bus: Arc<dyn Bus>,
    pub(crate) authorizer: Arc<dyn RelationshipAuthorizer>,
    pub(crate) actor_resolver: Arc<dyn ActorResolver>,
}

impl ActivityEngine {
    /// Construct a new engine for the given role. Does not start accepting
    /// dispatch until [`ActivityEngine::start`] is called.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        role: Role,
        config: EngineConfig,
        store: Arc<dyn ReferenceStoreApi>,
        transport: Arc<dyn ActivityTransport>,
        witness: Arc<dyn Witness>,
        bus: Arc<dyn Bus>,
        authorizer: Arc<dyn RelationshipAuthorizer>,
        actor_resolver: Arc<dyn ActorResolver>,
    ) -> Self {
        let subscribers = SubscriberList::new(config.subscriber_buffer);
        Self { role, config, lifecycle: Lifecycle::new(), subscribers, store, transport, witness, bus, authorizer, actor_resolver }
    }

    /// Start accepting dispatch. Idempotent.
    pub fn start(&self) {
        self.lifecycle.start();
    }

    /// Stop accepting dispatch and close every subscriber channel.
    /// Idempotent.
    pub async fn stop(&self) {
        self.lifecycle.stop();
        self.subscribers.close().await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> lifecycle::LifecycleState {
        self.lifecycle.state()
    }

    /// Register a new subscriber; every activity this engine successfully
    /// delivers from now on is sent to it (spec.md §5, §6).
    pub async fn subscribe(&self) -> tokio::sync::mpsc::Receiver<Activity> {
        self.subscribers.subscribe().await
    }

    /// Process one activity through this engine's dispatch table.
    #[instrument(skip(self, activity), fields(role = ?self.role, activity_id = %activity.id))]
    pub async fn handle(&self, activity: Activity) -> Result<EngineOutcome, EngineError> {
        if !self.lifecycle.is_accepting_dispatch() {
            return Err(EngineError::Unsupported("engine is not started".into()));
        }
        validate::validate_actor_present(&activity)?;
        let token = primary_token(&activity.activity_type)?;

        let outcome = match self.role {
            Role::Inbox => inbox::handle(self, token, activity).await?,
            Role::Outbox => outbox::handle(self, token, activity).await?,
        };

        if let Some(delivered) = &outcome.delivered {
            self.subscribers.notify(delivered.clone()).await;
        }
        Ok(outcome)
    }

    /// Resolve `iri`'s actor document, serving the cached copy if the store
    /// has one and re-fetching via the actor resolver collaborator on a
    /// cache miss (spec.md §3 Ownership: "Actors fetched from remote are
    /// borrowed values - cached in the store but re-fetched on cache
    /// miss").
    pub(crate) async fn resolve_actor(&self, iri: &Iri) -> Result<Actor, EngineError> {
        if let Some(actor) = self.store.get_actor(iri).await.map_err(store_err)? {
            return Ok(actor);
        }
        let actor = self.actor_resolver.fetch_actor(iri, &orb_transport::NeverCancelled).await.map_err(transport_err)?;
        self.store.put_actor(&actor).await.map_err(store_err)?;
        Ok(actor)
    }
}

/// Resolve the single token a dispatch table switches on, by first-match
/// priority (spec.md §9: composite type sets occur on the wire, but a
/// deterministic primary token drives dispatch).
const DISPATCH_ORDER: [ActivityTypeToken; 9] = [
    ActivityTypeToken::Create,
    ActivityTypeToken::Follow,
    ActivityTypeToken::Invite,
    ActivityTypeToken::Accept,
    ActivityTypeToken::Reject,
    ActivityTypeToken::Announce,
    ActivityTypeToken::Offer,
    ActivityTypeToken::Like,
    ActivityTypeToken::Undo,
];

fn primary_token(ty: &ActivityType) -> Result<ActivityTypeToken, EngineError> {
    DISPATCH_ORDER
        .into_iter()
        .find(|t| ty.contains(*t))
        .ok_or_else(|| EngineError::Unsupported("activity carries no recognized type token".into()))
}

pub(crate) fn store_err(err: StorageError) -> EngineError {
    match err {
        StorageError::NotFound(msg) => EngineError::NotFound(msg),
        StorageError::Codec(msg) | StorageError::Backend(msg) => EngineError::Transient(msg),
    }
}

pub(crate) fn transport_err(err: TransportError) -> EngineError {
    match err {
        TransportError::Transient(msg) => EngineError::Transient(msg),
        TransportError::Fatal(msg) => EngineError::Validation(msg),
        TransportError::Cancelled => EngineError::Transient("delivery cancelled".into()),
    }
}

pub(crate) fn witness_err(err: WitnessError) -> EngineError {
    match err {
        WitnessError::SigningFailed(msg) => EngineError::Transient(msg),
    }
}

pub(crate) fn log_ignored(reason: &str, activity: &Activity) {
    debug!(activity_id = %activity.id, reason, "activity silently ignored");
}

pub(crate) fn log_duplicate(reason: &str, activity: &Activity) {
    warn!(activity_id = %activity.id, reason, "duplicate activity dropped");
}
