//! Outbox dispatch table (spec.md §4.1): activities this node originates.
//!
//! Every branch stores the activity in this node's outbox and delivers it
//! over the transport; only a handful of activity types additionally touch
//! local reference/proof state (spec.md §3: relationship references for
//! Follow/Invite are recorded when the *reply* arrives on the inbox, not
//! when the request is sent, so most branches here are delivery-only).

use orb_store_core::{ActivityStore, ReferenceStore, WitnessProofStore};
use orb_transport::ActivityTransport;
use orb_types::{
    activity::{Activity, ActivityTypeToken, ObjectProperty},
    reference::ReferenceKind,
    witness::WitnessProof,
    EngineError, Iri, WitnessKind,
};

use crate::{store_err, transport_err, ActivityEngine, EngineOutcome};

pub(crate) async fn handle(
    engine: &ActivityEngine,
    token: ActivityTypeToken,
    activity: Activity,
) -> Result<EngineOutcome, EngineError> {
    engine.store.put(&activity).await.map_err(store_err)?;

    match token {
        ActivityTypeToken::Create => record_create(engine, &activity).await?,
        ActivityTypeToken::Offer => record_offer(engine, &activity).await?,
        ActivityTypeToken::Like => record_like(engine, &activity).await?,
        ActivityTypeToken::Undo => record_undo(engine, &activity).await?,
        // Follow/Invite: relationship references are recorded by the inbox
        // handler when the Accept arrives, not here.
        // Accept/Reject/Announce: delivery-only, no local reference state.
        ActivityTypeToken::Follow
        | ActivityTypeToken::Invite
        | ActivityTypeToken::Accept
        | ActivityTypeToken::Reject
        | ActivityTypeToken::Announce => {}
    }

    deliver(engine, &activity).await?;
    Ok(EngineOutcome::delivered_only(activity))
}

async fn deliver(engine: &ActivityEngine, activity: &Activity) -> Result<(), EngineError> {
    engine
        .transport
        .post(activity, &[], &orb_transport::NeverCancelled)
        .await
        .map_err(transport_err)?;
    Ok(())
}

async fn record_create(engine: &ActivityEngine, activity: &Activity) -> Result<(), EngineError> {
    let anchor = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_anchor_event)
        .ok_or_else(|| EngineError::Validation("Create object must embed an anchor-linkset".into()))?;
    let canonical = anchor
        .canonical_url()
        .ok_or_else(|| EngineError::Validation("anchor-linkset has no canonical URL".into()))?;
    engine
        .store
        .add_reference(ReferenceKind::AnchorLinkset, &engine.config.self_iri, canonical)
        .await
        .map_err(store_err)
}

async fn record_offer(engine: &ActivityEngine, activity: &Activity) -> Result<(), EngineError> {
    let anchor = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_anchor_event)
        .ok_or_else(|| EngineError::Validation("Offer object must embed an anchor-linkset".into()))?;
    let canonical = anchor
        .canonical_url()
        .ok_or_else(|| EngineError::Validation("anchor-linkset has no canonical URL".into()))?
        .clone();

    // A null proof row per destination witness (spec.md §3: "Null row
    // created when an Offer is sent"); `WitnessKind::System` is the default
    // in the absence of any wire-carried classification for an outbound
    // Offer's recipients.
    for witness in &activity.to {
        engine
            .store
            .add_proof(&WitnessProof::pending(canonical.clone(), witness.clone(), WitnessKind::System))
            .await
            .map_err(store_err)?;
    }
    Ok(())
}

async fn record_like(engine: &ActivityEngine, activity: &Activity) -> Result<(), EngineError> {
    let liked = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_iri)
        .ok_or_else(|| EngineError::Validation("Like object must be an IRI".into()))?;
    engine.store.add_reference(ReferenceKind::Like, &engine.config.self_iri, liked).await.map_err(store_err)?;
    engine.store.add_reference(ReferenceKind::Liked, liked, &engine.config.self_iri).await.map_err(store_err)?;
    Ok(())
}

async fn record_undo(engine: &ActivityEngine, activity: &Activity) -> Result<(), EngineError> {
    let embedded = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_activity)
        .ok_or_else(|| EngineError::Validation("Undo object must embed the activity being retracted".into()))?;

    if embedded.activity_type.contains(ActivityTypeToken::Follow) {
        let followee = embedded
            .object
            .as_ref()
            .and_then(ObjectProperty::as_iri)
            .ok_or_else(|| EngineError::Validation("embedded Follow has no object IRI".into()))?;
        engine
            .store
            .delete_reference(ReferenceKind::Following, &engine.config.self_iri, followee)
            .await
            .map_err(store_err)?;
    } else if embedded.activity_type.contains(ActivityTypeToken::Invite) {
        let witness = embedded
            .target
            .as_ref()
            .and_then(ObjectProperty::as_iri)
            .unwrap_or(&embedded.actor);
        engine
            .store
            .delete_reference(ReferenceKind::Witness, &engine.config.self_iri, witness)
            .await
            .map_err(store_err)?;
    } else if embedded.activity_type.contains(ActivityTypeToken::Like) {
        if let Some(liked) = embedded.object.as_ref().and_then(ObjectProperty::as_iri) {
            engine
                .store
                .delete_reference(ReferenceKind::Like, &engine.config.self_iri, liked)
                .await
                .map_err(store_err)?;
            engine
                .store
                .delete_reference(ReferenceKind::Liked, liked, &engine.config.self_iri)
                .await
                .map_err(store_err)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::test_support::new_test_engine;
    use chrono::Utc;
    use orb_types::{activity::ActivityType, anchor::AnchorEvent};
    use std::sync::Arc;

    fn create(self_iri: &str, canonical: &str) -> Activity {
        Activity {
            id: Iri::from(format!("{self_iri}/activities/1")),
            activity_type: ActivityType::single(ActivityTypeToken::Create),
            actor: Iri::from(self_iri),
            to: vec![],
            published: Utc::now(),
            target: None,
            object: Some(ObjectProperty::AnchorEvent(AnchorEvent {
                urls: vec![Iri::from(canonical)],
                payload: None,
                author: Iri::from(self_iri),
                parents: vec![],
            })),
            start_time: None,
            end_time: None,
            result: None,
        }
    }

    #[tokio::test]
    async fn create_records_anchor_linkset_and_delivers() {
        let (engine, transport) = new_test_engine(crate::Role::Outbox, "https://us.test", Arc::new(AllowAll));
        let activity = create("https://us.test", "https://anchor/1");

        handle(&engine, ActivityTypeToken::Create, activity).await.unwrap();

        assert!(engine
            .store
            .has_reference(ReferenceKind::AnchorLinkset, &Iri::from("https://us.test"), &Iri::from("https://anchor/1"))
            .await
            .unwrap());
        assert_eq!(transport.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn offer_creates_a_pending_proof_row_per_recipient() {
        let (engine, _transport) = new_test_engine(crate::Role::Outbox, "https://us.test", Arc::new(AllowAll));
        let activity = Activity {
            id: Iri::from("https://us.test/activities/offer-1"),
            activity_type: ActivityType::single(ActivityTypeToken::Offer),
            actor: Iri::from("https://us.test"),
            to: vec![Iri::from("https://witness.test")],
            published: Utc::now(),
            target: Some(ObjectProperty::Iri(Iri::from(orb_types::ANCHOR_WITNESS_TARGET))),
            object: Some(ObjectProperty::AnchorEvent(AnchorEvent {
                urls: vec![Iri::from("https://anchor/1")],
                payload: None,
                author: Iri::from("https://us.test"),
                parents: vec![],
            })),
            start_time: Some(Utc::now()),
            end_time: Some(Utc::now() + chrono::Duration::hours(1)),
            result: None,
        };

        handle(&engine, ActivityTypeToken::Offer, activity).await.unwrap();

        let proofs = engine.store.get(&Iri::from("https://anchor/1")).await.unwrap();
        assert_eq!(proofs.len(), 1);
        assert!(!proofs[0].is_filled());
        assert_eq!(proofs[0].witness, Iri::from("https://witness.test"));
    }
}
