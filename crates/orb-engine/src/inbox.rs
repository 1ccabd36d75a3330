//! Inbox dispatch table (spec.md §4.1): activities arriving from remote
//! actors.

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use orb_bus_core::Bus;
use orb_store_core::{ActivityStore, AnchorStatusStore, ReferenceStore};
use orb_transport::ActivityTransport;
use orb_types::{
    activity::{Activity, ActivityType, ActivityTypeToken, ObjectProperty, Receipt},
    anchor::{AnchorEvent, AnchorStatusRecord},
    reference::ReferenceKind,
    AnchorStatus, EngineError, Iri, PUBLIC_SENTINEL,
};
use orb_witness::Witness;

use crate::{log_duplicate, log_ignored, store_err, transport_err, witness_err, ActivityEngine, EngineOutcome};

pub(crate) async fn handle(
    engine: &ActivityEngine,
    token: ActivityTypeToken,
    activity: Activity,
) -> Result<EngineOutcome, EngineError> {
    match token {
        ActivityTypeToken::Create => handle_create(engine, activity).await,
        ActivityTypeToken::Follow => handle_follow(engine, activity).await,
        ActivityTypeToken::Invite => handle_invite(engine, activity).await,
        ActivityTypeToken::Accept => handle_accept(engine, activity).await,
        ActivityTypeToken::Reject => handle_reject(engine, activity).await,
        ActivityTypeToken::Announce => handle_announce(engine, activity).await,
        ActivityTypeToken::Offer => handle_offer(engine, activity).await,
        ActivityTypeToken::Like => handle_like(engine, activity).await,
        ActivityTypeToken::Undo => handle_undo(engine, activity).await,
    }
}

async fn handle_create(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let anchor = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_anchor_event)
        .ok_or_else(|| EngineError::Validation("Create object must embed an anchor-linkset".into()))?;
    if !anchor.urls_within_bounds() {
        return Err(EngineError::Validation("anchor-linkset exceeds maximum URL count".into()));
    }
    let canonical = anchor
        .canonical_url()
        .ok_or_else(|| EngineError::Validation("anchor-linkset has no canonical URL".into()))?
        .clone();

    let self_iri = &engine.config.self_iri;
    let already_linked = engine
        .store
        .has_reference(ReferenceKind::AnchorLinkset, self_iri, &canonical)
        .await
        .map_err(store_err)?;
    if already_linked {
        log_duplicate("anchor already linked", &activity);
        return Ok(EngineOutcome::ignored());
    }

    engine.store.put(&activity).await.map_err(store_err)?;
    engine
        .store
        .add_reference(ReferenceKind::AnchorLinkset, self_iri, &canonical)
        .await
        .map_err(store_err)?;

    announce_to_followers(engine, anchor, &activity.actor).await?;

    Ok(EngineOutcome::delivered_only(activity))
}

/// Re-announce a freshly-accepted anchor event to this node's own
/// followers, excluding the actor that originated the Create (spec.md §4.1
/// "Announcement fan-out").
async fn announce_to_followers(engine: &ActivityEngine, anchor: &AnchorEvent, exclude_actor: &Iri) -> Result<(), EngineError> {
    let announce = Activity {
        id: Iri::from(format!("{}/activities/{}", engine.config.self_iri, Uuid::new_v4())),
        activity_type: ActivityType::single(ActivityTypeToken::Announce),
        actor: engine.config.self_iri.clone(),
        to: vec![followers_collection_iri(&engine.config.self_iri), Iri::from(PUBLIC_SENTINEL)],
        published: Utc::now(),
        target: None,
        object: Some(ObjectProperty::Collection(vec![ObjectProperty::AnchorEvent(anchor.clone())])),
        start_time: None,
        end_time: None,
        result: None,
    };
    engine
        .transport
        .post(&announce, std::slice::from_ref(exclude_actor), &orb_transport::NeverCancelled)
        .await
        .map_err(transport_err)?;
    Ok(())
}

fn followers_collection_iri(self_iri: &Iri) -> Iri {
    Iri::from(format!("{self_iri}/followers"))
}

async fn handle_follow(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    if !crate::validate::follow_names_self(&activity, &engine.config.self_iri) {
        log_ignored("Follow object does not name this node", &activity);
        return Ok(EngineOutcome::ignored());
    }
    engine.store.put(&activity).await.map_err(store_err)?;

    let authorized = engine.authorizer.authorize_follow(&activity.actor);
    if authorized {
        if let Err(err) = engine.resolve_actor(&activity.actor).await {
            warn!(actor = %activity.actor, error = %err, "failed to resolve/cache follower's actor document");
        }
        engine
            .store
            .add_reference(ReferenceKind::Follower, &engine.config.self_iri, &activity.actor)
            .await
            .map_err(store_err)?;
    }
    let reply = build_reply(engine, &activity, authorized);
    Ok(EngineOutcome::with_reply(activity, reply))
}

async fn handle_invite(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    if !crate::validate::invite_witness_names_self(&activity, &engine.config.self_iri) {
        log_ignored("Invite target does not name this node", &activity);
        return Ok(EngineOutcome::ignored());
    }
    engine.store.put(&activity).await.map_err(store_err)?;

    let authorized = engine.authorizer.authorize_witness_invite(&activity.actor);
    if authorized {
        if let Err(err) = engine.resolve_actor(&activity.actor).await {
            warn!(actor = %activity.actor, error = %err, "failed to resolve/cache inviter's actor document");
        }
        engine
            .store
            .add_reference(ReferenceKind::Witnessing, &engine.config.self_iri, &activity.actor)
            .await
            .map_err(store_err)?;
    }
    let reply = build_reply(engine, &activity, authorized);
    Ok(EngineOutcome::with_reply(activity, reply))
}

fn build_reply(engine: &ActivityEngine, original: &Activity, authorized: bool) -> Activity {
    let token = if authorized { ActivityTypeToken::Accept } else { ActivityTypeToken::Reject };
    Activity {
        id: Iri::from(format!("{}/activities/{}", engine.config.self_iri, Uuid::new_v4())),
        activity_type: ActivityType::single(token),
        actor: engine.config.self_iri.clone(),
        to: vec![original.actor.clone()],
        published: Utc::now(),
        target: None,
        object: Some(ObjectProperty::Activity(Box::new(original.clone()))),
        start_time: None,
        end_time: None,
        result: None,
    }
}

/// Confirm an Accept/Reject correlates to an activity this node actually
/// sent from its own outbox (spec.md Invariant 1, §4.1 Validation rules).
async fn correlate_with_outbox<'a>(
    engine: &ActivityEngine,
    embedded: &'a Activity,
) -> Result<&'a Activity, EngineError> {
    if embedded.actor != engine.config.self_iri {
        return Err(EngineError::Validation("embedded activity was not authored by this node".into()));
    }
    let original = engine
        .store
        .get_by_id(&embedded.id)
        .await
        .map_err(store_err)?
        .ok_or_else(|| EngineError::NotFound("no matching activity in this node's outbox".into()))?;
    if original.activity_type != embedded.activity_type {
        return Err(EngineError::Validation("embedded activity type does not match the outbox record".into()));
    }
    Ok(embedded)
}

async fn handle_accept(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let embedded = crate::validate::extract_accepted_or_rejected(&activity)?;
    correlate_with_outbox(engine, embedded).await?;

    if embedded.activity_type.contains(ActivityTypeToken::Follow) {
        let followee = embedded
            .object
            .as_ref()
            .and_then(ObjectProperty::as_iri)
            .ok_or_else(|| EngineError::Validation("embedded Follow has no object IRI".into()))?;
        engine
            .store
            .add_reference(ReferenceKind::Following, &engine.config.self_iri, followee)
            .await
            .map_err(store_err)?;
    } else if embedded.activity_type.contains(ActivityTypeToken::Invite) {
        engine
            .store
            .add_reference(ReferenceKind::Witness, &engine.config.self_iri, &activity.actor)
            .await
            .map_err(store_err)?;
    } else if embedded.activity_type.contains(ActivityTypeToken::Offer) {
        handle_accept_of_offer(engine, &activity, embedded).await?;
    }

    engine.store.put(&activity).await.map_err(store_err)?;
    Ok(EngineOutcome::delivered_only(activity))
}

async fn handle_accept_of_offer(
    engine: &ActivityEngine,
    accept: &Activity,
    embedded_offer: &Activity,
) -> Result<(), EngineError> {
    let anchor = embedded_offer
        .object
        .as_ref()
        .and_then(ObjectProperty::as_anchor_event)
        .ok_or_else(|| EngineError::Validation("embedded Offer has no anchor-linkset".into()))?;
    let anchor_id = anchor
        .canonical_url()
        .ok_or_else(|| EngineError::Validation("embedded Offer's anchor-linkset has no canonical URL".into()))?
        .clone();

    crate::validate::validate_accept_of_offer_result(accept, &anchor_id)?;
    let receipt: &Receipt = accept
        .result
        .as_ref()
        .and_then(ObjectProperty::as_receipt)
        .expect("validate_accept_of_offer_result already confirmed a receipt is present");

    let message = orb_bus_core::ProofMessage {
        anchor_id,
        witness: accept.actor.clone(),
        kind: orb_types::WitnessKind::System,
        proof: receipt.attachment.content.clone(),
        issuance_date: accept.published,
    };
    engine
        .bus
        .publish(orb_bus_core::PROOF_TOPIC, message)
        .map_err(|e| EngineError::Transient(e.to_string()))?;
    Ok(())
}

async fn handle_reject(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let embedded = crate::validate::extract_accepted_or_rejected(&activity)?;
    correlate_with_outbox(engine, embedded).await?;
    engine.store.put(&activity).await.map_err(store_err)?;
    Ok(EngineOutcome::delivered_only(activity))
}

async fn handle_announce(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let items = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_collection)
        .ok_or_else(|| EngineError::Validation("Announce object must be a collection".into()))?;
    if items.len() > orb_types::MAX_ANNOUNCE_COLLECTION_LEN {
        return Err(EngineError::Validation("Announce collection exceeds maximum length".into()));
    }

    let self_iri = &engine.config.self_iri;
    for item in items {
        let iri = match item {
            ObjectProperty::Iri(iri) => iri.clone(),
            ObjectProperty::AnchorEvent(anchor) => match anchor.canonical_url() {
                Some(iri) => iri.clone(),
                None => continue,
            },
            _ => continue,
        };

        // Dedupe by AnchorLinkset (spec.md §4.1, the "Duplicate anchor"
        // scenario): only a genuinely new anchor is stored and gains a
        // Share entry; repeats of an anchor already in our linkset are
        // skipped without error.
        let already_linked = engine.store.has_reference(ReferenceKind::AnchorLinkset, self_iri, &iri).await.map_err(store_err)?;
        if already_linked {
            log_duplicate("anchor already linked, skipping announce item", &activity);
            continue;
        }
        engine.store.add_reference(ReferenceKind::AnchorLinkset, self_iri, &iri).await.map_err(store_err)?;
        engine.store.add_reference(ReferenceKind::Share, &iri, &activity.id).await.map_err(store_err)?;
    }

    // Re-broadcast to our own followers, excluding the actor that announced
    // to us in the first place (spec.md §4.1: "announcement fan-out
    // excluding original actor" - otherwise every hop re-delivers to the
    // node that just sent it).
    let followers = engine
        .store
        .query_references(
            ReferenceKind::Follower,
            orb_types::reference::ReferenceCriteria {
                kind: None,
                object: Some(engine.config.self_iri.clone()),
                target: None,
            },
        )
        .await
        .map_err(store_err)?;
    let recipients: Vec<Iri> = followers.map(|r| r.target).collect();
    if !recipients.is_empty() {
        let rebroadcast = Activity { to: recipients, ..activity.clone() };
        engine
            .transport
            .post(&rebroadcast, std::slice::from_ref(&activity.actor), &orb_transport::NeverCancelled)
            .await
            .map_err(transport_err)?;
    }

    Ok(EngineOutcome::delivered_only(activity))
}

async fn handle_offer(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let anchor = crate::validate::validate_offer(&activity)?;
    let canonical = anchor
        .canonical_url()
        .expect("validate_offer already confirmed a canonical URL")
        .clone();

    if let Some(existing) = engine.store.get_status(&canonical).await.map_err(store_err)? {
        if existing.status == AnchorStatus::Completed {
            log_duplicate("Offer received for an already-completed anchor", &activity);
            return Ok(EngineOutcome::ignored());
        }
    } else {
        engine
            .store
            .add_status(&AnchorStatusRecord::new_in_process(canonical.clone(), engine.config.anchor_in_process_ttl))
            .await
            .map_err(store_err)?;
    }

    let payload_bytes = anchor.payload.as_ref().map(serde_json::to_vec).transpose()
        .map_err(|e| EngineError::Validation(e.to_string()))?
        .unwrap_or_default();
    let proof = engine.witness.witness(&payload_bytes).await.map_err(witness_err)?;

    engine.store.add_reference(ReferenceKind::Liked, &canonical, &activity.actor).await.map_err(store_err)?;

    let now = Utc::now();
    let reply = Activity {
        id: Iri::from(format!("{}/activities/{}", engine.config.self_iri, Uuid::new_v4())),
        activity_type: ActivityType::single(ActivityTypeToken::Accept),
        actor: engine.config.self_iri.clone(),
        to: vec![activity.actor.clone()],
        published: now,
        target: None,
        object: Some(ObjectProperty::Activity(Box::new(activity.clone()))),
        start_time: None,
        end_time: None,
        result: Some(ObjectProperty::Receipt(Receipt {
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
            attachment: orb_types::activity::Attachment { content: proof },
            in_reply_to: canonical,
        })),
    };

    Ok(EngineOutcome::with_reply(activity, reply))
}

async fn handle_like(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let liked = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_iri)
        .ok_or_else(|| EngineError::Validation("Like object must be an IRI".into()))?;
    engine.store.add_reference(ReferenceKind::Like, &activity.actor, liked).await.map_err(store_err)?;
    engine.store.add_reference(ReferenceKind::Liked, liked, &activity.actor).await.map_err(store_err)?;
    Ok(EngineOutcome::delivered_only(activity))
}

async fn handle_undo(engine: &ActivityEngine, activity: Activity) -> Result<EngineOutcome, EngineError> {
    let embedded = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_activity)
        .ok_or_else(|| EngineError::Validation("Undo object must embed the activity being retracted".into()))?;

    if embedded.activity_type.contains(ActivityTypeToken::Follow) {
        engine
            .store
            .delete_reference(ReferenceKind::Follower, &engine.config.self_iri, &embedded.actor)
            .await
            .map_err(store_err)?;
    } else if embedded.activity_type.contains(ActivityTypeToken::Invite) {
        engine
            .store
            .delete_reference(ReferenceKind::Witnessing, &engine.config.self_iri, &embedded.actor)
            .await
            .map_err(store_err)?;
    } else if embedded.activity_type.contains(ActivityTypeToken::Like) {
        if let Some(liked) = embedded.object.as_ref().and_then(ObjectProperty::as_iri) {
            engine.store.delete_reference(ReferenceKind::Like, &embedded.actor, liked).await.map_err(store_err)?;
            engine.store.delete_reference(ReferenceKind::Liked, liked, &embedded.actor).await.map_err(store_err)?;
        }
    }

    Ok(EngineOutcome::delivered_only(activity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DenyAll;
    use crate::test_support::{new_allow_all_inbox, new_test_engine};
    use orb_types::anchor::AnchorEvent;
    use std::sync::Arc;

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

    #[tokio::test]
    async fn follow_naming_self_is_accepted_and_recorded() {
        let (engine, _transport) = new_allow_all_inbox("https://us.test");
        let activity = follow("https://them.test", "https://us.test");

        let outcome = handle(&engine, ActivityTypeToken::Follow, activity.clone()).await.unwrap();

        assert!(outcome.delivered.is_some());
        let reply = outcome.reply.expect("Follow produces an Accept/Reject reply");
        assert!(reply.activity_type.contains(ActivityTypeToken::Accept));
        assert!(engine
            .store
            .has_reference(ReferenceKind::Follower, &Iri::from("https://us.test"), &Iri::from("https://them.test"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn follow_is_rejected_when_authorizer_denies() {
        let (engine, _transport) = new_test_engine(crate::Role::Inbox, "https://us.test", Arc::new(DenyAll));
        let activity = follow("https://them.test", "https://us.test");

        let outcome = handle(&engine, ActivityTypeToken::Follow, activity).await.unwrap();

        let reply = outcome.reply.expect("Follow still produces a reply when denied");
        assert!(reply.activity_type.contains(ActivityTypeToken::Reject));
        assert!(!engine
            .store
            .has_reference(ReferenceKind::Follower, &Iri::from("https://us.test"), &Iri::from("https://them.test"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn follow_naming_someone_else_is_silently_ignored() {
        let (engine, _transport) = new_allow_all_inbox("https://us.test");
        let activity = follow("https://them.test", "https://someone-else.test");

        let outcome = handle(&engine, ActivityTypeToken::Follow, activity).await.unwrap();
        assert!(outcome.delivered.is_none());
        assert!(outcome.reply.is_none());
    }

    fn anchor_create(author: &str, canonical: &str) -> Activity {
        Activity {
            id: Iri::from(format!("{author}/activities/{canonical}")),
            activity_type: ActivityType::single(ActivityTypeToken::Create),
            actor: Iri::from(author),
            to: vec![],
            published: Utc::now(),
            target: None,
            object: Some(ObjectProperty::AnchorEvent(AnchorEvent {
                urls: vec![Iri::from(canonical)],
                payload: None,
                author: Iri::from(author),
                parents: vec![],
            })),
            start_time: None,
            end_time: None,
            result: None,
        }
    }

    #[tokio::test]
    async fn duplicate_create_for_the_same_anchor_is_ignored() {
        let (engine, _transport) = new_allow_all_inbox("https://us.test");
        let activity = anchor_create("https://them.test", "https://anchor/1");

        let first = handle(&engine, ActivityTypeToken::Create, activity.clone()).await.unwrap();
        assert!(first.delivered.is_some());

        let second = handle(&engine, ActivityTypeToken::Create, activity).await.unwrap();
        assert!(second.delivered.is_none());
    }

    #[tokio::test]
    async fn offer_roundtrip_produces_a_filled_accept_reply() {
        let (engine, _transport) = new_allow_all_inbox("https://us.test");
        let now = Utc::now();
        let activity = Activity {
            id: Iri::from("https://them.test/activities/offer-1"),
            activity_type: ActivityType::single(ActivityTypeToken::Offer),
            actor: Iri::from("https://them.test"),
            to: vec![Iri::from("https://us.test")],
            published: now,
            target: Some(ObjectProperty::Iri(Iri::from(orb_types::ANCHOR_WITNESS_TARGET))),
            object: Some(ObjectProperty::AnchorEvent(AnchorEvent {
                urls: vec![Iri::from("https://anchor/1")],
                payload: Some(serde_json::json!({"replies": []})),
                author: Iri::from("https://them.test"),
                parents: vec![],
            })),
            start_time: Some(now),
            end_time: Some(now + chrono::Duration::hours(1)),
            result: None,
        };

        let outcome = handle(&engine, ActivityTypeToken::Offer, activity).await.unwrap();
        let reply = outcome.reply.expect("Offer produces an Accept reply carrying the proof");
        assert!(reply.activity_type.contains(ActivityTypeToken::Accept));
        let receipt = reply.result.as_ref().and_then(ObjectProperty::as_receipt).unwrap();
        assert_eq!(receipt.in_reply_to, Iri::from("https://anchor/1"));

        let status = engine.store.get_status(&Iri::from("https://anchor/1")).await.unwrap().unwrap();
        assert_eq!(status.status, orb_types::AnchorStatus::InProcess);
    }
}
