//! Inbox validation rules (spec.md §4.1 "Validation rules (inbox)").

use chrono::Utc;

use orb_types::{
    activity::{Activity, ActivityTypeToken, ObjectProperty},
    anchor::AnchorEvent,
    EngineError, Iri, ANCHOR_WITNESS_TARGET,
};

/// `actor` must be present on every activity this core handles; no
/// activity type in this system is anonymous.
pub fn validate_actor_present(activity: &Activity) -> Result<(), EngineError> {
    if activity.actor.as_str().is_empty() {
        return Err(EngineError::Validation("activity actor is required".into()));
    }
    if !activity.recipients_within_bounds() {
        return Err(EngineError::Validation("activity exceeds maximum recipient count".into()));
    }
    Ok(())
}

/// Follow must name this node as the `object` of the request. Returns
/// `Ok(false)` (not an error) when the mismatch means the activity is
/// silently ignored, per spec.md: "otherwise the activity is silently
/// ignored with a log line (not an error)".
pub fn follow_names_self(activity: &Activity, self_iri: &Iri) -> bool {
    activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_iri)
        .map(|iri| iri == self_iri)
        .unwrap_or(false)
}

/// Invite-witness must name this node as the `target` of the request - the
/// mirror-image check of [`follow_names_self`] (spec.md §9 open question:
/// Follow names the followee in `object`, Invite-witness names the witness
/// in `target`).
pub fn invite_witness_names_self(activity: &Activity, self_iri: &Iri) -> bool {
    activity
        .target
        .as_ref()
        .and_then(ObjectProperty::as_iri)
        .map(|iri| iri == self_iri)
        .unwrap_or(false)
}

/// The embedded activity an Accept/Reject carries must be one of
/// `{Follow, Invite, Offer}` and must have been authored by this node
/// (spec.md §4.1 Validation rules).
pub fn extract_accepted_or_rejected(activity: &Activity) -> Result<&Activity, EngineError> {
    let embedded = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_activity)
        .ok_or_else(|| EngineError::Validation("Accept/Reject object must embed the original activity".into()))?;

    let allowed = [ActivityTypeToken::Follow, ActivityTypeToken::Invite, ActivityTypeToken::Offer];
    if !allowed.iter().any(|t| embedded.activity_type.contains(*t)) {
        return Err(EngineError::Validation(
            "Accept/Reject must embed a Follow, Invite, or Offer activity".into(),
        ));
    }
    Ok(embedded)
}

/// Structural validation for an inbound Offer (spec.md §4.1).
pub fn validate_offer(activity: &Activity) -> Result<&AnchorEvent, EngineError> {
    let target_is_sentinel = activity
        .target
        .as_ref()
        .and_then(ObjectProperty::as_iri)
        .map(|iri| iri.as_str() == ANCHOR_WITNESS_TARGET)
        .unwrap_or(false);
    if !target_is_sentinel {
        return Err(EngineError::Validation(
            "Offer target must be the anchor-witness-target sentinel".into(),
        ));
    }

    let start = activity
        .start_time
        .ok_or_else(|| EngineError::Validation("Offer requires startTime".into()))?;
    let end = activity
        .end_time
        .ok_or_else(|| EngineError::Validation("Offer requires endTime".into()))?;
    if end <= start {
        return Err(EngineError::Validation("Offer endTime must be after startTime".into()));
    }
    if end <= Utc::now() {
        return Err(EngineError::Validation("Offer endTime must be in the future".into()));
    }

    let anchor_event = activity
        .object
        .as_ref()
        .and_then(ObjectProperty::as_anchor_event)
        .ok_or_else(|| EngineError::Validation("Offer object must embed an anchor-linkset".into()))?;

    if !anchor_event.urls_within_bounds() || anchor_event.canonical_url().is_none() {
        return Err(EngineError::Validation("Offer anchor-linkset must carry a canonical URL".into()));
    }

    let has_replies = anchor_event
        .payload
        .as_ref()
        .and_then(|p| p.get("replies"))
        .is_some();
    if !has_replies {
        return Err(EngineError::Validation(
            "Offer anchor-linkset payload must carry a replies section".into(),
        ));
    }

    Ok(anchor_event)
}

/// Structural validation for an inbound Accept-of-Offer's `result`
/// (spec.md §4.1).
pub fn validate_accept_of_offer_result(activity: &Activity, expected_anchor: &Iri) -> Result<(), EngineError> {
    let receipt = activity
        .result
        .as_ref()
        .and_then(ObjectProperty::as_receipt)
        .ok_or_else(|| EngineError::Validation("Accept-of-Offer requires a result receipt".into()))?;

    if receipt.end_time <= receipt.start_time {
        return Err(EngineError::Validation("receipt endTime must be after startTime".into()));
    }
    if &receipt.in_reply_to != expected_anchor {
        return Err(EngineError::Validation(
            "receipt inReplyTo must equal the anchor URL carried by the original Offer".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_types::activity::{ActivityType, Attachment, Receipt};
    use uuid::Uuid;

    fn base_activity(actor: &str) -> Activity {
        Activity {
            id: Iri::from(format!("https://x/{}", Uuid::new_v4())),
            activity_type: ActivityType::single(ActivityTypeToken::Follow),
            actor: Iri::from(actor),
            to: vec![],
            published: Utc::now(),
            target: None,
            object: None,
            start_time: None,
            end_time: None,
            result: None,
        }
    }

    #[test]
    fn empty_actor_is_rejected() {
        let mut activity = base_activity("https://a.test");
        activity.actor = Iri::from("");
        assert!(validate_actor_present(&activity).is_err());
    }

    #[test]
    fn follow_requires_self_as_object() {
        let mut activity = base_activity("https://a.test");
        activity.object = Some(ObjectProperty::Iri(Iri::from("https://b.test")));
        assert!(follow_names_self(&activity, &Iri::from("https://b.test")));
        assert!(!follow_names_self(&activity, &Iri::from("https://other.test")));
    }

    #[test]
    fn offer_without_sentinel_target_is_rejected() {
        let mut activity = base_activity("https://a.test");
        activity.target = Some(ObjectProperty::Iri(Iri::from("https://not-a-sentinel")));
        activity.start_time = Some(Utc::now());
        activity.end_time = Some(Utc::now() + chrono::Duration::hours(1));
        assert!(validate_offer(&activity).is_err());
    }

    #[test]
    fn accept_of_offer_requires_matching_in_reply_to() {
        let mut activity = base_activity("https://a.test");
        activity.result = Some(ObjectProperty::Receipt(Receipt {
            start_time: Utc::now(),
            end_time: Utc::now() + chrono::Duration::hours(1),
            attachment: Attachment { content: vec![1, 2, 3] },
            in_reply_to: Iri::from("https://anchor/1"),
        }));
        assert!(validate_accept_of_offer_result(&activity, &Iri::from("https://anchor/1")).is_ok());
        assert!(validate_accept_of_offer_result(&activity, &Iri::from("https://anchor/2")).is_err());
    }
}
