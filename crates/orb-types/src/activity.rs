//! Activity, the activity-type set, and the `ObjectProperty` tagged union.
//!
//! Activity polymorphism is modeled as a set of tokens, not a class
//! hierarchy (spec.md §9): handlers switch on the token set rather than on
//! an inheritance tree.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Iri;

//─────────────────────────────
//  Activity type set
//─────────────────────────────

/// One recognized activity-type token.
///
/// A single activity MAY carry more than one of these (e.g. an
/// Accept-of-Offer still just carries `Accept`; the "Accept-of-Offer" shape
/// is distinguished by the embedded object's type, not by a composite
/// token). Composite type sets do occur on the wire (spec.md §6) so the
/// engine always reasons about a [`ActivityType`] set, never a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityTypeToken {
    /// Create – publish an anchor event.
    Create,
    /// Follow – request to follow this node.
    Follow,
    /// Invite – with a witness target, request to become a witness.
    Invite,
    /// Accept – acknowledges a Follow, Invite, or Offer.
    Accept,
    /// Reject – declines a Follow or Invite.
    Reject,
    /// Announce – re-broadcast a collection of anchor-event references.
    Announce,
    /// Offer – request witnessing of an anchor-linkset payload.
    Offer,
    /// Like – acknowledge an anchor event or an Offer.
    Like,
    /// Undo – retract a previously asserted reference.
    Undo,
}

/// A set of one or more [`ActivityTypeToken`]s carried by a single activity.
///
/// Backed by a `BTreeSet` (small, ordered, trivially comparable) rather than
/// a bitflags integer: activity type sets are rarely larger than two tokens
/// and ordering makes wire round-trips deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityType(BTreeSet<ActivityTypeToken>);

impl ActivityType {
    /// Construct a type set from a single token.
    pub fn single(token: ActivityTypeToken) -> Self {
        let mut set = BTreeSet::new();
        set.insert(token);
        ActivityType(set)
    }

    /// Construct a type set from any iterable of tokens.
    pub fn from_tokens<I: IntoIterator<Item = ActivityTypeToken>>(tokens: I) -> Self {
        ActivityType(tokens.into_iter().collect())
    }

    /// True if this set contains `token`.
    pub fn contains(&self, token: ActivityTypeToken) -> bool {
        self.0.contains(&token)
    }

    /// Iterate the tokens in this set.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityTypeToken> {
        self.0.iter()
    }

    /// True if the set is empty (never valid on the wire, but representable).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ActivityType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let tokens: Vec<&ActivityTypeToken> = self.0.iter().collect();
        tokens.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ActivityType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Accept either a single token or an array of tokens, matching
        // JSON-LD's "one-or-many" convention for the `type` property.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(ActivityTypeToken),
            Many(Vec<ActivityTypeToken>),
        }
        let tokens = match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(t) => t,
        };
        Ok(ActivityType::from_tokens(tokens))
    }
}

//─────────────────────────────
//  ObjectProperty tagged union
//─────────────────────────────

/// A tagged union over every shape an activity's `object`/`target`/`result`
/// property may take.
///
/// Modeled as a Rust enum (a true tagged union) rather than the
/// inheritance-style "polymorphic object" the wire form suggests - spec.md
/// §9 calls this out explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ObjectProperty {
    /// A bare IRI reference (e.g. `object: "https://b.test"` on a Follow).
    Iri(Iri),
    /// An embedded anchor-event reference.
    AnchorEvent(crate::anchor::AnchorEvent),
    /// An embedded activity (used by Accept/Reject to carry the referenced
    /// activity inline when convenient).
    Activity(Box<Activity>),
    /// An unordered collection of object properties (used by Announce).
    Collection(Vec<ObjectProperty>),
    /// An ordered collection of object properties.
    OrderedCollection(Vec<ObjectProperty>),
    /// A witness receipt, carried in the `result` of an Accept-of-Offer.
    Receipt(Receipt),
    /// An opaque content document blob (e.g. a verifiable credential JSON
    /// body) that validation treats as structured JSON without a more
    /// specific shape.
    Document(serde_json::Value),
}

impl ObjectProperty {
    /// Borrow the IRI if this property is the bare-IRI variant.
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            ObjectProperty::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Borrow the embedded anchor event, if any.
    pub fn as_anchor_event(&self) -> Option<&crate::anchor::AnchorEvent> {
        match self {
            ObjectProperty::AnchorEvent(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the embedded activity, if any.
    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            ObjectProperty::Activity(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the items of a (ordered or unordered) collection, if any.
    pub fn as_collection(&self) -> Option<&[ObjectProperty]> {
        match self {
            ObjectProperty::Collection(items) | ObjectProperty::OrderedCollection(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    /// Borrow the embedded receipt, if any.
    pub fn as_receipt(&self) -> Option<&Receipt> {
        match self {
            ObjectProperty::Receipt(r) => Some(r),
            _ => None,
        }
    }
}

/// The receipt embedded in an Accept-of-Offer's `result`.
///
/// Required shape per spec.md §4.1: `startTime`, `endTime`, exactly one
/// attachment (the witness proof bytes, base64-encoded on the wire), and an
/// `inReplyTo` equal to the anchor URL carried by the original Offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Receipt validity window start.
    pub start_time: DateTime<Utc>,
    /// Receipt validity window end.
    pub end_time: DateTime<Utc>,
    /// Exactly one attachment carrying the witness proof bytes.
    pub attachment: Attachment,
    /// The anchor URL this receipt replies to.
    pub in_reply_to: Iri,
}

/// A single proof attachment on a [`Receipt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Raw proof bytes produced by the witness collaborator.
    pub content: Vec<u8>,
}

//─────────────────────────────
//  Activity
//─────────────────────────────

/// A federation activity, as defined by spec.md §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity id (URL); immutable once persisted.
    pub id: Iri,
    /// One or more activity-type tokens.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Originating actor.
    pub actor: Iri,
    /// Recipients.
    pub to: Vec<Iri>,
    /// Wall-clock publication timestamp.
    pub published: DateTime<Utc>,
    /// The `target` object property (e.g. the witness-target sentinel on
    /// Offer/Invite-witness, or the followee on Follow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectProperty>,
    /// The `object` object property (e.g. the anchor-linkset on Create, the
    /// followed activity on Accept/Reject).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectProperty>,
    /// Witness window start (Offer only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Witness window end (Offer only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Result of processing, e.g. the receipt on Accept-of-Offer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ObjectProperty>,
}

impl Activity {
    /// True if `to` contains more recipients than `MAX_ACTIVITY_RECIPIENTS`
    /// allows — a structural validation guard against memory-exhaustion
    /// activities, mirroring `toka_types`'s size-bound constants.
    pub fn recipients_within_bounds(&self) -> bool {
        self.to.len() <= crate::MAX_ACTIVITY_RECIPIENTS
    }
}
