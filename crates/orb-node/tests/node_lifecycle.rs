//! End-to-end exercise of [`Node`] through its public API, matching
//! `toka-runtime/tests/runtime_lifecycle.rs`'s style of driving a whole
//! start/submit/stop cycle against the assembled binary's own wiring
//! rather than a single crate's internals.

use chrono::Utc;

use orb_node::config::NodeConfig;
use orb_node::Node;
use orb_types::activity::{Activity, ActivityType, ActivityTypeToken, ObjectProperty};
use orb_types::Iri;

fn config() -> NodeConfig {
    NodeConfig { self_iri: "https://us.test".to_string(), ..NodeConfig::default() }
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

/// Submitting an inbound Follow through the assembled node produces an
/// Accept reply and routes it through the outbox engine, proving the node
/// actually wires its inbox and outbox together rather than just
/// constructing them side by side.
#[tokio::test]
async fn submit_inbound_follow_routes_its_reply_through_the_outbox() {
    let node = Node::new(&config()).await.unwrap();

    let outcome = node.submit_inbound(follow("https://them.test", "https://us.test")).await.unwrap();

    let reply = outcome.reply.expect("Follow produces an Accept/Reject reply");
    assert!(reply.activity_type.contains(ActivityTypeToken::Accept));
}

/// Submitting an outbound Create is delivered via the outbox engine.
#[tokio::test]
async fn submit_outbound_create_is_accepted_by_the_outbox() {
    let node = Node::new(&config()).await.unwrap();

    let create = Activity {
        id: Iri::from("https://us.test/activities/1"),
        activity_type: ActivityType::single(ActivityTypeToken::Create),
        actor: Iri::from("https://us.test"),
        to: vec![],
        published: Utc::now(),
        target: None,
        object: Some(ObjectProperty::AnchorEvent(orb_types::anchor::AnchorEvent {
            urls: vec![Iri::from("https://anchor/1")],
            payload: None,
            author: Iri::from("https://us.test"),
            parents: vec![],
        })),
        start_time: None,
        end_time: None,
        result: None,
    };

    let outcome = node.submit_outbound(create).await.unwrap();
    assert!(outcome.delivered.is_some());
}
