#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **orb-store-memory** – In-memory Reference Store driver for the orb
//! federation node.
//!
//! This crate provides a fast, non-persistent implementation of every
//! `orb-store-core` trait, suitable for testing and for nodes that don't
//! need durability across restarts. All data is stored in memory using
//! `tokio::sync::RwLock`-guarded tables, mirroring `toka-store-memory`'s
//! `MemoryBackend`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use orb_store_core::{
    ActivityCriteria, ActivityStore, ActorStore, AnchorStatusStore, LogEntryStore,
    LogMonitorStore, QueryIter, ReferenceStore, StorageError, StoreResult, WitnessProofStore,
};
use orb_types::{
    activity::Activity,
    actor::Actor,
    anchor::{AnchorStatus, AnchorStatusRecord},
    log::{LogEntry, LogMonitorRecord},
    reference::{Reference, ReferenceCriteria, ReferenceKind},
    witness::WitnessProof,
    Iri,
};

//─────────────────────────────
//  In-memory reference store
//─────────────────────────────

/// An in-memory, non-persistent Reference Store.
///
/// All six trait surfaces (`ActivityStore`, `ReferenceStore`, `ActorStore`,
/// `AnchorStatusStore`, `WitnessProofStore`, `LogEntryStore`,
/// `LogMonitorStore`) are implemented over a handful of `RwLock`-guarded
/// tables, so one clone of this struct can be shared across the engine,
/// proof coordinator, and log monitor via `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    activities: Arc<RwLock<HashMap<String, Activity>>>,
    references: Arc<RwLock<Vec<Reference>>>,
    actors: Arc<RwLock<HashMap<String, Actor>>>,
    anchor_status: Arc<RwLock<HashMap<String, AnchorStatusRecord>>>,
    witness_proofs: Arc<RwLock<Vec<WitnessProof>>>,
    log_entries: Arc<RwLock<HashMap<String, Vec<LogEntry>>>>,
    log_monitors: Arc<RwLock<HashMap<String, LogMonitorRecord>>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all stored state. Useful between test cases.
    pub async fn clear(&self) {
        self.activities.write().await.clear();
        self.references.write().await.clear();
        self.actors.write().await.clear();
        self.anchor_status.write().await.clear();
        self.witness_proofs.write().await.clear();
        self.log_entries.write().await.clear();
        self.log_monitors.write().await.clear();
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn put(&self, activity: &Activity) -> StoreResult<()> {
        self.activities
            .write()
            .await
            .entry(activity.id.0.clone())
            .or_insert_with(|| activity.clone());
        Ok(())
    }

    async fn get_activity(
        &self,
        reference_kind: ReferenceKind,
        object_iri: &Iri,
        activity_iri: &Iri,
    ) -> StoreResult<Option<Activity>> {
        let has_link = self
            .references
            .read()
            .await
            .iter()
            .any(|r| r.kind == reference_kind && &r.object == object_iri && &r.target == activity_iri);
        if !has_link {
            return Ok(None);
        }
        Ok(self.activities.read().await.get(&activity_iri.0).cloned())
    }

    async fn get_by_id(&self, activity_iri: &Iri) -> StoreResult<Option<Activity>> {
        Ok(self.activities.read().await.get(&activity_iri.0).cloned())
    }

    async fn query_activities(&self, criteria: ActivityCriteria) -> StoreResult<QueryIter<Activity>> {
        let references = self.references.read().await;
        let activities = self.activities.read().await;

        let matching_ids: Vec<String> = references
            .iter()
            .filter(|r| {
                criteria.reference_kind.map(|k| k == r.kind).unwrap_or(true)
                    && criteria.object.as_ref().map(|o| o == &r.object).unwrap_or(true)
                    && criteria.reference.as_ref().map(|t| t == &r.target).unwrap_or(true)
            })
            .map(|r| r.target.0.clone())
            .collect();

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for id in matching_ids {
            if seen.insert(id.clone()) {
                if let Some(activity) = activities.get(&id) {
                    out.push(activity.clone());
                }
            }
        }
        Ok(QueryIter::new(out))
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn add_reference(&self, kind: ReferenceKind, object: &Iri, target: &Iri) -> StoreResult<()> {
        let mut refs = self.references.write().await;
        let new_ref = Reference::new(kind, object.clone(), target.clone());
        if !refs.contains(&new_ref) {
            refs.push(new_ref);
        }
        Ok(())
    }

    async fn delete_reference(&self, kind: ReferenceKind, object: &Iri, target: &Iri) -> StoreResult<()> {
        let mut refs = self.references.write().await;
        refs.retain(|r| !(r.kind == kind && &r.object == object && &r.target == target));
        Ok(())
    }

    async fn has_reference(&self, kind: ReferenceKind, object: &Iri, target: &Iri) -> StoreResult<bool> {
        Ok(self
            .references
            .read()
            .await
            .iter()
            .any(|r| r.kind == kind && &r.object == object && &r.target == target))
    }

    async fn query_references(
        &self,
        kind: ReferenceKind,
        criteria: ReferenceCriteria,
    ) -> StoreResult<QueryIter<Reference>> {
        let mut criteria = criteria;
        criteria.kind = Some(kind);
        let out: Vec<Reference> = self
            .references
            .read()
            .await
            .iter()
            .filter(|r| criteria.matches(r))
            .cloned()
            .collect();
        Ok(QueryIter::new(out))
    }
}

#[async_trait]
impl ActorStore for MemoryStore {
    async fn get_actor(&self, iri: &Iri) -> StoreResult<Option<Actor>> {
        Ok(self.actors.read().await.get(&iri.0).cloned())
    }

    async fn put_actor(&self, actor: &Actor) -> StoreResult<()> {
        self.actors.write().await.insert(actor.id.0.clone(), actor.clone());
        Ok(())
    }
}

#[async_trait]
impl AnchorStatusStore for MemoryStore {
    async fn add_status(&self, record: &AnchorStatusRecord) -> StoreResult<()> {
        let mut statuses = self.anchor_status.write().await;
        match statuses.get(&record.anchor_id.0) {
            Some(existing) if existing.status == AnchorStatus::Completed => {
                // Invariant 3: a completed anchor is never demoted. Silently
                // keep the existing completed row rather than erroring, so
                // retried "add" calls from a replayed Offer stay idempotent.
                Ok(())
            }
            _ => {
                statuses.insert(record.anchor_id.0.clone(), record.clone());
                Ok(())
            }
        }
    }

    async fn get_status(&self, anchor_id: &Iri) -> StoreResult<Option<AnchorStatusRecord>> {
        Ok(self.anchor_status.read().await.get(&anchor_id.0).cloned())
    }
}

#[async_trait]
impl WitnessProofStore for MemoryStore {
    async fn add_proof(&self, proof: &WitnessProof) -> StoreResult<()> {
        let mut proofs = self.witness_proofs.write().await;
        if let Some(existing) = proofs
            .iter_mut()
            .find(|p| p.anchor_id == proof.anchor_id && p.witness == proof.witness)
        {
            // Idempotent on (anchor_id, witness): fill in proof bytes once,
            // a second AddProof from the same witness is a no-op.
            if existing.proof.is_none() {
                existing.proof = proof.proof.clone();
                existing.kind = proof.kind;
            }
        } else {
            proofs.push(proof.clone());
        }
        Ok(())
    }

    async fn get(&self, anchor_id: &Iri) -> StoreResult<Vec<WitnessProof>> {
        Ok(self
            .witness_proofs
            .read()
            .await
            .iter()
            .filter(|p| &p.anchor_id == anchor_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LogEntryStore for MemoryStore {
    async fn store_log_entries(&self, log_url: &str, start: u64, end: u64, entries: &[LogEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let expected = (end - start + 1) as usize;
        if entries.len() != expected {
            return Err(StorageError::Backend(format!(
                "entries len {} does not match range [{start}, {end}]",
                entries.len()
            )));
        }
        let mut log_entries = self.log_entries.write().await;
        let slot = log_entries.entry(log_url.to_string()).or_default();
        for entry in entries {
            match slot.iter_mut().find(|e| e.index == entry.index) {
                Some(existing) => *existing = entry.clone(),
                None => slot.push(entry.clone()),
            }
        }
        slot.sort_by_key(|e| e.index);
        Ok(())
    }

    async fn get_log_entries_from(&self, log_url: &str, from: u64) -> StoreResult<QueryIter<LogEntry>> {
        let log_entries = self.log_entries.read().await;
        let out = log_entries
            .get(log_url)
            .map(|entries| entries.iter().filter(|e| e.index >= from).cloned().collect())
            .unwrap_or_default();
        Ok(QueryIter::new(out))
    }

    async fn fail_log_entries_from(&self, log_url: &str, from: u64) -> StoreResult<()> {
        let mut log_entries = self.log_entries.write().await;
        if let Some(entries) = log_entries.get_mut(log_url) {
            for entry in entries.iter_mut().filter(|e| e.index >= from) {
                entry.status = orb_types::log::LogEntryStatus::Failed;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LogMonitorStore for MemoryStore {
    async fn get_monitor(&self, log_url: &str) -> StoreResult<Option<LogMonitorRecord>> {
        Ok(self.log_monitors.read().await.get(log_url).cloned())
    }

    async fn put_monitor(&self, record: &LogMonitorRecord) -> StoreResult<()> {
        self.log_monitors
            .write()
            .await
            .insert(record.log_url.clone(), record.clone());
        Ok(())
    }

    async fn list_active_logs(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .log_monitors
            .read()
            .await
            .values()
            .filter(|m| m.active)
            .map(|m| m.log_url.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn iri(s: &str) -> Iri {
        Iri::from(s)
    }

    #[tokio::test]
    async fn reference_add_is_idempotent() {
        let store = MemoryStore::new();
        store
            .add_reference(ReferenceKind::Follower, &iri("b"), &iri("a"))
            .await
            .unwrap();
        store
            .add_reference(ReferenceKind::Follower, &iri("b"), &iri("a"))
            .await
            .unwrap();
        let refs: Vec<_> = store
            .query_references(ReferenceKind::Follower, ReferenceCriteria::default())
            .await
            .unwrap()
            .collect();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn delete_reference_is_idempotent() {
        let store = MemoryStore::new();
        store.delete_reference(ReferenceKind::Follower, &iri("b"), &iri("a")).await.unwrap();
        store
            .add_reference(ReferenceKind::Follower, &iri("b"), &iri("a"))
            .await
            .unwrap();
        store.delete_reference(ReferenceKind::Follower, &iri("b"), &iri("a")).await.unwrap();
        store.delete_reference(ReferenceKind::Follower, &iri("b"), &iri("a")).await.unwrap();
        assert!(!store.has_reference(ReferenceKind::Follower, &iri("b"), &iri("a")).await.unwrap());
    }

    #[tokio::test]
    async fn completed_anchor_status_is_never_demoted() {
        let store = MemoryStore::new();
        let anchor = iri("anchor-1");
        let mut record = AnchorStatusRecord::new_in_process(anchor.clone(), Duration::hours(1));
        store.add_status(&record).await.unwrap();
        record.try_complete();
        store.add_status(&record).await.unwrap();

        let demote_attempt = AnchorStatusRecord::new_in_process(anchor.clone(), Duration::hours(1));
        store.add_status(&demote_attempt).await.unwrap();

        let fetched = store.get_status(&anchor).await.unwrap().unwrap();
        assert_eq!(fetched.status, orb_types::anchor::AnchorStatus::Completed);
    }

    #[tokio::test]
    async fn witness_proof_add_is_idempotent_per_witness() {
        let store = MemoryStore::new();
        let anchor = iri("anchor-1");
        let witness = iri("https://b.test");
        store
            .add_proof(&WitnessProof::pending(anchor.clone(), witness.clone(), orb_types::witness::WitnessKind::System))
            .await
            .unwrap();
        store
            .add_proof(&WitnessProof {
                anchor_id: anchor.clone(),
                witness: witness.clone(),
                kind: orb_types::witness::WitnessKind::System,
                proof: Some(vec![1, 2, 3]),
            })
            .await
            .unwrap();
        // Second fill attempt must not overwrite the first proof bytes.
        store
            .add_proof(&WitnessProof {
                anchor_id: anchor.clone(),
                witness: witness.clone(),
                kind: orb_types::witness::WitnessKind::System,
                proof: Some(vec![9, 9, 9]),
            })
            .await
            .unwrap();

        let proofs = store.get(&anchor).await.unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].proof, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn log_entries_contiguous_range_stored() {
        let store = MemoryStore::new();
        let entries = vec![
            LogEntry { log_url: "L".into(), index: 0, leaf_input: vec![0], status: orb_types::log::LogEntryStatus::Ok },
            LogEntry { log_url: "L".into(), index: 1, leaf_input: vec![1], status: orb_types::log::LogEntryStatus::Ok },
        ];
        store.store_log_entries("L", 0, 1, &entries).await.unwrap();
        let fetched: Vec<_> = store.get_log_entries_from("L", 0).await.unwrap().collect();
        assert_eq!(fetched.len(), 2);

        store.fail_log_entries_from("L", 1).await.unwrap();
        let fetched: Vec<_> = store.get_log_entries_from("L", 0).await.unwrap().collect();
        assert_eq!(fetched[0].status, orb_types::log::LogEntryStatus::Ok);
        assert_eq!(fetched[1].status, orb_types::log::LogEntryStatus::Failed);
    }

    #[tokio::test]
    async fn active_logs_listed() {
        let store = MemoryStore::new();
        store.put_monitor(&LogMonitorRecord::new("L1")).await.unwrap();
        let mut inactive = LogMonitorRecord::new("L2");
        inactive.active = false;
        store.put_monitor(&inactive).await.unwrap();

        let active = store.list_active_logs().await.unwrap();
        assert_eq!(active, vec!["L1".to_string()]);
    }

    #[tokio::test]
    async fn clear_resets_every_table() {
        let store = MemoryStore::new();
        store.put_monitor(&LogMonitorRecord::new("L1")).await.unwrap();
        store.add_reference(ReferenceKind::Follower, &iri("b"), &iri("a")).await.unwrap();
        store.clear().await;
        assert!(store.list_active_logs().await.unwrap().is_empty());
        assert!(!store.has_reference(ReferenceKind::Follower, &iri("b"), &iri("a")).await.unwrap());
    }
}
