use crate::DhtTuple;
use hive2hive_auth::{OwnerKey, SignedEnvelope};
use hive2hive_base::{kind_err, Error, Kind};
use hive2hive_vers::{VersionGraph, VersionKey};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// What the DHT reports back after a put. A rejected put never changes
/// overlay state (top-level spec §4.6, rule 3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PutOutcome {
    Stored,
    RejectedNotOwner,
    RejectedBadSignature,
    RejectedUnknownBasedOn,
}

#[derive(Clone, Debug)]
pub struct StoredEntry {
    pub envelope: SignedEnvelope,
    pub expires_at: Option<Instant>,
}

/// The receiver-side half of the protected-entry contract (top-level spec
/// §4.6). A real overlay enforces these rules at the node that owns the
/// tuple's location key; `MockOverlay` enforces them in-process so the
/// client façade in hive2hive-dht can be exercised without real networking
/// (full overlay routing/bootstrap stays out of scope, §1 Non-goals).
pub trait Overlay {
    /// Whether this overlay can currently be reached at all, independent of
    /// any particular tuple (top-level spec §6: the façade surfaces
    /// `NoPeerConnection` when the overlay is unreachable). A real overlay
    /// would report this from its routing layer; `MockOverlay` just flips a
    /// flag, since there's no network here to actually lose.
    fn is_reachable(&self) -> bool;

    fn put(
        &self,
        tuple: DhtTuple,
        version: VersionKey,
        envelope: SignedEnvelope,
        ttl: Option<Duration>,
    ) -> Result<PutOutcome, Error>;

    fn get(&self, tuple: DhtTuple, version: Option<VersionKey>) -> Option<StoredEntry>;

    /// The tuple's current protection owner (top-level spec §4.6, rule 4):
    /// this is what `transfer_protection` rebinds, independent of which
    /// owner originally signed any individual stored version. Callers
    /// should attribute ownership to this, not to a stored envelope's own
    /// `owner` field, which never changes after the fact (it's the
    /// signature's own key, not the tuple's live protection key).
    fn current_owner(&self, tuple: DhtTuple) -> Option<OwnerKey>;

    fn remove(
        &self,
        tuple: DhtTuple,
        version: Option<VersionKey>,
        proof: &SignedEnvelope,
    ) -> Result<(), Error>;

    fn remove_range(
        &self,
        tuple: DhtTuple,
        from: VersionKey,
        to: VersionKey,
        proof: &SignedEnvelope,
    ) -> Result<(), Error>;

    fn transfer_protection(
        &self,
        tuple: DhtTuple,
        new_owner: OwnerKey,
        proof: &SignedEnvelope,
    ) -> Result<(), Error>;
}

struct TupleState {
    owner: Option<OwnerKey>,
    versions: VersionGraph<DhtTuple>,
    entries: BTreeMap<VersionKey, StoredEntry>,
    head: Option<VersionKey>,
}

impl TupleState {
    fn new() -> Self {
        TupleState {
            owner: None,
            versions: VersionGraph::new(),
            entries: BTreeMap::new(),
            head: None,
        }
    }
}

/// In-memory stand-in for the external DHT overlay. Enforces ownership,
/// signature, and lineage rules exactly as a real receiver node would;
/// everything about routing, replication, and network transport is elided.
pub struct MockOverlay {
    tuples: Mutex<BTreeMap<DhtTuple, TupleState>>,
    reachable: AtomicBool,
}

impl Default for MockOverlay {
    fn default() -> Self {
        MockOverlay::new()
    }
}

impl MockOverlay {
    pub fn new() -> Self {
        MockOverlay {
            tuples: Mutex::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulates the overlay going up or down, for exercising the
    /// `NoPeerConnection` precondition at the facade boundary.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl Overlay for MockOverlay {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    fn put(
        &self,
        tuple: DhtTuple,
        version: VersionKey,
        envelope: SignedEnvelope,
        ttl: Option<Duration>,
    ) -> Result<PutOutcome, Error> {
        if !envelope.verify() {
            return Ok(PutOutcome::RejectedBadSignature);
        }

        let mut tuples = self.tuples.lock().unwrap();
        let state = tuples.entry(tuple).or_insert_with(TupleState::new);

        match state.owner {
            None => state.owner = Some(envelope.owner),
            Some(owner) if owner == envelope.owner => {}
            Some(_) => return Ok(PutOutcome::RejectedNotOwner),
        }

        if !envelope.based_on.is_zero() && !state.versions.contains(&tuple, envelope.based_on) {
            return Ok(PutOutcome::RejectedUnknownBasedOn);
        }

        state.versions.record(tuple, version, envelope.based_on)?;
        state.entries.insert(
            version,
            StoredEntry {
                envelope,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        state.head = Some(version);
        Ok(PutOutcome::Stored)
    }

    fn get(&self, tuple: DhtTuple, version: Option<VersionKey>) -> Option<StoredEntry> {
        let tuples = self.tuples.lock().unwrap();
        let state = tuples.get(&tuple)?;
        let version = version.or(state.head)?;
        let entry = state.entries.get(&version)?;
        if let Some(expires_at) = entry.expires_at {
            if expires_at <= Instant::now() {
                return None;
            }
        }
        Some(entry.clone())
    }

    fn current_owner(&self, tuple: DhtTuple) -> Option<OwnerKey> {
        let tuples = self.tuples.lock().unwrap();
        tuples.get(&tuple)?.owner
    }

    fn remove(
        &self,
        tuple: DhtTuple,
        version: Option<VersionKey>,
        proof: &SignedEnvelope,
    ) -> Result<(), Error> {
        let mut tuples = self.tuples.lock().unwrap();
        let state = tuples
            .get_mut(&tuple)
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such tuple"))?;
        authorize(state, proof)?;

        match version {
            Some(v) => {
                state.entries.remove(&v);
            }
            None => state.entries.clear(),
        }
        Ok(())
    }

    fn remove_range(
        &self,
        tuple: DhtTuple,
        from: VersionKey,
        to: VersionKey,
        proof: &SignedEnvelope,
    ) -> Result<(), Error> {
        let mut tuples = self.tuples.lock().unwrap();
        let state = tuples
            .get_mut(&tuple)
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such tuple"))?;
        authorize(state, proof)?;

        for version in state.versions.range(&tuple, from, to)? {
            state.entries.remove(&version);
        }
        Ok(())
    }

    fn transfer_protection(
        &self,
        tuple: DhtTuple,
        new_owner: OwnerKey,
        proof: &SignedEnvelope,
    ) -> Result<(), Error> {
        let mut tuples = self.tuples.lock().unwrap();
        let state = tuples
            .get_mut(&tuple)
            .ok_or_else(|| kind_err(Kind::FileNotFound, "no such tuple"))?;
        authorize(state, proof)?;
        // Rebinds the tuple's protection atomically for every past and
        // future version: stored envelopes keep the signature their
        // original signer actually produced (a real ed25519 signature
        // can't be forged under a key we never held), so ownership is
        // tracked here, on the tuple, and `current_owner` is what callers
        // must check rather than a stored envelope's own `owner` field.
        state.owner = Some(new_owner);
        Ok(())
    }
}

fn authorize(state: &TupleState, proof: &SignedEnvelope) -> Result<(), Error> {
    if !proof.verify() {
        return Err(kind_err(Kind::IllegalArgument, "bad signature on proof"));
    }
    match state.owner {
        Some(owner) if owner == proof.owner => Ok(()),
        _ => Err(kind_err(Kind::IllegalArgument, "not the current owner")),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hive2hive_auth::KeyPair;

    fn tuple() -> DhtTuple {
        DhtTuple::new([1; 20], [2; 20], [3; 20])
    }

    #[test]
    fn first_put_establishes_ownership_and_stores() {
        let overlay = MockOverlay::new();
        let keypair = KeyPair::generate();
        let env = SignedEnvelope::new(&keypair, b"v1".to_vec(), VersionKey::ZERO);
        let version = VersionKey::from_seed(1);
        let outcome = overlay.put(tuple(), version, env, None).unwrap();
        assert_eq!(outcome, PutOutcome::Stored);
        assert!(overlay.get(tuple(), Some(version)).is_some());
    }

    #[test]
    fn put_from_a_different_owner_is_rejected() {
        let overlay = MockOverlay::new();
        let owner = KeyPair::generate();
        let intruder = KeyPair::generate();

        let first = SignedEnvelope::new(&owner, b"v1".to_vec(), VersionKey::ZERO);
        overlay
            .put(tuple(), VersionKey::from_seed(1), first, None)
            .unwrap();

        let second = SignedEnvelope::new(&intruder, b"v2".to_vec(), VersionKey::from_seed(1));
        let outcome = overlay
            .put(tuple(), VersionKey::from_seed(2), second, None)
            .unwrap();
        assert_eq!(outcome, PutOutcome::RejectedNotOwner);
    }

    #[test]
    fn put_on_unknown_based_on_is_rejected() {
        let overlay = MockOverlay::new();
        let owner = KeyPair::generate();
        let env = SignedEnvelope::new(&owner, b"v2".to_vec(), VersionKey::from_seed(99));
        let outcome = overlay
            .put(tuple(), VersionKey::from_seed(2), env, None)
            .unwrap();
        assert_eq!(outcome, PutOutcome::RejectedUnknownBasedOn);
    }

    #[test]
    fn transfer_protection_changes_who_may_remove() {
        let overlay = MockOverlay::new();
        let owner = KeyPair::generate();
        let heir = KeyPair::generate();

        let env = SignedEnvelope::new(&owner, b"v1".to_vec(), VersionKey::ZERO);
        overlay
            .put(tuple(), VersionKey::from_seed(1), env, None)
            .unwrap();

        let proof = SignedEnvelope::new(&owner, Vec::new(), VersionKey::ZERO);
        overlay
            .transfer_protection(tuple(), heir.public(), &proof)
            .unwrap();

        let old_owner_proof = SignedEnvelope::new(&owner, Vec::new(), VersionKey::ZERO);
        assert!(overlay
            .remove(tuple(), None, &old_owner_proof)
            .is_err());

        let heir_proof = SignedEnvelope::new(&heir, Vec::new(), VersionKey::ZERO);
        assert!(overlay.remove(tuple(), None, &heir_proof).is_ok());
    }

    #[test]
    fn remove_range_deletes_only_the_requested_half_open_span() {
        let overlay = MockOverlay::new();
        let owner = KeyPair::generate();

        let v1 = VersionKey::from_seed(1);
        let v2 = VersionKey::from_seed(2);
        let v3 = VersionKey::from_seed(3);
        let env1 = SignedEnvelope::new(&owner, b"v1".to_vec(), VersionKey::ZERO);
        overlay.put(tuple(), v1, env1, None).unwrap();
        let env2 = SignedEnvelope::new(&owner, b"v2".to_vec(), v1);
        overlay.put(tuple(), v2, env2, None).unwrap();
        let env3 = SignedEnvelope::new(&owner, b"v3".to_vec(), v2);
        overlay.put(tuple(), v3, env3, None).unwrap();

        let proof = SignedEnvelope::new(&owner, Vec::new(), VersionKey::ZERO);
        overlay.remove_range(tuple(), v1, v2, &proof).unwrap();

        assert!(overlay.get(tuple(), Some(v1)).is_some());
        assert!(overlay.get(tuple(), Some(v2)).is_none());
        assert!(overlay.get(tuple(), Some(v3)).is_some());
    }
}
