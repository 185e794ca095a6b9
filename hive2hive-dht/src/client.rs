use crate::PendingResult;
use hive2hive_auth::{KeyPair, OwnerKey, SignedEnvelope};
use hive2hive_base::{kind_err, Kind};
use hive2hive_net::{DhtTuple, Overlay, PutOutcome, StoredEntry};
use hive2hive_vers::VersionKey;
use std::sync::Arc;
use std::time::Duration;

/// Typed façade over an [`Overlay`] implementing the sign-on-put,
/// verify-on-get contract of the top-level spec's §4.6 "ProtectedEntryClient".
/// Generic over the overlay so the same client code runs against
/// `MockOverlay` in tests and a real networked overlay in production.
///
/// Signing happens synchronously on the caller's thread (it's cheap and
/// needs only a borrow of the keypair, never its secret material moved
/// across threads); only the already-signed envelope crosses into the
/// background worker.
pub struct ProtectedEntryClient<O> {
    overlay: Arc<O>,
}

impl<O: Overlay + Send + Sync + 'static> ProtectedEntryClient<O> {
    pub fn new(overlay: Arc<O>) -> Self {
        ProtectedEntryClient { overlay }
    }

    /// Whether the underlying overlay can currently be reached (top-level
    /// spec §6, `NoPeerConnection`).
    pub fn is_reachable(&self) -> bool {
        self.overlay.is_reachable()
    }

    /// Signs `payload` with `keypair` and transmits it. Succeeds iff no
    /// entry yet exists at `tuple`, or the existing owner matches
    /// `keypair`'s public half and the new signature verifies (rule 3).
    pub fn put(
        &self,
        tuple: DhtTuple,
        keypair: &KeyPair,
        payload: Vec<u8>,
        based_on: VersionKey,
        version: Option<VersionKey>,
        ttl: Option<Duration>,
    ) -> PendingResult<PutOutcome> {
        let version = version.unwrap_or_else(|| VersionKey::derive(&payload, &based_on));
        let envelope = SignedEnvelope::new(keypair, payload, based_on);
        let overlay = Arc::clone(&self.overlay);
        PendingResult::spawn(move || overlay.put(tuple, version, envelope, ttl))
    }

    /// Fetches the latest (or a specific) version, checks the stored
    /// envelope hasn't been tampered with since it was signed, and reports
    /// it under the tuple's *current* protection owner -- which, after a
    /// `transfer_protection`, is the new owner for every version at the
    /// tuple, not just ones written after the transfer (rule 4).
    pub fn get(
        &self,
        tuple: DhtTuple,
        version: Option<VersionKey>,
    ) -> PendingResult<(Vec<u8>, OwnerKey)> {
        let overlay = Arc::clone(&self.overlay);
        PendingResult::spawn(move || {
            let entry: StoredEntry = overlay
                .get(tuple, version)
                .ok_or_else(|| kind_err(Kind::FileNotFound, "no entry at tuple"))?;
            if !entry.envelope.verify() {
                return Err(kind_err(Kind::IllegalArgument, "stored entry failed verification"));
            }
            let owner = overlay
                .current_owner(tuple)
                .ok_or_else(|| kind_err(Kind::FileNotFound, "no entry at tuple"))?;
            Ok((entry.envelope.payload, owner))
        })
    }

    /// Fetches the latest (or a specific) version and additionally checks
    /// the tuple's *current* protection owner against `expected` (top-level
    /// spec §4.6: "caller may additionally verify under an expected key").
    pub fn get_expecting_owner(
        &self,
        tuple: DhtTuple,
        version: Option<VersionKey>,
        expected: OwnerKey,
    ) -> PendingResult<Vec<u8>> {
        let overlay = Arc::clone(&self.overlay);
        PendingResult::spawn(move || {
            let entry = overlay
                .get(tuple, version)
                .ok_or_else(|| kind_err(Kind::FileNotFound, "no entry at tuple"))?;
            if !entry.envelope.verify() {
                return Err(kind_err(Kind::IllegalArgument, "stored entry failed verification"));
            }
            let owner = overlay
                .current_owner(tuple)
                .ok_or_else(|| kind_err(Kind::FileNotFound, "no entry at tuple"))?;
            if owner != expected {
                return Err(kind_err(Kind::IllegalArgument, "entry owner does not match expectation"));
            }
            Ok(entry.envelope.payload)
        })
    }

    /// Succeeds iff `keypair` matches the stored owner.
    pub fn remove(
        &self,
        tuple: DhtTuple,
        keypair: &KeyPair,
        version: Option<VersionKey>,
    ) -> PendingResult<()> {
        let proof = SignedEnvelope::new(keypair, Vec::new(), VersionKey::ZERO);
        let overlay = Arc::clone(&self.overlay);
        PendingResult::spawn(move || overlay.remove(tuple, version, &proof))
    }

    /// Removes every version in the half-open range `(from, to]`; same
    /// protection rule as [`ProtectedEntryClient::remove`].
    pub fn remove_range(
        &self,
        tuple: DhtTuple,
        keypair: &KeyPair,
        from: VersionKey,
        to: VersionKey,
    ) -> PendingResult<()> {
        let proof = SignedEnvelope::new(keypair, Vec::new(), VersionKey::ZERO);
        let overlay = Arc::clone(&self.overlay);
        PendingResult::spawn(move || overlay.remove_range(tuple, from, to, &proof))
    }

    /// Put-meta with an empty payload signed by `current_owner`, declaring
    /// `new_owner`. Atomically rebinds every version at the tuple (rule 4).
    pub fn transfer_protection(
        &self,
        tuple: DhtTuple,
        current_owner: &KeyPair,
        new_owner: OwnerKey,
    ) -> PendingResult<()> {
        let proof = SignedEnvelope::new(current_owner, Vec::new(), VersionKey::ZERO);
        let overlay = Arc::clone(&self.overlay);
        PendingResult::spawn(move || overlay.transfer_protection(tuple, new_owner, &proof))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hive2hive_net::MockOverlay;

    fn tuple() -> DhtTuple {
        DhtTuple::new([9; 20], [8; 20], [7; 20])
    }

    #[test]
    fn put_then_get_round_trips_and_verifies() {
        let overlay = Arc::new(MockOverlay::new());
        let client = ProtectedEntryClient::new(overlay);
        let keypair = KeyPair::generate();

        let outcome = client
            .put(tuple(), &keypair, b"ignored".to_vec(), VersionKey::ZERO, None, None)
            .wait();
        assert!(outcome.is_ok());

        let (payload, owner) = client
            .get(tuple(), None)
            .wait()
            .expect("entry should exist after put");
        assert_eq!(payload, b"ignored");
        assert_eq!(owner, keypair.public());
    }

    #[test]
    fn remove_requires_the_owning_keypair() {
        let overlay = Arc::new(MockOverlay::new());
        let client = ProtectedEntryClient::new(overlay);
        let owner = KeyPair::generate();
        let intruder = KeyPair::generate();

        client
            .put(tuple(), &owner, b"v1".to_vec(), VersionKey::ZERO, None, None)
            .wait()
            .unwrap();

        assert!(client.remove(tuple(), &intruder, None).wait().is_err());
    }

    #[test]
    fn transfer_protection_rebinds_the_owner() {
        let overlay = Arc::new(MockOverlay::new());
        let client = ProtectedEntryClient::new(overlay);
        let owner = KeyPair::generate();
        let heir = KeyPair::generate();

        client
            .put(tuple(), &owner, b"v1".to_vec(), VersionKey::ZERO, None, None)
            .wait()
            .unwrap();
        client
            .transfer_protection(tuple(), &owner, heir.public())
            .wait()
            .unwrap();

        assert!(client.remove(tuple(), &heir, None).wait().is_ok());
    }
}
