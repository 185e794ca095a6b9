use crate::{KeyPair, OwnerKey};
use ed25519_dalek::Signer;
use ed25519_dalek::Verifier;
use hive2hive_vers::VersionKey;
use serde::{Deserialize, Serialize};

pub type Signature = ed25519_dalek::Signature;

/// Rule 1 of the protected-entry contract (top-level spec §4.6): the
/// signature covers both the payload and the version lineage reference, so
/// tampering with either invalidates verification.
pub fn signed_message(payload: &[u8], based_on: &VersionKey) -> Vec<u8> {
    let mut msg = Vec::with_capacity(payload.len() + 20);
    msg.extend_from_slice(payload);
    msg.extend_from_slice(&based_on.0);
    msg
}

pub fn sign(keypair: &KeyPair, payload: &[u8], based_on: &VersionKey) -> Signature {
    keypair.0.sign(&signed_message(payload, based_on))
}

pub fn verify(owner: &OwnerKey, payload: &[u8], based_on: &VersionKey, sig: &Signature) -> bool {
    owner
        .0
        .verify(&signed_message(payload, based_on), sig)
        .is_ok()
}

/// A value bound to the keypair that produced it, in the shape every
/// protected DHT entry value takes on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    pub based_on: VersionKey,
    pub owner: OwnerKey,
    pub signature: Signature,
}

impl SignedEnvelope {
    pub fn new(keypair: &KeyPair, payload: Vec<u8>, based_on: VersionKey) -> Self {
        let signature = sign(keypair, &payload, &based_on);
        SignedEnvelope {
            payload,
            based_on,
            owner: keypair.public(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        verify(&self.owner, &self.payload, &self.based_on, &self.signature)
    }
}
