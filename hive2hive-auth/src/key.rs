use ed25519_dalek::{Keypair, PublicKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A keypair whose secret half signs puts/removes/transfers. Not `Clone`:
/// like the upstream `Keypair`, secret key material should not be copied
/// casually.
pub struct KeyPair(pub(crate) Keypair);

impl KeyPair {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        KeyPair(Keypair::generate(&mut csprng))
    }

    pub fn public(&self) -> OwnerKey {
        OwnerKey(self.0.public)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair(public={:?})", self.public())
    }
}

/// The public half of a keypair, used as the owning identity bound to a DHT
/// entry (top-level spec §3: "the owning public key is immutable except
/// through an explicit protection transfer operation"). Wraps
/// `ed25519_dalek::PublicKey` to get `Ord`/`Hash` for use as a map key.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct OwnerKey(pub PublicKey);

impl OwnerKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerKey(")?;
        for b in &self.to_bytes()[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..)")
    }
}

impl PartialEq for OwnerKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}
impl Eq for OwnerKey {}

impl PartialOrd for OwnerKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OwnerKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl std::hash::Hash for OwnerKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn distinct_keypairs_have_distinct_public_keys() {
        let k1 = KeyPair::generate();
        let k2 = KeyPair::generate();
        assert_ne!(k1.public(), k2.public());
    }
}
