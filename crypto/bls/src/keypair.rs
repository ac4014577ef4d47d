use crate::{PublicKey, SecretKey};
use std::fmt;

/// A BLS12-381 keypair.
#[derive(Clone)]
pub struct Keypair {
    pub pk: PublicKey,
    pub sk: SecretKey,
}

impl Keypair {
    /// Instantiate `Self` from an existing secret key.
    pub fn from_components(pk: PublicKey, sk: SecretKey) -> Self {
        Self { pk, sk }
    }

    /// Generate a new random keypair.
    pub fn random() -> Self {
        let sk = SecretKey::random();
        Self {
            pk: sk.public_key(),
            sk,
        }
    }
}

impl fmt::Debug for Keypair {
    /// Omits the secret key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair {{ pk: {:?} }}", self.pk)
    }
}
