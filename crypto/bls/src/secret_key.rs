use crate::{Error, Hash256, PublicKey, Signature, DST};
use blst::min_pk as blst_core;
use rand::RngCore;

/// The byte-size of a BLS12-381 secret key.
pub const SECRET_KEY_BYTES_LEN: usize = 32;

/// A BLS12-381 secret key.
pub struct SecretKey {
    point: blst_core::SecretKey,
}

impl SecretKey {
    /// Generate a new secret key from cryptographically secure randomness.
    pub fn random() -> Self {
        let mut ikm = [0; SECRET_KEY_BYTES_LEN];
        rand::thread_rng().fill_bytes(&mut ikm);

        Self {
            point: blst_core::SecretKey::key_gen(&ikm, &[])
                .expect("key_gen does not fail with an IKM of sufficient length"),
        }
    }

    /// Derive a secret key from 32 bytes of input key material.
    ///
    /// Deterministic: a fixed `ikm` always produces the same key.
    pub fn from_ikm(ikm: &[u8; SECRET_KEY_BYTES_LEN]) -> Self {
        Self {
            point: blst_core::SecretKey::key_gen(ikm, &[])
                .expect("key_gen does not fail with an IKM of sufficient length"),
        }
    }

    /// Returns the public key which corresponds to `self`.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_point(self.point.sk_to_pk())
    }

    /// Sign the (pre-hashed) `msg`.
    pub fn sign(&self, msg: Hash256) -> Signature {
        Signature::from_point(self.point.sign(msg.as_bytes(), DST, &[]))
    }

    pub fn serialize(&self) -> [u8; SECRET_KEY_BYTES_LEN] {
        self.point.to_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SECRET_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SECRET_KEY_BYTES_LEN,
            });
        }

        let point = blst_core::SecretKey::from_bytes(bytes).map_err(|_| Error::InvalidPoint)?;
        Ok(Self { point })
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        Self::deserialize(&self.serialize()).expect("serialized secret key is valid")
    }
}

/// The security of the secret key is not guarded by the type system, however we can at least
/// avoid printing it in logs.
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey<redacted>")
    }
}
