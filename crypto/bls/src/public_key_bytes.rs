use crate::{Error, PublicKey, PUBLIC_KEY_BYTES_LEN};

/// The compressed bytes of a BLS12-381 public key, without any guarantee that they represent a
/// valid curve point.
///
/// This type exists because on-chain objects (e.g., deposits) may contain arbitrary byte strings
/// in public key position which must survive SSZ round-trips.
#[derive(Clone, Copy)]
pub struct PublicKeyBytes {
    bytes: [u8; PUBLIC_KEY_BYTES_LEN],
}

impl PublicKeyBytes {
    /// Returns all-zero bytes. Decompression of this value will fail.
    pub fn empty() -> Self {
        Self {
            bytes: [0; PUBLIC_KEY_BYTES_LEN],
        }
    }

    /// Attempt to decompress the bytes into a fully-fledged, subgroup-checked public key.
    pub fn decompress(&self) -> Result<PublicKey, Error> {
        PublicKey::deserialize(&self.bytes)
    }

    pub fn serialize(&self) -> [u8; PUBLIC_KEY_BYTES_LEN] {
        self.bytes
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PUBLIC_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: PUBLIC_KEY_BYTES_LEN,
            });
        }

        let mut fixed = [0; PUBLIC_KEY_BYTES_LEN];
        fixed.copy_from_slice(bytes);
        Ok(Self { bytes: fixed })
    }
}

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&PublicKey> for PublicKeyBytes {
    fn from(pubkey: &PublicKey) -> Self {
        Self {
            bytes: pubkey.serialize(),
        }
    }
}

impl From<PublicKey> for PublicKeyBytes {
    fn from(pubkey: PublicKey) -> Self {
        Self::from(&pubkey)
    }
}

impl_ssz!(PublicKeyBytes, PUBLIC_KEY_BYTES_LEN);
impl_tree_hash!(PublicKeyBytes, PUBLIC_KEY_BYTES_LEN);
impl_serde!(PublicKeyBytes);
impl_hex_debug_display!(PublicKeyBytes);
impl_eq_hash_via_serialize!(PublicKeyBytes);
