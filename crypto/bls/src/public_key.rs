use crate::Error;
use blst::min_pk as blst_core;

/// The byte-size of a compressed BLS12-381 public key.
pub const PUBLIC_KEY_BYTES_LEN: usize = 48;

/// A subgroup-checked BLS12-381 public key.
#[derive(Clone)]
pub struct PublicKey {
    point: blst_core::PublicKey,
}

impl PublicKey {
    pub(crate) fn from_point(point: blst_core::PublicKey) -> Self {
        Self { point }
    }

    pub(crate) fn point(&self) -> &blst_core::PublicKey {
        &self.point
    }

    /// Serialize `self` as compressed bytes.
    pub fn serialize(&self) -> [u8; PUBLIC_KEY_BYTES_LEN] {
        self.point.compress()
    }

    /// Deserialize `self` from compressed bytes, verifying that the point is on the curve and in
    /// the correct subgroup.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PUBLIC_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: PUBLIC_KEY_BYTES_LEN,
            });
        }

        let point = blst_core::PublicKey::key_validate(bytes).map_err(|_| Error::InvalidPoint)?;
        Ok(Self { point })
    }
}

impl_ssz!(PublicKey, PUBLIC_KEY_BYTES_LEN);
impl_tree_hash!(PublicKey, PUBLIC_KEY_BYTES_LEN);
impl_serde!(PublicKey);
impl_hex_debug_display!(PublicKey);
impl_eq_hash_via_serialize!(PublicKey);
