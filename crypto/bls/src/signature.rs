use crate::{Error, Hash256, PublicKey, DST, INFINITY_SIGNATURE};
use blst::min_pk as blst_core;
use blst::BLST_ERROR;

/// The byte-size of a compressed BLS12-381 signature.
pub const SIGNATURE_BYTES_LEN: usize = 96;

/// A subgroup-checked BLS12-381 signature.
///
/// Provides a "null" variant (`Self::empty`) which serializes to all-zero bytes and fails all
/// verification; it is used in objects which are yet to be signed (e.g., a genesis block).
#[derive(Clone)]
pub struct Signature {
    point: Option<blst_core::Signature>,
    is_infinity: bool,
}

impl Signature {
    /// A signature with no point, serializing to all-zero bytes and never verifying.
    pub fn empty() -> Self {
        Self {
            point: None,
            is_infinity: false,
        }
    }

    pub(crate) fn from_point(point: blst_core::Signature) -> Self {
        let is_infinity = point.compress()[..] == INFINITY_SIGNATURE[..];
        Self {
            point: Some(point),
            is_infinity,
        }
    }

    pub(crate) fn point(&self) -> Option<&blst_core::Signature> {
        self.point.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_none()
    }

    pub fn is_infinity(&self) -> bool {
        self.is_infinity
    }

    /// Verify `self` against the given public key and (pre-hashed) message.
    ///
    /// Always `false` for an empty signature.
    pub fn verify(&self, pubkey: &PublicKey, msg: Hash256) -> bool {
        match &self.point {
            Some(point) => {
                point.verify(false, msg.as_bytes(), DST, &[], pubkey.point(), false)
                    == BLST_ERROR::BLST_SUCCESS
            }
            None => false,
        }
    }

    pub fn serialize(&self) -> [u8; SIGNATURE_BYTES_LEN] {
        match &self.point {
            Some(point) => point.compress(),
            None => [0; SIGNATURE_BYTES_LEN],
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SIGNATURE_BYTES_LEN,
            });
        }

        if bytes.iter().all(|byte| *byte == 0) {
            return Ok(Self::empty());
        }

        // The group check is deferred: `sig_validate` with `sig_infcheck == false` permits the
        // point at infinity, which is a legal encoding for an empty aggregate.
        let point =
            blst_core::Signature::sig_validate(bytes, false).map_err(|_| Error::InvalidPoint)?;

        Ok(Self {
            point: Some(point),
            is_infinity: bytes[..] == INFINITY_SIGNATURE[..],
        })
    }
}

impl_ssz!(Signature, SIGNATURE_BYTES_LEN);
impl_tree_hash!(Signature, SIGNATURE_BYTES_LEN);
impl_serde!(Signature);
impl_hex_debug_display!(Signature);
impl_eq_hash_via_serialize!(Signature);
