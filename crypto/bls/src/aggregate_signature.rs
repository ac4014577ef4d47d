use crate::{Error, Hash256, PublicKey, Signature, DST, INFINITY_SIGNATURE, SIGNATURE_BYTES_LEN};
use blst::min_pk as blst_core;
use blst::BLST_ERROR;

/// An aggregate of BLS12-381 signatures.
///
/// The point at infinity acts as the additive identity: `Self::infinity` is the starting value
/// for aggregation and the canonical encoding of "no signatures yet".
#[derive(Clone)]
pub struct AggregateSignature {
    /// The aggregated point, stored in `Signature` form for verification.
    ///
    /// `None` with `is_infinity == true` is the point at infinity; `None` with
    /// `is_infinity == false` is the "null" signature deserialized from all-zero bytes.
    point: Option<blst_core::Signature>,
    is_infinity: bool,
}

impl AggregateSignature {
    /// The additive identity: an aggregate over zero signatures.
    pub fn infinity() -> Self {
        Self {
            point: None,
            is_infinity: true,
        }
    }

    /// An aggregate deserialized from all-zero bytes. Fails all verification.
    pub fn empty() -> Self {
        Self {
            point: None,
            is_infinity: false,
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.is_infinity
    }

    /// Wrap a single signature as an aggregate.
    pub fn from_signature(signature: &Signature) -> Self {
        Self {
            point: signature.point().cloned(),
            is_infinity: signature.is_infinity(),
        }
    }

    /// Aggregate `other` into `self`.
    ///
    /// Adding an empty signature is a no-op.
    pub fn add_assign(&mut self, other: &Signature) {
        let other_point = match other.point() {
            Some(point) => point,
            None => return,
        };

        match &self.point {
            None => {
                self.point = Some(other_point.clone());
                self.is_infinity = other.is_infinity();
            }
            Some(self_point) => {
                let mut agg = blst_core::AggregateSignature::from_signature(self_point);
                agg.add_signature(other_point, false)
                    .expect("adding a signature without a group check cannot fail");
                let point = agg.to_signature();
                self.is_infinity = point.compress()[..] == INFINITY_SIGNATURE[..];
                self.point = Some(point);
            }
        }
    }

    /// Aggregate `other` into `self`.
    pub fn add_assign_aggregate(&mut self, other: &AggregateSignature) {
        let other_point = match &other.point {
            Some(point) => point,
            None => return,
        };

        let other = Signature::from_point(other_point.clone());
        self.add_assign(&other)
    }

    /// Verify `self` against a single (pre-hashed) message signed by all `pubkeys`.
    pub fn fast_aggregate_verify(&self, msg: Hash256, pubkeys: &[&PublicKey]) -> bool {
        if pubkeys.is_empty() {
            return false;
        }

        match &self.point {
            Some(point) => {
                let pubkey_points = pubkeys.iter().map(|pk| pk.point()).collect::<Vec<_>>();
                point.fast_aggregate_verify(false, msg.as_bytes(), DST, &pubkey_points)
                    == BLST_ERROR::BLST_SUCCESS
            }
            None => false,
        }
    }

    /// Identical to `fast_aggregate_verify`, except that the infinity signature over zero public
    /// keys verifies.
    ///
    /// Equivalent to `eth_fast_aggregate_verify` from the consensus specification; required for
    /// sync aggregates with no participants.
    pub fn eth_fast_aggregate_verify(&self, msg: Hash256, pubkeys: &[&PublicKey]) -> bool {
        if pubkeys.is_empty() && self.is_infinity {
            return true;
        }

        self.fast_aggregate_verify(msg, pubkeys)
    }

    /// Verify `self` against one (pre-hashed) message per public key.
    ///
    /// The lengths of `msgs` and `pubkeys` must be equal and non-zero.
    pub fn aggregate_verify(&self, msgs: &[Hash256], pubkeys: &[&PublicKey]) -> bool {
        if msgs.is_empty() || msgs.len() != pubkeys.len() {
            return false;
        }

        match &self.point {
            Some(point) => {
                let msg_slices = msgs.iter().map(|msg| msg.as_bytes()).collect::<Vec<_>>();
                let pubkey_points = pubkeys.iter().map(|pk| pk.point()).collect::<Vec<_>>();

                point.aggregate_verify(false, &msg_slices, DST, &pubkey_points, false)
                    == BLST_ERROR::BLST_SUCCESS
            }
            None => false,
        }
    }

    pub fn serialize(&self) -> [u8; SIGNATURE_BYTES_LEN] {
        match &self.point {
            Some(point) => point.compress(),
            None if self.is_infinity => INFINITY_SIGNATURE,
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

        if bytes[..] == INFINITY_SIGNATURE[..] {
            return Ok(Self::infinity());
        }

        if bytes.iter().all(|byte| *byte == 0) {
            return Ok(Self::empty());
        }

        let point =
            blst_core::Signature::sig_validate(bytes, false).map_err(|_| Error::InvalidPoint)?;

        Ok(Self {
            point: Some(point),
            is_infinity: false,
        })
    }
}

impl Default for AggregateSignature {
    fn default() -> Self {
        Self::infinity()
    }
}

impl_ssz!(AggregateSignature, SIGNATURE_BYTES_LEN);
impl_tree_hash!(AggregateSignature, SIGNATURE_BYTES_LEN);
impl_serde!(AggregateSignature);
impl_hex_debug_display!(AggregateSignature);
impl_eq_hash_via_serialize!(AggregateSignature);
