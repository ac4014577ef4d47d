use crate::{Error, Signature, SIGNATURE_BYTES_LEN};

/// The compressed bytes of a BLS12-381 signature, without any guarantee that they represent a
/// valid curve point.
///
/// Used where invalid signatures are representable on-chain (e.g., deposit data).
#[derive(Clone, Copy)]
pub struct SignatureBytes {
    bytes: [u8; SIGNATURE_BYTES_LEN],
}

impl SignatureBytes {
    /// Returns all-zero bytes.
    pub fn empty() -> Self {
        Self {
            bytes: [0; SIGNATURE_BYTES_LEN],
        }
    }

    /// Attempt to decompress the bytes into a fully-fledged, subgroup-checked signature.
    pub fn decompress(&self) -> Result<Signature, Error> {
        if self.bytes.iter().all(|byte| *byte == 0) {
            // All-zero bytes round-trip through `Signature::empty`, but an empty signature is
            // never a usable signature.
            return Err(Error::NullSignature);
        }

        Signature::deserialize(&self.bytes)
    }

    pub fn serialize(&self) -> [u8; SIGNATURE_BYTES_LEN] {
        self.bytes
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SIGNATURE_BYTES_LEN,
            });
        }

        let mut fixed = [0; SIGNATURE_BYTES_LEN];
        fixed.copy_from_slice(bytes);
        Ok(Self { bytes: fixed })
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&Signature> for SignatureBytes {
    fn from(signature: &Signature) -> Self {
        Self {
            bytes: signature.serialize(),
        }
    }
}

impl From<Signature> for SignatureBytes {
    fn from(signature: Signature) -> Self {
        Self::from(&signature)
    }
}

impl_ssz!(SignatureBytes, SIGNATURE_BYTES_LEN);
impl_tree_hash!(SignatureBytes, SIGNATURE_BYTES_LEN);
impl_serde!(SignatureBytes);
impl_hex_debug_display!(SignatureBytes);
impl_eq_hash_via_serialize!(SignatureBytes);
