//! BLS12-381 signatures and keys for the beacon chain, backed by
//! [blst](https://github.com/supranational/blst) (min-pk: 48-byte public keys, 96-byte
//! signatures).
//!
//! Two "flavours" exist for public keys and signatures:
//!
//! - `PublicKey`/`Signature`: a deserialized, subgroup-checked elliptic curve point. Operations
//!   on these are fast, constructing one is slow.
//! - `PublicKeyBytes`/`SignatureBytes`: the compressed wire representation. These exist because
//!   some on-chain objects (notably deposits) may carry byte strings which are not valid curve
//!   points and must still round-trip through SSZ.

#[macro_use]
mod macros;
mod aggregate_public_key;
mod aggregate_signature;
mod get_withdrawal_credentials;
mod keypair;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod signature;
mod signature_bytes;
mod signature_set;

pub use aggregate_public_key::AggregatePublicKey;
pub use aggregate_signature::AggregateSignature;
pub use get_withdrawal_credentials::get_withdrawal_credentials;
pub use keypair::Keypair;
pub use public_key::{PublicKey, PUBLIC_KEY_BYTES_LEN};
pub use public_key_bytes::PublicKeyBytes;
pub use secret_key::{SecretKey, SECRET_KEY_BYTES_LEN};
pub use signature::{Signature, SIGNATURE_BYTES_LEN};
pub use signature_bytes::SignatureBytes;
pub use signature_set::{verify_signature_sets, SignatureSet};

pub type Hash256 = ethereum_types::H256;

/// The compressed bytes of the G2 point at infinity, used to express an "empty" aggregate
/// signature.
pub const INFINITY_SIGNATURE: [u8; SIGNATURE_BYTES_LEN] = [
    0xc0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0,
];

/// The domain separation tag mandated for beacon chain signatures (proof-of-possession scheme).
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// An error was raised from the blst library.
    BlstError(blst::BLST_ERROR),
    /// The provided bytes were an incorrect length.
    InvalidByteLength { got: usize, expected: usize },
    /// The byte string is not a valid point on the curve (or not in the correct subgroup).
    InvalidPoint,
    /// Attempted to interact with a "null" signature (one deserialized from all-zero bytes).
    NullSignature,
    /// An aggregate was requested over zero public keys.
    NoPublicKeys,
}

impl From<blst::BLST_ERROR> for Error {
    fn from(e: blst::BLST_ERROR) -> Error {
        Error::BlstError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let keypair = Keypair::random();
        let msg = Hash256::from_low_u64_be(42);

        let signature = keypair.sk.sign(msg);
        assert!(signature.verify(&keypair.pk, msg));

        // A different message must not verify.
        assert!(!signature.verify(&keypair.pk, Hash256::from_low_u64_be(43)));

        // A different key must not verify.
        let other = Keypair::random();
        assert!(!signature.verify(&other.pk, msg));
    }

    #[test]
    fn fast_aggregate_verify() {
        let msg = Hash256::from_low_u64_be(7);
        let keypairs: Vec<_> = (0..4).map(|_| Keypair::random()).collect();

        let mut agg = AggregateSignature::infinity();
        for keypair in &keypairs {
            agg.add_assign(&keypair.sk.sign(msg));
        }

        let pubkeys: Vec<_> = keypairs.iter().map(|keypair| &keypair.pk).collect();
        assert!(agg.fast_aggregate_verify(msg, &pubkeys));

        // Missing a signer must fail.
        assert!(!agg.fast_aggregate_verify(msg, &pubkeys[..3]));
    }

    #[test]
    fn eth_fast_aggregate_verify_empty_infinity() {
        let msg = Hash256::from_low_u64_be(7);
        let agg = AggregateSignature::infinity();
        assert!(agg.eth_fast_aggregate_verify(msg, &[]));
    }

    #[test]
    fn signature_bytes_round_trip() {
        let keypair = Keypair::random();
        let signature = keypair.sk.sign(Hash256::zero());

        let bytes = SignatureBytes::from(&signature);
        let decompressed = bytes.decompress().unwrap();
        assert_eq!(decompressed, signature);
    }

    #[test]
    fn empty_signature_serializes_to_zeros() {
        let empty = Signature::empty();
        assert_eq!(empty.serialize(), [0; SIGNATURE_BYTES_LEN]);
        assert!(!empty.verify(&Keypair::random().pk, Hash256::zero()));
    }

    #[test]
    fn public_key_bytes_rejects_garbage() {
        let bytes = PublicKeyBytes::deserialize(&[42; PUBLIC_KEY_BYTES_LEN]).unwrap();
        assert!(bytes.decompress().is_err());
    }
}
