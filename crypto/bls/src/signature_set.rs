use crate::{AggregateSignature, Hash256, PublicKey, Signature};
use std::borrow::Cow;

/// A `(signature, message, pubkeys)` triple which can be verified in isolation or accumulated
/// for batch verification.
///
/// Allows the costly signature checks of block processing to be gathered up-front and verified
/// together, as a unit.
#[derive(Clone)]
pub struct SignatureSet<'a> {
    pub signature: Cow<'a, AggregateSignature>,
    pub(crate) signing_keys: Vec<Cow<'a, PublicKey>>,
    pub(crate) message: Hash256,
}

impl<'a> SignatureSet<'a> {
    /// A signature set with a single signer.
    pub fn single_pubkey(
        signature: &'a Signature,
        signing_key: Cow<'a, PublicKey>,
        message: Hash256,
    ) -> Self {
        Self {
            signature: Cow::Owned(AggregateSignature::from_signature(signature)),
            signing_keys: vec![signing_key],
            message,
        }
    }

    /// A signature set with an aggregate signature over multiple signers.
    pub fn multiple_pubkeys(
        signature: &'a AggregateSignature,
        signing_keys: Vec<Cow<'a, PublicKey>>,
        message: Hash256,
    ) -> Self {
        Self {
            signature: Cow::Borrowed(signature),
            signing_keys,
            message,
        }
    }

    /// Verify this set in isolation.
    pub fn verify(&self) -> bool {
        let pubkeys = self
            .signing_keys
            .iter()
            .map(|cow| cow.as_ref())
            .collect::<Vec<_>>();

        self.signature.fast_aggregate_verify(self.message, &pubkeys)
    }
}

/// Verify each set individually, returning `true` only if all sets are valid.
///
/// All-or-nothing: a single invalid set fails the entire collection.
pub fn verify_signature_sets<'a>(sets: impl Iterator<Item = &'a SignatureSet<'a>>) -> bool {
    let mut any = false;

    for set in sets {
        any = true;
        if !set.verify() {
            return false;
        }
    }

    any
}
