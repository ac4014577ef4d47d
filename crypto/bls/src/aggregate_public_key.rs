use crate::{Error, PublicKey};
use blst::min_pk as blst_core;

/// An aggregate of BLS12-381 public keys.
#[derive(Clone)]
pub struct AggregatePublicKey {
    point: blst_core::PublicKey,
}

impl AggregatePublicKey {
    /// Aggregate some set of public keys.
    ///
    /// Returns an error if `pubkeys` is empty.
    pub fn aggregate(pubkeys: &[&PublicKey]) -> Result<Self, Error> {
        if pubkeys.is_empty() {
            return Err(Error::NoPublicKeys);
        }

        let points = pubkeys.iter().map(|pk| pk.point()).collect::<Vec<_>>();

        // The input keys were subgroup-checked on deserialization, so the check is skipped here.
        let agg = blst_core::AggregatePublicKey::aggregate(&points, false)?;

        Ok(Self {
            point: agg.to_public_key(),
        })
    }

    /// Returns the aggregate as an ordinary public key.
    pub fn to_public_key(&self) -> PublicKey {
        PublicKey::from_point(self.point.clone())
    }
}
