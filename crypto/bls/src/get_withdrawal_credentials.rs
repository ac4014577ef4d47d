use crate::PublicKeyBytes;
use eth2_hashing::hash;

/// Returns the withdrawal credentials for a given public key.
///
/// The first byte of the hashed pubkey is replaced by the given prefix (e.g., the
/// `BLS_WITHDRAWAL_PREFIX`).
pub fn get_withdrawal_credentials(pubkey: &PublicKeyBytes, prefix_byte: u8) -> Vec<u8> {
    let hashed = hash(&pubkey.serialize());
    let mut prefixed = vec![prefix_byte];
    prefixed.extend_from_slice(&hashed[1..]);

    prefixed
}
