/// Implements SSZ `Encode` and `Decode` for a type which exposes
/// `fn serialize(&self) -> [u8; $byte_size]` and `fn deserialize(&[u8]) -> Result<Self, Error>`.
macro_rules! impl_ssz {
    ($type: ty, $byte_size: expr) => {
        impl ssz::Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $byte_size
            }

            fn ssz_bytes_len(&self) -> usize {
                $byte_size
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.serialize())
            }
        }

        impl ssz::Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $byte_size
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
                Self::deserialize(bytes)
                    .map_err(|e| ssz::DecodeError::BytesInvalid(format!("{:?}", e)))
            }
        }
    };
}

/// Implements `tree_hash::TreeHash` as a `Vector` of bytes.
macro_rules! impl_tree_hash {
    ($type: ty, $byte_size: expr) => {
        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                tree_hash::TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                unreachable!("Vector should never be packed.")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("Vector should never be packed.")
            }

            fn tree_hash_root(&self) -> crate::Hash256 {
                // We could use the tree hash implementation for `FixedVec<u8, $byte_size>`,
                // however it is much slower because of the copying and allocation involved.
                let values_per_chunk = tree_hash::BYTES_PER_CHUNK;
                let minimum_chunk_count = ($byte_size + values_per_chunk - 1) / values_per_chunk;
                tree_hash::merkle_root(&self.serialize(), minimum_chunk_count)
            }
        }
    };
}

/// Implements `serde` `Serialize` and `Deserialize` as a "0x"-prefixed hex string.
macro_rules! impl_serde {
    ($type: ty) => {
        impl serde::Serialize for $type {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&eth2_serde_utils::hex::encode(self.serialize()))
            }
        }

        impl<'de> serde::Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let bytes = deserializer.deserialize_str(eth2_serde_utils::hex::PrefixedHexVisitor)?;
                Self::deserialize(&bytes).map_err(|e| {
                    serde::de::Error::custom(format!("invalid BLS encoding: {:?}", e))
                })
            }
        }
    };
}

/// Implements `Debug` and `Display` as a "0x"-prefixed hex string.
macro_rules! impl_hex_debug_display {
    ($type: ty) => {
        impl std::fmt::Debug for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", eth2_serde_utils::hex::encode(self.serialize()))
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", eth2_serde_utils::hex::encode(self.serialize()))
            }
        }
    };
}

/// Implements `PartialEq`, `Eq` and `Hash` in terms of the serialized bytes.
macro_rules! impl_eq_hash_via_serialize {
    ($type: ty) => {
        impl PartialEq for $type {
            fn eq(&self, other: &Self) -> bool {
                self.serialize()[..] == other.serialize()[..]
            }
        }

        impl Eq for $type {}

        impl std::hash::Hash for $type {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.serialize().hash(state)
            }
        }
    };
}
