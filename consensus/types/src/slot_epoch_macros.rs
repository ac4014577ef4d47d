/// Implements the fundamental conversions and operators for a u64-newtype (`Slot` or `Epoch`).
///
/// Addition, subtraction and multiplication saturate; division and remainder panic on a zero
/// denominator (consistent with the underlying `u64` behaviour).
macro_rules! impl_from_into_u64 {
    ($main: ident) => {
        impl From<u64> for $main {
            fn from(n: u64) -> $main {
                $main(n)
            }
        }

        impl From<$main> for u64 {
            fn from(n: $main) -> u64 {
                n.0
            }
        }

        impl $main {
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }
    };
}

macro_rules! impl_from_into_usize {
    ($main: ident) => {
        impl From<usize> for $main {
            fn from(n: usize) -> $main {
                $main(n as u64)
            }
        }

        impl From<$main> for usize {
            fn from(n: $main) -> usize {
                n.0 as usize
            }
        }

        impl $main {
            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

/// Arithmetic between `$main` and `$other`, where `$other: Into<u64>`.
macro_rules! impl_math_between {
    ($main: ident, $other: ident) => {
        impl std::ops::Add<$other> for $main {
            type Output = $main;

            fn add(self, other: $other) -> $main {
                let other: u64 = other.into();
                $main::from(self.0.saturating_add(other))
            }
        }

        impl std::ops::AddAssign<$other> for $main {
            fn add_assign(&mut self, other: $other) {
                *self = *self + other;
            }
        }

        impl std::ops::Sub<$other> for $main {
            type Output = $main;

            fn sub(self, other: $other) -> $main {
                let other: u64 = other.into();
                $main::from(self.0.saturating_sub(other))
            }
        }

        impl std::ops::SubAssign<$other> for $main {
            fn sub_assign(&mut self, other: $other) {
                *self = *self - other;
            }
        }

        impl std::ops::Mul<$other> for $main {
            type Output = $main;

            fn mul(self, rhs: $other) -> $main {
                let rhs: u64 = rhs.into();
                $main::from(self.0.saturating_mul(rhs))
            }
        }

        impl std::ops::Div<$other> for $main {
            type Output = $main;

            fn div(self, rhs: $other) -> $main {
                let rhs: u64 = rhs.into();
                $main::from(
                    self.0
                        .checked_div(rhs)
                        .expect("cannot divide a slot/epoch by zero"),
                )
            }
        }

        impl std::ops::Rem<$other> for $main {
            type Output = $main;

            fn rem(self, modulus: $other) -> $main {
                let modulus: u64 = modulus.into();
                $main::from(
                    self.0
                        .checked_rem(modulus)
                        .expect("cannot divide a slot/epoch by zero"),
                )
            }
        }
    };
}

/// Comparison against a raw `u64`, so that e.g. `slot > 0` type-checks.
macro_rules! impl_cmp_u64 {
    ($main: ident) => {
        impl PartialEq<u64> for $main {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $main {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                Some(self.0.cmp(other))
            }
        }
    };
}

macro_rules! impl_math {
    ($main: ident) => {
        impl $main {
            pub fn saturating_sub<T: Into<u64>>(&self, other: T) -> $main {
                $main::from(self.0.saturating_sub(other.into()))
            }

            pub fn saturating_add<T: Into<u64>>(&self, other: T) -> $main {
                $main::from(self.0.saturating_add(other.into()))
            }

            pub fn is_zero(&self) -> bool {
                self.0 == 0
            }
        }
    };
}

macro_rules! impl_display_debug {
    ($main: ident) => {
        impl std::fmt::Display for $main {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::fmt::Debug for $main {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($main), self.0)
            }
        }
    };
}

macro_rules! impl_ssz {
    ($main: ident) => {
        impl ssz::Encode for $main {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ssz::Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ssz::Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                self.0.ssz_bytes_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl ssz::Decode for $main {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ssz::Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ssz::Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
                Ok($main(u64::from_ssz_bytes(bytes)?))
            }
        }

        impl tree_hash::TreeHash for $main {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                u64::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                u64::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> crate::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

macro_rules! impl_common {
    ($main: ident) => {
        impl_from_into_u64!($main);
        impl_from_into_usize!($main);
        impl_math_between!($main, $main);
        impl_math_between!($main, u64);
        impl_cmp_u64!($main);
        impl_math!($main);
        impl_display_debug!($main);
        impl_ssz!($main);
    };
}
