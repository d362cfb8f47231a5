//! A small macro for named bit sets.
//!
//! Flag values keep the exact bit layout of the vehicle definition format,
//! so a set can be round-tripped through its raw integer.

#[macro_export]
#[doc(hidden)]
macro_rules! flag_set {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            $(
                $(#[$flag_attr])*
                pub const $flag: Self = Self { bits: $value };
            )*

            /// The empty set.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Every named flag.
            pub const fn all() -> Self {
                Self { bits: 0 $(| $value)* }
            }

            /// Keeps only the bits that correspond to named flags.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits: bits & Self::all().bits }
            }

            /// Returns `None` if `bits` contains unnamed bits.
            pub const fn from_bits(bits: $ty) -> Option<Self> {
                if bits & !Self::all().bits == 0 {
                    Some(Self { bits })
                } else {
                    None
                }
            }

            pub const fn bits(&self) -> $ty {
                self.bits
            }

            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            pub const fn contains(&self, other: Self) -> bool {
                self.bits & other.bits == other.bits
            }

            pub const fn intersects(&self, other: Self) -> bool {
                self.bits & other.bits != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            pub fn set(&mut self, other: Self, enabled: bool) {
                if enabled {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }

            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            #[must_use]
            pub const fn intersection(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }

            /// Number of named flags present.
            pub fn count(&self) -> u32 {
                self.bits.count_ones()
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.with(rhs)
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.insert(rhs);
            }
        }

        impl ::std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                self.intersection(rhs)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut set = f.debug_set();
                $(
                    if self.contains(Self::$flag) {
                        set.entry(&format_args!("{}", stringify!($flag)));
                    }
                )*
                set.finish()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::flag_set! {
        struct Sample: u32 {
            const A = 1 << 0;
            const B = 1 << 1;
            const C = 1 << 4;
        }
    }

    #[test]
    fn raw_bits_round_trip() {
        let set = Sample::A | Sample::C;
        assert_eq!(set.bits(), 0b1_0001);
        assert_eq!(Sample::from_bits(0b1_0001), Some(set));
        assert_eq!(Sample::from_bits(0b100), None);
        assert_eq!(Sample::from_bits_truncate(0b111), Sample::A | Sample::B);
    }

    #[test]
    fn debug_lists_flag_names() {
        let text = format!("{:?}", Sample::B | Sample::C);
        assert_eq!(text, "{B, C}");
    }
}
