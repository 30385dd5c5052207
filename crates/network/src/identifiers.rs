//! Positional identifiers for network entities.
//!
//! Every entity in a dataset is identified by its index in the list it was
//! loaded from. The newtypes keep node, place, product and link indices from
//! being mixed up, and are `Copy` so they can be used freely as map keys.

use std::fmt;

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self(index)
            }
        }
    };
}

impl_identifier!(NodeId);
impl_identifier!(PlaceId);
impl_identifier!(ProductId);
impl_identifier!(LinkId);
