//! Newtypes around network and world identifiers.

use std::fmt::{Display, Formatter, Result as FmtResult};

macro_rules! impl_id {
    ($Id:ident, $Inner:ty) => {
        impl $Id {
            /// Returns the raw representation of this Id.
            pub fn get(self) -> $Inner {
                self.0
            }
        }

        impl Display for $Id {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                Display::fmt(&self.0, f)
            }
        }

        impl From<$Inner> for $Id {
            fn from(id: $Inner) -> Self {
                Self(id)
            }
        }
    };
}

/// ID of a voice participant, matching their network connection.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SpeakerId(u16);

/// ID of the in-world entity a speaker controls.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EntityId(i32);

impl_id! {SpeakerId, u16}
impl_id! {EntityId, i32}
