//! Typed partial updates
//!
//! Every record type gets a `…Patch` struct with one optional field per
//! mutable property. Nullable properties become `Option<Option<T>>`, so a
//! patch can distinguish "leave as is" (`None`) from "clear" (`Some(None)`).

use serde::{Deserialize, Deserializer};

/// Deserialize a present field as `Some(..)`, even when it is JSON `null`.
///
/// Paired with `#[serde(default)]`, an absent field stays `None` while an
/// explicit `null` on a nullable property becomes `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Declare a patch struct for a record type.
macro_rules! define_patch {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $target:ty {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                #[serde(
                    default,
                    skip_serializing_if = "Option::is_none",
                    deserialize_with = "crate::models::patch::deserialize_some"
                )]
                pub $field: Option<$ty>,
            )*
        }

        impl crate::models::Patch<$target> for $name {
            fn apply(self, target: &mut $target) {
                $(
                    if let Some(value) = self.$field {
                        target.$field = value;
                    }
                )*
            }

            fn is_empty(&self) -> bool {
                [$(self.$field.is_none()),*].iter().all(|unset| *unset)
            }
        }
    };
}
