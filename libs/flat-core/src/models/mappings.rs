//! Lookup tables mapping stored codes to display labels, plus UI settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! code_mapping {
    ($(#[$meta:meta])* $name:ident, $patch:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub id: String,
            /// Stored code, e.g. `IN_PROGRESS`
            pub code: String,
            pub label: String,
            pub color: Option<String>,
            pub order: u32,
            pub is_active: bool,
        }

        impl $name {
            #[must_use]
            pub fn new(
                id: impl Into<String>,
                code: impl Into<String>,
                label: impl Into<String>,
                order: u32,
            ) -> Self {
                Self {
                    id: id.into(),
                    code: code.into(),
                    label: label.into(),
                    color: None,
                    order,
                    is_active: true,
                }
            }

            #[must_use]
            pub fn with_color(mut self, color: impl Into<String>) -> Self {
                self.color = Some(color.into());
                self
            }
        }

        define_patch! {
            #[doc = concat!("Partial update for [`", stringify!($name), "`]")]
            pub struct $patch for $name {
                code: String,
                label: String,
                color: Option<String>,
                order: u32,
                is_active: bool,
            }
        }
    };
}

code_mapping!(
    /// Project/task status code → label
    StatusMapping,
    StatusMappingPatch
);
code_mapping!(
    /// Priority code → label
    PriorityMapping,
    PriorityMappingPatch
);
code_mapping!(
    /// Service type code → label
    ServiceTypeMapping,
    ServiceTypeMappingPatch
);
code_mapping!(
    /// Project type code → label
    ProjectTypeMapping,
    ProjectTypeMappingPatch
);

/// Persisted UI preference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSetting {
    pub id: String,
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl UiSetting {
    #[must_use]
    pub fn new(id: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value,
            updated_at: Utc::now(),
        }
    }
}

define_patch! {
    /// Partial update for [`UiSetting`]
    pub struct UiSettingPatch for UiSetting {
        key: String,
        value: serde_json::Value,
    }
}

/// Look up the label of a code, falling back to the code itself
#[must_use]
pub fn label_for<'a>(mappings: impl IntoIterator<Item = (&'a str, &'a str)>, code: &'a str) -> &'a str {
    mappings
        .into_iter()
        .find(|(candidate, _)| *candidate == code)
        .map_or(code, |(_, label)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_builder() {
        let mapping = StatusMapping::new("status-1", "IN_PROGRESS", "진행중", 2).with_color("#3b82f6");
        assert_eq!(mapping.code, "IN_PROGRESS");
        assert_eq!(mapping.color.as_deref(), Some("#3b82f6"));
        assert!(mapping.is_active);
    }

    #[test]
    fn test_label_for() {
        let rows = [
            PriorityMapping::new("p1", "HIGH", "높음", 1),
            PriorityMapping::new("p2", "LOW", "낮음", 3),
        ];
        let pairs = || rows.iter().map(|m| (m.code.as_str(), m.label.as_str()));
        assert_eq!(label_for(pairs(), "HIGH"), "높음");
        assert_eq!(label_for(pairs(), "MEDIUM"), "MEDIUM");
    }
}
