//! Users, customers and factories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Factory type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactoryType {
    Manufacturing,
    Container,
    Packaging,
}

impl FactoryType {
    /// All factory types, in display order
    pub const ALL: [FactoryType; 3] = [Self::Manufacturing, Self::Container, Self::Packaging];

    /// Stored code of this type
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Manufacturing => "MANUFACTURING",
            Self::Container => "CONTAINER",
            Self::Packaging => "PACKAGING",
        }
    }

    /// Map a legacy Korean display label to its type
    #[must_use]
    pub fn from_legacy_label(label: &str) -> Option<Self> {
        match label.trim() {
            "제조" | "제조사" | "제조공장" => Some(Self::Manufacturing),
            "용기" | "용기사" | "용기공장" => Some(Self::Container),
            "포장" | "포장사" | "포장재" | "포장공장" => Some(Self::Packaging),
            _ => None,
        }
    }
}

impl fmt::Display for FactoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FactoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MANUFACTURING" => Ok(Self::Manufacturing),
            "CONTAINER" => Ok(Self::Container),
            "PACKAGING" => Ok(Self::Packaging),
            _ => Self::from_legacy_label(s).ok_or_else(|| format!("Unknown factory type: {s}")),
        }
    }
}

/// User role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Customer,
    InternalManager,
}

/// Dashboard user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    /// Factory type an internal manager is responsible for
    pub internal_manager_type: Option<FactoryType>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            internal_manager_type: None,
            company: None,
            department: None,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

define_patch! {
    /// Partial update for [`User`]
    pub struct UserPatch for User {
        name: String,
        email: String,
        role: UserRole,
        internal_manager_type: Option<FactoryType>,
        company: Option<String>,
        department: Option<String>,
        phone: Option<String>,
        is_active: bool,
    }
}

/// Customer company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub company_name: String,
    pub contact_person: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub business_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        company_name: impl Into<String>,
        contact_person: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            company_name: company_name.into(),
            contact_person: contact_person.into(),
            email: None,
            phone: None,
            business_number: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

define_patch! {
    /// Partial update for [`Customer`]
    pub struct CustomerPatch for Customer {
        company_name: String,
        contact_person: String,
        email: Option<String>,
        phone: Option<String>,
        business_number: Option<String>,
        is_active: bool,
    }
}

/// Manufacturing, container or packaging factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factory {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub factory_type: FactoryType,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub manager: Option<String>,
    pub manager_email: Option<String>,
    /// Monthly capacity in units
    pub capacity: Option<u32>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Factory {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, factory_type: FactoryType) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            factory_type,
            address: None,
            phone: None,
            manager: None,
            manager_email: None,
            capacity: None,
            certifications: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

define_patch! {
    /// Partial update for [`Factory`]
    pub struct FactoryPatch for Factory {
        name: String,
        #[serde(rename = "type")]
        factory_type: FactoryType,
        address: Option<String>,
        phone: Option<String>,
        manager: Option<String>,
        manager_email: Option<String>,
        capacity: Option<u32>,
        certifications: Vec<String>,
        is_active: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_type_serialization() {
        assert_eq!(
            serde_json::to_string(&FactoryType::Manufacturing).unwrap(),
            "\"MANUFACTURING\""
        );
        let parsed: FactoryType = serde_json::from_str("\"PACKAGING\"").unwrap();
        assert_eq!(parsed, FactoryType::Packaging);
    }

    #[test]
    fn test_legacy_label_is_not_a_valid_code() {
        assert!(serde_json::from_str::<FactoryType>("\"제조\"").is_err());
        assert_eq!(
            FactoryType::from_legacy_label("제조"),
            Some(FactoryType::Manufacturing)
        );
        assert_eq!(
            FactoryType::from_legacy_label("포장재"),
            Some(FactoryType::Packaging)
        );
        assert_eq!(FactoryType::from_legacy_label("factory"), None);
    }

    #[test]
    fn test_factory_type_from_str() {
        assert_eq!(
            "container".parse::<FactoryType>().unwrap(),
            FactoryType::Container
        );
        assert_eq!("용기".parse::<FactoryType>().unwrap(), FactoryType::Container);
        assert!("warehouse".parse::<FactoryType>().is_err());
    }

    #[test]
    fn test_factory_json_uses_type_key() {
        let factory = Factory::new("factory-1", "Cosmax Plant", FactoryType::Manufacturing);
        let value = serde_json::to_value(&factory).unwrap();
        assert_eq!(value["type"], "MANUFACTURING");
        assert_eq!(value["isActive"], true);
    }

    #[test]
    fn test_user_role_serialization() {
        assert_eq!(
            serde_json::to_string(&UserRole::InternalManager).unwrap(),
            "\"INTERNAL_MANAGER\""
        );
    }
}
