//! User profile and child models.
//!
//! Identity records are owned by the profile store; the pipeline references
//! them by id only.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Observer,
    Parent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Observer => "observer",
            Self::Parent => "parent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "observer" => Some(Self::Observer),
            "parent" => Some(Self::Parent),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored user profile. `password_hash` never leaves the db/auth layers.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub profile_image_url: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a profile for API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl From<Profile> for ProfileView {
    fn from(p: Profile) -> Self {
        ProfileView {
            id: p.id,
            name: p.name,
            email: p.email,
            role: p.role,
            phone: p.phone,
            specialization: p.specialization,
            profile_image_url: p.profile_image_url,
        }
    }
}

/// A tracked child/student.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Child {
    pub id: Uuid,
    pub name: String,
    pub date_of_birth: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Child {
    /// Age in whole years at the given date.
    pub fn age_at(&self, date: NaiveDate) -> i32 {
        let mut years = date.year() - self.date_of_birth.year();
        if (date.month(), date.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            years -= 1;
        }
        years.max(0)
    }
}

/// Request to register a new child.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateChildRequest {
    pub name: String,
    /// YYYY-MM-DD.
    pub date_of_birth: String,
    #[serde(default)]
    pub class: Option<String>,
    /// Observer assigned to this child, if any.
    #[serde(default)]
    pub observer_id: Option<Uuid>,
    /// Parents of this child.
    #[serde(default)]
    pub parent_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Admin, UserRole::Observer, UserRole::Parent] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("teacher"), None);
    }

    #[test]
    fn test_age_at() {
        let child = Child {
            id: Uuid::new_v4(),
            name: "Maya".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2019, 6, 15).unwrap(),
            class: None,
            profile_image_url: None,
            created_at: Utc::now(),
        };

        assert_eq!(child.age_at(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()), 5);
        assert_eq!(child.age_at(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()), 6);
        // Date before birth never goes negative
        assert_eq!(child.age_at(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()), 0);
    }
}
