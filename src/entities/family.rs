// 👨‍👩‍👧 Family Group + Family Member Entities
//
// A group references its primary contact by guest id; members reference
// their group by id. Nothing holds a live pointer to anything else.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyGroup {
    pub id: i64,
    pub name: String,

    /// Upper bound on attendees, primary contact included (always >= 1)
    pub max_attendees: u32,

    /// Guest who owns the group's invitation
    pub primary_contact_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    /// `None` until the member has been persisted
    pub id: Option<i64>,
    pub family_group_id: i64,
    pub first_name: String,
    pub last_name: String,

    /// Free-form tag ("adult", "child", ...), stored trimmed and lower-cased
    pub age_group: String,
    pub is_attending: bool,
    pub dietary_restrictions: Option<String>,
}

impl FamilyMember {
    pub fn new(family_group_id: i64, first_name: &str, last_name: &str, age_group: &str) -> Self {
        FamilyMember {
            id: None,
            family_group_id,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            age_group: normalize_age_group(age_group),
            is_attending: false,
            dietary_restrictions: None,
        }
    }

    /// Case-insensitive exact match on (first name, last name)
    pub fn matches_name(&self, first_name: &str, last_name: &str) -> bool {
        name_key(&self.first_name) == name_key(first_name)
            && name_key(&self.last_name) == name_key(last_name)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub fn normalize_age_group(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn name_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One entry of a submitted family RSVP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub age_group: String,
    pub is_attending: bool,
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
}

impl MemberEntry {
    pub fn new(first_name: &str, last_name: &str, is_attending: bool) -> Self {
        MemberEntry {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age_group: "adult".to_string(),
            is_attending,
            dietary_restrictions: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_age_group(mut self, age_group: &str) -> Self {
        self.age_group = age_group.to_string();
        self
    }

    pub fn with_dietary(mut self, dietary: &str) -> Self {
        self.dietary_restrictions = Some(dietary.to_string());
        self
    }
}
