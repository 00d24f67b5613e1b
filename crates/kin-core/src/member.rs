//! Family members.

use chrono::NaiveDate;
use crate::format::{metadata, nullable, Metadata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// A person in a family.
///
/// `parents`, `children` and `spouse` are convenience lists mirrored by the
/// family's relation matrix. They are only changed through [`crate::Family`]
/// mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub family_id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub death_date: Option<NaiveDate>,
    pub gender: Gender,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub spouse: Option<String>,
    #[serde(default, with = "metadata")]
    pub metadata: Metadata,
}

impl Member {
    /// Creates a member with no relations yet.
    pub fn new(id: impl Into<String>, family_id: impl Into<String>, data: NewMember) -> Self {
        Self {
            id: id.into(),
            family_id: family_id.into(),
            first_name: data.first_name,
            last_name: data.last_name,
            birth_date: data.birth_date,
            death_date: data.death_date,
            gender: data.gender,
            parents: Vec::new(),
            children: Vec::new(),
            spouse: None,
            metadata: data.metadata,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_parent_of(&self, other: &str) -> bool {
        self.children.iter().any(|c| c == other)
    }

    pub fn is_child_of(&self, other: &str) -> bool {
        self.parents.iter().any(|p| p == other)
    }

    pub fn is_spouse_of(&self, other: &str) -> bool {
        self.spouse.as_deref() == Some(other)
    }

    /// True when the two members have at least one parent in common.
    pub fn shares_parent_with(&self, other: &Member) -> bool {
        self.parents.iter().any(|p| other.parents.contains(p))
    }

    pub fn has_relations(&self) -> bool {
        !self.parents.is_empty() || !self.children.is_empty() || self.spouse.is_some()
    }

    /// Applies the descriptive fields of a patch. Relations are untouched.
    pub fn apply(&mut self, patch: MemberPatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(birth_date) = patch.birth_date {
            self.birth_date = birth_date;
        }
        if let Some(death_date) = patch.death_date {
            self.death_date = death_date;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
        if let Some(metadata) = patch.metadata {
            for (key, value) in metadata {
                if value.is_null() {
                    self.metadata.remove(&key);
                } else {
                    self.metadata.insert(key, value);
                }
            }
        }
    }
}

/// Payload for creating a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    pub gender: Gender,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewMember {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
        gender: Gender,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date,
            death_date: None,
            gender,
            metadata: Metadata::new(),
        }
    }
}

/// Partial update of a member's descriptive fields.
///
/// `deathDate: null` clears the death date. Metadata entries are merged into
/// the existing map and a `null` entry removes that key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub death_date: Option<Option<NaiveDate>>,
    pub gender: Option<Gender>,
    pub metadata: Option<Metadata>,
}
