//! Relationship labels.

use crate::lineage::Direction;
use kin_core::{Family, Member};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    Parent,
    Child,
    Spouse,
    Sibling,
    Grandparent,
    Grandchild,
    Ancestor,
    Descendant,
    UncleAunt,
    Cousin,
    Related,
}

impl RelationshipKind {
    /// Label for a member reached at `generation` hops in `direction`.
    pub fn for_lineage(direction: Direction, generation: usize) -> Self {
        match (direction, generation) {
            (Direction::Ancestors, 1) => RelationshipKind::Parent,
            (Direction::Ancestors, 2) => RelationshipKind::Grandparent,
            (Direction::Ancestors, _) => RelationshipKind::Ancestor,
            (Direction::Descendants, 1) => RelationshipKind::Child,
            (Direction::Descendants, 2) => RelationshipKind::Grandchild,
            (Direction::Descendants, _) => RelationshipKind::Descendant,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            RelationshipKind::Parent => "is parent of",
            RelationshipKind::Child => "is child of",
            RelationshipKind::Spouse => "is spouse of",
            RelationshipKind::Sibling => "is sibling of",
            RelationshipKind::Grandparent => "is grandparent of",
            RelationshipKind::Grandchild => "is grandchild of",
            RelationshipKind::Ancestor => "is ancestor of",
            RelationshipKind::Descendant => "is descendant of",
            RelationshipKind::UncleAunt => "is uncle or aunt of",
            RelationshipKind::Cousin => "is cousin of",
            RelationshipKind::Related => "is related to",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationshipKind::Parent => "parent",
            RelationshipKind::Child => "child",
            RelationshipKind::Spouse => "spouse",
            RelationshipKind::Sibling => "sibling",
            RelationshipKind::Grandparent => "grandparent",
            RelationshipKind::Grandchild => "grandchild",
            RelationshipKind::Ancestor => "ancestor",
            RelationshipKind::Descendant => "descendant",
            RelationshipKind::UncleAunt => "uncle/aunt",
            RelationshipKind::Cousin => "cousin",
            RelationshipKind::Related => "related",
        };
        write!(f, "{}", name)
    }
}

/// What the first member is to the second, with a readable sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub description: String,
}

impl Relationship {
    pub fn new(kind: RelationshipKind, subject: &str, object: &str) -> Self {
        Self {
            kind,
            description: format!("{} {} {}", subject, kind.phrase(), object),
        }
    }
}

/// Classifies what `a` is to `b` from the members' lists.
///
/// Checks run in a fixed order: parent, child, spouse, sibling. Anything
/// else, including ids missing from the family, is `Related`.
pub fn classify(family: &Family, a: &str, b: &str) -> Relationship {
    match (family.member(a), family.member(b)) {
        (Some(ma), Some(mb)) => classify_members(ma, mb),
        (ma, mb) => Relationship::new(
            RelationshipKind::Related,
            ma.map_or(a, |m| m.first_name.as_str()),
            mb.map_or(b, |m| m.first_name.as_str()),
        ),
    }
}

pub fn classify_members(a: &Member, b: &Member) -> Relationship {
    let kind = if a.is_parent_of(&b.id) {
        RelationshipKind::Parent
    } else if a.is_child_of(&b.id) {
        RelationshipKind::Child
    } else if a.is_spouse_of(&b.id) {
        RelationshipKind::Spouse
    } else if a.shares_parent_with(b) {
        RelationshipKind::Sibling
    } else {
        RelationshipKind::Related
    };
    Relationship::new(kind, &a.first_name, &b.first_name)
}

/// One label per consecutive pair of `path`.
pub fn describe_path<S: AsRef<str>>(family: &Family, path: &[S]) -> Vec<Relationship> {
    path.windows(2)
        .map(|pair| classify(family, pair[0].as_ref(), pair[1].as_ref()))
        .collect()
}
