//! The family snapshot.
//!
//! A `Family` owns its members and the relation matrix. All relation
//! mutators update both the members' lists and the matrix, so the two
//! views never drift apart.

use crate::error::{ModelError, Result};
use crate::matrix::RelationMatrix;
use crate::member::{Gender, Member, MemberPatch};
use crate::relation::{RelationKind, NO_RELATION};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Members keyed by id.
    members: BTreeMap<String, Member>,

    /// Weighted relations and the id ↔ index mapping.
    matrix: RelationMatrix,
}

/// Criteria for [`Family::search_members`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberQuery {
    /// Case-insensitive exact match.
    pub first_name: Option<String>,
    /// Case-insensitive exact match.
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    /// Matches members having this id among their parents.
    pub parent: Option<String>,
}

impl MemberQuery {
    pub fn matches(&self, member: &Member) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .map_or(true, |w| w.eq_ignore_ascii_case(actual))
        };

        same(&self.first_name, &member.first_name)
            && same(&self.last_name, &member.last_name)
            && self.gender.map_or(true, |g| g == member.gender)
            && self.birth_date.map_or(true, |d| d == member.birth_date)
            && self
                .parent
                .as_deref()
                .map_or(true, |p| member.is_child_of(p))
    }
}

impl Family {
    /// Creates an empty family.
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            created_at,
            updated_at: created_at,
            members: BTreeMap::new(),
            matrix: RelationMatrix::new(),
        }
    }

    /// Marks the family as modified.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    /// Iterates over members in matrix index order.
    pub fn members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.matrix
            .ids()
            .iter()
            .filter_map(|id| self.members.get(id))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn matrix(&self) -> &RelationMatrix {
        &self.matrix
    }

    /// Adds a member and grows the matrix by one row and column.
    ///
    /// The member must not carry relations yet; relations are added with
    /// [`Family::add_relation`] so both views stay consistent.
    pub fn add_member(&mut self, member: Member) -> Result<usize> {
        if self.members.contains_key(&member.id) {
            return Err(ModelError::DuplicateMember(member.id));
        }
        if member.has_relations() {
            return Err(ModelError::InvariantViolation(format!(
                "new member {} already carries relations",
                member.id
            )));
        }

        let index = self.matrix.add_member(member.id.clone())?;
        debug!("Added member {} at index {}", member.id, index);
        self.members.insert(member.id.clone(), member);
        Ok(index)
    }

    /// Updates the descriptive fields of a member.
    pub fn update_member(&mut self, id: &str, patch: MemberPatch) -> Result<&Member> {
        let member = self
            .members
            .get_mut(id)
            .ok_or_else(|| ModelError::MemberNotFound(id.to_string()))?;
        member.apply(patch);
        Ok(member)
    }

    /// Removes a member, scrubs every reference to it, and rebuilds the matrix.
    pub fn remove_member(&mut self, id: &str) -> Option<Member> {
        let removed = self.members.remove(id)?;

        for member in self.members.values_mut() {
            member.parents.retain(|p| p != id);
            member.children.retain(|c| c != id);
            if member.spouse.as_deref() == Some(id) {
                member.spouse = None;
            }
        }
        self.matrix.remove_member(id);

        debug!("Removed member {}", id);
        Some(removed)
    }

    /// Adds a relation of the given kind from `from` to `to`.
    ///
    /// Returns `false` when the relation already existed.
    pub fn add_relation(&mut self, from: &str, to: &str, kind: RelationKind) -> Result<bool> {
        match kind {
            RelationKind::ParentChild => self.add_parent_child(from, to),
            RelationKind::Spouse => self.add_spouse(from, to),
        }
    }

    /// Records `parent` as a parent of `child`.
    pub fn add_parent_child(&mut self, parent: &str, child: &str) -> Result<bool> {
        let (p, c) = self.pair_indexes(parent, child)?;

        let already = self.members[parent].is_parent_of(child) && self.members[child].is_child_of(parent);
        if already {
            return Ok(false);
        }
        if self.members[parent].is_spouse_of(child) {
            return Err(ModelError::RelationConflict(parent.into(), child.into()));
        }

        self.matrix.set_edge(p, c, RelationKind::ParentChild.weight())?;
        if let Some(member) = self.members.get_mut(parent) {
            if !member.is_parent_of(child) {
                member.children.push(child.to_string());
            }
        }
        if let Some(member) = self.members.get_mut(child) {
            if !member.is_child_of(parent) {
                member.parents.push(parent.to_string());
            }
        }
        Ok(true)
    }

    /// Marries two members. Fails if either already has a different spouse.
    pub fn add_spouse(&mut self, a: &str, b: &str) -> Result<bool> {
        let (i, j) = self.pair_indexes(a, b)?;

        for (member, other) in [(a, b), (b, a)] {
            if let Some(spouse) = &self.members[member].spouse {
                if spouse != other {
                    return Err(ModelError::SpouseConflict {
                        member: member.to_string(),
                        spouse: spouse.clone(),
                    });
                }
            }
        }
        if self.members[a].is_spouse_of(b) && self.members[b].is_spouse_of(a) {
            return Ok(false);
        }
        if self.members[a].is_parent_of(b) || self.members[b].is_parent_of(a) {
            return Err(ModelError::RelationConflict(a.into(), b.into()));
        }

        let weight = RelationKind::Spouse.weight();
        self.matrix.set_edge(i, j, weight)?;
        self.matrix.set_edge(j, i, weight)?;
        if let Some(member) = self.members.get_mut(a) {
            member.spouse = Some(b.to_string());
        }
        if let Some(member) = self.members.get_mut(b) {
            member.spouse = Some(a.to_string());
        }
        Ok(true)
    }

    /// Removes any direct relation between two members, in both directions.
    ///
    /// Returns `false` when they were not directly related.
    pub fn remove_relation(&mut self, a: &str, b: &str) -> Result<bool> {
        let (i, j) = self.pair_indexes(a, b)?;

        let related = {
            let (ma, mb) = (&self.members[a], &self.members[b]);
            ma.is_parent_of(b) || ma.is_child_of(b) || ma.is_spouse_of(b) || mb.is_spouse_of(a)
        } || self.matrix.weight(i, j) != Some(NO_RELATION)
            || self.matrix.weight(j, i) != Some(NO_RELATION);

        if !related {
            return Ok(false);
        }

        for (member, other) in [(a, b), (b, a)] {
            if let Some(m) = self.members.get_mut(member) {
                m.children.retain(|c| c != other);
                m.parents.retain(|p| p != other);
                if m.spouse.as_deref() == Some(other) {
                    m.spouse = None;
                }
            }
        }
        self.matrix.clear_edge(i, j)?;
        self.matrix.clear_edge(j, i)?;
        Ok(true)
    }

    /// Members matching every set criterion, in index order.
    pub fn search_members(&self, query: &MemberQuery) -> Vec<&Member> {
        self.members().filter(|m| query.matches(m)).collect()
    }

    /// Checks that the member lists and the matrix describe the same graph.
    pub fn check_invariants(&self) -> Result<()> {
        self.matrix.check_invariants()?;

        if self.matrix.size() != self.members.len() {
            return Err(ModelError::InvariantViolation(format!(
                "matrix size {} does not match {} members",
                self.matrix.size(),
                self.members.len()
            )));
        }

        for member in self.members.values() {
            let from = self
                .matrix
                .index_of(&member.id)
                .ok_or_else(|| ModelError::InvariantViolation(format!("{} has no index", member.id)))?;

            for child in &member.children {
                let to = self.resolve_reference(&member.id, child)?;
                if !self.members[child].is_child_of(&member.id) {
                    return Err(ModelError::InvariantViolation(format!(
                        "{} lists child {} which does not list it as parent",
                        member.id, child
                    )));
                }
                if self.matrix.weight(from, to) != Some(RelationKind::ParentChild.weight()) {
                    return Err(ModelError::InvariantViolation(format!(
                        "missing parent edge {} -> {}",
                        member.id, child
                    )));
                }
            }

            for parent in &member.parents {
                self.resolve_reference(&member.id, parent)?;
                if !self.members[parent].is_parent_of(&member.id) {
                    return Err(ModelError::InvariantViolation(format!(
                        "{} lists parent {} which does not list it as child",
                        member.id, parent
                    )));
                }
            }

            if let Some(spouse) = &member.spouse {
                let to = self.resolve_reference(&member.id, spouse)?;
                if matches!(&self.members[spouse].spouse, Some(s) if s != &member.id) {
                    return Err(ModelError::InvariantViolation(format!(
                        "{} and {} disagree on their spouse",
                        member.id, spouse
                    )));
                }
                let weight = RelationKind::Spouse.weight();
                if self.matrix.weight(from, to) != Some(weight)
                    || self.matrix.weight(to, from) != Some(weight)
                {
                    return Err(ModelError::InvariantViolation(format!(
                        "spouse edge {} <-> {} is not symmetric",
                        member.id, spouse
                    )));
                }
            }
        }

        for (from, to, weight) in self.matrix.edges() {
            let valid = match RelationKind::from_weight(weight as i64) {
                Some(RelationKind::Spouse) => self.matrix.weight(to, from) == Some(weight),
                Some(RelationKind::ParentChild) => true,
                None => false,
            };
            if !valid {
                return Err(ModelError::InvariantViolation(format!(
                    "unexpected weight {} at ({}, {})",
                    weight, from, to
                )));
            }
        }

        Ok(())
    }

    fn resolve_reference(&self, owner: &str, target: &str) -> Result<usize> {
        match (self.members.contains_key(target), self.matrix.index_of(target)) {
            (true, Some(index)) => Ok(index),
            _ => Err(ModelError::InvariantViolation(format!(
                "{} references unknown member {}",
                owner, target
            ))),
        }
    }

    fn pair_indexes(&self, a: &str, b: &str) -> Result<(usize, usize)> {
        let i = self.index_of_member(a)?;
        let j = self.index_of_member(b)?;
        if i == j {
            return Err(ModelError::SelfLoop(a.to_string()));
        }
        Ok((i, j))
    }

    fn index_of_member(&self, id: &str) -> Result<usize> {
        if !self.members.contains_key(id) {
            return Err(ModelError::MemberNotFound(id.to_string()));
        }
        self.matrix
            .index_of(id)
            .ok_or_else(|| ModelError::InvariantViolation(format!("{} has no index", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::NewMember;

    fn person(id: &str, first: &str) -> Member {
        let birth = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        Member::new(id, "fam", NewMember::new(first, "Test", birth, Gender::Female))
    }

    fn family_of(ids: &[&str]) -> Family {
        let mut family = Family::new("fam", "Test", Utc::now());
        for id in ids {
            family.add_member(person(id, id)).unwrap();
        }
        family
    }

    #[test]
    fn test_parent_child_updates_lists_and_matrix() {
        let mut family = family_of(&["p", "c"]);
        assert_eq!(family.add_parent_child("p", "c"), Ok(true));

        assert_eq!(family.member("p").unwrap().children, vec!["c".to_string()]);
        assert_eq!(family.member("c").unwrap().parents, vec!["p".to_string()]);
        assert_eq!(family.matrix().weight(0, 1), Some(1));
        assert_eq!(family.matrix().weight(1, 0), Some(0));
        assert!(family.check_invariants().is_ok());

        // Idempotent
        assert_eq!(family.add_parent_child("p", "c"), Ok(false));
        assert_eq!(family.member("p").unwrap().children.len(), 1);
    }

    #[test]
    fn test_spouse_is_symmetric() {
        let mut family = family_of(&["a", "b"]);
        assert_eq!(family.add_relation("a", "b", RelationKind::Spouse), Ok(true));

        assert_eq!(family.matrix().weight(0, 1), Some(2));
        assert_eq!(family.matrix().weight(1, 0), Some(2));
        assert!(family.member("a").unwrap().is_spouse_of("b"));
        assert!(family.member("b").unwrap().is_spouse_of("a"));
        assert!(family.check_invariants().is_ok());
    }

    #[test]
    fn test_spouse_conflict() {
        let mut family = family_of(&["a", "b", "c"]);
        family.add_spouse("a", "b").unwrap();

        let err = family.add_spouse("c", "a").unwrap_err();
        assert_eq!(
            err,
            ModelError::SpouseConflict {
                member: "a".into(),
                spouse: "b".into()
            }
        );
        assert!(family.member("c").unwrap().spouse.is_none());
    }

    #[test]
    fn test_relation_conflicts_and_errors() {
        let mut family = family_of(&["a", "b"]);
        family.add_parent_child("a", "b").unwrap();
        assert!(matches!(
            family.add_spouse("a", "b"),
            Err(ModelError::RelationConflict(_, _))
        ));
        assert_eq!(
            family.add_parent_child("a", "a"),
            Err(ModelError::SelfLoop("a".into()))
        );
        assert_eq!(
            family.add_parent_child("a", "nobody"),
            Err(ModelError::MemberNotFound("nobody".into()))
        );
    }

    #[test]
    fn test_remove_relation() {
        let mut family = family_of(&["p", "c", "s"]);
        family.add_parent_child("p", "c").unwrap();
        family.add_spouse("p", "s").unwrap();

        // Removing from the child's side works too.
        assert_eq!(family.remove_relation("c", "p"), Ok(true));
        assert!(family.member("p").unwrap().children.is_empty());
        assert!(family.member("c").unwrap().parents.is_empty());
        assert_eq!(family.matrix().weight(0, 1), Some(0));

        assert_eq!(family.remove_relation("s", "p"), Ok(true));
        assert!(family.member("p").unwrap().spouse.is_none());
        assert_eq!(family.matrix().edge_count(), 0);

        assert_eq!(family.remove_relation("s", "c"), Ok(false));
        assert!(family.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_member_scrubs_references_and_shrinks_matrix() {
        // g -> p -> c, p <-> s, s -> c
        let mut family = family_of(&["g", "p", "s", "c"]);
        family.add_parent_child("g", "p").unwrap();
        family.add_parent_child("p", "c").unwrap();
        family.add_parent_child("s", "c").unwrap();
        family.add_spouse("p", "s").unwrap();

        let removed = family.remove_member("p").unwrap();
        assert_eq!(removed.id, "p");

        assert_eq!(family.member_count(), 3);
        assert_eq!(family.matrix().size(), 3);
        assert!(family.member("g").unwrap().children.is_empty());
        assert!(family.member("s").unwrap().spouse.is_none());
        assert_eq!(family.member("c").unwrap().parents, vec!["s".to_string()]);

        // s moved from 2 to 1, c from 3 to 2; only s -> c remains.
        assert_eq!(family.matrix().index_of("s"), Some(1));
        assert_eq!(family.matrix().index_of("c"), Some(2));
        assert_eq!(family.matrix().edges().collect::<Vec<_>>(), vec![(1, 2, 1)]);
        assert!(family.check_invariants().is_ok());

        assert!(family.remove_member("p").is_none());
    }

    #[test]
    fn test_add_member_rejects_prelinked() {
        let mut family = family_of(&["a"]);
        let mut linked = person("b", "b");
        linked.parents.push("a".into());
        assert!(matches!(
            family.add_member(linked),
            Err(ModelError::InvariantViolation(_))
        ));
        assert_eq!(
            family.add_member(person("a", "again")),
            Err(ModelError::DuplicateMember("a".into()))
        );
        assert_eq!(family.matrix().size(), 1);
    }

    #[test]
    fn test_search_members() {
        let mut family = family_of(&["a", "b"]);
        family.add_parent_child("a", "b").unwrap();
        family
            .update_member(
                "b",
                MemberPatch {
                    first_name: Some("Lucie".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let query = MemberQuery {
            first_name: Some("lucie".into()),
            ..Default::default()
        };
        let found: Vec<_> = family.search_members(&query).iter().map(|m| m.id.clone()).collect();
        assert_eq!(found, vec!["b".to_string()]);

        let by_parent = MemberQuery {
            parent: Some("a".into()),
            ..Default::default()
        };
        assert_eq!(family.search_members(&by_parent).len(), 1);
        assert_eq!(family.search_members(&MemberQuery::default()).len(), 2);
    }

    #[test]
    fn test_invariants_detect_drift() {
        let mut family = family_of(&["a", "b"]);
        family.add_parent_child("a", "b").unwrap();
        // Simulate drift by clearing only the matrix edge.
        family.matrix.clear_edge(0, 1).unwrap();
        assert!(matches!(
            family.check_invariants(),
            Err(ModelError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_members_in_index_order() {
        let family = family_of(&["z", "a", "m"]);
        let ids: Vec<_> = family.members().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
