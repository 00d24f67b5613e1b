//! CRUD over stored families.
//!
//! Each write loads the family, applies the change through the model's
//! mutators, stamps `updated_at`, and saves the snapshot back. Callers that
//! share a registry across tasks serialize writes themselves.

use crate::error::{Result, StoreError};
use crate::store::FamilyStore;
use chrono::{DateTime, Utc};
use kin_core::{
    nullable, Family, Member, MemberPatch, MemberQuery, ModelError, NewMember, RelationKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Payload for creating a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFamily {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub initial_member: Option<NewMember>,
}

impl NewFamily {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            initial_member: None,
        }
    }
}

/// Partial update of a family. `description: null` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

/// A family without its members, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Family> for FamilySummary {
    fn from(family: &Family) -> Self {
        Self {
            id: family.id.clone(),
            name: family.name.clone(),
            description: family.description.clone(),
            member_count: family.member_count(),
            created_at: family.created_at,
            updated_at: family.updated_at,
        }
    }
}

/// Family and member CRUD on top of a [`FamilyStore`].
pub struct FamilyRegistry {
    store: FamilyStore,
}

impl FamilyRegistry {
    /// Opens the registry's store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(FamilyStore::open(path)?))
    }

    pub fn new(store: FamilyStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FamilyStore {
        &self.store
    }

    // ----- Families -----

    pub fn families(&self) -> Result<Vec<Family>> {
        self.store.list()
    }

    pub fn summaries(&self) -> Result<Vec<FamilySummary>> {
        Ok(self.families()?.iter().map(FamilySummary::from).collect())
    }

    /// Gets a family by id.
    pub fn family(&self, id: &str) -> Result<Family> {
        self.store
            .load(id)?
            .ok_or_else(|| StoreError::FamilyNotFound(id.to_string()))
    }

    /// Finds a family by id, then by case-insensitive name.
    pub fn find_family(&self, identifier: &str) -> Result<Option<Family>> {
        if let Some(family) = self.store.load(identifier)? {
            return Ok(Some(family));
        }
        let wanted = identifier.to_lowercase();
        Ok(self
            .families()?
            .into_iter()
            .find(|f| f.name.to_lowercase() == wanted))
    }

    /// The family a member belongs to.
    pub fn family_of_member(&self, member_id: &str) -> Result<Option<Family>> {
        Ok(self.families()?.into_iter().find(|f| f.contains(member_id)))
    }

    pub fn create_family(&self, data: NewFamily) -> Result<Family> {
        let now = Utc::now();
        let mut family = Family::new(new_id(), data.name, now);
        family.description = data.description;

        if let Some(initial) = data.initial_member {
            let member = Member::new(new_id(), family.id.clone(), initial);
            family.add_member(member)?;
        }

        self.store.save(&family)?;
        info!("Created family {} ({})", family.name, family.id);
        Ok(family)
    }

    pub fn update_family(&self, id: &str, patch: FamilyPatch) -> Result<Family> {
        self.modify(id, |family| {
            if let Some(name) = patch.name {
                family.name = name;
            }
            if let Some(description) = patch.description {
                family.description = description;
            }
            Ok(())
        })?;
        self.family(id)
    }

    pub fn delete_family(&self, id: &str) -> Result<()> {
        if !self.store.remove(id)? {
            return Err(StoreError::FamilyNotFound(id.to_string()));
        }
        info!("Deleted family {}", id);
        Ok(())
    }

    // ----- Members -----

    /// Members of a family in index order.
    pub fn members(&self, family_id: &str) -> Result<Vec<Member>> {
        Ok(self.family(family_id)?.members().cloned().collect())
    }

    pub fn member(&self, family_id: &str, member_id: &str) -> Result<Member> {
        self.family(family_id)?
            .member(member_id)
            .cloned()
            .ok_or_else(|| StoreError::MemberNotFound {
                family: family_id.to_string(),
                member: member_id.to_string(),
            })
    }

    pub fn add_member(&self, family_id: &str, data: NewMember) -> Result<Member> {
        let member = Member::new(new_id(), family_id, data);
        let added = member.clone();
        self.modify(family_id, |family| family.add_member(member).map(|_| ()))?;
        debug!("Added member {} to family {}", added.id, family_id);
        Ok(added)
    }

    /// Adds a member to the family matching `identifier`, creating a family
    /// named after the member's last name when none matches.
    pub fn enroll_member(&self, identifier: &str, data: NewMember) -> Result<(Family, Member)> {
        if let Some(family) = self.find_family(identifier)? {
            let member = self.add_member(&family.id, data)?;
            return Ok((self.family(&family.id)?, member));
        }

        info!("No family matches {}, creating one", identifier);
        let family = self.create_family(NewFamily {
            name: format!("{} family", data.last_name),
            description: None,
            initial_member: Some(data),
        })?;
        let member = family
            .members()
            .next()
            .cloned()
            .ok_or_else(|| ModelError::InvariantViolation(format!("family {} was created empty", family.id)))?;
        Ok((family, member))
    }

    pub fn update_member(&self, family_id: &str, member_id: &str, patch: MemberPatch) -> Result<Member> {
        self.modify(family_id, |family| {
            family.update_member(member_id, patch).map(Member::clone)
        })
    }

    /// Removes a member and every relation pointing at it.
    pub fn remove_member(&self, family_id: &str, member_id: &str) -> Result<Member> {
        self.modify(family_id, |family| {
            family
                .remove_member(member_id)
                .ok_or_else(|| ModelError::MemberNotFound(member_id.to_string()))
        })
    }

    pub fn search_members(&self, family_id: &str, query: &MemberQuery) -> Result<Vec<Member>> {
        Ok(self
            .family(family_id)?
            .search_members(query)
            .into_iter()
            .cloned()
            .collect())
    }

    // ----- Relations -----

    /// Returns `false` when the relation already existed.
    pub fn add_relation(&self, family_id: &str, from: &str, to: &str, kind: RelationKind) -> Result<bool> {
        let added = self.modify(family_id, |family| family.add_relation(from, to, kind))?;
        debug!("Relation {} {} -> {} in {}: added={}", kind, from, to, family_id, added);
        Ok(added)
    }

    /// Returns `false` when the members were not directly related.
    pub fn remove_relation(&self, family_id: &str, a: &str, b: &str) -> Result<bool> {
        self.modify(family_id, |family| family.remove_relation(a, b))
    }

    /// Loads a family, applies `change`, and saves it if the change succeeded.
    fn modify<T>(
        &self,
        family_id: &str,
        change: impl FnOnce(&mut Family) -> std::result::Result<T, ModelError>,
    ) -> Result<T> {
        let mut family = self.family(family_id)?;
        let value = change(&mut family).map_err(|e| match e {
            ModelError::MemberNotFound(member) => StoreError::MemberNotFound {
                family: family_id.to_string(),
                member,
            },
            other => StoreError::Model(other),
        })?;
        family.touch(Utc::now());
        self.store.save(&family)?;
        Ok(value)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kin_core::Gender;
    use tempfile::{tempdir, TempDir};

    fn registry() -> (TempDir, FamilyRegistry) {
        let dir = tempdir().unwrap();
        let registry = FamilyRegistry::open(dir.path()).unwrap();
        (dir, registry)
    }

    fn person(first: &str, last: &str) -> NewMember {
        let birth = NaiveDate::from_ymd_opt(1975, 8, 9).unwrap();
        NewMember::new(first, last, birth, Gender::Female)
    }

    #[test]
    fn test_create_family_with_initial_member() {
        let (_dir, registry) = registry();
        let family = registry
            .create_family(NewFamily {
                name: "Girard".into(),
                description: Some("Paternal side".into()),
                initial_member: Some(person("Claire", "Girard")),
            })
            .unwrap();

        assert_eq!(family.member_count(), 1);
        let stored = registry.family(&family.id).unwrap();
        assert_eq!(stored, family);
        assert_eq!(registry.summaries().unwrap()[0].member_count, 1);
    }

    #[test]
    fn test_missing_family_is_not_found() {
        let (_dir, registry) = registry();
        let err = registry.family("nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_storage());
        assert!(registry.delete_family("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_find_family_by_id_or_name() {
        let (_dir, registry) = registry();
        let family = registry.create_family(NewFamily::named("Dubois")).unwrap();

        assert_eq!(registry.find_family(&family.id).unwrap().unwrap().id, family.id);
        assert_eq!(registry.find_family("dUBOIS").unwrap().unwrap().id, family.id);
        assert!(registry.find_family("Petit").unwrap().is_none());
    }

    #[test]
    fn test_update_and_delete_family() {
        let (_dir, registry) = registry();
        let family = registry.create_family(NewFamily::named("Roux")).unwrap();

        let updated = registry
            .update_family(
                &family.id,
                FamilyPatch {
                    description: Some(Some("Maternal side".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Roux");
        assert_eq!(updated.description.as_deref(), Some("Maternal side"));
        assert!(updated.updated_at >= family.updated_at);

        let cleared = registry
            .update_family(
                &family.id,
                FamilyPatch {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.name, "Roux");

        registry.delete_family(&family.id).unwrap();
        assert!(registry.families().unwrap().is_empty());
    }

    #[test]
    fn test_member_crud_and_relations() {
        let (_dir, registry) = registry();
        let family = registry.create_family(NewFamily::named("Fabre")).unwrap();
        let mom = registry.add_member(&family.id, person("Lea", "Fabre")).unwrap();
        let kid = registry.add_member(&family.id, person("Tom", "Fabre")).unwrap();

        assert!(registry
            .add_relation(&family.id, &mom.id, &kid.id, RelationKind::ParentChild)
            .unwrap());
        assert!(!registry
            .add_relation(&family.id, &mom.id, &kid.id, RelationKind::ParentChild)
            .unwrap());
        assert!(registry.member(&family.id, &kid.id).unwrap().is_child_of(&mom.id));

        let renamed = registry
            .update_member(
                &family.id,
                &kid.id,
                MemberPatch {
                    first_name: Some("Thomas".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.first_name, "Thomas");

        let query = MemberQuery {
            parent: Some(mom.id.clone()),
            ..Default::default()
        };
        let found = registry.search_members(&family.id, &query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, kid.id);

        assert!(registry.remove_relation(&family.id, &mom.id, &kid.id).unwrap());
        assert!(!registry.remove_relation(&family.id, &mom.id, &kid.id).unwrap());

        registry.remove_member(&family.id, &mom.id).unwrap();
        let remaining = registry.members(&family.id).unwrap();
        assert_eq!(remaining.len(), 1);
        registry.family(&family.id).unwrap().check_invariants().unwrap();
    }

    #[test]
    fn test_unknown_member_maps_to_store_error() {
        let (_dir, registry) = registry();
        let family = registry.create_family(NewFamily::named("Blanc")).unwrap();
        let err = registry.remove_member(&family.id, "ghost").unwrap_err();
        assert!(matches!(err, StoreError::MemberNotFound { ref member, .. } if member == "ghost"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_failed_change_is_not_saved() {
        let (_dir, registry) = registry();
        let family = registry.create_family(NewFamily::named("Noel")).unwrap();
        let a = registry.add_member(&family.id, person("A", "Noel")).unwrap();
        let b = registry.add_member(&family.id, person("B", "Noel")).unwrap();
        let c = registry.add_member(&family.id, person("C", "Noel")).unwrap();
        registry
            .add_relation(&family.id, &a.id, &b.id, RelationKind::Spouse)
            .unwrap();

        let err = registry
            .add_relation(&family.id, &a.id, &c.id, RelationKind::Spouse)
            .unwrap_err();
        assert!(matches!(err, StoreError::Model(ModelError::SpouseConflict { .. })));
        assert_eq!(registry.member(&family.id, &c.id).unwrap().spouse, None);
    }

    #[test]
    fn test_enroll_member() {
        let (_dir, registry) = registry();

        let (created, first) = registry.enroll_member("Mercier", person("Ines", "Mercier")).unwrap();
        assert_eq!(created.name, "Mercier family");
        assert_eq!(first.family_id, created.id);

        let (same, second) = registry
            .enroll_member("mercier family", person("Hugo", "Mercier"))
            .unwrap();
        assert_eq!(same.id, created.id);
        assert_eq!(same.member_count(), 2);
        assert!(same.contains(&second.id));

        let owner = registry.family_of_member(&second.id).unwrap().unwrap();
        assert_eq!(owner.id, created.id);
    }
}
