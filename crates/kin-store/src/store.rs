use crate::error::Result;
use kin_core::Family;
use sled::{Db, Tree};
use std::path::Path;
use tracing::warn;

const FAMILIES_TREE: &str = "families";

/// Family snapshots in a sled database, one bincode blob per family id.
pub struct FamilyStore {
    db: Db,
    families: Tree,
}

impl FamilyStore {
    /// Opens or creates a family store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let families = db.open_tree(FAMILIES_TREE)?;
        Ok(Self { db, families })
    }

    /// Writes a family snapshot, replacing any previous one with the same id.
    pub fn save(&self, family: &Family) -> Result<()> {
        let bytes = bincode::serialize(family)?;
        self.families.insert(family.id.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads a family snapshot.
    ///
    /// A snapshot that fails its invariant check is still returned, with a warning.
    pub fn load(&self, id: &str) -> Result<Option<Family>> {
        let Some(bytes) = self.families.get(id.as_bytes())? else {
            return Ok(None);
        };
        let family: Family = bincode::deserialize(&bytes)?;
        if let Err(e) = family.check_invariants() {
            warn!("Family {} loaded with inconsistent relations: {}", id, e);
        }
        Ok(Some(family))
    }

    /// All stored families, ordered by id.
    pub fn list(&self) -> Result<Vec<Family>> {
        self.families
            .iter()
            .values()
            .map(|bytes| Ok(bincode::deserialize(&bytes?)?))
            .collect()
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.families.contains_key(id.as_bytes())?)
    }

    /// Deletes a family. Returns `false` if it did not exist.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let existed = self.families.remove(id.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
