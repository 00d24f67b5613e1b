//! Id-level entry point to the graph algorithms.

use crate::classify::{classify, describe_path, Relationship, RelationshipKind};
use crate::lineage::{self, Direction, LineageEntry};
use crate::path::{relaxation_path, shortest_path, IndexPath};
use crate::query::{Algorithm, ConnectionEdge, KinRecord, MemberInfo, RelationPath};
use crate::spanning::{minimum_connecting_edges, partition, WeightedEdge};
use kin_core::{Family, Member, ModelError, RelationKind};
use tracing::debug;

/// Translates member ids to matrix indexes, runs the algorithms, and maps the
/// results back to id-based records.
///
/// Holds no state; every call works on the snapshot it is given. Unknown
/// member ids give `None`. `Err` only comes from a structurally broken
/// snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphService;

impl GraphService {
    pub fn new() -> Self {
        Self
    }

    /// Cheapest path over positive weights, following parent→child edges forward only.
    pub fn shortest_path(
        &self,
        family: &Family,
        source: &str,
        target: &str,
    ) -> Result<Option<RelationPath>, ModelError> {
        self.relation_path(family, source, target, Algorithm::Dijkstra)
    }

    /// Path found by edge relaxation, which also reports negative cycles.
    pub fn indirect_relations(
        &self,
        family: &Family,
        source: &str,
        target: &str,
    ) -> Result<Option<RelationPath>, ModelError> {
        self.relation_path(family, source, target, Algorithm::BellmanFord)
    }

    pub fn relation_path(
        &self,
        family: &Family,
        source: &str,
        target: &str,
        algorithm: Algorithm,
    ) -> Result<Option<RelationPath>, ModelError> {
        let matrix = family.matrix();
        let (Some(from), Some(to)) = (matrix.index_of(source), matrix.index_of(target)) else {
            debug!("Path query with unknown member: {} -> {}", source, target);
            return Ok(None);
        };

        debug!("Searching {} path {} -> {}", algorithm, source, target);
        let found = match algorithm {
            Algorithm::Dijkstra => shortest_path(matrix, from, to)?,
            Algorithm::BellmanFord => relaxation_path(matrix, from, to)?,
        };

        Ok(Some(self.to_relation_path(family, source, target, found)?))
    }

    /// Greedy tree grown from the first member. Partial when the family is disconnected.
    pub fn minimal_connection_tree(&self, family: &Family) -> Result<Vec<ConnectionEdge>, ModelError> {
        minimum_connecting_edges(family.matrix())
            .into_iter()
            .map(|edge| self.to_connection_edge(family, edge))
            .collect()
    }

    /// Members grouped into connected sub-families, relations taken as undirected.
    pub fn subfamilies(&self, family: &Family) -> Result<Vec<Vec<MemberInfo>>, ModelError> {
        partition(family.matrix())
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|index| self.member_at(family, index).map(MemberInfo::from))
                    .collect()
            })
            .collect()
    }

    pub fn ancestors(&self, family: &Family, id: &str, depth: Option<usize>) -> Option<Vec<KinRecord>> {
        self.lineage(family, id, Direction::Ancestors, depth)
    }

    pub fn descendants(&self, family: &Family, id: &str, depth: Option<usize>) -> Option<Vec<KinRecord>> {
        self.lineage(family, id, Direction::Descendants, depth)
    }

    pub fn siblings(&self, family: &Family, id: &str) -> Option<Vec<KinRecord>> {
        let found = lineage::siblings(family, id)?;
        Some(self.records(family, id, found, RelationshipKind::Sibling, 0))
    }

    pub fn uncles_aunts(&self, family: &Family, id: &str) -> Option<Vec<KinRecord>> {
        let found = lineage::uncles_aunts(family, id)?;
        Some(self.records(family, id, found, RelationshipKind::UncleAunt, 1))
    }

    pub fn cousins(&self, family: &Family, id: &str) -> Option<Vec<KinRecord>> {
        let found = lineage::cousins(family, id)?;
        Some(self.records(family, id, found, RelationshipKind::Cousin, 0))
    }

    /// Direct relationship of `a` to `b`, or `None` if either is unknown.
    pub fn relationship(&self, family: &Family, a: &str, b: &str) -> Option<Relationship> {
        if !family.contains(a) || !family.contains(b) {
            return None;
        }
        Some(classify(family, a, b))
    }

    fn lineage(
        &self,
        family: &Family,
        id: &str,
        direction: Direction,
        depth: Option<usize>,
    ) -> Option<Vec<KinRecord>> {
        let root = family.member(id)?;
        let entries = lineage::traverse(family, id, direction, depth)?;
        debug!("{:?} of {}: {} found", direction, id, entries.len());

        Some(
            entries
                .into_iter()
                .map(|LineageEntry { member, generation }| {
                    let kind = RelationshipKind::for_lineage(direction, generation);
                    KinRecord {
                        member: MemberInfo::from(member),
                        relationship: Relationship::new(kind, &member.first_name, &root.first_name),
                        generation,
                    }
                })
                .collect(),
        )
    }

    fn records(
        &self,
        family: &Family,
        id: &str,
        members: Vec<&Member>,
        kind: RelationshipKind,
        generation: usize,
    ) -> Vec<KinRecord> {
        let root_name = family.member(id).map_or(id, |m| m.first_name.as_str());
        members
            .into_iter()
            .map(|member| KinRecord {
                member: MemberInfo::from(member),
                relationship: Relationship::new(kind, &member.first_name, root_name),
                generation,
            })
            .collect()
    }

    fn to_relation_path(
        &self,
        family: &Family,
        source: &str,
        target: &str,
        found: IndexPath,
    ) -> Result<RelationPath, ModelError> {
        let path = found
            .path
            .iter()
            .map(|&index| self.id_at(family, index))
            .collect::<Result<Vec<_>, _>>()?;
        let relations = describe_path(family, &path);

        Ok(RelationPath {
            source: source.to_string(),
            target: target.to_string(),
            path,
            relations,
            distance: found.distance,
            has_negative_cycle: found.has_negative_cycle,
        })
    }

    fn to_connection_edge(&self, family: &Family, edge: WeightedEdge) -> Result<ConnectionEdge, ModelError> {
        Ok(ConnectionEdge {
            from: self.id_at(family, edge.from)?,
            to: self.id_at(family, edge.to)?,
            weight: edge.weight,
            kind: RelationKind::from_weight(edge.weight),
        })
    }

    fn id_at(&self, family: &Family, index: usize) -> Result<String, ModelError> {
        let size = family.matrix().size();
        family
            .matrix()
            .id_at(index)
            .map(str::to_string)
            .ok_or(ModelError::IndexOutOfBounds {
                row: index,
                col: index,
                size,
            })
    }

    fn member_at<'a>(&self, family: &'a Family, index: usize) -> Result<&'a Member, ModelError> {
        let id = self.id_at(family, index)?;
        family
            .member(&id)
            .ok_or_else(|| ModelError::InvariantViolation(format!("index {} maps to unknown member {}", index, id)))
    }
}
