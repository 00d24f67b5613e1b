//! Lineage traversal over the parents/children lists.
//!
//! These walks deliberately ignore the matrix: ancestor queries must go up
//! parent links, which the directed matrix does not allow.

use kin_core::{Family, Member};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};

/// Which list a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ancestors,
    Descendants,
}

impl Direction {
    fn next<'a>(&self, member: &'a Member) -> &'a [String] {
        match self {
            Direction::Ancestors => &member.parents,
            Direction::Descendants => &member.children,
        }
    }
}

/// A member reached by a traversal, with the number of hops from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageEntry<'a> {
    pub member: &'a Member,
    pub generation: usize,
}

struct Frame<'a> {
    member: &'a Member,
    cursor: usize,
}

/// Pre-order walk from `root` along `direction`.
///
/// `depth` bounds the generation: `None` is unbounded and `Some(0)` returns
/// nothing. The root is never part of the result. A member reachable along
/// several routes appears once, at its nearest generation, in the position
/// of its first pre-order visit. Returns `None` when `root` is not in the
/// family.
pub fn traverse<'a>(
    family: &'a Family,
    root: &str,
    direction: Direction,
    depth: Option<usize>,
) -> Option<Vec<LineageEntry<'a>>> {
    let start = family.member(root)?;
    let nearest = nearest_generations(family, start, direction, depth);

    let mut result = Vec::new();
    let mut emitted: HashSet<&str> = HashSet::new();
    emitted.insert(start.id.as_str());

    let mut stack = vec![Frame {
        member: start,
        cursor: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let relatives = direction.next(frame.member);
        let Some(next_id) = relatives.get(frame.cursor) else {
            stack.pop();
            continue;
        };
        frame.cursor += 1;

        // Members outside the bound have no entry.
        let Some(&generation) = nearest.get(next_id.as_str()) else {
            continue;
        };
        let Some(next) = family.member(next_id) else {
            continue;
        };
        if !emitted.insert(next.id.as_str()) {
            continue;
        }

        result.push(LineageEntry {
            member: next,
            generation,
        });
        stack.push(Frame {
            member: next,
            cursor: 0,
        });
    }

    Some(result)
}

/// Fewest hops from `start` to every member within `depth`, breadth first.
fn nearest_generations<'a>(
    family: &'a Family,
    start: &'a Member,
    direction: Direction,
    depth: Option<usize>,
) -> HashMap<&'a str, usize> {
    let mut nearest = HashMap::new();
    nearest.insert(start.id.as_str(), 0);
    let mut queue = VecDeque::from([(start, 0usize)]);

    while let Some((member, generation)) = queue.pop_front() {
        if depth.map_or(false, |limit| generation >= limit) {
            continue;
        }
        for next in direction.next(member).iter().filter_map(|id| family.member(id)) {
            if let Entry::Vacant(slot) = nearest.entry(next.id.as_str()) {
                slot.insert(generation + 1);
                queue.push_back((next, generation + 1));
            }
        }
    }

    nearest
}

pub fn ancestors<'a>(
    family: &'a Family,
    id: &str,
    depth: Option<usize>,
) -> Option<Vec<LineageEntry<'a>>> {
    traverse(family, id, Direction::Ancestors, depth)
}

pub fn descendants<'a>(
    family: &'a Family,
    id: &str,
    depth: Option<usize>,
) -> Option<Vec<LineageEntry<'a>>> {
    traverse(family, id, Direction::Descendants, depth)
}

/// Other children of the member's parents, in first-seen order.
pub fn siblings<'a>(family: &'a Family, id: &str) -> Option<Vec<&'a Member>> {
    let member = family.member(id)?;
    let mut found = Collector::excluding(&member.id);

    for parent in member.parents.iter().filter_map(|p| family.member(p)) {
        for child in parent.children.iter().filter_map(|c| family.member(c)) {
            found.push(child);
        }
    }

    Some(found.into_members())
}

/// Siblings of each parent together with those siblings' spouses.
pub fn uncles_aunts<'a>(family: &'a Family, id: &str) -> Option<Vec<&'a Member>> {
    let member = family.member(id)?;
    let mut found = Collector::excluding(&member.id);

    for parent in &member.parents {
        let Some(parent_siblings) = siblings(family, parent) else {
            continue;
        };
        for sibling in parent_siblings {
            found.push(sibling);
            if let Some(spouse) = sibling.spouse.as_deref().and_then(|s| family.member(s)) {
                found.push(spouse);
            }
        }
    }

    Some(found.into_members())
}

/// Children of every uncle and aunt.
pub fn cousins<'a>(family: &'a Family, id: &str) -> Option<Vec<&'a Member>> {
    let member = family.member(id)?;
    let mut found = Collector::excluding(&member.id);

    for relative in uncles_aunts(family, id)? {
        for child in relative.children.iter().filter_map(|c| family.member(c)) {
            found.push(child);
        }
    }

    Some(found.into_members())
}

/// Ordered, duplicate-free member list.
struct Collector<'a> {
    seen: HashSet<&'a str>,
    members: Vec<&'a Member>,
}

impl<'a> Collector<'a> {
    fn excluding(id: &'a str) -> Self {
        let mut seen = HashSet::new();
        seen.insert(id);
        Self {
            seen,
            members: Vec::new(),
        }
    }

    fn push(&mut self, member: &'a Member) {
        if self.seen.insert(member.id.as_str()) {
            self.members.push(member);
        }
    }

    fn into_members(self) -> Vec<&'a Member> {
        self.members
    }
}
