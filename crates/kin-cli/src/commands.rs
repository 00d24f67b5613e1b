//! CLI command implementations.

use crate::config::{resolve_data_dir, CliConfig};
use colored::Colorize;
use kin_core::{Family, Member, NewMember, RelationKind};
use kin_graph::{Algorithm, GraphService, KinRecord, RelationPath};
use kin_server::{KinServer, ServerConfig};
use kin_store::{FamilyRegistry, FamilySummary, NewFamily};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Global flags shared by every command.
pub struct Options {
    pub data: Option<PathBuf>,
    pub json: bool,
}

impl Options {
    fn open_registry(&self) -> Result<FamilyRegistry> {
        let root = std::env::current_dir()?;
        let config = CliConfig::load(&root)?;
        let data_dir = resolve_data_dir(self.data.as_deref(), &root, config.as_ref());
        debug!("Opening family database at {}", data_dir.display());
        Ok(FamilyRegistry::open(data_dir)?)
    }

    /// Prints `value` as JSON with `--json`, otherwise runs `human`.
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

fn resolve_family(registry: &FamilyRegistry, identifier: &str) -> Result<Family> {
    registry
        .find_family(identifier)?
        .ok_or_else(|| format!("Family '{}' not found", identifier).into())
}

fn member_name(family: &Family, id: &str) -> String {
    family.member(id).map_or_else(|| id.to_string(), Member::full_name)
}

fn print_member(member: &Member) {
    let dates = match member.death_date {
        Some(death) => format!("({} – {})", member.birth_date, death),
        None => format!("(b. {})", member.birth_date),
    };
    println!(
        "  {} {} {}",
        member.id.dimmed(),
        member.full_name().cyan(),
        dates.dimmed()
    );
}

/// Initialize Kin in a directory.
pub fn init(path: &Path, port: u16) -> Result<()> {
    if CliConfig::path_in(path).exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let config = CliConfig {
        data_dir: Some(PathBuf::from(".kin").join("data")),
        port,
        ..Default::default()
    };
    config.write(path)?;

    println!("{} Initialized Kin in {}", "✓".green(), path.display());
    println!("  Run {} to create your first family", "kin family create <name>".cyan());

    Ok(())
}

// ----- Families -----

pub fn family_create(opts: &Options, name: &str, description: Option<String>) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = registry.create_family(NewFamily {
        name: name.to_string(),
        description,
        initial_member: None,
    })?;

    opts.emit(&FamilySummary::from(&family), || {
        println!("{} Created family {} ({})", "✓".green(), family.name.cyan(), family.id.dimmed());
    })
}

pub fn family_list(opts: &Options) -> Result<()> {
    let families = opts.open_registry()?.summaries()?;

    opts.emit(&families, || {
        if families.is_empty() {
            println!("No families yet");
            return;
        }
        for family in &families {
            println!(
                "  {} {} {}",
                family.id.dimmed(),
                family.name.cyan(),
                format!("({} members)", family.member_count).dimmed()
            );
        }
    })
}

pub fn family_show(opts: &Options, identifier: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;

    #[derive(Serialize)]
    struct FamilyView<'a> {
        #[serde(flatten)]
        summary: FamilySummary,
        members: Vec<&'a Member>,
    }

    let view = FamilyView {
        summary: FamilySummary::from(&family),
        members: family.members().collect(),
    };

    opts.emit(&view, || {
        println!("{}", family.name.cyan().bold());
        if let Some(description) = &family.description {
            println!("{}", description.dimmed());
        }
        println!();
        println!("  {} {}", "Members:".dimmed(), family.member_count());
        println!("  {} {}", "Relations:".dimmed(), family.matrix().edge_count());
        println!();
        for member in family.members() {
            print_member(member);
            if let Some(spouse) = &member.spouse {
                println!("      spouse of {}", member_name(&family, spouse));
            }
            for parent in &member.parents {
                println!("      child of {}", member_name(&family, parent));
            }
        }
    })
}

pub fn family_delete(opts: &Options, identifier: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    registry.delete_family(&family.id)?;

    opts.emit(&serde_json::json!({ "deleted": family.id }), || {
        println!("{} Deleted family {}", "✓".green(), family.name.cyan());
    })
}

// ----- Members -----

pub fn member_add(opts: &Options, identifier: &str, data: NewMember) -> Result<()> {
    let registry = opts.open_registry()?;
    let (family, member) = registry.enroll_member(identifier, data)?;

    opts.emit(&member, || {
        println!(
            "{} Added {} to {} ({})",
            "✓".green(),
            member.full_name().cyan(),
            family.name,
            member.id.dimmed()
        );
    })
}

pub fn member_list(opts: &Options, identifier: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let members: Vec<&Member> = family.members().collect();

    opts.emit(&members, || {
        println!("{} members in {}:\n", members.len(), family.name.cyan());
        for member in &members {
            print_member(member);
        }
    })
}

pub fn member_remove(opts: &Options, identifier: &str, member_id: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let removed = registry.remove_member(&family.id, member_id)?;

    opts.emit(&removed, || {
        println!("{} Removed {}", "✓".green(), removed.full_name().cyan());
    })
}

pub fn member_locate(opts: &Options, member_id: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = registry
        .family_of_member(member_id)?
        .ok_or_else(|| format!("No family has member '{}'", member_id))?;

    opts.emit(&FamilySummary::from(&family), || {
        println!(
            "{} belongs to {} ({})",
            member_name(&family, member_id).cyan(),
            family.name.cyan(),
            family.id.dimmed()
        );
    })
}

// ----- Relations -----

pub fn relate(opts: &Options, identifier: &str, from: &str, to: &str, kind: RelationKind) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let added = registry.add_relation(&family.id, from, to, kind)?;

    opts.emit(&serde_json::json!({ "added": added }), || {
        let verb = match kind {
            RelationKind::ParentChild => "is now parent of",
            RelationKind::Spouse => "is now spouse of",
        };
        if added {
            println!(
                "{} {} {} {}",
                "✓".green(),
                member_name(&family, from).cyan(),
                verb,
                member_name(&family, to).cyan()
            );
        } else {
            println!("{} Relation already recorded", "✓".green());
        }
    })
}

pub fn unrelate(opts: &Options, identifier: &str, a: &str, b: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let removed = registry.remove_relation(&family.id, a, b)?;

    opts.emit(&serde_json::json!({ "removed": removed }), || {
        if removed {
            println!("{} Relation removed", "✓".green());
        } else {
            println!("{} {} and {} were not related", "⚠".yellow(), a, b);
        }
    })
}

// ----- Graph queries -----

pub fn path(opts: &Options, identifier: &str, from: &str, to: &str, algorithm: Algorithm) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let found = GraphService::new()
        .relation_path(&family, from, to, algorithm)?
        .ok_or_else(|| format!("Member '{}' or '{}' not found", from, to))?;

    print_path(opts, &family, &found)
}

pub fn indirect(opts: &Options, identifier: &str, from: &str, to: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let found = GraphService::new()
        .indirect_relations(&family, from, to)?
        .ok_or_else(|| format!("Member '{}' or '{}' not found", from, to))?;

    print_path(opts, &family, &found)
}

fn print_path(opts: &Options, family: &Family, found: &RelationPath) -> Result<()> {
    opts.emit(found, || {
        if found.has_negative_cycle {
            println!("{} Negative cycle detected, no path reported", "⚠".yellow());
            return;
        }
        let Some(distance) = found.distance else {
            println!(
                "No path from {} to {}",
                member_name(family, &found.source).cyan(),
                member_name(family, &found.target).cyan()
            );
            return;
        };

        println!("Path of weight {}:\n", distance.to_string().cyan());
        for relation in &found.relations {
            println!("  {} {}", "→".dimmed(), relation.description);
        }
        if found.relations.is_empty() {
            println!("  {}", "(same member)".dimmed());
        }
    })
}

pub fn tree(opts: &Options, identifier: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let edges = GraphService::new().minimal_connection_tree(&family)?;

    opts.emit(&edges, || {
        let total: i64 = edges.iter().map(|e| e.weight).sum();
        println!("{} edges, total weight {}:\n", edges.len(), total.to_string().cyan());
        for edge in &edges {
            let kind = edge.kind.map_or_else(|| "?".to_string(), |k| k.to_string());
            println!(
                "  {} {} {} {}",
                member_name(&family, &edge.from).cyan(),
                "—".dimmed(),
                member_name(&family, &edge.to).cyan(),
                format!("[{}]", kind).dimmed()
            );
        }
        if edges.len() + 1 < family.member_count() {
            println!("\n  {} family is not fully connected", "⚠".yellow());
        }
    })
}

pub fn subfamilies(opts: &Options, identifier: &str) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let groups = GraphService::new().subfamilies(&family)?;

    opts.emit(&groups, || {
        println!("{} sub-families in {}:\n", groups.len(), family.name.cyan());
        for (n, group) in groups.iter().enumerate() {
            let names: Vec<String> = group
                .iter()
                .map(|m| format!("{} {}", m.first_name, m.last_name))
                .collect();
            println!("  {} {}", format!("{}.", n + 1).dimmed(), names.join(", "));
        }
    })
}

// ----- Lineage -----

#[derive(Debug, Clone, Copy)]
pub enum Lineage {
    Ancestors,
    Descendants,
    Siblings,
    UnclesAunts,
    Cousins,
}

pub fn lineage(
    opts: &Options,
    identifier: &str,
    member_id: &str,
    kind: Lineage,
    depth: Option<usize>,
) -> Result<()> {
    let registry = opts.open_registry()?;
    let family = resolve_family(&registry, identifier)?;
    let service = GraphService::new();

    let found: Option<Vec<KinRecord>> = match kind {
        Lineage::Ancestors => service.ancestors(&family, member_id, depth),
        Lineage::Descendants => service.descendants(&family, member_id, depth),
        Lineage::Siblings => service.siblings(&family, member_id),
        Lineage::UnclesAunts => service.uncles_aunts(&family, member_id),
        Lineage::Cousins => service.cousins(&family, member_id),
    };
    let records = found.ok_or_else(|| format!("Member '{}' not found", member_id))?;

    opts.emit(&records, || {
        if records.is_empty() {
            println!("No {:?} found for {}", kind, member_name(&family, member_id));
            return;
        }
        for record in &records {
            println!(
                "  {} {} {}",
                format!("{:>2}", record.generation).dimmed(),
                record.relationship.kind.to_string().yellow(),
                record.relationship.description
            );
        }
    })
}

/// Start the Kin server.
pub async fn serve(opts: &Options, port: Option<u16>, headless: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let config = CliConfig::load(&root)?;
    let port = port
        .or_else(|| config.as_ref().map(|c| c.port))
        .unwrap_or(kin_server::DEFAULT_PORT);
    let bind_addr = if headless { "0.0.0.0" } else { "127.0.0.1" };

    println!("{}", "Starting Kin server...".cyan());
    let registry = opts.open_registry()?;
    println!("{} Loaded {} families", "✓".green(), registry.store().len());

    let addr = format!("{}:{}", bind_addr, port).parse()?;
    let server = KinServer::new(registry, ServerConfig { addr });

    println!("{} Listening on ws://{}:{}", "✓".green(), bind_addr, port);
    if headless {
        println!("  Headless mode: accepting connections from any host");
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    server.run().await.map_err(|e| e.to_string())?;

    Ok(())
}
