//! Kin CLI - Command-line interface for Kin
//!
//! This is the main entry point for users interacting with Kin.
//! It provides commands for managing families, querying relationships,
//! and serving the family graph.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use kin_core::{Gender, NewMember, RelationKind};
use kin_graph::Algorithm;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{Lineage, Options};

#[derive(Parser)]
#[command(name = "kin")]
#[command(author = "Kin Contributors")]
#[command(version)]
#[command(about = "Family relationship graphs from the command line", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Family database directory (overrides .kin/config.json)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Kin in the current directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Port written to the config for `kin serve`
        #[arg(short, long, default_value_t = kin_server::DEFAULT_PORT)]
        port: u16,
    },

    /// Create, list, show or delete families
    #[command(subcommand)]
    Family(FamilyCommand),

    /// Add, list or remove members
    #[command(subcommand)]
    Member(MemberCommand),

    /// Record or remove relations between members
    #[command(subcommand)]
    Relate(RelateCommand),

    /// Find the lightest relation path between two members
    Path {
        family: String,
        from: String,
        to: String,

        /// dijkstra or bellman-ford
        #[arg(short, long, default_value = "dijkstra")]
        algorithm: Algorithm,
    },

    /// Find a relation path by edge relaxation, reporting negative cycles
    Indirect {
        family: String,
        from: String,
        to: String,
    },

    /// Show the minimal tree connecting the family
    Tree { family: String },

    /// Split the family into connected sub-families
    Subfamilies { family: String },

    /// List a member's ancestors
    Ancestors {
        family: String,
        member: String,

        /// Generations to walk (unbounded when omitted)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// List a member's descendants
    Descendants {
        family: String,
        member: String,

        /// Generations to walk (unbounded when omitted)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// List a member's siblings
    Siblings { family: String, member: String },

    /// List a member's uncles and aunts
    Uncles { family: String, member: String },

    /// List a member's cousins
    Cousins { family: String, member: String },

    /// Start the Kin server
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Headless mode: bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,
    },
}

#[derive(Subcommand)]
enum FamilyCommand {
    /// Create a family
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// List families
    List,
    /// Show a family and its members
    Show { family: String },
    /// Delete a family
    Delete { family: String },
}

#[derive(Subcommand)]
enum MemberCommand {
    /// Add a member; a family named "<last name> family" is created if none matches
    Add {
        family: String,
        first_name: String,
        last_name: String,

        /// Birth date (YYYY-MM-DD)
        #[arg(short, long)]
        born: NaiveDate,

        /// male or female
        #[arg(short, long)]
        gender: Gender,

        /// Death date (YYYY-MM-DD)
        #[arg(long)]
        died: Option<NaiveDate>,
    },
    /// List members of a family
    List { family: String },
    /// Remove a member and all of its relations
    Remove { family: String, member: String },
    /// Show which family a member id belongs to
    Locate { member: String },
}

#[derive(Subcommand)]
enum RelateCommand {
    /// Record PARENT as a parent of CHILD
    Parent {
        family: String,
        parent: String,
        child: String,
    },
    /// Marry two members
    Spouse { family: String, a: String, b: String },
    /// Remove any direct relation between two members
    Remove { family: String, a: String, b: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let opts = Options {
        data: cli.data,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init { path, port } => commands::init(&path, port),
        Commands::Family(cmd) => match cmd {
            FamilyCommand::Create { name, description } => {
                commands::family_create(&opts, &name, description)
            }
            FamilyCommand::List => commands::family_list(&opts),
            FamilyCommand::Show { family } => commands::family_show(&opts, &family),
            FamilyCommand::Delete { family } => commands::family_delete(&opts, &family),
        },
        Commands::Member(cmd) => match cmd {
            MemberCommand::Add {
                family,
                first_name,
                last_name,
                born,
                gender,
                died,
            } => {
                let mut data = NewMember::new(first_name, last_name, born, gender);
                data.death_date = died;
                commands::member_add(&opts, &family, data)
            }
            MemberCommand::List { family } => commands::member_list(&opts, &family),
            MemberCommand::Remove { family, member } => {
                commands::member_remove(&opts, &family, &member)
            }
            MemberCommand::Locate { member } => commands::member_locate(&opts, &member),
        },
        Commands::Relate(cmd) => match cmd {
            RelateCommand::Parent {
                family,
                parent,
                child,
            } => commands::relate(&opts, &family, &parent, &child, RelationKind::ParentChild),
            RelateCommand::Spouse { family, a, b } => {
                commands::relate(&opts, &family, &a, &b, RelationKind::Spouse)
            }
            RelateCommand::Remove { family, a, b } => commands::unrelate(&opts, &family, &a, &b),
        },
        Commands::Path {
            family,
            from,
            to,
            algorithm,
        } => commands::path(&opts, &family, &from, &to, algorithm),
        Commands::Indirect { family, from, to } => commands::indirect(&opts, &family, &from, &to),
        Commands::Tree { family } => commands::tree(&opts, &family),
        Commands::Subfamilies { family } => commands::subfamilies(&opts, &family),
        Commands::Ancestors {
            family,
            member,
            depth,
        } => commands::lineage(&opts, &family, &member, Lineage::Ancestors, depth),
        Commands::Descendants {
            family,
            member,
            depth,
        } => commands::lineage(&opts, &family, &member, Lineage::Descendants, depth),
        Commands::Siblings { family, member } => {
            commands::lineage(&opts, &family, &member, Lineage::Siblings, None)
        }
        Commands::Uncles { family, member } => {
            commands::lineage(&opts, &family, &member, Lineage::UnclesAunts, None)
        }
        Commands::Cousins { family, member } => {
            commands::lineage(&opts, &family, &member, Lineage::Cousins, None)
        }
        Commands::Serve { port, headless } => commands::serve(&opts, port, headless).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
