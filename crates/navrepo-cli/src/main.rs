//! navrepo inspection CLI.
//!
//! Provides the `navrepo` binary for checking entity metadata schemas
//! without a store: `paths` prints the load-paths a full-depth read would
//! eager-load, `keys` prints an entity's primary key fields in ordinal order.
//!
//! Uses the same `NavigationPathDiscoverer` and `RepositoryConfig` as the
//! repositories, so `NAVREPO_*` environment overrides apply here too.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use navrepo_core::{EntityMetadataProvider, EntityType, KeyFields, MetadataRegistry, NavigationPath};
use navrepo_query::{NavigationPathDiscoverer, RepositoryConfig};

/// Inspect navrepo entity metadata.
#[derive(Parser)]
#[command(name = "navrepo", about = "Inspect navrepo entity metadata")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the load-paths discovered for an entity type.
    Paths {
        /// Path to the JSON metadata schema.
        #[arg(short, long)]
        schema: PathBuf,

        /// Root entity type.
        #[arg(short, long)]
        root: String,

        /// Maximum path length (default: NAVREPO_MAX_DEPTH or 100).
        #[arg(long)]
        max_depth: Option<usize>,

        /// Ignore marker; repeat for several (default: NAVREPO_IGNORE_MARKERS).
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },

    /// Print the primary key fields of an entity type.
    Keys {
        /// Path to the JSON metadata schema.
        #[arg(short, long)]
        schema: PathBuf,

        /// Entity type to describe.
        #[arg(short, long)]
        entity: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Paths {
            schema,
            root,
            max_depth,
            ignore,
        } => run_paths(&schema, &root, max_depth, ignore),
        Commands::Keys { schema, entity } => run_keys(&schema, &entity),
    };
    process::exit(exit_code);
}

/// Execute the paths subcommand.
///
/// Returns exit code: 0 = success, 1 = unknown type or bad configuration,
/// 3 = schema could not be read or parsed.
fn run_paths(schema: &Path, root: &str, max_depth: Option<usize>, ignore: Vec<String>) -> i32 {
    let config = match RepositoryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let registry = match load_registry(schema) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let max_depth = max_depth.unwrap_or(config.max_depth);
    let markers = if ignore.is_empty() {
        config.ignore_markers
    } else {
        ignore
    };

    match discover(&registry, root, max_depth, &markers) {
        Ok(paths) => {
            tracing::debug!(root, max_depth, paths = paths.len(), "discovery finished");
            print_json(&paths);
            0
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            1
        }
    }
}

/// Execute the keys subcommand. Exit codes as for `paths`.
fn run_keys(schema: &Path, entity: &str) -> i32 {
    let registry = match load_registry(schema) {
        Ok(r) => r,
        Err(code) => return code,
    };
    match key_fields(&registry, entity) {
        Ok(keys) => {
            print_json(&keys);
            0
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            1
        }
    }
}

fn load_registry(schema: &Path) -> Result<MetadataRegistry, i32> {
    let text = std::fs::read_to_string(schema).map_err(|e| {
        eprintln!("Error: failed to read schema '{}': {}", schema.display(), e);
        3
    })?;
    MetadataRegistry::from_json(&text).map_err(|e| {
        eprintln!("Error: {}", e);
        3
    })
}

fn discover(
    registry: &MetadataRegistry,
    root: &str,
    max_depth: usize,
    markers: &[String],
) -> Result<Vec<NavigationPath>, String> {
    let root = EntityType::new(root);
    if registry.describe(&root).is_none() {
        return Err(format!("unknown entity type '{}'", root));
    }
    Ok(NavigationPathDiscoverer::new(registry)
        .discover(&root, max_depth, markers)
        .into_iter()
        .collect())
}

fn key_fields(registry: &MetadataRegistry, entity: &str) -> Result<KeyFields, String> {
    let entity_type = EntityType::new(entity);
    let descriptor = registry
        .describe(&entity_type)
        .ok_or_else(|| format!("unknown entity type '{}'", entity))?;
    Ok(descriptor.ordered_keys())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}
