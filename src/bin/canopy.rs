//! Canopy CLI.
//!
//! Command-line access to an owner-scoped content-store filesystem:
//! initialize a namespace, import/export local trees, list and inspect
//! nodes, and verify stored content against its recorded checksums.

use anyhow::{bail, Context};
use canopy::config::CanopyConfig;
use canopy::error::FsError;
use canopy::fs::node::{Node, NodeKind, NodeOrder};
use canopy::fs::Filesystem;
use canopy::logging;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Canopy - hierarchical content-store filesystem
#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Hierarchical content-store filesystem with pluggable storage backends")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Owner whose namespace commands operate on
    #[arg(long, default_value = "default")]
    owner: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the owner's root directory
    Init {
        /// Root directory name
        #[arg(long, default_value = "root")]
        name: String,
    },
    /// Import a local file or directory tree
    Import {
        /// Local source path
        local: PathBuf,
        /// Target directory path inside the tree (default: root)
        #[arg(default_value = "/")]
        dest: String,
    },
    /// Export a subtree to the local filesystem
    Export {
        /// Source path inside the tree
        source: String,
        /// Local destination path
        local: PathBuf,
    },
    /// List a directory
    Ls {
        /// Path inside the tree
        #[arg(default_value = "/")]
        path: String,
        /// Sort order (name, name-fold, size, modified)
        #[arg(long, default_value = "name")]
        sort: String,
        /// Emit the full structured listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one node in detail
    Info {
        /// Path inside the tree
        path: String,
    },
    /// Delete a node (recursively for directories)
    Rm {
        /// Path inside the tree
        path: String,
    },
    /// Re-read content and check digests across a subtree
    Verify {
        /// Path inside the tree (default: root)
        #[arg(default_value = "/")]
        path: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CanopyConfig::load(cli.config.as_deref())?;
    logging::init_logging(Some(&config.logging))?;
    let fs = Filesystem::from_config(&config)?;

    match cli.command {
        Commands::Init { name } => {
            let root = fs.create_root(&name, &cli.owner)?;
            println!("created root {} ({})", root.name, root.id);
        }
        Commands::Import { local, dest } => {
            let target = resolve(&fs, &cli.owner, &dest)?;
            fs.import_files(&local, &target.id)?;
            println!("imported {} into {}", local.display(), dest);
        }
        Commands::Export { source, local } => {
            let node = resolve(&fs, &cli.owner, &source)?;
            fs.export_files(&node.id, &local)?;
            println!("exported {} to {}", source, local.display());
        }
        Commands::Ls { path, sort, json } => {
            let node = resolve(&fs, &cli.owner, &path)?;
            if json {
                let listing = fs.listing(&node.id)?;
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print_children(&fs, &node, parse_sort(&sort)?)?;
            }
        }
        Commands::Info { path } => {
            let node = resolve(&fs, &cli.owner, &path)?;
            print_info(&node);
        }
        Commands::Rm { path } => {
            let node = resolve(&fs, &cli.owner, &path)?;
            fs.delete(&node.id)?;
            println!("deleted {}", path);
        }
        Commands::Verify { path } => {
            let node = resolve(&fs, &cli.owner, &path)?;
            let mut report = VerifyReport::default();
            verify_subtree(&fs, &node, &mut report)?;
            println!(
                "{}: {} ok, {} corrupt",
                "verify".bold(),
                report.ok,
                report.corrupt.len()
            );
            for (name, error) in &report.corrupt {
                eprintln!("  {}: {}", name.red(), error);
            }
            if !report.corrupt.is_empty() {
                bail!("{} corrupt file(s)", report.corrupt.len());
            }
        }
    }
    Ok(())
}

fn resolve(fs: &Filesystem, owner: &str, path: &str) -> anyhow::Result<Arc<Node>> {
    let root = fs
        .root(owner)?
        .with_context(|| format!("owner {:?} has no root; run canopy init", owner))?;
    fs.child_by_path(&root.id, path)?
        .with_context(|| format!("no node at {:?}", path))
}

fn parse_sort(sort: &str) -> anyhow::Result<NodeOrder> {
    Ok(match sort {
        "name" => NodeOrder::Name,
        "name-fold" => NodeOrder::NameFold,
        "size" => NodeOrder::Size,
        "modified" => NodeOrder::Modified,
        other => bail!("unknown sort order {:?}", other),
    })
}

fn print_children(fs: &Filesystem, node: &Arc<Node>, order: NodeOrder) -> anyhow::Result<()> {
    println!("{}", format!("{} ({})", node.name, node.id).bold().underline());
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Kind", "Size", "Type", "Modified"]);
    for child in fs.children_sorted(&node.id, order)? {
        let (kind, content_type) = match &child.kind {
            NodeKind::Directory(_) => ("dir", String::new()),
            NodeKind::File(f) => ("file", f.content_type.clone()),
        };
        table.add_row(vec![
            child.name.clone(),
            kind.to_string(),
            child.size.to_string(),
            content_type,
            child.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn print_info(node: &Arc<Node>) {
    println!("{}", node.name.bold());
    println!("  id:       {}", node.id);
    println!("  owner:    {}", node.owner);
    println!("  size:     {}", node.size);
    println!("  modified: {}", node.modified.to_rfc3339());
    match &node.kind {
        NodeKind::File(f) => {
            println!("  type:     {}", f.content_type);
            println!("  checksum: {}", f.md5);
            println!("  store:    {}", f.store);
        }
        NodeKind::Directory(d) => {
            println!("  files:    {} here, {} total", d.files_here, d.files_total);
            println!("  dirs:     {} here, {} total", d.dirs_here, d.dirs_total);
        }
    }
}

#[derive(Default)]
struct VerifyReport {
    ok: u64,
    corrupt: Vec<(String, String)>,
}

fn verify_subtree(fs: &Filesystem, node: &Arc<Node>, report: &mut VerifyReport) -> anyhow::Result<()> {
    match &node.kind {
        NodeKind::File(_) => match fs.read_content(&node.id, io::sink()) {
            Ok(_) => report.ok += 1,
            Err(e @ FsError::ChecksumMismatch { .. }) => {
                report.corrupt.push((node.name.clone(), e.to_string()));
            }
            Err(e) => return Err(e.into()),
        },
        NodeKind::Directory(_) => {
            for child in fs.children(&node.id)? {
                verify_subtree(fs, &child, report)?;
            }
        }
    }
    Ok(())
}
