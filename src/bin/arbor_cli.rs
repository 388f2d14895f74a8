//! Arbor CLI - Command-line tools for structure documents
//!
//! Validate, inspect and convert the JSON documents written by
//! Arbor Studio's export and auto-save.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use std::path::{Path, PathBuf};

use arbor_studio::config::AppConfig;
use arbor_studio::document::{Document, DocumentStamp};
use arbor_studio::editor::{ConnectionGraph, EditorState, NodeTree};
use arbor_studio::export::{generate_code, render_outline, StructureStats};
use arbor_studio::storage::{self, Storage};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "+ ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");
static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
static INFO: Emoji<'_, '_> = Emoji("ℹ ", "i ");

#[derive(Parser)]
#[command(name = "arbor-cli")]
#[command(author = "e421")]
#[command(version)]
#[command(about = "Arbor CLI - Inspect and convert Arbor Studio structure documents")]
#[command(long_about = r#"
Arbor CLI works on the JSON documents produced by Arbor Studio.

Examples:
  arbor-cli validate shop.json            # Check a document loads
  arbor-cli tree shop.json                # Print the node outline
  arbor-cli stats shop.json               # Count nodes by type
  arbor-cli export-code shop.json -o shop.js
  arbor-cli new "Shop" -o shop.json       # Write a starter document
  arbor-cli info                          # Show config and auto-save paths
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that a document parses and satisfies the model invariants
    Validate {
        /// Document to check
        file: PathBuf,
    },

    /// Print the node hierarchy
    Tree {
        /// Document to read (default: the auto-save)
        file: Option<PathBuf>,
    },

    /// Show node and connection counts
    Stats {
        /// Document to read (default: the auto-save)
        file: Option<PathBuf>,
    },

    /// Generate a code skeleton from a document
    ExportCode {
        /// Document to read
        file: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a starter document with an empty root
    New {
        /// Root node name
        #[arg(default_value = "Application")]
        name: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show config and auto-save locations
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Tree { file } => cmd_tree(file.as_deref()),
        Commands::Stats { file } => cmd_stats(file.as_deref()),
        Commands::ExportCode { file, output } => cmd_export_code(&file, output.as_deref()),
        Commands::New { name, output, force } => cmd_new(&name, &output, force),
        Commands::Info => cmd_info(),
    }
}

/// Load a document and rebuild the model
fn load_model(file: Option<&Path>) -> Result<(NodeTree, ConnectionGraph)> {
    let document = match file {
        Some(path) => storage::read_document(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let storage = Storage::new(AppConfig::load().data_dir());
            match storage.load_autosave().context("Failed to read the auto-save")? {
                Some(document) => document,
                None => bail!("No file given and no auto-save at {}", storage.autosave_path().display()),
            }
        }
    };
    document.into_model().context("Document violates the structure rules")
}

fn cmd_validate(file: &Path) -> Result<()> {
    match load_model(Some(file)) {
        Ok((tree, graph)) => {
            println!(
                "{}{} is valid: {} nodes, {} connections",
                CHECK,
                style(file.display()).bold(),
                tree.node_count(),
                graph.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}{} is invalid", CROSS, style(file.display()).bold());
            Err(e)
        }
    }
}

fn cmd_tree(file: Option<&Path>) -> Result<()> {
    let (tree, graph) = load_model(file)?;
    print!("{}", render_outline(&tree, &graph));
    Ok(())
}

fn cmd_stats(file: Option<&Path>) -> Result<()> {
    let (tree, graph) = load_model(file)?;
    let stats = StructureStats::collect(&tree, &graph);

    println!("{}", style(&tree.root().name).bold().underlined());
    println!();
    println!("  Nodes:        {}", style(stats.nodes).cyan());
    println!("    domain:     {}", stats.domains);
    println!("    process:    {}", stats.processes);
    println!("    logic:      {}", stats.logic);
    println!("    code:       {} ({} with code)", stats.code, stats.implemented);
    println!("  Connections:  {}", style(stats.connections).cyan());
    println!("  Depth:        {}", stats.depth);
    Ok(())
}

fn cmd_export_code(file: &Path, output: Option<&Path>) -> Result<()> {
    let (tree, graph) = load_model(Some(file))?;
    let code = generate_code(&tree, &graph);
    match output {
        Some(path) => {
            std::fs::write(path, code).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}Code skeleton {}{}", CHECK, ARROW, style(path.display()).green());
        }
        None => print!("{}", code),
    }
    Ok(())
}

fn cmd_new(name: &str, output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    let name = name.trim();
    if name.is_empty() {
        bail!("The root name cannot be empty");
    }
    let document = EditorState::new(name).export_document(DocumentStamp::Exported);
    storage::write_document(output, &document).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{}Created {} {}{}", CHECK, style(name).bold(), ARROW, output.display());
    Ok(())
}

fn cmd_info() -> Result<()> {
    let config = AppConfig::load();
    let storage = Storage::new(config.data_dir());
    let autosave = storage.autosave_path();

    println!("{}", style("Arbor Studio").bold().underlined());
    println!();
    println!("  {}Config:    {}", INFO, AppConfig::config_path().display());
    println!("  {}Data dir:  {}", INFO, storage.dir().display());
    match storage.load_autosave() {
        Ok(Some(document)) => println!(
            "  {}Auto-save: {} ({}, saved {})",
            CHECK,
            autosave.display(),
            style(&document.root_node.name).bold(),
            format_timestamp(&document)
        ),
        Ok(None) => println!("  {}Auto-save: {}", style("○ ").dim(), style("none").dim()),
        Err(e) => println!("  {}Auto-save: {} ({})", CROSS, autosave.display(), style(e).red()),
    }
    let key_state = if config.ai.api_key().is_some() {
        style("set").green()
    } else {
        style("not set").yellow()
    };
    println!("  {}AI key:    ${} {}", INFO, config.ai.api_key_env, key_state);
    Ok(())
}

fn format_timestamp(document: &Document) -> String {
    document
        .timestamp()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
