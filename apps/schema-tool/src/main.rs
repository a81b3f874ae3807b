//! CLI tool for compiling field trees into relational schemas.
//!
//! Provides commands for:
//! - Compiling a JSON schema config into the table, enum and relation registry
//! - Printing a per-table summary of a compiled config

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use field_schema_core::fields::SchemaConfig;
use field_schema_core::{compile_schema, CompiledSchema};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a schema config and write the result as JSON
    Compile {
        /// Path to the schema config (JSON)
        config: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the tables a schema config compiles into
    Tables {
        /// Path to the schema config (JSON)
        config: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Settings that take precedence over the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Maximum identifier length of the target database
    #[arg(long)]
    max_identifier_length: Option<usize>,

    /// Compile as a single-locale system
    #[arg(long)]
    no_localization: bool,
}

impl Overrides {
    fn apply(&self, config: &mut SchemaConfig) {
        if let Some(limit) = self.max_identifier_length {
            config.compiler.max_identifier_length = limit;
        }
        if self.no_localization {
            config.compiler.localization = None;
        }
    }
}

fn load_config(path: &Path, overrides: &Overrides) -> Result<SchemaConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let mut config: SchemaConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    overrides.apply(&mut config);
    Ok(config)
}

fn compile(path: &Path, overrides: &Overrides) -> Result<CompiledSchema> {
    let config = load_config(path, overrides)?;
    compile_schema(&config).with_context(|| format!("Failed to compile {}", path.display()))
}

/// One line per table: name, kind, column count, parent.
fn render_tables(schema: &CompiledSchema) -> String {
    let width = schema.tables.keys().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (name, table) in &schema.tables {
        let _ = writeln!(
            out,
            "{:<width$}  {:<14} {:>3} columns  {}",
            name,
            format!("{:?}", table.kind),
            table.columns.len(),
            table.parent.as_deref().unwrap_or("-"),
            width = width
        );
    }
    let _ = writeln!(
        out,
        "{} tables, {} enums, {} columns",
        schema.tables.len(),
        schema.enums.len(),
        schema.column_count()
    );
    out
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compile {
            config,
            output,
            pretty,
            overrides,
        } => {
            let schema = compile(&config, &overrides)?;
            let json = if pretty {
                serde_json::to_string_pretty(&schema)?
            } else {
                serde_json::to_string(&schema)?
            };
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!("Wrote {} tables to {}", schema.tables.len(), path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Tables { config, overrides } => {
            let schema = compile(&config, &overrides)?;
            print!("{}", render_tables(&schema));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    run(cli)
}
