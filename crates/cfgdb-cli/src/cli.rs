use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cfgdb",
    about = "Inspect and edit schema-driven configuration databases",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (TOML); environment variables still apply on top
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new database including the given schema files
    Create(CreateArgs),
    /// List the includes of a data file
    Includes(IncludesArgs),
    /// Add an include to a data file and commit
    AddInclude(IncludeEditArgs),
    /// Remove an include from a data file and commit
    RemoveInclude(IncludeEditArgs),
    /// List the objects of a class
    Objects(ObjectsArgs),
    /// Show one object
    Show(ObjectArgs),
    /// Create an object and commit
    New(NewArgs),
    /// Destroy an object and commit
    Rm(RmArgs),
    /// Test whether an object and what it references exist
    Test(TestArgs),
    /// Validate a database without writing anything
    Check(CheckArgs),
    /// List the classes of a schema or database
    Classes(ClassesArgs),
    /// Group the classes of a schema by inheritance
    Domains(DomainsArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    /// Data file to create
    pub db: PathBuf,
    /// Schema file to include (repeatable)
    #[arg(short, long = "include", required = true)]
    pub includes: Vec<String>,
    /// Replace the file if it exists
    #[arg(long)]
    pub force: bool,
    #[arg(short, long, default_value = "created by cfgdb")]
    pub message: String,
}

#[derive(Args)]
pub struct IncludesArgs {
    /// Database spec: `jsonfile:<file>` or a data file path
    pub spec: String,
    /// Loaded data file to list instead of the database file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct IncludeEditArgs {
    pub spec: String,
    /// Include path as written in the data file
    pub path: String,
    /// Loaded data file to edit instead of the database file
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct ObjectsArgs {
    pub spec: String,
    pub class: String,
}

#[derive(Args)]
pub struct ObjectArgs {
    pub spec: String,
    pub class: String,
    pub id: String,
}

#[derive(Args)]
pub struct NewArgs {
    pub spec: String,
    pub class: String,
    pub id: String,
    /// Field assignment `name=value`; the value is read as JSON, falling
    /// back to a plain string (repeatable)
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
    /// Create the object in this loaded data file
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    pub spec: String,
    pub class: String,
    pub id: String,
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct TestArgs {
    pub spec: String,
    pub class: String,
    pub id: String,
    /// Relation hops to follow
    #[arg(short, long, default_value = "0")]
    pub depth: usize,
}

#[derive(Args)]
pub struct CheckArgs {
    pub spec: String,
}

#[derive(Args)]
pub struct ClassesArgs {
    /// Schema file, data file or database spec
    pub source: String,
    /// Also list attributes and relations, inherited ones included
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Args)]
pub struct DomainsArgs {
    /// Schema file
    pub schema: PathBuf,
}
