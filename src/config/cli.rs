use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the todo-cache binary.
#[derive(Debug, Parser)]
#[command(
    name = "todo-cache",
    version,
    about = "Operate the todo repository and its list cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "TODO_CACHE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// List an owner's todos through the cache.
    List(ListArgs),
    /// Show a single todo.
    Show(TodoRef),
    /// Create a todo and invalidate the owner's cached lists.
    Create(CreateArgs),
    /// Update a todo and invalidate the owner's cached lists.
    Update(UpdateArgs),
    /// Remove a todo and invalidate the owner's cached lists.
    Remove(TodoRef),
    /// Drop every cached list of an owner.
    Invalidate(OwnerArg),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL", global = true)]
    pub redis_url: Option<String>,

    /// Override the cache backend (memory|redis).
    #[arg(long = "cache-backend", value_name = "BACKEND", global = true)]
    pub cache_backend: Option<String>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS", global = true)]
    pub cache_ttl_seconds: Option<u64>,

    /// Toggle the list cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct OwnerArg {
    /// Owner whose todos are addressed.
    #[arg(long, value_name = "UUID")]
    pub owner: Uuid,
}

#[derive(Debug, Args, Clone)]
pub struct TodoRef {
    #[command(flatten)]
    pub owner: OwnerArg,

    /// Todo identifier.
    #[arg(long, value_name = "UUID")]
    pub id: Uuid,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub owner: OwnerArg,

    /// Only todos with this completion state.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub completed: Option<bool>,

    /// Only todos with exactly this title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// One-based page number.
    #[arg(long, value_name = "PAGE")]
    pub page: Option<u32>,

    /// Page size.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub owner: OwnerArg,

    #[arg(long, value_name = "TITLE")]
    pub title: String,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Create the todo already completed.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub completed: bool,
}

#[derive(Debug, Args, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub todo: TodoRef,

    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub completed: Option<bool>,
}
