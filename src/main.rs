use std::{process, sync::Arc};

use serde::Serialize;
use serde_json::json;
use todo_cache::{
    application::{
        error::{AppError, TodoError},
        repos::TodoStore,
        todos::{RepositoryOptions, TodoRepository},
    },
    cache::{CacheBackend, CacheClient, CacheConfig, MemoryCache, RedisCache, owner_namespace},
    config::{self, Command, CreateArgs, ListArgs, Settings, UpdateArgs},
    domain::{NewTodo, TodoChanges, TodoFilter, TodoPagination},
    infra::{db::PostgresTodoStore, error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Migrate => run_migrate(&settings).await,
        Command::List(args) => run_list(&settings, args).await,
        Command::Show(args) => {
            let repository = build_repository(&settings).await?;
            let todo = repository
                .find_by_id(args.owner.owner, args.id)
                .await?
                .ok_or(TodoError::NotFound { id: args.id })?;
            print_json(&todo)
        }
        Command::Create(args) => run_create(&settings, args).await,
        Command::Update(args) => run_update(&settings, args).await,
        Command::Remove(args) => {
            let repository = build_repository(&settings).await?;
            repository.remove(args.owner.owner, args.id).await?;
            print_json(&json!({ "removed": args.id }))
        }
        Command::Invalidate(args) => {
            require_shared_cache(&settings.cache)?;
            // Direct cache call: failures are reported instead of swallowed.
            let cache = build_cache(&settings.cache).await?;
            let removed = cache
                .delete_by_prefix(&owner_namespace(args.owner))
                .await
                .map_err(InfraError::from)?;
            print_json(&json!({ "owner": args.owner, "removed": removed }))
        }
    }
}

async fn run_migrate(settings: &Settings) -> Result<(), AppError> {
    let pool = connect_pool(settings).await?;
    PostgresTodoStore::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!(target = "todo_cache::migrate", "Database migrations applied");
    Ok(())
}

async fn run_list(settings: &Settings, args: ListArgs) -> Result<(), AppError> {
    let repository = build_repository(settings).await?;
    let filter = TodoFilter {
        completed: args.completed,
        title: args.title,
    };
    let pagination = TodoPagination::new(args.page, args.limit)
        .map_err(|err| AppError::validation(err.to_string()))?;

    let page = repository
        .find_all(args.owner.owner, Some(&filter), Some(&pagination))
        .await?;
    print_json(&page)
}

async fn run_create(settings: &Settings, args: CreateArgs) -> Result<(), AppError> {
    let repository = build_repository(settings).await?;
    let mut todo = NewTodo::new(args.owner.owner, args.title).with_completed(args.completed);
    if let Some(description) = args.description {
        todo = todo.with_description(description);
    }

    let created = repository.create(todo).await?;
    print_json(&created)
}

async fn run_update(settings: &Settings, args: UpdateArgs) -> Result<(), AppError> {
    let changes = TodoChanges {
        title: args.title,
        description: args.description,
        completed: args.completed,
    };
    if changes.is_empty() {
        return Err(AppError::validation(
            "update requires at least one of --title, --description or --completed",
        ));
    }

    let repository = build_repository(settings).await?;
    let updated = repository
        .update(args.todo.owner.owner, args.todo.id, changes)
        .await?;
    print_json(&updated)
}

async fn connect_pool(settings: &Settings) -> Result<sqlx::PgPool, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database.url is required for this command"))?;

    let pool = PostgresTodoStore::connect(
        url,
        settings.database.max_connections.get(),
        settings.database.timeout,
    )
    .await
    .map_err(InfraError::from)?;
    Ok(pool)
}

async fn build_repository(settings: &Settings) -> Result<TodoRepository, AppError> {
    let pool = connect_pool(settings).await?;
    let store: Arc<dyn TodoStore> = Arc::new(PostgresTodoStore::new(pool));
    let cache = build_cache(&settings.cache).await?;

    Ok(TodoRepository::with_options(
        store,
        cache,
        repository_options(settings),
    ))
}

async fn build_cache(config: &CacheConfig) -> Result<Arc<dyn CacheClient>, AppError> {
    let cache: Arc<dyn CacheClient> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::from_config(config)),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url is required"))?;
            Arc::new(RedisCache::connect(url).await.map_err(InfraError::from)?)
        }
    };
    Ok(cache)
}

/// Standalone invalidation only reaches a cache shared across processes.
fn require_shared_cache(config: &CacheConfig) -> Result<(), InfraError> {
    match config.backend {
        CacheBackend::Redis => Ok(()),
        CacheBackend::Memory => Err(InfraError::configuration(
            "invalidate needs a shared cache backend (redis)",
        )),
    }
}

fn repository_options(settings: &Settings) -> RepositoryOptions {
    RepositoryOptions::from_config(&settings.cache, settings.database.timeout)
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidate_rejects_the_in_process_backend() {
        let memory = CacheConfig::default();
        assert!(matches!(
            require_shared_cache(&memory),
            Err(InfraError::Configuration { .. })
        ));

        let redis = CacheConfig {
            backend: CacheBackend::Redis,
            redis_url: Some("redis://127.0.0.1/".to_string()),
            ..CacheConfig::default()
        };
        assert!(require_shared_cache(&redis).is_ok());
    }
}
