//! CMS identity bootstrap
//!
//! Prepares the user database: runs migrations and seeds the configured
//! administrator account. Reads configuration from a TOML file
//! (~/.config/cms-identity/config.toml, or the path in `CMS_CONFIG`).

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bolt_identity::config::{AppConfig, LoggingSettings};
use bolt_identity::domain::{CreateUserDto, GetUserDto, UserRepositoryInterface};
use bolt_identity::infrastructure::database::migrator::Migrator;
use bolt_identity::{
    create_event_bus, default_config_path, init_database, DatabaseConfig, Event, PostEvent,
    SeaOrmUserRepository, UserService,
};

fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("CMS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let (app_cfg, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_logging(&app_cfg.logging);
    match load_error {
        None => info!(path = %config_path.display(), "Configuration loaded"),
        Some(e) => warn!("Failed to load config: {}. Using defaults.", e),
    }

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig::from(&app_cfg.database);
    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // ── Services ───────────────────────────────────────────────
    let event_bus = create_event_bus();
    event_bus.subscribe(PostEvent::POST_DATA, |event: &Event| {
        if let Event::PostSubmitted(post) = event {
            info!(fields = post.form_data().len(), "Post data submitted");
        }
    });

    let repo = Arc::new(SeaOrmUserRepository::new(db.clone()));
    let users = UserService::new(repo.clone(), event_bus, app_cfg.security.bcrypt_cost);

    create_default_admin(&users, repo.as_ref(), &app_cfg).await?;

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    }
    Ok(())
}

/// Create the configured admin account if no users exist
async fn create_default_admin(
    users: &UserService<SeaOrmUserRepository>,
    repo: &SeaOrmUserRepository,
    app_cfg: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(admin) = app_cfg.security.admin.clone() else {
        return Ok(());
    };

    let existing = repo.list_users(GetUserDto::default()).await?;
    if existing.total > 0 {
        return Ok(());
    }

    info!("Creating default admin user...");
    let user = users
        .register(CreateUserDto {
            display_name: admin.display_name,
            username: admin.username,
            email: admin.email,
            plain_password: admin.password,
            roles: vec!["ROLE_ADMIN".to_string()],
            locale: None,
        })
        .await?;

    info!(username = %user.username(), "Default admin created");
    info!("Please change the admin password immediately!");
    Ok(())
}
