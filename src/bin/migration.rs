//! Standalone migration runner: `migration [up|down|fresh|status]`.

use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use wims_api as api;
use wims_api::migrator::Migrator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg).await?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    match command.as_str() {
        "up" => {
            info!("Applying pending migrations");
            Migrator::up(&db, None).await?;
        }
        "down" => {
            info!("Rolling back the last migration");
            Migrator::down(&db, Some(1)).await?;
        }
        "fresh" => {
            info!("Dropping everything and re-applying all migrations");
            Migrator::fresh(&db).await?;
        }
        "status" => {
            Migrator::status(&db).await?;
        }
        other => {
            error!("Unknown command {:?}; expected up, down, fresh or status", other);
            std::process::exit(2);
        }
    }

    info!("Done");
    Ok(())
}
