use anyhow::Context;

use crate::config::{AppConfig, StorageBackend};
use crate::database::DatabaseManager;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    if config.storage.backend != StorageBackend::Postgres {
        anyhow::bail!("migrate requires ASM_STORAGE=postgres");
    }

    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    db.migrate().await.context("failed to apply migrations")?;
    db.close().await;

    println!("Migrations applied");
    Ok(())
}
