use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use crate::error::ApiResult;

pub async fn connect_and_migrate(database_url: &str) -> ApiResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;

    if database_url.starts_with("sqlite:") {
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string()))
                .await?;
        }
    }

    Migrator::up(&db, None).await?;
    Ok(db)
}
