use crate::entities;
use crate::errors::ServiceError;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool to the database.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let mut opts = ConnectOptions::new(database_url.to_string());
    opts.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let pool = Database::connect(opts).await?;
    info!("Database connection established");
    Ok(pool)
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), ServiceError>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates the schema from the entity definitions.
///
/// Tables are created in dependency order so that referencing tables come
/// after the tables they point at.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), ServiceError> {
    create_table(db, entities::customer::Entity).await?;
    create_table(db, entities::category::Entity).await?;
    create_table(db, entities::product::Entity).await?;
    create_table(db, entities::product_image::Entity).await?;
    create_table(db, entities::order::Entity).await?;
    create_table(db, entities::order_item::Entity).await?;
    create_table(db, entities::cart::Entity).await?;
    create_table(db, entities::cart_item::Entity).await?;
    create_table(db, entities::chat_message::Entity).await?;
    info!("Database schema created");
    Ok(())
}
