use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use tracing::info;

use crate::entity::*;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    create_schema(&db).await?;

    Ok(db)
}

/// Create every table that does not exist yet, parents before children.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    macro_rules! create {
        ($($entity:path),+ $(,)?) => {
            $(
                let mut stmt = schema.create_table_from_entity($entity);
                stmt.if_not_exists();
                db.execute_raw(backend.build(&stmt)).await?;
            )+
        };
    }

    create!(
        role::Entity,
        role_permission::Entity,
        user::Entity,
        agency::Entity,
        challenge::Entity,
        challenge_owner::Entity,
        federal_partner::Entity,
        non_federal_partner::Entity,
        phase::Entity,
        timeline_event::Entity,
        submission::Entity,
        document::Entity,
        submission_export::Entity,
        security_log::Entity,
        certification_log::Entity,
    );

    info!("Database schema is up to date");
    Ok(())
}
