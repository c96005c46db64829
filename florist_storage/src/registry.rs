use async_trait::async_trait;
use florist_core::{UserId, UserProfile, UserRegistry};
use florist_entities::users;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, Schema, Set,
};
use tracing::{debug, info};

const MAX_NAME_CHARS: usize = 255;

fn is_table_already_exists_error(err: &DbErr) -> bool {
    err.to_string().contains("table") && err.to_string().contains("already exists")
}

fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

fn row_id(user: UserId) -> anyhow::Result<i64> {
    i64::try_from(user.0).map_err(|_| anyhow::anyhow!("User id {user} does not fit in a database row"))
}

fn clip_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| n.chars().take(MAX_NAME_CHARS).collect())
}

/// Customer registry in a `users` table.
pub struct SqliteUserRegistry {
    db: DatabaseConnection,
}

impl SqliteUserRegistry {
    /// Connect and create the `users` table if it does not exist yet.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database: {database_url}");
        let db = Database::connect(database_url).await?;

        let backend = db.get_database_backend();
        let stmt = Schema::new(backend).create_table_from_entity(users::Entity);
        match db.execute_unprepared(&backend.build(&stmt).to_string()).await {
            Ok(_) => {}
            Err(e) if is_table_already_exists_error(&e) => {
                debug!("Table users already exists, skipping creation");
            }
            Err(e) => return Err(e.into()),
        }

        info!("User registry initialized");
        Ok(Self { db })
    }

    pub async fn find(&self, user: UserId) -> anyhow::Result<Option<users::Model>> {
        Ok(users::Entity::find_by_id(row_id(user)?).one(&self.db).await?)
    }

    /// Messages counted for `user`, zero when unknown.
    pub async fn message_count(&self, user: UserId) -> anyhow::Result<i64> {
        Ok(self.find(user).await?.map_or(0, |m| m.message_count))
    }

    pub async fn user_count(&self) -> anyhow::Result<u64> {
        Ok(users::Entity::find().count(&self.db).await?)
    }

    async fn increment(&self, existing: users::Model, name: Option<String>) -> anyhow::Result<()> {
        let count = existing.message_count + 1;
        users::Entity::update(users::ActiveModel {
            user_id: Set(existing.user_id),
            user_name: Set(name.or(existing.user_name)),
            message_count: Set(count),
            created_at: Set(existing.created_at),
            updated_at: Set(chrono::Utc::now().naive_utc()),
        })
        .exec(&self.db)
        .await?;

        debug!("User {} message count is now {count}", existing.user_id);
        Ok(())
    }
}

#[async_trait]
impl UserRegistry for SqliteUserRegistry {
    async fn touch(&self, profile: &UserProfile) -> anyhow::Result<()> {
        let id = row_id(profile.id)?;
        let name = clip_name(profile.display_name.as_deref());

        if let Some(existing) = users::Entity::find_by_id(id).one(&self.db).await? {
            return self.increment(existing, name).await;
        }

        let now = chrono::Utc::now().naive_utc();
        let inserted = users::ActiveModel {
            user_id: Set(id),
            user_name: Set(name.clone()),
            message_count: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(_) => {
                info!("Registered new user {id}");
                Ok(())
            }
            // Another touch created the row first.
            Err(e) if is_unique_violation(&e) => {
                let existing = users::Entity::find_by_id(id)
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("User {id} vanished after insert conflict"))?;
                self.increment(existing, name).await
            }
            Err(e) => Err(e.into()),
        }
    }
}
