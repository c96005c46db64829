use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per customer that has ever written to the bot.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Telegram user id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(column_type = "String(StringLen::N(255))", nullable)]
    pub user_name: Option<String>,
    #[sea_orm(default_value = 0)]
    pub message_count: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
