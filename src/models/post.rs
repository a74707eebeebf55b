//! Post entity model
//!
//! Posts are the local side of every integration mapping. The `updated_at`
//! column is compared against a mapping's `last_synced_at` to detect local
//! edits that would be clobbered by an inbound overwrite.

use super::board::Entity as Board;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub board_id: Uuid,

    /// Current workflow status; null when the board has no status assigned
    pub status_id: Option<Uuid>,

    pub title: String,

    pub details: Option<String>,

    /// Free-form tags, stored as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Option<JsonValue>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Board",
        from = "Column::BoardId",
        to = "super::board::Column::Id"
    )]
    Board,
}

impl Related<Board> for Entity {
    fn to() -> RelationDef {
        Relation::Board.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Tags as plain strings, tolerating a missing or malformed column value.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
