use sea_orm::entity::prelude::*;

/// One row per calendar day, keyed by the ISO `YYYY-MM-DD` date string.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "daily_usage")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub day: String,
    pub bytes_sent: i64,
    pub bytes_recv: i64,
    pub max_up_speed: i64,
    pub max_down_speed: i64,
    pub active_seconds: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
