use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tracking_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub event_type: String,
    pub description: String,
    pub location: Option<String>,
    pub operator: Option<String>,
    pub occurred_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_tracking::Entity",
        from = "Column::OrderId",
        to = "super::order_tracking::Column::OrderId"
    )]
    OrderTracking,
}

impl Related<super::order_tracking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderTracking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
