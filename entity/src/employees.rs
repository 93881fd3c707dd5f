use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique, indexed)]
    pub email: String,
    pub phone: Option<String>,
    #[sea_orm(indexed)]
    pub department: Option<String>,
    #[sea_orm(indexed)]
    pub position: Option<String>,
    pub salary: Option<f64>,
    pub hire_date: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
