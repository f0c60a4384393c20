use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attributes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub data_type: String,
    pub unit: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attribute_options::Entity")]
    AttributeOptions,
    #[sea_orm(has_many = "super::category_attributes::Entity")]
    CategoryAttributes,
    #[sea_orm(has_many = "super::product_attribute_values::Entity")]
    ProductAttributeValues,
}

impl Related<super::attribute_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttributeOptions.def()
    }
}

impl Related<super::category_attributes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CategoryAttributes.def()
    }
}

impl Related<super::product_attribute_values::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductAttributeValues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
