use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub active: bool,

    pub confirmed_at: Option<String>,

    /// `user` or `admin`
    pub role: String,

    pub is_institution: bool,

    pub institution_name: Option<String>,

    pub ext_id: Option<i32>,

    /// Where the account was created (`backend`, `signup`, ...)
    pub source: String,

    pub current_sign_in_at: Option<String>,

    pub last_sign_in_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::addresses::Entity")]
    Addresses,

    #[sea_orm(has_many = "super::access_tokens::Entity")]
    AccessTokens,
}

impl Related<super::addresses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl Related<super::access_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
