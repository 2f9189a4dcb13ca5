use crate::constants::GDPR_REMOVAL;
use crate::entities::{addresses, countries, prelude::*};
use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, Value,
};

#[derive(Debug, Clone, Default)]
pub struct NewAddress {
    pub user_id: i32,
    pub address_type: String,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub number: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country_id: Option<i32>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub ico: Option<String>,
    pub dic: Option<String>,
    pub icdph: Option<String>,
}

pub struct AddressRepository {
    conn: DatabaseConnection,
}

impl AddressRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, address: NewAddress) -> Result<addresses::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let active_model = addresses::ActiveModel {
            user_id: Set(address.user_id),
            address_type: Set(address.address_type),
            title: Set(address.title),
            first_name: Set(address.first_name),
            last_name: Set(address.last_name),
            address: Set(address.address),
            number: Set(address.number),
            city: Set(address.city),
            zip: Set(address.zip),
            country_id: Set(address.country_id),
            phone_number: Set(address.phone_number),
            company_name: Set(address.company_name),
            ico: Set(address.ico),
            dic: Set(address.dic),
            icdph: Set(address.icdph),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to insert address")
    }

    pub async fn get(&self, id: i32) -> Result<Option<addresses::Model>> {
        Addresses::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query address")
    }

    /// All addresses of a user in insertion order, each with its country.
    pub async fn list_for_user_with_country(
        &self,
        user_id: i32,
    ) -> Result<Vec<(addresses::Model, Option<countries::Model>)>> {
        Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .order_by_asc(addresses::Column::Id)
            .find_also_related(Countries)
            .all(&self.conn)
            .await
            .context("Failed to list addresses")
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        Addresses::find()
            .filter(addresses::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count addresses")
    }

    /// Overwrite personal data of the user's addresses, skipping `protected_ids`.
    /// Rows are kept; `country_id` is cleared. Returns the number of rows touched.
    pub async fn anonymize_for_user(&self, user_id: i32, protected_ids: &[i32]) -> Result<u64> {
        let removal = || Expr::value(GDPR_REMOVAL);

        let mut query = Addresses::update_many()
            .col_expr(addresses::Column::Title, removal())
            .col_expr(addresses::Column::FirstName, removal())
            .col_expr(addresses::Column::LastName, removal())
            .col_expr(addresses::Column::Address, removal())
            .col_expr(addresses::Column::Number, removal())
            .col_expr(addresses::Column::City, removal())
            .col_expr(addresses::Column::Zip, removal())
            .col_expr(addresses::Column::CountryId, Expr::value(Value::Int(None)))
            .col_expr(addresses::Column::Ico, removal())
            .col_expr(addresses::Column::Dic, removal())
            .col_expr(addresses::Column::Icdph, removal())
            .col_expr(addresses::Column::CompanyName, removal())
            .col_expr(addresses::Column::PhoneNumber, removal())
            .col_expr(
                addresses::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(addresses::Column::UserId.eq(user_id));

        if !protected_ids.is_empty() {
            query = query.filter(addresses::Column::Id.is_not_in(protected_ids.to_vec()));
        }

        let result = query
            .exec(&self.conn)
            .await
            .context("Failed to anonymize addresses")?;

        Ok(result.rows_affected)
    }

    pub async fn add_country(&self, name: &str, iso_code: &str) -> Result<countries::Model> {
        let active_model = countries::ActiveModel {
            name: Set(name.to_string()),
            iso_code: Set(iso_code.to_string()),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to insert country")
    }
}
