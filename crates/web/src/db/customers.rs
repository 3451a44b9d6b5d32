//! Customer profile repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use crm_core::{CustomerId, Email, UserId};

use super::RepositoryError;
use crate::models::{Customer, ProfileUpdate};

#[derive(FromRow)]
struct CustomerRow {
    id: CustomerId,
    user_id: Option<UserId>,
    name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    profile_pic: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .filter(|e| !e.is_empty())
            .map(|e| Email::parse(&e))
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid email on customer {}: {e}",
                    row.id
                ))
            })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            phone: row.phone,
            email,
            profile_pic: row.profile_pic,
            created_at: row.created_at,
        })
    }
}

const CUSTOMER_COLUMNS: &str = "id, user_id, name, phone, email, profile_pic, created_at";

fn into_customers(rows: Vec<CustomerRow>) -> Result<Vec<Customer>, RepositoryError> {
    rows.into_iter().map(Customer::try_from).collect()
}

/// Repository for customer profiles.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All customers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM crm.customer ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        into_customers(rows)
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM crm.customer WHERE id = $1");
        sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(Customer::try_from)
            .transpose()
    }

    /// Get the profile linked to an identity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM crm.customer WHERE user_id = $1");
        sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .map(Customer::try_from)
            .transpose()
    }

    /// Apply account settings changes.
    ///
    /// A `None` picture keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: CustomerId,
        update: &ProfileUpdate,
    ) -> Result<Customer, RepositoryError> {
        let sql = format!(
            r"UPDATE crm.customer
               SET name = $2, phone = $3, email = $4,
                   profile_pic = COALESCE($5, profile_pic)
               WHERE id = $1
               RETURNING {CUSTOMER_COLUMNS}"
        );
        sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.phone.as_deref())
            .bind(update.email.as_ref().map(Email::as_str))
            .bind(update.profile_pic.as_deref())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(Customer::try_from)
    }

    /// Create the profile for a new identity on an open connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the identity already has a profile.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert_for_user(
        conn: &mut PgConnection,
        user_id: UserId,
        name: &str,
        email: Option<&Email>,
    ) -> Result<Customer, RepositoryError> {
        let sql = format!(
            "INSERT INTO crm.customer (user_id, name, email)
             VALUES ($1, $2, $3)
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(user_id)
            .bind(name)
            .bind(email.map(Email::as_str))
            .fetch_one(conn)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "customer profile"))?;

        Customer::try_from(row)
    }
}
