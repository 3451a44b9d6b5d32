//! Customer provisioning.
//!
//! Every self-registered identity gets the `customer` role group and a
//! customer profile named after its handle. [`provision_customer`] performs
//! both steps against a [`ProvisioningStore`]; registration runs it on the
//! same transaction as the identity insert, so a failure here leaves no
//! half-provisioned identity behind.

use std::future::Future;

use sqlx::PgConnection;
use thiserror::Error;

use crm_core::{CUSTOMER_GROUP, CustomerId, Email, GroupId, UserId};

use crate::db::{CustomerRepository, GroupRepository, RepositoryError};
use crate::models::User;

/// Errors that abort provisioning (and with it, registration).
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// The role group to assign does not exist.
    #[error("role group {0:?} does not exist")]
    MissingGroup(&'static str),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage operations provisioning needs.
pub trait ProvisioningStore {
    fn find_group(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<GroupId>, RepositoryError>> + Send;

    fn add_user_to_group(
        &mut self,
        user_id: UserId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn create_profile(
        &mut self,
        user_id: UserId,
        name: &str,
        email: Option<&Email>,
    ) -> impl Future<Output = Result<CustomerId, RepositoryError>> + Send;
}

/// What provisioning created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provisioned {
    pub group_id: GroupId,
    pub customer_id: CustomerId,
}

/// Assign the `customer` group and create the profile for a new identity.
///
/// The profile's name is the identity's handle and its email the
/// registration email, whatever else the registration carried.
///
/// # Errors
///
/// Returns `ProvisioningError::MissingGroup` if the `customer` group does not
/// exist, and `ProvisioningError::Repository` if a store operation fails
/// (including a second run for the same identity, which violates the
/// membership key or the one-profile-per-identity constraint).
pub async fn provision_customer<S: ProvisioningStore + Send>(
    store: &mut S,
    user: &User,
) -> Result<Provisioned, ProvisioningError> {
    let group_id = store
        .find_group(CUSTOMER_GROUP)
        .await?
        .ok_or(ProvisioningError::MissingGroup(CUSTOMER_GROUP))?;

    store.add_user_to_group(user.id, group_id).await?;
    let customer_id = store
        .create_profile(user.id, user.username.as_str(), user.email.as_ref())
        .await?;

    tracing::info!(
        user_id = %user.id,
        customer_id = %customer_id,
        "Provisioned customer profile"
    );

    Ok(Provisioned {
        group_id,
        customer_id,
    })
}

/// [`ProvisioningStore`] over an open `PostgreSQL` connection or transaction.
pub struct PgProvisioningStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgProvisioningStore<'c> {
    pub const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl ProvisioningStore for PgProvisioningStore<'_> {
    async fn find_group(&mut self, name: &str) -> Result<Option<GroupId>, RepositoryError> {
        Ok(GroupRepository::find_by_name(self.conn, name)
            .await?
            .map(|g| g.id))
    }

    async fn add_user_to_group(
        &mut self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<(), RepositoryError> {
        GroupRepository::add_member(self.conn, user_id, group_id).await
    }

    async fn create_profile(
        &mut self,
        user_id: UserId,
        name: &str,
        email: Option<&Email>,
    ) -> Result<CustomerId, RepositoryError> {
        Ok(CustomerRepository::insert_for_user(self.conn, user_id, name, email)
            .await?
            .id)
    }
}
