//! Caller roles.
//!
//! Identities are members of named role groups (`admin`, `customer`). The
//! group memberships are collapsed into a single [`Role`] once, at login,
//! and that value travels with the session. Everything downstream (the
//! authorization guards, templates) works with the closed enum and never
//! looks at raw group names.

use serde::{Deserialize, Serialize};

/// Name of the staff role group.
pub const ADMIN_GROUP: &str = "admin";

/// Name of the role group assigned to every self-registered identity.
pub const CUSTOMER_GROUP: &str = "customer";

/// The resolved role of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Staff member: manages customers, products and orders.
    Admin,
    /// Customer: sees their own orders and profile.
    Customer,
    /// No group, or only groups this application does not recognise.
    #[default]
    Unknown,
}

impl Role {
    /// Map a single group name to a role.
    #[must_use]
    pub fn from_group_name(name: &str) -> Self {
        match name {
            ADMIN_GROUP => Self::Admin,
            CUSTOMER_GROUP => Self::Customer,
            _ => Self::Unknown,
        }
    }

    /// Resolve a role from an identity's group names.
    ///
    /// Callers must pass the names in a stable order (the repository orders
    /// memberships by group id). Only the first name counts: an empty list
    /// or an unrecognised first name yields [`Role::Unknown`], whatever
    /// groups follow.
    pub fn resolve<I, S>(group_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        group_names
            .into_iter()
            .next()
            .map_or(Self::Unknown, |name| Self::from_group_name(name.as_ref()))
    }

    /// The role group backing this role, if any.
    #[must_use]
    pub const fn group_name(self) -> Option<&'static str> {
        match self {
            Self::Admin => Some(ADMIN_GROUP),
            Self::Customer => Some(CUSTOMER_GROUP),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Customer => write!(f, "customer"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Parse an assignable role. `unknown` is not assignable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from_group_name(s) {
            Self::Unknown => Err(format!("invalid role: {s} (expected admin or customer)")),
            role => Ok(role),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_empty_is_unknown() {
        assert_eq!(Role::resolve(Vec::<String>::new()), Role::Unknown);
    }

    #[test]
    fn test_resolve_single_group() {
        assert_eq!(Role::resolve(["admin"]), Role::Admin);
        assert_eq!(Role::resolve(["customer"]), Role::Customer);
    }

    #[test]
    fn test_resolve_uses_first_group_only() {
        assert_eq!(Role::resolve(["staff", "admin"]), Role::Unknown);
        assert_eq!(Role::resolve(["staff", "customer"]), Role::Unknown);
        assert_eq!(Role::resolve(["staff", "auditors"]), Role::Unknown);
    }

    #[test]
    fn test_resolve_is_order_dependent_not_random() {
        assert_eq!(Role::resolve(["admin", "customer"]), Role::Admin);
        assert_eq!(Role::resolve(["customer", "admin"]), Role::Customer);
    }

    #[test]
    fn test_group_name_round_trip() {
        for role in [Role::Admin, Role::Customer] {
            let name = role.group_name().unwrap();
            assert_eq!(Role::from_group_name(name), role);
        }
        assert_eq!(Role::Unknown.group_name(), None);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("unknown".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_session_serialization() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
