//! Order status and product category enums.
//!
//! Both are stored as `TEXT` using their display labels, which are also
//! the values submitted by the order and product forms.

use serde::{Deserialize, Serialize};

/// Delivery status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    #[serde(rename = "Out for delivery")]
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    /// All statuses, in form display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::OutForDelivery, Self::Delivered];

    /// The stored and displayed label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Where a product is meant to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Indoor,
    #[serde(rename = "Out Door")]
    OutDoor,
}

impl ProductCategory {
    pub const ALL: [Self; 2] = [Self::Indoor, Self::OutDoor];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Indoor => "Indoor",
            Self::OutDoor => "Out Door",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("invalid product category: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_labels_parse_back() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_form_value() {
        let status: OrderStatus = serde_json::from_str("\"Out for delivery\"").unwrap();
        assert_eq!(status, OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_product_category_labels() {
        assert_eq!(ProductCategory::OutDoor.to_string(), "Out Door");
        assert_eq!("Indoor".parse::<ProductCategory>().unwrap(), ProductCategory::Indoor);
    }
}
