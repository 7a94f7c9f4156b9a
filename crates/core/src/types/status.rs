//! Status and role enums shared by the server, CLI and database.

use serde::{Deserialize, Serialize};

/// Which side of the marketplace an account is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Browses restaurants and places orders.
    #[default]
    Customer,
    /// Owns a restaurant and manages its menu, orders and reviews.
    Vendor,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Vendor => write!(f, "vendor"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "vendor" => Ok(Self::Vendor),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// How an account signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.auth_provider", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    #[default]
    Email,
    Google,
    Facebook,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Google => write!(f, "google"),
            Self::Facebook => write!(f, "facebook"),
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            _ => Err(format!("invalid auth provider: {s}")),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// Card paid to the courier's terminal.
    Card,
}

/// Lifecycle of an order.
///
/// ```text
/// placed ──► accepted ──► preparing ──► out_for_delivery ──► delivered
///   │
///   ├──► rejected   (vendor)
///   └──► cancelled  (customer)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "app.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed,
    Accepted,
    Preparing,
    OutForDelivery,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Placed,
        Self::Accepted,
        Self::Preparing,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Rejected,
        Self::Cancelled,
    ];

    /// Whether an order in this status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Placed, Self::Accepted | Self::Rejected | Self::Cancelled)
                | (Self::Accepted, Self::Preparing)
                | (Self::Preparing, Self::OutForDelivery)
                | (Self::OutForDelivery, Self::Delivered)
        )
    }

    /// Terminal statuses never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Rejected | Self::Cancelled)
    }

    /// Orders the kitchen still has to deal with.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Snake-case name, matching the JSON and database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Accepted => "accepted",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use OrderStatus::*;
        let path = [Placed, Accepted, Preparing, OutForDelivery, Delivered];
        for pair in path.windows(2) {
            if let [from, to] = pair {
                assert!(from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_placed_can_be_rejected_or_cancelled() {
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Rejected));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Rejected));
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::OutForDelivery));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Placed));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_display() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("vendor".parse::<UserRole>().unwrap(), UserRole::Vendor);
        assert!("admin".parse::<UserRole>().is_err());
    }
}
