//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dishdash_core::{OrderId, RestaurantId, ReviewId, UserId};

/// Longest comment or vendor reply accepted.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// A customer's rating of a delivered order.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub restaurant_id: RestaurantId,
    pub customer_id: UserId,
    pub customer_name: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub vendor_reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/orders/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub rating: i16,
    pub comment: Option<String>,
}

impl NewReview {
    /// # Errors
    ///
    /// Returns a client-facing message for a rating outside 1..=5 or an
    /// oversized comment.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_string());
        }
        validate_text(self.comment.as_deref(), "comment")
    }

    /// Comment with surrounding whitespace removed; blank becomes `None`.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Body of `POST /api/vendor/reviews/{id}/reply`.
#[derive(Debug, Deserialize)]
pub struct ReviewReply {
    pub reply: String,
}

impl ReviewReply {
    /// # Errors
    ///
    /// Returns a client-facing message for a blank or oversized reply.
    pub fn validate(&self) -> Result<(), String> {
        if self.reply.trim().is_empty() {
            return Err("reply is required".to_string());
        }
        validate_text(Some(&self.reply), "reply")
    }
}

fn validate_text(text: Option<&str>, field: &str) -> Result<(), String> {
    if text.is_some_and(|t| t.chars().count() > MAX_TEXT_LENGTH) {
        return Err(format!("{field} must be at most {MAX_TEXT_LENGTH} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        for rating in [0, 6, -1] {
            let review = NewReview { rating, comment: None };
            assert!(review.validate().is_err());
        }
        let review = NewReview { rating: 5, comment: Some("  ".to_string()) };
        assert!(review.validate().is_ok());
        assert_eq!(review.comment(), None);
    }

    #[test]
    fn test_reply_required() {
        assert!(ReviewReply { reply: " ".to_string() }.validate().is_err());
        assert!(ReviewReply { reply: "Thanks!".to_string() }.validate().is_ok());
    }

    #[test]
    fn test_comment_length() {
        let review = NewReview {
            rating: 4,
            comment: Some("a".repeat(MAX_TEXT_LENGTH + 1)),
        };
        assert!(review.validate().is_err());
    }
}
