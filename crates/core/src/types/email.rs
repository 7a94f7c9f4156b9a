//! Email addresses, the identifier shared by password and social sign-in.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain exactly one @ symbol")]
    InvalidAtSymbol,
    #[error("email cannot contain whitespace")]
    Whitespace,
    #[error("email needs something before the @")]
    EmptyLocalPart,
    #[error("email needs a domain after the @")]
    EmptyDomain,
}

/// A trimmed, lowercased email address.
///
/// `Ana@Example.com` typed into the signup form and `ana@example.com`
/// returned by Google compare equal, which is what account linking relies on.
///
/// ```
/// use dishdash_core::Email;
///
/// let email = Email::parse("  Ana@Example.com ").unwrap();
/// assert_eq!(email.as_str(), "ana@example.com");
/// assert_eq!(email.local_part(), "ana");
///
/// assert!(Email::parse("user@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Trim, validate and lowercase `input`.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmailError`] the input trips over.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let candidate = input.trim();
        Self::check(candidate)?;
        Ok(Self(candidate.to_lowercase()))
    }

    fn check(candidate: &str) -> Result<(), EmailError> {
        match candidate.len() {
            0 => return Err(EmailError::Empty),
            n if n > Self::MAX_LENGTH => {
                return Err(EmailError::TooLong {
                    max: Self::MAX_LENGTH,
                });
            }
            _ => {}
        }
        if candidate.contains(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut pieces = candidate.split('@');
        let (Some(local), Some(domain), None) = (pieces.next(), pieces.next(), pieces.next())
        else {
            return Err(EmailError::InvalidAtSymbol);
        };
        if local.is_empty() {
            Err(EmailError::EmptyLocalPart)
        } else if domain.is_empty() {
            Err(EmailError::EmptyDomain)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mailbox name before the `@`; used as a fallback display name.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.parts().0
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.parts().1
    }

    fn parts(&self) -> (&str, &str) {
        // Validated on construction, so the split always succeeds.
        self.0.split_once('@').unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Stored as TEXT; rows are re-validated when read back.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_addresses() {
        for ok in ["user@example.com", "user.name+tag@example.co.uk", "a@b.c"] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let email = Email::parse("  Chef.Luis@Kitchen.IO\n").unwrap();
        assert_eq!(email.as_str(), "chef.luis@kitchen.io");
        assert_eq!(email.local_part(), "chef.luis");
        assert_eq!(email.domain(), "kitchen.io");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(
            Email::parse("no-at-symbol"),
            Err(EmailError::InvalidAtSymbol)
        );
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("@domain.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::EmptyDomain));
        assert_eq!(
            Email::parse("first last@example.com"),
            Err(EmailError::Whitespace)
        );

        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: Email = serde_json::from_str("\"Someone@Example.com\"").unwrap();
        assert_eq!(parsed.as_str(), "someone@example.com");

        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
