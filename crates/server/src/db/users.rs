//! User repository for database operations.
//!
//! Accounts, password hashes and linked OAuth identities.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use dishdash_core::{AuthProvider, Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

const USER_COLUMNS: &str =
    "u.id, u.email, u.display_name, u.role, u.auth_provider, u.created_at, u.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    display_name: String,
    role: UserRole,
    auth_provider: AuthProvider,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            display_name: row.display_name,
            role: row.role,
            auth_provider: row.auth_provider,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Accounts, keyed by id, email or linked identity.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored email no longer parses.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM app.user u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Look up by normalized email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM app.user u WHERE u.email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by email.
    ///
    /// Accounts created through OAuth have no password and return `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            r"
            SELECT {USER_COLUMNS}, p.password_hash
            FROM app.user u
            JOIN app.user_password p ON p.user_id = u.id
            WHERE u.email = $1
            "
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some((row.user.try_into()?, row.password_hash)))
    }

    /// Create an email/password account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    pub async fn create_with_password(
        &self,
        email: &Email,
        display_name: &str,
        role: UserRole,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row = insert_user(&mut tx, email, display_name, role, AuthProvider::Email).await?;

        sqlx::query("INSERT INTO app.user_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Get the user linked to an OAuth identity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_identity(
        &self,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            SELECT {USER_COLUMNS}
            FROM app.user u
            JOIN app.user_identity i ON i.user_id = u.id
            WHERE i.provider = $1 AND i.subject = $2
            "
        ))
        .bind(provider)
        .bind(subject)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a customer account for a first-time OAuth sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or identity is taken.
    pub async fn create_with_identity(
        &self,
        email: &Email,
        display_name: &str,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row = insert_user(&mut tx, email, display_name, UserRole::Customer, provider).await?;
        insert_identity(&mut *tx, UserId::new(row.id), provider, subject).await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Attach an OAuth identity to an existing account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the identity belongs to someone else.
    pub async fn link_identity(
        &self,
        user_id: UserId,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<(), RepositoryError> {
        insert_identity(self.pool, user_id, provider, subject).await
    }
}

async fn insert_user(
    tx: &mut Transaction<'_, Postgres>,
    email: &Email,
    display_name: &str,
    role: UserRole,
    provider: AuthProvider,
) -> Result<UserRow, RepositoryError> {
    sqlx::query_as::<_, UserRow>(&format!(
        r"
        INSERT INTO app.user AS u (email, display_name, role, auth_provider)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "
    ))
    .bind(email.as_str())
    .bind(display_name)
    .bind(role)
    .bind(provider)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| conflict_on_unique(e, "email"))
}

async fn insert_identity<'e, E>(
    executor: E,
    user_id: UserId,
    provider: AuthProvider,
    subject: &str,
) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("INSERT INTO app.user_identity (provider, subject, user_id) VALUES ($1, $2, $3)")
        .bind(provider)
        .bind(subject)
        .bind(user_id)
        .execute(executor)
        .await
        .map_err(|e| conflict_on_unique(e, "identity"))?;
    Ok(())
}
