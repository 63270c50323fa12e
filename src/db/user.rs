use std::error::Error as StdError;

use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};
use derive_more::Display;
use enum_utils::TryFromRepr;
use password_hash::SaltString;
use serde::{Deserialize, Serialize};
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};

use super::Client;

/// The conventional administrator account. Exactly one record carries this
/// id, seeded at startup when absent.
pub const ADMIN_USER_ID: &str = "admin";

const ADMIN_SEED_NAME: &str = "Administrator";
const ADMIN_SEED_PASSWORD: &str = "admin123";

#[derive(Clone, Debug)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub role: Role,
    pub password_hash: PasswordHash,
}

/// Caller-chosen account id, unique and case-sensitive.
#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
pub struct Id(String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id denotes the administrator account. Exact match: the
    /// comparison is as case-sensitive as the key itself.
    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_USER_ID
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromSql<'_> for Id {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, TryFromRepr, PartialEq, Serialize,
)]
#[repr(u8)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin = 1,
    User = 2,
}

impl FromSql<'_> for Role {
    accepts!(INT2);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from_sql(ty, raw)?;
        let repr = u8::try_from(repr)?;
        let role = Self::try_from(repr).map_err(|_| "invalid role")?;
        Ok(role)
    }
}

impl ToSql for Role {
    accepts!(INT2);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from((*self) as u8);
        repr.to_sql(ty, out)
    }
}

/// Salted argon2 hash of an account password, stored as a PHC string.
#[derive(Clone, Debug)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(secret: &str) -> Result<Self, password_hash::Error> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|_| password_hash::Error::Crypto)?;
        let salt = SaltString::encode_b64(&salt_bytes)?;
        let phc = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)?
            .to_string();
        Ok(Self(phc))
    }

    /// Constant-time check of `secret` against the stored hash. A hash that
    /// fails to parse never verifies.
    pub fn verify(&self, secret: &str) -> bool {
        match password_hash::PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl FromSql<'_> for PasswordHash {
    accepts!(TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for PasswordHash {
    accepts!(TEXT);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

/// Discriminated result of [`Client::insert_user`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertUserOutcome {
    Created,
    AlreadyExists,
}

impl Client {
    pub async fn get_user_by_id(
        &self,
        id: &Id,
    ) -> Result<Option<User>, Error> {
        const SQL: &str = "SELECT user_id, name, password_hash, role \
                           FROM users \
                           WHERE user_id = $1 \
                           LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(|row| User {
            id: row.get("user_id"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
        }))
    }

    /// Inserts a new account in a single statement. The primary key makes
    /// the duplicate check atomic: a conflicting id leaves the existing
    /// record untouched and reports [`InsertUserOutcome::AlreadyExists`].
    pub async fn insert_user(
        &self,
        user: &User,
    ) -> Result<InsertUserOutcome, Error> {
        const SQL: &str = "\
            INSERT INTO users (user_id, name, password_hash, role) \
            VALUES ($1, $2, $3, $4) \
            ON CONFLICT (user_id) DO NOTHING";

        let inserted = self
            .0
            .execute(
                SQL,
                &[&user.id, &user.name, &user.password_hash, &user.role],
            )
            .await?;

        Ok(if inserted == 0 {
            InsertUserOutcome::AlreadyExists
        } else {
            InsertUserOutcome::Created
        })
    }

    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        const SQL: &str = "SELECT user_id, name, password_hash, role \
                           FROM users \
                           ORDER BY user_id";
        Ok(self
            .0
            .query(SQL, &[])
            .await?
            .into_iter()
            .map(|row| User {
                id: row.get("user_id"),
                name: row.get("name"),
                password_hash: row.get("password_hash"),
                role: row.get("role"),
            })
            .collect())
    }

    /// Inserts the administrator account when missing. The insert is
    /// conflict-free, so concurrent cold starts cannot double-seed and an
    /// existing record (including a changed password) is never overwritten.
    pub async fn ensure_admin_seed(&self) -> Result<(), super::InitError> {
        let admin = User {
            id: Id::from(ADMIN_USER_ID),
            name: ADMIN_SEED_NAME.to_string(),
            role: Role::Admin,
            password_hash: PasswordHash::new(ADMIN_SEED_PASSWORD)?,
        };
        self.insert_user(&admin).await?;
        Ok(())
    }
}
