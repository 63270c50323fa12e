pub mod shipment;
pub mod user;

use crate::config;

use derive_more::{Display, From};
use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

pub use tokio_postgres::Error;

pub use self::{shipment::Shipment, user::User};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

pub async fn connect(
    config: config::Db,
) -> Result<(Client, Connection), Error> {
    tokio_postgres::connect(&config.url, NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
}

pub struct Client(tokio_postgres::Client);

impl Client {
    /// Prepares the store for serving: creates the `users` and `shipments`
    /// tables when missing and seeds the administrator account.
    ///
    /// Must complete before the first request is accepted.
    pub async fn init(&self) -> Result<(), InitError> {
        self.init_schema().await?;
        self.ensure_admin_seed().await?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), Error> {
        const USERS_SQL: &str = "\
            CREATE TABLE IF NOT EXISTS users ( \
                user_id TEXT PRIMARY KEY, \
                name TEXT NOT NULL, \
                password_hash TEXT NOT NULL, \
                role SMALLINT NOT NULL)";
        const SHIPMENTS_SQL: &str = "\
            CREATE TABLE IF NOT EXISTS shipments ( \
                id UUID PRIMARY KEY, \
                user_id TEXT NOT NULL, \
                weight DOUBLE PRECISION NOT NULL, \
                address TEXT NOT NULL, \
                date TIMESTAMPTZ NOT NULL)";

        self.0.execute(USERS_SQL, &[]).await?;
        self.0.execute(SHIPMENTS_SQL, &[]).await?;
        Ok(())
    }
}

#[derive(Debug, Display, From, derive_more::Error)]
pub enum InitError {
    #[display("store error: {_0}")]
    Db(Error),

    #[display("password hashing error: {_0}")]
    PasswordHash(password_hash::Error),
}
