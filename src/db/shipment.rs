use std::error::Error as StdError;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Error,
};
use uuid::Uuid;

use super::{user, Client};

/// A submitted package record. Immutable once written.
#[derive(Clone, Debug)]
pub struct Shipment {
    pub id: Id,
    /// Advisory reference to the submitting account: the store does not
    /// enforce it.
    pub user_id: user::Id,
    pub weight: f64,
    pub address: String,
    pub date: OffsetDateTime,
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq,
    Serialize,
)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Id(Uuid::new_v4())
    }
}

impl From<u128> for Id {
    fn from(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl FromSql<'_> for Id {
    accepts!(UUID);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Uuid::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(UUID);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

impl Client {
    pub async fn insert_shipment(
        &self,
        shipment: &Shipment,
    ) -> Result<(), Error> {
        const SQL: &str = "\
            INSERT INTO shipments (id, user_id, weight, address, date) \
            VALUES ($1, $2, $3, $4, $5)";

        self.0
            .execute(
                SQL,
                &[
                    &shipment.id,
                    &shipment.user_id,
                    &shipment.weight,
                    &shipment.address,
                    &shipment.date,
                ],
            )
            .await
            .map(drop)
    }

    /// Shipments submitted by `user_id`, newest first. Exact-match filter:
    /// no other account's records are ever returned.
    pub async fn get_shipments_for(
        &self,
        user_id: &user::Id,
    ) -> Result<Vec<Shipment>, Error> {
        const SQL: &str = "\
            SELECT id, user_id, weight, address, date \
            FROM shipments \
            WHERE user_id = $1 \
            ORDER BY date DESC, \
                     id DESC";
        Ok(self
            .0
            .query(SQL, &[&user_id])
            .await?
            .into_iter()
            .map(|row| Shipment {
                id: row.get("id"),
                user_id: row.get("user_id"),
                weight: row.get("weight"),
                address: row.get("address"),
                date: row.get("date"),
            })
            .collect())
    }
}
