use serde::{Deserialize, Serialize};
use time::{
    format_description::FormatItem, macros::format_description,
    OffsetDateTime,
};

use crate::{api, db};

pub use crate::db::shipment::Id;

/// Rendering of server-assigned shipment timestamps.
pub const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Id,
    pub user_id: api::user::Id,
    pub weight: f64,
    pub address: String,
    /// Creation time in `YYYY-MM-DD HH:MM:SS`.
    pub date: String,
}

impl Shipment {
    pub fn from_db(
        shipment: db::Shipment,
    ) -> Result<Self, time::error::Format> {
        Ok(Self {
            id: shipment.id,
            user_id: shipment.user_id,
            weight: shipment.weight,
            address: shipment.address,
            date: format_date(shipment.date)?,
        })
    }
}

pub fn format_date(
    date: OffsetDateTime,
) -> Result<String, time::error::Format> {
    date.format(&DATE_FORMAT)
}
