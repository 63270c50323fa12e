pub mod shipment;
pub mod user;

pub use self::{shipment::Shipment, user::User};
