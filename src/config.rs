use std::{net, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    pub session: Session,
    #[serde(default)]
    pub auth: Auth,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Session {
    pub secret: String,
    #[serde(with = "humantime_serde")]
    pub expiration_time: time::Duration,
}

#[derive(Default, Deserialize)]
pub struct Auth {
    /// When `true`, logging in with the `User` role choice additionally
    /// requires the stored role of the account to be `User`. The default
    /// keeps the historical behavior: any authenticated account may open
    /// the user view.
    #[serde(default)]
    pub require_role_match: bool,
}
