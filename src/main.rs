use std::{collections::HashMap, error::Error, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::From;
use jsonwebtoken::{
    decode, encode, DecodingKey, EncodingKey, Header, Validation,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _,
};
use uuid::Uuid;

use shipping_portal::{api, db, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            panic!("database connection failed: {e}");
        }
    });

    // Schema and the administrator account must exist before the login
    // form can be served against this store.
    db_client.init().await?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    for origin in &config.http.cors.allowed_origins {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    }

    let app = Router::new()
        .route("/auth", post(auth))
        .route("/logout", post(logout))
        .route("/user", get(list_users).post(create_user))
        .route("/shipment", get(list_shipments).post(add_shipment))
        .layer(cors)
        .with_state(Arc::new(AppState {
            db_client,
            require_role_match: config.auth.require_role_match,
            session_expiration_time: config.session.expiration_time,
            session_decoding_key: DecodingKey::from_secret(
                config.session.secret.as_bytes(),
            ),
            session_encoding_key: EncodingKey::from_secret(
                config.session.secret.as_bytes(),
            ),
            revoked_sessions: Mutex::new(HashMap::new()),
        }));

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthInput {
    role: api::user::Role,
    user_id: api::user::Id,
    password: String,
}

async fn auth(
    State(state): State<SharedAppState>,
    Json(AuthInput {
        role,
        user_id,
        password,
    }): Json<AuthInput>,
) -> Result<String, AuthError> {
    use AuthError as E;

    let Some(user) = state
        .db_client
        .get_user_by_id(&user_id)
        .await?
        .filter(|u| u.password_hash.verify(&password))
    else {
        // Unknown id and wrong password are deliberately indistinguishable
        // to the caller.
        tracing::warn!(%user_id, "failed login: invalid credentials");
        return Err(E::InvalidCredentials);
    };

    let Some(session_role) =
        session_role(role, &user, state.require_role_match)
    else {
        tracing::warn!(%user_id, ?role, "failed login: role mismatch");
        return Err(E::RoleMismatch);
    };

    let expires_at = OffsetDateTime::now_utc() + state.session_expiration_time;
    encode(
        &Header::default(),
        &AuthClaims {
            user_id: user.id,
            role: session_role,
            jti: Uuid::new_v4(),
            exp: expires_at.unix_timestamp(),
        },
        &state.session_encoding_key,
    )
    .map_err(|_| E::InvalidToken)
}

/// Decides the session role for a matched login, or `None` on a mismatch.
///
/// The `Admin` choice is honored only for the administrator account itself.
/// The `User` choice is honored for any authenticated account, unless
/// `require_role_match` demands the stored role agree with the choice.
fn session_role(
    choice: api::user::Role,
    user: &db::User,
    require_role_match: bool,
) -> Option<api::user::Role> {
    use api::user::Role;

    match choice {
        Role::Admin if user.id.is_admin() => Some(Role::Admin),
        Role::Admin => None,
        Role::User if require_role_match && user.role != Role::User => None,
        Role::User => Some(Role::User),
    }
}

#[derive(Debug, From)]
pub enum AuthError {
    #[from]
    DbError(db::Error),
    InvalidCredentials,
    InvalidToken,
    RoleMismatch,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("store error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::InvalidToken => StatusCode::UNAUTHORIZED.into_response(),
            Self::InvalidCredentials => {
                (StatusCode::FORBIDDEN, "invalid credentials").into_response()
            }
            Self::RoleMismatch => {
                (StatusCode::FORBIDDEN, "invalid role for this user")
                    .into_response()
            }
        }
    }
}

async fn logout(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> StatusCode {
    state.revoke_session(auth_claims.jti, auth_claims.exp);
    StatusCode::OK
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserInput {
    user_id: api::user::Id,
    name: String,
    password: String,
}

async fn create_user(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Json(CreateUserInput {
        user_id,
        name,
        password,
    }): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<api::User>), CreateUserError> {
    use CreateUserError as E;

    if auth_claims.role != api::user::Role::Admin {
        return Err(E::Forbidden);
    }

    let user = db::User {
        id: user_id,
        name,
        role: db::user::Role::User,
        password_hash: db::user::PasswordHash::new(&password)?,
    };
    match state.db_client.insert_user(&user).await? {
        db::user::InsertUserOutcome::Created => {}
        db::user::InsertUserOutcome::AlreadyExists => {
            return Err(E::UserAlreadyExists);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(api::User {
            user_id: user.id,
            name: user.name,
            role: user.role,
        }),
    ))
}

#[derive(Debug, From)]
pub enum CreateUserError {
    #[from]
    DbError(db::Error),
    #[from]
    PasswordHash(password_hash::Error),
    Forbidden,
    UserAlreadyExists,
}

impl IntoResponse for CreateUserError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("store error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::UserAlreadyExists => {
                (StatusCode::CONFLICT, "user id already exists")
                    .into_response()
            }
        }
    }
}

async fn list_users(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> Result<Json<Vec<api::User>>, ListUsersError> {
    use ListUsersError as E;

    if auth_claims.role != api::user::Role::Admin {
        return Err(E::Forbidden);
    }

    let users = state
        .db_client
        .list_users()
        .await?
        .into_iter()
        .map(|u| api::User {
            user_id: u.id,
            name: u.name,
            role: u.role,
        })
        .collect();

    Ok(Json(users))
}

#[derive(Debug, From)]
pub enum ListUsersError {
    #[from]
    DbError(db::Error),
    Forbidden,
}

impl IntoResponse for ListUsersError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("store error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

#[derive(Deserialize)]
struct AddShipmentInput {
    weight: f64,
    address: String,
}

async fn add_shipment(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
    Json(AddShipmentInput { weight, address }): Json<AddShipmentInput>,
) -> Result<(StatusCode, Json<api::Shipment>), AddShipmentError> {
    use AddShipmentError as E;

    // The submission form enforces a positive weight too; the ledger
    // re-checks rather than trusting the client.
    if !valid_weight(weight) {
        return Err(E::InvalidWeight);
    }

    let shipment = db::Shipment {
        id: db::shipment::Id::new(),
        user_id: auth_claims.user_id,
        weight,
        address,
        date: OffsetDateTime::now_utc(),
    };

    state.db_client.insert_shipment(&shipment).await?;

    Ok((
        StatusCode::CREATED,
        Json(api::Shipment::from_db(shipment)?),
    ))
}

fn valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}

#[derive(Debug, From)]
pub enum AddShipmentError {
    #[from]
    DbError(db::Error),
    #[from]
    DateFormat(time::error::Format),
    InvalidWeight,
}

impl IntoResponse for AddShipmentError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("store error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::DateFormat(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::InvalidWeight => {
                (StatusCode::BAD_REQUEST, "weight must be a positive number")
                    .into_response()
            }
        }
    }
}

async fn list_shipments(
    State(state): State<SharedAppState>,
    auth_claims: AuthClaims,
) -> Result<Json<Vec<api::Shipment>>, ListShipmentsError> {
    let shipments = state
        .db_client
        .get_shipments_for(&auth_claims.user_id)
        .await?
        .into_iter()
        .map(api::Shipment::from_db)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(shipments))
}

#[derive(Debug, From)]
pub enum ListShipmentsError {
    #[from]
    DbError(db::Error),
    #[from]
    DateFormat(time::error::Format),
}

impl IntoResponse for ListShipmentsError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => {
                tracing::error!("store error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::DateFormat(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

type SharedAppState = Arc<AppState>;

struct AppState {
    db_client: db::Client,

    require_role_match: bool,

    session_expiration_time: Duration,

    session_decoding_key: DecodingKey,

    session_encoding_key: EncodingKey,

    /// `jti`s of logged-out sessions, keyed to their expiration timestamp
    /// so entries can be dropped once the token itself would be refused.
    revoked_sessions: Mutex<HashMap<Uuid, i64>>,
}

impl AppState {
    fn revoke_session(&self, jti: Uuid, exp: i64) {
        let mut revoked = self.revoked_sessions.lock();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        revoked.retain(|_, expires_at| *expires_at > now);
        revoked.insert(jti, exp);
    }

    fn is_session_revoked(&self, jti: &Uuid) -> bool {
        self.revoked_sessions.lock().contains_key(jti)
    }
}

/// The session: an explicit token carried by the client instead of
/// server-ambient per-user state. Logging out revokes the token's `jti`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthClaims {
    user_id: api::user::Id,
    role: api::user::Role,
    jti: Uuid,
    exp: i64,
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.session_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        if state.is_session_revoked(&token_data.claims.jti) {
            return Err(AuthError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}
