use constcat::concat;
use reqwest::StatusCode;
use serde_json::json;
use shipping_portal::api;

const BASE_URL: &str = "http://localhost:3000";

/// Credentials of the auto-seeded administrator account.
pub const ADMIN_USER_ID: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Generates a user id that no previous test run can have registered:
/// accounts are never deleted.
pub fn unique_user_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

pub struct Client {
    inner: reqwest::Client,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
            auth_token: None,
        }
    }

    pub async fn auth(
        mut self,
        role: &str,
        user_id: &str,
        password: &str,
    ) -> Self {
        self.auth_token = Some(
            self.try_auth(role, user_id, password)
                .await
                .expect("authentication failed"),
        );
        self
    }

    pub async fn try_auth(
        &self,
        role: &str,
        user_id: &str,
        password: &str,
    ) -> Result<String, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/auth");

        Ok(self
            .inner
            .post(URL)
            .json(&json!({
                "role": role,
                "userId": user_id,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .text()
            .await
            .expect("failed to get a response"))
    }

    pub async fn logout(&self) -> Result<(), StatusCode> {
        const URL: &str = concat!(BASE_URL, "/logout");

        let mut req = self.inner.post(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req.send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?;

        Ok(())
    }

    pub async fn create_user(
        &self,
        user_id: &str,
        name: &str,
        password: &str,
    ) -> Result<api::User, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/user");

        let mut req = self.inner.post(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .json(&json!({
                "userId": user_id,
                "name": name,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::User>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn list_users(&self) -> Result<Vec<api::User>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/user");

        let mut req = self.inner.get(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::User>>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn add_shipment(
        &self,
        weight: f64,
        address: &str,
    ) -> Result<api::Shipment, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/shipment");

        let mut req = self.inner.post(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .json(&json!({
                "weight": weight,
                "address": address,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<api::Shipment>()
            .await
            .expect("failed to get a response"))
    }

    pub async fn list_shipments(
        &self,
    ) -> Result<Vec<api::Shipment>, StatusCode> {
        const URL: &str = concat!(BASE_URL, "/shipment");

        let mut req = self.inner.get(URL);
        if let Some(token) = &self.auth_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<Vec<api::Shipment>>()
            .await
            .expect("failed to get a response"))
    }
}
