use crate::api::traits::RentalApi;
use crate::api::types::{Credentials, OptionKind, SearchParams};
use crate::config::ApiConfig;
use crate::error::{Result, ScoutError};
use crate::models::{
    Comparison, FilterOption, NewViewingRequest, PropertyId, PropertyPage, RequestId, UserId,
    ViewingRequest, WishlistEntry,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-over-HTTPS client for the rental backend
pub struct HttpRentalApi {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpRentalApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("rental-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let credentials = match (&config.access_token, config.user_id) {
            (Some(token), Some(user_id)) if !token.is_empty() => Some(Credentials {
                access_token: token.clone(),
                user_id,
            }),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.credentials {
            Some(creds) => builder.bearer_auth(&creds.access_token),
            None => builder,
        }
    }

    /// Requests that need a user; fails before sending when nobody is logged in
    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if self.credentials.is_none() {
            return Err(ScoutError::AuthRequired);
        }
        Ok(self.request(method, path))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?, false).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Map non-success responses onto the error taxonomy
async fn check_status(response: Response, is_delete: bool) -> Result<Response> {
    let status = response.status();
    debug!(url = %response.url(), status = status.as_u16(), "Response received");

    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(status = status.as_u16(), "Backend rejected credentials");
        return Err(ScoutError::AuthRequired);
    }
    if is_delete && status == StatusCode::NOT_FOUND {
        // Already absent counts as removed
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ScoutError::Server {
        status: status.as_u16(),
        message: error_message(status, &text),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    from_json
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()))
        })
}

/// Accepts both `{id, name}` and the backend's `{city_id, city_name}` style rows
pub(crate) fn normalize_options(kind: OptionKind, rows: Vec<Value>) -> Vec<FilterOption> {
    let id_key = format!("{}_id", kind.field_prefix());
    let name_key = format!("{}_name", kind.field_prefix());

    rows.iter()
        .filter_map(|row| {
            let id = row
                .get(&id_key)
                .or_else(|| row.get("id"))
                .and_then(Value::as_i64)?;
            let name = row
                .get(&name_key)
                .or_else(|| row.get("name"))
                .and_then(Value::as_str)?;
            Some(FilterOption {
                id,
                name: name.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl RentalApi for HttpRentalApi {
    fn current_user(&self) -> Option<UserId> {
        self.credentials.as_ref().map(|c| c.user_id)
    }

    async fn search_properties(&self, params: &SearchParams) -> Result<PropertyPage> {
        debug!(?params, "Searching properties");
        let builder = self
            .request(Method::GET, "properties/")
            .query(&params.to_query());
        self.send_json(builder).await
    }

    async fn filter_options(&self, kind: OptionKind) -> Result<Vec<FilterOption>> {
        let mut builder = self.request(Method::GET, &format!("properties/filters/{}", kind.path()));
        if let Some((key, id)) = kind.parent() {
            builder = builder.query(&[(key, id)]);
        }
        let rows: Vec<Value> = self.send_json(builder).await?;
        Ok(normalize_options(kind, rows))
    }

    async fn compare_properties(&self, ids: &[PropertyId]) -> Result<Comparison> {
        let builder = self
            .request(Method::POST, "properties/compare")
            .json(&json!({ "property_ids": ids }));
        self.send_json(builder).await
    }

    async fn wishlist(&self) -> Result<Vec<WishlistEntry>> {
        let builder = self.authed(Method::GET, "wishlist/")?;
        self.send_json(builder).await
    }

    async fn add_to_wishlist(&self, property_id: PropertyId) -> Result<WishlistEntry> {
        let builder = self
            .authed(Method::POST, "wishlist/")?
            .json(&json!({ "property_id": property_id }));
        self.send_json(builder).await
    }

    async fn remove_from_wishlist(&self, property_id: PropertyId) -> Result<()> {
        let builder = self.authed(Method::DELETE, &format!("wishlist/{property_id}"))?;
        check_status(builder.send().await?, true).await?;
        Ok(())
    }

    async fn create_viewing_request(&self, request: &NewViewingRequest) -> Result<ViewingRequest> {
        let builder = self.authed(Method::POST, "viewing-requests")?.json(request);
        self.send_json(builder).await
    }

    async fn my_viewing_requests(&self) -> Result<Vec<ViewingRequest>> {
        let builder = self.authed(Method::GET, "viewing-requests/me")?;
        self.send_json(builder).await
    }

    async fn owner_viewing_requests(&self) -> Result<Vec<ViewingRequest>> {
        let builder = self.authed(Method::GET, "viewing-requests/owner/requests")?;
        self.send_json(builder).await
    }

    async fn property_viewing_requests(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<ViewingRequest>> {
        let builder = self.authed(
            Method::GET,
            &format!("viewing-requests/property/{property_id}"),
        )?;
        self.send_json(builder).await
    }

    async fn accept_viewing_request(&self, request_id: RequestId) -> Result<ViewingRequest> {
        let builder = self.authed(
            Method::PATCH,
            &format!("viewing-requests/{request_id}/accept"),
        )?;
        self.send_json(builder).await
    }

    async fn deny_viewing_request(&self, request_id: RequestId) -> Result<ViewingRequest> {
        let builder = self.authed(Method::PATCH, &format!("viewing-requests/{request_id}/deny"))?;
        self.send_json(builder).await
    }
}
