//! Supabase REST (PostgREST) client

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend is not configured (set the Supabase URL and anon key in Settings)")]
    NotConfigured,
    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn suffix(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// Equality predicate on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

/// Shape of a read request: table, filters, ordering and limit
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query string parameters, in a stable order
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];

        for filter in &self.filters {
            params.push((filter.column.clone(), format!("eq.{}", filter.value)));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, dir)| format!("{}.{}", column, dir.suffix()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

/// Row-level access to the hosted store. Rows travel as JSON objects.
pub trait DataStore: Send + Sync {
    fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError>;
    /// Insert one record and return it as stored (with id and timestamps)
    fn insert(&self, table: &str, record: &Value) -> Result<Value, ApiError>;
    fn update(&self, table: &str, id: &str, patch: &Value) -> Result<(), ApiError>;
    fn delete(&self, table: &str, id: &str) -> Result<(), ApiError>;
}

/// Run a query and decode every row
pub fn fetch<T: DeserializeOwned>(store: &dyn DataStore, query: &Query) -> Result<Vec<T>, ApiError> {
    store
        .select(query)?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}

/// Run a query and decode the first row, if any
pub fn fetch_one<T: DeserializeOwned>(store: &dyn DataStore, query: &Query) -> Result<Option<T>, ApiError> {
    let query = query.clone().limit(1);
    Ok(fetch(store, &query)?.into_iter().next())
}

/// Pull a human-readable message out of a Supabase error body.
/// GoTrue uses `msg` or `error_description`, PostgREST uses `message`.
pub fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["msg", "error_description", "message", "error"] {
            if let Some(text) = json.get(key).and_then(|v| v.as_str()) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build an agent that hands non-2xx responses back to us so the error body
/// can be read
pub fn create_agent(connect_timeout_secs: u64, request_timeout_secs: u64) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(request_timeout_secs)))
        .timeout_connect(Some(Duration::from_secs(connect_timeout_secs)))
        .http_status_as_error(false)
        .build()
        .new_agent()
}

/// Read a response body, turning non-2xx statuses into `ApiError::Status`
pub fn read_body(mut response: ureq::http::Response<ureq::Body>) -> Result<String, ApiError> {
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;

    if !(200..300).contains(&status) {
        return Err(ApiError::Status {
            status,
            message: error_message(&body),
        });
    }

    Ok(body)
}

pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    agent: ureq::Agent,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            access_token: None,
            agent: create_agent(10, 30),
        }
    }

    pub fn with_timeouts(mut self, connect_secs: u64, request_secs: u64) -> Self {
        self.agent = create_agent(connect_secs, request_secs);
        self
    }

    /// Act as the signed-in user instead of the anonymous role
    pub fn with_access_token(mut self, token: Option<&str>) -> Self {
        self.access_token = token.map(|t| t.to_string());
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.anon_key.is_empty()
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.as_deref().unwrap_or(&self.anon_key))
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", &self.bearer())
            .header("Accept", "application/json")
    }

    fn ensure_configured(&self) -> Result<(), ApiError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ApiError::NotConfigured)
        }
    }
}

impl DataStore for SupabaseClient {
    fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError> {
        self.ensure_configured()?;
        log::debug!("GET {} {:?}", query.table, query.to_params());

        let mut request = self.authorize(self.agent.get(&self.rest_url(&query.table)));
        for (key, value) in query.to_params() {
            request = request.query(&key, &value);
        }

        let body = read_body(request.call()?)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn insert(&self, table: &str, record: &Value) -> Result<Value, ApiError> {
        self.ensure_configured()?;
        log::debug!("POST {}", table);

        let payload = serde_json::to_string(&Value::Array(vec![record.clone()]))?;
        let response = self
            .authorize(self.agent.post(&self.rest_url(table)))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .send(payload)?;

        let body = read_body(response)?;
        let mut rows: Vec<Value> = serde_json::from_str(&body)?;
        Ok(if rows.is_empty() { record.clone() } else { rows.remove(0) })
    }

    fn update(&self, table: &str, id: &str, patch: &Value) -> Result<(), ApiError> {
        self.ensure_configured()?;
        log::debug!("PATCH {} id={}", table, id);

        let payload = serde_json::to_string(patch)?;
        let response = self
            .authorize(self.agent.patch(&self.rest_url(table)))
            .query("id", format!("eq.{}", id))
            .header("Content-Type", "application/json")
            .send(payload)?;

        read_body(response)?;
        Ok(())
    }

    fn delete(&self, table: &str, id: &str) -> Result<(), ApiError> {
        self.ensure_configured()?;
        log::debug!("DELETE {} id={}", table, id);

        let response = self
            .authorize(self.agent.delete(&self.rest_url(table)))
            .query("id", format!("eq.{}", id))
            .call()?;

        read_body(response)?;
        Ok(())
    }
}
