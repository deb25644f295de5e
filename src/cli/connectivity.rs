//! Where the CLI gets results from: a local dispatcher (PostgreSQL or fixture
//! file) or a remote `cbecs_server` reached over HTTP.

use reqwest::Url;
use serde_json::Value;

use crate::backend;
use crate::config::SourceConfig;
use crate::dispatch::Dispatcher;
use crate::error::{AppError, AppResult};
use crate::result::QueryResult;

#[derive(Clone)]
pub struct HttpSession {
    base: Url,
    client: reqwest::Client,
}

impl HttpSession {
    /// Parse the base URL and check the server answers its liveness route.
    pub async fn connect(base: &str) -> AppResult<Self> {
        let base_url = Url::parse(base)
            .map_err(|e| AppError::config("invalid_connect_url", format!("{}: {}", base, e)))?;
        let client = reqwest::Client::builder().build()?;
        let resp = client.get(join(&base_url, "/")?).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::backend("remote_unhealthy", format!("{} answered HTTP {}", base_url, resp.status())));
        }
        Ok(Self { base: base_url, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    /// `GET /api/queryData?queryId=..`; server-side errors come back as the
    /// same `AppError` variant the server produced.
    pub async fn query_data(&self, raw_id: Option<&str>) -> AppResult<QueryResult> {
        let mut url = join(&self.base, "/api/queryData")?;
        if let Some(id) = raw_id {
            url.query_pairs_mut().append_pair("queryId", id);
        }
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let val: Value = resp
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({"status": "error", "code": "remote_error", "message": "unreadable response"}));
        if !status.is_success() {
            let code = val.get("code").and_then(|c| c.as_str()).unwrap_or("remote_error").to_string();
            let message = val.get("message").and_then(|m| m.as_str()).unwrap_or("remote error").to_string();
            return Err(AppError::from_status(status.as_u16(), code, message));
        }
        serde_json::from_value(val).map_err(|e| AppError::backend("remote_bad_payload", e.to_string()))
    }
}

fn join(base: &Url, path: &str) -> AppResult<Url> {
    base.join(path).map_err(|e| AppError::config("invalid_connect_url", format!("{}{}: {}", base, path, e)))
}

#[derive(Clone)]
pub enum QuerySource {
    Direct(Dispatcher),
    Remote(HttpSession),
}

impl QuerySource {
    pub async fn open(source: &SourceConfig) -> AppResult<Self> {
        match source {
            SourceConfig::Remote(url) => Ok(QuerySource::Remote(HttpSession::connect(url).await?)),
            local => Ok(QuerySource::Direct(Dispatcher::new(backend::open(local).await?))),
        }
    }

    pub async fn execute(&self, raw_id: Option<&str>) -> AppResult<QueryResult> {
        match self {
            QuerySource::Direct(d) => d.execute(raw_id).await,
            QuerySource::Remote(h) => h.query_data(raw_id).await,
        }
    }

    pub fn ident(&self) -> String {
        match self {
            QuerySource::Direct(d) => format!("direct:{}", d.backend().describe()),
            QuerySource::Remote(h) => format!("http:{}", h.base),
        }
    }
}
