//! Thin authenticated accessor for the scanner's REST API.
//!
//! TLS verification is intentionally relaxed: the deployments this talks
//! to are internal and self-signed.

mod paginate;
mod submit;
mod template;
mod types;

pub use paginate::{collect_pages, Page};
pub use submit::{submit_with_retry, SubmitReply};
pub use types::*;

use scopesync_core::SyncError;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts per export page, no backoff between them.
const EXPORT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub export_timeout: Duration,
    pub page_size: u64,
    pub export_page_size: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(10),
            export_timeout: Duration::from_secs(60),
            page_size: 10,
            export_page_size: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannerClient {
    http: reqwest::Client,
    cfg: ClientConfig,
    token: Option<String>,
}

/// Asset corpora the export endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Domain,
    Site,
}

impl ExportKind {
    fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Domain => "domain",
            ExportKind::Site => "site",
        }
    }
}

fn transient(e: reqwest::Error) -> SyncError {
    SyncError::Transient(e.to_string())
}

fn schema(e: reqwest::Error) -> SyncError {
    SyncError::Schema(e.to_string())
}

impl ScannerClient {
    pub fn new(cfg: ClientConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| SyncError::Transient(format!("client construction: {e}")))?;
        Ok(ScannerClient { http, cfg, token: None })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }

    /// Authenticate and store the session token. Any failure here is
    /// fatal for the run: there is no point syncing unauthenticated.
    pub async fn login(&mut self) -> Result<(), SyncError> {
        let resp = self
            .http
            .post(self.url("/api/user/login"))
            .json(&json!({ "username": self.cfg.username, "password": self.cfg.password }))
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;
        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("undecodable login response: {e}")))?;
        if body.code != 200 {
            return Err(SyncError::Auth(format!("login rejected with code {}", body.code)));
        }
        let token = body
            .data
            .and_then(|d| d.token)
            .ok_or_else(|| SyncError::Auth("token missing in login response".into()))?;
        self.token = Some(token);
        Ok(())
    }

    async fn page_get<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u64,
        size: u64,
    ) -> Result<Page<T>, SyncError> {
        let resp = self
            .http
            .get(self.url(path))
            .query(&[("size", size), ("page", page)])
            .header("Token", self.token())
            .send()
            .await
            .map_err(transient)?;
        if !resp.status().is_success() {
            return Err(SyncError::Transient(format!("{path} returned {}", resp.status())));
        }
        let body: PagedResponse<T> = resp.json().await.map_err(schema)?;
        Ok(Page { total: body.total, items: body.items })
    }

    pub async fn list_scopes(&self) -> Vec<AssetScope> {
        let size = self.cfg.page_size;
        collect_pages(size, |page| self.page_get("/api/asset_scope/", page, size)).await
    }

    pub async fn list_policies(&self) -> Vec<Policy> {
        let size = self.cfg.page_size;
        collect_pages(size, |page| self.page_get("/api/policy/", page, size)).await
    }

    async fn post_action(&self, path: &str, body: serde_json::Value) -> Result<ActionResponse, SyncError> {
        let resp = self
            .http
            .post(self.url(path))
            .header("Token", self.token())
            .json(&body)
            .send()
            .await
            .map_err(transient)?;
        if !resp.status().is_success() {
            return Err(SyncError::Transient(format!("{path} returned {}", resp.status())));
        }
        resp.json().await.map_err(schema)
    }

    async fn submit_members(&self, path: &str, body: serde_json::Value) -> Result<SubmitReply, SyncError> {
        let reply = self.post_action(path, body).await?;
        if reply.ok() {
            return Ok(SubmitReply::Accepted);
        }
        match reply.invalid_member() {
            Some(bad) => Ok(SubmitReply::InvalidMember(bad.to_string())),
            None => Ok(SubmitReply::Failed(
                reply.message.unwrap_or_else(|| "unknown rejection".into()),
            )),
        }
    }

    /// Create a new domain-typed scope. Returns the members the server
    /// accepted (empty when every candidate was rejected as invalid).
    pub async fn create_scope(
        &self,
        name: &str,
        members: Vec<String>,
    ) -> Result<Vec<String>, SyncError> {
        submit_with_retry(members, |batch| {
            self.submit_members(
                "/api/asset_scope/",
                json!({ "scope_type": "domain", "name": name, "scope": batch.join(",") }),
            )
        })
        .await
    }

    /// Append members to an existing scope, same rejection handling as
    /// scope creation.
    pub async fn add_to_scope(
        &self,
        scope_id: &str,
        members: Vec<String>,
    ) -> Result<Vec<String>, SyncError> {
        submit_with_retry(members, |batch| {
            self.submit_members(
                "/api/asset_scope/add/",
                json!({ "scope_id": scope_id, "scope": batch.join(",") }),
            )
        })
        .await
    }

    async fn get_with_attempts(&self, url: &str, timeout: Duration) -> Option<reqwest::Response> {
        for attempt in 1..=EXPORT_ATTEMPTS {
            match self
                .http
                .get(url)
                .header("Token", self.token())
                .timeout(timeout)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Some(resp),
                Ok(resp) => {
                    warn!(url, attempt, status = %resp.status(), "export request failed")
                }
                Err(e) => warn!(url, attempt, "export request failed: {e}"),
            }
        }
        None
    }

    /// Download the full corpus of one asset type, deduplicated across
    /// newline-delimited export pages. Pages that fail all attempts are
    /// skipped; the next run picks up whatever was missed.
    pub async fn export_assets(&self, kind: ExportKind) -> HashSet<String> {
        let mut out = HashSet::new();
        let probe = format!("{}?page=1&size=10", self.url(&format!("/api/{}/", kind.as_str())));
        let total = match self.get_with_attempts(&probe, self.cfg.timeout).await {
            Some(resp) => match resp.json::<TotalOnly>().await {
                Ok(t) => t.total,
                Err(e) => {
                    warn!("undecodable {} listing: {e}", kind.as_str());
                    return out;
                }
            },
            None => {
                warn!("could not size the {} corpus, skipping export", kind.as_str());
                return out;
            }
        };
        let size = self.cfg.export_page_size;
        let pages = total.div_ceil(size.max(1));
        for page in 1..=pages {
            let url = format!(
                "{}?size={}&page={}",
                self.url(&format!("/api/{}/export/", kind.as_str())),
                size,
                page
            );
            match self.get_with_attempts(&url, self.cfg.export_timeout).await {
                Some(resp) => match resp.text().await {
                    Ok(text) => {
                        out.extend(text.lines().filter(|l| !l.is_empty()).map(str::to_string));
                    }
                    Err(e) => warn!(page, "export body unreadable: {e}"),
                },
                None => warn!(page, "export page skipped after {EXPORT_ATTEMPTS} attempts"),
            }
        }
        debug!(kind = kind.as_str(), count = out.len(), "export complete");
        out
    }

    /// Create the policy for a group from the fixed template; returns the
    /// new policy id when the server reports one.
    pub async fn add_policy(&self, name: &str, scope_id: &str) -> Result<Option<String>, SyncError> {
        let reply = self
            .post_action("/api/policy/add/", template::policy_payload(name, scope_id))
            .await?;
        if !reply.ok() {
            return Err(SyncError::Transient(format!(
                "policy creation rejected: {}",
                reply.message.unwrap_or_default()
            )));
        }
        Ok(reply.policy_id().map(str::to_string))
    }

    pub async fn delete_policy(&self, policy_id: &str) -> Result<(), SyncError> {
        let reply = self
            .post_action("/api/policy/delete/", json!({ "policy_id": [policy_id] }))
            .await?;
        if !reply.ok() {
            return Err(SyncError::Transient(format!(
                "policy delete rejected: {}",
                reply.message.unwrap_or_default()
            )));
        }
        Ok(())
    }

    pub async fn add_scheduler(
        &self,
        scope_id: &str,
        domain: &str,
        policy_id: &str,
        interval_secs: u64,
    ) -> Result<(), SyncError> {
        let reply = self
            .post_action(
                "/api/scheduler/add/",
                json!({
                    "scope_id": scope_id,
                    "domain": domain,
                    "interval": interval_secs,
                    "policy_id": policy_id,
                    "name": "",
                }),
            )
            .await?;
        if !reply.ok() {
            return Err(SyncError::Transient(format!(
                "scheduler creation rejected: {}",
                reply.message.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Existence check keyed on the exact domain expression.
    pub async fn scheduler_exists(&self, domain: &str) -> Result<bool, SyncError> {
        let resp = self
            .http
            .get(self.url("/api/scheduler/"))
            .query(&[("domain", domain)])
            .header("Token", self.token())
            .send()
            .await
            .map_err(transient)?;
        if !resp.status().is_success() {
            return Err(SyncError::Transient(format!(
                "scheduler lookup returned {}",
                resp.status()
            )));
        }
        let body: TotalOnly = resp.json().await.map_err(schema)?;
        Ok(body.total > 0)
    }

    pub async fn add_site_monitor(&self, scope_id: &str, interval_secs: u64) -> Result<(), SyncError> {
        let reply = self
            .post_action(
                "/api/scheduler/add/site_monitor/",
                json!({ "scope_id": scope_id, "interval": interval_secs }),
            )
            .await?;
        if !reply.ok() {
            return Err(SyncError::Transient(format!(
                "site monitor creation rejected: {}",
                reply.message.unwrap_or_default()
            )));
        }
        Ok(())
    }
}
