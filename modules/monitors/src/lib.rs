//! Policy and scheduler ensurance. Both restore their invariant on
//! every run instead of remembering state: one policy per group named
//! after it, one scheduler per domain expression, one site monitor per
//! scope. Failures are logged and retried by the next run.

use scanner_api::{Policy, ScannerClient};
use scopesync_core::SyncError;
use std::collections::HashMap;
use tracing::{info, warn};

/// Name- and scope-keyed view of the policy list, built once per run.
#[derive(Debug, Default)]
pub struct PolicyIndex {
    by_name: HashMap<String, PolicyBinding>,
    by_scope: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyBinding {
    pub policy_id: String,
    pub scope_id: Option<String>,
}

impl PolicyIndex {
    pub fn build(policies: &[Policy]) -> Self {
        let mut index = PolicyIndex::default();
        for policy in policies {
            let scope_id = policy.bound_scope_id().map(str::to_string);
            if let Some(scope) = &scope_id {
                index.by_scope.insert(scope.clone(), policy.id.clone());
            }
            index.by_name.insert(
                policy.name.clone(),
                PolicyBinding { policy_id: policy.id.clone(), scope_id },
            );
        }
        index
    }

    pub fn binding(&self, name: &str) -> Option<&PolicyBinding> {
        self.by_name.get(name)
    }

    /// Policy currently bound to a scope, regardless of name.
    pub fn for_scope(&self, scope_id: &str) -> Option<&str> {
        self.by_scope.get(scope_id).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredPolicy {
    pub policy_id: Option<String>,
    pub created: bool,
}

/// What `ensure_policy` decided to do, separated from doing it so the
/// decision is testable without a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyAction {
    /// Existing policy already bound to this scope.
    Keep(String),
    /// Same name bound elsewhere: stale, delete then recreate.
    Replace(String),
    Create,
}

pub fn plan_policy(index: &PolicyIndex, name: &str, scope_id: &str) -> PolicyAction {
    match index.binding(name) {
        Some(b) if b.scope_id.as_deref() == Some(scope_id) => {
            PolicyAction::Keep(b.policy_id.clone())
        }
        Some(b) => PolicyAction::Replace(b.policy_id.clone()),
        None => PolicyAction::Create,
    }
}

pub struct PolicyManager<'a> {
    client: &'a ScannerClient,
}

impl<'a> PolicyManager<'a> {
    pub fn new(client: &'a ScannerClient) -> Self {
        PolicyManager { client }
    }

    /// Restore "one policy per group, named after it, bound to it".
    pub async fn ensure_policy(
        &self,
        name: &str,
        scope_id: &str,
        index: &PolicyIndex,
    ) -> Result<EnsuredPolicy, SyncError> {
        match plan_policy(index, name, scope_id) {
            PolicyAction::Keep(policy_id) => Ok(EnsuredPolicy {
                policy_id: Some(policy_id),
                created: false,
            }),
            PolicyAction::Replace(stale_id) => {
                info!(policy = name, "policy bound to a different scope, recreating");
                if let Err(e) = self.client.delete_policy(&stale_id).await {
                    warn!(policy = name, "stale policy delete failed: {e}");
                }
                self.create(name, scope_id).await
            }
            PolicyAction::Create => self.create(name, scope_id).await,
        }
    }

    async fn create(&self, name: &str, scope_id: &str) -> Result<EnsuredPolicy, SyncError> {
        let policy_id = self.client.add_policy(name, scope_id).await?;
        info!(policy = name, scope = scope_id, "policy created");
        Ok(EnsuredPolicy { policy_id, created: true })
    }
}

pub struct SchedulerTrigger<'a> {
    client: &'a ScannerClient,
    interval_secs: u64,
}

impl<'a> SchedulerTrigger<'a> {
    pub fn new(client: &'a ScannerClient, interval_secs: u64) -> Self {
        SchedulerTrigger { client, interval_secs }
    }

    /// Create a recurring scan for the exact domain expression unless
    /// one already exists. Returns whether a scheduler was created;
    /// failures are non-fatal monitoring gaps, picked up next run.
    pub async fn ensure_scheduler(&self, scope_id: &str, domain: &str, policy_id: &str) -> bool {
        if domain.is_empty() {
            return false;
        }
        match self.client.scheduler_exists(domain).await {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => warn!(domain, "scheduler lookup failed, attempting create: {e}"),
        }
        match self
            .client
            .add_scheduler(scope_id, domain, policy_id, self.interval_secs)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(domain, "scheduler creation failed: {e}");
                false
            }
        }
    }

    pub async fn ensure_site_monitor(&self, scope_id: &str) -> bool {
        match self.client.add_site_monitor(scope_id, self.interval_secs).await {
            Ok(()) => true,
            Err(e) => {
                warn!(scope = scope_id, "site monitor creation failed: {e}");
                false
            }
        }
    }
}
