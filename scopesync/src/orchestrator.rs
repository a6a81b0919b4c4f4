//! One reconciliation pass as an explicit state machine. Every state is
//! allowed to fail on its own: the run logs, keeps whatever data it
//! has, and moves on. The only hard abort is failing to authenticate —
//! the job is cron-scheduled and self-heals on the next tick.

use crate::config::Settings;
use anyhow::{Context, Result};
use inventory_sqlite::Db;
use monitors::{plan_policy, PolicyAction, PolicyIndex, PolicyManager, SchedulerTrigger};
use reconcile::{
    diff_group, match_groups, new_scope_ips, plan_inventory_group, plan_new_sites, scope_seed,
    GroupDiff, GroupMatch, SnapshotIndex,
};
use scanner_api::{AssetScope, ClientConfig, ExportKind, ScannerClient};
use scopesync_core::RunSummary;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LoadSnapshots,
    BootstrapGroups,
    RefreshSnapshots,
    ReconcileDomains,
    EnsurePolicies,
    EnsureSchedulers,
    Summarize,
    Done,
}

impl Phase {
    fn next(self) -> Phase {
        match self {
            Phase::LoadSnapshots => Phase::BootstrapGroups,
            Phase::BootstrapGroups => Phase::RefreshSnapshots,
            Phase::RefreshSnapshots => Phase::ReconcileDomains,
            Phase::ReconcileDomains => Phase::EnsurePolicies,
            Phase::EnsurePolicies => Phase::EnsureSchedulers,
            Phase::EnsureSchedulers => Phase::Summarize,
            Phase::Summarize | Phase::Done => Phase::Done,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Phase::LoadSnapshots => "load-snapshots",
            Phase::BootstrapGroups => "bootstrap-groups",
            Phase::RefreshSnapshots => "refresh-snapshots",
            Phase::ReconcileDomains => "reconcile-domains",
            Phase::EnsurePolicies => "ensure-policies",
            Phase::EnsureSchedulers => "ensure-schedulers",
            Phase::Summarize => "summarize",
            Phase::Done => "done",
        }
    }
}

struct Orchestrator<'a> {
    settings: &'a Settings,
    dry_run: bool,
    db: Db,
    client: ScannerClient,
    index: SnapshotIndex,
    scopes: HashMap<String, AssetScope>,
    policies: PolicyIndex,
    matches: GroupMatch,
    summary: RunSummary,
}

/// Run one full pass. `Init` happens here: store open and login, the
/// only place a failure aborts instead of degrading.
pub async fn run(settings: &Settings, dry_run: bool) -> Result<RunSummary> {
    let db = Db::open_or_create(&settings.db_path)
        .with_context(|| format!("opening inventory store {}", settings.db_path.display()))?;
    let mut client = ScannerClient::new(client_config(settings))?;
    client.login().await.context("scanner login")?;
    info!("phase init: authenticated against {}", settings.base_url);

    let mut orch = Orchestrator {
        settings,
        dry_run,
        db,
        client,
        index: SnapshotIndex::default(),
        scopes: HashMap::new(),
        policies: PolicyIndex::default(),
        matches: GroupMatch::default(),
        summary: RunSummary::default(),
    };

    let mut phase = Phase::LoadSnapshots;
    while phase != Phase::Done {
        if let Err(e) = orch.step(phase).await {
            warn!("phase {} failed, continuing with partial data: {e:#}", phase.name());
        }
        phase = phase.next();
    }
    Ok(orch.summary)
}

fn client_config(settings: &Settings) -> ClientConfig {
    let mut cfg = ClientConfig::new(
        settings.base_url.clone(),
        settings.username.clone(),
        settings.password.clone(),
    );
    cfg.timeout = Duration::from_millis(settings.timeout_ms);
    cfg.export_timeout = Duration::from_millis(settings.export_timeout_ms);
    cfg.page_size = settings.page_size;
    cfg.export_page_size = settings.export_page_size;
    cfg
}

impl Orchestrator<'_> {
    async fn step(&mut self, phase: Phase) -> Result<()> {
        info!("phase {}", phase.name());
        match phase {
            Phase::LoadSnapshots | Phase::RefreshSnapshots => self.load_snapshots().await,
            Phase::BootstrapGroups => self.bootstrap_groups().await,
            Phase::ReconcileDomains => self.reconcile_domains().await,
            Phase::EnsurePolicies => self.ensure_policies().await,
            Phase::EnsureSchedulers => self.ensure_schedulers().await,
            Phase::Summarize => {
                self.summary.anomalies += self.index.referential_anomalies;
                self.summarize();
                Ok(())
            }
            Phase::Done => Ok(()),
        }
    }

    /// Both sides read in full; everything downstream works off these
    /// snapshots, so this is also the explicit refresh step after
    /// mutations.
    async fn load_snapshots(&mut self) -> Result<()> {
        let snapshot = self.db.load_snapshot(&self.settings.name_prefix)?;
        self.index = SnapshotIndex::build(&snapshot);

        let scopes = self.client.list_scopes().await;
        let scanner_names: HashSet<String> = scopes.iter().map(|s| s.name.clone()).collect();
        self.scopes = scopes.into_iter().map(|s| (s.name.clone(), s)).collect();

        self.policies = PolicyIndex::build(&self.client.list_policies().await);
        self.matches = match_groups(&self.index.business_names(), &scanner_names);
        debug!(
            inventory_only = self.matches.inventory_only.len(),
            scanner_only = self.matches.scanner_only.len(),
            matched = self.matches.matched.len(),
            "group correspondence computed"
        );
        Ok(())
    }

    /// Create the missing group on each side: inventory-only businesses
    /// become scopes (roots seeded before subs), scanner-only scopes
    /// become businesses with their member array partitioned into roots
    /// and subs.
    async fn bootstrap_groups(&mut self) -> Result<()> {
        for name in self.matches.inventory_only.clone() {
            let Some(view) = self.index.group(&name) else { continue };
            let seed = scope_seed(view);
            if seed.is_empty() {
                debug!(group = %name, "nothing to seed, scope not created");
                continue;
            }
            if self.dry_run {
                info!(group = %name, members = seed.len(), "dry-run: would create scope");
                self.summary.scanner_groups_created += 1;
                continue;
            }
            match self.client.create_scope(&name, seed).await {
                Ok(accepted) if accepted.is_empty() => {
                    warn!(group = %name, "every seed member was rejected, scope skipped");
                }
                Ok(accepted) => {
                    info!(group = %name, members = accepted.len(), "scope created");
                    self.summary.scanner_groups_created += 1;
                }
                Err(e) => warn!(group = %name, "scope creation failed: {e}"),
            }
        }

        for name in self.matches.scanner_only.clone() {
            let Some(scope) = self.scopes.get(&name) else { continue };
            let plan = plan_inventory_group(scope);
            if self.dry_run {
                info!(
                    group = %name,
                    roots = plan.roots.len(),
                    subs = plan.subs.len(),
                    "dry-run: would create business"
                );
                self.summary.inventory_groups_created += 1;
                continue;
            }
            let (business_id, created) = self.db.ensure_business(&plan.business)?;
            if created {
                self.summary.inventory_groups_created += 1;
            }
            self.db.insert_root_domains(&plan.root_rows(&business_id))?;
            let db = &self.db;
            let subs = plan.sub_rows(&business_id, &|apex| {
                db.root_domain_id(apex).ok().flatten()
            });
            self.db.insert_sub_domains(&subs)?;
            info!(group = %name, roots = plan.roots.len(), subs = subs.len(), "business created");
        }
        Ok(())
    }

    /// The core pass: one full-corpus export, a pure diff per matched
    /// group, scanner writes fanned out under a bounded worker pool,
    /// inventory writes batched per group afterwards.
    async fn reconcile_domains(&mut self) -> Result<()> {
        if self.matches.matched.is_empty() {
            debug!("no matched groups, nothing to reconcile");
            return Ok(());
        }
        let export = self.client.export_assets(ExportKind::Domain).await;

        let mut diffs: Vec<GroupDiff> = Vec::new();
        for name in &self.matches.matched {
            let (Some(view), Some(scope)) = (self.index.group(name), self.scopes.get(name))
            else {
                continue;
            };
            let diff = diff_group(view, scope, &export);
            if !diff.is_empty() || !diff.anomalies.is_empty() {
                diffs.push(diff);
            }
        }

        // scanner side first, concurrently per group; each accepted
        // member starts monitoring right away instead of waiting a tick
        let sem = Arc::new(Semaphore::new(self.settings.group_concurrency.max(1)));
        let mut handles = Vec::new();
        for diff in &diffs {
            if diff.to_scanner.is_empty() {
                continue;
            }
            if self.dry_run {
                info!(
                    group = %diff.group_name,
                    members = diff.to_scanner.len(),
                    "dry-run: would push members to scanner"
                );
                self.summary.domains_to_scanner += diff.to_scanner.len();
                continue;
            }
            let permit = sem.clone().acquire_owned().await.unwrap();
            let client = self.client.clone();
            let scope_id = diff.scope_id.clone();
            let group = diff.group_name.clone();
            let members = diff.to_scanner.clone();
            let policy_id = self.policies.for_scope(&diff.scope_id).map(str::to_string);
            let interval = self.settings.scheduler_interval_secs;
            handles.push(tokio::spawn(async move {
                let r = push_group(client, group, scope_id, members, policy_id, interval).await;
                drop(permit);
                r
            }));
        }
        for h in handles {
            if let Ok((accepted, schedulers)) = h.await {
                self.summary.domains_to_scanner += accepted;
                self.summary.schedulers_created += schedulers;
            }
        }

        // inventory side, serial and batched per group
        for diff in &diffs {
            self.summary.anomalies += diff.anomalies.len();
            if diff.to_inventory.is_empty() {
                continue;
            }
            if self.dry_run {
                info!(
                    group = %diff.group_name,
                    subs = diff.to_inventory.len(),
                    "dry-run: would insert sub-domains"
                );
                self.summary.domains_to_inventory += diff.to_inventory.len();
                continue;
            }
            match self.db.insert_sub_domains(&diff.to_inventory) {
                Ok(n) => self.summary.domains_to_inventory += n,
                Err(e) => warn!(group = %diff.group_name, "sub-domain batch failed: {e}"),
            }
        }

        self.sync_ips()?;
        self.sync_sites().await?;
        Ok(())
    }

    /// Scanner-resolved A records into the inventory, per matched group.
    fn sync_ips(&mut self) -> Result<()> {
        for name in &self.matches.matched {
            let (Some(view), Some(scope)) = (self.index.group(name), self.scopes.get(name))
            else {
                continue;
            };
            let ips = new_scope_ips(view, scope);
            if ips.is_empty() {
                continue;
            }
            if self.dry_run {
                info!(group = %name, ips = ips.len(), "dry-run: would insert addresses");
                self.summary.ips_to_inventory += ips.len();
                continue;
            }
            match self.db.insert_ips(&ips) {
                Ok(n) => self.summary.ips_to_inventory += n,
                Err(e) => warn!(group = %name, "address batch failed: {e}"),
            }
        }
        Ok(())
    }

    /// Site-corpus export into the inventory, bound via the domain
    /// hierarchy.
    async fn sync_sites(&mut self) -> Result<()> {
        let export = self.client.export_assets(ExportKind::Site).await;
        if export.is_empty() {
            return Ok(());
        }
        let (sites, skipped) = plan_new_sites(&export, &self.index);
        if skipped > 0 {
            debug!(skipped, "site urls outside the inventory were ignored");
        }
        if sites.is_empty() {
            return Ok(());
        }
        if self.dry_run {
            info!(sites = sites.len(), "dry-run: would insert sites");
            self.summary.sites_to_inventory += sites.len();
            return Ok(());
        }
        self.summary.sites_to_inventory += self.db.insert_sites(&sites)?;
        Ok(())
    }

    /// Restore the one-policy-per-scope invariant across every scope.
    async fn ensure_policies(&mut self) -> Result<()> {
        let manager = PolicyManager::new(&self.client);
        for scope in self.scopes.values() {
            if self.dry_run {
                if !matches!(
                    plan_policy(&self.policies, &scope.name, &scope.id),
                    PolicyAction::Keep(_)
                ) {
                    info!(group = %scope.name, "dry-run: would (re)create policy");
                    self.summary.policies_created += 1;
                }
                continue;
            }
            match manager.ensure_policy(&scope.name, &scope.id, &self.policies).await {
                Ok(ensured) if ensured.created => self.summary.policies_created += 1,
                Ok(_) => {}
                Err(e) => warn!(group = %scope.name, "policy ensure failed: {e}"),
            }
        }
        Ok(())
    }

    /// Recurring monitoring per scope: one domain scheduler keyed on the
    /// scope's full member expression, plus the independent site
    /// monitor. Scopes and policies are re-listed first so groups and
    /// policies created earlier in this run are covered.
    async fn ensure_schedulers(&mut self) -> Result<()> {
        if !self.dry_run {
            let scopes = self.client.list_scopes().await;
            self.scopes = scopes.into_iter().map(|s| (s.name.clone(), s)).collect();
            self.policies = PolicyIndex::build(&self.client.list_policies().await);
        }
        let trigger = SchedulerTrigger::new(&self.client, self.settings.scheduler_interval_secs);
        let mut created = 0;
        for scope in self.scopes.values() {
            let Some(policy_id) = self.policies.for_scope(&scope.id) else {
                warn!(group = %scope.name, "no policy bound to scope, scheduler skipped");
                continue;
            };
            if self.dry_run {
                debug!(group = %scope.name, "dry-run: would ensure scheduler and site monitor");
                continue;
            }
            let domain = scope.scope_array.join(",");
            if trigger.ensure_scheduler(&scope.id, &domain, policy_id).await {
                created += 1;
            }
            trigger.ensure_site_monitor(&scope.id).await;
        }
        self.summary.schedulers_created += created;
        Ok(())
    }

    fn summarize(&self) {
        let s = &self.summary;
        info!("scanner groups created: {}", s.scanner_groups_created);
        info!("inventory groups created: {}", s.inventory_groups_created);
        info!("domains pushed to scanner: {}", s.domains_to_scanner);
        info!("domains pulled into inventory: {}", s.domains_to_inventory);
        info!("addresses pulled into inventory: {}", s.ips_to_inventory);
        info!("sites pulled into inventory: {}", s.sites_to_inventory);
        info!("policies created: {}", s.policies_created);
        info!("schedulers created: {}", s.schedulers_created);
        if s.anomalies > 0 {
            warn!("anomalies this run: {}", s.anomalies);
        }
    }
}

/// Push one group's missing members, then start monitoring for whatever
/// the server accepted. Runs inside the worker pool; returns
/// (accepted members, schedulers created).
async fn push_group(
    client: ScannerClient,
    group: String,
    scope_id: String,
    members: Vec<String>,
    policy_id: Option<String>,
    interval_secs: u64,
) -> (usize, usize) {
    let accepted = match client.add_to_scope(&scope_id, members).await {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!(group = %group, "member push failed: {e}");
            return (0, 0);
        }
    };
    if accepted.is_empty() {
        return (0, 0);
    }
    info!(group = %group, members = accepted.len(), "members pushed to scanner");

    let Some(policy_id) = policy_id else {
        debug!(group = %group, "no policy bound yet, monitoring starts after policy ensure");
        return (accepted.len(), 0);
    };
    let trigger = SchedulerTrigger::new(&client, interval_secs);
    let mut created = 0;
    for domain in &accepted {
        if trigger.ensure_scheduler(&scope_id, domain, &policy_id).await {
            created += 1;
        }
    }
    (accepted.len(), created)
}
