//! The bidirectional set difference for one matched group, plus the IP
//! and site planning that rides along. Pure: all I/O stays with the
//! caller, so re-running on unchanged inputs yields empty diffs.

use crate::snapshot::{GroupView, SnapshotIndex};
use inventory_sqlite::{NewIp, NewSite, NewSubDomain};
use normalize::{canonicalize, Kind, Normalizer};
use scanner_api::AssetScope;
use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;
use tracing::{debug, warn};

pub const SYNC_NOTE: &str = "from scanner";

#[derive(Debug, Clone, Default)]
pub struct GroupDiff {
    pub scope_id: String,
    pub business_id: String,
    pub group_name: String,
    /// Sub-domain insert candidates, already bound to their root.
    pub to_inventory: Vec<NewSubDomain>,
    /// Members missing on the scanner side, sorted.
    pub to_scanner: Vec<String>,
    /// Names that could not be classified; logged, never inserted.
    pub anomalies: Vec<String>,
}

impl GroupDiff {
    pub fn is_empty(&self) -> bool {
        self.to_inventory.is_empty() && self.to_scanner.is_empty()
    }
}

/// Compute both directions for one business/scope pair.
///
/// `domain_export` is the full scanner corpus; entries are attributed to
/// this group only when they resolve to one of its roots.
pub fn diff_group(
    view: &GroupView,
    scope: &AssetScope,
    domain_export: &HashSet<String>,
) -> GroupDiff {
    let normalizer = Normalizer::new(view.roots.keys(), view.blacklist_domains.iter());

    let mut inventory: BTreeSet<String> = BTreeSet::new();
    for name in view.root_names.iter().chain(view.sub_names.iter()) {
        if !view.blacklist_domains.contains(name) {
            inventory.insert(name.clone());
        }
    }

    let mut scanner: BTreeSet<String> = BTreeSet::new();
    for raw in &scope.scope_array {
        let (name, kind) = normalizer.classify(raw);
        if name.is_empty() || kind.is_excluded() {
            continue;
        }
        scanner.insert(name);
    }
    for raw in domain_export {
        let (name, kind) = normalizer.classify(raw);
        // only entries that resolve to this group's roots belong here
        match kind {
            Kind::RootDomain | Kind::SubDomain { .. } => {
                scanner.insert(name);
            }
            Kind::Excluded | Kind::Anomaly => {}
        }
    }

    let mut diff = GroupDiff {
        scope_id: scope.id.clone(),
        business_id: view.business_id.clone(),
        group_name: view.business_name.clone(),
        ..Default::default()
    };

    for name in scanner.difference(&inventory) {
        match normalizer.classify(name).1 {
            Kind::SubDomain { root } => {
                let root_id = view.roots.get(&root).cloned();
                diff.to_inventory.push(NewSubDomain {
                    name: name.clone(),
                    icp_reg: None,
                    root_domain_id: root_id,
                    business_id: view.business_id.clone(),
                    notes: Some(SYNC_NOTE.into()),
                });
            }
            Kind::RootDomain => {
                // roots are synced at group bootstrap; one appearing here
                // means the sides disagree about what a root is
                warn!(group = %view.business_name, name = %name, "unexpected root domain in scanner diff");
                diff.anomalies.push(name.clone());
            }
            Kind::Anomaly => {
                debug!(group = %view.business_name, name = %name, "unclassifiable scanner member");
                diff.anomalies.push(name.clone());
            }
            Kind::Excluded => {}
        }
    }

    diff.to_scanner = inventory.difference(&scanner).cloned().collect();
    diff
}

/// Scanner-side A records not yet present in the inventory for this
/// business. IPv4 only; blacklisted addresses never come back.
pub fn new_scope_ips(view: &GroupView, scope: &AssetScope) -> Vec<NewIp> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for addr in scope.a_records() {
        let addr = canonicalize(addr);
        if addr.parse::<Ipv4Addr>().is_err() {
            continue;
        }
        if view.ip_addresses.contains(&addr)
            || view.blacklist_ips.contains(&addr)
            || !seen.insert(addr.clone())
        {
            continue;
        }
        out.push(NewIp {
            address: addr,
            business_id: view.business_id.clone(),
            notes: Some(SYNC_NOTE.into()),
        });
    }
    out
}

/// Site-corpus URLs not yet present in the inventory, bound to the
/// domain hierarchy via their host. Hosts that resolve to nothing we
/// own are skipped (counted, logged at debug).
pub fn plan_new_sites(
    site_export: &HashSet<String>,
    index: &SnapshotIndex,
) -> (Vec<NewSite>, usize) {
    let normalizer = Normalizer::new(index.root_refs.keys(), std::iter::empty::<&str>());
    let mut skipped = 0;
    let mut out = Vec::new();
    for raw in site_export {
        let raw = raw.trim();
        if raw.is_empty()
            || index.site_urls.contains(raw)
            || index.blacklist_urls.contains(raw)
        {
            continue;
        }
        let Some(host) = url::Url::parse(raw).ok().and_then(|u| u.host_str().map(canonicalize))
        else {
            skipped += 1;
            continue;
        };
        let site = if let Some(sub) = index.sub_refs.get(&host) {
            NewSite {
                url: raw.to_string(),
                hostname: Some(host),
                business_id: sub.business_id.clone(),
                root_domain_id: sub.root_domain_id.clone(),
                sub_domain_id: Some(sub.sub_domain_id.clone()),
                notes: Some(SYNC_NOTE.into()),
            }
        } else if let Some(root) = index.root_refs.get(&host) {
            NewSite {
                url: raw.to_string(),
                hostname: Some(host),
                business_id: root.business_id.clone(),
                root_domain_id: Some(root.root_domain_id.clone()),
                sub_domain_id: None,
                notes: Some(SYNC_NOTE.into()),
            }
        } else if let Some(apex) = normalizer.match_root(&host) {
            let root = &index.root_refs[apex];
            NewSite {
                url: raw.to_string(),
                hostname: Some(host),
                business_id: root.business_id.clone(),
                root_domain_id: Some(root.root_domain_id.clone()),
                sub_domain_id: None,
                notes: Some(SYNC_NOTE.into()),
            }
        } else {
            debug!(url = raw, "site host matches nothing in inventory, skipped");
            skipped += 1;
            continue;
        };
        out.push(site);
    }
    (out, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotIndex;
    use inventory_sqlite::{Business, InventorySnapshot, RootDomain, Site, SubDomain};

    fn view() -> GroupView {
        let mut v = GroupView {
            business_id: "b1".into(),
            business_name: "internal-teamA".into(),
            root_names: vec!["example.com".into()],
            sub_names: vec!["api.example.com".into()],
            ..Default::default()
        };
        v.roots.insert("example.com".into(), "r1".into());
        v
    }

    fn scope(members: &[&str]) -> AssetScope {
        AssetScope {
            id: "s1".into(),
            name: "internal-teamA".into(),
            scope_array: members.iter().map(|m| m.to_string()).collect(),
            items: Vec::new(),
        }
    }

    fn a_record(addr: &str) -> scanner_api::ScopeRecord {
        scanner_api::ScopeRecord {
            record_type: "A".into(),
            record: vec![addr.to_string()],
        }
    }

    #[test]
    fn scanner_only_member_becomes_bound_sub_domain() {
        let diff = diff_group(
            &view(),
            &scope(&["example.com", "api.example.com", "new.example.com"]),
            &HashSet::new(),
        );
        assert_eq!(diff.to_inventory.len(), 1);
        let sub = &diff.to_inventory[0];
        assert_eq!(sub.name, "new.example.com");
        assert_eq!(sub.root_domain_id.as_deref(), Some("r1"));
        assert_eq!(sub.business_id, "b1");
        assert!(diff.to_scanner.is_empty());
    }

    #[test]
    fn inventory_only_name_goes_to_scanner() {
        let mut v = view();
        v.sub_names.push("x.example.com".into());
        let diff = diff_group(&v, &scope(&["example.com", "api.example.com"]), &HashSet::new());
        assert_eq!(diff.to_scanner, vec!["x.example.com".to_string()]);
        assert!(diff.to_inventory.is_empty());
    }

    #[test]
    fn export_entries_are_attributed_by_root_suffix() {
        let export: HashSet<String> =
            ["deep.example.com", "stranger.other.org", "10.1.2.3"]
                .iter()
                .map(|s| s.to_string())
                .collect();
        let diff = diff_group(&view(), &scope(&["example.com", "api.example.com"]), &export);
        assert_eq!(diff.to_inventory.len(), 1);
        assert_eq!(diff.to_inventory[0].name, "deep.example.com");
        // the foreign entry never reaches this group's diff
        assert!(diff.anomalies.is_empty());
    }

    #[test]
    fn blacklisted_names_never_cross_in_either_direction() {
        let mut v = view();
        v.blacklist_domains.insert("secret.example.com".into());
        v.sub_names.push("secret.example.com".into());
        let diff = diff_group(
            &v,
            &scope(&["example.com", "api.example.com", "secret.example.com"]),
            &HashSet::new(),
        );
        assert!(diff.is_empty());
    }

    #[test]
    fn unclassifiable_scope_member_is_an_anomaly_not_an_insert() {
        let diff = diff_group(
            &view(),
            &scope(&["example.com", "api.example.com", "orphan.unrelated.net"]),
            &HashSet::new(),
        );
        assert!(diff.to_inventory.is_empty());
        assert_eq!(diff.anomalies, vec!["orphan.unrelated.net".to_string()]);
    }

    #[test]
    fn unchanged_inputs_diff_to_empty_twice() {
        let v = view();
        let s = scope(&["example.com", "api.example.com"]);
        let first = diff_group(&v, &s, &HashSet::new());
        let second = diff_group(&v, &s, &HashSet::new());
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn converged_sides_partition_cleanly() {
        // toInventory and toScanner are disjoint from the intersection,
        // and applying both unions converges the sides.
        let mut v = view();
        v.sub_names.push("only-inv.example.com".into());
        let s = scope(&["example.com", "api.example.com", "only-scan.example.com"]);
        let diff = diff_group(&v, &s, &HashSet::new());

        let inv: HashSet<String> = v
            .root_names
            .iter()
            .chain(v.sub_names.iter())
            .cloned()
            .collect();
        let scan: HashSet<String> =
            s.scope_array.iter().map(|m| canonicalize(m)).collect();
        let inter: HashSet<_> = inv.intersection(&scan).cloned().collect();

        for d in &diff.to_inventory {
            assert!(!inter.contains(&d.name));
        }
        for d in &diff.to_scanner {
            assert!(!inter.contains(d));
        }
        let mut inv_after = inv.clone();
        inv_after.extend(diff.to_inventory.iter().map(|d| d.name.clone()));
        let mut scan_after = scan.clone();
        scan_after.extend(diff.to_scanner.iter().cloned());
        assert_eq!(inv_after, scan_after);
    }

    #[test]
    fn new_ips_skip_known_blacklisted_and_non_ipv4() {
        let mut v = view();
        v.ip_addresses.insert("10.0.0.1".into());
        v.blacklist_ips.insert("10.0.0.2".into());
        let mut s = scope(&[]);
        s.items = vec![
            a_record("10.0.0.1"),
            a_record("10.0.0.2"),
            a_record("10.0.0.3"),
            a_record("10.0.0.3"),
            a_record("not-an-ip"),
        ];
        let ips = new_scope_ips(&v, &s);
        assert_eq!(ips.len(), 1);
        assert_eq!(ips[0].address, "10.0.0.3");
    }

    #[test]
    fn sites_bind_to_sub_then_root_then_suffix() {
        let snap = InventorySnapshot {
            businesses: vec![Business {
                id: "b1".into(),
                name: "internal-teamA".into(),
                company_names: vec![],
                url: None,
                notes: None,
                created_at: 0,
                updated_at: 0,
            }],
            root_domains: vec![RootDomain {
                id: "r1".into(),
                name: "example.com".into(),
                icp_reg: None,
                business_id: "b1".into(),
                notes: None,
                created_at: 0,
                updated_at: 0,
            }],
            sub_domains: vec![SubDomain {
                id: "s1".into(),
                name: "api.example.com".into(),
                icp_reg: None,
                root_domain_id: Some("r1".into()),
                business_id: "b1".into(),
                notes: None,
                created_at: 0,
                updated_at: 0,
            }],
            sites: vec![Site {
                id: "w1".into(),
                url: "https://known.example.com".into(),
                hostname: None,
                business_id: "b1".into(),
                root_domain_id: None,
                sub_domain_id: None,
                notes: None,
                created_at: 0,
                updated_at: 0,
            }],
            ..Default::default()
        };
        let index = SnapshotIndex::build(&snap);
        let export: HashSet<String> = [
            "https://known.example.com",
            "https://api.example.com:8443",
            "https://example.com",
            "https://fresh.example.com",
            "https://nowhere.net",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let (sites, skipped) = plan_new_sites(&export, &index);
        assert_eq!(skipped, 1);
        let by_url: std::collections::HashMap<&str, &NewSite> =
            sites.iter().map(|s| (s.url.as_str(), s)).collect();
        assert_eq!(sites.len(), 3);
        assert_eq!(
            by_url["https://api.example.com:8443"].sub_domain_id.as_deref(),
            Some("s1")
        );
        assert_eq!(
            by_url["https://example.com"].root_domain_id.as_deref(),
            Some("r1")
        );
        let fresh = by_url["https://fresh.example.com"];
        assert_eq!(fresh.root_domain_id.as_deref(), Some("r1"));
        assert_eq!(fresh.sub_domain_id, None);
    }
}
