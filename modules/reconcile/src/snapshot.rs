//! Owned, name-keyed indexes over one inventory snapshot. Built once
//! per run; every lookup the diff needs is a map hit, not a scan.

use inventory_sqlite::{BlacklistKind, InventorySnapshot};
use normalize::canonicalize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Identifiers behind a root-domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRef {
    pub root_domain_id: String,
    pub business_id: String,
}

/// Identifiers behind a sub-domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRef {
    pub sub_domain_id: String,
    pub root_domain_id: Option<String>,
    pub business_id: String,
}

/// Per-business view of the inventory, everything canonicalized.
#[derive(Debug, Clone, Default)]
pub struct GroupView {
    pub business_id: String,
    pub business_name: String,
    /// Root names in store order; parallel map gives their ids.
    pub root_names: Vec<String>,
    pub sub_names: Vec<String>,
    pub roots: HashMap<String, String>,
    pub blacklist_domains: HashSet<String>,
    pub blacklist_ips: HashSet<String>,
    pub blacklist_urls: HashSet<String>,
    pub ip_addresses: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct SnapshotIndex {
    groups: Vec<GroupView>,
    by_name: HashMap<String, usize>,
    pub root_refs: HashMap<String, RootRef>,
    pub sub_refs: HashMap<String, SubRef>,
    pub site_urls: HashSet<String>,
    pub blacklist_urls: HashSet<String>,
    /// Records dropped because a cross-reference resolved to nothing.
    pub referential_anomalies: usize,
}

impl SnapshotIndex {
    pub fn build(snapshot: &InventorySnapshot) -> Self {
        let mut index = SnapshotIndex::default();

        let business_ids: HashSet<&str> =
            snapshot.businesses.iter().map(|b| b.id.as_str()).collect();
        for business in &snapshot.businesses {
            index.by_name
                .insert(business.name.clone(), index.groups.len());
            index.groups.push(GroupView {
                business_id: business.id.clone(),
                business_name: business.name.clone(),
                ..Default::default()
            });
        }
        let mut view_of: HashMap<String, usize> = HashMap::new();
        for (i, g) in index.groups.iter().enumerate() {
            view_of.insert(g.business_id.clone(), i);
        }

        for root in &snapshot.root_domains {
            let Some(&slot) = view_of.get(&root.business_id) else {
                warn!(name = %root.name, "root domain references unknown business, skipped");
                index.referential_anomalies += 1;
                continue;
            };
            let name = canonicalize(&root.name);
            if name.is_empty() {
                continue;
            }
            index.root_refs.insert(
                name.clone(),
                RootRef {
                    root_domain_id: root.id.clone(),
                    business_id: root.business_id.clone(),
                },
            );
            let view = &mut index.groups[slot];
            view.roots.insert(name.clone(), root.id.clone());
            view.root_names.push(name);
        }

        let root_ids: HashSet<&str> =
            snapshot.root_domains.iter().map(|r| r.id.as_str()).collect();
        for sub in &snapshot.sub_domains {
            let Some(&slot) = view_of.get(&sub.business_id) else {
                warn!(name = %sub.name, "sub domain references unknown business, skipped");
                index.referential_anomalies += 1;
                continue;
            };
            if let Some(root_id) = sub.root_domain_id.as_deref() {
                if !root_id.is_empty() && !root_ids.contains(root_id) {
                    warn!(name = %sub.name, "sub domain references unknown root, skipped");
                    index.referential_anomalies += 1;
                    continue;
                }
            }
            let name = canonicalize(&sub.name);
            if name.is_empty() {
                continue;
            }
            index.sub_refs.insert(
                name.clone(),
                SubRef {
                    sub_domain_id: sub.id.clone(),
                    root_domain_id: sub.root_domain_id.clone().filter(|r| !r.is_empty()),
                    business_id: sub.business_id.clone(),
                },
            );
            index.groups[slot].sub_names.push(name);
        }

        for ip in &snapshot.ips {
            if let Some(&slot) = view_of.get(&ip.business_id) {
                index.groups[slot].ip_addresses.insert(ip.address.clone());
            } else {
                index.referential_anomalies += 1;
            }
        }

        for site in &snapshot.sites {
            index.site_urls.insert(site.url.clone());
            if !business_ids.contains(site.business_id.as_str()) {
                index.referential_anomalies += 1;
            }
        }

        for entry in &snapshot.blacklist {
            let Some(&slot) = view_of.get(&entry.business_id) else {
                index.referential_anomalies += 1;
                continue;
            };
            let view = &mut index.groups[slot];
            match entry.kind {
                BlacklistKind::SubDomain => {
                    view.blacklist_domains.insert(canonicalize(&entry.name));
                }
                BlacklistKind::Ip => {
                    view.blacklist_ips.insert(canonicalize(&entry.name));
                }
                BlacklistKind::Url => {
                    view.blacklist_urls.insert(entry.name.clone());
                    index.blacklist_urls.insert(entry.name.clone());
                }
            }
        }

        index
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupView> {
        self.groups.iter()
    }

    pub fn group(&self, business_name: &str) -> Option<&GroupView> {
        self.by_name.get(business_name).map(|&i| &self.groups[i])
    }

    pub fn business_names(&self) -> HashSet<String> {
        self.by_name.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_sqlite::{
        BlacklistEntry, Business, InventorySnapshot, RootDomain, SubDomain,
    };

    fn business(id: &str, name: &str) -> Business {
        Business {
            id: id.into(),
            name: name.into(),
            company_names: vec![],
            url: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn root(id: &str, name: &str, business_id: &str) -> RootDomain {
        RootDomain {
            id: id.into(),
            name: name.into(),
            icp_reg: None,
            business_id: business_id.into(),
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn sub(id: &str, name: &str, root_id: Option<&str>, business_id: &str) -> SubDomain {
        SubDomain {
            id: id.into(),
            name: name.into(),
            icp_reg: None,
            root_domain_id: root_id.map(Into::into),
            business_id: business_id.into(),
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn builds_views_and_refs() {
        let snap = InventorySnapshot {
            businesses: vec![business("b1", "internal-teamA")],
            root_domains: vec![root("r1", "Example.COM", "b1")],
            sub_domains: vec![sub("s1", "api.example.com", Some("r1"), "b1")],
            ..Default::default()
        };
        let index = SnapshotIndex::build(&snap);
        let view = index.group("internal-teamA").unwrap();
        assert_eq!(view.root_names, vec!["example.com"]);
        assert_eq!(view.roots["example.com"], "r1");
        assert_eq!(view.sub_names, vec!["api.example.com"]);
        assert_eq!(index.root_refs["example.com"].business_id, "b1");
        assert_eq!(index.referential_anomalies, 0);
    }

    #[test]
    fn dangling_references_are_dropped_and_counted() {
        let snap = InventorySnapshot {
            businesses: vec![business("b1", "internal-teamA")],
            root_domains: vec![root("r1", "example.com", "ghost")],
            sub_domains: vec![sub("s1", "api.example.com", Some("missing-root"), "b1")],
            ..Default::default()
        };
        let index = SnapshotIndex::build(&snap);
        let view = index.group("internal-teamA").unwrap();
        assert!(view.root_names.is_empty());
        assert!(view.sub_names.is_empty());
        assert_eq!(index.referential_anomalies, 2);
    }

    #[test]
    fn blacklist_is_bucketed_by_kind() {
        let snap = InventorySnapshot {
            businesses: vec![business("b1", "internal-teamA")],
            blacklist: vec![
                BlacklistEntry {
                    id: "x1".into(),
                    name: "secret.example.com".into(),
                    kind: BlacklistKind::SubDomain,
                    business_id: "b1".into(),
                },
                BlacklistEntry {
                    id: "x2".into(),
                    name: "10.0.0.9".into(),
                    kind: BlacklistKind::Ip,
                    business_id: "b1".into(),
                },
            ],
            ..Default::default()
        };
        let index = SnapshotIndex::build(&snap);
        let view = index.group("internal-teamA").unwrap();
        assert!(view.blacklist_domains.contains("secret.example.com"));
        assert!(view.blacklist_ips.contains("10.0.0.9"));
        assert!(view.blacklist_urls.is_empty());
    }
}
