//! Planning for groups that exist on only one side. Pure; the
//! orchestrator applies the plans.

use crate::snapshot::GroupView;
use inventory_sqlite::{NewBusiness, NewRootDomain, NewSubDomain};
use normalize::{canonicalize, is_ip_literal, registrable_suffix};
use scanner_api::AssetScope;
use std::collections::HashSet;

use crate::diff::SYNC_NOTE;

/// Which group names are missing on which side. Name equality is the
/// only correspondence key between the two stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMatch {
    pub inventory_only: Vec<String>,
    pub scanner_only: Vec<String>,
    pub matched: Vec<String>,
}

pub fn match_groups(inventory_names: &HashSet<String>, scanner_names: &HashSet<String>) -> GroupMatch {
    let mut m = GroupMatch {
        inventory_only: inventory_names.difference(scanner_names).cloned().collect(),
        scanner_only: scanner_names.difference(inventory_names).cloned().collect(),
        matched: inventory_names.intersection(scanner_names).cloned().collect(),
    };
    m.inventory_only.sort();
    m.scanner_only.sort();
    m.matched.sort();
    m
}

/// Seed members for a scope created from a business: root names first,
/// then sub names, deduplicated preserving that order.
pub fn scope_seed(view: &GroupView) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in view.root_names.iter().chain(view.sub_names.iter()) {
        let name = canonicalize(name);
        if !name.is_empty()
            && !view.blacklist_domains.contains(&name)
            && seen.insert(name.clone())
        {
            out.push(name);
        }
    }
    out
}

/// What to create in the inventory for a scope with no business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryGroupPlan {
    pub business: NewBusiness,
    pub roots: Vec<String>,
    /// Sub name plus the apex it belongs to; parentless when the whole
    /// member array had no extractable apex.
    pub subs: Vec<(String, Option<String>)>,
}

impl InventoryGroupPlan {
    pub fn root_rows(&self, business_id: &str) -> Vec<NewRootDomain> {
        self.roots
            .iter()
            .map(|name| NewRootDomain {
                name: name.clone(),
                icp_reg: None,
                business_id: business_id.to_string(),
                notes: Some(SYNC_NOTE.into()),
            })
            .collect()
    }

    pub fn sub_rows(
        &self,
        business_id: &str,
        root_id_of: &dyn Fn(&str) -> Option<String>,
    ) -> Vec<NewSubDomain> {
        self.subs
            .iter()
            .map(|(name, apex)| NewSubDomain {
                name: name.clone(),
                icp_reg: None,
                root_domain_id: apex.as_deref().and_then(root_id_of),
                business_id: business_id.to_string(),
                notes: Some(SYNC_NOTE.into()),
            })
            .collect()
    }
}

/// Partition a scanner-only scope's member array into root candidates
/// (extractable apex) and sub candidates (the remainder, bound to their
/// apex). When nothing yields an apex, the entire array is kept as
/// parentless sub-domains rather than dropped.
pub fn plan_inventory_group(scope: &AssetScope) -> InventoryGroupPlan {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    for raw in &scope.scope_array {
        let name = canonicalize(raw);
        if name.is_empty() || is_ip_literal(&name) || !seen.insert(name.clone()) {
            continue;
        }
        members.push(name);
    }

    let mut roots = Vec::new();
    let mut root_set = HashSet::new();
    for member in &members {
        if let Some(apex) = registrable_suffix(member) {
            if root_set.insert(apex.clone()) {
                roots.push(apex);
            }
        }
    }

    let subs = if roots.is_empty() {
        members.iter().map(|m| (m.clone(), None)).collect()
    } else {
        members
            .iter()
            .filter(|m| !root_set.contains(*m))
            .filter_map(|m| registrable_suffix(m).map(|apex| (m.clone(), Some(apex))))
            .collect()
    };

    InventoryGroupPlan {
        business: NewBusiness {
            name: scope.name.clone(),
            company_names: Vec::new(),
            url: None,
            notes: Some(SYNC_NOTE.into()),
        },
        roots,
        subs,
    }
}
