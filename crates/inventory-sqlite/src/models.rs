use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub company_names: Vec<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootDomain {
    pub id: String,
    pub name: String,
    pub icp_reg: Option<String>,
    pub business_id: String,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDomain {
    pub id: String,
    pub name: String,
    pub icp_reg: Option<String>,
    pub root_domain_id: Option<String>,
    pub business_id: String,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ip {
    pub id: String,
    pub address: String,
    pub business_id: String,
    pub root_domain_id: Option<String>,
    pub sub_domain_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub url: String,
    pub hostname: Option<String>,
    pub business_id: String,
    pub root_domain_id: Option<String>,
    pub sub_domain_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistKind {
    SubDomain,
    Url,
    Ip,
}

impl BlacklistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlacklistKind::SubDomain => "sub_domain",
            BlacklistKind::Url => "url",
            BlacklistKind::Ip => "ip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sub_domain" => Some(BlacklistKind::SubDomain),
            "url" => Some(BlacklistKind::Url),
            "ip" => Some(BlacklistKind::Ip),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: String,
    pub name: String,
    pub kind: BlacklistKind,
    pub business_id: String,
}

/// Insert candidates. Identifiers and timestamps are assigned at write
/// time; every insert is skip-on-conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBusiness {
    pub name: String,
    pub company_names: Vec<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRootDomain {
    pub name: String,
    pub icp_reg: Option<String>,
    pub business_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubDomain {
    pub name: String,
    pub icp_reg: Option<String>,
    pub root_domain_id: Option<String>,
    pub business_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIp {
    pub address: String,
    pub business_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSite {
    pub url: String,
    pub hostname: Option<String>,
    pub business_id: String,
    pub root_domain_id: Option<String>,
    pub sub_domain_id: Option<String>,
    pub notes: Option<String>,
}

/// Full read of the participating slice of the store, taken once per
/// orchestrator phase that needs it.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    pub businesses: Vec<Business>,
    pub root_domains: Vec<RootDomain>,
    pub sub_domains: Vec<SubDomain>,
    pub ips: Vec<Ip>,
    pub sites: Vec<Site>,
    pub blacklist: Vec<BlacklistEntry>,
}
