use crate::{
    BlacklistEntry, BlacklistKind, Business, Db, InventorySnapshot, Ip, RootDomain, Site,
    SubDomain,
};
use anyhow::Result;
use rusqlite::{params_from_iter, OptionalExtension};

fn in_clause(n: usize) -> String {
    vec!["?"; n].join(",")
}

impl Db {
    pub fn businesses_with_prefix(&self, prefix: &str) -> Result<Vec<Business>> {
        let like = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = self.conn.prepare(
            "SELECT business_id,name,company_names_json,url,notes,created_at,updated_at
             FROM business WHERE name LIKE ? ESCAPE '\\' ORDER BY name",
        )?;
        let rows = stmt.query_map([like], |r| {
            Ok(Business {
                id: r.get(0)?,
                name: r.get(1)?,
                company_names: serde_json::from_str(&r.get::<_, String>(2)?)
                    .unwrap_or_default(),
                url: r.get(3)?,
                notes: r.get(4)?,
                created_at: r.get(5)?,
                updated_at: r.get(6)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    fn root_domains_for(&self, business_ids: &[String]) -> Result<Vec<RootDomain>> {
        if business_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT root_domain_id,name,icp_reg,business_id,notes,created_at,updated_at
             FROM root_domain WHERE business_id IN ({})",
            in_clause(business_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(business_ids), |r| {
            Ok(RootDomain {
                id: r.get(0)?,
                name: r.get(1)?,
                icp_reg: r.get(2)?,
                business_id: r.get(3)?,
                notes: r.get(4)?,
                created_at: r.get(5)?,
                updated_at: r.get(6)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    fn sub_domains_for(&self, business_ids: &[String]) -> Result<Vec<SubDomain>> {
        if business_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT sub_domain_id,name,icp_reg,root_domain_id,business_id,notes,created_at,updated_at
             FROM sub_domain WHERE business_id IN ({})",
            in_clause(business_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(business_ids), |r| {
            Ok(SubDomain {
                id: r.get(0)?,
                name: r.get(1)?,
                icp_reg: r.get(2)?,
                root_domain_id: r.get(3)?,
                business_id: r.get(4)?,
                notes: r.get(5)?,
                created_at: r.get(6)?,
                updated_at: r.get(7)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    fn ips_for(&self, business_ids: &[String]) -> Result<Vec<Ip>> {
        if business_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT ip_id,address,business_id,root_domain_id,sub_domain_id,notes,created_at,updated_at
             FROM ip WHERE business_id IN ({})",
            in_clause(business_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(business_ids), |r| {
            Ok(Ip {
                id: r.get(0)?,
                address: r.get(1)?,
                business_id: r.get(2)?,
                root_domain_id: r.get(3)?,
                sub_domain_id: r.get(4)?,
                notes: r.get(5)?,
                created_at: r.get(6)?,
                updated_at: r.get(7)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    fn sites_for(&self, business_ids: &[String]) -> Result<Vec<Site>> {
        if business_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT site_id,url,hostname,business_id,root_domain_id,sub_domain_id,notes,created_at,updated_at
             FROM site WHERE business_id IN ({})",
            in_clause(business_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(business_ids), |r| {
            Ok(Site {
                id: r.get(0)?,
                url: r.get(1)?,
                hostname: r.get(2)?,
                business_id: r.get(3)?,
                root_domain_id: r.get(4)?,
                sub_domain_id: r.get(5)?,
                notes: r.get(6)?,
                created_at: r.get(7)?,
                updated_at: r.get(8)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    fn blacklist_for(&self, business_ids: &[String]) -> Result<Vec<BlacklistEntry>> {
        if business_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT blacklist_id,name,kind,business_id
             FROM blacklist WHERE business_id IN ({})",
            in_clause(business_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(business_ids), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, name, kind, business_id) = row?;
            // CHECK constraint keeps kind well-formed; skip anything else
            if let Some(kind) = BlacklistKind::parse(&kind) {
                out.push(BlacklistEntry { id, name, kind, business_id });
            }
        }
        Ok(out)
    }

    pub fn root_domain_id(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT root_domain_id FROM root_domain WHERE name=?",
                [name],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// Full read of every collection, filtered to businesses whose name
    /// starts with `prefix`.
    pub fn load_snapshot(&self, prefix: &str) -> Result<InventorySnapshot> {
        let businesses = self.businesses_with_prefix(prefix)?;
        let ids: Vec<String> = businesses.iter().map(|b| b.id.clone()).collect();
        Ok(InventorySnapshot {
            root_domains: self.root_domains_for(&ids)?,
            sub_domains: self.sub_domains_for(&ids)?,
            ips: self.ips_for(&ids)?,
            sites: self.sites_for(&ids)?,
            blacklist: self.blacklist_for(&ids)?,
            businesses,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Db, NewBusiness, NewRootDomain, NewSubDomain};

    #[test]
    fn snapshot_round_trip() {
        let db = Db::open_in_memory().unwrap();
        let (bid, _) = db
            .ensure_business(&NewBusiness {
                name: "internal-teamA".into(),
                company_names: vec![],
                url: None,
                notes: None,
            })
            .unwrap();
        let (other, _) = db
            .ensure_business(&NewBusiness {
                name: "external-teamB".into(),
                company_names: vec![],
                url: None,
                notes: None,
            })
            .unwrap();
        db.insert_root_domains(&[NewRootDomain {
            name: "example.com".into(),
            icp_reg: None,
            business_id: bid.clone(),
            notes: None,
        }])
        .unwrap();
        db.insert_root_domains(&[NewRootDomain {
            name: "other.org".into(),
            icp_reg: None,
            business_id: other,
            notes: None,
        }])
        .unwrap();
        db.insert_sub_domains(&[NewSubDomain {
            name: "api.example.com".into(),
            icp_reg: None,
            root_domain_id: None,
            business_id: bid.clone(),
            notes: None,
        }])
        .unwrap();

        let snap = db.load_snapshot("internal-").unwrap();
        assert_eq!(snap.businesses.len(), 1);
        assert_eq!(snap.businesses[0].id, bid);
        assert_eq!(snap.root_domains.len(), 1);
        assert_eq!(snap.root_domains[0].name, "example.com");
        assert_eq!(snap.sub_domains.len(), 1);

        let empty = db.load_snapshot("missing-").unwrap();
        assert!(empty.businesses.is_empty());
        assert!(empty.root_domains.is_empty());
    }
}
