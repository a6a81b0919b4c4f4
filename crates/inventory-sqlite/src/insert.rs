use crate::open::{new_id, now_ts};
use crate::{Db, NewBusiness, NewIp, NewRootDomain, NewSite, NewSubDomain};
use anyhow::Result;
use rusqlite::{params, OptionalExtension};

impl Db {
    /// Insert the business if its name is unknown; returns the id either
    /// way, plus whether a row was written.
    pub fn ensure_business(&self, nb: &NewBusiness) -> Result<(String, bool)> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT business_id FROM business WHERE name=?",
                [&nb.name],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok((id, false));
        }
        let id = new_id();
        let ts = now_ts();
        self.conn.execute(
            "INSERT INTO business(business_id,name,company_names_json,url,notes,created_at,updated_at) VALUES (?,?,?,?,?,?,?)",
            params![
                id,
                nb.name,
                serde_json::to_string(&nb.company_names)?,
                nb.url,
                nb.notes,
                ts,
                ts
            ],
        )?;
        Ok((id, true))
    }

    pub fn insert_root_domains(&self, batch: &[NewRootDomain]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO root_domain(root_domain_id,name,icp_reg,business_id,notes,created_at,updated_at)
                 VALUES (?,?,?,?,?,?,?) ON CONFLICT(name) DO NOTHING",
            )?;
            for d in batch {
                let ts = now_ts();
                written += stmt.execute(params![
                    new_id(),
                    d.name,
                    d.icp_reg,
                    d.business_id,
                    d.notes,
                    ts,
                    ts
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn insert_sub_domains(&self, batch: &[NewSubDomain]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sub_domain(sub_domain_id,name,icp_reg,root_domain_id,business_id,notes,created_at,updated_at)
                 VALUES (?,?,?,?,?,?,?,?) ON CONFLICT(name) DO NOTHING",
            )?;
            for d in batch {
                let ts = now_ts();
                written += stmt.execute(params![
                    new_id(),
                    d.name,
                    d.icp_reg,
                    d.root_domain_id,
                    d.business_id,
                    d.notes,
                    ts,
                    ts
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn insert_ips(&self, batch: &[NewIp]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ip(ip_id,address,business_id,notes,created_at,updated_at)
                 VALUES (?,?,?,?,?,?) ON CONFLICT(business_id,address) DO NOTHING",
            )?;
            for ip in batch {
                let ts = now_ts();
                written += stmt.execute(params![
                    new_id(),
                    ip.address,
                    ip.business_id,
                    ip.notes,
                    ts,
                    ts
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn insert_sites(&self, batch: &[NewSite]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO site(site_id,url,hostname,business_id,root_domain_id,sub_domain_id,notes,created_at,updated_at)
                 VALUES (?,?,?,?,?,?,?,?,?) ON CONFLICT(url) DO NOTHING",
            )?;
            for s in batch {
                let ts = now_ts();
                written += stmt.execute(params![
                    new_id(),
                    s.url,
                    s.hostname,
                    s.business_id,
                    s.root_domain_id,
                    s.sub_domain_id,
                    s.notes,
                    ts,
                    ts
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Db) -> String {
        let (id, created) = db
            .ensure_business(&NewBusiness {
                name: "internal-teamA".into(),
                company_names: vec!["Team A Holdings".into()],
                url: None,
                notes: None,
            })
            .unwrap();
        assert!(created);
        id
    }

    #[test]
    fn ensure_business_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        let id = seed(&db);
        let (again, created) = db
            .ensure_business(&NewBusiness {
                name: "internal-teamA".into(),
                company_names: vec![],
                url: None,
                notes: None,
            })
            .unwrap();
        assert_eq!(id, again);
        assert!(!created);
    }

    #[test]
    fn conflicting_names_are_skipped_not_duplicated() {
        let db = Db::open_in_memory().unwrap();
        let bid = seed(&db);
        let root = NewRootDomain {
            name: "example.com".into(),
            icp_reg: None,
            business_id: bid.clone(),
            notes: None,
        };
        assert_eq!(db.insert_root_domains(&[root.clone()]).unwrap(), 1);
        assert_eq!(db.insert_root_domains(&[root]).unwrap(), 0);

        let sub = NewSubDomain {
            name: "api.example.com".into(),
            icp_reg: None,
            root_domain_id: None,
            business_id: bid,
            notes: Some("from scanner".into()),
        };
        assert_eq!(db.insert_sub_domains(&[sub.clone(), sub]).unwrap(), 1);
    }
}
