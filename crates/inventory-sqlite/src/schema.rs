pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE business (
  business_id        TEXT PRIMARY KEY,
  name               TEXT NOT NULL UNIQUE,
  company_names_json TEXT NOT NULL DEFAULT '[]',
  url                TEXT,
  notes              TEXT,
  created_at         INTEGER NOT NULL,
  updated_at         INTEGER NOT NULL
);

-- Cross-references below are string-encoded identifiers, not foreign
-- keys; readers validate them against the referenced table and drop
-- records whose reference resolves to nothing.

CREATE TABLE root_domain (
  root_domain_id  TEXT PRIMARY KEY,
  name            TEXT NOT NULL UNIQUE,
  icp_reg         TEXT,
  business_id     TEXT NOT NULL,
  notes           TEXT,
  created_at      INTEGER NOT NULL,
  updated_at      INTEGER NOT NULL
);

CREATE TABLE sub_domain (
  sub_domain_id   TEXT PRIMARY KEY,
  name            TEXT NOT NULL UNIQUE,
  icp_reg         TEXT,
  root_domain_id  TEXT,
  business_id     TEXT NOT NULL,
  notes           TEXT,
  created_at      INTEGER NOT NULL,
  updated_at      INTEGER NOT NULL
);

CREATE TABLE ip (
  ip_id           TEXT PRIMARY KEY,
  address         TEXT NOT NULL,
  business_id     TEXT NOT NULL,
  root_domain_id  TEXT,
  sub_domain_id   TEXT,
  notes           TEXT,
  created_at      INTEGER NOT NULL,
  updated_at      INTEGER NOT NULL,
  UNIQUE (business_id, address)
);

CREATE TABLE site (
  site_id         TEXT PRIMARY KEY,
  url             TEXT NOT NULL UNIQUE,
  hostname        TEXT,
  business_id     TEXT NOT NULL,
  root_domain_id  TEXT,
  sub_domain_id   TEXT,
  notes           TEXT,
  created_at      INTEGER NOT NULL,
  updated_at      INTEGER NOT NULL
);

CREATE TABLE blacklist (
  blacklist_id    TEXT PRIMARY KEY,
  name            TEXT NOT NULL,
  kind            TEXT NOT NULL CHECK (kind IN ('sub_domain','url','ip')),
  business_id     TEXT NOT NULL,
  created_at      INTEGER NOT NULL,
  updated_at      INTEGER NOT NULL,
  UNIQUE (business_id, name, kind)
);

CREATE INDEX idx_root_domain_business ON root_domain(business_id);
CREATE INDEX idx_sub_domain_business ON sub_domain(business_id);
CREATE INDEX idx_sub_domain_root ON sub_domain(root_domain_id);
CREATE INDEX idx_ip_business ON ip(business_id);
CREATE INDEX idx_site_business ON site(business_id);
CREATE INDEX idx_blacklist_business ON blacklist(business_id);

COMMIT;
"#;
