//! Response shapes for the scanner endpoints we consume. Envelope-level
//! fields are required; malformed items are the caller's problem to
//! skip, not ours to guess at.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub code: i64,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
}

/// Common paged listing envelope; a missing `total` is a schema error.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PagedResponse<T> {
    #[serde(default)]
    pub code: Option<i64>,
    pub total: u64,
    #[serde(default)]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetScope {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scope_array: Vec<String>,
    /// DNS records the scanner has resolved for this scope.
    #[serde(default)]
    pub items: Vec<ScopeRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopeRecord {
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub record: Vec<String>,
}

impl AssetScope {
    /// Addresses from A records, the scanner-side IP view of the scope.
    pub fn a_records(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|r| r.record_type == "A")
            .filter_map(|r| r.record.first().map(String::as_str))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub policy: PolicyBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyBody {
    #[serde(default)]
    pub scope_config: Option<ScopeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub scope_id: Option<String>,
}

impl Policy {
    /// The scope this policy is bound to, when the binding is intact.
    pub fn bound_scope_id(&self) -> Option<&str> {
        self.policy
            .scope_config
            .as_ref()
            .and_then(|s| s.scope_id.as_deref())
    }
}

/// Envelope for mutating calls. `data` stays loose because each endpoint
/// tucks a different payload in it (`scope` for the rejected member,
/// `policy_id` for policy creation).
#[derive(Debug, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ActionResponse {
    pub fn ok(&self) -> bool {
        self.code == Some(200)
    }

    pub fn invalid_member(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("scope"))
            .and_then(|v| v.as_str())
    }

    pub fn policy_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("policy_id"))
            .and_then(|v| v.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct TotalOnly {
    #[serde(default)]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paged_response_requires_total() {
        let ok: PagedResponse<AssetScope> =
            serde_json::from_str(r#"{"total": 1, "items": [{"_id":"a","name":"g"}]}"#).unwrap();
        assert_eq!(ok.total, 1);
        assert_eq!(ok.items[0].name, "g");

        let missing: Result<PagedResponse<AssetScope>, _> =
            serde_json::from_str(r#"{"items": []}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn policy_binding_is_optional_but_explicit() {
        let p: Policy = serde_json::from_str(
            r#"{"_id":"p1","name":"g","policy":{"scope_config":{"scope_id":"s1"}}}"#,
        )
        .unwrap();
        assert_eq!(p.bound_scope_id(), Some("s1"));

        let dangling: Policy =
            serde_json::from_str(r#"{"_id":"p2","name":"g","policy":{}}"#).unwrap();
        assert_eq!(dangling.bound_scope_id(), None);
    }

    #[test]
    fn action_response_surfaces_rejected_member() {
        let r: ActionResponse = serde_json::from_str(
            r#"{"code": 500, "message": "invalid", "data": {"scope": "bad.example.com"}}"#,
        )
        .unwrap();
        assert!(!r.ok());
        assert_eq!(r.invalid_member(), Some("bad.example.com"));
    }

    #[test]
    fn a_records_filter_record_type() {
        let s: AssetScope = serde_json::from_str(
            r#"{"_id":"s","name":"g","scope_array":[],
                "items":[{"type":"A","record":["10.0.0.1"]},
                         {"type":"CNAME","record":["x.example.com"]},
                         {"type":"A","record":[]}]}"#,
        )
        .unwrap();
        let ips: Vec<&str> = s.a_records().collect();
        assert_eq!(ips, vec!["10.0.0.1"]);
    }
}
