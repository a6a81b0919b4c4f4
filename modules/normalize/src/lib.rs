//! Canonicalization and classification of domain/IP strings.
//!
//! Everything the engine compares or writes goes through here first, so
//! both sides of the sync agree on one canonical form.

use regex::Regex;
use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

/// Widest suffix window tried when resolving a name to a known root.
/// Covers multi-part public suffixes without a full suffix table.
const MAX_SUFFIX_LABELS: usize = 4;

/// Classification of a canonicalized asset string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// Name equals a known root domain.
    RootDomain,
    /// Name resolves to exactly one known root by suffix match.
    SubDomain { root: String },
    /// IP literal or blacklisted; never synced as a domain.
    Excluded,
    /// No known root matches. Reported by callers, never inserted.
    Anomaly,
}

impl Kind {
    pub fn is_excluded(&self) -> bool {
        matches!(self, Kind::Excluded)
    }
}

/// Lowercase, strip surrounding dots, strip a trailing `:port`.
/// Idempotent: canonicalizing a canonical value returns it unchanged.
pub fn canonicalize(raw: &str) -> String {
    let mut s = raw.trim().to_ascii_lowercase();
    if let Some(idx) = s.rfind(':') {
        let tail = &s[idx + 1..];
        if !tail.is_empty()
            && tail.bytes().all(|b| b.is_ascii_digit())
            && !s[..idx].contains(':')
        {
            s.truncate(idx);
        }
    }
    s.trim_matches('.').to_string()
}

/// True for IPv4 or IPv6 literals.
pub fn is_ip_literal(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok() || s.parse::<Ipv6Addr>().is_ok()
}

/// Last-two-label apex extraction, used only when bootstrapping a group
/// whose roots are not known yet.
pub fn registrable_suffix(domain: &str) -> Option<String> {
    static APEX: OnceLock<Regex> = OnceLock::new();
    let re = APEX.get_or_init(|| Regex::new(r"[\w-]+\.[\w-]+$").unwrap());
    re.find(&canonicalize(domain)).map(|m| m.as_str().to_string())
}

/// Classifier over a known-root set and the applicable blacklist.
#[derive(Debug, Clone)]
pub struct Normalizer {
    roots: HashSet<String>,
    blacklist: HashSet<String>,
}

impl Normalizer {
    pub fn new<I, J>(roots: I, blacklist: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        Normalizer {
            roots: roots.into_iter().map(|r| canonicalize(r.as_ref())).collect(),
            blacklist: blacklist
                .into_iter()
                .map(|b| canonicalize(b.as_ref()))
                .collect(),
        }
    }

    /// Canonicalize and classify one raw string.
    pub fn classify(&self, raw: &str) -> (String, Kind) {
        let name = canonicalize(raw);
        if name.is_empty() || is_ip_literal(&name) || self.blacklist.contains(&name) {
            return (name, Kind::Excluded);
        }
        if self.roots.contains(&name) {
            return (name, Kind::RootDomain);
        }
        match self.match_root(&name) {
            Some(root) => {
                let root = root.to_string();
                (name, Kind::SubDomain { root })
            }
            None => (name, Kind::Anomaly),
        }
    }

    /// Resolve a canonical name to a known root: suffixes of the last 2
    /// up to the last 4 labels are tried in order, first hit wins.
    pub fn match_root(&self, name: &str) -> Option<&str> {
        let labels: Vec<&str> = name.split('.').collect();
        for take in 2..=MAX_SUFFIX_LABELS {
            if labels.len() < take {
                break;
            }
            let candidate = labels[labels.len() - take..].join(".");
            if let Some(root) = self.roots.get(&candidate) {
                return Some(root.as_str());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(
            ["example.com", "example.co.uk"],
            ["blocked.example.com"],
        )
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for raw in ["API.Example.COM.", "a.b.com:8080", "..x.y..", "1.2.3.4:443"] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once);
        }
    }

    #[test]
    fn canonicalize_strips_port_and_dots() {
        assert_eq!(canonicalize("API.Example.COM."), "api.example.com");
        assert_eq!(canonicalize("a.example.com:8443"), "a.example.com");
        assert_eq!(canonicalize("::1"), "::1");
    }

    #[test]
    fn ip_shaped_input_is_excluded() {
        let n = normalizer();
        assert_eq!(n.classify("10.0.0.1").1, Kind::Excluded);
        assert_eq!(n.classify("2001:db8::1").1, Kind::Excluded);
    }

    #[test]
    fn blacklisted_input_is_excluded() {
        let n = normalizer();
        assert_eq!(n.classify("Blocked.Example.com").1, Kind::Excluded);
    }

    #[test]
    fn known_root_classifies_as_root() {
        let n = normalizer();
        assert_eq!(n.classify("Example.COM").1, Kind::RootDomain);
    }

    #[test]
    fn suffix_window_resolves_multi_part_roots() {
        let n = normalizer();
        assert_eq!(
            n.classify("api.example.com").1,
            Kind::SubDomain { root: "example.com".into() }
        );
        // three-label root reached on the second window step
        assert_eq!(
            n.classify("portal.example.co.uk").1,
            Kind::SubDomain { root: "example.co.uk".into() }
        );
        assert_eq!(
            n.classify("deep.portal.example.co.uk").1,
            Kind::SubDomain { root: "example.co.uk".into() }
        );
    }

    #[test]
    fn unmatched_name_is_anomaly() {
        let n = normalizer();
        assert_eq!(n.classify("host.other.org").1, Kind::Anomaly);
        assert_eq!(n.classify("other.org").1, Kind::Anomaly);
    }

    #[test]
    fn registrable_suffix_extracts_apex() {
        assert_eq!(registrable_suffix("a.b.example.com"), Some("example.com".into()));
        assert_eq!(registrable_suffix("example.com"), Some("example.com".into()));
        assert_eq!(registrable_suffix("localhost"), None);
    }
}
