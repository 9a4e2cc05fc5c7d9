//! Admission core types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity key scoping per-request actor state: one actor per `(ip, asn)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub ip: String,
    pub asn: u32,
}

impl IdentityKey {
    pub fn new(ip: impl Into<String>, asn: u32) -> Self {
        Self { ip: ip.into(), asn }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.asn)
    }
}

/// Verdict returned per request, most lenient to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Challenge,
    Tarpit,
    Block,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Challenge => "challenge",
            Action::Tarpit => "tarpit",
            Action::Block => "block",
        }
    }

    /// True for every verdict that pushes back on the client.
    pub fn is_mitigation(&self) -> bool {
        !matches!(self, Action::Allow)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Action::Allow),
            "challenge" => Ok(Action::Challenge),
            "tarpit" => Ok(Action::Tarpit),
            "block" => Ok(Action::Block),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// Request features extracted by the transport layer.
#[derive(Debug, Clone)]
pub struct RequestFeatures {
    pub ip: String,
    pub asn: u32,
    pub user_agent: String,
    pub path: String,
    pub method: String,
    /// Set when the client carries proof of a previously passed challenge.
    pub trusted: bool,
}

impl RequestFeatures {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.ip.clone(), self.asn)
    }

    /// GET and HEAD are read-only; everything else counts as mutating.
    pub fn is_mutating_method(&self) -> bool {
        !self.method.eq_ignore_ascii_case("GET") && !self.method.eq_ignore_ascii_case("HEAD")
    }

    /// Empty or placeholder user agents carry no identity signal.
    pub fn has_blank_user_agent(&self) -> bool {
        self.user_agent.is_empty() || self.user_agent == "-"
    }
}

/// Admission verdict: the action plus the state that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub action: Action,
    pub score: f64,
    pub hits: u32,
}

impl Verdict {
    /// Fail-safe verdict for when admission state is unreachable.
    ///
    /// The embedding layer must use this instead of waving traffic through:
    /// an internal outage never results in an unauthenticated allow.
    pub fn fail_safe() -> Self {
        Self {
            action: Action::Challenge,
            score: 0.0,
            hits: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_string_round_trip() {
        for action in [Action::Allow, Action::Challenge, Action::Tarpit, Action::Block] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("banish".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_serde_uses_lowercase() {
        let json = serde_json::to_string(&Action::Tarpit).unwrap();
        assert_eq!(json, "\"tarpit\"");
        let back: Action = serde_json::from_str("\"block\"").unwrap();
        assert_eq!(back, Action::Block);
    }

    #[test]
    fn test_mutating_method_detection() {
        let mut features = RequestFeatures {
            ip: "203.0.113.9".into(),
            asn: 64496,
            user_agent: "curl/8.0".into(),
            path: "/".into(),
            method: "GET".into(),
            trusted: false,
        };
        assert!(!features.is_mutating_method());
        features.method = "head".into();
        assert!(!features.is_mutating_method());
        features.method = "POST".into();
        assert!(features.is_mutating_method());
        features.method = "DELETE".into();
        assert!(features.is_mutating_method());
    }

    #[test]
    fn test_blank_user_agent_detection() {
        let mut features = RequestFeatures {
            ip: "203.0.113.9".into(),
            asn: 64496,
            user_agent: String::new(),
            path: "/".into(),
            method: "GET".into(),
            trusted: false,
        };
        assert!(features.has_blank_user_agent());
        features.user_agent = "-".into();
        assert!(features.has_blank_user_agent());
        features.user_agent = "Mozilla/5.0".into();
        assert!(!features.has_blank_user_agent());
    }

    #[test]
    fn test_fail_safe_never_allows() {
        let verdict = Verdict::fail_safe();
        assert_eq!(verdict.action, Action::Challenge);
        assert!(verdict.action.is_mitigation());
    }

    #[test]
    fn test_identity_key_display() {
        assert_eq!(IdentityKey::new("198.51.100.4", 13335).to_string(), "198.51.100.4:13335");
    }
}
