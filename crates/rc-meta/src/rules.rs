use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system names as they appear in descriptor rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Windows,
    Osx,
    Linux,
}

impl OsName {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Osx
        } else {
            Self::Linux
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Osx => "osx",
            Self::Linux => "linux",
        }
    }

    /// Separator used when joining classpath entries
    pub fn classpath_separator(self) -> &'static str {
        match self {
            Self::Windows => ";",
            Self::Osx | Self::Linux => ":",
        }
    }
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

/// One entry of a library or argument `rules` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
}

impl PlatformRule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
            features: None,
        }
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            ..Self::allow()
        }
    }

    pub fn for_os(mut self, os: OsName) -> Self {
        self.os = Some(OsConstraint {
            name: Some(os.as_str().to_string()),
            arch: None,
        });
        self
    }

    pub fn requiring_feature(mut self, feature: &str) -> Self {
        self.features
            .get_or_insert_with(BTreeMap::new)
            .insert(feature.to_string(), true);
        self
    }

    pub fn target_os(&self) -> Option<&str> {
        self.os.as_ref().and_then(|os| os.name.as_deref())
    }

    pub fn requires_feature(&self) -> bool {
        self.features.as_ref().is_some_and(|f| !f.is_empty())
    }

    fn matches(&self, os: OsName) -> bool {
        if self.action != RuleAction::Allow || self.requires_feature() {
            return false;
        }
        self.target_os().is_none_or(|name| name == os.as_str())
    }
}

/// Whether an entry guarded by `rules` applies on `os`.
///
/// An empty list always applies. Otherwise the entry applies when any single
/// rule is an `allow` that is either unconditional or targets `os`. Rules
/// gated on a feature flag never match, and `disallow` rules never veto an
/// allow elsewhere in the list.
pub fn allows(rules: &[PlatformRule], os: OsName) -> bool {
    rules.is_empty() || rules.iter().any(|rule| rule.matches(os))
}
