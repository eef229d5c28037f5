use std::fmt;
use std::str::FromStr;

use crate::oauth::OAuthEndpoints;

pub const REST_CONTEXT: &str = "/rest/api/latest/";
pub const LEGACY_CONTEXT: &str = "/rest/api/1.0/";
pub const AGILE_CONTEXT: &str = "/rest/agile/latest/";
pub const WIKI_CONTEXT: &str = "/wiki/rest/api/latest/";

/// Versioned REST API a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    /// Jira REST API, latest version.
    Rest,
    /// Jira REST API 1.0.
    Legacy,
    /// Jira Software (agile) REST API.
    Agile,
    /// Confluence REST API.
    Wiki,
}

impl ApiFamily {
    pub const fn prefix(self) -> &'static str {
        match self {
            ApiFamily::Rest => REST_CONTEXT,
            ApiFamily::Legacy => LEGACY_CONTEXT,
            ApiFamily::Agile => AGILE_CONTEXT,
            ApiFamily::Wiki => WIKI_CONTEXT,
        }
    }

    /// Prefix a bare resource path, e.g. `issue/ABC-1`.
    pub fn route(self, resource: &str) -> String {
        format!("{}{}", self.prefix(), resource.trim_start_matches('/'))
    }
}

impl fmt::Display for ApiFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiFamily::Rest => "rest",
            ApiFamily::Legacy => "legacy",
            ApiFamily::Agile => "agile",
            ApiFamily::Wiki => "wiki",
        };
        f.write_str(name)
    }
}

impl FromStr for ApiFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rest" | "latest" => Ok(ApiFamily::Rest),
            "legacy" | "1.0" => Ok(ApiFamily::Legacy),
            "agile" => Ok(ApiFamily::Agile),
            "wiki" | "confluence" => Ok(ApiFamily::Wiki),
            other => Err(format!(
                "unknown API family '{other}' (expected rest, legacy, agile or wiki)"
            )),
        }
    }
}

/// Supported Atlassian products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Jira,
    Confluence,
}

impl Product {
    pub const fn oauth_endpoints(self) -> OAuthEndpoints {
        match self {
            Product::Jira => OAuthEndpoints::JIRA,
            Product::Confluence => OAuthEndpoints::CONFLUENCE,
        }
    }

    pub const fn default_family(self) -> ApiFamily {
        match self {
            Product::Jira => ApiFamily::Rest,
            Product::Confluence => ApiFamily::Wiki,
        }
    }
}
