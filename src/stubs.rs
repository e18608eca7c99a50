//! Minimal stub engine: JSON-declared mappings matched by method and URL.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::StartupError;
use crate::event::UrlPattern;

/// Method wildcard accepted in mapping files.
const ANY_METHOD: &str = "ANY";

fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct StubMapping {
    /// `None` or `"ANY"` matches every method
    #[serde(default)]
    pub method: Option<String>,
    /// e.g. `{"urlPathEqualTo": "/users"}` or `"anyUrl"`
    pub url: UrlPattern,
    #[serde(default)]
    pub response: StubResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StubResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for StubResponse {
    fn default() -> Self {
        Self {
            status: default_status(),
            body: String::new(),
            headers: BTreeMap::new(),
        }
    }
}

// ─── Compiled store ──────────────────────────────────────────────

enum Matcher {
    Url(String),
    Path(String),
    UrlRegex(Regex),
    PathRegex(Regex),
    Any,
}

struct CompiledStub {
    mapping: StubMapping,
    matcher: Matcher,
}

/// Mappings in declaration order; the first match wins.
pub struct StubStore {
    stubs: Vec<CompiledStub>,
}

impl StubStore {
    pub fn new(mappings: Vec<StubMapping>) -> Result<Self, StartupError> {
        let stubs = mappings
            .into_iter()
            .map(|mapping| {
                let matcher = match &mapping.url {
                    UrlPattern::UrlEqualTo(s) => Matcher::Url(s.clone()),
                    UrlPattern::UrlPathEqualTo(s) => Matcher::Path(s.clone()),
                    UrlPattern::UrlMatching(s) => Matcher::UrlRegex(full_match(s)?),
                    UrlPattern::UrlPathMatching(s) => Matcher::PathRegex(full_match(s)?),
                    UrlPattern::AnyUrl => Matcher::Any,
                };
                Ok::<_, StartupError>(CompiledStub { mapping, matcher })
            })
            .collect::<Result<Vec<_>, StartupError>>()?;
        Ok(Self { stubs })
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// First mapping accepting `method` and `url` (path plus query).
    pub fn find(&self, method: &str, url: &str) -> Option<&StubMapping> {
        let path = url.split_once('?').map_or(url, |(p, _)| p);
        self.stubs
            .iter()
            .find(|stub| {
                method_matches(stub.mapping.method.as_deref(), method)
                    && stub.matcher.matches(url, path)
            })
            .map(|stub| &stub.mapping)
    }
}

impl Matcher {
    fn matches(&self, url: &str, path: &str) -> bool {
        match self {
            Self::Url(expected) => url == expected,
            Self::Path(expected) => path == expected,
            Self::UrlRegex(re) => re.is_match(url),
            Self::PathRegex(re) => re.is_match(path),
            Self::Any => true,
        }
    }
}

fn method_matches(expected: Option<&str>, actual: &str) -> bool {
    match expected {
        None => true,
        Some(m) => m.eq_ignore_ascii_case(ANY_METHOD) || m.eq_ignore_ascii_case(actual),
    }
}

fn full_match(pattern: &str) -> Result<Regex, StartupError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| StartupError::InvalidMapping {
        pattern: pattern.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(method: Option<&str>, url: UrlPattern) -> StubMapping {
        StubMapping {
            method: method.map(str::to_owned),
            url,
            response: StubResponse::default(),
        }
    }

    #[test]
    fn test_literal_and_regex_matchers() {
        let store = StubStore::new(vec![
            stub(Some("GET"), UrlPattern::UrlPathEqualTo("/some-test".into())),
            stub(None, UrlPattern::UrlMatching("/regex-.+".into())),
            stub(None, UrlPattern::UrlEqualTo("/exact?q=1".into())),
        ])
        .unwrap();

        let hit = store.find("GET", "/some-test?withQueryParam=true").unwrap();
        assert_eq!(hit.url, UrlPattern::UrlPathEqualTo("/some-test".into()));
        assert!(store.find("POST", "/some-test").is_none());

        assert!(store.find("DELETE", "/regex-anything?x=y").is_some());
        assert!(store.find("GET", "/prefix/regex-a").is_none());

        assert!(store.find("GET", "/exact?q=1").is_some());
        assert!(store.find("GET", "/exact").is_none());
    }

    #[test]
    fn test_path_regex_ignores_query() {
        let store = StubStore::new(vec![stub(
            None,
            UrlPattern::UrlPathMatching("/some-t.+".into()),
        )])
        .unwrap();
        assert!(store.find("GET", "/some-test?withQueryParam=true").is_some());
    }

    #[test]
    fn test_first_declared_wins() {
        let store = StubStore::new(vec![
            stub(Some("ANY"), UrlPattern::AnyUrl),
            stub(None, UrlPattern::UrlPathEqualTo("/a".into())),
        ])
        .unwrap();
        assert!(store.find("PATCH", "/a").unwrap().url.is_any_url());
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let result = StubStore::new(vec![stub(None, UrlPattern::UrlMatching("/a(".into()))]);
        assert!(matches!(result, Err(StartupError::InvalidMapping { .. })));
    }

    #[test]
    fn test_mapping_from_json() {
        let mapping: StubMapping = serde_json::from_str(
            r#"{ "method": "GET", "url": { "urlPathEqualTo": "/simple-test" },
                 "response": { "status": 201, "body": "test" } }"#,
        )
        .unwrap();
        assert_eq!(mapping.url, UrlPattern::UrlPathEqualTo("/simple-test".into()));
        assert_eq!(mapping.response.status, 201);
        assert_eq!(mapping.response.body, "test");
    }
}
