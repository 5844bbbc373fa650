//! Prefix key enumeration over stores that cannot search keys.
//!
//! The flat store has no pattern search, and it may prefix physical keys with a
//! namespace nobody told us about. A trailing-wildcard pattern is therefore
//! answered by running one `LIKE` query per plausible physical prefix against the
//! store's table, mapping each row back to a logical key and dropping anything
//! that does not start with the requested prefix.

use std::collections::HashSet;

use crate::log::CacheLog;
use crate::store::{escape_like, FlatStore};

/// Namespace Keyv-style stores apply when none is configured.
const DEFAULT_NAMESPACE: &str = "keyv";

// == Pattern Kind ==
/// How a `keys` pattern is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind<'a> {
    /// Empty or a bare `*`: a full-store scan is refused.
    Refused,
    /// No wildcard: a single existence check.
    Exact(&'a str),
    /// Trailing `*`: everything starting with the prefix.
    Prefix(&'a str),
    /// A wildcard anywhere but the end.
    Unsupported,
}

impl<'a> PatternKind<'a> {
    pub fn classify(pattern: &'a str) -> Self {
        if pattern.is_empty() || pattern == "*" {
            return PatternKind::Refused;
        }
        match pattern.find('*') {
            None => PatternKind::Exact(pattern),
            Some(i) if i == pattern.len() - 1 => PatternKind::Prefix(&pattern[..i]),
            Some(_) => PatternKind::Unsupported,
        }
    }
}

// == Key Scanner ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScanner {
    /// Quoted `"schema"."table"`
    table: String,
    /// Physical key prefixes the store may apply, longest first
    conventions: Vec<String>,
}

impl Default for KeyScanner {
    fn default() -> Self {
        Self::new("public", DEFAULT_NAMESPACE, None)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl KeyScanner {
    /// Scanner for rows in `schema.table`, written by a store using `namespace`.
    pub fn new(schema: &str, table: &str, namespace: Option<&str>) -> Self {
        let mut conventions = vec![String::new()];
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            conventions.push(format!("{}:", ns));
            // "keyv:keyv:" would swallow logical keys that start with "keyv:"
            if ns != DEFAULT_NAMESPACE {
                conventions.push(format!("{}:{}:", DEFAULT_NAMESPACE, ns));
            }
        }
        conventions.push(format!("{}:", DEFAULT_NAMESPACE));

        let mut seen = HashSet::new();
        conventions.retain(|c| seen.insert(c.clone()));
        conventions.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            table: format!("{}.{}", quote_ident(schema), quote_ident(table)),
            conventions,
        }
    }

    /// Physical prefixes tried, longest first.
    pub fn conventions(&self) -> &[String] {
        &self.conventions
    }

    pub fn sql(&self) -> String {
        format!("SELECT key FROM {} WHERE key LIKE $1", self.table)
    }

    /// `LIKE` patterns for a logical `prefix`, one per convention.
    pub fn candidate_patterns(&self, prefix: &str) -> Vec<String> {
        let prefix = escape_like(prefix);
        self.conventions
            .iter()
            .map(|c| format!("{}{}%", escape_like(c), prefix))
            .collect()
    }

    /// Logical key of a physical row key, if it falls under `prefix`.
    ///
    /// Only the longest matching convention is stripped.
    pub fn recover(&self, raw_key: &str, prefix: &str) -> Option<String> {
        let logical = self
            .conventions
            .iter()
            .find_map(|c| raw_key.strip_prefix(c.as_str()))?;
        logical.starts_with(prefix).then(|| logical.to_string())
    }

    // == Scan ==
    pub async fn scan(
        &self,
        store: &dyn FlatStore,
        log: &dyn CacheLog,
        pattern: &str,
    ) -> Vec<String> {
        let prefix = match PatternKind::classify(pattern) {
            PatternKind::Refused => {
                log.warn("keys", "Refusing to scan the whole store; give a prefix");
                return Vec::new();
            }
            PatternKind::Unsupported => {
                log.warn(
                    "keys",
                    &format!("Unsupported pattern {}: only a trailing * is supported", pattern),
                );
                return Vec::new();
            }
            PatternKind::Exact(key) => {
                return match store.get(key).await {
                    Ok(Some(_)) => vec![key.to_string()],
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        log.error("keys", &format!("Failed to check key {}: {}", key, e));
                        Vec::new()
                    }
                };
            }
            PatternKind::Prefix(prefix) => prefix,
        };

        let Some(query) = store.raw_query() else {
            log.warn("keys", "Store has no raw query access; prefix scan unsupported");
            return Vec::new();
        };

        let sql = self.sql();
        let mut found = HashSet::new();
        for candidate in self.candidate_patterns(prefix) {
            let rows = match query.query(&sql, &[candidate.clone()]).await {
                Ok(rows) => rows,
                Err(e) => {
                    log.warn("keys", &format!("Scan with {} failed, skipping: {}", candidate, e));
                    continue;
                }
            };
            found.extend(rows.iter().filter_map(|row| self.recover(&row.key, prefix)));
        }
        found.into_iter().collect()
    }
}
