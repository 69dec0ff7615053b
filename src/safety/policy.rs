//! The guard policy: allow/deny decisions per call site.
//!
//! One denylist of destructive keywords is shared by every call site; the
//! call site only decides which extra keywords apply, which statement shapes
//! are accepted and whether `force` may override the denylist.

use regex::Regex;
use tracing::warn;

use crate::error::{CrewError, Result};

use super::classifier::StatementClassifier;
use super::{CallSite, Classification, StatementCategory};

/// Keywords denied on every mutating call site unless overridden.
const DESTRUCTIVE_KEYWORDS: &[&str] = &["drop", "delete", "truncate", "replace into"];

/// Extra keywords denied while creating a database from a schema script.
const SCHEMA_CREATION_KEYWORDS: &[&str] = &["alter"];

/// Leading keywords that are schema management but destructive. They pass the
/// DDL shape check and are then caught by the denylist unless forced.
const DESTRUCTIVE_DDL_LEADERS: &[&str] = &["drop"];

/// Outcome of a guard check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    /// Whether the statement may be executed.
    pub allow: bool,
    /// Human-readable reason, set when the statement is denied.
    pub reason: Option<String>,
}

impl GuardDecision {
    /// A decision allowing execution.
    pub fn allow() -> Self {
        Self {
            allow: true,
            reason: None,
        }
    }

    /// A decision denying execution for the given reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: Some(reason.into()),
        }
    }

    /// Converts a denial into a `Forbidden` error.
    pub fn into_result(self) -> Result<()> {
        if self.allow {
            Ok(())
        } else {
            Err(CrewError::forbidden(
                self.reason.unwrap_or_else(|| "statement denied".to_string()),
            ))
        }
    }
}

#[derive(Debug)]
struct DenyRule {
    keyword: &'static str,
    pattern: Regex,
}

impl DenyRule {
    fn new(keyword: &'static str) -> Self {
        // Multi-word keywords match across any run of whitespace.
        let body = keyword
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        let pattern = Regex::new(&format!(r"\b{body}\b")).expect("valid denylist pattern");
        Self { keyword, pattern }
    }
}

/// Allow/deny policy applied to every statement before execution.
#[derive(Debug)]
pub struct GuardPolicy {
    classifier: StatementClassifier,
    destructive: Vec<DenyRule>,
    schema_creation: Vec<DenyRule>,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardPolicy {
    /// Creates the policy with the built-in denylists.
    pub fn new() -> Self {
        Self {
            classifier: StatementClassifier::new(),
            destructive: DESTRUCTIVE_KEYWORDS.iter().copied().map(DenyRule::new).collect(),
            schema_creation: SCHEMA_CREATION_KEYWORDS
                .iter()
                .copied()
                .map(DenyRule::new)
                .collect(),
        }
    }

    /// Returns the keywords denied on `call_site`, in the order they are checked.
    pub fn forbidden_keywords(&self, call_site: CallSite) -> Vec<&'static str> {
        self.rules_for(call_site).map(|rule| rule.keyword).collect()
    }

    /// Classifies `sql` and applies the policy for `call_site`.
    ///
    /// Returns the classification when the statement is allowed, an
    /// `InvalidInput` error for empty input, or `Forbidden` with the denial
    /// reason.
    pub fn check(&self, sql: &str, call_site: CallSite, force: bool) -> Result<Classification> {
        let classification = self.classifier.classify(sql)?;
        let decision = self.decide(sql, &classification, call_site, force);
        if let Some(reason) = &decision.reason {
            warn!(%call_site, force, "Guard policy denied statement: {reason}");
        }
        decision.into_result()?;
        Ok(classification)
    }

    /// Decides whether an already classified statement may run on `call_site`.
    ///
    /// `force` overrides the keyword denylist on the DDL and generic call
    /// sites only; it never relaxes the statement-shape rules.
    pub fn decide(
        &self,
        sql: &str,
        classification: &Classification,
        call_site: CallSite,
        force: bool,
    ) -> GuardDecision {
        match call_site {
            CallSite::Query => {
                if classification.category != StatementCategory::Read {
                    return GuardDecision::deny(
                        "only read-only statements are allowed (SELECT, PRAGMA, EXPLAIN)",
                    );
                }
                if classification.statement_count > 1 {
                    return GuardDecision::deny(
                        "only a single read-only statement is allowed per query",
                    );
                }
                GuardDecision::allow()
            }
            CallSite::Ddl => {
                let ddl_shaped = classification.category == StatementCategory::Ddl
                    || classification.is_pragma()
                    || DESTRUCTIVE_DDL_LEADERS.contains(&classification.leading_keyword.as_str());
                if !ddl_shaped {
                    return GuardDecision::deny(
                        "only DDL statements (CREATE/ALTER/PRAGMA/etc.) are allowed by this tool",
                    );
                }
                if force {
                    return GuardDecision::allow();
                }
                self.check_keywords(sql, call_site)
            }
            CallSite::Generic => {
                if force {
                    return GuardDecision::allow();
                }
                self.check_keywords(sql, call_site)
            }
            CallSite::SchemaCreation => self.check_keywords(sql, call_site),
        }
    }

    fn check_keywords(&self, sql: &str, call_site: CallSite) -> GuardDecision {
        let normalized = sql.to_lowercase();
        match self
            .rules_for(call_site)
            .find(|rule| rule.pattern.is_match(&normalized))
        {
            Some(rule) if call_site == CallSite::SchemaCreation => GuardDecision::deny(format!(
                "the schema contains the forbidden keyword '{}'. Destructive operations are not allowed while creating a database",
                rule.keyword
            )),
            Some(rule) => GuardDecision::deny(format!(
                "the statement contains the forbidden keyword '{}'. Destructive operations are not allowed by default; use force=true only if you are sure",
                rule.keyword
            )),
            None => GuardDecision::allow(),
        }
    }

    fn rules_for(&self, call_site: CallSite) -> Box<dyn Iterator<Item = &DenyRule> + '_> {
        match call_site {
            CallSite::SchemaCreation => {
                Box::new(self.destructive.iter().chain(self.schema_creation.iter()))
            }
            CallSite::Ddl | CallSite::Generic => Box::new(self.destructive.iter()),
            CallSite::Query => Box::new(std::iter::empty()),
        }
    }
}
