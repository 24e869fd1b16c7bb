//! Rule data: the bundled rule book and regex compilation of rule records.
//!
//! Rules are data, so a broken one is never fatal: compilation failures are
//! logged and the rule is skipped, leaving the remaining rules in force.

use crate::config::RuleSpec;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{OnceLock, RwLock};
use thiserror::Error;

/// Bundled rule file, keyed by detector name
const BUNDLED_RULES: &str = include_str!("../../rules/patterns.json");

/// Upper bound on the compiled size of a single rule's regex
const RULE_SIZE_LIMIT: usize = 1 << 20;

/// Distinct custom rules remembered before the cache starts over
const CUSTOM_RULE_CACHE_LIMIT: usize = 1024;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("pattern `{pattern}` exceeds the compiled size limit")]
    PatternTooLarge { pattern: String },
}

/// A rule whose pattern compiled successfully
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub spec: RuleSpec,
    pub regex: Regex,
}

impl CompiledRule {
    /// Compile a rule record. Flags: `i` case-insensitive (default when no
    /// flags are given), `m` multi-line, `s` dot matches newline; `g`, `u`
    /// and `y` are accepted and have no effect.
    pub fn compile(spec: &RuleSpec) -> Result<Self, RuleError> {
        let flags = spec.flags.as_deref().unwrap_or("i");
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .size_limit(RULE_SIZE_LIMIT)
            .build()
            .map_err(|source| match source {
                regex::Error::CompiledTooBig(_) => RuleError::PatternTooLarge {
                    pattern: spec.pattern.clone(),
                },
                source => RuleError::InvalidPattern {
                    pattern: spec.pattern.clone(),
                    source,
                },
            })?;
        Ok(Self {
            spec: spec.clone(),
            regex,
        })
    }

    /// The rule's message, or `fallback` when the rule has none
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.spec.message.as_deref().unwrap_or(fallback)
    }
}

/// Compile every rule, skipping the ones that fail
pub fn compile_rules<'a, I>(specs: I) -> Vec<CompiledRule>
where
    I: IntoIterator<Item = &'a RuleSpec>,
{
    specs
        .into_iter()
        .filter_map(|spec| match CompiledRule::compile(spec) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::debug!("Skipping rule: {}", e);
                None
            }
        })
        .collect()
}

type CustomRuleCache = RwLock<HashMap<RuleSpec, Option<Regex>>>;

fn custom_rule_cache() -> &'static CustomRuleCache {
    static CACHE: OnceLock<CustomRuleCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Compile caller-supplied rules, reusing earlier compilations of identical
/// records. A rule that fails to compile is logged once and skipped.
pub fn compile_custom_rules(specs: &[RuleSpec]) -> Vec<CompiledRule> {
    specs
        .iter()
        .filter_map(|spec| {
            let cached = custom_rule_cache()
                .read()
                .ok()
                .and_then(|cache| cache.get(spec).cloned());
            let regex = match cached {
                Some(regex) => regex,
                None => {
                    let regex = match CompiledRule::compile(spec) {
                        Ok(rule) => Some(rule.regex),
                        Err(e) => {
                            tracing::warn!("Skipping custom rule: {}", e);
                            None
                        }
                    };
                    if let Ok(mut cache) = custom_rule_cache().write() {
                        if cache.len() >= CUSTOM_RULE_CACHE_LIMIT {
                            cache.clear();
                        }
                        cache.insert(spec.clone(), regex.clone());
                    }
                    regex
                }
            };
            regex.map(|regex| CompiledRule {
                spec: spec.clone(),
                regex,
            })
        })
        .collect()
}

/// Rule records keyed by detector name
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: BTreeMap<String, Vec<RuleSpec>>,
}

impl RuleBook {
    /// Parse a rule document: top-level arrays keyed by detector name.
    /// Entries that are not rule records are skipped.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json).context("Rule file is not a JSON object")?;
        let mut rules = BTreeMap::new();
        for (detector, entries) in raw {
            let serde_json::Value::Array(entries) = entries else {
                continue;
            };
            let specs: Vec<RuleSpec> = entries
                .into_iter()
                .filter_map(|e| serde_json::from_value(e).ok())
                .collect();
            rules.insert(detector, specs);
        }
        Ok(Self { rules })
    }

    /// Load a rule document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid rule file: {}", path.display()))
    }

    /// Load a rule document, falling back to the bundled rules on any error
    pub fn from_path_or_bundled(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(book) => book,
            Err(e) => {
                tracing::warn!("{:#}; using bundled rules", e);
                Self::bundled().clone()
            }
        }
    }

    /// The rules shipped with the crate (parsed once per process)
    pub fn bundled() -> &'static RuleBook {
        static BOOK: OnceLock<RuleBook> = OnceLock::new();
        BOOK.get_or_init(|| {
            Self::parse(BUNDLED_RULES).unwrap_or_else(|e| {
                tracing::warn!("Bundled rules unusable: {:#}", e);
                RuleBook::default()
            })
        })
    }

    /// Rule records for one detector (empty when none)
    pub fn rules_for(&self, detector: &str) -> &[RuleSpec] {
        self.rules.get(detector).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn with_rules(mut self, detector: impl Into<String>, rules: Vec<RuleSpec>) -> Self {
        self.rules.insert(detector.into(), rules);
        self
    }
}
