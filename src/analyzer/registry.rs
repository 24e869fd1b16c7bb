//! Detector registry: named detectors executed in registration order.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Registry                    │
//! │  - register(name, detector)  (unique names)  │
//! │  - run_all(text, config)     (isolated)      │
//! │  - list_names()                              │
//! └──────────────────────────────────────────────┘
//!                       │
//!        ┌──────────────┼──────────────┐
//!        ▼              ▼              ▼
//!   hallucination   numeric ...     source
//! ```
//!
//! A detector that returns an error or panics is reported as a low-severity
//! `schema` issue naming it; the remaining detectors still run.

use super::detectors::{
    BiasDetector, ClaimsDetector, HallucinationDetector, InconsistencyDetector,
    NumericDetector, OverconfidenceDetector, SourceDetector,
};
use super::patterns::RuleBook;
use crate::config::GuardConfig;
use crate::{Issue, IssueKind, Severity};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, warn};

/// A text analyzer producing zero or more issues.
///
/// Implementations must not mutate shared state; the same input always yields
/// the same issues.
pub trait Detector: Send + Sync {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>>;
}

impl<F> Detector for F
where
    F: Fn(&str, &GuardConfig) -> anyhow::Result<Vec<Issue>> + Send + Sync,
{
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        self(text, config)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("detector `{0}` is already registered")]
    DuplicateDetector(String),
}

struct DetectorEntry {
    name: String,
    detector: Box<dyn Detector>,
}

/// Ordered collection of detectors
#[derive(Default)]
pub struct Registry {
    entries: Vec<DetectorEntry>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a detector. Names must be unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        detector: impl Detector + 'static,
    ) -> Result<(), RegistryError> {
        self.register_boxed(name, Box::new(detector))
    }

    pub fn register_boxed(
        &mut self,
        name: impl Into<String>,
        detector: Box<dyn Detector>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.entries.iter().any(|e| e.name == name) {
            return Err(RegistryError::DuplicateDetector(name));
        }
        self.entries.push(DetectorEntry { name, detector });
        Ok(())
    }

    /// Run every detector in registration order and concatenate the issues.
    pub fn run_all(&self, text: &str, config: &GuardConfig) -> Vec<Issue> {
        let mut issues = Vec::new();
        for entry in &self.entries {
            let result = catch_unwind(AssertUnwindSafe(|| entry.detector.detect(text, config)));
            match result {
                Ok(Ok(found)) => {
                    debug!("Detector {} found {} issue(s)", entry.name, found.len());
                    issues.extend(found);
                }
                Ok(Err(e)) => {
                    warn!("Detector {} failed: {:#}", entry.name, e);
                    issues.push(failure_issue(&entry.name, &format!("{:#}", e)));
                }
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    warn!("Detector {} panicked: {}", entry.name, panic_msg);
                    issues.push(failure_issue(&entry.name, &panic_msg));
                }
            }
        }
        issues
    }

    /// Registered names in execution order
    pub fn list_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("detectors", &self.list_names())
            .finish()
    }
}

fn failure_issue(name: &str, error: &str) -> Issue {
    Issue::new(
        IssueKind::Schema,
        Severity::Low,
        format!("Detector {} failed: {}", name, error),
    )
}

/// Registry with every built-in detector, using the bundled rules
pub fn default_registry() -> Registry {
    registry_with_rules(RuleBook::bundled())
}

/// Registry with every built-in detector, using rules from `book`
pub fn registry_with_rules(book: &RuleBook) -> Registry {
    let detectors: Vec<(&str, Box<dyn Detector>)> = vec![
        (
            HallucinationDetector::NAME,
            Box::new(HallucinationDetector::from_book(book)),
        ),
        (
            OverconfidenceDetector::NAME,
            Box::new(OverconfidenceDetector::from_book(book)),
        ),
        (NumericDetector::NAME, Box::new(NumericDetector::new())),
        (
            InconsistencyDetector::NAME,
            Box::new(InconsistencyDetector::new()),
        ),
        (ClaimsDetector::NAME, Box::new(ClaimsDetector::from_book(book))),
        (BiasDetector::NAME, Box::new(BiasDetector::from_book(book))),
        (SourceDetector::NAME, Box::new(SourceDetector::from_book(book))),
    ];

    let mut registry = Registry::new();
    for (name, detector) in detectors {
        if let Err(e) = registry.register_boxed(name, detector) {
            warn!("{}", e);
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_issue(
        message: &'static str,
    ) -> impl Fn(&str, &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        move |_text: &str, _config: &GuardConfig| {
            Ok(vec![Issue::new(
                IssueKind::Other("test".into()),
                Severity::Low,
                message,
            )])
        }
    }

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry();
        assert_eq!(
            registry.list_names(),
            vec![
                "hallucination",
                "overconfidence",
                "numeric",
                "inconsistency",
                "claims",
                "bias",
                "source"
            ]
        );
    }

    #[test]
    fn test_run_all_preserves_registration_order() {
        let mut registry = Registry::new();
        registry.register("first", fixed_issue("one")).unwrap();
        registry.register("second", fixed_issue("two")).unwrap();

        let issues = registry.run_all("text", &GuardConfig::default());
        let messages: Vec<_> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = Registry::new();
        registry.register("dup", fixed_issue("one")).unwrap();
        let err = registry.register("dup", fixed_issue("two")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateDetector("dup".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_erroring_detector_isolated() {
        let mut registry = Registry::new();
        registry
            .register("broken", |_: &str, _: &GuardConfig| -> anyhow::Result<Vec<Issue>> {
                anyhow::bail!("boom")
            })
            .unwrap();
        registry.register("healthy", fixed_issue("still here")).unwrap();

        let issues = registry.run_all("text", &GuardConfig::default());
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::Schema);
        assert_eq!(issues[0].severity, Severity::Low);
        assert_eq!(issues[0].message, "Detector broken failed: boom");
        assert_eq!(issues[1].message, "still here");
    }

    #[test]
    fn test_panicking_detector_isolated() {
        let mut registry = Registry::new();
        registry
            .register("panics", |_: &str, _: &GuardConfig| -> anyhow::Result<Vec<Issue>> {
                panic!("detector exploded")
            })
            .unwrap();
        registry.register("healthy", fixed_issue("ok")).unwrap();

        let issues = registry.run_all("text", &GuardConfig::default());
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("Detector panics failed"));
        assert!(issues[0].message.contains("detector exploded"));
        assert_eq!(issues[1].message, "ok");
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.run_all("anything", &GuardConfig::default()).is_empty());
    }
}
