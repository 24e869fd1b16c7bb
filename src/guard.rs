//! Decision helpers for gating model outputs on their trust score.
//!
//! [`validate_and_decide`] is the one-shot form. [`GuardHandler`] wraps an
//! output producer (for example a request handler calling a model) and turns
//! each produced output into a pass / block response with an HTTP-style status.

use crate::analyzer::engine::GuardError;
use crate::config::GuardConfig;
use crate::{global_engine, GuardReport};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Threshold used by [`validate_and_decide`] callers that have no preference
pub const DEFAULT_DECIDE_THRESHOLD: u8 = 70;

/// Default threshold of a [`GuardHandler`]
pub const DEFAULT_GUARD_THRESHOLD: u8 = 80;

/// Whether an output may be used, with the report that decided it
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub report: GuardReport,
}

/// Validate `output` and allow it when `score >= threshold`.
pub fn validate_and_decide(
    output: &Value,
    config: &GuardConfig,
    threshold: u8,
) -> Result<Decision, GuardError> {
    let report = global_engine().validate(output, config)?;
    Ok(Decision {
        allowed: report.score >= threshold,
        report,
    })
}

#[derive(Debug, Clone)]
pub struct GuardOptions {
    /// Minimum score for an output to pass
    pub threshold: u8,
    /// Configuration passed to the validator
    pub validate_config: GuardConfig,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GUARD_THRESHOLD,
            validate_config: GuardConfig::default(),
        }
    }
}

impl GuardOptions {
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.validate_config = config;
        self
    }
}

/// Outcome of one guarded call. Serializes to the response body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GuardResponse<T> {
    /// Score at or above the threshold
    Passed { output: T, report: GuardReport },
    /// Score below the threshold; `blocked` is always true
    Blocked { blocked: bool, report: GuardReport },
    /// The output could not be validated
    ValidatorError { error: String },
}

impl<T> GuardResponse<T> {
    pub fn status_code(&self) -> u16 {
        match self {
            GuardResponse::Passed { .. } => 200,
            GuardResponse::Blocked { .. } => 422,
            GuardResponse::ValidatorError { .. } => 500,
        }
    }

    pub fn report(&self) -> Option<&GuardReport> {
        match self {
            GuardResponse::Passed { report, .. } | GuardResponse::Blocked { report, .. } => {
                Some(report)
            }
            GuardResponse::ValidatorError { .. } => None,
        }
    }
}

/// Wraps an output producer and validates everything it produces
pub struct GuardHandler<F> {
    producer: F,
    options: GuardOptions,
}

impl<F> GuardHandler<F> {
    pub fn new(producer: F, options: GuardOptions) -> Self {
        Self { producer, options }
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    /// Run the producer for `request` and gate its output.
    ///
    /// Producer errors are returned unchanged; only validation problems are
    /// folded into the response.
    pub fn handle<Req, T, E>(&self, request: &Req) -> Result<GuardResponse<T>, E>
    where
        F: Fn(&Req) -> Result<T, E>,
        T: Serialize,
    {
        let output = (self.producer)(request)?;

        let report = match global_engine()
            .validate_serializable(&output, &self.options.validate_config)
        {
            Ok(report) => report,
            Err(e) => {
                warn!("Guarded output could not be validated: {}", e);
                return Ok(GuardResponse::ValidatorError {
                    error: format!("validator error: {}", e),
                });
            }
        };

        if report.score < self.options.threshold {
            debug!(
                "Blocking output: score {} < threshold {}",
                report.score, self.options.threshold
            );
            return Ok(GuardResponse::Blocked {
                blocked: true,
                report,
            });
        }
        Ok(GuardResponse::Passed { output, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_decide_allows_clean_output() {
        let decision = validate_and_decide(
            &json!("The meeting is at noon."),
            &GuardConfig::default(),
            DEFAULT_DECIDE_THRESHOLD,
        )
        .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.report.score, 100);
    }

    #[test]
    fn test_decide_blocks_below_threshold() {
        let text = "Studies show this is definitely guaranteed. We will reduce costs. Costs will increase.";
        let decision =
            validate_and_decide(&json!(text), &GuardConfig::default(), DEFAULT_DECIDE_THRESHOLD)
                .unwrap();
        assert!(!decision.allowed);
        assert!(decision.report.score < DEFAULT_DECIDE_THRESHOLD);
    }

    #[test]
    fn test_threshold_zero_allows_everything() {
        let text = "Obviously those terrorists and vermin are subhuman parasites.";
        let decision = validate_and_decide(&json!(text), &GuardConfig::default(), 0).unwrap();
        assert!(decision.allowed);
    }

    proptest! {
        #[test]
        fn prop_decide_matches_score(text in "[ -~]{0,120}", threshold in 0u8..=100) {
            let value = json!(text);
            let config = GuardConfig::default();
            let decision = validate_and_decide(&value, &config, threshold).unwrap();
            let report = crate::validate(&value, &config).unwrap();
            prop_assert_eq!(decision.allowed, report.score >= threshold);
        }
    }

    #[test]
    fn test_handler_passes_clean_output() {
        let handler = GuardHandler::new(
            |prompt: &String| -> Result<String, String> { Ok(format!("Echo: {}", prompt)) },
            GuardOptions::default(),
        );
        let response = handler.handle(&"hello there".to_string()).unwrap();
        assert_eq!(response.status_code(), 200);
        match response {
            GuardResponse::Passed { output, report } => {
                assert_eq!(output, "Echo: hello there");
                assert!(report.ok);
            }
            other => panic!("expected pass, got {:?}", other),
        }
    }

    #[test]
    fn test_handler_blocks_low_score() {
        let handler = GuardHandler::new(
            |_: &()| -> Result<&'static str, String> {
                Ok("Studies show it is definitely guaranteed. Sources say experts warn it.")
            },
            GuardOptions::default().with_threshold(95),
        );
        let response = handler.handle(&()).unwrap();
        assert_eq!(response.status_code(), 422);
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["blocked"], json!(true));
        assert!(body["report"]["score"].as_u64().unwrap() < 95);
        assert!(body.get("output").is_none());
    }

    #[test]
    fn test_handler_object_output_with_schema() {
        let config = GuardConfig::default().with_schema(json!({
            "type": "object",
            "required": ["answer"]
        }));
        let handler = GuardHandler::new(
            |_: &()| -> Result<Value, String> { Ok(json!({"reply": "ok"})) },
            GuardOptions::default().with_config(config),
        );
        let response = handler.handle(&()).unwrap();
        // One high schema issue: 85 >= 80
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.report().unwrap().score, 85);
    }

    #[test]
    fn test_handler_propagates_producer_error() {
        let handler = GuardHandler::new(
            |_: &()| -> Result<String, String> { Err("model unavailable".into()) },
            GuardOptions::default(),
        );
        assert_eq!(handler.handle(&()).unwrap_err(), "model unavailable");
    }

    #[test]
    fn test_handler_unserializable_output_is_validator_error() {
        let handler = GuardHandler::new(
            |_: &()| -> Result<HashMap<(u8, u8), u8>, String> {
                Ok(HashMap::from([((1, 2), 3)]))
            },
            GuardOptions::default(),
        );
        let response = handler.handle(&()).unwrap();
        assert_eq!(response.status_code(), 500);
        assert!(response.report().is_none());
    }

    #[test]
    fn test_default_options() {
        let options = GuardOptions::default();
        assert_eq!(options.threshold, 80);
        assert_eq!(options.validate_config, GuardConfig::default());
    }
}
