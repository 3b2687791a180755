//! Calculation result models.
//!
//! This module contains [`DueDateCalculation`] and the [`AuditStep`] records
//! that explain how a due date was reached, so that downstream billing and
//! notice systems can show their work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
///
/// # Example
///
/// ```
/// use loan_due_date_engine::models::AuditStep;
///
/// let step = AuditStep::new(1, "initial_due_date", "Initial Due Date")
///     .with_reasoning("Loan date plus 3 Weeks");
/// assert_eq!(step.step_number, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

impl AuditStep {
    /// Starts a step with empty input and output.
    pub fn new(step_number: u32, rule_id: &str, rule_name: &str) -> Self {
        Self {
            step_number,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            input: serde_json::Value::Null,
            output: serde_json::Value::Null,
            reasoning: String::new(),
        }
    }

    /// Sets the input.
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the output.
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    /// Sets the reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// The outcome of a due-date calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateCalculation {
    /// Unique identifier of this calculation, also logged with its span.
    pub calculation_id: Uuid,
    /// The loan the due date belongs to.
    pub loan_id: String,
    /// The final due date.
    pub due_date: DateTime<Utc>,
    /// Every decision taken, in order.
    pub audit_steps: Vec<AuditStep>,
}

impl DueDateCalculation {
    /// Whether a step with `rule_id` was recorded.
    pub fn has_step(&self, rule_id: &str) -> bool {
        self.audit_steps.iter().any(|s| s.rule_id == rule_id)
    }
}
