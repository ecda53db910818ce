//! Checks run before anything is written.
//!
//! A commit passes through an ordered list of checks. Each check looks at
//! the session state and reports violations; the first check that reports
//! any stops the pipeline and the commit is refused.

use std::time::Instant;

use cfgdb_schema::{SchemaRegistry, ValidationReport, Violation, ViolationKind};
use cfgdb_store::ObjectStore;
use cfgdb_types::ObjectRef;
use tracing::debug;

/// What a check gets to look at.
pub struct CheckContext<'a> {
    pub registry: &'a SchemaRegistry,
    pub store: &'a ObjectStore,
    /// Objects whose content must be checked: the changed ones for a
    /// commit, every loaded object for a full check.
    pub objects: Vec<&'a ObjectRef>,
}

/// One check of the pipeline.
pub trait CommitCheck {
    fn name(&self) -> &str;

    fn run(&self, context: &CheckContext<'_>) -> ValidationReport;
}

/// Objects against their class: known fields, value types, cardinality,
/// not-null and target classes.
pub struct SchemaCheck;

impl CommitCheck for SchemaCheck {
    fn name(&self) -> &str {
        "schema"
    }

    fn run(&self, context: &CheckContext<'_>) -> ValidationReport {
        let mut report = ValidationReport::new();
        for oref in &context.objects {
            let Ok(object) = context.store.get(oref) else {
                continue;
            };
            report.objects_checked += 1;
            for violation in context.registry.check_object(oref, object.fields()) {
                report.push(violation);
            }
        }
        report
    }
}

/// Every relation of every loaded object points at a loaded object.
pub struct ReferenceCheck;

impl CommitCheck for ReferenceCheck {
    fn name(&self) -> &str {
        "references"
    }

    fn run(&self, context: &CheckContext<'_>) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.objects_checked = context.store.len();
        for (referrer, slot, target) in context.store.dangling() {
            report.push(Violation::new(
                &referrer,
                Some(&slot),
                ViolationKind::DanglingReference,
                format!("refers to {target}, which does not exist"),
            ));
        }
        report
    }
}

/// Ordered checks, fail-fast.
pub struct Validator {
    checks: Vec<Box<dyn CommitCheck>>,
}

impl Validator {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Schema check, then reference check.
    pub fn with_default_checks() -> Self {
        let mut validator = Self::new();
        validator.add_check(Box::new(SchemaCheck));
        validator.add_check(Box::new(ReferenceCheck));
        validator
    }

    pub fn add_check(&mut self, check: Box<dyn CommitCheck>) {
        self.checks.push(check);
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Run the checks in order. Returns the report of the first check that
    /// found violations as the error.
    pub fn run(&self, context: &CheckContext<'_>) -> Result<usize, ValidationReport> {
        let mut checked = 0;
        for check in &self.checks {
            let started = Instant::now();
            let report = check.run(context);
            debug!(
                check = check.name(),
                objects = report.objects_checked,
                violations = report.violations.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "check finished"
            );
            if !report.is_valid() {
                return Err(report);
            }
            checked = checked.max(report.objects_checked);
        }
        Ok(checked)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::with_default_checks()
    }
}
