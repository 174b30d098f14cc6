//! Run driver: feeds compilation units through the selected tool's passes.
//!
//! Units are processed in parallel. Each unit's matches are handled in
//! order on one worker; every edit goes through the shared [`PatchStore`].
//! The first conflict aborts the run.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::adapter::ResolutionFacility;
use crate::anon::{fix_anonymous_namespace, fix_anonymous_reference, module_name};
use crate::diagnostic::DiagnosticSink;
use crate::error::NsfixError;
use crate::patch::{AddOutcome, PatchStore};
use crate::policy::ExclusionPolicy;
use crate::qualify::fix_reference;
use crate::types::SourceFile;
use crate::using::fix_using;

/// Which rewrite to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Qualify `std`/`boost` references and drop the using-statements.
    InlineNamespaces,
    /// Name anonymous namespaces after their file and qualify outside uses.
    DisambiguateSymbols,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::InlineNamespaces => write!(f, "inline-namespaces"),
            Tool::DisambiguateSymbols => write!(f, "disambiguate-symbols"),
        }
    }
}

/// Everything a pass needs to record edits for one unit.
pub struct PassContext<'a> {
    pub source: &'a SourceFile,
    pub store: &'a PatchStore,
    pub sink: &'a dyn DiagnosticSink,
    pub policy: &'a ExclusionPolicy,
}

/// Per-unit counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub file: String,
    /// Patches recorded.
    pub patched: usize,
    /// Patches identical to one already recorded.
    pub duplicates: usize,
    /// Matches that needed no edit.
    pub unchanged: usize,
}

impl UnitReport {
    fn record(&mut self, outcome: Option<AddOutcome>) {
        match outcome {
            Some(AddOutcome::Inserted) => self.patched += 1,
            Some(AddOutcome::Duplicate) => self.duplicates += 1,
            None => self.unchanged += 1,
        }
    }
}

/// Runs one tool over a set of units.
pub struct Driver<'a, F: ResolutionFacility> {
    tool: Tool,
    facility: &'a F,
    policy: &'a ExclusionPolicy,
    store: &'a PatchStore,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, F: ResolutionFacility> Driver<'a, F> {
    pub fn new(
        tool: Tool,
        facility: &'a F,
        policy: &'a ExclusionPolicy,
        store: &'a PatchStore,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Driver {
            tool,
            facility,
            policy,
            store,
            sink,
        }
    }

    /// Process every unit; stops at the first error.
    pub fn run(&self, units: &[SourceFile]) -> Result<Vec<UnitReport>, NsfixError> {
        info!(tool = %self.tool, facility = self.facility.name(), units = units.len(), "starting run");
        let reports: Vec<UnitReport> = units
            .par_iter()
            .map(|unit| self.process_unit(unit))
            .collect::<Result<_, _>>()?;
        info!(patches = self.store.len(), "run complete");
        Ok(reports)
    }

    /// Analyze one unit and record its edits.
    pub fn process_unit(&self, unit: &SourceFile) -> Result<UnitReport, NsfixError> {
        let _span = info_span!("unit", file = unit.relative_path()).entered();
        let matches = self.facility.analyze_unit(unit)?;
        let ctx = PassContext {
            source: unit,
            store: self.store,
            sink: self.sink,
            policy: self.policy,
        };
        let mut report = UnitReport {
            file: unit.relative_path().to_string(),
            ..UnitReport::default()
        };

        match self.tool {
            Tool::InlineNamespaces => {
                for reference in &matches.references {
                    report.record(fix_reference(&ctx, reference)?);
                }
                for using in &matches.usings {
                    report.record(fix_using(&ctx, using)?);
                }
            }
            Tool::DisambiguateSymbols => {
                let module = module_name(unit.relative_path());
                for anon in &matches.anon_namespaces {
                    report.record(fix_anonymous_namespace(&ctx, anon, &module)?);
                }
                for reference in &matches.anon_references {
                    report.record(fix_anonymous_reference(&ctx, reference, &module)?);
                }
            }
        }

        debug!(
            patched = report.patched,
            duplicates = report.duplicates,
            unchanged = report.unchanged,
            "unit done"
        );
        Ok(report)
    }
}
