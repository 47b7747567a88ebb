/*
Copyright 2020 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use crate::diagnostics::formatter::TraceFormatter;
use crate::diagnostics::legend::{format_legend, strip_common_type_prefixes};
use crate::error::{Diagnostic, Severity};
use crate::graph::{BindingGraph, DependencyEdge};
use tracing::{debug, trace};

/// Collects the diagnostics of a whole processing pass in the order they
/// were reported.
#[derive(Debug, Default)]
pub struct DiagnosticReporter {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        DiagnosticReporter::default()
    }

    /// Identical diagnostics are only kept once.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.contains(&diagnostic) {
            trace!("dropping repeated diagnostic: {}", diagnostic.message);
            return;
        }
        debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn report_all(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.report(diagnostic);
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Reports what one plugin finds in one binding graph.
///
/// Everything is attached to the root component (or module) of the graph.
/// Messages have their package names shortened, with a legend appended when
/// something had to be spelled out.
pub struct GraphReporter<'a> {
    graph: &'a BindingGraph,
    reporter: &'a mut DiagnosticReporter,
    plugin: Option<String>,
    errors_as_warnings: bool,
    reported_error: bool,
}

impl<'a> GraphReporter<'a> {
    pub fn new(
        graph: &'a BindingGraph,
        reporter: &'a mut DiagnosticReporter,
        plugin: Option<&str>,
        errors_as_warnings: bool,
    ) -> Self {
        GraphReporter {
            graph,
            reporter,
            plugin: plugin.map(str::to_owned),
            errors_as_warnings,
            reported_error: false,
        }
    }

    pub fn report_component(&mut self, severity: Severity, message: &str) {
        let stripped = strip_common_type_prefixes(message);
        let text = format!("{}{}", stripped.text, format_legend(&stripped.legend));
        let mut diagnostic = Diagnostic::new(self.severity(severity), &text);
        if let Some(plugin) = &self.plugin {
            diagnostic = diagnostic.with_plugin(plugin);
        }
        self.emit(diagnostic);
    }

    /// `message` as is: no plugin prefix, no shortened names.
    pub fn report_component_verbatim(&mut self, severity: Severity, message: &str) {
        let diagnostic = Diagnostic::new(self.severity(severity), message);
        self.emit(diagnostic);
    }

    /// `message` followed by the trace from `edge` back to an entry point.
    pub fn report_dependency(&mut self, severity: Severity, edge: &DependencyEdge, message: &str) {
        let trace = TraceFormatter::new(self.graph).edge_message(edge);
        self.report_component(severity, &format!("{}{}", message, trace));
    }

    /// Whether anything reported so far is an error.
    pub fn reported_error(&self) -> bool {
        self.reported_error
    }

    fn severity(&self, severity: Severity) -> Severity {
        if self.errors_as_warnings && severity == Severity::Error {
            Severity::Warning
        } else {
            severity
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        let root = &self.graph.root().descriptor;
        let diagnostic = diagnostic
            .with_element(&root.name)
            .with_location(root.location.as_ref());
        self.reported_error |= diagnostic.is_error();
        self.reporter.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_diagnostics_are_dropped() {
        let mut reporter = DiagnosticReporter::new();
        reporter.report(Diagnostic::error("boom").with_element("test.C"));
        reporter.report(Diagnostic::error("boom").with_element("test.C"));
        reporter.report(Diagnostic::warning("careful"));
        assert_eq!(reporter.diagnostics().len(), 2);
        assert_eq!(reporter.error_count(), 1);
        assert!(reporter.has_errors());
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut reporter = DiagnosticReporter::new();
        reporter.report_all(vec![Diagnostic::warning("a"), Diagnostic::warning("b")]);
        assert!(!reporter.has_errors());
        assert_eq!(reporter.into_diagnostics().len(), 2);
    }
}
