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

//! Resolves and validates the binding graphs described by a [Manifest].
//!
//! The pipeline runs every stage over the whole manifest and collects what
//! it finds:
//!
//! 1. superficial validation of every type the front-end handed over,
//! 2. shape checks on binding methods, dependency requests, assisted
//!    factories and component creators,
//! 3. full binding graphs of modules and components when enabled,
//! 4. the regular graph of every root component, checked by the
//!    [validation] plugins.

pub mod assisted;
pub mod components;
pub mod creators;
pub mod declarations;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod requests;
pub mod resolver;
pub mod shape;
pub mod superficial;
pub mod validation;

use crate::components::{transitive_modules, ComponentDescriptor};
use crate::declarations::DeclarationRegistry;
use crate::diagnostics::reporter::DiagnosticReporter;
use crate::error::{CompileError, Diagnostic};
use crate::graph::{BindingGraph, ResolvedGraph};
use crate::superficial::InvalidElements;
use crate::validation::{builtin_plugins, validate_graph, ValidationContext, ValidationPlugin};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use stiletto_common::environment::ProcessingEnv;
use stiletto_common::manifest::{Component, Manifest};
use tracing::{debug, info_span};

/// What the back-end gets: graphs of the root components that validated
/// cleanly, and every diagnostic in the order it was reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub graphs: Vec<ResolvedGraph>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProcessingResult {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn graph(&self, root: &str) -> Option<&ResolvedGraph> {
        self.graphs.iter().find(|g| g.root == root)
    }
}

/// Runs the pipeline with the built-in plugins plus any added ones.
pub struct Processor {
    plugins: Vec<Box<dyn ValidationPlugin>>,
}

impl Default for Processor {
    fn default() -> Self {
        Processor {
            plugins: builtin_plugins(),
        }
    }
}

impl Processor {
    pub fn new() -> Self {
        Processor::default()
    }

    pub fn with_plugin(mut self, plugin: Box<dyn ValidationPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn process(&self, manifest: &Manifest, raw_options: &HashMap<String, String>) -> ProcessingResult {
        let mut reporter = DiagnosticReporter::new();
        let (env, option_errors) = ProcessingEnv::from_processor_options(raw_options);
        for error in option_errors {
            reporter.report(Diagnostic::new(error.severity(), &error.to_string()));
        }

        let (mut invalid, superficial) = superficial::validate(manifest);
        reporter.report_all(superficial);
        reporter.report_all(shape::validate(manifest, &mut invalid));
        reporter.report_all(assisted::validate(manifest, &mut invalid));
        reporter.report_all(requests::validate(manifest, &mut invalid));

        let mut failed: HashSet<String> = HashSet::new();
        for component in &manifest.components {
            let creator = match &component.creator {
                Some(creator) => creator,
                None => continue,
            };
            let modules = transitive_modules(manifest, &component.modules);
            let diagnostics = creators::validate_creator(manifest, component, creator, &modules);
            if diagnostics.iter().any(Diagnostic::is_error) {
                failed.insert(component.name.clone());
            }
            reporter.report_all(diagnostics);
        }

        let registry = DeclarationRegistry::new(&env, manifest, &invalid);
        let context = ValidationContext {
            env: &env,
            manifest,
            registry: &registry,
        };
        let mut stage = Stage {
            context: &context,
            invalid: &invalid,
            plugins: &self.plugins,
            reporter: &mut reporter,
            failed,
        };
        stage.validate_full_graphs();
        let graphs = stage.validate_root_components();
        ProcessingResult {
            graphs,
            diagnostics: reporter.into_diagnostics(),
        }
    }

    /// Resolves the regular graph of one root component without validating
    /// it.
    pub fn resolve_component(
        &self,
        manifest: &Manifest,
        raw_options: &HashMap<String, String>,
        name: &str,
    ) -> Result<ResolvedGraph, Diagnostic> {
        let component = manifest
            .component(name)
            .map_compile_error(&format!("{} is not a component", name))?;
        let (env, _) = ProcessingEnv::from_processor_options(raw_options);
        let invalid = InvalidElements::default();
        let registry = DeclarationRegistry::new(&env, manifest, &invalid);
        let descriptor = ComponentDescriptor::for_component(&env, manifest, component);
        let graph = resolver::resolve(&env, manifest, &registry, &invalid, descriptor, false);
        Ok(graph.to_resolved())
    }
}

/// Shortcut for `Processor::new().process(..)`.
pub fn process(manifest: &Manifest, raw_options: &HashMap<String, String>) -> ProcessingResult {
    Processor::new().process(manifest, raw_options)
}

struct Stage<'a> {
    context: &'a ValidationContext<'a>,
    invalid: &'a InvalidElements,
    plugins: &'a [Box<dyn ValidationPlugin>],
    reporter: &'a mut DiagnosticReporter,
    /// Components that already reported errors and get no regular graph.
    failed: HashSet<String>,
}

impl Stage<'_> {
    fn validate_full_graphs(&mut self) {
        let options = &self.context.env.options;
        if !options.full_binding_graph_validation_enabled() && !options.plugins_visit_full_binding_graphs {
            return;
        }
        let manifest = self.context.manifest;
        for module in &manifest.modules {
            if self.invalid.contains_module(&module.name) || self.invalid.contains_type(&module.name) {
                continue;
            }
            let span = info_span!("module", name = %module.name);
            let _enter = span.enter();
            let descriptor = ComponentDescriptor::for_module(manifest, module);
            let graph = self.resolve(descriptor, true);
            self.run_plugins(&graph);
        }
        for component in &manifest.components {
            if self.has_errors(component) {
                continue;
            }
            let span = info_span!("component", name = %component.name, full = true);
            let _enter = span.enter();
            let descriptor = ComponentDescriptor::for_component(self.context.env, manifest, component);
            let graph = self.resolve(descriptor, true);
            if !self.run_plugins(&graph) {
                self.failed.insert(component.name.clone());
            }
        }
    }

    fn validate_root_components(&mut self) -> Vec<ResolvedGraph> {
        let manifest = self.context.manifest;
        let mut graphs = Vec::new();
        for component in manifest.components.iter().filter(|c| !c.is_subcomponent) {
            let span = info_span!("component", name = %component.name);
            let _enter = span.enter();
            if self.has_errors(component) || self.failed.contains(&component.name) {
                debug!("skipping graph of {}", component.name);
                continue;
            }
            let descriptor = ComponentDescriptor::for_component(self.context.env, manifest, component);
            let graph = self.resolve(descriptor, false);
            if self.report_unprocessable(component, &graph) {
                continue;
            }
            let errors = self.reporter.error_count();
            validation::hierarchy::validate(self.context, &graph, self.reporter);
            if self.reporter.error_count() > errors {
                continue;
            }
            if self.run_plugins(&graph) {
                graphs.push(graph.to_resolved());
            }
        }
        graphs
    }

    fn resolve(&self, descriptor: ComponentDescriptor, full: bool) -> BindingGraph {
        resolver::resolve(
            self.context.env,
            self.context.manifest,
            self.context.registry,
            self.invalid,
            descriptor,
            full,
        )
    }

    fn run_plugins(&mut self, graph: &BindingGraph) -> bool {
        validate_graph(self.context, graph, self.plugins, self.reporter)
    }

    /// Whether `component` or one of its modules failed earlier checks.
    /// Reports `<Module> has errors` for each bad module.
    fn has_errors(&mut self, component: &Component) -> bool {
        if self.invalid.contains_type(&component.name) {
            return true;
        }
        let mut errors = false;
        for module in transitive_modules(self.context.manifest, &component.modules) {
            if self.invalid.contains_module(&module) || self.invalid.contains_type(&module) {
                errors = true;
                self.reporter.report(
                    Diagnostic::error(&format!("{} has errors", module))
                        .with_element(&component.name)
                        .with_location(component.location.as_ref()),
                );
            }
        }
        errors
    }

    /// Types the resolver could not use because they failed superficial
    /// validation are reported against the component that needed them.
    fn report_unprocessable(&mut self, component: &Component, graph: &BindingGraph) -> bool {
        let mut reported = false;
        for type_name in graph.unprocessable_types() {
            if let Some(failure) = self.invalid.type_failure(type_name) {
                reported = true;
                self.reporter
                    .report(failure.diagnostic("ComponentProcessingStep", &component.name));
            }
        }
        reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> Manifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn clean_component_yields_graph() {
        let manifest = manifest(json!({
            "injectables": [{"name": "test.Foo"}],
            "components": [{"name": "test.C", "entry_points": [
                {"method": "foo", "return_type": "test.Foo"}
            ]}]
        }));
        let result = process(&manifest, &HashMap::new());
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        let graph = result.graph("test.C").unwrap();
        assert_eq!(graph.components.len(), 1);
        assert!(graph.components[0].bindings.iter().any(|b| b.key == "test.Foo"));
    }

    #[test]
    fn invalid_option_is_reported() {
        let manifest = Manifest::new();
        let options = HashMap::from([(
            "stiletto.scopeCycleValidation".to_owned(),
            "sometimes".to_owned(),
        )]);
        let result = process(&manifest, &options);
        assert_eq!(result.error_count(), 1);
        assert!(result.diagnostics[0]
            .message
            .starts_with("Processor option -Astiletto.scopeCycleValidation may only have the values"));
    }

    #[test]
    fn erroneous_graph_is_not_returned() {
        let manifest = manifest(json!({
            "components": [{"name": "test.C", "entry_points": [
                {"method": "foo", "return_type": "test.Foo"}
            ]}]
        }));
        let result = process(&manifest, &HashMap::new());
        assert_eq!(result.error_count(), 1);
        assert!(result.graphs.is_empty());
        assert_eq!(
            result.diagnostics[0].plugin.as_deref(),
            Some("Stiletto/MissingBinding")
        );
    }

    #[test]
    fn resolve_unknown_component() {
        let error = Processor::new()
            .resolve_component(&Manifest::new(), &HashMap::new(), "test.Nope")
            .unwrap_err();
        assert_eq!(error.message, "test.Nope is not a component");
    }
}
