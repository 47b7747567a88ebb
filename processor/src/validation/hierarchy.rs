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

//! Checks on the shape of a component tree rather than on its bindings:
//! scopes repeated between a subcomponent and its ancestors, modules
//! installed twice, and the scopes and cycles of component dependencies.
//!
//! Messages name components by their full name and are not shortened.

use crate::components::{ComponentDescriptor, PRODUCTION_SCOPE};
use crate::diagnostics::formatter::INDENT;
use crate::diagnostics::legend::strip_well_known_package;
use crate::diagnostics::reporter::{DiagnosticReporter, GraphReporter};
use crate::error::Severity;
use crate::graph::{BindingGraph, ComponentNode};
use crate::resolver::REUSABLE;
use crate::validation::ValidationContext;
use stiletto_common::type_data::canonical_annotation;
use tracing::debug;

const SINGLETONS: [&str; 2] = ["javax.inject.Singleton", "jakarta.inject.Singleton"];

/// Validates the component tree of a regular (not full) graph.
pub fn validate(context: &ValidationContext, graph: &BindingGraph, reporter: &mut DiagnosticReporter) {
    let mut reporter = GraphReporter::new(graph, reporter, None, false);
    let components = graph.component_nodes();
    for component in &components {
        let ancestors: Vec<&ComponentNode> = component
            .path
            .lineage()
            .iter()
            .filter(|p| **p != component.path)
            .filter_map(|p| graph.component_node(p))
            .collect();
        check_conflicting_scopes(context, component, &ancestors, &mut reporter);
        check_repeated_scoped_modules(context, component, &ancestors, &mut reporter);
        check_factory_methods(context, component, &ancestors, &mut reporter);
        DependencyChecker {
            context,
            component: &component.descriptor,
            reporter: &mut reporter,
        }
        .check();
    }
}

fn readable_scope(scope: &str) -> String {
    format!("@{}", strip_well_known_package(scope))
}

fn check_conflicting_scopes(
    context: &ValidationContext,
    component: &ComponentNode,
    ancestors: &[&ComponentNode],
    reporter: &mut GraphReporter,
) {
    let severity = match context.env.options.inter_component_scope_validation.severity() {
        Some(severity) => severity,
        None => return,
    };
    let scopes: Vec<&String> = component
        .descriptor
        .scopes
        .iter()
        .filter(|s| *s != PRODUCTION_SCOPE)
        .collect();
    if scopes.is_empty() {
        return;
    }
    let mut message = format!("{} has conflicting scopes:", component.descriptor.name);
    let mut conflicts = false;
    for ancestor in ancestors {
        let shared: Vec<String> = ancestor
            .descriptor
            .scopes
            .iter()
            .filter(|s| scopes.contains(s))
            .map(|s| readable_scope(s))
            .collect();
        if !shared.is_empty() {
            conflicts = true;
            message.push_str(&format!(
                "\n{}{} also has {}",
                INDENT,
                ancestor.descriptor.name,
                shared.join(" ")
            ));
        }
    }
    if conflicts {
        reporter.report_component_verbatim(severity, &message);
    }
}

/// Scopes of the bindings a module declares itself.
fn module_scopes(context: &ValidationContext, module: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for declaration in context.registry.module_declarations(module) {
        if let Some(scope) = &declaration.scope {
            if scope != REUSABLE && !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }
    }
    scopes
}

fn check_repeated_scoped_modules(
    context: &ValidationContext,
    component: &ComponentNode,
    ancestors: &[&ComponentNode],
    reporter: &mut GraphReporter,
) {
    let mut message = format!(
        "{} repeats modules with scoped bindings or declarations:",
        component.descriptor.name
    );
    let mut repeated = false;
    for ancestor in ancestors {
        let mut lines = String::new();
        for module in &component.descriptor.modules {
            if !ancestor.descriptor.modules.contains(module) {
                continue;
            }
            let scopes = module_scopes(context, module);
            if scopes.is_empty() {
                continue;
            }
            let scopes: Vec<String> = scopes.iter().map(|s| readable_scope(s)).collect();
            lines.push_str(&format!(
                "\n{}- {} with scopes: {}",
                INDENT,
                module,
                scopes.join(", ")
            ));
        }
        if !lines.is_empty() {
            repeated = true;
            message.push_str(&format!("\n- {} also includes:{}", ancestor.descriptor.name, lines));
        }
    }
    if repeated {
        reporter.report_component_verbatim(Severity::Error, &message);
    }
}

fn check_factory_methods(
    context: &ValidationContext,
    component: &ComponentNode,
    ancestors: &[&ComponentNode],
    reporter: &mut GraphReporter,
) {
    for factory in &component.descriptor.factory_methods {
        let subcomponent = match context.manifest.component(&factory.subcomponent) {
            Some(subcomponent) => subcomponent,
            None => continue,
        };
        if !factory.returns_creator && subcomponent.creator.is_some() {
            reporter.report_component_verbatim(
                Severity::Error,
                "Components may not have factory methods for subcomponents that define a builder.",
            );
        }
        for parameter in &factory.parameters {
            let owner = std::iter::once(component)
                .chain(ancestors.iter().copied())
                .find(|c| c.descriptor.modules.contains(&parameter.type_));
            if let Some(owner) = owner {
                reporter.report_component_verbatim(
                    Severity::Error,
                    &format!(
                        "{} is present in {}. A subcomponent cannot use an instance of a module that differs from its parent.",
                        parameter.type_, owner.descriptor.name
                    ),
                );
            }
        }
    }
}

/// A component dependency, as far as the manifest knows it.
struct Dependency {
    name: String,
    scopes: Vec<String>,
    dependencies: Vec<String>,
    is_component: bool,
    is_production: bool,
}

struct DependencyChecker<'a, 'r, 'g> {
    context: &'a ValidationContext<'a>,
    component: &'a ComponentDescriptor,
    reporter: &'r mut GraphReporter<'g>,
}

impl DependencyChecker<'_, '_, '_> {
    fn check(&mut self) {
        if self.component.is_subcomponent {
            return;
        }
        self.check_dependency_scopes();
        let component = self.component;
        self.check_dependency_cycles(&component.name, &mut Vec::new());
    }

    fn lookup(&self, name: &str) -> Dependency {
        match self.context.manifest.component(name) {
            Some(component) => Dependency {
                name: name.to_owned(),
                scopes: component
                    .scopes
                    .iter()
                    .map(|s| canonical_annotation(s))
                    .collect(),
                dependencies: component.dependencies.clone(),
                is_component: !component.is_subcomponent,
                is_production: component.is_production,
            },
            None => Dependency {
                name: name.to_owned(),
                scopes: Vec::new(),
                dependencies: Vec::new(),
                is_component: false,
                is_production: false,
            },
        }
    }

    fn scoped(&self, names: &[String]) -> Vec<Dependency> {
        names
            .iter()
            .map(|n| self.lookup(n))
            .filter(|d| !d.scopes.is_empty())
            .collect()
    }

    /// One line per component, most recently visited first.
    fn format_list<'d>(dependencies: impl Iterator<Item = &'d Dependency>) -> String {
        let mut result = String::new();
        for dependency in dependencies {
            result.push_str(INDENT);
            for scope in &dependency.scopes {
                result.push_str(&readable_scope(scope));
                result.push(' ');
            }
            result.push_str(&dependency.name);
            result.push('\n');
        }
        result
    }

    fn check_dependency_scopes(&mut self) {
        let component = self.lookup(&self.component.name);
        let scoped_dependencies = self.scoped(&component.dependencies);
        let scope_cycle = self.context.env.options.scope_cycle_validation.severity();
        if component.scopes.is_empty() {
            if !scoped_dependencies.is_empty() {
                let message = format!(
                    "{} (unscoped) cannot depend on scoped components:\n{}",
                    component.name,
                    Self::format_list(scoped_dependencies.iter())
                );
                self.reporter.report_component_verbatim(Severity::Error, &message);
            }
            return;
        }
        let severity = match scope_cycle {
            Some(severity) => severity,
            None => return,
        };
        if component.scopes.iter().any(|s| SINGLETONS.contains(&s.as_str())) {
            if !scoped_dependencies.is_empty() {
                let message = format!(
                    "This @Singleton component cannot depend on scoped components:\n{}",
                    Self::format_list(scoped_dependencies.iter())
                );
                self.reporter.report_component_verbatim(severity, &message);
            }
        } else {
            let mut scope_stack = Vec::new();
            let mut dependency_stack = Vec::new();
            self.check_scope_hierarchy(component, severity, &mut scope_stack, &mut dependency_stack);
        }
    }

    /// Scoped component dependencies must form a chain in which no scope
    /// appears twice.
    fn check_scope_hierarchy(
        &mut self,
        dependency: Dependency,
        severity: Severity,
        scope_stack: &mut Vec<Vec<String>>,
        dependency_stack: &mut Vec<Dependency>,
    ) {
        let overlaps = scope_stack
            .iter()
            .any(|scopes| scopes.iter().any(|s| dependency.scopes.contains(s)));
        if overlaps {
            dependency_stack.push(dependency);
            let message = format!(
                "{} depends on scoped components in a non-hierarchical scope ordering:\n{}",
                self.component.name,
                Self::format_list(dependency_stack.iter().rev())
            );
            self.reporter.report_component_verbatim(severity, &message);
            dependency_stack.pop();
            return;
        }
        let transitive = self
            .context
            .env
            .options
            .validate_transitive_component_dependencies;
        if !(transitive || dependency_stack.is_empty()) {
            return;
        }
        if !dependency.is_component || dependency.is_production {
            return;
        }
        let scoped_dependencies = self.scoped(&dependency.dependencies);
        if scoped_dependencies.is_empty() {
            return;
        }
        scope_stack.push(dependency.scopes.clone());
        dependency_stack.push(dependency);
        for next in scoped_dependencies {
            self.check_scope_hierarchy(next, severity, scope_stack, dependency_stack);
        }
        dependency_stack.pop();
        scope_stack.pop();
    }

    fn check_dependency_cycles(&mut self, name: &str, stack: &mut Vec<Dependency>) {
        let dependency = self.lookup(name);
        if stack.iter().any(|d| d.name == name) {
            let severity = match self.context.env.options.scope_cycle_validation.severity() {
                Some(severity) => severity,
                None => return,
            };
            stack.push(dependency);
            let message = format!(
                "{} contains a cycle in its component dependencies:\n{}",
                self.component.name,
                Self::format_list(stack.iter().rev())
            );
            stack.pop();
            debug!("component dependency cycle in {}", self.component.name);
            self.reporter.report_component_verbatim(severity, &message);
            return;
        }
        let transitive = self
            .context
            .env
            .options
            .validate_transitive_component_dependencies;
        if !(transitive || stack.is_empty()) || !dependency.is_component {
            return;
        }
        let next: Vec<String> = dependency.dependencies.clone();
        stack.push(dependency);
        for name in next {
            self.check_dependency_cycles(&name, stack);
        }
        stack.pop();
    }
}
