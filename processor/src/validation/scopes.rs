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

use crate::components::ComponentPath;
use crate::diagnostics::formatter::{TraceFormatter, INDENT};
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, BindingKind, BindingNode, ComponentNode};
use crate::resolver::REUSABLE;
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::NodeIndex;

/// Scoped bindings owned by a component that does not carry their scope.
pub struct IncompatiblyScopedBindingsValidator;
builtin_plugin!(
    IncompatiblyScopedBindingsValidator,
    "Stiletto/IncompatiblyScopedBindings"
);

impl IncompatiblyScopedBindingsValidator {
    fn visit(&self, context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        let root = &graph.root().descriptor;
        // @Inject bindings show up at the properly scoped ancestor.
        let skip_injection = root.is_subcomponent || !root.is_real_component;
        let mut incompatible: Vec<(&ComponentPath, Vec<(NodeIndex, &BindingNode)>)> = Vec::new();
        for (index, binding) in graph.binding_nodes() {
            let scope = match binding.scope.as_deref() {
                Some(scope) if scope != REUSABLE => scope,
                _ => continue,
            };
            let owner = match graph.component_node(&binding.component) {
                Some(owner) => owner,
                None => continue,
            };
            if owner.descriptor.effective_scopes().iter().any(|s| s == scope) {
                continue;
            }
            if binding.kind == BindingKind::Injection && skip_injection {
                continue;
            }
            match incompatible.iter_mut().find(|(path, _)| **path == binding.component) {
                Some((_, bindings)) => bindings.push((index, binding)),
                None => incompatible.push((&binding.component, vec![(index, binding)])),
            }
        }
        for (path, bindings) in incompatible {
            let owner = match graph.component_node(path) {
                Some(owner) => owner,
                None => continue,
            };
            let severity = if owner.descriptor.is_real_component {
                Severity::Error
            } else {
                context
                    .env
                    .options
                    .module_has_different_scopes_validation
                    .severity()
                    .unwrap_or(Severity::Error)
            };
            if let Some(message) = incompatible_bindings_message(graph, owner, &bindings) {
                reporter.report_component(severity, &message);
            }
        }
    }
}

fn incompatible_bindings_message(
    graph: &BindingGraph,
    owner: &ComponentNode,
    bindings: &[(NodeIndex, &BindingNode)],
) -> Option<String> {
    let descriptor = &owner.descriptor;
    let mut message = descriptor.name.clone();
    if !descriptor.is_real_component {
        let mut scopes: Vec<&str> = bindings.iter().filter_map(|(_, b)| b.scope.as_deref()).collect();
        scopes.sort_unstable();
        scopes.dedup();
        if scopes.len() < 2 {
            return None;
        }
        message.push_str(" contains bindings with different scopes:");
    } else if descriptor.scopes.is_empty() {
        message.push_str(" (unscoped) may not reference scoped bindings:");
    } else {
        message.push_str(&format!(
            " scoped with {} may not reference bindings with different scopes:",
            descriptor.readable_scopes()
        ));
    }
    for (index, binding) in bindings {
        message.push('\n');
        message.push_str(INDENT);
        match (&binding.kind, &binding.declaration) {
            (BindingKind::Injection, _) => {
                message.push_str(&format!(
                    "@{} class {}",
                    binding.scope.as_deref().unwrap_or_default(),
                    binding.key.type_.path
                ));
                message.push_str(&TraceFormatter::new(graph).binding_message(*index));
            }
            (_, Some(declaration)) => message.push_str(&declaration.element),
            (_, None) => message.push_str(&binding.key.to_string()),
        }
        message.push('\n');
    }
    Some(message.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::testing::Fixture;
    use serde_json::json;

    const FULL_GRAPH: &[(&str, &str)] = &[("fullBindingGraphValidation", "ERROR")];

    fn manifest(component_scopes: Vec<&str>, provides_scope: &str) -> serde_json::Value {
        json!({
            "injectables": [{"name": "test.Bar", "scopes": ["javax.inject.Singleton"]}],
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Provides", "method": "foo", "return_type": "test.Foo",
                 "scopes": [provides_scope], "is_static": true}
            ]}],
            "components": [{"name": "test.C", "scopes": component_scopes, "modules": ["test.M"],
                "entry_points": [
                    {"method": "foo", "return_type": "test.Foo"},
                    {"method": "bar", "return_type": "test.Bar"}
                ]}]
        })
    }

    #[test]
    fn unscoped_component_with_scoped_bindings() {
        let fixture = Fixture::new(manifest(vec![], "javax.inject.Singleton"));
        let diagnostics = fixture.check(Box::new(IncompatiblyScopedBindingsValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with(
            "C (unscoped) may not reference scoped bindings:\n\
             \x20   @Provides @Singleton Foo M.foo()\n\
             \x20   @Singleton class Bar\n\
             \x20   Bar is requested at\n\
             \x20       [C] C.bar()"
        ));
    }

    #[test]
    fn scoped_component_with_other_scope() {
        let fixture = Fixture::new(manifest(vec!["test.TestScope"], "test.TestScope"));
        let diagnostics = fixture.check(Box::new(IncompatiblyScopedBindingsValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        let message = &diagnostics[0].message;
        assert!(message.starts_with(
            "C scoped with @TestScope may not reference bindings with different scopes:\n\
             \x20   @Singleton class Bar"
        ));
        assert!(!message.contains("M.foo()"));
    }

    #[test]
    fn matching_and_reusable_scopes_are_fine() {
        let fixture = Fixture::new(manifest(vec!["javax.inject.Singleton"], "dagger.Reusable"));
        assert!(fixture
            .check(Box::new(IncompatiblyScopedBindingsValidator), "test.C")
            .is_empty());
    }

    #[test]
    fn module_with_two_scopes() {
        let fixture = Fixture::with_options(json!({
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Provides", "method": "foo", "return_type": "test.Foo",
                 "scopes": ["javax.inject.Singleton"], "is_static": true},
                {"kind": "Provides", "method": "bar", "return_type": "test.Bar",
                 "scopes": ["test.TestScope"], "is_static": true}
            ]}]
        }), FULL_GRAPH);
        let diagnostics = fixture.check_full(Box::new(IncompatiblyScopedBindingsValidator), "test.M");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with(
            "M contains bindings with different scopes:\n\
             \x20   @Provides @Singleton Foo M.foo()\n\
             \x20   @Provides @TestScope Bar M.bar()"
        ));
    }

    #[test]
    fn module_with_two_scopes_as_warning() {
        let fixture = Fixture::with_options(json!({
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Provides", "method": "foo", "return_type": "test.Foo",
                 "scopes": ["javax.inject.Singleton"], "is_static": true},
                {"kind": "Provides", "method": "bar", "return_type": "test.Bar",
                 "scopes": ["test.TestScope"], "is_static": true}
            ]}]
        }), &[
            ("fullBindingGraphValidation", "ERROR"),
            ("moduleHasDifferentScopesValidation", "WARNING"),
        ]);
        let diagnostics = fixture.check_full(Box::new(IncompatiblyScopedBindingsValidator), "test.M");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0]
            .message
            .starts_with("M contains bindings with different scopes:"));
    }

    #[test]
    fn module_with_one_scope_is_fine() {
        let fixture = Fixture::with_options(json!({
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Provides", "method": "foo", "return_type": "test.Foo",
                 "scopes": ["javax.inject.Singleton"], "is_static": true}
            ]}]
        }), FULL_GRAPH);
        assert!(fixture
            .check_full(Box::new(IncompatiblyScopedBindingsValidator), "test.M")
            .is_empty());
    }
}
