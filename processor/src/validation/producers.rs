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

//! Provisions and provision entry points may not depend on productions.

use crate::declarations::BindingDeclarationKind;
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, BindingKind, BindingNode, DependencyEdge};
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashSet;
use stiletto_common::key::RequestKind;

pub struct ProvisionDependsOnProductionValidator;
builtin_plugin!(
    ProvisionDependsOnProductionValidator,
    "Stiletto/ProviderDependsOnProducer"
);

impl ProvisionDependsOnProductionValidator {
    fn visit(&self, _context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        let production = production_bindings(graph);
        for (index, _) in graph.binding_nodes() {
            if !production.contains(&index) {
                continue;
            }
            for edge in graph.requests_of(index) {
                if can_be_satisfied_by_production(edge.request.kind, edge.entry_point)
                    && (edge.entry_point || production.contains(&edge.source))
                {
                    continue;
                }
                let message = if edge.entry_point {
                    format!(
                        "{} is a provision entry-point, which cannot depend on a production.",
                        edge.request.key
                    )
                } else {
                    dependency_message(graph, &edge)
                };
                reporter.report_dependency(Severity::Error, &edge, &message);
            }
        }
    }
}

fn dependency_message(graph: &BindingGraph, edge: &DependencyEdge) -> String {
    if !can_be_satisfied_by_production(edge.request.kind, false) {
        return format!(
            "request kind {} cannot be satisfied by production binding.",
            request_kind_name(edge.request.kind)
        );
    }
    match graph.node(edge.source).key() {
        Some(key) => format!("{} is a provision, which cannot depend on a production.", key),
        None => String::from("A provision cannot depend on a production."),
    }
}

/// Whether the binding at `index` produces its value asynchronously: a
/// `@Produces` method, a multibinding with a production contribution, or a
/// delegate or optional of a production binding.
fn is_production(graph: &BindingGraph, index: NodeIndex) -> bool {
    let mut visited = HashSet::new();
    let mut pending = vec![index];
    while let Some(index) = pending.pop() {
        if !visited.insert(index) {
            continue;
        }
        let binding = match graph.binding(index) {
            Some(binding) => binding,
            None => continue,
        };
        if produces_directly(binding) {
            return true;
        }
        match binding.kind {
            BindingKind::Delegate | BindingKind::Optional => pending.extend(
                graph
                    .dependencies_of(index)
                    .iter()
                    .map(|edge| edge.target),
            ),
            _ => {}
        }
    }
    false
}

/// Every production binding of `graph`, found by walking back from the
/// bindings that produce directly through delegates and optionals.
fn production_bindings(graph: &BindingGraph) -> HashSet<NodeIndex> {
    let mut production = HashSet::new();
    let mut pending: Vec<NodeIndex> = graph
        .binding_nodes()
        .into_iter()
        .filter(|(_, binding)| produces_directly(binding))
        .map(|(index, _)| index)
        .collect();
    while let Some(index) = pending.pop() {
        if !production.insert(index) {
            continue;
        }
        for edge in graph.requests_of(index) {
            let forwards = matches!(
                graph.binding(edge.source).map(|b| b.kind),
                Some(BindingKind::Delegate | BindingKind::Optional)
            );
            if !edge.entry_point && forwards {
                pending.push(edge.source);
            }
        }
    }
    production
}

fn produces_directly(binding: &BindingNode) -> bool {
    match binding.kind {
        BindingKind::Production => true,
        BindingKind::MultiboundSet | BindingKind::MultiboundMap => binding
            .multibinding_declarations
            .iter()
            .any(|d| d.kind == BindingDeclarationKind::Produces),
        _ => false,
    }
}

pub(crate) fn dependency_can_be_production(graph: &BindingGraph, edge: &DependencyEdge) -> bool {
    if !can_be_satisfied_by_production(edge.request.kind, edge.entry_point) {
        return false;
    }
    edge.entry_point || is_production(graph, edge.source)
}

fn can_be_satisfied_by_production(kind: RequestKind, entry_point: bool) -> bool {
    match kind {
        RequestKind::Instance | RequestKind::Produced => !entry_point,
        RequestKind::Producer | RequestKind::Future => true,
        RequestKind::Provider
        | RequestKind::Lazy
        | RequestKind::ProviderOfLazy
        | RequestKind::MembersInjection => false,
    }
}

fn request_kind_name(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Instance => "INSTANCE",
        RequestKind::Provider => "PROVIDER",
        RequestKind::Lazy => "LAZY",
        RequestKind::ProviderOfLazy => "PROVIDER_OF_LAZY",
        RequestKind::MembersInjection => "MEMBERS_INJECTION",
        RequestKind::Producer => "PRODUCER",
        RequestKind::Produced => "PRODUCED",
        RequestKind::Future => "FUTURE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::testing::Fixture;
    use serde_json::json;

    fn production_manifest(entry_type: &str, injectables: serde_json::Value) -> serde_json::Value {
        json!({
            "injectables": injectables,
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Produces", "method": "foo", "return_type": "test.Foo", "is_static": true}
            ]}],
            "components": [{"name": "test.P", "is_production": true, "modules": ["test.M"],
                "entry_points": [{"method": "get", "return_type": entry_type}]}]
        })
    }

    #[test]
    fn provision_entry_point_on_production() {
        let fixture = Fixture::new(production_manifest("test.Foo", json!([])));
        let diagnostics =
            fixture.check(Box::new(ProvisionDependsOnProductionValidator), "test.P");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("Foo is a provision entry-point, which cannot depend on a production.\n"));
        assert!(diagnostics[0].message.contains("Foo is requested at\n        [P] P.get()"));
    }

    #[test]
    fn future_entry_point_is_fine() {
        let fixture = Fixture::new(production_manifest(
            "com.google.common.util.concurrent.ListenableFuture<test.Foo>",
            json!([]),
        ));
        assert!(fixture
            .check(Box::new(ProvisionDependsOnProductionValidator), "test.P")
            .is_empty());
    }

    #[test]
    fn injected_type_may_not_depend_on_production() {
        let fixture = Fixture::new(production_manifest(
            "com.google.common.util.concurrent.ListenableFuture<test.Bar>",
            json!([{"name": "test.Bar", "parameters": [{"name": "foo", "type": "test.Foo"}]}]),
        ));
        let diagnostics =
            fixture.check(Box::new(ProvisionDependsOnProductionValidator), "test.P");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("Bar is a provision, which cannot depend on a production."));
    }

    #[test]
    fn provider_of_production_is_reported_by_kind() {
        let fixture = Fixture::new(json!({
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Produces", "method": "foo", "return_type": "test.Foo", "is_static": true},
                {"kind": "Produces", "method": "bar", "return_type": "test.Bar", "is_static": true,
                 "parameters": [{"name": "foo", "type": "javax.inject.Provider<test.Foo>"}]}
            ]}],
            "components": [{"name": "test.P", "is_production": true, "modules": ["test.M"],
                "entry_points": [{"method": "bar",
                    "return_type": "com.google.common.util.concurrent.ListenableFuture<test.Bar>"}]}]
        }));
        let diagnostics =
            fixture.check(Box::new(ProvisionDependsOnProductionValidator), "test.P");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("request kind PROVIDER cannot be satisfied by production binding."));
    }
}
