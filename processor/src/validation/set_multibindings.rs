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

use crate::declarations::BindingDeclaration;
use crate::diagnostics::formatter::{format_indented_list, INDENT};
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, BindingKind};
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::NodeIndex;
use std::rc::Rc;
use stiletto_common::key::Key;

/// `@Binds @IntoSet` contributions that end up at the same binding would put
/// the same instance into the set twice.
pub struct SetMultibindingValidator;
builtin_plugin!(SetMultibindingValidator, "Stiletto/SetMultibindings");

impl SetMultibindingValidator {
    fn visit(&self, _context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        for (index, set) in graph.binding_nodes() {
            if set.kind != BindingKind::MultiboundSet {
                continue;
            }
            let mut by_target: Vec<(Key, Vec<Rc<BindingDeclaration>>)> = Vec::new();
            for edge in graph.dependencies_of(index) {
                let (target, declaration) = match delegate_target(graph, edge.target) {
                    Some(found) => found,
                    None => continue,
                };
                match by_target.iter_mut().find(|(key, _)| *key == target) {
                    Some((_, declarations)) => {
                        if !declarations.iter().any(|d| d.order == declaration.order) {
                            declarations.push(declaration)
                        }
                    }
                    None => by_target.push((target, vec![declaration])),
                }
            }
            for (target, mut declarations) in by_target {
                if declarations.len() < 2 {
                    continue;
                }
                declarations.sort_by_key(|d| d.sort_key());
                let elements: Vec<String> = declarations.iter().map(|d| d.element.clone()).collect();
                let message = format!(
                    "Multiple set contributions into {} for the same contribution key: {}{}\n{}in component: [{}]",
                    set.key,
                    target,
                    format_indented_list(&elements, INDENT),
                    INDENT,
                    set.component
                );
                reporter.report_component(Severity::Error, &message);
            }
        }
    }
}

/// For a `@Binds` contribution: the key of the binding its delegate chain
/// ends at, with the contribution's declaration.
fn delegate_target(
    graph: &BindingGraph,
    contribution: NodeIndex,
) -> Option<(Key, Rc<BindingDeclaration>)> {
    let binding = graph.binding(contribution)?;
    if !binding.is_delegate() {
        return None;
    }
    let declaration = binding.declaration.clone()?;
    let delegated = match graph.dependencies_of(contribution).as_slice() {
        [edge] => edge.target,
        _ => return None,
    };
    let terminal = graph.binding(graph.terminal_binding(delegated)?)?;
    Some((terminal.key.without_contribution(), declaration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::testing::Fixture;
    use serde_json::json;

    fn binds_into_set(method: &str, parameter: &str) -> serde_json::Value {
        json!({"kind": "Binds", "method": method, "return_type": "test.Foo", "is_abstract": true,
               "contribution": "IntoSet", "parameters": [{"name": "impl", "type": parameter}]})
    }

    fn manifest(declarations: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "injectables": [{"name": "test.FooImpl"}, {"name": "test.OtherFoo"}],
            "modules": [{"name": "test.M", "is_abstract": true, "declarations": declarations}],
            "components": [{"name": "test.C", "modules": ["test.M"],
                "entry_points": [{"method": "foos", "return_type": "java.util.Set<test.Foo>"}]}]
        })
    }

    #[test]
    fn two_delegates_to_one_binding() {
        let fixture = Fixture::new(manifest(vec![
            binds_into_set("first", "test.FooImpl"),
            binds_into_set("second", "test.FooImpl"),
        ]));
        let diagnostics = fixture.check(Box::new(SetMultibindingValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with(
            "Multiple set contributions into Set<Foo> for the same contribution key: FooImpl\n\
             \x20   @Binds @IntoSet Foo M.first(FooImpl)\n\
             \x20   @Binds @IntoSet Foo M.second(FooImpl)\n\
             \x20   in component: [C]"
        ));
    }

    #[test]
    fn delegates_to_different_bindings_are_fine() {
        let fixture = Fixture::new(manifest(vec![
            binds_into_set("first", "test.FooImpl"),
            binds_into_set("second", "test.OtherFoo"),
        ]));
        assert!(fixture.check(Box::new(SetMultibindingValidator), "test.C").is_empty());
    }
}
