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

//! Map multibindings whose contributions share a key or mix `@MapKey` types.

use crate::declarations::{BindingDeclaration, MapKeyData};
use crate::diagnostics::formatter::{format_indented_list, DOUBLE_INDENT, INDENT};
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, BindingKind, BindingNode};
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashSet;
use std::rc::Rc;
use stiletto_common::key::{FrameworkType, Key};

pub struct MapKeysValidator;
builtin_plugin!(MapKeysValidator, "Stiletto/MapKeys");

impl MapKeysValidator {
    fn visit(&self, context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        for (index, binding) in map_multibindings(context, graph) {
            let contributions = contributions(graph, index);
            check_duplicate_map_keys(binding, &contributions, reporter);
            check_map_key_annotation_types(binding, &contributions, reporter);
        }
    }
}

/// Map multibindings, keeping only one of `Map<K, V>`, `Map<K, Provider<V>>`
/// and `Map<K, Producer<V>>` (in that order) so a bad contribution is
/// reported once.
fn map_multibindings<'a>(
    context: &ValidationContext,
    graph: &'a BindingGraph,
) -> Vec<(NodeIndex, &'a BindingNode)> {
    let key_factory = &context.env.key_factory;
    let mut bindings: Vec<(usize, Key, NodeIndex, &BindingNode)> = graph
        .binding_nodes()
        .into_iter()
        .filter(|(_, b)| b.kind == BindingKind::MultiboundMap)
        .map(|(index, binding)| {
            let (rank, unwrapped) = match key_factory.unwrap_map_value(&binding.key) {
                Some((FrameworkType::Provider, unwrapped)) => (1, unwrapped),
                Some((FrameworkType::Producer, unwrapped)) => (2, unwrapped),
                Some((_, unwrapped)) => (3, unwrapped),
                None => (0, binding.key.clone()),
            };
            (rank, unwrapped, index, binding)
        })
        .collect();
    bindings.sort_by_key(|(rank, _, index, _)| (*rank, *index));
    let mut visited: HashSet<Key> = HashSet::new();
    bindings
        .into_iter()
        .filter(|(_, unwrapped, _, _)| visited.insert(unwrapped.clone()))
        .map(|(_, _, index, binding)| (index, binding))
        .collect()
}

/// Declarations of the bindings the map requests.
fn contributions(graph: &BindingGraph, map: NodeIndex) -> Vec<Rc<BindingDeclaration>> {
    let mut result: Vec<Rc<BindingDeclaration>> = Vec::new();
    for edge in graph.dependencies_of(map) {
        let declaration = match graph.binding(edge.target).and_then(|b| b.declaration.as_ref()) {
            Some(declaration) => declaration,
            None => continue,
        };
        if !result.iter().any(|d| d.order == declaration.order) {
            result.push(declaration.clone());
        }
    }
    result
}

fn sorted_elements(declarations: &[&Rc<BindingDeclaration>]) -> Vec<String> {
    let mut sorted = declarations.to_vec();
    sorted.sort_by_key(|d| d.sort_key());
    sorted.iter().map(|d| d.element.clone()).collect()
}

fn check_duplicate_map_keys(
    map: &BindingNode,
    contributions: &[Rc<BindingDeclaration>],
    reporter: &mut GraphReporter,
) {
    let mut by_map_key: Vec<(&MapKeyData, Vec<&Rc<BindingDeclaration>>)> = Vec::new();
    for contribution in contributions {
        let map_key = match &contribution.map_key {
            Some(map_key) => map_key,
            None => continue,
        };
        match by_map_key.iter_mut().find(|(k, _)| *k == map_key) {
            Some((_, declarations)) => declarations.push(contribution),
            None => by_map_key.push((map_key, vec![contribution])),
        }
    }
    for (_, declarations) in by_map_key {
        if declarations.len() > 1 {
            let message = format!(
                "The same map key is bound more than once for {}{}",
                map.key,
                format_indented_list(&sorted_elements(&declarations), INDENT)
            );
            reporter.report_component(Severity::Error, &message);
        }
    }
}

fn check_map_key_annotation_types(
    map: &BindingNode,
    contributions: &[Rc<BindingDeclaration>],
    reporter: &mut GraphReporter,
) {
    let mut by_annotation: Vec<(&str, Vec<&Rc<BindingDeclaration>>)> = Vec::new();
    for contribution in contributions {
        let annotation = match &contribution.map_key {
            Some(map_key) => map_key.annotation_type.as_str(),
            None => continue,
        };
        match by_annotation.iter_mut().find(|(a, _)| *a == annotation) {
            Some((_, declarations)) => declarations.push(contribution),
            None => by_annotation.push((annotation, vec![contribution])),
        }
    }
    if by_annotation.len() < 2 {
        return;
    }
    let mut message = format!("{} uses more than one @MapKey annotation type", map.key);
    for (annotation, declarations) in by_annotation {
        message.push_str(&format!("\n{}{}:", INDENT, annotation));
        message.push_str(&format_indented_list(
            &sorted_elements(&declarations),
            DOUBLE_INDENT,
        ));
    }
    reporter.report_component(Severity::Error, &message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::testing::{messages, Fixture};
    use serde_json::json;

    fn into_map(method: &str, annotation: &str, key_type: &str, value: &str) -> serde_json::Value {
        json!({"kind": "Provides", "method": method, "return_type": "java.lang.Object",
               "contribution": "IntoMap", "is_static": true,
               "map_keys": [{"annotation_type": annotation, "key_type": key_type, "value": value}]})
    }

    fn component(entry_type: &str) -> serde_json::Value {
        json!({"name": "test.C", "modules": ["test.M"],
               "entry_points": [{"method": "map", "return_type": entry_type}]})
    }

    #[test]
    fn same_map_key_twice() {
        let fixture = Fixture::new(json!({
            "modules": [{"name": "test.M", "declarations": [
                into_map("a", "dagger.multibindings.StringKey", "java.lang.String", "\"k\""),
                into_map("b", "dagger.multibindings.StringKey", "java.lang.String", "\"k\"")
            ]}],
            "components": [component("java.util.Map<java.lang.String,java.lang.Object>")]
        }));
        let diagnostics = fixture.check(Box::new(MapKeysValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert!(messages(&diagnostics)[0].starts_with(
            "The same map key is bound more than once for Map<String,Object>\n\
             \x20   @Provides @IntoMap @StringKey(\"k\") Object M.a()\n\
             \x20   @Provides @IntoMap @StringKey(\"k\") Object M.b()"
        ));
    }

    #[test]
    fn mixed_map_key_annotations() {
        let fixture = Fixture::new(json!({
            "modules": [{"name": "test.M", "declarations": [
                into_map("a", "dagger.multibindings.StringKey", "java.lang.String", "\"a\""),
                into_map("b", "test.OtherStringKey", "java.lang.String", "\"b\"")
            ]}],
            "components": [component("java.util.Map<java.lang.String,java.lang.Object>")]
        }));
        let diagnostics = fixture.check(Box::new(MapKeysValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        let message = &diagnostics[0].message;
        assert!(message.starts_with("Map<String,Object> uses more than one @MapKey annotation type"));
        assert!(message.contains("\n    StringKey:\n        @Provides @IntoMap @StringKey(\"a\") Object M.a()"));
        assert!(message.contains("\n    OtherStringKey:\n        @Provides @IntoMap @OtherStringKey(\"b\") Object M.b()"));
    }

    #[test]
    fn provider_map_is_not_reported_again() {
        let fixture = Fixture::new(json!({
            "modules": [{"name": "test.M", "declarations": [
                into_map("a", "dagger.multibindings.StringKey", "java.lang.String", "\"k\""),
                into_map("b", "dagger.multibindings.StringKey", "java.lang.String", "\"k\"")
            ]}],
            "components": [{"name": "test.C", "modules": ["test.M"], "entry_points": [
                {"method": "map", "return_type": "java.util.Map<java.lang.String,java.lang.Object>"},
                {"method": "providers",
                 "return_type": "java.util.Map<java.lang.String,javax.inject.Provider<java.lang.Object>>"}
            ]}]
        }));
        let diagnostics = fixture.check(Box::new(MapKeysValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn distinct_keys_are_fine() {
        let fixture = Fixture::new(json!({
            "modules": [{"name": "test.M", "declarations": [
                into_map("a", "dagger.multibindings.StringKey", "java.lang.String", "\"a\""),
                into_map("b", "dagger.multibindings.StringKey", "java.lang.String", "\"b\"")
            ]}],
            "components": [component("java.util.Map<java.lang.String,java.lang.Object>")]
        }));
        assert!(fixture.check(Box::new(MapKeysValidator), "test.C").is_empty());
    }
}
