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

mod common;

use common::{errors, process, process_with, warnings};
use serde_json::json;

#[test]
pub fn unscoped_component_with_scoped_binding() {
    let result = process(json!({
        "injectables": [{"name": "test.Foo", "scopes": ["javax.inject.Singleton"]}],
        "components": [{"name": "test.C", "entry_points": [
            {"method": "foo", "return_type": "test.Foo"}
        ]}]
    }));
    let errors = errors(&result);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with(
        "[Stiletto/IncompatiblyScopedBindings] C (unscoped) may not reference scoped bindings:\n\
         \x20   @Singleton class Foo"
    ));
}

#[test]
pub fn scoped_binding_in_matching_component() {
    let result = process(json!({
        "injectables": [{"name": "test.Foo", "scopes": ["javax.inject.Singleton"]}],
        "components": [{"name": "test.C", "scopes": ["javax.inject.Singleton"], "entry_points": [
            {"method": "foo", "return_type": "test.Foo"}
        ]}]
    }));
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    let graph = result.graph("test.C").unwrap();
    let foo = graph.components[0]
        .bindings
        .iter()
        .find(|b| b.key == "test.Foo")
        .unwrap();
    assert_eq!(foo.scope.as_deref(), Some("javax.inject.Singleton"));
}

fn conflicting_scopes() -> serde_json::Value {
    json!({
        "components": [
            {"name": "test.Parent", "scopes": ["javax.inject.Singleton"], "factory_methods": [
                {"method": "child", "subcomponent": "test.Child"}
            ]},
            {"name": "test.Child", "is_subcomponent": true, "scopes": ["javax.inject.Singleton"]}
        ]
    })
}

#[test]
pub fn subcomponent_repeats_ancestor_scope() {
    let result = process(conflicting_scopes());
    let errors = errors(&result);
    assert_eq!(
        errors,
        vec!["test.Child has conflicting scopes:\n    test.Parent also has @Singleton"]
    );
    assert!(result.graphs.is_empty());
}

#[test]
pub fn inter_component_scope_validation_as_warning() {
    let result = process_with(
        conflicting_scopes(),
        &[("disableInterComponentScopeValidation", "warning")],
    );
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    assert_eq!(warnings(&result).len(), 1);
    assert!(result.graph("test.Parent").is_some());
}

#[test]
pub fn component_dependency_cycle() {
    let result = process(json!({
        "components": [
            {"name": "test.A", "scopes": ["test.ScopeA"], "dependencies": ["test.B"]},
            {"name": "test.B", "scopes": ["test.ScopeB"], "dependencies": ["test.A"]}
        ]
    }));
    let errors = errors(&result);
    assert!(
        errors.iter().any(|e| e.starts_with("test.A contains a cycle in its component dependencies:\n")),
        "{:?}",
        errors
    );
}
