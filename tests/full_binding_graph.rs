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

use common::{errors, process_with, warnings};
use serde_json::json;

fn module_with_two_scopes() -> serde_json::Value {
    json!({
        "modules": [{"name": "test.M", "declarations": [
            {"kind": "Provides", "method": "foo", "return_type": "test.Foo",
             "scopes": ["javax.inject.Singleton"], "is_static": true,
             "parameters": [{"name": "bar", "type": "test.Unbound"}]},
            {"kind": "Provides", "method": "bar", "return_type": "test.Bar",
             "scopes": ["test.TestScope"], "is_static": true}
        ]}]
    })
}

#[test]
pub fn module_graph_as_warnings() {
    let result = process_with(module_with_two_scopes(), &[("fullBindingGraphValidation", "WARNING")]);
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    let warnings = warnings(&result);
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert!(warnings[0].starts_with(
        "[Stiletto/IncompatiblyScopedBindings] M contains bindings with different scopes:\n\
         \x20   @Provides @Singleton Foo M.foo(Unbound)\n\
         \x20   @Provides @TestScope Bar M.bar()"
    ));
    assert!(warnings[0].contains("Full classname legend:"));
    assert!(warnings[0].contains("TestScope: test.TestScope"));
}

#[test]
pub fn module_graph_as_errors() {
    let result = process_with(module_with_two_scopes(), &[("fullBindingGraphValidation", "ERROR")]);
    assert_eq!(errors(&result).len(), 1);
    assert_eq!(result.diagnostics[0].element.as_deref(), Some("test.M"));
}

#[test]
pub fn module_scopes_turned_down_to_warning() {
    let result = process_with(
        module_with_two_scopes(),
        &[
            ("fullBindingGraphValidation", "ERROR"),
            ("moduleHasDifferentScopesValidation", "WARNING"),
        ],
    );
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    let warnings = warnings(&result);
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert!(warnings[0]
        .starts_with("[Stiletto/IncompatiblyScopedBindings] M contains bindings with different scopes:"));
}

#[test]
pub fn module_graphs_are_skipped_by_default() {
    let result = process_with(module_with_two_scopes(), &[]);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
pub fn unused_binding_of_component_is_validated() {
    let result = process_with(
        json!({
            "modules": [{"name": "test.M", "declarations": [
                {"kind": "Provides", "method": "a", "return_type": "test.Foo", "is_static": true},
                {"kind": "Provides", "method": "b", "return_type": "test.Foo", "is_static": true}
            ]}],
            "components": [{"name": "test.C", "modules": ["test.M"]}]
        }),
        &[("fullBindingGraphValidation", "ERROR")],
    );
    let errors = errors(&result);
    assert!(!errors.is_empty());
    assert!(errors
        .iter()
        .all(|e| e.starts_with("[Stiletto/DuplicateBindings] Foo is bound multiple times:")));
    assert!(errors.iter().any(|e| e.contains("in component: [C]")));
    assert!(result.graphs.is_empty());
}
