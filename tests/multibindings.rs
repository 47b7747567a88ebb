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

use common::{errors, process, process_with};
use serde_json::json;

fn into_map(method: &str, value: &str) -> serde_json::Value {
    json!({"kind": "Provides", "method": method, "return_type": "java.lang.Object",
           "contribution": "IntoMap", "is_static": true,
           "map_keys": [{"annotation_type": "dagger.multibindings.StringKey",
                         "key_type": "java.lang.String", "value": value}]})
}

#[test]
pub fn duplicate_map_key_reported_once_for_base_map() {
    let result = process(json!({
        "modules": [{"name": "test.MapModule", "declarations": [
            into_map("objectA", "\"AKey\""),
            into_map("objectB", "\"AKey\"")
        ]}],
        "components": [{"name": "test.C", "modules": ["test.MapModule"], "entry_points": [
            {"method": "objects", "return_type": "java.util.Map<java.lang.String,java.lang.Object>"},
            {"method": "objectProviders",
             "return_type": "java.util.Map<java.lang.String,javax.inject.Provider<java.lang.Object>>"}
        ]}]
    }));
    let errors = errors(&result);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with(
        "[Stiletto/MapKeys] The same map key is bound more than once for Map<String,Object>\n\
         \x20   @Provides @IntoMap @StringKey(\"AKey\") Object MapModule.objectA()\n\
         \x20   @Provides @IntoMap @StringKey(\"AKey\") Object MapModule.objectB()"
    ));
}

const OBJECT_MAP: &str = "java.util.Map<java.lang.String,java.lang.Object>";
const PROVIDER_MAP: &str = "java.util.Map<java.lang.String,javax.inject.Provider<java.lang.Object>>";
const PRODUCER_MAP: &str = "dagger.producers.Producer<java.util.Map<java.lang.String,\
                            dagger.producers.Producer<java.lang.Object>>>";

fn duplicate_keys_requested_as(entry_types: &[&str]) -> Vec<String> {
    let entry_points: Vec<serde_json::Value> = entry_types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"method": format!("objects{}", i), "return_type": t}))
        .collect();
    let result = process(json!({
        "modules": [{"name": "test.MapModule", "declarations": [
            into_map("objectA", "\"AKey\""),
            into_map("objectB", "\"AKey\"")
        ]}],
        "components": [{"name": "test.C", "modules": ["test.MapModule"], "entry_points": entry_points}]
    }));
    errors(&result)
        .into_iter()
        .filter(|e| e.starts_with("[Stiletto/MapKeys]"))
        .collect()
}

#[test]
pub fn duplicate_map_key_all_three_forms() {
    let errors = duplicate_keys_requested_as(&[OBJECT_MAP, PROVIDER_MAP, PRODUCER_MAP]);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with(
        "[Stiletto/MapKeys] The same map key is bound more than once for Map<String,Object>\n"
    ));
}

#[test]
pub fn duplicate_map_key_provider_before_producer() {
    let errors = duplicate_keys_requested_as(&[PROVIDER_MAP, PRODUCER_MAP]);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with(
        "[Stiletto/MapKeys] The same map key is bound more than once for Map<String,Provider<Object>>\n"
    ));
}

#[test]
pub fn set_contributions_from_parent_and_child() {
    let result = process(json!({
        "modules": [
            {"name": "test.ParentModule", "declarations": [
                {"kind": "Provides", "method": "parentString", "return_type": "java.lang.String",
                 "contribution": "IntoSet", "is_static": true}
            ]},
            {"name": "test.ChildModule", "declarations": [
                {"kind": "Provides", "method": "childString", "return_type": "java.lang.String",
                 "contribution": "IntoSet", "is_static": true}
            ]}
        ],
        "components": [
            {"name": "test.Parent", "modules": ["test.ParentModule"], "factory_methods": [
                {"method": "child", "subcomponent": "test.Child"}
            ]},
            {"name": "test.Child", "is_subcomponent": true, "modules": ["test.ChildModule"],
             "entry_points": [{"method": "strings", "return_type": "java.util.Set<java.lang.String>"}]}
        ]
    }));
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    let graph = result.graph("test.Parent").unwrap();
    let child = graph
        .components
        .iter()
        .find(|c| c.name == "test.Child")
        .unwrap();
    let set = child
        .bindings
        .iter()
        .find(|b| b.key == "java.util.Set<java.lang.String>")
        .unwrap();
    assert_eq!(set.contributions.len(), 2);
}

fn inherited_map_delegate() -> serde_json::Value {
    json!({
        "injectables": [{"name": "test.FooImpl", "parameters": [{"name": "l", "type": "java.lang.Long"}]}],
        "modules": [
            {"name": "test.ParentModule", "is_abstract": true, "declarations": [
                {"kind": "Binds", "method": "bindFoo", "return_type": "test.Foo", "is_abstract": true,
                 "contribution": "IntoMap",
                 "map_keys": [{"annotation_type": "dagger.multibindings.StringKey",
                               "key_type": "java.lang.String", "value": "\"foo\""}],
                 "parameters": [{"name": "impl", "type": "test.FooImpl"}]}
            ]},
            {"name": "test.ChildModule", "declarations": [
                {"kind": "Provides", "method": "l", "return_type": "java.lang.Long", "is_static": true}
            ]}
        ],
        "components": [
            {"name": "test.Parent", "modules": ["test.ParentModule"], "factory_methods": [
                {"method": "child", "subcomponent": "test.Child"}
            ]},
            {"name": "test.Child", "is_subcomponent": true, "modules": ["test.ChildModule"],
             "entry_points": [{"method": "map", "return_type": "java.util.Map<java.lang.String,test.Foo>"}]}
        ]
    })
}

#[test]
pub fn inherited_delegate_contribution_sees_child_bindings() {
    let result = process(inherited_map_delegate());
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
}

#[test]
pub fn strict_multibinding_resolves_delegates_in_owner() {
    let result = process_with(
        inherited_map_delegate(),
        &[("strictMultibindingValidation", "enabled")],
    );
    let errors = errors(&result);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with("[Stiletto/MissingBinding] Long cannot be provided"));
}
