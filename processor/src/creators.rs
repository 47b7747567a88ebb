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

use crate::declarations::parse_type;
use crate::error::Diagnostic;
use std::collections::HashSet;
use stiletto_common::manifest::{Component, Creator, CreatorKind, Manifest, Method};

/// A method together with the interface that declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedMethod {
    pub source: String,
    pub method: Method,
}

impl FlattenedMethod {
    fn signature(&self) -> String {
        format!(
            "{}({})",
            self.method.method,
            self.method
                .parameters
                .iter()
                .map(|p| p.type_.as_str())
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    /// `test.Builder.method(java.lang.String)`
    pub fn readable(&self) -> String {
        format!(
            "{}.{}({})",
            self.source,
            self.method.method,
            self.method
                .parameters
                .iter()
                .map(|p| display_type(&p.type_))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    /// `void test.Builder.method(java.lang.String)`
    pub fn readable_with_return_type(&self) -> String {
        format!("{} {}", display_type(&self.method.return_type), self.readable())
    }
}

fn display_type(type_: &str) -> String {
    parse_type(type_)
        .map(|t| t.canonical_string_path())
        .unwrap_or_else(|| type_.to_owned())
}

/// Gathers the methods of `name` and of every supertype found in the
/// interface table, inherited methods first. A method redeclared lower in the
/// hierarchy replaces the inherited one in place.
pub fn flatten_methods(
    manifest: &Manifest,
    name: &str,
    own_methods: &[Method],
    supertypes: &[String],
) -> Vec<FlattenedMethod> {
    let mut result: Vec<FlattenedMethod> = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(name.to_owned());
    for supertype in supertypes {
        collect_inherited(manifest, supertype, &mut visited, &mut result);
    }
    for method in own_methods {
        add_method(
            &mut result,
            FlattenedMethod {
                source: name.to_owned(),
                method: method.clone(),
            },
        );
    }
    result
}

fn collect_inherited(
    manifest: &Manifest,
    name: &str,
    visited: &mut HashSet<String>,
    result: &mut Vec<FlattenedMethod>,
) {
    if !visited.insert(name.to_owned()) {
        return;
    }
    let interface = match manifest.interface(name) {
        Some(interface) => interface,
        None => return,
    };
    for supertype in &interface.supertypes {
        collect_inherited(manifest, supertype, visited, result);
    }
    for method in &interface.methods {
        add_method(
            result,
            FlattenedMethod {
                source: name.to_owned(),
                method: method.clone(),
            },
        );
    }
}

fn add_method(result: &mut Vec<FlattenedMethod>, method: FlattenedMethod) {
    let signature = method.signature();
    match result.iter_mut().find(|m| m.signature() == signature) {
        Some(existing) => *existing = method,
        None => result.push(method),
    }
}

pub fn creator_methods(manifest: &Manifest, creator: &Creator) -> Vec<FlattenedMethod> {
    flatten_methods(manifest, &creator.name, &creator.methods, &creator.supertypes)
}

fn component_annotation(component: &Component) -> &'static str {
    match (component.is_subcomponent, component.is_production) {
        (false, false) => "@Component",
        (true, false) => "@Subcomponent",
        (false, true) => "@ProductionComponent",
        (true, true) => "@ProductionSubcomponent",
    }
}

/// Checks a component's builder or factory against what the component needs.
pub fn validate_creator(
    manifest: &Manifest,
    component: &Component,
    creator: &Creator,
    modules: &[String],
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let annotation = format!(
        "{}.{}",
        component_annotation(component),
        match creator.kind {
            CreatorKind::Builder => "Builder",
            CreatorKind::Factory => "Factory",
        }
    );
    let mut error = |message: String| {
        diagnostics.push(
            Diagnostic::error(&message)
                .with_element(&creator.name)
                .with_location(creator.location.as_ref()),
        )
    };

    let methods: Vec<FlattenedMethod> = creator_methods(manifest, creator)
        .into_iter()
        .filter(|m| m.method.is_abstract)
        .collect();
    let (factory_methods, setters): (Vec<&FlattenedMethod>, Vec<&FlattenedMethod>) =
        match creator.kind {
            CreatorKind::Builder => methods.iter().partition(|m| m.method.parameters.is_empty()),
            CreatorKind::Factory => (methods.iter().collect(), methods.iter().collect()),
        };

    match factory_methods.as_slice() {
        [] => error(match creator.kind {
            CreatorKind::Builder => format!(
                "{} types must have exactly one no-args method that  returns the {} type",
                annotation,
                component_annotation(component)
            ),
            CreatorKind::Factory => format!(
                "{} types must have exactly one method that returns the {} type",
                annotation,
                component_annotation(component)
            ),
        }),
        [_] => {}
        [first, rest @ ..] => {
            for _ in rest {
                error(match creator.kind {
                    CreatorKind::Builder => format!(
                        "{} types must have exactly one zero-arg method, and that method must \
                         return the {} type. Already found: {}",
                        annotation,
                        component_annotation(component),
                        first.readable_with_return_type()
                    ),
                    CreatorKind::Factory => format!(
                        "{} types must have exactly one abstract method. Already found: {}",
                        annotation,
                        first.readable_with_return_type()
                    ),
                });
            }
        }
    }
    for factory_method in &factory_methods {
        let returns_component = factory_method.method.return_type == component.name
            || is_supertype_of(manifest, &factory_method.method.return_type, &component.name);
        if !returns_component {
            error(format!(
                "{} methods that have no arguments must return the {} type or a supertype of \
                 the {}",
                annotation,
                component_annotation(component),
                component_annotation(component)
            ));
        }
    }

    let mut set_types: Vec<(String, Vec<String>)> = Vec::new();
    for setter in &setters {
        if creator.kind == CreatorKind::Builder && setter.method.parameters.len() > 1 {
            error(format!(
                "{} methods must not have more than one argument",
                annotation
            ));
            continue;
        }
        for parameter in &setter.method.parameters {
            if setter.method.binds_instance || parameter.binds_instance {
                continue;
            }
            if parse_type(&parameter.type_)
                .map(|t| t.is_primitive())
                .unwrap_or(false)
            {
                error(format!(
                    "{} methods that are not annotated with @BindsInstance must take either a \
                     module or a component dependency, not a primitive",
                    annotation
                ));
                continue;
            }
            let element = match creator.kind {
                CreatorKind::Builder => setter.readable_with_return_type(),
                CreatorKind::Factory => format!("{} {}", parameter.type_, parameter.name),
            };
            match set_types.iter_mut().find(|(t, _)| *t == parameter.type_) {
                Some((_, elements)) => elements.push(element),
                None => set_types.push((parameter.type_.clone(), vec![element])),
            }
        }
    }

    for (type_, elements) in &set_types {
        if elements.len() > 1 {
            error(match creator.kind {
                CreatorKind::Builder => format!(
                    "{} types must not have more than one setter method per module or \
                     dependency, but {} is set by [{}]",
                    annotation,
                    type_,
                    elements.join(", ")
                ),
                CreatorKind::Factory => format!(
                    "{} methods may not have more than one parameter per module or dependency, \
                     but {} is set by [{}]",
                    annotation,
                    type_,
                    elements.join(", ")
                ),
            });
        }
    }

    let required: Vec<&String> = component.dependencies.iter().collect();
    let missing: Vec<&str> = required
        .iter()
        .filter(|r| !set_types.iter().any(|(t, _)| t.as_str() == r.as_str()))
        .map(|r| r.as_str())
        .collect();
    if !missing.is_empty() {
        error(match creator.kind {
            CreatorKind::Builder => format!(
                "{} is missing setters for required modules or components: [{}]",
                annotation,
                missing.join(", ")
            ),
            CreatorKind::Factory => format!(
                "{} method is missing parameters for required modules or components: [{}]",
                annotation,
                missing.join(", ")
            ),
        });
    }
    let extra: Vec<&str> = set_types
        .iter()
        .map(|(t, _)| t.as_str())
        .filter(|t| {
            !component.dependencies.iter().any(|d| d.as_str() == *t)
                && !modules.iter().any(|m| m.as_str() == *t)
        })
        .collect();
    if !extra.is_empty() {
        error(match creator.kind {
            CreatorKind::Builder => format!(
                "{} has setters for modules or components that aren't required: [{}]",
                annotation,
                extra.join(", ")
            ),
            CreatorKind::Factory => format!(
                "{} method has parameters for modules or components that aren't required: [{}]",
                annotation,
                extra.join(", ")
            ),
        });
    }
    diagnostics
}

fn is_supertype_of(manifest: &Manifest, candidate: &str, component: &str) -> bool {
    let mut stack = vec![component.to_owned()];
    let mut visited = HashSet::new();
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        if let Some(interface) = manifest.interface(&name) {
            if interface.supertypes.iter().any(|s| s == candidate) {
                return true;
            }
            stack.extend(interface.supertypes.iter().cloned());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use stiletto_common::manifest::{Interface, Parameter};

    fn method(name: &str, return_type: &str, parameters: &[&str]) -> Method {
        Method {
            method: name.to_owned(),
            return_type: return_type.to_owned(),
            parameters: parameters
                .iter()
                .enumerate()
                .map(|(i, t)| Parameter {
                    name: format!("p{}", i),
                    type_: t.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn component(dependencies: &[&str], creator: Creator) -> Component {
        Component {
            name: "test.C".to_owned(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            creator: Some(creator),
            ..Component::new()
        }
    }

    #[test]
    fn inherited_methods_come_first_and_are_overridden_in_place() {
        let mut manifest = Manifest::new();
        manifest.interfaces.push(Interface {
            name: "test.Parent".to_owned(),
            supertypes: vec![],
            methods: vec![method("build", "java.lang.Object", &[]), method("a", "void", &["A"])],
        });
        let flattened = flatten_methods(
            &manifest,
            "test.C.Builder",
            &[method("build", "test.C", &[])],
            &["test.Parent".to_owned()],
        );
        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened[0].source, "test.C.Builder");
        assert_eq!(flattened[0].method.return_type, "test.C");
        assert_eq!(flattened[1].readable(), "test.Parent.a(A)");
    }

    #[test]
    fn builder_without_build_method() {
        let manifest = Manifest::new();
        let creator = Creator {
            name: "test.C.Builder".to_owned(),
            ..Default::default()
        };
        let diagnostics = validate_creator(&manifest, &component(&[], creator.clone()), &creator, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "@Component.Builder types must have exactly one no-args method that  returns the \
             @Component type"
        );
    }

    #[test]
    fn builder_missing_and_extra_setters() {
        let manifest = Manifest::new();
        let creator = Creator {
            name: "test.C.Builder".to_owned(),
            methods: vec![
                method("build", "test.C", &[]),
                method("other", "void", &["test.Other"]),
            ],
            ..Default::default()
        };
        let diagnostics = validate_creator(
            &manifest,
            &component(&["test.Dep"], creator.clone()),
            &creator,
            &[],
        );
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "@Component.Builder is missing setters for required modules or components: \
                 [test.Dep]",
                "@Component.Builder has setters for modules or components that aren't required: \
                 [test.Other]",
            ]
        );
    }

    #[test]
    fn builder_setting_every_dependency() {
        let manifest = Manifest::new();
        let creator = Creator {
            name: "test.C.Builder".to_owned(),
            methods: vec![
                method("build", "test.C", &[]),
                method("dep", "test.C.Builder", &["test.Dep"]),
            ],
            ..Default::default()
        };
        let diagnostics = validate_creator(
            &manifest,
            &component(&["test.Dep"], creator.clone()),
            &creator,
            &[],
        );
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn factory_with_two_parameters_for_one_module() {
        let manifest = Manifest::new();
        let creator = Creator {
            name: "test.C.Factory".to_owned(),
            kind: CreatorKind::Factory,
            methods: vec![method("create", "test.C", &["test.M", "test.M"])],
            ..Default::default()
        };
        let diagnostics = validate_creator(
            &manifest,
            &component(&[], creator.clone()),
            &creator,
            &["test.M".to_owned()],
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "@Component.Factory methods may not have more than one parameter per module or \
             dependency, but test.M is set by [test.M p0, test.M p1]"
        );
    }
}
