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

use crate::creators::{flatten_methods, FlattenedMethod};
use crate::declarations::parse_type;
use crate::error::Diagnostic;
use crate::superficial::InvalidElements;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use stiletto_common::manifest::{AssistedFactory, ConstructorKind, Injectable, Manifest, Parameter};
use tracing::debug;

/// Names of the assisted injection and assisted factory types of a manifest.
#[derive(Debug, Default)]
pub struct AssistedTypes {
    injection: HashSet<String>,
    factories: HashSet<String>,
}

impl AssistedTypes {
    pub fn new(manifest: &Manifest) -> Self {
        let canonical = |name: &str| {
            parse_type(name)
                .map(|t| t.canonical_string_path())
                .unwrap_or_else(|| name.to_owned())
        };
        AssistedTypes {
            injection: manifest
                .injectables
                .iter()
                .filter(|i| i.kind == ConstructorKind::AssistedInject)
                .map(|i| canonical(&i.name))
                .collect(),
            factories: manifest
                .assisted_factories
                .iter()
                .map(|f| canonical(&f.name))
                .collect(),
        }
    }

    pub fn is_assisted_injection(&self, type_: &str) -> bool {
        self.injection.contains(type_)
    }

    pub fn is_assisted_factory(&self, type_: &str) -> bool {
        self.factories.contains(type_)
    }
}

/// An `@Assisted` parameter, identified by its type and assisted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AssistedParameter {
    type_: String,
    identifier: String,
}

impl AssistedParameter {
    fn of(parameter: &Parameter) -> Self {
        AssistedParameter {
            type_: parse_type(&parameter.type_)
                .map(|t| t.canonical_string_path())
                .unwrap_or_else(|| parameter.type_.clone()),
            identifier: parameter.assisted.clone().unwrap_or_default(),
        }
    }
}

impl Display for AssistedParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.identifier.is_empty() {
            write!(f, "@Assisted {}", self.type_)
        } else {
            write!(f, "@Assisted(\"{}\") {}", self.identifier, self.type_)
        }
    }
}

fn constructor_assisted_parameters(injectable: &Injectable) -> Vec<AssistedParameter> {
    injectable
        .parameters
        .iter()
        .filter(|p| p.assisted.is_some())
        .map(AssistedParameter::of)
        .collect()
}

fn duplicates(parameters: &[AssistedParameter]) -> Vec<&AssistedParameter> {
    let mut seen = HashSet::new();
    parameters.iter().filter(|p| !seen.insert(*p)).collect()
}

fn abstract_methods(manifest: &Manifest, factory: &AssistedFactory) -> Vec<FlattenedMethod> {
    let supertypes = manifest
        .interface(&factory.name)
        .map(|i| i.supertypes.clone())
        .unwrap_or_default();
    flatten_methods(manifest, &factory.name, &factory.methods, &supertypes)
        .into_iter()
        .filter(|m| m.method.is_abstract && !m.method.is_default)
        .collect()
}

fn validate_factory(
    manifest: &Manifest,
    types: &AssistedTypes,
    factory: &AssistedFactory,
) -> Vec<String> {
    let mut errors = Vec::new();
    if !factory.is_abstract {
        errors.push(
            "The @AssistedFactory-annotated type must be either an abstract class or interface."
                .to_owned(),
        );
        return errors;
    }
    if factory.is_nested_non_static {
        errors.push("Nested @AssistedFactory-annotated types must be static. ".to_owned());
    }

    let methods = abstract_methods(manifest, factory);
    if methods.is_empty() {
        errors.push(
            "The @AssistedFactory-annotated type is missing an abstract, non-default method \
             whose return type matches the assisted injection type."
                .to_owned(),
        );
    }
    for method in &methods {
        let return_type = parse_type(&method.method.return_type)
            .map(|t| t.canonical_string_path())
            .unwrap_or_else(|| method.method.return_type.clone());
        if !types.is_assisted_injection(&return_type) {
            errors.push(format!(
                "Invalid return type: {}. An assisted factory's abstract method must return a \
                 type with an @AssistedInject-annotated constructor.",
                return_type
            ));
        }
    }
    if methods.len() > 1 {
        errors.push(format!(
            "The @AssistedFactory-annotated type should contain a single abstract, non-default \
             method but found multiple: [{}]",
            methods
                .iter()
                .map(FlattenedMethod::readable)
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !errors.is_empty() {
        return errors;
    }

    let method = &methods[0];
    let injectable = match parse_type(&method.method.return_type).and_then(|t| {
        manifest.injectables.iter().find(|i| {
            parse_type(&i.name).map(|n| n.path == t.path).unwrap_or(false)
        })
    }) {
        Some(injectable) => injectable,
        None => return errors,
    };
    let factory_parameters: Vec<AssistedParameter> = method
        .method
        .parameters
        .iter()
        .map(AssistedParameter::of)
        .collect();
    for duplicate in duplicates(&factory_parameters) {
        errors.push(format!(
            "@AssistedFactory method has duplicate @Assisted types: {}",
            duplicate
        ));
    }
    let expected = constructor_assisted_parameters(injectable);
    let expected_set: HashSet<&AssistedParameter> = expected.iter().collect();
    let actual_set: HashSet<&AssistedParameter> = factory_parameters.iter().collect();
    if expected_set != actual_set {
        let join = |parameters: &[AssistedParameter]| {
            parameters
                .iter()
                .map(|p| p.type_.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        errors.push(format!(
            "The parameters in the factory method must match the @Assisted parameters in {}.\
             \n    Actual: {}#{}({})\
             \n  Expected: {}#{}({})",
            injectable.name,
            factory.name,
            method.method.method,
            join(&factory_parameters),
            factory.name,
            method.method.method,
            join(&expected),
        ));
    }
    errors
}

fn validate_assisted_injectable(injectable: &Injectable) -> Vec<String> {
    let mut errors = Vec::new();
    if injectable.kind != ConstructorKind::AssistedInject {
        return errors;
    }
    if !injectable.scopes.is_empty() {
        errors.push("A type with an @AssistedInject-annotated constructor cannot be scoped".to_owned());
    }
    for duplicate in duplicates(&constructor_assisted_parameters(injectable)) {
        errors.push(format!(
            "@AssistedInject constructor has duplicate @Assisted type: {}",
            duplicate
        ));
    }
    errors
}

/// Validates `@AssistedFactory` types and `@AssistedInject` constructors.
pub fn validate(manifest: &Manifest, invalid: &mut InvalidElements) -> Vec<Diagnostic> {
    let types = AssistedTypes::new(manifest);
    let mut diagnostics = Vec::new();
    for injectable in &manifest.injectables {
        if invalid.contains_type(&injectable.name) {
            continue;
        }
        let errors = validate_assisted_injectable(injectable);
        if errors.is_empty() {
            continue;
        }
        for message in errors {
            diagnostics.push(
                Diagnostic::error(&message)
                    .with_element(&injectable.name)
                    .with_location(injectable.location.as_ref()),
            );
        }
        invalid.reject_type(&injectable.name);
    }
    for factory in &manifest.assisted_factories {
        if invalid.contains_type(&factory.name) {
            continue;
        }
        let errors = validate_factory(manifest, &types, factory);
        if errors.is_empty() {
            continue;
        }
        for message in errors {
            diagnostics.push(
                Diagnostic::error(&message)
                    .with_element(&factory.name)
                    .with_location(factory.location.as_ref()),
            );
        }
        invalid.reject_type(&factory.name);
    }
    debug!("assisted injection validation found {} problems", diagnostics.len());
    diagnostics
}
