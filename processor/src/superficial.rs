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

//! Rejects declarations that mention types the front-end could not resolve,
//! before anything tries to build keys out of them.

use crate::error::Diagnostic;
use std::collections::{HashMap, HashSet};
use stiletto_common::manifest::{
    AssistedFactory, BindingMethod, Component, Injectable, Manifest, Module, Parameter,
    SourceLocation,
};
use stiletto_common::type_data::{TypeData, Variance};
use tracing::debug;

/// Why an element could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// The type that could not be resolved, as written.
    pub missing_type: String,
    /// `element (CLASS): test.Foo` style frames, outermost first.
    pub trace: Vec<String>,
    pub location: Option<SourceLocation>,
}

impl ValidationFailure {
    /// The error for `step` failing on `element`.
    pub fn diagnostic(&self, step: &str, element: &str) -> Diagnostic {
        let mut message = format!(
            "{} was unable to process '{}' because '{}' could not be resolved.\n  \n  \
             Dependency trace:",
            step, element, self.missing_type
        );
        for frame in &self.trace {
            message.push_str("\n      => ");
            message.push_str(frame);
        }
        Diagnostic::error(&message)
            .with_element(element)
            .with_location(self.location.as_ref())
    }
}

/// Elements excluded from graph building.
#[derive(Debug, Default, Clone)]
pub struct InvalidElements {
    methods: HashSet<(String, String)>,
    types: HashMap<String, ValidationFailure>,
    /// Types that resolved fine but were rejected by a later check.
    rejected: HashSet<String>,
    modules: HashSet<String>,
}

impl InvalidElements {
    pub fn add_method(&mut self, module: &str, method: &str) {
        self.methods.insert((module.to_owned(), method.to_owned()));
    }

    pub fn contains_method(&self, module: &str, method: &str) -> bool {
        self.methods
            .contains(&(module.to_owned(), method.to_owned()))
    }

    pub fn add_type(&mut self, name: &str, failure: ValidationFailure) {
        self.types.entry(name.to_owned()).or_insert(failure);
    }

    pub fn reject_type(&mut self, name: &str) {
        self.rejected.insert(name.to_owned());
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.rejected.contains(name)
    }

    pub fn type_failure(&self, name: &str) -> Option<&ValidationFailure> {
        self.types.get(name)
    }

    /// Marks a module whose own declarations have errors.
    pub fn add_module(&mut self, name: &str) {
        self.modules.insert(name.to_owned());
    }

    pub fn contains_module(&self, name: &str) -> bool {
        self.modules.contains(name)
    }
}

struct TypeChecker<'a> {
    unresolved: &'a HashSet<String>,
}

impl TypeChecker<'_> {
    fn is_unresolved(&self, type_: &TypeData) -> bool {
        self.unresolved.contains(&type_.path) || self.unresolved.contains(type_.simple_name())
    }

    /// Frames leading to the first unresolved type inside `type_`, with the
    /// offending type name.
    fn check(&self, written: &str, label: &str) -> Option<(String, Vec<String>)> {
        let type_ = match written.parse::<TypeData>() {
            Ok(type_) => type_,
            Err(_) => {
                return Some((
                    written.to_owned(),
                    vec![format!("type (ERROR {}): {}", label, written)],
                ))
            }
        };
        let mut frames = Vec::new();
        let missing = self.walk(&type_, label, &mut frames)?;
        Some((missing, frames))
    }

    fn walk(&self, type_: &TypeData, label: &str, frames: &mut Vec<String>) -> Option<String> {
        let bound_label = match type_.variance {
            Variance::Unbounded => return None,
            Variance::Super => Some("super bound type"),
            Variance::Extends => Some("extends bound type"),
            Variance::Invariant => None,
        };
        if let Some(bound_label) = bound_label {
            let bound = TypeData {
                variance: Variance::Invariant,
                ..type_.clone()
            };
            frames.push(format!("type (WILDCARD {}): {}", label, type_));
            let missing = self.walk(&bound, bound_label, frames);
            if missing.is_none() {
                frames.pop();
            }
            return missing;
        }
        if self.is_unresolved(type_) {
            frames.push(format!("type (ERROR {}): {}", label, type_));
            return Some(type_.canonical_string_path());
        }
        frames.push(format!("type (DECLARED {}): {}", label, type_));
        for arg in &type_.args {
            if let Some(missing) = self.walk(arg, "type argument", frames) {
                return Some(missing);
            }
        }
        frames.pop();
        None
    }

    fn check_annotations(&self, annotations: &[String]) -> Option<(String, Vec<String>)> {
        for annotation in annotations {
            let name = annotation
                .trim_start_matches('@')
                .split('(')
                .next()
                .unwrap_or_default();
            let unresolved = self.unresolved.contains(name)
                || name
                    .rsplit('.')
                    .next()
                    .map(|simple| self.unresolved.contains(simple))
                    .unwrap_or(false);
            if unresolved {
                return Some((
                    name.to_owned(),
                    vec![
                        format!("annotation: @{}", name),
                        format!("type (ERROR annotation type): {}", name),
                    ],
                ));
            }
        }
        None
    }

    fn check_parameters(
        &self,
        parameters: &[Parameter],
        executable_frame: &str,
    ) -> Option<(String, Vec<String>)> {
        for parameter in parameters {
            if let Some((missing, mut frames)) = self.check(&parameter.type_, "parameter type") {
                frames.insert(0, executable_frame.to_owned());
                return Some((missing, frames));
            }
            if let Some((missing, mut frames)) = self.check_annotations(&parameter.qualifiers) {
                frames.insert(0, format!("element (PARAMETER): {}", parameter.name));
                return Some((missing, frames));
            }
        }
        None
    }
}

fn written_parameters(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| p.type_.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn method_element(method: &BindingMethod) -> String {
    format!("{}({})", method.method, written_parameters(&method.parameters))
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn validate_binding_method(checker: &TypeChecker, method: &BindingMethod) -> Option<(String, Vec<String>)> {
    let (missing, frames) = checker
        .check(&method.return_type, "return type")
        .or_else(|| {
            checker.check_parameters(
                &method.parameters,
                &format!(
                    "type (EXECUTABLE method): ({}){}",
                    written_parameters(&method.parameters),
                    method.return_type
                ),
            )
        })
        .or_else(|| checker.check_annotations(&method.qualifiers))
        .or_else(|| checker.check_annotations(&method.scopes))
        .or_else(|| {
            method
                .map_keys
                .iter()
                .find_map(|k| checker.check(&k.key_type, "map key type"))
        })?;
    let mut trace = vec![format!("element (METHOD): {}", method_element(method))];
    trace.extend(frames);
    Some((missing, trace))
}

fn validate_module(
    checker: &TypeChecker,
    module: &Module,
    invalid: &mut InvalidElements,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut module_failure: Option<ValidationFailure> = None;
    for method in &module.declarations {
        let (missing, frames) = match validate_binding_method(checker, method) {
            Some(failure) => failure,
            None => continue,
        };
        let mut trace = vec![format!("element (CLASS): {}", module.name)];
        trace.extend(frames);
        let failure = ValidationFailure {
            missing_type: missing,
            trace,
            location: method.location.clone(),
        };
        diagnostics.push(failure.diagnostic("BindingMethodProcessingStep", &method_element(method)));
        invalid.add_method(&module.name, &method.method);
        if module_failure.is_none() {
            module_failure = Some(ValidationFailure {
                location: module.location.clone(),
                ..failure
            });
        }
    }
    if let Some(failure) = module_failure {
        diagnostics.push(failure.diagnostic("ModuleProcessingStep", &module.name));
        invalid.add_module(&module.name);
    }
}

fn validate_injectable(checker: &TypeChecker, injectable: &Injectable) -> Option<ValidationFailure> {
    let constructor = format!(
        "{}({})",
        simple_name(&injectable.name),
        written_parameters(&injectable.parameters)
    );
    let mut trace = vec![format!("element (CLASS): {}", injectable.name)];
    if let Some((missing, frames)) = checker
        .check_annotations(&injectable.scopes)
        .or_else(|| checker.check_annotations(&injectable.qualifiers))
    {
        trace.extend(frames);
        return Some(ValidationFailure {
            missing_type: missing,
            trace,
            location: injectable.location.clone(),
        });
    }
    if let Some((missing, frames)) = checker.check_parameters(
        &injectable.parameters,
        &format!(
            "type (EXECUTABLE constructor): ({})void",
            written_parameters(&injectable.parameters)
        ),
    ) {
        trace.push(format!("element (CONSTRUCTOR): {}", constructor));
        trace.extend(frames);
        return Some(ValidationFailure {
            missing_type: missing,
            trace,
            location: injectable.location.clone(),
        });
    }
    for member in &injectable.members {
        if let Some((missing, frames)) = checker.check(&member.type_, "field type") {
            trace.push(format!("element (FIELD): {}", member.name));
            trace.extend(frames);
            return Some(ValidationFailure {
                missing_type: missing,
                trace,
                location: injectable.location.clone(),
            });
        }
    }
    None
}

fn validate_assisted_factory(
    checker: &TypeChecker,
    factory: &AssistedFactory,
) -> Option<ValidationFailure> {
    for method in &factory.methods {
        let failure = checker
            .check(&method.return_type, "return type")
            .or_else(|| {
                checker.check_parameters(
                    &method.parameters,
                    &format!(
                        "type (EXECUTABLE method): ({}){}",
                        written_parameters(&method.parameters),
                        method.return_type
                    ),
                )
            });
        if let Some((missing, frames)) = failure {
            let mut trace = vec![
                format!("element (CLASS): {}", factory.name),
                format!(
                    "element (METHOD): {}({})",
                    method.method,
                    written_parameters(&method.parameters)
                ),
            ];
            trace.extend(frames);
            return Some(ValidationFailure {
                missing_type: missing,
                trace,
                location: method.location.clone().or_else(|| factory.location.clone()),
            });
        }
    }
    None
}

fn validate_component(checker: &TypeChecker, component: &Component) -> Option<ValidationFailure> {
    let failure = |missing: String, frames: Vec<String>| {
        let mut trace = vec![format!("element (CLASS): {}", component.name)];
        trace.extend(frames);
        Some(ValidationFailure {
            missing_type: missing,
            trace,
            location: component.location.clone(),
        })
    };
    if let Some((missing, frames)) = checker.check_annotations(&component.scopes) {
        return failure(missing, frames);
    }
    for name in component.modules.iter().chain(component.dependencies.iter()) {
        if let Some((missing, frames)) = checker.check(name, "annotation value") {
            return failure(missing, frames);
        }
    }
    for entry_point in &component.entry_points {
        let found = if entry_point.parameters.is_empty() {
            checker.check(&entry_point.return_type, "return type")
        } else {
            checker.check_parameters(
                &entry_point.parameters,
                &format!(
                    "type (EXECUTABLE method): ({}){}",
                    written_parameters(&entry_point.parameters),
                    entry_point.return_type
                ),
            )
        }
        .or_else(|| checker.check_annotations(&entry_point.qualifiers));
        if let Some((missing, frames)) = found {
            let mut frames_with_method = vec![format!(
                "element (METHOD): {}({})",
                entry_point.method,
                written_parameters(&entry_point.parameters)
            )];
            frames_with_method.extend(frames);
            return failure(missing, frames_with_method);
        }
    }
    None
}

/// Checks every element of the manifest. Invalid elements are recorded in the
/// returned set and reported once each.
pub fn validate(manifest: &Manifest) -> (InvalidElements, Vec<Diagnostic>) {
    let unresolved: HashSet<String> = manifest.unresolved_types.iter().cloned().collect();
    let checker = TypeChecker {
        unresolved: &unresolved,
    };
    let mut invalid = InvalidElements::default();
    let mut diagnostics = Vec::new();

    for module in &manifest.modules {
        validate_module(&checker, module, &mut invalid, &mut diagnostics);
    }
    for injectable in &manifest.injectables {
        if let Some(failure) = validate_injectable(&checker, injectable) {
            let constructor = format!(
                "{}({})",
                simple_name(&injectable.name),
                written_parameters(&injectable.parameters)
            );
            diagnostics.push(failure.diagnostic("InjectProcessingStep", &constructor));
            invalid.add_type(&injectable.name, failure);
        }
    }
    for factory in &manifest.assisted_factories {
        if let Some(failure) = validate_assisted_factory(&checker, factory) {
            diagnostics.push(failure.diagnostic("AssistedFactoryProcessingStep", &factory.name));
            invalid.add_type(&factory.name, failure);
        }
    }
    for component in &manifest.components {
        if let Some(failure) = validate_component(&checker, component) {
            diagnostics.push(failure.diagnostic("ComponentProcessingStep", &component.name));
            invalid.add_type(&component.name, failure);
        }
    }
    debug!(
        "superficial validation found {} unresolvable elements",
        diagnostics.len()
    );
    (invalid, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with_unresolved(types: &[&str]) -> Manifest {
        let mut manifest = Manifest::new();
        manifest.unresolved_types = types.iter().map(|t| t.to_string()).collect();
        manifest
    }

    #[test]
    fn constructor_parameter_trace() {
        let mut manifest = manifest_with_unresolved(&["UnresolvableDependency"]);
        manifest.injectables.push(Injectable {
            name: "test.Bar".to_owned(),
            parameters: vec![Parameter {
                name: "dep".to_owned(),
                type_: "UnresolvableDependency".to_owned(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let (invalid, diagnostics) = validate(&manifest);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "InjectProcessingStep was unable to process 'Bar(UnresolvableDependency)' because \
             'UnresolvableDependency' could not be resolved.\n  \n  Dependency trace:\n      \
             => element (CLASS): test.Bar\n      \
             => element (CONSTRUCTOR): Bar(UnresolvableDependency)\n      \
             => type (EXECUTABLE constructor): (UnresolvableDependency)void\n      \
             => type (ERROR parameter type): UnresolvableDependency"
        );
        assert!(invalid.contains_type("test.Bar"));
    }

    #[test]
    fn nested_type_argument_trace() {
        let mut manifest = manifest_with_unresolved(&["MissingType"]);
        manifest.modules.push(Module {
            name: "test.M".to_owned(),
            declarations: vec![BindingMethod {
                method: "blah".to_owned(),
                return_type: "Map<Set<?>, MissingType>".to_owned(),
                ..Default::default()
            }],
            ..Module::new()
        });
        let (invalid, diagnostics) = validate(&manifest);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics[0].message.ends_with(
            "=> element (CLASS): test.M\n      \
             => element (METHOD): blah()\n      \
             => type (DECLARED return type): java.util.Map<java.util.Set<?>,MissingType>\n      \
             => type (ERROR type argument): MissingType"
        ));
        assert!(diagnostics[1]
            .message
            .starts_with("ModuleProcessingStep was unable to process 'test.M'"));
        assert!(invalid.contains_method("test.M", "blah"));
        assert!(invalid.contains_module("test.M"));
    }

    #[test]
    fn wildcard_bound_trace() {
        let unresolved: HashSet<String> = ["MissingType".to_owned()].into_iter().collect();
        let checker = TypeChecker {
            unresolved: &unresolved,
        };
        let (missing, frames) = checker
            .check("test.Foo<? extends MissingType>", "return type")
            .unwrap();
        assert_eq!(missing, "MissingType");
        assert_eq!(
            frames,
            vec![
                "type (DECLARED return type): test.Foo<? extends MissingType>",
                "type (WILDCARD type argument): ? extends MissingType",
                "type (ERROR extends bound type): MissingType",
            ]
        );
    }

    #[test]
    fn resolved_types_pass() {
        let unresolved = HashSet::new();
        let checker = TypeChecker {
            unresolved: &unresolved,
        };
        assert!(checker.check("java.util.List<? super test.Foo>", "return type").is_none());
    }
}
