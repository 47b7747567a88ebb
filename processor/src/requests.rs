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

//! Validation of individual dependency requests: constructor and method
//! parameters, injected fields and component entry points.

use crate::assisted::AssistedTypes;
use crate::declarations::parse_type;
use crate::error::Diagnostic;
use crate::superficial::InvalidElements;
use stiletto_common::key::{unwrap_request_type, RequestKind};
use stiletto_common::manifest::{ConstructorKind, Manifest, Parameter, SourceLocation};
use stiletto_common::type_data::{TypeData, Variance};
use tracing::debug;

struct RequestChecker<'a> {
    assisted_types: &'a AssistedTypes,
}

impl RequestChecker<'_> {
    /// Problems with a request written as `type_` with `qualifiers`.
    fn check(&self, type_: &str, qualifiers: &[String]) -> Vec<String> {
        let mut errors = Vec::new();
        if qualifiers.len() > 1 {
            errors.push("A single dependency request may not use more than one @Qualifier".to_owned());
        }
        let requested = match parse_type(type_) {
            Some(requested) => requested,
            None => return errors,
        };
        let (kind, inner) = unwrap_request_type(&requested);
        match kind {
            RequestKind::Instance => {}
            RequestKind::MembersInjection => {
                errors.extend(members_injection_problem(inner));
                return errors;
            }
            _ => {
                if inner.is_wildcard() {
                    errors.push(format!(
                        "Stiletto does not support injecting Provider<T>, Lazy<T>, Producer<T>, \
                         or Produced<T> when T is a wildcard type such as {}",
                        inner
                    ));
                    return errors;
                }
            }
        }
        let path = inner.canonical_string_path();
        if self.assisted_types.is_assisted_injection(&path) {
            errors.push(format!(
                "Stiletto does not support injecting @AssistedInject type, {}. Did you mean to \
                 inject its assisted factory type instead?",
                requested
            ));
        }
        if self.assisted_types.is_assisted_factory(&path)
            && matches!(
                kind,
                RequestKind::Lazy
                    | RequestKind::ProviderOfLazy
                    | RequestKind::Producer
                    | RequestKind::Produced
            )
        {
            errors.push(format!(
                "Stiletto does not support injecting Lazy<T>, Producer<T>, or Produced<T> when T \
                 is an @AssistedFactory-annotated type such as {}",
                path
            ));
        }
        errors
    }

    fn check_parameter(&self, parameter: &Parameter, assisted_allowed: bool) -> Vec<String> {
        if parameter.assisted.is_none() {
            return self.check(&parameter.type_, &parameter.qualifiers);
        }
        let mut errors = Vec::new();
        if !assisted_allowed {
            errors.push(
                "@Assisted parameters can only be used within an @AssistedInject-annotated \
                 constructor."
                    .to_owned(),
            );
        }
        if !parameter.qualifiers.is_empty() {
            errors.push("Qualifiers cannot be used with @Assisted parameters.".to_owned());
        }
        errors
    }
}

/// Why members cannot be injected into `type_`, if they cannot.
pub fn members_injection_problem(type_: &TypeData) -> Option<String> {
    if type_.is_primitive() {
        return Some(format!("Cannot inject members into {}", type_));
    }
    if type_.args.iter().any(|a| a.variance == Variance::Unbounded) {
        return Some(format!(
            "Cannot inject members into types with unbounded type arguments: {}",
            type_
        ));
    }
    None
}

fn report(
    diagnostics: &mut Vec<Diagnostic>,
    errors: Vec<String>,
    element: &str,
    location: Option<&SourceLocation>,
) -> bool {
    let found = !errors.is_empty();
    for message in errors {
        diagnostics.push(
            Diagnostic::error(&message)
                .with_element(element)
                .with_location(location),
        );
    }
    found
}

/// Checks every request site. Elements with bad requests are recorded in `invalid`.
pub fn validate(manifest: &Manifest, invalid: &mut InvalidElements) -> Vec<Diagnostic> {
    let assisted_types = AssistedTypes::new(manifest);
    let checker = RequestChecker {
        assisted_types: &assisted_types,
    };
    let mut diagnostics = Vec::new();

    for injectable in &manifest.injectables {
        if invalid.contains_type(&injectable.name) {
            continue;
        }
        let assisted_allowed = injectable.kind == ConstructorKind::AssistedInject;
        let mut found = false;
        for parameter in &injectable.parameters {
            let errors = checker.check_parameter(parameter, assisted_allowed);
            found |= report(
                &mut diagnostics,
                errors,
                &format!("{}({})", injectable.name, parameter.name),
                injectable.location.as_ref(),
            );
        }
        for member in &injectable.members {
            let errors = checker.check_parameter(member, false);
            found |= report(
                &mut diagnostics,
                errors,
                &format!("{}.{}", injectable.name, member.name),
                injectable.location.as_ref(),
            );
        }
        if found {
            invalid.reject_type(&injectable.name);
        }
    }

    for module in &manifest.modules {
        for method in &module.declarations {
            if invalid.contains_method(&module.name, &method.method) {
                continue;
            }
            let mut found = false;
            for parameter in &method.parameters {
                let errors = checker.check_parameter(parameter, false);
                found |= report(
                    &mut diagnostics,
                    errors,
                    &format!("{}.{}({})", module.name, method.method, parameter.name),
                    method.location.as_ref(),
                );
            }
            if found {
                invalid.add_method(&module.name, &method.method);
                invalid.add_module(&module.name);
            }
        }
    }

    for component in &manifest.components {
        if invalid.contains_type(&component.name) {
            continue;
        }
        let mut found = false;
        for entry_point in &component.entry_points {
            let element = format!("{}.{}", component.name, entry_point.method);
            let errors = match entry_point.parameters.as_slice() {
                [] => checker.check(&entry_point.return_type, &entry_point.qualifiers),
                [parameter] => parse_type(&parameter.type_)
                    .and_then(|t| members_injection_problem(&t))
                    .into_iter()
                    .collect(),
                _ => vec![
                    "Members injection methods may only have a single parameter".to_owned(),
                ],
            };
            found |= report(
                &mut diagnostics,
                errors,
                &element,
                entry_point.location.as_ref(),
            );
        }
        if found {
            invalid.reject_type(&component.name);
        }
    }
    debug!("request validation found {} problems", diagnostics.len());
    diagnostics
}
