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

//! Checks the signature of each binding method before it becomes a declaration.

use crate::assisted::AssistedTypes;
use crate::declarations::parse_type;
use crate::error::Diagnostic;
use crate::superficial::InvalidElements;
use std::collections::{HashMap, HashSet};
use stiletto_common::key::{is_map, is_optional, is_set, FrameworkType};
use stiletto_common::manifest::{
    BindingMethod, BindingMethodKind, ContributionType, Manifest, Module,
};
use stiletto_common::type_data::TypeData;
use tracing::debug;

const OBJECT: &str = "java.lang.Object";

/// Subtyping as far as the manifest lets us know it.
///
/// Types the manifest knows nothing about are assumed to be assignable, the
/// front-end has already checked them against the real hierarchy.
pub struct TypeHierarchy<'a> {
    manifest: &'a Manifest,
}

fn well_known_supertypes(path: &str) -> Option<&'static [&'static str]> {
    Some(match path {
        "java.lang.String" => &["java.lang.CharSequence", "java.lang.Comparable"],
        "java.lang.Integer" | "java.lang.Long" | "java.lang.Double" | "java.lang.Float"
        | "java.lang.Short" | "java.lang.Byte" => &["java.lang.Number", "java.lang.Comparable"],
        "java.lang.Boolean" | "java.lang.Character" => &["java.lang.Comparable"],
        "java.lang.Number" | "java.lang.CharSequence" | "java.lang.Comparable" => &[],
        "java.util.List" | "java.util.Set" => &["java.util.Collection"],
        "java.util.Collection" => &["java.lang.Iterable"],
        "java.util.Map" | "java.lang.Iterable" => &[],
        _ => return None,
    })
}

fn boxed(primitive: &str) -> Option<&'static str> {
    Some(match primitive {
        "boolean" => "java.lang.Boolean",
        "byte" => "java.lang.Byte",
        "short" => "java.lang.Short",
        "char" => "java.lang.Character",
        "int" => "java.lang.Integer",
        "long" => "java.lang.Long",
        "float" => "java.lang.Float",
        "double" => "java.lang.Double",
        _ => return None,
    })
}

impl<'a> TypeHierarchy<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        TypeHierarchy { manifest }
    }

    fn supertypes(&self, path: &str) -> Option<Vec<String>> {
        if let Some(interface) = self.manifest.interface(path) {
            return Some(interface.supertypes.clone());
        }
        well_known_supertypes(path).map(|s| s.iter().map(|s| s.to_string()).collect())
    }

    fn is_known(&self, path: &str) -> bool {
        path == OBJECT || self.supertypes(path).is_some()
    }

    fn extends(&self, from: &str, to: &str, visited: &mut HashSet<String>) -> Option<bool> {
        if from == to {
            return Some(true);
        }
        if !visited.insert(from.to_owned()) {
            return Some(false);
        }
        let supertypes = self.supertypes(from)?;
        let mut unknown = false;
        for supertype in &supertypes {
            match self.extends(supertype, to, visited) {
                Some(true) => return Some(true),
                Some(false) => {}
                None => unknown = true,
            }
        }
        if unknown {
            None
        } else {
            Some(false)
        }
    }

    pub fn is_assignable(&self, from: &TypeData, to: &TypeData) -> bool {
        if from == to {
            return true;
        }
        if from.is_primitive() || to.is_primitive() {
            return boxed(&from.path) == Some(to.path.as_str())
                || boxed(&to.path) == Some(from.path.as_str())
                || (to.path == OBJECT && boxed(&from.path).is_some());
        }
        if to.path == OBJECT {
            return true;
        }
        if from.path == to.path {
            return from.args.is_empty()
                || to.args.is_empty()
                || to.args.iter().zip(&from.args).all(|(t, f)| {
                    t == f || (t.is_wildcard() && self.is_assignable(f, &t.without_variance()))
                });
        }
        if from.path == OBJECT {
            return false;
        }
        if !self.is_known(&from.path) {
            return true;
        }
        self.extends(&from.path, &to.path, &mut HashSet::new())
            .unwrap_or(true)
    }
}

fn is_unchecked(exception: &str) -> bool {
    let name = exception.rsplit('.').next().unwrap_or(exception);
    name.ends_with("RuntimeException") || name.ends_with("Error")
}

/// Prefix used for every message about `method`, e.g. `@Provides methods`.
fn subject(method: &BindingMethod) -> String {
    format!("{} methods", method.kind.annotation())
}

fn is_framework_return(type_: &TypeData) -> bool {
    match type_.path.as_str() {
        "javax.inject.Provider" | "jakarta.inject.Provider" => true,
        _ => matches!(
            FrameworkType::of(type_),
            Some(FrameworkType::Lazy)
                | Some(FrameworkType::MembersInjector)
                | Some(FrameworkType::Producer)
                | Some(FrameworkType::Produced)
        ),
    }
}

fn mentions_disallowed_type(type_: &TypeData) -> bool {
    type_.walk().iter().any(|t| t.path == "dagger.internal.Provider")
}

struct MethodChecker<'a> {
    hierarchy: &'a TypeHierarchy<'a>,
    assisted_types: &'a AssistedTypes,
    errors: Vec<String>,
}

impl MethodChecker<'_> {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn check(&mut self, method: &BindingMethod) {
        let subject = subject(method);
        let return_type = match parse_type(&method.return_type) {
            Some(return_type) => return_type,
            None => return,
        };
        match method.kind {
            BindingMethodKind::Provides | BindingMethodKind::Produces => {
                self.check_provides(method, &subject)
            }
            BindingMethodKind::Binds => self.check_binds(method, &return_type, &subject),
            BindingMethodKind::Multibinds => {
                self.check_multibinds(method, &return_type, &subject);
                return;
            }
            BindingMethodKind::BindsOptionalOf => {
                self.check_binds_optional_of(method, &return_type, &subject);
                return;
            }
        }
        if method.is_private {
            self.error(format!("{} cannot be private", subject));
        }
        if !method.type_parameters.is_empty() {
            self.error(format!("{} may not have type parameters", subject));
        }
        if method.qualifiers.len() > 1 {
            self.error(format!("{} may not use more than one @Qualifier", subject));
        }
        if method.scopes.len() > 1 {
            self.error(format!("{} cannot use more than one @Scope", subject));
        }
        if return_type.path == "void" {
            self.error(format!("{} must return a value (not void)", subject));
            return;
        }
        self.check_contribution(method, &return_type, &subject);
        self.check_assisted_return(&return_type);
    }

    fn check_provides(&mut self, method: &BindingMethod, subject: &str) {
        if method.is_abstract {
            self.error(format!("{} cannot be abstract", subject));
        }
        if method.kind == BindingMethodKind::Produces && !method.scopes.is_empty() {
            self.error(format!("{} cannot be scoped", subject));
        }
        if method.kind == BindingMethodKind::Provides
            && method.throws.iter().any(|t| !is_unchecked(t))
        {
            self.error(format!("{} may only throw unchecked exceptions", subject));
        }
    }

    fn check_binds(&mut self, method: &BindingMethod, return_type: &TypeData, subject: &str) {
        if !method.is_abstract {
            self.error(format!("{} must be abstract", subject));
        }
        if !method.throws.is_empty() {
            self.error(format!("{} may not throw", subject));
        }
        let assignable = match method.parameters.as_slice() {
            [parameter] => parse_type(&parameter.type_)
                .map(|p| self.hierarchy.is_assignable(&p, return_type))
                .unwrap_or(true),
            _ => false,
        };
        if !assignable {
            self.error(
                "@Binds methods must have exactly one parameter, whose type is assignable to \
                 the return type"
                    .to_owned(),
            );
        }
        if let [parameter] = method.parameters.as_slice() {
            if parameter.nullable != method.nullable {
                self.error(
                    "@Binds methods' nullability must match the nullability of its parameter"
                        .to_owned(),
                );
            }
        }
    }

    fn check_contribution(&mut self, method: &BindingMethod, return_type: &TypeData, subject: &str) {
        match method.contribution {
            ContributionType::IntoMap => match method.map_keys.len() {
                0 => self.error(format!("{} of type map must declare a map key", subject)),
                1 => {}
                _ => self.error(format!("{} may not have more than one map key", subject)),
            },
            _ => {
                if !method.map_keys.is_empty() {
                    self.error(format!("{} of non map type cannot declare a map key", subject));
                }
            }
        }
        if method.contribution == ContributionType::ElementsIntoSet {
            if !is_set(return_type) {
                self.error(format!(
                    "{} annotated with @ElementsIntoSet must return a Set",
                    subject
                ));
            } else if return_type.args.is_empty() {
                self.error(format!(
                    "{} annotated with @ElementsIntoSet cannot return a raw Set",
                    subject
                ));
            }
        }
        let subject = match method.contribution {
            ContributionType::IntoMap => format!("{} with @IntoMap", subject),
            _ => subject.to_owned(),
        };
        if is_framework_return(return_type) {
            self.error(format!("{} must not return framework types", subject));
        } else if mentions_disallowed_type(return_type) {
            self.error(format!("{} must not return disallowed types", subject));
        }
    }

    fn check_assisted_return(&mut self, return_type: &TypeData) {
        let path = return_type.canonical_string_path();
        if self.assisted_types.is_assisted_injection(&path) {
            self.error(format!(
                "[{}] Stiletto does not support providing @AssistedInject types.",
                path
            ));
        }
        if self.assisted_types.is_assisted_factory(&path) {
            self.error(format!(
                "[{}] Stiletto does not support providing @AssistedFactory types.",
                path
            ));
        }
    }

    fn check_multibinds(&mut self, method: &BindingMethod, return_type: &TypeData, subject: &str) {
        if !method.is_abstract {
            self.error(format!("{} must be abstract", subject));
        }
        if !method.parameters.is_empty() {
            self.error(format!("{} cannot have parameters", subject));
        }
        if method.qualifiers.len() > 1 {
            self.error(format!("{} may not use more than one @Qualifier", subject));
        }
        if is_map(return_type) {
            let args = &return_type.args;
            if args.len() != 2 {
                self.error(format!("{} return type cannot be a raw Map type", subject));
                return;
            }
            if args[0].is_wildcard() {
                self.error(format!(
                    "{} return type cannot use a wildcard as the Map key type.",
                    subject
                ));
            }
            if args[1].is_wildcard() {
                self.error(format!(
                    "{} return type cannot use a wildcard as the Map value type.",
                    subject
                ));
            }
            if let Some(framework) = FrameworkType::of(&args[1]) {
                if matches!(
                    framework,
                    FrameworkType::Provider | FrameworkType::Producer | FrameworkType::Produced
                ) {
                    self.error(format!(
                        "{} return type cannot use '{}' in the Map value type.",
                        subject,
                        framework.simple_name()
                    ));
                }
            }
        } else if is_set(return_type) {
            let element = match return_type.args.first() {
                Some(element) => element,
                None => {
                    self.error(format!("{} return type cannot be a raw Set type", subject));
                    return;
                }
            };
            if element.is_wildcard() {
                self.error(format!(
                    "{} return type cannot use a wildcard as the Set value type.",
                    subject
                ));
            }
            if FrameworkType::of(element) == Some(FrameworkType::Produced) {
                self.error(format!(
                    "{} return type cannot use 'Produced' in the Set value type.",
                    subject
                ));
            }
        } else {
            self.error(format!(
                "{} return type must be either a Set or Map type.",
                subject
            ));
        }
    }

    fn check_binds_optional_of(
        &mut self,
        method: &BindingMethod,
        return_type: &TypeData,
        subject: &str,
    ) {
        if !method.is_abstract {
            self.error(format!("{} must be abstract", subject));
        }
        if !method.parameters.is_empty() {
            self.error(format!("{} cannot have parameters", subject));
        }
        if !method.scopes.is_empty() {
            self.error(format!("{} cannot be scoped", subject));
        }
        if method.qualifiers.len() > 1 {
            self.error(format!("{} may not use more than one @Qualifier", subject));
        }
        if is_optional(return_type) {
            self.error(format!("{} cannot return Optional types", subject));
        }
        if return_type.path == "void" {
            self.error(format!("{} must return a value (not void)", subject));
        }
        self.check_assisted_return(return_type);
    }
}

fn check_module(module: &Module) -> Vec<String> {
    let mut errors = Vec::new();
    let has_instance = module
        .declarations
        .iter()
        .any(|m| !m.is_static && !m.is_abstract);
    let has_abstract = module.declarations.iter().any(|m| m.is_abstract);
    if has_instance && has_abstract {
        errors.push("A @Module may not contain both non-static and abstract binding methods".to_owned());
    }
    let mut names: HashMap<&str, usize> = HashMap::new();
    for method in &module.declarations {
        *names.entry(method.method.as_str()).or_default() += 1;
    }
    if names.values().any(|count| *count > 1) {
        errors.push(
            "Cannot have more than one binding method with the same name in a single module"
                .to_owned(),
        );
    }
    errors
}

/// Validates every binding method and module. Methods with errors are
/// recorded in `invalid`, as is the module that declares them.
pub fn validate(manifest: &Manifest, invalid: &mut InvalidElements) -> Vec<Diagnostic> {
    let hierarchy = TypeHierarchy::new(manifest);
    let assisted_types = AssistedTypes::new(manifest);

    let mut diagnostics = Vec::new();
    for module in &manifest.modules {
        for message in check_module(module) {
            diagnostics.push(
                Diagnostic::error(&message)
                    .with_element(&module.name)
                    .with_location(module.location.as_ref()),
            );
            invalid.add_module(&module.name);
        }
        for method in &module.declarations {
            if invalid.contains_method(&module.name, &method.method) {
                continue;
            }
            let mut checker = MethodChecker {
                hierarchy: &hierarchy,
                assisted_types: &assisted_types,
                errors: Vec::new(),
            };
            checker.check(method);
            if checker.errors.is_empty() {
                continue;
            }
            for message in checker.errors {
                diagnostics.push(
                    Diagnostic::error(&message)
                        .with_element(&format!("{}.{}", module.name, method.method))
                        .with_location(method.location.as_ref()),
                );
            }
            invalid.add_method(&module.name, &method.method);
            invalid.add_module(&module.name);
        }
    }
    debug!("binding method validation found {} problems", diagnostics.len());
    diagnostics
}
