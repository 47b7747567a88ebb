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

//! Typed binding declarations, built from the parts of the manifest that
//! passed validation.

use crate::components::ComponentDescriptor;
use crate::superficial::InvalidElements;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use stiletto_common::environment::ProcessingEnv;
use stiletto_common::key::{FrameworkType, Key, MultibindingContributionIdentifier, RequestKind};
use stiletto_common::manifest::{
    AssistedFactory, BindingMethod, BindingMethodKind, ConstructorKind, ContributionType,
    Injectable, Manifest, Method, Module, Parameter, SourceLocation,
};
use stiletto_common::type_data::{canonical_annotation, TypeData};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BindingDeclarationKind {
    Injection,
    AssistedInjection,
    AssistedFactory,
    Provides,
    Produces,
    Binds,
    Multibinds,
    BindsOptionalOf,
    BindsInstance,
    SubcomponentCreator,
    ComponentDependency,
    ComponentDependencyProvision,
    Component,
}

/// An edge-to-be: something at `element` asks for `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub kind: RequestKind,
    pub key: Key,
    /// The type as written at the request site, e.g. `Provider<test.C>`.
    pub requested_type: TypeData,
    /// Request site such as `test.Foo(bar)`; `None` for synthetic requests.
    pub element: Option<String>,
    pub nullable: bool,
    pub location: Option<SourceLocation>,
}

impl DependencyRequest {
    pub fn synthetic(kind: RequestKind, key: Key) -> Self {
        DependencyRequest {
            kind,
            requested_type: kind.type_for(&key.type_),
            key,
            element: None,
            nullable: false,
            location: None,
        }
    }

    /// The requested type with its qualifier, as shown in traces.
    pub fn readable(&self) -> String {
        match &self.key.qualifier {
            Some(qualifier) => format!("@{} {}", qualifier, self.requested_type),
            None => self.requested_type.canonical_string_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapKeyData {
    pub annotation_type: String,
    pub key_type: TypeData,
    pub value: String,
}

impl MapKeyData {
    pub fn readable(&self) -> String {
        format!("@{}({})", self.annotation_type, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDeclaration {
    /// Position in source declaration order. Diagnostics sort on this.
    pub order: usize,
    pub kind: BindingDeclarationKind,
    pub key: Key,
    pub contribution: ContributionType,
    pub map_key: Option<MapKeyData>,
    pub dependencies: Vec<DependencyRequest>,
    pub scope: Option<String>,
    /// Declaring module or type.
    pub module: Option<String>,
    /// Formatted declaration, e.g. `@Provides test.A test.AModule.provideA(java.lang.String)`.
    pub element: String,
    pub subcomponent: Option<String>,
    /// Binding method name, for declarations made by a module method.
    pub method: Option<String>,
    /// Return type as written, before wildcard normalization.
    pub declared_type: Option<TypeData>,
    pub nullable: bool,
    pub location: Option<SourceLocation>,
}

impl BindingDeclaration {
    pub fn is_multibinding_contribution(&self) -> bool {
        self.contribution.is_multibinding()
    }

    /// For contributions, the multibound key they contribute to.
    pub fn multibinding_key(&self) -> Key {
        self.key.without_contribution()
    }

    /// Short form used in notes, `test.Module.method()`.
    pub fn short_element(&self) -> String {
        match (&self.module, &self.method) {
            (Some(module), Some(method)) => format!(
                "{}.{}({})",
                module,
                method,
                if self.dependencies.is_empty() { "" } else { "…" }
            ),
            _ => self.element.clone(),
        }
    }

    /// Declarations are listed by declaring type, then by method.
    pub fn sort_key(&self) -> (String, String, usize) {
        (
            self.module.clone().unwrap_or_default(),
            self.method.clone().unwrap_or_default(),
            self.order,
        )
    }
}

pub fn parse_type(type_: &str) -> Option<TypeData> {
    type_.parse().ok()
}

fn format_parameters(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let type_ = parse_type(&p.type_)
                .map(|t| t.canonical_string_path())
                .unwrap_or_else(|| p.type_.clone());
            match p.qualifiers.first() {
                Some(q) => format!("@{} {}", canonical_annotation(q), type_),
                None => type_,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `owner(…, name, …)`: the parameter at `index` with its siblings elided.
pub fn parameter_element(owner: &str, parameters: &[Parameter], index: usize) -> String {
    let name = parameters.get(index).map(|p| p.name.as_str()).unwrap_or("");
    let before = if index > 0 { "…, " } else { "" };
    let after = if index + 1 < parameters.len() { ", …" } else { "" };
    format!("{}({}{}{})", owner, before, name, after)
}

/// Builds the request for a parameter, field or method return type.
pub fn request_for(
    env: &ProcessingEnv,
    type_: &str,
    qualifiers: &[String],
    element: String,
    nullable: bool,
    location: Option<&SourceLocation>,
) -> Option<DependencyRequest> {
    let requested_type = parse_type(type_)?;
    let (kind, key) = env
        .key_factory
        .request(&requested_type, qualifiers.first().map(String::as_str));
    Some(DependencyRequest {
        kind,
        key,
        requested_type,
        element: Some(element),
        nullable,
        location: location.cloned(),
    })
}

fn parameter_request(
    env: &ProcessingEnv,
    parameter: &Parameter,
    element: String,
    location: Option<&SourceLocation>,
) -> Option<DependencyRequest> {
    request_for(
        env,
        &parameter.type_,
        &parameter.qualifiers,
        element,
        parameter.nullable,
        location,
    )
}

/// Every declaration known to a processing pass, independent of components.
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    module_declarations: HashMap<String, Vec<Rc<BindingDeclaration>>>,
    injection: HashMap<TypeData, Rc<BindingDeclaration>>,
    assisted_injection: HashMap<TypeData, Rc<BindingDeclaration>>,
    members_injection: HashMap<TypeData, Vec<DependencyRequest>>,
    assisted_factories: HashMap<TypeData, Rc<BindingDeclaration>>,
    next_order: Cell<usize>,
}

impl DeclarationRegistry {
    pub fn new(env: &ProcessingEnv, manifest: &Manifest, invalid: &InvalidElements) -> Self {
        let mut registry = DeclarationRegistry::default();
        for module in &manifest.modules {
            let declarations = module
                .declarations
                .iter()
                .filter(|method| !invalid.contains_method(&module.name, &method.method))
                .filter_map(|method| registry.binding_method(env, module, method))
                .map(Rc::new)
                .collect();
            registry
                .module_declarations
                .insert(module.name.clone(), declarations);
        }
        for injectable in &manifest.injectables {
            if invalid.contains_type(&injectable.name) {
                continue;
            }
            registry.add_injectable(env, injectable);
        }
        for factory in &manifest.assisted_factories {
            if invalid.contains_type(&factory.name) {
                continue;
            }
            if let Some(declaration) = registry.assisted_factory_declaration(env, factory) {
                let key_type = declaration.key.type_.clone();
                registry
                    .assisted_factories
                    .insert(key_type, Rc::new(declaration));
            }
        }
        trace!(
            "registered {} modules, {} injectables",
            registry.module_declarations.len(),
            registry.injection.len() + registry.assisted_injection.len()
        );
        registry
    }

    pub fn next_order(&self) -> usize {
        let order = self.next_order.get();
        self.next_order.set(order + 1);
        order
    }

    pub fn module_declarations(&self, module: &str) -> &[Rc<BindingDeclaration>] {
        self.module_declarations
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `@Inject` constructor binding for an unqualified key.
    pub fn injection_binding(&self, key: &Key) -> Option<&Rc<BindingDeclaration>> {
        if key.qualifier.is_some() || key.multibinding_contribution.is_some() {
            return None;
        }
        self.injection.get(&key.type_)
    }

    pub fn assisted_injection_binding(&self, type_: &TypeData) -> Option<&Rc<BindingDeclaration>> {
        self.assisted_injection.get(type_)
    }

    pub fn is_assisted_injection_type(&self, type_: &TypeData) -> bool {
        self.assisted_injection.contains_key(type_)
    }

    pub fn assisted_factory_binding(&self, key: &Key) -> Option<&Rc<BindingDeclaration>> {
        if key.qualifier.is_some() {
            return None;
        }
        self.assisted_factories.get(&key.type_)
    }

    pub fn is_assisted_factory_type(&self, type_: &TypeData) -> bool {
        self.assisted_factories.contains_key(type_)
    }

    /// Member injection sites of a type, if it has any injected members.
    pub fn members_injection(&self, type_: &TypeData) -> Option<&Vec<DependencyRequest>> {
        self.members_injection.get(type_)
    }

    fn binding_method(
        &self,
        env: &ProcessingEnv,
        module: &Module,
        method: &BindingMethod,
    ) -> Option<BindingDeclaration> {
        let return_type = parse_type(&method.return_type)?;
        let qualifier = method.qualifiers.first().map(String::as_str);
        let map_key = match method.map_keys.first() {
            Some(map_key) => Some(MapKeyData {
                annotation_type: canonical_annotation(&map_key.annotation_type),
                key_type: parse_type(&map_key.key_type)?,
                value: map_key.value.clone(),
            }),
            None => None,
        };
        let (kind, key) = match method.kind {
            BindingMethodKind::Multibinds => (
                BindingDeclarationKind::Multibinds,
                env.key_factory.key(&return_type, qualifier),
            ),
            BindingMethodKind::BindsOptionalOf => (
                BindingDeclarationKind::BindsOptionalOf,
                env.key_factory.key(&return_type, qualifier),
            ),
            kind => (
                match kind {
                    BindingMethodKind::Binds => BindingDeclarationKind::Binds,
                    BindingMethodKind::Produces => BindingDeclarationKind::Produces,
                    _ => BindingDeclarationKind::Provides,
                },
                env.key_factory.contribution_key(
                    &return_type,
                    qualifier,
                    method.contribution,
                    map_key.as_ref().map(|k| &k.key_type),
                    MultibindingContributionIdentifier {
                        module: module.name.clone(),
                        binding_element: method.method.clone(),
                    },
                )?,
            ),
        };
        let dependencies = match kind {
            BindingDeclarationKind::Multibinds | BindingDeclarationKind::BindsOptionalOf => {
                Vec::new()
            }
            _ => method
                .parameters
                .iter()
                .enumerate()
                .filter_map(|(i, p)| {
                    parameter_request(
                        env,
                        p,
                        parameter_element(
                            &format!("{}.{}", module.name, method.method),
                            &method.parameters,
                            i,
                        ),
                        method.location.as_ref(),
                    )
                })
                .collect(),
        };

        let mut annotations = vec![method.kind.annotation().to_owned()];
        if let Some(contribution) = method.contribution.annotation() {
            annotations.push(contribution.to_owned());
        }
        if let Some(ref map_key) = map_key {
            annotations.push(map_key.readable());
        }
        if let Some(qualifier) = qualifier {
            annotations.push(format!("@{}", canonical_annotation(qualifier)));
        }
        let scope = method.scopes.first().map(|s| canonical_annotation(s));
        if let Some(ref scope) = scope {
            annotations.push(format!("@{}", scope));
        }
        let element = format!(
            "{} {} {}.{}({})",
            annotations.join(" "),
            return_type,
            module.name,
            method.method,
            format_parameters(&method.parameters)
        );

        Some(BindingDeclaration {
            order: self.next_order(),
            kind,
            key,
            contribution: method.contribution,
            map_key,
            dependencies,
            scope,
            module: Some(module.name.clone()),
            element,
            subcomponent: None,
            method: Some(method.method.clone()),
            declared_type: Some(return_type),
            nullable: method.nullable,
            location: method.location.clone(),
        })
    }

    fn add_injectable(&mut self, env: &ProcessingEnv, injectable: &Injectable) {
        let type_ = match parse_type(&injectable.name) {
            Some(type_) => type_,
            None => return,
        };
        let key = env.key_factory.key(&type_, None);
        let members: Vec<DependencyRequest> = injectable
            .members
            .iter()
            .filter_map(|m| {
                parameter_request(
                    env,
                    m,
                    format!("{}.{}", injectable.name, m.name),
                    injectable.location.as_ref(),
                )
            })
            .collect();
        let mut dependencies: Vec<DependencyRequest> = injectable
            .parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.assisted.is_none())
            .filter_map(|(i, p)| {
                parameter_request(
                    env,
                    p,
                    parameter_element(&injectable.name, &injectable.parameters, i),
                    injectable.location.as_ref(),
                )
            })
            .collect();
        dependencies.extend(members.iter().cloned());

        let (kind, annotation) = match injectable.kind {
            ConstructorKind::Inject => (BindingDeclarationKind::Injection, "@Inject"),
            ConstructorKind::AssistedInject => {
                (BindingDeclarationKind::AssistedInjection, "@AssistedInject")
            }
        };
        let parameters = injectable
            .parameters
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if p.assisted.is_some() {
                    p.qualifiers = vec!["dagger.assisted.Assisted".to_owned()];
                }
                p
            })
            .collect::<Vec<_>>();
        let declaration = Rc::new(BindingDeclaration {
            order: self.next_order(),
            kind,
            key: key.clone(),
            contribution: ContributionType::Unique,
            map_key: None,
            dependencies,
            scope: injectable.scopes.first().map(|s| canonical_annotation(s)),
            module: Some(injectable.name.clone()),
            element: format!(
                "{} {}({})",
                annotation,
                injectable.name,
                format_parameters(&parameters)
            ),
            subcomponent: None,
            method: None,
            declared_type: None,
            nullable: false,
            location: injectable.location.clone(),
        });
        if !members.is_empty() {
            self.members_injection.insert(key.type_.clone(), members);
        }
        match injectable.kind {
            ConstructorKind::Inject => {
                self.injection.insert(key.type_, declaration);
            }
            ConstructorKind::AssistedInject => {
                self.assisted_injection.insert(key.type_, declaration);
            }
        }
    }

    fn assisted_factory_declaration(
        &self,
        env: &ProcessingEnv,
        factory: &AssistedFactory,
    ) -> Option<BindingDeclaration> {
        let type_ = parse_type(&factory.name)?;
        let method = factory
            .methods
            .iter()
            .find(|m| m.is_abstract && !m.is_default)?;
        let assisted_type = parse_type(&method.return_type)?;
        Some(BindingDeclaration {
            order: self.next_order(),
            kind: BindingDeclarationKind::AssistedFactory,
            key: env.key_factory.key(&type_, None),
            contribution: ContributionType::Unique,
            map_key: None,
            dependencies: vec![DependencyRequest::synthetic(
                RequestKind::Provider,
                env.key_factory.key(&assisted_type, None),
            )],
            scope: None,
            module: Some(factory.name.clone()),
            element: format!("@AssistedFactory {}", factory.name),
            subcomponent: None,
            method: None,
            declared_type: None,
            nullable: false,
            location: factory.location.clone(),
        })
    }

    /// Declarations a component contributes by itself: the component type,
    /// bound instances, component dependencies and module subcomponents.
    fn component_declarations(
        &self,
        env: &ProcessingEnv,
        manifest: &Manifest,
        descriptor: &ComponentDescriptor,
    ) -> Vec<Rc<BindingDeclaration>> {
        let mut result: Vec<Rc<BindingDeclaration>> = Vec::new();
        let declaration = |kind, key, element: String, location: Option<&SourceLocation>| {
            BindingDeclaration {
                order: self.next_order(),
                kind,
                key,
                contribution: ContributionType::Unique,
                map_key: None,
                dependencies: Vec::new(),
                scope: None,
                module: Some(descriptor.name.clone()),
                element,
                subcomponent: None,
                method: None,
                declared_type: None,
                nullable: false,
                location: location.cloned(),
            }
        };

        if descriptor.is_real_component {
            result.push(Rc::new(declaration(
                BindingDeclarationKind::Component,
                env.key_factory.key(&descriptor.type_, None),
                format!(
                    "{} {}",
                    if descriptor.is_subcomponent {
                        "@Subcomponent"
                    } else {
                        "@Component"
                    },
                    descriptor.name
                ),
                descriptor.location.as_ref(),
            )));
        }

        for setter in &descriptor.creator_methods {
            for parameter in &setter.method.parameters {
                if !(setter.method.binds_instance || parameter.binds_instance) {
                    continue;
                }
                let type_ = match parse_type(&parameter.type_) {
                    Some(type_) => type_,
                    None => continue,
                };
                let qualifier = parameter
                    .qualifiers
                    .first()
                    .or(setter.method.qualifiers.first())
                    .map(String::as_str);
                let return_type = parse_type(&setter.method.return_type)
                    .map(|t| format!("{} ", t))
                    .unwrap_or_default();
                let mut bound = declaration(
                    BindingDeclarationKind::BindsInstance,
                    env.key_factory.key(&type_, qualifier),
                    format!(
                        "@BindsInstance {}{}.{}({})",
                        return_type,
                        setter.source,
                        setter.method.method,
                        format_parameters(std::slice::from_ref(parameter))
                    ),
                    setter.method.location.as_ref(),
                );
                bound.nullable = parameter.nullable;
                result.push(Rc::new(bound));
            }
        }

        for dependency in &descriptor.dependencies {
            result.push(Rc::new(declaration(
                BindingDeclarationKind::ComponentDependency,
                env.key_factory.key(dependency, None),
                format!("{}.dependencies: {}", descriptor.name, dependency),
                descriptor.location.as_ref(),
            )));
            for method in provision_methods(manifest, &dependency.path) {
                let type_ = match parse_type(&method.return_type) {
                    Some(type_) => type_,
                    None => continue,
                };
                let type_ = match FrameworkType::of(&type_) {
                    Some(FrameworkType::ListenableFuture) => match type_.args.first() {
                        Some(inner) => inner.clone(),
                        None => continue,
                    },
                    _ => type_,
                };
                let mut provision = declaration(
                    BindingDeclarationKind::ComponentDependencyProvision,
                    env.key_factory
                        .key(&type_, method.qualifiers.first().map(String::as_str)),
                    format!("{} {}.{}()", type_, dependency, method.method),
                    method.location,
                );
                provision.module = Some(dependency.path.clone());
                result.push(Rc::new(provision));
            }
        }

        for module in &descriptor.modules {
            let subcomponents = match manifest.module(module) {
                Some(m) => &m.subcomponents,
                None => continue,
            };
            for subcomponent in subcomponents {
                let creator = match manifest
                    .component(subcomponent)
                    .and_then(|c| c.creator.as_ref())
                    .and_then(|c| parse_type(&c.name))
                {
                    Some(creator) => creator,
                    None => continue,
                };
                let mut creator_declaration = declaration(
                    BindingDeclarationKind::SubcomponentCreator,
                    env.key_factory.key(&creator, None),
                    format!("@Module(subcomponents = {}) {}", subcomponent, module),
                    manifest.module(module).and_then(|m| m.location.as_ref()),
                );
                creator_declaration.module = Some(module.clone());
                creator_declaration.subcomponent = Some(subcomponent.clone());
                result.push(Rc::new(creator_declaration));
            }
        }
        result
    }
}

/// A no-arg method of a component dependency that exposes a binding.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionMethod<'a> {
    pub method: &'a str,
    pub return_type: &'a str,
    pub qualifiers: &'a [String],
    pub location: Option<&'a SourceLocation>,
}

/// Provision methods of a component dependency, including inherited ones.
pub fn provision_methods<'a>(manifest: &'a Manifest, type_name: &str) -> Vec<ProvisionMethod<'a>> {
    let mut result: Vec<ProvisionMethod> = Vec::new();
    if let Some(component) = manifest.component(type_name) {
        result.extend(
            component
                .entry_points
                .iter()
                .filter(|e| e.parameters.is_empty())
                .map(|e| ProvisionMethod {
                    method: &e.method,
                    return_type: &e.return_type,
                    qualifiers: &e.qualifiers,
                    location: e.location.as_ref(),
                }),
        );
    }
    for method in interface_methods(manifest, type_name) {
        if !method.parameters.is_empty() || result.iter().any(|m| m.method == method.method) {
            continue;
        }
        result.push(ProvisionMethod {
            method: &method.method,
            return_type: &method.return_type,
            qualifiers: &method.qualifiers,
            location: method.location.as_ref(),
        });
    }
    result.retain(|m| m.return_type != "void");
    result
}

/// Methods of an interface and its supertypes, nearest first, without duplicates by name.
pub fn interface_methods<'a>(manifest: &'a Manifest, type_name: &str) -> Vec<&'a Method> {
    let mut result: Vec<&Method> = Vec::new();
    let mut visited = Vec::<String>::new();
    let mut stack = vec![type_name.to_owned()];
    while let Some(name) = stack.pop() {
        if visited.contains(&name) {
            continue;
        }
        visited.push(name.clone());
        if let Some(interface) = manifest.interface(&name) {
            for method in &interface.methods {
                if !result.iter().any(|m| m.method == method.method) {
                    result.push(method);
                }
            }
            for supertype in interface.supertypes.iter().rev() {
                stack.push(supertype.clone());
            }
        }
    }
    result
}

/// Declarations visible in one component, indexed the ways the resolver looks them up.
#[derive(Debug, Default)]
pub struct ComponentDeclarations {
    /// Unique bindings and individual multibinding contributions (by contribution key).
    pub explicit: HashMap<Key, Vec<Rc<BindingDeclaration>>>,
    /// Contributions by the multibound key.
    pub contributions: HashMap<Key, Vec<Rc<BindingDeclaration>>>,
    pub multibinds: HashMap<Key, Vec<Rc<BindingDeclaration>>>,
    /// `@BindsOptionalOf` by the underlying key.
    pub optionals: HashMap<Key, Vec<Rc<BindingDeclaration>>>,
    pub subcomponent_creators: HashMap<Key, Vec<Rc<BindingDeclaration>>>,
    /// All declarations in declaration order.
    pub all: Vec<Rc<BindingDeclaration>>,
}

impl ComponentDeclarations {
    pub fn collect(
        env: &ProcessingEnv,
        manifest: &Manifest,
        registry: &DeclarationRegistry,
        descriptor: &ComponentDescriptor,
    ) -> Self {
        let mut declarations = ComponentDeclarations::default();
        for declaration in registry.component_declarations(env, manifest, descriptor) {
            declarations.add(declaration);
        }
        for module in &descriptor.modules {
            for declaration in registry.module_declarations(module) {
                declarations.add(declaration.clone());
            }
        }
        declarations
    }

    fn add(&mut self, declaration: Rc<BindingDeclaration>) {
        match declaration.kind {
            BindingDeclarationKind::Multibinds => self
                .multibinds
                .entry(declaration.key.clone())
                .or_default()
                .push(declaration.clone()),
            BindingDeclarationKind::BindsOptionalOf => self
                .optionals
                .entry(declaration.key.clone())
                .or_default()
                .push(declaration.clone()),
            BindingDeclarationKind::SubcomponentCreator => self
                .subcomponent_creators
                .entry(declaration.key.clone())
                .or_default()
                .push(declaration.clone()),
            _ => {
                if declaration.is_multibinding_contribution() {
                    self.contributions
                        .entry(declaration.multibinding_key())
                        .or_default()
                        .push(declaration.clone());
                }
                self.explicit
                    .entry(declaration.key.clone())
                    .or_default()
                    .push(declaration.clone());
            }
        }
        self.all.push(declaration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stiletto_common::manifest::MapKey;

    fn module(declarations: Vec<BindingMethod>) -> Manifest {
        let mut manifest = Manifest::new();
        manifest.modules.push(Module {
            name: "test.M".to_owned(),
            declarations,
            ..Module::new()
        });
        manifest
    }

    #[test]
    fn binding_method_element_lists_annotations() {
        let env = ProcessingEnv::default();
        let manifest = module(vec![BindingMethod {
            kind: BindingMethodKind::Provides,
            method: "entry".to_owned(),
            return_type: "String".to_owned(),
            contribution: ContributionType::IntoMap,
            map_keys: vec![MapKey {
                annotation_type: "StringKey".to_owned(),
                key_type: "String".to_owned(),
                value: "\"foo\"".to_owned(),
            }],
            parameters: vec![Parameter {
                name: "value".to_owned(),
                type_: "String".to_owned(),
                qualifiers: vec!["test.SomeQualifier".to_owned()],
                ..Default::default()
            }],
            ..Default::default()
        }]);
        let registry = DeclarationRegistry::new(&env, &manifest, &InvalidElements::default());
        let declaration = &registry.module_declarations("test.M")[0];
        assert_eq!(
            declaration.element,
            "@Provides @IntoMap @dagger.multibindings.StringKey(\"foo\") java.lang.String \
             test.M.entry(@test.SomeQualifier java.lang.String)"
        );
        assert_eq!(
            declaration.multibinding_key().type_.canonical_string_path(),
            "java.util.Map<java.lang.String,java.lang.String>"
        );
        assert_eq!(
            declaration.dependencies[0].element.as_deref(),
            Some("test.M.entry(value)")
        );
    }

    #[test]
    fn component_and_dependency_declarations() {
        let env = ProcessingEnv::default();
        let mut manifest = Manifest::new();
        manifest.interfaces.push(stiletto_common::manifest::Interface {
            name: "test.Dep".to_owned(),
            methods: vec![Method {
                method: "foo".to_owned(),
                return_type: "test.Foo".to_owned(),
                is_abstract: true,
                ..Default::default()
            }],
            ..Default::default()
        });
        manifest.components.push(stiletto_common::manifest::Component {
            name: "test.C".to_owned(),
            dependencies: vec!["test.Dep".to_owned()],
            ..stiletto_common::manifest::Component::new()
        });
        let registry = DeclarationRegistry::new(&env, &manifest, &InvalidElements::default());
        let descriptor = ComponentDescriptor::for_component(&env, &manifest, &manifest.components[0]);
        let declarations = ComponentDeclarations::collect(&env, &manifest, &registry, &descriptor);
        let kinds: Vec<(BindingDeclarationKind, String)> = declarations
            .all
            .iter()
            .map(|d| (d.kind, d.key.to_string()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (BindingDeclarationKind::Component, "test.C".to_owned()),
                (BindingDeclarationKind::ComponentDependency, "test.Dep".to_owned()),
                (BindingDeclarationKind::ComponentDependencyProvision, "test.Foo".to_owned()),
            ]
        );
    }

    #[test]
    fn invalid_methods_are_skipped() {
        let env = ProcessingEnv::default();
        let manifest = module(vec![BindingMethod {
            method: "bad".to_owned(),
            return_type: "Object".to_owned(),
            ..Default::default()
        }]);
        let mut invalid = InvalidElements::default();
        invalid.add_method("test.M", "bad");
        let registry = DeclarationRegistry::new(&env, &manifest, &invalid);
        assert!(registry.module_declarations("test.M").is_empty());
    }

    #[test]
    fn assisted_parameters_are_not_dependencies() {
        let env = ProcessingEnv::default();
        let mut manifest = Manifest::new();
        manifest.injectables.push(Injectable {
            name: "test.Foo".to_owned(),
            kind: ConstructorKind::AssistedInject,
            parameters: vec![
                Parameter {
                    name: "bar".to_owned(),
                    type_: "test.Bar".to_owned(),
                    ..Default::default()
                },
                Parameter {
                    name: "s".to_owned(),
                    type_: "String".to_owned(),
                    assisted: Some(String::new()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });
        let registry = DeclarationRegistry::new(&env, &manifest, &InvalidElements::default());
        let foo = "test.Foo".parse::<TypeData>().unwrap();
        let declaration = registry.assisted_injection_binding(&foo).unwrap();
        assert_eq!(declaration.dependencies.len(), 1);
        assert_eq!(
            declaration.element,
            "@AssistedInject test.Foo(test.Bar, @dagger.assisted.Assisted java.lang.String)"
        );
        assert!(registry.is_assisted_injection_type(&foo));
        assert!(registry
            .injection_binding(&env.key_factory.key(&foo, None))
            .is_none());
    }
}
