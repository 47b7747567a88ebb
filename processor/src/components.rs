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

use crate::creators::{creator_methods, FlattenedMethod};
use crate::declarations::{parse_type, request_for, DependencyRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use stiletto_common::environment::ProcessingEnv;
use stiletto_common::key::RequestKind;
use stiletto_common::manifest::{
    Component, Creator, EntryPoint, Manifest, Module, SourceLocation, SubcomponentFactoryMethod,
};
use stiletto_common::type_data::{canonical_annotation, TypeData};

pub const PRODUCTION_SCOPE: &str = "dagger.producers.ProductionScope";

/// Position of a component in its tree, root first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentPath {
    components: Vec<String>,
}

impl ComponentPath {
    pub fn root(name: &str) -> Self {
        ComponentPath {
            components: vec![name.to_owned()],
        }
    }

    pub fn child(&self, name: &str) -> Self {
        let mut components = self.components.clone();
        components.push(name.to_owned());
        ComponentPath { components }
    }

    pub fn parent(&self) -> Option<ComponentPath> {
        if self.components.len() <= 1 {
            return None;
        }
        Some(ComponentPath {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    pub fn current(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or("")
    }

    pub fn root_name(&self) -> &str {
        self.components.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_root(&self) -> bool {
        self.components.len() == 1
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &ComponentPath) -> bool {
        other.components.starts_with(&self.components)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Ancestors from the root down to, and including, `self`.
    pub fn lineage(&self) -> Vec<ComponentPath> {
        (1..=self.components.len())
            .map(|i| ComponentPath {
                components: self.components[..i].to_vec(),
            })
            .collect()
    }
}

impl Display for ComponentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.join(" → "))
    }
}

/// Modules installed by `roots`, followed through `includes`, in preorder
/// without repetition. Unknown modules are skipped.
pub fn transitive_modules(manifest: &Manifest, roots: &[String]) -> Vec<String> {
    let mut result = Vec::new();
    let mut visited = HashSet::new();
    for root in roots {
        visit_module(manifest, root, &mut visited, &mut result);
    }
    result
}

fn visit_module(
    manifest: &Manifest,
    name: &str,
    visited: &mut HashSet<String>,
    result: &mut Vec<String>,
) {
    if !visited.insert(name.to_owned()) {
        return;
    }
    let module = match manifest.module(name) {
        Some(module) => module,
        None => return,
    };
    result.push(name.to_owned());
    for include in &module.includes {
        visit_module(manifest, include, visited, result);
    }
}

/// Everything the resolver needs to know about one component, or about a
/// module validated on its own.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub name: String,
    pub type_: TypeData,
    pub is_subcomponent: bool,
    pub is_production: bool,
    /// `false` for the synthetic component built around a lone module.
    pub is_real_component: bool,
    pub scopes: Vec<String>,
    pub modules: Vec<String>,
    pub dependencies: Vec<TypeData>,
    pub entry_points: Vec<DependencyRequest>,
    pub factory_methods: Vec<SubcomponentFactoryMethod>,
    pub creator: Option<Creator>,
    pub creator_methods: Vec<FlattenedMethod>,
    /// Subcomponents declared through `@Module(subcomponents = ...)`.
    pub declared_subcomponents: Vec<String>,
    pub location: Option<SourceLocation>,
}

impl ComponentDescriptor {
    pub fn for_component(env: &ProcessingEnv, manifest: &Manifest, component: &Component) -> Self {
        let modules = transitive_modules(manifest, &component.modules);
        let entry_points = component
            .entry_points
            .iter()
            .filter_map(|e| entry_point_request(env, component, e))
            .collect();
        ComponentDescriptor {
            name: component.name.clone(),
            type_: parse_type(&component.name).unwrap_or_else(|| TypeData::new(&component.name)),
            is_subcomponent: component.is_subcomponent,
            is_production: component.is_production,
            is_real_component: true,
            scopes: component
                .scopes
                .iter()
                .map(|s| canonical_annotation(s))
                .collect(),
            declared_subcomponents: declared_subcomponents(manifest, &modules),
            modules,
            dependencies: component
                .dependencies
                .iter()
                .filter_map(|d| parse_type(d))
                .collect(),
            entry_points,
            factory_methods: component.factory_methods.clone(),
            creator_methods: component
                .creator
                .as_ref()
                .map(|c| creator_methods(manifest, c))
                .unwrap_or_default(),
            creator: component.creator.clone(),
            location: component.location.clone(),
        }
    }

    pub fn for_module(manifest: &Manifest, module: &Module) -> Self {
        let modules = transitive_modules(manifest, std::slice::from_ref(&module.name));
        ComponentDescriptor {
            name: module.name.clone(),
            type_: parse_type(&module.name).unwrap_or_else(|| TypeData::new(&module.name)),
            is_subcomponent: false,
            is_production: false,
            is_real_component: false,
            scopes: Vec::new(),
            declared_subcomponents: declared_subcomponents(manifest, &modules),
            modules,
            dependencies: Vec::new(),
            entry_points: Vec::new(),
            factory_methods: Vec::new(),
            creator: None,
            creator_methods: Vec::new(),
            location: module.location.clone(),
        }
    }

    /// Subcomponents this component can create: factory methods first, then
    /// module-declared ones.
    pub fn child_components(&self) -> Vec<&str> {
        let mut result: Vec<&str> = Vec::new();
        for name in self
            .factory_methods
            .iter()
            .map(|f| f.subcomponent.as_str())
            .chain(self.declared_subcomponents.iter().map(String::as_str))
        {
            if !result.contains(&name) {
                result.push(name);
            }
        }
        result
    }

    /// Declared scopes plus the scope production components carry implicitly.
    pub fn effective_scopes(&self) -> Vec<String> {
        let mut scopes = self.scopes.clone();
        if self.is_production && !scopes.iter().any(|s| s == PRODUCTION_SCOPE) {
            scopes.push(PRODUCTION_SCOPE.to_owned());
        }
        scopes
    }

    pub fn readable_scopes(&self) -> String {
        self.scopes
            .iter()
            .map(|s| format!("@{}", s))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn declared_subcomponents(manifest: &Manifest, modules: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for module in modules.iter().filter_map(|m| manifest.module(m)) {
        for subcomponent in &module.subcomponents {
            if !result.contains(subcomponent) {
                result.push(subcomponent.clone());
            }
        }
    }
    result
}

fn entry_point_request(
    env: &ProcessingEnv,
    component: &Component,
    entry_point: &EntryPoint,
) -> Option<DependencyRequest> {
    match entry_point.parameters.as_slice() {
        [] => request_for(
            env,
            &entry_point.return_type,
            &entry_point.qualifiers,
            format!("{}.{}()", component.name, entry_point.method),
            false,
            entry_point.location.as_ref(),
        ),
        [parameter] => {
            let type_ = parse_type(&parameter.type_)?;
            Some(DependencyRequest {
                kind: RequestKind::MembersInjection,
                key: env.key_factory.key(&type_, None),
                requested_type: type_,
                element: Some(format!(
                    "{}.{}({})",
                    component.name, entry_point.method, parameter.name
                )),
                nullable: false,
                location: entry_point.location.clone(),
            })
        }
        _ => None,
    }
}
