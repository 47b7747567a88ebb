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

//! Declarations handed over by a front-end.
//!
//! Types are kept as the front-end spelled them and parsed during superficial
//! validation, so a single unreadable type only invalidates its own element.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Manifest {
    pub components: Vec<Component>,
    pub modules: Vec<Module>,
    pub injectables: Vec<Injectable>,
    pub assisted_factories: Vec<AssistedFactory>,
    pub interfaces: Vec<Interface>,
    pub unresolved_types: Vec<String>,
}

impl Manifest {
    pub fn new() -> Manifest {
        Default::default()
    }

    pub fn from_json(json: &str) -> Result<Manifest, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.modules.clear();
        self.injectables.clear();
        self.assisted_factories.clear();
        self.interfaces.clear();
        self.unresolved_types.clear();
    }

    pub fn merge_from(&mut self, other: &Manifest) {
        self.components
            .extend_from_slice(other.components.as_slice());
        self.modules.extend_from_slice(other.modules.as_slice());
        self.injectables
            .extend_from_slice(other.injectables.as_slice());
        self.assisted_factories
            .extend_from_slice(other.assisted_factories.as_slice());
        self.interfaces
            .extend_from_slice(other.interfaces.as_slice());
        self.unresolved_types
            .extend_from_slice(other.unresolved_types.as_slice());
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Clone, Default)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Component {
    pub name: String,
    pub is_subcomponent: bool,
    pub is_production: bool,
    pub scopes: Vec<String>,
    pub modules: Vec<String>,
    /// Component dependencies, not parent components.
    pub dependencies: Vec<String>,
    pub entry_points: Vec<EntryPoint>,
    pub factory_methods: Vec<SubcomponentFactoryMethod>,
    pub creator: Option<Creator>,
    pub location: Option<SourceLocation>,
}

impl Component {
    pub fn new() -> Self {
        Default::default()
    }
}

/// An abstract component method: a provision method, or a members-injection
/// method when it takes a single parameter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EntryPoint {
    pub method: String,
    pub return_type: String,
    pub qualifiers: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub location: Option<SourceLocation>,
}

/// A parent component method returning a subcomponent or its creator.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SubcomponentFactoryMethod {
    pub method: String,
    pub subcomponent: String,
    pub returns_creator: bool,
    pub parameters: Vec<Parameter>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Default)]
pub enum CreatorKind {
    #[default]
    Builder,
    Factory,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Creator {
    pub name: String,
    pub kind: CreatorKind,
    pub supertypes: Vec<String>,
    pub methods: Vec<Method>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Method {
    pub method: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub qualifiers: Vec<String>,
    pub binds_instance: bool,
    pub is_abstract: bool,
    pub is_default: bool,
    pub location: Option<SourceLocation>,
}

impl Default for Method {
    fn default() -> Self {
        Method {
            method: String::new(),
            return_type: "void".to_owned(),
            parameters: Vec::new(),
            qualifiers: Vec::new(),
            binds_instance: false,
            is_abstract: true,
            is_default: false,
            location: None,
        }
    }
}

/// A supertype whose methods are inherited by creators or exposed by
/// component dependencies.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Interface {
    pub name: String,
    pub supertypes: Vec<String>,
    pub methods: Vec<Method>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Module {
    pub name: String,
    pub includes: Vec<String>,
    pub subcomponents: Vec<String>,
    pub is_abstract: bool,
    pub declarations: Vec<BindingMethod>,
    pub location: Option<SourceLocation>,
}

impl Module {
    pub fn new() -> Self {
        Default::default()
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone, Copy, Default)]
pub enum BindingMethodKind {
    #[default]
    Provides,
    Produces,
    Binds,
    Multibinds,
    BindsOptionalOf,
}

impl BindingMethodKind {
    pub fn annotation(&self) -> &'static str {
        match self {
            BindingMethodKind::Provides => "@Provides",
            BindingMethodKind::Produces => "@Produces",
            BindingMethodKind::Binds => "@Binds",
            BindingMethodKind::Multibinds => "@Multibinds",
            BindingMethodKind::BindsOptionalOf => "@BindsOptionalOf",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Clone, Copy, Default)]
pub enum ContributionType {
    #[default]
    Unique,
    IntoSet,
    ElementsIntoSet,
    IntoMap,
}

impl ContributionType {
    pub fn annotation(&self) -> Option<&'static str> {
        match self {
            ContributionType::Unique => None,
            ContributionType::IntoSet => Some("@IntoSet"),
            ContributionType::ElementsIntoSet => Some("@ElementsIntoSet"),
            ContributionType::IntoMap => Some("@IntoMap"),
        }
    }

    pub fn is_multibinding(&self) -> bool {
        *self != ContributionType::Unique
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MapKey {
    /// The `@MapKey`-annotated annotation, e.g. `dagger.multibindings.StringKey`.
    pub annotation_type: String,
    /// Key type of the map, e.g. `java.lang.String`.
    pub key_type: String,
    /// Source text of the annotation value, e.g. `"foo"`.
    pub value: String,
}

/// A `@Provides`, `@Binds`, ... method in a module.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BindingMethod {
    pub kind: BindingMethodKind,
    pub method: String,
    pub return_type: String,
    pub qualifiers: Vec<String>,
    pub scopes: Vec<String>,
    pub contribution: ContributionType,
    pub map_keys: Vec<MapKey>,
    pub parameters: Vec<Parameter>,
    pub type_parameters: Vec<String>,
    pub is_abstract: bool,
    pub is_private: bool,
    pub is_static: bool,
    pub throws: Vec<String>,
    pub nullable: bool,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub qualifiers: Vec<String>,
    pub nullable: bool,
    /// `Some` for `@Assisted` parameters, holding the assisted identifier (may be empty).
    pub assisted: Option<String>,
    pub binds_instance: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Default)]
pub enum ConstructorKind {
    #[default]
    Inject,
    AssistedInject,
}

/// A type with an `@Inject` or `@AssistedInject` constructor.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Injectable {
    pub name: String,
    pub kind: ConstructorKind,
    pub scopes: Vec<String>,
    /// Qualifiers placed on the type itself, which are not allowed.
    pub qualifiers: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub members: Vec<Parameter>,
    pub is_abstract: bool,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AssistedFactory {
    pub name: String,
    pub is_abstract: bool,
    pub is_nested_non_static: bool,
    pub methods: Vec<Method>,
    pub location: Option<SourceLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_fills_defaults() {
        let manifest = Manifest::from_json(
            r#"{"modules": [{"name": "test.M", "declarations": [
                {"kind": "Binds", "method": "bind", "return_type": "Object",
                 "parameters": [{"name": "s", "type": "String"}]}]}]}"#,
        )
        .unwrap();
        let declaration = &manifest.modules[0].declarations[0];
        assert_eq!(declaration.kind, BindingMethodKind::Binds);
        assert_eq!(declaration.contribution, ContributionType::Unique);
        assert_eq!(declaration.parameters[0].type_, "String");
        assert!(manifest.components.is_empty());
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(Manifest::from_json("{\"modules\": 3}").is_err());
    }

    #[test]
    fn merge_from_appends() {
        let mut a = Manifest::new();
        a.modules.push(Module {
            name: "test.A".to_owned(),
            ..Module::new()
        });
        let mut b = Manifest::new();
        b.modules.push(Module {
            name: "test.B".to_owned(),
            ..Module::new()
        });
        a.merge_from(&b);
        assert!(a.module("test.B").is_some());
        a.clear();
        assert!(a.modules.is_empty());
    }

    #[test]
    fn method_defaults_to_abstract() {
        let method: Method = serde_json::from_str(r#"{"method": "build"}"#).unwrap();
        assert!(method.is_abstract);
        assert_eq!(method.return_type, "void");
    }
}
