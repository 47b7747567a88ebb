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

use crate::manifest::ContributionType;
use crate::type_data::{canonical_annotation, TypeData};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameworkType {
    Provider,
    Lazy,
    MembersInjector,
    Producer,
    Produced,
    ListenableFuture,
}

lazy_static! {
    static ref FRAMEWORK_TYPES: HashMap<&'static str, FrameworkType> = {
        let mut m = HashMap::new();
        m.insert("javax.inject.Provider", FrameworkType::Provider);
        m.insert("jakarta.inject.Provider", FrameworkType::Provider);
        m.insert("dagger.internal.Provider", FrameworkType::Provider);
        m.insert("dagger.Lazy", FrameworkType::Lazy);
        m.insert("dagger.MembersInjector", FrameworkType::MembersInjector);
        m.insert("dagger.producers.Producer", FrameworkType::Producer);
        m.insert("dagger.producers.Produced", FrameworkType::Produced);
        m.insert(
            "com.google.common.util.concurrent.ListenableFuture",
            FrameworkType::ListenableFuture,
        );
        m
    };
}

const SET: &str = "java.util.Set";
const MAP: &str = "java.util.Map";
const OPTIONALS: [&str; 2] = ["java.util.Optional", "com.google.common.base.Optional"];

impl FrameworkType {
    pub fn of(type_: &TypeData) -> Option<FrameworkType> {
        FRAMEWORK_TYPES.get(type_.path.as_str()).copied()
    }

    pub fn simple_name(&self) -> &'static str {
        match self {
            FrameworkType::Provider => "Provider",
            FrameworkType::Lazy => "Lazy",
            FrameworkType::MembersInjector => "MembersInjector",
            FrameworkType::Producer => "Producer",
            FrameworkType::Produced => "Produced",
            FrameworkType::ListenableFuture => "ListenableFuture",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            FrameworkType::Provider => "javax.inject.Provider",
            FrameworkType::Lazy => "dagger.Lazy",
            FrameworkType::MembersInjector => "dagger.MembersInjector",
            FrameworkType::Producer => "dagger.producers.Producer",
            FrameworkType::Produced => "dagger.producers.Produced",
            FrameworkType::ListenableFuture => "com.google.common.util.concurrent.ListenableFuture",
        }
    }
}

pub fn is_framework_type(type_: &TypeData) -> bool {
    FrameworkType::of(type_).is_some()
}

pub fn is_set(type_: &TypeData) -> bool {
    type_.path == SET
}

pub fn is_map(type_: &TypeData) -> bool {
    type_.path == MAP
}

pub fn is_optional(type_: &TypeData) -> bool {
    OPTIONALS.contains(&type_.path.as_str())
}

/// Framework types, sets, maps and optionals used without type arguments.
pub fn is_raw(type_: &TypeData) -> bool {
    type_.args.is_empty() && (is_framework_type(type_) || is_set(type_) || is_map(type_) || is_optional(type_))
}

/// How a dependency asks for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestKind {
    Instance,
    Provider,
    Lazy,
    ProviderOfLazy,
    MembersInjection,
    Producer,
    Produced,
    Future,
}

impl RequestKind {
    /// Requests that defer construction and therefore may close a dependency cycle.
    pub fn breaks_cycles(&self) -> bool {
        matches!(
            self,
            RequestKind::Provider
                | RequestKind::Lazy
                | RequestKind::ProviderOfLazy
                | RequestKind::Producer
        )
    }

    /// Wraps `type_` the way a request of this kind spells it.
    pub fn type_for(&self, type_: &TypeData) -> TypeData {
        let wrap = |framework: FrameworkType, inner: TypeData| {
            TypeData::with_args(framework.path(), vec![inner])
        };
        match self {
            RequestKind::Instance => type_.clone(),
            RequestKind::Provider => wrap(FrameworkType::Provider, type_.clone()),
            RequestKind::Lazy => wrap(FrameworkType::Lazy, type_.clone()),
            RequestKind::ProviderOfLazy => wrap(
                FrameworkType::Provider,
                wrap(FrameworkType::Lazy, type_.clone()),
            ),
            RequestKind::MembersInjection => wrap(FrameworkType::MembersInjector, type_.clone()),
            RequestKind::Producer => wrap(FrameworkType::Producer, type_.clone()),
            RequestKind::Produced => wrap(FrameworkType::Produced, type_.clone()),
            RequestKind::Future => wrap(FrameworkType::ListenableFuture, type_.clone()),
        }
    }
}

/// Identifies one `@IntoSet`/`@IntoMap`/`@ElementsIntoSet` contribution so that
/// contributions for the same multibound key stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MultibindingContributionIdentifier {
    pub module: String,
    pub binding_element: String,
}

impl Display for MultibindingContributionIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.module, self.binding_element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub type_: TypeData,
    /// Canonical qualifier annotation, see [crate::type_data::canonical_annotation].
    pub qualifier: Option<String>,
    pub multibinding_contribution: Option<MultibindingContributionIdentifier>,
}

impl Key {
    /// Same key without the contribution identifier.
    pub fn without_contribution(&self) -> Key {
        Key {
            type_: self.type_.clone(),
            qualifier: self.qualifier.clone(),
            multibinding_contribution: None,
        }
    }

    pub fn with_type(&self, type_: TypeData) -> Key {
        Key {
            type_,
            qualifier: self.qualifier.clone(),
            multibinding_contribution: self.multibinding_contribution.clone(),
        }
    }

    /// Human readable form, `@test.Qualifier test.Foo`.
    pub fn readable(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("@{} {}", qualifier, self.type_),
            None => self.type_.canonical_string_path(),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.readable())?;
        if let Some(ref contribution) = self.multibinding_contribution {
            write!(f, " {}", contribution)?;
        }
        Ok(())
    }
}

/// Derives every [Key] in the system so that the wildcard policy is applied uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFactory {
    pub ignore_wildcards: bool,
}

impl KeyFactory {
    pub fn new(ignore_wildcards: bool) -> Self {
        KeyFactory { ignore_wildcards }
    }

    fn normalize(&self, type_: &TypeData) -> TypeData {
        if self.ignore_wildcards {
            type_.without_variance()
        } else {
            type_.clone()
        }
    }

    pub fn key(&self, type_: &TypeData, qualifier: Option<&str>) -> Key {
        Key {
            type_: self.normalize(type_),
            qualifier: qualifier.map(canonical_annotation),
            multibinding_contribution: None,
        }
    }

    /// The key a declaration contributes to, `Set<T>` for `@IntoSet` etc.
    ///
    /// Returns `None` when an `@IntoMap` contribution has no map key type.
    pub fn contribution_key(
        &self,
        return_type: &TypeData,
        qualifier: Option<&str>,
        contribution_type: ContributionType,
        map_key_type: Option<&TypeData>,
        identifier: MultibindingContributionIdentifier,
    ) -> Option<Key> {
        let type_ = match contribution_type {
            ContributionType::Unique => return Some(self.key(return_type, qualifier)),
            ContributionType::IntoSet => TypeData::with_args(SET, vec![return_type.clone()]),
            ContributionType::ElementsIntoSet => return_type.clone(),
            ContributionType::IntoMap => TypeData::with_args(
                MAP,
                vec![map_key_type?.clone(), return_type.clone()],
            ),
        };
        let mut key = self.key(&type_, qualifier);
        key.multibinding_contribution = Some(identifier);
        Some(key)
    }

    /// Splits a requested type into its [RequestKind] and the key actually bound.
    pub fn request(&self, type_: &TypeData, qualifier: Option<&str>) -> (RequestKind, Key) {
        let (kind, inner) = unwrap_request_type(type_);
        (kind, self.key(inner, qualifier))
    }

    /// `Optional<T>` to the request for `T`.
    pub fn unwrap_optional(&self, key: &Key) -> Option<(RequestKind, Key)> {
        if !is_optional(&key.type_) {
            return None;
        }
        let inner = key.type_.args.first()?;
        Some(self.request(inner, key.qualifier.as_deref()))
    }

    /// `Map<K, Provider<V>>`/`Map<K, Producer<V>>` to `Map<K, V>` plus the wrapper.
    pub fn unwrap_map_value(&self, key: &Key) -> Option<(FrameworkType, Key)> {
        if !is_map(&key.type_) || key.type_.args.len() != 2 {
            return None;
        }
        let value = &key.type_.args[1];
        let framework = FrameworkType::of(value)?;
        let unwrapped = TypeData::with_args(
            MAP,
            vec![key.type_.args[0].clone(), value.args.first()?.clone()],
        );
        Some((framework, key.with_type(unwrapped)))
    }

    /// `Map<K, V>` to `Map<K, Framework<V>>`.
    pub fn wrap_map_value(&self, key: &Key, framework: FrameworkType) -> Option<Key> {
        if !is_map(&key.type_) || key.type_.args.len() != 2 {
            return None;
        }
        let wrapped = TypeData::with_args(
            MAP,
            vec![
                key.type_.args[0].clone(),
                TypeData::with_args(framework.path(), vec![key.type_.args[1].clone()]),
            ],
        );
        Some(key.with_type(wrapped))
    }

    /// `Set<Produced<T>>` to `Set<T>`.
    pub fn unwrap_set_of_produced(&self, key: &Key) -> Option<Key> {
        if !is_set(&key.type_) {
            return None;
        }
        let element = key.type_.args.first()?;
        if FrameworkType::of(element) != Some(FrameworkType::Produced) {
            return None;
        }
        Some(key.with_type(TypeData::with_args(SET, vec![element.args.first()?.clone()])))
    }
}

/// Peels one level of framework wrapping, two for `Provider<Lazy<T>>`.
pub fn unwrap_request_type(type_: &TypeData) -> (RequestKind, &TypeData) {
    let framework = match FrameworkType::of(type_) {
        Some(framework) => framework,
        None => return (RequestKind::Instance, type_),
    };
    let inner = match type_.args.first() {
        Some(inner) => inner,
        None => return (RequestKind::Instance, type_),
    };
    match framework {
        FrameworkType::Provider => {
            if FrameworkType::of(inner) == Some(FrameworkType::Lazy) {
                if let Some(lazy_inner) = inner.args.first() {
                    return (RequestKind::ProviderOfLazy, lazy_inner);
                }
            }
            (RequestKind::Provider, inner)
        }
        FrameworkType::Lazy => (RequestKind::Lazy, inner),
        FrameworkType::MembersInjector => (RequestKind::MembersInjection, inner),
        FrameworkType::Producer => (RequestKind::Producer, inner),
        FrameworkType::Produced => (RequestKind::Produced, inner),
        FrameworkType::ListenableFuture => (RequestKind::Future, inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TypeData {
        s.parse().unwrap()
    }

    #[test]
    fn key_ignores_wildcards_when_enabled() {
        let factory = KeyFactory::new(true);
        assert_eq!(
            factory.key(&t("Set<? extends test.Foo>"), None),
            factory.key(&t("Set<test.Foo>"), None)
        );
    }

    #[test]
    fn key_keeps_wildcards_when_disabled() {
        let factory = KeyFactory::new(false);
        assert_ne!(
            factory.key(&t("Set<? extends test.Foo>"), None),
            factory.key(&t("Set<test.Foo>"), None)
        );
    }

    #[test]
    fn key_is_stable_across_calls() {
        let factory = KeyFactory::new(true);
        let a = factory.key(&t("Map<String, ?>"), Some("@Named(\"a\")"));
        let b = factory.key(&t("java.util.Map<java.lang.String,?>"), Some("javax.inject.Named(\"a\")"));
        assert_eq!(a, b);
        assert_eq!(
            a.to_string(),
            "@javax.inject.Named(\"a\") java.util.Map<java.lang.String,java.lang.Object>"
        );
    }

    #[test]
    fn request_unwraps_framework_types() {
        let factory = KeyFactory::new(true);
        let (kind, key) = factory.request(&t("Provider<Lazy<test.Foo>>"), None);
        assert_eq!(kind, RequestKind::ProviderOfLazy);
        assert_eq!(key.type_, t("test.Foo"));

        let (kind, key) = factory.request(&t("Producer<Map<String, Producer<Object>>>"), None);
        assert_eq!(kind, RequestKind::Producer);
        assert_eq!(key.type_, t("Map<String, Producer<Object>>"));

        let (kind, _) = factory.request(&t("test.Foo"), None);
        assert_eq!(kind, RequestKind::Instance);
    }

    #[test]
    fn map_value_unwrap_and_wrap() {
        let factory = KeyFactory::new(true);
        let key = factory.key(&t("Map<String, Provider<Object>>"), None);
        let (framework, unwrapped) = factory.unwrap_map_value(&key).unwrap();
        assert_eq!(framework, FrameworkType::Provider);
        assert_eq!(unwrapped.type_, t("Map<String, Object>"));
        assert_eq!(
            factory.wrap_map_value(&unwrapped, FrameworkType::Provider),
            Some(key)
        );
    }

    #[test]
    fn contribution_key_for_into_map() {
        let factory = KeyFactory::new(true);
        let key = factory
            .contribution_key(
                &t("Object"),
                None,
                ContributionType::IntoMap,
                Some(&t("String")),
                MultibindingContributionIdentifier {
                    module: "test.M".to_owned(),
                    binding_element: "a".to_owned(),
                },
            )
            .unwrap();
        assert_eq!(key.without_contribution(), factory.key(&t("Map<String,Object>"), None));
        assert_eq!(key.to_string(), "java.util.Map<java.lang.String,java.lang.Object> test.M#a");
    }

    #[test]
    fn provider_breaks_cycles_instance_does_not() {
        assert!(RequestKind::Provider.breaks_cycles());
        assert!(RequestKind::Lazy.breaks_cycles());
        assert!(!RequestKind::Instance.breaks_cycles());
        assert!(!RequestKind::Produced.breaks_cycles());
    }
}
