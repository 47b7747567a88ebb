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

//! Builds graphs out of JSON manifests for plugin tests.

use crate::components::ComponentDescriptor;
use crate::declarations::DeclarationRegistry;
use crate::diagnostics::reporter::DiagnosticReporter;
use crate::error::Diagnostic;
use crate::graph::BindingGraph;
use crate::resolver::resolve;
use crate::superficial::InvalidElements;
use crate::validation::{validate_graph, ValidationContext, ValidationPlugin};
use serde_json::Value;
use std::collections::HashMap;
use stiletto_common::environment::ProcessingEnv;
use stiletto_common::manifest::Manifest;

pub struct Fixture {
    pub env: ProcessingEnv,
    pub manifest: Manifest,
    pub registry: DeclarationRegistry,
}

impl Fixture {
    pub fn new(manifest: Value) -> Self {
        Fixture::with_options(manifest, &[])
    }

    pub fn with_options(manifest: Value, options: &[(&str, &str)]) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let raw: HashMap<String, String> = options
            .iter()
            .map(|(k, v)| (format!("stiletto.{}", k), v.to_string()))
            .collect();
        let (env, errors) = ProcessingEnv::from_processor_options(&raw);
        assert!(errors.is_empty(), "{:?}", errors);
        let manifest: Manifest = serde_json::from_value(manifest).unwrap();
        let registry = DeclarationRegistry::new(&env, &manifest, &InvalidElements::default());
        Fixture {
            env,
            manifest,
            registry,
        }
    }

    /// The regular graph of component `root`, or the full graph of module
    /// `root` when no such component exists.
    pub fn graph(&self, root: &str) -> BindingGraph {
        self.build(root, false)
    }

    pub fn full_graph(&self, root: &str) -> BindingGraph {
        self.build(root, true)
    }

    fn build(&self, root: &str, full: bool) -> BindingGraph {
        let invalid = InvalidElements::default();
        match self.manifest.component(root) {
            Some(component) => {
                let descriptor = ComponentDescriptor::for_component(&self.env, &self.manifest, component);
                resolve(&self.env, &self.manifest, &self.registry, &invalid, descriptor, full)
            }
            None => {
                let module = self.manifest.module(root).unwrap();
                let descriptor = ComponentDescriptor::for_module(&self.manifest, module);
                resolve(&self.env, &self.manifest, &self.registry, &invalid, descriptor, true)
            }
        }
    }

    pub fn run(&self, plugin: Box<dyn ValidationPlugin>, graph: &BindingGraph) -> Vec<Diagnostic> {
        let context = ValidationContext {
            env: &self.env,
            manifest: &self.manifest,
            registry: &self.registry,
        };
        let mut reporter = DiagnosticReporter::new();
        validate_graph(&context, graph, &[plugin], &mut reporter);
        reporter.into_diagnostics()
    }

    /// Runs `plugin` over the regular graph of `root`.
    pub fn check(&self, plugin: Box<dyn ValidationPlugin>, root: &str) -> Vec<Diagnostic> {
        let graph = self.graph(root);
        self.run(plugin, &graph)
    }

    pub fn check_full(&self, plugin: Box<dyn ValidationPlugin>, root: &str) -> Vec<Diagnostic> {
        let graph = self.full_graph(root);
        self.run(plugin, &graph)
    }
}

pub fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.message.clone()).collect()
}
