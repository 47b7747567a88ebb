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

//! Checks that run over a resolved [BindingGraph].
//!
//! Each check is a [ValidationPlugin]. Built-in plugins are prefixed
//! `Stiletto/`; callers may add their own.

pub mod cycles;
pub mod duplicates;
pub mod hierarchy;
pub mod map_keys;
pub mod missing;
pub mod nullable;
pub mod producers;
pub mod scopes;
pub mod set_multibindings;
#[cfg(test)]
pub(crate) mod testing;

use crate::declarations::DeclarationRegistry;
use crate::diagnostics::reporter::{DiagnosticReporter, GraphReporter};
use crate::graph::BindingGraph;
use stiletto_common::environment::ProcessingEnv;
use stiletto_common::manifest::Manifest;
use stiletto_common::options::{CompilerOptions, ValidationType};
use tracing::{info_span, trace};

/// What a plugin may consult besides the graph itself.
pub struct ValidationContext<'a> {
    pub env: &'a ProcessingEnv,
    pub manifest: &'a Manifest,
    pub registry: &'a DeclarationRegistry,
}

pub trait ValidationPlugin {
    /// Prefix of every message, e.g. `Stiletto/DependencyCycle`.
    fn plugin_name(&self) -> &str;

    fn visits_full_graphs(&self, options: &CompilerOptions) -> bool {
        options.plugins_visit_full_binding_graphs || options.full_binding_graph_validation_enabled()
    }

    fn visit_graph(
        &self,
        context: &ValidationContext,
        graph: &BindingGraph,
        reporter: &mut GraphReporter,
    );
}

macro_rules! builtin_plugin {
    ($plugin:ty, $name:expr) => {
        impl $crate::validation::ValidationPlugin for $plugin {
            fn plugin_name(&self) -> &str {
                $name
            }

            fn visits_full_graphs(&self, options: &stiletto_common::options::CompilerOptions) -> bool {
                options.full_binding_graph_validation_enabled()
            }

            fn visit_graph(
                &self,
                context: &$crate::validation::ValidationContext,
                graph: &$crate::graph::BindingGraph,
                reporter: &mut $crate::diagnostics::reporter::GraphReporter,
            ) {
                self.visit(context, graph, reporter)
            }
        }
    };
}
pub(crate) use builtin_plugin;

pub fn builtin_plugins() -> Vec<Box<dyn ValidationPlugin>> {
    vec![
        Box::new(cycles::DependencyCycleValidator),
        Box::new(duplicates::DuplicateBindingsValidator),
        Box::new(map_keys::MapKeysValidator),
        Box::new(set_multibindings::SetMultibindingValidator),
        Box::new(scopes::IncompatiblyScopedBindingsValidator),
        Box::new(producers::ProvisionDependsOnProductionValidator),
        Box::new(nullable::NullableBindingValidator),
        Box::new(missing::MissingBindingValidator),
    ]
}

/// Runs `plugins` over `graph`. Returns `false` if any of them reported an
/// error.
pub fn validate_graph(
    context: &ValidationContext,
    graph: &BindingGraph,
    plugins: &[Box<dyn ValidationPlugin>],
    reporter: &mut DiagnosticReporter,
) -> bool {
    let options = &context.env.options;
    let full = graph.is_full_binding_graph();
    let errors_as_warnings = full && options.full_binding_graph_validation == ValidationType::Warning;
    let mut clean = true;
    for plugin in plugins {
        if full && !plugin.visits_full_graphs(options) {
            continue;
        }
        let span = info_span!("plugin", name = plugin.plugin_name());
        let _enter = span.enter();
        let mut graph_reporter =
            GraphReporter::new(graph, reporter, Some(plugin.plugin_name()), errors_as_warnings);
        plugin.visit_graph(context, graph, &mut graph_reporter);
        if graph_reporter.reported_error() {
            trace!("{} reported errors", plugin.plugin_name());
            clean = false;
        }
    }
    clean
}
