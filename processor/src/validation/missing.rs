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

//! Keys requested somewhere in the graph that nothing binds.
//!
//! Only reported for the root of a regular graph. Subcomponents are checked
//! as part of the root that installs them, and full graphs are allowed to
//! have unsatisfied keys.

use crate::diagnostics::formatter::{TraceFormatter, DOUBLE_INDENT, INDENT};
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, MissingNode};
use crate::validation::producers::dependency_can_be_production;
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::NodeIndex;
use stiletto_common::key::{is_framework_type, is_map, is_optional, is_raw, is_set, Key};
use stiletto_common::type_data::TypeData;

pub struct MissingBindingValidator;
builtin_plugin!(MissingBindingValidator, "Stiletto/MissingBinding");

impl MissingBindingValidator {
    fn visit(&self, context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        if graph.is_full_binding_graph() || graph.root().descriptor.is_subcomponent {
            return;
        }
        for (index, missing) in graph.missing_nodes() {
            if graph
                .unprocessable_types()
                .contains(&missing.key.type_.path)
            {
                continue;
            }
            let message = missing_binding_message(context, graph, index, missing);
            reporter.report_component(Severity::Error, &message);
        }
    }
}

fn missing_binding_message(
    context: &ValidationContext,
    graph: &BindingGraph,
    index: NodeIndex,
    missing: &MissingNode,
) -> String {
    let key = &missing.key;
    let mut message = format!("{} cannot be provided without ", key);
    if is_valid_implicit_provision_key(context, key) {
        message.push_str("an @Inject constructor or ");
    }
    message.push_str("an @Provides-");
    if all_requests_can_be_production(graph, index) {
        message.push_str(" or @Produces-");
    }
    message.push_str("annotated method.");
    if context.registry.members_injection(&key.type_).is_some()
        && context.registry.injection_binding(key).is_none()
    {
        message.push_str(" This type supports members injection but cannot be implicitly provided.");
    }
    message.push_str(&TraceFormatter::new(graph).binding_message(index));
    message.push_str(&bound_in_other_components(graph, key));
    message.push_str(&similar_bindings(graph, key));
    message
}

/// Whether an `@Inject` constructor could have bound `key`.
fn is_valid_implicit_provision_key(context: &ValidationContext, key: &Key) -> bool {
    let type_ = &key.type_;
    if key.qualifier.is_some()
        || type_.is_primitive()
        || type_.is_wildcard()
        || type_.has_wildcard_args()
        || is_raw(type_)
    {
        return false;
    }
    if is_framework_type(type_) || is_set(type_) || is_map(type_) {
        return false;
    }
    if is_optional(type_) {
        return true;
    }
    if context.manifest.interface(&type_.path).is_some() {
        return false;
    }
    !context
        .manifest
        .injectables
        .iter()
        .any(|i| i.name == type_.path && i.is_abstract)
}

fn all_requests_can_be_production(graph: &BindingGraph, index: NodeIndex) -> bool {
    let requests = graph.requests_of(index);
    !requests.is_empty()
        && requests
            .iter()
            .all(|edge| dependency_can_be_production(graph, edge))
}

fn bound_in_other_components(graph: &BindingGraph, key: &Key) -> String {
    let mut lines: Vec<String> = graph
        .declarations()
        .filter(|(_, d)| &d.key == key)
        .map(|(path, d)| format!("\n{}[{}] {}", INDENT, path.current(), d.short_element()))
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    lines.dedup();
    format!(
        "\n\nNote: {} is provided in the following other components:{}",
        key,
        lines.concat()
    )
}

fn similar_bindings(graph: &BindingGraph, key: &Key) -> String {
    let mut similar: Vec<(String, Vec<String>)> = Vec::new();
    for (path, declaration) in graph.declarations() {
        let candidate = &declaration.key;
        if candidate == key
            || candidate.multibinding_contribution.is_some()
            || !similar_types(&candidate.type_.without_variance(), &key.type_.without_variance())
        {
            continue;
        }
        let line = format!("[{}] {}", path.current(), declaration.short_element());
        let readable = candidate.to_string();
        match similar.iter_mut().find(|(k, _)| *k == readable) {
            Some((_, lines)) => {
                if !lines.contains(&line) {
                    lines.push(line)
                }
            }
            None => similar.push((readable, vec![line])),
        }
    }
    if similar.is_empty() {
        return String::new();
    }
    let mut message =
        String::from("\n\nNote: A similar binding is provided in the following other components:");
    for (readable, lines) in similar {
        message.push_str(&format!("\n{}{} is provided at:", INDENT, readable));
        for line in lines {
            message.push_str(&format!("\n{}{}", DOUBLE_INDENT, line));
        }
    }
    message
}

/// Same type paths at every level. A level without arguments matches any
/// arguments.
fn similar_types(a: &TypeData, b: &TypeData) -> bool {
    if a.path != b.path {
        return false;
    }
    if a.args.is_empty() || b.args.is_empty() {
        return true;
    }
    a.args.len() == b.args.len()
        && a.args.iter().zip(b.args.iter()).all(|(x, y)| similar_types(x, y))
}
