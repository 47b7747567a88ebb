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

//! Several bindings for one key, visible from the same component.

use crate::components::ComponentPath;
use crate::declarations::{BindingDeclaration, BindingDeclarationKind};
use crate::diagnostics::formatter::{format_indented_list, DOUBLE_INDENT, INDENT};
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, BindingKind, BindingNode};
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::NodeIndex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use stiletto_common::key::Key;

pub struct DuplicateBindingsValidator;
builtin_plugin!(DuplicateBindingsValidator, "Stiletto/DuplicateBindings");

/// A binding without the component that owns it. Copies of one binding
/// resolved again in a descendant are the same binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct BindingIdentity {
    kind: BindingKind,
    key: Key,
    declaration: Option<usize>,
}

impl BindingIdentity {
    fn of(binding: &BindingNode) -> Self {
        BindingIdentity {
            kind: binding.kind,
            key: binding.key.clone(),
            declaration: binding.declaration.as_ref().map(|d| d.order),
        }
    }
}

type Bindings<'a> = Vec<(NodeIndex, &'a BindingNode)>;

impl DuplicateBindingsValidator {
    fn visit(&self, context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        let ignore_variance = context.env.options.ignore_provision_key_wildcards;
        let mut reported: HashSet<BTreeSet<BindingIdentity>> = HashSet::new();
        for group in group_by_key(graph, ignore_variance) {
            for subset in mutually_visible_subsets(&group) {
                let identities: BTreeSet<BindingIdentity> =
                    subset.iter().map(|(_, b)| BindingIdentity::of(b)).collect();
                if identities.len() < 2 || !reported.insert(identities.clone()) {
                    continue;
                }
                let injections = identities
                    .iter()
                    .filter(|i| i.kind == BindingKind::Injection)
                    .count();
                if injections == 1 && identities.len() == 2 {
                    report_conflict_with_inject(context, &subset, reporter);
                } else {
                    report_duplicates(graph, &subset, reporter);
                }
            }
        }
    }
}

/// Bindings other than members injection, grouped by key in creation order.
fn group_by_key(graph: &BindingGraph, ignore_variance: bool) -> Vec<Bindings<'_>> {
    let mut groups: Vec<Bindings> = Vec::new();
    let mut positions: HashMap<Key, usize> = HashMap::new();
    for (index, binding) in graph.binding_nodes() {
        if binding.kind == BindingKind::MembersInjection {
            continue;
        }
        let key = if ignore_variance {
            binding.key.with_type(binding.key.type_.without_variance())
        } else {
            binding.key.clone()
        };
        match positions.get(&key) {
            Some(position) => groups[*position].push((index, binding)),
            None => {
                positions.insert(key, groups.len());
                groups.push(vec![(index, binding)]);
            }
        }
    }
    groups
}

/// For each owning component, its bindings plus those of its ancestors.
fn mutually_visible_subsets<'a>(bindings: &Bindings<'a>) -> Vec<Bindings<'a>> {
    let mut paths: Vec<&ComponentPath> = Vec::new();
    for (_, binding) in bindings {
        if !paths.contains(&&binding.component) {
            paths.push(&binding.component);
        }
    }
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
    let mut result = Vec::new();
    for path in paths {
        let visible: Bindings = bindings
            .iter()
            .filter(|(_, b)| b.component.contains(path))
            .copied()
            .collect();
        if seen.insert(visible.iter().map(|(index, _)| *index).collect()) {
            result.push(visible);
        }
    }
    result
}

fn rootmost<'a>(
    bindings: &Bindings<'a>,
    predicate: impl Fn(&BindingNode) -> bool,
) -> Option<&'a BindingNode> {
    bindings
        .iter()
        .map(|(_, b)| *b)
        .filter(|b| predicate(b))
        .min_by_key(|b| b.component.depth())
}

fn with_component(binding: &BindingNode) -> String {
    let element = binding
        .declaration
        .as_ref()
        .map(|d| d.element.clone())
        .unwrap_or_else(|| binding.key.to_string());
    format!("\n{}{} [{}]", INDENT, element, binding.component)
}

fn report_conflict_with_inject(
    context: &ValidationContext,
    bindings: &Bindings,
    reporter: &mut GraphReporter,
) {
    let severity = match context.env.options.explicit_binding_conflicts_with_inject.severity() {
        Some(severity) => severity,
        None => return,
    };
    let injection = rootmost(bindings, |b| b.kind == BindingKind::Injection);
    let explicit = rootmost(bindings, |b| b.kind != BindingKind::Injection);
    if let (Some(injection), Some(explicit)) = (injection, explicit) {
        let message = format!(
            "{} is bound multiple times:{}{}\nThis condition was never validated before, and will soon be an error.",
            explicit.key,
            with_component(injection),
            with_component(explicit)
        );
        reporter.report_component(severity, &message);
    }
}

/// Declarations shown for `bindings`, sorted by declaring type and method.
///
/// A binding with nothing to show stands for the bindings it requests.
fn declarations(graph: &BindingGraph, bindings: &Bindings) -> Vec<Rc<BindingDeclaration>> {
    let mut result: Vec<Rc<BindingDeclaration>> = Vec::new();
    for (index, binding) in bindings {
        let mut own: Vec<Rc<BindingDeclaration>> =
            binding.declarations().into_iter().cloned().collect();
        if own.is_empty() {
            own = graph
                .dependencies_of(*index)
                .iter()
                .filter_map(|edge| graph.binding(edge.target))
                .flat_map(|b| b.declarations().into_iter().cloned())
                .collect();
        }
        for declaration in own {
            if !result.iter().any(|d| d.order == declaration.order) {
                result.push(declaration);
            }
        }
    }
    result.sort_by_key(|d| d.sort_key());
    result
}

fn elements(declarations: &[Rc<BindingDeclaration>]) -> Vec<String> {
    declarations.iter().map(|d| d.element.clone()).collect()
}

fn report_duplicates(graph: &BindingGraph, bindings: &Bindings, reporter: &mut GraphReporter) {
    let (_, one_binding) = match bindings.first() {
        Some(first) => *first,
        None => return,
    };
    let (multibindings, unique): (Bindings, Bindings) =
        bindings.iter().copied().partition(|(_, b)| b.kind.is_multibinding());
    let mut message = String::new();
    match multibindings.first() {
        None => {
            message.push_str(&format!("{} is bound multiple times:", one_binding.key));
            message.push_str(&format_indented_list(
                &elements(&declarations(graph, bindings)),
                INDENT,
            ));
        }
        Some((_, one_multibinding)) => {
            let kind = if one_multibinding.kind == BindingKind::MultiboundMap {
                "Map"
            } else {
                "Set"
            };
            message.push_str(&format!(
                "{} has incompatible bindings or declarations:\n{}{} bindings and declarations:",
                one_multibinding.key, INDENT, kind
            ));
            message.push_str(&format_indented_list(
                &elements(&declarations(graph, &multibindings)),
                DOUBLE_INDENT,
            ));
            let unique_declarations: Vec<Rc<BindingDeclaration>> = declarations(graph, &unique)
                .into_iter()
                .filter(|d| d.kind != BindingDeclarationKind::Multibinds)
                .collect();
            if !unique_declarations.is_empty() {
                message.push_str(&format!("\n{}Unique bindings and declarations:", INDENT));
                message.push_str(&format_indented_list(
                    &elements(&unique_declarations),
                    DOUBLE_INDENT,
                ));
            }
        }
    }
    message.push_str(&format!("\n{}in component: [{}]", INDENT, one_binding.component));
    reporter.report_component(Severity::Error, &message);
}
