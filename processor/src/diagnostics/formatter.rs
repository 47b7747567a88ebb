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

//! Text of dependency traces and the lists that follow them.

use crate::graph::{BindingGraph, DependencyEdge};
use petgraph::stable_graph::NodeIndex;
use stiletto_common::key::RequestKind;

pub const INDENT: &str = "    ";
pub const DOUBLE_INDENT: &str = "        ";
const LIST_LIMIT: usize = 10;

/// One `\n{indent}{item}` line per item. Past the tenth item the rest
/// collapse into `and N others`.
pub fn format_indented_list(items: &[String], indent: &str) -> String {
    let mut result = String::new();
    for item in items.iter().take(LIST_LIMIT) {
        result.push('\n');
        result.push_str(indent);
        result.push_str(item);
    }
    if items.len() > LIST_LIMIT {
        let remaining = items.len() - LIST_LIMIT;
        result.push_str(&format!(
            "\n{}and {} other{}",
            indent,
            remaining,
            if remaining > 1 { "s" } else { "" }
        ));
    }
    result
}

pub struct TraceFormatter<'a> {
    graph: &'a BindingGraph,
}

impl<'a> TraceFormatter<'a> {
    pub fn new(graph: &'a BindingGraph) -> Self {
        TraceFormatter { graph }
    }

    /// A single frame, or `None` for synthetic requests.
    pub fn format_edge(&self, edge: &DependencyEdge) -> Option<String> {
        let element = edge.request.element.as_ref()?;
        let component = self.graph.node(edge.source).component_path().current();
        if edge.entry_point {
            let verb = if edge.request.kind == RequestKind::MembersInjection {
                "injected"
            } else {
                "requested"
            };
            Some(format!(
                "{}{} is {} at\n{}[{}] {}",
                INDENT, edge.request.key, verb, DOUBLE_INDENT, component, element
            ))
        } else {
            Some(format!(
                "{}{} is injected at\n{}[{}] {}",
                INDENT,
                edge.request.readable(),
                DOUBLE_INDENT,
                component,
                element
            ))
        }
    }

    pub fn format_edges(&self, edges: &[DependencyEdge]) -> String {
        edges
            .iter()
            .filter_map(|edge| self.format_edge(edge))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The frame for `edge` followed by the trace back to an entry point.
    /// Starts with a newline.
    pub fn edge_message(&self, edge: &DependencyEdge) -> String {
        let mut trace = vec![*edge];
        if !edge.entry_point {
            trace.extend(self.graph.shortest_path_from_entry_point(edge.source));
        }
        format!("\n{}", self.format_edges(&trace))
    }

    /// An entry point as listed under "other entry points".
    fn format_entry_point(&self, edge: &DependencyEdge) -> String {
        let path = self.graph.node(edge.source).component_path();
        let element = edge.request.element.clone().unwrap_or_default();
        if path.is_root() {
            element
        } else {
            format!("{} [{}]", element, path)
        }
    }

    /// The trace leading to `target`, then the requests and entry points
    /// the trace leaves out. Starts with a newline.
    pub fn binding_message(&self, target: NodeIndex) -> String {
        let trace = self.graph.shortest_path_from_entry_point(target);
        let mut message = String::from("\n");
        if let Some(entry_point) = trace.last() {
            message.push_str(&self.format_edges(&trace));
            let path = self.graph.node(entry_point.source).component_path();
            if !path.is_root() {
                message.push_str(&format!(" [{}]", path));
            }
        }
        message.push_str(&self.requests_not_in_trace(target, &trace));
        message
    }

    fn requests_not_in_trace(&self, target: NodeIndex, trace: &[DependencyEdge]) -> String {
        let mut message = String::new();
        let traced = trace.first().map(|edge| edge.index);
        let mut elements: Vec<String> = Vec::new();
        for request in self.graph.requests_of(target) {
            if request.entry_point || Some(request.index) == traced {
                continue;
            }
            if let Some(element) = &request.request.element {
                if !elements.contains(element) {
                    elements.push(element.clone());
                }
            }
        }
        if !elements.is_empty() {
            message.push_str("\nIt is also requested at:");
            message.push_str(&format_indented_list(&elements, INDENT));
        }

        let mut entry_points = self.graph.entry_points_reaching(target);
        if entry_points.len() > 1 {
            let traced_entry = trace.last().map(|edge| edge.index);
            entry_points.retain(|edge| Some(edge.index) != traced_entry);
            entry_points.sort_by_key(|edge| {
                (
                    self.graph.node(edge.source).component_path().depth(),
                    edge.index,
                )
            });
            let formatted: Vec<String> = entry_points
                .iter()
                .map(|edge| self.format_entry_point(edge))
                .collect();
            message.push_str("\nThe following other entry points also depend on it:");
            message.push_str(&format_indented_list(&formatted, INDENT));
        }
        message
    }
}
