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

//! Dependency cycles that no `Provider`, `Lazy` or `Producer` request breaks.

use crate::diagnostics::formatter::TraceFormatter;
use crate::diagnostics::reporter::GraphReporter;
use crate::error::Severity;
use crate::graph::{BindingGraph, DependencyEdge};
use crate::validation::{builtin_plugin, ValidationContext};
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

pub struct DependencyCycleValidator;
builtin_plugin!(DependencyCycleValidator, "Stiletto/DependencyCycle");

impl DependencyCycleValidator {
    fn visit(&self, _context: &ValidationContext, graph: &BindingGraph, reporter: &mut GraphReporter) {
        let starts: Vec<NodeIndex> = if graph.is_full_binding_graph() {
            graph.binding_nodes().into_iter().map(|(index, _)| index).collect()
        } else {
            graph.entry_point_edges().into_iter().map(|edge| edge.target).collect()
        };
        let mut finder = CycleFinder::new(graph);
        for start in starts {
            finder.start(start);
        }
        debug!("found {} cycles", finder.cycles.len());
        for cycle in &finder.cycles {
            reporter.report_component(Severity::Error, &cycle_message(graph, cycle));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// A cycle as the edges that close it, in request order. The first edge
/// leaves the node nearest the entry point.
struct Cycle<'a> {
    start: NodeIndex,
    edges: Vec<DependencyEdge<'a>>,
}

struct CycleFinder<'a> {
    graph: &'a BindingGraph,
    states: HashMap<NodeIndex, VisitState>,
    stack: Vec<NodeIndex>,
    /// `path[i]` leads from `stack[i]` to `stack[i + 1]`.
    path: Vec<DependencyEdge<'a>>,
    seen: HashSet<BTreeSet<EdgeIndex>>,
    cycles: Vec<Cycle<'a>>,
}

impl<'a> CycleFinder<'a> {
    fn new(graph: &'a BindingGraph) -> Self {
        CycleFinder {
            graph,
            states: HashMap::new(),
            stack: Vec::new(),
            path: Vec::new(),
            seen: HashSet::new(),
            cycles: Vec::new(),
        }
    }

    fn start(&mut self, node: NodeIndex) {
        if !self.states.contains_key(&node) {
            self.visit(node);
        }
    }

    /// Depth-first walk from `root`. `stack` and `path` mirror `frames`.
    fn visit(&mut self, root: NodeIndex) {
        let mut frames: Vec<(std::vec::IntoIter<DependencyEdge<'a>>, NodeIndex)> = Vec::new();
        self.enter(root, &mut frames);
        while let Some((edges, node)) = frames.last_mut() {
            let node = *node;
            match edges.next() {
                Some(edge) => {
                    if edge.request.kind.breaks_cycles() {
                        continue;
                    }
                    match self.states.get(&edge.target) {
                        Some(VisitState::Done) => {}
                        Some(VisitState::InProgress) => self.record(edge),
                        None => {
                            self.path.push(edge);
                            self.enter(edge.target, &mut frames);
                        }
                    }
                }
                None => {
                    frames.pop();
                    self.stack.pop();
                    self.path.pop();
                    self.states.insert(node, VisitState::Done);
                }
            }
        }
    }

    fn enter(
        &mut self,
        node: NodeIndex,
        frames: &mut Vec<(std::vec::IntoIter<DependencyEdge<'a>>, NodeIndex)>,
    ) {
        self.states.insert(node, VisitState::InProgress);
        self.stack.push(node);
        frames.push((self.graph.dependencies_of(node).into_iter(), node));
    }

    fn record(&mut self, closing: DependencyEdge<'a>) {
        let position = match self.stack.iter().position(|n| *n == closing.target) {
            Some(position) => position,
            None => return,
        };
        let mut edges: Vec<DependencyEdge<'a>> = self.path[position..].to_vec();
        edges.push(closing);
        let identity: BTreeSet<EdgeIndex> = edges.iter().map(|e| e.index).collect();
        if self.seen.insert(identity) {
            self.cycles.push(Cycle {
                start: closing.target,
                edges,
            });
        }
    }
}

fn cycle_message(graph: &BindingGraph, cycle: &Cycle) -> String {
    let formatter = TraceFormatter::new(graph);
    let mut requests = cycle.edges.clone();
    requests.reverse();
    let mut message = String::from("Found a dependency cycle:\n");
    message.push_str(&formatter.format_edges(&requests));
    // The first frame again, closing the loop.
    if let Some(first) = requests.iter().find_map(|edge| formatter.format_edge(edge)) {
        message.push('\n');
        message.push_str(&first);
    }
    message.push_str("\n    ...");
    if !graph.is_full_binding_graph() {
        let via = graph.shortest_path_from_entry_point(cycle.start);
        message.push_str("\n\nThe cycle is requested via:\n");
        message.push_str(&formatter.format_edges(&via));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::testing::{messages, Fixture};
    use serde_json::json;

    fn cyclic_manifest(b_requests: &str) -> serde_json::Value {
        json!({
            "injectables": [
                {"name": "test.A", "parameters": [{"name": "cParam", "type": "test.C"}]},
                {"name": "test.B", "parameters": [{"name": "aParam", "type": b_requests}]},
                {"name": "test.C", "parameters": [{"name": "bParam", "type": "test.B"}]}
            ],
            "components": [
                {"name": "test.CComponent", "entry_points": [{"method": "getC", "return_type": "test.C"}]}
            ]
        })
    }

    #[test]
    fn reports_cycle_with_request_path() {
        let fixture = Fixture::new(cyclic_manifest("test.A"));
        let diagnostics = fixture.check(Box::new(DependencyCycleValidator), "test.CComponent");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].plugin.as_deref(), Some("Stiletto/DependencyCycle"));
        assert!(messages(&diagnostics)[0].starts_with(
            "Found a dependency cycle:\n\
             \x20   C is injected at\n\
             \x20       [CComponent] A(cParam)\n\
             \x20   A is injected at\n\
             \x20       [CComponent] B(aParam)\n\
             \x20   B is injected at\n\
             \x20       [CComponent] C(bParam)\n\
             \x20   C is injected at\n\
             \x20       [CComponent] A(cParam)\n\
             \x20   ...\n\
             \n\
             The cycle is requested via:\n\
             \x20   C is requested at\n\
             \x20       [CComponent] CComponent.getC()"
        ));
    }

    #[test]
    fn provider_breaks_the_cycle() {
        let fixture = Fixture::new(cyclic_manifest("javax.inject.Provider<test.A>"));
        let diagnostics = fixture.check(Box::new(DependencyCycleValidator), "test.CComponent");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn lazy_breaks_the_cycle() {
        let fixture = Fixture::new(cyclic_manifest("dagger.Lazy<test.A>"));
        let diagnostics = fixture.check(Box::new(DependencyCycleValidator), "test.CComponent");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn self_referencing_delegate_is_a_cycle() {
        let fixture = Fixture::new(json!({
            "modules": [{"name": "test.M", "is_abstract": true, "declarations": [
                {"kind": "Binds", "method": "bindSelf", "return_type": "test.Foo", "is_abstract": true,
                 "parameters": [{"name": "foo", "type": "test.Foo"}]}
            ]}],
            "components": [
                {"name": "test.C", "modules": ["test.M"],
                 "entry_points": [{"method": "foo", "return_type": "test.Foo"}]}
            ]
        }));
        let diagnostics = fixture.check(Box::new(DependencyCycleValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("[C] M.bindSelf(foo)"));
    }

    #[test]
    fn long_cycle_is_reported_once() {
        const LENGTH: usize = 10_000;
        let injectables: Vec<serde_json::Value> = (0..LENGTH)
            .map(|i| {
                json!({"name": format!("test.T{}", i), "parameters": [
                    {"name": "next", "type": format!("test.T{}", (i + 1) % LENGTH)}
                ]})
            })
            .collect();
        let fixture = Fixture::new(json!({
            "injectables": injectables,
            "components": [
                {"name": "test.C", "entry_points": [{"method": "t0", "return_type": "test.T0"}]}
            ]
        }));
        let diagnostics = fixture.check(Box::new(DependencyCycleValidator), "test.C");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .contains(&format!("[C] T{}(next)", LENGTH - 1)));
    }

    #[test]
    fn shared_dependencies_are_not_cycles() {
        let fixture = Fixture::new(json!({
            "injectables": [
                {"name": "test.A", "parameters": [{"name": "b", "type": "test.B"}, {"name": "c", "type": "test.C"}]},
                {"name": "test.B", "parameters": [{"name": "c", "type": "test.C"}]},
                {"name": "test.C"}
            ],
            "components": [
                {"name": "test.Root", "entry_points": [
                    {"method": "a", "return_type": "test.A"},
                    {"method": "b", "return_type": "test.B"}
                ]}
            ]
        }));
        let diagnostics = fixture.check(Box::new(DependencyCycleValidator), "test.Root");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn full_graph_cycles_have_no_request_path() {
        let fixture = Fixture::with_options(
            json!({
                "modules": [{"name": "test.M", "declarations": [
                    {"kind": "Provides", "method": "a", "return_type": "test.A", "is_static": true,
                     "parameters": [{"name": "b", "type": "test.B"}]},
                    {"kind": "Provides", "method": "b", "return_type": "test.B", "is_static": true,
                     "parameters": [{"name": "a", "type": "test.A"}]}
                ]}]
            }),
            &[("fullBindingGraphValidation", "ERROR")],
        );
        let diagnostics = fixture.check_full(Box::new(DependencyCycleValidator), "test.M");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.starts_with("Found a dependency cycle:"));
        assert!(!diagnostics[0].message.contains("The cycle is requested via:"));
        assert!(diagnostics[0].message.contains("Full classname legend:"));
    }
}
