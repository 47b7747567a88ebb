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

//! The resolved binding graph of one component tree.
//!
//! Nodes are components, bindings and missing bindings. Edges are dependency
//! requests (from a component for entry points, from a binding otherwise)
//! and the parent to child relation between components. The graph may be
//! cyclic, so everything is addressed through petgraph indices.

use crate::components::{ComponentDescriptor, ComponentPath};
use crate::declarations::{BindingDeclaration, BindingDeclarationKind, DependencyRequest};
use petgraph::stable_graph::{EdgeIndex, EdgeReference, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use stiletto_common::key::{Key, RequestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BindingKind {
    Injection,
    AssistedInjection,
    AssistedFactory,
    Provision,
    Production,
    Delegate,
    BoundInstance,
    SubcomponentCreator,
    ComponentDependency,
    ComponentProvision,
    Component,
    MultiboundSet,
    MultiboundMap,
    Optional,
    MembersInjection,
}

impl BindingKind {
    pub fn of(kind: BindingDeclarationKind) -> Option<BindingKind> {
        Some(match kind {
            BindingDeclarationKind::Injection => BindingKind::Injection,
            BindingDeclarationKind::AssistedInjection => BindingKind::AssistedInjection,
            BindingDeclarationKind::AssistedFactory => BindingKind::AssistedFactory,
            BindingDeclarationKind::Provides => BindingKind::Provision,
            BindingDeclarationKind::Produces => BindingKind::Production,
            BindingDeclarationKind::Binds => BindingKind::Delegate,
            BindingDeclarationKind::BindsInstance => BindingKind::BoundInstance,
            BindingDeclarationKind::SubcomponentCreator => BindingKind::SubcomponentCreator,
            BindingDeclarationKind::ComponentDependency => BindingKind::ComponentDependency,
            BindingDeclarationKind::ComponentDependencyProvision => {
                BindingKind::ComponentProvision
            }
            BindingDeclarationKind::Component => BindingKind::Component,
            BindingDeclarationKind::Multibinds | BindingDeclarationKind::BindsOptionalOf => {
                return None
            }
        })
    }

    pub fn is_multibinding(&self) -> bool {
        matches!(self, BindingKind::MultiboundSet | BindingKind::MultiboundMap)
    }

    /// Bindings that only exist in production components.
    pub fn is_production(&self) -> bool {
        *self == BindingKind::Production
    }
}

#[derive(Debug, Clone)]
pub struct ComponentNode {
    pub path: ComponentPath,
    pub descriptor: Rc<ComponentDescriptor>,
}

#[derive(Debug, Clone)]
pub struct BindingNode {
    /// The component that owns this binding.
    pub component: ComponentPath,
    pub key: Key,
    pub kind: BindingKind,
    pub declaration: Option<Rc<BindingDeclaration>>,
    /// For synthesized multibindings and optionals: the contributions and
    /// `@Multibinds`/`@BindsOptionalOf` declarations behind them.
    pub multibinding_declarations: Vec<Rc<BindingDeclaration>>,
    pub dependencies: Vec<DependencyRequest>,
    pub scope: Option<String>,
    pub nullable: bool,
}

impl BindingNode {
    /// Declarations shown when this binding is listed in a diagnostic.
    pub fn declarations(&self) -> Vec<&Rc<BindingDeclaration>> {
        self.declaration
            .iter()
            .chain(self.multibinding_declarations.iter())
            .collect()
    }

    /// `@Binds` and delegate-like bindings whose single dependency is the real binding.
    pub fn is_delegate(&self) -> bool {
        self.kind == BindingKind::Delegate
    }
}

#[derive(Debug, Clone)]
pub struct MissingNode {
    pub component: ComponentPath,
    pub key: Key,
    pub members_injection: bool,
}

#[derive(Debug, Clone)]
pub enum Node {
    Component(ComponentNode),
    Binding(BindingNode),
    Missing(MissingNode),
}

impl Node {
    pub fn key(&self) -> Option<&Key> {
        match self {
            Node::Component(_) => None,
            Node::Binding(binding) => Some(&binding.key),
            Node::Missing(missing) => Some(&missing.key),
        }
    }

    pub fn component_path(&self) -> &ComponentPath {
        match self {
            Node::Component(component) => &component.path,
            Node::Binding(binding) => &binding.component,
            Node::Missing(missing) => &missing.component,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Edge {
    Dependency {
        request: DependencyRequest,
        entry_point: bool,
    },
    ChildFactoryMethod {
        method: Option<String>,
    },
    SubcomponentCreatorBinding,
}

/// A dependency edge with both of its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct DependencyEdge<'a> {
    pub index: EdgeIndex,
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub request: &'a DependencyRequest,
    pub entry_point: bool,
}

#[derive(Debug)]
pub struct BindingGraph {
    pub(crate) graph: StableDiGraph<Node, Edge>,
    pub(crate) root: NodeIndex,
    /// Component nodes in the order they were resolved, root first.
    pub(crate) components: Vec<NodeIndex>,
    pub(crate) full_binding_graph: bool,
    /// Declarations each component adds to the ones it inherits.
    pub(crate) declarations: BTreeMap<ComponentPath, Vec<Rc<BindingDeclaration>>>,
    /// Superficially invalid types the resolver ran into.
    pub(crate) unprocessable_types: Vec<String>,
}

impl BindingGraph {
    pub fn root(&self) -> &ComponentNode {
        match &self.graph[self.root] {
            Node::Component(component) => component,
            _ => unreachable!("root is always a component node"),
        }
    }

    pub fn is_full_binding_graph(&self) -> bool {
        self.full_binding_graph
    }

    /// Every declaration in the tree with the component that installs it.
    pub fn declarations(&self) -> impl Iterator<Item = (&ComponentPath, &Rc<BindingDeclaration>)> {
        self.declarations
            .iter()
            .flat_map(|(path, declarations)| declarations.iter().map(move |d| (path, d)))
    }

    pub fn unprocessable_types(&self) -> &[String] {
        &self.unprocessable_types
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.graph[index]
    }

    pub fn binding(&self, index: NodeIndex) -> Option<&BindingNode> {
        match &self.graph[index] {
            Node::Binding(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn component_nodes(&self) -> Vec<&ComponentNode> {
        self.components
            .iter()
            .filter_map(|index| match &self.graph[*index] {
                Node::Component(component) => Some(component),
                _ => None,
            })
            .collect()
    }

    pub fn component_node(&self, path: &ComponentPath) -> Option<&ComponentNode> {
        self.component_nodes().into_iter().find(|c| &c.path == path)
    }

    fn sorted_indices(&self) -> Vec<NodeIndex> {
        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort();
        indices
    }

    /// Binding nodes in creation order.
    pub fn binding_nodes(&self) -> Vec<(NodeIndex, &BindingNode)> {
        self.sorted_indices()
            .into_iter()
            .filter_map(|index| self.binding(index).map(|b| (index, b)))
            .collect()
    }

    pub fn missing_nodes(&self) -> Vec<(NodeIndex, &MissingNode)> {
        self.sorted_indices()
            .into_iter()
            .filter_map(|index| match &self.graph[index] {
                Node::Missing(missing) => Some((index, missing)),
                _ => None,
            })
            .collect()
    }

    fn dependency_edge(edge: EdgeReference<'_, Edge>) -> Option<DependencyEdge<'_>> {
        match edge.weight() {
            Edge::Dependency {
                request,
                entry_point,
            } => Some(DependencyEdge {
                index: edge.id(),
                source: edge.source(),
                target: edge.target(),
                request,
                entry_point: *entry_point,
            }),
            _ => None,
        }
    }

    /// Outgoing dependency edges of `node` in insertion order.
    pub fn dependencies_of(&self, node: NodeIndex) -> Vec<DependencyEdge<'_>> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .filter_map(Self::dependency_edge)
            .collect();
        edges.sort_by_key(|e| e.index);
        edges
    }

    /// Incoming dependency edges of `node` in insertion order.
    pub fn requests_of(&self, node: NodeIndex) -> Vec<DependencyEdge<'_>> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .filter_map(Self::dependency_edge)
            .collect();
        edges.sort_by_key(|e| e.index);
        edges
    }

    /// Every entry point edge, root component first.
    pub fn entry_point_edges(&self) -> Vec<DependencyEdge<'_>> {
        let mut result = Vec::new();
        for component in &self.components {
            result.extend(
                self.dependencies_of(*component)
                    .into_iter()
                    .filter(|e| e.entry_point),
            );
        }
        result
    }

    /// Shortest chain of dependency edges leading from `from` to `to`, in
    /// request order. Empty when `from == to`.
    pub fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<DependencyEdge<'_>>> {
        let mut previous: HashMap<NodeIndex, DependencyEdge> = HashMap::new();
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = Vec::new();
                let mut current = to;
                while let Some(edge) = previous.get(&current) {
                    path.push(*edge);
                    current = edge.source;
                }
                path.reverse();
                return Some(path);
            }
            for edge in self.dependencies_of(node) {
                if visited.insert(edge.target) {
                    previous.insert(edge.target, edge);
                    queue.push_back(edge.target);
                }
            }
        }
        None
    }

    /// The chain of requests from an entry point to `target`, listed from
    /// `target` back to the entry point.
    ///
    /// Entry points of components nearest the root win, then those with the
    /// shortest path, then the first declared.
    pub fn shortest_path_from_entry_point(&self, target: NodeIndex) -> Vec<DependencyEdge<'_>> {
        let best = self
            .entry_points_reaching(target)
            .into_iter()
            .filter_map(|entry| {
                let path = self.shortest_path(entry.target, target)?;
                let depth = self.graph[entry.source].component_path().depth();
                Some(((depth, path.len(), entry.index), entry, path))
            })
            .min_by_key(|(rank, _, _)| *rank);
        match best {
            Some((_, entry, mut path)) => {
                path.reverse();
                path.push(entry);
                path
            }
            None => Vec::new(),
        }
    }

    /// Entry point edges from which `target` can be reached.
    pub fn entry_points_reaching(&self, target: NodeIndex) -> Vec<DependencyEdge<'_>> {
        let mut visited = HashSet::new();
        let mut stack = vec![target];
        let mut result = Vec::new();
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            for edge in self.requests_of(node) {
                if edge.entry_point {
                    result.push(edge);
                } else {
                    stack.push(edge.source);
                }
            }
        }
        result.sort_by_key(|e| e.index);
        result.dedup_by_key(|e| e.index);
        result
    }

    /// Follows `@Binds` edges from `node` to the binding that does the work.
    ///
    /// Returns `None` when the chain loops back on itself.
    pub fn terminal_binding(&self, node: NodeIndex) -> Option<NodeIndex> {
        let mut visited = HashSet::new();
        let mut current = node;
        loop {
            if !visited.insert(current) {
                return None;
            }
            match self.binding(current) {
                Some(binding) if binding.is_delegate() => {
                    match self.dependencies_of(current).first() {
                        Some(edge) => current = edge.target,
                        None => return Some(current),
                    }
                }
                _ => return Some(current),
            }
        }
    }

    /// Serializable summary for code generation.
    pub fn to_resolved(&self) -> ResolvedGraph {
        let mut components: Vec<ResolvedComponent> = self
            .component_nodes()
            .into_iter()
            .map(|c| ResolvedComponent {
                path: c.path.clone(),
                name: c.descriptor.name.clone(),
                entry_points: self
                    .dependencies_of(self.component_index(&c.path))
                    .into_iter()
                    .filter(|e| e.entry_point)
                    .map(|e| ResolvedRequest::of(e.request))
                    .collect(),
                bindings: Vec::new(),
            })
            .collect();
        for (index, binding) in self.binding_nodes() {
            let component = match components.iter_mut().find(|c| c.path == binding.component) {
                Some(component) => component,
                None => continue,
            };
            component.bindings.push(ResolvedBinding {
                key: binding.key.to_string(),
                kind: binding.kind,
                scope: binding.scope.clone(),
                element: binding.declaration.as_ref().map(|d| d.element.clone()),
                dependencies: self
                    .dependencies_of(index)
                    .into_iter()
                    .map(|e| ResolvedRequest::of(e.request))
                    .collect(),
                contributions: binding
                    .multibinding_declarations
                    .iter()
                    .filter(|d| d.is_multibinding_contribution())
                    .map(|d| d.key.to_string())
                    .collect(),
            });
        }
        ResolvedGraph {
            root: self.root().descriptor.name.clone(),
            components,
        }
    }

    fn component_index(&self, path: &ComponentPath) -> NodeIndex {
        self.components
            .iter()
            .copied()
            .find(|i| self.graph[*i].component_path() == path)
            .unwrap_or(self.root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub key: String,
    pub kind: RequestKind,
}

impl ResolvedRequest {
    fn of(request: &DependencyRequest) -> Self {
        ResolvedRequest {
            key: request.key.to_string(),
            kind: request.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBinding {
    pub key: String,
    pub kind: BindingKind,
    pub scope: Option<String>,
    pub element: Option<String>,
    pub dependencies: Vec<ResolvedRequest>,
    pub contributions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedComponent {
    pub path: ComponentPath,
    pub name: String,
    pub entry_points: Vec<ResolvedRequest>,
    pub bindings: Vec<ResolvedBinding>,
}

/// What the back-end gets for a valid component tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGraph {
    pub root: String,
    pub components: Vec<ResolvedComponent>,
}
