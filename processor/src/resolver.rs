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

//! Builds a [BindingGraph] for one component tree.
//!
//! Each request is resolved in the context of a component. An explicit
//! binding is owned by the component that declares it, unless it depends on
//! multibinding or optional contributions local to the requesting component;
//! then it is resolved again there. Unscoped implicit bindings are owned by
//! the requesting component unless an ancestor already resolved them.

use crate::components::{ComponentDescriptor, ComponentPath, PRODUCTION_SCOPE};
use crate::declarations::{
    BindingDeclaration, BindingDeclarationKind, ComponentDeclarations, DeclarationRegistry,
    DependencyRequest,
};
use crate::graph::{BindingGraph, BindingKind, BindingNode, ComponentNode, Edge, MissingNode, Node};
use crate::superficial::InvalidElements;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use stiletto_common::environment::ProcessingEnv;
use stiletto_common::key::{is_map, is_set, FrameworkType, Key, RequestKind};
use stiletto_common::manifest::{ContributionType, Manifest};
use stiletto_common::options::ValidationType;
use stiletto_common::type_data::TypeData;
use tracing::{debug, info_span, trace};

const OPTIONAL: &str = "java.util.Optional";
pub(crate) const REUSABLE: &str = "dagger.Reusable";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingRequest {
    key: Key,
    members_injection: bool,
}

impl BindingRequest {
    fn of(request: &DependencyRequest) -> Self {
        BindingRequest {
            key: request.key.clone(),
            members_injection: request.kind == RequestKind::MembersInjection,
        }
    }

    fn key(key: Key) -> Self {
        BindingRequest {
            key,
            members_injection: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CandidateId {
    Declaration(usize),
    Multibinding,
    Optional,
    MembersInjection,
    Missing,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: CandidateId,
    kind: BindingKind,
    /// Depth of the component that owns the binding, 1 for the root. `None`
    /// when the binding belongs wherever it is requested.
    home: Option<usize>,
    declaration: Option<Rc<BindingDeclaration>>,
    multibinding_declarations: Vec<Rc<BindingDeclaration>>,
    dependencies: Vec<DependencyRequest>,
    /// An `@Inject` binding an ancestor already uses.
    existing: Option<NodeIndex>,
}

impl Candidate {
    fn declared(declaration: &Rc<BindingDeclaration>, depth: usize) -> Option<Candidate> {
        Some(Candidate {
            id: CandidateId::Declaration(declaration.order),
            kind: BindingKind::of(declaration.kind)?,
            home: match declaration.scope.as_deref() {
                Some(REUSABLE) => None,
                _ => Some(depth),
            },
            declaration: Some(declaration.clone()),
            multibinding_declarations: Vec::new(),
            dependencies: declaration.dependencies.clone(),
            existing: None,
        })
    }
}

struct ComponentContext {
    descriptor: Rc<ComponentDescriptor>,
    declarations: ComponentDeclarations,
    node: NodeIndex,
}

type NodeId = (ComponentPath, BindingRequest, CandidateId);

/// A request whose candidates are still being turned into nodes.
struct PendingRequest {
    context: ComponentPath,
    request: BindingRequest,
    candidates: std::vec::IntoIter<Candidate>,
    result: Vec<NodeIndex>,
}

/// A new binding node whose dependencies are resolved one at a time.
struct PendingBinding {
    index: NodeIndex,
    owner: ComponentPath,
    dependencies: Vec<DependencyRequest>,
    next: usize,
}

impl PendingBinding {
    /// Adds the edges for the current dependency and moves to the next one.
    fn link(&mut self, graph: &mut StableDiGraph<Node, Edge>, targets: &[NodeIndex]) {
        if let Some(dependency) = self.dependencies.get(self.next) {
            for target in targets {
                graph.add_edge(
                    self.index,
                    *target,
                    Edge::Dependency {
                        request: dependency.clone(),
                        entry_point: false,
                    },
                );
            }
        }
        self.next += 1;
    }
}

enum Frame {
    Request(PendingRequest),
    Binding(PendingBinding),
}

/// Dependencies through which an inherited binding could see local
/// contributions. Scoped and production bindings stay where they are.
fn inherited_dependencies(candidate: &Candidate) -> Vec<BindingRequest> {
    if candidate.existing.is_some() || candidate.kind.is_production() {
        return Vec::new();
    }
    let scoped = matches!(
        candidate.declaration.as_ref().and_then(|d| d.scope.as_deref()),
        Some(scope) if scope != REUSABLE
    );
    if scoped {
        return Vec::new();
    }
    candidate.dependencies.iter().map(BindingRequest::of).collect()
}

pub struct Resolver<'a> {
    env: &'a ProcessingEnv,
    manifest: &'a Manifest,
    registry: &'a DeclarationRegistry,
    invalid: &'a InvalidElements,
    full_binding_graph: bool,
    root: ComponentPath,
    graph: StableDiGraph<Node, Edge>,
    contexts: HashMap<ComponentPath, ComponentContext>,
    component_order: Vec<NodeIndex>,
    nodes: HashMap<NodeId, NodeIndex>,
    node_ids: HashMap<NodeIndex, NodeId>,
    resolved: HashMap<(ComponentPath, BindingRequest), Vec<NodeIndex>>,
    unprocessable_types: Vec<String>,
}

/// Resolves the tree rooted at `descriptor`. With `full_binding_graph` every
/// declaration is resolved, whether or not an entry point needs it.
pub fn resolve(
    env: &ProcessingEnv,
    manifest: &Manifest,
    registry: &DeclarationRegistry,
    invalid: &InvalidElements,
    descriptor: ComponentDescriptor,
    full_binding_graph: bool,
) -> BindingGraph {
    let root = ComponentPath::root(&descriptor.name);
    let mut resolver = Resolver {
        env,
        manifest,
        registry,
        invalid,
        full_binding_graph,
        root: root.clone(),
        graph: StableDiGraph::new(),
        contexts: HashMap::new(),
        component_order: Vec::new(),
        nodes: HashMap::new(),
        node_ids: HashMap::new(),
        resolved: HashMap::new(),
        unprocessable_types: Vec::new(),
    };
    let root_node = resolver.add_component(&root, Rc::new(descriptor));

    let mut queue = VecDeque::from(vec![root]);
    while let Some(path) = queue.pop_front() {
        resolver.resolve_component(&path);
        for (child, method) in resolver.children_to_visit(&path) {
            let component = match manifest.component(&child) {
                Some(component) => component,
                None => continue,
            };
            let child_path = path.child(&child);
            let descriptor = ComponentDescriptor::for_component(env, manifest, component);
            let child_node = resolver.add_component(&child_path, Rc::new(descriptor));
            let parent_node = resolver.contexts[&path].node;
            resolver
                .graph
                .add_edge(parent_node, child_node, Edge::ChildFactoryMethod { method });
            resolver.link_creator_bindings(&path, &child, child_node);
            queue.push_back(child_path);
        }
    }

    debug!(
        "resolved {} nodes for {}",
        resolver.graph.node_count(),
        resolver.root
    );
    BindingGraph {
        graph: resolver.graph,
        root: root_node,
        components: resolver.component_order,
        full_binding_graph,
        declarations: resolver
            .contexts
            .iter()
            .map(|(path, context)| (path.clone(), context.declarations.all.clone()))
            .collect(),
        unprocessable_types: resolver.unprocessable_types,
    }
}

impl Resolver<'_> {
    fn add_component(
        &mut self,
        path: &ComponentPath,
        descriptor: Rc<ComponentDescriptor>,
    ) -> NodeIndex {
        // Modules an ancestor installs contribute nothing new.
        let inherited: HashSet<String> = path
            .lineage()
            .iter()
            .filter(|p| *p != path)
            .filter_map(|p| self.contexts.get(p))
            .flat_map(|c| c.descriptor.modules.iter().cloned())
            .collect();
        let mut own = (*descriptor).clone();
        own.modules.retain(|m| !inherited.contains(m));
        let declarations = ComponentDeclarations::collect(self.env, self.manifest, self.registry, &own);

        let node = self.graph.add_node(Node::Component(ComponentNode {
            path: path.clone(),
            descriptor: descriptor.clone(),
        }));
        self.component_order.push(node);
        self.contexts.insert(
            path.clone(),
            ComponentContext {
                descriptor,
                declarations,
                node,
            },
        );
        node
    }

    fn resolve_component(&mut self, path: &ComponentPath) {
        let span = info_span!("component", name = %path);
        let _enter = span.enter();
        let (node, entry_points, declarations) = match self.contexts.get(path) {
            Some(context) => (
                context.node,
                context.descriptor.entry_points.clone(),
                context.declarations.all.clone(),
            ),
            None => return,
        };
        for request in entry_points {
            for target in self.resolve_request(path, &BindingRequest::of(&request)) {
                self.graph.add_edge(
                    node,
                    target,
                    Edge::Dependency {
                        request: request.clone(),
                        entry_point: true,
                    },
                );
            }
        }
        if self.full_binding_graph {
            for declaration in declarations {
                let request = BindingRequest::key(self.declared_key(&declaration));
                self.resolve_request(path, &request);
            }
        }
    }

    /// The key a full binding graph resolves for a declaration.
    fn declared_key(&self, declaration: &BindingDeclaration) -> Key {
        match declaration.kind {
            BindingDeclarationKind::BindsOptionalOf => declaration.key.with_type(
                TypeData::with_args(OPTIONAL, vec![declaration.key.type_.clone()]),
            ),
            _ if declaration.is_multibinding_contribution() => declaration.multibinding_key(),
            _ => declaration.key.clone(),
        }
    }

    /// Children of `path` that belong in the graph, with the factory method creating them.
    fn children_to_visit(&self, path: &ComponentPath) -> Vec<(String, Option<String>)> {
        let context = match self.contexts.get(path) {
            Some(context) => context,
            None => return Vec::new(),
        };
        let mut result: Vec<(String, Option<String>)> = Vec::new();
        for factory in &context.descriptor.factory_methods {
            if !result.iter().any(|(c, _)| c == &factory.subcomponent) {
                result.push((factory.subcomponent.clone(), Some(factory.method.clone())));
            }
        }
        for subcomponent in &context.descriptor.declared_subcomponents {
            if result.iter().any(|(c, _)| c == subcomponent) {
                continue;
            }
            if self.full_binding_graph || self.creator_resolved(path, subcomponent) {
                result.push((subcomponent.clone(), None));
            }
        }
        result.retain(|(child, _)| {
            !path.components().contains(child) && !self.invalid.contains_type(child)
        });
        result
    }

    fn creator_nodes<'b>(
        &'b self,
        path: &'b ComponentPath,
        subcomponent: &'b str,
    ) -> impl Iterator<Item = NodeIndex> + 'b {
        self.graph.node_indices().filter(move |index| match &self.graph[*index] {
            Node::Binding(binding) => {
                binding.kind == BindingKind::SubcomponentCreator
                    && &binding.component == path
                    && binding
                        .declaration
                        .as_ref()
                        .and_then(|d| d.subcomponent.as_deref())
                        == Some(subcomponent)
            }
            _ => false,
        })
    }

    fn creator_resolved(&self, path: &ComponentPath, subcomponent: &str) -> bool {
        self.creator_nodes(path, subcomponent).next().is_some()
    }

    fn link_creator_bindings(&mut self, path: &ComponentPath, subcomponent: &str, child: NodeIndex) {
        let mut creators: Vec<NodeIndex> = self.creator_nodes(path, subcomponent).collect();
        creators.sort();
        for creator in creators {
            self.graph
                .add_edge(creator, child, Edge::SubcomponentCreatorBinding);
        }
    }

    /// Resolves `request` and everything it depends on. The walk keeps its
    /// own stack so chain length is not limited by the thread stack.
    fn resolve_request(&mut self, context: &ComponentPath, request: &BindingRequest) -> Vec<NodeIndex> {
        let first = match self.begin_request(context, request) {
            Ok(nodes) => return nodes,
            Err(frame) => frame,
        };
        let mut stack = vec![Frame::Request(first)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Request(mut pending) => match pending.candidates.next() {
                    Some(candidate) => {
                        let (index, binding) =
                            self.binding_node(&pending.context, &pending.request, candidate);
                        pending.result.push(index);
                        stack.push(Frame::Request(pending));
                        if let Some(binding) = binding {
                            stack.push(Frame::Binding(binding));
                        }
                    }
                    None => {
                        self.resolved.insert(
                            (pending.context, pending.request),
                            pending.result.clone(),
                        );
                        match stack.last_mut() {
                            Some(Frame::Binding(binding)) => {
                                binding.link(&mut self.graph, &pending.result)
                            }
                            _ => return pending.result,
                        }
                    }
                },
                Frame::Binding(mut binding) => {
                    let dependency = match binding.dependencies.get(binding.next) {
                        Some(dependency) => BindingRequest::of(dependency),
                        None => continue,
                    };
                    match self.begin_request(&binding.owner, &dependency) {
                        Ok(targets) => {
                            binding.link(&mut self.graph, &targets);
                            stack.push(Frame::Binding(binding));
                        }
                        Err(pending) => {
                            stack.push(Frame::Binding(binding));
                            stack.push(Frame::Request(pending));
                        }
                    }
                }
            }
        }
        Vec::new()
    }

    /// The nodes of an already resolved request, or the work left to do.
    fn begin_request(
        &mut self,
        context: &ComponentPath,
        request: &BindingRequest,
    ) -> Result<Vec<NodeIndex>, PendingRequest> {
        if let Some(nodes) = self.resolved.get(&(context.clone(), request.clone())) {
            return Ok(nodes.clone());
        }
        let candidates = self.candidates(context, request);
        if candidates.is_empty() {
            let missing = self.missing(request);
            self.resolved
                .insert((context.clone(), request.clone()), vec![missing]);
            return Ok(vec![missing]);
        }
        Err(PendingRequest {
            context: context.clone(),
            request: request.clone(),
            candidates: candidates.into_iter(),
            result: Vec::new(),
        })
    }

    /// The node for `candidate`. A node created here comes back with the
    /// dependencies it still has to resolve.
    fn binding_node(
        &mut self,
        context: &ComponentPath,
        request: &BindingRequest,
        candidate: Candidate,
    ) -> (NodeIndex, Option<PendingBinding>) {
        if let Some(existing) = candidate.existing {
            return (existing, None);
        }
        let owner = self.owner_of(context, request, &candidate);
        let id = (owner.clone(), request.clone(), candidate.id.clone());
        if let Some(index) = self.nodes.get(&id) {
            return (*index, None);
        }
        let declaration = candidate.declaration;
        let index = self.graph.add_node(Node::Binding(BindingNode {
            component: owner.clone(),
            key: request.key.clone(),
            kind: candidate.kind,
            scope: declaration.as_ref().and_then(|d| d.scope.clone()),
            nullable: declaration.as_ref().map(|d| d.nullable).unwrap_or(false),
            declaration,
            multibinding_declarations: candidate.multibinding_declarations,
            dependencies: candidate.dependencies.clone(),
        }));
        trace!("{} bound in {} by {:?}", request.key, owner, candidate.kind);
        self.node_ids.insert(index, id.clone());
        self.nodes.insert(id, index);
        (
            index,
            Some(PendingBinding {
                index,
                owner,
                dependencies: candidate.dependencies,
                next: 0,
            }),
        )
    }

    fn missing(&mut self, request: &BindingRequest) -> NodeIndex {
        let id = (self.root.clone(), request.clone(), CandidateId::Missing);
        if let Some(index) = self.nodes.get(&id) {
            return *index;
        }
        let type_name = &request.key.type_.path;
        if self.invalid.type_failure(type_name).is_some()
            && !self.unprocessable_types.contains(type_name)
        {
            self.unprocessable_types.push(type_name.clone());
        }
        let index = self.graph.add_node(Node::Missing(MissingNode {
            component: self.root.clone(),
            key: request.key.clone(),
            members_injection: request.members_injection,
        }));
        self.nodes.insert(id, index);
        index
    }

    fn owner_of(
        &self,
        context: &ComponentPath,
        request: &BindingRequest,
        candidate: &Candidate,
    ) -> ComponentPath {
        match candidate.home {
            Some(depth) if depth < context.depth() => {
                if self.requires_resolution(context, request, candidate) {
                    context.clone()
                } else {
                    context
                        .lineage()
                        .get(depth.max(1) - 1)
                        .cloned()
                        .unwrap_or_else(|| self.root.clone())
                }
            }
            Some(_) => context.clone(),
            None => self
                .ancestor_copy(context, request, candidate)
                .unwrap_or_else(|| context.clone()),
        }
    }

    /// The owner of an identical binding an ancestor already resolved, when
    /// it can be shared with `context`.
    fn ancestor_copy(
        &self,
        context: &ComponentPath,
        request: &BindingRequest,
        candidate: &Candidate,
    ) -> Option<ComponentPath> {
        if candidate.kind == BindingKind::AssistedInjection {
            return None;
        }
        let lineage = context.lineage();
        let ancestor = lineage
            .iter()
            .rev()
            .skip(1)
            .find_map(|ancestor| self.resolved.get(&(ancestor.clone(), request.clone())))?;
        let (owner, _, _) = ancestor
            .iter()
            .filter_map(|node| self.node_ids.get(node))
            .find(|(_, _, id)| *id == candidate.id)?;
        if self.requires_resolution(context, request, candidate) {
            return None;
        }
        Some(owner.clone())
    }

    /// Whether a binding inherited from an ancestor sees something declared
    /// locally in `context` and so has to be resolved again there.
    fn requires_resolution(
        &self,
        context: &ComponentPath,
        request: &BindingRequest,
        candidate: &Candidate,
    ) -> bool {
        if self.has_local_contributions(context, &request.key) {
            return true;
        }
        let mut visiting = HashSet::from([request.clone()]);
        let mut stack = inherited_dependencies(candidate);
        while let Some(next) = stack.pop() {
            if !visiting.insert(next.clone()) {
                continue;
            }
            if self.has_local_contributions(context, &next.key) {
                return true;
            }
            for candidate in self.candidates(context, &next) {
                stack.extend(inherited_dependencies(&candidate));
            }
        }
        false
    }

    /// Multibinding or optional contributions for `key` made by `context` itself.
    fn has_local_contributions(&self, context: &ComponentPath, key: &Key) -> bool {
        let declarations = match self.contexts.get(context) {
            Some(local) => &local.declarations,
            None => return false,
        };
        if let Some((_, multibound, _)) = self.multibound_key(key) {
            if declarations.contributions.contains_key(&multibound) {
                return true;
            }
        }
        match self.env.key_factory.unwrap_optional(key) {
            Some((_, inner)) => {
                declarations.optionals.contains_key(&inner)
                    || declarations.explicit.contains_key(&inner)
            }
            None => false,
        }
    }

    fn lineage_contexts(&self, context: &ComponentPath) -> Vec<(usize, &ComponentContext)> {
        context
            .lineage()
            .iter()
            .enumerate()
            .filter_map(|(i, path)| self.contexts.get(path).map(|c| (i + 1, c)))
            .collect()
    }

    fn candidates(&self, context: &ComponentPath, request: &BindingRequest) -> Vec<Candidate> {
        let key = &request.key;
        if request.members_injection {
            return vec![Candidate {
                id: CandidateId::MembersInjection,
                kind: BindingKind::MembersInjection,
                home: None,
                declaration: None,
                multibinding_declarations: Vec::new(),
                dependencies: self
                    .registry
                    .members_injection(&key.type_)
                    .cloned()
                    .unwrap_or_default(),
                existing: None,
            }];
        }
        let lineage = self.lineage_contexts(context);
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let strict = self.env.options.strict_multibinding_validation;
        for (depth, component) in &lineage {
            for declaration in component.declarations.explicit.get(key).into_iter().flatten() {
                if !seen.insert(declaration.order) {
                    continue;
                }
                if let Some(mut candidate) = Candidate::declared(declaration, *depth) {
                    // Lenient mode resolves inherited @Binds map entries again
                    // in every component that uses the map.
                    if !strict
                        && declaration.kind == BindingDeclarationKind::Binds
                        && declaration.contribution == ContributionType::IntoMap
                    {
                        candidate.home = None;
                    }
                    candidates.push(candidate);
                }
            }
        }
        let explicit = !candidates.is_empty();
        if key.multibinding_contribution.is_none() {
            candidates.extend(self.multibinding_candidate(&lineage, key));
            candidates.extend(self.optional_candidate(&lineage, key));
            for (depth, component) in &lineage {
                for declaration in component
                    .declarations
                    .subcomponent_creators
                    .get(key)
                    .into_iter()
                    .flatten()
                {
                    if seen.insert(declaration.order) {
                        candidates.extend(Candidate::declared(declaration, *depth));
                    }
                }
            }
        }
        if candidates.is_empty() {
            candidates.extend(self.implicit_candidate(&lineage, key));
        } else if explicit
            && self.env.options.explicit_binding_conflicts_with_inject == ValidationType::Error
        {
            candidates.extend(self.inherited_injection(context, request));
        }
        candidates
    }

    /// For a Set or Map key: how contributions are requested, the key they
    /// contribute to and the kind of the synthesized binding.
    fn multibound_key(&self, key: &Key) -> Option<(RequestKind, Key, BindingKind)> {
        let key_factory = &self.env.key_factory;
        if is_map(&key.type_) {
            Some(match key_factory.unwrap_map_value(key) {
                Some((framework, unwrapped)) => (
                    match framework {
                        FrameworkType::Provider => RequestKind::Provider,
                        FrameworkType::Lazy => RequestKind::Lazy,
                        FrameworkType::Producer => RequestKind::Producer,
                        FrameworkType::Produced => RequestKind::Produced,
                        _ => return None,
                    },
                    unwrapped,
                    BindingKind::MultiboundMap,
                ),
                None => (RequestKind::Instance, key.clone(), BindingKind::MultiboundMap),
            })
        } else if is_set(&key.type_) {
            Some(match key_factory.unwrap_set_of_produced(key) {
                Some(unwrapped) => (RequestKind::Produced, unwrapped, BindingKind::MultiboundSet),
                None => (RequestKind::Instance, key.clone(), BindingKind::MultiboundSet),
            })
        } else {
            None
        }
    }

    fn multibinding_candidate(
        &self,
        lineage: &[(usize, &ComponentContext)],
        key: &Key,
    ) -> Option<Candidate> {
        let (request_kind, multibound, kind) = self.multibound_key(key)?;
        let mut declarations: Vec<Rc<BindingDeclaration>> = Vec::new();
        for (_, component) in lineage {
            let local = component
                .declarations
                .contributions
                .get(&multibound)
                .into_iter()
                .chain(component.declarations.multibinds.get(&multibound))
                .flatten();
            for declaration in local {
                if !declarations.iter().any(|d| d.order == declaration.order) {
                    declarations.push(declaration.clone());
                }
            }
        }
        if declarations.is_empty() {
            return None;
        }
        declarations.sort_by_key(|d| d.order);
        let dependencies = declarations
            .iter()
            .filter(|d| d.is_multibinding_contribution())
            .map(|d| DependencyRequest::synthetic(request_kind, d.key.clone()))
            .collect();
        Some(Candidate {
            id: CandidateId::Multibinding,
            kind,
            home: None,
            declaration: None,
            multibinding_declarations: declarations,
            dependencies,
            existing: None,
        })
    }

    fn optional_candidate(
        &self,
        lineage: &[(usize, &ComponentContext)],
        key: &Key,
    ) -> Option<Candidate> {
        let (request_kind, inner) = self.env.key_factory.unwrap_optional(key)?;
        let mut declarations: Vec<Rc<BindingDeclaration>> = Vec::new();
        for (_, component) in lineage {
            if let Some(local) = component.declarations.optionals.get(&inner) {
                declarations.extend(local.iter().cloned());
            }
        }
        if declarations.is_empty() {
            return None;
        }
        let dependencies = if self.is_bound(lineage, &inner) {
            vec![DependencyRequest::synthetic(request_kind, inner)]
        } else {
            Vec::new()
        };
        Some(Candidate {
            id: CandidateId::Optional,
            kind: BindingKind::Optional,
            home: None,
            declaration: None,
            multibinding_declarations: declarations,
            dependencies,
            existing: None,
        })
    }

    /// Whether an `Optional` of `key` would be present.
    fn is_bound(&self, lineage: &[(usize, &ComponentContext)], key: &Key) -> bool {
        lineage.iter().any(|(_, component)| {
            component.declarations.explicit.contains_key(key)
                || component.declarations.subcomponent_creators.contains_key(key)
        }) || self.multibinding_candidate(lineage, key).is_some()
            || self.implicit_candidate(lineage, key).is_some()
    }

    fn implicit_candidate(
        &self,
        lineage: &[(usize, &ComponentContext)],
        key: &Key,
    ) -> Option<Candidate> {
        if key.qualifier.is_some() || key.multibinding_contribution.is_some() {
            return None;
        }
        if let Some(declaration) = self.registry.injection_binding(key) {
            let home = match declaration.scope.as_deref() {
                None | Some(REUSABLE) => None,
                // Production-scoped types live in the outermost production component.
                Some(PRODUCTION_SCOPE) => lineage
                    .iter()
                    .find(|(_, c)| c.descriptor.is_production)
                    .map(|(depth, _)| *depth),
                Some(scope) => lineage
                    .iter()
                    .rev()
                    .find(|(_, c)| c.descriptor.effective_scopes().iter().any(|s| s == scope))
                    .map(|(depth, _)| *depth),
            };
            let mut candidate = Candidate::declared(declaration, 1)?;
            candidate.home = home;
            return Some(candidate);
        }
        let declaration = self
            .registry
            .assisted_injection_binding(&key.type_)
            .or_else(|| self.registry.assisted_factory_binding(key))?;
        let mut candidate = Candidate::declared(declaration, 1)?;
        candidate.home = None;
        Some(candidate)
    }

    /// An `@Inject` binding for the request that an ancestor already resolved.
    fn inherited_injection(&self, context: &ComponentPath, request: &BindingRequest) -> Option<Candidate> {
        self.registry.injection_binding(&request.key)?;
        for ancestor in context.lineage().iter().filter(|p| *p != context) {
            let nodes = match self.resolved.get(&(ancestor.clone(), request.clone())) {
                Some(nodes) => nodes,
                None => continue,
            };
            for node in nodes {
                if let Node::Binding(binding) = &self.graph[*node] {
                    if binding.kind == BindingKind::Injection {
                        return Some(Candidate {
                            id: CandidateId::Declaration(
                                binding.declaration.as_ref().map(|d| d.order).unwrap_or(0),
                            ),
                            kind: BindingKind::Injection,
                            home: Some(binding.component.depth()),
                            declaration: binding.declaration.clone(),
                            multibinding_declarations: Vec::new(),
                            dependencies: Vec::new(),
                            existing: Some(*node),
                        });
                    }
                }
            }
        }
        None
    }
}
