//! Configuration assembly and dependency graph.
//!
//! A [`DslConfig`] aggregates every service and test of one declaration
//! into a directed graph over namespaced nodes. Edges always point from
//! prerequisite to dependent, so a topological order yields prerequisites
//! first. After [`DslConfig::build`] succeeds the topology is immutable;
//! reconfiguration is rebuild-and-swap.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use kraken_common::error::{KrakenError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use petgraph::Direction;
use serde::Deserialize;
use serde_yaml::Value;

use crate::service::DslService;
use crate::test::DslTest;
use crate::variable::Variables;

/// Namespace of a graph node. Service and test names are independent;
/// a service and a test may legally share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// A long-running service.
    Service,
    /// A test assertion.
    Test,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service => f.write_str("service"),
            Self::Test => f.write_str("test"),
        }
    }
}

/// A namespaced reference to one graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    /// Which namespace the node lives in.
    pub kind: NodeKind,
    /// Entity name within that namespace.
    pub name: String,
}

impl NodeRef {
    /// Reference to a service node.
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Service,
            name: name.into(),
        }
    }

    /// Reference to a test node.
    #[must_use]
    pub fn test(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Test,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// The four edge relations of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Service readiness ordering: dependency must be running first.
    DependsOn,
    /// Service start-after ordering.
    Next,
    /// Service-to-test firing on ready state.
    Trigger,
    /// Test-to-service prerequisite.
    Needs,
}

impl EdgeKind {
    /// Every edge relation; the full execution graph.
    pub const ALL: [Self; 4] = [Self::DependsOn, Self::Next, Self::Trigger, Self::Needs];

    /// The service-only ordering relations.
    pub const SERVICE_ORDERING: [Self; 2] = [Self::DependsOn, Self::Next];
}

/// Top-level declaration document shape. Strict: unknown fields are
/// rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDecl {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    services: Vec<Value>,
    #[serde(default)]
    tests: Vec<Value>,
}

/// A fully validated configuration: all services and tests, keyed by
/// name, plus the derived dependency graph.
#[derive(Debug)]
pub struct DslConfig {
    /// Configuration name, if the document declared one.
    pub name: Option<String>,
    /// Configuration description, if declared.
    pub desc: Option<String>,
    /// Declaration schema version, if declared.
    pub version: Option<String>,
    services: BTreeMap<String, DslService>,
    tests: BTreeMap<String, DslTest>,
    graph: DiGraph<NodeRef, EdgeKind>,
    indices: HashMap<NodeRef, NodeIndex>,
    dependents: HashMap<NodeRef, BTreeSet<NodeRef>>,
    dependencies: HashMap<NodeRef, BTreeSet<NodeRef>>,
}

impl DslConfig {
    /// Assembles and validates a configuration from typed entities.
    ///
    /// Validates per-namespace name uniqueness, then that every edge
    /// endpoint resolves to an existing entity of the expected kind, then
    /// builds the graph and its adjacency indexes.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Configuration`] on duplicate names or
    /// [`KrakenError::DanglingReference`] naming the missing entity and
    /// its referrer.
    pub fn build(services: Vec<DslService>, tests: Vec<DslTest>) -> Result<Self> {
        tracing::info!(
            services = services.len(),
            tests = tests.len(),
            "building configuration graph"
        );

        let services = unique_by_name(services, "service", |s| s.name.clone())?;
        let tests = unique_by_name(tests, "test", |t| t.name.clone())?;
        check_references(&services, &tests)?;

        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        for name in services.keys() {
            let node = NodeRef::service(name.clone());
            let idx = graph.add_node(node.clone());
            let _ = indices.insert(node, idx);
        }
        for name in tests.keys() {
            let node = NodeRef::test(name.clone());
            let idx = graph.add_node(node.clone());
            let _ = indices.insert(node, idx);
        }

        // Edges point from prerequisite to dependent.
        for svc in services.values() {
            let this = indices[&NodeRef::service(svc.name.clone())];
            for dep in &svc.depends_on {
                let _ = graph.add_edge(
                    indices[&NodeRef::service(dep.clone())],
                    this,
                    EdgeKind::DependsOn,
                );
            }
            for nxt in &svc.next {
                let _ = graph.add_edge(
                    this,
                    indices[&NodeRef::service(nxt.clone())],
                    EdgeKind::Next,
                );
            }
            for trg in &svc.trigger {
                let _ = graph.add_edge(
                    this,
                    indices[&NodeRef::test(trg.clone())],
                    EdgeKind::Trigger,
                );
            }
        }
        for test in tests.values() {
            let this = indices[&NodeRef::test(test.name.clone())];
            for need in &test.needs {
                let _ = graph.add_edge(
                    indices[&NodeRef::service(need.clone())],
                    this,
                    EdgeKind::Needs,
                );
            }
        }

        let mut dependents: HashMap<NodeRef, BTreeSet<NodeRef>> = indices
            .keys()
            .map(|n| (n.clone(), BTreeSet::new()))
            .collect();
        let mut dependencies = dependents.clone();
        for edge in graph.edge_references() {
            let from = &graph[edge.source()];
            let to = &graph[edge.target()];
            if let Some(set) = dependents.get_mut(from) {
                let _ = set.insert(to.clone());
            }
            if let Some(set) = dependencies.get_mut(to) {
                let _ = set.insert(from.clone());
            }
        }

        Ok(Self {
            name: None,
            desc: None,
            version: None,
            services,
            tests,
            graph,
            indices,
            dependents,
            dependencies,
        })
    }

    /// Builds a configuration from a whole declaration document:
    /// `{ name, desc, version, services: [..], tests: [..] }`.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Schema`] if the document or any entity
    /// declaration is malformed, plus everything [`Self::build`] reports.
    pub fn from_value(value: Value) -> Result<Self> {
        let decl: ConfigDecl =
            serde_yaml::from_value(value).map_err(|e| KrakenError::Schema {
                entity: "configuration".to_owned(),
                message: e.to_string(),
            })?;
        let services = decl
            .services
            .into_iter()
            .map(DslService::from_value)
            .collect::<Result<Vec<_>>>()?;
        let tests = decl
            .tests
            .into_iter()
            .map(DslTest::from_value)
            .collect::<Result<Vec<_>>>()?;
        let mut config = Self::build(services, tests)?;
        config.name = decl.name;
        config.desc = decl.desc;
        config.version = decl.version;
        Ok(config)
    }

    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&DslService> {
        self.services.get(name)
    }

    /// Looks up a test by name.
    #[must_use]
    pub fn test(&self, name: &str) -> Option<&DslTest> {
        self.tests.get(name)
    }

    /// All services, keyed by name.
    #[must_use]
    pub const fn services(&self) -> &BTreeMap<String, DslService> {
        &self.services
    }

    /// All tests, keyed by name.
    #[must_use]
    pub const fn tests(&self) -> &BTreeMap<String, DslTest> {
        &self.tests
    }

    /// Direct dependents of a node (outgoing edges, any relation).
    ///
    /// `None` when the node is not part of this configuration.
    #[must_use]
    pub fn dependents_of(&self, node: &NodeRef) -> Option<&BTreeSet<NodeRef>> {
        self.dependents.get(node)
    }

    /// Direct dependencies of a node (incoming edges, any relation).
    ///
    /// `None` when the node is not part of this configuration.
    #[must_use]
    pub fn dependencies_of(&self, node: &NodeRef) -> Option<&BTreeSet<NodeRef>> {
        self.dependencies.get(node)
    }

    /// Computes a deterministic topological order over the subgraph
    /// induced by the requested edge relations.
    ///
    /// Kahn's algorithm with a `BTreeSet` ready set, so ties break by
    /// `(kind, name)` and the result is stable across calls. Every node
    /// appears in the output; nodes untouched by the requested relations
    /// are unconstrained.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Cycle`] naming one cycle's members when the
    /// induced subgraph is not acyclic.
    pub fn topological_order(&self, kinds: &[EdgeKind]) -> Result<Vec<NodeRef>> {
        let mut indegree: HashMap<NodeIndex, usize> =
            self.graph.node_indices().map(|i| (i, 0)).collect();
        for edge in self.graph.edge_references() {
            if kinds.contains(edge.weight()) {
                if let Some(d) = indegree.get_mut(&edge.target()) {
                    *d += 1;
                }
            }
        }

        let mut ready: BTreeSet<NodeRef> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| self.graph[*i].clone())
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(node) = ready.pop_first() {
            let idx = self.indices[&node];
            order.push(node);
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                if !kinds.contains(edge.weight()) {
                    continue;
                }
                let target = edge.target();
                if let Some(d) = indegree.get_mut(&target) {
                    *d -= 1;
                    if *d == 0 {
                        let _ = ready.insert(self.graph[target].clone());
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(KrakenError::Cycle {
                members: self.find_cycle_members(kinds),
            });
        }
        tracing::debug!(?order, "topological order resolved");
        Ok(order)
    }

    /// Applies idempotent variable evaluation to every service and test.
    ///
    /// Evaluation order is irrelevant; edges constrain execution, not
    /// evaluation.
    ///
    /// # Errors
    ///
    /// Returns the first entity's evaluation error, if any; entities
    /// possibly evaluated before the failure are unaffected semantically
    /// since each evaluation is all-or-nothing per entity.
    pub fn evaluate_all(&mut self, variables: &Variables) -> Result<()> {
        for svc in self.services.values_mut() {
            svc.evaluate(variables)?;
        }
        for test in self.tests.values_mut() {
            test.evaluate(variables)?;
        }
        Ok(())
    }

    /// Identifies the members of one cycle in the induced subgraph via
    /// strongly connected components, sorted for stable diagnostics.
    fn find_cycle_members(&self, kinds: &[EdgeKind]) -> Vec<String> {
        let filtered = EdgeFiltered::from_fn(&self.graph, |e| kinds.contains(e.weight()));
        for scc in petgraph::algo::tarjan_scc(&filtered) {
            let is_cycle = scc.len() > 1
                || scc.first().is_some_and(|&n| {
                    self.graph
                        .edges_connecting(n, n)
                        .any(|e| kinds.contains(e.weight()))
                });
            if is_cycle {
                let mut members: Vec<String> =
                    scc.iter().map(|&n| self.graph[n].name.clone()).collect();
                members.sort_unstable();
                return members;
            }
        }
        Vec::new()
    }
}

fn unique_by_name<T>(
    items: Vec<T>,
    kind: &str,
    name_of: impl Fn(&T) -> String,
) -> Result<BTreeMap<String, T>> {
    let mut map = BTreeMap::new();
    for item in items {
        let name = name_of(&item);
        if map.insert(name.clone(), item).is_some() {
            return Err(KrakenError::Configuration {
                message: format!("duplicate {kind} name: \"{name}\""),
            });
        }
    }
    Ok(map)
}

fn check_references(
    services: &BTreeMap<String, DslService>,
    tests: &BTreeMap<String, DslTest>,
) -> Result<()> {
    let dangling = |kind: &'static str, name: &str, referrer: &str| KrakenError::DanglingReference {
        kind,
        name: name.to_owned(),
        referrer: referrer.to_owned(),
    };

    for svc in services.values() {
        for dep in svc.depends_on.iter().chain(&svc.next) {
            if !services.contains_key(dep) {
                return Err(dangling("service", dep, &svc.name));
            }
        }
        for trg in &svc.trigger {
            if !tests.contains_key(trg) {
                return Err(dangling("test", trg, &svc.name));
            }
        }
    }
    for test in tests.values() {
        for need in &test.needs {
            if !services.contains_key(need) {
                return Err(dangling("service", need, &test.name));
            }
        }
    }
    Ok(())
}
