//! Execution planning over the dependency graph.
//!
//! An executor parallelizes independent branches and serializes dependent
//! ones. [`ExecutionPlan`] precomputes exactly that shape: waves of
//! mutually independent nodes, in order. [`LaunchSequence`] flattens the
//! plan into the concrete command strings, still without executing
//! anything.

use std::collections::HashMap;

use kraken_common::error::{KrakenError, Result};
use kraken_dsl::{DslConfig, EdgeKind, NodeKind, NodeRef};

/// Waves of mutually independent nodes.
///
/// Within a wave, nodes share no edge and may run in parallel; waves run
/// in sequence. Wave `i + 1` contains only nodes whose every dependency
/// sits in waves `0..=i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    waves: Vec<Vec<NodeRef>>,
}

impl ExecutionPlan {
    /// Derives the plan for a configuration over the full edge relation.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Cycle`] when the graph is not acyclic.
    pub fn for_config(config: &DslConfig) -> Result<Self> {
        let order = config.topological_order(&EdgeKind::ALL)?;

        let mut level: HashMap<NodeRef, usize> = HashMap::with_capacity(order.len());
        let mut waves: Vec<Vec<NodeRef>> = Vec::new();
        for node in order {
            let wave = config
                .dependencies_of(&node)
                .into_iter()
                .flatten()
                .filter_map(|dep| level.get(dep))
                .max()
                .map_or(0, |deepest| deepest + 1);
            let _ = level.insert(node.clone(), wave);
            if waves.len() <= wave {
                waves.push(Vec::new());
            }
            waves[wave].push(node);
        }
        for wave in &mut waves {
            wave.sort_unstable();
        }

        tracing::info!(waves = waves.len(), "execution plan resolved");
        Ok(Self { waves })
    }

    /// The waves, prerequisites first.
    #[must_use]
    pub fn waves(&self) -> &[Vec<NodeRef>] {
        &self.waves
    }

    /// Total number of planned nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    /// Whether the plan contains no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }
}

/// One planned launch: a node and the command that realizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStep {
    /// The node to launch.
    pub node: NodeRef,
    /// Executable command string for that node.
    pub command: String,
}

/// The flattened, ordered command list for a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSequence {
    steps: Vec<LaunchStep>,
}

impl LaunchSequence {
    /// Materializes every node's command in topological order.
    ///
    /// # Errors
    ///
    /// Returns [`KrakenError::Cycle`] when the graph is not acyclic, or
    /// [`KrakenError::CommandBuild`] when a test's runner is still missing
    /// a mandatory field.
    pub fn for_config(config: &DslConfig) -> Result<Self> {
        let order = config.topological_order(&EdgeKind::ALL)?;
        let mut steps = Vec::with_capacity(order.len());
        for node in order {
            let command = match node.kind {
                NodeKind::Service => config
                    .service(&node.name)
                    .map(kraken_dsl::DslService::get_command)
                    .ok_or_else(|| missing_node(&node))?,
                NodeKind::Test => config
                    .test(&node.name)
                    .ok_or_else(|| missing_node(&node))?
                    .get_command()?,
            };
            steps.push(LaunchStep { node, command });
        }
        Ok(Self { steps })
    }

    /// The ordered launch steps.
    #[must_use]
    pub fn steps(&self) -> &[LaunchStep] {
        &self.steps
    }
}

/// A node surfaced by the graph but absent from the entity maps would be
/// a construction bug, not caller error; still surfaced, never swallowed.
fn missing_node(node: &NodeRef) -> KrakenError {
    KrakenError::Configuration {
        message: format!("graph node {node} has no backing entity"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(doc: &str) -> DslConfig {
        DslConfig::from_value(serde_yaml::from_str(doc).expect("should parse"))
            .expect("should build")
    }

    const STACK: &str = r"
        services:
          - {name: db, desc: d, image: 'postgres:15', trigger: [db_ready]}
          - {name: cache, desc: d, image: 'redis:7'}
          - {name: api, desc: d, image: 'api:1', depends_on: [db, cache]}
        tests:
          - {name: db_ready, desc: d, mode: docker, needs: [db],
             runner: {cntr_name: db, cmd: [pg_isready]}}
          - {name: smoke, desc: d, mode: shell, needs: [api],
             runner: {cmd: [curl, 'http://api/health']}}
        ";

    #[test]
    fn independent_services_share_the_first_wave() {
        let plan = ExecutionPlan::for_config(&config(STACK)).expect("should plan");
        assert_eq!(
            plan.waves()[0],
            vec![NodeRef::service("cache"), NodeRef::service("db")]
        );
    }

    #[test]
    fn dependents_land_in_later_waves() {
        let plan = ExecutionPlan::for_config(&config(STACK)).expect("should plan");
        assert_eq!(
            plan.waves()[1],
            vec![NodeRef::service("api"), NodeRef::test("db_ready")]
        );
        assert_eq!(plan.waves()[2], vec![NodeRef::test("smoke")]);
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn empty_config_plans_empty() {
        let plan = ExecutionPlan::for_config(&config("services: []")).expect("should plan");
        assert!(plan.is_empty());
    }

    #[test]
    fn cycle_propagates_from_the_graph() {
        let cyclic = config(
            r"
            services:
              - {name: a, desc: d, image: i, depends_on: [b]}
              - {name: b, desc: d, image: i, depends_on: [a]}
            ",
        );
        assert!(matches!(
            ExecutionPlan::for_config(&cyclic),
            Err(KrakenError::Cycle { .. })
        ));
    }

    #[test]
    fn launch_sequence_renders_every_command() {
        let seq = LaunchSequence::for_config(&config(STACK)).expect("should render");
        assert_eq!(seq.steps().len(), 5);

        let step = |node: NodeRef| {
            seq.steps()
                .iter()
                .find(|s| s.node == node)
                .unwrap_or_else(|| panic!("{node} missing"))
                .command
                .clone()
        };
        assert!(step(NodeRef::service("db")).starts_with("docker run --name db"));
        assert_eq!(step(NodeRef::test("db_ready")), "docker exec db pg_isready");

        let db_pos = seq
            .steps()
            .iter()
            .position(|s| s.node == NodeRef::service("db"))
            .expect("db");
        let smoke_pos = seq
            .steps()
            .iter()
            .position(|s| s.node == NodeRef::test("smoke"))
            .expect("smoke");
        assert!(db_pos < smoke_pos);
    }

    #[test]
    fn launch_sequence_surfaces_incomplete_runners() {
        let incomplete = config(
            r"
            tests:
              - {name: t, desc: d, mode: http, runner: {header: 'Accept: json'}}
            ",
        );
        assert!(matches!(
            LaunchSequence::for_config(&incomplete),
            Err(KrakenError::CommandBuild { .. })
        ));
    }
}
