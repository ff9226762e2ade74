//! End-to-end pipeline: load, prune, freeze, converge.

use std::path::Path;
use std::sync::Arc;

use nightwing_bgp::Network;
use nightwing_topology::{load_graph, AsGraph};
use tracing::info;

use crate::{ConvergenceDriver, ConvergenceReport, Result, SimConfig};

/// Validate and freeze a graph into a routing network.
pub fn build_network(graph: AsGraph, config: &SimConfig) -> Result<Network> {
    graph.validate_symmetry()?;
    let topology = if config.prune_customerless {
        graph.prune_customerless()
    } else {
        graph.freeze()
    };
    Ok(Network::new(topology))
}

/// Load both input files and build the network.
pub fn load_network(relationships: &Path, privileged: &Path, config: &SimConfig) -> Result<Network> {
    let graph = load_graph(relationships, privileged)?;
    build_network(graph, config)
}

/// Converge `network` with a fresh driver.
pub fn converge(network: Arc<Network>, config: &SimConfig) -> Result<ConvergenceReport> {
    let mut driver = ConvergenceDriver::new(network, config)?;
    let report = driver.run()?;
    info!(
        rounds = report.rounds,
        releases = report.releases,
        "simulation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightwing_bgp::NodeId;
    use nightwing_topology::Relation;
    use std::fs;

    #[test]
    fn load_and_converge_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let rel = dir.path().join("as-rel.txt");
        let warden = dir.path().join("warden.txt");
        fs::write(&rel, "# test\n1|2|-1\n1|3|-1\n2|3|0\n").unwrap();
        fs::write(&warden, "3\n").unwrap();

        let config = SimConfig {
            workers: 2,
            ..Default::default()
        };
        let network = Arc::new(load_network(&rel, &warden, &config).unwrap());
        // 2 is customer-less but peers with privileged 3, so nothing is pruned
        assert!(network.pruned().is_empty());

        converge(Arc::clone(&network), &config).unwrap();
        let route = network.best_route(NodeId(2), NodeId(3)).unwrap().unwrap();
        assert_eq!(route.hops(), &[NodeId(3)]);
        assert_eq!(network.privileged().count(), 1);
    }

    #[test]
    fn prune_is_optional() {
        let graph = || {
            AsGraph::from_edges([(1, 2, Relation::Provider), (1, 3, Relation::Provider)]).unwrap()
        };
        let pruned = build_network(graph(), &SimConfig::default()).unwrap();
        assert_eq!(pruned.len(), 1);

        let config = SimConfig {
            prune_customerless: false,
            ..Default::default()
        };
        let full = build_network(graph(), &config).unwrap();
        assert_eq!(full.len(), 3);
    }
}
