//! Relationship and privileged-set file readers.
//!
//! Relationship records look like `leftId|rightId|code`, optionally followed by
//! extra `|`-separated fields that are ignored. Blank lines and lines starting
//! with `#` are skipped. The privileged file holds one id per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info};

use crate::{AsGraph, NodeId, Relation, Result, TopologyError};

/// Parse relationship records into a new graph.
pub fn parse_relationships<R: BufRead>(reader: R) -> Result<AsGraph> {
    let mut graph = AsGraph::new();
    let mut ignored = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let record = line.trim();
        if record.is_empty() || record.starts_with('#') {
            continue;
        }

        let (left, right, relation) = parse_record(record, line_no)?;
        if relation == Relation::Ignore {
            ignored += 1;
        }
        graph.add_relation(left, right, relation).map_err(|e| match e {
            TopologyError::SelfRelation(_) => malformed(line_no, record, "left and right are the same node"),
            other => other,
        })?;
    }

    info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        ignored,
        "loaded relationship records"
    );
    Ok(graph)
}

fn parse_record(record: &str, line: usize) -> Result<(NodeId, NodeId, Relation)> {
    let mut fields = record.split('|').map(str::trim);

    let mut next_field = |name: &str| {
        fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| malformed(line, record, &format!("missing {name} field")))
    };
    let left = next_field("left id")?;
    let right = next_field("right id")?;
    let code = next_field("relationship code")?;

    let left: NodeId = left
        .parse()
        .map_err(|_| malformed(line, record, "left id is not an integer"))?;
    let right: NodeId = right
        .parse()
        .map_err(|_| malformed(line, record, "right id is not an integer"))?;
    let code: i32 = code
        .parse()
        .map_err(|_| malformed(line, record, "relationship code is not an integer"))?;

    Ok((left, right, Relation::from_code(code, line)?))
}

fn malformed(line: usize, record: &str, reason: &str) -> TopologyError {
    TopologyError::Malformed {
        line,
        record: record.to_string(),
        reason: reason.to_string(),
    }
}

/// Flag every id listed in `reader` as privileged.
///
/// Returns the number of ids applied. Every id must already exist.
pub fn apply_privileged<R: BufRead>(graph: &mut AsGraph, reader: R) -> Result<usize> {
    let mut applied = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        let id: NodeId = entry
            .parse()
            .map_err(|_| malformed(idx + 1, entry, "privileged id is not an integer"))?;
        graph.mark_privileged(id)?;
        applied += 1;
    }
    debug!(applied, "applied privileged set");
    Ok(applied)
}

/// Load a relationship file and a privileged-set file from disk.
pub fn load_graph(relationships: &Path, privileged: &Path) -> Result<AsGraph> {
    let mut graph = parse_relationships(BufReader::new(File::open(relationships)?))?;
    let count = apply_privileged(&mut graph, BufReader::new(File::open(privileged)?))?;
    info!(
        path = %relationships.display(),
        privileged = count,
        "topology loaded"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
# source: caida as-rel
1|2|-1
2|3|0

3|4|1|bgp
4|5|3
";

    #[test]
    fn parses_records_and_skips_comments() {
        let graph = parse_relationships(Cursor::new(SAMPLE)).unwrap();
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.edge_count(), 3);

        // 1|2|-1: 1 is provider of 2
        assert!(graph.node(NodeId(2)).unwrap().providers().contains(&NodeId(1)));
        // 3|4|1: 3 is customer of 4
        assert!(graph.node(NodeId(4)).unwrap().customers().contains(&NodeId(3)));
        // 4|5|3 is ignored but both nodes exist
        assert_eq!(graph.node(NodeId(5)).unwrap().degree(), 0);
    }

    #[test]
    fn unknown_code_is_fatal() {
        let err = parse_relationships(Cursor::new("1|2|0\n1|3|2\n")).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownRelation { line: 2, code: 2 }));
    }

    #[test]
    fn short_record_is_malformed() {
        let err = parse_relationships(Cursor::new("1|2\n")).unwrap_err();
        assert!(matches!(err, TopologyError::Malformed { line: 1, .. }));
    }

    #[test]
    fn non_numeric_id_is_malformed() {
        let err = parse_relationships(Cursor::new("AS1|2|0\n")).unwrap_err();
        match err {
            TopologyError::Malformed { reason, .. } => assert!(reason.contains("left id")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_edge_is_malformed() {
        let err = parse_relationships(Cursor::new("7|7|0\n")).unwrap_err();
        assert!(matches!(err, TopologyError::Malformed { line: 1, .. }));
    }

    #[test]
    fn privileged_ids_are_applied() {
        let mut graph = parse_relationships(Cursor::new(SAMPLE)).unwrap();
        let applied = apply_privileged(&mut graph, Cursor::new("2\n\n# warden\n4\n")).unwrap();
        assert_eq!(applied, 2);
        assert!(graph.node(NodeId(2)).unwrap().is_privileged());
        assert!(graph.node(NodeId(4)).unwrap().is_privileged());
        assert!(!graph.node(NodeId(1)).unwrap().is_privileged());
    }

    #[test]
    fn unknown_privileged_id_is_fatal() {
        let mut graph = parse_relationships(Cursor::new(SAMPLE)).unwrap();
        let err = apply_privileged(&mut graph, Cursor::new("42\n")).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownPrivileged(NodeId(42))));
    }
}
