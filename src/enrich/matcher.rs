use crate::record::Document;
use crate::record::MetadataHolder;
use crate::record::NodeId;
use crate::table::Row;
use crate::table::Table;
use tracing::debug;
use tracing::info;

/// A node paired with the table row sharing its identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Match<'t> {
    pub node: NodeId,
    pub identifier: String,
    pub row: &'t Row,
}

/// Result of matching a list of nodes against a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matching<'t> {
    /// Matches in the order of the examined nodes
    pub matches: Vec<Match<'t>>,
    pub without_identifier: usize,
    pub without_row: usize,
}

/// Pairs every node that carries a value of `identifier_field` with its table row.
///
/// Only the first identifier value of a node is considered. Nodes without a
/// usable identifier or without a row are counted and left alone.
pub fn match_nodes<'t>(
    document: &Document,
    nodes: &[NodeId],
    identifier_field: &str,
    table: &'t Table,
) -> Matching<'t> {
    let mut matching = Matching::default();
    for id in nodes {
        let identifier = document
            .node(id)
            .and_then(|node| node.values(identifier_field).first().map(|value| value.to_string()))
            .filter(|identifier| !identifier.is_empty());
        let Some(identifier) = identifier else {
            debug!("Node {} has no '{}'", id, identifier_field);
            matching.without_identifier += 1;
            continue;
        };
        match table.get(&identifier) {
            Some(row) => matching.matches.push(Match {
                node: id.clone(),
                identifier,
                row,
            }),
            None => {
                info!("Skip import for {}", identifier);
                matching.without_row += 1;
            }
        }
    }
    matching
}
