//! Member co-occurrence graph for visualization.
//!
//! Every (artist, band) pair becomes a node. Members of the same band are
//! linked, and an artist's node in one band is linked to that artist's nodes
//! in the bands seen before it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;

use bandgraph_shared::{Band, BandGraphError, Result};

use crate::export::BandRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// `"{artist}|{band}"`
    pub id: String,
    pub name: String,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BandGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl BandGraph {
    pub fn from_bands(bands: &[Band]) -> Self {
        let mut builder = GraphBuilder::default();
        for band in bands {
            builder.add_band(
                &band.name,
                band.members
                    .iter()
                    .map(|m| (m.page_name.as_str(), m.name.as_str())),
            );
        }
        builder.finish()
    }

    pub fn from_records(records: &[BandRecord]) -> Self {
        let mut builder = GraphBuilder::default();
        for record in records {
            builder.add_band(
                &record.name,
                record
                    .members
                    .iter()
                    .map(|(page_name, name)| (page_name.as_str(), name.as_str())),
            );
        }
        builder.finish()
    }

    /// Serialize as pretty JSON to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BandGraphError::Output(format!("{}: {e}", path.display())))?;
        std::fs::write(path, json).map_err(|e| BandGraphError::io(path, e))?;

        tracing::info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "wrote graph"
        );
        Ok(())
    }
}

/// Incremental graph construction, one band at a time.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: BTreeMap<(String, String), GraphEdge>,
    artist_bands: HashMap<String, Vec<String>>,
}

fn node_id(artist: &str, band: &str) -> String {
    format!("{artist}|{band}")
}

impl GraphBuilder {
    /// Add a band and its `(page_name, name)` members.
    pub fn add_band<'a>(&mut self, band: &str, members: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let mut ids = Vec::new();

        for (artist, name) in members {
            let id = node_id(artist, band);

            let bands = self.artist_bands.entry(artist.to_string()).or_default();
            let earlier: Vec<String> = bands
                .iter()
                .filter(|b| b.as_str() != band)
                .map(|b| node_id(artist, b))
                .collect();
            if !bands.iter().any(|b| b == band) {
                bands.push(band.to_string());
            }
            for other in earlier {
                self.link(&id, &other);
            }

            self.upsert_node(GraphNode {
                id: id.clone(),
                name: name.to_string(),
                group: band.to_string(),
            });
            ids.push(id);
        }

        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                self.link(a, b);
            }
        }
    }

    fn upsert_node(&mut self, node: GraphNode) {
        match self.node_index.get(&node.id) {
            Some(&at) => self.nodes[at] = node,
            None => {
                self.node_index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    fn link(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        let (source, target) = if a < b { (a, b) } else { (b, a) };
        self.edges
            .entry((source.to_string(), target.to_string()))
            .or_insert_with(|| GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                value: 1,
            });
    }

    pub fn finish(self) -> BandGraph {
        BandGraph {
            nodes: self.nodes,
            edges: self.edges.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgraph_shared::BandMember;

    fn band(name: &str, members: &[(&str, &str)]) -> Band {
        Band {
            page_name: format!("{name} members"),
            name: name.into(),
            url: format!("/wiki/Category:{name}_members"),
            members: members
                .iter()
                .map(|(page_name, name)| BandMember {
                    page_name: page_name.to_string(),
                    name: name.to_string(),
                    url: format!("/wiki/{page_name}"),
                })
                .collect(),
            has_subcategories: false,
        }
    }

    fn edge_pairs(graph: &BandGraph) -> Vec<(&str, &str)> {
        graph
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect()
    }

    #[test]
    fn test_co_member_edges() {
        let graph = BandGraph::from_bands(&[band(
            "Cream",
            &[("Eric Clapton", "Eric Patrick Clapton"), ("Jack Bruce", "John Bruce"), ("Ginger Baker", "Peter Baker")],
        )]);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["Eric Clapton|Cream", "Jack Bruce|Cream", "Ginger Baker|Cream"]);
        assert_eq!(graph.nodes[1].name, "John Bruce");
        assert_eq!(graph.nodes[1].group, "Cream");

        assert_eq!(
            edge_pairs(&graph),
            [
                ("Eric Clapton|Cream", "Ginger Baker|Cream"),
                ("Eric Clapton|Cream", "Jack Bruce|Cream"),
                ("Ginger Baker|Cream", "Jack Bruce|Cream"),
            ]
        );
        assert!(graph.edges.iter().all(|e| e.value == 1));
    }

    #[test]
    fn test_same_artist_across_bands() {
        let graph = BandGraph::from_bands(&[
            band("Cream", &[("Eric Clapton", "Eric Clapton")]),
            band("Blind Faith", &[("Eric Clapton", "Eric Clapton")]),
            band("Derek and the Dominos", &[("Eric Clapton", "Eric Clapton")]),
        ]);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(
            edge_pairs(&graph),
            [
                ("Eric Clapton|Blind Faith", "Eric Clapton|Cream"),
                ("Eric Clapton|Blind Faith", "Eric Clapton|Derek and the Dominos"),
                ("Eric Clapton|Cream", "Eric Clapton|Derek and the Dominos"),
            ]
        );
    }

    #[test]
    fn test_repeated_node_keeps_position() {
        let graph = BandGraph::from_bands(&[
            band("Cream", &[("Eric Clapton", "Clapton"), ("Jack Bruce", "Bruce")]),
            band("Cream", &[("Eric Clapton", "Slowhand")]),
        ]);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "Eric Clapton|Cream");
        assert_eq!(graph.nodes[0].name, "Slowhand");
        // No self loop for the repeated band.
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_from_records_matches_from_bands() {
        let bands = [
            band("Cream", &[("Eric Clapton", "Clapton"), ("Jack Bruce", "Bruce")]),
            band("Blind Faith", &[("Eric Clapton", "Clapton")]),
        ];
        let records: Vec<BandRecord> = bands
            .iter()
            .map(|b| BandRecord {
                page_name: b.page_name.clone(),
                name: b.name.clone(),
                members: b
                    .members
                    .iter()
                    .map(|m| (m.page_name.clone(), m.name.clone()))
                    .collect(),
            })
            .collect();

        assert_eq!(BandGraph::from_records(&records), BandGraph::from_bands(&bands));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let graph = BandGraph::from_bands(&[band("Cream", &[("A", "a"), ("B", "b")])]);
        graph.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["nodes"][0]["id"], "A|Cream");
        assert_eq!(value["edges"][0]["source"], "A|Cream");
        assert_eq!(value["edges"][0]["target"], "B|Cream");
        assert_eq!(value["edges"][0]["value"], 1);
    }
}
