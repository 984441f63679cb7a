use std::collections::{BTreeMap, HashMap};

use geo_types::Point;

use crate::costing::access;
use crate::geometry;
use crate::graph::{
    DirectedEdge, EdgeUse, GraphId, GraphReader, GraphTile, NodeInfo, NO_OPPOSING_EDGE,
};

/// Programmatic construction of tiled road networks.
///
/// Nodes are added per (level, tile) and edges per start node; `build`
/// lays every tile out in forward-star order, wires opposing-edge local
/// indices, and caches the first eight outbound headings per node. Ways
/// add both travel directions over a shared shape; `add_edge` and
/// `add_transition` add a single direction.
pub struct GraphBuilder {
    tiles: BTreeMap<u64, TileScaffold>,
}

#[derive(Default)]
struct TileScaffold {
    nodes: Vec<NodeScaffold>,
}

struct NodeScaffold {
    latlng: Point<f64>,
    access: u16,
    edges: Vec<EdgeScaffold>,
}

struct EdgeScaffold {
    endnode: GraphId,
    length: f32,
    edge_use: EdgeUse,
    shape: Vec<Point<f64>>,
    forward: bool,
    access: u16,
    /// Local index of the opposing edge at `endnode`, once known.
    opp: Option<u8>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self { tiles: BTreeMap::new() }
    }

    pub fn add_node(&mut self, level: u32, tileid: u32, latlng: Point<f64>) -> GraphId {
        let base = GraphId::new(level, tileid, 0);
        let tile = self.tiles.entry(base.value()).or_default();
        let id = GraphId::new(level, tileid, tile.nodes.len() as u32);
        tile.nodes.push(NodeScaffold { latlng, access: access::ALL, edges: Vec::new() });
        id
    }

    pub fn set_node_access(&mut self, node: GraphId, access: u16) {
        self.node_mut(node).access = access;
    }

    pub fn set_edge_access(&mut self, node: GraphId, local_idx: u8, access: u16) {
        self.node_mut(node).edges[local_idx as usize].access = access;
    }

    /// Two-way road between `a` and `b` with a straight shape. Returns the
    /// local edge indices of the a→b and b→a directions.
    pub fn add_way(&mut self, a: GraphId, b: GraphId, length: f32) -> (u8, u8) {
        let shape = vec![self.latlng(a), self.latlng(b)];
        let ia = self.push_edge(a, b, length, EdgeUse::Road, shape.clone(), true);
        let ib = self.push_edge(b, a, length, EdgeUse::Road, shape, false);
        self.node_mut(a).edges[ia as usize].opp = Some(ib);
        self.node_mut(b).edges[ib as usize].opp = Some(ia);
        (ia, ib)
    }

    /// Two-way road whose length is measured from the node coordinates.
    pub fn add_way_measured(&mut self, a: GraphId, b: GraphId) -> (u8, u8) {
        let length = geometry::haversine_meters(self.latlng(a), self.latlng(b));
        self.add_way(a, b, length)
    }

    /// Single directed edge with no opposing counterpart.
    pub fn add_edge(&mut self, from: GraphId, to: GraphId, length: f32, edge_use: EdgeUse) -> u8 {
        let shape = vec![self.latlng(from), self.latlng(to)];
        self.push_edge(from, to, length, edge_use, shape, true)
    }

    /// Zero-length hierarchy transition edge.
    pub fn add_transition(&mut self, from: GraphId, to: GraphId, up: bool) -> u8 {
        let edge_use = if up { EdgeUse::TransitionUp } else { EdgeUse::TransitionDown };
        self.push_edge(from, to, 0.0, edge_use, Vec::new(), true)
    }

    fn push_edge(
        &mut self,
        from: GraphId,
        to: GraphId,
        length: f32,
        edge_use: EdgeUse,
        shape: Vec<Point<f64>>,
        forward: bool,
    ) -> u8 {
        let node = self.node_mut(from);
        let local_idx = node.edges.len();
        assert!(local_idx < usize::from(NO_OPPOSING_EDGE), "too many edges at {from}");
        node.edges.push(EdgeScaffold {
            endnode: to,
            length,
            edge_use,
            shape,
            forward,
            access: access::ALL,
            opp: None,
        });
        local_idx as u8
    }

    fn node_mut(&mut self, id: GraphId) -> &mut NodeScaffold {
        self.tiles
            .get_mut(&id.tile_base().value())
            .and_then(|tile| tile.nodes.get_mut(id.id() as usize))
            .unwrap_or_else(|| panic!("unknown node {id}"))
    }

    fn latlng(&self, id: GraphId) -> Point<f64> {
        self.tiles
            .get(&id.tile_base().value())
            .and_then(|tile| tile.nodes.get(id.id() as usize))
            .map(|node| node.latlng)
            .unwrap_or_else(|| panic!("unknown node {id}"))
    }

    pub fn build(self) -> GraphReader {
        let mut tiles = HashMap::new();
        for (base_value, scaffold) in self.tiles {
            let base = GraphId::from_value(base_value);
            let mut nodes = Vec::new();
            let mut directededges = Vec::new();
            let mut shapes = Vec::new();

            for node in scaffold.nodes {
                let edge_index = directededges.len() as u32;
                let edge_count = node.edges.len() as u32;
                let mut headings = [0u16; 8];
                for (local_idx, edge) in node.edges.iter().take(8).enumerate() {
                    headings[local_idx] = geometry::outbound_edge_heading(&edge.shape, edge.forward);
                }
                nodes.push(NodeInfo {
                    latlng: node.latlng,
                    edge_index,
                    edge_count,
                    access: node.access,
                    headings,
                });

                for (local_idx, edge) in node.edges.into_iter().enumerate() {
                    let edgeinfo_index = shapes.len() as u32;
                    shapes.push(edge.shape);
                    directededges.push(DirectedEdge {
                        endnode: edge.endnode,
                        length: edge.length,
                        edge_use: edge.edge_use,
                        forward: edge.forward,
                        shortcut: false,
                        localedgeidx: local_idx as u8,
                        opp_local_idx: edge.opp.unwrap_or(NO_OPPOSING_EDGE),
                        edgeinfo_index,
                        access: edge.access,
                        leaves_tile: edge.endnode.tile_base() != base,
                    });
                }
            }

            tiles.insert(base_value, GraphTile::new(base, nodes, directededges, shapes));
        }
        GraphReader::new(tiles)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
