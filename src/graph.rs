use std::collections::HashMap;
use std::fmt;

use geo_types::Point;
use serde::{Deserialize, Serialize};

/// Identifier of a node or a directed edge within the tiled, hierarchical
/// road graph. Packs the hierarchy level (3 bits), the tile id within that
/// level (22 bits) and the element index within the tile into one `u64`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(u64);

const LEVEL_BITS: u64 = 3;
const TILE_BITS: u64 = 22;
const LEVEL_MASK: u64 = (1 << LEVEL_BITS) - 1;
const TILE_MASK: u64 = (1 << TILE_BITS) - 1;
const ID_MASK: u64 = (1 << 21) - 1;

impl GraphId {
    /// The invalid sentinel: all level/tile/id bits set.
    pub const INVALID: GraphId = GraphId(0x3fff_ffff_ffff);

    pub fn new(level: u32, tileid: u32, id: u32) -> Self {
        debug_assert!(u64::from(level) <= LEVEL_MASK);
        debug_assert!(u64::from(tileid) <= TILE_MASK);
        GraphId(
            (u64::from(level) & LEVEL_MASK)
                | ((u64::from(tileid) & TILE_MASK) << LEVEL_BITS)
                | ((u64::from(id) & ID_MASK) << (LEVEL_BITS + TILE_BITS)),
        )
    }

    pub fn from_value(value: u64) -> Self {
        GraphId(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Hierarchy level this identifier belongs to.
    pub fn level(&self) -> u32 {
        (self.0 & LEVEL_MASK) as u32
    }

    /// Tile identifier within the hierarchy level.
    pub fn tileid(&self) -> u32 {
        ((self.0 >> LEVEL_BITS) & TILE_MASK) as u32
    }

    /// Element index within the tile.
    pub fn id(&self) -> u32 {
        ((self.0 >> (LEVEL_BITS + TILE_BITS)) & ID_MASK) as u32
    }

    /// Level and tile bits only, with the element index zeroed. Two ids in
    /// the same tile share the same base.
    pub fn tile_base(&self) -> GraphId {
        GraphId(self.0 & (LEVEL_MASK | (TILE_MASK << LEVEL_BITS)))
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "GraphId({}/{}/{})", self.level(), self.tileid(), self.id())
        } else {
            write!(f, "GraphId(invalid)")
        }
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level(), self.tileid(), self.id())
    }
}

/// Specialized use of a directed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeUse {
    Road,
    Ramp,
    TurnChannel,
    Track,
    Ferry,
    /// Connection between the road network and a transit egress. Never
    /// expanded by this core.
    TransitConnection,
    /// Synthetic edge moving to a less detailed hierarchy level.
    TransitionUp,
    /// Synthetic edge moving to a more detailed hierarchy level.
    TransitionDown,
}

/// Local edge index marking "no opposing edge known" (one-way edges).
pub const NO_OPPOSING_EDGE: u8 = u8::MAX;

/// A directed edge within a graph tile.
#[derive(Clone, Copy, Debug)]
pub struct DirectedEdge {
    /// Node this edge leads to.
    pub endnode: GraphId,
    /// Length in meters.
    pub length: f32,
    pub edge_use: EdgeUse,
    /// Whether the stored shape runs in this edge's travel direction.
    pub forward: bool,
    pub shortcut: bool,
    /// Index of this edge among its start node's edges.
    pub localedgeidx: u8,
    /// Local index of the opposing edge at the end node, or
    /// [`NO_OPPOSING_EDGE`].
    pub opp_local_idx: u8,
    /// Index into the owning tile's shape table.
    pub edgeinfo_index: u32,
    /// Access bit mask (see [`crate::costing::access`]).
    pub access: u16,
    /// True when the end node lives in a different tile.
    pub leaves_tile: bool,
}

impl DirectedEdge {
    pub fn is_transition(&self) -> bool {
        matches!(self.edge_use, EdgeUse::TransitionUp | EdgeUse::TransitionDown)
    }

    pub fn is_shortcut(&self) -> bool {
        self.shortcut
    }

    pub fn leaves_tile(&self) -> bool {
        self.leaves_tile
    }
}

/// Per-node information. The graph uses a forward-star layout: each node
/// points at its first outbound directed edge within the tile.
#[derive(Clone, Copy, Debug)]
pub struct NodeInfo {
    pub latlng: Point<f64>,
    /// Tile-local index of the first outbound edge.
    pub edge_index: u32,
    pub edge_count: u32,
    /// Access bit mask (see [`crate::costing::access`]).
    pub access: u16,
    /// Cached outbound headings for the first 8 local edges, degrees in
    /// `[0, 359]`.
    pub headings: [u16; 8],
}

impl NodeInfo {
    /// Cached heading for a local edge index below 8.
    pub fn heading(&self, local_idx: u8) -> Option<u16> {
        self.headings.get(local_idx as usize).copied()
    }
}

/// One tile of the graph: nodes, their outbound edges, and edge shapes.
#[derive(Clone, Debug)]
pub struct GraphTile {
    id: GraphId,
    nodes: Vec<NodeInfo>,
    directededges: Vec<DirectedEdge>,
    shapes: Vec<Vec<Point<f64>>>,
}

impl GraphTile {
    pub(crate) fn new(
        id: GraphId,
        nodes: Vec<NodeInfo>,
        directededges: Vec<DirectedEdge>,
        shapes: Vec<Vec<Point<f64>>>,
    ) -> Self {
        Self { id, nodes, directededges, shapes }
    }

    /// Tile base id (level and tile bits).
    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn node(&self, index: u32) -> Option<&NodeInfo> {
        self.nodes.get(index as usize)
    }

    pub fn directededge(&self, index: u32) -> Option<&DirectedEdge> {
        self.directededges.get(index as usize)
    }

    /// Decoded shape of an edge. Runs begin-to-end when the edge's
    /// `forward` flag is set, end-to-begin otherwise.
    pub fn edge_shape(&self, edge: &DirectedEdge) -> &[Point<f64>] {
        self.shapes
            .get(edge.edgeinfo_index as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn directededge_count(&self) -> usize {
        self.directededges.len()
    }
}

/// Read access to a set of in-memory graph tiles.
///
/// All accessors take a `hint` parameter, a cached reference to the last
/// tile touched. Lookups against the same tile skip the tile map entirely;
/// crossing into another tile reassigns the hint. The hint never owns the
/// tile, it only shortcuts repeated lookups inside the expansion loops.
pub struct GraphReader {
    tiles: HashMap<u64, GraphTile>,
}

impl GraphReader {
    pub fn new(tiles: HashMap<u64, GraphTile>) -> Self {
        Self { tiles }
    }

    /// The tile containing `id`, if loaded.
    pub fn tile(&self, id: GraphId) -> Option<&GraphTile> {
        self.tiles.get(&id.tile_base().value())
    }

    /// Resolve the tile for `id` through the hint, updating the hint when
    /// the lookup crosses a tile boundary.
    pub fn tile_for<'a>(
        &'a self,
        id: GraphId,
        hint: &mut Option<&'a GraphTile>,
    ) -> Option<&'a GraphTile> {
        match *hint {
            Some(tile) if tile.id() == id.tile_base() => Some(tile),
            _ => {
                let tile = self.tile(id)?;
                *hint = Some(tile);
                Some(tile)
            }
        }
    }

    pub fn directededge<'a>(
        &'a self,
        edgeid: GraphId,
        hint: &mut Option<&'a GraphTile>,
    ) -> Option<&'a DirectedEdge> {
        if !edgeid.is_valid() {
            return None;
        }
        self.tile_for(edgeid, hint)?.directededge(edgeid.id())
    }

    pub fn nodeinfo<'a>(
        &'a self,
        nodeid: GraphId,
        hint: &mut Option<&'a GraphTile>,
    ) -> Option<&'a NodeInfo> {
        if !nodeid.is_valid() {
            return None;
        }
        self.tile_for(nodeid, hint)?.node(nodeid.id())
    }

    /// Graph id of the edge opposing `edgeid`, derived through the end
    /// node's edge list. `None` for one-way edges.
    pub fn opposing_edge_id<'a>(
        &'a self,
        edgeid: GraphId,
        hint: &mut Option<&'a GraphTile>,
    ) -> Option<GraphId> {
        let edge = *self.directededge(edgeid, hint)?;
        if edge.opp_local_idx == NO_OPPOSING_EDGE {
            return None;
        }
        let end = edge.endnode;
        let nodeinfo = self.nodeinfo(end, hint)?;
        Some(GraphId::new(
            end.level(),
            end.tileid(),
            nodeinfo.edge_index + u32::from(edge.opp_local_idx),
        ))
    }

    /// Begin and end node of a directed edge. The begin node is recovered
    /// through the opposing edge; it comes back invalid for one-way edges
    /// with no opposing counterpart.
    pub fn edge_endpoints<'a>(
        &'a self,
        edgeid: GraphId,
        hint: &mut Option<&'a GraphTile>,
    ) -> Option<(GraphId, GraphId)> {
        let end = self.directededge(edgeid, hint)?.endnode;
        let begin = self
            .opposing_edge_id(edgeid, hint)
            .and_then(|opp| self.directededge(opp, hint).map(|e| e.endnode))
            .unwrap_or(GraphId::INVALID);
        Some((begin, end))
    }

    /// Graph id of the `local_idx`-th outbound edge of `node`.
    pub fn edge_id(&self, node: GraphId, local_idx: u8) -> Option<GraphId> {
        let mut hint = None;
        let nodeinfo = self.nodeinfo(node, &mut hint)?;
        if u32::from(local_idx) >= nodeinfo.edge_count {
            return None;
        }
        Some(GraphId::new(
            node.level(),
            node.tileid(),
            nodeinfo.edge_index + u32::from(local_idx),
        ))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

/// A directed edge a measured location may snap to, with the fractional
/// position of the snap along the edge.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CandidateEdge {
    pub id: GraphId,
    /// Fractional position along the edge in `[0, 1]`.
    pub dist: f32,
    /// The candidate coincides with the edge's begin node.
    pub begin_node: bool,
    /// The candidate coincides with the edge's end node.
    pub end_node: bool,
}

impl CandidateEdge {
    pub fn at_begin(id: GraphId) -> Self {
        Self { id, dist: 0.0, begin_node: true, end_node: false }
    }

    pub fn at_end(id: GraphId) -> Self {
        Self { id, dist: 1.0, begin_node: false, end_node: true }
    }

    pub fn along(id: GraphId, dist: f32) -> Self {
        debug_assert!((0.0..=1.0).contains(&dist));
        Self { id, dist, begin_node: false, end_node: false }
    }
}

/// A noisy observation snapped to the road network: an ordered list of
/// candidate edges, best match first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PathLocation {
    pub edges: Vec<CandidateEdge>,
}

impl PathLocation {
    pub fn new(edges: Vec<CandidateEdge>) -> Self {
        Self { edges }
    }
}
