use serde::{Deserialize, Serialize};

use crate::graph::{DirectedEdge, EdgeUse, GraphId, GraphTile, NodeInfo};

/// Access bit field constants shared by edges and nodes.
pub mod access {
    pub const AUTO: u16 = 1;
    pub const PEDESTRIAN: u16 = 2;
    pub const BICYCLE: u16 = 4;
    pub const ALL: u16 = 0xfff;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelMode {
    Drive,
    Pedestrian,
    Bicycle,
}

impl TravelMode {
    pub fn access_mask(self) -> u16 {
        match self {
            TravelMode::Drive => access::AUTO,
            TravelMode::Pedestrian => access::PEDESTRIAN,
            TravelMode::Bicycle => access::BICYCLE,
        }
    }
}

/// Compact descriptor of an edge a search arrived by. Shared between the
/// labels of a search, and across searches when the caller threads one
/// state's winning label into the next state's origin seeds.
#[derive(Clone, Debug)]
pub struct EdgeLabel {
    edgeid: GraphId,
    edge_use: EdgeUse,
    opp_local_idx: u8,
    travelmode: TravelMode,
}

impl EdgeLabel {
    pub fn new(edgeid: GraphId, edge: &DirectedEdge, travelmode: TravelMode) -> Self {
        Self {
            edgeid,
            edge_use: edge.edge_use,
            opp_local_idx: edge.opp_local_idx,
            travelmode,
        }
    }

    pub fn edgeid(&self) -> GraphId {
        self.edgeid
    }

    pub fn edge_use(&self) -> EdgeUse {
        self.edge_use
    }

    /// Local index of the opposing edge at this edge's end node.
    pub fn opp_local_idx(&self) -> u8 {
        self.opp_local_idx
    }

    pub fn travelmode(&self) -> TravelMode {
        self.travelmode
    }
}

/// Pluggable edge/node filter consulted during expansion. Costs themselves
/// are edge lengths; a costing only decides what is traversable.
pub trait Costing {
    /// May the search continue from `pred` onto `edge`?
    fn allowed_edge(
        &self,
        edge: &DirectedEdge,
        pred: &EdgeLabel,
        tile: &GraphTile,
        edgeid: GraphId,
    ) -> bool;

    /// May the search pass through this node?
    fn allowed_node(&self, node: &NodeInfo) -> bool;

    fn travel_mode(&self) -> TravelMode;
}

/// Costing that admits whatever the access bit masks admit for one travel
/// mode. The default plugin for tests and the cost matrix.
pub struct AccessCosting {
    mode: TravelMode,
}

impl AccessCosting {
    pub fn new(mode: TravelMode) -> Self {
        Self { mode }
    }
}

impl Costing for AccessCosting {
    fn allowed_edge(
        &self,
        edge: &DirectedEdge,
        _pred: &EdgeLabel,
        _tile: &GraphTile,
        _edgeid: GraphId,
    ) -> bool {
        edge.access & self.mode.access_mask() != 0
    }

    fn allowed_node(&self, node: &NodeInfo) -> bool {
        node.access & self.mode.access_mask() != 0
    }

    fn travel_mode(&self) -> TravelMode {
        self.mode
    }
}
