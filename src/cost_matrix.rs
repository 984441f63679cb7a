use std::collections::HashMap;

use log::{debug, trace};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::costing::{Costing, TravelMode};
use crate::error::Result;
use crate::graph::{EdgeUse, GraphId, GraphReader, GraphTile, PathLocation};
use crate::label_set::{LabelKey, LabelSet, INVALID_LABEL};
use crate::shortest_path::is_edge_allowed;

/// Cost threshold beyond which matrix searches stop expanding, when the
/// caller does not supply one.
pub const DEFAULT_COST_THRESHOLD: f32 = 100_000.0;

const BUCKET_SIZE: f32 = 1.0;

/// Travel time and distance between one source and one target. Costs here
/// are edge lengths, so the two agree; both are carried for the contract.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeDistance {
    pub time: f32,
    pub distance: f32,
}

/// Caps on hierarchy movement for one search.
#[derive(Clone, Debug)]
pub struct HierarchyLimits {
    pub max_up_transitions: u32,
    up_transitions: u32,
}

impl HierarchyLimits {
    pub fn new(max_up_transitions: u32) -> Self {
        Self { max_up_transitions, up_transitions: 0 }
    }

    fn allow_up_transition(&mut self) -> bool {
        if self.up_transitions < self.max_up_transitions {
            self.up_transitions += 1;
            true
        } else {
            false
        }
    }
}

impl Default for HierarchyLimits {
    fn default() -> Self {
        Self::new(400)
    }
}

#[derive(Clone, Copy, Debug)]
struct LocationStatus {
    expand: bool,
    exhausted: bool,
    /// Counterpart locations this one has not connected to yet; the search
    /// stops expanding once it reaches zero.
    remaining: u32,
}

impl LocationStatus {
    fn new(remaining: u32) -> Self {
        Self { expand: remaining > 0, exhausted: false, remaining }
    }

    fn mark_connected(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.expand = false;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// One half of the bidirectional machinery: an edge-keyed Dijkstra rooted
/// at a single source (forward) or target (backward).
///
/// Labels are keyed by directed-edge id. A forward label's cost runs from
/// the source to the *end* of its edge; a backward label's cost runs from
/// the *start* of its edge through to the target. A forward and a backward
/// label on the same edge therefore overlap by exactly that edge, which the
/// connection bookkeeping subtracts back out.
struct Search {
    labelset: LabelSet,
    settled: HashMap<GraphId, f32>,
    status: LocationStatus,
    hierarchy: HierarchyLimits,
    direction: Direction,
}

impl Search {
    fn new(
        reader: &GraphReader,
        location: &PathLocation,
        direction: Direction,
        travelmode: TravelMode,
        cost_threshold: f32,
        counterparts: u32,
    ) -> Result<Self> {
        let mut labelset = LabelSet::new(cost_threshold, BUCKET_SIZE);
        let mut tile: Option<&GraphTile> = None;

        for candidate in &location.edges {
            if !candidate.id.is_valid() {
                continue;
            }
            let Some(edge) = reader.directededge(candidate.id, &mut tile).copied() else {
                continue;
            };
            let (cost, source, target) = match direction {
                Direction::Forward => {
                    (edge.length * (1.0 - candidate.dist), candidate.dist, 1.0)
                }
                Direction::Backward => (edge.length * candidate.dist, 0.0, candidate.dist),
            };
            labelset.put(
                LabelKey::Node(candidate.id),
                candidate.id,
                source,
                target,
                cost,
                0.0,
                cost,
                INVALID_LABEL,
                Some(&edge),
                travelmode,
                None,
            )?;
        }

        Ok(Self {
            labelset,
            settled: HashMap::new(),
            status: LocationStatus::new(counterparts),
            hierarchy: HierarchyLimits::default(),
            direction,
        })
    }

    /// Settle one label and relax its neighbors. Returns the settled edge
    /// and its cost, or `None` when the search just finished (queue empty
    /// or threshold crossed).
    fn step(
        &mut self,
        reader: &GraphReader,
        costing: Option<&dyn Costing>,
        travelmode: TravelMode,
        threshold: f32,
    ) -> Result<Option<(GraphId, f32)>> {
        let Some(idx) = self.labelset.pop()? else {
            self.status.exhausted = true;
            self.status.expand = false;
            return Ok(None);
        };

        let (key, cost, pred_edgelabel) = {
            let label = self.labelset.label(idx);
            (label.key, label.cost, label.edgelabel.clone())
        };
        let LabelKey::Node(edgeid) = key else {
            return Ok(None);
        };
        if cost > threshold {
            self.status.expand = false;
            return Ok(None);
        }
        self.settled.insert(edgeid, cost);

        let mut tile: Option<&GraphTile> = None;
        let Some(edge) = reader.directededge(edgeid, &mut tile).copied() else {
            return Ok(Some((edgeid, cost)));
        };

        // The node the relaxation fans out from: ahead of the edge going
        // forward, behind it going backward.
        let node = match self.direction {
            Direction::Forward => edge.endnode,
            Direction::Backward => match reader.edge_endpoints(edgeid, &mut tile) {
                Some((begin, _)) if begin.is_valid() => begin,
                _ => return Ok(Some((edgeid, cost))),
            },
        };
        let Some(nodeinfo) = reader.nodeinfo(node, &mut tile).copied() else {
            return Ok(Some((edgeid, cost)));
        };
        if costing.is_some_and(|c| !c.allowed_node(&nodeinfo)) {
            return Ok(Some((edgeid, cost)));
        }

        for i in 0..nodeinfo.edge_count {
            let out_edgeid = GraphId::new(node.level(), node.tileid(), nodeinfo.edge_index + i);
            // Forward relaxes the node's outbound edges; backward relaxes
            // the inbound ones, reached as the opposing edges of the
            // outbound list.
            let next_edgeid = match self.direction {
                Direction::Forward => out_edgeid,
                Direction::Backward => match reader.opposing_edge_id(out_edgeid, &mut tile) {
                    Some(opp) => opp,
                    None => continue,
                },
            };
            let Some(next_edge) = reader.directededge(next_edgeid, &mut tile).copied() else {
                continue;
            };
            if next_edge.is_shortcut() || next_edge.edge_use == EdgeUse::TransitConnection {
                continue;
            }
            if next_edge.edge_use == EdgeUse::TransitionUp
                && !self.hierarchy.allow_up_transition()
            {
                continue;
            }
            let Some(next_tile) = reader.tile_for(next_edgeid, &mut tile) else {
                continue;
            };
            if !is_edge_allowed(&next_edge, next_edgeid, costing, &pred_edgelabel, next_tile) {
                continue;
            }

            let next_cost = cost + next_edge.length;
            self.labelset.put(
                LabelKey::Node(next_edgeid),
                next_edgeid,
                0.0,
                1.0,
                next_cost,
                0.0,
                next_cost,
                idx,
                Some(&next_edge),
                travelmode,
                None,
            )?;
        }

        Ok(Some((edgeid, cost)))
    }
}

/// Bidirectional many-to-many cost computation: one forward search per
/// source, one backward search per target, stepped round-robin until every
/// pair is connected or priced out of the cost threshold.
pub struct CostMatrix {
    cost_threshold: f32,
}

impl CostMatrix {
    pub fn new(initial_cost_threshold: f32) -> Self {
        Self { cost_threshold: initial_cost_threshold }
    }

    /// Best connection for every (source, target) pair, row-major by
    /// source. `None` where no connection exists under the threshold.
    pub fn source_to_target(
        &self,
        sources: &[PathLocation],
        targets: &[PathLocation],
        reader: &GraphReader,
        costing: Option<&dyn Costing>,
        travelmode: TravelMode,
    ) -> Result<Vec<Option<TimeDistance>>> {
        let mut forward = sources
            .iter()
            .map(|loc| {
                Search::new(
                    reader,
                    loc,
                    Direction::Forward,
                    travelmode,
                    self.cost_threshold,
                    targets.len() as u32,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let mut backward = targets
            .iter()
            .map(|loc| {
                Search::new(
                    reader,
                    loc,
                    Direction::Backward,
                    travelmode,
                    self.cost_threshold,
                    sources.len() as u32,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let pairs = sources.len() * targets.len();
        let mut best: Vec<Option<f32>> = vec![None; pairs];
        let mut threshold = self.cost_threshold;

        loop {
            let mut active = false;

            for (source_idx, search) in forward.iter_mut().enumerate() {
                if !search.status.expand {
                    continue;
                }
                active = true;
                let Some((edgeid, cost)) =
                    search.step(reader, costing, travelmode, threshold)?
                else {
                    continue;
                };
                let mut tile = None;
                let Some(edge) = reader.directededge(edgeid, &mut tile).copied() else {
                    continue;
                };
                // Edges the backward trees may have settled right past the
                // end node of the one just settled here.
                let out_edges = outbound_edge_ids(reader, edge.endnode);
                let mut connected = Vec::new();
                for (target_idx, target) in backward.iter().enumerate() {
                    let slot = source_idx * targets.len() + target_idx;
                    let mut fresh = false;
                    // Meeting on the shared edge: both trees traverse it,
                    // so it is counted back out once.
                    if let Some(&target_cost) = target.settled.get(&edgeid) {
                        fresh |= connect(&mut best, slot, cost + target_cost - edge.length);
                    }
                    // Meeting at the end node: the trees touch but do not
                    // overlap.
                    for &out_edgeid in &out_edges {
                        if out_edgeid == edgeid {
                            continue;
                        }
                        if let Some(&target_cost) = target.settled.get(&out_edgeid) {
                            fresh |= connect(&mut best, slot, cost + target_cost);
                        }
                    }
                    if fresh {
                        connected.push(target_idx);
                    }
                }
                for target_idx in connected {
                    search.status.mark_connected();
                    backward[target_idx].status.mark_connected();
                }
            }

            for (target_idx, search) in backward.iter_mut().enumerate() {
                if !search.status.expand {
                    continue;
                }
                active = true;
                let Some((edgeid, cost)) =
                    search.step(reader, costing, travelmode, threshold)?
                else {
                    continue;
                };
                let mut tile = None;
                let Some(edge) = reader.directededge(edgeid, &mut tile).copied() else {
                    continue;
                };
                // Edges the forward trees may have settled just ahead of
                // the begin node of the one settled here.
                let in_edges = match reader.edge_endpoints(edgeid, &mut tile) {
                    Some((begin, _)) if begin.is_valid() => inbound_edge_ids(reader, begin),
                    _ => Vec::new(),
                };
                let mut connected = Vec::new();
                for (source_idx, source) in forward.iter().enumerate() {
                    let slot = source_idx * targets.len() + target_idx;
                    let mut fresh = false;
                    if let Some(&source_cost) = source.settled.get(&edgeid) {
                        fresh |= connect(&mut best, slot, source_cost + cost - edge.length);
                    }
                    for &in_edgeid in &in_edges {
                        if in_edgeid == edgeid {
                            continue;
                        }
                        if let Some(&source_cost) = source.settled.get(&in_edgeid) {
                            fresh |= connect(&mut best, slot, source_cost + cost);
                        }
                    }
                    if fresh {
                        connected.push(source_idx);
                    }
                }
                for source_idx in connected {
                    search.status.mark_connected();
                    forward[source_idx].status.mark_connected();
                }
            }

            if !active {
                break;
            }

            // Once every pair has some connection, no better one can cost
            // more than the worst so far: tighten the stopping threshold.
            if best.iter().all(Option::is_some) {
                let worst = best
                    .iter()
                    .map(|cost| OrderedFloat(cost.unwrap()))
                    .max()
                    .map(|c| c.0)
                    .unwrap_or(threshold);
                if worst < threshold {
                    trace!("tightening cost threshold to {worst}");
                    threshold = worst;
                }
            }
        }

        let exhausted = forward
            .iter()
            .chain(backward.iter())
            .filter(|search| search.status.exhausted)
            .count();
        debug!(
            "matrix done: {}x{}, {} of {} pairs connected, {} searches ran dry",
            sources.len(),
            targets.len(),
            best.iter().filter(|b| b.is_some()).count(),
            pairs,
            exhausted
        );
        Ok(best
            .into_iter()
            .map(|cost| cost.map(|c| TimeDistance { time: c, distance: c }))
            .collect())
    }
}

impl Default for CostMatrix {
    fn default() -> Self {
        Self::new(DEFAULT_COST_THRESHOLD)
    }
}

/// Ids of the edges leaving `node`.
fn outbound_edge_ids(reader: &GraphReader, node: GraphId) -> Vec<GraphId> {
    let mut tile = None;
    let Some(nodeinfo) = reader.nodeinfo(node, &mut tile) else {
        return Vec::new();
    };
    (0..nodeinfo.edge_count)
        .map(|i| GraphId::new(node.level(), node.tileid(), nodeinfo.edge_index + i))
        .collect()
}

/// Ids of the edges entering `node`, reached as the opposing edges of its
/// outbound list. One-way edges with no opposing counterpart are absent.
fn inbound_edge_ids(reader: &GraphReader, node: GraphId) -> Vec<GraphId> {
    let mut tile = None;
    outbound_edge_ids(reader, node)
        .into_iter()
        .filter_map(|out| reader.opposing_edge_id(out, &mut tile))
        .collect()
}

/// Record a candidate connection, keeping the cheaper one. Negative totals
/// mean the shared edge is traversed against itself (target behind source)
/// and are discarded. Returns whether the pair connected for the first
/// time.
fn connect(best: &mut [Option<f32>], slot: usize, cost: f32) -> bool {
    if cost < 0.0 {
        return false;
    }
    match best[slot] {
        Some(existing) if existing <= cost => false,
        Some(_) => {
            best[slot] = Some(cost);
            false
        }
        None => {
            best[slot] = Some(cost);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use geo_types::Point;

    use super::*;
    use crate::builder::GraphBuilder;
    use crate::costing::AccessCosting;
    use crate::graph::CandidateEdge;

    fn lng(meters: f64) -> f64 {
        meters / 110_567.0
    }

    fn line_graph() -> (GraphReader, GraphId, GraphId) {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        let c = builder.add_node(2, 0, Point::new(lng(200.0), 0.0));
        builder.add_way(a, b, 100.0);
        builder.add_way(b, c, 100.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();
        let bc = reader.edge_id(b, 1).unwrap();
        (reader, ab, bc)
    }

    #[test]
    fn node_to_node_along_a_line() {
        let (reader, ab, bc) = line_graph();
        let sources = vec![PathLocation::new(vec![CandidateEdge::at_begin(ab)])];
        let targets = vec![PathLocation::new(vec![CandidateEdge::at_end(bc)])];

        let costing = AccessCosting::new(TravelMode::Drive);
        let matrix = CostMatrix::new(10_000.0);
        let result = matrix
            .source_to_target(&sources, &targets, &reader, Some(&costing), TravelMode::Drive)
            .unwrap();

        assert_eq!(result.len(), 1);
        let td = result[0].expect("pair should connect");
        assert!((td.distance - 200.0).abs() < 1e-3, "distance was {}", td.distance);
        assert_eq!(td.time, td.distance);
    }

    #[test]
    fn mid_edge_pair_on_shared_edge() {
        let (reader, ab, _) = line_graph();
        let sources = vec![PathLocation::new(vec![CandidateEdge::along(ab, 0.25)])];
        let targets = vec![PathLocation::new(vec![CandidateEdge::along(ab, 0.75)])];

        let matrix = CostMatrix::new(10_000.0);
        let result = matrix
            .source_to_target(&sources, &targets, &reader, None, TravelMode::Drive)
            .unwrap();

        let td = result[0].expect("pair should connect");
        // 100 m edge, half of it between the two snap points.
        assert!((td.distance - 50.0).abs() < 1e-3, "distance was {}", td.distance);
    }

    #[test]
    fn target_behind_source_on_one_way() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        builder.add_edge(a, b, 100.0, crate::graph::EdgeUse::Road);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();

        let sources = vec![PathLocation::new(vec![CandidateEdge::along(ab, 0.75)])];
        let targets = vec![PathLocation::new(vec![CandidateEdge::along(ab, 0.25)])];

        let matrix = CostMatrix::new(10_000.0);
        let result = matrix
            .source_to_target(&sources, &targets, &reader, None, TravelMode::Drive)
            .unwrap();

        // No way back on a one-way edge.
        assert_eq!(result[0], None);
    }

    #[test]
    fn meeting_on_distinct_edges() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        let c = builder.add_node(2, 0, Point::new(lng(200.0), 0.0));
        builder.add_way(a, b, 100.0);
        builder.add_way(b, c, 100.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();
        let bc = reader.edge_id(b, 1).unwrap();

        let sources = vec![PathLocation::new(vec![CandidateEdge::along(ab, 0.5)])];
        let targets = vec![PathLocation::new(vec![CandidateEdge::along(bc, 0.5)])];

        // The trees meet at node b on two different edges, and the
        // threshold is tight enough that neither search can run all the
        // way onto the other's seeded edge.
        let matrix = CostMatrix::new(120.0);
        let result = matrix
            .source_to_target(&sources, &targets, &reader, None, TravelMode::Drive)
            .unwrap();

        let td = result[0].expect("pair should connect at the shared node");
        assert!((td.distance - 100.0).abs() < 1e-3, "distance was {}", td.distance);
    }

    #[test]
    fn threshold_prunes_pairs() {
        let (reader, ab, bc) = line_graph();
        let sources = vec![PathLocation::new(vec![CandidateEdge::at_begin(ab)])];
        let targets = vec![PathLocation::new(vec![CandidateEdge::at_end(bc)])];

        let matrix = CostMatrix::new(50.0);
        let result = matrix
            .source_to_target(&sources, &targets, &reader, None, TravelMode::Drive)
            .unwrap();
        assert_eq!(result[0], None);
    }

    #[test]
    fn full_matrix_shape() {
        let (reader, ab, bc) = line_graph();
        // Node locations snap to every incident edge, the way a real
        // candidate search produces them.
        let sources = vec![
            PathLocation::new(vec![CandidateEdge::at_begin(ab)]),
            PathLocation::new(vec![CandidateEdge::at_end(ab), CandidateEdge::at_begin(bc)]),
        ];
        let targets = vec![
            PathLocation::new(vec![CandidateEdge::at_end(ab), CandidateEdge::at_begin(bc)]),
            PathLocation::new(vec![CandidateEdge::at_end(bc)]),
        ];

        let matrix = CostMatrix::new(10_000.0);
        let result = matrix
            .source_to_target(&sources, &targets, &reader, None, TravelMode::Drive)
            .unwrap();

        assert_eq!(result.len(), 4);
        let distances: Vec<f32> = result.iter().map(|td| td.unwrap().distance).collect();
        // Row-major: a→b, a→c, b→b, b→c; the b→b pair connects at zero
        // cost on the shared candidates.
        assert!((distances[0] - 100.0).abs() < 1e-3);
        assert!((distances[1] - 200.0).abs() < 1e-3);
        assert!(distances[2] < 1e-3);
        assert!((distances[3] - 100.0).abs() < 1e-3);
    }
}
