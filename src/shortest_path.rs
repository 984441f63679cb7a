use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, trace};

use crate::costing::{Costing, EdgeLabel, TravelMode};
use crate::error::Result;
use crate::geometry::{self, cluster_heuristic, DistanceApproximator};
use crate::graph::{DirectedEdge, EdgeUse, GraphId, GraphReader, GraphTile, NodeInfo, PathLocation};
use crate::label_set::{LabelKey, LabelSet, INVALID_LABEL};

/// Turn penalties indexed by absolute turn degree: 0 is a U-turn, 180 is
/// straight through.
pub type TurnCostTable = [f32; 181];

/// Whether the search may continue from `pred_edgelabel` onto `edge`.
///
/// Two transition edges in a row are never allowed. The predecessor's own
/// edge gets a pass (it was allowed when the predecessor was created), and
/// so do transition edges, which the costing does not reason about; all
/// other edges defer to the costing.
pub(crate) fn is_edge_allowed(
    edge: &DirectedEdge,
    edgeid: GraphId,
    costing: Option<&dyn Costing>,
    pred_edgelabel: &Option<Arc<EdgeLabel>>,
    tile: &GraphTile,
) -> bool {
    if let (Some(costing), Some(pred)) = (costing, pred_edgelabel) {
        if edge.is_transition()
            && matches!(pred.edge_use(), EdgeUse::TransitionUp | EdgeUse::TransitionDown)
        {
            return false;
        }
        edgeid == pred.edgeid()
            || edge.is_transition()
            || costing.allowed_edge(edge, pred, tile, edgeid)
    } else {
        true
    }
}

/// Seed the label set from the origin's candidate edges.
///
/// Candidates snapped to a node become node-keyed seeds (subject to the
/// costing's node filter); mid-edge candidates become one destination-keyed
/// seed under the origin's own index. Seeds carry zero cost, no arrival
/// edge and no predecessor, so they double as the sentinels a predecessor
/// walk terminates at.
pub fn set_origin(
    reader: &GraphReader,
    destinations: &[PathLocation],
    origin_idx: u16,
    labelset: &mut LabelSet,
    travelmode: TravelMode,
    costing: Option<&dyn Costing>,
    edgelabel: Option<Arc<EdgeLabel>>,
) -> Result<()> {
    let mut tile: Option<&GraphTile> = None;

    for edge in &destinations[origin_idx as usize].edges {
        if !edge.id.is_valid() {
            continue;
        }
        let Some((begin_node, end_node)) = reader.edge_endpoints(edge.id, &mut tile) else {
            continue;
        };
        let nodeid = if edge.begin_node {
            begin_node
        } else if edge.end_node {
            end_node
        } else {
            // Mid-edge candidate; whether the edge itself is usable is
            // decided when the origin label expands.
            labelset.put_seed(LabelKey::Dest(origin_idx), travelmode, edgelabel.clone())?;
            continue;
        };
        if !nodeid.is_valid() {
            continue;
        }
        let Some(nodeinfo) = reader.nodeinfo(nodeid, &mut tile) else {
            continue;
        };
        if costing.is_some_and(|c| !c.allowed_node(nodeinfo)) {
            continue;
        }
        labelset.put_seed(LabelKey::Node(nodeid), travelmode, edgelabel.clone())?;
    }
    Ok(())
}

/// Index every destination candidate by where it can be reached: node
/// candidates under their node id, mid-edge candidates under their edge id.
/// Entries are erased as destinations settle, so empty maps double as the
/// all-found signal.
pub fn set_destinations(
    reader: &GraphReader,
    destinations: &[PathLocation],
    node_dests: &mut HashMap<GraphId, HashSet<u16>>,
    edge_dests: &mut HashMap<GraphId, HashSet<u16>>,
) {
    let mut tile: Option<&GraphTile> = None;

    for (dest, location) in destinations.iter().enumerate() {
        let dest = dest as u16;
        for edge in &location.edges {
            if !edge.id.is_valid() {
                continue;
            }
            let Some((begin_node, end_node)) = reader.edge_endpoints(edge.id, &mut tile) else {
                continue;
            };
            if edge.begin_node {
                if begin_node.is_valid() {
                    node_dests.entry(begin_node).or_default().insert(dest);
                }
            } else if edge.end_node {
                if end_node.is_valid() {
                    node_dests.entry(end_node).or_default().insert(dest);
                }
            } else {
                edge_dests.entry(edge.id).or_default().insert(dest);
            }
        }
    }
}

/// Heading of the arrival edge at the node being expanded, read from the
/// node's heading cache when the opposing local index fits, otherwise
/// recomputed from the edge shape.
fn inbound_edgelabel_heading<'a>(
    reader: &'a GraphReader,
    tile: &mut Option<&'a GraphTile>,
    edgelabel: &EdgeLabel,
    nodeinfo: &NodeInfo,
) -> u16 {
    let idx = edgelabel.opp_local_idx();
    if idx < 8 {
        nodeinfo.heading(idx).unwrap_or(0)
    } else {
        let Some(edge) = reader.directededge(edgelabel.edgeid(), tile).copied() else {
            return 0;
        };
        match reader.tile_for(edgelabel.edgeid(), tile) {
            Some(t) => geometry::inbound_edge_heading(t.edge_shape(&edge), edge.forward),
            None => 0,
        }
    }
}

fn outbound_edge_heading<'a>(
    reader: &'a GraphReader,
    tile: &mut Option<&'a GraphTile>,
    edgeid: GraphId,
    edge: &DirectedEdge,
    nodeinfo: &NodeInfo,
) -> u16 {
    let idx = edge.localedgeidx;
    if idx < 8 {
        nodeinfo.heading(idx).unwrap_or(0)
    } else {
        match reader.tile_for(edgeid, tile) {
            Some(t) => geometry::outbound_edge_heading(t.edge_shape(edge), edge.forward),
            None => 0,
        }
    }
}

fn is_transition_edge<'a>(
    reader: &'a GraphReader,
    edgeid: GraphId,
    tile: &mut Option<&'a GraphTile>,
) -> bool {
    reader.directededge(edgeid, tile).is_some_and(|edge| edge.is_transition())
}

/// Find the shortest paths from one origin to a set of destinations.
///
/// A labeled Dijkstra with an A* heuristic against the search disc around
/// the next measurement (`approximator` center, `search_radius`): the
/// remaining cost to the destination cluster cannot exceed the straight
/// line to the disc boundary, so the bound stays admissible for the whole
/// cluster.
///
/// Returns a map from destination index to the index of its settled label
/// in `labelset`; callers walk `predecessor` chains from there to recover
/// paths. A destination missing from the map was not reachable within the
/// label set's cost horizon. The queue and status maps are cleared on
/// return, the labels themselves stay readable.
#[allow(clippy::too_many_arguments)]
pub fn find_shortest_path(
    reader: &GraphReader,
    destinations: &[PathLocation],
    origin_idx: u16,
    labelset: &mut LabelSet,
    approximator: &DistanceApproximator,
    search_radius: f32,
    costing: Option<&dyn Costing>,
    edgelabel: Option<Arc<EdgeLabel>>,
    turn_cost_table: Option<&TurnCostTable>,
) -> Result<HashMap<u16, u32>> {
    let heuristic = |lnglat| cluster_heuristic(approximator, search_radius, lnglat);

    // Destinations at nodes and along edges.
    let mut node_dests: HashMap<GraphId, HashSet<u16>> = HashMap::new();
    let mut edge_dests: HashMap<GraphId, HashSet<u16>> = HashMap::new();
    set_destinations(reader, destinations, &mut node_dests, &mut edge_dests);

    let travelmode = costing.map_or(TravelMode::Drive, |c| c.travel_mode());
    set_origin(reader, destinations, origin_idx, labelset, travelmode, costing, edgelabel)?;

    let mut results: HashMap<u16, u32> = HashMap::new();
    let mut tile: Option<&GraphTile> = None;

    loop {
        let Some(label_idx) = labelset.pop()? else {
            // Exhausted the queue without settling every destination.
            break;
        };

        // References into the label set do not survive the puts below, so
        // cache what the expansion needs up front.
        let (label_key, label_cost, label_turn_cost) = {
            let label = labelset.label(label_idx);
            (label.key, label.cost, label.turn_cost)
        };

        // Transition edges are graph scaffolding, not maneuvers: walk back
        // to the last label that arrived by a real edge (or a seed) and
        // filter and turn-cost against that one.
        let mut pred_edgelabel;
        let mut walk_idx = label_idx;
        loop {
            let label = labelset.label(walk_idx);
            pred_edgelabel = label.edgelabel.clone();
            if !label.edgeid.is_valid() || !is_transition_edge(reader, label.edgeid, &mut tile) {
                break;
            }
            if label.predecessor == INVALID_LABEL {
                break;
            }
            walk_idx = label.predecessor;
        }

        match label_key {
            LabelKey::Node(nodeid) => {
                // Any destinations waiting at this node are found now.
                if let Some(dests) = node_dests.remove(&nodeid) {
                    for dest in dests {
                        trace!("settled destination {dest} at node {nodeid}");
                        results.insert(dest, label_idx);
                    }
                }
                if node_dests.is_empty() && edge_dests.is_empty() {
                    break;
                }

                let Some(nodeinfo) = reader.nodeinfo(nodeid, &mut tile).copied() else {
                    continue;
                };
                if nodeinfo.edge_count == 0 || costing.is_some_and(|c| !c.allowed_node(&nodeinfo)) {
                    continue;
                }

                let inbound_heading = match (&pred_edgelabel, turn_cost_table) {
                    (Some(el), Some(_)) => {
                        inbound_edgelabel_heading(reader, &mut tile, el, &nodeinfo)
                    }
                    _ => 0,
                };

                for i in 0..nodeinfo.edge_count {
                    let other_edgeid =
                        GraphId::new(nodeid.level(), nodeid.tileid(), nodeinfo.edge_index + i);
                    let Some(other_edge) = reader.directededge(other_edgeid, &mut tile).copied()
                    else {
                        continue;
                    };
                    if other_edge.is_shortcut()
                        || other_edge.edge_use == EdgeUse::TransitConnection
                    {
                        continue;
                    }

                    let Some(other_tile) = reader.tile_for(other_edgeid, &mut tile) else {
                        continue;
                    };
                    if !is_edge_allowed(&other_edge, other_edgeid, costing, &pred_edgelabel, other_tile)
                    {
                        continue;
                    }

                    // Turn costs apply to real maneuvers only; transition
                    // edges inherit the accumulated value unchanged.
                    let mut turn_cost = label_turn_cost;
                    if let (Some(_), Some(table)) = (&pred_edgelabel, turn_cost_table) {
                        if !other_edge.is_transition() {
                            let outbound = outbound_edge_heading(
                                reader,
                                &mut tile,
                                other_edgeid,
                                &other_edge,
                                &nodeinfo,
                            );
                            let degree = geometry::turn_degree180(inbound_heading, outbound);
                            turn_cost += table[degree as usize];
                        }
                    }

                    // Mid-edge destinations along this edge become
                    // destination-keyed labels; the heuristic at a
                    // destination is zero, so sortcost equals cost.
                    if let Some(dests) = edge_dests.get(&other_edgeid) {
                        for &dest in dests {
                            for edge in &destinations[dest as usize].edges {
                                if edge.id == other_edgeid {
                                    let cost = label_cost + other_edge.length * edge.dist;
                                    labelset.put(
                                        LabelKey::Dest(dest),
                                        other_edgeid,
                                        0.0,
                                        edge.dist,
                                        cost,
                                        turn_cost,
                                        cost,
                                        label_idx,
                                        Some(&other_edge),
                                        travelmode,
                                        None,
                                    )?;
                                }
                            }
                        }
                    }

                    let Some(end_nodeinfo) =
                        reader.nodeinfo(other_edge.endnode, &mut tile).copied()
                    else {
                        continue;
                    };
                    let cost = label_cost + other_edge.length;
                    let sortcost = cost + heuristic(end_nodeinfo.latlng);
                    labelset.put(
                        LabelKey::Node(other_edge.endnode),
                        other_edgeid,
                        0.0,
                        1.0,
                        cost,
                        turn_cost,
                        sortcost,
                        label_idx,
                        Some(&other_edge),
                        travelmode,
                        None,
                    )?;
                }
            }

            LabelKey::Dest(dest) => {
                trace!("settled destination {dest} along an edge");
                results.insert(dest, label_idx);
                for edge in &destinations[dest as usize].edges {
                    if let Some(dests) = edge_dests.get_mut(&edge.id) {
                        dests.remove(&dest);
                        if dests.is_empty() {
                            edge_dests.remove(&edge.id);
                        }
                    }
                }
                if edge_dests.is_empty() && node_dests.is_empty() {
                    break;
                }

                // Only the origin keeps expanding: other destinations are
                // terminal in the search tree.
                if dest != origin_idx {
                    continue;
                }

                for origin_edge in &destinations[origin_idx as usize].edges {
                    let Some(directededge) =
                        reader.directededge(origin_edge.id, &mut tile).copied()
                    else {
                        continue;
                    };
                    let Some(origin_tile) = reader.tile_for(origin_edge.id, &mut tile) else {
                        continue;
                    };
                    if !is_edge_allowed(
                        &directededge,
                        origin_edge.id,
                        costing,
                        &pred_edgelabel,
                        origin_tile,
                    ) {
                        continue;
                    }

                    // Heading straight back along the edge we arrived by
                    // costs a U-turn.
                    let mut turn_cost = label_turn_cost;
                    if let (Some(el), Some(table)) = (&pred_edgelabel, turn_cost_table) {
                        if el.edgeid() != origin_edge.id
                            && el.opp_local_idx() == directededge.localedgeidx
                        {
                            turn_cost += table[0];
                        }
                    }

                    // Destinations on the origin edge, at or ahead of the
                    // origin's own position.
                    if let Some(other_dests) = edge_dests.get(&origin_edge.id) {
                        for &other_dest in other_dests {
                            for other_edge in &destinations[other_dest as usize].edges {
                                if origin_edge.id == other_edge.id
                                    && origin_edge.dist <= other_edge.dist
                                {
                                    let cost = label_cost
                                        + directededge.length
                                            * (other_edge.dist - origin_edge.dist);
                                    labelset.put(
                                        LabelKey::Dest(other_dest),
                                        origin_edge.id,
                                        origin_edge.dist,
                                        other_edge.dist,
                                        cost,
                                        turn_cost,
                                        cost,
                                        label_idx,
                                        Some(&directededge),
                                        travelmode,
                                        None,
                                    )?;
                                }
                            }
                        }
                    }

                    // Continue past the end of the origin edge.
                    let Some(end_nodeinfo) =
                        reader.nodeinfo(directededge.endnode, &mut tile).copied()
                    else {
                        continue;
                    };
                    let cost =
                        label_cost + directededge.length * (1.0 - origin_edge.dist);
                    let sortcost = cost + heuristic(end_nodeinfo.latlng);
                    labelset.put(
                        LabelKey::Node(directededge.endnode),
                        origin_edge.id,
                        origin_edge.dist,
                        1.0,
                        cost,
                        turn_cost,
                        sortcost,
                        label_idx,
                        Some(&directededge),
                        travelmode,
                        None,
                    )?;
                }
            }
        }
    }

    debug!(
        "search done: {} of {} destinations settled, {} labels",
        results.len(),
        destinations.len(),
        labelset.len()
    );
    labelset.clear_queue();
    labelset.clear_status();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use geo_types::Point;

    use super::*;
    use crate::builder::GraphBuilder;
    use crate::costing::AccessCosting;
    use crate::graph::CandidateEdge;

    /// Longitude offset for a given distance in meters, on the equator.
    fn lng(meters: f64) -> f64 {
        meters / 110_567.0
    }

    fn labelset() -> LabelSet {
        LabelSet::new(10_000.0, 1.0)
    }

    fn run(
        reader: &GraphReader,
        destinations: &[PathLocation],
        labelset: &mut LabelSet,
        center: Point<f64>,
        edgelabel: Option<Arc<EdgeLabel>>,
        turn_cost_table: Option<&TurnCostTable>,
    ) -> HashMap<u16, u32> {
        let _ = env_logger::builder().is_test(true).try_init();
        let approximator = DistanceApproximator::new(center);
        let costing = AccessCosting::new(TravelMode::Drive);
        find_shortest_path(
            reader,
            destinations,
            0,
            labelset,
            &approximator,
            0.0,
            Some(&costing),
            edgelabel,
            turn_cost_table,
        )
        .unwrap()
    }

    /// Costing that remembers which predecessor each edge was checked
    /// against.
    struct RecordingCosting {
        inner: AccessCosting,
        checks: RefCell<Vec<(GraphId, GraphId)>>,
    }

    impl RecordingCosting {
        fn new() -> Self {
            Self { inner: AccessCosting::new(TravelMode::Drive), checks: RefCell::new(Vec::new()) }
        }
    }

    impl Costing for RecordingCosting {
        fn allowed_edge(
            &self,
            edge: &DirectedEdge,
            pred: &EdgeLabel,
            tile: &GraphTile,
            edgeid: GraphId,
        ) -> bool {
            self.checks.borrow_mut().push((edgeid, pred.edgeid()));
            self.inner.allowed_edge(edge, pred, tile, edgeid)
        }

        fn allowed_node(&self, node: &NodeInfo) -> bool {
            self.inner.allowed_node(node)
        }

        fn travel_mode(&self) -> TravelMode {
            self.inner.travel_mode()
        }
    }

    #[test]
    fn two_node_line() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        builder.add_way(a, b, 100.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::at_begin(ab)]),
            PathLocation::new(vec![CandidateEdge::at_end(ab)]),
        ];
        let mut labelset = labelset();
        let results =
            run(&reader, &destinations, &mut labelset, Point::new(lng(100.0), 0.0), None, None);

        let label = labelset.label(results[&1]);
        assert_eq!(label.cost, 100.0);
        assert_eq!(label.key, LabelKey::Node(b));
        assert_eq!(label.sortcost, label.cost);
    }

    #[test]
    fn same_edge_origin_and_destinations() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(200.0), 0.0));
        builder.add_way(a, b, 200.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::along(ab, 0.25)]),
            PathLocation::new(vec![CandidateEdge::along(ab, 0.75)]),
            PathLocation::new(vec![CandidateEdge::along(ab, 0.10)]),
        ];
        let mut labelset = labelset();
        let results =
            run(&reader, &destinations, &mut labelset, Point::new(lng(150.0), 0.0), None, None);

        // Ahead of the origin on the same edge: straight along the edge.
        let ahead = labelset.label(results[&1]);
        assert!((ahead.cost - 100.0).abs() < 1e-3, "cost was {}", ahead.cost);
        assert_eq!(ahead.source, 0.25);
        assert_eq!(ahead.target, 0.75);

        // Behind the origin: only reachable the long way round, through
        // the end node and back along the opposing edge.
        let behind = labelset.label(results[&2]);
        assert!((behind.cost - 370.0).abs() < 1e-3, "cost was {}", behind.cost);

        // Walking the predecessors visits strictly decreasing costs down
        // to the zero-cost seed.
        let mut idx = results[&2];
        let mut costs = vec![labelset.label(idx).cost];
        while labelset.label(idx).predecessor != INVALID_LABEL {
            idx = labelset.label(idx).predecessor;
            costs.push(labelset.label(idx).cost);
        }
        assert!(costs.windows(2).all(|w| w[0] > w[1]), "costs were {costs:?}");
        assert_eq!(*costs.last().unwrap(), 0.0);
    }

    #[test]
    fn transition_edges_are_skipped_for_predecessors() {
        let mut builder = GraphBuilder::new();
        let x = builder.add_node(2, 0, Point::new(-lng(80.0), 0.0));
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let a_up = builder.add_node(1, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(1, 0, Point::new(lng(50.0), 0.0));
        builder.add_way(x, a, 80.0);
        builder.add_transition(a, a_up, true);
        builder.add_way(a_up, b, 50.0);
        let reader = builder.build();

        let xa = reader.edge_id(x, 0).unwrap();
        let ub = reader.edge_id(a_up, 0).unwrap();
        let transition = reader.edge_id(a, 1).unwrap();

        // The previous state arrived at node a over x→a.
        let mut hint = None;
        let xa_edge = *reader.directededge(xa, &mut hint).unwrap();
        let prior = Arc::new(EdgeLabel::new(xa, &xa_edge, TravelMode::Drive));

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::at_end(xa)]),
            PathLocation::new(vec![CandidateEdge::at_end(ub)]),
        ];

        let _ = env_logger::builder().is_test(true).try_init();
        let approximator = DistanceApproximator::new(Point::new(lng(50.0), 0.0));
        let costing = RecordingCosting::new();
        let table = [0.0f32; 181];
        let mut labelset = labelset();
        let results = find_shortest_path(
            &reader,
            &destinations,
            0,
            &mut labelset,
            &approximator,
            0.0,
            Some(&costing),
            Some(prior),
            Some(&table),
        )
        .unwrap();

        let label = labelset.label(results[&1]);
        assert_eq!(label.cost, 50.0);
        assert_eq!(label.turn_cost, 0.0);

        let checks = costing.checks.borrow();
        // The filter for a_up→b ran against x→a, not against the
        // transition in between, and the transition itself never reached
        // the costing.
        assert!(checks.iter().any(|&(edge, pred)| edge == ub && pred == xa));
        assert!(checks.iter().all(|&(edge, _)| edge != transition));
        assert!(checks.iter().all(|&(_, pred)| pred != transition));
    }

    #[test]
    fn consecutive_transitions_are_forbidden() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let a_up = builder.add_node(1, 0, Point::new(0.0, 0.0));
        builder.add_transition(a, a_up, true);
        let reader = builder.build();

        let transition = reader.edge_id(a, 0).unwrap();
        let mut hint = None;
        let edge = *reader.directededge(transition, &mut hint).unwrap();
        let tile = reader.tile(transition).unwrap();
        let costing = AccessCosting::new(TravelMode::Drive);

        let road_pred = {
            let road = DirectedEdge { edge_use: EdgeUse::Road, ..edge };
            Some(Arc::new(EdgeLabel::new(GraphId::new(2, 0, 7), &road, TravelMode::Drive)))
        };
        let transition_pred =
            Some(Arc::new(EdgeLabel::new(GraphId::new(2, 0, 7), &edge, TravelMode::Drive)));

        assert!(is_edge_allowed(&edge, transition, Some(&costing), &road_pred, tile));
        assert!(!is_edge_allowed(&edge, transition, Some(&costing), &transition_pred, tile));
        // No predecessor, nothing to forbid.
        assert!(is_edge_allowed(&edge, transition, Some(&costing), &None, tile));
    }

    #[test]
    fn u_turn_at_origin_costs() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(200.0), 0.0));
        builder.add_way(a, b, 200.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();
        let ba = reader.edge_id(b, 0).unwrap();

        // The previous state arrived at node a over b→a; continuing along
        // a→b doubles straight back.
        let mut hint = None;
        let ba_edge = *reader.directededge(ba, &mut hint).unwrap();
        let prior = Arc::new(EdgeLabel::new(ba, &ba_edge, TravelMode::Drive));

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::along(ab, 0.5)]),
            PathLocation::new(vec![CandidateEdge::at_end(ab)]),
        ];
        let mut table = [0.0f32; 181];
        table[0] = 5.0;

        let mut labelset = labelset();
        let results = run(
            &reader,
            &destinations,
            &mut labelset,
            Point::new(lng(200.0), 0.0),
            Some(prior),
            Some(&table),
        );

        let label = labelset.label(results[&1]);
        assert_eq!(label.cost, 100.0);
        assert_eq!(label.turn_cost, 5.0);
    }

    #[test]
    fn horizon_cuts_off_search() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        builder.add_way(a, b, 100.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::at_begin(ab)]),
            PathLocation::new(vec![CandidateEdge::at_end(ab)]),
        ];
        let mut labelset = LabelSet::new(50.0, 1.0);
        let results =
            run(&reader, &destinations, &mut labelset, Point::new(lng(100.0), 0.0), None, None);

        // The line is longer than the horizon: the far destination is
        // simply absent, no error.
        assert!(!results.contains_key(&1));
    }

    #[test]
    fn origin_node_rejected_by_costing() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        builder.add_way(a, b, 100.0);
        builder.set_node_access(a, 0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::at_begin(ab)]),
            PathLocation::new(vec![CandidateEdge::at_end(ab)]),
        ];
        let mut labelset = labelset();
        let results =
            run(&reader, &destinations, &mut labelset, Point::new(lng(100.0), 0.0), None, None);
        assert!(results.is_empty());
    }

    #[test]
    fn seeding_is_idempotent() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(2, 0, Point::new(0.0, 0.0));
        let b = builder.add_node(2, 0, Point::new(lng(100.0), 0.0));
        let c = builder.add_node(2, 0, Point::new(lng(200.0), 0.0));
        builder.add_way(a, b, 100.0);
        builder.add_way(b, c, 100.0);
        let reader = builder.build();
        let ab = reader.edge_id(a, 0).unwrap();
        let bc = reader.edge_id(b, 1).unwrap();

        let destinations = vec![
            PathLocation::new(vec![CandidateEdge::at_begin(ab), CandidateEdge::along(bc, 0.5)]),
            PathLocation::new(vec![CandidateEdge::at_end(bc), CandidateEdge::along(ab, 0.3)]),
        ];

        let mut node_first = HashMap::new();
        let mut edge_first = HashMap::new();
        set_destinations(&reader, &destinations, &mut node_first, &mut edge_first);
        let mut node_second = HashMap::new();
        let mut edge_second = HashMap::new();
        set_destinations(&reader, &destinations, &mut node_second, &mut edge_second);

        assert_eq!(node_first, node_second);
        assert_eq!(edge_first, edge_second);
        assert_eq!(node_first[&a], HashSet::from([0]));
        assert_eq!(node_first[&c], HashSet::from([1]));
        assert_eq!(edge_first[&bc], HashSet::from([0]));
        assert_eq!(edge_first[&ab], HashSet::from([1]));
    }
}
