use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::bucket_queue::BucketQueue;
use crate::costing::{EdgeLabel, TravelMode};
use crate::error::{Result, RoutingError};
use crate::graph::{DirectedEdge, GraphId};

/// Index of a label within a [`LabelSet`], with the invalid sentinel used
/// for missing predecessors.
pub const INVALID_LABEL: u32 = u32::MAX;

/// Destination index sentinel.
pub const INVALID_DESTINATION: u16 = u16::MAX;

/// What a label is keyed by: a true graph node, or a mid-edge destination
/// identified by its index into the destination list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKey {
    Node(GraphId),
    Dest(u16),
}

/// One frontier entry of a search.
#[derive(Clone, Debug)]
pub struct Label {
    pub key: LabelKey,
    /// Edge traversed to arrive here; invalid for seed labels.
    pub edgeid: GraphId,
    /// Fractional start of the traversed segment along `edgeid`.
    pub source: f32,
    /// Fractional end of the traversed segment along `edgeid`.
    pub target: f32,
    /// Accumulated cost.
    pub cost: f32,
    /// Accumulated turn penalty contribution.
    pub turn_cost: f32,
    /// `cost` plus the heuristic at this label's endpoint.
    pub sortcost: f32,
    /// Index of the prior label, or [`INVALID_LABEL`] for seeds.
    pub predecessor: u32,
    pub travelmode: TravelMode,
    /// Descriptor of the arrival edge, shared with whoever needs it for
    /// transition-aware filtering.
    pub edgelabel: Option<Arc<EdgeLabel>>,
}

impl Label {
    pub fn nodeid(&self) -> Option<GraphId> {
        match self.key {
            LabelKey::Node(id) => Some(id),
            LabelKey::Dest(_) => None,
        }
    }

    pub fn dest(&self) -> Option<u16> {
        match self.key {
            LabelKey::Node(_) => None,
            LabelKey::Dest(dest) => Some(dest),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Status {
    label_idx: u32,
    permanent: bool,
}

impl Status {
    fn new(label_idx: u32) -> Self {
        Self { label_idx, permanent: false }
    }
}

/// Owns the labels of one search and keeps each key live in the queue at
/// most once.
///
/// `put` is insert-or-decrease: a new key allocates a label and queues it,
/// a known non-permanent key is updated in place when the new sort cost is
/// strictly smaller, and everything else is dropped. `pop` finalizes the
/// cheapest label and trips on the desync conditions that indicate a queue
/// bug or negative costs.
///
/// Labels survive `clear_queue`/`clear_status` so that callers can still
/// walk predecessor chains after a search completes; reusing the set for
/// another search simply appends fresh labels.
pub struct LabelSet {
    labels: Vec<Label>,
    queue: BucketQueue,
    node_status: HashMap<GraphId, Status>,
    dest_status: HashMap<u16, Status>,
    max_cost: f32,
}

impl LabelSet {
    pub fn new(max_cost: f32, bucket_size: f32) -> Self {
        Self {
            labels: Vec::new(),
            queue: BucketQueue::new(max_cost, bucket_size),
            node_status: HashMap::new(),
            dest_status: HashMap::new(),
            max_cost,
        }
    }

    /// Seed label: zero costs, no arrival edge, no predecessor. Serves both
    /// as a queue starter and as the sentinel a predecessor walk ends at.
    pub fn put_seed(
        &mut self,
        key: LabelKey,
        travelmode: TravelMode,
        edgelabel: Option<Arc<EdgeLabel>>,
    ) -> Result<bool> {
        self.put(
            key,
            GraphId::INVALID,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            INVALID_LABEL,
            None,
            travelmode,
            edgelabel,
        )
    }

    /// Insert or decrease the label for `key`. Returns whether anything was
    /// recorded; a sort cost at or beyond the search horizon records
    /// nothing. When `edge` is given, the stored edge label is synthesized
    /// from it; otherwise the caller's `edgelabel` is carried (the seed
    /// case).
    #[allow(clippy::too_many_arguments)]
    pub fn put(
        &mut self,
        key: LabelKey,
        edgeid: GraphId,
        source: f32,
        target: f32,
        cost: f32,
        turn_cost: f32,
        sortcost: f32,
        predecessor: u32,
        edge: Option<&DirectedEdge>,
        travelmode: TravelMode,
        edgelabel: Option<Arc<EdgeLabel>>,
    ) -> Result<bool> {
        let status = match key {
            LabelKey::Node(nodeid) => {
                if !nodeid.is_valid() {
                    return Err(RoutingError::InvalidNodeKey);
                }
                self.node_status.get(&nodeid).copied()
            }
            LabelKey::Dest(dest) => {
                if dest == INVALID_DESTINATION {
                    return Err(RoutingError::InvalidDestinationKey);
                }
                self.dest_status.get(&dest).copied()
            }
        };

        let edgelabel = match edge {
            Some(edge) => Some(Arc::new(EdgeLabel::new(edgeid, edge, travelmode))),
            None => edgelabel,
        };
        let label = Label {
            key,
            edgeid,
            source,
            target,
            cost,
            turn_cost,
            sortcost,
            predecessor,
            travelmode,
            edgelabel,
        };

        match status {
            None => {
                if sortcost >= self.max_cost {
                    return Ok(false);
                }
                let idx = self.labels.len() as u32;
                self.queue.add(idx, sortcost);
                self.labels.push(label);
                match key {
                    LabelKey::Node(nodeid) => {
                        self.node_status.insert(nodeid, Status::new(idx));
                    }
                    LabelKey::Dest(dest) => {
                        self.dest_status.insert(dest, Status::new(idx));
                    }
                }
                Ok(true)
            }
            Some(status) => {
                let idx = status.label_idx;
                if status.permanent || sortcost >= self.labels[idx as usize].sortcost {
                    return Ok(false);
                }
                // The queue locates the item through its current (old)
                // sort cost, so it must move before the label is replaced.
                let (queue, labels) = (&mut self.queue, &self.labels);
                queue.decrease(idx, sortcost, |i| labels[i as usize].sortcost);
                self.labels[idx as usize] = label;
                Ok(true)
            }
        }
    }

    /// Remove the cheapest label from the queue, mark it permanent and
    /// return its index. `None` once the queue is exhausted.
    pub fn pop(&mut self) -> Result<Option<u32>> {
        let (queue, labels) = (&mut self.queue, &self.labels);
        let Some(idx) = queue.pop(|i| labels[i as usize].sortcost) else {
            return Ok(None);
        };

        let status = match self.labels[idx as usize].key {
            LabelKey::Node(nodeid) => self.node_status.get_mut(&nodeid),
            LabelKey::Dest(dest) => self.dest_status.get_mut(&dest),
        }
        .ok_or(RoutingError::StatusMissing)?;

        if status.label_idx != idx {
            return Err(RoutingError::StatusIndexMismatch { status: status.label_idx, popped: idx });
        }
        if status.permanent {
            // The same key surfacing twice means a cheaper path to an
            // already-finalized label appeared later: negative costs or a
            // queue defect.
            return Err(RoutingError::OptimalityViolation);
        }
        status.permanent = true;
        trace!("settled label {idx} at cost {}", self.labels[idx as usize].cost);
        Ok(Some(idx))
    }

    /// Borrow a stored label. The reference must not be held across a
    /// subsequent `put`; the underlying storage may reallocate.
    pub fn label(&self, idx: u32) -> &Label {
        &self.labels[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn clear_status(&mut self) {
        self.node_status.clear();
        self.dest_status.clear();
    }
}
