use core::fmt;

use crate::render_node::NodeId;

/// Errors raised by tree mutation, sequence building, measurement and
/// pagination.
///
/// Everything except [`LayoutError::InvalidMeasurement`] is a caller contract
/// violation: the operation was rejected before touching the tree, and the
/// caller has a defect to fix. None of these are transient.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutError {
    /// Node id does not resolve to a live node in the arena.
    UnknownNode(NodeId),
    /// Operation needs a box but the node is a leaf.
    NotABox(NodeId),
    /// `child` is not currently a child of `parent`.
    NotAChild { parent: NodeId, child: NodeId },
    /// Node is already linked into a box and must be detached first.
    AlreadyLinked(NodeId),
    /// Linking `child` under `parent` would make the tree cyclic.
    WouldCreateCycle { parent: NodeId, child: NodeId },
    /// Geometry value is negative or not finite.
    NonFiniteGeometry { node: NodeId, field: &'static str, value: f32 },
    /// An `End` marker was pushed with no open `Start`, or a sequence was
    /// handed to line packing with markers still open.
    UnbalancedSequence { index: usize, depth: usize },
    /// Chunk iteration requested from an offset that is out of range or not
    /// at nesting depth zero.
    InvalidChunkOffset { offset: usize, len: usize },
    /// Shift-state handle is stale or not at the top of the stack.
    ShiftStateMismatch { depth: usize, expected_depth: usize },
    /// The initial shift state is owned by the stack and cannot be popped.
    PopInitialShiftState,
    /// Measurement collaborator returned an unusable width.
    InvalidMeasurement { text: String, width: f32 },
}

impl LayoutError {
    /// `true` for caller defects, `false` for collaborator failures.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, Self::InvalidMeasurement { .. })
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown render node {:?}", id),
            Self::NotABox(id) => write!(f, "render node {:?} is not a box", id),
            Self::NotAChild { parent, child } => {
                write!(f, "render node {:?} is not a child of {:?}", child, parent)
            }
            Self::AlreadyLinked(id) => write!(f, "render node {:?} is already linked", id),
            Self::WouldCreateCycle { parent, child } => write!(
                f,
                "linking {:?} under {:?} would create a cycle",
                child, parent
            ),
            Self::NonFiniteGeometry { node, field, value } => write!(
                f,
                "invalid geometry on {:?}: {}={} (must be finite, sizes non-negative)",
                node, field, value
            ),
            Self::UnbalancedSequence { index, depth } => write!(
                f,
                "unbalanced inline sequence at element {} (open depth {})",
                index, depth
            ),
            Self::InvalidChunkOffset { offset, len } => write!(
                f,
                "chunk offset {} is not a depth-0 boundary of a sequence of {} elements",
                offset, len
            ),
            Self::ShiftStateMismatch {
                depth,
                expected_depth,
            } => write!(
                f,
                "pagination shift state at depth {} is stale or not on top (top={})",
                depth, expected_depth
            ),
            Self::PopInitialShiftState => write!(f, "initial pagination shift state cannot be popped"),
            Self::InvalidMeasurement { text, width } => {
                write!(f, "text measurer returned width {} for {:?}", width, text)
            }
        }
    }
}

impl std::error::Error for LayoutError {}
