use crate::base::SolveConfig;
use crate::StrError;
use std::fmt;

/// Splits the node set into chunks that respect the memory budget
///
/// The per-node cost counts every working array the solve keeps alive at
/// once for one node, times the number of time steps, times the size of
/// one value. The chunk width is the largest node count whose cost stays
/// within the budget, clamped to the interval `[1, nnode]`; a budget too
/// small for even one node thus degrades to node-by-node processing
/// instead of failing.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPlan {
    /// Number of nodes per chunk (the last chunk may be narrower)
    pub chunk_nnode: usize,

    /// Total number of chunks
    pub nchunk: usize,

    /// Estimated memory cost of one node in bytes
    pub bytes_per_node: usize,

    /// Total number of nodes
    nnode: usize,
}

impl ChunkPlan {
    /// Allocates a new instance
    pub fn new(config: &SolveConfig, nnode: usize, ntime: usize) -> Result<Self, StrError> {
        if nnode < 1 {
            return Err("the chunk plan requires at least one node");
        }
        if ntime < 1 {
            return Err("the chunk plan requires at least one time step");
        }
        let bytes_per_node = config.precision.bytes_per_value() * ntime * config.working_arrays_per_node();
        let chunk_nnode = usize::max(1, usize::min(config.memory_budget / bytes_per_node, nnode));
        let nchunk = (nnode + chunk_nnode - 1) / chunk_nnode;
        Ok(ChunkPlan {
            chunk_nnode,
            nchunk,
            bytes_per_node,
            nnode,
        })
    }

    /// Returns the half-open node range `start..end` of a chunk
    pub fn range(&self, ichunk: usize) -> (usize, usize) {
        let start = usize::min(ichunk * self.chunk_nnode, self.nnode);
        let end = usize::min(start + self.chunk_nnode, self.nnode);
        (start, end)
    }
}

impl fmt::Display for ChunkPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} node(s) per chunk, {} chunk(s), {} byte(s) per node",
            self.chunk_nnode, self.nchunk, self.bytes_per_node
        )
        .unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
