use crate::base::{AnalysisMode, NodeId, Quantity, SolveState};
use crate::material::{CorrectedHistory, CorrectionResult};
use crate::solver::DamageRecord;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the invariants of a solve, announced before the first chunk
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoreHeader {
    /// Requested quantities in output order
    pub quantities: Vec<Quantity>,

    /// Node ids in storage order
    pub node_ids: Vec<NodeId>,

    /// Time vector shared by all histories
    pub time: Vec<f64>,

    /// Analysis mode of the run
    pub mode: AnalysisMode,
}

/// Holds the extremes of one quantity over one chunk of nodes
///
/// The per-node vectors span the chunk width; the envelope spans the full
/// time vector and carries the maximum over the chunk's nodes at every
/// step. Nodes isolated after a failure keep NaN entries.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuantityExtremes {
    /// Quantity these extremes belong to
    pub quantity: Quantity,

    /// Largest value per node
    pub max_value: Vec<f64>,

    /// Time of the largest value per node
    pub time_of_max: Vec<f64>,

    /// Smallest value per node
    pub min_value: Vec<f64>,

    /// Time of the smallest value per node
    pub time_of_min: Vec<f64>,

    /// Maximum over the chunk's nodes at every time step
    pub envelope: Vec<f64>,
}

/// Holds everything one chunk contributes to the output
///
/// A chunk is committed atomically: either all of its results reach the
/// store or none do. Node indices are global (into the header's ids).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChunkResults {
    /// First (global) node index of the chunk
    pub start: usize,

    /// One-past-last (global) node index of the chunk
    pub end: usize,

    /// Extremes of every requested quantity
    pub extremes: Vec<QuantityExtremes>,

    /// Corrected peak stress per node (when the correction is enabled)
    pub corrected: Option<Vec<CorrectionResult>>,

    /// Cumulative damage per node (when damage is enabled)
    pub damage: Option<Vec<f64>>,

    /// Global indices of nodes isolated after a numerical failure
    pub failed: Vec<usize>,
}

/// Holds the full response history of a single node
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NodeHistory {
    /// Node id
    pub node_id: NodeId,

    /// Time vector
    pub time: Vec<f64>,

    /// Stress components (xx, yy, zz, xy, yz, xz) per time step
    pub stress_components: Vec<[f64; 6]>,

    /// Von Mises history
    pub von_mises: Option<Vec<f64>>,

    /// Maximum principal stress history
    pub max_principal: Option<Vec<f64>>,

    /// Minimum principal stress history
    pub min_principal: Option<Vec<f64>>,

    /// Displacement magnitude history
    pub displacement: Option<Vec<f64>>,

    /// Velocity magnitude history
    pub velocity: Option<Vec<f64>>,

    /// Acceleration magnitude history
    pub acceleration: Option<Vec<f64>>,

    /// Elastic-plastic corrected history (when the correction is enabled)
    pub corrected: Option<CorrectedHistory>,

    /// Rainflow cycles and Miner damage (when damage is enabled)
    pub damage: Option<DamageRecord>,
}

/// Defines the destination of solve results
///
/// The solver talks to the store through this trait only; swapping an
/// in-memory store for one writing files touches no solver code. Chunks
/// may arrive in any order but never overlap.
pub trait OutputStoreTrait: Send {
    /// Announces the invariants of the solve before the first chunk
    fn begin(&mut self, header: &StoreHeader) -> Result<(), StrError>;

    /// Commits the results of one chunk
    fn commit_chunk(&mut self, results: &ChunkResults) -> Result<(), StrError>;

    /// Commits the full history of a single node
    fn commit_history(&mut self, history: &NodeHistory) -> Result<(), StrError>;

    /// Records the final state of the solve
    fn finalize(&mut self, state: SolveState) -> Result<(), StrError>;
}

/// Holds the accumulated extremes of one quantity over all nodes
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuantityTrack {
    /// Quantity this track belongs to
    pub quantity: Quantity,

    /// Largest value per node (NaN until the node's chunk commits)
    pub max_value: Vec<f64>,

    /// Time of the largest value per node
    pub time_of_max: Vec<f64>,

    /// Smallest value per node
    pub min_value: Vec<f64>,

    /// Time of the smallest value per node
    pub time_of_min: Vec<f64>,

    /// Maximum over all committed nodes at every time step
    pub envelope: Vec<f64>,
}

/// Implements an output store keeping everything in memory
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InMemoryStore {
    /// Header of the running solve (set by begin)
    pub header: Option<StoreHeader>,

    /// One track per requested quantity
    pub tracks: Vec<QuantityTrack>,

    /// Corrected peak stress per node
    pub corrected: Vec<Option<CorrectionResult>>,

    /// Cumulative damage per node
    pub damage: Vec<Option<f64>>,

    /// Ids of nodes isolated after a numerical failure
    pub failed_nodes: Vec<NodeId>,

    /// Full history of the selected node (single-node mode)
    pub history: Option<NodeHistory>,

    /// State recorded by finalize
    pub state: SolveState,
}

impl QuantityExtremes {
    /// Allocates a new instance for a chunk of `width` nodes
    pub fn new(quantity: Quantity, width: usize, ntime: usize) -> Self {
        QuantityExtremes {
            quantity,
            max_value: vec![f64::NAN; width],
            time_of_max: vec![f64::NAN; width],
            min_value: vec![f64::NAN; width],
            time_of_min: vec![f64::NAN; width],
            envelope: vec![f64::NEG_INFINITY; ntime],
        }
    }

    /// Records the extremes of one node's history row
    ///
    /// On ties, the earliest time wins. `local` indexes into the chunk.
    pub fn record(&mut self, local: usize, time: &[f64], row: &[f64]) {
        if row.is_empty() {
            return;
        }
        let mut imax = 0;
        let mut imin = 0;
        for j in 1..row.len() {
            if row[j] > row[imax] {
                imax = j;
            }
            if row[j] < row[imin] {
                imin = j;
            }
        }
        self.max_value[local] = row[imax];
        self.time_of_max[local] = time[imax];
        self.min_value[local] = row[imin];
        self.time_of_min[local] = time[imin];
        for (j, &value) in row.iter().enumerate() {
            if value > self.envelope[j] {
                self.envelope[j] = value;
            }
        }
    }
}

impl InMemoryStore {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        InMemoryStore {
            header: None,
            tracks: Vec::new(),
            corrected: Vec::new(),
            damage: Vec::new(),
            failed_nodes: Vec::new(),
            history: None,
            state: SolveState::Idle,
        }
    }

    /// Returns the track of a quantity, if requested
    pub fn track_of(&self, quantity: Quantity) -> Option<&QuantityTrack> {
        self.tracks.iter().find(|t| t.quantity == quantity)
    }

    /// Reads a JSON file containing the store data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let store = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(store)
    }

    /// Writes a JSON file with the store data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

impl OutputStoreTrait for InMemoryStore {
    fn begin(&mut self, header: &StoreHeader) -> Result<(), StrError> {
        let nnode = header.node_ids.len();
        let ntime = header.time.len();
        self.tracks = header
            .quantities
            .iter()
            .map(|&quantity| QuantityTrack {
                quantity,
                max_value: vec![f64::NAN; nnode],
                time_of_max: vec![f64::NAN; nnode],
                min_value: vec![f64::NAN; nnode],
                time_of_min: vec![f64::NAN; nnode],
                envelope: vec![f64::NEG_INFINITY; ntime],
            })
            .collect();
        self.corrected = vec![None; nnode];
        self.damage = vec![None; nnode];
        self.failed_nodes = Vec::new();
        self.history = None;
        self.state = SolveState::Running;
        self.header = Some(header.clone());
        Ok(())
    }

    fn commit_chunk(&mut self, results: &ChunkResults) -> Result<(), StrError> {
        let header = match &self.header {
            Some(h) => h,
            None => return Err("the store must be started before committing"),
        };
        let nnode = header.node_ids.len();
        let ntime = header.time.len();
        if results.start > results.end || results.end > nnode {
            return Err("the chunk node range is out of bounds");
        }
        let width = results.end - results.start;
        for extremes in &results.extremes {
            if extremes.max_value.len() != width
                || extremes.time_of_max.len() != width
                || extremes.min_value.len() != width
                || extremes.time_of_min.len() != width
                || extremes.envelope.len() != ntime
            {
                return Err("the chunk extremes do not match the chunk dimensions");
            }
            let track = self
                .tracks
                .iter_mut()
                .find(|t| t.quantity == extremes.quantity)
                .ok_or("the chunk carries a quantity missing from the header")?;
            track.max_value[results.start..results.end].copy_from_slice(&extremes.max_value);
            track.time_of_max[results.start..results.end].copy_from_slice(&extremes.time_of_max);
            track.min_value[results.start..results.end].copy_from_slice(&extremes.min_value);
            track.time_of_min[results.start..results.end].copy_from_slice(&extremes.time_of_min);
            for (j, &value) in extremes.envelope.iter().enumerate() {
                if value > track.envelope[j] {
                    track.envelope[j] = value;
                }
            }
        }
        if let Some(corrected) = &results.corrected {
            if corrected.len() != width {
                return Err("the chunk correction results do not match the chunk width");
            }
            for (i, result) in corrected.iter().enumerate() {
                self.corrected[results.start + i] = Some(*result);
            }
        }
        if let Some(damage) = &results.damage {
            if damage.len() != width {
                return Err("the chunk damage values do not match the chunk width");
            }
            for (i, &value) in damage.iter().enumerate() {
                self.damage[results.start + i] = Some(value);
            }
        }
        for &k in &results.failed {
            if k >= nnode {
                return Err("a failed node index is out of bounds");
            }
            self.failed_nodes.push(header.node_ids[k]);
        }
        Ok(())
    }

    fn commit_history(&mut self, history: &NodeHistory) -> Result<(), StrError> {
        if self.header.is_none() {
            return Err("the store must be started before committing");
        }
        self.history = Some(history.clone());
        Ok(())
    }

    fn finalize(&mut self, state: SolveState) -> Result<(), StrError> {
        self.state = state;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
