use crate::base::{NodeId, SolveState};
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::path::Path;

/// Holds one non-fatal warning raised during a solve
///
/// Warnings never abort the run; they accumulate in the summary so a
/// caller can audit what degraded (a kernel fallback, a failed node,
/// a non-converged correction) after the fact.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Warning {
    /// Affected node (None for a solve-wide warning)
    pub node_id: Option<NodeId>,

    /// Stage that raised the warning
    ///
    /// One of "reconstruction", "differentiation", "derivation", or "plasticity".
    pub stage: String,

    /// Explains what happened
    pub message: String,
}

impl Warning {
    /// Allocates a solve-wide warning
    pub fn new(stage: &str, message: &str) -> Self {
        Warning {
            node_id: None,
            stage: stage.to_string(),
            message: message.to_string(),
        }
    }

    /// Allocates a warning attached to one node
    pub fn at_node(node_id: NodeId, stage: &str, message: &str) -> Self {
        Warning {
            node_id: Some(node_id),
            stage: stage.to_string(),
            message: message.to_string(),
        }
    }
}

/// Holds the outcome of a solve
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SolveSummary {
    /// Final state of the solve
    pub state: SolveState,

    /// Total number of nodes
    pub nnode: usize,

    /// Number of time steps
    pub ntime: usize,

    /// Number of modes kept in the projection (after skipping)
    pub nmode_used: usize,

    /// Number of chunks committed to the output store
    pub nchunk_committed: usize,

    /// Number of nodes fully processed
    pub nodes_processed: usize,

    /// Number of nodes isolated after a numerical failure
    pub nodes_failed: usize,

    /// Number of nodes whose plasticity correction did not converge
    pub nodes_non_converged: usize,

    /// Largest damage over all nodes (None when damage is disabled)
    pub max_damage: Option<f64>,

    /// Warnings raised during the run
    pub warnings: Vec<Warning>,
}

impl SolveSummary {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        SolveSummary {
            state: SolveState::Idle,
            nnode: 0,
            ntime: 0,
            nmode_used: 0,
            nchunk_committed: 0,
            nodes_processed: 0,
            nodes_failed: 0,
            nodes_non_converged: 0,
            max_damage: None,
            warnings: Vec::new(),
        }
    }

    /// Writes a JSON file with the summary data
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

impl fmt::Display for SolveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Solve summary\n").unwrap();
        write!(f, "=============\n").unwrap();
        write!(f, "state = {:?}\n", self.state).unwrap();
        write!(f, "nnode = {}\n", self.nnode).unwrap();
        write!(f, "ntime = {}\n", self.ntime).unwrap();
        write!(f, "nmode_used = {}\n", self.nmode_used).unwrap();
        write!(f, "nchunk_committed = {}\n", self.nchunk_committed).unwrap();
        write!(f, "nodes_processed = {}\n", self.nodes_processed).unwrap();
        write!(f, "nodes_failed = {}\n", self.nodes_failed).unwrap();
        write!(f, "nodes_non_converged = {}\n", self.nodes_non_converged).unwrap();
        match self.max_damage {
            Some(value) => write!(f, "max_damage = {:?}\n", value).unwrap(),
            None => write!(f, "max_damage = none\n").unwrap(),
        }
        if self.warnings.is_empty() {
            write!(f, "warnings = none\n").unwrap();
        } else {
            write!(f, "warnings:\n").unwrap();
            for warning in &self.warnings {
                match warning.node_id {
                    Some(id) => write!(f, "  [{}] node {}: {}\n", warning.stage, id, warning.message).unwrap(),
                    None => write!(f, "  [{}] {}\n", warning.stage, warning.message).unwrap(),
                }
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{SolveSummary, Warning};
    use crate::base::SolveState;

    #[test]
    fn new_works() {
        let summary = SolveSummary::new();
        assert_eq!(summary.state, SolveState::Idle);
        assert_eq!(summary.nodes_processed, 0);
        assert_eq!(summary.max_damage, None);
        assert_eq!(summary.warnings.len(), 0);
    }

    #[test]
    fn display_works() {
        let mut summary = SolveSummary::new();
        summary.state = SolveState::Completed;
        summary.nnode = 4;
        summary.ntime = 100;
        summary.nodes_processed = 3;
        summary.nodes_failed = 1;
        summary.warnings.push(Warning::new("reconstruction", "kernel fallback"));
        summary.warnings.push(Warning::at_node(77, "plasticity", "no convergence"));
        let text = format!("{}", summary);
        assert!(text.contains("state = Completed"));
        assert!(text.contains("nodes_failed = 1"));
        assert!(text.contains("max_damage = none"));
        assert!(text.contains("[reconstruction] kernel fallback"));
        assert!(text.contains("[plasticity] node 77: no convergence"));
    }

    #[test]
    fn derive_works() {
        let mut summary = SolveSummary::new();
        summary.state = SolveState::Cancelled;
        summary.max_damage = Some(0.25);
        summary.warnings.push(Warning::at_node(3, "derivation", "non-finite value"));
        let json = serde_json::to_string(&summary).unwrap();
        let read: SolveSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(read.state, SolveState::Cancelled);
        assert_eq!(read.max_damage, Some(0.25));
        assert_eq!(read.warnings[0].node_id, Some(3));
        assert_eq!(read.warnings[0].stage, "derivation");
    }
}
