use super::{NodeId, UNIFORM_DT_RTOL};
use crate::StrError;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Holds the modal coordinate histories
///
/// The matrix `q` stores one row per mode and one column per time instant:
///
/// ```text
/// q[m][k] = amplitude of mode m at time[k]
/// ```
///
/// The data is immutable after construction; the solver borrows it and
/// never copies the full matrix.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModalCoordinates {
    /// Modal amplitudes (nmode × ntime)
    pub q: Matrix,

    /// Time instants (ntime), strictly increasing
    pub time: Vector,
}

impl ModalCoordinates {
    /// Allocates a new instance
    pub fn new(q: Matrix, time: Vector) -> Result<Self, StrError> {
        let (nmode, ntime) = q.dims();
        if nmode < 1 {
            return Err("at least one mode is required");
        }
        if ntime < 1 {
            return Err("at least one time point is required");
        }
        if time.dim() != ntime {
            return Err("time array length must match the number of time columns");
        }
        for k in 1..ntime {
            if time[k] <= time[k - 1] {
                return Err("time values must be strictly increasing");
            }
        }
        Ok(ModalCoordinates { q, time })
    }

    /// Returns the number of modes
    pub fn nmode(&self) -> usize {
        self.q.dims().0
    }

    /// Returns the number of time points
    pub fn ntime(&self) -> usize {
        self.q.dims().1
    }

    /// Returns the time step if the grid is (nearly) uniform
    ///
    /// Returns None when fewer than two instants exist or when the spacing
    /// deviates from the first interval by more than a small relative
    /// tolerance. Finite differences require a uniform grid.
    pub fn uniform_dt(&self) -> Option<f64> {
        let ntime = self.ntime();
        if ntime < 2 {
            return None;
        }
        let dt = self.time[1] - self.time[0];
        for k in 2..ntime {
            let dk = self.time[k] - self.time[k - 1];
            if f64::abs(dk - dt) > UNIFORM_DT_RTOL * dt {
                return None;
            }
        }
        Some(dt)
    }
}

/// Holds the per-mode displacement shapes of all nodes
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DisplacementShapes {
    /// Shapes of the x-displacement (nnode × nmode)
    pub ux: Matrix,

    /// Shapes of the y-displacement (nnode × nmode)
    pub uy: Matrix,

    /// Shapes of the z-displacement (nnode × nmode)
    pub uz: Matrix,
}

/// Holds the per-mode stress shapes of all nodes
///
/// Each component matrix stores one row per node and one column per mode.
/// The mode count must match the one of [`ModalCoordinates`]; the solver
/// checks this before any chunk runs.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModeShapeSet {
    /// External identifiers of the nodes (nnode)
    pub node_ids: Vec<NodeId>,

    /// Shapes of the normal stress σxx (nnode × nmode)
    pub sxx: Matrix,

    /// Shapes of the normal stress σyy (nnode × nmode)
    pub syy: Matrix,

    /// Shapes of the normal stress σzz (nnode × nmode)
    pub szz: Matrix,

    /// Shapes of the shear stress σxy (nnode × nmode)
    pub sxy: Matrix,

    /// Shapes of the shear stress σyz (nnode × nmode)
    pub syz: Matrix,

    /// Shapes of the shear stress σxz (nnode × nmode)
    pub sxz: Matrix,

    /// Optional displacement shapes (required for kinematic outputs)
    pub displacement: Option<DisplacementShapes>,

    /// Maps a node id to its row index
    id2k: HashMap<NodeId, usize>,
}

impl ModeShapeSet {
    /// Allocates a new instance
    #[rustfmt::skip]
    pub fn new(
        node_ids: Vec<NodeId>,
        sxx: Matrix, syy: Matrix, szz: Matrix,
        sxy: Matrix, syz: Matrix, sxz: Matrix,
        displacement: Option<DisplacementShapes>,
    ) -> Result<Self, StrError> {
        let (nnode, nmode) = sxx.dims();
        if nnode < 1 {
            return Err("at least one node is required");
        }
        if nmode < 1 {
            return Err("at least one mode is required");
        }
        if node_ids.len() != nnode {
            return Err("node ids length must match the number of rows of the shape matrices");
        }
        for mat in [&syy, &szz, &sxy, &syz, &sxz] {
            if mat.dims() != (nnode, nmode) {
                return Err("all stress shape matrices must have the same dimensions");
            }
        }
        if let Some(disp) = &displacement {
            for mat in [&disp.ux, &disp.uy, &disp.uz] {
                if mat.dims() != (nnode, nmode) {
                    return Err("displacement shape matrices must have the same dimensions as the stress shapes");
                }
            }
        }
        let mut id2k = HashMap::with_capacity(nnode);
        for (k, id) in node_ids.iter().enumerate() {
            if id2k.insert(*id, k).is_some() {
                return Err("node ids must be unique");
            }
        }
        Ok(ModeShapeSet { node_ids, sxx, syy, szz, sxy, syz, sxz, displacement, id2k })
    }

    /// Returns the number of nodes
    pub fn nnode(&self) -> usize {
        self.sxx.dims().0
    }

    /// Returns the number of modes
    pub fn nmode(&self) -> usize {
        self.sxx.dims().1
    }

    /// Returns the row index of a node given its external id
    pub fn index_of(&self, node_id: NodeId) -> Option<usize> {
        self.id2k.get(&node_id).copied()
    }

    /// Returns the six stress shape matrices in the order xx, yy, zz, xy, yz, xz
    pub fn stress_components(&self) -> [&Matrix; 6] {
        [&self.sxx, &self.syy, &self.szz, &self.sxy, &self.syz, &self.sxz]
    }

    /// Returns the three displacement shape matrices in the order x, y, z
    pub fn disp_components(&self) -> Option<[&Matrix; 3]> {
        self.displacement.as_ref().map(|d| [&d.ux, &d.uy, &d.uz])
    }
}

/// Holds a static stress bias added after the modal reconstruction
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SteadyStateField {
    /// External identifiers of the nodes with a bias (nbias)
    pub node_ids: Vec<NodeId>,

    /// Bias components in the order xx, yy, zz, xy, yz, xz (6 × nbias)
    pub components: Vec<[f64; 6]>,

    /// Maps a node id to its entry index
    id2k: HashMap<NodeId, usize>,
}

impl SteadyStateField {
    /// Allocates a new instance
    pub fn new(node_ids: Vec<NodeId>, components: Vec<[f64; 6]>) -> Result<Self, StrError> {
        if node_ids.len() != components.len() {
            return Err("node ids and bias components must have the same length");
        }
        let mut id2k = HashMap::with_capacity(node_ids.len());
        for (k, id) in node_ids.iter().enumerate() {
            if id2k.insert(*id, k).is_some() {
                return Err("node ids must be unique");
            }
        }
        Ok(SteadyStateField {
            node_ids,
            components,
            id2k,
        })
    }

    /// Returns the bias components of a node (zeros if the node has no bias)
    pub fn bias_of(&self, node_id: NodeId) -> [f64; 6] {
        match self.id2k.get(&node_id) {
            Some(k) => self.components[*k],
            None => [0.0; 6],
        }
    }
}

/// Holds per-node temperatures used by the material queries
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TemperatureField {
    /// External identifiers of the nodes with a temperature (nset)
    pub node_ids: Vec<NodeId>,

    /// Temperatures aligned with the node ids (nset)
    pub values: Vec<f64>,

    /// Maps a node id to its entry index
    id2k: HashMap<NodeId, usize>,
}

impl TemperatureField {
    /// Allocates a new instance
    pub fn new(node_ids: Vec<NodeId>, values: Vec<f64>) -> Result<Self, StrError> {
        if node_ids.len() != values.len() {
            return Err("node ids and temperatures must have the same length");
        }
        let mut id2k = HashMap::with_capacity(node_ids.len());
        for (k, id) in node_ids.iter().enumerate() {
            if id2k.insert(*id, k).is_some() {
                return Err("node ids must be unique");
            }
        }
        Ok(TemperatureField { node_ids, values, id2k })
    }

    /// Returns the temperature of a node or the fallback value
    pub fn temperature_of(&self, node_id: NodeId, fallback: f64) -> f64 {
        match self.id2k.get(&node_id) {
            Some(k) => self.values[*k],
            None => fallback,
        }
    }

    /// Maps the field onto an ordered list of nodes, filling gaps with the fallback
    pub fn map_to(&self, node_ids: &[NodeId], fallback: f64) -> Vec<f64> {
        node_ids.iter().map(|id| self.temperature_of(*id, fallback)).collect()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
