use crate::base::{ModalCoordinates, ModeShapeSet, SolveConfig, SteadyStateField};
use crate::solver::{new_kernel, KernelStrategy};
use crate::StrError;
use rayon::prelude::*;
use russell_lab::Matrix;

/// Performs the modal superposition for chunks of nodes
///
/// The reconstruction of one stress component c over a chunk of nodes is
///
/// ```text
/// σc = Φc · q      (nnode_chunk × ntime)
/// ```
///
/// where `Φc` holds the kept shape columns of the chunk's nodes and `q`
/// the kept modal coordinate rows. Skipped modes are excluded from both
/// factors. The steady-state bias, when attached and enabled, is added
/// to every time step of the affected nodes after the projection.
pub struct Reconstructor<'a> {
    /// Modal coordinates
    coords: &'a ModalCoordinates,

    /// Mode shapes
    shapes: &'a ModeShapeSet,

    /// Steady-state bias (None when disabled or absent)
    steady: Option<&'a SteadyStateField>,

    /// Projection kernel
    kernel: Box<dyn KernelStrategy>,

    /// Number of skipped leading modes
    skip_modes: usize,

    /// Kept modal coordinate rows (nmode_used × ntime)
    q_used: Matrix,

    /// Reason of a kernel fallback, if one happened
    pub fallback_note: Option<&'static str>,
}

impl<'a> Reconstructor<'a> {
    /// Allocates a new instance
    ///
    /// The steady-state field is ignored when the configuration disables it.
    pub fn new(
        config: &SolveConfig,
        coords: &'a ModalCoordinates,
        shapes: &'a ModeShapeSet,
        steady: Option<&'a SteadyStateField>,
    ) -> Result<Self, StrError> {
        let nmode = coords.nmode();
        if shapes.nmode() != nmode {
            return Err("mode shape set and modal coordinates must have the same number of modes");
        }
        if config.skip_modes >= nmode {
            return Err("skip_modes must be smaller than the number of modes");
        }
        let nmode_used = nmode - config.skip_modes;
        let ntime = coords.ntime();
        let mut q_used = Matrix::new(nmode_used, ntime);
        for m in 0..nmode_used {
            for k in 0..ntime {
                q_used.set(m, k, coords.q.get(config.skip_modes + m, k));
            }
        }
        let (kernel, fallback_note) = new_kernel(config);
        Ok(Reconstructor {
            coords,
            shapes,
            steady: if config.include_steady_state { steady } else { None },
            kernel,
            skip_modes: config.skip_modes,
            q_used,
            fallback_note,
        })
    }

    /// Returns the number of modes kept in the projection
    pub fn nmode_used(&self) -> usize {
        self.q_used.dims().0
    }

    /// Returns the number of time steps
    pub fn ntime(&self) -> usize {
        self.q_used.dims().1
    }

    /// Reconstructs the six stress component histories of a chunk
    ///
    /// The output matrices must be (end-start × ntime); they are fully
    /// overwritten in the component order xx, yy, zz, xy, yz, xz.
    pub fn stress_chunk(&self, out: &mut [Matrix; 6], start: usize, end: usize) -> Result<(), StrError> {
        let (nmode_used, ntime) = self.q_used.dims();
        if start >= end || end > self.shapes.nnode() {
            return Err("the node range is out of bounds");
        }
        let width = end - start;
        let components = self.shapes.stress_components();
        let mut sub = Matrix::new(width, nmode_used);
        for c in 0..6 {
            for i in 0..width {
                for m in 0..nmode_used {
                    sub.set(i, m, components[c].get(start + i, self.skip_modes + m));
                }
            }
            self.kernel.project(&mut out[c], &sub, &self.q_used)?;
        }
        if let Some(field) = self.steady {
            for i in 0..width {
                let bias = field.bias_of(self.shapes.node_ids[start + i]);
                for c in 0..6 {
                    if bias[c] != 0.0 {
                        for j in 0..ntime {
                            out[c].set(i, j, out[c].get(i, j) + bias[c]);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Reconstructs the three displacement component histories of a chunk
    ///
    /// The output matrices must be (end-start × ntime); they are fully
    /// overwritten in the component order x, y, z.
    pub fn displacement_chunk(&self, out: &mut [Matrix; 3], start: usize, end: usize) -> Result<(), StrError> {
        let components = match self.shapes.disp_components() {
            Some(c) => c,
            None => return Err("kinematic outputs require displacement shapes"),
        };
        let (nmode_used, _) = self.q_used.dims();
        if start >= end || end > self.shapes.nnode() {
            return Err("the node range is out of bounds");
        }
        let width = end - start;
        let mut sub = Matrix::new(width, nmode_used);
        for c in 0..3 {
            for i in 0..width {
                for m in 0..nmode_used {
                    sub.set(i, m, components[c].get(start + i, self.skip_modes + m));
                }
            }
            self.kernel.project(&mut out[c], &sub, &self.q_used)?;
        }
        Ok(())
    }

    /// Reconstructs the full stress history of one node (by row index)
    pub fn stress_history(&self, index: usize) -> Result<Vec<[f64; 6]>, StrError> {
        let ntime = self.ntime();
        let mut out = [
            Matrix::new(1, ntime),
            Matrix::new(1, ntime),
            Matrix::new(1, ntime),
            Matrix::new(1, ntime),
            Matrix::new(1, ntime),
            Matrix::new(1, ntime),
        ];
        self.stress_chunk(&mut out, index, index + 1)?;
        let mut history = vec![[0.0; 6]; ntime];
        for j in 0..ntime {
            for c in 0..6 {
                history[j][c] = out[c].get(0, j);
            }
        }
        Ok(history)
    }

    /// Reconstructs the full displacement history of one node (by row index)
    pub fn displacement_history(&self, index: usize) -> Result<Vec<[f64; 3]>, StrError> {
        let ntime = self.ntime();
        let mut out = [Matrix::new(1, ntime), Matrix::new(1, ntime), Matrix::new(1, ntime)];
        self.displacement_chunk(&mut out, index, index + 1)?;
        let mut history = vec![[0.0; 3]; ntime];
        for j in 0..ntime {
            for c in 0..3 {
                history[j][c] = out[c].get(0, j);
            }
        }
        Ok(history)
    }

    /// Reconstructs the stress state of all nodes at one time instant
    pub fn stress_at_time(&self, index: usize) -> Result<Vec<[f64; 6]>, StrError> {
        let (nmode_used, ntime) = self.q_used.dims();
        if index >= ntime {
            return Err("the time index is out of range");
        }
        let components = self.shapes.stress_components();
        let nnode = self.shapes.nnode();
        let states: Vec<[f64; 6]> = (0..nnode)
            .into_par_iter()
            .map(|i| {
                let mut sigma = [0.0; 6];
                for c in 0..6 {
                    let mut acc = 0.0;
                    for m in 0..nmode_used {
                        acc += components[c].get(i, self.skip_modes + m) * self.q_used.get(m, index);
                    }
                    sigma[c] = acc;
                }
                if let Some(field) = self.steady {
                    let bias = field.bias_of(self.shapes.node_ids[i]);
                    for c in 0..6 {
                        sigma[c] += bias[c];
                    }
                }
                sigma
            })
            .collect();
        Ok(states)
    }

    /// Returns the time vector as a plain array
    pub fn time_array(&self) -> Vec<f64> {
        self.coords.time.as_data().clone()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
