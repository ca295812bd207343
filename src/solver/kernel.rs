use crate::base::{KernelKind, Precision, SolveConfig};
use crate::StrError;
use russell_lab::{mat_mat_mul, Matrix};

/// Defines the strategy performing the modal projection
///
/// A projection computes the (nnode × ntime) response block
///
/// ```text
/// out = shapes · coords
/// ```
///
/// where `shapes` is (nnode × nmode) and `coords` is (nmode × ntime).
/// Implementations must be pure with respect to `out`: the previous
/// content is overwritten, never accumulated.
pub trait KernelStrategy: Send + Sync {
    /// Returns the kind of this kernel
    fn kind(&self) -> KernelKind;

    /// Computes the projection `out = shapes · coords`
    fn project(&self, out: &mut Matrix, shapes: &Matrix, coords: &Matrix) -> Result<(), StrError>;
}

/// Implements the portable projection kernel with plain loops
///
/// This kernel must work on every machine; it is the fallback of the
/// accelerated kernel. Single precision accumulates the inner products
/// in f32, reproducing the round-off of a genuinely single-precision
/// pipeline.
pub struct VectorizedCpuKernel {
    precision: Precision,
}

/// Implements the projection kernel backed by the BLAS matrix product
///
/// The BLAS product always runs in double precision; the precision
/// setting only affects the memory accounting in this case.
pub struct AcceleratedKernel {}

impl VectorizedCpuKernel {
    /// Allocates a new instance
    pub fn new(precision: Precision) -> Self {
        VectorizedCpuKernel { precision }
    }
}

impl KernelStrategy for VectorizedCpuKernel {
    fn kind(&self) -> KernelKind {
        KernelKind::VectorizedCpu
    }

    fn project(&self, out: &mut Matrix, shapes: &Matrix, coords: &Matrix) -> Result<(), StrError> {
        let (m, n) = out.dims();
        let (ms, ks) = shapes.dims();
        let (kc, nc) = coords.dims();
        if ms != m || nc != n || ks != kc {
            return Err("matrix dimensions are incompatible for the projection");
        }
        match self.precision {
            Precision::Double => {
                for i in 0..m {
                    for j in 0..n {
                        let mut acc = 0.0;
                        for k in 0..ks {
                            acc += shapes.get(i, k) * coords.get(k, j);
                        }
                        out.set(i, j, acc);
                    }
                }
            }
            Precision::Single => {
                for i in 0..m {
                    for j in 0..n {
                        let mut acc = 0.0_f32;
                        for k in 0..ks {
                            acc += (shapes.get(i, k) as f32) * (coords.get(k, j) as f32);
                        }
                        out.set(i, j, acc as f64);
                    }
                }
            }
        }
        Ok(())
    }
}

impl AcceleratedKernel {
    /// Allocates a new instance, probing the backend with a 1×1 product
    pub fn new() -> Result<Self, StrError> {
        let mut probe = Matrix::new(1, 1);
        mat_mat_mul(&mut probe, 1.0, &Matrix::from(&[[1.0]]), &Matrix::from(&[[1.0]]), 0.0)?;
        if probe.get(0, 0) != 1.0 {
            return Err("the accelerated backend returned a wrong product");
        }
        Ok(AcceleratedKernel {})
    }
}

impl KernelStrategy for AcceleratedKernel {
    fn kind(&self) -> KernelKind {
        KernelKind::Accelerated
    }

    fn project(&self, out: &mut Matrix, shapes: &Matrix, coords: &Matrix) -> Result<(), StrError> {
        mat_mat_mul(out, 1.0, shapes, coords, 0.0)
    }
}

/// Allocates the kernel requested by the configuration
///
/// The accelerated kernel is probed first; if the probe fails, the
/// portable kernel takes over and the note carries the reason so the
/// caller can record a warning. The fallback is mandatory: requesting
/// the accelerated kernel never aborts a solve.
pub fn new_kernel(config: &SolveConfig) -> (Box<dyn KernelStrategy>, Option<&'static str>) {
    match config.kernel {
        KernelKind::VectorizedCpu => (Box::new(VectorizedCpuKernel::new(config.precision)), None),
        KernelKind::Accelerated => match AcceleratedKernel::new() {
            Ok(kernel) => (Box::new(kernel), None),
            Err(_) => (
                Box::new(VectorizedCpuKernel::new(config.precision)),
                Some("the accelerated kernel is unavailable; using the vectorized cpu kernel"),
            ),
        },
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
