use super::{DisplacementShapes, ModalCoordinates, ModeShapeSet};
use russell_lab::{Matrix, Vector};
use std::f64::consts::PI;

/// Holds sample modal data for tests and examples
pub struct SampleData {}

impl SampleData {
    /// Returns a two-mode, three-step case with a single node
    ///
    /// The modal amplitudes and unit shape rows are chosen such that the
    /// reconstructed histories are
    ///
    /// ```text
    /// σxx(t) = {1, 2, 3}    σyy(t) = {0, 1, 0}
    /// ```
    ///
    /// with all other components zero, over times {0, 1, 2} s.
    pub fn two_mode_three_step() -> (ModalCoordinates, ModeShapeSet) {
        let q = Matrix::from(&[
            [1.0, 2.0, 3.0], // mode 1
            [0.0, 1.0, 0.0], // mode 2
        ]);
        let time = Vector::from(&[0.0, 1.0, 2.0]);
        let coords = ModalCoordinates::new(q, time).unwrap();
        let shapes = ModeShapeSet::new(
            vec![1],
            Matrix::from(&[[1.0, 0.0]]), // σxx tracks mode 1
            Matrix::from(&[[0.0, 1.0]]), // σyy tracks mode 2
            Matrix::new(1, 2),
            Matrix::new(1, 2),
            Matrix::new(1, 2),
            Matrix::new(1, 2),
            None,
        )
        .unwrap();
        (coords, shapes)
    }

    /// Returns a two-mode sinusoidal case with many nodes
    ///
    /// Mode 1 follows a 5 Hz sine and mode 2 a 9 Hz cosine over a uniform
    /// 10 ms grid. The shape rows vary deterministically with the node
    /// index so per-node extrema differ. Node ids start at 1.
    /// Displacement shapes are included.
    pub fn wave_case(nnode: usize, ntime: usize) -> (ModalCoordinates, ModeShapeSet) {
        assert!(nnode >= 1 && ntime >= 2);
        let dt = 0.01;
        let mut q = Matrix::new(2, ntime);
        let mut time = Vector::new(ntime);
        for k in 0..ntime {
            let t = (k as f64) * dt;
            time[k] = t;
            q.set(0, k, f64::sin(2.0 * PI * 5.0 * t));
            q.set(1, k, 0.5 * f64::cos(2.0 * PI * 9.0 * t));
        }
        let coords = ModalCoordinates::new(q, time).unwrap();

        let mut sxx = Matrix::new(nnode, 2);
        let mut syy = Matrix::new(nnode, 2);
        let mut szz = Matrix::new(nnode, 2);
        let mut sxy = Matrix::new(nnode, 2);
        let mut syz = Matrix::new(nnode, 2);
        let mut sxz = Matrix::new(nnode, 2);
        let mut ux = Matrix::new(nnode, 2);
        let mut uy = Matrix::new(nnode, 2);
        let mut uz = Matrix::new(nnode, 2);
        let mut node_ids = Vec::with_capacity(nnode);
        for i in 0..nnode {
            node_ids.push(i + 1);
            let a = 100.0 + ((i % 7) as f64) * 10.0;
            let b = 20.0 + ((i % 5) as f64) * 5.0;
            sxx.set(i, 0, a);
            sxx.set(i, 1, b);
            syy.set(i, 0, 0.3 * a);
            syy.set(i, 1, -0.2 * b);
            szz.set(i, 0, 0.1 * a);
            szz.set(i, 1, 0.05 * b);
            sxy.set(i, 0, 0.2 * a);
            sxy.set(i, 1, 0.1 * b);
            syz.set(i, 0, 0.05 * a);
            syz.set(i, 1, -0.02 * b);
            sxz.set(i, 0, 0.02 * a);
            sxz.set(i, 1, 0.01 * b);
            ux.set(i, 0, 1e-3 * a);
            ux.set(i, 1, 5e-4 * b);
            uy.set(i, 0, 8e-4 * a);
            uy.set(i, 1, -3e-4 * b);
            uz.set(i, 0, 2e-4 * a);
            uz.set(i, 1, 1e-4 * b);
        }
        let displacement = DisplacementShapes { ux, uy, uz };
        let shapes = ModeShapeSet::new(node_ids, sxx, syy, szz, sxy, syz, sxz, Some(displacement)).unwrap();
        (coords, shapes)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
