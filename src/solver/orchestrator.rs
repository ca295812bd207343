use crate::base::{AnalysisMode, ModalCoordinates, ModeShapeSet, NodeId, Quantity};
use crate::base::{SolveConfig, SolveState, SteadyStateField, TemperatureField};
use crate::material::{CorrectionResult, Corrector, MaterialDatabase};
use crate::solver::{accumulate_damage, deriv1_uniform, deriv2_uniform, magnitude3, principal_stresses, von_mises};
use crate::solver::{CancelToken, ChunkPlan, ChunkResults, InMemoryStore, NodeHistory, OutputStoreTrait};
use crate::solver::{ProgressSink, QuantityExtremes, Reconstructor, SolveSummary, StoreHeader, Warning};
use crate::StrError;
use rayon::prelude::*;
use russell_lab::Matrix;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::thread::JoinHandle;

/// Runs the modal superposition analysis
///
/// In batch mode, the node set is split into chunks sized by the memory
/// budget; each chunk is reconstructed, derived, and committed to the
/// output store before the next one starts, so the peak footprint stays
/// within the budget no matter how many nodes the model has. A node whose
/// values turn non-finite is excluded and reported; the rest of the chunk
/// proceeds. In single-node mode, the full history of one node is
/// materialized instead.
pub struct Solver<'a> {
    /// Configuration
    config: &'a SolveConfig,

    /// Modal coordinates
    coords: &'a ModalCoordinates,

    /// Mode shapes
    shapes: &'a ModeShapeSet,

    /// Material database (required when the correction is enabled)
    material: Option<&'a MaterialDatabase>,

    /// Per-node temperatures (the default temperature fills the gaps)
    temperatures: Option<&'a TemperatureField>,

    /// Reconstruction engine
    recon: Reconstructor<'a>,

    /// Notch correction facade (allocated when the correction is enabled)
    corrector: Option<Corrector>,

    /// Chunk plan of the batch mode
    plan: ChunkPlan,
}

impl<'a> Solver<'a> {
    /// Allocates a new instance
    ///
    /// All preconditions are checked here; a solve that starts can only
    /// end in the Completed, Cancelled, or Failed state, never abort on
    /// missing inputs.
    pub fn new(
        config: &'a SolveConfig,
        coords: &'a ModalCoordinates,
        shapes: &'a ModeShapeSet,
        material: Option<&'a MaterialDatabase>,
        temperatures: Option<&'a TemperatureField>,
        steady: Option<&'a SteadyStateField>,
    ) -> Result<Self, StrError> {
        if let Some(_) = config.validate() {
            return Err("solve configuration is invalid");
        }
        if config.correction_enabled() && material.is_none() {
            return Err("the plasticity correction requires a material database");
        }
        let needs_disp = config.displacement || config.velocity || config.acceleration;
        if needs_disp && shapes.displacement.is_none() {
            return Err("kinematic outputs require displacement shapes");
        }
        if (config.velocity || config.acceleration) && coords.ntime() < 2 {
            return Err("velocity and acceleration require at least two time steps");
        }
        if let AnalysisMode::SingleNode(node_id) = config.mode {
            if shapes.index_of(node_id).is_none() {
                return Err("the selected node id is not in the mode shape set");
            }
        }
        let recon = Reconstructor::new(config, coords, shapes, steady)?;
        let corrector = match &config.plasticity {
            Some(param) => Some(Corrector::new(param)?),
            None => None,
        };
        let plan = ChunkPlan::new(config, shapes.nnode(), coords.ntime())?;
        Ok(Solver {
            config,
            coords,
            shapes,
            material,
            temperatures,
            recon,
            corrector,
            plan,
        })
    }

    /// Returns the chunk plan of the batch mode
    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Runs the analysis and commits the results to the output store
    ///
    /// Progress is reported after every committed chunk; the cancel token
    /// is honored at chunk boundaries. Returns the summary of the run;
    /// an Err return means a precondition or store failure, never a
    /// per-node numerical problem (those become warnings).
    pub fn solve(
        &self,
        store: &mut dyn OutputStoreTrait,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<SolveSummary, StrError> {
        match self.config.mode {
            AnalysisMode::Batch => self.solve_batch(store, sink, cancel),
            AnalysisMode::SingleNode(node_id) => self.solve_single(node_id, store, sink, cancel),
        }
    }

    /// Runs the chunked sweep over all nodes
    fn solve_batch(
        &self,
        store: &mut dyn OutputStoreTrait,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<SolveSummary, StrError> {
        let ntime = self.coords.ntime();
        let time = self.recon.time_array();
        let quantities = self.config.requested_quantities();
        let needs_disp = self.config.displacement || self.config.velocity || self.config.acceleration;

        let mut summary = SolveSummary::new();
        summary.nnode = self.shapes.nnode();
        summary.ntime = ntime;
        summary.nmode_used = self.recon.nmode_used();
        if let Some(note) = self.recon.fallback_note {
            summary.warnings.push(Warning::new("reconstruction", note));
        }

        store.begin(&StoreHeader {
            quantities: quantities.clone(),
            node_ids: self.shapes.node_ids.clone(),
            time: time.clone(),
            mode: AnalysisMode::Batch,
        })?;

        let mut dt = 0.0;
        if self.config.velocity || self.config.acceleration {
            dt = self.derivative_dt(&mut summary.warnings);
        }

        if self.config.verbose {
            self.print_header();
        }

        let mut max_damage = f64::NEG_INFINITY;
        for ichunk in 0..self.plan.nchunk {
            if cancel.is_requested() {
                summary.state = SolveState::Cancelled;
                if max_damage > f64::NEG_INFINITY {
                    summary.max_damage = Some(max_damage);
                }
                store.finalize(SolveState::Cancelled)?;
                if self.config.verbose {
                    println!("{}", "─".repeat(79));
                    println!("cancelled after {} of {} chunk(s)", ichunk, self.plan.nchunk);
                }
                return Ok(summary);
            }
            let (start, end) = self.plan.range(ichunk);
            let width = end - start;

            // reconstruct the six component histories of the chunk
            let mut comp = [
                Matrix::new(width, ntime),
                Matrix::new(width, ntime),
                Matrix::new(width, ntime),
                Matrix::new(width, ntime),
                Matrix::new(width, ntime),
                Matrix::new(width, ntime),
            ];
            self.recon.stress_chunk(&mut comp, start, end)?;
            let disp = if needs_disp {
                let mut d = [Matrix::new(width, ntime), Matrix::new(width, ntime), Matrix::new(width, ntime)];
                self.recon.displacement_chunk(&mut d, start, end)?;
                Some(d)
            } else {
                None
            };

            // isolate nodes with non-finite reconstructed values
            let mut failed = vec![false; width];
            for i in 0..width {
                let mut ok = true;
                for c in 0..6 {
                    if !row_is_finite(&comp[c], i, ntime) {
                        ok = false;
                        break;
                    }
                }
                if ok {
                    if let Some(d) = &disp {
                        for c in 0..3 {
                            if !row_is_finite(&d[c], i, ntime) {
                                ok = false;
                                break;
                            }
                        }
                    }
                }
                if !ok {
                    failed[i] = true;
                    summary.warnings.push(Warning::at_node(
                        self.shapes.node_ids[start + i],
                        "reconstruction",
                        "a non-finite value was reconstructed; the node is excluded",
                    ));
                }
            }

            // derive the requested quantity rows; a node turning non-finite
            // here is excluded from every quantity of this chunk
            let mut all_rows: Vec<(Quantity, Vec<Vec<f64>>)> = Vec::with_capacity(quantities.len());
            for &quantity in &quantities {
                let rows = match quantity {
                    Quantity::VonMises | Quantity::MaxPrincipal | Quantity::MinPrincipal => {
                        scalar_stress_rows(quantity, &comp, &failed, width, ntime)
                    }
                    Quantity::Displacement | Quantity::Velocity | Quantity::Acceleration => match &disp {
                        Some(d) => kinematic_rows(quantity, d, &failed, width, ntime, dt)?,
                        None => return Err("kinematic outputs require displacement shapes"),
                    },
                };
                for i in 0..width {
                    if !failed[i] && rows[i].iter().any(|v| !v.is_finite()) {
                        failed[i] = true;
                        summary.warnings.push(Warning::at_node(
                            self.shapes.node_ids[start + i],
                            "derivation",
                            "a non-finite derived value was computed; the node is excluded",
                        ));
                    }
                }
                all_rows.push((quantity, rows));
            }

            let mut extremes_list = Vec::with_capacity(all_rows.len());
            for (quantity, rows) in &all_rows {
                let mut extremes = QuantityExtremes::new(*quantity, width, ntime);
                for i in 0..width {
                    if !failed[i] && !rows[i].is_empty() {
                        extremes.record(i, &time, &rows[i]);
                    }
                }
                extremes_list.push(extremes);
            }

            let vm_rows = all_rows
                .iter()
                .find(|(quantity, _)| *quantity == Quantity::VonMises)
                .map(|(_, rows)| rows);

            // rainflow damage of the transient von Mises history
            let mut chunk_damage = None;
            if self.config.damage {
                if let (Some(fatigue), Some(rows)) = (self.config.fatigue, vm_rows) {
                    let values: Vec<f64> = (0..width)
                        .into_par_iter()
                        .map(|i| {
                            if failed[i] || rows[i].is_empty() {
                                f64::NAN
                            } else {
                                accumulate_damage(&rows[i], &fatigue).damage
                            }
                        })
                        .collect();
                    for &value in &values {
                        if value.is_finite() && value > max_damage {
                            max_damage = value;
                        }
                    }
                    chunk_damage = Some(values);
                }
            }

            // notch correction of the von Mises peak of each node
            let mut chunk_corrected = None;
            if let (Some(corrector), Some(db), Some(param)) = (&self.corrector, self.material, self.config.plasticity) {
                if let Some(rows) = vm_rows {
                    let results: Vec<CorrectionResult> = (0..width)
                        .into_par_iter()
                        .map(|i| {
                            let node_id = self.shapes.node_ids[start + i];
                            let temperature = match self.temperatures {
                                Some(field) => field.temperature_of(node_id, param.default_temperature),
                                None => param.default_temperature,
                            };
                            let peak = if failed[i] || rows[i].is_empty() {
                                0.0
                            } else {
                                rows[i].iter().fold(0.0, |acc, &v| f64::max(acc, v))
                            };
                            corrector.actual.correct(db, temperature, peak)
                        })
                        .collect();
                    for (i, result) in results.iter().enumerate() {
                        if !failed[i] && !result.status.is_ok() {
                            summary.nodes_non_converged += 1;
                            summary.warnings.push(Warning::at_node(
                                self.shapes.node_ids[start + i],
                                "plasticity",
                                "the notch correction did not converge",
                            ));
                        }
                    }
                    chunk_corrected = Some(results);
                }
            }

            let failed_global: Vec<usize> = (0..width).filter(|&i| failed[i]).map(|i| start + i).collect();
            let nfailed = failed_global.len();
            store.commit_chunk(&ChunkResults {
                start,
                end,
                extremes: extremes_list,
                corrected: chunk_corrected,
                damage: chunk_damage,
                failed: failed_global,
            })?;
            summary.nchunk_committed += 1;
            summary.nodes_processed += width - nfailed;
            summary.nodes_failed += nfailed;

            let percent = 100 * (ichunk + 1) / self.plan.nchunk;
            sink.on_progress(percent);
            if self.config.verbose {
                println!("{:>8} {:>10} {:>10} {:>8} {:>7}%", ichunk + 1, start, end, nfailed, percent);
            }
        }

        summary.state = SolveState::Completed;
        if max_damage > f64::NEG_INFINITY {
            summary.max_damage = Some(max_damage);
        }
        store.finalize(SolveState::Completed)?;
        if self.config.verbose {
            println!("{}", "─".repeat(79));
        }
        Ok(summary)
    }

    /// Materializes the full history of one node
    fn solve_single(
        &self,
        node_id: NodeId,
        store: &mut dyn OutputStoreTrait,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<SolveSummary, StrError> {
        let index = match self.shapes.index_of(node_id) {
            Some(k) => k,
            None => return Err("the selected node id is not in the mode shape set"),
        };
        let ntime = self.coords.ntime();
        let time = self.recon.time_array();
        let quantities = self.config.requested_quantities();

        let mut summary = SolveSummary::new();
        summary.nnode = 1;
        summary.ntime = ntime;
        summary.nmode_used = self.recon.nmode_used();
        if let Some(note) = self.recon.fallback_note {
            summary.warnings.push(Warning::new("reconstruction", note));
        }

        store.begin(&StoreHeader {
            quantities: quantities.clone(),
            node_ids: vec![node_id],
            time: time.clone(),
            mode: AnalysisMode::SingleNode(node_id),
        })?;

        if cancel.is_requested() {
            summary.state = SolveState::Cancelled;
            store.finalize(SolveState::Cancelled)?;
            return Ok(summary);
        }

        if self.config.verbose {
            println!("\nMRSOLVE === SINGLE NODE HISTORY ===============================================");
            println!(
                "node id = {}, time steps = {}, modes used = {}",
                node_id, ntime, summary.nmode_used
            );
        }

        let stress_components = self.recon.stress_history(index)?;
        let finite = stress_components.iter().all(|s| s.iter().all(|v| v.is_finite()));
        if !finite {
            summary.warnings.push(Warning::at_node(
                node_id,
                "reconstruction",
                "a non-finite value was reconstructed; the node is excluded",
            ));
            summary.state = SolveState::Failed;
            summary.nodes_failed = 1;
            store.finalize(SolveState::Failed)?;
            return Ok(summary);
        }

        let mut history = NodeHistory {
            node_id,
            time: time.clone(),
            stress_components,
            von_mises: None,
            max_principal: None,
            min_principal: None,
            displacement: None,
            velocity: None,
            acceleration: None,
            corrected: None,
            damage: None,
        };

        let mut dt = 0.0;
        if self.config.velocity || self.config.acceleration {
            dt = self.derivative_dt(&mut summary.warnings);
        }
        let disp = if self.config.displacement || self.config.velocity || self.config.acceleration {
            Some(self.recon.displacement_history(index)?)
        } else {
            None
        };

        for &quantity in &quantities {
            match quantity {
                Quantity::VonMises => {
                    history.von_mises = Some(history.stress_components.iter().map(|s| von_mises(s)).collect());
                }
                Quantity::MaxPrincipal => {
                    history.max_principal =
                        Some(history.stress_components.iter().map(|s| principal_stresses(s).0).collect());
                }
                Quantity::MinPrincipal => {
                    history.min_principal =
                        Some(history.stress_components.iter().map(|s| principal_stresses(s).2).collect());
                }
                Quantity::Displacement => {
                    if let Some(d) = &disp {
                        history.displacement = Some(d.iter().map(|u| magnitude3(u[0], u[1], u[2])).collect());
                    }
                }
                Quantity::Velocity => {
                    if let Some(d) = &disp {
                        history.velocity = Some(derivative_magnitude(d, dt, false)?);
                    }
                }
                Quantity::Acceleration => {
                    if let Some(d) = &disp {
                        history.acceleration = Some(derivative_magnitude(d, dt, true)?);
                    }
                }
            }
        }

        // full-history notch correction (sequential for the tensor method)
        if let (Some(corrector), Some(db), Some(param)) = (&self.corrector, self.material, self.config.plasticity) {
            let temperature = match self.temperatures {
                Some(field) => field.temperature_of(node_id, param.default_temperature),
                None => param.default_temperature,
            };
            let corrected = corrector.actual.correct_history(db, temperature, &history.stress_components)?;
            if !corrected.non_converged.is_empty() {
                summary.nodes_non_converged = 1;
                summary.warnings.push(Warning::at_node(
                    node_id,
                    "plasticity",
                    &format!(
                        "the notch correction did not converge at {} step(s)",
                        corrected.non_converged.len()
                    ),
                ));
            }
            history.corrected = Some(corrected);
        }

        if self.config.damage {
            if let (Some(fatigue), Some(vm)) = (self.config.fatigue, &history.von_mises) {
                let record = accumulate_damage(vm, &fatigue);
                summary.max_damage = Some(record.damage);
                history.damage = Some(record);
            }
        }

        store.commit_history(&history)?;
        sink.on_progress(100);
        summary.nodes_processed = 1;
        summary.state = SolveState::Completed;
        store.finalize(SolveState::Completed)?;
        if self.config.verbose {
            println!("{}", "─".repeat(79));
        }
        Ok(summary)
    }

    /// Returns the time step for finite differences
    ///
    /// A non-uniform grid degrades to the mean step with a warning.
    fn derivative_dt(&self, warnings: &mut Vec<Warning>) -> f64 {
        let ntime = self.coords.ntime();
        match self.coords.uniform_dt() {
            Some(dt) => dt,
            None => {
                warnings.push(Warning::new(
                    "differentiation",
                    "the time grid is not uniform; derivatives use the mean time step",
                ));
                (self.coords.time[ntime - 1] - self.coords.time[0]) / ((ntime - 1) as f64)
            }
        }
    }

    /// Prints the header of the batch sweep
    fn print_header(&self) {
        println!("\nMRSOLVE === MODAL SUPERPOSITION SWEEP =========================================");
        println!(
            "nodes = {}, time steps = {}, modes used = {}",
            self.shapes.nnode(),
            self.coords.ntime(),
            self.recon.nmode_used()
        );
        println!("plan: {}", self.plan);
        println!("{}", "─".repeat(79));
        println!("{:>8} {:>10} {:>10} {:>8} {:>8}", "chunk", "start", "end", "failed", "done");
        println!("{}", "─".repeat(79));
    }
}

/// Indicates whether every value of a matrix row is finite
fn row_is_finite(mat: &Matrix, i: usize, ntime: usize) -> bool {
    for j in 0..ntime {
        if !mat.get(i, j).is_finite() {
            return false;
        }
    }
    true
}

/// Collects the six components of node i at time j
fn components_at(comp: &[Matrix; 6], i: usize, j: usize) -> [f64; 6] {
    [
        comp[0].get(i, j),
        comp[1].get(i, j),
        comp[2].get(i, j),
        comp[3].get(i, j),
        comp[4].get(i, j),
        comp[5].get(i, j),
    ]
}

/// Computes one scalar stress row per node of the chunk (failed nodes yield empty rows)
fn scalar_stress_rows(
    quantity: Quantity,
    comp: &[Matrix; 6],
    failed: &[bool],
    width: usize,
    ntime: usize,
) -> Vec<Vec<f64>> {
    (0..width)
        .into_par_iter()
        .map(|i| {
            if failed[i] {
                return Vec::new();
            }
            (0..ntime)
                .map(|j| {
                    let sigma = components_at(comp, i, j);
                    match quantity {
                        Quantity::VonMises => von_mises(&sigma),
                        Quantity::MaxPrincipal => principal_stresses(&sigma).0,
                        Quantity::MinPrincipal => principal_stresses(&sigma).2,
                        _ => f64::NAN,
                    }
                })
                .collect()
        })
        .collect()
}

/// Computes one kinematic magnitude row per node of the chunk (failed nodes yield empty rows)
fn kinematic_rows(
    quantity: Quantity,
    disp: &[Matrix; 3],
    failed: &[bool],
    width: usize,
    ntime: usize,
    dt: f64,
) -> Result<Vec<Vec<f64>>, StrError> {
    (0..width)
        .into_par_iter()
        .map(|i| -> Result<Vec<f64>, StrError> {
            if failed[i] {
                return Ok(Vec::new());
            }
            let mut dx: Vec<f64> = (0..ntime).map(|j| disp[0].get(i, j)).collect();
            let mut dy: Vec<f64> = (0..ntime).map(|j| disp[1].get(i, j)).collect();
            let mut dz: Vec<f64> = (0..ntime).map(|j| disp[2].get(i, j)).collect();
            match quantity {
                Quantity::Velocity => {
                    let mut vx = vec![0.0; ntime];
                    let mut vy = vec![0.0; ntime];
                    let mut vz = vec![0.0; ntime];
                    deriv1_uniform(&mut vx, &dx, dt)?;
                    deriv1_uniform(&mut vy, &dy, dt)?;
                    deriv1_uniform(&mut vz, &dz, dt)?;
                    dx = vx;
                    dy = vy;
                    dz = vz;
                }
                Quantity::Acceleration => {
                    let mut ax = vec![0.0; ntime];
                    let mut ay = vec![0.0; ntime];
                    let mut az = vec![0.0; ntime];
                    deriv2_uniform(&mut ax, &dx, dt)?;
                    deriv2_uniform(&mut ay, &dy, dt)?;
                    deriv2_uniform(&mut az, &dz, dt)?;
                    dx = ax;
                    dy = ay;
                    dz = az;
                }
                _ => (),
            }
            Ok((0..ntime).map(|j| magnitude3(dx[j], dy[j], dz[j])).collect())
        })
        .collect()
}

/// Computes the magnitude of the first or second derivative of a displacement history
fn derivative_magnitude(disp: &[[f64; 3]], dt: f64, second: bool) -> Result<Vec<f64>, StrError> {
    let n = disp.len();
    let dx: Vec<f64> = disp.iter().map(|u| u[0]).collect();
    let dy: Vec<f64> = disp.iter().map(|u| u[1]).collect();
    let dz: Vec<f64> = disp.iter().map(|u| u[2]).collect();
    let mut vx = vec![0.0; n];
    let mut vy = vec![0.0; n];
    let mut vz = vec![0.0; n];
    if second {
        deriv2_uniform(&mut vx, &dx, dt)?;
        deriv2_uniform(&mut vy, &dy, dt)?;
        deriv2_uniform(&mut vz, &dz, dt)?;
    } else {
        deriv1_uniform(&mut vx, &dx, dt)?;
        deriv1_uniform(&mut vy, &dy, dt)?;
        deriv1_uniform(&mut vz, &dz, dt)?;
    }
    Ok((0..n).map(|j| magnitude3(vx[j], vy[j], vz[j])).collect())
}

/// Bundles the owned inputs of a solve
///
/// The bundle is serializable, which makes it the natural unit for a
/// background run or a case file on disk.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SolveCase {
    /// Configuration
    pub config: SolveConfig,

    /// Modal coordinates
    pub coords: ModalCoordinates,

    /// Mode shapes
    pub shapes: ModeShapeSet,

    /// Steady-state stress bias (optional)
    pub steady: Option<SteadyStateField>,

    /// Per-node temperatures (optional)
    pub temperatures: Option<TemperatureField>,

    /// Material database (required when the correction is enabled)
    pub material: Option<MaterialDatabase>,
}

impl SolveCase {
    /// Runs the analysis on the calling thread
    pub fn solve(
        &self,
        store: &mut dyn OutputStoreTrait,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<SolveSummary, StrError> {
        let solver = Solver::new(
            &self.config,
            &self.coords,
            &self.shapes,
            self.material.as_ref(),
            self.temperatures.as_ref(),
            self.steady.as_ref(),
        )?;
        solver.solve(store, sink, cancel)
    }

    /// Reads a JSON file containing the case data
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
        let case = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(case)
    }

    /// Writes a JSON file with the case data
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

/// Runs a solve on a background thread
///
/// The caller keeps a clone of the cancel token to request a stop and
/// joins the handle to collect the filled store and the summary.
pub fn solve_in_background(
    case: SolveCase,
    mut sink: Box<dyn ProgressSink>,
    cancel: CancelToken,
) -> JoinHandle<Result<(InMemoryStore, SolveSummary), StrError>> {
    std::thread::spawn(move || {
        let mut store = InMemoryStore::new();
        let summary = case.solve(&mut store, sink.as_mut(), &cancel)?;
        Ok((store, summary))
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{solve_in_background, SolveCase, Solver};
    use crate::base::{AnalysisMode, DisplacementShapes, ModalCoordinates, ModeShapeSet, ParamFatigue};
    use crate::base::{ParamPlasticity, Quantity, SampleData, SolveConfig, SolveState, TemperatureField};
    use crate::material::MaterialDatabase;
    use crate::solver::{CancelToken, CollectingSink, InMemoryStore, NullSink, ProgressSink, SolveSummary, Warning};
    use russell_lab::{approx_eq, vec_approx_eq, Matrix, Vector};

    fn run(
        config: &SolveConfig,
        coords: &ModalCoordinates,
        shapes: &ModeShapeSet,
        material: Option<&MaterialDatabase>,
    ) -> (InMemoryStore, SolveSummary) {
        let solver = Solver::new(config, coords, shapes, material, None, None).unwrap();
        let mut store = InMemoryStore::new();
        let mut sink = NullSink {};
        let summary = solver.solve(&mut store, &mut sink, &CancelToken::new()).unwrap();
        (store, summary)
    }

    #[test]
    fn new_captures_errors() {
        let (coords, shapes) = SampleData::two_mode_three_step();

        let mut config = SolveConfig::new();
        config.von_mises = false;
        assert_eq!(
            Solver::new(&config, &coords, &shapes, None, None, None).err(),
            Some("solve configuration is invalid")
        );

        let mut config = SolveConfig::new();
        config.set_plasticity(ParamPlasticity::sample_neuber()).unwrap();
        assert_eq!(
            Solver::new(&config, &coords, &shapes, None, None, None).err(),
            Some("the plasticity correction requires a material database")
        );

        let mut config = SolveConfig::new();
        config.set_kinematic_outputs(true, false, false).unwrap();
        assert_eq!(
            Solver::new(&config, &coords, &shapes, None, None, None).err(),
            Some("kinematic outputs require displacement shapes")
        );

        let mut config = SolveConfig::new();
        config.set_mode(AnalysisMode::SingleNode(99)).unwrap();
        assert_eq!(
            Solver::new(&config, &coords, &shapes, None, None, None).err(),
            Some("the selected node id is not in the mode shape set")
        );

        // a single instant cannot be differentiated
        let one = Matrix::filled(1, 1, 1.0);
        let coords1 = ModalCoordinates::new(Matrix::from(&[[1.0]]), Vector::from(&[0.0])).unwrap();
        let shapes1 = ModeShapeSet::new(
            vec![1],
            one.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            Some(DisplacementShapes {
                ux: one.clone(),
                uy: one.clone(),
                uz: one.clone(),
            }),
        )
        .unwrap();
        let mut config = SolveConfig::new();
        config.set_kinematic_outputs(false, true, false).unwrap();
        assert_eq!(
            Solver::new(&config, &coords1, &shapes1, None, None, None).err(),
            Some("velocity and acceleration require at least two time steps")
        );
    }

    #[test]
    fn batch_reconstruction_works() {
        // σxx = {1, 2, 3}, σyy = {0, 1, 0}: the von Mises history is
        // {1, √3, 3} and the principal stresses are (σxx, σyy, 0) sorted
        let (coords, shapes) = SampleData::two_mode_three_step();
        let mut config = SolveConfig::new();
        config.set_stress_outputs(true, true, true).unwrap();
        let solver = Solver::new(&config, &coords, &shapes, None, None, None).unwrap();
        let mut store = InMemoryStore::new();
        let mut sink = CollectingSink::new();
        let summary = solver.solve(&mut store, &mut sink, &CancelToken::new()).unwrap();

        assert_eq!(summary.state, SolveState::Completed);
        assert_eq!(summary.nnode, 1);
        assert_eq!(summary.nmode_used, 2);
        assert_eq!(summary.nchunk_committed, 1);
        assert_eq!(summary.nodes_processed, 1);
        assert_eq!(summary.nodes_failed, 0);
        assert_eq!(summary.warnings.len(), 0);
        assert_eq!(sink.percents, &[100]);

        let vm = store.track_of(Quantity::VonMises).unwrap();
        approx_eq(vm.max_value[0], 3.0, 1e-14);
        approx_eq(vm.time_of_max[0], 2.0, 1e-15);
        approx_eq(vm.min_value[0], 1.0, 1e-14);
        approx_eq(vm.time_of_min[0], 0.0, 1e-15);
        vec_approx_eq(&vm.envelope, &[1.0, f64::sqrt(3.0), 3.0], 1e-14);

        let s1 = store.track_of(Quantity::MaxPrincipal).unwrap();
        vec_approx_eq(&s1.envelope, &[1.0, 2.0, 3.0], 1e-14);
        approx_eq(s1.max_value[0], 3.0, 1e-14);

        let s3 = store.track_of(Quantity::MinPrincipal).unwrap();
        vec_approx_eq(&s3.envelope, &[0.0, 0.0, 0.0], 1e-14);
    }

    #[test]
    fn chunking_does_not_change_the_results() {
        let (coords, shapes) = SampleData::wave_case(10, 64);
        let mut config = SolveConfig::new();
        config
            .set_stress_outputs(true, true, true)
            .unwrap()
            .set_kinematic_outputs(true, true, true)
            .unwrap()
            .set_fatigue(ParamFatigue::new(1e12, 3.0))
            .unwrap()
            .set_damage(true)
            .unwrap();
        let (one_chunk, summary_large) = run(&config, &coords, &shapes, None);
        assert_eq!(summary_large.nchunk_committed, 1);

        // two nodes per chunk
        let bytes_per_node = 8 * 64 * config.working_arrays_per_node();
        config.set_memory_budget(2 * bytes_per_node).unwrap();
        let solver = Solver::new(&config, &coords, &shapes, None, None, None).unwrap();
        assert_eq!(solver.plan().nchunk, 5);
        let mut store = InMemoryStore::new();
        let mut sink = CollectingSink::new();
        let summary = solver.solve(&mut store, &mut sink, &CancelToken::new()).unwrap();
        assert_eq!(summary.nchunk_committed, 5);
        assert_eq!(summary.nodes_processed, 10);
        assert_eq!(sink.percents, &[20, 40, 60, 80, 100]);

        for quantity in [
            Quantity::VonMises,
            Quantity::MaxPrincipal,
            Quantity::MinPrincipal,
            Quantity::Displacement,
            Quantity::Velocity,
            Quantity::Acceleration,
        ] {
            let a = one_chunk.track_of(quantity).unwrap();
            let b = store.track_of(quantity).unwrap();
            vec_approx_eq(&a.max_value, &b.max_value, 1e-12);
            vec_approx_eq(&a.time_of_max, &b.time_of_max, 1e-15);
            vec_approx_eq(&a.min_value, &b.min_value, 1e-12);
            vec_approx_eq(&a.time_of_min, &b.time_of_min, 1e-15);
            vec_approx_eq(&a.envelope, &b.envelope, 1e-12);
        }
        for i in 0..10 {
            approx_eq(one_chunk.damage[i].unwrap(), store.damage[i].unwrap(), 1e-15);
        }
        approx_eq(summary_large.max_damage.unwrap(), summary.max_damage.unwrap(), 1e-15);
    }

    struct CancelAfterFirst {
        token: CancelToken,
        percents: Vec<usize>,
    }

    impl ProgressSink for CancelAfterFirst {
        fn on_progress(&mut self, percent: usize) {
            self.percents.push(percent);
            self.token.request();
        }
    }

    #[test]
    fn cancellation_stops_at_the_next_chunk_boundary() {
        let (coords, shapes) = SampleData::wave_case(10, 32);
        let mut config = SolveConfig::new();
        let bytes_per_node = 8 * 32 * config.working_arrays_per_node();
        config.set_memory_budget(2 * bytes_per_node).unwrap();

        let solver = Solver::new(&config, &coords, &shapes, None, None, None).unwrap();
        assert_eq!(solver.plan().nchunk, 5);
        let token = CancelToken::new();
        let mut sink = CancelAfterFirst {
            token: token.clone(),
            percents: Vec::new(),
        };
        let mut store = InMemoryStore::new();
        let summary = solver.solve(&mut store, &mut sink, &token).unwrap();

        assert_eq!(summary.state, SolveState::Cancelled);
        assert_eq!(summary.nchunk_committed, 1);
        assert_eq!(summary.nodes_processed, 2);
        assert_eq!(sink.percents, &[20]);
        assert_eq!(store.state, SolveState::Cancelled);

        // the committed chunk stays; the rest was never touched
        let vm = store.track_of(Quantity::VonMises).unwrap();
        assert!(vm.max_value[0].is_finite());
        assert!(vm.max_value[1].is_finite());
        for i in 2..10 {
            assert!(vm.max_value[i].is_nan());
        }

        // a token raised before the run cancels at once
        let token = CancelToken::new();
        token.request();
        let mut store = InMemoryStore::new();
        let mut sink = NullSink {};
        let summary = solver.solve(&mut store, &mut sink, &token).unwrap();
        assert_eq!(summary.state, SolveState::Cancelled);
        assert_eq!(summary.nchunk_committed, 0);
    }

    #[test]
    fn non_finite_nodes_are_isolated() {
        // the second node carries a poisoned shape row
        let q = Matrix::from(&[[1.0, 2.0, 3.0]]);
        let time = Vector::from(&[0.0, 1.0, 2.0]);
        let coords = ModalCoordinates::new(q, time).unwrap();
        let shapes = ModeShapeSet::new(
            vec![10, 20],
            Matrix::from(&[[100.0], [f64::NAN]]),
            Matrix::new(2, 1),
            Matrix::new(2, 1),
            Matrix::new(2, 1),
            Matrix::new(2, 1),
            Matrix::new(2, 1),
            None,
        )
        .unwrap();
        let mut config = SolveConfig::new();
        config.set_fatigue(ParamFatigue::new(1e12, 3.0)).unwrap().set_damage(true).unwrap();
        let (store, summary) = run(&config, &coords, &shapes, None);

        assert_eq!(summary.state, SolveState::Completed);
        assert_eq!(summary.nodes_processed, 1);
        assert_eq!(summary.nodes_failed, 1);
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].node_id, Some(20));
        assert_eq!(summary.warnings[0].stage, "reconstruction");

        assert_eq!(store.failed_nodes, &[20]);
        let vm = store.track_of(Quantity::VonMises).unwrap();
        approx_eq(vm.max_value[0], 300.0, 1e-12);
        assert!(vm.max_value[1].is_nan());
        assert!(store.damage[0].unwrap() >= 0.0);
        assert!(store.damage[1].unwrap().is_nan());
        assert!(summary.max_damage.unwrap().is_finite());
    }

    #[test]
    fn non_converged_corrections_raise_warnings() {
        // one iteration cannot satisfy a 1e-14 tolerance above yield
        let q = Matrix::from(&[[1.0, 2.0, 3.0]]);
        let time = Vector::from(&[0.0, 1.0, 2.0]);
        let coords = ModalCoordinates::new(q, time).unwrap();
        let shapes = ModeShapeSet::new(
            vec![7],
            Matrix::from(&[[200.0]]),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            None,
        )
        .unwrap();
        let db = MaterialDatabase::sample_aluminum();
        let mut param = ParamPlasticity::sample_neuber();
        param.max_iterations = 1;
        param.tolerance = 1e-14;
        let mut config = SolveConfig::new();
        config.set_plasticity(param).unwrap();
        let (store, summary) = run(&config, &coords, &shapes, Some(&db));

        // the peak of 600 exceeds the 400 MPa yield stress
        assert_eq!(summary.state, SolveState::Completed);
        assert_eq!(summary.nodes_non_converged, 1);
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].stage, "plasticity");
        assert_eq!(summary.warnings[0].node_id, Some(7));
        let corrected = store.corrected[0].unwrap();
        assert!(corrected.stress.is_finite());
        assert!(!corrected.status.is_ok());
    }

    #[test]
    fn batch_correction_works_with_temperatures() {
        let q = Matrix::from(&[[1.0, 2.0, 3.0]]);
        let time = Vector::from(&[0.0, 1.0, 2.0]);
        let coords = ModalCoordinates::new(q, time).unwrap();
        let shapes = ModeShapeSet::new(
            vec![7],
            Matrix::from(&[[200.0]]),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            Matrix::new(1, 1),
            None,
        )
        .unwrap();
        let db = MaterialDatabase::sample_aluminum();
        let temperatures = TemperatureField::new(vec![7], vec![22.0]).unwrap();
        let mut config = SolveConfig::new();
        config.set_plasticity(ParamPlasticity::sample_neuber()).unwrap();
        let solver = Solver::new(&config, &coords, &shapes, Some(&db), Some(&temperatures), None).unwrap();
        let mut store = InMemoryStore::new();
        let mut sink = NullSink {};
        let summary = solver.solve(&mut store, &mut sink, &CancelToken::new()).unwrap();

        // the corrected stress relaxes below the elastic peak of 600
        assert_eq!(summary.nodes_non_converged, 0);
        let corrected = store.corrected[0].unwrap();
        assert!(corrected.status.is_ok());
        assert!(corrected.stress > 400.0 && corrected.stress < 600.0);
        assert!(corrected.plastic_strain > 0.0);
    }

    #[test]
    fn single_node_pipeline_works() {
        let (coords, shapes) = SampleData::wave_case(4, 64);
        let db = MaterialDatabase::sample_aluminum();
        let mut config = SolveConfig::new();
        config
            .set_mode(AnalysisMode::SingleNode(3))
            .unwrap()
            .set_stress_outputs(true, true, true)
            .unwrap()
            .set_kinematic_outputs(true, true, true)
            .unwrap()
            .set_fatigue(ParamFatigue::new(1e12, 3.0))
            .unwrap()
            .set_damage(true)
            .unwrap()
            .set_plasticity(ParamPlasticity::sample_neuber())
            .unwrap();
        let solver = Solver::new(&config, &coords, &shapes, Some(&db), None, None).unwrap();
        let mut store = InMemoryStore::new();
        let mut sink = CollectingSink::new();
        let summary = solver.solve(&mut store, &mut sink, &CancelToken::new()).unwrap();

        assert_eq!(summary.state, SolveState::Completed);
        assert_eq!(summary.nnode, 1);
        assert_eq!(summary.nodes_processed, 1);
        assert_eq!(sink.percents, &[100]);

        let history = store.history.as_ref().unwrap();
        assert_eq!(history.node_id, 3);
        assert_eq!(history.time.len(), 64);
        assert_eq!(history.stress_components.len(), 64);
        let vm = history.von_mises.as_ref().unwrap();
        assert_eq!(vm.len(), 64);
        let s1 = history.max_principal.as_ref().unwrap();
        let s3 = history.min_principal.as_ref().unwrap();
        for j in 0..64 {
            assert!(vm[j] >= 0.0);
            assert!(s1[j] >= s3[j]);
        }
        assert_eq!(history.displacement.as_ref().unwrap().len(), 64);
        assert_eq!(history.velocity.as_ref().unwrap().len(), 64);
        assert_eq!(history.acceleration.as_ref().unwrap().len(), 64);
        let corrected = history.corrected.as_ref().unwrap();
        assert_eq!(corrected.stress.len(), 64);
        assert_eq!(corrected.non_converged.len(), 0);
        let damage = history.damage.as_ref().unwrap();
        assert_eq!(summary.max_damage, Some(damage.damage));

        // the stored history matches a direct reconstruction
        let row = shapes.index_of(3).unwrap();
        let mut expected = 0.0;
        for m in 0..2 {
            expected += shapes.sxx.get(row, m) * coords.q.get(m, 10);
        }
        approx_eq(history.stress_components[10][0], expected, 1e-13);
    }

    #[test]
    fn background_solve_works() {
        let (coords, shapes) = SampleData::wave_case(6, 32);
        let case = SolveCase {
            config: SolveConfig::new(),
            coords,
            shapes,
            steady: None,
            temperatures: None,
            material: None,
        };
        let handle = solve_in_background(case, Box::new(NullSink {}), CancelToken::new());
        let (store, summary) = handle.join().unwrap().unwrap();
        assert_eq!(summary.state, SolveState::Completed);
        assert_eq!(summary.nodes_processed, 6);
        assert_eq!(store.state, SolveState::Completed);
        assert_eq!(store.track_of(Quantity::VonMises).unwrap().max_value.len(), 6);
    }

    #[test]
    fn case_files_round_trip() {
        let (coords, shapes) = SampleData::two_mode_three_step();
        let mut config = SolveConfig::new();
        config.set_plasticity(ParamPlasticity::sample_neuber()).unwrap();
        let case = SolveCase {
            config,
            coords,
            shapes,
            steady: None,
            temperatures: None,
            material: Some(MaterialDatabase::sample_aluminum()),
        };
        let full_path = "/tmp/mrsolve/test_solve_case_round_trip.json";
        case.write_json(full_path).unwrap();
        let read = SolveCase::read_json(full_path).unwrap();
        assert_eq!(read.shapes.node_ids, case.shapes.node_ids);
        assert_eq!(read.shapes.index_of(1), Some(0));
        assert_eq!(read.coords.ntime(), 3);
        assert_eq!(read.config.plasticity.unwrap().max_iterations, 40);
        assert!(read.material.is_some());

        // a run from the read case matches a run from the original
        let mut store_a = InMemoryStore::new();
        let mut store_b = InMemoryStore::new();
        let mut sink = NullSink {};
        case.solve(&mut store_a, &mut sink, &CancelToken::new()).unwrap();
        read.solve(&mut store_b, &mut sink, &CancelToken::new()).unwrap();
        let a = store_a.track_of(Quantity::VonMises).unwrap();
        let b = store_b.track_of(Quantity::VonMises).unwrap();
        vec_approx_eq(&a.envelope, &b.envelope, 1e-15);
    }

    #[test]
    fn warnings_carry_the_derivative_fallback() {
        // irregular grid: the mean step is used and a warning raised
        let q = Matrix::from(&[[0.0, 1.0, 4.0, 9.0]]);
        let time = Vector::from(&[0.0, 1.0, 2.0, 4.0]);
        let coords = ModalCoordinates::new(q, time).unwrap();
        let one = Matrix::filled(1, 1, 1.0);
        let shapes = ModeShapeSet::new(
            vec![1],
            one.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            Some(DisplacementShapes {
                ux: one.clone(),
                uy: one.clone(),
                uz: one.clone(),
            }),
        )
        .unwrap();
        let mut config = SolveConfig::new();
        config.set_kinematic_outputs(false, true, false).unwrap();
        let (_, summary) = run(&config, &coords, &shapes, None);
        assert_eq!(summary.state, SolveState::Completed);
        let warning: &Warning = &summary.warnings[0];
        assert_eq!(warning.stage, "differentiation");
        assert_eq!(warning.node_id, None);
    }
}
