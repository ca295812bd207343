use mrsolve::prelude::*;
use mrsolve::solver::{magnitude3, von_mises, CollectingSink};
use mrsolve::StrError;
use russell_lab::approx_eq;

// Full-history mode for one node
//
// TEST GOAL
//
// This test verifies that the single-node mode materializes complete
// component, derived, kinematic, corrected, and damage histories, and
// that they agree with the batch sweep over the same data.

#[test]
fn test_single_node_pipeline() -> Result<(), StrError> {
    let (coords, shapes) = SampleData::wave_case(6, 96);
    let db = MaterialDatabase::sample_aluminum();
    let node_id = 5;
    let mut config = SolveConfig::new();
    config
        .set_mode(AnalysisMode::SingleNode(node_id))?
        .set_stress_outputs(true, true, true)?
        .set_kinematic_outputs(true, true, true)?
        .set_fatigue(ParamFatigue::new(1e12, 3.0))?
        .set_damage(true)?
        .set_plasticity(ParamPlasticity::sample_neuber())?;

    let solver = Solver::new(&config, &coords, &shapes, Some(&db), None, None)?;
    let mut store = InMemoryStore::new();
    let mut sink = CollectingSink::new();
    let summary = solver.solve(&mut store, &mut sink, &CancelToken::new())?;
    println!("{}", summary);
    assert_eq!(summary.state, SolveState::Completed);
    assert_eq!(summary.nnode, 1);
    assert_eq!(summary.ntime, 96);
    assert_eq!(summary.nodes_processed, 1);
    assert_eq!(sink.percents, &[100]);

    let history = store.history.as_ref().unwrap();
    assert_eq!(history.node_id, node_id);
    assert_eq!(history.time.len(), 96);
    assert_eq!(history.stress_components.len(), 96);

    // the components must match the direct superposition
    let row = shapes.index_of(node_id).unwrap();
    for j in [0, 17, 48, 95] {
        let mut expected = 0.0;
        for m in 0..coords.nmode() {
            expected += shapes.sxx.get(row, m) * coords.q.get(m, j);
        }
        approx_eq(history.stress_components[j][0], expected, 1e-12);
    }

    // derived histories agree with the pointwise measures
    let vm = history.von_mises.as_ref().unwrap();
    let s1 = history.max_principal.as_ref().unwrap();
    let s3 = history.min_principal.as_ref().unwrap();
    assert_eq!(vm.len(), 96);
    for j in 0..96 {
        approx_eq(vm[j], von_mises(&history.stress_components[j]), 1e-12);
        assert!(s1[j] >= s3[j]);
        assert!(vm[j] >= 0.0);
    }

    // kinematic magnitudes are present and non-negative
    let disp = history.displacement.as_ref().unwrap();
    let vel = history.velocity.as_ref().unwrap();
    let acc = history.acceleration.as_ref().unwrap();
    assert_eq!(disp.len(), 96);
    assert_eq!(vel.len(), 96);
    assert_eq!(acc.len(), 96);
    for j in 0..96 {
        assert!(disp[j] >= 0.0 && vel[j] >= 0.0 && acc[j] >= 0.0);
    }
    let mut ux = 0.0;
    let mut uy = 0.0;
    let mut uz = 0.0;
    let dshapes = shapes.displacement.as_ref().unwrap();
    for m in 0..coords.nmode() {
        ux += dshapes.ux.get(row, m) * coords.q.get(m, 30);
        uy += dshapes.uy.get(row, m) * coords.q.get(m, 30);
        uz += dshapes.uz.get(row, m) * coords.q.get(m, 30);
    }
    approx_eq(disp[30], magnitude3(ux, uy, uz), 1e-12);

    // the correction and damage records are attached
    let corrected = history.corrected.as_ref().unwrap();
    assert_eq!(corrected.stress.len(), 96);
    assert_eq!(corrected.plastic_strain.len(), 96);
    assert!(corrected.non_converged.is_empty());
    let damage = history.damage.as_ref().unwrap();
    assert!(damage.damage > 0.0);
    assert_eq!(summary.max_damage, Some(damage.damage));

    // the batch sweep over the same data reports matching extremes
    let mut config_batch = SolveConfig::new();
    config_batch.set_stress_outputs(true, true, true)?;
    let solver = Solver::new(&config_batch, &coords, &shapes, None, None, None)?;
    let mut batch = InMemoryStore::new();
    let mut sink = CollectingSink::new();
    solver.solve(&mut batch, &mut sink, &CancelToken::new())?;
    let track = batch.track_of(Quantity::VonMises).unwrap();
    let peak = vm.iter().fold(f64::NEG_INFINITY, |acc, &v| f64::max(acc, v));
    approx_eq(track.max_value[row], peak, 1e-12);
    for j in 0..96 {
        assert!(track.envelope[j] >= vm[j] - 1e-12);
    }
    Ok(())
}
