use mrsolve::prelude::*;
use mrsolve::StrError;
use russell_lab::{approx_eq, vec_approx_eq};

// Chunking must not change the results
//
// TEST GOAL
//
// This test verifies that the chunked batch sweep commits exactly the
// same extremes, damage, and corrections regardless of the memory
// budget, from one chunk covering all nodes down to one node per chunk.

fn run_with_budget(budget: Option<usize>) -> Result<(InMemoryStore, SolveSummary), StrError> {
    let (coords, shapes) = SampleData::wave_case(12, 128);
    let db = MaterialDatabase::sample_aluminum();
    let mut config = SolveConfig::new();
    config
        .set_stress_outputs(true, true, true)?
        .set_kinematic_outputs(true, true, true)?
        .set_fatigue(ParamFatigue::new(1e12, 3.0))?
        .set_damage(true)?
        .set_plasticity(ParamPlasticity::sample_neuber())?;
    if let Some(value) = budget {
        config.set_memory_budget(value)?;
    }
    let solver = Solver::new(&config, &coords, &shapes, Some(&db), None, None)?;
    let mut store = InMemoryStore::new();
    let mut sink = NullSink {};
    let summary = solver.solve(&mut store, &mut sink, &CancelToken::new())?;
    Ok((store, summary))
}

#[test]
fn test_batch_invariance() -> Result<(), StrError> {
    // reference: the default budget holds all 12 nodes in one chunk
    let (reference, summary) = run_with_budget(None)?;
    assert_eq!(summary.state, SolveState::Completed);
    assert_eq!(summary.nchunk_committed, 1);
    assert_eq!(summary.nodes_processed, 12);
    assert_eq!(summary.nodes_failed, 0);

    // per-node cost of this configuration (all quantities, f64)
    let config = {
        let mut c = SolveConfig::new();
        c.set_stress_outputs(true, true, true)?
            .set_kinematic_outputs(true, true, true)?;
        c
    };
    let bytes_per_node = 8 * 128 * config.working_arrays_per_node();

    // shrink the budget: 5 nodes per chunk, then a single node per chunk
    for (budget, nchunk_expected) in [(5 * bytes_per_node, 3), (1, 12)] {
        let (store, summary) = run_with_budget(Some(budget))?;
        println!("budget = {:>9} byte(s)  ->  {} chunk(s)", budget, summary.nchunk_committed);
        assert_eq!(summary.state, SolveState::Completed);
        assert_eq!(summary.nchunk_committed, nchunk_expected);
        assert_eq!(summary.nodes_processed, 12);

        for quantity in [
            Quantity::VonMises,
            Quantity::MaxPrincipal,
            Quantity::MinPrincipal,
            Quantity::Displacement,
            Quantity::Velocity,
            Quantity::Acceleration,
        ] {
            let a = reference.track_of(quantity).unwrap();
            let b = store.track_of(quantity).unwrap();
            vec_approx_eq(&a.max_value, &b.max_value, 1e-12);
            vec_approx_eq(&a.time_of_max, &b.time_of_max, 1e-15);
            vec_approx_eq(&a.min_value, &b.min_value, 1e-12);
            vec_approx_eq(&a.time_of_min, &b.time_of_min, 1e-15);
            vec_approx_eq(&a.envelope, &b.envelope, 1e-12);
        }
        for i in 0..12 {
            approx_eq(reference.damage[i].unwrap(), store.damage[i].unwrap(), 1e-15);
            let ca = reference.corrected[i].unwrap();
            let cb = store.corrected[i].unwrap();
            approx_eq(ca.stress, cb.stress, 1e-12);
            assert_eq!(ca.status, cb.status);
        }
    }
    Ok(())
}
