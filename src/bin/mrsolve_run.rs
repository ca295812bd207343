use mrsolve::base::AnalysisMode;
use mrsolve::solver::{CancelToken, InMemoryStore, NullSink, SolveCase};
use mrsolve::StrError;
use std::path::Path;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "mrsolve_run",
    about = "Runs a modal superposition analysis from a JSON case file"
)]
struct Options {
    /// Path of the JSON case file
    case_path: String,

    /// Output directory for the results and summary files
    out_dir: String,

    /// Restricts the analysis to the full history of one node
    #[structopt(short = "n", long)]
    node: Option<usize>,

    /// Prints progress information
    #[structopt(short = "v", long)]
    verbose: bool,
}

fn main() -> Result<(), StrError> {
    // parse options
    let options = Options::from_args();

    // load the case
    let mut case = SolveCase::read_json(&options.case_path)?;
    if let Some(node_id) = options.node {
        case.config.set_mode(AnalysisMode::SingleNode(node_id))?;
    }
    if options.verbose {
        case.config.set_verbose(true)?;
    }

    // run the analysis
    let mut store = InMemoryStore::new();
    let mut sink = NullSink {};
    let summary = case.solve(&mut store, &mut sink, &CancelToken::new())?;

    // write the results
    let stem = match Path::new(&options.case_path).file_stem() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => "case".to_string(),
    };
    let path_store = format!("{}/{}-results.json", options.out_dir, stem);
    let path_summary = format!("{}/{}-summary.json", options.out_dir, stem);
    store.write_json(&path_store)?;
    summary.write_json(&path_summary)?;

    // message
    let thin_line = format!("{:─^1$}", "", path_store.len());
    println!("\n{}", thin_line);
    println!("{}", summary);
    println!("results and summary files:");
    println!("{}", path_store);
    println!("{}", path_summary);
    println!("{}\n", thin_line);
    Ok(())
}
