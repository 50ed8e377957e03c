use std::path::Path;

use study_lib::config::{LevelParam, Policy, SimConfig, DEFAULT_CONFIG_PATH};
use study_lib::experiment::{sweep_jobs, Sweep};
use study_lib::job::{Layout, RunParams};
use study_lib::runner::{run_jobs, N_JOBS};
use study_lib::trace::{TraceSet, TRACE_DIR};
use study_lib::{logging, report};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(false);
    let param_tokens: Vec<String> = std::env::args().collect();

    // Sweep the LLC set count unless told otherwise:
    // sweep-eval [level] [sets|ways] [v1,v2,...]
    let level = param_tokens.get(1).cloned().unwrap_or("LLC".to_string());
    let param: LevelParam = match param_tokens.get(2) {
        Some(param) => param.parse()?,
        None => LevelParam::Sets,
    };
    let values: Vec<usize> = match param_tokens.get(3) {
        Some(values) => values
            .split(',')
            .map(|v| v.trim().parse())
            .collect::<Result<_, _>>()?,
        None => (8..=13).map(|shift| 1 << shift).collect(),
    };
    let sweep = Sweep {
        level,
        param,
        values,
    };

    let config = SimConfig::load(DEFAULT_CONFIG_PATH)?;
    let traces = TraceSet::study(Path::new(TRACE_DIR))?;
    let layout = Layout::default();
    layout.ensure()?;

    let policies = [Policy::Lru, Policy::Lrudb];
    let mut jobs = Vec::new();
    for policy in policies {
        jobs.extend(sweep_jobs("sweep", &config, policy, &sweep, &traces, &layout)?);
    }
    let results = run_jobs(&jobs, &RunParams::default(), N_JOBS)?;

    let output_dir = Path::new("eval");
    let plot_name = format!("sweep_{}", sweep.label());
    let charts = report::plot_sweep(
        output_dir,
        &plot_name,
        &results,
        &sweep,
        &policies,
        &sweep.level,
    )?;
    eprintln!("Wrote {} charts to {}", charts.len(), output_dir.display());

    Ok(())
}
