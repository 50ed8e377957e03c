use std::path::Path;
use std::process;

use study_lib::config::{Policy, SimConfig, DEFAULT_CONFIG_PATH};
use study_lib::error::StudyResult;
use study_lib::experiment::policy_jobs;
use study_lib::job::{Layout, RunParams};
use study_lib::runner::{run_jobs, N_JOBS};
use study_lib::stats::Statistic;
use study_lib::trace::{TraceSet, TRACE_DIR};
use study_lib::{logging, report};

fn main() {
    logging::init(false);
    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// LRU against the database-informed LRU on every study trace
fn run_eval() -> StudyResult<()> {
    let output_dir = Path::new("eval");
    std::fs::create_dir_all(output_dir)?;

    let config = SimConfig::load(DEFAULT_CONFIG_PATH)?;
    let traces = TraceSet::study(Path::new(TRACE_DIR))?;
    let layout = Layout::default();
    layout.ensure()?;

    let jobs = policy_jobs(
        "project",
        &config,
        &[Policy::Lru, Policy::Lrudb],
        &traces,
        &layout,
    );
    let results = run_jobs(&jobs, &RunParams::default(), N_JOBS)?;

    for cache in config.level_names() {
        for statistic in [Statistic::MissRate, Statistic::Mpki, Statistic::Efficiency] {
            println!("{}", report::summary(&results, &cache, statistic)?);
            let output_path =
                output_dir.join(format!("project_{}_{}.csv", cache, statistic));
            report::cache_table(&results, &cache, statistic)?
                .write_csv(&output_path)?;
        }
    }

    let last_level = config.level_names().pop().unwrap_or_default();
    let charts =
        report::plot_policy_bars(output_dir, "project", &results, &last_level)?;
    eprintln!("Wrote {} charts to {}", charts.len(), output_dir.display());

    Ok(())
}
