use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;

use clap::Parser;
use study_lib::config::SimConfig;
use study_lib::error::StudyResult;
use study_lib::experiment::{policy_jobs, sweep_jobs};
use study_lib::flags::{Command, JobArgs, StudyArgs};
use study_lib::job::{Job, Layout, RunParams};
use study_lib::plot::PLOT_DIR;
use study_lib::trace::{self, TraceSet, TRACE_DIR, TRACE_URL_ROOT};
use study_lib::{logging, report, runner};

fn main() -> Result<(), Box<dyn Error>> {
    let args = StudyArgs::parse();
    logging::init(args.verbose);

    let root = args.root.as_path();
    let trace_dir = root.join(TRACE_DIR);
    let plot_dir = root.join(PLOT_DIR);
    let layout = Layout::rooted(root);

    let Some((jobs_args, run_args)) = args.command.experiment() else {
        trace::ensure_dir(&trace_dir)?;
        let study = TraceSet::study(&trace_dir)?;
        let n = trace::download_missing(&study, TRACE_URL_ROOT)?;
        tracing::info!("Downloaded {} of {} traces", n, study.len());
        return Ok(());
    };

    prepare_traces(&trace_dir)?;
    layout.ensure()?;
    let config = load_config(&root.join(&args.config))?;
    let traces = TraceSet::study(&trace_dir)?.filter(&jobs_args.traces)?;
    for missing in traces.missing() {
        tracing::warn!("Trace {} is missing", missing.path.display());
    }

    let jobs = build_jobs(jobs_args, &config, &traces, &layout)?;
    let results = runner::run_jobs(&jobs, &RunParams::from(run_args), run_args.n_jobs)?;

    match &args.command {
        Command::Download => unreachable!("downloads return before any job runs"),
        Command::Run { .. } => {
            tracing::info!("{} jobs done", results.len());
        }
        Command::Table {
            cache,
            statistic,
            csv,
            ..
        } => {
            print!("{}", report::summary(&results, cache, *statistic)?);
            if let Some(path) = csv {
                report::cache_table(&results, cache, *statistic)?.write_csv(path)?;
                tracing::info!("Wrote {}", path.display());
            }
        }
        Command::Plot { cache, .. } => {
            let paths = match jobs_args.sweep() {
                Some(sweep) => report::plot_sweep(
                    &plot_dir,
                    &jobs_args.name,
                    &results,
                    &sweep,
                    &jobs_args.policies,
                    cache,
                )?,
                None => report::plot_policy_bars(
                    &plot_dir,
                    &jobs_args.name,
                    &results,
                    cache,
                )?,
            };
            println!("Wrote {} charts to {}", paths.len(), plot_dir.display());
        }
        Command::Heatmap { cache, .. } => {
            let paths = report::plot_efficiency(&plot_dir, &results, cache)?;
            println!("Wrote {} heat-maps to {}", paths.len(), plot_dir.display());
        }
    }

    Ok(())
}

/// Offer to download the traces the first time the trace directory is made
fn prepare_traces(trace_dir: &Path) -> StudyResult<()> {
    if trace::ensure_dir(trace_dir)? && ask("Download champsim Traces? [y/N] ")? {
        trace::download_missing(&TraceSet::study(trace_dir)?, TRACE_URL_ROOT)?;
    }
    Ok(())
}

fn ask(question: &str) -> io::Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}

fn load_config(path: &Path) -> StudyResult<SimConfig> {
    if !path.exists() {
        tracing::warn!(
            "{} not found, using the built-in hierarchy",
            path.display()
        );
        return Ok(SimConfig::default());
    }
    Ok(SimConfig::load(path)?)
}

fn build_jobs(
    args: &JobArgs,
    config: &SimConfig,
    traces: &TraceSet,
    layout: &Layout,
) -> StudyResult<Vec<Job>> {
    let Some(sweep) = args.sweep() else {
        return Ok(policy_jobs(&args.name, config, &args.policies, traces, layout));
    };
    let mut jobs = Vec::new();
    for policy in &args.policies {
        jobs.extend(sweep_jobs(&args.name, config, *policy, &sweep, traces, layout)?);
    }
    Ok(jobs)
}
