//! Tables and charts of finished experiments

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Policy;
use crate::error::{StudyError, StudyResult};
use crate::experiment::{Sweep, POLICY_LABEL};
use crate::image::Grid;
use crate::job::Job;
use crate::plot;
use crate::stats::{CacheStats, Statistic};
use crate::table::{JobKey, Table};

pub type JobResults<'a> = Vec<(&'a Job, &'a [CacheStats])>;

/// `[trace, job]` table of one statistic of one cache level
pub fn cache_table(
    results: &[(&Job, &[CacheStats])],
    cache: &str,
    statistic: Statistic,
) -> StudyResult<Table> {
    let table = Table::from_results(results, &JobKey::Id)?
        .sel("cache", cache)?
        .sel("statistic", statistic.name())?
        .transpose(&["trace", "job"])?;
    Ok(table)
}

/// `[swept value, trace, statistic]` table of one policy's sweep
pub fn sweep_table(
    results: &[(&Job, &[CacheStats])],
    sweep: &Sweep,
    policy: Policy,
    cache: &str,
) -> StudyResult<Table> {
    let policy = policy.to_string();
    let selected: Vec<(&Job, &[CacheStats])> = results
        .iter()
        .filter(|(job, _)| job.labels.get(POLICY_LABEL) == Some(&policy))
        .cloned()
        .collect();
    let table = Table::from_results(&selected, &JobKey::Label(sweep.label()))?
        .sel("cache", cache)?;
    Ok(table)
}

/// Tabulate `statistic` for `cache`, with a mean row over all traces
pub fn summary(
    results: &[(&Job, &[CacheStats])],
    cache: &str,
    statistic: Statistic,
) -> StudyResult<String> {
    let table = cache_table(results, cache, statistic)?;
    let mean = table.mean_over("trace")?;
    let mut rows = table.dims()[0].clone();
    rows.coords.push("mean".to_string());
    let mut data = table.data().to_vec();
    data.extend_from_slice(mean.data());
    let table = Table::make(vec![rows, table.dims()[1].clone()], data)?;

    let mut text = format!("{} {}\n", cache, statistic);
    text.push_str(&table.tabulate()?);
    Ok(text)
}

fn ensure_out_dir(out_dir: &Path) -> StudyResult<()> {
    fs::create_dir_all(out_dir).map_err(StudyError::IoError)
}

/// One grouped bar chart per statistic, traces against jobs
pub fn plot_policy_bars(
    out_dir: &Path,
    name: &str,
    results: &[(&Job, &[CacheStats])],
    cache: &str,
) -> StudyResult<Vec<PathBuf>> {
    ensure_out_dir(out_dir)?;
    let mut paths = Vec::new();
    for statistic in Statistic::ALL {
        let table = cache_table(results, cache, statistic)?;
        let path = out_dir.join(format!("{}_{}_{}.svg", name, cache, statistic));
        let title = format!("{} {} per trace", cache, statistic);
        plot::plot_bars(&path, &title, statistic.name(), &table)?;
        paths.push(path);
    }
    Ok(paths)
}

/// Line charts of every statistic against the swept value, per policy
pub fn plot_sweep(
    out_dir: &Path,
    name: &str,
    results: &[(&Job, &[CacheStats])],
    sweep: &Sweep,
    policies: &[Policy],
    cache: &str,
) -> StudyResult<Vec<PathBuf>> {
    ensure_out_dir(out_dir)?;
    let mut paths = Vec::new();
    for policy in policies {
        let table = sweep_table(results, sweep, *policy, cache)?;
        let root = format!("{}_{}_{}", name, policy, cache);
        for plot_num in 0..Statistic::ALL.len() {
            paths.push(plot::plot_data(
                out_dir,
                &root,
                &sweep.label(),
                &sweep.title(),
                &table,
                plot_num,
            )?);
        }
    }
    Ok(paths)
}

/// Heat-maps of every job's efficiency image for `cache`
pub fn plot_efficiency(
    out_dir: &Path,
    results: &[(&Job, &[CacheStats])],
    cache: &str,
) -> StudyResult<Vec<PathBuf>> {
    ensure_out_dir(out_dir)?;
    let mut paths = Vec::new();
    for (job, stats) in results {
        let image = stats
            .iter()
            .find(|s| s.name == cache)
            .and_then(|s| s.efficiency_image.as_deref());
        let Some(image) = image else {
            tracing::warn!("Job {} has no efficiency image for {}", job.total_id(), cache);
            continue;
        };
        let grid = Grid::reshape(image);
        let path = out_dir.join(format!("{}_{}_efficiency.svg", job.total_id(), cache));
        let title = format!("{} {} efficiency", job.total_id(), cache);
        plot::plot_heatmap(&grid, &title, &path)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelParam, SimConfig};
    use crate::experiment::{policy_jobs, sweep_jobs};
    use crate::job::Layout;
    use crate::stats::parse_results;
    use crate::trace::TraceSet;

    fn stats_for(job: &Job) -> Vec<CacheStats> {
        // Distinct values per job so selections are checkable
        let misses = job.total_id().len() as u64 + job.trace.num as u64;
        let json = format!(
            r#"[{{ "name": "LLC", "misses": {}, "hits": 100, "miss_rate": 0.5,
                  "mpki": 1.5, "reuse": 2.0, "lifetime": 10.0,
                  "efficiency": 0.25 }}]"#,
            misses
        );
        parse_results(&json).unwrap()
    }

    fn traces() -> TraceSet {
        TraceSet::study(Path::new("traces"))
            .unwrap()
            .filter(&[429, 602])
            .unwrap()
    }

    #[test]
    fn test_cache_table_and_summary() {
        let layout = Layout::default();
        let jobs = policy_jobs(
            "project",
            &SimConfig::default(),
            &[Policy::Lru, Policy::Lrudb],
            &traces(),
            &layout,
        );
        let stats: Vec<Vec<CacheStats>> = jobs.iter().map(stats_for).collect();
        let results: JobResults =
            jobs.iter().zip(&stats).map(|(j, s)| (j, s.as_slice())).collect();

        let table = cache_table(&results, "LLC", Statistic::Misses).unwrap();
        assert_eq!(table.shape(), vec![2, 2]);
        assert_eq!(table.dims()[0].coords, vec!["429.mcf", "602.gcc_s"]);
        assert_eq!(table.dims()[1].coords, vec!["project-lru", "project-lrudb"]);
        // "project-lrudb-tr602" is 19 characters
        assert_eq!(table.get(&[1, 1]).unwrap(), 19.0 + 602.0);

        assert!(cache_table(&results, "L1D", Statistic::Misses).is_err());

        let text = summary(&results, "LLC", Statistic::MissRate).unwrap();
        assert!(text.starts_with("LLC miss_rate\n"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1].trim(), "project-lru  project-lrudb");
        // The mean row shares the data rows' column layout
        assert_eq!(lines[5], lines[3].replacen("429.mcf", "mean   ", 1));
        assert!(lines[5].ends_with("0.5000"));
    }

    #[test]
    fn test_sweep_table() {
        let layout = Layout::default();
        let sweep = Sweep {
            level: "LLC".to_string(),
            param: LevelParam::Sets,
            values: vec![1024, 2048],
        };
        let mut jobs = Vec::new();
        for policy in [Policy::Lru, Policy::Lrudb] {
            jobs.extend(
                sweep_jobs("sweep", &SimConfig::default(), policy, &sweep, &traces(), &layout)
                    .unwrap(),
            );
        }
        let stats: Vec<Vec<CacheStats>> = jobs.iter().map(stats_for).collect();
        let results: JobResults =
            jobs.iter().zip(&stats).map(|(j, s)| (j, s.as_slice())).collect();

        let table = sweep_table(&results, &sweep, Policy::Lrudb, "LLC").unwrap();
        assert_eq!(table.dims()[0].name, "LLC_sets");
        assert_eq!(table.numeric_coords("LLC_sets").unwrap(), vec![1024.0, 2048.0]);
        assert_eq!(table.shape(), vec![2, 2, Statistic::ALL.len()]);
    }

    #[test]
    fn test_plot_efficiency_skips_jobs_without_image() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::default();
        let jobs = policy_jobs(
            "project",
            &SimConfig::default(),
            &[Policy::Lru],
            &traces(),
            &layout,
        );
        let stats: Vec<Vec<CacheStats>> = jobs.iter().map(stats_for).collect();
        let results: JobResults =
            jobs.iter().zip(&stats).map(|(j, s)| (j, s.as_slice())).collect();
        let paths = plot_efficiency(dir.path(), &results, "LLC").unwrap();
        assert!(paths.is_empty());
    }
}
