//! Command line flags of the `study` binary

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{LevelParam, Policy};
use crate::experiment::Sweep;
use crate::job::{RunParams, SIM_INSTR, WARM_INSTR};
use crate::runner::N_JOBS;
use crate::stats::Statistic;

/// Cache replacement-policy study harness.
#[derive(Parser, Debug)]
#[command(version)]
pub struct StudyArgs {
    /// Directory holding traces/, results/, extras/ and plots/.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Default simulator configuration, relative to the root.
    #[arg(long, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enables debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the study's traces that are not present yet.
    Download,

    /// Run every job that has no result yet.
    Run {
        #[command(flatten)]
        jobs: JobArgs,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print one statistic of one cache level, traces against jobs.
    Table {
        #[command(flatten)]
        jobs: JobArgs,
        #[command(flatten)]
        run: RunArgs,

        /// Cache level to report.
        #[arg(long, default_value = "LLC")]
        cache: String,

        /// Statistic to report.
        #[arg(long, default_value = "miss_rate")]
        statistic: Statistic,

        /// Also export the table as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Draw one chart per statistic for one cache level.
    Plot {
        #[command(flatten)]
        jobs: JobArgs,
        #[command(flatten)]
        run: RunArgs,

        /// Cache level to plot.
        #[arg(long, default_value = "LLC")]
        cache: String,
    },

    /// Draw the efficiency image of one cache level for every job.
    Heatmap {
        #[command(flatten)]
        jobs: JobArgs,
        #[command(flatten)]
        run: RunArgs,

        /// Cache level to plot.
        #[arg(long, default_value = "LLC")]
        cache: String,
    },
}

impl Command {
    /// Jobs and launch flags of the commands that run an experiment
    pub fn experiment(&self) -> Option<(&JobArgs, &RunArgs)> {
        match self {
            Command::Download => None,
            Command::Run { jobs, run }
            | Command::Table { jobs, run, .. }
            | Command::Plot { jobs, run, .. }
            | Command::Heatmap { jobs, run, .. } => Some((jobs, run)),
        }
    }
}

/// Which jobs an experiment consists of
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Experiment name, the prefix of every job id.
    #[arg(long, default_value = "project")]
    pub name: String,

    /// Replacement policies to compare.
    #[arg(short, long = "policy", value_delimiter = ',', default_values_t = [Policy::Lru, Policy::Lrudb])]
    pub policies: Vec<Policy>,

    /// Trace ids to run, all study traces by default.
    #[arg(short, long, value_delimiter = ',')]
    pub traces: Vec<u32>,

    /// Cache level to sweep.
    #[arg(long, requires = "values")]
    pub level: Option<String>,

    /// Geometry parameter to sweep: sets or ways.
    #[arg(long, default_value = "sets")]
    pub param: LevelParam,

    /// Swept values.
    #[arg(long, value_delimiter = ',', requires = "level")]
    pub values: Vec<usize>,
}

impl JobArgs {
    pub fn sweep(&self) -> Option<Sweep> {
        self.level.as_ref().map(|level| Sweep {
            level: level.clone(),
            param: self.param,
            values: self.values.clone(),
        })
    }
}

/// How the simulator is launched
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Maximum number of simulator processes at once.
    #[arg(short = 'j', long = "jobs", default_value_t = N_JOBS)]
    pub n_jobs: usize,

    /// Warmup instructions.
    #[arg(short, long, default_value_t = WARM_INSTR)]
    pub warm: u64,

    /// Simulated instructions after warmup.
    #[arg(short, long, default_value_t = SIM_INSTR)]
    pub instr: u64,

    /// Simulator command line, job arguments are appended.
    #[arg(long, default_value = "cargo run --release --")]
    pub sim: String,
}

impl From<&RunArgs> for RunParams {
    fn from(args: &RunArgs) -> Self {
        RunParams {
            command: args.sim.split_whitespace().map(String::from).collect(),
            warm_instr: args.warm,
            sim_instr: args.instr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = StudyArgs::try_parse_from(["study", "run"]).unwrap();
        let Command::Run { jobs, run } = args.command else {
            panic!("expected run");
        };
        assert_eq!(jobs.name, "project");
        assert_eq!(jobs.policies, vec![Policy::Lru, Policy::Lrudb]);
        assert!(jobs.traces.is_empty());
        assert_eq!(jobs.sweep(), None);
        assert_eq!(RunParams::from(&run), RunParams::default());
        assert_eq!(run.n_jobs, N_JOBS);
    }

    #[test]
    fn test_sweep_flags() {
        let args = StudyArgs::try_parse_from([
            "study", "plot", "--policy", "lrudb", "--level", "LLC", "--param",
            "ways", "--values", "4,8,16", "-t", "429,602", "--cache", "L2C",
        ])
        .unwrap();
        let Command::Plot { jobs, cache, .. } = args.command else {
            panic!("expected plot");
        };
        assert_eq!(cache, "L2C");
        assert_eq!(jobs.traces, vec![429, 602]);
        let sweep = jobs.sweep().unwrap();
        assert_eq!(sweep.param, LevelParam::Ways);
        assert_eq!(sweep.values, vec![4, 8, 16]);
    }

    #[test]
    fn test_invalid_flags() {
        assert!(StudyArgs::try_parse_from(["study", "run", "-p", "fifo"]).is_err());
        assert!(StudyArgs::try_parse_from(["study", "run", "--level", "LLC"]).is_err());
        assert!(
            StudyArgs::try_parse_from(["study", "table", "--statistic", "ipc"]).is_err()
        );
    }

    #[test]
    fn test_sim_command() {
        let args = StudyArgs::try_parse_from([
            "study", "run", "--sim", "./target/release/sim --quiet", "-w", "0",
        ])
        .unwrap();
        let Command::Run { run, .. } = args.command else {
            panic!("expected run");
        };
        let params = RunParams::from(&run);
        assert_eq!(params.command, vec!["./target/release/sim", "--quiet"]);
        assert_eq!(params.warm_instr, 0);
    }

    #[test]
    fn test_experiment_commands() {
        let args = StudyArgs::try_parse_from(["study", "download"]).unwrap();
        assert!(args.command.experiment().is_none());

        for command in ["run", "table", "plot", "heatmap"] {
            let args =
                StudyArgs::try_parse_from(["study", command, "-j", "3"]).unwrap();
            let (jobs, run) = args.command.experiment().unwrap();
            assert_eq!(jobs.name, "project");
            assert_eq!(run.n_jobs, 3);
        }
    }
}
