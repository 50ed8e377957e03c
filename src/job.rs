//! One memoized simulator invocation
//!
//! A job pairs a cache configuration with a trace. Its composite id names
//! the result file, so a job whose result file already exists is never
//! run again.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::config::SimConfig;
use crate::error::JobError;
use crate::stats::{self, CacheStats};
use crate::trace::Trace;

pub const WARM_INSTR: u64 = 100_000_000;
pub const SIM_INSTR: u64 = 250_000_000;

/// Where results and per-job extras live
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub results_dir: PathBuf,
    pub extras_dir: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::rooted(Path::new("."))
    }
}

impl Layout {
    pub fn rooted(root: &Path) -> Self {
        Self {
            results_dir: root.join("results"),
            extras_dir: root.join("extras"),
        }
    }

    pub fn ensure(&self) -> Result<(), JobError> {
        for dir in [&self.results_dir, &self.extras_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| JobError::IoError(dir.clone(), e))?;
        }
        Ok(())
    }
}

/// How the simulator is launched
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunParams {
    /// Program and leading arguments, job arguments are appended
    pub command: Vec<String>,
    pub warm_instr: u64,
    pub sim_instr: u64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            command: ["cargo", "run", "--release", "--"]
                .map(String::from)
                .to_vec(),
            warm_instr: WARM_INSTR,
            sim_instr: SIM_INSTR,
        }
    }
}

/// A (configuration, trace) pair submitted to the simulator
#[derive(Debug)]
pub struct Job {
    pub job_id: String,
    pub config: SimConfig,
    pub trace: Trace,
    /// Free-form coordinates (e.g. the swept parameter) used when tabulating
    pub labels: BTreeMap<String, String>,
    layout: Layout,
    result: OnceLock<Vec<CacheStats>>,
}

impl Job {
    pub fn make(
        job_id: impl Into<String>,
        config: SimConfig,
        trace: Trace,
        layout: &Layout,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            config,
            trace,
            labels: BTreeMap::new(),
            layout: layout.clone(),
            result: OnceLock::new(),
        }
    }

    pub fn with_label(
        mut self,
        key: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        self.labels.insert(key.into(), value.to_string());
        self
    }

    pub fn total_id(&self) -> String {
        format!("{}-tr{}", self.job_id, self.trace.num)
    }

    pub fn result_path(&self) -> PathBuf {
        self.layout
            .results_dir
            .join(format!("{}.json", self.total_id()))
    }

    pub fn extra_dir(&self) -> PathBuf {
        self.layout.extras_dir.join(self.total_id())
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.extra_dir().join("stdout.txt")
    }

    /// A finished result file exists for this job
    pub fn is_cached(&self) -> bool {
        self.result_path().exists()
    }

    /// Arguments appended to the simulator command
    pub fn args(&self, params: &RunParams) -> Result<Vec<String>, JobError> {
        let config = self
            .config
            .to_json()
            .map_err(|e| JobError::ConfigError(self.total_id(), e))?;
        Ok(vec![
            "-w".to_string(),
            params.warm_instr.to_string(),
            "-i".to_string(),
            params.sim_instr.to_string(),
            "--json".to_string(),
            self.result_path().to_string_lossy().into_owned(),
            "-t".to_string(),
            self.trace.path.to_string_lossy().into_owned(),
            "--config".to_string(),
            config,
        ])
    }

    /// Run the simulator, capturing its output under the extras directory
    pub fn run(&self, params: &RunParams) -> Result<(), JobError> {
        let (program, leading) =
            params.command.split_first().ok_or(JobError::EmptyCommand)?;
        let extra_dir = self.extra_dir();
        fs::create_dir_all(&extra_dir)
            .map_err(|e| JobError::IoError(extra_dir.clone(), e))?;

        let stdout_path = self.stdout_path();
        let io_err = |e| JobError::IoError(stdout_path.clone(), e);
        let stdout = File::create(&stdout_path).map_err(io_err)?;
        let stderr = stdout.try_clone().map_err(io_err)?;

        let args = self.args(params)?;
        tracing::info!("Running  Job {}", self.total_id());
        tracing::debug!("{} {} {}", program, leading.join(" "), args.join(" "));

        let status = Command::new(program)
            .args(leading)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|e| JobError::SpawnError(self.total_id(), e))?;

        if !status.success() {
            tracing::warn!("Job {} failed: {}", self.total_id(), status);
            return Err(JobError::SimulatorFailed(
                self.total_id(),
                status,
                stdout_path,
            ));
        }
        if !self.is_cached() {
            return Err(JobError::MissingResult(
                self.total_id(),
                self.result_path(),
            ));
        }
        tracing::info!("Finished Job {}", self.total_id());
        Ok(())
    }

    /// Read and parse the result file
    pub fn load(&self) -> Result<Vec<CacheStats>, JobError> {
        let path = self.result_path();
        if !path.exists() {
            return Err(JobError::MissingResult(self.total_id(), path));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| JobError::IoError(path.clone(), e))?;
        stats::parse_results(&content)
            .map_err(|e| JobError::ParseError(self.total_id(), e))
    }

    /// Results of this job, running the simulator only if needed
    pub fn results(&self, params: &RunParams) -> Result<&[CacheStats], JobError> {
        if let Some(results) = self.result.get() {
            return Ok(results.as_slice());
        }
        if self.is_cached() {
            tracing::debug!("Reusing {}", self.result_path().display());
        } else {
            self.run(params)?;
        }
        let loaded = self.load()?;
        Ok(self.result.get_or_init(|| loaded).as_slice())
    }

    /// Results already loaded by [`Job::results`]
    pub fn cached_results(&self) -> Option<&[CacheStats]> {
        self.result.get().map(Vec::as_slice)
    }
}
