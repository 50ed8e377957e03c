//! Trace registry and download

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::TraceError;

pub const TRACE_DIR: &str = "traces";
pub const TRACE_URL_ROOT: &str =
    "https://dpc3.compas.cs.stonybrook.edu/champsim-traces/speccpu/";

/// Traces used by the study
pub const TRACE_FILES: [&str; 10] = [
    "600.perlbench_s-210B.champsimtrace.xz",
    "401.bzip2-226B.champsimtrace.xz",
    "429.mcf-217B.champsimtrace.xz",
    "450.soplex-247B.champsimtrace.xz",
    "453.povray-252B.champsimtrace.xz",
    "456.hmmer-191B.champsimtrace.xz",
    "464.h264ref-97B.champsimtrace.xz",
    "473.astar-153B.champsimtrace.xz",
    "605.mcf_s-472B.champsimtrace.xz",
    "602.gcc_s-1850B.champsimtrace.xz",
];

const CHUNK_SIZE: usize = 64 * 1024;

/// A recorded instruction stream fed to the simulator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    pub num: u32,
    pub path: PathBuf,
}

impl Trace {
    /// Build a trace from its file name, e.g. `429.mcf-217B.champsimtrace.xz`
    pub fn make(dir: &Path, file_name: &str) -> Result<Self, TraceError> {
        let num = file_name
            .split_once('.')
            .and_then(|(prefix, _)| prefix.parse().ok())
            .ok_or_else(|| TraceError::MissingId(file_name.to_string()))?;
        Ok(Self {
            num,
            path: dir.join(file_name),
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Benchmark name without the id and the sample suffix
    pub fn label(&self) -> String {
        let name = self.file_name();
        let bench = name.split('.').nth(1).unwrap_or(name.as_str());
        let bench = bench.rsplit_once('-').map_or(bench, |(b, _)| b);
        format!("{}.{}", self.num, bench)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Traces keyed by numeric id
#[derive(Clone, Debug, Default)]
pub struct TraceSet {
    traces: BTreeMap<u32, Trace>,
}

impl TraceSet {
    pub fn registry<'a>(
        dir: &Path,
        files: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, TraceError> {
        let mut traces = BTreeMap::new();
        for file_name in files {
            let trace = Trace::make(dir, file_name)?;
            if traces.contains_key(&trace.num) {
                return Err(TraceError::DuplicateId(trace.num));
            }
            traces.insert(trace.num, trace);
        }
        Ok(Self { traces })
    }

    /// The study's default traces under `dir`
    pub fn study(dir: &Path) -> Result<Self, TraceError> {
        Self::registry(dir, TRACE_FILES)
    }

    pub fn get(&self, num: u32) -> Result<&Trace, TraceError> {
        self.traces.get(&num).ok_or(TraceError::UnknownId(num))
    }

    /// Keep only the given ids; an empty filter keeps everything
    pub fn filter(&self, nums: &[u32]) -> Result<Self, TraceError> {
        if nums.is_empty() {
            return Ok(self.clone());
        }
        let mut traces = BTreeMap::new();
        for num in nums {
            traces.insert(*num, self.get(*num)?.clone());
        }
        Ok(Self { traces })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trace> {
        self.traces.values()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn missing(&self) -> Vec<&Trace> {
        self.iter().filter(|t| !t.exists()).collect()
    }
}

/// Create a directory if needed, returns whether it was created
pub fn ensure_dir(dir: &Path) -> Result<bool, TraceError> {
    if dir.exists() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|e| TraceError::IoError(dir.into(), e))?;
    Ok(true)
}

/// Download one trace from `url_root`
///
/// The body is streamed into `<file>.part` and renamed once complete so an
/// interrupted download never looks like a finished trace.
pub fn download(trace: &Trace, url_root: &str) -> Result<(), TraceError> {
    let url = format!("{}{}", url_root, trace.file_name());
    tracing::info!(%url, "Downloading {}", trace.file_name());

    let response = ureq::get(&url)
        .call()
        .map_err(|e| TraceError::DownloadError(url.clone(), e.to_string()))?;
    let total: Option<u64> = response
        .header("Content-Length")
        .and_then(|len| len.parse().ok());

    let part = trace
        .path
        .with_file_name(format!("{}.part", trace.file_name()));
    let received = match write_part(trace, response, total, &part) {
        Ok(received) => received,
        Err(e) => {
            let _ = fs::remove_file(&part);
            return Err(e);
        }
    };

    fs::rename(&part, &trace.path)
        .map_err(|e| TraceError::IoError(trace.path.clone(), e))?;
    tracing::info!("Downloaded {} ({} B)", trace.file_name(), received);
    Ok(())
}

/// Stream a response body into `part`, returns the number of bytes written
fn write_part(
    trace: &Trace,
    response: ureq::Response,
    total: Option<u64>,
    part: &Path,
) -> Result<u64, TraceError> {
    let io_err = |e| TraceError::IoError(part.to_path_buf(), e);
    let mut file = File::create(part).map_err(io_err)?;
    let mut reader = response.into_reader();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut received: u64 = 0;
    let mut next_report = 10;
    loop {
        let n = reader.read(&mut buffer).map_err(io_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n]).map_err(io_err)?;
        received += n as u64;
        if let Some(total) = total.filter(|t| *t > 0) {
            let percent = received * 100 / total;
            if percent >= next_report {
                tracing::info!("{}: {}% of {} B", trace.file_name(), percent, total);
                next_report = percent / 10 * 10 + 10;
            }
        }
    }
    file.flush().map_err(io_err)?;
    Ok(received)
}

/// Download every trace that is not present yet
pub fn download_missing(set: &TraceSet, url_root: &str) -> Result<usize, TraceError> {
    let missing = set.missing();
    for trace in &missing {
        download(trace, url_root)?;
    }
    Ok(missing.len())
}
