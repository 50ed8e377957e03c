//! Labeled multi-dimensional result table
//!
//! Results are indexed by named dimensions whose positions carry string
//! coordinates, e.g. `[job, trace, cache, statistic]`. Data is stored
//! row-major, the last dimension varying fastest.

use std::path::Path;

use crate::error::{StudyResult, TableError};
use crate::job::Job;
use crate::stats::{CacheStats, Statistic};

/// A named axis and its coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct Dim {
    pub name: String,
    pub coords: Vec<String>,
}

impl Dim {
    pub fn make(name: impl Into<String>, coords: Vec<String>) -> Self {
        Self {
            name: name.into(),
            coords,
        }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn position(&self, coord: &str) -> Option<usize> {
        self.coords.iter().position(|c| c == coord)
    }
}

/// What identifies a job along the first table dimension
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobKey {
    /// The job id, e.g. `project-lru`
    Id,
    /// One of the job's labels, e.g. the swept `sets` value
    Label(String),
}

impl JobKey {
    fn dim_name(&self) -> String {
        match self {
            JobKey::Id => "job".to_string(),
            JobKey::Label(key) => key.clone(),
        }
    }

    fn coord(&self, job: &Job) -> String {
        match self {
            JobKey::Id => job.job_id.clone(),
            JobKey::Label(key) => job
                .labels
                .get(key)
                .cloned()
                .unwrap_or_else(|| job.job_id.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    dims: Vec<Dim>,
    data: Vec<f64>,
}

fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for i in (0..shape.len()).rev() {
        index[i] = flat % shape[i];
        flat /= shape[i];
    }
    index
}

fn push_coord(coords: &mut Vec<String>, coord: String) {
    if !coords.contains(&coord) {
        coords.push(coord);
    }
}

impl Table {
    pub fn make(dims: Vec<Dim>, data: Vec<f64>) -> Result<Self, TableError> {
        let shape: Vec<usize> = dims.iter().map(Dim::len).collect();
        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(TableError::ShapeMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Table of `[job, trace, cache, statistic]` from finished jobs
    ///
    /// Coordinates appear in first-seen order. Cells a job did not report
    /// (e.g. a cache level missing from one configuration) are NaN.
    pub fn from_results(
        results: &[(&Job, &[CacheStats])],
        key: &JobKey,
    ) -> Result<Self, TableError> {
        let mut jobs = Vec::new();
        let mut traces = Vec::new();
        let mut caches = Vec::new();
        for (job, stats) in results {
            push_coord(&mut jobs, key.coord(job));
            push_coord(&mut traces, job.trace.label());
            for cache in stats.iter() {
                push_coord(&mut caches, cache.name.clone());
            }
        }
        let statistics: Vec<String> =
            Statistic::ALL.iter().map(|s| s.name().to_string()).collect();

        let dims = vec![
            Dim::make(key.dim_name(), jobs),
            Dim::make("trace", traces),
            Dim::make("cache", caches),
            Dim::make("statistic", statistics),
        ];
        let shape: Vec<usize> = dims.iter().map(Dim::len).collect();
        let mut data = vec![f64::NAN; shape.iter().product()];
        let mut filled = vec![false; data.len()];
        let strides = strides(&shape);

        for (job, stats) in results {
            let j = dims[0].position(&key.coord(job)).unwrap_or_default();
            let t = dims[1].position(&job.trace.label()).unwrap_or_default();
            for cache in stats.iter() {
                let c = dims[2].position(&cache.name).unwrap_or_default();
                let base = j * strides[0] + t * strides[1] + c * strides[2];
                if filled[base] {
                    return Err(TableError::DuplicateCell(vec![
                        key.coord(job),
                        job.trace.label(),
                        cache.name.clone(),
                    ]));
                }
                for (s, stat) in Statistic::ALL.iter().enumerate() {
                    data[base + s] = stat.get(cache);
                    filled[base + s] = true;
                }
            }
        }
        Self::make(dims, data)
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(Dim::len).collect()
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn axis(&self, name: &str) -> Result<usize, TableError> {
        self.dims
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| TableError::UnknownDim(name.to_string()))
    }

    pub fn dim(&self, name: &str) -> Result<&Dim, TableError> {
        Ok(&self.dims[self.axis(name)?])
    }

    pub fn get(&self, index: &[usize]) -> Result<f64, TableError> {
        let shape = self.shape();
        if index.len() != shape.len()
            || index.iter().zip(&shape).any(|(i, n)| i >= n)
        {
            return Err(TableError::OutOfBounds(index.to_vec()));
        }
        let offset: usize = index
            .iter()
            .zip(strides(&shape))
            .map(|(i, stride)| i * stride)
            .sum();
        Ok(self.data[offset])
    }

    /// Select one coordinate, dropping its dimension
    pub fn sel(&self, dim: &str, coord: &str) -> Result<Self, TableError> {
        let axis = self.axis(dim)?;
        let pos = self.dims[axis].position(coord).ok_or_else(|| {
            TableError::UnknownCoord(dim.to_string(), coord.to_string())
        })?;

        let mut dims = self.dims.clone();
        dims.remove(axis);
        let new_shape: Vec<usize> = dims.iter().map(Dim::len).collect();
        let old_strides = strides(&self.shape());
        let len: usize = new_shape.iter().product();

        let data = (0..len)
            .map(|flat| {
                let mut index = unravel(flat, &new_shape);
                index.insert(axis, pos);
                let offset: usize =
                    index.iter().zip(&old_strides).map(|(i, s)| i * s).sum();
                self.data[offset]
            })
            .collect();
        Self::make(dims, data)
    }

    /// Reorder dimensions, `order` names every dimension exactly once
    pub fn transpose(&self, order: &[&str]) -> Result<Self, TableError> {
        if order.len() != self.rank() {
            return Err(TableError::WrongRank {
                expected: self.rank(),
                got: order.len(),
            });
        }
        let axes = order
            .iter()
            .map(|name| self.axis(name))
            .collect::<Result<Vec<_>, _>>()?;
        if (0..self.rank()).any(|a| !axes.contains(&a)) {
            return Err(TableError::WrongRank {
                expected: self.rank(),
                got: order.len(),
            });
        }
        let dims: Vec<Dim> = axes.iter().map(|a| self.dims[*a].clone()).collect();
        let new_shape: Vec<usize> = dims.iter().map(Dim::len).collect();
        let old_strides = strides(&self.shape());
        let len: usize = new_shape.iter().product();

        let data = (0..len)
            .map(|flat| {
                let index = unravel(flat, &new_shape);
                let offset: usize = index
                    .iter()
                    .zip(&axes)
                    .map(|(i, a)| i * old_strides[*a])
                    .sum();
                self.data[offset]
            })
            .collect();
        Self::make(dims, data)
    }

    /// Average over one dimension, ignoring NaN cells
    pub fn mean_over(&self, dim: &str) -> Result<Self, TableError> {
        let axis = self.axis(dim)?;
        let mut dims = self.dims.clone();
        let removed = dims.remove(axis);
        let new_shape: Vec<usize> = dims.iter().map(Dim::len).collect();
        let old_strides = strides(&self.shape());
        let len: usize = new_shape.iter().product();

        let data = (0..len)
            .map(|flat| {
                let mut index = unravel(flat, &new_shape);
                index.insert(axis, 0);
                let base: usize =
                    index.iter().zip(&old_strides).map(|(i, s)| i * s).sum();
                let values: Vec<f64> = (0..removed.len())
                    .map(|k| self.data[base + k * old_strides[axis]])
                    .filter(|v| !v.is_nan())
                    .collect();
                if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            })
            .collect();
        Self::make(dims, data)
    }

    /// Parse a dimension's coordinates as numbers, e.g. swept set counts
    pub fn numeric_coords(&self, dim: &str) -> Result<Vec<f64>, TableError> {
        self.dim(dim)?
            .coords
            .iter()
            .map(|c| {
                c.parse::<f64>()
                    .map_err(|_| TableError::NonNumericCoord(c.clone()))
            })
            .collect()
    }

    fn expect_2d(&self) -> Result<(), TableError> {
        if self.rank() != 2 {
            return Err(TableError::WrongRank {
                expected: 2,
                got: self.rank(),
            });
        }
        Ok(())
    }

    /// Render a 2-D table as aligned plain text
    ///
    /// Column headers are the second dimension's coordinates, the row
    /// index the first's.
    pub fn tabulate(&self) -> Result<String, TableError> {
        self.expect_2d()?;
        let (rows, cols) = (&self.dims[0], &self.dims[1]);

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        let mut header = vec![String::new()];
        header.extend(cols.coords.iter().cloned());
        grid.push(header);
        for (r, row) in rows.coords.iter().enumerate() {
            let mut line = vec![row.clone()];
            for c in 0..cols.len() {
                line.push(format_value(self.data[r * cols.len() + c]));
            }
            grid.push(line);
        }

        let widths: Vec<usize> = (0..=cols.len())
            .map(|c| grid.iter().map(|line| line[c].len()).max().unwrap_or(0))
            .collect();

        let mut out = String::new();
        for (i, line) in grid.iter().enumerate() {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(c, (cell, w))| {
                    if c == 0 {
                        format!("{:<w$}", cell, w = w)
                    } else {
                        format!("{:>w$}", cell, w = w)
                    }
                })
                .collect();
            out.push_str(cells.join("  ").trim_end());
            out.push('\n');
            if i == 0 {
                let rule: Vec<String> =
                    widths.iter().map(|w| "-".repeat(*w)).collect();
                out.push_str(&rule.join("  "));
                out.push('\n');
            }
        }
        Ok(out)
    }

    /// Export a 2-D table as CSV
    pub fn write_csv(&self, path: impl AsRef<Path>) -> StudyResult<()> {
        self.expect_2d()?;
        let (rows, cols) = (&self.dims[0], &self.dims[1]);
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![rows.name.clone()];
        header.extend(cols.coords.iter().cloned());
        writer.write_record(&header)?;
        for (r, row) in rows.coords.iter().enumerate() {
            let mut record = vec![row.clone()];
            for c in 0..cols.len() {
                record.push(format!("{}", self.data[r * cols.len() + c]));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{:.4}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::job::tests::make_trace;
    use crate::job::Layout;
    use crate::stats::parse_results;

    fn coords(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table_2x3() -> Table {
        Table::make(
            vec![
                Dim::make("trace", coords(&["a", "b"])),
                Dim::make("policy", coords(&["lru", "lrudb", "nmru"])),
            ],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap()
    }

    fn stats(name: &str, misses: u64) -> CacheStats {
        let json = format!(
            r#"[{{ "name": "{}", "misses": {}, "hits": 100, "miss_rate": 0.5,
                  "mpki": 1.5, "reuse": 2.0, "lifetime": 10.0,
                  "efficiency": 0.25 }}]"#,
            name, misses
        );
        parse_results(&json).unwrap().remove(0)
    }

    #[test]
    fn test_shape_is_checked() {
        let dims = vec![Dim::make("x", coords(&["1", "2"]))];
        assert!(Table::make(dims.clone(), vec![1.0]).is_err());
        assert!(Table::make(dims, vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_get() {
        let table = table_2x3();
        assert_eq!(table.get(&[0, 0]).unwrap(), 1.0);
        assert_eq!(table.get(&[1, 2]).unwrap(), 6.0);
        assert!(table.get(&[2, 0]).is_err());
        assert!(table.get(&[0]).is_err());
    }

    #[test]
    fn test_sel() {
        let table = table_2x3();
        let lrudb = table.sel("policy", "lrudb").unwrap();
        assert_eq!(lrudb.rank(), 1);
        assert_eq!(lrudb.data(), &[2.0, 5.0]);
        let b = table.sel("trace", "b").unwrap();
        assert_eq!(b.data(), &[4.0, 5.0, 6.0]);
        assert!(table.sel("policy", "fifo").is_err());
        assert!(table.sel("cache", "L1D").is_err());
    }

    #[test]
    fn test_transpose() {
        let table = table_2x3();
        let t = table.transpose(&["policy", "trace"]).unwrap();
        assert_eq!(t.shape(), vec![3, 2]);
        assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t.get(&[2, 1]).unwrap(), table.get(&[1, 2]).unwrap());
        assert!(table.transpose(&["policy"]).is_err());
        assert!(table.transpose(&["trace", "trace"]).is_err());
    }

    #[test]
    fn test_mean_over() {
        let mut table = table_2x3();
        table.data[0] = f64::NAN;
        let mean = table.mean_over("trace").unwrap();
        assert_eq!(mean.data(), &[4.0, 3.5, 4.5]);
    }

    #[test]
    fn test_tabulate() {
        let text = table_2x3().tabulate().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "   lru  lrudb  nmru");
        assert_eq!(lines[1], "-  ---  -----  ----");
        assert_eq!(lines[2], "a    1      2     3");

        let cube = Table::make(
            vec![
                Dim::make("x", coords(&["1"])),
                Dim::make("y", coords(&["1"])),
                Dim::make("z", coords(&["1"])),
            ],
            vec![0.5],
        )
        .unwrap();
        assert!(cube.tabulate().is_err());
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        table_2x3().write_csv(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "trace,lru,lrudb,nmru\na,1,2,3\nb,4,5,6\n");
    }

    #[test]
    fn test_from_results() {
        let layout = Layout::rooted(Path::new("out"));
        let lru = Job::make("lru", SimConfig::default(), make_trace(Path::new("t"), 1), &layout)
            .with_label("sets", 64);
        let db = Job::make("lrudb", SimConfig::default(), make_trace(Path::new("t"), 1), &layout)
            .with_label("sets", 128);
        let lru_stats = vec![stats("L1D", 10), stats("LLC", 20)];
        let db_stats = vec![stats("L1D", 30)];
        let results = vec![(&lru, lru_stats.as_slice()), (&db, db_stats.as_slice())];

        let table = Table::from_results(&results, &JobKey::Id).unwrap();
        assert_eq!(table.shape(), vec![2, 1, 2, Statistic::ALL.len()]);
        assert_eq!(table.dims()[0].coords, coords(&["lru", "lrudb"]));
        assert_eq!(table.dims()[2].coords, coords(&["L1D", "LLC"]));

        let misses = table.sel("statistic", "misses").unwrap();
        let misses = misses.sel("trace", "1.bench").unwrap();
        assert_eq!(misses.get(&[0, 1]).unwrap(), 20.0);
        assert_eq!(misses.get(&[1, 0]).unwrap(), 30.0);
        assert!(misses.get(&[1, 1]).unwrap().is_nan());

        let by_sets = Table::from_results(&results, &JobKey::Label("sets".into())).unwrap();
        assert_eq!(by_sets.numeric_coords("sets").unwrap(), vec![64.0, 128.0]);
        assert!(table.numeric_coords("job").is_err());
    }

    #[test]
    fn test_duplicate_cells() {
        let layout = Layout::rooted(Path::new("out"));
        let a = Job::make("a", SimConfig::default(), make_trace(Path::new("t"), 1), &layout)
            .with_label("ways", 4);
        let b = Job::make("b", SimConfig::default(), make_trace(Path::new("t"), 1), &layout)
            .with_label("ways", 4);
        let s = vec![stats("L1D", 1)];
        let results = vec![(&a, s.as_slice()), (&b, s.as_slice())];
        assert!(Table::from_results(&results, &JobKey::Id).is_ok());
        assert!(matches!(
            Table::from_results(&results, &JobKey::Label("ways".into())),
            Err(TableError::DuplicateCell(_))
        ));
    }
}
