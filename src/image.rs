//! Efficiency images
//!
//! The simulator reports one efficiency value per block. Plotted as a
//! single row it is unreadable, so the values are folded into a grid that
//! is as close to square as possible.

/// Rows and columns of the most square grid holding `n` cells
pub fn near_square(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let mut cols = (n as f64).sqrt().ceil() as usize;
    // Guard against float rounding on perfect squares
    while cols > 1 && (cols - 1) * (cols - 1) >= n {
        cols -= 1;
    }
    while cols * cols < n {
        cols += 1;
    }
    let rows = n.div_ceil(cols);
    (rows, cols)
}

/// Row-major grid of values, padded with NaN
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<f64>,
}

impl Grid {
    pub fn reshape(values: &[f64]) -> Self {
        let (rows, cols) = near_square(values.len());
        let mut cells = values.to_vec();
        cells.resize(rows * cols, f64::NAN);
        Self { rows, cols, cells }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    /// Smallest and largest non-NaN value
    pub fn range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_square() {
        assert_eq!(near_square(0), (0, 0));
        assert_eq!(near_square(1), (1, 1));
        assert_eq!(near_square(2), (1, 2));
        assert_eq!(near_square(5), (2, 3));
        assert_eq!(near_square(16), (4, 4));
        assert_eq!(near_square(17), (4, 5));
        assert_eq!(near_square(2048 * 16), (181, 182));
        for n in 1..2000 {
            let (rows, cols) = near_square(n);
            assert!(rows * cols >= n);
            assert!(rows <= cols);
            assert!((rows - 1) * cols < n);
        }
    }

    #[test]
    fn test_reshape_pads_with_nan() {
        let grid = Grid::reshape(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!((grid.rows, grid.cols), (2, 3));
        assert_eq!(grid.get(0, 2), Some(0.3));
        assert_eq!(grid.get(1, 1), Some(0.5));
        assert!(grid.get(1, 2).unwrap().is_nan());
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.range(), Some((0.1, 0.5)));
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::reshape(&[]);
        assert_eq!(grid.cells.len(), 0);
        assert_eq!(grid.range(), None);
    }
}
