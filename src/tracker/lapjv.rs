//! Dense linear assignment after Jonker and Volgenant.
//!
//! The solver runs in three phases over a square cost matrix: column
//! reduction with reduction transfer, a bounded number of augmenting row
//! reduction rounds, and finally a shortest augmenting path search (a
//! modified Dijkstra over reduced costs) for every row still free.
//!
//! Rectangular problems and forbidden pairs are handled by [`solve`], which
//! embeds the input in an `(N + M) x (N + M)` matrix whose padding carries
//! the cost of leaving a row or column unmatched.

use ndarray::ArrayView2;

use crate::error::AssignmentError;

const LARGE: f64 = 1_000_000.0;

/// Augmenting row reduction rounds run before falling back to path search.
const ROW_REDUCTION_ROUNDS: usize = 2;

/// Optimal assignment for a cost matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Matched column for each row.
    pub rowsol: Vec<Option<usize>>,
    /// Matched row for each column.
    pub colsol: Vec<Option<usize>>,
    /// Sum of the input costs over matched pairs.
    pub cost: f64,
}

impl Assignment {
    fn unmatched(rows: usize, cols: usize) -> Self {
        Self {
            rowsol: vec![None; rows],
            colsol: vec![None; cols],
            cost: 0.0,
        }
    }

    /// Matched `(row, col)` pairs in row order.
    pub fn matches(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rowsol
            .iter()
            .enumerate()
            .filter_map(|(row, &col)| col.map(|col| (row, col)))
    }

    pub fn unmatched_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rowsol
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.is_none().then_some(row))
    }

    pub fn unmatched_cols(&self) -> impl Iterator<Item = usize> + '_ {
        self.colsol
            .iter()
            .enumerate()
            .filter_map(|(col, row)| row.is_none().then_some(col))
    }
}

/// Solve the assignment problem for `cost`, minimizing the total cost.
///
/// A non-square matrix is only accepted with `extend_cost`. When either
/// `extend_cost` is set or a `cost_limit` is given, the matrix is padded to
/// `rows + cols` square. With a limit every padding cell costs `limit / 2`,
/// so a real pair costing more than `limit` never beats leaving both of its
/// ends unmatched. Without a limit padding costs one more than the largest
/// entry. Matches that land in the padding are reported as `None`.
///
/// A non-finite `cost_limit` is treated as no limit.
pub fn solve(
    cost: ArrayView2<f32>,
    extend_cost: bool,
    cost_limit: Option<f32>,
) -> Result<Assignment, AssignmentError> {
    let (n_rows, n_cols) = cost.dim();
    if n_rows != n_cols && !extend_cost {
        return Err(AssignmentError::DimensionMismatch {
            rows: n_rows,
            cols: n_cols,
        });
    }
    if let Some(((row, col), _)) = cost.indexed_iter().find(|(_, c)| !c.is_finite()) {
        return Err(AssignmentError::NonFiniteCost { row, col });
    }
    if n_rows == 0 || n_cols == 0 {
        return Ok(Assignment::unmatched(n_rows, n_cols));
    }

    let cost_limit = cost_limit.filter(|limit| limit.is_finite());
    let (n, square) = if extend_cost || cost_limit.is_some() {
        let n = n_rows + n_cols;
        let fill = match cost_limit {
            Some(limit) => limit / 2.0,
            None => cost.iter().copied().fold(f32::MIN, f32::max) + 1.0,
        };
        let mut square = vec![fill; n * n];
        for i in n_rows..n {
            square[i * n + n_cols..(i + 1) * n].fill(0.0);
        }
        for ((i, j), &c) in cost.indexed_iter() {
            square[i * n + j] = c;
        }
        (n, square)
    } else {
        (n_rows, cost.iter().copied().collect())
    };

    let (x, y) = lapjv_dense(n, &square)?;

    let rowsol: Vec<Option<usize>> = x[..n_rows]
        .iter()
        .map(|&j| (j < n_cols).then_some(j))
        .collect();
    let colsol = y[..n_cols]
        .iter()
        .map(|&i| (i < n_rows).then_some(i))
        .collect();
    let total = rowsol
        .iter()
        .enumerate()
        .filter_map(|(i, &j)| j.map(|j| f64::from(cost[[i, j]])))
        .sum();

    Ok(Assignment {
        rowsol,
        colsol,
        cost: total,
    })
}

/// Solve a square `n x n` problem given as a row-major slice.
///
/// Returns the column of every row and the row of every column.
pub fn lapjv_dense(n: usize, cost: &[f32]) -> Result<(Vec<usize>, Vec<usize>), AssignmentError> {
    debug_assert_eq!(cost.len(), n * n);

    let mut x = vec![None; n];
    let mut y = vec![None; n];
    let mut v = vec![0.0; n];

    let mut free_rows = column_reduction_transfer(n, cost, &mut x, &mut y, &mut v);
    let mut rounds = 0;
    while !free_rows.is_empty() && rounds < ROW_REDUCTION_ROUNDS {
        free_rows = augmenting_row_reduction(n, cost, free_rows, &mut x, &mut y, &mut v);
        rounds += 1;
    }
    if !free_rows.is_empty() {
        augment(n, cost, &free_rows, &mut x, &mut y, &mut v)?;
    }

    let unassigned = (0..n)
        .filter(|&i| !x[i].is_some_and(|j| y[j] == Some(i)))
        .count();
    if unassigned > 0 {
        return Err(AssignmentError::ResidualFreeRows(unassigned));
    }

    Ok((
        x.into_iter().flatten().collect(),
        y.into_iter().flatten().collect(),
    ))
}

/// Column reduction followed by reduction transfer.
///
/// Every column is given to its cheapest row; rows that win several columns
/// keep only the highest-indexed one. Returns the rows left without a column.
fn column_reduction_transfer(
    n: usize,
    cost: &[f32],
    x: &mut [Option<usize>],
    y: &mut [Option<usize>],
    v: &mut [f64],
) -> Vec<usize> {
    let mut unique = vec![true; n];
    let mut min_row = vec![0; n];

    v.fill(LARGE);
    for i in 0..n {
        for j in 0..n {
            let c = f64::from(cost[i * n + j]);
            if c < v[j] {
                v[j] = c;
                min_row[j] = i;
            }
        }
    }

    for j in (0..n).rev() {
        let i = min_row[j];
        if x[i].is_none() {
            x[i] = Some(j);
            y[j] = Some(i);
        } else {
            unique[i] = false;
            y[j] = None;
        }
    }

    let mut free_rows = Vec::new();
    for i in 0..n {
        match x[i] {
            None => free_rows.push(i),
            Some(j) if unique[i] => {
                let row = &cost[i * n..(i + 1) * n];
                let min = (0..n)
                    .filter(|&k| k != j)
                    .map(|k| f64::from(row[k]) - v[k])
                    .fold(LARGE, f64::min);
                v[j] -= min;
            }
            Some(_) => {}
        }
    }
    free_rows
}

/// One round of augmenting row reduction. Returns the rows still free.
fn augmenting_row_reduction(
    n: usize,
    cost: &[f32],
    mut free_rows: Vec<usize>,
    x: &mut [Option<usize>],
    y: &mut [Option<usize>],
    v: &mut [f64],
) -> Vec<usize> {
    let n_free = free_rows.len();
    let mut current = 0;
    let mut new_free = 0;
    let mut rr_cnt = 0;

    while current < n_free {
        rr_cnt += 1;
        let free_i = free_rows[current];
        current += 1;

        // Lowest and second lowest reduced cost in the row.
        let row = &cost[free_i * n..(free_i + 1) * n];
        let mut j1 = 0;
        let mut v1 = f64::from(row[0]) - v[0];
        let mut j2 = None;
        let mut v2 = LARGE;
        for j in 1..n {
            let c = f64::from(row[j]) - v[j];
            if c < v2 {
                if c >= v1 {
                    v2 = c;
                    j2 = Some(j);
                } else {
                    v2 = v1;
                    v1 = c;
                    j2 = Some(j1);
                    j1 = j;
                }
            }
        }

        let mut i0 = y[j1];
        let v1_new = v[j1] - (v2 - v1);
        let v1_lowers = v1_new < v[j1];

        if rr_cnt < current * n {
            if v1_lowers {
                v[j1] = v1_new;
            } else if let (Some(_), Some(j2)) = (i0, j2) {
                j1 = j2;
                i0 = y[j2];
            }

            if let Some(i0) = i0 {
                if v1_lowers {
                    current -= 1;
                    free_rows[current] = i0;
                } else {
                    free_rows[new_free] = i0;
                    new_free += 1;
                }
            }
        } else if let Some(i0) = i0 {
            free_rows[new_free] = i0;
            new_free += 1;
        }

        x[free_i] = Some(j1);
        y[j1] = Some(free_i);
    }

    free_rows.truncate(new_free);
    free_rows
}

/// Move the columns with minimum `d` to the front of `cols[lo..]`.
///
/// Returns the end of that run, which becomes the new SCAN list `cols[lo..hi]`.
fn find_dense(n: usize, lo: usize, d: &[f64], cols: &mut [usize]) -> usize {
    let mut hi = lo + 1;
    let mut mind = d[cols[lo]];

    for k in hi..n {
        let j = cols[k];
        if d[j] <= mind {
            if d[j] < mind {
                hi = lo;
                mind = d[j];
            }
            cols[k] = cols[hi];
            cols[hi] = j;
            hi += 1;
        }
    }
    hi
}

/// Relax the TODO columns `cols[hi..]` through the rows owning the SCAN columns.
///
/// Returns a free column as soon as one is reached at the current minimum
/// distance.
#[allow(clippy::too_many_arguments)]
fn scan_dense(
    n: usize,
    cost: &[f32],
    plo: &mut usize,
    phi: &mut usize,
    d: &mut [f64],
    cols: &mut [usize],
    pred: &mut [usize],
    y: &[Option<usize>],
    v: &[f64],
) -> Option<usize> {
    let mut lo = *plo;
    let mut hi = *phi;

    while lo != hi {
        let j = cols[lo];
        lo += 1;
        let Some(i) = y[j] else {
            return Some(j);
        };
        let mind = d[j];
        let h = f64::from(cost[i * n + j]) - v[j] - mind;

        for k in hi..n {
            let j = cols[k];
            let cred_ij = f64::from(cost[i * n + j]) - v[j] - h;
            if cred_ij < d[j] {
                d[j] = cred_ij;
                pred[j] = i;
                if cred_ij == mind {
                    if y[j].is_none() {
                        return Some(j);
                    }
                    cols[k] = cols[hi];
                    cols[hi] = j;
                    hi += 1;
                }
            }
        }
    }

    *plo = lo;
    *phi = hi;
    None
}

/// Shortest augmenting path from `start_i` to the closest free column.
///
/// Updates the column duals of every column settled before the free one
/// was reached.
fn find_path_dense(
    n: usize,
    cost: &[f32],
    start_i: usize,
    y: &[Option<usize>],
    v: &mut [f64],
    pred: &mut [usize],
) -> Result<usize, AssignmentError> {
    let mut cols: Vec<usize> = (0..n).collect();
    let mut d: Vec<f64> = (0..n)
        .map(|j| f64::from(cost[start_i * n + j]) - v[j])
        .collect();
    pred.fill(start_i);

    let mut lo = 0;
    let mut hi = 0;
    let mut n_ready = 0;
    let mut final_j = None;

    while final_j.is_none() {
        // SCAN list exhausted: pull in the next run of closest columns.
        if lo == hi {
            if lo >= n {
                return Err(AssignmentError::PathNotFound { row: start_i });
            }
            n_ready = lo;
            hi = find_dense(n, lo, &d, &mut cols);
            for &j in &cols[lo..hi] {
                if y[j].is_none() {
                    final_j = Some(j);
                }
            }
        }
        if final_j.is_none() {
            final_j = scan_dense(n, cost, &mut lo, &mut hi, &mut d, &mut cols, pred, y, v);
        }
    }

    let mind = d[cols[lo]];
    for &j in &cols[..n_ready] {
        v[j] += d[j] - mind;
    }

    final_j.ok_or(AssignmentError::PathNotFound { row: start_i })
}

/// Augment the matching along a shortest path for each free row.
fn augment(
    n: usize,
    cost: &[f32],
    free_rows: &[usize],
    x: &mut [Option<usize>],
    y: &mut [Option<usize>],
    v: &mut [f64],
) -> Result<(), AssignmentError> {
    let mut pred = vec![0; n];

    for &free_row in free_rows {
        if x[free_row].is_some_and(|j| y[j] == Some(free_row)) {
            continue;
        }

        let mut j = find_path_dense(n, cost, free_row, y, v, &mut pred)?;
        let mut k = 0;
        loop {
            let i = pred[j];
            y[j] = Some(i);
            let prev = x[i].replace(j);
            k += 1;
            if k > n {
                return Err(AssignmentError::AugmentOverflow { row: free_row });
            }
            if i == free_row {
                break;
            }
            j = prev.ok_or(AssignmentError::PathNotFound { row: free_row })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_square_optimal_matching() {
        let cost = array![[4.0f32, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let result = solve(cost.view(), false, None).unwrap();

        assert_eq!(result.rowsol, vec![Some(1), Some(0), Some(2)]);
        assert_eq!(result.colsol, vec![Some(1), Some(0), Some(2)]);
        assert_abs_diff_eq!(result.cost, 5.0);
    }

    #[test]
    fn test_identity_like_matrix() {
        let cost = array![[0.0f32, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
        let result = solve(cost.view(), false, None).unwrap();

        assert_eq!(result.matches().collect::<Vec<_>>(), vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn test_contested_column_needs_augmentation() {
        // Every row prefers column 0.
        let cost = array![[1.0f32, 5.0, 9.0], [1.0, 4.0, 8.0], [1.0, 6.0, 3.0]];
        let result = solve(cost.view(), false, None).unwrap();

        // 1 + 4 + 3 beats every other permutation.
        assert_eq!(result.rowsol, vec![Some(0), Some(1), Some(2)]);
        assert_abs_diff_eq!(result.cost, 8.0);
    }

    #[test]
    fn test_single_cell() {
        let cost = array![[0.25f32]];
        let result = solve(cost.view(), false, None).unwrap();
        assert_eq!(result.rowsol, vec![Some(0)]);
        assert_eq!(result.colsol, vec![Some(0)]);
    }

    #[test]
    fn test_non_square_requires_extension() {
        let cost = Array2::<f32>::zeros((2, 3));
        let err = solve(cost.view(), false, Some(0.5)).unwrap_err();
        assert_eq!(err, AssignmentError::DimensionMismatch { rows: 2, cols: 3 });
    }

    #[test]
    fn test_more_columns_than_rows() {
        let cost = array![[0.9f32, 0.1, 0.8], [0.2, 0.9, 0.7]];
        let result = solve(cost.view(), true, None).unwrap();

        assert_eq!(result.rowsol, vec![Some(1), Some(0)]);
        assert_eq!(result.colsol, vec![Some(1), Some(0), None]);
        assert_eq!(result.unmatched_cols().collect::<Vec<_>>(), vec![2]);
        assert_abs_diff_eq!(result.cost, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_more_rows_than_columns() {
        let cost = array![[0.5f32], [0.1], [0.3]];
        let result = solve(cost.view(), true, None).unwrap();

        assert_eq!(result.rowsol, vec![None, Some(0), None]);
        assert_eq!(result.colsol, vec![Some(1)]);
        assert_eq!(result.unmatched_rows().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_cost_limit_forbids_expensive_pairs() {
        let cost = array![[0.1f32, 0.9], [0.9, 0.95]];
        let result = solve(cost.view(), true, Some(0.8)).unwrap();

        assert_eq!(result.rowsol, vec![Some(0), None]);
        assert_eq!(result.colsol, vec![Some(0), None]);
        assert_abs_diff_eq!(result.cost, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_cost_limit_everything_too_expensive() {
        let cost = array![[0.9f32, 0.95], [0.99, 0.9]];
        let result = solve(cost.view(), true, Some(0.5)).unwrap();

        assert!(result.rowsol.iter().all(Option::is_none));
        assert!(result.colsol.iter().all(Option::is_none));
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn test_empty_matrix() {
        let cost = Array2::<f32>::zeros((0, 4));
        let result = solve(cost.view(), true, Some(0.8)).unwrap();
        assert!(result.rowsol.is_empty());
        assert_eq!(result.colsol, vec![None; 4]);
    }

    #[test]
    fn test_non_finite_cost_is_rejected() {
        let cost = array![[0.1f32, f32::NAN], [0.2, 0.3]];
        let err = solve(cost.view(), false, None).unwrap_err();
        assert_eq!(err, AssignmentError::NonFiniteCost { row: 0, col: 1 });
    }

    #[test]
    fn test_matches_reference_solver_on_random_matrices() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in [2, 5, 10, 25, 40] {
            for _ in 0..5 {
                let cost = Array2::from_shape_fn((size, size), |_| rng.gen_range(0.0f32..1.0));
                let ours = solve(cost.view(), false, None).unwrap();

                let reference_input = cost.mapv(f64::from);
                let (row_to_col, _) = lapjv::lapjv(&reference_input).unwrap();
                let reference: f64 = row_to_col
                    .iter()
                    .enumerate()
                    .map(|(i, &j)| reference_input[[i, j]])
                    .sum();

                assert_abs_diff_eq!(ours.cost, reference, epsilon = 1e-4);
                for (row, col) in ours.matches() {
                    assert_eq!(ours.colsol[col], Some(row));
                }
            }
        }
    }

    #[test]
    fn test_random_rectangular_matrices_stay_consistent() {
        let mut rng = StdRng::seed_from_u64(42);
        for (rows, cols) in [(3, 7), (8, 2), (12, 9)] {
            let cost = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0f32..1.0));
            let result = solve(cost.view(), true, Some(0.6)).unwrap();

            assert_eq!(result.rowsol.len(), rows);
            assert_eq!(result.colsol.len(), cols);
            for (row, col) in result.matches() {
                assert_eq!(result.colsol[col], Some(row));
                assert!(cost[[row, col]] <= 0.6);
            }
        }
    }
}
