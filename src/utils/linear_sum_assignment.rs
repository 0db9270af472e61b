use itertools::Itertools;
use nalgebra::DMatrix;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;

const F32_I64_MULT: f32 = 1_000_000.0;

/// Cost of the pairs excluded from the assignment (gated out, incompatible)
///
pub const INFTY_COST: f32 = 1e5;

/// Costs above the value can't be represented in the integer form used by the solver
///
pub const MAX_COST: f32 = 1e9;

/// Result of the thresholded assignment. `matches` keeps `(row, column, cost)` sorted by rows.
///
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Assignment {
    pub matches: Vec<(usize, usize, f32)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_columns: Vec<usize>,
}

/// Solves the rectangular assignment problem minimizing the total cost with the Kuhn-Munkres
/// algorithm. Every row is assigned when there are not more rows than columns and vice versa.
///
/// Non-finite costs or costs greater than [MAX_COST] are contract violations.
///
pub fn linear_sum_assignment(cost: &DMatrix<f32>) -> Vec<(usize, usize)> {
    let (rows, columns) = (cost.nrows(), cost.ncols());
    if rows == 0 || columns == 0 {
        return Vec::default();
    }

    assert!(
        cost.iter().all(|v| v.is_finite() && v.abs() <= MAX_COST),
        "Cost matrix must contain finite values within [-MAX_COST; MAX_COST]"
    );

    let transposed = rows > columns;
    let (solver_rows, solver_columns) = if transposed {
        (columns, rows)
    } else {
        (rows, columns)
    };

    let mut weights = Matrix::new(solver_rows, solver_columns, 0i64);
    for r in 0..solver_rows {
        for c in 0..solver_columns {
            let v = if transposed { cost[(c, r)] } else { cost[(r, c)] };
            weights[(r, c)] = (v * F32_I64_MULT).round() as i64;
        }
    }

    let (_, solution) = kuhn_munkres_min(&weights);

    solution
        .into_iter()
        .enumerate()
        .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
        .sorted()
        .collect()
}

/// Solves the assignment and drops the pairs which cost is greater than `max_distance`.
///
/// The costs above `max_distance` are clamped to `max_distance + 1e-5` before solving, so the
/// solver can't trade an excluded pair for a better total.
///
pub fn min_cost_matching(cost: &DMatrix<f32>, max_distance: f32) -> Assignment {
    let (rows, columns) = (cost.nrows(), cost.ncols());
    let mut clamped = cost.clone();
    let clamp_value = max_distance + 1e-5;
    clamped.apply(|v| {
        if *v > max_distance {
            *v = clamp_value;
        }
    });

    let mut matches = Vec::default();
    let mut row_matched = vec![false; rows];
    let mut column_matched = vec![false; columns];

    for (r, c) in linear_sum_assignment(&clamped) {
        let v = clamped[(r, c)];
        if v <= max_distance {
            matches.push((r, c, v));
            row_matched[r] = true;
            column_matched[c] = true;
        }
    }

    Assignment {
        matches,
        unmatched_rows: (0..rows).filter(|r| !row_matched[*r]).collect(),
        unmatched_columns: (0..columns).filter(|c| !column_matched[*c]).collect(),
    }
}
