use rayon::prelude::*;
use std::cmp;

use crate::util::WidthMode;

/// Threshold (total cells) above which widths are computed in parallel
const PARALLEL_THRESHOLD: usize = 10_000;

/// Maximum cell width per column index of one sheet.
///
/// Dense: index `i` exists iff some row has a cell at position `i`.
/// Never shared between sheets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnWidths {
    col_widths: Vec<usize>,
}

impl ColumnWidths {
    /// Fold the widths of already-stringified rows.
    /// Uses parallel processing for large sheets
    pub fn compute(rows: &[Vec<String>], mode: WidthMode) -> Self {
        let size: usize = rows.iter().map(|r| r.len()).sum();

        let col_widths = if size >= PARALLEL_THRESHOLD {
            rows.par_iter()
                .fold(Vec::new, |acc, row| Self::fold_row(acc, row, mode))
                .reduce(Vec::new, Self::merge)
        } else {
            rows.iter()
                .fold(Vec::new(), |acc, row| Self::fold_row(acc, row, mode))
        };

        Self { col_widths }
    }

    fn fold_row(mut acc: Vec<usize>, row: &[String], mode: WidthMode) -> Vec<usize> {
        if acc.len() < row.len() {
            acc.resize(row.len(), 0);
        }
        for (acc_w, s) in acc.iter_mut().zip(row.iter()) {
            *acc_w = cmp::max(*acc_w, mode.measure(s));
        }
        acc
    }

    fn merge(a: Vec<usize>, b: Vec<usize>) -> Vec<usize> {
        let (mut long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
        for (l, s) in long.iter_mut().zip(short.iter()) {
            *l = cmp::max(*l, *s);
        }
        long
    }

    pub fn get(&self, col: usize) -> usize {
        self.col_widths.get(col).copied().unwrap_or(0)
    }

    /// Number of columns seen in any row
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.col_widths.len()
    }
}
