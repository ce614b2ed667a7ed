/// Compatibility layer for rayon/sequential execution.
///
/// With the `parallel` feature, rows are distributed over rayon's pool.
/// Without it, the same call sites compile against plain iterators.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    ///
    /// `into_par_iter()` forwards to `into_iter()`, so the rest of the chain
    /// (`.map()`, `.flat_map()`, `.collect()`) resolves to `Iterator` methods.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;

/// Evaluate `cell(row, col)` over a `rows x cols` grid, one task per row,
/// returning the values in row-major order.
pub(crate) fn map_cells<F>(rows: usize, cols: usize, cell: F) -> Vec<f64>
where
    F: Fn(usize, usize) -> f64 + Sync + Send,
{
    (0..rows)
        .into_par_iter()
        .flat_map(|row| (0..cols).map(|col| cell(row, col)).collect::<Vec<f64>>())
        .collect()
}
