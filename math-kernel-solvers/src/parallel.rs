//! Parallel utilities with feature-gated implementations
//!
//! Kernel evaluators are the only parallel component of a solve. With the
//! `rayon` feature their row loops run on the rayon pool, otherwise they fall
//! back to sequential iteration with the same results.

/// Check if parallel processing is available
#[cfg(feature = "rayon")]
pub fn is_parallel_available() -> bool {
    true
}

/// Check if parallel processing is available
#[cfg(not(feature = "rayon"))]
pub fn is_parallel_available() -> bool {
    false
}

/// Parallel map with index
#[cfg(feature = "rayon")]
pub fn parallel_map_indexed<U, F>(count: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    use rayon::prelude::*;
    (0..count).into_par_iter().map(f).collect()
}

/// Sequential map with index (fallback)
#[cfg(not(feature = "rayon"))]
pub fn parallel_map_indexed<U, F>(count: usize, f: F) -> Vec<U>
where
    F: Fn(usize) -> U,
{
    (0..count).map(f).collect()
}

/// Map every row index to a fixed-width block and concatenate the blocks.
///
/// Produces the row-major storage of a `count × width` matrix.
pub fn parallel_rows<T, F>(count: usize, width: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    let rows = parallel_map_indexed(count, f);
    let mut out = Vec::with_capacity(count * width);
    for row in rows {
        debug_assert_eq!(row.len(), width);
        out.extend(row);
    }
    out
}
