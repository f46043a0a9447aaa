//! Parallel processing strategies

use crate::blocks::{RowBlock, RowBlocks};
use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Processing mode for per-pixel kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for an optional thread count: `None` = all cores, `Some(1)` = sequential
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None => ProcessingMode::Parallel,
            Some(0) | Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    #[cfg(feature = "parallel")]
    fn run<R: Send>(&self, job: impl FnOnce() -> R + Send, sequential: impl FnOnce() -> R) -> R {
        match self {
            ProcessingMode::Sequential => sequential(),
            ProcessingMode::Parallel => job(),
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(job),
                    Err(_) => sequential(),
                }
            }
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Evaluate `f(row, col)` for every pixel of a `rows` x `cols` grid.
    ///
    /// The grid is sharded into blocks of `block_rows` rows; blocks run
    /// independently and are reassembled in row order, so the result does
    /// not depend on the mode.
    fn map_cells<T, F>(&self, rows: usize, cols: usize, block_rows: usize, f: F) -> Array2<T>
    where
        T: Send,
        F: Fn(usize, usize) -> T + Sync + Send;
}

fn eval_block<T, F>(block: RowBlock, cols: usize, f: &F) -> Vec<T>
where
    F: Fn(usize, usize) -> T,
{
    let mut out = Vec::with_capacity(block.rows * cols);
    for row in block.range() {
        for col in 0..cols {
            out.push(f(row, col));
        }
    }
    out
}

// RowBlocks partitions 0..rows without gaps and eval_block emits `cols`
// values per row, so the concatenation always holds rows * cols elements.
fn assemble<T>(rows: usize, cols: usize, blocks: Vec<Vec<T>>) -> Array2<T> {
    let data: Vec<T> = blocks.into_iter().flatten().collect();
    Array2::from_shape_vec((rows, cols), data).expect("row blocks cover the grid")
}

impl ParallelStrategy for ProcessingMode {
    fn map_cells<T, F>(&self, rows: usize, cols: usize, block_rows: usize, f: F) -> Array2<T>
    where
        T: Send,
        F: Fn(usize, usize) -> T + Sync + Send,
    {
        let blocks: Vec<RowBlock> = RowBlocks::new(rows, block_rows).collect();

        #[cfg(feature = "parallel")]
        let results: Vec<Vec<T>> = self.run(
            || blocks.par_iter().map(|&b| eval_block(b, cols, &f)).collect(),
            || blocks.iter().map(|&b| eval_block(b, cols, &f)).collect(),
        );
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Vec<T>> = blocks.iter().map(|&b| eval_block(b, cols, &f)).collect();

        assemble(rows, cols, results)
    }
}
