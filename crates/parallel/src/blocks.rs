//! Row-block sharding of a raster grid

/// A contiguous band of rows in a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBlock {
    /// First row of the block
    pub row_offset: usize,
    /// Number of rows in this block
    pub rows: usize,
}

impl RowBlock {
    /// Row range covered by this block
    pub fn range(&self) -> std::ops::Range<usize> {
        self.row_offset..self.row_offset + self.rows
    }
}

/// Iterator over row blocks covering a grid of `total_rows` rows
#[derive(Debug, Clone)]
pub struct RowBlocks {
    total_rows: usize,
    block_rows: usize,
    current_row: usize,
}

impl RowBlocks {
    /// Create a new row-block iterator; a `block_rows` of 0 is treated as 1
    pub fn new(total_rows: usize, block_rows: usize) -> Self {
        Self {
            total_rows,
            block_rows: block_rows.max(1),
            current_row: 0,
        }
    }
}

impl Iterator for RowBlocks {
    type Item = RowBlock;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows {
            return None;
        }
        let rows = self.block_rows.min(self.total_rows - self.current_row);
        let block = RowBlock {
            row_offset: self.current_row,
            rows,
        };
        self.current_row += rows;
        Some(block)
    }
}
