/// Position of a slot within its pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct SlotCoordinates {
    block_index: usize,
    index_in_block: usize,
}

impl SlotCoordinates {
    #[must_use]
    pub(crate) fn from_parts(block_index: usize, index_in_block: usize) -> Self {
        Self {
            block_index,
            index_in_block,
        }
    }

    #[must_use]
    pub(crate) fn block_index(&self) -> usize {
        self.block_index
    }

    #[must_use]
    pub(crate) fn index_in_block(&self) -> usize {
        self.index_in_block
    }
}
