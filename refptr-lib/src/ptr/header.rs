use core::cell::Cell;

use super::{counter_update::RefCounterUpdate, state::BlockState};

/// Counters and life cycle state shared by every control block variant.
///
/// The counters are plain `Cell`s. Handles that alias one block must stay
/// on one thread; see the module documentation.
#[derive(Debug)]
pub struct BlockHeader {
    strong: Cell<isize>,
    weak: Cell<isize>,
    state: Cell<BlockState>,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            strong: Cell::new(0),
            weak: Cell::new(0),
            state: Cell::new(BlockState::Live),
        }
    }
}

impl BlockHeader {
    /// Returns the strong count before the update.
    pub fn strong_update(&self, i: RefCounterUpdate) -> isize {
        Self::update(&self.strong, i)
    }
    /// Returns the weak count before the update.
    pub fn weak_update(&self, i: RefCounterUpdate) -> isize {
        Self::update(&self.weak, i)
    }
    #[inline(always)]
    pub fn state(&self) -> BlockState {
        self.state.get()
    }
    /// The `Live -> ObjectDestroyed` transition. Returns `false` when the
    /// object is already destroyed, which makes destruction idempotent.
    pub fn try_destroy(&self) -> bool {
        match self.state.get() {
            BlockState::Live => {
                self.state.set(BlockState::ObjectDestroyed);
                true
            }
            BlockState::ObjectDestroyed => false,
        }
    }
    /// Block storage may be released only after the object is destroyed
    /// and once both counts are zero.
    pub fn release_assert(&self) {
        assert_eq!(self.state.get(), BlockState::ObjectDestroyed);
        assert_eq!(self.strong.get(), 0);
        assert_eq!(self.weak.get(), 0);
    }
    fn update(counter: &Cell<isize>, i: RefCounterUpdate) -> isize {
        let result = counter.get();
        let updated = result + i as isize;
        assert!(updated >= 0, "reference counter below zero");
        counter.set(updated);
        result
    }
}
