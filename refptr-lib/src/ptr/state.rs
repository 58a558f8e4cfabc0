/// Life cycle of a control block.
///
/// The final stage, releasing the block storage, has no variant here:
/// once the storage is released no reference can observe the block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockState {
    Live,
    ObjectDestroyed,
}
