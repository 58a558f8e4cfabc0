/// Update a reference count.
///
/// An update call returns the count value before the update, so `Read`
/// observes the current value without changing it.
pub enum RefCounterUpdate {
    AddRef = 1,
    Read = 0,
    Release = -1,
}
