/// Local-first generation redistribution.
pub mod allocator;
/// Disturbance events and the event queue.
pub mod event;
pub mod scheduler;
pub mod session;
pub mod summary;
