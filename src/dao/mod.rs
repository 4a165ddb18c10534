/// File-backed state document with change notification.
pub mod state_store;
/// Storage abstraction layer for persistence errors.
pub mod storage;
