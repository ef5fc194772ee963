//! Execution collaborators for asynchronous dispatch.

pub mod executor;
