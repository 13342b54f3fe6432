//! Internal implementation details.

pub(crate) mod circular;

pub(crate) use circular::{loop_path, ResolutionStack, StackGuard};
