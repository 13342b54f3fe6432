//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::ClassName;

/// Classes currently being resolved in one call tree.
///
/// A class may appear at most once. The stack lives inside the container's
/// reentrant lock, so concurrent call trees never share it.
#[derive(Debug, Default)]
pub(crate) struct ResolutionStack {
    stack: Vec<ClassName>,
    max_depth: usize,
}

impl ResolutionStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Push `class`, failing if it is already in flight or the stack is full.
    pub(crate) fn push(&mut self, class: &ClassName) -> DiResult<()> {
        if self.stack.contains(class) {
            let mut path = self.stack.clone();
            path.push(class.clone());
            return Err(DiError::InjectionLoop(loop_path(path)));
        }
        if self.stack.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(self.max_depth));
        }
        self.stack.push(class.clone());
        Ok(())
    }

    pub(crate) fn pop(&mut self, class: &ClassName) {
        let last = self.stack.pop();
        debug_assert_eq!(last.as_ref(), Some(class));
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn contains(&self, class: &ClassName) -> bool {
        self.stack.contains(class)
    }
}

/// Trim the path so it starts at the first occurrence of the repeated class.
///
/// `[Root, A, B, A]` becomes `[A, B, A]`.
pub(crate) fn loop_path(mut path: Vec<ClassName>) -> Vec<ClassName> {
    if let Some(last) = path.last() {
        if let Some(start) = path.iter().position(|c| c == last) {
            path.drain(..start);
        }
    }
    path
}

/// RAII guard popping its class when dropped, including on early `?` returns.
pub(crate) struct StackGuard<'a> {
    stack: &'a RefCell<ResolutionStack>,
    class: ClassName,
}

impl<'a> StackGuard<'a> {
    pub(crate) fn enter(stack: &'a RefCell<ResolutionStack>, class: &ClassName) -> DiResult<Self> {
        stack.borrow_mut().push(class)?;
        Ok(Self {
            stack,
            class: class.clone(),
        })
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop(&self.class);
    }
}
