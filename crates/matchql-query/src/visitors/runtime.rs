//! Runtime-function detection

use crate::ast::{FunctionCall, SelectStatement};
use crate::visit::{walk_select, Visitor, Walkable};
use matchql_core::{keywords, Result};

/// Counts EXISTS sub-predicates and runtime helper calls in a predicate
///
/// Arguments of a function call are not searched.
#[derive(Debug, Default)]
pub struct RuntimeFunctionCounter {
    count: usize,
}

impl RuntimeFunctionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count<W: Walkable + ?Sized>(fragment: &W) -> Result<usize> {
        let mut counter = Self::new();
        fragment.accept(&mut counter)?;
        Ok(counter.count)
    }
}

impl Visitor for RuntimeFunctionCounter {
    fn visit_exists(&mut self, query: &SelectStatement) -> Result<()> {
        self.count += 1;
        walk_select(self, query)
    }

    fn visit_function(&mut self, call: &FunctionCall) -> Result<()> {
        if keywords::is_runtime_function(&call.name) {
            self.count += 1;
        }
        Ok(())
    }
}

/// True when `fragment` must be evaluated by the runtime rather than the backend
pub fn needs_runtime<W: Walkable + ?Sized>(fragment: &W) -> Result<bool> {
    Ok(RuntimeFunctionCounter::count(fragment)? > 0)
}
