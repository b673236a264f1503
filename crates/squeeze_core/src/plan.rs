use std::collections::HashSet;

use thiserror::Error;

pub const MIN_POOL_SIZE: usize = 1;
pub const MAX_POOL_SIZE: usize = 20;
pub const DEFAULT_POOL_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no files selected")]
    EmptySelection,
    #[error("pool size {size} outside {}..={}", MIN_POOL_SIZE, MAX_POOL_SIZE)]
    PoolSizeOutOfRange { size: usize },
    #[error("path listed twice: {0}")]
    DuplicatePath(String),
}

pub fn check_pool_size(size: usize) -> Result<usize, PlanError> {
    if (MIN_POOL_SIZE..=MAX_POOL_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(PlanError::PoolSizeOutOfRange { size })
    }
}

pub fn clamp_pool_size(size: usize) -> usize {
    size.clamp(MIN_POOL_SIZE, MAX_POOL_SIZE)
}

/// Frozen description of one compression run.
///
/// Fields are private so a plan cannot change once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    paths: Vec<String>,
    plugin_order: Vec<String>,
    pool_size: usize,
}

impl BatchPlan {
    pub fn new(
        paths: Vec<String>,
        plugin_order: Vec<String>,
        pool_size: usize,
    ) -> Result<Self, PlanError> {
        if paths.is_empty() {
            return Err(PlanError::EmptySelection);
        }
        let pool_size = check_pool_size(pool_size)?;

        let mut seen = HashSet::with_capacity(paths.len());
        for path in &paths {
            if !seen.insert(path.as_str()) {
                return Err(PlanError::DuplicatePath(path.clone()));
            }
        }

        Ok(Self {
            paths,
            plugin_order,
            pool_size,
        })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn plugin_order(&self) -> &[String] {
        &self.plugin_order
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false for a constructed plan; kept for slice-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Workers worth spawning: never more than there are paths to claim.
    pub fn worker_count(&self) -> usize {
        self.pool_size.min(self.paths.len())
    }
}
