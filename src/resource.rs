//! Resource tracking: heap allocation, frame-stack depth, and cooperative
//! break-signal polling.
//!
//! A `ResourceTracker` trait checked at heap allocation time, call-frame
//! push, and instruction boundaries, with a `NoLimitTracker` default and a
//! `LimitedTracker` for sandboxed/embedded hosts.

use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::error::LogoError;

/// A resource limit was exceeded during execution.
#[derive(Debug, Clone)]
pub enum ResourceError {
    /// Heap allocation would exceed the configured byte budget ('s
    /// 256 KB frame-stack budget is enforced the same way, through
    /// `check_recursion_depth`/frame push accounting rather than here).
    Memory { limit: usize, used: usize },
    /// Instruction-count budget for the current execution step exceeded.
    Operation { limit: usize, count: usize },
    /// Wall-clock execution time budget exceeded.
    Time { limit: Duration, elapsed: Duration },
    /// Call-frame recursion depth exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory { limit, used } => write!(f, "memory limit exceeded: {used} bytes > {limit} bytes"),
            Self::Operation { limit, count } => write!(f, "operation limit exceeded: {count} > {limit}"),
            Self::Time { limit, elapsed } => write!(f, "time limit exceeded: {elapsed:?} > {limit:?}"),
            Self::Recursion { .. } => write!(f, "maximum recursion depth exceeded"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for LogoError {
    fn from(_err: ResourceError) -> Self {
        // All resource-limit violations are uncatchable: a sandboxed
        // script cannot `catch` its way around a frame-stack or heap budget.
        Self::out_of_space()
    }
}

/// Checked before heap allocations, call-frame pushes, and instruction
/// boundaries. Implementations may enforce limits or (as `NoLimitTracker`)
/// simply count.
pub trait ResourceTracker: fmt::Debug {
    /// Called before each heap allocation (atom or cons cell).
    fn on_allocate(&mut self, get_size: impl FnOnce() -> usize) -> Result<(), ResourceError>;

    /// Called when a heap compaction frees nodes.
    fn on_free(&mut self, get_size: impl FnOnce() -> usize);

    /// Called at each instruction boundary to check the operation-count and
    /// wall-clock budgets, and to give the host a chance to observe a
    /// cooperative break signal.
    fn check_time(&mut self) -> Result<(), ResourceError>;

    /// Called before pushing a new call frame, given the current (pre-push)
    /// frame-stack depth.
    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError>;

    /// Current allocation count, if tracked.
    fn allocation_count(&self) -> Option<usize> {
        None
    }

    /// Current approximate heap memory usage in bytes, if tracked.
    fn current_memory_bytes(&self) -> Option<usize> {
        None
    }
}

/// Default maximum call-frame recursion depth.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Configuration for resource limits. Every field is optional; `None`
/// disables that particular check.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of evaluator instructions per `execute()` step.
    pub max_operations: Option<usize>,
    /// Maximum number of heap allocations.
    pub max_allocations: Option<usize>,
    /// Maximum wall-clock execution duration per `execute()` step.
    pub max_duration: Option<Duration>,
    /// Maximum heap memory in bytes, approximated as 8 bytes per node,
    /// matching's 256 KB frame-stack sizing convention.
    pub max_memory: Option<usize>,
    /// Maximum call-frame recursion depth.
    pub max_recursion_depth: Option<usize>,
}

impl ResourceLimits {
    #[must_use]
    pub fn new() -> Self {
        Self { max_recursion_depth: Some(DEFAULT_MAX_RECURSION_DEPTH), ..Default::default() }
    }

    #[must_use]
    pub fn max_allocations(mut self, limit: usize) -> Self {
        self.max_allocations = Some(limit);
        self
    }

    #[must_use]
    pub fn max_operations(mut self, limit: usize) -> Self {
        self.max_operations = Some(limit);
        self
    }

    #[must_use]
    pub fn max_duration(mut self, limit: Duration) -> Self {
        self.max_duration = Some(limit);
        self
    }

    #[must_use]
    pub fn max_memory(mut self, limit: usize) -> Self {
        self.max_memory = Some(limit);
        self
    }

    /// Sets the 256 KB frame-stack budget from directly.
    #[must_use]
    pub fn frame_stack_budget(self) -> Self {
        self.max_memory(256 * 1024)
    }

    #[must_use]
    pub fn max_recursion_depth(mut self, limit: Option<usize>) -> Self {
        self.max_recursion_depth = limit;
        self
    }
}

/// A tracker with no active limits by default; a host may still opt into
/// limits via [`NoLimitTracker::with_limits`] without switching types.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct NoLimitTracker {
    limits: ResourceLimits,
    operation_count: usize,
    allocation_count: usize,
    current_memory: usize,
    #[serde(skip)]
    deadline: Option<Instant>,
    #[serde(skip)]
    deadline_limit: Option<Duration>,
}

impl NoLimitTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limits: ResourceLimits {
                max_operations: None,
                max_allocations: None,
                max_duration: None,
                max_memory: None,
                max_recursion_depth: None,
            },
            operation_count: 0,
            allocation_count: 0,
            current_memory: 0,
            deadline: None,
            deadline_limit: None,
        }
    }

    #[must_use]
    pub const fn with_limits(limits: ResourceLimits) -> Self {
        Self { limits, operation_count: 0, allocation_count: 0, current_memory: 0, deadline: None, deadline_limit: None }
    }

    /// Starts one bounded `execute()` step: resets the per-step instruction
    /// counter and arms a deadline from either the explicit argument or
    /// `limits.max_duration`.
    pub fn begin_execution(&mut self, deadline: Option<Instant>) {
        self.operation_count = 0;
        if let Some(deadline) = deadline {
            self.deadline = Some(deadline);
            self.deadline_limit = Some(deadline.saturating_duration_since(Instant::now()));
            return;
        }
        if let Some(max_duration) = self.limits.max_duration {
            self.deadline = Some(Instant::now() + max_duration);
            self.deadline_limit = Some(max_duration);
        } else {
            self.deadline = None;
            self.deadline_limit = None;
        }
    }
}

pub const NO_LIMIT_TRACKER: NoLimitTracker = NoLimitTracker::new();

impl ResourceTracker for NoLimitTracker {
    fn on_allocate(&mut self, get_size: impl FnOnce() -> usize) -> Result<(), ResourceError> {
        let tracks_allocations = self.limits.max_allocations.is_some();
        let tracks_memory = self.limits.max_memory.is_some();
        if !tracks_allocations && !tracks_memory {
            return Ok(());
        }
        if let Some(max) = self.limits.max_allocations
            && self.allocation_count >= max
        {
            return Err(ResourceError::Memory { limit: max, used: self.allocation_count + 1 });
        }
        if let Some(max) = self.limits.max_memory {
            let new_memory = self.current_memory + get_size();
            if new_memory > max {
                return Err(ResourceError::Memory { limit: max, used: new_memory });
            }
            self.current_memory = new_memory;
        }
        if tracks_allocations {
            self.allocation_count += 1;
        }
        Ok(())
    }

    fn on_free(&mut self, get_size: impl FnOnce() -> usize) {
        if self.limits.max_memory.is_some() {
            self.current_memory = self.current_memory.saturating_sub(get_size());
        }
    }

    fn check_time(&mut self) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_operations {
            self.operation_count += 1;
            if self.operation_count > max {
                return Err(ResourceError::Operation { limit: max, count: self.operation_count });
            }
        }
        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                let limit = self.deadline_limit.unwrap_or_default();
                return Err(ResourceError::Time { limit, elapsed: limit.saturating_add(now.duration_since(deadline)) });
            }
        }
        Ok(())
    }

    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        let max = self.limits.max_recursion_depth.unwrap_or(DEFAULT_MAX_RECURSION_DEPTH);
        if current_depth >= max {
            Err(ResourceError::Recursion { limit: max, depth: current_depth + 1 })
        } else {
            Ok(())
        }
    }

    fn allocation_count(&self) -> Option<usize> {
        self.limits.max_allocations.is_some().then_some(self.allocation_count)
    }

    fn current_memory_bytes(&self) -> Option<usize> {
        self.limits.max_memory.is_some().then_some(self.current_memory)
    }
}

/// A tracker that always enforces its configured limits, used by embedded
/// hosts that need a hard sandbox rather than an opt-in one.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    #[serde(skip, default = "Instant::now")]
    start_time: Instant,
    allocation_count: usize,
    #[serde(default)]
    operation_count: usize,
    current_memory: usize,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits, start_time: Instant::now(), allocation_count: 0, operation_count: 0, current_memory: 0 }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl ResourceTracker for LimitedTracker {
    fn on_allocate(&mut self, get_size: impl FnOnce() -> usize) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_allocations
            && self.allocation_count >= max
        {
            return Err(ResourceError::Memory { limit: max, used: self.allocation_count + 1 });
        }
        let size = get_size();
        if let Some(max) = self.limits.max_memory {
            let new_memory = self.current_memory + size;
            if new_memory > max {
                return Err(ResourceError::Memory { limit: max, used: new_memory });
            }
        }
        self.allocation_count += 1;
        self.current_memory += size;
        Ok(())
    }

    fn on_free(&mut self, get_size: impl FnOnce() -> usize) {
        self.current_memory = self.current_memory.saturating_sub(get_size());
    }

    fn check_time(&mut self) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_operations {
            self.operation_count += 1;
            if self.operation_count > max {
                return Err(ResourceError::Operation { limit: max, count: self.operation_count });
            }
        }
        if let Some(max) = self.limits.max_duration {
            let elapsed = self.start_time.elapsed();
            if elapsed > max {
                return Err(ResourceError::Time { limit: max, elapsed });
            }
        }
        Ok(())
    }

    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_recursion_depth
            && current_depth >= max
        {
            return Err(ResourceError::Recursion { limit: max, depth: current_depth + 1 });
        }
        Ok(())
    }

    fn allocation_count(&self) -> Option<usize> {
        Some(self.allocation_count)
    }

    fn current_memory_bytes(&self) -> Option<usize> {
        Some(self.current_memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_tracker_never_rejects_by_default() {
        let mut tracker = NoLimitTracker::new();
        for _ in 0..10_000 {
            tracker.on_allocate(|| 64).unwrap();
        }
        assert!(tracker.check_recursion_depth(999).is_ok());
    }

    #[test]
    fn limited_tracker_enforces_allocation_cap() {
        let mut tracker = LimitedTracker::new(ResourceLimits::new().max_allocations(2));
        tracker.on_allocate(|| 1).unwrap();
        tracker.on_allocate(|| 1).unwrap();
        assert!(tracker.on_allocate(|| 1).is_err());
    }

    #[test]
    fn limited_tracker_enforces_recursion_cap() {
        let tracker = LimitedTracker::new(ResourceLimits::new().max_recursion_depth(Some(5)));
        assert!(tracker.check_recursion_depth(4).is_ok());
        assert!(tracker.check_recursion_depth(5).is_err());
    }

    #[test]
    fn frame_stack_budget_is_256kb() {
        let limits = ResourceLimits::new().frame_stack_budget();
        assert_eq!(limits.max_memory, Some(256 * 1024));
    }
}
