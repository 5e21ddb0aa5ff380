//! Memory budget enforcement for memory-sensitive stages
//!
//! A stage enters an allocation mode through `AllocationControl::enter_stage`.
//! The returned guard restores the previous mode when dropped, so the mode is
//! reset on the error path as well. Stages report large buffer reservations
//! through `check_allocation` before making them.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use clap::ValueEnum;

use crate::pipelines::stages::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[repr(u8)]
pub enum AllocationMode {
    /// No budget checks
    #[default]
    Off = 0,
    /// Log reservations exceeding the budget
    Warning = 1,
    /// Fail reservations exceeding the budget
    Strict = 2,
}

impl AllocationMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AllocationMode::Warning,
            2 => AllocationMode::Strict,
            _ => AllocationMode::Off,
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AllocationMode::Off => "off",
            AllocationMode::Warning => "warning",
            AllocationMode::Strict => "strict",
        })
    }
}

#[derive(Debug)]
pub struct AllocationControl {
    mode: AtomicU8,
    budget: u64,
}

impl AllocationControl {
    pub fn new(budget: u64) -> Self {
        Self {
            mode: AtomicU8::new(AllocationMode::Off as u8),
            budget,
        }
    }

    pub fn mode(&self) -> AllocationMode {
        AllocationMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Switch to `mode` until the guard is dropped
    pub fn enter_stage(&self, mode: AllocationMode) -> ScopedAllocation<'_> {
        let previous = AllocationMode::from_u8(self.mode.swap(mode as u8, Ordering::AcqRel));
        log::debug!("Allocation mode {previous} -> {mode}");
        ScopedAllocation {
            control: self,
            previous,
        }
    }

    pub fn check_allocation(&self, requested: u64) -> Result<(), StageError> {
        if requested <= self.budget {
            return Ok(());
        }
        match self.mode() {
            AllocationMode::Off => Ok(()),
            AllocationMode::Warning => {
                log::warn!(
                    "Allocation of {} bytes exceeds the {}-byte budget",
                    requested,
                    self.budget
                );
                Ok(())
            }
            AllocationMode::Strict => Err(StageError::AllocationLimit {
                requested,
                budget: self.budget,
            }),
        }
    }
}

/// Restores the previous allocation mode on drop
#[must_use = "the allocation mode is restored as soon as the guard is dropped"]
pub struct ScopedAllocation<'a> {
    control: &'a AllocationControl,
    previous: AllocationMode,
}

impl ScopedAllocation<'_> {
    pub fn previous(&self) -> AllocationMode {
        self.previous
    }
}

impl Drop for ScopedAllocation<'_> {
    fn drop(&mut self) {
        self.control
            .mode
            .store(self.previous as u8, Ordering::Release);
    }
}
