//! Kernel Unit Tests Module
//!
//! Scenario tests that drive the whole kernel state against a mock platform.

pub(crate) mod support;

mod syscall_tests;
