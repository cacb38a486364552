//! Memory management subsystem.
//!
//! There is no allocator: every process owns one fixed 4 MB physical frame
//! and the kernel owns one fixed set of translation structures.
//!
//! # Components
//!
//! - **Paging**: directory/table layout and the window remapping operations

pub mod paging;

pub use paging::{AddressSpace, PageEntry, PageFlags, PageTable};
