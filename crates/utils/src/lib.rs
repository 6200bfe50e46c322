//! Shared utilities for hyvve-state
//!
//! Small helpers used by the persistence engine and the CLI: atomic file
//! writes, XDG directory resolution, a millisecond clock, and tracing setup.

pub mod atomic_file;
pub mod clock;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use clock::*;
pub use xdg::*;
