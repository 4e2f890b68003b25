//! # System Interaction Layer
//!
//! The boundary between the build engine and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns each expanded command through the configured shell and waits
//!   for it, with support for cancellation. The `CommandRunner` trait is the seam the
//!   builder depends on.

pub mod executor;
