//! # minibox-core
//!
//! Low-level Linux isolation primitives for the minibox runtime.
//!
//! This crate provides:
//! - **Kernel**: the capability object through which every namespace,
//!   mount, device, and exec syscall is issued.
//! - **Namespaces**: private mount namespace with propagation severed.
//! - **Filesystem**: `OverlayFS` root construction, pseudo-filesystem and
//!   device population, and `pivot_root`.
//!
//! Nothing in this crate touches kernel state except through a
//! [`kernel::Kernel`], so every sequence can be exercised against a
//! [`kernel::RecordingKernel`] without privilege.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod filesystem;
pub mod kernel;
pub mod namespace;
