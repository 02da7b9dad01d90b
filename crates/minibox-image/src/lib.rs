//! # minibox-image
//!
//! Image management for the minibox runtime.
//!
//! Handles:
//! - **Layers**: unpacking an image archive while dropping device entries.
//! - **Storage**: the on-disk layout of the images directory and the
//!   extract-once materialization of each image.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod layer;
pub mod storage;
