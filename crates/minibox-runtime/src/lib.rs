//! Container bootstrap for the minibox runtime.
//!
//! [`process::Supervisor`] forks a child which runs
//! [`contain::enter_container`]: a private mount namespace, an overlay root
//! built by [`rootfs::build_root`], a populated `/dev`, `/proc` and `/sys`,
//! `pivot_root`, and finally `exec` of the target program.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod contain;
pub mod process;
pub mod rootfs;
