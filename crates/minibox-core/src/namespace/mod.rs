//! Linux namespace management for container isolation.
//!
//! Only the mount namespace is isolated; its propagation to and from the
//! host is severed before any container mount is made.

pub mod mount;
