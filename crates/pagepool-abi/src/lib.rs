#![allow(clippy::missing_safety_doc)]
//! # pagepool-abi
//!
//! ABI-compatible `extern "C"` boundary layer for the pagepool allocator.
//!
//! This crate produces a `cdylib`/`staticlib` exposing the classical C
//! heap surface plus the C++ object-construction and -destruction entry
//! points, all delegating to `pagepool-core`. Linked (or preloaded) in
//! place of the system allocator, every dynamic allocation in the hosted
//! program is serviced by the buddy pools.
//!
//! The modules are gated behind `cfg(not(test))` because they export
//! `#[no_mangle]` symbols (`malloc`, `free`, ...) that would shadow the
//! test binary's own allocator and recurse.

#[cfg(not(test))]
pub mod malloc_abi;
#[cfg(not(test))]
pub mod new_abi;
