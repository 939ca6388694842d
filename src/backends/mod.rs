// SPDX-License-Identifier: GPL-3.0-only

//! Backend layer for frame capture
//!
//! # Modules
//!
//! - [`camera`]: Frame source trait, raw frame types and the synthetic test-pattern camera

pub mod camera;
