// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the location tracker
//!
//! Provides the common data types that are used across every modul.

pub mod identity;
pub mod permission;
pub mod position;
pub mod serde;
pub mod sync;
pub mod test_helper;
pub mod tracked_position;
pub mod tracking_state;
