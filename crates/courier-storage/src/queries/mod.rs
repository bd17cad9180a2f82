// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the delivery schema.

pub mod directory;
pub mod expiry;
pub mod leases;
pub mod messages;
