// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! On-disk formats for a built tree's topology: a human-readable text form
//! and a fixed-width binary form. Both formats embed `dims` and `leaf_size`
//! in their own header, alongside the arena's node/leaf/item counts; neither
//! stores item geometry — that stays with the caller, resolved back through
//! a [`crate::query::BoundsFn`] at query time, never written here.

pub(crate) mod binary;
pub(crate) mod text;
