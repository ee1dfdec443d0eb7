// Copyright (c) 2020 Huawei Technologies Co.,Ltd. All rights reserved.
//
// StratoVirt is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

use serde::{Deserialize, Serialize};

use crate::region::{Addr, Length};

/// Sentinel `length` meaning "resolve to the next natural boundary".
///
/// Distinct from any valid length, which is always `>= 0`, and from
/// [`NON_ADDR`] so the two sentinels never alias across serialization.
pub const FLOATING_LEN: i64 = -1;

/// Sentinel `address` meaning "this range has no CPU address".
///
/// Distinct from any valid address, which is always `>= 0`, and from
/// [`FLOATING_LEN`].
pub const NON_ADDR: i64 = -2;

/// Highest offset a region may start at or end just past.
pub const OFFSET_MAX: u32 = (1 << 24) - 1;

/// Highest CPU address a region may map to.
pub const ADDR_MAX: u32 = (1 << 24) - 1;

/// One row of the flat, serializable entry sequence a project file stores.
///
/// `(offset, length, address, is_relative)` mirrors a [`crate::region::Region`]
/// exactly, except `length` and `address` are flattened to sentinel-bearing
/// integers so the shape survives a round trip through `serde_json` (or
/// whatever format the host loader picks) without this crate knowing
/// anything about file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub offset: u32,
    /// A non-negative byte count, or [`FLOATING_LEN`].
    pub length: i64,
    /// A value in `0..=ADDR_MAX`, or [`NON_ADDR`].
    pub address: i64,
    pub is_relative: bool,
}

impl Entry {
    pub fn new(offset: u32, length: i64, address: i64, is_relative: bool) -> Entry {
        Entry {
            offset,
            length,
            address,
            is_relative,
        }
    }

    pub(crate) fn length(&self) -> Length {
        if self.length == FLOATING_LEN {
            Length::Floating
        } else {
            Length::Fixed(self.length as u32)
        }
    }

    pub(crate) fn address(&self) -> Addr {
        if self.address == NON_ADDR {
            Addr::NonAddr
        } else {
            Addr::Mapped(self.address as u32)
        }
    }
}

/// Outcome of [`crate::Map::add_region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// Inserted successfully.
    Okay,
    /// Arguments fail the range checks in the data model (bad offset,
    /// length, or address, or a zero-length fixed region).
    InvalidValue,
    /// A region with the identical `(offset, length)` already exists.
    OverlapExisting,
    /// A region at the same offset exists and at least one of the two is
    /// floating-length.
    OverlapFloating,
    /// The new region partially overlaps an existing sibling: neither
    /// disjoint nor nested.
    StraddleExisting,
}
