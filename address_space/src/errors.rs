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

//! Internal diagnostic errors.
//!
//! Every public structural operation on [`crate::Map`] returns the typed
//! `AddResult`/`bool`/sentinel values the rest of this crate defines, never
//! an [`Error`] from here. This module only carries invariant breaches the
//! validator catches after a mutation — conditions that mean a bug in the
//! mutation code itself, not a bad caller argument.

error_chain! {
    errors {
        UnsortedRegionList {
            display("region list is not sorted by (offset, descending length)")
        }
        OverlappingRegions(a_offset: u32, b_offset: u32) {
            display("regions at offsets {:#x} and {:#x} straddle without containment", a_offset, b_offset)
        }
        TreeSpanMismatch(expected: u32, actual: u32) {
            display("tree root spans {:#x} bytes, expected {:#x}", actual, expected)
        }
        RegionCountMismatch(expected: usize, actual: usize) {
            display("tree has {} region nodes, region list has {}", actual, expected)
        }
        FloatingNotResolved(offset: u32) {
            display("floating region at offset {:#x} was never resolved by the tree", offset)
        }
        ChangeStreamUnbalanced(starts: usize, ends: usize) {
            display("change stream is not balanced: {} starts, {} ends", starts, ends)
        }
        ChangeStreamCardinality(expected: usize, actual: usize) {
            display("change stream has {} events, expected {}", actual, expected)
        }
    }
}
