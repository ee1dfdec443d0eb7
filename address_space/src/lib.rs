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

//! Offset/address mapping core for a 6502/65816 disassembler.
//!
//! [`Map`] binds file byte-offsets to CPU addresses. It owns three coherent
//! views over the same authoritative [`region::RegionList`] — a
//! [`tree::Tree`] for scoped address lookups and a [`change_stream`] for
//! linear code generation — and regenerates both, plus running the
//! [`validator`], after every structural mutation. See `errors` for the
//! internal-only diagnostic channel: every public operation below returns
//! the typed `AddResult`/`bool`/sentinel values the caller actually handles.

#[macro_use]
extern crate error_chain;

pub mod change_stream;
pub mod entry;
pub mod errors;
pub mod region;
pub mod tree;
pub mod validator;

#[cfg(test)]
mod proptests;

use log::{debug, error};

pub use change_stream::ChangeEvent;
pub use entry::{AddResult, Entry, ADDR_MAX, FLOATING_LEN, NON_ADDR, OFFSET_MAX};
pub use region::Region;
pub use tree::NOT_FOUND;

use region::RegionList;
use tree::{NodeId, Tree};

/// The offset/address map: a region list plus its derived tree and change
/// stream, kept mutually consistent across every mutation.
#[derive(Debug, Clone)]
pub struct Map {
    regions: RegionList,
    tree: Tree,
    events: Vec<ChangeEvent>,
}

impl Map {
    /// An empty map spanning `[0, span_length)`.
    pub fn new(span_length: u32) -> Map {
        let regions = RegionList::new(span_length);
        let tree = Tree::build(&regions);
        let events = change_stream::build(&tree);
        let map = Map {
            regions,
            tree,
            events,
        };
        map.validate();
        map
    }

    /// Bulk construction from a flat entry sequence, as loaded from a
    /// project file. Never trusts the caller's ordering: every entry is
    /// re-applied through `add_region`. Returns the first non-`Okay` result
    /// and the offending entry's index, or `Ok(map)` if every entry was
    /// accepted.
    pub fn from_entries(span_length: u32, entries: &[Entry]) -> Result<Map, (usize, AddResult)> {
        let mut map = Map::new(span_length);
        for (i, e) in entries.iter().enumerate() {
            let result = map.add_region(e.offset, e.length, e.address, e.is_relative);
            if result != AddResult::Okay {
                return Err((i, result));
            }
        }
        Ok(map)
    }

    pub fn span_length(&self) -> u32 {
        self.regions.span_length()
    }

    /// Stable-ordering snapshot for serialization.
    pub fn entries(&self) -> Vec<Entry> {
        self.regions.entries()
    }

    /// All regions starting exactly at `offset`, in stored order.
    pub fn regions_at(&self, offset: u32) -> Vec<Region> {
        self.regions.regions_at(offset)
    }

    /// The ordered `START`/`END` stream a code-generation pass walks.
    pub fn change_stream(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn add_region(&mut self, offset: u32, length: i64, address: i64, is_relative: bool) -> AddResult {
        let result = self.regions.add_region(offset, length, address, is_relative);
        if result == AddResult::Okay {
            debug!(
                "Map::add_region accepted: offset={:#x} length={:#x} address={:#x}",
                offset, length, address
            );
            self.regenerate();
        }
        result
    }

    pub fn edit_region(&mut self, offset: u32, length: i64, address: i64, is_relative: bool) -> bool {
        let ok = self.regions.edit_region(offset, length, address, is_relative);
        if ok {
            debug!("Map::edit_region applied: offset={:#x} length={:#x}", offset, length);
            self.regenerate();
        }
        ok
    }

    pub fn remove_region(&mut self, offset: u32, length: i64) -> bool {
        let ok = self.regions.remove_region(offset, length);
        if ok {
            debug!("Map::remove_region applied: offset={:#x} length={:#x}", offset, length);
            self.regenerate();
        }
        ok
    }

    /// `offset -> address`, or [`NON_ADDR`] if the containing node has no
    /// CPU address.
    pub fn offset_to_address(&self, offset: u32) -> i64 {
        self.tree.offset_to_address(offset)
    }

    /// Scope-aware `address -> offset`, or [`NOT_FOUND`] if nothing in
    /// `src_offset`'s scope chain maps to `target_addr`.
    pub fn address_to_offset(&self, src_offset: u32, target_addr: i64) -> i64 {
        self.tree.address_to_offset(src_offset, target_addr)
    }

    /// True iff `[offset, offset + length)` lies within one tree node with
    /// no child carving into it.
    pub fn is_range_unbroken(&self, offset: u32, length: u32) -> bool {
        self.tree.is_range_unbroken(offset, length)
    }

    /// The tree node whose range contains `offset`. Exposed for consumers
    /// that need node identity (e.g. the code generator resolving which
    /// region an instruction lives in) without redoing a descent.
    pub fn offset_to_node(&self, offset: u32) -> NodeId {
        self.tree.offset_to_node(offset)
    }

    pub fn node(&self, id: NodeId) -> &tree::Node {
        self.tree.node(id)
    }

    fn regenerate(&mut self) {
        self.tree = Tree::build(&self.regions);
        self.events = change_stream::build(&self.tree);
        self.validate();
    }

    /// Cross-view consistency check. The full pass runs under debug
    /// assertions; release builds run the cheaper cardinality-only check at
    /// the mutation boundary. A failure here is a bug in this crate, not a
    /// caller error — see `errors`.
    fn validate(&self) {
        let result = if cfg!(debug_assertions) {
            validator::validate_full(&self.regions, &self.tree, &self.events)
        } else {
            validator::validate_cheap(&self.regions, &self.tree, &self.events)
        };
        if let Err(e) = result {
            error!("Map invariant breach: {}", e);
            panic!("address map invariant breach: {}", e);
        }
    }
}
