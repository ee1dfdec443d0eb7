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

//! The linear change stream: an ordered sequence of `START`/`END` events a
//! code-generation pass can walk in offset order without recomputing
//! enclosing address context.

use crate::entry::NON_ADDR;
use crate::region::Addr;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Start,
    End,
}

/// What a [`ChangeEvent`] refers back to: a real tree node, or a
/// synthesized top-level filler with no region behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Region(NodeId),
    Filler { start: u32, end: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: Kind,
    pub offset: u32,
    /// The address in effect at `offset` after this change: for `End`,
    /// the address that resumes in the enclosing scope.
    pub address: i64,
    pub source: Source,
}

/// An enclosing region's address-at-offset function, captured once per
/// recursion level so children don't need to walk back up the tree to
/// compute their own `End` address.
#[derive(Clone, Copy)]
enum AddrContext {
    NonAddr,
    Mapped { base: u32, offset: u32 },
}

impl AddrContext {
    fn of(address: Addr, offset: u32) -> AddrContext {
        match address {
            Addr::NonAddr => AddrContext::NonAddr,
            Addr::Mapped(base) => AddrContext::Mapped { base, offset },
        }
    }

    fn address_at(&self, offset: u32) -> i64 {
        match *self {
            AddrContext::NonAddr => NON_ADDR,
            AddrContext::Mapped { base, offset: o } => i64::from(base) + i64::from(offset - o),
        }
    }
}

/// Build the change stream for `tree`: `O(N)` in the region count, walking
/// the top level in offset order and synthesizing a `NON_ADDR` filler
/// between consecutive top-level children (and at the file edges) so the
/// stream covers `[0, span_length)` with no gaps. Nested gaps need no
/// filler: bytes a container doesn't hand to a child stay in the
/// container's own uninterrupted address band.
pub fn build(tree: &Tree) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    let root = tree.node(tree.root());
    let root_ctx = AddrContext::NonAddr;

    let mut cursor = 0u32;
    for &child_id in &root.children {
        let child = tree.node(child_id);
        if cursor < child.offset {
            emit_filler(cursor, child.offset, &mut events);
        }
        emit_node(tree, child_id, root_ctx, &mut events);
        cursor = child.end();
    }
    if cursor < root.length {
        emit_filler(cursor, root.length, &mut events);
    }
    events
}

fn emit_filler(start: u32, end: u32, events: &mut Vec<ChangeEvent>) {
    events.push(ChangeEvent {
        kind: Kind::Start,
        offset: start,
        address: NON_ADDR,
        source: Source::Filler { start, end },
    });
    events.push(ChangeEvent {
        kind: Kind::End,
        offset: end,
        address: NON_ADDR,
        source: Source::Filler { start, end },
    });
}

fn emit_node(tree: &Tree, node_id: NodeId, parent_ctx: AddrContext, events: &mut Vec<ChangeEvent>) {
    let node = tree.node(node_id);
    let own_ctx = AddrContext::of(node.address, node.offset);

    events.push(ChangeEvent {
        kind: Kind::Start,
        offset: node.offset,
        address: own_ctx.address_at(node.offset),
        source: Source::Region(node_id),
    });
    for &child in &node.children {
        emit_node(tree, child, own_ctx, events);
    }
    events.push(ChangeEvent {
        kind: Kind::End,
        offset: node.end(),
        address: parent_ctx.address_at(node.end()),
        source: Source::Region(node_id),
    });
}

/// Stack-based nesting check: every `End` matches the most recently opened
/// unmatched `Start`, and the stack is empty at the end.
pub fn is_properly_nested(events: &[ChangeEvent]) -> bool {
    let mut depth = 0i64;
    for event in events {
        match event.kind {
            Kind::Start => depth += 1,
            Kind::End => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
        }
    }
    depth == 0
}
