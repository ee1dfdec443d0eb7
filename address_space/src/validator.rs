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

//! Cross-view consistency checks run after every regeneration.
//!
//! A failure here means a bug in the mutation or build algorithms, not a
//! bad caller argument — every argument fault is already rejected by
//! [`crate::region::RegionList::add_region`] before any view is rebuilt.

use crate::change_stream::{self, ChangeEvent};
use crate::errors::{ErrorKind, Result};
use crate::region::RegionList;
use crate::tree::Tree;

/// Full consistency pass: region list ordering, tree/region-list
/// agreement, and change-stream cardinality/nesting. Run after every
/// mutation in debug builds.
pub fn validate_full(list: &RegionList, tree: &Tree, events: &[ChangeEvent]) -> Result<()> {
    validate_region_list(list)?;
    validate_tree(list, tree)?;
    validate_change_stream(list, tree, events)?;
    Ok(())
}

/// The cheaper check release builds run at every mutation boundary:
/// region count, tree node count, and change-stream cardinality agree.
pub fn validate_cheap(list: &RegionList, tree: &Tree, events: &[ChangeEvent]) -> Result<()> {
    let region_count = list.regions().len();
    let tree_count = tree.nodes().len() - 1; // exclude the synthetic root
    if region_count != tree_count {
        return Err(ErrorKind::RegionCountMismatch(region_count, tree_count).into());
    }
    let expected = 2 * (region_count + top_level_filler_count(tree));
    if events.len() != expected {
        return Err(ErrorKind::ChangeStreamCardinality(expected, events.len()).into());
    }
    Ok(())
}

fn validate_region_list(list: &RegionList) -> Result<()> {
    let regions = list.regions();
    for w in regions.windows(2) {
        let (a, b) = (w[0], w[1]);
        let ordered = a.offset < b.offset
            || (a.offset == b.offset
                && match (a.fixed_end(), b.fixed_end()) {
                    (Some(ae), Some(be)) => ae > be,
                    _ => false,
                });
        if !ordered {
            return Err(ErrorKind::UnsortedRegionList.into());
        }
    }

    for (i, a) in regions.iter().enumerate() {
        let a_end = match a.fixed_end() {
            Some(e) => e,
            None => continue,
        };
        for b in &regions[i + 1..] {
            if b.offset >= a_end {
                break;
            }
            let b_end = match b.fixed_end() {
                Some(e) => e,
                None => continue,
            };
            if b_end > a_end {
                return Err(ErrorKind::OverlappingRegions(a.offset, b.offset).into());
            }
        }
    }
    Ok(())
}

fn validate_tree(list: &RegionList, tree: &Tree) -> Result<()> {
    let root = tree.node(tree.root());
    if root.offset != 0 || root.length != list.span_length() {
        return Err(ErrorKind::TreeSpanMismatch(list.span_length(), root.length).into());
    }

    let mut seen = 0usize;
    for node in tree.nodes() {
        if node.parent.is_none() {
            continue; // the synthetic root itself
        }
        seen += 1;
        if node.was_floating {
            let parent_end = match node.parent {
                Some(p) => tree.node(p).end(),
                None => root.end(),
            };
            if node.end() > parent_end {
                return Err(ErrorKind::FloatingNotResolved(node.offset).into());
            }
        }
    }
    if seen != list.regions().len() {
        return Err(ErrorKind::RegionCountMismatch(list.regions().len(), seen).into());
    }

    for node in tree.nodes() {
        for w in node.children.windows(2) {
            let (a, b) = (tree.node(w[0]), tree.node(w[1]));
            if a.end() > b.offset {
                return Err(ErrorKind::OverlappingRegions(a.offset, b.offset).into());
            }
        }
    }
    Ok(())
}

fn top_level_filler_count(tree: &Tree) -> usize {
    let root = tree.node(tree.root());
    let mut cursor = 0u32;
    let mut count = 0usize;
    for &child in &root.children {
        let child = tree.node(child);
        if cursor < child.offset {
            count += 1;
        }
        cursor = child.end();
    }
    if cursor < root.end() {
        count += 1;
    }
    count
}

fn validate_change_stream(list: &RegionList, tree: &Tree, events: &[ChangeEvent]) -> Result<()> {
    if !change_stream::is_properly_nested(events) {
        let (starts, ends) = events.iter().fold((0, 0), |(s, e), ev| {
            use crate::change_stream::Kind;
            match ev.kind {
                Kind::Start => (s + 1, e),
                Kind::End => (s, e + 1),
            }
        });
        return Err(ErrorKind::ChangeStreamUnbalanced(starts, ends).into());
    }
    let expected = 2 * (list.regions().len() + top_level_filler_count(tree));
    if events.len() != expected {
        return Err(ErrorKind::ChangeStreamCardinality(expected, events.len()).into());
    }
    Ok(())
}
