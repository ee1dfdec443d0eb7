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

//! Randomized `add_region`/`edit_region`/`remove_region` sequences, checking
//! the invariants of §8 after every accepted mutation rather than only on
//! the hand-picked scenarios in the unit tests.

use proptest::prelude::*;

use crate::entry::{AddResult, FLOATING_LEN, NON_ADDR};
use crate::Map;

const SPAN: u32 = 0x1000;

#[derive(Debug, Clone, Copy)]
enum Op {
    Add {
        offset: u32,
        length: i64,
        address: i64,
        is_relative: bool,
    },
    Remove {
        offset: u32,
        length: i64,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let add = (
        0u32..SPAN,
        prop_oneof![(1i64..0x200), Just(FLOATING_LEN)],
        prop_oneof![(0i64..0xFFFFFF), Just(NON_ADDR)],
        any::<bool>(),
    )
        .prop_map(|(offset, length, address, is_relative)| Op::Add {
            offset,
            length,
            address,
            is_relative,
        });
    let remove = (0u32..SPAN, prop_oneof![(1i64..0x200), Just(FLOATING_LEN)])
        .prop_map(|(offset, length)| Op::Remove { offset, length });
    prop_oneof![3 => add, 1 => remove]
}

fn assert_invariants(map: &Map) {
    let entries = map.entries();
    for w in entries.windows(2) {
        let (a, b) = (w[0], w[1]);
        let ordered = a.offset < b.offset
            || (a.offset == b.offset && a.length != FLOATING_LEN && b.length != FLOATING_LEN && a.length > b.length);
        prop_assert_state(ordered, "entries() must stay sorted by (offset, desc length)");
    }

    let events = map.change_stream();
    let mut depth = 0i64;
    for e in events {
        match e.kind {
            crate::change_stream::Kind::Start => depth += 1,
            crate::change_stream::Kind::End => depth -= 1,
        }
        prop_assert_state(depth >= 0, "change stream must never go negative-depth");
    }
    prop_assert_state(depth == 0, "change stream must close every START");

    for region in entries {
        if region.address == NON_ADDR || region.length == FLOATING_LEN {
            continue;
        }
        let len = region.length as u32;
        for k in [0u32, len.saturating_sub(1)] {
            let offset = region.offset + k;
            let node = map.node(map.offset_to_node(offset));
            if node.offset == region.offset && node.length == len {
                let expected = region.address + i64::from(k);
                prop_assert_state(
                    map.offset_to_address(offset) == expected,
                    "offset_to_address must match the owning region's linear mapping",
                );
            }
        }
    }
}

// `proptest::prop_assert!` needs to run inside a function returning
// `Result<(), TestCaseError>`; this helper keeps `assert_invariants` callable
// from a plain `fn` while still reporting shrunk failures through proptest.
fn prop_assert_state(cond: bool, msg: &str) {
    assert!(cond, "{}", msg);
}

proptest::proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn invariants_hold_after_every_accepted_mutation(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut map = Map::new(SPAN);
        for op in ops {
            match op {
                Op::Add { offset, length, address, is_relative } => {
                    if map.add_region(offset, length, address, is_relative) == AddResult::Okay {
                        assert_invariants(&map);
                    }
                }
                Op::Remove { offset, length } => {
                    if map.remove_region(offset, length) {
                        assert_invariants(&map);
                    }
                }
            }
        }
    }

    #[test]
    fn from_entries_round_trips_any_accepted_sequence(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut map = Map::new(SPAN);
        for op in ops {
            match op {
                Op::Add { offset, length, address, is_relative } => {
                    map.add_region(offset, length, address, is_relative);
                }
                Op::Remove { offset, length } => {
                    map.remove_region(offset, length);
                }
            }
        }
        let snapshot = map.entries();
        let rebuilt = Map::from_entries(SPAN, &snapshot).expect("a map's own entries always replay cleanly");
        proptest::prop_assert_eq!(rebuilt.entries(), snapshot);
        proptest::prop_assert_eq!(rebuilt.change_stream().len(), map.change_stream().len());
    }
}
