#![no_main]

use libfuzzer_sys::arbitrary::{self, Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use roaring64::{SerializationFormat, Treemap};
use std::collections::BTreeSet;
use std::mem;

// Shard keys generated values are drawn from. A handful of keys, including both ends
// of the key space, keeps the operations colliding on shared shards.
const HIGH_KEYS: [u32; 6] = [0, 1, 2, 0x8000_0000, u32::MAX - 1, u32::MAX];

// Widest range handed to the range operations, so the model stays cheap.
const MAX_RANGE: u64 = 1 << 12;

#[derive(Debug, Copy, Clone)]
struct Num(u64);

impl<'a> Arbitrary<'a> for Num {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let key: u8 = u.arbitrary()?;
        let low: u32 = u.arbitrary()?;
        let high = HIGH_KEYS[key as usize % HIGH_KEYS.len()];
        Ok(Self(roaring64::join(high, low)))
    }
}

#[derive(Arbitrary, Debug)]
enum Operation {
    Insert(Num),
    Remove(Num),
    Clear,
    Contains(Num),
    CheckLen,
    CheckMinMax,
    CheckIter,
    Rank(Num),
    Select(u16),
    AdvanceTo(Num),
    InsertRange(Num, u16),
    RemoveRange(Num, u16),
    FlipRange(Num, u16),
    And,
    Or,
    AndNot,
    Xor,
    Cardinalities,
    RunOptimize,
    SwapSides,
    SerializeRoundtrip(bool),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    initial_lhs: Vec<Num>,
    initial_rhs: Vec<Num>,
    ops: Vec<Operation>,
}

/// Assert that a treemap and the model hold the same values.
fn check_equal(t: &Treemap, m: &BTreeSet<u64>) {
    assert_eq!(t.len(), m.len() as u64, "len mismatch");
    assert_eq!(t.min(), m.first().copied(), "min mismatch");
    assert_eq!(t.max(), m.last().copied(), "max mismatch");
    assert_eq!(t.is_empty(), m.is_empty(), "is_empty mismatch");

    let t_vals: Vec<u64> = t.iter().collect();
    let m_vals: Vec<u64> = m.iter().copied().collect();
    assert_eq!(t_vals, m_vals, "iter mismatch");

    let r_vals: Vec<u64> = t.rev_iter().collect();
    let m_rev: Vec<u64> = m.iter().rev().copied().collect();
    assert_eq!(r_vals, m_rev, "rev_iter mismatch");
}

fn make_pair(vals: &[Num]) -> (Treemap, BTreeSet<u64>) {
    let t: Treemap = vals.iter().map(|n| n.0).collect();
    let m: BTreeSet<u64> = vals.iter().map(|n| n.0).collect();
    (t, m)
}

fn range_of(Num(start): Num, len: u16) -> std::ops::Range<u64> {
    let len = u64::from(len) % MAX_RANGE;
    start..start.saturating_add(len)
}

fuzz_target!(|input: FuzzInput| {
    let (mut lhs_t, mut lhs_m) = make_pair(&input.initial_lhs);
    let (mut rhs_t, mut rhs_m) = make_pair(&input.initial_rhs);

    check_equal(&lhs_t, &lhs_m);
    check_equal(&rhs_t, &rhs_m);

    for op in &input.ops {
        match *op {
            Operation::Insert(Num(v)) => {
                assert_eq!(lhs_t.insert(v), lhs_m.insert(v), "insert({v}) mismatch");
            }
            Operation::Remove(Num(v)) => {
                lhs_t.remove(v);
                lhs_m.remove(&v);
            }
            Operation::Clear => {
                lhs_t.clear();
                lhs_m.clear();
            }
            Operation::Contains(Num(v)) => {
                assert_eq!(lhs_t.contains(v), lhs_m.contains(&v), "contains({v}) mismatch");
            }
            Operation::CheckLen => {
                assert_eq!(lhs_t.len(), lhs_m.len() as u64, "len mismatch");
            }
            Operation::CheckMinMax => {
                assert_eq!(lhs_t.min(), lhs_m.first().copied(), "min mismatch");
                assert_eq!(lhs_t.max(), lhs_m.last().copied(), "max mismatch");
            }
            Operation::CheckIter => {
                let t_vals: Vec<u64> = lhs_t.iter().collect();
                let m_vals: Vec<u64> = lhs_m.iter().copied().collect();
                assert_eq!(t_vals, m_vals, "iter mismatch");
            }
            Operation::Rank(Num(v)) => {
                let expected = lhs_m.range(..=v).count() as u64;
                assert_eq!(lhs_t.rank(v), expected, "rank({v}) mismatch");
            }
            Operation::Select(k) => {
                let k = u64::from(k);
                match lhs_m.iter().nth(k as usize) {
                    Some(&v) => {
                        assert_eq!(lhs_t.select(k).ok(), Some(v), "select({k}) mismatch");
                        assert_eq!(lhs_t.rank(v), k + 1, "rank(select({k})) mismatch");
                    }
                    None => assert!(lhs_t.select(k).is_err(), "select({k}) past the end"),
                }
            }
            Operation::AdvanceTo(Num(v)) => {
                let mut iter = lhs_t.iter();
                iter.advance_if_needed(v);
                assert_eq!(
                    iter.peek_next(),
                    lhs_m.range(v..).next().copied(),
                    "advance_if_needed({v}) mismatch"
                );
            }
            Operation::InsertRange(start, len) => {
                let range = range_of(start, len);
                let before = lhs_m.len();
                lhs_m.extend(range.clone());
                let added = lhs_t.insert_range(range);
                assert_eq!(added, (lhs_m.len() - before) as u64, "insert_range mismatch");
            }
            Operation::RemoveRange(start, len) => {
                let range = range_of(start, len);
                let before = lhs_m.len();
                lhs_m.retain(|v| !range.contains(v));
                let removed = lhs_t.remove_range(range);
                assert_eq!(removed, (before - lhs_m.len()) as u64, "remove_range mismatch");
            }
            Operation::FlipRange(start, len) => {
                let range = range_of(start, len);
                for v in range.clone() {
                    if !lhs_m.remove(&v) {
                        lhs_m.insert(v);
                    }
                }
                lhs_t.flip_range(range);
            }
            Operation::And => {
                lhs_t.and(&rhs_t);
                lhs_m = &lhs_m & &rhs_m;
            }
            Operation::Or => {
                lhs_t.or(&rhs_t);
                lhs_m = &lhs_m | &rhs_m;
            }
            Operation::AndNot => {
                lhs_t.and_not(&rhs_t);
                lhs_m = &lhs_m - &rhs_m;
            }
            Operation::Xor => {
                lhs_t.xor(&rhs_t);
                lhs_m = &lhs_m ^ &rhs_m;
            }
            Operation::Cardinalities => {
                let and = lhs_m.intersection(&rhs_m).count() as u64;
                let or = lhs_m.union(&rhs_m).count() as u64;
                assert_eq!(lhs_t.and_cardinality(&rhs_t), and, "and_cardinality mismatch");
                assert_eq!(rhs_t.and_cardinality(&lhs_t), and, "and_cardinality asymmetry");
                assert_eq!(lhs_t.or_cardinality(&rhs_t), or, "or_cardinality mismatch");
                assert_eq!(lhs_t.intersects(&rhs_t), and > 0, "intersects mismatch");
            }
            Operation::RunOptimize => {
                lhs_t.run_optimize();
            }
            Operation::SwapSides => {
                mem::swap(&mut lhs_t, &mut rhs_t);
                mem::swap(&mut lhs_m, &mut rhs_m);
            }
            Operation::SerializeRoundtrip(legacy) => {
                let format = if legacy {
                    SerializationFormat::Legacy
                } else {
                    SerializationFormat::Native
                };
                lhs_t.set_format(format);

                let bytes = lhs_t.to_bytes().unwrap();
                assert_eq!(bytes.len() as u64, lhs_t.serialized_size(), "serialized_size mismatch");

                let restored = Treemap::deserialize_with(format, &bytes[..]).unwrap();
                assert_eq!(restored, lhs_t, "serialize roundtrip mismatch");
            }
        }
    }

    check_equal(&lhs_t, &lhs_m);
    check_equal(&rhs_t, &rhs_m);

    let mut many = lhs_t.many_iter();
    let mut buf = [0u64; 37];
    let mut collected = Vec::new();
    loop {
        let n = many.next_many(&mut buf);
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }
    assert_eq!(collected, lhs_m.iter().copied().collect::<Vec<_>>(), "next_many mismatch");
});
