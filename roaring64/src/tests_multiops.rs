use std::collections::BTreeSet;

use crate::{Treemap, fast_and, fast_or, fast_xor, heap_or, heap_xor, join};
use proptest::prelude::*;

fn arb_values() -> impl Strategy<Value = Vec<u64>> {
    let value = prop_oneof![
        4 => (0u32..4, 0u32..1024).prop_map(|(high, low)| join(high, low)),
        1 => any::<u64>(),
    ];
    proptest::collection::vec(value, 0..128)
}

fn arb_inputs() -> impl Strategy<Value = Vec<Vec<u64>>> {
    proptest::collection::vec(arb_values(), 0..8)
}

fn model_and(inputs: &[Vec<u64>]) -> BTreeSet<u64> {
    let mut sets = inputs.iter().map(|v| v.iter().copied().collect::<BTreeSet<_>>());
    let Some(first) = sets.next() else {
        return BTreeSet::new();
    };
    sets.fold(first, |acc, set| &acc & &set)
}

fn model_or(inputs: &[Vec<u64>]) -> BTreeSet<u64> {
    inputs.iter().flatten().copied().collect()
}

fn model_xor(inputs: &[Vec<u64>]) -> BTreeSet<u64> {
    inputs
        .iter()
        .map(|v| v.iter().copied().collect::<BTreeSet<_>>())
        .fold(BTreeSet::new(), |acc, set| &acc ^ &set)
}

fn to_sorted(set: BTreeSet<u64>) -> Vec<u64> {
    set.into_iter().collect()
}

#[test]
fn no_inputs_yield_empty_sets() {
    let none: [&Treemap; 0] = [];

    assert!(fast_and(none).is_empty());
    assert!(fast_or(none).is_empty());
    assert!(fast_xor(none).is_empty());
    assert!(heap_or(none).is_empty());
    assert!(heap_xor(none).is_empty());
}

#[test]
fn single_input_is_copied() {
    let only = Treemap::from([3, 1 << 40, u64::MAX]);

    assert_eq!(fast_and([&only]), only);
    assert_eq!(fast_or([&only]), only);
    assert_eq!(fast_xor([&only]), only);
    assert_eq!(heap_or([&only]), only);
    assert_eq!(heap_xor([&only]), only);
}

#[test]
fn three_way_reductions() {
    let a = Treemap::from([1, 2, 3, 1 << 32]);
    let b = Treemap::from([2, 3, 4, 1 << 32]);
    let c = Treemap::from([3, 4, 5, 1 << 32, 9 << 32]);
    let inputs = [&a, &b, &c];

    assert_eq!(fast_and(inputs).to_vec(), vec![3, 1 << 32]);
    assert_eq!(
        fast_or(inputs).to_vec(),
        vec![1, 2, 3, 4, 5, 1 << 32, 9 << 32]
    );
    assert_eq!(heap_or(inputs), fast_or(inputs));

    // Present in an odd number of inputs.
    assert_eq!(fast_xor(inputs).to_vec(), vec![1, 3, 5, 1 << 32, 9 << 32]);
    assert_eq!(heap_xor(inputs), fast_xor(inputs));
}

#[test]
fn fast_and_with_disjoint_input_is_empty() {
    let a = Treemap::from([1, 2]);
    let b = Treemap::from([3 << 32]);
    let c = Treemap::from([1, 2, 3 << 32]);

    let result = fast_and([&a, &b, &c]);
    assert!(result.is_empty());
    assert_eq!(result.shard_count(), 0);
}

#[test]
fn inputs_are_left_untouched() {
    let a = Treemap::from([1, 1 << 33]);
    let b = Treemap::from([2, 1 << 33]);
    let (a_before, b_before) = (a.clone(), b.clone());

    let _ = heap_or([&a, &b]);
    let _ = heap_xor([&a, &b]);
    let _ = fast_and([&a, &b]);

    assert_eq!(a, a_before);
    assert_eq!(b, b_before);
}

#[test]
fn heap_reduction_handles_skewed_sizes() {
    let mut large = Treemap::new();
    large.insert_range(0..100_000);
    let small: Vec<Treemap> = (0..10u64).map(|i| Treemap::from([i << 32, 50])).collect();

    let mut inputs: Vec<&Treemap> = small.iter().collect();
    inputs.insert(5, &large);

    assert_eq!(heap_or(inputs.iter().copied()), fast_or(inputs.iter().copied()));
    assert_eq!(heap_xor(inputs.iter().copied()), fast_xor(inputs.iter().copied()));
}

proptest! {
    #[test]
    fn reductions_match_model(inputs in arb_inputs()) {
        let treemaps: Vec<Treemap> = inputs.iter().map(|v| v.iter().collect()).collect();

        prop_assert_eq!(fast_and(&treemaps).to_vec(), to_sorted(model_and(&inputs)));
        prop_assert_eq!(fast_or(&treemaps).to_vec(), to_sorted(model_or(&inputs)));
        prop_assert_eq!(fast_xor(&treemaps).to_vec(), to_sorted(model_xor(&inputs)));
        prop_assert_eq!(heap_or(&treemaps).to_vec(), to_sorted(model_or(&inputs)));
        prop_assert_eq!(heap_xor(&treemaps).to_vec(), to_sorted(model_xor(&inputs)));
    }

    #[test]
    fn order_of_inputs_is_irrelevant(inputs in arb_inputs()) {
        let treemaps: Vec<Treemap> = inputs.iter().map(|v| v.iter().collect()).collect();
        let reversed: Vec<&Treemap> = treemaps.iter().rev().collect();

        prop_assert_eq!(fast_and(&treemaps).to_vec(), fast_and(reversed.iter().copied()).to_vec());
        prop_assert_eq!(heap_or(&treemaps), heap_or(reversed.iter().copied()));
        prop_assert_eq!(heap_xor(&treemaps), heap_xor(reversed.iter().copied()));
    }
}
