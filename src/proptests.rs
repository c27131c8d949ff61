use super::*;

use proptest::prelude::*;

fn validate_index<V, S, L>(t: &PrefixIndex<V, S, L>)
where
    V: Eq + Hash + Clone + fmt::Debug,
    S: Eq + Clone + fmt::Debug,
    L: Layout,
{
    let issues = t.verify_integrity();
    assert!(issues.is_empty(), "integrity issues: {issues:#?}\n{t}");
}

/// Flat reference: entries in first-insertion order.
#[derive(Clone, Debug, Default)]
struct Model {
    entries: Vec<(u8, Vec<u8>, f64)>,
}

impl Model {
    fn insert(&mut self, value: u8, weight: f64, prefix: &[u8]) -> Result<()> {
        match self.entries.iter_mut().find(|(v, _, _)| *v == value) {
            Some((_, p, _)) if p != prefix => Err(Error::PrefixMismatch),
            Some((_, _, w)) => {
                *w += weight;
                Ok(())
            }
            None => {
                self.entries.push((value, prefix.to_vec(), weight));
                Ok(())
            }
        }
    }

    fn remove(&mut self, prefix: &[u8]) {
        self.entries.retain(|(_, p, _)| !p.starts_with(prefix));
    }

    fn autocomplete(&self, prefix: &[u8], limit: Option<usize>) -> Vec<(u8, f64)> {
        let mut hits: Vec<(u8, f64)> = self
            .entries
            .iter()
            .filter(|(_, p, _)| p.starts_with(prefix))
            .map(|(v, _, w)| (*v, *w))
            .collect();
        // stable: equal weights keep insertion order
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        hits
    }

    fn weight(&self, aggregation: Aggregation) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: f64 = self.entries.iter().map(|(_, _, w)| w).sum();
        match aggregation {
            Aggregation::Sum => total,
            Aggregation::Average => total / self.entries.len() as f64,
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, f64, Vec<u8>),
    Remove(Vec<u8>),
    Autocomplete(Vec<u8>, Option<usize>),
    Clear,
}

fn prefix_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A three-symbol alphabet keeps prefixes colliding and splitting often.
    prop::collection::vec(0u8..3, 0..=5)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let prefix = prefix_strategy();
    let op = prop_oneof![
        50 => (0u8..24, 1u8..=8, prefix.clone())
            .prop_map(|(v, w, p)| Op::Insert(v, w as f64, p)),
        20 => prefix.clone().prop_map(Op::Remove),
        29 => (prefix.clone(), prop::option::of(0usize..6))
            .prop_map(|(p, l)| Op::Autocomplete(p, l)),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=400)
}

fn aggregation_strategy() -> impl Strategy<Value = Aggregation> {
    prop_oneof![Just(Aggregation::Sum), Just(Aggregation::Average)]
}

fn check_against_model<L: Layout>(
    aggregation: Aggregation,
    ops: &[Op],
) -> std::result::Result<(), TestCaseError> {
    let config = Config::new(aggregation).retrieval(Retrieval::Exhaustive);
    let mut t: PrefixIndex<u8, u8, L> = PrefixIndex::with_config(config);
    let mut m = Model::default();

    for op in ops {
        match op {
            Op::Insert(value, weight, prefix) => {
                let got_t = t.insert(*value, *weight, prefix);
                let got_m = m.insert(*value, *weight, prefix);
                prop_assert_eq!(got_t, got_m);
            }
            Op::Remove(prefix) => {
                t.remove(prefix);
                m.remove(prefix);
            }
            Op::Autocomplete(prefix, limit) => {
                prop_assert_eq!(t.autocomplete(prefix, *limit), m.autocomplete(prefix, *limit));
            }
            Op::Clear => {
                t.clear();
                m = Model::default();
            }
        }

        prop_assert_eq!(t.len(), m.entries.len());
        let (got, expected) = (t.weight(), m.weight(aggregation));
        prop_assert!(
            (got - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "root weight {} != {}",
            got,
            expected
        );
    }

    validate_index(&t);
    prop_assert_eq!(t.autocomplete(&[], None), m.autocomplete(&[], None));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_loose_matches_model(aggregation in aggregation_strategy(), ops in ops_strategy()) {
        check_against_model::<Loose>(aggregation, &ops)?;
    }

    #[test]
    fn prop_compact_matches_model(aggregation in aggregation_strategy(), ops in ops_strategy()) {
        check_against_model::<Compact>(aggregation, &ops)?;
    }

    #[test]
    fn prop_greedy_is_bounded_and_ranked(
        aggregation in aggregation_strategy(),
        entries in prop::collection::vec((1u8..=8, prefix_strategy()), 0..40),
        query in prefix_strategy(),
        limit in 0usize..8,
    ) {
        let config = Config::new(aggregation).retrieval(Retrieval::Greedy);
        let mut t: CompactIndex<u8, u8> = CompactIndex::with_config(config);
        let mut m = Model::default();
        for (value, (weight, prefix)) in entries.into_iter().enumerate() {
            let value = value as u8;
            t.insert(value, weight as f64, &prefix).unwrap();
            m.insert(value, weight as f64, &prefix).unwrap();
        }

        let got = t.autocomplete(&query, Some(limit));
        let matching = m.autocomplete(&query, None);
        prop_assert_eq!(got.len(), limit.min(matching.len()));
        prop_assert!(got.windows(2).all(|w| w[0].1 >= w[1].1));
        for hit in &got {
            prop_assert!(matching.contains(hit));
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<(u8, Vec<u8>)> {
    vec![
        (1, b"".to_vec()),
        (2, b"a".to_vec()),
        (3, b"b".to_vec()),
        (4, b"aa".to_vec()),
        (5, b"ab".to_vec()),
        (6, b"abc".to_vec()),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    for aggregation in [Aggregation::Sum, Aggregation::Average] {
        for_each_permutation(&small_set(), |perm| {
            let mut loose: LooseIndex<u8, u8> = LooseIndex::new(aggregation);
            let mut compact: CompactIndex<u8, u8> = CompactIndex::new(aggregation);
            let mut m = Model::default();

            for (value, prefix) in perm {
                let weight = value as f64;
                loose.insert(value, weight, &prefix).unwrap();
                compact.insert(value, weight, &prefix).unwrap();
                m.insert(value, weight, &prefix).unwrap();
                validate_index(&loose);
                validate_index(&compact);
            }

            for query in [&b""[..], b"a", b"ab", b"b", b"c"] {
                let expected = m.autocomplete(query, None);
                assert_eq!(loose.autocomplete(query, None), expected);
                assert_eq!(compact.autocomplete(query, None), expected);
            }
            assert_eq!(loose.weight(), m.weight(aggregation));
            assert_eq!(compact.weight(), m.weight(aggregation));
        });
    }
}

#[test]
fn exhaustive_remove_order_small_set() {
    let prefixes: Vec<Vec<u8>> = vec![
        b"abc".to_vec(),
        b"a".to_vec(),
        b"b".to_vec(),
        b"aa".to_vec(),
        b"".to_vec(),
        b"ab".to_vec(),
    ];

    // Insert in a fixed order, then remove in all permutations.
    let mut base_loose: LooseIndex<u8, u8> = LooseIndex::new(Aggregation::Average);
    let mut base_compact: CompactIndex<u8, u8> = CompactIndex::new(Aggregation::Average);
    let mut base_model = Model::default();
    for (value, prefix) in small_set() {
        let weight = value as f64;
        base_loose.insert(value, weight, &prefix).unwrap();
        base_compact.insert(value, weight, &prefix).unwrap();
        base_model.insert(value, weight, &prefix).unwrap();
    }

    for_each_permutation(&prefixes, |perm| {
        let mut loose = base_loose.clone();
        let mut compact = base_compact.clone();
        let mut m = base_model.clone();

        for prefix in perm {
            loose.remove(&prefix);
            compact.remove(&prefix);
            m.remove(&prefix);
            validate_index(&loose);
            validate_index(&compact);

            let expected = m.autocomplete(&[], None);
            assert_eq!(loose.autocomplete(&[], None), expected);
            assert_eq!(compact.autocomplete(&[], None), expected);
        }
        assert!(loose.is_empty());
        assert!(compact.is_empty());
        assert_eq!(compact.tree.arena.live(), 1);
        assert_eq!(loose.tree.arena.live(), 1);
    });
}
