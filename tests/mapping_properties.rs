use mapenso::{
    expression::{Expr, FunctionKind, TensorHead},
    mapping::{
        all, bijective_product_port, exists, first, port, positive_exists, IndexMappingBuffer,
        IndexMappings,
    },
    settings::MappingSettings,
    structure::parse_indices,
};

mod common;
use common::{init, product, sum, t, HEADS};

fn reflexive(expr: &Expr) {
    assert!(positive_exists(expr, expr), "{expr} does not map onto itself");
}

#[test]
fn every_tree_maps_onto_itself() {
    init();
    let h = &*HEADS;
    let scalar = product([t(&h.b, "_m"), t(&h.b, "^m")]);
    let trees = [
        t(&h.a, "_mn"),
        t(&h.g, "^a_bc"),
        product([t(&h.a, "_mn"), t(&h.b, "^n")]),
        sum([t(&h.c, "_mn"), t(&h.d, "_nm")]),
        Expr::pow(scalar.clone(), Expr::rational(1, 2)).unwrap(),
        Expr::function(FunctionKind::ArcTan, scalar.clone()).unwrap(),
        Expr::function(FunctionKind::Cot, scalar.clone()).unwrap(),
        h.a.field("_mn", [scalar.clone()]).unwrap(),
        Expr::integer(-3),
        t(&h.a, "_mn").neg(),
    ];
    for tree in &trees {
        reflexive(tree);
    }
}

#[test]
fn collapsing_onto_a_contraction() {
    init();
    let h = &*HEADS;
    let from = t(&h.a, "_m^n");
    let to = t(&h.a, "_a^a");
    let mapping = first(&from, &to).unwrap();
    let [m, n, a] = [parse_indices("_m"), parse_indices("_n"), parse_indices("_a")]
        .map(|i| i.unwrap()[0].id);
    assert_eq!(mapping.get(m).unwrap().to(), a);
    assert_eq!(mapping.get(n).unwrap().to(), a);
    assert!(!mapping.sign());
    assert_eq!(mapping.apply(&from).unwrap(), to);
}

#[test]
fn antisymmetric_exchange_flips_the_sign() {
    init();
    let h = &*HEADS;
    let from = t(&h.g, "^a_bc");
    let to = t(&h.g, "^a_cb");
    let found = all(&from, &to);
    assert_eq!(found.len(), 2);
    let b = parse_indices("_b").unwrap()[0].id;
    for mapping in &found {
        if mapping.get(b).unwrap().to() == b {
            assert!(mapping.sign(), "{mapping}");
        } else {
            assert!(!mapping.sign(), "{mapping}");
        }
    }
}

#[test]
fn sums_commute() {
    init();
    let h = &*HEADS;
    let from = sum([t(&h.c, "_mn"), t(&h.d, "_nm")]);
    let to = sum([t(&h.c, "_cd"), t(&h.d, "_dc")]);
    let mapping = first(&from, &to).unwrap();
    assert_eq!(mapping.to_string(), "{m→c, n→d}");

    let mismatched = sum([t(&h.c, "_cd"), t(&h.d, "_cd")]);
    assert!(!exists(&from, &mismatched));

    let swapped = sum([t(&h.d, "_dc"), t(&h.c, "_cd")]);
    assert_eq!(to, swapped);
}

#[test]
fn product_factors_are_matched_in_any_order() {
    init();
    let h = &*HEADS;
    let from = product([t(&h.vector, "_a"), t(&h.b, "_b")]);
    let to = product([t(&h.b, "_y"), t(&h.vector, "_x")]);
    let found = all(&from, &to);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].to_string(), "{a→x, b→y}");

    let factors_from = [t(&h.vector, "_a"), t(&h.b, "_b")];
    let factors_to = [t(&h.vector, "_x"), t(&h.b, "_y")];
    let bijective: Vec<_> = bijective_product_port(&factors_from, &factors_to).collect();
    assert_eq!(bijective, found.into_iter().collect::<Vec<_>>());
}

#[test]
fn contracted_records_are_stripped_once() {
    init();
    let h = &*HEADS;
    let from = product([t(&h.a, "_mn"), t(&h.b, "^n")]);
    let to = product([t(&h.a, "_cd"), t(&h.b, "^d")]);
    let raw_seed = IndexMappingBuffer::new(MappingSettings::default());
    for mapping in IndexMappings::default().port_with(raw_seed, &from, &to) {
        let mut twice = mapping.clone();
        twice.remove_contracted();
        assert_eq!(twice, mapping);
        assert_eq!(mapping.len(), 1);
    }
}

#[test]
fn unequal_hashes_give_nothing() {
    init();
    let h = &*HEADS;
    let from = t(&h.c, "_mn");
    let to = t(&h.d, "_mn");
    assert_ne!(from.structural_hash(), to.structural_hash());
    assert_eq!(port(&from, &to).count(), 0);
    assert_eq!(port(&from, &Expr::integer(1)).count(), 0);
}

#[test]
fn symmetric_slots_double_the_mappings() {
    init();
    let plain = TensorHead::new("A", 2);
    let found = all(&t(&plain, "_mn"), &t(&plain, "_cd"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].to_string(), "{m→c, n→d}");

    let symmetric = TensorHead::new("A", 2).with_symmetry(vec![1, 0], false).unwrap();
    let found = all(&t(&symmetric, "_mn"), &t(&symmetric, "_cd"));
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|m| !m.sign()));

    let antisymmetric = TensorHead::new("A", 2).with_symmetry(vec![1, 0], true).unwrap();
    let signs: Vec<_> = all(&t(&antisymmetric, "_mn"), &t(&antisymmetric, "_cd"))
        .iter()
        .map(|m| m.sign())
        .collect();
    assert_eq!(signs, vec![false, true]);
}

#[test]
fn metric_indices_can_be_raised() {
    init();
    let h = &*HEADS;
    let from = t(&h.metric, "_mn");
    let to = t(&h.metric, "^ab");
    assert!(exists(&from, &to));
    let strict = IndexMappings::new(MappingSettings::strict());
    assert!(!strict.exists(&from, &to));

    let settings = MappingSettings::from_json(r#"{"metric_types": []}"#).unwrap();
    assert!(!IndexMappings::new(settings).exists(&from, &to));
}
