#![allow(unexpected_cfgs)]

use pageit_core::{Mutation, ParamValue, Predicate, Sort};
use pageit_macros::Entity;
use proptest::prelude::*;

#[derive(Entity)]
#[allow(dead_code)]
#[entity(table = "people_props")]
struct PersonP {
    #[fetch(id)]
    id: i64,
    #[fetch(column = "full_name")]
    name: String,
    age: i32,
}

fn arb_predicate() -> impl Strategy<Value = Predicate> {
    let cond = prop_oneof![
        (any::<i32>()).prop_map(|v| Predicate::all().gt("age", v)),
        ("[a-z]{0,6}").prop_map(|s| Predicate::all().eq("full_name", s)),
        (prop::collection::vec(any::<i64>(), 0..5)).prop_map(|ids| Predicate::all().is_in("id", ids)),
        Just(Predicate::all().is_not_null("full_name")),
    ];
    prop::collection::vec(cond, 0..6)
        .prop_map(|parts| parts.into_iter().fold(Predicate::all(), Predicate::and))
}

proptest! {
    // Every bound param has exactly one placeholder.
    #[test]
    fn page_query_placeholder_count(p in arb_predicate(), limit in 1u64..100, offset in 0u64..1000) {
        let (sql, params) = pageit_sql_builder::select_page::<PersonP>(
            &p,
            Some(&Sort::desc("age")),
            "id",
            limit,
            offset,
        );
        prop_assert_eq!(sql.matches('?').count(), params.len());
        let limit_clause = format!("LIMIT {} OFFSET {}", limit, offset);
        prop_assert!(sql.ends_with(&limit_clause));

        let (count_sql, count_params) = pageit_sql_builder::count_where::<PersonP>(&p);
        prop_assert_eq!(count_sql.matches('?').count(), count_params.len());
        prop_assert_eq!(count_params, params);
    }

    #[test]
    fn bulk_update_placeholder_count(p in arb_predicate(), delta in any::<i32>()) {
        let m = Mutation::new().increment("age", delta).set("full_name", ParamValue::Null);
        let (sql, params) = pageit_sql_builder::update_where::<PersonP>(&p, &m);
        prop_assert_eq!(sql.matches('?').count(), params.len());
        prop_assert_eq!(&params[0], &ParamValue::I32(delta));
    }
}
