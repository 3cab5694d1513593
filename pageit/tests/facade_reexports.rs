#![allow(unexpected_cfgs)]
use pageit::*;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Mini {
    #[fetch(id)]
    id: Option<i64>,
    #[fetch(column = "email_address")]
    email: String,
    rank: i32,
}

#[test]
fn facade_reexports_and_entity_metadata() {
    assert_eq!(Mini::TABLE, "minis");
    assert_eq!(Mini::SELECT_COLUMNS, &["id", "email_address", "rank"]);
    let _adapter = MiniRowAdapter;

    // Query vocabulary resolves through the facade and validates against the entity.
    let p = Predicate::all().eq("email_address", "a@x").ge("rank", 2);
    assert!(ensure_columns::<Mini, _>(p.columns()).is_ok());
    assert!(matches!(
        ensure_columns::<Mini, _>(Predicate::all().eq("email", "a@x").columns()),
        Err(RepoError::UnknownColumn { .. })
    ));

    let spec = PageSpec::of_page(2, 5, Some(Sort::parse("rank,desc").unwrap())).unwrap();
    assert_eq!(spec.offset(), 10);
    assert_eq!(spec.sort().map(Sort::direction), Some(Direction::Desc));
    assert_eq!(PageSpec::first(0), Err(PageSpecError::ZeroLimit));
}
