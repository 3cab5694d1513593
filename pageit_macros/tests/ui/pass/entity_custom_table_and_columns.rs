use pageit_core::{Fetchable, Insertable, ParamValue, Updatable};
use pageit_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "people")]
struct Person {
    #[fetch(id)]
    id: i64,
    #[fetch(column = "email_address")]
    email: String,
    #[fetch(column = "full_name")]
    name: String,
}

fn main() {
    assert_eq!(Person::TABLE, "people");
    assert_eq!(Person::SELECT_COLUMNS, &["id", "email_address", "full_name"]);
    assert_eq!(Person::INSERT_COLUMNS, &["email_address", "full_name"]);
    let p = Person {
        id: 9,
        email: "a@b".into(),
        name: "Ann".into(),
    };
    assert_eq!(
        p.update_values(),
        vec![
            ParamValue::from("a@b"),
            ParamValue::from("Ann"),
            ParamValue::I64(9)
        ]
    );
    let _adapter = PersonRowAdapter;
}
