use pageit_core::{Fetchable, Identifiable, Insertable, ParamValue};
use pageit_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Article {
    #[fetch(id)]
    id: Option<i64>,
    title: String,
    subtitle: Option<String>,
    score: Option<f64>,
}

fn main() {
    assert_eq!(Article::TABLE, "articles");
    assert_eq!(Article::SELECT_COLUMNS, &["id", "title", "subtitle", "score"]);
    let a = Article {
        id: None,
        title: "t".into(),
        subtitle: None,
        score: Some(1.5),
    };
    let id: Option<<Article as Identifiable>::Key> = a.id();
    assert_eq!(id, None);
    assert_eq!(
        a.insert_values(),
        vec![ParamValue::from("t"), ParamValue::Null, ParamValue::F64(1.5)]
    );
    assert_eq!(a.select_values()[0], ParamValue::Null);
}
