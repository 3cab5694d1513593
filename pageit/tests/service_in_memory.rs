use pageit::{Page, PageSpec, PagedQueryService, Predicate, Projection, Repository, Sort};
use tests_common::{in_memory_members, member, Member};

#[derive(Debug, PartialEq)]
struct Name(String);

impl Projection<Member> for Name {
    fn project(entity: &Member) -> Self {
        Name(entity.username.clone())
    }
}

#[tokio::test]
async fn offset_past_the_end_reports_true_total() {
    let service = PagedQueryService::new(in_memory_members());
    for i in 0..7 {
        service
            .repository()
            .insert(&member(&format!("u{}", i), i))
            .await
            .unwrap();
    }

    let spec = PageSpec::new(100, 3, None).unwrap();
    let page = service.find_page(&Predicate::all(), &spec).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total_elements(), 7);
    assert_eq!(page.total_pages(), 3);
    assert!(!page.has_next());
    assert!(page.has_previous());
}

#[tokio::test]
async fn limit_larger_than_remainder_gives_partial_last_page() {
    let service = PagedQueryService::new(in_memory_members());
    for i in 0..5 {
        service
            .repository()
            .insert(&member(&format!("u{}", i), 40 + i))
            .await
            .unwrap();
    }
    let spec = PageSpec::new(4, 10, Some(Sort::asc("age"))).unwrap();
    let page = service
        .find_page(&Predicate::all().ge("age", 40), &spec)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items()[0].age, 44);
    assert!(page.is_last());
}

#[tokio::test]
async fn projected_pages_hide_the_entity() {
    let service = PagedQueryService::new(in_memory_members());
    for name in ["carol", "alice", "bob"] {
        service.repository().insert(&member(name, 30)).await.unwrap();
    }
    let spec = PageSpec::first(2).unwrap().with_sort(Sort::asc("username"));
    let page: Page<Name> = service
        .find_page_projected(&Predicate::all(), &spec)
        .await
        .unwrap();
    assert_eq!(page.items(), &[Name("alice".into()), Name("bob".into())]);
    assert_eq!(page.total_elements(), 3);

    let one: Name =
        PagedQueryService::<Member, ()>::to_projection(&member("dave", 1));
    assert_eq!(one, Name("dave".into()));
}
