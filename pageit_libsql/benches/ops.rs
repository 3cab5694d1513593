// Criterion benches for paged reads and bulk updates using libsql (SQLite) on a temp file.
// Run locally with:
//   cargo bench -p pageit_libsql --features libsql-backend --bench ops

#![allow(unexpected_cfgs)]

#[cfg(feature = "libsql-backend")]
mod bench_impl {
    use criterion::{black_box, Criterion};
    use pageit::{PageSpec, PagedQueryService, Predicate, Sort};
    use pageit_core::Repository;
    use pageit_libsql::LibsqlRepository;
    use tests_common::{member, migrations, Member, MemberRowAdapter};

    type Repo = LibsqlRepository<Member, MemberRowAdapter>;

    fn setup(rows: usize) -> (tempfile::TempDir, tokio::runtime::Runtime, Repo) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bench.sqlite3");
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let repo = rt.block_on(async {
            let db = pageit_libsql::open_database(&path.display().to_string()).expect("open db");
            pageit_libsql::apply_schema(&db, migrations::LIBSQL_MEMBERS_SQL)
                .await
                .expect("apply schema");
            let repo = LibsqlRepository::new(db, MemberRowAdapter);
            for i in 0..rows {
                repo.insert(&member(&format!("member{}", i), (i % 100) as i32))
                    .await
                    .expect("seed");
            }
            repo
        });
        (dir, rt, repo)
    }

    pub fn bench_paging(c: &mut Criterion) {
        let (_dir, rt, repo) = setup(1_000);
        let service = PagedQueryService::new(repo);
        let mut group = c.benchmark_group("libsql_paging");

        for offset in [0u64, 500, 990] {
            let spec = PageSpec::new(offset, 10, Some(Sort::desc("username"))).expect("spec");
            group.bench_function(format!("page_offset_{offset}"), |b| {
                b.iter(|| {
                    let page = rt
                        .block_on(service.find_page(&Predicate::all(), &spec))
                        .expect("page");
                    black_box(page);
                })
            });
        }

        let filtered = PageSpec::first(20).expect("spec");
        group.bench_function("page_filtered_range", |b| {
            b.iter(|| {
                let page = rt
                    .block_on(service.find_page(&Predicate::all().ge("age", 50).lt("age", 60), &filtered))
                    .expect("page");
                black_box(page);
            })
        });
        group.finish();
    }

    pub fn bench_bulk_update(c: &mut Criterion) {
        let (_dir, rt, repo) = setup(1_000);
        let service = PagedQueryService::new(repo);
        let mut group = c.benchmark_group("libsql_bulk_update");
        group.bench_function("age_plus_one_above_90", |b| {
            b.iter(|| {
                // Rows only grow past the threshold, so the affected set is stable.
                let n = rt
                    .block_on(service.bulk_update_numeric_attribute("age", 90, 1))
                    .expect("update");
                black_box(n);
            })
        });
        group.finish();
    }
}

// Define the Criterion entry points at the crate root so `main` exists at crate level.
#[cfg(feature = "libsql-backend")]
use bench_impl::{bench_bulk_update, bench_paging};
#[cfg(feature = "libsql-backend")]
criterion::criterion_group!(benches, bench_paging, bench_bulk_update);
#[cfg(feature = "libsql-backend")]
criterion::criterion_main!(benches);

// Fallback when feature is not enabled: provide a dummy main so the bench binary compiles.
#[cfg(not(feature = "libsql-backend"))]
fn main() {
    eprintln!("Enable feature libsql-backend to run benches.");
}
