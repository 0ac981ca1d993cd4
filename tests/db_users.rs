use sqlx::PgPool;
use uuid::Uuid;

use roster::application::repos::{
    CreateUserParams, RepoError, UpdateUserParams, UserFilter, UsersRepo, UsersWriteRepo,
};
use roster::domain::entities::UserRecord;
use roster::infra::db::PostgresRepositories;
use roster::query::{QueryBinder, TemplateStore};

fn repositories(pool: PgPool) -> PostgresRepositories {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/queries/user_queries.sql");
    let templates = TemplateStore::load(path).expect("bundled templates");
    PostgresRepositories::new(pool, QueryBinder::new(templates))
}

async fn create(repos: &PostgresRepositories, name: &str, age: i32) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            age,
        })
        .await
        .expect("create user")
}

async fn row_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .expect("count users")
}

#[sqlx::test(migrations = "./migrations")]
async fn create_returns_server_assigned_fields(pool: PgPool) {
    let repos = repositories(pool);

    let ann = create(&repos, "Ann", 31).await;
    assert_ne!(ann.id, Uuid::nil());
    assert_eq!(ann.created_at, ann.updated_at);

    let found = repos.find_by_id(ann.id).await.expect("find");
    assert_eq!(found, ann);
}

#[sqlx::test(migrations = "./migrations")]
async fn missing_user_is_not_found(pool: PgPool) {
    let repos = repositories(pool);

    assert!(matches!(
        repos.find_by_id(Uuid::new_v4()).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_rolls_back_the_insert(pool: PgPool) {
    let repos = repositories(pool.clone());
    create(&repos, "Ann", 31).await;

    let err = repos
        .create_user(CreateUserParams {
            name: "Another Ann".into(),
            email: "ann@example.com".into(),
            age: 40,
        })
        .await
        .expect_err("email is unique");

    assert!(
        matches!(err, RepoError::Duplicate { ref constraint } if constraint == "users_email_key"),
        "unexpected error: {err:?}"
    );
    assert_eq!(row_count(&pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn out_of_range_age_is_an_integrity_error(pool: PgPool) {
    let repos = repositories(pool.clone());

    let err = repos
        .create_user(CreateUserParams {
            name: "Ann".into(),
            email: "ann@example.com".into(),
            age: 0,
        })
        .await
        .expect_err("age check");

    assert!(
        matches!(err, RepoError::Integrity { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(row_count(&pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_and_delete_report_missing_rows(pool: PgPool) {
    let repos = repositories(pool);
    let ann = create(&repos, "Ann", 31).await;

    repos
        .update_user(UpdateUserParams {
            id: ann.id,
            name: "Annabel".into(),
            email: ann.email.clone(),
            age: 32,
        })
        .await
        .expect("update");
    let updated = repos.find_by_id(ann.id).await.expect("find");
    assert_eq!(updated.name, "Annabel");
    assert_eq!(updated.age, 32);

    let missing = Uuid::new_v4();
    assert!(matches!(
        repos
            .update_user(UpdateUserParams {
                id: missing,
                name: "Nobody".into(),
                email: "nobody@example.com".into(),
                age: 20,
            })
            .await,
        Err(RepoError::NotFound)
    ));
    assert!(matches!(
        repos.delete_user(missing).await,
        Err(RepoError::NotFound)
    ));

    repos.delete_user(ann.id).await.expect("delete");
    assert!(matches!(
        repos.delete_user(ann.id).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn zero_paging_is_normalized_before_querying(pool: PgPool) {
    let repos = repositories(pool);
    for index in 0..12 {
        create(&repos, &format!("User{index:02}"), 20 + index).await;
    }

    let page = repos
        .find_all(&UserFilter {
            page: 0,
            page_size: 0,
            ..Default::default()
        })
        .await
        .expect("list");

    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].name, "User00");
    assert_eq!(page.pagination.current_page, 1);
    assert_eq!(page.pagination.page_size, 10);
    assert_eq!(page.pagination.total_elements, 12);
    assert_eq!(page.pagination.total_pages, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn filters_sorting_and_offsets_reach_the_database(pool: PgPool) {
    let repos = repositories(pool);
    for (name, age) in [("Ann", 31), ("Annika", 45), ("Bob", 42), ("Joanna", 19)] {
        create(&repos, name, age).await;
    }

    let filter = UserFilter {
        name: Some("ANN".into()),
        min_age: Some(20),
        page: 2,
        page_size: 1,
        sort_by: Some("age".into()),
        sort_dir: Some("desc".into()),
        ..Default::default()
    };
    let page = repos.find_all(&filter).await.expect("list");

    assert_eq!(page.pagination.total_elements, 2);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.pagination.sort_dir, "DESC");
    let names: Vec<&str> = page.items.iter().map(|user| user.name.as_str()).collect();
    assert_eq!(names, vec!["Ann"]);

    let empty = repos
        .find_all(&UserFilter {
            email: Some("nobody".into()),
            ..Default::default()
        })
        .await
        .expect("list");
    assert!(empty.items.is_empty());
    assert_eq!(empty.pagination.total_pages, 1);
}
