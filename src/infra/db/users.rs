use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::pagination::{NormalizedFilter, Page, Pagination};
use crate::application::repos::{
    CreateUserParams, RepoError, UpdateUserParams, UserFilter, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::UserRecord;
use crate::query::{QueryParams, SqlValue};

use super::PostgresRepositories;
use super::util::{bind_query, bind_query_as, bind_query_scalar, map_sqlx_error};

const FIND_USER_BY_ID: &str = "FindUserByID";
const FIND_ALL_USERS: &str = "FindAllUsersBase";
const COUNT_USERS: &str = "CountUsersBase";
const CREATE_USER: &str = "CreateUser";
const UPDATE_USER: &str = "UpdateUser";
const DELETE_USER: &str = "DeleteUser";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    age: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            age: row.age,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Listing parameters under both spellings used by the templates: PascalCase for
/// directives and snake_case for placeholders.
fn list_params(filter: &NormalizedFilter) -> QueryParams {
    let mut params = QueryParams::new();
    for (pascal, snake, value) in [
        ("Name", "name", SqlValue::from(filter.name.clone())),
        ("Email", "email", SqlValue::from(filter.email.clone())),
        ("MinAge", "min_age", SqlValue::from(filter.min_age)),
        ("MaxAge", "max_age", SqlValue::from(filter.max_age)),
        ("SortBy", "sort_by", SqlValue::ident(filter.sort_by)),
        ("SortDir", "sort_dir", SqlValue::ident(filter.sort_dir.as_sql())),
    ] {
        params.insert(pascal, value.clone());
        params.insert(snake, value);
    }
    params.insert("limit", filter.limit());
    params.insert("offset", filter.offset());
    params
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, RepoError> {
        let statement = self
            .binder()
            .render(FIND_USER_BY_ID, &QueryParams::new().with("id", id))?;

        let row = bind_query_as(
            sqlx::query_as::<_, UserRow>(&statement.sql),
            &statement.args,
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_all(&self, filter: &UserFilter) -> Result<Page<UserRecord>, RepoError> {
        let normalized = NormalizedFilter::from(filter);
        let params = list_params(&normalized);

        let count = self.binder().render(COUNT_USERS, &params)?;
        let total: i64 = bind_query_scalar(sqlx::query_scalar(&count.sql), &count.args)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let select = self.binder().render(FIND_ALL_USERS, &params)?;
        let rows = bind_query_as(sqlx::query_as::<_, UserRow>(&select.sql), &select.args)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let items: Vec<UserRecord> = rows.into_iter().map(Into::into).collect();
        let pagination = Pagination::new(&normalized, items.len(), total);
        Ok(Page::new(items, pagination))
    }
}

#[async_trait]
impl UsersWriteRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let statement = self.binder().render(
            CREATE_USER,
            &QueryParams::new()
                .with("name", params.name)
                .with("email", params.email)
                .with("age", params.age),
        )?;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let inserted = bind_query_as(
            sqlx::query_as::<_, UserRow>(&statement.sql),
            &statement.args,
        )
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(
                        target = "roster::infra::db::users",
                        error = %rollback,
                        "Failed to roll back user insert"
                    );
                }
                return Err(map_sqlx_error(err));
            }
        };

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<(), RepoError> {
        let statement = self.binder().render(
            UPDATE_USER,
            &QueryParams::new()
                .with("id", params.id)
                .with("name", params.name)
                .with("email", params.email)
                .with("age", params.age)
                .with("updated_at", OffsetDateTime::now_utc()),
        )?;

        let result = bind_query(sqlx::query(&statement.sql), &statement.args)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        let statement = self
            .binder()
            .render(DELETE_USER, &QueryParams::new().with("id", id))?;

        let result = bind_query(sqlx::query(&statement.sql), &statement.args)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryBinder, TemplateStore};

    fn binder() -> QueryBinder {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/queries/user_queries.sql");
        QueryBinder::new(TemplateStore::load(path).expect("bundled templates"))
    }

    #[test]
    fn unfiltered_listing_binds_only_paging() {
        let normalized = NormalizedFilter::from(&UserFilter::default());
        let bound = binder()
            .render(FIND_ALL_USERS, &list_params(&normalized))
            .expect("render");

        assert!(bound.sql.contains("ORDER BY name ASC, id ASC"));
        assert!(bound.sql.contains("LIMIT $1 OFFSET $2"));
        assert!(!bound.sql.contains("ILIKE"));
        assert_eq!(bound.args, vec![SqlValue::BigInt(10), SqlValue::BigInt(0)]);
    }

    #[test]
    fn filtered_listing_and_count_share_bindings() {
        let filter = UserFilter {
            name: Some("ann".into()),
            min_age: Some(18),
            page: 2,
            page_size: 5,
            sort_by: Some("age".into()),
            sort_dir: Some("desc".into()),
            ..Default::default()
        };
        let params = list_params(&NormalizedFilter::from(&filter));

        let select = binder().render(FIND_ALL_USERS, &params).expect("render");
        assert!(select.sql.contains("name ILIKE '%' || $1 || '%'"));
        assert!(select.sql.contains("age >= $2"));
        assert!(select.sql.contains("ORDER BY age DESC"));
        assert_eq!(
            select.args,
            vec![
                SqlValue::Text("ann".into()),
                SqlValue::Int(18),
                SqlValue::BigInt(5),
                SqlValue::BigInt(5),
            ]
        );

        let count = binder().render(COUNT_USERS, &params).expect("render");
        assert!(count.sql.starts_with("SELECT COUNT(*)"));
        assert_eq!(
            count.args,
            vec![SqlValue::Text("ann".into()), SqlValue::Int(18)]
        );
    }

    #[test]
    fn update_binds_every_column() {
        let id = Uuid::new_v4();
        let bound = binder()
            .render(
                UPDATE_USER,
                &QueryParams::new()
                    .with("id", id)
                    .with("name", "Ann")
                    .with("email", "ann@example.com")
                    .with("age", 30)
                    .with("updated_at", OffsetDateTime::UNIX_EPOCH),
            )
            .expect("render");

        assert!(bound.sql.ends_with("WHERE id = $5"));
        assert_eq!(bound.args.len(), 5);
        assert_eq!(bound.args[4], SqlValue::Uuid(id));
    }
}
