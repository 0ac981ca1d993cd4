use sqlx::{
    Postgres,
    postgres::PgArguments,
    query::{Query, QueryAs, QueryScalar},
};

use crate::application::repos::RepoError;
use crate::query::SqlValue;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("invalid input syntax")
                || db.message().contains("out of range") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        match $value {
            SqlValue::Null => $query.bind(Option::<String>::None),
            SqlValue::Bool(value) => $query.bind(*value),
            SqlValue::Int(value) => $query.bind(*value),
            SqlValue::BigInt(value) => $query.bind(*value),
            SqlValue::Text(value) | SqlValue::Ident(value) => $query.bind(value.clone()),
            SqlValue::Uuid(value) => $query.bind(*value),
            SqlValue::Timestamp(value) => $query.bind(*value),
        }
    };
}

pub(crate) fn bind_query<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in args {
        query = bind_value!(query, value);
    }
    query
}

pub(crate) fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    args: &[SqlValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in args {
        query = bind_value!(query, value);
    }
    query
}

pub(crate) fn bind_query_scalar<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    args: &[SqlValue],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for value in args {
        query = bind_value!(query, value);
    }
    query
}
