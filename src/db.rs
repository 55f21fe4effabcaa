use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::ReviewError;
use crate::review::{Review, ReviewDraft};

pub mod mock;

/// The name of the collection reviews are stored in.
pub const COLLECTION: &str = "reviews";

/// The largest page `list_approved` ever returns.
pub const MAX_PAGE_SIZE: usize = 50;

/// The only way the rest of the crate talks to the review store.
pub trait Repository {
    /// Stores a new approved review and returns its ID. The draft is
    /// normalized first and the creation time comes from the store.
    fn insert(&self, draft: ReviewDraft) -> BoxFuture<Result<Uuid, ReviewError>>;

    /// Counts the reviews stored under the normalized form of `email`.
    fn count_by_email(&self, email: &str) -> BoxFuture<Result<i64, ReviewError>>;

    /// Returns approved reviews, newest first, at most
    /// `min(limit, MAX_PAGE_SIZE)` of them.
    fn list_approved(&self, limit: usize) -> BoxFuture<Result<Vec<Review>, ReviewError>>;

    /// Checks that the store can be reached.
    fn ping(&self) -> BoxFuture<Result<(), ReviewError>>;
}

/// Caps a requested page size at [`MAX_PAGE_SIZE`].
pub fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_PAGE_SIZE)
}

pub use self::postgres::*;

mod postgres {
    use std::convert::TryFrom;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::clamp_limit;
    use crate::errors::{ReviewError, StoreError};
    use crate::normalization::normalize_email;
    use crate::review::{Rating, Review, ReviewDraft};

    pub struct PgRepository {
        pool: PgPool,
    }

    impl PgRepository {
        pub fn new(pool: PgPool) -> Self {
            PgRepository { pool }
        }

        pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
            let pool = PgPool::connect(connection_string)
                .await
                .map_err(map_sqlx_error)?;

            Ok(PgRepository::new(pool))
        }

        /// Creates the `reviews` table and its indexes if they are missing.
        pub async fn initialize(&self) -> Result<(), StoreError> {
            use sqlx::Executor;

            self.pool
                .execute(include_str!("queries/create_schema.sql"))
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Repository for PgRepository {
        fn insert(&self, draft: ReviewDraft) -> BoxFuture<Result<Uuid, ReviewError>> {
            let draft = draft.normalized();

            async move {
                let query = sqlx::query_as(include_str!("queries/insert.sql"));

                let (id,): (Uuid,) = query
                    .bind(&draft.name)
                    .bind(&draft.email)
                    .bind(i16::from(draft.rating))
                    .bind(&draft.comment)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| ReviewError::write(map_sqlx_error(e)))?;

                Ok(id)
            }
            .boxed()
        }

        fn count_by_email(&self, email: &str) -> BoxFuture<Result<i64, ReviewError>> {
            let email = normalize_email(email);

            async move {
                let query = sqlx::query_as::<_, (i64,)>(include_str!("queries/count_by_email.sql"));

                let (count,) = query
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| ReviewError::read(map_sqlx_error(e)))?;

                Ok(count)
            }
            .boxed()
        }

        fn list_approved(&self, limit: usize) -> BoxFuture<Result<Vec<Review>, ReviewError>> {
            // the page size is capped well below i64::MAX
            let limit = clamp_limit(limit) as i64;

            async move {
                let query = sqlx::query(include_str!("queries/list_approved.sql"));

                let reviews = query
                    .bind(limit)
                    .try_map(|row: PgRow| review_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| ReviewError::read(map_sqlx_error(e)))?;

                Ok(reviews)
            }
            .boxed()
        }

        fn ping(&self) -> BoxFuture<Result<(), ReviewError>> {
            async move {
                let query = sqlx::query(include_str!("queries/ping.sql"));

                query
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| ReviewError::read(map_sqlx_error(e)))?;

                Ok(())
            }
            .boxed()
        }
    }

    fn review_from_row(row: &PgRow) -> Result<Review, sqlx::Error> {
        let id: Uuid = try_get(row, "id")?;
        let stars: i16 = try_get(row, "rating")?;
        let rating = Rating::try_from(stars).map_err(|e| {
            // the schema forbids this, but rows may predate the constraint
            sqlx::Error::Decode(Box::new(StoreError::CorruptDocument {
                id: id.to_string(),
                reason: e.to_string(),
            }))
        })?;

        let draft = ReviewDraft {
            name: try_get(row, "name")?,
            email: try_get(row, "email")?,
            rating,
            comment: try_get(row, "comment")?,
        };
        let created_at: OffsetDateTime = try_get(row, "created_at")?;
        let approved: bool = try_get(row, "approved")?;

        Ok(Review::new(id, created_at, draft, approved))
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> StoreError {
        use sqlx::Error;

        match error {
            Error::PoolTimedOut | Error::PoolClosed => StoreError::Unreachable,
            _ => StoreError::Sqlx { source: error },
        }
    }
}
