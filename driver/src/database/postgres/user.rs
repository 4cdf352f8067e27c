use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use kernel::interface::query::UserQuery;
use kernel::interface::update::UserModifier;
use kernel::prelude::entity::{
    DocumentVersion, Hostel, RideId, User, UserEmail, UserId, UserName, UserRole,
};
use kernel::KernelError;

use crate::database::feed::ChangeSignal;
use crate::database::postgres::Commit;
use crate::error::{ConvertError, DriverError};

pub struct PostgresUserRepository {
    changes: ChangeSignal,
}

impl PostgresUserRepository {
    pub(in crate::database) fn new(changes: ChangeSignal) -> Self {
        Self { changes }
    }
}

#[async_trait::async_trait]
impl UserQuery<PoolConnection<Postgres>> for PostgresUserRepository {
    async fn find_by_id(
        &self,
        con: &mut PoolConnection<Postgres>,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        PgUserInternal::find_by_id(con, id).await.convert_error()
    }
}

#[async_trait::async_trait]
impl UserModifier<PoolConnection<Postgres>> for PostgresUserRepository {
    async fn create(
        &self,
        con: &mut PoolConnection<Postgres>,
        user: &User,
    ) -> error_stack::Result<(), KernelError> {
        PgUserInternal::create(con, user).await.convert_error()?;
        self.changes.mark();
        Ok(())
    }

    async fn update(
        &self,
        con: &mut PoolConnection<Postgres>,
        user: &User,
    ) -> error_stack::Result<(), KernelError> {
        match PgUserInternal::update(con, user).await.convert_error()? {
            Commit::Applied => {
                self.changes.mark();
                Ok(())
            }
            outcome => outcome.into_result(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    hostel: Option<String>,
    joined_ride: Option<Uuid>,
    version: i64,
}

impl TryFrom<UserRow> for User {
    type Error = DriverError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|()| DriverError::Conversion(anyhow::anyhow!("unknown user role")))?;
        Ok(User::new(
            UserId::new(row.id),
            UserName::new(row.name),
            UserEmail::new(row.email),
            role,
            row.hostel.map(Hostel::new),
            row.joined_ride.map(RideId::new),
            DocumentVersion::new(row.version),
        ))
    }
}

pub(in crate::database) struct PgUserInternal;

impl PgUserInternal {
    async fn find_by_id(con: &mut PgConnection, id: &UserId) -> Result<Option<User>, DriverError> {
        let row = sqlx::query_as::<_, UserRow>(
            // language=postgresql
            r#"
            SELECT id, name, email, role, hostel, joined_ride, version
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await?;
        row.map(User::try_from).transpose()
    }

    pub(in crate::database) async fn fetch(
        pool: &Pool<Postgres>,
        id: &UserId,
    ) -> Result<Option<User>, DriverError> {
        let mut con = pool.acquire().await?;
        Self::find_by_id(&mut con, id).await
    }

    async fn create(con: &mut PgConnection, user: &User) -> Result<(), DriverError> {
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, hostel, joined_ride, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id().as_ref())
        .bind(user.name().as_ref())
        .bind(user.email().as_ref())
        .bind(user.role().to_string())
        .bind(user.hostel().as_ref().map(|hostel| hostel.as_ref().clone()))
        .bind(user.joined_ride().as_ref().map(|ride| *ride.as_ref()))
        .bind(user.version().as_ref())
        .execute(con)
        .await?;
        Ok(())
    }

    /// Same conditional-write contract as the ride table.
    async fn update(con: &mut PgConnection, user: &User) -> Result<Commit, DriverError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE users
            SET name = $2, email = $3, role = $4, hostel = $5, joined_ride = $6,
                version = version + 1
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(user.id().as_ref())
        .bind(user.name().as_ref())
        .bind(user.email().as_ref())
        .bind(user.role().to_string())
        .bind(user.hostel().as_ref().map(|hostel| hostel.as_ref().clone()))
        .bind(user.joined_ride().as_ref().map(|ride| *ride.as_ref()))
        .bind(user.version().as_ref())
        .execute(&mut *con)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(Commit::Applied);
        }

        let exists = sqlx::query_scalar::<_, i64>(
            // language=postgresql
            r#"
            SELECT version FROM users WHERE id = $1
            "#,
        )
        .bind(user.id().as_ref())
        .fetch_optional(&mut *con)
        .await?;
        Ok(match exists {
            Some(_) => Commit::Stale,
            None => Commit::Missing,
        })
    }
}
