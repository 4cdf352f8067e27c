use error_stack::Report;
use sqlx::pool::PoolConnection;
use sqlx::{Error, Pool, Postgres};

use kernel::interface::feed::{RideFeed, RideScope, RideSnapshots, UserFeed, UserSnapshots};
use kernel::interface::query::{DependOnRideQuery, DependOnUserQuery};
use kernel::interface::store::RecordStore;
use kernel::interface::update::{DependOnRideModifier, DependOnUserModifier};
use kernel::prelude::entity::UserId;
use kernel::KernelError;

use crate::database::feed::{snapshots, ChangeSignal};
use crate::env;
use crate::error::ConvertError;

pub use self::{ride::*, user::*};

mod ride;
mod user;

static POSTGRES_URL: &str = "POSTGRES_URL";

/// PostgreSQL-backed record store.
///
/// Documents live in one row each; every update is conditional on the row
/// version and bumps it in the same statement, which is what makes the
/// kernel's read-validate-commit loops safe against concurrent writers.
/// Committed writes mark a local change signal that fans out to the feeds.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    changes: ChangeSignal,
    ride_repository: PostgresRideRepository,
    user_repository: PostgresUserRepository,
}

impl PostgresStore {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        let url = env(POSTGRES_URL).convert_error()?;
        let pool = Pool::connect(&url).await.convert_error()?;
        let changes = ChangeSignal::new();
        Ok(Self {
            pool,
            ride_repository: PostgresRideRepository::new(changes.clone()),
            user_repository: PostgresUserRepository::new(changes.clone()),
            changes,
        })
    }
}

#[async_trait::async_trait]
impl RecordStore<PoolConnection<Postgres>> for PostgresStore {
    async fn open(&self) -> error_stack::Result<PoolConnection<Postgres>, KernelError> {
        let con = self.pool.acquire().await.convert_error()?;
        Ok(con)
    }
}

impl DependOnRideQuery<PoolConnection<Postgres>> for PostgresStore {
    type RideQuery = PostgresRideRepository;
    fn ride_query(&self) -> &PostgresRideRepository {
        &self.ride_repository
    }
}

impl DependOnRideModifier<PoolConnection<Postgres>> for PostgresStore {
    type RideModifier = PostgresRideRepository;
    fn ride_modifier(&self) -> &PostgresRideRepository {
        &self.ride_repository
    }
}

impl DependOnUserQuery<PoolConnection<Postgres>> for PostgresStore {
    type UserQuery = PostgresUserRepository;
    fn user_query(&self) -> &PostgresUserRepository {
        &self.user_repository
    }
}

impl DependOnUserModifier<PoolConnection<Postgres>> for PostgresStore {
    type UserModifier = PostgresUserRepository;
    fn user_modifier(&self) -> &PostgresUserRepository {
        &self.user_repository
    }
}

#[async_trait::async_trait]
impl RideFeed for PostgresStore {
    async fn watch(&self, scope: RideScope) -> error_stack::Result<RideSnapshots, KernelError> {
        let pool = self.pool.clone();
        let stream = snapshots(self.changes.follow(), move || {
            let pool = pool.clone();
            let scope = scope.clone();
            async move {
                match PgRideInternal::find_by_scope(&pool, &scope).await {
                    Ok(rides) => Some(rides),
                    Err(error) => {
                        tracing::warn!("ride feed query failed: {error}");
                        None
                    }
                }
            }
        });
        Ok(stream)
    }
}

#[async_trait::async_trait]
impl UserFeed for PostgresStore {
    async fn watch_user(
        &self,
        id: &UserId,
    ) -> error_stack::Result<UserSnapshots, KernelError> {
        let pool = self.pool.clone();
        let id = id.clone();
        let stream = snapshots(self.changes.follow(), move || {
            let pool = pool.clone();
            let id = id.clone();
            async move {
                match PgUserInternal::fetch(&pool, &id).await {
                    Ok(user) => Some(user),
                    Err(error) => {
                        tracing::warn!("user feed query failed: {error}");
                        None
                    }
                }
            }
        });
        Ok(stream)
    }
}

/// Result of a version-conditional row update.
pub(in crate::database) enum Commit {
    Applied,
    Missing,
    Stale,
}

impl Commit {
    pub(in crate::database) fn into_result(self) -> error_stack::Result<(), KernelError> {
        match self {
            Commit::Applied => Ok(()),
            Commit::Missing => Err(Report::new(KernelError::NotFound)),
            Commit::Stale => Err(Report::new(KernelError::Concurrency)),
        }
    }
}

impl<T> ConvertError for Result<T, Error> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| match error {
            Error::PoolTimedOut => Report::from(error).change_context(KernelError::Timeout),
            _ => Report::from(error).change_context(KernelError::Internal),
        })
    }
}
