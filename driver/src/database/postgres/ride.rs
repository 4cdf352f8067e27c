use std::collections::HashMap;

use sqlx::pool::PoolConnection;
use sqlx::types::Json;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use kernel::interface::feed::RideScope;
use kernel::interface::query::RideQuery;
use kernel::interface::update::RideModifier;
use kernel::prelude::entity::{
    Destination, DocumentVersion, Origin, RatingScore, Ride, RideDate, RideId, RideRatings,
    RideStatus, RideTime, SeatCount, UserId,
};
use kernel::KernelError;

use crate::database::feed::ChangeSignal;
use crate::database::postgres::Commit;
use crate::error::{ConvertError, DriverError};

pub struct PostgresRideRepository {
    changes: ChangeSignal,
}

impl PostgresRideRepository {
    pub(in crate::database) fn new(changes: ChangeSignal) -> Self {
        Self { changes }
    }
}

#[async_trait::async_trait]
impl RideQuery<PoolConnection<Postgres>> for PostgresRideRepository {
    async fn find_by_id(
        &self,
        con: &mut PoolConnection<Postgres>,
        id: &RideId,
    ) -> error_stack::Result<Option<Ride>, KernelError> {
        PgRideInternal::find_by_id(con, id).await.convert_error()
    }

    async fn find_all(
        &self,
        con: &mut PoolConnection<Postgres>,
    ) -> error_stack::Result<Vec<Ride>, KernelError> {
        PgRideInternal::find_all(con).await.convert_error()
    }

    async fn find_by_driver(
        &self,
        con: &mut PoolConnection<Postgres>,
        driver_id: &UserId,
    ) -> error_stack::Result<Vec<Ride>, KernelError> {
        PgRideInternal::find_by_driver(con, driver_id)
            .await
            .convert_error()
    }

    async fn find_by_passenger(
        &self,
        con: &mut PoolConnection<Postgres>,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Ride>, KernelError> {
        PgRideInternal::find_by_passenger(con, user_id)
            .await
            .convert_error()
    }
}

#[async_trait::async_trait]
impl RideModifier<PoolConnection<Postgres>> for PostgresRideRepository {
    async fn create(
        &self,
        con: &mut PoolConnection<Postgres>,
        ride: &Ride,
    ) -> error_stack::Result<(), KernelError> {
        PgRideInternal::create(con, ride).await.convert_error()?;
        self.changes.mark();
        Ok(())
    }

    async fn update(
        &self,
        con: &mut PoolConnection<Postgres>,
        ride: &Ride,
    ) -> error_stack::Result<(), KernelError> {
        match PgRideInternal::update(con, ride).await.convert_error()? {
            Commit::Applied => {
                self.changes.mark();
                Ok(())
            }
            outcome => outcome.into_result(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    driver_id: Uuid,
    origin: String,
    destination: String,
    departs_on: time::Date,
    departs_at: time::Time,
    seats: i32,
    passengers: Vec<Uuid>,
    status: String,
    ratings: Json<HashMap<Uuid, i32>>,
    version: i64,
}

impl TryFrom<RideRow> for Ride {
    type Error = DriverError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RideStatus>()
            .map_err(|()| DriverError::Conversion(anyhow::anyhow!("unknown ride status")))?;
        let ratings = row
            .ratings
            .0
            .into_iter()
            .map(|(rater, score)| (UserId::new(rater), RatingScore::new(score)))
            .collect::<HashMap<_, _>>();
        Ok(Ride::new(
            RideId::new(row.id),
            UserId::new(row.driver_id),
            Origin::new(row.origin),
            Destination::new(row.destination),
            RideDate::new(row.departs_on),
            RideTime::new(row.departs_at),
            SeatCount::new(row.seats),
            row.passengers.into_iter().map(UserId::new).collect(),
            status,
            RideRatings::new(ratings),
            DocumentVersion::new(row.version),
        ))
    }
}

fn ratings_json(ride: &Ride) -> Json<HashMap<Uuid, i32>> {
    Json(
        ride.ratings()
            .as_ref()
            .iter()
            .map(|(rater, score)| (*rater.as_ref(), *score.as_ref()))
            .collect(),
    )
}

fn passenger_ids(ride: &Ride) -> Vec<Uuid> {
    ride.passengers().iter().map(|id| *id.as_ref()).collect()
}

pub(in crate::database) struct PgRideInternal;

impl PgRideInternal {
    async fn find_by_id(con: &mut PgConnection, id: &RideId) -> Result<Option<Ride>, DriverError> {
        let row = sqlx::query_as::<_, RideRow>(
            // language=postgresql
            r#"
            SELECT id, driver_id, origin, destination, departs_on, departs_at,
                   seats, passengers, status, ratings, version
            FROM rides
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await?;
        row.map(Ride::try_from).transpose()
    }

    async fn find_all(con: &mut PgConnection) -> Result<Vec<Ride>, DriverError> {
        let rows = sqlx::query_as::<_, RideRow>(
            // language=postgresql
            r#"
            SELECT id, driver_id, origin, destination, departs_on, departs_at,
                   seats, passengers, status, ratings, version
            FROM rides
            ORDER BY departs_on, departs_at, id
            "#,
        )
        .fetch_all(con)
        .await?;
        rows.into_iter().map(Ride::try_from).collect()
    }

    async fn find_by_driver(
        con: &mut PgConnection,
        driver_id: &UserId,
    ) -> Result<Vec<Ride>, DriverError> {
        let rows = sqlx::query_as::<_, RideRow>(
            // language=postgresql
            r#"
            SELECT id, driver_id, origin, destination, departs_on, departs_at,
                   seats, passengers, status, ratings, version
            FROM rides
            WHERE driver_id = $1
            ORDER BY departs_on, departs_at, id
            "#,
        )
        .bind(driver_id.as_ref())
        .fetch_all(con)
        .await?;
        rows.into_iter().map(Ride::try_from).collect()
    }

    async fn find_by_passenger(
        con: &mut PgConnection,
        user_id: &UserId,
    ) -> Result<Vec<Ride>, DriverError> {
        let rows = sqlx::query_as::<_, RideRow>(
            // language=postgresql
            r#"
            SELECT id, driver_id, origin, destination, departs_on, departs_at,
                   seats, passengers, status, ratings, version
            FROM rides
            WHERE $1 = ANY(passengers)
            ORDER BY departs_on, departs_at, id
            "#,
        )
        .bind(user_id.as_ref())
        .fetch_all(con)
        .await?;
        rows.into_iter().map(Ride::try_from).collect()
    }

    pub(in crate::database) async fn find_by_scope(
        pool: &Pool<Postgres>,
        scope: &RideScope,
    ) -> Result<Vec<Ride>, DriverError> {
        let mut con = pool.acquire().await?;
        match scope {
            RideScope::All => Self::find_all(&mut con).await,
            RideScope::DrivenBy(driver_id) => Self::find_by_driver(&mut con, driver_id).await,
            RideScope::JoinedBy(user_id) => Self::find_by_passenger(&mut con, user_id).await,
        }
    }

    async fn create(con: &mut PgConnection, ride: &Ride) -> Result<(), DriverError> {
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO rides (id, driver_id, origin, destination, departs_on, departs_at,
                               seats, passengers, status, ratings, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(ride.id().as_ref())
        .bind(ride.driver_id().as_ref())
        .bind(ride.origin().as_ref())
        .bind(ride.destination().as_ref())
        .bind(ride.date().as_ref())
        .bind(ride.time().as_ref())
        .bind(ride.seats().as_ref())
        .bind(passenger_ids(ride))
        .bind(ride.status().to_string())
        .bind(ratings_json(ride))
        .bind(ride.version().as_ref())
        .execute(con)
        .await?;
        Ok(())
    }

    /// Version-conditional write: the row is touched only while its stored
    /// version still equals the one the caller read, and the version bump
    /// rides in the same statement.
    async fn update(con: &mut PgConnection, ride: &Ride) -> Result<Commit, DriverError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE rides
            SET origin = $2, destination = $3, departs_on = $4, departs_at = $5,
                seats = $6, passengers = $7, status = $8, ratings = $9,
                version = version + 1
            WHERE id = $1 AND version = $10
            "#,
        )
        .bind(ride.id().as_ref())
        .bind(ride.origin().as_ref())
        .bind(ride.destination().as_ref())
        .bind(ride.date().as_ref())
        .bind(ride.time().as_ref())
        .bind(ride.seats().as_ref())
        .bind(passenger_ids(ride))
        .bind(ride.status().to_string())
        .bind(ratings_json(ride))
        .bind(ride.version().as_ref())
        .execute(&mut *con)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(Commit::Applied);
        }

        let exists = sqlx::query_scalar::<_, i64>(
            // language=postgresql
            r#"
            SELECT version FROM rides WHERE id = $1
            "#,
        )
        .bind(ride.id().as_ref())
        .fetch_optional(&mut *con)
        .await?;
        Ok(match exists {
            Some(_) => Commit::Stale,
            None => Commit::Missing,
        })
    }
}

#[cfg(test)]
mod test {
    use time::macros::{date, time};
    use uuid::Uuid;

    use kernel::interface::query::RideQuery;
    use kernel::interface::store::RecordStore;
    use kernel::interface::update::RideModifier;
    use kernel::prelude::entity::{
        Destination, DocumentVersion, Origin, Ride, RideDate, RideId, RideRatings, RideStatus,
        RideTime, SeatCount, UserId,
    };
    use kernel::KernelError;

    use crate::database::postgres::PostgresStore;

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn test() -> error_stack::Result<(), KernelError> {
        let store = PostgresStore::new().await?;
        let mut con = store.open().await?;

        let driver_id = UserId::new(Uuid::new_v4());
        let passenger_id = UserId::new(Uuid::new_v4());
        let ride_id = RideId::new(Uuid::new_v4());
        let ride = Ride::new(
            ride_id.clone(),
            driver_id,
            Origin::new("origin"),
            Destination::new("destination"),
            RideDate::new(date!(2024 - 06 - 01)),
            RideTime::new(time!(08:30)),
            SeatCount::new(2),
            Vec::new(),
            RideStatus::Upcoming,
            RideRatings::default(),
            DocumentVersion::initial(),
        );
        store.ride_repository.create(&mut con, &ride).await?;

        let found = store
            .ride_repository
            .find_by_id(&mut con, &ride_id)
            .await?;
        assert_eq!(found, Some(ride.clone()));

        let admitted = ride.admit(&passenger_id).unwrap();
        store.ride_repository.update(&mut con, &admitted).await?;

        let carried = store
            .ride_repository
            .find_by_passenger(&mut con, &passenger_id)
            .await?;
        assert_eq!(carried.len(), 1);
        assert!(carried[0].carries(&passenger_id));

        let refused = store.ride_repository.update(&mut con, &admitted).await;
        assert!(matches!(
            refused.unwrap_err().current_context(),
            KernelError::Concurrency
        ));
        Ok(())
    }
}
