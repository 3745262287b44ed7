use crate::error::StoreError;
use crate::models::{NewStandup, StandupField, StandupRecord, StandupUpdate};
use crate::schema::{self, standups};
use chrono::{Local, NaiveDate};
use diesel::connection::SimpleConnection;
use diesel::dsl::now;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use std::time::Duration;
use tracing::{debug, info};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Applies `statement_timeout` to every connection handed out by the pool and
/// pins the session to UTC, which is the zone `modified_at` is stored in.
#[derive(Debug)]
struct SessionSetup(Duration);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SessionSetup {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "SET statement_timeout = {}; SET TIME ZONE 'UTC'",
            self.0.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Handle to the `standups` table. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct StatusStore {
    pool: DbPool,
    timeout: Duration,
}

impl StatusStore {
    /// Builds the connection pool. Fails if the database can't be reached
    /// within `timeout`.
    pub fn connect(
        database_url: &str,
        pool_size: u32,
        timeout: Duration,
    ) -> Result<StatusStore, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(timeout)
            .connection_customizer(Box::new(SessionSetup(timeout)))
            .build(manager)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(StatusStore { pool, timeout })
    }

    pub fn create_tables(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.batch_execute(schema::CREATE_STANDUPS)
            .map_err(|e| self.classify(e, StoreError::Schema))?;
        info!("standups table ready");
        Ok(())
    }

    pub fn drop_tables(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.batch_execute(schema::DROP_STANDUPS)
            .map_err(|e| self.classify(e, StoreError::Schema))?;
        info!("standups table dropped");
        Ok(())
    }

    /// Drops every stored standup and recreates an empty table.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, DieselError, _>(|conn| {
            conn.batch_execute(schema::DROP_STANDUPS)?;
            conn.batch_execute(schema::CREATE_STANDUPS)
        })
        .map_err(|e| self.classify(e, StoreError::Schema))?;
        info!("standups table reset");
        Ok(())
    }

    pub fn upsert_field(
        &self,
        user_id: &str,
        field: StandupField,
        value: &str,
    ) -> Result<StandupRecord, StoreError> {
        self.upsert(user_id, &StandupUpdate::new().with(field, value))
    }

    /// Writes `update` into today's record for `user_id`, creating it if needed.
    pub fn upsert(
        &self,
        user_id: &str,
        update: &StandupUpdate,
    ) -> Result<StandupRecord, StoreError> {
        self.upsert_on(user_id, Local::now().date_naive(), update)
    }

    pub fn upsert_on(
        &self,
        user_id: &str,
        date: NaiveDate,
        update: &StandupUpdate,
    ) -> Result<StandupRecord, StoreError> {
        if update.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }

        let mut conn = self.conn()?;
        conn.batch_execute(schema::CREATE_STANDUPS)
            .map_err(|e| self.classify(e, StoreError::Schema))?;

        let row = NewStandup::new(user_id, date, update);
        let record = diesel::insert_into(standups::table)
            .values(&row)
            .on_conflict((standups::user_id, standups::date))
            .do_update()
            .set((&row.changes(), standups::modified_at.eq(now)))
            .returning(StandupRecord::as_returning())
            .get_result(&mut conn)
            .map_err(|e| self.classify(e, StoreError::Write))?;

        debug!(user_id, %date, "standup upserted");
        Ok(record)
    }

    pub fn get_today_record(&self, user_id: &str) -> Result<Option<StandupRecord>, StoreError> {
        self.get_record(user_id, Local::now().date_naive())
    }

    pub fn get_record(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<StandupRecord>, StoreError> {
        let mut conn = self.conn()?;
        standups::table
            .find((user_id, date))
            .select(StandupRecord::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| self.classify(e, StoreError::Read))
    }

    /// Records for `user_id` with `start <= date <= end`, oldest first.
    pub fn records_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StandupRecord>, StoreError> {
        let mut conn = self.conn()?;
        standups::table
            .filter(standups::user_id.eq(user_id))
            .filter(standups::date.between(start, end))
            .order(standups::date.asc())
            .select(StandupRecord::as_select())
            .load(&mut conn)
            .map_err(|e| self.classify(e, StoreError::Read))
    }

    fn conn(&self) -> Result<DbConn, StoreError> {
        // r2d2 only gives up once the timeout has elapsed.
        self.pool.get_timeout(self.timeout).map_err(|e| {
            debug!(error = %e, "no database connection available");
            StoreError::Timeout(self.timeout)
        })
    }

    fn classify(&self, err: DieselError, wrap: fn(DieselError) -> StoreError) -> StoreError {
        let timed_out = matches!(
            &err,
            DieselError::DatabaseError(_, info) if info.message().contains("statement timeout")
        );
        if timed_out {
            StoreError::Timeout(self.timeout)
        } else {
            wrap(err)
        }
    }
}
