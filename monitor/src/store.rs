use crate::entity::daily_usage;
use crate::error::Result;
use chrono::NaiveDate;
use common::{DailyUsage, MonthlyUsage};
use sea_orm::*;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

const UPSERT_DAILY_SQL: &str = r#"
    INSERT INTO daily_usage (day, bytes_sent, bytes_recv, max_up_speed, max_down_speed, active_seconds)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(day) DO UPDATE SET
        bytes_sent = excluded.bytes_sent,
        bytes_recv = excluded.bytes_recv,
        max_up_speed = MAX(daily_usage.max_up_speed, excluded.max_up_speed),
        max_down_speed = MAX(daily_usage.max_down_speed, excluded.max_down_speed),
        active_seconds = excluded.active_seconds
"#;

/// SQLite-backed store of per-day usage rows.
pub struct UsageStore {
    db: DatabaseConnection,
}

impl UsageStore {
    #[instrument(skip(database_path))]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let database_path = database_path.as_ref();

        // Create parent directory for database if it doesn't exist
        if let Some(parent) = database_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let db = Database::connect(&database_url).await?;

        // Keep API reads from blocking on collector writes
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "PRAGMA journal_mode=WAL".to_string(),
        ))
        .await?;

        let create_table_sql = r#"
            CREATE TABLE IF NOT EXISTS daily_usage (
                day TEXT PRIMARY KEY NOT NULL,
                bytes_sent INTEGER NOT NULL DEFAULT 0,
                bytes_recv INTEGER NOT NULL DEFAULT 0,
                max_up_speed INTEGER NOT NULL DEFAULT 0,
                max_down_speed INTEGER NOT NULL DEFAULT 0,
                active_seconds INTEGER NOT NULL DEFAULT 0
            )
        "#;
        db.execute(Statement::from_string(
            db.get_database_backend(),
            create_table_sql.to_string(),
        ))
        .await?;

        info!("Connected to SQLite database: {}", database_path.display());

        Ok(Self { db })
    }

    /// Writes one day's absolute totals. Totals and active seconds replace
    /// the stored row; peak speeds only ever go up.
    #[instrument(skip(self, usage), fields(day = %usage.day))]
    pub async fn upsert_daily(&self, usage: &DailyUsage) -> Result<()> {
        self.db
            .execute(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                UPSERT_DAILY_SQL,
                [
                    usage.day.to_string().into(),
                    clamp_to_db(usage.bytes_sent).into(),
                    clamp_to_db(usage.bytes_recv).into(),
                    clamp_to_db(usage.max_up_speed).into(),
                    clamp_to_db(usage.max_down_speed).into(),
                    clamp_to_db(usage.active_seconds).into(),
                ],
            ))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_daily(&self, day: NaiveDate) -> Result<Option<DailyUsage>> {
        let row = daily_usage::Entity::find_by_id(day.to_string())
            .one(&self.db)
            .await?;
        row.map(usage_from_model).transpose()
    }

    /// Rows within `start..=end` in ascending day order.
    #[instrument(skip(self))]
    pub async fn get_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyUsage>> {
        let rows = daily_usage::Entity::find()
            .filter(daily_usage::Column::Day.between(start.to_string(), end.to_string()))
            .order_by_asc(daily_usage::Column::Day)
            .all(&self.db)
            .await?;
        rows.into_iter().map(usage_from_model).collect()
    }

    #[instrument(skip(self))]
    pub async fn get_monthly(&self, year: i32, month: u32) -> Result<MonthlyUsage> {
        let prefix = format!("{year:04}-{month:02}-");
        let rows = daily_usage::Entity::find()
            .filter(daily_usage::Column::Day.starts_with(prefix))
            .all(&self.db)
            .await?;

        let mut monthly = MonthlyUsage::empty(year, month);
        for row in rows {
            monthly.fold(&usage_from_model(row)?);
        }
        Ok(monthly)
    }
}

fn clamp_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn usage_from_model(model: daily_usage::Model) -> Result<DailyUsage> {
    let day = NaiveDate::parse_from_str(&model.day, "%Y-%m-%d")?;
    Ok(DailyUsage {
        day,
        bytes_sent: model.bytes_sent.max(0) as u64,
        bytes_recv: model.bytes_recv.max(0) as u64,
        max_up_speed: model.max_up_speed.max(0) as u64,
        max_down_speed: model.max_down_speed.max(0) as u64,
        active_seconds: model.active_seconds.max(0) as u64,
    })
}
