use crate::entities::{QueueStatus, queue_entity as queues};
use crate::error::AppResult;
use crate::models::{HourlyCount, StatsResponse, StatusCount};
use crate::services::{owner_umkm, today};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use std::collections::BTreeMap;
use std::sync::Arc;

const STATUS_ORDER: [QueueStatus; 5] = [
    QueueStatus::Waiting,
    QueueStatus::Called,
    QueueStatus::Done,
    QueueStatus::NoShow,
    QueueStatus::Canceled,
];

#[derive(Clone)]
pub struct StatsService {
    pool: Arc<DatabaseConnection>,
}

impl StatsService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// Tickets per hour of the day plus totals per status.
    /// An unparsable `day` falls back to today.
    pub async fn hourly(&self, user_id: i64, day: Option<&str>) -> AppResult<StatsResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let day = parse_day(day);

        let rows: Vec<(Option<DateTime<Utc>>, QueueStatus)> = queues::Entity::find()
            .select_only()
            .column(queues::Column::CreatedAt)
            .column(queues::Column::Status)
            .filter(queues::Column::UmkmId.eq(owner.id))
            .filter(queues::Column::QueueDate.eq(day))
            .into_tuple()
            .all(self.pool.as_ref())
            .await?;

        let hourly = hourly_histogram(rows.iter().filter_map(|(created, _)| *created), &Local);
        let by_status = status_totals(rows.iter().map(|(_, status)| *status));

        Ok(StatsResponse {
            day,
            total: rows.len() as i64,
            hourly,
            by_status,
        })
    }
}

pub fn parse_day(raw: Option<&str>) -> NaiveDate {
    raw.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(today)
}

/// Counts timestamps per local hour; hours without tickets are omitted.
pub fn hourly_histogram<Tz: TimeZone>(
    created: impl IntoIterator<Item = DateTime<Utc>>,
    tz: &Tz,
) -> Vec<HourlyCount> {
    let mut buckets: BTreeMap<u32, i64> = BTreeMap::new();
    for ts in created {
        *buckets.entry(ts.with_timezone(tz).hour()).or_default() += 1;
    }
    buckets
        .into_iter()
        .map(|(hour, count)| HourlyCount { hour, count })
        .collect()
}

pub fn status_totals(statuses: impl IntoIterator<Item = QueueStatus>) -> Vec<StatusCount> {
    let mut counts = [0i64; STATUS_ORDER.len()];
    for status in statuses {
        if let Some(i) = STATUS_ORDER.iter().position(|s| *s == status) {
            counts[i] += 1;
        }
    }
    STATUS_ORDER
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| StatusCount {
            status: *status,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_hourly_histogram_uses_local_hour() {
        // Asia/Jakarta is UTC+7
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let hist = hourly_histogram(vec![utc(1, 5), utc(1, 55), utc(2, 10), utc(9, 0)], &wib);
        assert_eq!(
            hist,
            vec![
                HourlyCount { hour: 8, count: 2 },
                HourlyCount { hour: 9, count: 1 },
                HourlyCount { hour: 16, count: 1 },
            ]
        );
        assert!(hourly_histogram(Vec::new(), &wib).is_empty());
    }

    #[test]
    fn test_status_totals_skip_zero() {
        let totals = status_totals(vec![
            QueueStatus::Done,
            QueueStatus::Waiting,
            QueueStatus::Done,
            QueueStatus::NoShow,
        ]);
        assert_eq!(
            totals,
            vec![
                StatusCount { status: QueueStatus::Waiting, count: 1 },
                StatusCount { status: QueueStatus::Done, count: 2 },
                StatusCount { status: QueueStatus::NoShow, count: 1 },
            ]
        );
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(
            parse_day(Some("2025-11-01")),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
        assert_eq!(parse_day(Some("kemarin")), today());
        assert_eq!(parse_day(None), today());
    }
}
