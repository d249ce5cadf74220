//! Seeds a handful of demo event series for local development.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rota_core::config::load_config;
use rota_db::db::connection::create_pool;
use rota_db::db::enums::{SeriesStatus, Visibility};
use rota_db::db::{migrate, query};
use rota_db::model::event::series::NewEventSeries;
use rota_recur::{Frequency, RecurrenceRule, Weekday};

struct SeriesSeed {
    title: &'static str,
    start_at: &'static str,
    end_at: &'static str,
    all_day: bool,
    rule: RecurrenceRule,
}

fn demo_seeds() -> Vec<SeriesSeed> {
    vec![
        SeriesSeed {
            title: "Team standup",
            start_at: "2025-09-01T09:00:00Z",
            end_at: "2025-09-01T09:15:00Z",
            all_day: false,
            rule: RecurrenceRule::new(Frequency::Weekly)
                .with_by_day(vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday]),
        },
        SeriesSeed {
            title: "Rent due",
            start_at: "2025-09-01T00:00:00Z",
            end_at: "2025-09-02T00:00:00Z",
            all_day: true,
            rule: RecurrenceRule::new(Frequency::Monthly).with_by_month_day(vec![1]),
        },
        SeriesSeed {
            // Lands on the 31st only; shorter months are skipped outright.
            title: "Month-end report",
            start_at: "2025-08-31T17:00:00Z",
            end_at: "2025-08-31T17:30:00Z",
            all_day: false,
            rule: RecurrenceRule::new(Frequency::Monthly).with_by_month_day(vec![31]),
        },
        SeriesSeed {
            title: "Daily check-in",
            start_at: "2025-09-01T08:30:00Z",
            end_at: "2025-09-01T08:45:00Z",
            all_day: false,
            rule: RecurrenceRule::new(Frequency::Daily).with_count(5),
        },
    ]
}

fn ts(value: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn to_row(calendar_id: Uuid, seed: &SeriesSeed) -> anyhow::Result<NewEventSeries> {
    Ok(NewEventSeries {
        id: Uuid::new_v4(),
        calendar_id,
        title: seed.title.to_string(),
        description: None,
        location: None,
        color: None,
        category: None,
        all_day: seed.all_day,
        visibility: Visibility::Private,
        metadata: None,
        start_at: ts(seed.start_at)?,
        end_at: ts(seed.end_at)?,
        status: SeriesStatus::Active,
        recurrence: Some(serde_json::to_value(&seed.rule)?),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let config = load_config()?;

    migrate::run_pending(&config.database.url).await?;

    let pool = create_pool(&config.database.url, 1).await?;
    let mut conn = pool.get().await?;

    let existing = query::series::active_recurring(&mut conn).await?;
    if !existing.is_empty() {
        tracing::info!(
            count = existing.len(),
            "Event series already present, skipping seed"
        );
        return Ok(());
    }

    let calendar_id = Uuid::new_v4();
    for seed in demo_seeds() {
        let row = to_row(calendar_id, &seed)?;
        query::series::insert(&mut conn, &row).await?;
        tracing::info!(title = seed.title, series_id = %row.id, "Seeded event series");
    }

    tracing::info!("Seeding complete");

    Ok(())
}
