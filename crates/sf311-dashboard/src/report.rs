//! Plain-text rendering of a dashboard snapshot

use crate::insights::{Insights, Mover};
use crate::models::{DailyCount, KeyCount, RecentRequest};
use crate::service::DashboardSnapshot;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use std::fmt;

pub const NO_DATA_MESSAGE: &str = "No data available. Did you run the load step?";
pub const NO_MATCH_MESSAGE: &str =
    "No rows match your filters. Try widening the date range or clearing categories.";

fn table<H: Into<comfy_table::Row>>(header: H) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

/// `1234567` -> `1,234,567`
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_pct(pct: f64) -> String {
    if pct.is_infinite() {
        "new".to_string()
    } else {
        format!("{:+.1}%", pct)
    }
}

/// Headline for the daily trend
pub fn trend_line(trend_pct: Option<f64>) -> String {
    match trend_pct {
        None => "Not enough history for a week-over-week trend".to_string(),
        Some(pct) if pct > 0.0 => format!("▲ {:.1}% week-over-week", pct.abs()),
        Some(pct) if pct < 0.0 => format!("▼ {:.1}% week-over-week", pct.abs()),
        Some(_) => "Stable vs last week".to_string(),
    }
}

fn key_counts(f: &mut fmt::Formatter<'_>, title: &str, label: &str, rows: &[KeyCount]) -> fmt::Result {
    writeln!(f, "\n{}", title)?;
    if rows.is_empty() {
        return writeln!(f, "No {} data in current filter window.", label);
    }
    let mut t = table(vec![label, "requests"]);
    for row in rows {
        t.add_row(vec![row.key.clone(), format_count(row.requests)]);
    }
    writeln!(f, "{}", t)
}

fn movers(f: &mut fmt::Formatter<'_>, title: &str, label: &str, rows: &Option<Vec<Mover>>) -> fmt::Result {
    writeln!(f, "\n{}", title)?;
    match rows {
        None => writeln!(
            f,
            "Not enough history for week-over-week changes (need >=14 days in the selected range)."
        ),
        Some(rows) if rows.is_empty() => writeln!(f, "No {} movement detected.", label),
        Some(rows) => {
            let mut t = table(vec![label, "this week", "last week", "Δ", "Δ%"]);
            for m in rows {
                t.add_row(vec![
                    m.key.clone(),
                    format_count(m.current),
                    format_count(m.previous),
                    format!("{:+}", m.delta),
                    format_pct(m.pct),
                ]);
            }
            writeln!(f, "{}", t)
        },
    }
}

fn insights(f: &mut fmt::Formatter<'_>, insights: &Insights) -> fmt::Result {
    writeln!(f, "\nNotable changes (week-over-week)")?;
    writeln!(f, "{}", trend_line(insights.trend_pct))?;
    match &insights.top_area {
        Some(area) => writeln!(
            f,
            "Highest activity in {} ({} requests)",
            area.key,
            format_count(area.requests)
        )?,
        None => writeln!(f, "Highest activity in N/A")?,
    }

    movers(f, "Category trends", "category", &insights.category_movers)?;
    movers(f, "Neighborhood trends", "neighborhood", &insights.neighborhood_movers)
}

fn daily(f: &mut fmt::Formatter<'_>, rows: &[DailyCount]) -> fmt::Result {
    writeln!(f, "\nRequests per day")?;
    let mut t = table(vec!["day", "requests"]);
    for row in rows {
        t.add_row(vec![row.day.to_string(), format_count(row.requests)]);
    }
    writeln!(f, "{}", t)
}

fn recent(f: &mut fmt::Formatter<'_>, rows: &[RecentRequest]) -> fmt::Result {
    writeln!(f, "\nLatest {} requests", rows.len())?;
    let mut t = table(vec!["request_id", "created_at", "status", "category", "neighborhood"]);
    for row in rows {
        t.add_row(vec![
            row.request_id.clone(),
            row.created_at.format("%Y-%m-%d %H:%M").to_string(),
            row.status.clone().unwrap_or_default(),
            row.category.clone().unwrap_or_default(),
            row.neighborhood.clone().unwrap_or_default(),
        ]);
    }
    writeln!(f, "{}", t)
}

/// Text report for one snapshot; `to_string()` renders it
pub struct Report<'a>(pub &'a DashboardSnapshot);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.0;
        if snapshot.daily.is_empty() {
            return writeln!(f, "{}", NO_MATCH_MESSAGE);
        }

        let filter = &snapshot.filter;
        let categories = if filter.categories().is_empty() {
            "all".to_string()
        } else {
            filter.categories().iter().cloned().collect::<Vec<_>>().join(", ")
        };

        writeln!(f, "San Francisco 311 - City Operations Pulse")?;
        writeln!(f, "Range: {} to {} | Categories: {}", filter.start(), filter.end(), categories)?;
        if let Some(last) = snapshot.last_created_at {
            writeln!(f, "Data through: {}", last.format("%Y-%m-%d %H:%M UTC"))?;
        }

        let summary = &snapshot.summary;
        let median = summary
            .median_resolve_hours
            .map(|h| format!("{:.1} h", h))
            .unwrap_or_else(|| "-".to_string());
        let mut kpis = table(vec!["Total requests", "Open rate", "Median resolution time"]);
        kpis.add_row(vec![
            format_count(summary.total_requests),
            format!("{:.1}%", summary.open_rate()),
            median,
        ]);
        writeln!(f, "\n{}", kpis)?;

        insights(f, &snapshot.insights)?;
        daily(f, &snapshot.daily)?;
        key_counts(f, "Top neighborhoods", "neighborhood", &snapshot.top_neighborhoods)?;
        key_counts(f, "Top categories", "category", &snapshot.top_categories)?;
        key_counts(f, "Status breakdown", "status", &snapshot.status_breakdown)?;
        recent(f, &snapshot.recent)
    }
}

/// Render the full text report for `snapshot`
pub fn render_report(snapshot: &DashboardSnapshot) -> String {
    Report(snapshot).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::filter::DashboardFilter;
    use crate::models::Summary;

    fn snapshot(daily: Vec<DailyCount>) -> DashboardSnapshot {
        DashboardSnapshot {
            filter: DashboardFilter::new("2024-01-01".parse().unwrap(), "2024-01-02".parse().unwrap())
                .unwrap()
                .with_categories(["Graffiti"]),
            last_created_at: Some("2024-01-02T18:30:00Z".parse().unwrap()),
            summary: Summary {
                total_requests: 1_250,
                open_count: 250,
                median_resolve_hours: Some(36.25),
            },
            daily,
            top_neighborhoods: vec![KeyCount::new("Mission", 700)],
            top_categories: vec![KeyCount::new("Graffiti", 1_250)],
            status_breakdown: vec![],
            recent: vec![],
            insights: Insights {
                top_area: Some(KeyCount::new("Mission", 700)),
                ..Insights::default()
            },
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
        assert_eq!(format_count(-4_500), "-4,500");
    }

    #[test]
    fn test_trend_line() {
        assert_eq!(trend_line(Some(12.345)), "▲ 12.3% week-over-week");
        assert_eq!(trend_line(Some(-3.0)), "▼ 3.0% week-over-week");
        assert_eq!(trend_line(Some(0.0)), "Stable vs last week");
        assert!(trend_line(None).starts_with("Not enough history"));
    }

    #[test]
    fn test_report_sections() {
        let report = render_report(&snapshot(vec![
            DailyCount {
                day: "2024-01-01".parse().unwrap(),
                requests: 600,
            },
            DailyCount {
                day: "2024-01-02".parse().unwrap(),
                requests: 650,
            },
        ]));

        assert!(report.contains("Range: 2024-01-01 to 2024-01-02 | Categories: Graffiti"));
        assert!(report.contains("Data through: 2024-01-02 18:30 UTC"));
        assert!(report.contains("1,250"));
        assert!(report.contains("20.0%"));
        assert!(report.contains("36.2 h") || report.contains("36.3 h"));
        assert!(report.contains("Highest activity in Mission (700 requests)"));
        assert!(report.contains("No status data in current filter window."));
        assert!(report.contains("Not enough history for week-over-week changes"));
    }

    #[test]
    fn test_report_display_matches_render() {
        let snap = snapshot(vec![DailyCount {
            day: "2024-01-01".parse().unwrap(),
            requests: 3,
        }]);
        let shown = format!("{}", Report(&snap));

        assert!(shown.starts_with("San Francisco 311 - City Operations Pulse\n"));
        assert!(shown.ends_with('\n'));
        assert_eq!(shown, render_report(&snap));
    }

    #[test]
    fn test_empty_series_renders_hint() {
        assert_eq!(render_report(&snapshot(vec![])).trim_end(), NO_MATCH_MESSAGE);
    }

    #[test]
    fn test_new_key_pct() {
        assert_eq!(format_pct(f64::INFINITY), "new");
        assert_eq!(format_pct(25.0), "+25.0%");
    }
}
