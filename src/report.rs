use chrono::{DateTime, Utc};
use crate::snapshot::Snapshot;

pub fn output_report(snapshot: &Snapshot) {
    if let Some(ev) = &snapshot.event_info {
        println!("Event {} | {}",
            ev.id.as_deref().unwrap_or("?"),
            ev.name.as_deref().unwrap_or("(unnamed)"),
        );
    }
    println!("Updated {} | Ends {}", format_millis(snapshot.updated_at), format_millis(snapshot.ends_at));

    for s in &snapshot.data {
        println!("|{0:>6} | {1:>14.0} | {2:>14.0} | {3:>+12.0}",
            s.rank,
            s.current,
            s.predicted,
            if s.predicted > 0.0 { s.predicted - s.current } else { 0.0 },
        );
    }
}

fn format_millis(ms: i64) -> String {
    if ms == 0 { return "-".to_string(); }
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
