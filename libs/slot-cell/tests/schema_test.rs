const SCHEMA: &str = include_str!("../../../migrations/0001_scheduling.sql");

fn normalised(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[test]
fn slot_window_is_unique_per_doctor() {
    let schema = normalised(SCHEMA);
    assert!(schema.contains(
        r#"create unique index if not exists slots_doctor_window_key on slots (doctor_id, "date", start_time, end_time);"#
    ));
}

#[test]
fn reminder_markers_and_inbox_are_declared() {
    let schema = normalised(SCHEMA);
    assert!(schema.contains("reminder_30m_sent_at timestamptz"));
    assert!(schema.contains("reminder_24h_sent_at timestamptz"));
    assert!(schema.contains("create table if not exists notifications"));
}
