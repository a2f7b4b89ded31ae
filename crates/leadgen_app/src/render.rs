use leadgen_core::{AddStats, AppViewModel, RecordRow, Status};

const URL_WIDTH: usize = 36;

pub fn render_table(view: &AppViewModel) -> String {
    if view.records.is_empty() {
        return "No websites in the list.\n".to_string();
    }
    let mut out = format!(
        "{:>4}  {:<URL_WIDTH$}  {:<10}  {}\n",
        "ID", "WEBSITE", "STATUS", "EMAILS / NOTE"
    );
    for row in &view.records {
        out.push_str(&format!(
            "{:>4}  {:<URL_WIDTH$}  {:<10}  {}\n",
            row.record_id,
            truncate(&row.url, URL_WIDTH),
            row.status.as_str(),
            detail(row)
        ));
    }
    out
}

pub fn render_stats(view: &AppViewModel) -> String {
    let stats = view.stats;
    format!(
        "total {} | processed {} | with emails {} | success rate {}%",
        stats.total, stats.processed, stats.found, stats.success_rate
    )
}

pub fn render_add_stats(stats: &AddStats) -> String {
    let mut line = format!("Added {} website(s)", stats.added);
    if stats.skipped_duplicate > 0 {
        line.push_str(&format!(", skipped {} already in the list", stats.skipped_duplicate));
    }
    if stats.skipped_history > 0 {
        line.push_str(&format!(", skipped {} found in history", stats.skipped_history));
    }
    line.push('.');
    line
}

/// One progress line for a record whose status just changed.
pub fn render_progress(row: &RecordRow) -> String {
    match row.status {
        Status::Processing => format!("[{}] {} ...", row.record_id, row.url),
        _ => format!("[{}] {} {} {}", row.record_id, row.url, row.status.as_str(), detail(row)),
    }
}

fn detail(row: &RecordRow) -> String {
    match (row.status, &row.error) {
        (Status::Failed, Some(error)) => error.clone(),
        (Status::Completed, _) if row.emails.is_empty() => "(no emails found)".to_string(),
        _ => row.emails_joined(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgen_core::Stats;

    fn row(id: u64, url: &str, status: Status, emails: &[&str], error: Option<&str>) -> RecordRow {
        RecordRow {
            record_id: id,
            url: url.to_string(),
            status,
            emails: emails.iter().map(|e| e.to_string()).collect(),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn table_lists_each_record() {
        let view = AppViewModel {
            records: vec![
                row(1, "acme.com", Status::Completed, &["a@acme.com", "b@acme.com"], None),
                row(2, "beta.io", Status::Failed, &[], Some("timeout")),
                row(3, "gamma.dev", Status::Completed, &[], None),
            ],
            ..AppViewModel::default()
        };
        let table = render_table(&view);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("a@acme.com, b@acme.com"));
        assert!(lines[2].contains("FAILED") && lines[2].ends_with("timeout"));
        assert!(lines[3].ends_with("(no emails found)"));
    }

    #[test]
    fn stats_line_shows_rate() {
        let view = AppViewModel {
            stats: Stats {
                total: 4,
                processed: 3,
                found: 2,
                success_rate: 67,
            },
            ..AppViewModel::default()
        };
        assert_eq!(
            render_stats(&view),
            "total 4 | processed 3 | with emails 2 | success rate 67%"
        );
    }

    #[test]
    fn add_stats_mention_only_nonzero_skips() {
        let stats = AddStats {
            added: 2,
            skipped_duplicate: 0,
            skipped_history: 1,
        };
        assert_eq!(
            render_add_stats(&stats),
            "Added 2 website(s), skipped 1 found in history."
        );
    }

    #[test]
    fn long_urls_are_truncated() {
        let long = "a".repeat(50);
        assert_eq!(truncate(&long, 10).chars().count(), 10);
        assert_eq!(truncate("short", 10), "short");
    }
}
