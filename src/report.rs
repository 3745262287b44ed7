use crate::error::ReportError;
use crate::models::StandupRecord;
use crate::store::StatusStore;
use chrono::{NaiveDate, Utc};
use std::borrow::Cow;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

pub const HEADER: [&str; 5] = ["date", "user_id", "yesterday", "today", "blocker"];

/// A finished report file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub path: PathBuf,
    pub file_name: String,
    pub rows: usize,
}

/// Exports `user_id`'s standups between `start` and `end` (inclusive) as CSV
/// into `dir`.
pub fn export_report(
    store: &StatusStore,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    dir: &Path,
) -> Result<Report, ReportError> {
    check_range(start, end)?;
    let records = store.records_between(user_id, start, end)?;
    let report = write_report_file(dir, user_id, start, end, &records)?;

    info!(user_id, %start, %end, rows = report.rows, path = %report.path.display(), "report exported");
    Ok(report)
}

pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), ReportError> {
    if start > end {
        return Err(ReportError::InvalidRange { start, end });
    }
    Ok(())
}

/// `{user_id}-standup-report-{start}-{end}-{stamp}.csv`, with anything outside
/// `[A-Za-z0-9_-]` in the user id replaced.
pub fn report_file_name(user_id: &str, start: NaiveDate, end: NaiveDate, stamp: i64) -> String {
    let safe: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}-standup-report-{}-{}-{}.csv", safe, start, end, stamp)
}

/// Writes the CSV to a temp file in `dir` and only moves it into place once
/// everything has been flushed. Every call gets its own file; an existing one
/// is never replaced.
pub fn write_report_file(
    dir: &Path,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    records: &[StandupRecord],
) -> Result<Report, ReportError> {
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let file_name = report_file_name(user_id, start, end, stamp);
    let path = dir.join(&file_name);

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(&mut tmp);
        write_csv(records, &mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(&path).map_err(|e| e.error)?;

    Ok(Report {
        path,
        file_name,
        rows: records.len(),
    })
}

pub fn write_csv<W: Write>(records: &[StandupRecord], out: &mut W) -> io::Result<()> {
    write_row(out, &HEADER)?;

    for record in records {
        let date = record.date.format("%Y-%m-%d").to_string();
        write_row(
            out,
            &[
                date.as_str(),
                record.user_id.as_str(),
                record.yesterday.as_deref().unwrap_or(""),
                record.today.as_deref().unwrap_or(""),
                record.blocker.as_deref().unwrap_or(""),
            ],
        )?;
    }

    Ok(())
}

fn write_row<W: Write>(out: &mut W, cells: &[&str]) -> io::Result<()> {
    let line = cells
        .iter()
        .map(|cell| escape(cell))
        .collect::<Vec<_>>()
        .join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")
}

fn escape(cell: &str) -> Cow<'_, str> {
    if cell.contains(|c: char| c == ',' || c == '"' || c == '\n' || c == '\r') {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

#[cfg(test)]
mod test {
    use super::{check_range, export_report, report_file_name, write_csv, write_report_file};
    use crate::error::ReportError;
    use crate::models::{StandupField, StandupRecord, StandupUpdate};
    use crate::store::test::{test_store, unique_user};
    use chrono::NaiveDate;
    use std::fs;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(day: u32, yesterday: Option<&str>, today: Option<&str>) -> StandupRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        StandupRecord {
            user_id: "U1".to_string(),
            date,
            yesterday: yesterday.map(String::from),
            today: today.map(String::from),
            blocker: None,
            channel: Some("C1".to_string()),
            modified_at: date.and_hms_opt(10, 30, 0).unwrap(),
        }
    }

    fn csv(records: &[StandupRecord]) -> String {
        let mut out = Vec::new();
        write_csv(records, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_report_is_header_only() {
        assert_eq!(csv(&[]), "date,user_id,yesterday,today,blocker\r\n");
    }

    #[test]
    fn rows_follow_header_in_given_order() {
        let records = vec![
            record(5, Some("Shipped X"), Some("Ship Y")),
            record(20, None, Some("Review")),
        ];

        let lines: Vec<String> = csv(&records).lines().map(String::from).collect();
        assert_eq!(
            lines,
            vec![
                "date,user_id,yesterday,today,blocker",
                "2024-01-05,U1,Shipped X,Ship Y,",
                "2024-01-20,U1,,Review,",
            ]
        );
    }

    #[test]
    fn cells_with_separators_are_quoted() {
        let records = vec![record(2, Some("fixed a, b and c"), Some("say \"hi\"\nthen go"))];

        let out = csv(&records);
        assert!(out.contains("\"fixed a, b and c\""));
        assert!(out.contains("\"say \"\"hi\"\"\nthen go\""));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(matches!(
            check_range(start, end),
            Err(ReportError::InvalidRange { .. })
        ));
        assert!(check_range(end, start).is_ok());
        assert!(check_range(end, end).is_ok());
    }

    #[test]
    fn file_name_embeds_user_id_and_range() {
        assert_eq!(
            report_file_name("U123", day(1), day(31), 42),
            "U123-standup-report-2024-01-01-2024-01-31-42.csv"
        );
        assert_eq!(
            report_file_name("../U1", day(5), day(5), 7),
            "___U1-standup-report-2024-01-05-2024-01-05-7.csv"
        );
    }

    #[test]
    fn report_file_is_materialized_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(5, Some("a"), Some("b")), record(20, Some("c"), None)];

        let report = write_report_file(dir.path(), "U1", day(1), day(31), &records).unwrap();

        assert_eq!(report.rows, 2);
        assert!(report.file_name.starts_with("U1-standup-report-2024-01-01-2024-01-31-"));
        assert!(report.file_name.ends_with(".csv"));
        assert_eq!(report.path, dir.path().join(&report.file_name));

        let contents = fs::read_to_string(&report.path).unwrap();
        assert!(contents.starts_with("date,user_id,yesterday,today,blocker\r\n"));
        assert_eq!(contents.lines().count(), 3);

        // the temp file was renamed, not copied
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn reports_for_the_same_user_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let mut february = record(5, Some("february"), None);
        february.date = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();

        let january = record(5, Some("january"), None);

        let jan = write_report_file(dir.path(), "U1", day(1), day(31), &[january]).unwrap();
        let feb = write_report_file(dir.path(), "U1", day(1), day(31), &[february]).unwrap();

        assert_ne!(jan.path, feb.path);
        let jan_contents = fs::read_to_string(&jan.path).unwrap();
        let feb_contents = fs::read_to_string(&feb.path).unwrap();
        assert!(jan_contents.contains("2024-01-05,U1,january,,"));
        assert!(!jan_contents.contains("february"));
        assert!(feb_contents.contains("2024-02-05,U1,february,,"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn empty_report_file_still_has_header() {
        let dir = tempfile::tempdir().unwrap();

        let report = write_report_file(dir.path(), "U9", day(1), day(2), &[]).unwrap();

        assert_eq!(report.rows, 0);
        let contents = fs::read_to_string(&report.path).unwrap();
        assert_eq!(contents, "date,user_id,yesterday,today,blocker\r\n");
    }

    #[test]
    fn missing_directory_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            write_report_file(&missing, "U1", day(1), day(2), &[]),
            Err(ReportError::Io(_))
        ));
        assert!(!missing.exists());
    }

    #[test]
    fn export_covers_only_the_requested_range() {
        let store = match test_store() {
            Some(store) => store,
            None => return,
        };
        let user = unique_user("export");
        let dir = tempfile::tempdir().unwrap();

        let feb_1 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        store
            .upsert_on(&user, day(20), &StandupUpdate::new().with(StandupField::Today, "Review"))
            .unwrap();
        store
            .upsert_on(&user, day(5), &StandupUpdate::new().with(StandupField::Yesterday, "Shipped X"))
            .unwrap();
        store
            .upsert_on(&user, feb_1, &StandupUpdate::new().with(StandupField::Today, "later"))
            .unwrap();

        let report = export_report(&store, &user, day(1), day(31), dir.path()).unwrap();
        assert_eq!(report.rows, 2);

        let contents = fs::read_to_string(&report.path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "date,user_id,yesterday,today,blocker".to_string(),
                format!("2024-01-05,{},Shipped X,,", user),
                format!("2024-01-20,{},,Review,", user),
            ]
        );
    }

    #[test]
    fn export_rejects_reversed_range_before_querying() {
        let store = match test_store() {
            Some(store) => store,
            None => return,
        };
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            export_report(&store, "U1", day(31), day(1), dir.path()),
            Err(ReportError::InvalidRange { .. })
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
