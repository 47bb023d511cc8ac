use std::fs::File;
use std::io::{self, Write};

use thiserror::Error;
use time::{macros::format_description, Date, OffsetDateTime};

use crate::domain::{Sighting, SightingFilter};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Could not format date: {0}")]
    Format(#[from] time::error::Format),
}

const HEADERS: [&str; 8] = [
    "ID",
    "Timestamp",
    "Latitude",
    "Longitude",
    "Status",
    "Reporter",
    "Notes",
    "Species",
];

pub struct CsvExporter;

impl CsvExporter {
    pub fn default_filename(date: Date) -> Result<String, ExportError> {
        Ok(format!("sightings_export_{}.csv", format_date(date)?))
    }

    pub fn filtered_filename(date: Date) -> Result<String, ExportError> {
        Ok(format!("pawhub_filtered_export_{}.csv", format_date(date)?))
    }

    /// Writes the header row and one row per sighting.
    pub fn write_sightings<'a, W: Write>(
        sightings: impl IntoIterator<Item = &'a Sighting>,
        writer: W,
    ) -> Result<usize, ExportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(HEADERS)?;

        let mut count = 0;
        for sighting in sightings {
            csv_writer.write_record([
                sighting.id.clone(),
                display_timestamp(sighting),
                sighting.location.lat.to_string(),
                sighting.location.lng.to_string(),
                sighting.status.to_string(),
                sighting.reporter.clone().unwrap_or_default(),
                sighting.notes.clone().unwrap_or_default(),
                sighting.species.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }
        csv_writer.flush()?;
        Ok(count)
    }

    /// Writes the sightings matching `filter`, preceded by `#` comment lines
    /// describing the filter.
    pub fn write_filtered<W: Write>(
        sightings: &[Sighting],
        filter: &SightingFilter,
        generated_at: OffsetDateTime,
        mut writer: W,
    ) -> Result<usize, ExportError> {
        let matching = filter.apply(sightings);

        let mut preamble = vec![
            "# PawHub Sightings Export".to_string(),
            format!("# Generated: {}", format_timestamp(generated_at)?),
            format!(
                "# Time Range: {} - {}",
                filter.from.map(|t| format_date(t.date())).transpose()?.unwrap_or_else(|| "any".to_string()),
                filter.to.map(|t| format_date(t.date())).transpose()?.unwrap_or_else(|| "any".to_string()),
            ),
        ];
        let statuses = if filter.statuses.is_empty() {
            "all".to_string()
        } else {
            filter
                .statuses
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        preamble.push(format!("# Status Filter: {}", statuses));
        if let Some(drive_id) = &filter.drive_id {
            preamble.push(format!("# Drive ID: {}", drive_id));
        }
        if let Some(query) = filter.search_query.as_deref().filter(|q| !q.trim().is_empty()) {
            preamble.push(format!("# Search Query: {}", query));
        }
        preamble.push(format!("# Total Records: {}", matching.len()));

        for line in preamble {
            writeln!(writer, "{}", line)?;
        }
        writeln!(writer)?;

        Self::write_sightings(matching, writer)
    }

    pub fn export_to_csv(sightings: &[Sighting], filename: &str) -> Result<String, ExportError> {
        let file = File::create(filename)?;
        Self::write_sightings(sightings, file)?;
        Ok(filename.to_string())
    }

    pub fn export_filtered_to_csv(
        sightings: &[Sighting],
        filter: &SightingFilter,
        filename: &str,
    ) -> Result<String, ExportError> {
        let file = File::create(filename)?;
        Self::write_filtered(sightings, filter, OffsetDateTime::now_utc(), file)?;
        Ok(filename.to_string())
    }
}

fn format_date(date: Date) -> Result<String, time::error::Format> {
    date.format(format_description!("[year]-[month]-[day]"))
}

fn format_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] UTC[offset_hour sign:mandatory]:[offset_minute]"
    ))
}

/// Readable timestamp for the sheet; unparseable values are kept verbatim.
fn display_timestamp(sighting: &Sighting) -> String {
    sighting
        .observed_at()
        .and_then(|at| format_timestamp(at).ok())
        .unwrap_or_else(|| sighting.timestamp.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, SightingStatus};
    use time::macros::{date, datetime};

    fn sightings() -> Vec<Sighting> {
        vec![
            Sighting {
                id: "s1".to_string(),
                location: Location { lat: 19.06, lng: 72.83 },
                timestamp: "2025-09-01T10:30:00Z".to_string(),
                status: SightingStatus::Active,
                reporter: Some("Asha".to_string()),
                notes: Some("near the station, limping".to_string()),
                species: Some("dog".to_string()),
                mission_id: Some("42".to_string()),
            },
            Sighting {
                id: "s2".to_string(),
                location: Location { lat: 19.07, lng: 72.84 },
                timestamp: "2025-09-02T08:00:00Z".to_string(),
                status: SightingStatus::Sterilized,
                reporter: None,
                notes: Some("tagged \"left ear\"".to_string()),
                species: None,
                mission_id: None,
            },
        ]
    }

    fn to_string(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_write_sightings_headers_and_rows() {
        let mut out = Vec::new();
        let count = CsvExporter::write_sightings(&sightings(), &mut out).unwrap();
        assert_eq!(count, 2);

        let text = to_string(out);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID,Timestamp,Latitude,Longitude,Status,Reporter,Notes,Species");
        assert_eq!(
            lines[1],
            "s1,2025-09-01 10:30:00 UTC+00:00,19.06,72.83,active,Asha,\"near the station, limping\",dog"
        );
        assert_eq!(
            lines[2],
            "s2,2025-09-02 08:00:00 UTC+00:00,19.07,72.84,sterilized,,\"tagged \"\"left ear\"\"\","
        );
    }

    #[test]
    fn test_unparseable_timestamp_kept_verbatim() {
        let mut list = sightings();
        list[0].timestamp = "last tuesday".to_string();
        let mut out = Vec::new();
        CsvExporter::write_sightings(&list[..1], &mut out).unwrap();
        assert!(to_string(out).contains("s1,last tuesday,"));
    }

    #[test]
    fn test_write_filtered_preamble() {
        let filter = SightingFilter {
            statuses: vec![SightingStatus::Active],
            drive_id: Some("42".to_string()),
            search_query: Some("station".to_string()),
            from: Some(datetime!(2025-09-01 00:00 UTC)),
            ..Default::default()
        };
        let mut out = Vec::new();
        let count =
            CsvExporter::write_filtered(&sightings(), &filter, datetime!(2025-09-03 12:00 UTC), &mut out)
                .unwrap();
        assert_eq!(count, 1);

        let text = to_string(out);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# PawHub Sightings Export");
        assert_eq!(lines[1], "# Generated: 2025-09-03 12:00:00 UTC+00:00");
        assert_eq!(lines[2], "# Time Range: 2025-09-01 - any");
        assert_eq!(lines[3], "# Status Filter: active");
        assert_eq!(lines[4], "# Drive ID: 42");
        assert_eq!(lines[5], "# Search Query: station");
        assert_eq!(lines[6], "# Total Records: 1");
        assert_eq!(lines[7], "");
        assert!(lines[8].starts_with("ID,"));
        assert!(lines[9].starts_with("s1,"));
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_filtered_without_optional_lines() {
        let mut out = Vec::new();
        CsvExporter::write_filtered(
            &sightings(),
            &SightingFilter::default(),
            datetime!(2025-09-03 12:00 UTC),
            &mut out,
        )
        .unwrap();
        let text = to_string(out);
        assert!(text.contains("# Status Filter: all\n"));
        assert!(!text.contains("# Drive ID"));
        assert!(!text.contains("# Search Query"));
        assert!(text.contains("# Total Records: 2\n"));
    }

    #[test]
    fn test_filenames() {
        assert_eq!(
            CsvExporter::default_filename(date!(2025 - 09 - 01)).unwrap(),
            "sightings_export_2025-09-01.csv"
        );
        assert_eq!(
            CsvExporter::filtered_filename(date!(2025 - 09 - 01)).unwrap(),
            "pawhub_filtered_export_2025-09-01.csv"
        );
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let name = CsvExporter::export_to_csv(&sightings(), path.to_str().unwrap()).unwrap();
        assert_eq!(name, path.to_str().unwrap());

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][6], "tagged \"left ear\"");
    }
}
