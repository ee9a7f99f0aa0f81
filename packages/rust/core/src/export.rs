//! Delimited band/member output.
//!
//! One row per band: the band's `page_name,name` cell followed by one
//! `page_name,name` cell per member. Cells are joined by the record delimiter
//! (`;` by default), so the comma inside a cell is not a field separator.

use std::path::Path;

use bandgraph_shared::{Band, BandGraphError, Result};

/// A band row read back from an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandRecord {
    pub page_name: String,
    pub name: String,
    /// `(page_name, name)` per member.
    pub members: Vec<(String, String)>,
}

/// Cells of one output row.
pub fn band_row(band: &Band) -> Vec<String> {
    std::iter::once(format!("{},{}", band.page_name, band.name))
        .chain(
            band.members
                .iter()
                .map(|m| format!("{},{}", m.page_name, m.name)),
        )
        .collect()
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(|b| b.is_ascii() && *b != b',')
        .ok_or_else(|| {
            BandGraphError::config(format!(
                "record delimiter must be a single ASCII character other than ',', got {delimiter:?}"
            ))
        })
}

/// Write one row per band to `path`, replacing any existing file.
pub fn write_bands<'a>(
    path: &Path,
    bands: impl IntoIterator<Item = &'a Band>,
    delimiter: char,
) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| BandGraphError::Output(format!("{}: {e}", path.display())))?;

    let mut rows = 0;
    for band in bands {
        writer
            .write_record(band_row(band))
            .map_err(|e| BandGraphError::Output(format!("{}: {e}", path.display())))?;
        rows += 1;
    }
    writer.flush().map_err(|e| BandGraphError::io(path, e))?;

    tracing::info!(path = %path.display(), rows, "wrote band rows");
    Ok(rows)
}

/// Read rows written by [`write_bands`].
///
/// Each cell is split at its first comma, so a `page_name` containing a comma
/// is read back wrongly; the format cannot tell the two apart.
pub fn read_bands(path: &Path, delimiter: char) -> Result<Vec<BandRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| BandGraphError::parse(format!("{}: {e}", path.display())))?;

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| BandGraphError::parse(format!("{}: {e}", path.display())))?;
        let bad_row = || {
            BandGraphError::parse(format!(
                "{}: row {} has a cell without ','",
                path.display(),
                line + 1
            ))
        };

        let mut cells = row.iter();
        let Some(band_cell) = cells.next() else {
            continue;
        };
        let (page_name, name) = split_cell(band_cell).ok_or_else(bad_row)?;
        let members = cells
            .map(split_cell)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(bad_row)?;

        records.push(BandRecord {
            page_name,
            name,
            members,
        });
    }

    Ok(records)
}

fn split_cell(cell: &str) -> Option<(String, String)> {
    cell.split_once(',')
        .map(|(page_name, name)| (page_name.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgraph_shared::BandMember;

    fn queen() -> Band {
        Band {
            page_name: "Queen (band) members".into(),
            name: "Queen".into(),
            url: "/wiki/Category:Queen_(band)_members".into(),
            members: vec![
                BandMember {
                    page_name: "Freddie Mercury".into(),
                    name: "Farrokh Bulsara".into(),
                    url: "/wiki/Freddie_Mercury".into(),
                },
                BandMember {
                    page_name: "Brian May".into(),
                    name: "Brian Harold May".into(),
                    url: "/wiki/Brian_May".into(),
                },
            ],
            has_subcategories: false,
        }
    }

    #[test]
    fn test_band_row_shape() {
        assert_eq!(
            band_row(&queen()),
            [
                "Queen (band) members,Queen",
                "Freddie Mercury,Farrokh Bulsara",
                "Brian May,Brian Harold May"
            ]
        );
    }

    #[test]
    fn test_written_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.csv");

        let mut solo = queen();
        solo.members.truncate(0);
        solo.page_name = "Yes members".into();
        solo.name = "Yes".into();

        let rows = write_bands(&path, [&queen(), &solo], ';').unwrap();
        assert_eq!(rows, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Queen (band) members,Queen;Freddie Mercury,Farrokh Bulsara;Brian May,Brian Harold May\nYes members,Yes\n"
        );

        let records = read_bands(&path, ';').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Queen");
        assert_eq!(
            records[0].members[1],
            ("Brian May".to_string(), "Brian Harold May".to_string())
        );
        assert!(records[1].members.is_empty());
    }

    #[test]
    fn test_cells_with_delimiter_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bands.csv");

        let mut band = queen();
        band.members.truncate(1);
        band.members[0].name = "Farrokh; Freddie".into();
        write_bands(&path, [&band], ';').unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Freddie Mercury,Farrokh; Freddie\""));

        let records = read_bands(&path, ';').unwrap();
        assert_eq!(records[0].members[0].1, "Farrokh; Freddie");
    }

    #[test]
    fn test_rejects_comma_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_bands(&dir.path().join("x.csv"), [&queen()], ',').unwrap_err();
        assert!(err.to_string().contains("record delimiter"));
    }
}
