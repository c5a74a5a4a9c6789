//! CSV input and output.
//!
//! The worksheet arrives already flattened to CSV: the first column holds
//! the characteristic label and every other header names an area column.
//! Area reference data is a CSV with `area_id,area_name` headers.

use std::io::{Read, Write};

use census_profile_models::{AreaIdentity, ProfileRecord, RawRow};

use crate::CliError;

/// Reads a flattened profile worksheet.
///
/// Columns with a blank header are ignored. Short rows simply lack values
/// for the trailing columns.
///
/// # Errors
///
/// * [`CliError::Csv`] if the CSV cannot be read
/// * [`CliError::NoAreaColumns`] if the header has no area columns
pub fn read_table<R: Read>(reader: R) -> Result<Vec<RawRow>, CliError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let area_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, label)| (index, label.trim().to_string()))
        .filter(|(_, label)| !label.is_empty())
        .collect();
    if area_columns.is_empty() {
        return Err(CliError::NoAreaColumns);
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let characteristic = record.get(0).unwrap_or_default();
        let values = area_columns
            .iter()
            .filter_map(|(index, label)| record.get(*index).map(|value| (label.as_str(), value)));
        rows.push(RawRow::new(characteristic, values));
    }

    log::info!(
        "Read {} rows across {} area columns",
        rows.len(),
        area_columns.len()
    );

    Ok(rows)
}

/// Reads the area reference list.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if the CSV cannot be read or a row does not
/// match `area_id,area_name`.
pub fn read_areas<R: Read>(reader: R) -> Result<Vec<AreaIdentity>, CliError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let areas = rdr
        .deserialize::<AreaIdentity>()
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("Loaded {} areas", areas.len());

    Ok(areas)
}

/// Writes records as CSV with a header row. Suppressed counts are blank.
///
/// # Errors
///
/// Returns [`CliError::Csv`] or [`CliError::Io`] if writing fails.
pub fn write_records<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a ProfileRecord>,
) -> Result<usize, CliError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut written = 0;
    for record in records {
        wtr.serialize(record)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_profile_models::{Category, Level};

    #[test]
    fn reads_table_columns_as_area_labels() {
        let csv = "Characteristic,St. James Town,Annex,\n\
                   Total - Knowledge of official languages,\"1,000\",20,ignored\n\
                   English only,x,15\n";
        let rows = read_table(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].characteristic, "Total - Knowledge of official languages");
        assert_eq!(rows[0].value("St. James Town"), Some("1,000"));
        assert_eq!(rows[0].values.len(), 2);
        assert_eq!(rows[1].value("St. James Town"), Some("x"));
        assert_eq!(rows[1].value("Annex"), Some("15"));
    }

    #[test]
    fn short_rows_lack_trailing_values() {
        let csv = "Characteristic,A,B\nEnglish only,1\n";
        let rows = read_table(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].value("A"), Some("1"));
        assert_eq!(rows[0].value("B"), None);
    }

    #[test]
    fn rejects_table_without_area_columns() {
        let csv = "Characteristic\nEnglish only\n";
        assert!(matches!(
            read_table(csv.as_bytes()),
            Err(CliError::NoAreaColumns)
        ));
    }

    #[test]
    fn reads_areas() {
        let csv = "area_id,area_name\n74, St. James Town\n95,Annex\n";
        let areas = read_areas(csv.as_bytes()).unwrap();
        assert_eq!(
            areas,
            vec![
                AreaIdentity::new(74, "St. James Town"),
                AreaIdentity::new(95, "Annex"),
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_area_id() {
        let csv = "area_id,area_name\nabc,Annex\n";
        assert!(matches!(read_areas(csv.as_bytes()), Err(CliError::Csv(_))));
    }

    #[test]
    fn writes_records_with_blank_suppressed_counts() {
        let records = vec![
            ProfileRecord::new(74, 2021, Category::PlaceOfBirth, "Asia", Level::Continent, Some(12))
                .unwrap(),
            ProfileRecord::new(74, 2021, Category::Religion, "Jewish", Level::None, None).unwrap(),
        ];
        let mut out = Vec::new();
        let written = write_records(&mut out, &records).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "area_id,census_year,category,subcategory,level,count\n\
             74,2021,place_of_birth,Asia,continent,12\n\
             74,2021,religion,Jewish,,\n"
        );
    }
}
