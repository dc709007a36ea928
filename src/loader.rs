use crate::error::{DashboardError, Result};
use crate::types::{RawRow, REQUIRED_COLUMNS};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Read the raw orders table from a delimited file.
///
/// Fails before returning any rows if the file cannot be opened or a
/// required column is missing from the header.
pub fn load_raw(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).map_err(|source| DashboardError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_raw(file)?;
    info!(path = %path.display(), rows = rows.len(), "loaded orders file");
    Ok(rows)
}

pub fn read_raw<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DashboardError::MissingColumn(column.to_string()));
        }
    }
    debug!(columns = headers.len(), "header validated");

    let mut rows = Vec::new();
    for result in rdr.deserialize::<RawRow>() {
        rows.push(result?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "order_id,customer_unique_id,order_status,order_purchase_timestamp,order_approved_at,payment_value,customer_city,customer_state,product_category_name_english,extra";

    #[test]
    fn reads_rows_and_ignores_extra_columns() {
        let data = format!(
            "{HEADER}\n\
             o1,c1,delivered,2018-01-05 13:00:00,2018-01-05 13:20:00,10.5,sao paulo,SP,audio,x\n\
             o2,c2,canceled,2018-02-01 09:00:00,,,,,,y\n"
        );
        let rows = read_raw(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order_id.as_deref(), Some("o1"));
        assert_eq!(rows[0].customer_city.as_deref(), Some("sao paulo"));
        assert_eq!(rows[1].order_approved_at, None);
        assert_eq!(rows[1].payment_value, None);
        assert_eq!(rows[1].product_category_name_english, None);
    }

    #[test]
    fn missing_column_is_fatal() {
        let data = "order_id,customer_unique_id\no1,c1\n";
        let err = read_raw(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn(c) if c == "order_purchase_timestamp"));
    }

    #[test]
    fn header_only_file_yields_no_rows() {
        let rows = read_raw(format!("{HEADER}\n").as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(
            file,
            "o1,c1,delivered,2018-01-05 13:00:00,2018-01-05 13:20:00,10.5,rio,RJ,toys,"
        )
        .unwrap();
        file.flush().unwrap();

        let rows = load_raw(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_state.as_deref(), Some("RJ"));
    }

    #[test]
    fn missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_raw(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::Load { .. }));
    }
}
