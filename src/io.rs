//! Party-count table input and cluster table output.
//!
//! Input is CSV with `party_name` and `party_count` columns plus optional
//! `party_type`, `party_address`, `case_type` and `year`. Output goes to CSV or
//! SQLite depending on the file extension; list-valued columns are JSON arrays.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::models::{Cluster, PartyRecord};

const WRITE_BATCH_SIZE: usize = 10_000;

/// Columns every input table must have
pub const REQUIRED_COLUMNS: [&str; 2] = ["party_name", "party_count"];

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Deserialize)]
struct PartyRow {
    party_name: Option<String>,
    party_count: Option<u64>,
    party_type: Option<String>,
    party_address: Option<String>,
    case_type: Option<String>,
    year: Option<String>,
}

/// Whole-number year cell: an integer, or a float with no fractional part
/// (`2020.0` as written by spreadsheet exports).
fn parse_year(cell: &str) -> Option<i32> {
    if let Ok(year) = cell.parse::<i32>() {
        return Some(year);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => Some(value as i32),
        _ => None,
    }
}

impl PartyRow {
    fn into_record(self, line: usize) -> PartyRecord {
        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(cell) => {
                let year = parse_year(cell);
                if year.is_none() {
                    tracing::warn!(line, value = cell, "year is not a whole number, treating as missing");
                }
                year
            }
        };
        PartyRecord {
            raw_name: self.party_name.unwrap_or_default(),
            party_type: self.party_type.unwrap_or_default(),
            address: self.party_address.unwrap_or_default(),
            case_type: self.case_type.unwrap_or_default(),
            year,
            count: self.party_count.unwrap_or(0),
        }
    }
}

/// Read party records from any CSV source, in file order.
pub fn read_party_table<R: Read>(reader: R) -> Result<Vec<PartyRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            bail!("Input table is missing required column '{}'", column);
        }
    }

    let mut records = Vec::new();
    for (idx, row) in csv_reader.deserialize::<PartyRow>().enumerate() {
        // +2: one for the header line, one for 1-based numbering
        let line = idx + 2;
        let row = row.with_context(|| format!("Invalid party row at line {}", line))?;
        records.push(row.into_record(line));
    }
    Ok(records)
}

pub fn read_party_csv(path: &Path) -> Result<Vec<PartyRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open input table {}", path.display()))?;
    read_party_table(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to load {}", path.display()))
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Sqlite,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(OutputFormat::Csv),
            "sqlite3" | "sqlite" | "db" => Some(OutputFormat::Sqlite),
            _ => None,
        }
    }
}

/// Flat output row; list columns are JSON-encoded.
#[derive(Debug, Serialize)]
struct ClusterRow {
    canonical_name: String,
    aliases: String,
    party_types: String,
    addresses: String,
    case_types: String,
    years: String,
    total_count: u64,
}

impl ClusterRow {
    fn from_cluster(cluster: &Cluster) -> Result<Self> {
        Ok(Self {
            canonical_name: cluster.canonical_name.clone(),
            aliases: serde_json::to_string(&cluster.aliases)?,
            party_types: serde_json::to_string(&cluster.party_types)?,
            addresses: serde_json::to_string(&cluster.addresses)?,
            case_types: serde_json::to_string(&cluster.case_types)?,
            years: serde_json::to_string(&cluster.years)?,
            total_count: cluster.total_count,
        })
    }
}

pub fn write_clusters_csv<W: Write>(writer: W, clusters: &[Cluster]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for cluster in clusters {
        csv_writer.serialize(ClusterRow::from_cluster(cluster)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_clusters_sqlite(conn: &mut Connection, clusters: &[Cluster]) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        CREATE TABLE clusters (
            id INTEGER PRIMARY KEY,
            canonical_name TEXT NOT NULL,
            aliases TEXT NOT NULL,
            party_types TEXT NOT NULL,
            addresses TEXT NOT NULL,
            case_types TEXT NOT NULL,
            years TEXT NOT NULL,
            total_count INTEGER NOT NULL
        );

        CREATE TABLE aliases (
            cluster_id INTEGER NOT NULL REFERENCES clusters(id),
            alias TEXT NOT NULL
        );",
    )?;

    for (chunk_idx, chunk) in clusters.chunks(WRITE_BATCH_SIZE).enumerate() {
        let tx = conn.transaction()?;
        {
            let mut insert_cluster = tx.prepare_cached(
                "INSERT INTO clusters (id, canonical_name, aliases, party_types, addresses, case_types, years, total_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut insert_alias =
                tx.prepare_cached("INSERT INTO aliases (cluster_id, alias) VALUES (?1, ?2)")?;

            for (offset, cluster) in chunk.iter().enumerate() {
                let id = (chunk_idx * WRITE_BATCH_SIZE + offset + 1) as i64;
                let row = ClusterRow::from_cluster(cluster)?;
                let total_count = i64::try_from(row.total_count)
                    .context("total_count does not fit in an SQLite integer")?;
                insert_cluster.execute(params![
                    id,
                    row.canonical_name,
                    row.aliases,
                    row.party_types,
                    row.addresses,
                    row.case_types,
                    row.years,
                    total_count,
                ])?;
                for alias in &cluster.aliases {
                    insert_alias.execute(params![id, alias])?;
                }
            }
        }
        tx.commit()?;
    }

    conn.execute_batch("CREATE INDEX idx_aliases_alias ON aliases(alias);")?;
    Ok(())
}

/// Write clusters to `path`, picking the format from its extension.
/// The file must not exist yet.
pub fn write_clusters(path: &Path, clusters: &[Cluster]) -> Result<()> {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Csv) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_clusters_csv(std::io::BufWriter::new(file), clusters)
        }
        Some(OutputFormat::Sqlite) => {
            let mut conn = Connection::open(path)
                .with_context(|| format!("Failed to create output database {}", path.display()))?;
            write_clusters_sqlite(&mut conn, clusters)
        }
        None => bail!("Unsupported output format for {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cluster(name: &str, aliases: &[&str], count: u64) -> Cluster {
        Cluster {
            canonical_name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            party_types: vec!["plaintiff".to_string()],
            addresses: vec!["1 main st".to_string()],
            case_types: vec!["detainer".to_string()],
            years: vec![2019, 2020],
            total_count: count,
            source_rows: vec![0],
        }
    }

    #[test]
    fn test_read_party_table() {
        let csv = "party_name,party_count,party_type,party_address,case_type,year\n\
                   \"ABC Apartments, LLC\",3,plaintiff,1 Main St,detainer,2020\n\
                   ,2,defendant,,,\n";
        let records = read_party_table(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw_name, "ABC Apartments, LLC");
        assert_eq!(records[0].count, 3);
        assert_eq!(records[0].address, "1 Main St");
        assert_eq!(records[0].year, Some(2020));
        assert_eq!(records[1].raw_name, "");
        assert_eq!(records[1].year, None);
    }

    #[test]
    fn test_read_float_year() {
        let csv = "party_name,party_count,year\nAcme,1,2020\nBeta,2,2020.0\nGamma,1, 2019 \n";
        let records = read_party_table(csv.as_bytes()).unwrap();
        let years: Vec<Option<i32>> = records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![Some(2020), Some(2020), Some(2019)]);
    }

    #[test]
    fn test_read_text_year_as_missing() {
        let csv = "party_name,party_count,year\nAcme,1,unknown\nBeta,2,N/A\nGamma,3,2020.5\nDelta,4,2021\n";
        let records = read_party_table(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 4);
        let years: Vec<Option<i32>> = records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![None, None, None, Some(2021)]);
        assert_eq!(records[1].count, 2);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("1999"), Some(1999));
        assert_eq!(parse_year("1999.0"), Some(1999));
        assert_eq!(parse_year("NaN"), None);
        assert_eq!(parse_year("1e12"), None);
        assert_eq!(parse_year("twenty"), None);
    }

    #[test]
    fn test_read_minimal_columns() {
        let records = read_party_table("party_count,party_name\n7,Acme\n,Beta\n".as_bytes()).unwrap();
        assert_eq!(records[0].count, 7);
        assert_eq!(records[0].party_type, "");
        assert_eq!(records[1].count, 0);
    }

    #[test]
    fn test_missing_required_column() {
        let err = read_party_table("party_name\nAcme\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("party_count"));
    }

    #[test]
    fn test_negative_count_reports_line() {
        let err = read_party_table("party_name,party_count\nAcme,1\nBeta,-4\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(OutputFormat::from_path(&PathBuf::from("a.csv")), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_path(&PathBuf::from("a.SQLITE3")), Some(OutputFormat::Sqlite));
        assert_eq!(OutputFormat::from_path(&PathBuf::from("a.db")), Some(OutputFormat::Sqlite));
        assert_eq!(OutputFormat::from_path(&PathBuf::from("a.parquet")), None);
        assert_eq!(OutputFormat::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn test_write_clusters_csv() {
        let mut buf = Vec::new();
        write_clusters_csv(&mut buf, &[cluster("abc apt", &["abc apts"], 5)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("canonical_name,aliases,party_types,addresses,case_types,years,total_count")
        );
        assert_eq!(
            lines.next(),
            Some(r#"abc apt,"[""abc apts""]","[""plaintiff""]","[""1 main st""]","[""detainer""]","[2019,2020]",5"#)
        );
    }

    #[test]
    fn test_write_clusters_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parties-dedup.sqlite3");
        write_clusters(&path, &[cluster("abc apt", &["abc apts", "abc aprt"], 5), cluster("acme", &[], 1)]).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM clusters", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
        let total: i64 = conn.query_row("SELECT SUM(total_count) FROM clusters", [], |r| r.get(0)).unwrap();
        assert_eq!(total, 6);
        let owner: String = conn
            .query_row(
                "SELECT c.canonical_name FROM aliases a JOIN clusters c ON c.id = a.cluster_id WHERE a.alias = 'abc aprt'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(owner, "abc apt");
    }

    #[test]
    fn test_csv_file_round_trip_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parties.csv");
        std::fs::write(&path, "party_name,party_count\nAcme,2\n").unwrap();
        let records = read_party_csv(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert!(read_party_csv(&dir.path().join("missing.csv")).is_err());
    }
}
