// src/load/mod.rs
pub mod date_parser;
pub mod error;
pub mod parse;
pub mod section;
pub mod utils;

use tracing::{debug, trace};

use crate::config::{DuplicateDates, LoaderConfig};
use crate::table::{NormalizedTable, Record};

pub use error::{LoadError, LoadErrorKind};
use parse::{Labels, RawTable};
use section::{find_data_start, DataStart};

const UTF8_BOM: char = '\u{feff}';

/// Load with the default configuration.
pub fn load(buffer: &[u8]) -> Result<NormalizedTable, LoadError> {
    Loader::default().load(buffer)
}

/// Turns an uploaded buffer into a [`NormalizedTable`].
///
/// The buffer may be a plain CSV (with or without a header row) or an
/// exported report whose preamble precedes the series. The observations are
/// located by the sentinel line, then by the first `<date>,<...>` line, and
/// failing both the whole buffer is read as a headed CSV.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Rejects configs that could break the table invariants (see
    /// [`LoaderConfig::validate`]).
    pub fn new(config: LoaderConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    #[tracing::instrument(level = "debug", skip(self, buffer), fields(bytes = buffer.len()))]
    pub fn load(&self, buffer: &[u8]) -> Result<NormalizedTable, LoadError> {
        // 1) decode + split
        let content = std::str::from_utf8(buffer)?;
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let lines: Vec<&str> = content.split('\n').collect();

        // 2) locate the observations and parse them
        let start = find_data_start(&lines, &self.config);
        debug!(?start, lines = lines.len(), "data start");
        let raw = match start.index() {
            Some(idx) => {
                let data_lines: Vec<&str> = lines[idx.min(lines.len())..]
                    .iter()
                    .copied()
                    .filter(|l| !l.trim().is_empty())
                    .collect();
                if data_lines.is_empty() {
                    return Err(LoadError::EmptyDataSection);
                }
                parse::parse_headerless(&data_lines.join("\n"))?
            }
            None => {
                let non_blank: Vec<&str> = lines
                    .iter()
                    .copied()
                    .filter(|l| !l.trim().is_empty())
                    .collect();
                parse::parse_with_header(&non_blank.join("\n"))?
            }
        };

        // 3) shape checks + naming
        if raw.labels.len() < 2 {
            return Err(LoadError::InsufficientColumns {
                found: raw.labels.len(),
            });
        }
        let extra_columns = extra_column_names(&raw.labels);

        // 4) coerce, drop, sort
        let records = self.coerce_records(raw);
        if records.len() < self.config.min_valid_rows {
            return Err(LoadError::InsufficientValidRows {
                found: records.len(),
                required: self.config.min_valid_rows,
            });
        }

        debug!(
            rows = records.len(),
            columns = extra_columns.len() + 2,
            from_sentinel = matches!(start, DataStart::Sentinel(_)),
            "loaded series"
        );
        Ok(NormalizedTable::new(extra_columns, records))
    }

    fn coerce_records(&self, raw: RawTable) -> Vec<Record> {
        let total = raw.rows.len();
        let mut records: Vec<Record> = raw
            .rows
            .into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let date = cells
                    .next()
                    .flatten()
                    .and_then(|s| date_parser::parse_datetime(&s));
                let price = cells.next().flatten().and_then(|s| utils::parse_price(&s));
                match (date, price) {
                    (Some(date), Some(price)) => Some(Record {
                        date,
                        price,
                        extras: cells.collect(),
                    }),
                    _ => None,
                }
            })
            .collect();

        if records.len() < total {
            trace!(dropped = total - records.len(), "rows without date or price");
        }

        records.sort_by_key(|r| r.date);

        if self.config.duplicate_dates == DuplicateDates::KeepLast {
            // after a stable sort the last of each run is the last in input order
            let mut deduped: Vec<Record> = Vec::with_capacity(records.len());
            for rec in records {
                match deduped.last_mut() {
                    Some(prev) if prev.date == rec.date => *prev = rec,
                    _ => deduped.push(rec),
                }
            }
            records = deduped;
        }
        records
    }
}

/// Names for the columns after `Date` and `Price`.
fn extra_column_names(labels: &Labels) -> Vec<String> {
    match labels {
        Labels::Positional(n) => (2..*n)
            .map(|i| match i {
                2 if *n >= 4 => "Performance_PCT".to_string(),
                3 if *n >= 4 => "Performance_ABS".to_string(),
                _ => format!("Col_{}", i),
            })
            .collect(),
        Labels::Named(names) => names[2..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,seriesload::load=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn pairs(t: &NormalizedTable) -> Vec<(NaiveDateTime, f64)> {
        t.records().iter().map(|r| (r.date, r.price)).collect()
    }

    #[test]
    fn sentinel_report_is_sorted() {
        init_test_logging();
        let content = "Ticker,TEST\n=== DATI STORICI ===\n2024-01-01,100\n2024-01-03,102\n2024-01-02,101";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(
            pairs(&table),
            vec![
                (day(2024, 1, 1), 100.0),
                (day(2024, 1, 2), 101.0),
                (day(2024, 1, 3), 102.0)
            ]
        );
        assert_eq!(table.columns(), ["Date", "Price"]);
    }

    #[test]
    fn full_report_with_preamble() {
        init_test_logging();
        let content = r#"Nome,ENI SpA
Ticker,ENI.MI
Data Download,2024-06-01 10:22:01
Periodo,2024-01-02 - 2024-01-05
Numero Osservazioni,3
Performance Totale,2.13%
Prezzo Iniziale,14.10
Deviazione Standard,0.12

=== DATI STORICI ===
2024-01-02,14.10,0.00,0.00
2024-01-03,14.25,1.06,0.15
2024-01-04,14.40,2.13,0.30
"#;
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.columns(),
            ["Date", "Price", "Performance_PCT", "Performance_ABS"]
        );
        assert_eq!(
            table.extra_column("Performance_PCT"),
            Some(vec![Some("0.00"), Some("1.06"), Some("2.13")])
        );
    }

    #[test]
    fn heuristic_without_sentinel() {
        let content = "Nome,Gold\nTicker,GC=F\n\n01/02/2024,2050.5\n01/03/2024,2041.0\n";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(
            pairs(&table),
            vec![(day(2024, 1, 2), 2050.5), (day(2024, 1, 3), 2041.0)]
        );
    }

    #[test]
    fn header_row_renames_first_two_only() {
        // dotted dates are not data-like, so the header path is taken
        let content = "Giorno,Chiusura,Volume,Open\n2024.01.02,10,500,9.5\n2024.01.01,9,400,9.1\n";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(table.columns(), ["Date", "Price", "Volume", "Open"]);
        assert_eq!(table.get(0).unwrap().date, day(2024, 1, 1));
        assert_eq!(
            table.get(0).unwrap().extras,
            vec![Some("400".to_string()), Some("9.1".to_string())]
        );
    }

    #[test]
    fn dated_rows_under_a_header_take_the_headerless_path() {
        let content = "Giorno,Chiusura,Volume\n2024-01-02,10,500\n2024-01-01,9,400\n";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(table.columns(), ["Date", "Price", "Col_2"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn headerless_naming_by_width() {
        let two = "2024-01-01,1\n2024-01-02,2\n";
        let four = "2024-01-01,1,0,0\n2024-01-02,2,100,1\n";
        let six = "2024-01-01,1,0,0,a,b\n2024-01-02,2,100,1,c,d\n";
        let three = "2024-01-01,1,x\n2024-01-02,2,y\n";
        assert_eq!(load(two.as_bytes()).unwrap().columns(), ["Date", "Price"]);
        assert_eq!(
            load(four.as_bytes()).unwrap().columns(),
            ["Date", "Price", "Performance_PCT", "Performance_ABS"]
        );
        assert_eq!(
            load(six.as_bytes()).unwrap().columns(),
            [
                "Date",
                "Price",
                "Performance_PCT",
                "Performance_ABS",
                "Col_4",
                "Col_5"
            ]
        );
        assert_eq!(
            load(three.as_bytes()).unwrap().columns(),
            ["Date", "Price", "Col_2"]
        );
    }

    #[test]
    fn single_row_is_rejected() {
        let err = load(b"2024-01-01,100").unwrap_err();
        assert_eq!(
            err,
            LoadError::InsufficientValidRows {
                found: 1,
                required: 2
            }
        );
    }

    #[test]
    fn two_rows_boundary() {
        assert!(load(b"2024-01-01,100\n2024-01-02,101\n").is_ok());
        let err = load(b"2024-01-01,100\n2024-01-02,oops\n").unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::InsufficientValidRows);
    }

    #[test]
    fn bad_date_row_is_dropped() {
        let content = "2024-01-01,100\n2024-13-45,999\n2024-01-03,102\n";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(
            pairs(&table),
            vec![(day(2024, 1, 1), 100.0), (day(2024, 1, 3), 102.0)]
        );
    }

    #[test]
    fn bare_integer_dates_are_lossy() {
        // passes the data-row check but is not a real date
        let content = "1704067200,100\n2024-01-02,101\n2024-01-03,102\n";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_after_sentinel() {
        let err = load(b"Ticker,X\n=== DATI STORICI ===\n\n  \n").unwrap_err();
        assert_eq!(err, LoadError::EmptyDataSection);
        let err = load(b"Ticker,X\n=== DATI STORICI ===").unwrap_err();
        assert_eq!(err, LoadError::EmptyDataSection);
    }

    #[test]
    fn single_column_is_rejected() {
        let err = load(b"Prices\n100\n101\n").unwrap_err();
        assert_eq!(err, LoadError::InsufficientColumns { found: 1 });
        let err = load(b"=== DATI STORICI ===\n2024-01-01\n2024-01-02\n").unwrap_err();
        assert_eq!(err, LoadError::InsufficientColumns { found: 1 });
    }

    #[test]
    fn decode_and_parse_failures() {
        let err = load(&[0x32, 0x30, 0xff, 0xfe, b',', b'1']).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::DecodeOrParseFailure);
        assert!(err.to_string().starts_with("load error: "));

        let err = load(b"").unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::DecodeOrParseFailure);

        let err = load(b"2024-01-01,1\n2024-01-02,2,3\n").unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::DecodeOrParseFailure);
    }

    #[test]
    fn header_only_has_no_rows() {
        let err = load(b"Date,Price\n").unwrap_err();
        assert_eq!(
            err,
            LoadError::InsufficientValidRows {
                found: 0,
                required: 2
            }
        );
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let content = "\u{feff}Date,Close\r\n2024-01-02,10.5\r\n2024-01-01,10.0\r\n";
        let table = load(content.as_bytes()).unwrap();
        assert_eq!(
            pairs(&table),
            vec![(day(2024, 1, 1), 10.0), (day(2024, 1, 2), 10.5)]
        );
    }

    #[test]
    fn loading_twice_is_identical() {
        let content = "Ticker,T\n=== DATI STORICI ===\n2024-01-02,1.1,a\n2024-01-01,1.0,b\n";
        let a = load(content.as_bytes()).unwrap();
        let b = load(content.as_bytes()).unwrap();
        assert_eq!(a, b);
        assert!(a
            .prices()
            .zip(b.prices())
            .all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn duplicate_dates_policy() {
        let content = "2024-01-02,3\n2024-01-01,1\n2024-01-02,4\n2024-01-01,2\n";
        let kept = load(content.as_bytes()).unwrap();
        assert_eq!(kept.prices().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0]);

        let loader = Loader::new(LoaderConfig {
            duplicate_dates: DuplicateDates::KeepLast,
            ..LoaderConfig::default()
        })
        .unwrap();
        let deduped = loader.load(content.as_bytes()).unwrap();
        assert_eq!(deduped.prices().collect::<Vec<_>>(), vec![2.0, 4.0]);
    }

    #[test]
    fn custom_sentinel_and_minimum() {
        let loader = Loader::new(LoaderConfig {
            sentinel: "--- DATA ---".into(),
            min_valid_rows: 3,
            ..LoaderConfig::default()
        })
        .unwrap();
        let content = "Symbol,ABC\n2020-01-01,preamble\n--- DATA ---\n2024-01-01,1\n2024-01-02,2\n";
        let err = loader.load(content.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            LoadError::InsufficientValidRows {
                found: 2,
                required: 3
            }
        );
    }

    #[test]
    fn invalid_configs_are_refused() {
        let no_minimum = Loader::new(LoaderConfig {
            min_valid_rows: 0,
            ..LoaderConfig::default()
        });
        assert!(no_minimum.is_err());

        let one_row = Loader::new(LoaderConfig {
            min_valid_rows: 1,
            ..LoaderConfig::default()
        });
        assert!(one_row.is_err());

        let empty_sentinel = Loader::new(LoaderConfig {
            sentinel: String::new(),
            ..LoaderConfig::default()
        });
        assert!(empty_sentinel.is_err());
    }

    #[test]
    fn default_loader_keeps_the_first_headerless_row() {
        let loader = Loader::new(LoaderConfig::default()).unwrap();
        let table = loader
            .load(b"2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n")
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0).unwrap().date, day(2024, 1, 1));
        assert!(loader.load(b"Date,Price\n").is_err());
    }
}
