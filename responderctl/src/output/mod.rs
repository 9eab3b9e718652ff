//! Printing markers and status information on the terminal
use serde::Serialize;
use table::ResponderTable;
use tabled::{Table, Tabled};

pub(crate) mod rows;
pub(crate) mod table;

/// How marker listings are printed
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// Table for reading on the terminal
    Table,
    /// Comma-separated values, one marker per line
    Csv,
    /// A JSON array of markers
    Json,
    /// A YAML list of markers
    Yaml,
}

impl OutputFormat {
    /// Render a marker listing. Tables end with a line counting the markers.
    pub(crate) fn render<I, T>(self, rows: I) -> anyhow::Result<String>
    where
        I: IntoIterator<Item = T>,
        T: Tabled + Serialize,
    {
        let rows: Vec<T> = rows.into_iter().collect();
        Ok(match self {
            Self::Table => {
                let count = rows.len();
                let noun = if count == 1 { "marker" } else { "markers" };
                format!("{}\n{count} {noun}", Table::new(&rows).styled())
            }
            Self::Csv => {
                let mut writer = csv::Writer::from_writer(vec![]);
                for row in &rows {
                    writer.serialize(row)?;
                }
                String::from_utf8(writer.into_inner()?)?
            }
            Self::Json => serde_json::to_string_pretty(&rows)?,
            Self::Yaml => serde_yaml::to_string(&rows)?,
        })
    }
}

/// Render a single record as a two-column table with one field per line
pub(crate) fn details<T: Tabled>(item: T) -> String {
    let mut table = Table::builder([item]).index().column(0).transpose().build();
    table.styled().to_string()
}

#[cfg(test)]
mod test {
    use super::{
        rows::{MarkerRow, StatusRow},
        *,
    };
    use libresponder::{identity::Identity, marker::Marker};

    fn rows() -> Vec<MarkerRow> {
        [
            Marker::new(15.5, 120.6, "PNP Assistance Request"),
            Marker::new(15.4, 120.5, "juan"),
        ]
        .iter()
        .map(MarkerRow::new)
        .collect()
    }

    #[test]
    fn json_output() {
        let s = OutputFormat::Json.render(rows()).expect("Failed to format");
        let value: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(value[0]["title"], "PNP Assistance Request");
        assert_eq!(value[0]["icon"], "police");
        assert_eq!(value[0]["request"], true);
        assert_eq!(value[1]["icon"], "");
    }

    #[test]
    fn csv_output() {
        let s = OutputFormat::Csv.render(rows()).expect("Failed to format");
        let mut lines = s.lines();
        assert_eq!(lines.next(), Some("title,latitude,longitude,icon,request"));
        assert_eq!(lines.next(), Some("PNP Assistance Request,15.5,120.6,police,true"));
        assert_eq!(lines.next(), Some("juan,15.4,120.5,,false"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn yaml_output() {
        let s = OutputFormat::Yaml.render(rows()).expect("Failed to format");
        assert!(s.starts_with("- title: PNP Assistance Request\n"));
        assert!(s.contains("icon: police"));
    }

    #[test]
    fn table_output() {
        let s = OutputFormat::Table.render(rows()).expect("Failed to format");
        assert!(s.contains("PNP Assistance Request"));
        assert!(s.ends_with("2 markers"));

        let s = OutputFormat::Table
            .render(rows().into_iter().take(1))
            .expect("Failed to format");
        assert!(s.ends_with("1 marker"));

        let s = OutputFormat::Table
            .render(Vec::<MarkerRow>::new())
            .expect("Failed to format");
        assert!(s.ends_with("0 markers"));
    }

    #[test]
    fn status_details() {
        let identity = Identity::new("juan", "42");
        let s = details(StatusRow::new(
            "http://localhost:3000".to_string(),
            "/tmp/config.json".to_string(),
            "/tmp/identity.json".to_string(),
            Some(&identity),
        ));
        let lines: Vec<&str> = s.lines().collect();
        // one line per field instead of one wide row
        assert!(lines.len() >= 5);
        assert!(lines.iter().any(|l| l.contains("Username") && l.contains("juan")));
        assert!(lines.iter().any(|l| l.contains("UserId") && l.contains("42")));
    }
}
