use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gpibport_instrument::InstrumentInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct InstrumentOutput<'a> {
    address: &'a str,
    identity: Option<&'a str>,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    backend: &'a str,
    count: usize,
    instruments: Vec<InstrumentOutput<'a>>,
}

/// Render an instrument listing.
pub fn render_instruments(
    backend: &str,
    instruments: &[InstrumentInfo],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => {
            let out = ListOutput {
                backend,
                count: instruments.len(),
                instruments: instruments
                    .iter()
                    .map(|inst| InstrumentOutput {
                        address: &inst.address,
                        identity: inst.identity.as_deref(),
                    })
                    .collect(),
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "IDENTITY"]);
            for inst in instruments {
                table.add_row(vec![
                    inst.address.clone(),
                    inst.identity.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => instruments
            .iter()
            .map(|inst| match &inst.identity {
                Some(identity) => format!("{}: {identity}", inst.address),
                None => format!("{}: <no response>", inst.address),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn print_instruments(
    backend: &str,
    instruments: &[InstrumentInfo],
    format: OutputFormat,
) -> std::io::Result<()> {
    let rendered = render_instruments(backend, instruments, format);
    let mut out = std::io::stdout().lock();
    if !rendered.is_empty() {
        writeln!(out, "{rendered}")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found() -> Vec<InstrumentInfo> {
        vec![
            InstrumentInfo {
                address: "GPIB0::5::INSTR".to_string(),
                identity: Some("KEITHLEY INSTRUMENTS INC.,MODEL 2000".to_string()),
            },
            InstrumentInfo {
                address: "GPIB0::22::INSTR".to_string(),
                identity: None,
            },
        ]
    }

    #[test]
    fn json_listing_keeps_missing_identity_as_null() {
        let rendered = render_instruments("visa", &found(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["backend"], "visa");
        assert_eq!(value["count"], 2);
        assert_eq!(value["instruments"][0]["address"], "GPIB0::5::INSTR");
        assert!(value["instruments"][1]["identity"].is_null());
    }

    #[test]
    fn pretty_listing_is_one_line_per_instrument() {
        let rendered = render_instruments("ni488", &found(), OutputFormat::Pretty);
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("GPIB0::5::INSTR: KEITHLEY"));
        assert_eq!(lines[1], "GPIB0::22::INSTR: <no response>");
    }

    #[test]
    fn table_listing_names_every_address() {
        let rendered = render_instruments("ni488", &found(), OutputFormat::Table);
        assert!(rendered.contains("ADDRESS"));
        assert!(rendered.contains("GPIB0::22::INSTR"));
    }
}
