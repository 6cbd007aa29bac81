use std::collections::BTreeMap;
use std::error::Error as _;

use anyhow::{Result, bail};
use smtp_identity::CheckResult;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub check: &'static str,
    pub status: &'static str,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub skipped: Option<&'static str>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub reply: Option<String>,
    pub quarantine: bool,
    pub reject: bool,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub causes: Vec<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "BTreeMap::is_empty"))]
    pub fields: BTreeMap<String, String>,
}

impl OutputRow {
    pub fn new(check: &'static str, result: &CheckResult) -> Self {
        let status = match (&result.reason, result.skipped) {
            (Some(_), _) => "fail",
            (None, Some(_)) => "skipped",
            (None, None) => "pass",
        };

        let mut causes = Vec::new();
        let mut source = result.reason.as_ref().and_then(|r| r.source());
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }

        Self {
            check,
            status,
            skipped: result.skipped,
            reply: result.reason.as_ref().map(ToString::to_string),
            quarantine: result.quarantine,
            reject: result.reject,
            causes,
            fields: result
                .reason
                .as_ref()
                .map(|r| r.fields())
                .unwrap_or_default(),
        }
    }

    pub fn failed(&self) -> bool {
        self.status == "fail"
    }

    fn action(&self) -> &'static str {
        if self.reject {
            "reject"
        } else if self.quarantine {
            "quarantine"
        } else {
            "log only"
        }
    }
}

pub fn write_report(rows: &[OutputRow], format: &str) -> Result<()> {
    match format {
        "human" => {
            write_human(rows);
            Ok(())
        }
        "json" => write_json(rows),
        other => bail!("unknown --format '{other}', use: human|json"),
    }
}

pub fn any_failed(rows: &[OutputRow]) -> bool {
    rows.iter().any(OutputRow::failed)
}

fn write_human(rows: &[OutputRow]) {
    for row in rows {
        match (row.status, &row.reply) {
            ("fail", Some(reply)) => {
                println!("[FAIL]  {} :: {} ({})", row.check, reply, row.action());
                for cause in &row.causes {
                    println!("        cause: {cause}");
                }
            }
            ("skipped", _) => {
                println!("[SKIP]  {} :: {}", row.check, row.skipped.unwrap_or(""));
            }
            _ => println!("[OK]    {}", row.check),
        }
    }
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_rows: &[OutputRow]) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}
