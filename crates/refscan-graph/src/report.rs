use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use refscan_core::{RefScanError, Result};
use tracing::info;

const MISSING_PREFAB: &str = "Missing prefab ";
const MISSING_COMPONENT: &str = "Missing Component in GameObject ";
const MISSING_REFERENCE: &str = "Missing Reference in GameObject ";

/// A report line split back into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    MissingTemplate {
        template_label: String,
        node_name: String,
    },
    MissingAttachment {
        asset_path: String,
        full_path: String,
        root_asset_path: String,
    },
    MissingFieldReference {
        asset_path: String,
        full_path: String,
        attachment_type: String,
        field_name: String,
        root_asset_path: String,
    },
}

impl ReportLine {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (first, rest) = line
            .split_once('\t')
            .ok_or_else(|| parse_error(line, "no tab separator"))?;

        if let Some(name) = rest.strip_prefix(MISSING_PREFAB) {
            let node_name = name
                .strip_suffix('\t')
                .ok_or_else(|| parse_error(line, "missing trailing tab"))?;
            return Ok(ReportLine::MissingTemplate {
                template_label: first.to_string(),
                node_name: node_name.to_string(),
            });
        }

        if let Some(body) = rest.strip_prefix(MISSING_COMPONENT) {
            let (full_path, root_asset_path) = split_root_asset(body, first)
                .ok_or_else(|| parse_error(line, "missing root asset path"))?;
            return Ok(ReportLine::MissingAttachment {
                asset_path: first.to_string(),
                full_path: full_path.to_string(),
                root_asset_path: root_asset_path.to_string(),
            });
        }

        if let Some(body) = rest.strip_prefix(MISSING_REFERENCE) {
            let (head, root_asset_path) = split_root_asset(body, first)
                .ok_or_else(|| parse_error(line, "missing root asset path"))?;
            let (head, field_name) = head
                .rsplit_once(", Property: ")
                .ok_or_else(|| parse_error(line, "missing property"))?;
            let (full_path, attachment_type) = head
                .rsplit_once(" Component: ")
                .ok_or_else(|| parse_error(line, "missing component"))?;
            return Ok(ReportLine::MissingFieldReference {
                asset_path: first.to_string(),
                full_path: full_path.to_string(),
                attachment_type: attachment_type.to_string(),
                field_name: field_name.to_string(),
                root_asset_path: root_asset_path.to_string(),
            });
        }

        Err(parse_error(line, "unknown record kind"))
    }
}

impl FromStr for ReportLine {
    type Err = RefScanError;

    fn from_str(s: &str) -> Result<Self> {
        ReportLine::parse(s)
    }
}

/// Splits `<head> in <root asset path>`. The root asset path usually equals
/// the node's own asset path, which may itself contain " in ".
fn split_root_asset<'a>(body: &'a str, asset_path: &'a str) -> Option<(&'a str, &'a str)> {
    if let Some(head) = body
        .strip_suffix(asset_path)
        .and_then(|rest| rest.strip_suffix(" in "))
    {
        return Some((head, asset_path));
    }
    body.rsplit_once(" in ")
}

fn parse_error(line: &str, reason: &str) -> RefScanError {
    RefScanError::Parse(format!("{}: {:?}", reason, line))
}

/// Writes one message per line, UTF-8, replacing any existing file.
pub fn write_report(path: &Path, messages: &[String]) -> Result<()> {
    info!("Writing summary of errors to {}", path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    for msg in messages {
        writeln!(writer, "{}", msg)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses every non-empty line of a report.
pub fn parse_report(text: &str) -> Result<Vec<ReportLine>> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(ReportLine::parse)
        .collect()
}
