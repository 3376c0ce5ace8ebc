//! Response parsing for shell output.
//!
//! Position reports are single comma-separated lines:
//! - Listener view (many tags): `POS,<unused>,<tag>,<x>,<y>,<z>,<quality>,<unused>`
//! - Self view (current firmware): `POS,<x>,<y>,<z>,<quality>`
//! - Self view (legacy firmware): `<x>,<y>,<z>,<quality>`
//!
//! System information is a multi-line block terminated by the shell prompt.
//!
//! Every parser checks field count first, then the discriminator, then the
//! numbers, so a short line never reports a numeric error.

use crate::codec::SHELL_PROMPT;
use crate::error::{ParseError, ProtocolResult};
use crate::types::{Position, SystemInfo, TagId};

/// Discriminator that leads every position report.
pub const POSITION_REPORT_TAG: &str = "POS";

/// Field count of a listener position report.
pub const LISTENER_REPORT_FIELDS: usize = 8;

/// Marker preceding the UWB address in `si` output.
pub const ADDRESS_MARKER: &str = "addr=";

/// Marker preceding the node label in `si` output.
pub const LABEL_MARKER: &str = "label=";

/// Minimum number of content lines in an `si` block (address line and label line).
pub const SYSTEM_INFO_MIN_LINES: usize = 2;

/// Shape of the self-position report emitted by a tag.
///
/// Firmware revisions disagree on this, so the shape is chosen explicitly
/// rather than guessed per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfReportFormat {
    /// `POS,<x>,<y>,<z>,<quality>`
    #[default]
    Current,
    /// `<x>,<y>,<z>,<quality>` with no discriminator.
    Legacy,
}

impl SelfReportFormat {
    /// Number of comma-separated fields in this report shape.
    pub fn field_count(&self) -> usize {
        match self {
            SelfReportFormat::Current => 5,
            SelfReportFormat::Legacy => 4,
        }
    }
}

/// Parse a listener report into the plain tag code and its position.
pub fn parse_listener_report(line: &str) -> ProtocolResult<(TagId, Position)> {
    let fields = split_fields(line);
    expect_field_count(&fields, LISTENER_REPORT_FIELDS)?;
    expect_discriminator(fields[0])?;

    let tag = TagId::new(fields[2].trim())?;
    let position = parse_position(&fields[3..7])?;
    Ok((tag, position))
}

/// Parse a listener report, presenting the tag with its `DW` prefix.
pub fn parse_passive_tag_report(line: &str) -> ProtocolResult<(TagId, Position)> {
    let (tag, position) = parse_listener_report(line)?;
    Ok((tag.prefixed(), position))
}

/// Parse a tag's report of its own position.
pub fn parse_self_report(line: &str, format: SelfReportFormat) -> ProtocolResult<Position> {
    let fields = split_fields(line);
    expect_field_count(&fields, format.field_count())?;

    match format {
        SelfReportFormat::Current => {
            expect_discriminator(fields[0])?;
            parse_position(&fields[1..5])
        }
        SelfReportFormat::Legacy => parse_position(&fields[0..4]),
    }
}

impl SystemInfo {
    /// Parse the content of an `si` block (echo and prompt already removed).
    ///
    /// The address is taken from the first line carrying `addr=`; the module
    /// prints its UWB address before its BLE address. The module drops the
    /// leading `0` of the address (`x1A2B` rather than `0x1A2B`), so a literal
    /// `0` is put back in front of whatever follows the marker. This is a
    /// fixed correction for that firmware quirk, applied unconditionally.
    pub fn parse(block: &str) -> ProtocolResult<SystemInfo> {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if lines.len() < SYSTEM_INFO_MIN_LINES {
            return Err(ParseError::MalformedBlock(format!(
                "expected at least {} lines, got {}",
                SYSTEM_INFO_MIN_LINES,
                lines.len()
            )));
        }

        let address = marker_value(&lines, ADDRESS_MARKER)?;
        if address.is_empty() {
            return Err(ParseError::MalformedBlock("empty address".to_string()));
        }
        let label = marker_value(&lines, LABEL_MARKER)?;

        Ok(SystemInfo {
            uwb_address: format!("0{}", address),
            label: label.to_string(),
        })
    }
}

/// Remove the echoed command and the trailing prompt from a raw block.
pub fn strip_prompt_block(raw: &str, command: &str) -> String {
    let prompt = String::from_utf8_lossy(SHELL_PROMPT);
    let prompt_trimmed = prompt.trim_end();
    let body = raw.trim_end();
    let body = body.strip_suffix(prompt_trimmed).unwrap_or(body);

    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| {
            let unprompted = l.strip_prefix(prompt_trimmed).map(str::trim).unwrap_or(l);
            unprompted != command && !unprompted.is_empty()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode raw module bytes as text.
pub fn decode_text(raw: &[u8]) -> ProtocolResult<&str> {
    std::str::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8)
}

fn split_fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split(',').collect()
}

fn expect_field_count(fields: &[&str], expected: usize) -> ProtocolResult<()> {
    if fields.len() != expected {
        return Err(ParseError::UnexpectedLength {
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

fn expect_discriminator(field: &str) -> ProtocolResult<()> {
    if field.trim() != POSITION_REPORT_TAG {
        return Err(ParseError::WrongDiscriminator(field.to_string()));
    }
    Ok(())
}

/// Parse `x, y, z, quality` from exactly four fields.
fn parse_position(fields: &[&str]) -> ProtocolResult<Position> {
    let x_m = parse_coordinate("x", fields[0])?;
    let y_m = parse_coordinate("y", fields[1])?;
    let z_m = parse_coordinate("z", fields[2])?;
    let quality = fields[3]
        .trim()
        .parse::<u8>()
        .map_err(|_| ParseError::MalformedNumber {
            field: "quality",
            value: fields[3].to_string(),
        })?;

    Ok(Position::new(x_m, y_m, z_m, quality))
}

fn parse_coordinate(field: &'static str, value: &str) -> ProtocolResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::MalformedNumber {
            field,
            value: value.to_string(),
        }),
    }
}

fn marker_value<'a>(lines: &[&'a str], marker: &str) -> ProtocolResult<&'a str> {
    let line: &'a str = lines
        .iter()
        .copied()
        .find(|l| l.contains(marker))
        .ok_or_else(|| ParseError::MalformedBlock(format!("no line containing {:?}", marker)))?;

    let start = line.find(marker).map(|i| i + marker.len()).unwrap_or(line.len());
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(rest.len());
    Ok(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SI_BLOCK: &str = "[000012.340 INF] sys: fw2 fw_ver=x01030001 cfg_ver=x00010700\n\
        [000012.340 INF] uwb0: panid=x0001 addr=x1A2B\n\
        [000012.350 INF] mode: tn (act,twr,np,nole)\n\
        [000012.350 INF] ble: addr=D6:8C:E8:B5:EE:B0\n\
        [000012.360 INF] cfg: sync=0 fwup=0 ble=1 leds=1 init=0 upd_rate_stat=120 label=DW1A2B";

    #[test]
    fn test_parse_listener_report() {
        let (tag, position) = parse_listener_report("POS,1,TEST1,1.23,4.56,7.89,20,86").unwrap();
        assert_eq!(tag.as_str(), "TEST1");
        assert!(position.approx_eq(&Position::new(1.23, 4.56, 7.89, 20)));
    }

    #[test]
    fn test_parse_listener_report_with_line_ending() {
        let (tag, _) = parse_listener_report("POS,0,0C9A,0.50,1.00,0.00,99,x04\r\n").unwrap();
        assert_eq!(tag.as_str(), "0C9A");
    }

    #[test]
    fn test_parse_listener_report_short() {
        let err = parse_listener_report("POS,1,TEST1,1.23,4.56,7.89").unwrap_err();
        assert_eq!(err, ParseError::UnexpectedLength { expected: 8, actual: 6 });
    }

    #[test]
    fn test_parse_listener_report_length_checked_before_numbers() {
        let err = parse_listener_report("POS,1,TEST1,a,b,c,d,e,f").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedLength { .. }));
    }

    #[test]
    fn test_parse_listener_report_wrong_header() {
        let err = parse_listener_report("BAD,1,TEST1,1.23,4.56,7.89,20,86").unwrap_err();
        assert_eq!(err, ParseError::WrongDiscriminator("BAD".to_string()));
    }

    #[test]
    fn test_parse_listener_report_bad_number() {
        let err = parse_listener_report("POS,1,TEST1,1.23,oops,7.89,20,86").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedNumber { field: "y", value: "oops".to_string() }
        );
    }

    #[test]
    fn test_parse_listener_report_rejects_negative_quality() {
        let err = parse_listener_report("POS,1,TEST1,1.23,4.56,7.89,-1,86").unwrap_err();
        assert!(matches!(err, ParseError::MalformedNumber { field: "quality", .. }));
    }

    #[test]
    fn test_parse_listener_report_rejects_empty_tag() {
        let err = parse_listener_report("POS,1,,1.23,4.56,7.89,20,86").unwrap_err();
        assert_eq!(err, ParseError::EmptyIdentifier);
    }

    #[test]
    fn test_parse_passive_tag_report() {
        let (tag, position) = parse_passive_tag_report("POS,1,TEST1,1.23,4.56,7.89,20,86").unwrap();
        assert_eq!(tag.as_str(), "DWTEST1");
        assert!(position.approx_eq(&Position::new(1.23, 4.56, 7.89, 20)));
    }

    #[test]
    fn test_parse_self_report_current() {
        let position = parse_self_report("POS,1.23,4.56,7.89,20", SelfReportFormat::Current).unwrap();
        assert!(position.approx_eq(&Position::new(1.23, 4.56, 7.89, 20)));
    }

    #[test]
    fn test_parse_self_report_current_wrong_length() {
        let err = parse_self_report("POS,1.23,4.56,7.89", SelfReportFormat::Current).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedLength { expected: 5, actual: 4 });
    }

    #[test]
    fn test_parse_self_report_current_wrong_header() {
        let err = parse_self_report("BAD,1.23,4.56,7.89,20", SelfReportFormat::Current).unwrap_err();
        assert!(matches!(err, ParseError::WrongDiscriminator(_)));
    }

    #[test]
    fn test_parse_self_report_legacy() {
        let position = parse_self_report("1.23,4.56,7.89,20", SelfReportFormat::Legacy).unwrap();
        assert!(position.approx_eq(&Position::new(1.23, 4.56, 7.89, 20)));
    }

    #[test]
    fn test_parse_self_report_legacy_does_not_accept_current_shape() {
        let err = parse_self_report("POS,1.23,4.56,7.89,20", SelfReportFormat::Legacy).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedLength { expected: 4, actual: 5 });
    }

    #[test]
    fn test_parse_self_report_rejects_non_finite() {
        let err = parse_self_report("POS,inf,4.56,7.89,20", SelfReportFormat::Current).unwrap_err();
        assert!(matches!(err, ParseError::MalformedNumber { field: "x", .. }));
    }

    #[test]
    fn test_parse_system_info() {
        let info = SystemInfo::parse(SI_BLOCK).unwrap();
        assert_eq!(info.uwb_address, "0x1A2B");
        assert_eq!(info.label, "DW1A2B");
    }

    #[test]
    fn test_parse_system_info_prepends_zero() {
        let info = SystemInfo::parse("uwb0: addr=1A2B\ncfg: label=node").unwrap();
        assert_eq!(info.uwb_address, "01A2B");
        assert_eq!(info.label, "node");
    }

    #[test]
    fn test_parse_system_info_missing_label() {
        let err = SystemInfo::parse("uwb0: addr=1A2B\nmode: tn").unwrap_err();
        assert!(matches!(err, ParseError::MalformedBlock(_)));
    }

    #[test]
    fn test_parse_system_info_too_short() {
        let err = SystemInfo::parse("uwb0: addr=1A2B label=x").unwrap_err();
        assert!(matches!(err, ParseError::MalformedBlock(_)));
    }

    #[test]
    fn test_strip_prompt_block() {
        let raw = "si\r\nline one\r\nline two\r\ndwm> ";
        assert_eq!(strip_prompt_block(raw, "si"), "line one\nline two");
    }

    #[test]
    fn test_strip_prompt_block_with_prompted_echo() {
        let raw = "dwm> si\r\n\r\nline one\r\ndwm> ";
        assert_eq!(strip_prompt_block(raw, "si"), "line one");
    }

    #[test]
    fn test_decode_text_rejects_invalid_utf8() {
        assert_eq!(decode_text(&[0xFF, 0xFE]), Err(ParseError::InvalidUtf8));
    }
}
