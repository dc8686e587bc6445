use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use tally_core::TallyError;
use tracing::debug;

/// Aggregate coverage read from the report root.
///
/// Rates are the attribute values as written by the coverage tool, clamped
/// to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub line_rate: f64,
    pub branch_rate: f64,
    pub lines_valid: u64,
    pub lines_covered: u64,
    /// Every `package` element in document order.
    pub packages: Vec<PackageCoverage>,
}

/// Line coverage of one package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageCoverage {
    pub name: String,
    pub line_rate: f64,
}

/// Read and parse a coverage XML file.
///
/// # Errors
///
/// Returns [`TallyError::FileNotFound`] if `path` does not exist,
/// [`TallyError::Io`] if it cannot be read, or [`TallyError::Parse`] if the
/// content is not UTF-8 or not a usable coverage report.
pub fn read_report(path: &Path) -> Result<CoverageReport, TallyError> {
    if !path.exists() {
        return Err(TallyError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let xml = String::from_utf8(bytes)
        .map_err(|e| TallyError::Parse(format!("coverage XML is not valid UTF-8: {e}")))?;
    let report = parse_report(&xml)?;
    debug!(
        path = %path.display(),
        packages = report.packages.len(),
        "parsed coverage report"
    );
    Ok(report)
}

/// Parse coverage XML from a string.
///
/// The first element is the report root. `line-rate` is required there;
/// `branch-rate`, `lines-valid` and `lines-covered` default to 0. Every
/// descendant `package` element is collected, whatever its depth.
///
/// # Errors
///
/// Returns [`TallyError::Parse`] on malformed XML, a missing root, a missing
/// root `line-rate`, or numeric attributes that do not parse.
///
/// # Examples
///
/// ```
/// use tally_coverage::parse_report;
///
/// let xml = r#"<coverage line-rate="0.5" lines-valid="10" lines-covered="5">
///   <packages><package name="app" line-rate="0.5"/></packages>
/// </coverage>"#;
/// let report = parse_report(xml).unwrap();
/// assert_eq!(report.lines_valid, 10);
/// assert_eq!(report.packages[0].name, "app");
/// ```
pub fn parse_report(xml: &str) -> Result<CoverageReport, TallyError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut report: Option<CoverageReport> = None;
    loop {
        let event = reader.read_event().map_err(|e| {
            TallyError::Parse(format!(
                "invalid XML at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match report.as_mut() {
                None => report = Some(read_root(e)?),
                Some(r) if e.local_name().as_ref() == b"package" => {
                    r.packages.push(read_package(e)?);
                }
                Some(_) => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    report.ok_or_else(|| TallyError::Parse("coverage XML has no root element".into()))
}

fn read_root(e: &BytesStart<'_>) -> Result<CoverageReport, TallyError> {
    let line_rate = attr(e, "line-rate")?
        .ok_or_else(|| TallyError::Parse("root element has no line-rate attribute".into()))?;
    Ok(CoverageReport {
        line_rate: parse_rate("line-rate", &line_rate)?,
        branch_rate: attr(e, "branch-rate")?
            .map(|v| parse_rate("branch-rate", &v))
            .transpose()?
            .unwrap_or(0.0),
        lines_valid: parse_count(e, "lines-valid")?,
        lines_covered: parse_count(e, "lines-covered")?,
        packages: Vec::new(),
    })
}

fn read_package(e: &BytesStart<'_>) -> Result<PackageCoverage, TallyError> {
    let name = attr(e, "name")?.unwrap_or_default();
    let line_rate = attr(e, "line-rate")?
        .map(|v| parse_rate("package line-rate", &v))
        .transpose()?
        .unwrap_or(0.0);
    Ok(PackageCoverage { name, line_rate })
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, TallyError> {
    for a in e.attributes() {
        let a = a.map_err(|err| TallyError::Parse(format!("bad attribute: {err}")))?;
        if a.key.as_ref() == name.as_bytes() {
            let value = a
                .unescape_value()
                .map_err(|err| TallyError::Parse(format!("bad value for {name}: {err}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_rate(name: &str, raw: &str) -> Result<f64, TallyError> {
    let rate: f64 = raw
        .trim()
        .parse()
        .map_err(|_| TallyError::Parse(format!("{name} is not a number: '{raw}'")))?;
    if rate.is_nan() {
        return Err(TallyError::Parse(format!("{name} is not a number: '{raw}'")));
    }
    Ok(rate.clamp(0.0, 1.0))
}

fn parse_count(e: &BytesStart<'_>, name: &str) -> Result<u64, TallyError> {
    match attr(e, name)? {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TallyError::Parse(format!("{name} is not a count: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COBERTURA: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
<coverage version="7.4.0" timestamp="1700000000000" lines-valid="1000" lines-covered="842"
          line-rate="0.8421" branches-covered="30" branches-valid="40" branch-rate="0.75" complexity="0">
    <!-- Generated by coverage.py -->
    <sources><source>/work/app</source></sources>
    <packages>
        <package name="pkg.a" line-rate="0.5" branch-rate="0" complexity="0">
            <classes>
                <class name="a.py" filename="pkg/a.py" line-rate="0.5">
                    <lines><line number="1" hits="1"/><line number="2" hits="0"/></lines>
                </class>
            </classes>
        </package>
        <package name="pkg.b" line-rate="1" branch-rate="1" complexity="0"/>
    </packages>
</coverage>
"#;

    #[test]
    fn parses_root_and_packages() {
        let report = parse_report(COBERTURA).unwrap();
        assert!((report.line_rate - 0.8421).abs() < 1e-9);
        assert!((report.branch_rate - 0.75).abs() < 1e-9);
        assert_eq!(report.lines_valid, 1000);
        assert_eq!(report.lines_covered, 842);
        assert_eq!(
            report.packages,
            vec![
                PackageCoverage {
                    name: "pkg.a".into(),
                    line_rate: 0.5
                },
                PackageCoverage {
                    name: "pkg.b".into(),
                    line_rate: 1.0
                },
            ]
        );
    }

    #[test]
    fn branch_rate_and_counts_default_to_zero() {
        let report = parse_report(r#"<coverage line-rate="0.9"/>"#).unwrap();
        assert_eq!(report.branch_rate, 0.0);
        assert_eq!(report.lines_valid, 0);
        assert_eq!(report.lines_covered, 0);
        assert!(report.packages.is_empty());
    }

    #[test]
    fn missing_line_rate_is_an_error() {
        let err = parse_report(r#"<coverage lines-valid="3"/>"#).unwrap_err();
        assert!(err.to_string().contains("line-rate"));
    }

    #[test]
    fn non_numeric_attributes_are_errors() {
        assert!(parse_report(r#"<coverage line-rate="high"/>"#).is_err());
        assert!(parse_report(r#"<coverage line-rate="0.5" lines-valid="-4"/>"#).is_err());
        assert!(parse_report(r#"<coverage line-rate="NaN"/>"#).is_err());
    }

    #[test]
    fn out_of_range_rates_are_clamped() {
        let xml = r#"<coverage line-rate="1.2"><package name="x" line-rate="-0.1"/></coverage>"#;
        let report = parse_report(xml).unwrap();
        assert_eq!(report.line_rate, 1.0);
        assert_eq!(report.packages[0].line_rate, 0.0);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = parse_report(r#"<coverage line-rate="0.5"><packages></coverage>"#).unwrap_err();
        assert!(matches!(err, TallyError::Parse(_)));
        assert!(parse_report("").is_err());
    }

    #[test]
    fn read_missing_file_is_file_not_found() {
        let err = read_report(Path::new("/definitely/not/here/coverage.xml")).unwrap_err();
        assert!(matches!(err, TallyError::FileNotFound(_)));
    }
}
