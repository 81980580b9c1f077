//! Cleanup target loading.
//!
//! Targets are declared in an XML document:
//!
//! ```xml
//! <Targets>
//!   <Target Name="Temp">
//!     <Path Days="7">%TEMP%</Path>
//!   </Target>
//! </Targets>
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use tracing::{debug, warn};

use profilekit_core::{CleanupTarget, ConfigError, TargetPath};

use crate::OpsError;

/// A source of cleanup targets.
pub trait TargetSource {
    /// Load every declared target.
    fn load_targets(&self) -> Result<Vec<CleanupTarget>, OpsError>;
}

impl TargetSource for Vec<CleanupTarget> {
    fn load_targets(&self) -> Result<Vec<CleanupTarget>, OpsError> {
        Ok(self.clone())
    }
}

/// Cleanup targets read from an XML file.
#[derive(Debug, Clone)]
pub struct XmlTargetFile {
    path: PathBuf,
}

impl XmlTargetFile {
    /// Targets from the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse targets from an XML string. `origin` names the document in errors.
    pub fn parse(xml: &str, origin: &Path) -> Result<Vec<CleanupTarget>, ConfigError> {
        let parse_err = |message: String| ConfigError::TargetParse {
            path: origin.to_path_buf(),
            message,
        };

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut targets = Vec::new();
        let mut current_target: Option<CleanupTarget> = None;
        let mut current_path: Option<(u64, String)> = None;

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| parse_err(format!("{e} at byte {position}")))?;

            match event {
                XmlEvent::Start(ref e) | XmlEvent::Empty(ref e) => {
                    let is_empty = matches!(&event, XmlEvent::Empty(_));
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let attrs = parse_attrs(e);

                    if tag.eq_ignore_ascii_case("Target") {
                        if current_target.is_some() {
                            return Err(parse_err(format!("nested <Target> at byte {position}")));
                        }
                        let name = attrs.get("name").cloned().unwrap_or_default();
                        let target = CleanupTarget::new(name);
                        if is_empty {
                            debug!(target = %target.name, "target declares no paths");
                            targets.push(target);
                        } else {
                            current_target = Some(target);
                        }
                    } else if tag.eq_ignore_ascii_case("Path") {
                        if current_target.is_none() {
                            let message = format!("<Path> outside <Target> at byte {position}");
                            return Err(parse_err(message));
                        }
                        let days = parse_days(attrs.get("days"))
                            .map_err(|msg| parse_err(format!("{msg} at byte {position}")))?;
                        if is_empty {
                            warn!("ignoring empty <Path> at byte {position}");
                        } else {
                            current_path = Some((days, String::new()));
                        }
                    }
                }
                XmlEvent::Text(ref t) => {
                    if let Some((_, text)) = current_path.as_mut() {
                        let value = t
                            .unescape()
                            .map_err(|e| parse_err(format!("{e} at byte {position}")))?;
                        text.push_str(&value);
                    }
                }
                XmlEvent::CData(ref t) => {
                    if let Some((_, text)) = current_path.as_mut() {
                        text.push_str(&String::from_utf8_lossy(t));
                    }
                }
                XmlEvent::End(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if tag.eq_ignore_ascii_case("Path") {
                        if let Some((max_age_days, path)) = current_path.take() {
                            let path = path.trim().to_string();
                            match current_target.as_mut() {
                                Some(target) if !path.is_empty() => {
                                    target.paths.push(TargetPath { path, max_age_days });
                                }
                                Some(_) => warn!("ignoring empty <Path> at byte {position}"),
                                None => {}
                            }
                        }
                    } else if tag.eq_ignore_ascii_case("Target") {
                        if let Some(target) = current_target.take() {
                            targets.push(target);
                        }
                    }
                }
                XmlEvent::Eof => break,
                _ => {}
            }
        }

        if current_target.is_some() {
            return Err(parse_err("unexpected end of document inside <Target>".to_string()));
        }
        Ok(targets)
    }
}

impl TargetSource for XmlTargetFile {
    fn load_targets(&self) -> Result<Vec<CleanupTarget>, OpsError> {
        let xml = fs::read_to_string(&self.path).map_err(|source| ConfigError::TargetRead {
            path: self.path.clone(),
            source,
        })?;
        let targets = Self::parse(&xml, &self.path)?;
        debug!(path = %self.path.display(), targets = targets.len(), "targets loaded");
        Ok(targets)
    }
}

/// Attributes keyed by lowercased name.
fn parse_attrs(e: &BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in e.attributes().filter_map(Result::ok) {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
        attrs.insert(key, value);
    }
    attrs
}

fn parse_days(value: Option<&String>) -> Result<u64, String> {
    let value = value.ok_or_else(|| "<Path> is missing the Days attribute".to_string())?;
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid Days value {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Targets>
  <Target Name="Temp">
    <Path Days="7">%TEMP%</Path>
  </Target>
  <Target Name="Teams">
    <Path Days="14">%AppData%\Microsoft\Teams\Cache</Path>
    <Path days="30">%LocalAppData%\Microsoft\Teams &amp; Logs</Path>
  </Target>
</Targets>"#;

    #[test]
    fn test_parse_targets() {
        let targets = XmlTargetFile::parse(SAMPLE, Path::new("targets.xml")).unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], CleanupTarget::new("Temp").with_path("%TEMP%", 7));
        assert_eq!(targets[1].name, "Teams");
        assert_eq!(targets[1].paths.len(), 2);
        assert_eq!(targets[1].paths[1].path, r"%LocalAppData%\Microsoft\Teams & Logs");
        assert_eq!(targets[1].paths[1].max_age_days, 30);
    }

    #[test]
    fn test_missing_days_is_error() {
        let xml = r#"<Targets><Target Name="x"><Path>%TEMP%</Path></Target></Targets>"#;
        let err = XmlTargetFile::parse(xml, Path::new("bad.xml")).unwrap_err();
        assert!(matches!(err, ConfigError::TargetParse { .. }));
        assert!(err.to_string().contains("bad.xml"));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let xml = r#"<Targets><Target Name="x"><Path Days="1">a</Target></Targets>"#;
        assert!(XmlTargetFile::parse(xml, Path::new("bad.xml")).is_err());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let source = XmlTargetFile::new(temp.path().join("nope.xml"));
        let err = source.load_targets().unwrap_err();
        assert!(matches!(err, OpsError::Config(ConfigError::TargetRead { .. })));
    }
}
