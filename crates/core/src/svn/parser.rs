//! Parsers for `svn` command output.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::SvnError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SvnInfo {
    pub url: String,
    pub root_url: String,
    pub uuid: String,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SvnLogEntry {
    pub revision: u64,
    pub author: String,
    pub date: String,
    pub message: String,
}

pub fn parse_svn_info(xml: &str) -> Result<SvnInfo, SvnError> {
    debug!("parsing svn info XML ({} bytes)", xml.len());
    let url = extract_tag_content(xml, "url")
        .ok_or_else(|| SvnError::XmlParseError("missing <url> in svn info".into()))?;
    let root_url = extract_tag_content(xml, "root")
        .ok_or_else(|| SvnError::XmlParseError("missing <root> in svn info".into()))?;
    let uuid = extract_tag_content(xml, "uuid")
        .ok_or_else(|| SvnError::XmlParseError("missing <uuid> in svn info".into()))?;
    let revision = extract_attribute(xml, "entry", "revision")
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| SvnError::XmlParseError("missing revision in svn info".into()))?;
    Ok(SvnInfo {
        url,
        root_url,
        uuid,
        revision,
    })
}

pub fn parse_svn_log(xml: &str) -> Result<Vec<SvnLogEntry>, SvnError> {
    debug!("parsing svn log XML ({} bytes)", xml.len());
    if !xml.trim().is_empty() && !xml.contains("<log") {
        return Err(SvnError::XmlParseError("missing <log> in svn log".into()));
    }
    let mut entries = Vec::new();
    for part in xml.split("<logentry").skip(1) {
        let entry_xml = match part.find("</logentry>") {
            Some(pos) => &part[..pos],
            None => part,
        };
        let open_tag_end = entry_xml.find('>').unwrap_or(entry_xml.len());
        let revision = match extract_attr_from_str(&entry_xml[..open_tag_end], "revision")
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(rev) => rev,
            None => {
                warn!("skipping SVN log entry with missing or unparseable revision attribute");
                continue;
            }
        };
        entries.push(SvnLogEntry {
            revision,
            author: extract_tag_content(entry_xml, "author").unwrap_or_default(),
            date: extract_tag_content(entry_xml, "date").unwrap_or_default(),
            message: extract_tag_content(entry_xml, "msg").unwrap_or_default(),
        });
    }
    debug!(count = entries.len(), "parsed svn log entries");
    Ok(entries)
}

/// Parse `svn mergeinfo --show-revs eligible` output (`r123` per line).
///
/// Lines that are not revisions are skipped. A trailing `*` (non-inheritable
/// range marker) is tolerated.
pub fn parse_eligible_revisions(output: &str) -> Vec<u64> {
    let mut revisions = Vec::new();
    for line in output.lines() {
        let token = line.trim().trim_end_matches('*');
        let Some(digits) = token.strip_prefix('r') else {
            continue;
        };
        match digits.parse::<u64>() {
            Ok(rev) if rev > 0 => revisions.push(rev),
            _ => warn!(line, "skipping unparseable mergeinfo line"),
        }
    }
    revisions
}

/// Extract the revision from `svn commit` output (`Committed revision N.`).
pub fn parse_committed_revision(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Committed revision")
            .and_then(|rest| rest.trim().trim_end_matches('.').parse::<u64>().ok())
    })
}

fn extract_tag_content(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut search_from = 0;
    while let Some(rel_pos) = xml[search_from..].find(&open) {
        let start_pos = search_from + rel_pos;
        let after_open = &xml[start_pos + open.len()..];
        // Next char must be '>' or whitespace, or this is a longer tag name.
        if let Some(ch) = after_open.chars().next() {
            if ch != '>' && !ch.is_ascii_whitespace() {
                search_from = start_pos + open.len();
                continue;
            }
        }
        let content_start = after_open.find('>')? + 1;
        let content = &after_open[content_start..];
        let end_pos = content.find(&close)?;
        return Some(xml_unescape(content[..end_pos].trim()));
    }
    None
}

/// Unescape standard XML entities.
fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let open = format!("<{} ", tag);
    let start_pos = xml.find(&open)?;
    let after_tag = &xml[start_pos + open.len()..];
    let tag_end = after_tag.find('>')?;
    extract_attr_from_str(&after_tag[..tag_end], attr)
}

fn extract_attr_from_str(s: &str, attr: &str) -> Option<String> {
    for quote in ['"', '\''] {
        let pattern = format!("{}={}", attr, quote);
        if let Some(pos) = s.find(&pattern) {
            let after = &s[pos + pattern.len()..];
            let end = after.find(quote)?;
            return Some(after[..end].to_string());
        }
    }
    None
}
