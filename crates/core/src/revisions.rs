//! Revision list parsing and compact range formatting.

use std::collections::HashSet;

use crate::errors::RevisionSpecError;

/// Widest range accepted in a revision list.
pub const MAX_RANGE_LEN: u64 = 100_000;

fn parse_one(token: &str) -> Result<u64, RevisionSpecError> {
    let digits = token.trim().trim_start_matches(['r', 'R']);
    let rev = digits
        .parse::<u64>()
        .map_err(|_| RevisionSpecError::InvalidRevision(token.trim().to_string()))?;
    if rev == 0 {
        return Err(RevisionSpecError::Zero(token.trim().to_string()));
    }
    Ok(rev)
}

/// Parse a comma-separated revision list such as `1,3-5, r10`.
///
/// Ranges `A-B` are inclusive and expanded in ascending order. The result
/// keeps the order the user wrote, with later duplicates dropped.
pub fn parse_revision_list(spec: &str) -> Result<Vec<u64>, RevisionSpecError> {
    let mut revisions = Vec::new();
    let mut seen = HashSet::new();

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => {
                let (a, b) = (parse_one(a)?, parse_one(b)?);
                if a > b {
                    return Err(RevisionSpecError::ReversedRange(part.to_string()));
                }
                if b - a >= MAX_RANGE_LEN {
                    return Err(RevisionSpecError::RangeTooLarge {
                        range: part.to_string(),
                        max: MAX_RANGE_LEN,
                    });
                }
                (a, b)
            }
            None => {
                let rev = parse_one(part)?;
                (rev, rev)
            }
        };
        for rev in start..=end {
            if seen.insert(rev) {
                revisions.push(rev);
            }
        }
    }

    if revisions.is_empty() {
        return Err(RevisionSpecError::Empty);
    }
    Ok(revisions)
}

/// Format revisions as sorted, de-duplicated runs: `[1,2,3,5,6,10]` becomes
/// `"1-3, 5-6, 10"`.
pub fn compress_ranges(revisions: &[u64]) -> String {
    let mut sorted = revisions.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let (mut start, mut prev) = (first, first);
    for rev in iter {
        if rev == prev + 1 {
            prev = rev;
            continue;
        }
        parts.push(format_run(start, prev));
        start = rev;
        prev = rev;
    }
    parts.push(format_run(start, prev));
    parts.join(", ")
}

fn format_run(start: u64, end: u64) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}
