use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use uuid::Uuid;

use crate::models::ScoredCandidate;

const DELIMITER: char = ':';

/// Decoded pagination position: the `(score, id)` of the last returned item
///
/// A position marker, not an item reference. If the id no longer appears in
/// the current order, pagination restarts from 0 — a documented consistency
/// relaxation of recomputing the full order per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub score: f64,
    pub id: Uuid,
}

/// Encodes a pagination position as an opaque URL-safe token
pub fn encode(score: f64, id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(format!("{score:.6}{DELIMITER}{id}"))
}

/// Decodes an opaque token back into a position
///
/// Any failure (bad base64, bad utf-8, missing delimiter, unparsable score
/// or id) yields `None`, treated identically to "start from the beginning".
/// Never an error.
pub fn decode(token: &str) -> Option<Cursor> {
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    let (score, id) = raw.split_once(DELIMITER)?;

    Some(Cursor {
        score: score.parse().ok()?,
        id: id.parse().ok()?,
    })
}

/// Slices one page out of a ranked order
///
/// Starts immediately after the item named by the token (position 0 when the
/// token is absent, undecodable, or names an id no longer in the order) and
/// returns up to `limit` items plus the encoded cursor of the window's last
/// item. The cursor is absent when the window is empty or reaches the end of
/// the order.
///
/// The id lookup is a linear scan; the ranked order is bounded by the scored
/// candidate cap, not the catalog size.
pub fn paginate<'a>(
    ordered: &'a [ScoredCandidate],
    token: Option<&str>,
    limit: usize,
) -> (&'a [ScoredCandidate], Option<String>) {
    let start = token
        .and_then(decode)
        .and_then(|cursor| ordered.iter().position(|s| s.candidate.id == cursor.id))
        .map(|position| position + 1)
        .unwrap_or(0);

    let end = (start + limit).min(ordered.len());
    let window = &ordered[start..end];

    let next = if window.is_empty() || end >= ordered.len() {
        None
    } else {
        window.last().map(|s| encode(s.score, s.candidate.id))
    };

    (window, next)
}
