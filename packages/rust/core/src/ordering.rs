//! Reading order for extracted posts.
//!
//! Oldest first by publish date. Equal dates keep discovery order; undated
//! posts go after every dated one, also in discovery order.

use tracing::debug;

use blogbook_shared::{BlogbookError, OrderedPostRecord, PostRecord, Result};

/// Sort `records` into reading order and number them from 1.
pub fn order_posts(mut records: Vec<PostRecord>) -> Vec<OrderedPostRecord> {
    records.sort_by_key(|r| (r.published.is_none(), r.published, r.discovery_index));

    let ordered: Vec<_> = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| OrderedPostRecord {
            ordinal: i + 1,
            record,
        })
        .collect();

    debug!(
        posts = ordered.len(),
        undated = ordered.iter().filter(|o| o.record.published.is_none()).count(),
        "posts ordered"
    );
    ordered
}

/// Check the ordering invariants on an already ordered list.
///
/// Ordinals must run 1..=n, dates must never decrease, and no dated post may
/// follow an undated one.
pub fn validate_order(ordered: &[OrderedPostRecord]) -> Result<()> {
    for (i, pair) in ordered.windows(2).enumerate() {
        let (a, b) = (&pair[0].record, &pair[1].record);
        match (a.published, b.published) {
            (Some(da), Some(db)) if da > db => {
                return Err(BlogbookError::validation(format!(
                    "post {} ({da}) is ordered before older post {} ({db})",
                    i + 1,
                    i + 2
                )));
            }
            (None, Some(_)) => {
                return Err(BlogbookError::validation(format!(
                    "undated post {} is ordered before dated post {}",
                    i + 1,
                    i + 2
                )));
            }
            _ => {}
        }
    }

    if let Some((i, o)) = ordered.iter().enumerate().find(|(i, o)| o.ordinal != i + 1) {
        return Err(BlogbookError::validation(format!(
            "ordinal {} at position {}",
            o.ordinal,
            i + 1
        )));
    }

    Ok(())
}
