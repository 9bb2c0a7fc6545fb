//! Cache seams used by the compositor.

use std::collections::HashSet;

use crate::tile::TileSpec;

/// A cache of decoded resources that can be trimmed on request.
///
/// The compositor calls [`purge_except`](PurgeableCache::purge_except) when
/// its host becomes invisible, passing the tiles bound to the visible frame.
/// Everything else may be dropped to bound memory while backgrounded.
pub trait PurgeableCache: Send + Sync {
    /// Drop every entry whose spec is not in `keep`. Returns the number dropped.
    fn purge_except(&self, keep: &HashSet<TileSpec>) -> usize;
}
