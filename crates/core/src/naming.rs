//! Asset naming convention.
//!
//! Generates the deterministic file name for a token's image asset.
//! The name is the only link between a token and its output, so it
//! must never depend on anything but the token id, the collection size
//! and the extension.

use crate::types::TokenId;

/// Minimum number of digits in an asset file name.
pub const MIN_PAD_WIDTH: usize = 4;

/// Default extension for generated assets.
pub const DEFAULT_EXTENSION: &str = "png";

/// Width the token id is zero-padded to for a collection of `collection_size`.
///
/// At least [`MIN_PAD_WIDTH`], wider when the collection needs more digits,
/// so that names always sort in token order.
pub fn pad_width(collection_size: TokenId) -> usize {
    collection_size.to_string().len().max(MIN_PAD_WIDTH)
}

/// Generate an asset file name.
///
/// Convention: `{zero-padded token id}.{extension}`
///
/// # Examples
///
/// ```
/// use agentmint_core::naming::asset_filename;
///
/// assert_eq!(asset_filename(42, 2000, "png"), "0042.png");
/// assert_eq!(asset_filename(7, 20000, "png"), "00007.png");
/// ```
pub fn asset_filename(token_id: TokenId, collection_size: TokenId, extension: &str) -> String {
    let width = pad_width(collection_size);
    format!("{token_id:0width$}.{extension}")
}

/// Display label used in logs and summaries, e.g. `#0042`.
pub fn token_label(token_id: TokenId, collection_size: TokenId) -> String {
    let width = pad_width(collection_size);
    format!("#{token_id:0width$}")
}
