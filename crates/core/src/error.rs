use crate::types::TokenId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid range {start}..={end}: must satisfy 1 <= start <= end <= {max}")]
    InvalidRange {
        start: TokenId,
        end: TokenId,
        max: TokenId,
    },

    #[error("Unknown token id {token_id} (collection has {max} items)")]
    UnknownTokenId { token_id: TokenId, max: TokenId },

    #[error("Validation failed: {0}")]
    Validation(String),
}
