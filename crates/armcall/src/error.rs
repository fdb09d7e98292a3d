#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed address expression: {0}")]
    MalformedAddressExpression(String),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("unresolvable symbol: {0}")]
    UnresolvableSymbol(String),

    #[error("symbol defined twice: {0}")]
    DuplicateSymbol(String),

    #[error("locals block opened while another is still open")]
    RecursiveLocalsBlock,

    #[error("local declaration outside an open locals block")]
    DeclarationOutsideBlock,

    #[error("duplicate local or parameter name: {0}")]
    DuplicateLocal(String),

    #[error("cannot take the address of register-aliased parameter '{0}'")]
    UnspilledParameterAddress(String),

    #[error("calling-convention lowering requires ARM state (4-byte instruction alignment)")]
    ThumbModeMisuse,

    #[error("procedure '{0}' closed with an open locals block")]
    UnclosedLocalsBlock(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
