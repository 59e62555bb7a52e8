use thiserror::Error;

#[derive(Error, Debug)]
pub enum Melsec1eError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("device end code: 0x{end_code}, raw={raw:?}")]
    Protocol { end_code: String, raw: String },

    #[error("short response: expected {expected} chars, got {got}, payload={payload:?}")]
    ShortResponse {
        expected: usize,
        got: usize,
        payload: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
