use thiserror::Error;

/// Failure modes surfaced by the MVE decoder.
///
/// `InvalidSignature` is recoverable (the source is simply not an MVE
/// container); every other variant is fatal for the stream. The decoder
/// leaves surfaces and palette in their last good state so the host can
/// keep presenting the final successful frame.
#[derive(Debug, Error)]
pub enum MveError {
    #[error("missing Interplay MVE signature")]
    InvalidSignature,
    #[error("stream ended while reading {0}")]
    Truncated(&'static str),
    #[error("unknown opcode {0:#06x}")]
    UnknownOpcode(u16),
    #[error("unsupported configuration: {0}")]
    BadConfiguration(String),
    #[error("{0} exhausted before the block grid was covered")]
    MapExhausted(&'static str),
    #[error("i/o failure in underlying stream")]
    Io(#[from] std::io::Error),
}
