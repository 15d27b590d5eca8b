use thiserror::Error;

/// Everything that can go wrong while constructing a decoded GIF.
///
/// All variants are fatal to the construction: there is no partial recovery,
/// the constructor hands the error back and drops whatever it had allocated
/// so far.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GifDecodeError {
    #[error("no \"GIF\" signature found. Are you sure this is a GIF buffer?")]
    NoGifSignature,

    #[error("GIF version not recognized: {0}")]
    UnsupportedVersion(String),

    #[error("truncated GIF buffer at offset {offset}")]
    Truncated { offset: usize },

    #[error("unexpected length for the \"{block}\" block. Expected {expected}, got {got}")]
    UnexpectedBlockLength {
        block: &'static str,
        expected: u8,
        got: u8,
    },

    #[error("expected a block terminator at the end of the \"{block}\" block")]
    ExpectedBlockTerminator { block: &'static str },

    #[error("unrecognized block with code 0x{code:02X} at offset {offset}")]
    UnrecognizedBlock { code: u8, offset: usize },

    #[error("unrecognized extension with label 0x{0:02X}")]
    UnrecognizedExtension(u8),

    #[error("frame {index} is interlaced, which is not supported")]
    UnsupportedInterlacing { index: usize },

    #[error("sorted color tables are not supported")]
    UnsupportedSortedColorTable,

    #[error("unsupported disposal method {0}")]
    UnsupportedDisposalMethod(u8),

    #[error("frame {index} does not fit within the logical screen")]
    FrameOutsideCanvas { index: usize },

    #[error("no color table found for frame {index}")]
    NoColorTable { index: usize },

    #[error("invalid LZW minimum code size: {0}")]
    InvalidMinimumCodeSize(u8),

    #[error("LZW code {code} does not fit the current code table")]
    InvalidLzwCode { code: u16 },

    #[error("a pixel references color {index}, outside the active color table")]
    InvalidColorIndex { index: u16 },

    #[error("a decoded LZW code chain exceeded the supported length")]
    CodeChainTooLong,

    #[error("frame decoded to {got} pixels, expected {expected}")]
    PixelCountMismatch { expected: usize, got: usize },

    #[error("the GIF contains more frames than the supported maximum")]
    TooManyFrames,

    #[error("the GIF contains no image data")]
    NoFrames,
}

pub type Result<T> = std::result::Result<T, GifDecodeError>;
