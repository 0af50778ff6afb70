use thiserror::Error;

/// Fatal conditions raised while setting up or driving the effects.
///
/// None of these are recovered from: a missing resource means the effect is
/// not shown at all.
#[derive(Debug, Error)]
pub enum FxError {
    #[error("shader `{0}` is not registered")]
    MissingShader(String),
    #[error("canvas element `{0}` not found")]
    MissingCanvas(String),
    #[error("rendering context unavailable: {0}")]
    Context(String),
    #[error("pixel readback failed for face {face}: {reason}")]
    Readback { face: usize, reason: String },
    #[error("height buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    HeightBufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("unknown palette `{0}` (expected red, blue or green)")]
    UnknownPalette(String),
    #[error("surface error: {0}")]
    Surface(String),
}
