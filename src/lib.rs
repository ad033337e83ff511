//! # rawhuff
//!
//! A lossless codec for raw 8-bit grayscale images. Four cooperating pieces
//! do the real work:
//!
//! * `static_huffman` — two-pass static Huffman coding with a canonical-code,
//!   self-describing header.
//! * `adaptive_huffman` — Vitter's sibling-property-preserving dynamic tree
//!   with a Not-Yet-Transmitted sentinel leaf, one symbol at a time.
//! * `adaptive_blocks` — the image tiled into fixed-size blocks, each block
//!   scanned in whichever of five space-filling orders scores best, composed
//!   with an `adaptive_huffman` tree carried across the whole image.
//! * `model` — an optional neighbour-difference preprocessing transform
//!   applied before any of the three coders above.
//!
//! `tools::tree` supplies the arena-indexed binary tree both Huffman coders
//! build on; `traversal` and `scorer` supply the block-scan machinery
//! `adaptive_blocks` selects between; `image` and `bitio` are the file- and
//! bit-level plumbing around the core.
//!
//! ## Example
//!
//! ```rs
//! use rawhuff::{Mode, Options, encode, decode};
//! let pixels = vec![0u8, 1, 2, 3, 2, 1, 0];
//! let opts = Options { mode: Mode::Adaptive, model: true, ..Options::default() };
//! let compressed = encode(&pixels, 7, &opts).expect("encode failed");
//! let restored = decode(&compressed, &opts).expect("decode failed");
//! assert_eq!(restored.pixels, pixels);
//! ```

pub mod adaptive_blocks;
pub mod adaptive_huffman;
pub mod bitio;
pub mod image;
pub mod model;
pub mod scorer;
pub mod static_huffman;
mod tools;
pub mod traversal;

pub use image::Image;
pub use model::{Model, ModelKind};

/// Error taxonomy shared by every decode path; see the spec's error-handling
/// design for the kinds and what distinguishes them.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("corrupt code: {0}")]
    CorruptCode(String),
    #[error("unexpected end of stream: {0}")]
    UnexpectedEnd(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Which of the three coding strategies to run. Not self-identifying in the
/// compressed stream — the caller must request the same mode on decode that
/// it requested on encode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Static,
    Adaptive,
    AdaptiveBlocks,
}

/// Knobs threaded through the encode/decode entry points, analogous to the
/// teacher's `Options` struct: a config layer instead of scattering flags
/// through the core.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub mode: Mode,
    /// enable the neighbour-difference preprocessing model
    pub model: bool,
    pub block_width: usize,
    pub block_height: usize,
}

pub const DEFAULT_BLOCK_SIZE: usize = 8;

impl Default for Options {
    fn default() -> Self {
        Self { mode: Mode::Adaptive, model: false, block_width: DEFAULT_BLOCK_SIZE, block_height: DEFAULT_BLOCK_SIZE }
    }
}

fn model_kind(opts: &Options) -> ModelKind {
    if opts.model { ModelKind::NeighbourDifference } else { ModelKind::Identity }
}

/// Compress `pixels` (row-major, `width` wide) per `opts.mode`.
pub fn encode(pixels: &[u8], width: usize, opts: &Options) -> Result<Vec<u8>, Error> {
    log::info!(
        "encoding {} pixels, width {}, mode {:?}, model {}",
        pixels.len(),
        width,
        opts.mode,
        opts.model
    );
    let model = Model::new(model_kind(opts));
    match opts.mode {
        Mode::Static => Ok(static_huffman::encode(pixels, model)),
        Mode::Adaptive => adaptive_huffman::encode(pixels, model),
        Mode::AdaptiveBlocks => {
            if width == 0 {
                return Err(Error::InvalidArgument("image width must be nonzero".into()));
            }
            if pixels.len() % width != 0 {
                return Err(Error::InvalidArgument(format!(
                    "pixel count {} is not a multiple of width {}",
                    pixels.len(),
                    width
                )));
            }
            let height = pixels.len() / width;
            let image = Image::new(width, height, pixels.to_vec());
            log::trace!("adaptive-blocks: {} blocks of {}x{}", image::block_count(width, height, opts.block_width, opts.block_height), opts.block_width, opts.block_height);
            adaptive_blocks::encode(&image, opts.block_width, opts.block_height, model)
        }
    }
}

/// Result of decoding: `Mode::AdaptiveBlocks` streams carry their own
/// width/height in-band, so those come back populated; the other two modes
/// return a flat pixel buffer (the caller already knows the width it passed
/// to `encode`, per spec §6).
pub struct Decoded {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub pixels: Vec<u8>,
}

/// Decompress `data` per `opts.mode`. The caller must pass the same
/// `Options` it used to encode; the stream does not self-identify its mode.
pub fn decode(data: &[u8], opts: &Options) -> Result<Decoded, Error> {
    log::info!("decoding {} bytes, mode {:?}, model {}", data.len(), opts.mode, opts.model);
    let model = Model::new(model_kind(opts));
    match opts.mode {
        Mode::Static => {
            let pixels = static_huffman::decode(data, model)?;
            Ok(Decoded { width: None, height: None, pixels })
        }
        Mode::Adaptive => {
            let pixels = adaptive_huffman::decode(data, model)?;
            Ok(Decoded { width: None, height: None, pixels })
        }
        Mode::AdaptiveBlocks => {
            let image = adaptive_blocks::decode(data, model)?;
            Ok(Decoded { width: Some(image.width), height: Some(image.height), pixels: image.pixels })
        }
    }
}
