//! # Compactor Library
//!
//! Compress, expand, and analyze byte streams with three classic codecs
//! * `huffman` builds a static prefix code from byte frequencies and bit-packs the payload
//! * `rle` collapses byte runs into tagged run/literal segments
//! * `lz77` replaces repeated sequences with sliding-window back-references
//!
//! Each codec transforms buffers, not streams (we expect files that are easily
//! buffered), and produces a self-contained artifact that the matching expander
//! turns back into the exact original bytes.  There are convenience functions
//! for working directly with file paths, and analyzers that predict how well a
//! codec will do on a given file before committing to it.
//!
//! ## File Example
//!
//! ```rs
//! let stats = compactor::rle::compress_file("scan.bmp","scan.rle",compactor::rle::DEFAULT_THRESHOLD)
//!     .expect("compression failed");
//! eprintln!("saved {:.1}%",stats.space_saved_percent);
//! ```
//!
//! ## Buffer Example
//!
//! ```rs
//! let test_data = "This is the chaunt of the priests.  The chaunt of the priests of Mung.".as_bytes();
//! let (artifact,stats) = compactor::huffman::compress(test_data).expect("compression failed");
//! let (restored,_) = compactor::huffman::expand(&artifact).expect("expansion failed");
//! assert_eq!(restored,test_data);
//! ```

mod tools;
pub mod analysis;
pub mod container;
pub mod huffman;
pub mod rle;
pub mod lz77;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("empty input")]
    EmptyInput,
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("file format mismatch: {0}")]
    WrongFormat(String),
    #[error("corrupt artifact: {0}")]
    Corrupt(String),
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error)
}
