//! Single-chunk container codec.
//!
//! Every chunk compresses into its own self-contained gzip member, so any
//! DEFLATE-compatible implementation can read the output and chunk files can
//! be processed independently and in any order.

pub mod gzip;
