//! This library handles extracting assets from **XTR** containers.
//!
//! # XTR Container Format Documentation
//!
//! An XTR container bundles the assets of a game stage. It holds up to eight LZSS compressed
//! sections, each of which decompresses into a small sub-archive of files, followed by an
//! uncompressed tail region where an audio stream is interleaved with further sub-archives.
//!
//! ## File Structure
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Alignment              | 4 bytes: Alignment unit used by the packer                 |
//! | 0x0004         | Reserved               | 8 bytes: Usually zero                                      |
//! | 0x000C         | Unknown Section Size   | 2 bytes: Size hint for an unknown section                  |
//! | 0x000E         | Pointer Count Hint     | 2 bytes: Hint for the amount of section pointers           |
//! | 0x0010         | Section Pointers       | 16 bytes per section, terminated by a zero offset          |
//!
//! ### Section Pointers
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | End                    | 4 bytes: End of the section as recorded by the packer   |
//! | 0x0004         | Offset                 | 4 bytes: Offset of the compressed blob                  |
//! | 0x0008         | Size                   | 4 bytes: Size of the compressed blob with its header    |
//! | 0x000C         | Reserved               | 4 bytes                                                 |
//!
//! Sections are named by their position in the table: `END`, `TM0`, `SOUNDS`, `STAGE`,
//! `HATCOLOR_RED`, `HATCOLOR_BLUE`, `HATCOLOR_PINK` and `HATCOLOR_YELLOW`.
//!
//! ### Compressed Blobs
//!
//! Every blob starts with its uncompressed and compressed size, both 4 bytes, followed by
//! the token stream described in [`compression`]. The decompressed data is a sub-archive,
//! see [`tarball`].
//!
//! ### Tail Region
//!
//! Everything after the end of the last section is stored uncompressed. Its layout is not
//! recorded anywhere and has to be detected, see [`interleave`].
//!
//! ## Additional Information
//!
//! - **File Extension**: `.xtr`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression**: LZSS with a 4096 byte window, see [`compression`]
//!

pub mod compression;
pub mod error;
pub mod extract;
pub mod interleave;
pub mod naming;
pub mod order;
pub mod read;
pub mod tarball;
pub mod types;
pub mod view;
pub mod write;

pub use extract::{ExtractOptions, Extractor};
pub use read::Container;
pub use write::{DirectorySink, MemorySink, OutputSink};
