//! Base types for structure of XTR file.

use binrw::{BinRead, BinWrite};

/// Fixed-size on-disk record
///
/// Every structure read through [`crate::view::ByteView::read_record`] has a known width
/// which is checked against the buffer before any bytes are decoded.
pub trait Record {
    /// Width of the record in bytes
    const SIZE: usize;
}

/// XTR file header
///
/// Sits at the very start of the file. None of the fields are required for extraction but they are
/// kept so the header can be reported back to the user. All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct ContainerHeader {
    /// Alignment unit used when the container was packed
    pub align: u32,

    /// Unknown, usually zero
    pub reserved0: u32,

    /// Unknown, usually zero
    pub reserved1: u32,

    /// Size hint for an unknown section
    pub unknown_section_size: u16,

    /// Hint for the amount of section pointers
    pub pointer_count_hint: u16,
}

impl Record for ContainerHeader {
    const SIZE: usize = 16;
}

/// Entry of the section pointer table
///
/// The table starts right after [`ContainerHeader`] and ends with the first pointer whose
/// `offset` is zero.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct SectionPointer {
    /// End of the section as recorded by the packer
    pub end: u32,

    /// Offset of the [`BlobHeader`] from the start of the file, zero terminates the table
    pub offset: u32,

    /// Size of the compressed blob including its header
    pub size: u32,

    #[allow(dead_code)]
    pub reserved: u32,
}

impl SectionPointer {
    /// Whether this pointer is the sentinel that terminates the table
    pub fn is_terminator(&self) -> bool {
        self.offset == 0
    }

    /// First byte past this section
    pub fn section_end(&self) -> usize {
        self.offset as usize + self.size as usize
    }
}

impl Record for SectionPointer {
    const SIZE: usize = 16;
}

/// Size pair in front of every compressed token stream
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct BlobHeader {
    /// The size of the section once decompressed
    pub uncompressed_size: u32,

    /// The amount of token stream bytes following this header
    pub compressed_size: u32,
}

impl Record for BlobHeader {
    const SIZE: usize = 8;
}

/// Header at the start of every decompressed section
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct SubArchiveHeader {
    #[allow(dead_code)]
    pub reserved: [u32; 3],

    /// Offset of the file entry table from the start of the section
    pub info_offset: u32,

    /// Size of the file entry table in bytes
    pub info_size: u32,

    /// Offset of the data region
    pub data_offset: u32,

    /// Size of the data region
    pub data_size: u32,

    /// Number of files as recorded by the packer, not always equal to the entry count
    pub file_count: u32,
}

impl SubArchiveHeader {
    /// Amount of entries in the file table
    pub fn entry_count(&self) -> usize {
        self.info_size as usize / FileEntry::SIZE
    }
}

impl Record for SubArchiveHeader {
    const SIZE: usize = 32;
}

/// Entry of a sub-archive file table
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileEntry {
    /// Offset of the file from the start of the section, zero marks a skipped slot
    pub offset: u32,

    #[allow(dead_code)]
    pub reserved: [u32; 3],
}

impl FileEntry {
    /// Whether this entry is an empty placeholder
    pub fn is_skip(&self) -> bool {
        self.offset == 0
    }
}

impl Record for FileEntry {
    const SIZE: usize = 16;
}
