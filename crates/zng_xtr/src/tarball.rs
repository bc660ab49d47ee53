//! Unpacking of the sub-archives stored inside every decompressed section.
//!
//! ## Layout
//!
//! | Offset (bytes) | Field         | Description                                       |
//! |----------------|---------------|---------------------------------------------------|
//! | 0x0000         | Reserved      | 12 bytes                                          |
//! | 0x000C         | Info Offset   | 4 bytes: Offset of the file table                 |
//! | 0x0010         | Info Size     | 4 bytes: Size of the file table, 16 per entry     |
//! | 0x0014         | Data Offset   | 4 bytes: Offset of the data region                |
//! | 0x0018         | Data Size     | 4 bytes: Size of the data region                  |
//! | 0x001C         | File Count    | 4 bytes: Number of files recorded by the packer   |
//!
//! File table entries start with a 4 byte offset followed by 12 reserved bytes. An
//! offset of zero marks an empty slot which is preserved but has no data. Files are
//! stored in table order, so a file ends where the next non-empty entry starts, or
//! at the end of the section for the last one.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::error::{Error, FormatError, Result};
use crate::naming::{resolve_name, synthesize_name};
use crate::order::OrderEntry;
use crate::types::{FileEntry, Record, SubArchiveHeader};
use crate::view::ByteView;

/// Where the name of an extracted resource came from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NameOrigin {
    /// Read from the resource header
    Embedded,

    /// Generated from the entry index
    Synthesized,

    /// Entry was an empty slot
    None,
}

/// A single entry recovered from a sub-archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedResource {
    /// Position in the file table
    pub index: usize,

    /// Output file name, empty for skipped entries
    pub name: String,

    /// Contents of the file
    pub bytes: Vec<u8>,

    /// Whether this entry was an empty slot
    pub was_skipped: bool,

    pub origin: NameOrigin,
}

impl ExtractedResource {
    fn skip(index: usize) -> Self {
        Self {
            index,
            name: String::new(),
            bytes: Vec::new(),
            was_skipped: true,
            origin: NameOrigin::None,
        }
    }

    /// The line describing this entry in `_order.txt`
    pub fn order_entry(&self) -> OrderEntry {
        if self.was_skipped {
            OrderEntry::Skip
        } else {
            OrderEntry::File(self.name.clone())
        }
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    FormatError::MalformedSubArchive {
        reason: reason.into(),
    }
    .into()
}

/// Read the header of a decompressed section
pub fn read_header(section: &[u8]) -> Result<SubArchiveHeader> {
    ByteView::new(section)
        .read_record::<SubArchiveHeader>(0)
        .map_err(|_| {
            malformed(format!(
                "section of {} bytes is shorter than its {} byte header",
                section.len(),
                SubArchiveHeader::SIZE
            ))
        })
}

/// Read every entry of the file table
pub fn read_entries(section: &[u8], header: &SubArchiveHeader) -> Result<Vec<FileEntry>> {
    if header.info_size as usize % FileEntry::SIZE != 0 {
        warn!(
            info_size = header.info_size,
            "file table size is not a multiple of {}, ignoring the remainder",
            FileEntry::SIZE
        );
    }

    let view = ByteView::new(section);
    let start = header.info_offset as usize;

    (0..header.entry_count())
        .map(|i| {
            view.read_record::<FileEntry>(start + i * FileEntry::SIZE)
                .map_err(|_| {
                    malformed(format!(
                        "file table at {:#x} with {} entries runs past the end of the section",
                        start,
                        header.entry_count()
                    ))
                })
        })
        .collect()
}

/// Generated name for entry `index` that no other entry uses yet
fn unique_name(index: usize, used: &mut HashSet<String>) -> String {
    let base = synthesize_name(index);
    let mut name = base.clone();
    let mut suffix = 1;
    while !used.insert(name.clone()) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    name
}

/// Split a decompressed section into its files
///
/// The result keeps the table order, including skipped entries, so the table can be
/// reproduced from it.
#[instrument(skip(section), fields(len = section.len()), err)]
pub fn unpack(section: &[u8]) -> Result<Vec<ExtractedResource>> {
    let header = read_header(section)?;
    let entries = read_entries(section, &header)?;

    debug!(
        entries = entries.len(),
        file_count = header.file_count,
        "unpacking sub-archive"
    );

    // A file ends at the next non-empty entry, walking backwards collects those bounds
    let mut ends = vec![section.len(); entries.len()];
    let mut next = section.len();
    for (index, entry) in entries.iter().enumerate().rev() {
        ends[index] = next;
        if !entry.is_skip() {
            next = entry.offset as usize;
        }
    }

    let mut files = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.is_skip() {
            files.push(None);
            continue;
        }

        let start = entry.offset as usize;
        let end = ends[index];
        if start > section.len() {
            return Err(FormatError::EntryOutOfBounds {
                index,
                offset: start,
                len: section.len(),
            }
            .into());
        }
        if end < start {
            return Err(malformed(format!(
                "entry {} at {:#x} is followed by an entry at {:#x}",
                index, start, end
            )));
        }

        let bytes = &section[start..end];
        files.push(Some((bytes, resolve_name(bytes))));
    }

    // Generated names of unnamed entries are taken before any embedded name is considered
    let mut used = files
        .iter()
        .enumerate()
        .filter(|(_, file)| matches!(file, Some((_, None))))
        .map(|(index, _)| synthesize_name(index))
        .collect::<HashSet<_>>();

    let mut resources = Vec::with_capacity(entries.len());
    for (index, file) in files.into_iter().enumerate() {
        let Some((bytes, embedded)) = file else {
            resources.push(ExtractedResource::skip(index));
            continue;
        };

        let (name, origin) = match embedded {
            Some(name) if used.insert(name.clone()) => (name, NameOrigin::Embedded),
            Some(name) => {
                let fallback = unique_name(index, &mut used);
                warn!(index, "name {} is already taken, using {}", name, fallback);
                (fallback, NameOrigin::Synthesized)
            }
            None => (synthesize_name(index), NameOrigin::Synthesized),
        };

        resources.push(ExtractedResource {
            index,
            name,
            bytes: bytes.to_vec(),
            was_skipped: false,
            origin,
        });
    }

    Ok(resources)
}

#[cfg(test)]
pub(crate) mod test {
    use std::io::Cursor;

    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use super::{unpack, NameOrigin};
    use crate::error::{Error, FormatError, Result};
    use crate::naming::NameLayout;
    use crate::order::OrderEntry;
    use crate::types::{FileEntry, SubArchiveHeader};

    /// Build a section of `len` bytes with a file table at 0x20 holding `offsets`
    pub(crate) fn section_with_offsets(offsets: &[u32], len: usize) -> Vec<u8> {
        let header = SubArchiveHeader {
            info_offset: 0x20,
            info_size: (offsets.len() * 16) as u32,
            data_offset: 0x20 + (offsets.len() * 16) as u32,
            file_count: offsets.iter().filter(|o| **o != 0).count() as u32,
            ..Default::default()
        };

        let mut data = Vec::new();
        let mut cursor = Cursor::new(&mut data);
        header.write(&mut cursor).unwrap();
        for offset in offsets {
            FileEntry {
                offset: *offset,
                ..Default::default()
            }
            .write(&mut cursor)
            .unwrap();
        }

        data.resize(len, 0xCC);
        data
    }

    #[test]
    fn sizes_skip_over_empty_entries() -> Result<()> {
        let section = section_with_offsets(&[0, 100, 0, 250], 400);

        let resources = unpack(&section)?;
        assert_eq!(resources.len(), 4);

        assert!(resources[0].was_skipped);
        assert!(resources[0].bytes.is_empty());

        assert!(!resources[1].was_skipped);
        assert_eq!(resources[1].bytes.len(), 150);
        assert_eq!(resources[1].name, "00001");
        assert_eq!(resources[1].origin, NameOrigin::Synthesized);

        assert!(resources[2].was_skipped);

        assert_eq!(resources[3].bytes.len(), 150);
        assert_eq!(resources[3].name, "00003");

        Ok(())
    }

    #[test]
    fn trailing_skips_end_at_section_end() -> Result<()> {
        let section = section_with_offsets(&[0x60, 0, 0], 0xA0);

        let resources = unpack(&section)?;
        assert_eq!(resources[0].bytes.len(), 0x40);
        assert!(resources[1].was_skipped);
        assert!(resources[2].was_skipped);

        Ok(())
    }

    #[test]
    fn embedded_names_are_used() -> Result<()> {
        let mut section = section_with_offsets(&[0x40, 0x80], 0xC0);
        section[0x40..0x44].copy_from_slice(&NameLayout::SPA_MAGIC.to_le_bytes());
        section[0x58..0x5C].copy_from_slice(b"cat\0");

        let resources = unpack(&section)?;
        assert_eq!(resources[0].name, "cat.spa");
        assert_eq!(resources[0].origin, NameOrigin::Embedded);
        assert_eq!(resources[0].bytes.len(), 0x40);
        assert_eq!(resources[1].name, "00001");

        Ok(())
    }

    #[test]
    fn duplicate_names_fall_back() -> Result<()> {
        let mut section = section_with_offsets(&[0x40, 0x80], 0xC0);
        for start in [0x40, 0x80] {
            section[start..start + 4].copy_from_slice(&NameLayout::SPM_MAGIC.to_le_bytes());
            section[start + 0x10..start + 0x18].copy_from_slice(b"hat.spm\0");
        }

        let resources = unpack(&section)?;
        assert_eq!(resources[0].name, "hat.spm");
        assert_eq!(resources[1].name, "00001");

        Ok(())
    }

    #[test]
    fn embedded_name_cannot_take_generated_name() -> Result<()> {
        let mut section = section_with_offsets(&[0x40, 0x80], 0xC0);
        section[0x40..0x44].copy_from_slice(&NameLayout::SPM_MAGIC.to_le_bytes());
        section[0x50..0x56].copy_from_slice(b"00001\0");

        let resources = unpack(&section)?;
        assert_eq!(resources[0].name, "00000");
        assert_eq!(resources[0].origin, NameOrigin::Synthesized);
        assert_eq!(resources[1].name, "00001");
        assert_eq!(resources[1].origin, NameOrigin::Synthesized);

        Ok(())
    }

    #[test]
    fn fallback_name_taken_by_earlier_entry() -> Result<()> {
        let mut section = section_with_offsets(&[0x50, 0x90, 0xD0], 0x110);
        let names: [&[u8]; 3] = [b"00002\0", b"hat.spm\0", b"hat.spm\0"];
        for (start, name) in [0x50, 0x90, 0xD0].into_iter().zip(names) {
            section[start..start + 4].copy_from_slice(&NameLayout::SPM_MAGIC.to_le_bytes());
            section[start + 0x10..start + 0x10 + name.len()].copy_from_slice(name);
        }

        let resources = unpack(&section)?;
        let names = resources.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["00002", "hat.spm", "00002_1"]);

        Ok(())
    }

    #[test]
    fn order_entries_keep_table_shape() -> Result<()> {
        let section = section_with_offsets(&[0, 0x60, 0, 0x70], 0x80);

        let order = unpack(&section)?
            .iter()
            .map(|r| r.order_entry())
            .collect::<Vec<_>>();

        assert_eq!(
            order,
            vec![
                OrderEntry::Skip,
                OrderEntry::File("00001".into()),
                OrderEntry::Skip,
                OrderEntry::File("00003".into()),
            ]
        );

        Ok(())
    }

    #[test]
    fn short_header() {
        let err = unpack(&[0u8; 12]).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::MalformedSubArchive { .. })
        ));
    }

    #[test]
    fn table_past_end() {
        let mut section = section_with_offsets(&[0x40], 0x40);
        // Claim far more entries than the section holds
        section[0x10..0x14].copy_from_slice(&0x1000u32.to_le_bytes());

        assert!(matches!(
            unpack(&section).unwrap_err(),
            Error::Format(FormatError::MalformedSubArchive { .. })
        ));
    }

    #[test]
    fn entry_past_end() {
        let section = section_with_offsets(&[0x400], 0x40);

        assert!(matches!(
            unpack(&section).unwrap_err(),
            Error::Format(FormatError::EntryOutOfBounds {
                index: 0,
                offset: 0x400,
                len: 0x40
            })
        ));
    }

    #[test]
    fn entries_out_of_order() {
        let section = section_with_offsets(&[0x60, 0x40], 0x80);

        assert!(matches!(
            unpack(&section).unwrap_err(),
            Error::Format(FormatError::MalformedSubArchive { .. })
        ));
    }

    #[test]
    fn empty_table() -> Result<()> {
        let section = section_with_offsets(&[], 0x20);
        assert!(unpack(&section)?.is_empty());
        Ok(())
    }
}
