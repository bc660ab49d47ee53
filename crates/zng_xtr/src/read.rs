//! Types for reading XTR containers
//!

use std::fmt;

use tracing::{debug, instrument};

use crate::{
    compression::{self, Decoded},
    error::{FormatError, Result},
    types::{BlobHeader, ContainerHeader, Record, SectionPointer},
    view::ByteView,
};

/// Known section types, in the order their pointers appear
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SectionKind {
    End,
    Tm0,
    Sounds,
    Stage,
    HatColorRed,
    HatColorBlue,
    HatColorPink,
    HatColorYellow,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::End,
        SectionKind::Tm0,
        SectionKind::Sounds,
        SectionKind::Stage,
        SectionKind::HatColorRed,
        SectionKind::HatColorBlue,
        SectionKind::HatColorPink,
        SectionKind::HatColorYellow,
    ];

    /// Section type for the pointer at `index`
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name used for the output directory of this section
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::End => "END",
            SectionKind::Tm0 => "TM0",
            SectionKind::Sounds => "SOUNDS",
            SectionKind::Stage => "STAGE",
            SectionKind::HatColorRed => "HATCOLOR_RED",
            SectionKind::HatColorBlue => "HATCOLOR_BLUE",
            SectionKind::HatColorPink => "HATCOLOR_PINK",
            SectionKind::HatColorYellow => "HATCOLOR_YELLOW",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compressed data of a section
#[derive(Debug, Clone, Copy)]
pub struct CompressedBlob<'a> {
    pub header: BlobHeader,
    pub data: &'a [u8],
}

impl CompressedBlob<'_> {
    /// Decompress into exactly the declared size, see [`compression::decompress`]
    pub fn decompress(&self) -> Result<Vec<u8>> {
        compression::decompress(self.data, self.header.uncompressed_size as usize)
    }

    /// Decompress without rejecting leftover input, see [`compression::decode`]
    pub fn decode(&self) -> Result<Decoded> {
        compression::decode(self.data, self.header.uncompressed_size as usize)
    }
}

/// One entry of the section table
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    /// Position in the pointer table
    pub index: usize,
    pub kind: SectionKind,
    pub pointer: SectionPointer,
    view: ByteView<'a>,
}

impl<'a> Section<'a> {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Locate the compressed blob this section points at
    pub fn blob(&self) -> Result<CompressedBlob<'a>> {
        let offset = self.pointer.offset as usize;
        let header = self.view.read_record::<BlobHeader>(offset)?;
        let data = self
            .view
            .slice(offset + BlobHeader::SIZE, header.compressed_size as usize)?;

        Ok(CompressedBlob { header, data })
    }
}

/// Iterator over the section pointer table
///
/// Stops after the terminating pointer, or after the first error.
pub struct Sections<'a> {
    view: ByteView<'a>,
    index: usize,
    done: bool,
}

impl<'a> Iterator for Sections<'a> {
    type Item = Result<Section<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let offset = ContainerHeader::SIZE + self.index * SectionPointer::SIZE;
        let pointer = match self.view.read_record::<SectionPointer>(offset) {
            Ok(pointer) => pointer,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if pointer.is_terminator() {
            self.done = true;
            return None;
        }

        let Some(kind) = SectionKind::from_index(self.index) else {
            self.done = true;
            return Some(Err(FormatError::UnknownSectionIndex { index: self.index }.into()));
        };

        let section = Section {
            index: self.index,
            kind,
            pointer,
            view: self.view,
        };
        self.index += 1;

        Some(Ok(section))
    }
}

impl std::iter::FusedIterator for Sections<'_> {}

/// XTR container reader
///
/// ```no_run
/// fn list_sections(data: &[u8]) -> zng_xtr::error::Result<()> {
///     let xtr = zng_xtr::Container::open(data)?;
///
///     for section in xtr.sections() {
///         let section = section?;
///         let blob = section.blob()?;
///         println!("{}: {} bytes", section.name(), blob.header.uncompressed_size);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    view: ByteView<'a>,
    header: ContainerHeader,
}

impl<'a> Container<'a> {
    /// Read the header of a container held in memory
    #[instrument(skip(data), fields(len = data.len()), err)]
    pub fn open(data: &'a [u8]) -> Result<Container<'a>> {
        let view = ByteView::new(data);
        let header = view.read_record::<ContainerHeader>(0)?;
        debug!(?header, "opened container");

        Ok(Container { view, header })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn view(&self) -> ByteView<'a> {
        self.view
    }

    /// Total size of the container in bytes
    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Iterate the section pointer table
    pub fn sections(&self) -> Sections<'a> {
        Sections {
            view: self.view,
            index: 0,
            done: false,
        }
    }

    /// Offset where the uncompressed tail region starts
    ///
    /// This is the end of the last section, `None` when the container holds no sections.
    pub fn tail_start(&self) -> Result<Option<usize>> {
        let mut last = None;
        for section in self.sections() {
            last = Some(section?.pointer.section_end());
        }
        Ok(last)
    }
}
