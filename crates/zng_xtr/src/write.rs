//! Types for writing extracted containers
//!
//! ## Output Layout
//!
//! ```text
//! <root>/
//!   <SECTION>/          one directory per section, e.g. TM0 or SOUNDS
//!     _rawsection       the decompressed section as a whole
//!     _order.txt        file table order, see [`crate::order`]
//!     <files>           one file per non-empty entry
//!   _fileinfo           detected tail layout
//!   audio.wp2           the audio stream from the tail region
//!   UNC_<k>/            resources recovered from the tail, laid out like a section
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::interleave::Interleave;
use crate::order::{self, OrderEntry};
use crate::tarball::ExtractedResource;

pub const ORDER_FILE_NAME: &str = "_order.txt";
pub const RAW_SECTION_FILE_NAME: &str = "_rawsection";
pub const FILE_INFO_NAME: &str = "_fileinfo";
pub const AUDIO_FILE_NAME: &str = "audio.wp2";

/// Destination for extracted output
///
/// Paths are relative to the root of the extraction.
pub trait OutputSink {
    /// Create a directory, succeeding if it already exists
    fn make_dir(&mut self, path: &Path) -> io::Result<()>;

    /// Write a complete file
    fn write_file(&mut self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// Writes output below a directory on disk
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    overwrite: bool,
}

impl DirectorySink {
    /// Existing files are only replaced when `overwrite` is set
    pub fn new(root: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            root: root.into(),
            overwrite,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for DirectorySink {
    fn make_dir(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.root.join(path))
    }

    fn write_file(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        let target = self.root.join(path);
        let mut out = if !self.overwrite {
            File::create_new(&target)?
        } else {
            File::create(&target)?
        };
        out.write_all(data)
    }
}

/// Keeps all output in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    pub dirs: BTreeSet<PathBuf>,
    pub files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a written file
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(|f| f.as_slice())
    }
}

impl OutputSink for MemorySink {
    fn make_dir(&mut self, path: &Path) -> io::Result<()> {
        self.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn write_file(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.dirs.contains(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }
        self.files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }
}

/// Lays extracted data out in the output structure
pub struct LayoutWriter<'s, S: OutputSink> {
    sink: &'s mut S,
    raw_sections: bool,
}

impl<'s, S: OutputSink> LayoutWriter<'s, S> {
    /// Writing of `_rawsection` files can be turned off with `raw_sections`
    pub fn new(sink: &'s mut S, raw_sections: bool) -> Self {
        Self { sink, raw_sections }
    }

    fn dir(&mut self, path: &Path) -> Result<()> {
        self.sink.make_dir(path).map_err(|source| Error::Output {
            path: path.to_path_buf(),
            source,
        })
    }

    fn file(&mut self, path: &Path, data: &[u8]) -> Result<()> {
        self.sink
            .write_file(path, data)
            .map_err(|source| Error::Output {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Create the root of the extraction
    pub fn write_root(&mut self) -> Result<()> {
        self.dir(Path::new(""))
    }

    /// Write a sub-archive into its own directory
    ///
    /// The order file is written last, once every file it names exists.
    #[instrument(skip(self, raw, resources), err)]
    pub fn write_sub_archive(
        &mut self,
        name: &str,
        raw: &[u8],
        resources: &[ExtractedResource],
    ) -> Result<()> {
        let dir = Path::new(name);
        self.dir(dir)?;

        if self.raw_sections {
            self.file(&dir.join(RAW_SECTION_FILE_NAME), raw)?;
        }

        for resource in resources.iter().filter(|r| !r.was_skipped) {
            let path = dir.join(&resource.name);
            info!("writing {} ({} bytes)", path.display(), resource.bytes.len());
            self.file(&path, &resource.bytes)?;
        }

        let entries = resources
            .iter()
            .map(ExtractedResource::order_entry)
            .collect::<Vec<OrderEntry>>();
        self.file(&dir.join(ORDER_FILE_NAME), order::render(&entries).as_bytes())
    }

    /// Write the tail layout description and the audio stream
    #[instrument(skip_all, err)]
    pub fn write_tail(&mut self, interleave: &Interleave) -> Result<()> {
        self.file(
            Path::new(FILE_INFO_NAME),
            interleave.layout.file_info().as_bytes(),
        )?;

        info!(
            "writing {} ({} bytes)",
            AUDIO_FILE_NAME,
            interleave.audio.len()
        );
        self.file(Path::new(AUDIO_FILE_NAME), &interleave.audio)
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::{LayoutWriter, MemorySink, ORDER_FILE_NAME, RAW_SECTION_FILE_NAME};
    use crate::error::{Error, Result};
    use crate::tarball::{test::section_with_offsets, unpack};

    #[test]
    fn write_sub_archive() -> Result<()> {
        let section = section_with_offsets(&[0, 0x60, 0x70], 0x80);
        let resources = unpack(&section)?;

        let mut sink = MemorySink::new();
        let mut writer = LayoutWriter::new(&mut sink, true);
        writer.write_root()?;
        writer.write_sub_archive("TM0", &section, &resources)?;

        assert_eq!(
            sink.file(Path::new("TM0").join(ORDER_FILE_NAME)),
            Some(&b"skip\n00001\n00002\n"[..])
        );
        assert_eq!(
            sink.file(Path::new("TM0").join(RAW_SECTION_FILE_NAME)),
            Some(section.as_slice())
        );
        assert_eq!(sink.file("TM0/00001").map(|f| f.len()), Some(0x10));
        assert_eq!(sink.files.len(), 4);

        Ok(())
    }

    #[test]
    fn raw_sections_can_be_disabled() -> Result<()> {
        let section = section_with_offsets(&[0x40], 0x80);
        let resources = unpack(&section)?;

        let mut sink = MemorySink::new();
        LayoutWriter::new(&mut sink, false).write_sub_archive("STAGE", &section, &resources)?;

        assert!(sink
            .file(Path::new("STAGE").join(RAW_SECTION_FILE_NAME))
            .is_none());
        assert_eq!(sink.files.len(), 2);

        Ok(())
    }

    #[test]
    fn missing_directory_reports_path() {
        let mut sink = MemorySink::new();
        let mut writer = LayoutWriter::new(&mut sink, true);

        let err = writer.file(Path::new("nowhere/file"), b"data").unwrap_err();
        assert!(matches!(err, Error::Output { ref path, .. } if path == Path::new("nowhere/file")));
    }
}
