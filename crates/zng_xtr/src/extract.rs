//! Full extraction of a container into an [`OutputSink`].

use std::path::PathBuf;

use bon::Builder;
use tracing::{info, instrument, warn};

use crate::error::{DecompressError, Error, Result};
use crate::interleave::{self, InterleaveLayout};
use crate::read::{CompressedBlob, Container, Section};
use crate::tarball;
use crate::write::{DirectorySink, LayoutWriter, OutputSink};

/// Options controlling how a container is extracted
#[derive(Debug, Clone, Copy, Builder)]
pub struct ExtractOptions {
    /// Replace files which already exist in the target directory
    #[builder(default)]
    pub overwrite: bool,

    /// Log and skip sections or resources which fail instead of aborting
    #[builder(default)]
    pub keep_going: bool,

    /// Accept sections whose compressed data is not consumed exactly
    #[builder(default)]
    pub lenient: bool,

    /// Write the decompressed section next to the extracted files
    #[builder(default = true)]
    pub raw_sections: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What was written for one sub-archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubArchiveReport {
    /// Output directory name
    pub name: String,
    pub files: usize,
    pub skipped: usize,
}

/// Outcome of an extraction
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub sections: Vec<SubArchiveReport>,

    /// Detected tail layout, `None` if the tail was not processed
    pub layout: Option<InterleaveLayout>,

    pub audio_bytes: usize,

    /// Sub-archives recovered from the tail region
    pub recovered: Vec<SubArchiveReport>,

    /// Inactive tail chunks outside of any recovered resource
    pub blank_chunks: usize,

    /// Failures tolerated because of [`ExtractOptions::keep_going`]
    pub failures: Vec<Error>,
}

/// Drives the extraction of a container
///
/// ```no_run
/// use zng_xtr::extract::{ExtractOptions, Extractor};
///
/// # fn doit() -> zng_xtr::error::Result<()> {
/// let data = std::fs::read("STAGE1.XTR")?;
/// let summary = Extractor::new(ExtractOptions::default()).extract_to_dir(&data, "out")?;
/// println!("extracted {} sections", summary.sections.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract into a directory on disk
    pub fn extract_to_dir(
        &self,
        data: &[u8],
        directory: impl Into<PathBuf>,
    ) -> Result<ExtractSummary> {
        let mut sink = DirectorySink::new(directory, self.options.overwrite);
        self.extract(data, &mut sink)
    }

    /// Extract every section and the tail region of `data`
    #[instrument(skip(self, data, sink), fields(len = data.len()), err)]
    pub fn extract<S: OutputSink>(&self, data: &[u8], sink: &mut S) -> Result<ExtractSummary> {
        let xtr = Container::open(data)?;
        let mut writer = LayoutWriter::new(sink, self.options.raw_sections);
        writer.write_root()?;

        let mut summary = ExtractSummary::default();
        let mut tail_start = None;
        let mut table_intact = true;

        for section in xtr.sections() {
            let section = match section {
                Ok(section) => section,
                Err(e) => {
                    self.tolerate(e, &mut summary)?;
                    table_intact = false;
                    break;
                }
            };
            tail_start = Some(section.pointer.section_end());

            match self.extract_section(&section, &mut writer) {
                Ok(report) => summary.sections.push(report),
                Err(e) => self.tolerate(e.in_section(section.name()), &mut summary)?,
            }
        }

        match tail_start {
            Some(_) if !table_intact => {
                warn!("section table is damaged, not extracting the tail region")
            }
            Some(start) => self.extract_tail(data, start, &mut writer, &mut summary)?,
            None => warn!("container holds no sections"),
        }

        Ok(summary)
    }

    /// Tolerated errors are recorded, others are returned
    fn tolerate(&self, error: Error, summary: &mut ExtractSummary) -> Result<()> {
        if !self.options.keep_going {
            return Err(error);
        }

        warn!("skipping: {}", error);
        summary.failures.push(error);
        Ok(())
    }

    #[instrument(skip_all, fields(section = section.name()), err)]
    fn extract_section<S: OutputSink>(
        &self,
        section: &Section<'_>,
        writer: &mut LayoutWriter<'_, S>,
    ) -> Result<SubArchiveReport> {
        let blob = section.blob()?;
        info!(
            "inflating section {} ({} -> {} bytes)",
            section.name(),
            blob.header.compressed_size,
            blob.header.uncompressed_size
        );

        let raw = self.decompress(&blob)?;
        let resources = tarball::unpack(&raw)?;
        writer.write_sub_archive(section.name(), &raw, &resources)?;

        Ok(report(section.name(), &resources))
    }

    fn decompress(&self, blob: &CompressedBlob<'_>) -> Result<Vec<u8>> {
        if !self.options.lenient {
            return blob.decompress();
        }

        let decoded = blob.decode()?;
        let remaining = decoded.remaining(blob.data.len());
        if remaining > 0 {
            warn!("{}", DecompressError::OverrunInput { remaining });
        }
        if decoded.excess > 0 {
            warn!(
                "{}",
                DecompressError::OutputOverflow {
                    excess: decoded.excess
                }
            );
        }
        Ok(decoded.data)
    }

    fn extract_tail<S: OutputSink>(
        &self,
        data: &[u8],
        tail_start: usize,
        writer: &mut LayoutWriter<'_, S>,
        summary: &mut ExtractSummary,
    ) -> Result<()> {
        info!("extracting tail region at {:#x}", tail_start);
        let Some(interleave) = interleave::reconstruct(data, tail_start) else {
            return Ok(());
        };

        writer.write_tail(&interleave)?;
        summary.layout = Some(interleave.layout);
        summary.audio_bytes = interleave.audio.len();
        summary.blank_chunks = interleave.blank_chunks;

        info!(
            "recovered {} resources from the tail ({} blank chunks)",
            interleave.resources.len(),
            interleave.blank_chunks
        );

        for resource in &interleave.resources {
            let name = resource.name();
            let result = resource.unpack().and_then(|files| {
                writer.write_sub_archive(&name, &resource.bytes, &files)?;
                Ok(report(&name, &files))
            });

            match result {
                Ok(report) => summary.recovered.push(report),
                Err(e) => self.tolerate(e.in_section(name), summary)?,
            }
        }

        Ok(())
    }
}

fn report(name: &str, resources: &[tarball::ExtractedResource]) -> SubArchiveReport {
    let skipped = resources.iter().filter(|r| r.was_skipped).count();
    SubArchiveReport {
        name: name.to_string(),
        files: resources.len() - skipped,
        skipped,
    }
}
