//! Demultiplexing of the uncompressed tail region.
//!
//! After the last compressed section the container stores a continuous audio
//! stream cut into blocks of [`AUDIO_SIZE`] bytes. Between two audio blocks sits
//! a gap of [`CHUNK_SIZE`] byte chunks which holds further resources. Nothing
//! describes this layout, it is recovered from the data:
//!
//! - chunks before the audio start with eight zero bytes
//! - the gap after the first audio block is blank as well, its length is used
//!   as the stride for the rest of the file
//! - a gap chunk whose first two bytes are non-zero belongs to a resource,
//!   consecutive such chunks form one resource after their 16 byte chunk
//!   headers are stripped

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::tarball::{self, ExtractedResource};

/// Granularity of the tail region
pub const CHUNK_SIZE: usize = 512;

/// Size of a single audio block
pub const AUDIO_SIZE: usize = 1024;

/// Header in front of every resource chunk
pub const CHUNK_HEADER_SIZE: usize = 16;

/// Leading bytes which must be zero for a chunk to count as blank
const BLANK_MARKER_LEN: usize = 8;

/// Layout of the tail region as detected from its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveLayout {
    /// Absolute offset of the tail region
    pub tail_start: usize,

    /// Bytes between the tail start and the first audio block
    pub pre_size: usize,

    pub chunk_size: usize,

    pub audio_size: usize,

    /// Bytes between two audio blocks, a multiple of `chunk_size`
    pub gap_size: usize,
}

impl InterleaveLayout {
    /// Detect the layout of the tail starting at `tail_start`
    ///
    /// Returns `None` if no audio block exists before the end of the data.
    pub fn detect(data: &[u8], tail_start: usize) -> Option<Self> {
        let mut pos = tail_start;
        while is_blank(data, pos) {
            pos += CHUNK_SIZE;
        }
        if pos + BLANK_MARKER_LEN > data.len() {
            return None;
        }
        let pre_size = pos - tail_start;

        pos += AUDIO_SIZE;
        let mut gap_size = 0;
        while is_blank(data, pos) {
            pos += CHUNK_SIZE;
            gap_size += CHUNK_SIZE;
        }

        Some(Self {
            tail_start,
            pre_size,
            chunk_size: CHUNK_SIZE,
            audio_size: AUDIO_SIZE,
            gap_size,
        })
    }

    /// Absolute offset of the first audio block
    pub fn audio_start(&self) -> usize {
        self.tail_start + self.pre_size
    }

    /// Amount of chunks in every gap
    pub fn batches_per_gap(&self) -> usize {
        self.gap_size / self.chunk_size
    }

    /// Contents of the `_fileinfo` file
    pub fn file_info(&self) -> String {
        format!(
            "Interlace offset: {} \nUncompressed data size: {} \n",
            self.pre_size, self.gap_size
        )
    }

    /// Offsets of every chunk inside the gaps, audio blocks are stepped over
    fn gap_chunks(&self, len: usize) -> GapChunks {
        GapChunks {
            layout: *self,
            pos: self.audio_start() + self.audio_size,
            in_gap: 0,
            len,
        }
    }
}

fn is_blank(data: &[u8], pos: usize) -> bool {
    data.get(pos..pos + BLANK_MARKER_LEN)
        .is_some_and(|marker| marker.iter().all(|b| *b == 0))
}

fn is_active(chunk: &[u8]) -> bool {
    chunk[0] != 0 && chunk[1] != 0
}

fn align_up(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

struct GapChunks {
    layout: InterleaveLayout,
    pos: usize,
    in_gap: usize,
    len: usize,
}

impl Iterator for GapChunks {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let batches = self.layout.batches_per_gap();
        if batches == 0 || self.pos + self.layout.chunk_size > self.len {
            return None;
        }

        let current = self.pos;
        self.pos += self.layout.chunk_size;
        self.in_gap += 1;
        if self.in_gap == batches {
            // Realign on the absolute offset after the next audio block
            self.pos = align_up(self.pos + self.layout.audio_size, self.layout.chunk_size);
            self.in_gap = 0;
        }

        Some(current)
    }
}

/// A resource stitched together from consecutive active chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredResource {
    /// 1-based position in discovery order
    pub number: usize,

    /// Absolute offset of the first chunk
    pub offset: usize,

    /// Amount of chunks the resource was assembled from
    pub chunks: usize,

    /// Chunk payloads without their headers
    pub bytes: Vec<u8>,
}

impl RecoveredResource {
    /// Name of the output directory for this resource
    pub fn name(&self) -> String {
        format!("UNC_{}", self.number)
    }

    /// The payload is a sub-archive, split it into its files
    pub fn unpack(&self) -> Result<Vec<ExtractedResource>> {
        tarball::unpack(&self.bytes)
    }
}

/// Result of demultiplexing the tail region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interleave {
    pub layout: InterleaveLayout,

    /// The audio blocks joined into one stream
    pub audio: Vec<u8>,

    pub audio_blocks: usize,

    pub resources: Vec<RecoveredResource>,

    /// Inactive chunks seen outside of any resource
    pub blank_chunks: usize,
}

enum RunState {
    Idle,
    InRun {
        start: usize,
        chunks: usize,
        payload: Vec<u8>,
    },
}

/// Collects runs of active chunks into resources
struct RunAccumulator {
    state: RunState,
    resources: Vec<RecoveredResource>,
    blank_chunks: usize,
}

impl RunAccumulator {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            resources: Vec::new(),
            blank_chunks: 0,
        }
    }

    fn active(&mut self, offset: usize, chunk: &[u8]) {
        let payload = &chunk[CHUNK_HEADER_SIZE..];
        if let RunState::InRun {
            chunks, payload: buf, ..
        } = &mut self.state
        {
            *chunks += 1;
            buf.extend_from_slice(payload);
        } else {
            self.state = RunState::InRun {
                start: offset,
                chunks: 1,
                payload: payload.to_vec(),
            };
        }
    }

    fn inactive(&mut self) {
        match self.state {
            RunState::Idle => self.blank_chunks += 1,
            RunState::InRun { .. } => self.flush(),
        }
    }

    fn flush(&mut self) {
        if let RunState::InRun {
            start,
            chunks,
            payload,
        } = std::mem::replace(&mut self.state, RunState::Idle)
        {
            let number = self.resources.len() + 1;
            debug!(number, start, chunks, "recovered resource");
            self.resources.push(RecoveredResource {
                number,
                offset: start,
                chunks,
                bytes: payload,
            });
        }
    }

    fn finish(mut self) -> (Vec<RecoveredResource>, usize) {
        self.flush();
        (self.resources, self.blank_chunks)
    }
}

/// Split the tail region starting at `tail_start` into audio and resources
///
/// Returns `None` when the tail holds no audio.
#[instrument(skip(data), fields(len = data.len()))]
pub fn reconstruct(data: &[u8], tail_start: usize) -> Option<Interleave> {
    let Some(layout) = InterleaveLayout::detect(data, tail_start) else {
        warn!("no audio found in the tail region");
        return None;
    };
    debug!(?layout, "detected interleave layout");

    let mut audio = Vec::new();
    let mut audio_blocks = 0;
    let mut pos = layout.audio_start();
    while pos < data.len() {
        let end = (pos + layout.audio_size).min(data.len());
        audio.extend_from_slice(&data[pos..end]);
        audio_blocks += 1;
        pos += layout.audio_size + layout.gap_size;
    }

    let mut runs = RunAccumulator::new();
    for offset in layout.gap_chunks(data.len()) {
        let chunk = &data[offset..offset + layout.chunk_size];
        if is_active(chunk) {
            runs.active(offset, chunk);
        } else {
            runs.inactive();
        }
    }
    let (resources, blank_chunks) = runs.finish();

    Some(Interleave {
        layout,
        audio,
        audio_blocks,
        resources,
        blank_chunks,
    })
}
