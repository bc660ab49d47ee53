//! Builders for small synthetic containers

#![allow(dead_code)]

use zng_xtr::naming::NameLayout;

pub const CHUNK: usize = 512;
pub const AUDIO: usize = 1024;

/// Encode `data` as a stream of literals only
pub fn literal_stream(data: &[u8]) -> Vec<u8> {
    data.chunks(8)
        .flat_map(|group| std::iter::once(0xFF).chain(group.iter().copied()))
        .collect()
}

/// Build a sub-archive, `None` entries become skipped slots
pub fn sub_archive(files: &[Option<Vec<u8>>]) -> Vec<u8> {
    let table_size = files.len() * 16;
    let data_offset = 0x20 + table_size;
    let data_size = files.iter().flatten().map(Vec::len).sum::<usize>();
    let file_count = files.iter().flatten().count();

    let mut out = vec![0u8; 12];
    for value in [0x20, table_size, data_offset, data_size, file_count] {
        out.extend_from_slice(&(value as u32).to_le_bytes());
    }

    let mut offset = data_offset;
    for file in files {
        let entry = match file {
            Some(bytes) => {
                let entry = offset;
                offset += bytes.len();
                entry
            }
            None => 0,
        };
        out.extend_from_slice(&(entry as u32).to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);
    }

    for file in files.iter().flatten() {
        out.extend_from_slice(file);
    }
    out
}

/// A resource which carries its own name in its header
pub fn named_resource(layout: NameLayout, name: &str, len: usize) -> Vec<u8> {
    let magic = match layout {
        NameLayout::Spa => NameLayout::SPA_MAGIC,
        NameLayout::Spc => NameLayout::SPC_MAGIC,
        NameLayout::Spm => NameLayout::SPM_MAGIC,
        NameLayout::Unrecognized(magic) => magic,
    };
    let name_offset = layout.name_offset().unwrap_or(0x10);

    let mut out = vec![0x5Au8; len];
    out[..4].copy_from_slice(&magic.to_le_bytes());
    out[name_offset..name_offset + name.len()].copy_from_slice(name.as_bytes());
    out[name_offset + name.len()] = 0;
    out
}

pub fn blank() -> Vec<u8> {
    vec![0u8; CHUNK]
}

pub fn audio(fill: u8) -> Vec<u8> {
    vec![fill; AUDIO]
}

/// Split `payload` over active chunks, padding the last one with zeros
pub fn active_chunks(payload: &[u8]) -> Vec<Vec<u8>> {
    payload
        .chunks(CHUNK - 16)
        .map(|part| {
            let mut chunk = vec![0xA5u8; 16];
            chunk.extend_from_slice(part);
            chunk.resize(CHUNK, 0);
            chunk
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct ContainerBuilder {
    blobs: Vec<Vec<u8>>,
    tail: Vec<u8>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section holding `raw` once decompressed
    pub fn section(self, raw: &[u8]) -> Self {
        self.section_with_trailing(raw, &[])
    }

    /// Add a section whose token stream is followed by `junk`
    pub fn section_with_trailing(mut self, raw: &[u8], junk: &[u8]) -> Self {
        let mut stream = literal_stream(raw);
        stream.extend_from_slice(junk);

        let mut blob = Vec::new();
        blob.extend_from_slice(&(raw.len() as u32).to_le_bytes());
        blob.extend_from_slice(&(stream.len() as u32).to_le_bytes());
        blob.extend_from_slice(&stream);

        self.blobs.push(blob);
        self
    }

    pub fn tail(mut self, parts: &[Vec<u8>]) -> Self {
        self.tail = parts.concat();
        self
    }

    /// Lay the container out so the tail starts on a chunk boundary
    pub fn build(&self) -> Vec<u8> {
        let table_end = 16 + (self.blobs.len() + 1) * 16;
        let blob_size = self.blobs.iter().map(Vec::len).sum::<usize>();
        let first_blob = (table_end + blob_size).div_ceil(CHUNK) * CHUNK - blob_size;

        let mut out = Vec::new();
        out.extend_from_slice(&0x800u32.to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);

        let mut offset = first_blob;
        for blob in &self.blobs {
            let size = blob.len();
            for value in [offset + size, offset, size, 0] {
                out.extend_from_slice(&(value as u32).to_le_bytes());
            }
            offset += size;
        }
        out.extend_from_slice(&[0u8; 16]);

        out.resize(first_blob, 0);
        for blob in &self.blobs {
            out.extend_from_slice(blob);
        }
        out.extend_from_slice(&self.tail);
        out
    }
}

/// Offset of the blob of section `index`
pub fn blob_offset(container: &[u8], index: usize) -> usize {
    let at = 16 + index * 16 + 4;
    u32::from_le_bytes([
        container[at],
        container[at + 1],
        container[at + 2],
        container[at + 3],
    ]) as usize
}

/// Sub-archive recovered from the tail of [`sample`]
pub fn recovered_archive() -> Vec<u8> {
    let mut archive = sub_archive(&[Some(named_resource(NameLayout::Spm, "stage.spm", 900))]);
    archive.resize(2 * (CHUNK - 16), 0);
    archive
}

/// A container with two sections and one resource in its tail
///
/// - `END` holds `jump.spa`, a skipped slot and an unnamed file
/// - `TM0` holds a single unnamed file
/// - the tail has one blank chunk, then audio blocks separated by two chunk gaps
pub fn sample() -> ContainerBuilder {
    let end = sub_archive(&[
        Some(named_resource(NameLayout::Spa, "jump", 0x40)),
        None,
        Some(vec![0x42; 100]),
    ]);
    let tm0 = sub_archive(&[Some(vec![0x24; 300])]);

    let mut tail = vec![blank(), audio(0x11), blank(), blank(), audio(0x22)];
    tail.extend(active_chunks(&recovered_archive()));
    tail.extend([audio(0x33), blank(), blank()]);

    ContainerBuilder::new().section(&end).section(&tm0).tail(&tail)
}
