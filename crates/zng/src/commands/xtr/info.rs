use clap::Args;
use itertools::Itertools;
use miette::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use zng_xtr::{interleave, Container};

#[derive(Args)]
pub struct InfoArgs {
    /// An input XTR file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let data = super::read_container(&self.file)?;
        let xtr = Container::open(&data)?;

        let header = xtr.header();
        println!("{} ({} bytes)", self.file.display().bold(), xtr.len());
        println!(
            "align: {:#x}, unknown section size: {:#x}, pointer count hint: {}",
            header.align, header.unknown_section_size, header.pointer_count_hint
        );

        let mut tail_start = None;
        for section in xtr.sections() {
            let section = section?;
            let blob = section.blob()?;
            tail_start = Some(section.pointer.section_end());

            println!(
                "  {:<16} offset {:#010x}  {:>8} -> {:>8} bytes",
                section.name().green(),
                section.pointer.offset,
                blob.header.compressed_size,
                blob.header.uncompressed_size
            );
        }

        let Some(tail_start) = tail_start else {
            println!("{}", "no sections".red());
            return Ok(());
        };
        println!("tail starts at {:#x}", tail_start);

        match interleave::reconstruct(&data, tail_start) {
            Some(tail) => {
                let layout = tail.layout;
                println!(
                    "  interlace offset {}, gap {} ({} chunks of {} bytes)",
                    layout.pre_size,
                    layout.gap_size,
                    layout.batches_per_gap(),
                    layout.chunk_size
                );
                println!(
                    "  {} audio blocks ({} bytes), {} blank chunks",
                    tail.audio_blocks,
                    tail.audio.len(),
                    tail.blank_chunks
                );
                if !tail.resources.is_empty() {
                    println!(
                        "  resources: {}",
                        tail.resources
                            .iter()
                            .map(|r| format!(
                                "{} ({} chunks at {:#x})",
                                r.name(),
                                r.chunks,
                                r.offset
                            ))
                            .join(", ")
                    );
                }
            }
            None => println!("  {}", "no audio in the tail region".red()),
        }

        Ok(())
    }
}
