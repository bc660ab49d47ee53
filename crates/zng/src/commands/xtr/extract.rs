use clap::Args;
use miette::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::{info, warn};
use zng_xtr::{ExtractOptions, Extractor};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input XTR file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting files in the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Skip sections which fail to extract instead of stopping
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// Accept sections with leftover or overlong compressed data
    #[arg(long, default_value_t = false)]
    lenient: bool,

    /// Do not write the decompressed `_rawsection` files
    #[arg(long, default_value_t = false)]
    no_raw: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let data = super::read_container(&self.file)?;

        let options = ExtractOptions::builder()
            .overwrite(self.overwrite)
            .keep_going(self.keep_going)
            .lenient(self.lenient)
            .raw_sections(!self.no_raw)
            .build();

        info!(
            "extracting {} into {}",
            self.file.display(),
            self.directory.display()
        );
        let summary = Extractor::new(options)
            .extract_to_dir(&data, &self.directory)
            .context(format!("extracting {}", self.file.display()))?;

        for report in summary.sections.iter().chain(&summary.recovered) {
            println!(
                "{} {} files, {} skipped",
                report.name.green(),
                report.files,
                report.skipped
            );
        }

        if !summary.failures.is_empty() {
            for failure in &summary.failures {
                warn!("{}", failure);
            }
            println!(
                "{}",
                format!("{} sections failed to extract", summary.failures.len()).red()
            );
        }

        Ok(())
    }
}
