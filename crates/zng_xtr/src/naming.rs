//! Recovery of original file names from embedded resource headers.

use byteorder::{ByteOrder, LittleEndian};
use tracing::warn;

use crate::order::SKIP_MARKER;
use crate::view::ByteView;
use crate::write::{ORDER_FILE_NAME, RAW_SECTION_FILE_NAME};

/// Resource header layouts which carry their own file name
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NameLayout {
    /// Sound bank, name at 0x18 without extension
    Spa,

    /// Sound sequence, name at 0x18 without extension
    Spc,

    /// Model data, name at 0x10 including its extension
    Spm,

    /// Any other magic, the resource carries no name
    Unrecognized(u32),
}

impl NameLayout {
    pub const SPA_MAGIC: u32 = 0x59238771;
    pub const SPC_MAGIC: u32 = 0x09463AD8;
    pub const SPM_MAGIC: u32 = 0x18DF540A;

    pub fn from_magic(magic: u32) -> Self {
        match magic {
            Self::SPA_MAGIC => NameLayout::Spa,
            Self::SPC_MAGIC => NameLayout::Spc,
            Self::SPM_MAGIC => NameLayout::Spm,
            other => NameLayout::Unrecognized(other),
        }
    }

    /// Identify the layout from the first four bytes of a resource
    pub fn detect(resource: &[u8]) -> Self {
        match resource.get(..4) {
            Some(magic) => Self::from_magic(LittleEndian::read_u32(magic)),
            None => NameLayout::Unrecognized(0),
        }
    }

    /// Offset of the null terminated name
    pub fn name_offset(&self) -> Option<usize> {
        match self {
            NameLayout::Spa | NameLayout::Spc => Some(0x18),
            NameLayout::Spm => Some(0x10),
            NameLayout::Unrecognized(_) => None,
        }
    }

    /// Extension appended to the embedded name
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            NameLayout::Spa => Some(".spa"),
            NameLayout::Spc => Some(".spc"),
            NameLayout::Spm | NameLayout::Unrecognized(_) => None,
        }
    }
}

/// Recover the original name of a resource from its header
///
/// Names which are not usable as a single path component are rejected.
pub fn resolve_name(resource: &[u8]) -> Option<String> {
    let layout = NameLayout::detect(resource);
    let raw = ByteView::new(resource).c_str_at(layout.name_offset()?)?;

    let mut name = String::from_utf8_lossy(raw).into_owned();
    if let Some(extension) = layout.extension() {
        name.push_str(extension);
    }

    if !is_safe_component(&name) {
        warn!(?layout, "ignoring unusable embedded name {:?}", name);
        return None;
    }

    Some(name)
}

/// Name used for entries without a recoverable name
pub fn synthesize_name(index: usize) -> String {
    format!("{:05}", index)
}

/// A name must survive as one path component and as one `_order.txt` line
fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.trim() == name
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
        && ![SKIP_MARKER, ORDER_FILE_NAME, RAW_SECTION_FILE_NAME].contains(&name)
}
