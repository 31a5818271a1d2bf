use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The two binary text containers understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Table,
    MBM,
}

impl FileKind {
    /// Resolve a kind from a file extension (`.tbl` / `.mbm`, any case).
    /// Returns `None` for anything else.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "tbl" => Some(FileKind::Table),
            "mbm" => Some(FileKind::MBM),
            _     => None,
        }
    }

    /// Tag line written by the two-line envelope layout.
    /// Contains "MBM" iff the kind is MBM.
    pub fn tag(self) -> &'static str {
        match self {
            FileKind::Table => "exim.Table",
            FileKind::MBM   => "exim.MBM",
        }
    }

    /// Resolve a tag line by exact match.  Also accepts the tags written by
    /// the older .NET tool so its exports stay importable.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "exim.Table" | "OriginTablets.Types.Table" => Some(FileKind::Table),
            "exim.MBM"   | "OriginTablets.Types.MBM"   => Some(FileKind::MBM),
            _                                          => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Table => f.write_str("Table"),
            FileKind::MBM   => f.write_str("MBM"),
        }
    }
}

/// Width of the entries in a Table's pointer table.  MBM files ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerWidth {
    #[default]
    Short,
    Long,
}

impl PointerWidth {
    pub fn from_long_flag(long: bool) -> Self {
        if long { PointerWidth::Long } else { PointerWidth::Short }
    }

    /// Size of one pointer in bytes.
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            PointerWidth::Short => 2,
            PointerWidth::Long  => 4,
        }
    }

    /// Largest offset one pointer can hold.
    #[inline]
    pub fn max_offset(self) -> u64 {
        match self {
            PointerWidth::Short => u16::MAX as u64,
            PointerWidth::Long  => u32::MAX as u64,
        }
    }
}

impl fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerWidth::Short => f.write_str("short"),
            PointerWidth::Long  => f.write_str("long"),
        }
    }
}
