//! Loaded MiniJ programs and the mapping from byte spans back to `line:column`.

use hashbrown::HashMap;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifies one loaded program. Id 1 is reserved for compiler-synthesized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId(pub(crate) NonZeroU32);

impl SourceId {
    const BUILTIN: SourceId = SourceId(NonZeroU32::MIN);

    pub(crate) fn new(id: u32) -> Self {
        NonZeroU32::new(id).map_or(Self::BUILTIN, SourceId)
    }

    fn index(self) -> Option<usize> {
        (self.0.get() as usize).checked_sub(2)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A byte offset into one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLoc {
    pub source_id: SourceId,
    pub offset: u32,
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SourceLoc {
    pub(crate) fn new(source_id: SourceId, offset: u32) -> Self {
        SourceLoc { source_id, offset }
    }

    /// Location of builtin stubs and other nodes without source text
    pub(crate) fn builtin() -> Self {
        SourceLoc::new(SourceId::BUILTIN, 0)
    }
}

/// A byte range in one program, packed into 64 bits:
/// source id in the top 20 bits, then a 22 bit length and a 22 bit offset.
/// Programs are limited to 4 MiB; longer offsets and lengths saturate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan(u64);

impl Default for SourceSpan {
    fn default() -> Self {
        Self::empty()
    }
}

const FIELD_BITS: u32 = 22;
const FIELD_MAX: u64 = (1 << FIELD_BITS) - 1;
const ID_SHIFT: u32 = 2 * FIELD_BITS;

impl SourceSpan {
    pub(crate) fn new_with_length(source_id: SourceId, offset: u32, length: u32) -> Self {
        let id = u64::from(source_id.0.get()) << ID_SHIFT;
        let length = u64::from(length).min(FIELD_MAX) << FIELD_BITS;
        Self(id | length | u64::from(offset).min(FIELD_MAX))
    }

    pub(crate) fn empty() -> Self {
        Self::new_with_length(SourceId::BUILTIN, 0, 0)
    }

    pub(crate) fn source_id(&self) -> SourceId {
        SourceId::new((self.0 >> ID_SHIFT) as u32)
    }

    fn offset(&self) -> u32 {
        (self.0 & FIELD_MAX) as u32
    }

    fn length(&self) -> u32 {
        ((self.0 >> FIELD_BITS) & FIELD_MAX) as u32
    }

    pub(crate) fn start(&self) -> SourceLoc {
        SourceLoc::new(self.source_id(), self.offset())
    }

    pub(crate) fn end(&self) -> SourceLoc {
        SourceLoc::new(self.source_id(), self.offset() + self.length())
    }

    pub(crate) fn is_builtin(&self) -> bool {
        self.source_id() == SourceId::BUILTIN
    }

    /// Smallest span covering both; spans of different programs keep `self`.
    pub(crate) fn merge(self, other: SourceSpan) -> SourceSpan {
        if self.source_id() != other.source_id() {
            return self;
        }
        let start = self.offset().min(other.offset());
        let end = self.end().offset.max(other.end().offset);
        Self::new_with_length(self.source_id(), start, end - start)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{}]", self.source_id(), self.offset(), self.end().offset)
    }
}

/// One loaded program
#[derive(Debug)]
pub struct FileInfo {
    pub file_id: SourceId,
    pub path: PathBuf,
    pub(crate) buffer: Arc<[u8]>,
    pub line_starts: Vec<u32>,
}

impl FileInfo {
    fn new(file_id: SourceId, path: PathBuf, buffer: Vec<u8>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                buffer
                    .iter()
                    .enumerate()
                    .filter(|&(_, &byte)| byte == b'\n')
                    .map(|(i, _)| i as u32 + 1),
            )
            .collect();
        FileInfo {
            file_id,
            path,
            buffer: buffer.into(),
            line_starts,
        }
    }
}

/// Owns every loaded program. Loading the same path twice yields the same id.
#[derive(Default)]
pub struct SourceManager {
    files: Vec<FileInfo>,
    by_path: HashMap<PathBuf, SourceId>,
}

impl SourceManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_file_from_path(&mut self, path: &Path) -> std::io::Result<SourceId> {
        if let Some(&id) = self.by_path.get(path) {
            return Ok(id);
        }
        let buffer = std::fs::read(path)?;
        Ok(self.insert(path.to_path_buf(), buffer))
    }

    pub(crate) fn add_buffer(&mut self, buffer: Vec<u8>, name: &str) -> SourceId {
        self.insert(PathBuf::from(name), buffer)
    }

    fn insert(&mut self, path: PathBuf, buffer: Vec<u8>) -> SourceId {
        // ids start after the reserved builtin id
        let id = SourceId::new(self.files.len() as u32 + 2);
        self.by_path.insert(path.clone(), id);
        self.files.push(FileInfo::new(id, path, buffer));
        id
    }

    pub(crate) fn get_file_info(&self, source_id: SourceId) -> Option<&FileInfo> {
        self.files.get(source_id.index()?)
    }

    /// Contents of a program; empty for builtin or unknown ids
    pub(crate) fn get_buffer(&self, source_id: SourceId) -> &[u8] {
        self.get_file_info(source_id).map_or(&[][..], |info| &info.buffer[..])
    }

    /// 1-based `(line, column)` of a location
    pub(crate) fn get_line_column(&self, loc: SourceLoc) -> Option<(u32, u32)> {
        let info = self.get_file_info(loc.source_id)?;
        let line = info.line_starts.partition_point(|&start| start <= loc.offset);
        let line_start = info.line_starts[line - 1];
        Some((line as u32, loc.offset - line_start + 1))
    }

    pub(crate) fn get_source_text(&self, span: SourceSpan) -> &str {
        let buffer = self.get_buffer(span.source_id());
        let end = (span.end().offset as usize).min(buffer.len());
        let start = (span.start().offset as usize).min(end);
        std::str::from_utf8(&buffer[start..end]).unwrap_or("<invalid-utf8>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_to_lines_and_columns() {
        let mut sm = SourceManager::new();
        let id = sm.add_buffer(b"int x;\nvoid main() {}\n".to_vec(), "prog.mj");
        assert_eq!(sm.get_line_column(SourceLoc::new(id, 0)), Some((1, 1)));
        assert_eq!(sm.get_line_column(SourceLoc::new(id, 7)), Some((2, 1)));
        assert_eq!(sm.get_line_column(SourceLoc::new(id, 12)), Some((2, 6)));
        assert_eq!(sm.get_line_column(SourceLoc::builtin()), None);
    }

    #[test]
    fn span_packs_and_merges() {
        let mut sm = SourceManager::new();
        let id = sm.add_buffer(b"abcdef".to_vec(), "s");
        let a = SourceSpan::new_with_length(id, 1, 2);
        let b = SourceSpan::new_with_length(id, 4, 1);
        let merged = a.merge(b);
        assert_eq!(merged.source_id(), id);
        assert_eq!(merged.start().offset, 1);
        assert_eq!(merged.end().offset, 5);
        assert_eq!(sm.get_source_text(merged), "bcde");
        assert!(SourceSpan::empty().is_builtin());
        assert!(!merged.is_builtin());
    }

    #[test]
    fn same_path_is_loaded_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p.mj");
        std::fs::write(&path, "int main() { return 0; }").expect("write");
        let mut sm = SourceManager::new();
        let first = sm.add_file_from_path(&path).expect("load");
        assert_eq!(sm.add_file_from_path(&path).expect("load"), first);
        assert_eq!(sm.get_buffer(first).len(), 24);
    }
}
