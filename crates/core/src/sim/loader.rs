//! ELF image flattening.
//!
//! Converts a 32-bit ELF executable into the flat byte image written into a design
//! memory: the file data of every `PT_LOAD` segment, each followed by zero fill up
//! to its memory size, concatenated in program-header order.

use std::fs;
use std::path::Path;

use object::{Endianness, FileKind};
use object::elf::{FileHeader32, PT_LOAD};
use object::read::elf::{FileHeader, ProgramHeader};
use tracing::{debug, warn};

use crate::common::ConfigError;

/// Largest flattened image accepted, bounding the zero fill a header can request.
pub const MAX_IMAGE_SIZE: usize = 64 * 1024 * 1024;

/// Reads the ELF file at `path` and returns its loadable contents as one flat buffer.
///
/// # Errors
///
/// Returns `ConfigError::UnreadableFile` if the file cannot be read, and
/// `ConfigError::Elf` if it is not a well-formed 32-bit ELF file.
pub fn elf_to_binary(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let data = fs::read(path).map_err(|source| ConfigError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    let elf_error = |reason: String| ConfigError::Elf {
        path: path.to_path_buf(),
        reason,
    };

    match FileKind::parse(data.as_slice()) {
        Ok(FileKind::Elf32) => {}
        Ok(FileKind::Elf64) => {
            return Err(elf_error("only 32-bit ELF files are supported".to_owned()));
        }
        _ => return Err(elf_error("not an ELF file".to_owned())),
    }

    let data = data.as_slice();
    let header = FileHeader32::<Endianness>::parse(data)
        .map_err(|e| elf_error(format!("malformed ELF header: {e}")))?;
    let endian = header
        .endian()
        .map_err(|e| elf_error(format!("unsupported byte order: {e}")))?;
    let segments = header
        .program_headers(endian, data)
        .map_err(|e| elf_error(format!("could not read program headers: {e}")))?;

    let mut image = Vec::new();
    for (idx, segment) in segments.iter().enumerate() {
        if segment.p_type(endian) != PT_LOAD {
            warn!(
                "program header {idx} in {} is not of type PT_LOAD; ignoring",
                path.display()
            );
            continue;
        }
        let bytes = segment
            .data(endian, data)
            .map_err(|()| elf_error(format!("segment {idx} lies outside the file")))?;
        let memsz = segment.p_memsz(endian) as usize;
        debug!(
            segment = idx,
            filesz = bytes.len(),
            memsz,
            "loading segment"
        );
        let end = image
            .len()
            .checked_add(memsz.max(bytes.len()))
            .filter(|&end| end <= MAX_IMAGE_SIZE)
            .ok_or_else(|| {
                elf_error(format!(
                    "segment {idx} grows the image past {MAX_IMAGE_SIZE} bytes"
                ))
            })?;
        image.extend_from_slice(bytes);
        image.resize(end, 0);
    }
    Ok(image)
}
