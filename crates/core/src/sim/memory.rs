//! Memory registration and initialization.
//!
//! Design memories are registered under a human-readable name together with their
//! design scope. A `--meminit name,file[,type]` argument selects a registered
//! memory and an image; the image kind comes from the explicit type or the file
//! extension.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::loader::elf_to_binary;
use crate::common::ConfigError;
use crate::dut::Dut;

/// Kind of a memory initialization file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemInitType {
    /// No extension; loaded as ELF.
    Empty,
    /// ELF executable, flattened before loading.
    Elf,
    /// Verilog memory file, handed to the design's own loader.
    Vmem,
    /// Anything else; rejected.
    Unknown,
}

impl MemInitType {
    /// Derives the kind from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map_or(Self::Empty, |ext| Self::from_name(&ext.to_string_lossy()))
    }

    /// Parses an explicit type name (`elf` or `vmem`, case-insensitive).
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "elf" => Self::Elf,
            "vmem" => Self::Vmem,
            _ => Self::Unknown,
        }
    }
}

/// One parsed memory initialization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemInitRequest {
    /// Registered memory name.
    pub name: String,
    /// Image path.
    pub path: PathBuf,
    /// Image kind.
    pub kind: MemInitType,
}

/// A parsed `--meminit` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemInitArg {
    /// `list`: print the registered memories.
    List,
    /// Load an image into a registered memory.
    Load(MemInitRequest),
}

/// Parses a `--meminit` argument of the form `name,file[,type]` or `list`.
///
/// # Errors
///
/// Returns `ConfigError::MalformedMeminit` for the wrong number of fields and
/// `ConfigError::EmptyMeminitField` if any field is empty.
pub fn parse_meminit(arg: &str) -> Result<MemInitArg, ConfigError> {
    if arg == "list" {
        return Ok(MemInitArg::List);
    }
    let fields: Vec<&str> = arg.split(',').collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(ConfigError::MalformedMeminit {
            arg: arg.to_owned(),
        });
    }
    if fields.iter().any(|field| field.is_empty()) {
        return Err(ConfigError::EmptyMeminitField {
            arg: arg.to_owned(),
        });
    }

    let path = PathBuf::from(fields[1]);
    let kind = fields
        .get(2)
        .map_or_else(|| MemInitType::from_path(&path), |ty| MemInitType::from_name(ty));
    Ok(MemInitArg::Load(MemInitRequest {
        name: fields[0].to_owned(),
        path,
        kind,
    }))
}

/// Name-to-scope map of the design memories that can be initialized.
#[derive(Clone, Debug, Default)]
pub struct MemoryRegistry {
    areas: BTreeMap<String, String>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the memory at design scope `location` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateMemory` if `name` is taken.
    pub fn register(&mut self, name: &str, location: &str) -> Result<(), ConfigError> {
        if let Some(previous) = self.areas.get(name) {
            return Err(ConfigError::DuplicateMemory {
                name: name.to_owned(),
                location: location.to_owned(),
                previous: previous.clone(),
            });
        }
        let _ = self.areas.insert(name.to_owned(), location.to_owned());
        Ok(())
    }

    /// Design scope registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownMemory` if nothing is registered under `name`.
    pub fn location(&self, name: &str) -> Result<&str, ConfigError> {
        self.areas
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownMemory {
                name: name.to_owned(),
                registered: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.areas.keys().map(String::as_str)
    }

    /// Returns true if no memory is registered.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Prints the registered memories.
    pub fn print_list(&self) {
        println!("Registered memory areas:");
        for (name, location) in &self.areas {
            println!("  {name:<10} {location}");
        }
    }

    /// Loads the image of `request` into the design.
    ///
    /// ELF images (and files without extension) are flattened and written word by
    /// word in little-endian order; VMEM files go through the design's loader.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown name, an unreadable file, an unknown
    /// file type, an ELF conversion failure or a design without that memory.
    pub fn load<D: Dut + ?Sized>(
        &self,
        dut: &mut D,
        request: &MemInitRequest,
    ) -> Result<(), ConfigError> {
        let location = self.location(&request.name)?;
        let _ = fs::metadata(&request.path).map_err(|source| ConfigError::UnreadableFile {
            path: request.path.clone(),
            source,
        })?;

        match request.kind {
            MemInitType::Empty | MemInitType::Elf => {
                let image = elf_to_binary(&request.path)?;
                for (index, chunk) in image.chunks(4).enumerate() {
                    let mut word = [0u8; 4];
                    word[..chunk.len()].copy_from_slice(chunk);
                    dut.write_memory_word(location, index, u32::from_le_bytes(word))?;
                }
            }
            MemInitType::Vmem => dut.load_vmem(location, &request.path)?,
            MemInitType::Unknown => {
                return Err(ConfigError::UnknownFileType {
                    path: request.path.clone(),
                });
            }
        }

        info!(
            "loaded {} into {} ({location})",
            request.path.display(),
            request.name
        );
        Ok(())
    }
}
