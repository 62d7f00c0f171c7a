//! Input handling and PE container location.
//!
//! A metadata file is a PE32 image whose CLR runtime header points at an ECMA-335 metadata root.
//! This module owns the raw bytes (either memory-mapped through [`physical`] or held on the heap
//! through [`memory`]) and walks just enough of the PE structure to find that root:
//!
//! 1. DOS header: `MZ` magic and `e_lfanew` at offset `0x3C`
//! 2. PE signature `PE\0\0`, COFF file header (section count, optional header size)
//! 3. Optional header: only the PE32 magic `0x10B` is accepted; data directory 14 is the CLR
//!    runtime header
//! 4. Section table: translates relative virtual addresses to file offsets
//! 5. CLR runtime header (72 bytes): the metadata directory
//!
//! Nothing else in the image (imports, relocations, resources) is of interest, so the walk is done
//! by hand over the bounded readers in [`io`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdscope::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Windows.Win32.winmd"))?;
//! println!("Metadata root at file offset {:#x}", file.metadata_offset());
//! # Ok::<(), winmdscope::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{Error::Empty, Result};
use io::read_le_at;
use memory::Memory;
use physical::Physical;

const DOS_MAGIC: u16 = 0x5A4D;
const PE_SIGNATURE: u32 = 0x0000_4550;
const PE32_MAGIC: u16 = 0x010B;
const CLR_DIRECTORY_INDEX: usize = 14;
const CLR_HEADER_SIZE: u32 = 72;
const SECTION_HEADER_SIZE: usize = 40;

/// Abstraction over the storage holding the file contents.
pub trait Backend: Send + Sync {
    /// Returns a bounds-checked slice of the contents.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the contents.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// The complete contents.
    fn data(&self) -> &[u8];

    /// Length of the contents in bytes.
    fn len(&self) -> usize;
}

/// One entry of the PE section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name, trailing NULs removed
    pub name: String,
    /// Size of the section once loaded
    pub virtual_size: u32,
    /// Relative virtual address of the section start
    pub virtual_address: u32,
    /// Size of the section's data in the file
    pub size_of_raw_data: u32,
    /// File offset of the section's data
    pub pointer_to_raw_data: u32,
}

impl Section {
    /// Returns true if `rva` lies within `[virtual_address, virtual_address + virtual_size)`.
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && u64::from(rva) < u64::from(self.virtual_address) + u64::from(self.virtual_size)
    }
}

/// A loaded metadata container with its located metadata root.
pub struct File {
    data: Box<dyn Backend>,
    sections: Vec<Section>,
    clr_rva: u32,
    clr_size: u32,
    metadata_offset: usize,
    metadata_size: usize,
}

impl File {
    /// Memory-map a file from disk and locate its metadata.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, [`crate::Error::Empty`]
    /// for an empty file, or [`crate::Error::Malformed`] if the PE structure is invalid.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Take ownership of an in-memory image and locate its metadata.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer, or [`crate::Error::Malformed`] if the
    /// PE structure is invalid.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let bytes = data.data();

        let dos_magic = read_le_at::<u16>(bytes, &mut 0)?;
        if dos_magic != DOS_MAGIC {
            return Err(malformed_error!("Invalid DOS magic - {:#x}", dos_magic));
        }

        let pe_offset = read_le_at::<u32>(bytes, &mut 0x3C)? as usize;
        let signature = read_le_at::<u32>(bytes, &mut { pe_offset })?;
        if signature != PE_SIGNATURE {
            return Err(malformed_error!("Invalid PE signature - {:#x}", signature));
        }

        let number_of_sections = read_le_at::<u16>(bytes, &mut (pe_offset + 6))?;
        let optional_header_size = read_le_at::<u16>(bytes, &mut (pe_offset + 20))? as usize;

        let optional_header = pe_offset + 24;
        let magic = read_le_at::<u16>(bytes, &mut { optional_header })?;
        if magic != PE32_MAGIC {
            return Err(malformed_error!(
                "Unsupported optional header magic - {:#x}",
                magic
            ));
        }

        let number_of_directories = read_le_at::<u32>(bytes, &mut (optional_header + 92))?;
        if number_of_directories as usize <= CLR_DIRECTORY_INDEX {
            return Err(malformed_error!(
                "File does not have a CLR runtime header directory"
            ));
        }

        let mut offset = optional_header + 96 + CLR_DIRECTORY_INDEX * 8;
        let clr_rva = read_le_at::<u32>(bytes, &mut offset)?;
        let clr_size = read_le_at::<u32>(bytes, &mut offset)?;
        if clr_rva == 0 {
            return Err(malformed_error!(
                "File does not have a CLR runtime header directory"
            ));
        }

        let section_table = optional_header + optional_header_size;
        let mut sections = Vec::with_capacity(number_of_sections as usize);
        for index in 0..number_of_sections as usize {
            let start = section_table + index * SECTION_HEADER_SIZE;
            let raw = data.data_slice(start, SECTION_HEADER_SIZE)?;

            let name_len = raw[..8].iter().position(|&b| b == 0).unwrap_or(8);
            let mut offset = 8;
            sections.push(Section {
                name: String::from_utf8_lossy(&raw[..name_len]).into_owned(),
                virtual_size: read_le_at::<u32>(raw, &mut offset)?,
                virtual_address: read_le_at::<u32>(raw, &mut offset)?,
                size_of_raw_data: read_le_at::<u32>(raw, &mut offset)?,
                pointer_to_raw_data: read_le_at::<u32>(raw, &mut offset)?,
            });
        }

        let clr_offset = rva_to_offset(&sections, clr_rva)?;
        let header_size = read_le_at::<u32>(bytes, &mut { clr_offset })?;
        if header_size != CLR_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR runtime header size - {}",
                header_size
            ));
        }

        let mut offset = clr_offset + 8;
        let metadata_rva = read_le_at::<u32>(bytes, &mut offset)?;
        let metadata_size = read_le_at::<u32>(bytes, &mut offset)? as usize;
        let metadata_offset = rva_to_offset(&sections, metadata_rva)?;

        // The whole metadata block must be present in the file
        data.data_slice(metadata_offset, metadata_size)?;

        log::trace!(
            "Located metadata at offset {:#x} ({} bytes, {} sections)",
            metadata_offset,
            metadata_size,
            sections.len()
        );

        Ok(File {
            data: Box::new(data),
            sections,
            clr_rva,
            clr_size,
            metadata_offset,
            metadata_size,
        })
    }

    /// Length of the file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The complete file contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// A bounds-checked slice of the file contents.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// The PE section table.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Relative virtual address and size of the CLR runtime header.
    #[must_use]
    pub fn clr(&self) -> (usize, usize) {
        (self.clr_rva as usize, self.clr_size as usize)
    }

    /// File offset of the metadata root.
    #[must_use]
    pub fn metadata_offset(&self) -> usize {
        self.metadata_offset
    }

    /// The metadata block, starting at the metadata root.
    #[must_use]
    pub fn metadata(&self) -> &[u8] {
        &self.data.data()[self.metadata_offset..self.metadata_offset + self.metadata_size]
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;
        rva_to_offset(&self.sections, rva_u32)
    }
}

fn rva_to_offset(sections: &[Section], rva: u32) -> Result<usize> {
    for section in sections {
        if section.contains_rva(rva) {
            return Ok((rva - section.virtual_address) as usize
                + section.pointer_to_raw_data as usize);
        }
    }

    Err(malformed_error!(
        "RVA could not be converted to offset - {:#x}",
        rva
    ))
}
