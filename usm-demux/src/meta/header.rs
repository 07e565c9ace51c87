use crate::{Reader, Result};

/// `@UTF`, the metadata table magic.
pub const UTF_SIGNATURE: u32 = 0x40555446;

/// Signature and body size that open every metadata table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaTableHeader {
    pub signature: u32,
    /// Size of the table body that follows this header.
    pub data_size: u32,
}

impl MetaTableHeader {
    pub const SIZE: usize = 0x08;

    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            signature: reader.read_u32("table signature")?,
            data_size: reader.read_u32("table data size")?,
        })
    }
}

/// Layout of a metadata table body. Offsets are relative to the end of [`MetaTableHeader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaTableInfo {
    pub value_offset: u32,
    pub string_offset: u32,
    pub data_offset: u32,
    pub name_offset: u32,
    /// Number of column descriptors.
    pub element_count: u16,
    /// Size in bytes of one row of per-row values.
    pub value_size: u16,
    /// Number of rows.
    pub page_count: u32,
}

impl MetaTableInfo {
    pub const SIZE: usize = 0x18;

    pub fn parse(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            value_offset: reader.read_u32("table value offset")?,
            string_offset: reader.read_u32("table string offset")?,
            data_offset: reader.read_u32("table data offset")?,
            name_offset: reader.read_u32("table name offset")?,
            element_count: reader.read_u16("table element count")?,
            value_size: reader.read_u16("table value size")?,
            page_count: reader.read_u32("table page count")?,
        })
    }
}
