use super::{
    ElementType, ElementValue, MetaElement, MetaPage, MetaTableHeader, MetaTableInfo,
    StorageKind, UTF_SIGNATURE,
};
use crate::{Error, Reader, Result, reader::slice_until_nul};
use log::{debug, warn};

/// A decoded metadata table: a name and one [`MetaPage`] per row.
///
/// Every page carries the same columns in the same order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetaSection {
    name: String,
    pages: Vec<MetaPage>,
}

/// A per-row cell discovered during the column scan, filled once the scan is over.
struct PendingValue {
    key: u64,
    page: usize,
    column: usize,
    element_type: ElementType,
}

/// How one scanned column provides its values.
enum Storage {
    Null,
    Constant(ElementValue),
    PerRow(ElementType),
}

/// Regions of the table body that values point into.
struct Pools<'a> {
    strings: &'a [u8],
    blob: &'a [u8],
}

impl Pools<'_> {
    fn string(&self, offset: u32, context: &'static str) -> Result<String> {
        slice_until_nul(self.strings, offset as usize)
            .map(|x| String::from_utf8_lossy(x).into_owned())
            .ok_or_else(|| {
                Error::table_truncated(context, offset as u64, 1, self.strings.len() as u64)
            })
    }

    fn bytes(&self, start: u32, len: u32) -> Result<Vec<u8>> {
        let (start, len) = (start as usize, len as usize);

        start
            .checked_add(len)
            .and_then(|end| self.blob.get(start..end))
            .map(|x| x.to_vec())
            .ok_or_else(|| {
                Error::table_truncated(
                    "byte array value",
                    start as u64,
                    len as u64,
                    self.blob.len() as u64,
                )
            })
    }
}

impl MetaSection {
    /// Parse a metadata table starting at its `@UTF` header.
    ///
    /// Constant values sit inline after their column descriptor. Per-row values
    /// follow the descriptors row-major, while the descriptors are scanned
    /// column-major; pending cells are therefore sorted by
    /// `row * element_count + column` and read in that order.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let header = MetaTableHeader::parse(&mut reader)?;

        if header.signature != UTF_SIGNATURE {
            return Err(Error::InvalidSignature {
                expected: UTF_SIGNATURE,
                found: header.signature,
            });
        }

        let body = reader.take(header.data_size as usize, "table body")?;
        let mut reader = Reader::new(body);
        let info = MetaTableInfo::parse(&mut reader)?;

        let pools = Pools {
            strings: region(body, info.string_offset, info.data_offset, "string region")?,
            blob: region(body, info.data_offset, header.data_size, "data region")?,
        };
        let name = pools.string(info.name_offset, "table name")?;
        let page_count = info.page_count as usize;
        let element_count = info.element_count as u64;

        debug!(
            "metadata table {:?}: {} columns, {} rows",
            name, info.element_count, info.page_count
        );

        if page_count == 0 {
            return Ok(Self {
                name,
                pages: Vec::new(),
            });
        }

        let mut columns = Vec::with_capacity(info.element_count as usize);

        for _ in 0..element_count {
            let descriptor = reader.read_u8("element descriptor")?;
            let name_offset = reader.read_u32("element name offset")?;
            let element_name = pools.string(name_offset, "element name")?;

            let storage = match StorageKind::from_descriptor(descriptor) {
                Some(StorageKind::Null) => Storage::Null,
                Some(StorageKind::Constant) => {
                    let element_type = ElementType::from_descriptor(descriptor)?;
                    Storage::Constant(read_value(element_type, &mut reader, &pools)?)
                }
                Some(StorageKind::PerRow) => {
                    Storage::PerRow(ElementType::from_descriptor(descriptor)?)
                }
                None => {
                    warn!(
                        "metadata table {:?}: ignoring column {:?} with storage kind {}",
                        name,
                        element_name,
                        descriptor >> 5
                    );
                    continue;
                }
            };

            columns.push((element_name, storage));
        }

        let row_size = columns
            .iter()
            .map(|(_, storage)| match storage {
                Storage::PerRow(x) => value_size(*x) as u64,
                _ => 0,
            })
            .sum::<u64>();
        let needed = row_size * page_count as u64;

        if needed > reader.remaining() as u64 {
            return Err(Error::table_truncated(
                "per-row values",
                reader.get_position(),
                needed,
                reader.remaining() as u64,
            ));
        }

        let mut pages = Vec::new();
        pages.try_reserve_exact(page_count).map_err(|_| {
            Error::table_truncated("table rows", reader.get_position(), needed, 0)
        })?;
        pages.resize(page_count, MetaPage::new());

        let mut pending = Vec::new();

        for (column, (element_name, storage)) in columns.iter().enumerate() {
            for (row, page) in pages.iter_mut().enumerate() {
                let i = page.push(element_name);

                match storage {
                    Storage::Null => (),
                    Storage::Constant(value) => set_cell(page, i, value.clone()),
                    // null cells carry no bytes, leave them as they are
                    Storage::PerRow(ElementType::Null) => (),
                    Storage::PerRow(element_type) => pending.push(PendingValue {
                        key: row as u64 * element_count + column as u64,
                        page: row,
                        column: i,
                        element_type: *element_type,
                    }),
                }
            }
        }

        pending.sort_by_key(|x| x.key);

        for cell in pending {
            let value = read_value(cell.element_type, &mut reader, &pools)?;
            set_cell(&mut pages[cell.page], cell.column, value);
        }

        Ok(Self { name, pages })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[MetaPage] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&MetaPage> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut MetaPage> {
        self.pages.get_mut(index)
    }

    /// Element `name` of row `page`.
    pub fn element(&self, page: usize, name: &str) -> Option<&MetaElement> {
        self.pages.get(page)?.get(name)
    }

    /// First column of row `page`.
    pub fn first_element(&self, page: usize) -> Option<&MetaElement> {
        self.pages.get(page)?.first()
    }
}

fn region<'a>(body: &'a [u8], start: u32, end: u32, context: &'static str) -> Result<&'a [u8]> {
    body.get(start as usize..end as usize).ok_or_else(|| {
        Error::table_truncated(
            context,
            start as u64,
            (end as u64).saturating_sub(start as u64),
            (body.len() as u64).saturating_sub(start as u64),
        )
    })
}

fn set_cell(page: &mut MetaPage, column: usize, value: ElementValue) {
    if let Some(element) = page.column_mut(column) {
        element.set_value(value);
    }
}

/// Bytes one value of `element_type` occupies in the value stream.
fn value_size(element_type: ElementType) -> usize {
    match element_type {
        ElementType::Null => 0,
        ElementType::I8 | ElementType::U8 => 1,
        ElementType::I16 | ElementType::U16 => 2,
        ElementType::I32 | ElementType::U32 | ElementType::F32 | ElementType::String => 4,
        ElementType::I64 | ElementType::U64 | ElementType::Bytes => 8,
    }
}

fn read_value(element_type: ElementType, reader: &mut Reader, pools: &Pools) -> Result<ElementValue> {
    Ok(match element_type {
        ElementType::Null => ElementValue::Null,
        ElementType::I8 => ElementValue::I8(reader.read_i8("i8 value")?),
        ElementType::U8 => ElementValue::U8(reader.read_u8("u8 value")?),
        ElementType::I16 => ElementValue::I16(reader.read_i16("i16 value")?),
        ElementType::U16 => ElementValue::U16(reader.read_u16("u16 value")?),
        ElementType::I32 => ElementValue::I32(reader.read_i32("i32 value")?),
        ElementType::U32 => ElementValue::U32(reader.read_u32("u32 value")?),
        ElementType::I64 => ElementValue::I64(reader.read_i64("i64 value")?),
        ElementType::U64 => ElementValue::U64(reader.read_u64("u64 value")?),
        ElementType::F32 => ElementValue::F32(reader.read_f32("f32 value")?),
        ElementType::String => {
            let offset = reader.read_u32("string value offset")?;
            ElementValue::String(pools.string(offset, "string value")?)
        }
        ElementType::Bytes => {
            let start = reader.read_u32("byte array offset")?;
            let len = reader.read_u32("byte array length")?;
            ElementValue::Bytes(pools.bytes(start, len)?)
        }
    })
}
