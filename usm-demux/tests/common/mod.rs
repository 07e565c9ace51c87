#![allow(dead_code)]

use usm_demux::{
    meta::{ElementValue, MetaTableInfo, UTF_SIGNATURE},
    sector::{CRID_SIGNATURE, SFA_SIGNATURE, SFV_SIGNATURE},
};

pub const KEY1: u32 = 0x0B2B_2A79;
pub const KEY2: u32 = 0x0000_4533;

/// Column of a synthetic `@UTF` table.
pub enum Column {
    Null(&'static str),
    Constant(&'static str, ElementValue),
    PerRow(&'static str, Vec<ElementValue>),
}

#[derive(Default)]
struct Pool(Vec<u8>);

impl Pool {
    fn add(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.0.len() as u32;
        self.0.extend_from_slice(bytes);
        offset
    }

    fn add_str(&mut self, s: &str) -> u32 {
        let offset = self.add(s.as_bytes());
        self.0.push(0);
        offset
    }
}

fn type_code(value: &ElementValue) -> u8 {
    value.element_type().code() + 0x0F
}

fn encode(value: &ElementValue, strings: &mut Pool, blob: &mut Pool) -> Vec<u8> {
    match value {
        ElementValue::Null => vec![],
        ElementValue::I8(x) => x.to_be_bytes().to_vec(),
        ElementValue::U8(x) => x.to_be_bytes().to_vec(),
        ElementValue::I16(x) => x.to_be_bytes().to_vec(),
        ElementValue::U16(x) => x.to_be_bytes().to_vec(),
        ElementValue::I32(x) => x.to_be_bytes().to_vec(),
        ElementValue::U32(x) => x.to_be_bytes().to_vec(),
        ElementValue::I64(x) => x.to_be_bytes().to_vec(),
        ElementValue::U64(x) => x.to_be_bytes().to_vec(),
        ElementValue::F32(x) => x.to_be_bytes().to_vec(),
        ElementValue::String(x) => strings.add_str(x).to_be_bytes().to_vec(),
        ElementValue::Bytes(x) => {
            let start = blob.add(x);
            [start.to_be_bytes(), (x.len() as u32).to_be_bytes()].concat()
        }
    }
}

/// Serialize a metadata table, `@UTF` header included.
pub fn table(name: &str, rows: u32, columns: &[Column]) -> Vec<u8> {
    let mut strings = Pool::default();
    let mut blob = Pool::default();
    strings.add_str("<NULL>");
    let name_offset = strings.add_str(name);

    let mut schema = Vec::new();
    for column in columns {
        match column {
            Column::Null(n) => {
                schema.push(0x0F);
                schema.extend(strings.add_str(n).to_be_bytes());
            }
            Column::Constant(n, v) => {
                schema.push((1 << 5) | type_code(v));
                schema.extend(strings.add_str(n).to_be_bytes());
                schema.extend(encode(v, &mut strings, &mut blob));
            }
            Column::PerRow(n, v) => {
                schema.push((2 << 5) | type_code(&v[0]));
                schema.extend(strings.add_str(n).to_be_bytes());
            }
        }
    }

    let mut values = Vec::new();
    for row in 0..rows as usize {
        for column in columns {
            if let Column::PerRow(_, v) = column {
                values.extend(encode(&v[row], &mut strings, &mut blob));
            }
        }
    }

    let value_offset = (MetaTableInfo::SIZE + schema.len()) as u32;
    let string_offset = value_offset + values.len() as u32;
    let data_offset = string_offset + strings.0.len() as u32;
    let data_size = data_offset + blob.0.len() as u32;

    let mut out = Vec::new();
    out.extend(UTF_SIGNATURE.to_be_bytes());
    out.extend(data_size.to_be_bytes());
    out.extend(value_offset.to_be_bytes());
    out.extend(string_offset.to_be_bytes());
    out.extend(data_offset.to_be_bytes());
    out.extend(name_offset.to_be_bytes());
    out.extend((columns.len() as u16).to_be_bytes());
    out.extend(((values.len() as u32 / rows.max(1)) as u16).to_be_bytes());
    out.extend(rows.to_be_bytes());
    out.extend(schema);
    out.extend(values);
    out.extend(strings.0);
    out.extend(blob.0);
    out
}

/// Serialize one sector with `padding` trailing zero bytes.
pub fn sector(signature: u32, kind: u8, channel: u8, payload: &[u8], padding: u16) -> Vec<u8> {
    let data_size = (0x18 + payload.len() + padding as usize) as u32;

    let mut out = Vec::new();
    out.extend(signature.to_be_bytes());
    out.extend(data_size.to_be_bytes());
    out.push(0);
    out.push(0x18);
    out.extend(padding.to_be_bytes());
    out.push(channel);
    out.extend([0, 0]);
    out.push(kind);
    out.extend(0u32.to_be_bytes());
    out.extend(2997u32.to_be_bytes());
    out.extend([0; 8]);
    out.extend_from_slice(payload);
    out.extend(std::iter::repeat_n(0, padding as usize));
    out
}

pub const DATA: u8 = 0;
pub const META: u8 = 1;
pub const FOOTER: u8 = 2;

/// `CRID` metadata sector announcing the container row plus the given streams.
pub fn directory(streams: &[(u32, &str)]) -> Vec<u8> {
    let mut filenames = vec![ElementValue::String("movie.usm".into())];
    let mut stmids = vec![ElementValue::I32(0)];
    let mut channels = vec![ElementValue::U16(0xFFFF)];

    for (i, (stmid, filename)) in streams.iter().enumerate() {
        filenames.push(ElementValue::String((*filename).into()));
        stmids.push(ElementValue::I32(*stmid as i32));
        channels.push(ElementValue::U16(i as u16));
    }

    let rows = filenames.len() as u32;
    let table = table(
        "CRIUSF_DIR_STREAM",
        rows,
        &[
            Column::Constant("fmtver", ElementValue::I32(0x01000300)),
            Column::PerRow("filename", filenames),
            Column::PerRow("stmid", stmids),
            Column::PerRow("chno", channels),
            Column::Null("minbuf"),
        ],
    );

    sector(CRID_SIGNATURE, META, 0, &table, 3)
}

pub fn video_sector(channel: u8, masked: &[u8]) -> Vec<u8> {
    sector(SFV_SIGNATURE, DATA, channel, masked, 0x10)
}

pub fn audio_sector(channel: u8, masked: &[u8]) -> Vec<u8> {
    sector(SFA_SIGNATURE, DATA, channel, masked, 0)
}

pub fn plaintext(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
