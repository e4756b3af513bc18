//! Tagged chunk framing: `[tag: 4 bytes][len: u32 LE][payload]`.

use std::io::{self, Write};

use scenery_core::{Result, SceneryError};

pub type Tag = [u8; 4];

pub const TOKN: Tag = *b"TOKN";
pub const DIRS: Tag = *b"DIRS";
pub const DEMS: Tag = *b"DEMS";
pub const PMWX: Tag = *b"PMWX";

/// Size of the tag plus length prefix.
pub const ATOM_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atom<'a> {
    pub tag: Tag,
    pub payload: &'a [u8],
}

impl Atom<'_> {
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

pub fn write_atom<W: Write>(writer: &mut W, tag: Tag, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "atom payload over 4 GiB"))?;
    writer.write_all(&tag)?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)
}

/// Walks the atoms of a buffer in order.
pub struct AtomReader<'a> {
    data: &'a [u8],
    offset: usize,
    name: &'a str,
}

impl<'a> AtomReader<'a> {
    pub fn new(data: &'a [u8], name: &'a str) -> Self {
        Self {
            data,
            offset: 0,
            name,
        }
    }
}

impl<'a> Iterator for AtomReader<'a> {
    type Item = Result<Atom<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let data: &'a [u8] = self.data;
        let at = self.offset;
        let rest = &data[at..];
        if rest.is_empty() {
            return None;
        }
        if rest.len() < ATOM_HEADER_SIZE {
            self.offset = data.len();
            return Some(Err(SceneryError::format(
                self.name,
                format!("truncated atom header at byte {at}"),
            )));
        }
        let tag = [rest[0], rest[1], rest[2], rest[3]];
        let len = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let Some(payload) = rest.get(ATOM_HEADER_SIZE..ATOM_HEADER_SIZE + len) else {
            self.offset = data.len();
            return Some(Err(SceneryError::format(
                self.name,
                format!(
                    "atom {} at byte {at} claims {len} bytes, only {} left",
                    String::from_utf8_lossy(&tag),
                    rest.len() - ATOM_HEADER_SIZE
                ),
            )));
        };
        self.offset += ATOM_HEADER_SIZE + len;
        Some(Ok(Atom { tag, payload }))
    }
}
