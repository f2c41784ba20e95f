use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{self, Read, Write};

/// Compounds nested deeper than this are rejected when reading.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(HashMap<String, Tag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_length<R: Read>(reader: &mut R) -> io::Result<usize> {
    let length = reader.read_i32::<BigEndian>()?;
    if length < 0 {
        return Err(invalid_data(format!("Negative array length: {}", length)));
    }
    Ok(length as usize)
}

fn write_length<W: Write>(writer: &mut W, length: usize) -> io::Result<()> {
    let length = i32::try_from(length)
        .map_err(|_| invalid_data(format!("Array too long for NBT: {}", length)))?;
    writer.write_i32::<BigEndian>(length)
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let length = u16::try_from(value.len())
        .map_err(|_| invalid_data(format!("String too long for NBT: {} bytes", value.len())))?;
    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(value.as_bytes())
}

impl Tag {
    pub fn get_type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Reads a named tag (type id, name, payload).
    pub fn read<R: Read>(reader: &mut R) -> io::Result<(String, Tag)> {
        Tag::read_named(reader, 0)
    }

    fn read_named<R: Read>(reader: &mut R, depth: usize) -> io::Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }

        let name = read_string(reader)?;
        let tag = Tag::read_payload(reader, type_id, depth)?;
        Ok((name, tag))
    }

    fn read_payload<R: Read>(reader: &mut R, type_id: u8, depth: usize) -> io::Result<Tag> {
        if depth > MAX_DEPTH {
            return Err(invalid_data(format!("NBT nested deeper than {}", MAX_DEPTH)));
        }

        match type_id {
            0 => Ok(Tag::End),
            1 => Ok(Tag::Byte(reader.read_i8()?)),
            2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
            3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
            4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
            5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
            6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
            7 => {
                let length = read_length(reader)?;
                let mut bytes = vec![0u8; length];
                reader.read_exact(&mut bytes)?;
                Ok(Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect()))
            }
            8 => read_string(reader).map(Tag::String),
            9 => {
                let list_type = reader.read_u8()?;
                let length = read_length(reader)?;
                if list_type == 0 && length > 0 {
                    return Err(invalid_data("Non-empty list of TAG_End".to_owned()));
                }
                let mut list = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    list.push(Tag::read_payload(reader, list_type, depth + 1)?);
                }
                Ok(Tag::List(list))
            }
            10 => {
                let mut compound = HashMap::new();
                loop {
                    let (name, tag) = Tag::read_named(reader, depth + 1)?;
                    if let Tag::End = tag {
                        break;
                    }
                    compound.insert(name, tag);
                }
                Ok(Tag::Compound(compound))
            }
            11 => {
                let length = read_length(reader)?;
                let mut ints = Vec::with_capacity(length.min(65536));
                for _ in 0..length {
                    ints.push(reader.read_i32::<BigEndian>()?);
                }
                Ok(Tag::IntArray(ints))
            }
            12 => {
                let length = read_length(reader)?;
                let mut longs = Vec::with_capacity(length.min(65536));
                for _ in 0..length {
                    longs.push(reader.read_i64::<BigEndian>()?);
                }
                Ok(Tag::LongArray(longs))
            }
            _ => Err(invalid_data(format!("Invalid tag type: {}", type_id))),
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            write_string(writer, name)?;
        }

        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(v) => {
                write_length(writer, v.len())?;
                let bytes: Vec<u8> = v.iter().map(|&b| b as u8).collect();
                writer.write_all(&bytes)
            }
            Tag::String(v) => write_string(writer, v),
            Tag::List(v) => {
                let element_type = v.first().map_or(0, Tag::get_type_id);
                if let Some(odd) = v.iter().find(|t| t.get_type_id() != element_type) {
                    return Err(invalid_data(format!(
                        "Mixed list: expected type {}, found {}",
                        element_type,
                        odd.get_type_id()
                    )));
                }
                writer.write_u8(element_type)?;
                write_length(writer, v.len())?;
                for tag in v {
                    tag.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write(writer, name)?;
                }
                Tag::End.write(writer, "")
            }
            Tag::IntArray(v) => {
                write_length(writer, v.len())?;
                for &i in v {
                    writer.write_i32::<BigEndian>(i)?;
                }
                Ok(())
            }
            Tag::LongArray(v) => {
                write_length(writer, v.len())?;
                for &l in v {
                    writer.write_i64::<BigEndian>(l)?;
                }
                Ok(())
            }
        }
    }

    pub fn new_compound() -> Tag {
        Tag::Compound(HashMap::new())
    }

    /// Builds a ByteArray from unsigned bytes, as stored on disk.
    pub fn byte_array(bytes: &[u8]) -> Tag {
        Tag::ByteArray(bytes.iter().map(|&b| b as i8).collect())
    }

    /// Looks up a key when this tag is a compound.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.as_compound()?.get(key)
    }

    /// Inserts into a compound, returning the previous value. Does nothing on other tags.
    pub fn insert(&mut self, key: impl Into<String>, value: Tag) -> Option<Tag> {
        self.as_compound_mut()?.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.as_compound_mut()?.remove(key)
    }

    pub fn as_compound(&self) -> Option<&HashMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut HashMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Tag>> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            Tag::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Any integral tag widened to i64.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Tag::Byte(n) => Some(*n as i64),
            Tag::Short(n) => Some(*n as i64),
            Tag::Int(n) => Some(*n as i64),
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Any integral tag truncated to i32, the way Minecraft reads `int` fields leniently.
    pub fn as_int_lenient(&self) -> Option<i32> {
        self.as_integer().map(|n| n as i32)
    }

    /// Booleans are stored as a Byte; any non-zero integral value is true.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_integer().map(|n| n != 0)
    }
}

// NBTFile represents a complete NBT file with compression support
pub struct NBTFile {
    pub root: Tag,
    pub name: String,
}

impl NBTFile {
    pub fn new(name: String, root: Tag) -> Self {
        NBTFile { root, name }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let (name, root) = Tag::read(reader)?;
        if !matches!(root, Tag::Compound(_)) {
            return Err(invalid_data(format!(
                "Root tag must be a compound, found type {}",
                root.get_type_id()
            )));
        }
        Ok(NBTFile { root, name })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.root.write(writer, &self.name)
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut decoder = GzDecoder::new(reader);
        Self::read(&mut decoder)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        self.write(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn round_trip(tag: &Tag, name: &str) -> (String, Tag) {
        let mut buffer = Vec::new();
        tag.write(&mut buffer, name).unwrap();
        Tag::read(&mut Cursor::new(buffer)).unwrap()
    }

    #[test]
    fn test_tag_type_ids() {
        assert_eq!(Tag::End.get_type_id(), 0);
        assert_eq!(Tag::Byte(0).get_type_id(), 1);
        assert_eq!(Tag::ByteArray(vec![]).get_type_id(), 7);
        assert_eq!(Tag::String(String::new()).get_type_id(), 8);
        assert_eq!(Tag::List(vec![]).get_type_id(), 9);
        assert_eq!(Tag::Compound(HashMap::new()).get_type_id(), 10);
        assert_eq!(Tag::LongArray(vec![]).get_type_id(), 12);
    }

    #[test]
    fn test_compound_helpers() {
        let mut section = Tag::new_compound();
        section.insert("Y", Tag::Byte(3));
        section.insert("Blocks", Tag::byte_array(&[0, 1, 255]));

        assert_eq!(section.get("Y").and_then(Tag::as_int_lenient), Some(3));
        assert_eq!(
            section.get("Blocks").and_then(Tag::as_byte_array),
            Some(&[0i8, 1, -1][..])
        );
        assert_eq!(section.remove("Y"), Some(Tag::Byte(3)));
        assert!(section.get("Y").is_none());

        // Non-compound tags ignore compound operations
        let mut int = Tag::Int(1);
        assert!(int.insert("x", Tag::Int(2)).is_none());
        assert!(int.get("x").is_none());
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(Tag::Byte(-2).as_int_lenient(), Some(-2));
        assert_eq!(Tag::Short(300).as_int_lenient(), Some(300));
        assert_eq!(Tag::Long(7).as_int_lenient(), Some(7));
        assert_eq!(Tag::Float(1.0).as_int_lenient(), None);
        assert_eq!(Tag::Long(i64::MIN).as_integer(), Some(i64::MIN));
        assert_eq!(Tag::Int(-5).as_integer(), Some(-5));
        assert_eq!(Tag::Double(2.0).as_integer(), None);
        assert_eq!(Tag::Byte(1).as_bool(), Some(true));
        assert_eq!(Tag::Int(0).as_bool(), Some(false));
        assert_eq!(Tag::String("1".into()).as_bool(), None);
    }

    #[test]
    fn test_legacy_section_read_write() {
        let mut compound = HashMap::new();
        compound.insert("Y".to_string(), Tag::Byte(0));
        compound.insert("Blocks".to_string(), Tag::byte_array(&[2u8; 4096]));
        compound.insert("Data".to_string(), Tag::byte_array(&[0u8; 2048]));
        let section = Tag::Compound(compound);

        let list = Tag::List(vec![section.clone(), section]);
        let (name, read) = round_trip(&list, "Sections");

        assert_eq!(name, "Sections");
        assert_eq!(read, list);
    }

    #[test]
    fn test_long_array_read_write() {
        let tag = Tag::LongArray(vec![i64::MIN, -1, 0, 0x1111_2222_3333_4444]);
        assert_eq!(round_trip(&tag, "BlockStates").1, tag);
    }

    #[test]
    fn test_nbt_file_gzip() {
        let mut level = Tag::new_compound();
        level.insert("xPos", Tag::Int(-3));
        level.insert("zPos", Tag::Int(12));
        let mut root = Tag::new_compound();
        root.insert("Level", level);

        let original = NBTFile::new(String::new(), root);
        let mut gzip_buffer = Vec::new();
        original.write_gzip(&mut gzip_buffer).unwrap();

        let read = NBTFile::read_gzip(&mut Cursor::new(gzip_buffer)).unwrap();
        assert_eq!(read.name, original.name);
        assert_eq!(read.root, original.root);
    }

    #[test]
    fn test_invalid_tag_type() {
        let result = Tag::read_payload(&mut Cursor::new(vec![0u8; 4]), 255, 0);
        assert_matches!(result, Err(e) if e.kind() == io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_negative_array_length_rejected() {
        // TAG_Byte_Array "a" with length -1
        let bytes = vec![7, 0, 1, b'a', 0xFF, 0xFF, 0xFF, 0xFF];
        let result = Tag::read(&mut Cursor::new(bytes));
        assert_matches!(result, Err(e) if e.kind() == io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_mixed_list_rejected_on_write() {
        let tag = Tag::List(vec![Tag::Int(1), Tag::Byte(2)]);
        let mut buffer = Vec::new();
        assert!(tag.write(&mut buffer, "mixed").is_err());
    }

    #[test]
    fn test_root_must_be_compound() {
        let mut buffer = Vec::new();
        Tag::Int(5).write(&mut buffer, "root").unwrap();
        assert!(NBTFile::read(&mut Cursor::new(buffer)).is_err());
    }

    #[test]
    fn test_empty_list() {
        let tag = Tag::List(vec![]);
        let (name, read_tag) = round_trip(&tag, "TileEntities");
        assert_eq!(name, "TileEntities");
        assert_eq!(read_tag, tag);
    }
}
