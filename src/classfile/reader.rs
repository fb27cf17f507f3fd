use crate::classfile::ConstantPool;
use crate::errors::{LinkageError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io;
use std::io::Read;

/// A structured reader over a class file input stream.
///
/// The reader is a forward-only cursor. Every read takes a label naming
/// the item being read; the label has no behavioral effect and exists
/// only so that a truncated or unreadable stream produces an error that
/// says *what* could not be read and *where*. I/O failures never escape
/// as raw I/O errors; they always surface as
/// [`LinkageError::ClassFormat`] carrying the file path.
pub struct ClassFileReader<R> {
    input: R,
    file_path: String,
    bytes_read: usize,
}

impl<R: Read> ClassFileReader<R> {
    /// Creates a reader over `input`, which was opened from `file_path`
    /// (used in error messages only).
    pub fn new(input: R, file_path: &str) -> ClassFileReader<R> {
        ClassFileReader {
            input,
            file_path: file_path.to_string(),
            bytes_read: 0,
        }
    }

    /// The file the underlying stream was opened from.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// The number of bytes consumed so far.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Makes a class format error whose message is prefixed with the file
    /// path being read.
    pub fn format_error(&self, msg: &str) -> LinkageError {
        LinkageError::ClassFormat(format!("{}: {}", self.file_path, msg))
    }

    fn read_error(&self, label: &str, err: io::Error) -> LinkageError {
        LinkageError::ClassFormat(format!(
            "{}: error reading {} at offset {}: {}",
            self.file_path, label, self.bytes_read, err
        ))
    }

    pub fn read_unsigned_byte(&mut self, label: &str) -> Result<u8> {
        let value = self
            .input
            .read_u8()
            .map_err(|err| self.read_error(label, err))?;
        self.bytes_read += 1;
        Ok(value)
    }

    pub fn read_unsigned_short(&mut self, label: &str) -> Result<u16> {
        let value = self
            .input
            .read_u16::<BigEndian>()
            .map_err(|err| self.read_error(label, err))?;
        self.bytes_read += 2;
        Ok(value)
    }

    pub fn read_int(&mut self, label: &str) -> Result<i32> {
        let value = self
            .input
            .read_i32::<BigEndian>()
            .map_err(|err| self.read_error(label, err))?;
        self.bytes_read += 4;
        Ok(value)
    }

    /// Fills `buffer` completely from the stream.
    pub fn read_fully(&mut self, buffer: &mut [u8], label: &str) -> Result<()> {
        self.input
            .read_exact(buffer)
            .map_err(|err| self.read_error(label, err))?;
        self.bytes_read += buffer.len();
        Ok(())
    }

    /// Advances the cursor by exactly `count` bytes.
    pub fn skip(&mut self, count: usize, label: &str) -> Result<()> {
        let copied = io::copy(
            &mut (&mut self.input).take(count as u64),
            &mut io::sink(),
        )
        .map_err(|err| self.read_error(label, err))?;
        self.bytes_read += copied as usize;
        if copied != count as u64 {
            return Err(self.read_error(
                label,
                io::Error::new(io::ErrorKind::UnexpectedEof, "truncated stream"),
            ));
        }
        Ok(())
    }

    /// Asserts that the stream has no bytes left. Trailing garbage after
    /// the declared class structure is a format error.
    pub fn read_eof(&mut self) -> Result<()> {
        let mut one = [0u8; 1];
        match self.input.read_exact(&mut one) {
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Err(err) => Err(self.read_error("EOF", err)),
            Ok(()) => Err(self.format_error("classfile has extra bytes")),
        }
    }

    /// Starts the decoding of an attribute. Once the body of the
    /// attribute has been decoded (or [`Attribute::skip`]ped), there must
    /// be a call to [`Attribute::close`] so that the number of bytes
    /// consumed can be verified against the declared attribute length.
    pub fn open_attribute(&mut self, pool: &ConstantPool) -> Result<Attribute> {
        let name_index = self.read_unsigned_short("attribute_name_index")?;
        let length = self.read_int("attribute_length")?;
        if length < 0 {
            return Err(self.format_error("negative attribute_length"));
        }
        let name = pool.get_utf8(name_index)?.to_string();
        Ok(Attribute {
            length: length as usize,
            start: self.bytes_read,
            name,
        })
    }
}

/// The common header of a class file attribute, with the bookkeeping
/// needed to enforce its declared length.
pub struct Attribute {
    /// The number of bytes in the attribute body.
    pub length: usize,

    /// The name of the attribute.
    pub name: String,

    /// The class file offset at which the attribute's body starts.
    start: usize,
}

impl Attribute {
    /// Forwards the read position to the byte immediately after this
    /// attribute.
    pub fn skip<R: Read>(&self, reader: &mut ClassFileReader<R>) -> Result<()> {
        reader.skip(self.length, &self.name)
    }

    /// Ensures that the number of bytes read while decoding this
    /// attribute equals the declared attribute length.
    pub fn close<R: Read>(&self, reader: &ClassFileReader<R>) -> Result<()> {
        if reader.bytes_read() - self.start != self.length {
            return Err(reader.format_error(&format!(
                "invalid attribute_length for {} attribute",
                self.name
            )));
        }
        Ok(())
    }
}
