use crate::classfile::loader::ClassFileLoader;
use crate::classfile::reader::ClassFileReader;
use crate::classfile::signature::MethodSignature;
use crate::descriptors::{FieldDescriptor, MethodDescriptor, ParseDescriptor};
use crate::errors::{LinkageError, Result};
use crate::modifiers::Modifier;
use crate::names::{self, NameFormat};
use crate::universe::{KlassRef, KlassState, Universe};
use std::cell::Cell;
use std::io::Read;

/// Constant pool entry tags defined by the class file format. This
/// system supports the CLDC subset (JDK 1.1-1.4 class files); later tags
/// such as method handles are format errors.
pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELDREF: u8 = 9;
pub const CONSTANT_METHODREF: u8 = 10;
pub const CONSTANT_INTERFACE_METHODREF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;

enum PoolEntry<'g> {
    /// Index 0 and the second slot of long and double entries.
    Unused,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    /// A symbolic class reference; the klass is created in the universe
    /// the first time the entry is asked for.
    ClassRef {
        name_index: u16,
        klass: Cell<Option<KlassRef<'g>>>,
    },
    StringRef(u16),
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
}

/// A literal constant fetched from the pool with an expected kind.
#[derive(Copy, Clone, Debug)]
pub enum PoolConstant<'p> {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(&'p str),
}

/// The constant pool of one class file, parsed once up front.
///
/// UTF-8 entries are decoded eagerly; class references resolve into the
/// universe lazily, the first time an entry is requested. Asking for an
/// entry with the wrong kind, or an out of range index, is a format
/// error.
pub struct ConstantPool<'g> {
    universe: &'g Universe<'g>,
    entries: Vec<PoolEntry<'g>>,
}

impl<'g> ConstantPool<'g> {
    /// Reads the `constant_pool_count` and `constant_pool[]` items.
    pub fn parse<R: Read>(
        reader: &mut ClassFileReader<R>,
        universe: &'g Universe<'g>,
    ) -> Result<ConstantPool<'g>> {
        let count = reader.read_unsigned_short("cp-count")? as usize;
        if count == 0 {
            return Err(reader.format_error("bad constant pool size"));
        }

        let mut entries = Vec::with_capacity(count);
        entries.push(PoolEntry::Unused);
        while entries.len() < count {
            let tag = reader.read_unsigned_byte("cp-tag")?;
            let entry = match tag {
                CONSTANT_UTF8 => {
                    let length = reader.read_unsigned_short("cp-utf8-length")? as usize;
                    let mut bytes = vec![0u8; length];
                    reader.read_fully(&mut bytes, "cp-utf8")?;
                    match decode_modified_utf8(&bytes) {
                        Some(string) => PoolEntry::Utf8(string),
                        None => {
                            return Err(reader.format_error("invalid UTF-8 encoded string"));
                        }
                    }
                }
                CONSTANT_INTEGER => PoolEntry::Integer(reader.read_int("cp-int")?),
                CONSTANT_FLOAT => {
                    PoolEntry::Float(f32::from_bits(reader.read_int("cp-float")? as u32))
                }
                CONSTANT_LONG | CONSTANT_DOUBLE => {
                    let high = reader.read_int("cp-long-high")? as u32 as u64;
                    let low = reader.read_int("cp-long-low")? as u32 as u64;
                    let bits = (high << 32) | low;
                    let entry = if tag == CONSTANT_LONG {
                        PoolEntry::Long(bits as i64)
                    } else {
                        PoolEntry::Double(f64::from_bits(bits))
                    };
                    entries.push(entry);
                    if entries.len() == count {
                        return Err(
                            reader.format_error("long or double constant at end of pool")
                        );
                    }
                    // Long and double entries take two pool slots.
                    PoolEntry::Unused
                }
                CONSTANT_CLASS => PoolEntry::ClassRef {
                    name_index: reader.read_unsigned_short("cp-class-name")?,
                    klass: Cell::new(None),
                },
                CONSTANT_STRING => {
                    PoolEntry::StringRef(reader.read_unsigned_short("cp-string")?)
                }
                CONSTANT_FIELDREF => PoolEntry::FieldRef {
                    class_index: reader.read_unsigned_short("cp-fieldref-class")?,
                    name_and_type_index: reader.read_unsigned_short("cp-fieldref-nat")?,
                },
                CONSTANT_METHODREF => PoolEntry::MethodRef {
                    class_index: reader.read_unsigned_short("cp-methodref-class")?,
                    name_and_type_index: reader.read_unsigned_short("cp-methodref-nat")?,
                },
                CONSTANT_INTERFACE_METHODREF => PoolEntry::InterfaceMethodRef {
                    class_index: reader.read_unsigned_short("cp-imethodref-class")?,
                    name_and_type_index: reader.read_unsigned_short("cp-imethodref-nat")?,
                },
                CONSTANT_NAME_AND_TYPE => PoolEntry::NameAndType {
                    name_index: reader.read_unsigned_short("cp-nat-name")?,
                    descriptor_index: reader.read_unsigned_short("cp-nat-desc")?,
                },
                _ => {
                    return Err(reader.format_error(&format!(
                        "invalid constant pool entry tag {}",
                        tag
                    )));
                }
            };
            entries.push(entry);
        }

        let pool = ConstantPool { universe, entries };
        pool.verify_structure(reader)?;
        Ok(pool)
    }

    /// Checks that every cross-entry index points at an entry of the
    /// right kind before any entry is handed out.
    fn verify_structure<R: Read>(&self, reader: &ClassFileReader<R>) -> Result<()> {
        let bad = |index: u16, expected: &str| {
            Err(reader.format_error(&format!(
                "constant pool index {} is not a {} entry",
                index, expected
            )))
        };
        for entry in &self.entries {
            match entry {
                PoolEntry::ClassRef { name_index, .. } | PoolEntry::StringRef(name_index) => {
                    if !matches!(self.raw_entry(*name_index), Some(PoolEntry::Utf8(_))) {
                        return bad(*name_index, "UTF-8");
                    }
                }
                PoolEntry::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    for index in [*name_index, *descriptor_index] {
                        if !matches!(self.raw_entry(index), Some(PoolEntry::Utf8(_))) {
                            return bad(index, "UTF-8");
                        }
                    }
                }
                PoolEntry::FieldRef {
                    class_index,
                    name_and_type_index,
                }
                | PoolEntry::MethodRef {
                    class_index,
                    name_and_type_index,
                }
                | PoolEntry::InterfaceMethodRef {
                    class_index,
                    name_and_type_index,
                } => {
                    if !matches!(self.raw_entry(*class_index), Some(PoolEntry::ClassRef { .. })) {
                        return bad(*class_index, "class");
                    }
                    if !matches!(
                        self.raw_entry(*name_and_type_index),
                        Some(PoolEntry::NameAndType { .. })
                    ) {
                        return bad(*name_and_type_index, "name-and-type");
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn raw_entry(&self, index: u16) -> Option<&PoolEntry<'g>> {
        match self.entries.get(index as usize) {
            Some(PoolEntry::Unused) | None => None,
            Some(entry) => Some(entry),
        }
    }

    fn entry(&self, index: u16) -> Result<&PoolEntry<'g>> {
        self.raw_entry(index).ok_or_else(|| {
            LinkageError::ClassFormat(format!("invalid constant pool index {}", index))
        })
    }

    /// The string of the UTF-8 entry at `index`.
    pub fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.entry(index)? {
            PoolEntry::Utf8(string) => Ok(string),
            _ => Err(LinkageError::ClassFormat(format!(
                "constant pool entry {} is not a UTF-8 string",
                index
            ))),
        }
    }

    /// The class denoted by the class entry at `index`. The klass is
    /// created in the universe on first request but is not loaded.
    pub fn get_klass(&self, index: u16) -> Result<KlassRef<'g>> {
        match self.entry(index)? {
            PoolEntry::ClassRef { name_index, klass } => {
                if let Some(resolved) = klass.get() {
                    return Ok(resolved);
                }
                let name = self.get_utf8(*name_index)?.replace('/', ".");
                let resolved = self.universe.klass_for_name(&name)?;
                klass.set(Some(resolved));
                Ok(resolved)
            }
            _ => Err(LinkageError::ClassFormat(format!(
                "constant pool entry {} is not a class reference",
                index
            ))),
        }
    }

    /// The class denoted by the class entry at `index`, loaded if it was
    /// not already. Loading may recurse through `loader`.
    pub fn get_resolved_class(
        &self,
        index: u16,
        loader: &ClassFileLoader<'g, '_>,
    ) -> Result<KlassRef<'g>> {
        let klass = self.get_klass(index)?;
        match klass.state() {
            KlassState::Loaded => Ok(klass),
            KlassState::Error => Err(LinkageError::NoClassDefFound(format!(
                "{}: class is in the error state",
                klass.name()
            ))),
            _ => {
                loader.load(klass)?;
                Ok(klass)
            }
        }
    }

    /// The literal constant at `index`, which must have the kind named by
    /// `tag`.
    pub fn get_entry(&self, index: u16, tag: u8) -> Result<PoolConstant<'_>> {
        let constant = match (self.entry(index)?, tag) {
            (PoolEntry::Integer(value), CONSTANT_INTEGER) => PoolConstant::Integer(*value),
            (PoolEntry::Long(value), CONSTANT_LONG) => PoolConstant::Long(*value),
            (PoolEntry::Float(value), CONSTANT_FLOAT) => PoolConstant::Float(*value),
            (PoolEntry::Double(value), CONSTANT_DOUBLE) => PoolConstant::Double(*value),
            (PoolEntry::StringRef(utf8_index), CONSTANT_STRING) => {
                PoolConstant::String(self.get_utf8(*utf8_index)?)
            }
            _ => {
                return Err(LinkageError::ClassFormat(format!(
                    "constant pool entry {} does not have tag {}",
                    index, tag
                )));
            }
        };
        Ok(constant)
    }

    /// Validates a class `access_flags` item and returns the resulting
    /// modifier set. Interfaces are implicitly abstract (JDK 1.1 class
    /// files leave the bit unset).
    pub fn verify_class_modifiers(&self, flags: u16) -> Result<Modifier> {
        let mut modifiers = Modifier::from_raw(flags);
        if modifiers.contains(Modifier::INTERFACE) {
            modifiers |= Modifier::ABSTRACT;
            if modifiers.contains(Modifier::FINAL) {
                return Err(LinkageError::ClassFormat(
                    "invalid class modifiers: interface cannot be final".to_string(),
                ));
            }
        } else if modifiers.contains(Modifier::FINAL) && modifiers.contains(Modifier::ABSTRACT) {
            return Err(LinkageError::ClassFormat(
                "invalid class modifiers: class cannot be both final and abstract".to_string(),
            ));
        }
        Ok(modifiers)
    }

    /// Validates a field `access_flags` item against the modifiers of the
    /// declaring class.
    pub fn verify_field_modifiers(&self, flags: u16, class_modifiers: Modifier) -> Result<()> {
        let modifiers = Modifier::from_raw(flags);
        let invalid = |why: &str| {
            Err(LinkageError::ClassFormat(format!(
                "invalid field modifiers: {}",
                why
            )))
        };
        if !modifiers.has_valid_access() {
            return invalid("more than one access modifier");
        }
        if modifiers.contains(Modifier::FINAL) && modifiers.contains(Modifier::VOLATILE) {
            return invalid("field cannot be both final and volatile");
        }
        if class_modifiers.contains(Modifier::INTERFACE) {
            let required = Modifier::PUBLIC | Modifier::STATIC | Modifier::FINAL;
            if (modifiers & Modifier::jvm_field_modifiers()) != required {
                return invalid("interface field must be public static final");
            }
        }
        Ok(())
    }

    /// Validates a method `access_flags` item against the modifiers of
    /// the declaring class. `<clinit>` flags are never validated here (the
    /// VM ignores them); `is_init` selects the extra `<init>` rules.
    pub fn verify_method_modifiers(
        &self,
        flags: u16,
        class_modifiers: Modifier,
        is_init: bool,
    ) -> Result<()> {
        let modifiers = Modifier::from_raw(flags);
        let invalid = |why: &str| {
            Err(LinkageError::ClassFormat(format!(
                "invalid method modifiers: {}",
                why
            )))
        };
        if !modifiers.has_valid_access() {
            return invalid("more than one access modifier");
        }
        if class_modifiers.contains(Modifier::INTERFACE) {
            if !modifiers.contains(Modifier::PUBLIC) || !modifiers.contains(Modifier::ABSTRACT) {
                return invalid("interface method must be public abstract");
            }
            if modifiers.intersects(
                Modifier::STATIC | Modifier::FINAL | Modifier::SYNCHRONIZED | Modifier::NATIVE,
            ) {
                return invalid("illegal interface method modifiers");
            }
        }
        if modifiers.contains(Modifier::ABSTRACT)
            && modifiers.intersects(
                Modifier::PRIVATE
                    | Modifier::STATIC
                    | Modifier::FINAL
                    | Modifier::SYNCHRONIZED
                    | Modifier::NATIVE
                    | Modifier::STRICT,
            )
        {
            return invalid("illegal abstract method modifiers");
        }
        if is_init
            && modifiers.intersects(
                Modifier::STATIC
                    | Modifier::FINAL
                    | Modifier::SYNCHRONIZED
                    | Modifier::NATIVE
                    | Modifier::ABSTRACT,
            )
        {
            return invalid("illegal constructor modifiers");
        }
        Ok(())
    }

    /// Validates a member name read from the class file.
    pub fn verify_name(&self, name: &str, format: NameFormat) -> Result<()> {
        names::verify_name(name, format)
    }

    /// Parses and resolves a field type descriptor.
    pub fn verify_field_type(&self, signature: &str) -> Result<KlassRef<'g>> {
        let descriptor = FieldDescriptor::parse(signature)?;
        self.universe.klass_for_descriptor(&descriptor)
    }

    /// Parses and resolves a method descriptor into a signature.
    ///
    /// `must_return_void` is set for `<init>` and `<clinit>`; `is_static`
    /// affects the activation record length limit, which counts the
    /// implicit receiver word.
    pub fn verify_method_type(
        &self,
        signature: &str,
        must_return_void: bool,
        is_static: bool,
    ) -> Result<MethodSignature<'g>> {
        let descriptor = MethodDescriptor::parse(signature)?;
        if must_return_void && descriptor.return_type.is_some() {
            return Err(LinkageError::ClassFormat(format!(
                "method must return void: {}",
                signature
            )));
        }
        let return_type = match &descriptor.return_type {
            Some(descriptor) => self.universe.klass_for_descriptor(descriptor)?,
            None => self.universe.system().void,
        };
        let parameter_types = descriptor
            .parameters
            .iter()
            .map(|parameter| self.universe.klass_for_descriptor(parameter))
            .collect::<Result<Vec<_>>>()?;
        let method_signature = MethodSignature::new(return_type, parameter_types);
        if method_signature.parameters_length(is_static) > 255 {
            return Err(LinkageError::ClassFormat(format!(
                "too many parameters: {}",
                signature
            )));
        }
        Ok(method_signature)
    }
}

/// Decodes a modified UTF-8 byte sequence as found in class files: NUL is
/// encoded in two bytes, there are no four-byte sequences, and
/// supplementary characters appear as surrogate pairs of three-byte
/// sequences.
fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            0x01..=0x7F => {
                units.push(u16::from(c));
                i += 1;
            }
            _ => match c >> 4 {
                12 | 13 => {
                    if i + 2 > bytes.len() {
                        return None;
                    }
                    let c2 = bytes[i + 1];
                    if c2 & 0xC0 != 0x80 {
                        return None;
                    }
                    units.push((u16::from(c & 0x1F) << 6) | u16::from(c2 & 0x3F));
                    i += 2;
                }
                14 => {
                    if i + 3 > bytes.len() {
                        return None;
                    }
                    let (c2, c3) = (bytes[i + 1], bytes[i + 2]);
                    if c2 & 0xC0 != 0x80 || c3 & 0xC0 != 0x80 {
                        return None;
                    }
                    units.push(
                        (u16::from(c & 0x0F) << 12)
                            | (u16::from(c2 & 0x3F) << 6)
                            | u16::from(c3 & 0x3F),
                    );
                    i += 3;
                }
                // 0x00, continuation bytes and 1111 xxxx are all illegal
                // lead bytes in this encoding.
                _ => return None,
            },
        }
    }
    String::from_utf16(&units).ok()
}
