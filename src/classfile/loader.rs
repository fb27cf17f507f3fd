//! The class file loader: drives a [`ClassFileReader`] section by
//! section, consults the constant pool for every cross reference, and
//! installs the resulting definition onto the class handle.
//!
//! Loading is strictly ordered: magic and version, constant pool, class
//! info, interfaces, fields, methods, class attributes, EOF. The first
//! rule violation aborts the load with a categorized
//! [`LinkageError`](crate::LinkageError), and once the handle has entered
//! the `Loading` state any failure poisons it (`Error` state) before the
//! error propagates.

use crate::classfile::constant_pool::{
    ConstantPool, PoolConstant, CONSTANT_DOUBLE, CONSTANT_FLOAT, CONSTANT_INTEGER, CONSTANT_LONG,
    CONSTANT_STRING,
};
use crate::classfile::field::{ClassFileField, FieldConstant};
use crate::classfile::method::{ClassFileMethod, MethodBody};
use crate::classfile::reader::ClassFileReader;
use crate::classpath::Classpath;
use crate::errors::{LinkageError, Result};
use crate::modifiers::Modifier;
use crate::names::{self, NameFormat};
use crate::pragma::Pragma;
use crate::universe::{
    KlassRef, KlassState, SystemId, Universe, GLOBAL_STATIC_FIELDS_INTERFACE,
};
use std::io::Read;
use std::ptr;

/// Loads class definitions from class files found on a classpath.
pub struct ClassFileLoader<'g, 'a> {
    universe: &'g Universe<'g>,
    classpath: &'a dyn Classpath,
}

impl<'g, 'a> ClassFileLoader<'g, 'a> {
    pub fn new(universe: &'g Universe<'g>, classpath: &'a dyn Classpath) -> Self {
        ClassFileLoader {
            universe,
            classpath,
        }
    }

    /// Loads the definition of a class from its class file, located on
    /// the classpath by the class's name.
    ///
    /// On success the handle is `Loaded`. A failure to open the class
    /// file is a [`LinkageError::NoClassDefFound`] and leaves the handle
    /// untouched; any failure after that moves the handle to the terminal
    /// `Error` state. Either way the input stream is closed before this
    /// returns.
    pub fn load(&self, klass: KlassRef<'g>) -> Result<()> {
        debug_assert!(klass.state() < KlassState::Loaded);
        let file_path = names::class_file_path(klass.name());
        let input = match self.classpath.open(&file_path) {
            Ok(input) => input,
            Err(err) => {
                log::debug!("I/O error while loading {}: {}", klass.name(), err);
                return Err(LinkageError::NoClassDefFound(format!(
                    "{}: {}",
                    klass.name(),
                    err
                )));
            }
        };
        self.load_stream(klass, &file_path, input)
    }

    /// Loads the definition of a class from an already opened class file
    /// stream.
    pub fn load_stream<R: Read>(
        &self,
        klass: KlassRef<'g>,
        file_path: &str,
        input: R,
    ) -> Result<()> {
        log::trace!("loading {}", klass.name());
        let mut reader = ClassFileReader::new(input, file_path);

        if klass.state() == KlassState::Loading {
            return Err(LinkageError::ClassCircularity(klass.name().to_string()));
        }
        debug_assert!(klass.state() == KlassState::Defined);
        klass.change_state(KlassState::Loading);

        let result = self.load_class_file(klass, &mut reader);
        match result {
            Ok(()) => {
                log::trace!("loaded {}", klass.name());
                Ok(())
            }
            Err(err) => {
                log::debug!("linkage error while loading {}: {}", klass.name(), err);
                klass.change_state(KlassState::Error);
                Err(err)
            }
        }
        // Dropping the reader closes the underlying stream.
    }

    fn load_class_file<R: Read>(
        &self,
        klass: KlassRef<'g>,
        reader: &mut ClassFileReader<R>,
    ) -> Result<()> {
        load_magic_values(reader)?;
        let pool = ConstantPool::parse(reader, self.universe)?;

        let mut loading = Loading {
            loader: self,
            klass,
            reader,
            pool,
        };

        let super_class = loading.load_class_info()?;
        let interfaces = loading.load_interfaces()?;
        let (instance_fields, static_fields) = loading.load_fields()?;
        let (virtual_methods, static_methods) = loading.load_methods()?;
        let source_file = loading.load_extra_attributes()?;

        loading.reader.read_eof()?;

        debug_assert!(klass.state() == KlassState::Loading);

        // Classes whose instances are not field based have no use for the
        // field tables that were read.
        let (instance_fields, static_fields) =
            if klass.is_squawk_primitive() || klass.is_squawk_array() {
                (Vec::new(), Vec::new())
            } else {
                (instance_fields, static_fields)
            };

        klass.set_class_file_definition(
            super_class,
            interfaces,
            virtual_methods,
            static_methods,
            instance_fields,
            static_fields,
            source_file,
        );
        klass.change_state(KlassState::Loaded);
        Ok(())
    }
}

/// Reads the class file magic and version items.
fn load_magic_values<R: Read>(reader: &mut ClassFileReader<R>) -> Result<()> {
    let magic = reader.read_int("magic")?;
    let minor = reader.read_unsigned_short("minor")?;
    let major = reader.read_unsigned_short("major")?;
    if magic as u32 != 0xCAFE_BABE {
        return Err(reader.format_error(&format!("bad magic value = {:x}", magic)));
    }
    // JDK 1.1 through 1.4 class files are supported.
    if !(45..=48).contains(&major) {
        return Err(reader.format_error(&format!(
            "unsupported class file version: {}:{}",
            major, minor
        )));
    }
    Ok(())
}

fn same_parameters<'g>(a: &[KlassRef<'g>], b: &[KlassRef<'g>]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| ptr::eq(*x, *y))
}

/// The state of one `load` call, threaded explicitly through the loading
/// phases.
struct Loading<'g, 'l, R: Read> {
    loader: &'l ClassFileLoader<'g, 'l>,
    klass: KlassRef<'g>,
    reader: &'l mut ClassFileReader<R>,
    pool: ConstantPool<'g>,
}

impl<'g, 'l, R: Read> Loading<'g, 'l, R> {
    /// Prefixes a message with the name of the class being loaded.
    fn prefix(&self, msg: &str) -> String {
        format!("{}: {}", self.klass.name(), msg)
    }

    /// Reads the class access flags and the `this_class` and
    /// `super_class` items, returning the resolved super class (`None`
    /// only for `java.lang.Object`).
    fn load_class_info(&mut self) -> Result<Option<KlassRef<'g>>> {
        let flags = self.reader.read_unsigned_short("cls-flags")?;
        let class_index = self.reader.read_unsigned_short("cls-index")?;
        let super_index = self.reader.read_unsigned_short("cls-super-index")?;

        let mut modifiers = self.pool.verify_class_modifiers(flags)?;

        // Parsing the constant pool created the 'this class' handle; it
        // must be the very class this loader was asked for (JVMS 5.3.5).
        let this_class = self.pool.get_klass(class_index)?;
        if !ptr::eq(this_class, self.klass) {
            return Err(LinkageError::NoClassDefFound(
                self.prefix("'this_class' indicates wrong type"),
            ));
        }

        modifiers &= Modifier::jvm_class_modifiers();
        modifiers |= self.klass.modifiers();
        self.klass.update_modifiers(modifiers);

        let object = self.loader.universe.system().object;
        if super_index != 0 {
            let super_class = self.pool.get_klass(super_index)?;

            // An interface's superclass must be java.lang.Object; this is
            // checked against the unresolved handle, before any of the
            // resolution dependent rules below.
            if self.klass.is_interface() && !ptr::eq(super_class, object) {
                return Err(self
                    .reader
                    .format_error("interface class must inherit from java.lang.Object"));
            }

            let super_class = self.pool.get_resolved_class(super_index, self.loader)?;

            if super_class.is_array() {
                return Err(self.reader.format_error("cannot inherit from array class"));
            }
            if super_class.is_interface() {
                return Err(self.reader.format_error("cannot extend an interface class"));
            }
            // Inheriting from a final class is a VerifyError, matching
            // J2SE JVM behaviour.
            if super_class.is_final() {
                return Err(LinkageError::Verify(
                    self.prefix("cannot extend a final class"),
                ));
            }
            Ok(Some(super_class))
        } else if !ptr::eq(self.klass, object) {
            Err(self.reader.format_error("class must have super-type"))
        } else {
            Ok(None)
        }
    }

    /// Reads and resolves the interfaces table.
    fn load_interfaces(&mut self) -> Result<Vec<KlassRef<'g>>> {
        let count = self.reader.read_unsigned_short("i/f-count")? as usize;
        let mut interfaces = Vec::with_capacity(count);
        for _ in 0..count {
            let index = self.reader.read_unsigned_short("i/f-index")?;
            let interface = self.pool.get_resolved_class(index, self.loader)?;
            if !interface.is_interface() {
                return Err(LinkageError::IncompatibleClassChange(
                    self.prefix("cannot implement non-interface class"),
                ));
            }

            if interface.name() == GLOBAL_STATIC_FIELDS_INTERFACE {
                self.klass.update_modifiers(Modifier::GLOBAL_STATICS);
            }
            interfaces.push(interface);
        }
        Ok(interfaces)
    }

    /// Reads the fields table and partitions it into the instance and
    /// static field tables, in that order.
    fn load_fields(&mut self) -> Result<(Vec<ClassFileField<'g>>, Vec<ClassFileField<'g>>)> {
        let count = self.reader.read_unsigned_short("fld-count")? as usize;
        let mut instance_fields = Vec::new();
        let mut static_fields = Vec::new();

        for _ in 0..count {
            let field = self.load_field()?;
            self.verify_field_is_unique(&instance_fields, &field)?;
            self.verify_field_is_unique(&static_fields, &field)?;
            if field.is_static() {
                static_fields.push(field);
            } else {
                instance_fields.push(field);
            }
        }

        // Sort the instance fields by the data size of their types in
        // decreasing order so that fields align naturally and instances
        // pack tightly. The sort is stable: same-size fields keep their
        // declaration order.
        if instance_fields.len() > 1 {
            instance_fields
                .sort_by(|a, b| b.field_type().data_size().cmp(&a.field_type().data_size()));
        }

        Ok((instance_fields, static_fields))
    }

    /// No two fields may share both name and declared type.
    fn verify_field_is_unique(
        &self,
        fields: &[ClassFileField<'g>],
        field: &ClassFileField<'g>,
    ) -> Result<()> {
        for existing in fields {
            if existing.name() == field.name()
                && ptr::eq(existing.field_type(), field.field_type())
            {
                return Err(self.reader.format_error("duplicate field found"));
            }
        }
        Ok(())
    }

    /// Reads one `field_info` structure.
    fn load_field(&mut self) -> Result<ClassFileField<'g>> {
        let flags = self.reader.read_unsigned_short("fld-flags")?;
        let name_index = self.reader.read_unsigned_short("fld-name-index")?;
        let descriptor_index = self.reader.read_unsigned_short("fld-desc-index")?;
        let attributes_count = self.reader.read_unsigned_short("fld-attb-count")?;

        let field_name = self.pool.get_utf8(name_index)?.to_string();
        let field_sig = self.pool.get_utf8(descriptor_index)?.to_string();

        self.pool
            .verify_field_modifiers(flags, self.klass.modifiers())?;
        self.pool.verify_name(&field_name, NameFormat::Field)?;
        let field_type = self.pool.verify_field_type(&field_sig)?;

        let mut modifiers = Modifier::from_raw(flags) & Modifier::jvm_field_modifiers();
        let mut constant_value_index: u16 = 0;

        for _ in 0..attributes_count {
            let attribute = self.reader.open_attribute(&self.pool)?;
            if attribute.name == "ConstantValue" {
                if attribute.length != 2 {
                    return Err(self
                        .reader
                        .format_error("ConstantValue attribute length is not 2"));
                }
                if constant_value_index != 0 {
                    return Err(self.reader.format_error("duplicate ConstantValue attribute"));
                }
                constant_value_index = self.reader.read_unsigned_short("fld-constant-value")?;
                if constant_value_index == 0 {
                    return Err(self.reader.format_error("bad ConstantValue index"));
                }
                // A ConstantValue attribute on a non-static field is
                // silently ignored (JVMS 4.7.2).
                if !modifiers.contains(Modifier::STATIC) {
                    constant_value_index = 0;
                }
            } else if attribute.name == "Synthetic" {
                modifiers |= Modifier::SOURCE_SYNTHETIC;
            } else {
                attribute.skip(self.reader)?;
            }
            attribute.close(self.reader)?;
        }

        let constant_value = self.field_constant_value(field_type, constant_value_index)?;
        let field = match constant_value {
            Some(value) => {
                modifiers |= Modifier::CONSTANT;
                ClassFileField::with_constant(field_name, modifiers, field_type, value)
            }
            None => ClassFileField::new(field_name, modifiers, field_type),
        };

        log::trace!(
            "  field: {}{} {}",
            if field.is_static() { "static " } else { "" },
            field_type.name(),
            field.name()
        );
        Ok(field)
    }

    /// Resolves a field's ConstantValue index (if any) to a real value.
    /// The expected constant pool entry kind is keyed by the field's
    /// type.
    fn field_constant_value(
        &self,
        field_type: KlassRef<'g>,
        constant_value_index: u16,
    ) -> Result<Option<FieldConstant>> {
        if constant_value_index == 0 {
            return Ok(None);
        }
        let tag = match field_type.system_id() {
            SystemId::Long => CONSTANT_LONG,
            SystemId::Float => CONSTANT_FLOAT,
            SystemId::Double => CONSTANT_DOUBLE,
            SystemId::Int
            | SystemId::Short
            | SystemId::Char
            | SystemId::Byte
            | SystemId::Boolean => CONSTANT_INTEGER,
            SystemId::String => CONSTANT_STRING,
            _ => {
                return Err(self
                    .reader
                    .format_error("invalid ConstantValue attribute value"));
            }
        };
        let value = match self.pool.get_entry(constant_value_index, tag)? {
            PoolConstant::Integer(value) => FieldConstant::Primitive(i64::from(value)),
            PoolConstant::Long(value) => FieldConstant::Primitive(value),
            PoolConstant::Float(value) => {
                FieldConstant::Primitive(i64::from(value.to_bits() as i32))
            }
            PoolConstant::Double(value) => FieldConstant::Primitive(value.to_bits() as i64),
            PoolConstant::String(value) => FieldConstant::String(value.to_string()),
        };
        Ok(Some(value))
    }

    /// Reads the methods table and partitions it into the virtual and
    /// static method tables, in that order. Post-processing substitutes
    /// replacement constructor bodies and synthesizes a default
    /// constructor where required.
    fn load_methods(&mut self) -> Result<(Vec<ClassFileMethod<'g>>, Vec<ClassFileMethod<'g>>)> {
        let count = self.reader.read_unsigned_short("mth-count")? as usize;
        let mut virtual_methods = Vec::new();
        let mut static_methods = Vec::new();
        if count == 0 && (self.klass.is_interface() || self.klass.is_abstract()) {
            return Ok((virtual_methods, static_methods));
        }

        let mut replacement_constructors: Vec<ClassFileMethod<'g>> = Vec::new();
        let mut has_constructor = false;

        for _ in 0..count {
            let method = self.load_method()?;
            if method.is_constructor() {
                has_constructor = true;
            }

            self.verify_method_is_unique(&virtual_methods, &method)?;
            self.verify_method_is_unique(&static_methods, &method)?;

            if method.pragmas().contains(Pragma::REPLACEMENT_CONSTRUCTOR) {
                replacement_constructors.push(method);
            } else if method.is_static() {
                static_methods.push(method);
            } else {
                virtual_methods.push(method);
            }
        }

        // Constructors are static, so substitution works on the static
        // method table.
        self.replace_constructors(&mut static_methods, &replacement_constructors)?;

        // Synthesize a default constructor for a class with no declared
        // constructors.
        if !has_constructor && !self.klass.is_abstract() && !self.klass.is_interface() {
            let mut method = ClassFileMethod::new(
                "<init>".to_string(),
                Modifier::PUBLIC | Modifier::STATIC | Modifier::CONSTRUCTOR,
                self.klass,
                Vec::new(),
                Pragma::empty(),
            );
            method.set_body(MethodBody::SynthesizedDefaultConstructor);
            static_methods.push(method);
        }

        Ok((virtual_methods, static_methods))
    }

    /// No two methods may share name, parameter types and return type.
    fn verify_method_is_unique(
        &self,
        methods: &[ClassFileMethod<'g>],
        method: &ClassFileMethod<'g>,
    ) -> Result<()> {
        for existing in methods {
            if existing.name() == method.name()
                && same_parameters(existing.parameter_types(), method.parameter_types())
                && ptr::eq(existing.return_type(), method.return_type())
            {
                return Err(self.reader.format_error("duplicate method found"));
            }
        }
        Ok(())
    }

    /// For a non-array class whose instances are represented as arrays,
    /// substitutes the body of every constructor with the body of its
    /// matching replacement constructor method.
    fn replace_constructors(
        &self,
        methods: &mut [ClassFileMethod<'g>],
        replacements: &[ClassFileMethod<'g>],
    ) -> Result<()> {
        if !(self.klass.is_squawk_array() && !self.klass.is_array()) {
            return Ok(());
        }
        for method in methods.iter_mut() {
            if method.is_constructor() {
                *method = self.replace_constructor(method, replacements)?;
            }
        }
        Ok(())
    }

    /// A replacement matches a constructor when its parameter types equal
    /// the constructor's parameters prefixed by the receiver type.
    fn replace_constructor(
        &self,
        constructor: &ClassFileMethod<'g>,
        replacements: &[ClassFileMethod<'g>],
    ) -> Result<ClassFileMethod<'g>> {
        for replacement in replacements {
            let replacement_parameters = replacement.parameter_types();
            let matches = replacement_parameters.len() == constructor.parameter_types().len() + 1
                && ptr::eq(replacement_parameters[0], self.klass)
                && same_parameters(&replacement_parameters[1..], constructor.parameter_types());
            if matches {
                let mut replaced = ClassFileMethod::new(
                    "<init>".to_string(),
                    constructor.modifiers() | Modifier::HAS_PRAGMAS,
                    constructor.return_type(),
                    constructor.parameter_types().to_vec(),
                    constructor.pragmas() | Pragma::REPLACEMENT_CONSTRUCTOR,
                );
                replaced.set_body(replacement.body().clone());
                return Ok(replaced);
            }
        }
        Err(LinkageError::Verify(self.prefix(
            "could not match original constructor with a replacement constructor",
        )))
    }

    /// Reads one `method_info` structure.
    fn load_method(&mut self) -> Result<ClassFileMethod<'g>> {
        let flags = self.reader.read_unsigned_short("mth-flags")?;
        let name_index = self.reader.read_unsigned_short("mth-name-index")?;
        let descriptor_index = self.reader.read_unsigned_short("mth-desc-index")?;
        let attributes_count = self.reader.read_unsigned_short("mth-attb-count")?;

        let method_name = self.pool.get_utf8(name_index)?.to_string();
        let method_sig = self.pool.get_utf8(descriptor_index)?.to_string();

        let mut modifiers;
        if method_name == "<clinit>" {
            // The VM calls class initializers implicitly; their access
            // flags are ignored except for ACC_STRICT (JVMS 4.6).
            modifiers = (Modifier::from_raw(flags) & Modifier::STRICT) | Modifier::STATIC;
        } else {
            self.pool.verify_method_modifiers(
                flags,
                self.klass.modifiers(),
                method_name == "<init>",
            )?;
            modifiers = Modifier::from_raw(flags) & Modifier::jvm_method_modifiers();
        }

        self.pool.verify_name(&method_name, NameFormat::Method)?;
        let mut signature = self.pool.verify_method_type(
            &method_sig,
            method_name.ends_with("init>"),
            modifiers.contains(Modifier::STATIC),
        )?;

        // A constructor returns the class it constructs, and is static.
        if method_name == "<init>" {
            debug_assert!(ptr::eq(
                signature.return_type,
                self.loader.universe.system().void
            ));
            signature = signature.modify_return_type(self.klass);
            modifiers |= Modifier::CONSTRUCTOR | Modifier::STATIC;
        }

        let mut has_code_attribute = false;
        let mut has_exception_table = false;
        let mut pragmas = Pragma::empty();
        let mut code: Option<Vec<u8>> = None;

        for _ in 0..attributes_count {
            let attribute = self.reader.open_attribute(&self.pool)?;
            if attribute.name == "Code" {
                if has_code_attribute {
                    return Err(self
                        .reader
                        .format_error("duplicate Code attribute in method"));
                }
                has_code_attribute = true;
                if !modifiers.contains(Modifier::ABSTRACT) && !modifiers.contains(Modifier::NATIVE)
                {
                    let mut bytes = vec![0u8; attribute.length];
                    self.reader.read_fully(&mut bytes, "code")?;
                    code = Some(bytes);
                } else {
                    attribute.skip(self.reader)?;
                }
            } else if attribute.name == "Exceptions" {
                if has_exception_table {
                    return Err(self
                        .reader
                        .format_error("duplicate Exceptions attribute in method"));
                }
                has_exception_table = true;

                let num_exceptions = self.reader.read_unsigned_short("mth-att-num-exceptions")?;
                for _ in 0..num_exceptions {
                    let index = self.reader.read_unsigned_short("mth-att-exception")?;
                    let exception_class = self.pool.get_klass(index)?;
                    pragmas |= Pragma::from_exception_class_name(exception_class.name());
                }
            } else if attribute.name == "Synthetic" {
                modifiers |= Modifier::SOURCE_SYNTHETIC;
            } else {
                attribute.skip(self.reader)?;
            }
            attribute.close(self.reader)?;
        }

        // Methods have a Code attribute exactly when they are neither
        // abstract nor native.
        if modifiers.intersects(Modifier::ABSTRACT | Modifier::NATIVE) == has_code_attribute {
            return Err(if has_code_attribute {
                self.reader
                    .format_error("code attribute supplied for native or abstract method")
            } else {
                self.reader.format_error("missing Code attribute for method")
            });
        }

        // A method with pragmas must be non-virtual so that every invoke
        // site can be recognized statically.
        if !pragmas.is_empty() {
            if !(modifiers.contains(Modifier::STATIC)
                || modifiers.contains(Modifier::PRIVATE)
                || modifiers.contains(Modifier::FINAL)
                || self.klass.is_final())
            {
                return Err(self.reader.format_error(&format!(
                    "method with pragma is not non-virtual: {}",
                    method_name
                )));
            }
            modifiers |= Modifier::HAS_PRAGMAS;
            if pragmas.contains(Pragma::NATIVE) {
                modifiers |= Modifier::NATIVE;
            }
        }

        let body = match code {
            Some(bytes)
                if !modifiers.contains(Modifier::NATIVE) && !pragmas.contains(Pragma::HOSTED) =>
            {
                MethodBody::Bytecode(bytes)
            }
            _ => MethodBody::None,
        };

        let mut method = ClassFileMethod::new(
            method_name,
            modifiers,
            signature.return_type,
            signature.parameter_types,
            pragmas,
        );
        method.set_body(body);

        log::trace!(
            "  method: {}{}.{}",
            if method.is_static() { "static " } else { "" },
            self.klass.name(),
            method.name()
        );
        Ok(method)
    }

    /// Reads the class level attributes, returning the value of the
    /// SourceFile attribute if there is one.
    fn load_extra_attributes(&mut self) -> Result<Option<String>> {
        let attributes_count = self.reader.read_unsigned_short("ex-count")?;
        let mut source_file = None;
        let mut has_inner_classes_attribute = false;

        for _ in 0..attributes_count {
            let attribute = self.reader.open_attribute(&self.pool)?;
            if attribute.name == "SourceFile" {
                let index = self.reader.read_unsigned_short("sourcefile-index")?;
                source_file = Some(self.pool.get_utf8(index)?.to_string());
            } else if attribute.name == "InnerClasses" {
                if has_inner_classes_attribute {
                    return Err(self
                        .reader
                        .format_error("duplicate InnerClasses attribute in class"));
                }
                has_inner_classes_attribute = true;
                // Structurally decoded; this system attaches no meaning
                // to inner class relationships.
                let count = self.reader.read_unsigned_short("inc-number-of-classes")?;
                for _ in 0..count {
                    self.reader.read_unsigned_short("inc-inner-class-info-index")?;
                    self.reader.read_unsigned_short("inc-outer-class-info-index")?;
                    self.reader.read_unsigned_short("inc-inner-name-index")?;
                    self.reader
                        .read_unsigned_short("inc-inner-class-access-flags")?;
                }
            } else if attribute.name == "Synthetic" {
                self.klass.update_modifiers(Modifier::SOURCE_SYNTHETIC);
            } else {
                attribute.skip(self.reader)?;
            }
            attribute.close(self.reader)?;
        }
        Ok(source_file)
    }
}
