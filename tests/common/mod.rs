//! Writer for small synthetic metadata files.
//!
//! [`WinmdWriter`] emits a PE32 image with a CLR header and a metadata root holding the `#~`,
//! `#Strings` and `#Blob` streams, filled with the tables native metadata uses. Types are added
//! in definition order; every writer starts with the `<Module>` pseudo type and the
//! `Windows.Win32.Foundation.Metadata.Architecture` enumeration that `SupportedArchitecture`
//! arguments are typed with.
#![allow(dead_code)]

use std::collections::HashMap;

use winmdscope::{LoaderConfig, Metadata};

pub const FOUNDATION: &str = "Windows.Win32.Foundation";
pub const METADATA: &str = "Windows.Win32.Foundation.Metadata";

pub const X64: i32 = 2;
pub const ARM64: i32 = 4;

const TYPE_PUBLIC: u32 = 0x0001;
const TYPE_NESTED_PUBLIC: u32 = 0x0002;
const TYPE_SEQUENTIAL: u32 = 0x0008;
const TYPE_EXPLICIT: u32 = 0x0010;
const TYPE_INTERFACE: u32 = 0x0020;
const TYPE_ABSTRACT: u32 = 0x0080;
const TYPE_SEALED: u32 = 0x0100;

const FIELD_PUBLIC: u16 = 0x0006;
const FIELD_SPECIAL: u16 = 0x0606;
const FIELD_CONSTANT: u16 = 0x8056;

const SUPPORTS_LAST_ERROR: u16 = 0x0040;

const TABLE_MODULE: usize = 0x00;
const TABLE_TYPEREF: usize = 0x01;
const TABLE_TYPEDEF: usize = 0x02;
const TABLE_FIELD: usize = 0x04;
const TABLE_METHODDEF: usize = 0x06;
const TABLE_PARAM: usize = 0x08;
const TABLE_INTERFACEIMPL: usize = 0x09;
const TABLE_MEMBERREF: usize = 0x0A;
const TABLE_CONSTANT: usize = 0x0B;
const TABLE_CUSTOMATTRIBUTE: usize = 0x0C;
const TABLE_CLASSLAYOUT: usize = 0x0F;
const TABLE_FIELDLAYOUT: usize = 0x10;
const TABLE_MODULEREF: usize = 0x1A;
const TABLE_IMPLMAP: usize = 0x1C;
const TABLE_NESTEDCLASS: usize = 0x29;

/// A type reference as it appears in a signature.
#[derive(Debug, Clone)]
pub enum Target {
    /// `TypeDef` row
    Def(u32),
    /// A type of this file, referenced by namespace and name
    Named(String, String),
    /// A type of another assembly (`System.Guid`, interface base types)
    System(String, String),
    /// A type nested in the struct being decoded or one enclosing it
    Nested(String),
}

/// A signature type.
#[derive(Debug, Clone)]
pub enum Sig {
    Void,
    Bool,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    IntPtr,
    UIntPtr,
    Ptr(Box<Sig>),
    Value(Target),
    Class(Target),
    Array(Box<Sig>, u32),
}

impl Sig {
    pub fn ptr(target: Sig) -> Sig {
        Sig::Ptr(Box::new(target))
    }

    pub fn array(item: Sig, length: u32) -> Sig {
        Sig::Array(Box::new(item), length)
    }

    /// A value type of this file.
    pub fn named(namespace: &str, name: &str) -> Sig {
        Sig::Value(Target::Named(namespace.to_string(), name.to_string()))
    }

    /// A struct nested in the struct being decoded.
    pub fn nested(name: &str) -> Sig {
        Sig::Value(Target::Nested(name.to_string()))
    }

    /// An interface of this file, referenced as a class.
    pub fn interface(namespace: &str, name: &str) -> Sig {
        Sig::Class(Target::Named(namespace.to_string(), name.to_string()))
    }

    pub fn guid() -> Sig {
        Sig::Value(Target::System("System".to_string(), "Guid".to_string()))
    }
}

/// The value of a literal field.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    I4(i32),
    U4(u32),
    I8(i64),
    R8(f64),
    String(String),
}

impl Value {
    fn encode(&self) -> (u8, Vec<u8>) {
        match self {
            Value::Bool(value) => (0x02, vec![u8::from(*value)]),
            Value::I4(value) => (0x08, value.to_le_bytes().to_vec()),
            Value::U4(value) => (0x09, value.to_le_bytes().to_vec()),
            Value::I8(value) => (0x0A, value.to_le_bytes().to_vec()),
            Value::R8(value) => (0x0D, value.to_le_bytes().to_vec()),
            Value::String(value) => (
                0x0E,
                value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            ),
        }
    }
}

/// A custom attribute.
#[derive(Debug, Clone)]
pub enum Attr {
    Flags,
    Obsolete,
    NativeTypedef,
    FlexibleArray,
    Guid(u32, u16, u16, [u8; 8]),
    Architecture(i32),
    Documentation(String),
    Constant(String),
    NativeEncoding(String),
    StructSizeField(String),
    /// An attribute without consequences for the graph
    Ignored(&'static str),
}

impl Attr {
    fn type_name(&self) -> (&'static str, &'static str) {
        match self {
            Attr::Flags => ("System", "FlagsAttribute"),
            Attr::Obsolete => ("System", "ObsoleteAttribute"),
            Attr::NativeTypedef => (METADATA, "NativeTypedefAttribute"),
            Attr::FlexibleArray => (METADATA, "FlexibleArrayAttribute"),
            Attr::Guid(..) => (METADATA, "GuidAttribute"),
            Attr::Architecture(_) => (METADATA, "SupportedArchitectureAttribute"),
            Attr::Documentation(_) => (METADATA, "DocumentationAttribute"),
            Attr::Constant(_) => (METADATA, "ConstantAttribute"),
            Attr::NativeEncoding(_) => (METADATA, "NativeEncodingAttribute"),
            Attr::StructSizeField(_) => (METADATA, "StructSizeFieldAttribute"),
            Attr::Ignored(name) => (METADATA, *name),
        }
    }
}

/// A field of a struct, enumeration or `Apis` type.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub sig: Sig,
    pub value: Option<Value>,
    pub attrs: Vec<Attr>,
}

impl Field {
    pub fn new(name: &str, sig: Sig) -> Field {
        Field {
            name: name.to_string(),
            sig,
            value: None,
            attrs: Vec::new(),
        }
    }

    pub fn constant(name: &str, sig: Sig, value: Value) -> Field {
        Field {
            value: Some(value),
            ..Field::new(name, sig)
        }
    }

    pub fn with(mut self, attr: Attr) -> Field {
        self.attrs.push(attr);
        self
    }
}

/// A function, delegate `Invoke` or interface method.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret: Sig,
    pub params: Vec<(String, Sig)>,
    pub attrs: Vec<Attr>,
    /// Native library and whether the function sets the last error
    pub import: Option<(String, bool)>,
    /// Emit a parameter row with sequence 0 for the return value
    pub return_param: bool,
}

impl Function {
    pub fn new(name: &str, ret: Sig, params: &[(&str, Sig)]) -> Function {
        Function {
            name: name.to_string(),
            ret,
            params: params
                .iter()
                .map(|(name, sig)| ((*name).to_string(), sig.clone()))
                .collect(),
            attrs: Vec::new(),
            import: None,
            return_param: false,
        }
    }

    pub fn import(mut self, library: &str, last_error: bool) -> Function {
        self.import = Some((library.to_string(), last_error));
        self
    }

    pub fn with(mut self, attr: Attr) -> Function {
        self.attrs.push(attr);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    None,
    ValueType,
    Enum,
    Delegate,
    Object,
}

#[derive(Debug, Clone)]
struct TypeDef {
    namespace: String,
    name: String,
    flags: u32,
    base: Base,
    fields: Vec<Field>,
    methods: Vec<Function>,
    attrs: Vec<Attr>,
    layout: Option<(u16, u32)>,
    enclosing: Option<u32>,
    interface: Option<Target>,
    explicit_offsets: bool,
}

impl TypeDef {
    fn new(namespace: &str, name: &str, flags: u32, base: Base) -> TypeDef {
        TypeDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags,
            base,
            fields: Vec::new(),
            methods: Vec::new(),
            attrs: Vec::new(),
            layout: None,
            enclosing: None,
            interface: None,
            explicit_offsets: false,
        }
    }
}

/// Options of a struct definition.
#[derive(Debug, Clone, Default)]
pub struct StructOptions {
    pub union: bool,
    pub packing: u16,
    pub size: u32,
    pub enclosing: Option<u32>,
    pub attrs: Vec<Attr>,
}

/// Builds the tables and heaps of a metadata file.
pub struct WinmdWriter {
    strings: Vec<u8>,
    string_index: HashMap<String, u32>,
    blobs: Vec<u8>,
    type_refs: Vec<[u32; 3]>,
    type_ref_index: HashMap<(u32, String, String), u32>,
    type_defs: Vec<[u32; 6]>,
    fields: Vec<[u32; 3]>,
    methods: Vec<[u32; 4]>,
    params: Vec<[u32; 3]>,
    interface_impls: Vec<[u32; 2]>,
    member_refs: Vec<[u32; 3]>,
    member_ref_index: HashMap<(String, String), u32>,
    constants: Vec<[u32; 3]>,
    custom_attributes: Vec<[u32; 3]>,
    class_layouts: Vec<[u32; 3]>,
    field_layouts: Vec<[u32; 2]>,
    module_refs: Vec<u32>,
    module_ref_index: HashMap<String, u32>,
    impl_maps: Vec<[u32; 4]>,
    nested_classes: Vec<[u32; 2]>,
}

impl Default for WinmdWriter {
    fn default() -> Self {
        WinmdWriter::new()
    }
}

impl WinmdWriter {
    pub fn new() -> WinmdWriter {
        let mut writer = WinmdWriter {
            strings: vec![0],
            string_index: HashMap::new(),
            blobs: vec![0],
            type_refs: Vec::new(),
            type_ref_index: HashMap::new(),
            type_defs: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            params: Vec::new(),
            interface_impls: Vec::new(),
            member_refs: Vec::new(),
            member_ref_index: HashMap::new(),
            constants: Vec::new(),
            custom_attributes: Vec::new(),
            class_layouts: Vec::new(),
            field_layouts: Vec::new(),
            module_refs: Vec::new(),
            module_ref_index: HashMap::new(),
            impl_maps: Vec::new(),
            nested_classes: Vec::new(),
        };

        let module = writer.string("<Module>");
        writer.type_defs.push([0, module, 0, 0, 1, 1]);

        let architecture = writer.next_rid();
        let member = |name: &str, value: i32| {
            Field::constant(name, Sig::Value(Target::Def(architecture)), Value::I4(value))
        };
        let mut def = TypeDef::new(METADATA, "Architecture", TYPE_PUBLIC | TYPE_SEALED, Base::Enum);
        def.fields = vec![
            Field::new("value__", Sig::I4),
            member("None", 0),
            member("X86", 1),
            member("X64", X64),
            member("Arm64", ARM64),
        ];
        def.attrs.push(Attr::Flags);
        writer.add(def);

        writer
    }

    /// Row the next defined type gets.
    pub fn next_rid(&self) -> u32 {
        self.type_defs.len() as u32 + 1
    }

    /// Define a struct (or a union).
    pub fn add_struct(
        &mut self,
        namespace: &str,
        name: &str,
        fields: Vec<Field>,
        options: StructOptions,
    ) -> u32 {
        let visibility = if options.enclosing.is_some() {
            TYPE_NESTED_PUBLIC
        } else {
            TYPE_PUBLIC
        };
        let layout = if options.union {
            TYPE_EXPLICIT
        } else {
            TYPE_SEQUENTIAL
        };
        let namespace = if options.enclosing.is_some() { "" } else { namespace };

        let mut def = TypeDef::new(namespace, name, visibility | layout | TYPE_SEALED, Base::ValueType);
        def.fields = fields;
        def.attrs = options.attrs;
        def.enclosing = options.enclosing;
        def.explicit_offsets = options.union;
        if options.packing != 0 || options.size != 0 {
            def.layout = Some((options.packing, options.size));
        }
        self.add(def)
    }

    /// Define a plain struct with natural layout.
    pub fn add_simple_struct(&mut self, namespace: &str, name: &str, fields: &[(&str, Sig)]) -> u32 {
        let fields = fields
            .iter()
            .map(|(name, sig)| Field::new(name, sig.clone()))
            .collect();
        self.add_struct(namespace, name, fields, StructOptions::default())
    }

    /// Define a native typedef wrapping `value`.
    pub fn add_alias(&mut self, namespace: &str, name: &str, value: Sig) -> u32 {
        self.add_struct(
            namespace,
            name,
            vec![Field::new("Value", value)],
            StructOptions {
                attrs: vec![Attr::NativeTypedef],
                ..StructOptions::default()
            },
        )
    }

    /// Define an enumeration with base type `base`.
    pub fn add_enum(
        &mut self,
        namespace: &str,
        name: &str,
        base: Sig,
        members: &[(&str, Value)],
        flags: bool,
    ) -> u32 {
        let rid = self.next_rid();
        let mut def = TypeDef::new(namespace, name, TYPE_PUBLIC | TYPE_SEALED, Base::Enum);
        def.fields.push(Field::new("value__", base));
        for (member, value) in members {
            def.fields.push(Field::constant(
                member,
                Sig::Value(Target::Def(rid)),
                value.clone(),
            ));
        }
        if flags {
            def.attrs.push(Attr::Flags);
        }
        self.add(def)
    }

    /// Define a function pointer type.
    pub fn add_delegate(&mut self, namespace: &str, name: &str, invoke: Function, attrs: Vec<Attr>) -> u32 {
        let mut def = TypeDef::new(namespace, name, TYPE_PUBLIC | TYPE_SEALED, Base::Delegate);
        def.methods = vec![
            Function::new(
                ".ctor",
                Sig::Void,
                &[
                    ("object", Sig::Class(Target::System("System".to_string(), "Object".to_string()))),
                    ("method", Sig::IntPtr),
                ],
            ),
            Function {
                name: "Invoke".to_string(),
                ..invoke
            },
        ];
        def.attrs = attrs;
        self.add(def)
    }

    /// Define a COM interface, optionally derived from `base`.
    pub fn add_interface(
        &mut self,
        namespace: &str,
        name: &str,
        base: Option<Target>,
        methods: Vec<Function>,
        attrs: Vec<Attr>,
    ) -> u32 {
        let mut def = TypeDef::new(
            namespace,
            name,
            TYPE_PUBLIC | TYPE_INTERFACE | TYPE_ABSTRACT,
            Base::None,
        );
        def.methods = methods;
        def.interface = base;
        def.attrs = attrs;
        self.add(def)
    }

    /// Define the `Apis` type of `namespace` holding functions and constants.
    pub fn add_apis(&mut self, namespace: &str, functions: Vec<Function>, constants: Vec<Field>) -> u32 {
        let mut def = TypeDef::new(
            namespace,
            "Apis",
            TYPE_PUBLIC | TYPE_ABSTRACT | TYPE_SEALED,
            Base::Object,
        );
        def.methods = functions;
        def.fields = constants;
        self.add(def)
    }

    fn add(&mut self, def: TypeDef) -> u32 {
        let rid = self.next_rid();

        let extends = match def.base {
            Base::None => 0,
            Base::ValueType => self.system_ref("System", "ValueType") << 2 | 1,
            Base::Enum => self.system_ref("System", "Enum") << 2 | 1,
            Base::Delegate => self.system_ref("System", "MulticastDelegate") << 2 | 1,
            Base::Object => self.system_ref("System", "Object") << 2 | 1,
        };
        let name = self.string(&def.name);
        let namespace = self.string(&def.namespace);
        let field_list = self.fields.len() as u32 + 1;
        let method_list = self.methods.len() as u32 + 1;
        self.type_defs
            .push([def.flags, name, namespace, extends, field_list, method_list]);
        self.attach(&def.attrs, rid << 5 | 3);

        if let Some((packing, size)) = def.layout {
            self.class_layouts.push([u32::from(packing), size, rid]);
        }
        if let Some(enclosing) = def.enclosing {
            self.nested_classes.push([rid, enclosing]);
        }
        if let Some(base) = &def.interface {
            let interface = self.type_def_or_ref(base);
            self.interface_impls.push([rid, interface]);
        }

        for field in &def.fields {
            let field_rid = self.fields.len() as u32 + 1;
            let flags = match (&field.value, field.name.as_str()) {
                (Some(_), _) => FIELD_CONSTANT,
                (None, "value__") => FIELD_SPECIAL,
                (None, _) => FIELD_PUBLIC,
            };
            let name = self.string(&field.name);
            let mut signature = vec![0x06];
            self.encode(&field.sig, &mut signature);
            let signature = self.blob(&signature);
            self.fields.push([u32::from(flags), name, signature]);

            if let Some(value) = &field.value {
                let (element_type, bytes) = value.encode();
                let blob = self.blob(&bytes);
                self.constants.push([u32::from(element_type), field_rid << 2, blob]);
            }
            if def.explicit_offsets {
                self.field_layouts.push([0, field_rid]);
            }
            self.attach(&field.attrs, field_rid << 5 | 1);
        }

        for function in &def.methods {
            self.add_method(function);
        }

        rid
    }

    fn add_method(&mut self, function: &Function) {
        let rid = self.methods.len() as u32 + 1;
        let param_list = self.params.len() as u32 + 1;

        let mut signature = vec![0x00];
        compress(function.params.len() as u32, &mut signature);
        self.encode(&function.ret, &mut signature);
        for (_, sig) in &function.params {
            self.encode(sig, &mut signature);
        }
        let name = self.string(&function.name);
        let signature = self.blob(&signature);
        self.methods.push([0x2096, name, signature, param_list]);

        if function.return_param {
            let empty = self.string("");
            self.params.push([0, 0, empty]);
        }
        for (sequence, (name, _)) in function.params.iter().enumerate() {
            let name = self.string(name);
            self.params.push([0, sequence as u32 + 1, name]);
        }

        if let Some((library, last_error)) = &function.import {
            let scope = match self.module_ref_index.get(library) {
                Some(rid) => *rid,
                None => {
                    let name = self.string(library);
                    self.module_refs.push(name);
                    let scope = self.module_refs.len() as u32;
                    self.module_ref_index.insert(library.clone(), scope);
                    scope
                }
            };
            let flags = 0x0100 | if *last_error { SUPPORTS_LAST_ERROR } else { 0 };
            let import_name = self.string(&function.name);
            self.impl_maps
                .push([u32::from(flags), rid << 1 | 1, import_name, scope]);
        }

        self.attach(&function.attrs, rid << 5);
    }

    fn attach(&mut self, attrs: &[Attr], parent: u32) {
        for attr in attrs {
            let constructor = self.attribute_constructor(attr);

            let mut value = vec![0x01, 0x00];
            match attr {
                Attr::Flags
                | Attr::Obsolete
                | Attr::NativeTypedef
                | Attr::FlexibleArray
                | Attr::Ignored(_) => {}
                Attr::Guid(data1, data2, data3, data4) => {
                    value.extend_from_slice(&data1.to_le_bytes());
                    value.extend_from_slice(&data2.to_le_bytes());
                    value.extend_from_slice(&data3.to_le_bytes());
                    value.extend_from_slice(data4);
                }
                Attr::Architecture(bits) => value.extend_from_slice(&bits.to_le_bytes()),
                Attr::Documentation(text)
                | Attr::Constant(text)
                | Attr::NativeEncoding(text)
                | Attr::StructSizeField(text) => {
                    compress(text.len() as u32, &mut value);
                    value.extend_from_slice(text.as_bytes());
                }
            }
            value.extend_from_slice(&[0x00, 0x00]);

            let value = self.blob(&value);
            self.custom_attributes.push([parent, constructor << 3 | 3, value]);
        }
    }

    fn attribute_constructor(&mut self, attr: &Attr) -> u32 {
        let (namespace, name) = attr.type_name();
        let key = (namespace.to_string(), name.to_string());
        if let Some(rid) = self.member_ref_index.get(&key) {
            return *rid;
        }

        let class = if namespace == "System" {
            self.system_ref(namespace, name)
        } else {
            self.module_ref(namespace, name)
        };

        let mut signature = vec![0x20];
        let params: Vec<u8> = match attr {
            Attr::Guid(..) => vec![0x09, 0x07, 0x07, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05],
            // Windows.Win32.Foundation.Metadata.Architecture is always row 2
            Attr::Architecture(_) => vec![0x11, 2 << 2],
            Attr::Documentation(_)
            | Attr::Constant(_)
            | Attr::NativeEncoding(_)
            | Attr::StructSizeField(_) => vec![0x0E],
            _ => Vec::new(),
        };
        let count = match attr {
            Attr::Guid(..) => 11,
            Attr::Architecture(_) => 1,
            _ => params.len() as u32,
        };
        compress(count, &mut signature);
        signature.push(0x01);
        signature.extend_from_slice(&params);

        let ctor = self.string(".ctor");
        let signature = self.blob(&signature);
        self.member_refs.push([class << 3 | 1, ctor, signature]);
        let rid = self.member_refs.len() as u32;
        self.member_ref_index.insert(key, rid);
        rid
    }

    fn encode(&mut self, sig: &Sig, out: &mut Vec<u8>) {
        match sig {
            Sig::Void => out.push(0x01),
            Sig::Bool => out.push(0x02),
            Sig::Char => out.push(0x03),
            Sig::I1 => out.push(0x04),
            Sig::U1 => out.push(0x05),
            Sig::I2 => out.push(0x06),
            Sig::U2 => out.push(0x07),
            Sig::I4 => out.push(0x08),
            Sig::U4 => out.push(0x09),
            Sig::I8 => out.push(0x0A),
            Sig::U8 => out.push(0x0B),
            Sig::R4 => out.push(0x0C),
            Sig::R8 => out.push(0x0D),
            Sig::String => out.push(0x0E),
            Sig::IntPtr => out.push(0x18),
            Sig::UIntPtr => out.push(0x19),
            Sig::Ptr(target) => {
                out.push(0x0F);
                self.encode(target, out);
            }
            Sig::Value(target) => {
                out.push(0x11);
                let index = self.type_def_or_ref(target);
                compress(index, out);
            }
            Sig::Class(target) => {
                out.push(0x12);
                let index = self.type_def_or_ref(target);
                compress(index, out);
            }
            Sig::Array(item, length) => {
                out.push(0x14);
                self.encode(item, out);
                // rank, one size, no lower bounds
                out.push(0x01);
                out.push(0x01);
                compress(*length, out);
                out.push(0x00);
            }
        }
    }

    fn type_def_or_ref(&mut self, target: &Target) -> u32 {
        match target {
            Target::Def(rid) => rid << 2,
            Target::Named(namespace, name) => self.module_ref(namespace, name) << 2 | 1,
            Target::System(namespace, name) => self.system_ref(namespace, name) << 2 | 1,
            Target::Nested(name) => {
                // the scope row only marks the reference as nested
                let scope = self.module_ref("", "<Enclosing>");
                self.type_ref(scope << 2 | 3, "", name) << 2 | 1
            }
        }
    }

    /// A type reference into `mscorlib`, assembly reference 1.
    fn system_ref(&mut self, namespace: &str, name: &str) -> u32 {
        self.type_ref(1 << 2 | 2, namespace, name)
    }

    /// A type reference into this file.
    fn module_ref(&mut self, namespace: &str, name: &str) -> u32 {
        self.type_ref(1 << 2, namespace, name)
    }

    fn type_ref(&mut self, scope: u32, namespace: &str, name: &str) -> u32 {
        let key = (scope, namespace.to_string(), name.to_string());
        if let Some(rid) = self.type_ref_index.get(&key) {
            return *rid;
        }

        let name = self.string(name);
        let namespace = self.string(namespace);
        self.type_refs.push([scope, name, namespace]);
        let rid = self.type_refs.len() as u32;
        self.type_ref_index.insert(key, rid);
        rid
    }

    fn string(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(index) = self.string_index.get(value) {
            return *index;
        }

        let index = self.strings.len() as u32;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn blob(&mut self, value: &[u8]) -> u32 {
        let index = self.blobs.len() as u32;
        let mut length = Vec::new();
        compress(value.len() as u32, &mut length);
        self.blobs.extend_from_slice(&length);
        self.blobs.extend_from_slice(value);
        index
    }

    /// The `#~` stream.
    fn tables(&self) -> Vec<u8> {
        let mut tables: Vec<(usize, Vec<Vec<u32>>, &[u8])> = Vec::new();

        // widths: 2 = u16, 4 = u32, 1 = u8 followed by a padding byte
        tables.push((TABLE_MODULE, vec![vec![0, 0, 0, 0, 0]], &[2, 2, 2, 2, 2]));
        tables.push((
            TABLE_TYPEREF,
            self.type_refs.iter().map(|row| row.to_vec()).collect(),
            &[2, 2, 2],
        ));
        tables.push((
            TABLE_TYPEDEF,
            self.type_defs.iter().map(|row| row.to_vec()).collect(),
            &[4, 2, 2, 2, 2, 2],
        ));
        tables.push((
            TABLE_FIELD,
            self.fields.iter().map(|row| row.to_vec()).collect(),
            &[2, 2, 2],
        ));
        tables.push((
            TABLE_METHODDEF,
            self.methods
                .iter()
                .map(|row| vec![0, 0x0080, row[0], row[1], row[2], row[3]])
                .collect(),
            &[4, 2, 2, 2, 2, 2],
        ));
        tables.push((
            TABLE_PARAM,
            self.params.iter().map(|row| row.to_vec()).collect(),
            &[2, 2, 2],
        ));
        tables.push((
            TABLE_INTERFACEIMPL,
            sorted(self.interface_impls.iter().map(|row| row.to_vec()).collect(), 0),
            &[2, 2],
        ));
        tables.push((
            TABLE_MEMBERREF,
            self.member_refs.iter().map(|row| row.to_vec()).collect(),
            &[2, 2, 2],
        ));
        tables.push((
            TABLE_CONSTANT,
            sorted(self.constants.iter().map(|row| row.to_vec()).collect(), 1),
            &[1, 2, 2],
        ));
        tables.push((
            TABLE_CUSTOMATTRIBUTE,
            sorted(self.custom_attributes.iter().map(|row| row.to_vec()).collect(), 0),
            &[2, 2, 2],
        ));
        tables.push((
            TABLE_CLASSLAYOUT,
            sorted(self.class_layouts.iter().map(|row| row.to_vec()).collect(), 2),
            &[2, 4, 2],
        ));
        tables.push((
            TABLE_FIELDLAYOUT,
            sorted(self.field_layouts.iter().map(|row| row.to_vec()).collect(), 1),
            &[4, 2],
        ));
        tables.push((
            TABLE_MODULEREF,
            self.module_refs.iter().map(|name| vec![*name]).collect(),
            &[2],
        ));
        tables.push((
            TABLE_IMPLMAP,
            sorted(self.impl_maps.iter().map(|row| row.to_vec()).collect(), 1),
            &[2, 2, 2, 2],
        ));
        tables.push((
            TABLE_NESTEDCLASS,
            sorted(self.nested_classes.iter().map(|row| row.to_vec()).collect(), 0),
            &[2, 2],
        ));
        tables.retain(|(_, rows, _)| !rows.is_empty());

        let valid = tables.iter().fold(0u64, |mask, (id, _, _)| mask | 1u64 << *id);

        let mut data = vec![0, 0, 0, 0, 2, 0, 0, 1];
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&valid.to_le_bytes());
        for (_, rows, _) in &tables {
            data.extend_from_slice(&(rows.len() as u32).to_le_bytes());
        }
        for (_, rows, widths) in &tables {
            for row in rows {
                for (value, width) in row.iter().zip(widths.iter()) {
                    match width {
                        1 => data.extend_from_slice(&[*value as u8, 0]),
                        2 => data.extend_from_slice(&(*value as u16).to_le_bytes()),
                        _ => data.extend_from_slice(&value.to_le_bytes()),
                    }
                }
            }
        }
        data
    }

    /// The metadata root with its three streams.
    pub fn metadata(&self) -> Vec<u8> {
        let version = b"v4.0.30319\0\0";
        let streams: [(&str, Vec<u8>); 3] = [
            ("#~", self.tables()),
            ("#Strings", self.strings.clone()),
            ("#Blob", self.blobs.clone()),
        ];

        let header_size = |name: &str| 8 + (name.len() + 4) / 4 * 4;
        let mut offset = 16 + version.len() + 4;
        offset += streams.iter().map(|(name, _)| header_size(name)).sum::<usize>();

        let mut root = Vec::new();
        root.extend_from_slice(&0x424A_5342u32.to_le_bytes());
        root.extend_from_slice(&1u16.to_le_bytes());
        root.extend_from_slice(&1u16.to_le_bytes());
        root.extend_from_slice(&0u32.to_le_bytes());
        root.extend_from_slice(&(version.len() as u32).to_le_bytes());
        root.extend_from_slice(version);
        root.extend_from_slice(&0u16.to_le_bytes());
        root.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let mut body = Vec::new();
        for (name, data) in &streams {
            let size = data.len().div_ceil(4) * 4;
            root.extend_from_slice(&(offset as u32).to_le_bytes());
            root.extend_from_slice(&(size as u32).to_le_bytes());
            let mut padded_name = name.as_bytes().to_vec();
            padded_name.resize(header_size(name) - 8, 0);
            root.extend_from_slice(&padded_name);

            let mut padded = data.clone();
            padded.resize(size, 0);
            body.extend_from_slice(&padded);
            offset += size;
        }

        root.extend_from_slice(&body);
        root
    }

    /// The complete PE image.
    pub fn to_bytes(&self) -> Vec<u8> {
        const SECTION_RVA: u32 = 0x2000;
        const SECTION_OFFSET: usize = 0x200;

        let metadata = self.metadata();
        let mut section = vec![0u8; 72];
        section[0..4].copy_from_slice(&72u32.to_le_bytes());
        section[4..8].copy_from_slice(&0x0005_0002u32.to_le_bytes());
        section[8..12].copy_from_slice(&(SECTION_RVA + 72).to_le_bytes());
        section[12..16].copy_from_slice(&(metadata.len() as u32).to_le_bytes());
        section.extend_from_slice(&metadata);
        let virtual_size = section.len() as u32;
        section.resize(section.len().div_ceil(0x200) * 0x200, 0);

        let mut image = vec![0u8; SECTION_OFFSET];
        image[0..2].copy_from_slice(b"MZ");
        image[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());

        let pe = 0x80;
        image[pe..pe + 4].copy_from_slice(b"PE\0\0");
        image[pe + 4..pe + 6].copy_from_slice(&0x014Cu16.to_le_bytes());
        image[pe + 6..pe + 8].copy_from_slice(&1u16.to_le_bytes());
        image[pe + 20..pe + 22].copy_from_slice(&224u16.to_le_bytes());

        let optional = pe + 24;
        image[optional..optional + 2].copy_from_slice(&0x010Bu16.to_le_bytes());
        image[optional + 92..optional + 96].copy_from_slice(&16u32.to_le_bytes());
        let clr = optional + 96 + 14 * 8;
        image[clr..clr + 4].copy_from_slice(&SECTION_RVA.to_le_bytes());
        image[clr + 4..clr + 8].copy_from_slice(&72u32.to_le_bytes());

        let header = optional + 224;
        image[header..header + 5].copy_from_slice(b".text");
        image[header + 8..header + 12].copy_from_slice(&virtual_size.to_le_bytes());
        image[header + 12..header + 16].copy_from_slice(&SECTION_RVA.to_le_bytes());
        image[header + 16..header + 20].copy_from_slice(&(section.len() as u32).to_le_bytes());
        image[header + 20..header + 24].copy_from_slice(&(SECTION_OFFSET as u32).to_le_bytes());

        image.extend_from_slice(&section);
        image
    }

    /// Build the graph of this file.
    pub fn load(&self, config: LoaderConfig) -> winmdscope::Result<Metadata> {
        Metadata::from_bytes(&self.to_bytes(), config)
    }
}

fn sorted(mut rows: Vec<Vec<u32>>, key: usize) -> Vec<Vec<u32>> {
    rows.sort_by_key(|row| row[key]);
    rows
}

fn compress(value: u32, out: &mut Vec<u8>) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.extend_from_slice(&(0x8000 | value as u16).to_be_bytes());
    } else {
        out.extend_from_slice(&(0xC000_0000 | value).to_be_bytes());
    }
}

/// The `Windows.Win32.Foundation` part of a typical file: aliases, a few structs, the last
/// error enumeration and some functions and constants.
pub fn foundation(writer: &mut WinmdWriter) {
    writer.add_alias(FOUNDATION, "HANDLE", Sig::IntPtr);
    writer.add_alias(FOUNDATION, "BOOL", Sig::I4);
    writer.add_alias(FOUNDATION, "PWSTR", Sig::ptr(Sig::Char));
    writer.add_enum(
        FOUNDATION,
        "WIN32_ERROR",
        Sig::U4,
        &[
            ("NO_ERROR", Value::U4(0)),
            ("ERROR_INVALID_FUNCTION", Value::U4(1)),
            ("ERROR_FILE_NOT_FOUND", Value::U4(2)),
        ],
        false,
    );
    writer.add_simple_struct(
        FOUNDATION,
        "RECT",
        &[
            ("left", Sig::I4),
            ("top", Sig::I4),
            ("right", Sig::I4),
            ("bottom", Sig::I4),
        ],
    );
    writer.add_simple_struct(FOUNDATION, "POINT", &[("x", Sig::I4), ("y", Sig::I4)]);
    writer.add_simple_struct(
        FOUNDATION,
        "FILETIME",
        &[("dwLowDateTime", Sig::U4), ("dwHighDateTime", Sig::U4)],
    );
    writer.add_apis(
        FOUNDATION,
        vec![
            Function::new(
                "CloseHandle",
                Sig::named(FOUNDATION, "BOOL"),
                &[("hObject", Sig::named(FOUNDATION, "HANDLE"))],
            )
            .import("KERNEL32.dll", true),
            Function::new("GetLastError", Sig::named(FOUNDATION, "WIN32_ERROR"), &[])
                .import("KERNEL32.dll", false),
        ],
        vec![
            Field::constant("MAX_PATH", Sig::U4, Value::U4(260)),
            Field::constant("S_OK", Sig::I4, Value::I4(0)),
        ],
    );
}
