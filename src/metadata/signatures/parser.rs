use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{SignatureArray, SignatureField, SignatureMethod, TypeSignature},
        tables::{CodedIndex, CodedIndexType, TableId},
        typesystem::{PrimitiveKind, ELEMENT_TYPE},
    },
    Error::NotSupported,
    Result,
};

/// Maximum nesting of pointer and array types
const MAX_RECURSION_DEPTH: usize = 50;

/// Calling convention flag announcing a generic parameter count
const GENERIC: u8 = 0x10;
/// First byte of a field signature
const FIELD: u8 = 0x06;

/// Signature parser for the subset of ECMA-335 signatures native metadata uses.
///
/// Every signature has to be consumed completely; trailing bytes are treated as malformed.
///
/// # Example
///
/// ```rust
/// use winmdscope::metadata::signatures::{SignatureParser, TypeSignature};
/// use winmdscope::metadata::typesystem::PrimitiveKind;
///
/// // DEFAULT, 1 parameter, returns I4, takes U1*
/// let data = &[0x00, 0x01, 0x08, 0x0F, 0x05];
/// let signature = SignatureParser::new(data).parse_method_signature()?;
/// assert_eq!(signature.return_type, TypeSignature::Primitive(PrimitiveKind::Int32));
/// assert_eq!(signature.params.len(), 1);
/// # Ok::<(), winmdscope::Error>(())
/// ```
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` over a blob.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    /// Parse a single type.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for element types outside the native subset and
    /// [`crate::Error::Malformed`] for invalid encodings.
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(malformed_error!(
                "Signature nesting exceeds {}",
                MAX_RECURSION_DEPTH
            ));
        }

        let element_type = self.parser.read_le::<u8>()?;
        let signature = if let Some(kind) = PrimitiveKind::from_element_type(element_type) {
            TypeSignature::Primitive(kind)
        } else {
            match element_type {
                ELEMENT_TYPE::PTR => TypeSignature::Ptr(Box::new(self.parse_type()?)),
                ELEMENT_TYPE::VALUETYPE => TypeSignature::ValueType(self.parse_type_def_or_ref()?),
                ELEMENT_TYPE::CLASS => TypeSignature::Class(self.parse_type_def_or_ref()?),
                ELEMENT_TYPE::ARRAY => TypeSignature::Array(self.parse_array()?),
                _ => {
                    return Err(NotSupported(format!(
                        "Element type {element_type:#04x}"
                    )))
                }
            }
        };

        self.depth -= 1;
        Ok(signature)
    }

    fn parse_type_def_or_ref(&mut self) -> Result<CodedIndex> {
        let value = self.parser.read_compressed_uint()?;
        let index = CodedIndex::decode(value, CodedIndexType::TypeDefOrRef)?;
        if index.tag == TableId::TypeSpec {
            return Err(NotSupported("TypeSpec references".to_string()));
        }

        Ok(index)
    }

    fn parse_array(&mut self) -> Result<SignatureArray> {
        let base = self.parse_type()?;

        let rank = self.parser.read_compressed_uint()?;
        if rank != 1 {
            return Err(NotSupported(format!("Array of rank {rank}")));
        }

        let num_sizes = self.parser.read_compressed_uint()?;
        if num_sizes != 1 {
            return Err(NotSupported(format!("Array with {num_sizes} sizes")));
        }
        let size = self.parser.read_compressed_uint()?;

        let num_lo_bounds = self.parser.read_compressed_uint()?;
        match num_lo_bounds {
            0 => {}
            1 => {
                self.parser.read_compressed_uint()?;
            }
            _ => {
                return Err(NotSupported(format!(
                    "Array with {num_lo_bounds} lower bounds"
                )))
            }
        }

        Ok(SignatureArray {
            base: Box::new(base),
            size,
        })
    }

    /// Parse a method signature (II.23.2.1). Generic methods are rejected.
    ///
    /// # Errors
    /// Returns an error for generic methods, unsupported types or trailing data.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let flags = self.parser.read_le::<u8>()?;
        if flags & GENERIC != 0 {
            let generic_count = self.parser.read_compressed_uint()?;
            if generic_count != 0 {
                return Err(NotSupported(format!(
                    "Method with {generic_count} generic parameters"
                )));
            }
        }

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(self.parse_type()?);
        }

        self.expect_end()?;
        Ok(SignatureMethod {
            flags,
            return_type,
            params,
        })
    }

    /// Parse a field signature (II.23.2.4).
    ///
    /// # Errors
    /// Returns an error for an invalid header, unsupported types or trailing data.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        let base = self.parse_type()?;
        self.expect_end()?;

        Ok(SignatureField { base })
    }

    fn expect_end(&self) -> Result<()> {
        if self.parser.has_more_data() {
            return Err(malformed_error!(
                "Signature has {} trailing bytes",
                self.parser.remaining()
            ));
        }

        Ok(())
    }
}
