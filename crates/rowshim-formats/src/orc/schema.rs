//! ORC type tree and its textual form.
//!
//! The text form is the one ORC tools print, e.g.
//! `struct<name:string,price:decimal(10,2),tags:array<string>>`.
//! Keywords are case-insensitive. Field names that are not plain
//! identifiers are written between backticks, with embedded backticks
//! doubled.

use std::fmt;
use std::str::FromStr;

use arrow_schema::{DataType, Schema};

use super::OrcType;
use crate::error::{FormatError, FormatResult};

/// Maximum length used for `char` and `varchar` when none is given.
pub const DEFAULT_MAX_LENGTH: u32 = 256;

/// Precision of a bare `decimal`.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 38;

/// Scale of a bare `decimal`.
pub const DEFAULT_DECIMAL_SCALE: u32 = 10;

/// An ORC type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrcSchema {
    /// `boolean`.
    Boolean,
    /// `tinyint`.
    TinyInt,
    /// `smallint`.
    SmallInt,
    /// `int`.
    Int,
    /// `bigint`.
    BigInt,
    /// `float`.
    Float,
    /// `double`.
    Double,
    /// `decimal(precision,scale)`.
    Decimal {
        /// Total digits.
        precision: u32,
        /// Digits after the point.
        scale: u32,
    },
    /// `string`.
    String,
    /// `char(n)`.
    Char(u32),
    /// `varchar(n)`.
    Varchar(u32),
    /// `binary`.
    Binary,
    /// `date`.
    Date,
    /// `timestamp`.
    Timestamp,
    /// `struct<...>`.
    Struct(OrcStruct),
    /// `array<item>`.
    List(Box<OrcSchema>),
    /// `map<key,value>`.
    Map(Box<OrcSchema>, Box<OrcSchema>),
    /// `uniontype<...>`.
    Union(Vec<OrcSchema>),
}

/// Children of a struct type. Names and types always pair up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrcStruct {
    field_names: Vec<String>,
    children: Vec<OrcSchema>,
}

impl OrcStruct {
    /// Pairs `field_names` with `children`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SchemaMismatch`] when the counts differ or a
    /// name is empty or repeated.
    pub fn new(field_names: Vec<String>, children: Vec<OrcSchema>) -> FormatResult<Self> {
        if field_names.len() != children.len() {
            return Err(FormatError::SchemaMismatch(format!(
                "orc struct has {} field names for {} children",
                field_names.len(),
                children.len()
            )));
        }
        for (i, name) in field_names.iter().enumerate() {
            if name.is_empty() {
                return Err(FormatError::SchemaMismatch(format!(
                    "orc struct field {i} has an empty name"
                )));
            }
            if field_names[..i].contains(name) {
                return Err(FormatError::SchemaMismatch(format!(
                    "orc struct repeats field '{name}'"
                )));
            }
        }
        Ok(Self {
            field_names,
            children,
        })
    }

    /// Field names in order.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Child types in order.
    #[must_use]
    pub fn children(&self) -> &[OrcSchema] {
        &self.children
    }

    /// `(name, type)` pairs in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &OrcSchema)> {
        self.field_names
            .iter()
            .map(String::as_str)
            .zip(&self.children)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the struct has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl OrcSchema {
    /// Catalog category of this type.
    #[must_use]
    pub fn category(&self) -> OrcType {
        match self {
            Self::Boolean => OrcType::Boolean,
            Self::TinyInt => OrcType::TinyInt,
            Self::SmallInt => OrcType::SmallInt,
            Self::Int => OrcType::Int,
            Self::BigInt => OrcType::BigInt,
            Self::Float => OrcType::Float,
            Self::Double => OrcType::Double,
            Self::Decimal { .. } => OrcType::Decimal,
            Self::String => OrcType::String,
            Self::Char(_) => OrcType::Char,
            Self::Varchar(_) => OrcType::Varchar,
            Self::Binary => OrcType::Binary,
            Self::Date => OrcType::Date,
            Self::Timestamp => OrcType::Timestamp,
            Self::Struct(_) => OrcType::Struct,
            Self::List(_) => OrcType::List,
            Self::Map(..) => OrcType::Map,
            Self::Union(_) => OrcType::Union,
        }
    }

    /// Parses the textual form.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::SchemaMismatch`] describing the first
    /// syntax error.
    pub fn parse(text: &str) -> FormatResult<Self> {
        let mut parser = Parser { text, pos: 0 };
        let parsed = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != text.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(parsed)
    }

    /// Derives the ORC type a reader reports as `data_type`.
    ///
    /// `char` and `varchar` surface as Arrow strings, so they come back
    /// as [`OrcSchema::String`].
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnsupportedType`] for Arrow types with no
    /// ORC counterpart.
    pub fn from_arrow(name: &str, data_type: &DataType) -> FormatResult<Self> {
        Ok(match data_type {
            DataType::Boolean => Self::Boolean,
            DataType::Int8 => Self::TinyInt,
            DataType::Int16 => Self::SmallInt,
            DataType::Int32 => Self::Int,
            DataType::Int64 => Self::BigInt,
            DataType::Float32 => Self::Float,
            DataType::Float64 => Self::Double,
            DataType::Decimal128(precision, scale) => Self::Decimal {
                precision: u32::from(*precision),
                scale: u32::try_from(*scale)
                    .map_err(|_| FormatError::unsupported(name, format!("decimal scale {scale}")))?,
            },
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Self::String,
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => Self::Binary,
            DataType::Date32 => Self::Date,
            DataType::Timestamp(..) => Self::Timestamp,
            DataType::Struct(fields) => {
                let names = fields.iter().map(|f| f.name().clone()).collect();
                let children = fields
                    .iter()
                    .map(|f| Self::from_arrow(f.name(), f.data_type()))
                    .collect::<FormatResult<Vec<_>>>()?;
                Self::Struct(OrcStruct::new(names, children)?)
            }
            DataType::List(item) | DataType::LargeList(item) => {
                Self::List(Box::new(Self::from_arrow(name, item.data_type())?))
            }
            DataType::Map(entries, _) => {
                let DataType::Struct(kv) = entries.data_type() else {
                    return Err(FormatError::unsupported(name, "map without entries"));
                };
                let [key, value] = kv.iter().collect::<Vec<_>>()[..] else {
                    return Err(FormatError::unsupported(name, "map entries"));
                };
                Self::Map(
                    Box::new(Self::from_arrow(name, key.data_type())?),
                    Box::new(Self::from_arrow(name, value.data_type())?),
                )
            }
            DataType::Union(fields, _) => Self::Union(
                fields
                    .iter()
                    .map(|(_, f)| Self::from_arrow(name, f.data_type()))
                    .collect::<FormatResult<Vec<_>>>()?,
            ),
            other => return Err(FormatError::unsupported(name, other.to_string())),
        })
    }

    /// Derives the root struct of a file from the reader's Arrow schema.
    ///
    /// # Errors
    ///
    /// See [`from_arrow`](Self::from_arrow).
    pub fn from_arrow_schema(schema: &Schema) -> FormatResult<Self> {
        let names = schema.fields().iter().map(|f| f.name().clone()).collect();
        let children = schema
            .fields()
            .iter()
            .map(|f| Self::from_arrow(f.name(), f.data_type()))
            .collect::<FormatResult<Vec<_>>>()?;
        Ok(Self::Struct(OrcStruct::new(names, children)?))
    }
}

impl FromStr for OrcSchema {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OrcSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::TinyInt => f.write_str("tinyint"),
            Self::SmallInt => f.write_str("smallint"),
            Self::Int => f.write_str("int"),
            Self::BigInt => f.write_str("bigint"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::String => f.write_str("string"),
            Self::Char(len) => write!(f, "char({len})"),
            Self::Varchar(len) => write!(f, "varchar({len})"),
            Self::Binary => f.write_str("binary"),
            Self::Date => f.write_str("date"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Struct(st) => {
                f.write_str("struct<")?;
                for (i, (name, child)) in st.fields().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write_name(f, name)?;
                    write!(f, ":{child}")?;
                }
                f.write_str(">")
            }
            Self::List(item) => write!(f, "array<{item}>"),
            Self::Map(key, value) => write!(f, "map<{key},{value}>"),
            Self::Union(variants) => {
                f.write_str("uniontype<")?;
                for (i, v) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(">")
            }
        }
    }
}

fn is_plain(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain(name) {
        f.write_str(name)
    } else {
        write!(f, "`{}`", name.replace('`', "``"))
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> FormatError {
        FormatError::SchemaMismatch(format!(
            "invalid orc type '{}' at offset {}: {message}",
            self.text, self.pos
        ))
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.text.len() - trimmed.len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, c: char) -> FormatResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn word(&mut self) -> &str {
        self.skip_ws();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        self.pos += len;
        &self.text[start..self.pos]
    }

    fn number(&mut self) -> FormatResult<u32> {
        let digits = self.word().to_string();
        digits
            .parse()
            .map_err(|_| self.error(&format!("expected a number, found '{digits}'")))
    }

    fn field_name(&mut self) -> FormatResult<String> {
        self.skip_ws();
        if !self.eat('`') {
            let name = self.word().to_string();
            return if name.is_empty() {
                Err(self.error("expected a field name"))
            } else {
                Ok(name)
            };
        }
        let mut name = String::new();
        loop {
            let Some(c) = self.rest().chars().next() else {
                return Err(self.error("unterminated quoted name"));
            };
            self.pos += c.len_utf8();
            if c == '`' {
                if self.rest().starts_with('`') {
                    self.pos += 1;
                } else {
                    return Ok(name);
                }
            }
            name.push(c);
        }
    }

    /// Optional `(n)` or `(n,m)` suffix.
    fn params(&mut self) -> FormatResult<Vec<u32>> {
        let mut params = Vec::new();
        if self.eat('(') {
            params.push(self.number()?);
            while self.eat(',') {
                params.push(self.number()?);
            }
            self.consume(')')?;
        }
        Ok(params)
    }

    fn parse_type(&mut self) -> FormatResult<OrcSchema> {
        let keyword = self.word().to_ascii_lowercase();
        Ok(match keyword.as_str() {
            "boolean" => OrcSchema::Boolean,
            "tinyint" => OrcSchema::TinyInt,
            "smallint" => OrcSchema::SmallInt,
            "int" => OrcSchema::Int,
            "bigint" => OrcSchema::BigInt,
            "float" => OrcSchema::Float,
            "double" => OrcSchema::Double,
            "string" => OrcSchema::String,
            "binary" => OrcSchema::Binary,
            "date" => OrcSchema::Date,
            "timestamp" => OrcSchema::Timestamp,
            "decimal" => match self.params()?[..] {
                [] => OrcSchema::Decimal {
                    precision: DEFAULT_DECIMAL_PRECISION,
                    scale: DEFAULT_DECIMAL_SCALE,
                },
                [precision, scale] => OrcSchema::Decimal { precision, scale },
                _ => return Err(self.error("decimal takes precision and scale")),
            },
            "char" | "varchar" => {
                let len = match self.params()?[..] {
                    [] => DEFAULT_MAX_LENGTH,
                    [len] => len,
                    _ => return Err(self.error("expected a single length")),
                };
                if keyword == "char" {
                    OrcSchema::Char(len)
                } else {
                    OrcSchema::Varchar(len)
                }
            }
            "struct" => {
                self.consume('<')?;
                let mut names = Vec::new();
                let mut children = Vec::new();
                if !self.eat('>') {
                    loop {
                        names.push(self.field_name()?);
                        self.consume(':')?;
                        children.push(self.parse_type()?);
                        if self.eat('>') {
                            break;
                        }
                        self.consume(',')?;
                    }
                }
                OrcSchema::Struct(OrcStruct::new(names, children)?)
            }
            "array" => {
                self.consume('<')?;
                let item = self.parse_type()?;
                self.consume('>')?;
                OrcSchema::List(Box::new(item))
            }
            "map" => {
                self.consume('<')?;
                let key = self.parse_type()?;
                self.consume(',')?;
                let value = self.parse_type()?;
                self.consume('>')?;
                OrcSchema::Map(Box::new(key), Box::new(value))
            }
            "uniontype" => {
                self.consume('<')?;
                let mut variants = vec![self.parse_type()?];
                while self.eat(',') {
                    variants.push(self.parse_type()?);
                }
                self.consume('>')?;
                OrcSchema::Union(variants)
            }
            "" => return Err(self.error("expected a type")),
            other => return Err(self.error(&format!("unknown type '{other}'"))),
        })
    }
}
