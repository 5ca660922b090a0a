//! Field descriptors and schema descriptions.

use std::collections::HashSet;

use super::NativeTypeSpec;
use crate::config::HostZone;
use crate::convert::{ConversionErrorKind, EncodeTarget, MAX_HOST_DECIMAL_PRECISION};
use crate::error::{FormatError, FormatResult};
use crate::host::coerce::Coercion;
use crate::host::{HostType, HostValue};

/// One field of a [`SchemaDescription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField<T: NativeTypeSpec> {
    /// Format-local identifier; may be a path expression on read.
    pub native_name: String,
    /// User-facing identifier.
    pub host_name: String,
    /// Native type tag.
    pub native_type: T,
    /// Declared host type; `None` when unknown.
    pub host_type: Option<HostType>,
    /// Decimal precision.
    pub precision: Option<u32>,
    /// Decimal scale.
    pub scale: Option<u32>,
    /// strftime pattern for text ↔ date/timestamp conversion.
    pub string_format: Option<String>,
    /// Whether the field accepts absent values.
    pub nullable: bool,
    /// Default value in its textual form.
    pub default_value: Option<String>,
}

impl<T: NativeTypeSpec> SchemaField<T> {
    /// Creates a non-nullable field whose host name equals `name` and
    /// whose host type comes from the catalog.
    pub fn new(name: impl Into<String>, native_type: T) -> Self {
        let name = name.into();
        Self {
            host_name: name.clone(),
            native_name: name,
            native_type,
            host_type: native_type.host_type(),
            precision: None,
            scale: None,
            string_format: None,
            nullable: false,
            default_value: None,
        }
    }

    /// Sets the host field name.
    #[must_use]
    pub fn with_host_name(mut self, name: impl Into<String>) -> Self {
        self.host_name = name.into();
        self
    }

    /// Sets the declared host type.
    #[must_use]
    pub fn with_host_type(mut self, host_type: HostType) -> Self {
        self.host_type = Some(host_type);
        self
    }

    /// Sets decimal precision and scale.
    #[must_use]
    pub fn with_decimal(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Sets decimal attributes found in a file. Decimals wider than a host
    /// big number can hold are read as exact text instead.
    #[must_use]
    pub fn with_native_decimal(self, precision: u32, scale: u32) -> Self {
        let mut field = self.with_decimal(precision, scale);
        if precision > MAX_HOST_DECIMAL_PRECISION && field.host_type == Some(HostType::BigNumber) {
            field.host_type = Some(HostType::String);
        }
        field
    }

    /// Whether values of this field decode through a host big number that
    /// cannot hold the declared precision.
    fn exceeds_host_precision(&self) -> bool {
        self.precision
            .is_some_and(|p| p > MAX_HOST_DECIMAL_PRECISION)
            && matches!(self.host_type, None | Some(HostType::BigNumber))
    }

    /// Sets the date/time pattern.
    #[must_use]
    pub fn with_string_format(mut self, format: impl Into<String>) -> Self {
        self.string_format = Some(format.into());
        self
    }

    /// Sets nullability.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the textual default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    /// Returns the coercion rules for this field in `zone`.
    #[must_use]
    pub fn coercion(&self, zone: HostZone) -> Coercion<'_> {
        Coercion::new(zone).with_format(self.string_format.as_deref())
    }

    /// Returns the decimal encode target for this field.
    ///
    /// Written decimals come from host big numbers, so precision is capped
    /// at [`MAX_HOST_DECIMAL_PRECISION`].
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::MissingDecimalMetadata`] when precision or
    /// scale is absent, or [`FormatError::InvalidConfig`] when they are
    /// out of range.
    pub fn decimal_target(&self) -> FormatResult<EncodeTarget> {
        let target = EncodeTarget::decimal(self.precision, self.scale).map_err(|kind| match kind {
            ConversionErrorKind::MissingDecimalMetadata => FormatError::MissingDecimalMetadata {
                field: self.native_name.clone(),
            },
            other => FormatError::invalid_config(&self.native_name, other.to_string()),
        })?;
        if let EncodeTarget::Decimal { precision, .. } = target {
            if u32::from(precision) > MAX_HOST_DECIMAL_PRECISION {
                return Err(FormatError::invalid_config(
                    &self.native_name,
                    format!(
                        "decimal precision {precision} exceeds the \
                         {MAX_HOST_DECIMAL_PRECISION} digits of a host big number"
                    ),
                ));
            }
        }
        Ok(target)
    }

    /// Parses the default value as the declared host type, if both exist.
    ///
    /// # Errors
    ///
    /// Returns the parse failure kind.
    pub fn default_host_value(
        &self,
        zone: HostZone,
    ) -> Result<Option<HostValue>, ConversionErrorKind> {
        let Some(text) = self.default_value.as_deref() else {
            return Ok(None);
        };
        let target = self.host_type.unwrap_or(HostType::String);
        self.coercion(zone).parse(text, target).map(Some)
    }
}

/// An ordered list of fields with unique native and host names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescription<T: NativeTypeSpec> {
    fields: Vec<SchemaField<T>>,
}

impl<T: NativeTypeSpec> Default for SchemaDescription<T> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<T: NativeTypeSpec> SchemaDescription<T> {
    /// Creates an empty description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a description from `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidConfig`] on duplicate names.
    pub fn from_fields(fields: Vec<SchemaField<T>>) -> FormatResult<Self> {
        let mut native = HashSet::new();
        let mut host = HashSet::new();
        for f in &fields {
            if !native.insert(f.native_name.as_str()) {
                return Err(FormatError::invalid_config(
                    "schema",
                    format!("duplicate native field name '{}'", f.native_name),
                ));
            }
            if !host.insert(f.host_name.as_str()) {
                return Err(FormatError::invalid_config(
                    "schema",
                    format!("duplicate host field name '{}'", f.host_name),
                ));
            }
        }
        Ok(Self { fields })
    }

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidConfig`] if either name is taken.
    pub fn push(&mut self, field: SchemaField<T>) -> FormatResult<()> {
        if self.fields.iter().any(|f| f.native_name == field.native_name) {
            return Err(FormatError::invalid_config(
                "schema",
                format!("duplicate native field name '{}'", field.native_name),
            ));
        }
        if self.fields.iter().any(|f| f.host_name == field.host_name) {
            return Err(FormatError::invalid_config(
                "schema",
                format!("duplicate host field name '{}'", field.host_name),
            ));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidConfig`] if either name is taken.
    pub fn with_field(mut self, field: SchemaField<T>) -> FormatResult<Self> {
        self.push(field)?;
        Ok(self)
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField<T>] {
        &self.fields
    }

    /// Mutable access for metadata recovery. Names must stay unique.
    pub(crate) fn fields_mut(&mut self) -> &mut [SchemaField<T>] {
        &mut self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finds a field by native name.
    #[must_use]
    pub fn find(&self, native_name: &str) -> Option<&SchemaField<T>> {
        self.fields.iter().find(|f| f.native_name == native_name)
    }

    /// Iterates over fields.
    pub fn iter(&self) -> std::slice::Iter<'_, SchemaField<T>> {
        self.fields.iter()
    }

    /// Fails with [`FormatError::MissingConfig`] if the description has no
    /// fields.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn require_fields(&self) -> FormatResult<()> {
        if self.fields.is_empty() {
            return Err(FormatError::MissingConfig("schema has no fields".into()));
        }
        Ok(())
    }

    /// Fails with [`FormatError::InvalidConfig`] if a decimal field would
    /// decode into a host big number narrower than its precision. Such
    /// fields must declare a string or number host type.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn require_host_precision(&self) -> FormatResult<()> {
        match self.fields.iter().find(|f| f.exceeds_host_precision()) {
            Some(field) => Err(FormatError::invalid_config(
                &field.native_name,
                format!(
                    "decimal precision {} exceeds the {MAX_HOST_DECIMAL_PRECISION} digits of a \
                     host big number; declare a string or number host type",
                    field.precision.unwrap_or_default()
                ),
            )),
            None => Ok(()),
        }
    }
}

impl<'a, T: NativeTypeSpec> IntoIterator for &'a SchemaDescription<T> {
    type Item = &'a SchemaField<T>;
    type IntoIter = std::slice::Iter<'a, SchemaField<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::test_catalog::TestType;
    use super::*;

    #[test]
    fn test_new_field_defaults() {
        let f = SchemaField::new("age", TestType::Long);
        assert_eq!(f.host_name, "age");
        assert_eq!(f.host_type, Some(HostType::Integer));
        assert!(!f.nullable);
        assert_eq!(f.default_value, None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = SchemaDescription::from_fields(vec![
            SchemaField::new("a", TestType::Text),
            SchemaField::new("a", TestType::Long),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate native field name 'a'"));

        let mut schema = SchemaDescription::new();
        schema.push(SchemaField::new("a", TestType::Text)).unwrap();
        let dup_host = SchemaField::new("b", TestType::Text).with_host_name("a");
        assert!(schema.push(dup_host).is_err());
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_decimal_target_requires_metadata() {
        let f = SchemaField::new("price", TestType::Decimal);
        assert!(matches!(
            f.decimal_target(),
            Err(FormatError::MissingDecimalMetadata { field }) if field == "price"
        ));
        assert!(f.clone().with_decimal(10, 2).decimal_target().is_ok());
        assert!(matches!(
            f.with_decimal(30, 2).decimal_target(),
            Err(FormatError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_wide_native_decimal_reads_as_text() {
        let narrow = SchemaField::new("a", TestType::Decimal).with_native_decimal(28, 2);
        assert_eq!(narrow.host_type, Some(HostType::BigNumber));
        let wide = SchemaField::new("b", TestType::Decimal).with_native_decimal(38, 2);
        assert_eq!(wide.host_type, Some(HostType::String));

        let ok = SchemaDescription::from_fields(vec![narrow, wide.clone()]).unwrap();
        assert!(ok.require_host_precision().is_ok());
        let forced = SchemaDescription::from_fields(vec![
            wide.with_host_type(HostType::BigNumber)
        ])
        .unwrap();
        assert!(matches!(
            forced.require_host_precision(),
            Err(FormatError::InvalidConfig { key, .. }) if key == "b"
        ));
    }

    #[test]
    fn test_default_host_value() {
        let f = SchemaField::new("age", TestType::Long).with_default("42");
        assert_eq!(
            f.default_host_value(HostZone::Utc).unwrap(),
            Some(HostValue::Integer(42))
        );
        let bad = SchemaField::new("age", TestType::Long).with_default("x");
        assert!(bad.default_host_value(HostZone::Utc).is_err());
    }

    #[test]
    fn test_catalog_lookups() {
        assert_eq!(TestType::from_id(3), Some(TestType::Decimal));
        assert_eq!(TestType::from_id(9), None);
        assert_eq!(TestType::from_display_name("long"), Some(TestType::Long));
        assert_eq!(TestType::displayable().len(), 3);
    }

    #[test]
    fn test_require_fields() {
        let empty: SchemaDescription<TestType> = SchemaDescription::new();
        assert!(matches!(empty.require_fields(), Err(FormatError::MissingConfig(_))));
    }
}
