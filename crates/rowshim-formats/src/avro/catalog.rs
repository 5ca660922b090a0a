//! Avro type catalog.

use crate::host::HostType;

native_catalog! {
    /// Avro primitive, complex and logical types.
    pub enum AvroType {
        /// `null`.
        Null = 0, "Null", None, false;
        /// `boolean`.
        Boolean = 1, "Boolean", Some(HostType::Boolean), true;
        /// `int` (32-bit).
        Int = 2, "Int", Some(HostType::Integer), true;
        /// `long` (64-bit).
        Long = 3, "Long", Some(HostType::Integer), true;
        /// `float`.
        Float = 4, "Float", Some(HostType::Number), true;
        /// `double`.
        Double = 5, "Double", Some(HostType::Number), true;
        /// `bytes`.
        Bytes = 6, "Bytes", Some(HostType::Binary), true;
        /// `string`.
        String = 7, "String", Some(HostType::String), true;
        /// `record`.
        Record = 8, "Record", None, false;
        /// `enum`; read through its symbol.
        Enum = 9, "Enum", Some(HostType::String), false;
        /// `array`.
        Array = 10, "Array", None, false;
        /// `map`.
        Map = 11, "Map", None, false;
        /// `fixed`.
        Fixed = 12, "Fixed", Some(HostType::Binary), false;
        /// `union`.
        Union = 13, "Union", None, false;
        /// `decimal` logical type over `bytes`.
        Decimal = 14, "Decimal", Some(HostType::BigNumber), true;
        /// `decimal` logical type over `fixed`.
        DecimalFixed = 15, "Decimal (fixed)", Some(HostType::BigNumber), false;
        /// `date` logical type (days since the epoch).
        Date = 16, "Date", Some(HostType::Date), true;
        /// `time-millis` logical type.
        TimeMillis = 17, "Time (millis)", Some(HostType::Integer), false;
        /// `time-micros` logical type.
        TimeMicros = 18, "Time (micros)", Some(HostType::Integer), false;
        /// `timestamp-millis` logical type.
        TimestampMillis = 19, "Timestamp (millis)", Some(HostType::Timestamp), true;
        /// `timestamp-micros` logical type.
        TimestampMicros = 20, "Timestamp (micros)", Some(HostType::Timestamp), true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NativeTypeSpec;

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<u32> = AvroType::all().iter().map(|t| t.id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), AvroType::all().len());
    }

    #[test]
    fn test_displayable_set() {
        let shown = AvroType::displayable();
        assert!(shown.contains(&AvroType::Decimal));
        assert!(shown.contains(&AvroType::TimestampMicros));
        assert!(!shown.contains(&AvroType::Enum));
        assert!(!shown.contains(&AvroType::Record));
        assert!(shown.iter().all(|t| t.host_type().is_some()));
    }

    #[test]
    fn test_enum_reads_as_string() {
        assert_eq!(AvroType::Enum.host_type(), Some(HostType::String));
        assert_eq!(AvroType::Long.host_type(), Some(HostType::Integer));
        assert_eq!(AvroType::from_display_name("timestamp (millis)"), Some(AvroType::TimestampMillis));
        assert_eq!(AvroType::Date.to_string(), "Date");
    }
}
