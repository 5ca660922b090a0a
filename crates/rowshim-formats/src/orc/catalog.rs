//! ORC type catalog.

use crate::host::HostType;

native_catalog! {
    /// ORC type categories.
    pub enum OrcType {
        /// `boolean`.
        Boolean = 1, "Boolean", Some(HostType::Boolean), true;
        /// `tinyint` (8-bit).
        TinyInt = 2, "TinyInt", Some(HostType::Integer), true;
        /// `smallint` (16-bit).
        SmallInt = 3, "SmallInt", Some(HostType::Integer), true;
        /// `int` (32-bit).
        Int = 4, "Int", Some(HostType::Integer), true;
        /// `bigint` (64-bit).
        BigInt = 5, "BigInt", Some(HostType::Integer), true;
        /// `float`.
        Float = 6, "Float", Some(HostType::Number), true;
        /// `double`.
        Double = 7, "Double", Some(HostType::Number), true;
        /// `decimal(p,s)`.
        Decimal = 8, "Decimal", Some(HostType::BigNumber), true;
        /// `string`.
        String = 9, "String", Some(HostType::String), true;
        /// `char(n)`, blank padded.
        Char = 10, "Char", Some(HostType::String), true;
        /// `varchar(n)`.
        Varchar = 11, "Varchar", Some(HostType::String), true;
        /// `binary`.
        Binary = 12, "Binary", Some(HostType::Binary), true;
        /// `date`.
        Date = 13, "Date", Some(HostType::Date), true;
        /// `timestamp`.
        Timestamp = 14, "Timestamp", Some(HostType::Timestamp), true;
        /// `struct<...>`.
        Struct = 15, "Struct", None, false;
        /// `array<...>`.
        List = 16, "List", None, false;
        /// `map<...>`.
        Map = 17, "Map", None, false;
        /// `uniontype<...>`.
        Union = 18, "Union", None, false;
    }
}
