/// All possible JSON events returned by [`JsonPullParser::parse()`](crate::JsonPullParser::parse())
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JsonEvent {
    /// The start of a JSON object. If the object belongs to a name-value pair,
    /// [`JsonPullParser::name()`](crate::JsonPullParser::name()) returns its name.
    ObjectBegin,

    /// The end of a JSON object. If the object belonged to a name-value pair,
    /// [`JsonPullParser::name()`](crate::JsonPullParser::name()) returns its name.
    ObjectEnd,

    /// The start of a JSON array. If the array belongs to a name-value pair,
    /// [`JsonPullParser::name()`](crate::JsonPullParser::name()) returns its name.
    ArrayBegin,

    /// The end of a JSON array. If the array belonged to a name-value pair,
    /// [`JsonPullParser::name()`](crate::JsonPullParser::name()) returns its name.
    ArrayEnd,

    /// The name of a name-value pair. Call [`JsonPullParser::name()`](crate::JsonPullParser::name())
    /// or [`JsonPullParser::name_str()`](crate::JsonPullParser::name_str()) to get it.
    /// A value, object, or array is expected to follow.
    Name,

    /// The value of a name-value pair or an array element.
    /// [`JsonPullParser::value_type()`](crate::JsonPullParser::value_type()) tells which of the
    /// typed accessors is populated.
    Value,

    /// The root object or array has closed and parsing is done.
    EndOfDocument,
}

/// The type of the value most recently reported through [`JsonEvent::Value`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ValueType {
    /// There is no value available at this point in parsing
    #[default]
    None,

    /// A signed integer number. Call [`JsonPullParser::integer_value()`](crate::JsonPullParser::integer_value())
    Integer,

    /// A floating-point number. Call [`JsonPullParser::float_value()`](crate::JsonPullParser::float_value())
    Float,

    /// A sequence of zero or more characters. Call
    /// [`JsonPullParser::string_value()`](crate::JsonPullParser::string_value()) or
    /// [`JsonPullParser::string_value_str()`](crate::JsonPullParser::string_value_str())
    String,

    /// Either `true` or `false`. Call [`JsonPullParser::bool_value()`](crate::JsonPullParser::bool_value())
    Boolean,

    /// The `null` keyword
    Null,
}
