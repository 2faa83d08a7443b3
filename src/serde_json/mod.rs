//! Conversion of a byte slice into a Serde JSON [`Value`], driven by the
//! pull parser with a heap-allocated working buffer that doubles whenever
//! the parser runs out of space.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::{ErrorKind, InvalidStringValueError, JsonEvent, JsonPullParser, ParseError, ValueType};

/// An error that can happen when converting a byte slice to a
/// [`serde_json::Value`]
#[derive(Error, Debug)]
pub enum FromSliceError {
    /// The input is not valid JSON
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// A name or string value is not valid UTF-8
    #[error("{0}")]
    InvalidString(#[from] InvalidStringValueError),

    /// A number cannot be represented as a [`serde_json::Number`]
    #[error("number cannot be represented")]
    InvalidNumber,

    /// The document ended without producing a root value
    #[error("the document did not produce a value")]
    MissingRoot,
}

struct ValueBuilder {
    stack: Vec<(Option<String>, Value)>,
    current_key: Option<String>,
    result: Option<Value>,
}

impl ValueBuilder {
    fn new() -> Self {
        ValueBuilder {
            stack: vec![],
            current_key: None,
            result: None,
        }
    }

    fn insert(&mut self, value: Value) {
        if let Some((_, top)) = self.stack.last_mut() {
            if let Some(m) = top.as_object_mut() {
                m.insert(self.current_key.take().unwrap_or_default(), value);
            } else if let Some(a) = top.as_array_mut() {
                a.push(value);
            }
        }
    }

    fn on_event(
        &mut self,
        event: JsonEvent,
        parser: &JsonPullParser,
    ) -> Result<(), FromSliceError> {
        match event {
            JsonEvent::ObjectBegin | JsonEvent::ArrayBegin => {
                let v = if event == JsonEvent::ObjectBegin {
                    Value::Object(Map::new())
                } else {
                    Value::Array(vec![])
                };
                self.stack.push((self.current_key.take(), v));
            }

            JsonEvent::ObjectEnd | JsonEvent::ArrayEnd => {
                let (key, v) = self.stack.pop().expect("begin and end events pair up");
                if let Some((_, top)) = self.stack.last_mut() {
                    if let Some(m) = top.as_object_mut() {
                        m.insert(key.unwrap_or_default(), v);
                    } else if let Some(a) = top.as_array_mut() {
                        a.push(v);
                    }
                } else {
                    self.result = Some(v);
                }
            }

            JsonEvent::Name => {
                self.current_key = parser.name_str()?.map(str::to_owned);
            }

            JsonEvent::Value => {
                let v = match parser.value_type() {
                    ValueType::String => {
                        Value::String(parser.string_value_str()?.unwrap_or_default().to_owned())
                    }
                    ValueType::Integer => Value::Number(Number::from(
                        parser.integer_value().expect("integer value is populated"),
                    )),
                    ValueType::Float => Value::Number(
                        parser
                            .float_value()
                            .and_then(Number::from_f64)
                            .ok_or(FromSliceError::InvalidNumber)?,
                    ),
                    ValueType::Boolean => {
                        Value::Bool(parser.bool_value().expect("bool value is populated"))
                    }
                    ValueType::Null | ValueType::None => Value::Null,
                };
                self.insert(v);
            }

            JsonEvent::EndOfDocument => {}
        }
        Ok(())
    }
}

fn drive(
    mut parser: JsonPullParser<'_>,
    input: &[u8],
    builder: &mut ValueBuilder,
) -> Result<(), FromSliceError> {
    loop {
        match parser.parse(input) {
            Ok(JsonEvent::EndOfDocument) => return Ok(()),
            Ok(event) => builder.on_event(event, &parser)?,
            Err(e) if e.kind == ErrorKind::InsufficientMemory => {
                let mut bigger = vec![0u8; parser.buffer_len() * 2 + 16];
                let parser = parser.reallocate(&mut bigger);
                return drive(parser, input, builder);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Parse a byte slice into a Serde JSON [`Value`]
///
/// ```
/// use jsonpull::serde_json::from_slice;
///
/// let json = r#"{"name": "Elvis"}"#.as_bytes();
/// let value = from_slice(json).unwrap();
///
/// assert!(value.is_object());
/// assert_eq!(value["name"], "Elvis");
/// ```
pub fn from_slice(v: &[u8]) -> Result<Value, FromSliceError> {
    let mut buffer = vec![0u8; v.len().max(64)];
    let parser = JsonPullParser::new(&mut buffer);
    let mut builder = ValueBuilder::new();
    drive(parser, v, &mut builder)?;
    builder.result.ok_or(FromSliceError::MissingRoot)
}

#[cfg(test)]
mod test {
    use crate::serde_json::from_slice;
    use serde_json::{from_slice as serde_from_slice, Value};

    /// Test that an empty object is parsed correctly
    #[test]
    fn empty_object() {
        let json = r#"{}"#.as_bytes();
        assert_eq!(
            serde_from_slice::<Value>(json).unwrap(),
            from_slice(json).unwrap()
        );
    }

    /// Test that a simple object is parsed correctly
    #[test]
    fn simple_object() {
        let json = r#"{"name": "Elvis"}"#.as_bytes();
        assert_eq!(
            serde_from_slice::<Value>(json).unwrap(),
            from_slice(json).unwrap()
        );
    }

    /// Test that an empty array is parsed correctly
    #[test]
    fn empty_array() {
        let json = r#"[]"#.as_bytes();
        assert_eq!(
            serde_from_slice::<Value>(json).unwrap(),
            from_slice(json).unwrap()
        );
    }

    /// Test that an array with mixed values is parsed correctly
    #[test]
    fn mixed_array() {
        let json = r#"["Elvis", 132, "Max", 80.67, true, null]"#.as_bytes();
        assert_eq!(
            serde_from_slice::<Value>(json).unwrap(),
            from_slice(json).unwrap()
        );
    }

    /// Test that embedded objects are parsed correctly
    #[test]
    fn embedded_objects() {
        let json = r#"{
            "name": "Elvis",
            "address": {"street": "Graceland", "city": "Memphis"},
            "albums": [
                "Elvis Presley",
                "Elvis",
                "Elvis' Christmas Album",
                "Elvis Is Back!",
                {
                    "title": "His Hand in Mine",
                    "year": 1960
                },
                "... and many others :)"
            ]
        }"#
        .as_bytes();
        assert_eq!(
            serde_from_slice::<Value>(json).unwrap(),
            from_slice(json).unwrap()
        );
    }

    /// The working buffer starts deliberately small, so deeply nested
    /// documents must grow it several times
    #[test]
    fn deep_nesting_grows_the_buffer() {
        let mut json = String::new();
        for _ in 0..100 {
            json.push('[');
        }
        json.push_str("42");
        for _ in 0..100 {
            json.push(']');
        }
        let expected = serde_from_slice::<Value>(json.as_bytes()).unwrap();
        assert_eq!(expected, from_slice(json.as_bytes()).unwrap());
    }

    /// Test that invalid documents are rejected
    #[test]
    fn syntax_error() {
        assert!(from_slice(br#"{"a": 1,}"#).is_err());
        assert!(from_slice(br#"[1, 2"#).is_err());
    }
}
