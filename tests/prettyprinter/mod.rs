use jsonpull::{InvalidStringValueError, JsonEvent, JsonPullParser, ValueType};
use thiserror::Error;

enum Type {
    Object,
    Array,
}

/// An error that can happen when pretty-printing a JSON string
#[derive(Error, Debug)]
pub enum PrettyPrintError {
    #[error("{0}")]
    InvalidStringValue(#[from] InvalidStringValueError),
}

/// Demonstrates how the [`JsonPullParser`] can be used to pretty-print a
/// JSON object or array. Note: this is not a perfect implementation of a
/// pretty-printer. The output could still be nicer.
pub struct PrettyPrinter {
    result: String,
    types: Vec<Type>,
    element_counts: Vec<i32>,
    level: i32,
}

impl PrettyPrinter {
    pub fn new() -> Self {
        PrettyPrinter {
            result: String::new(),
            types: vec![],
            element_counts: vec![],
            level: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.level {
            self.result.push_str("  ");
        }
    }

    fn on_object_begin(&mut self) {
        self.on_value();
        self.result.push_str("{\n");
        self.level += 1;
        self.indent();
        self.element_counts.push(0);
        self.types.push(Type::Object);
    }

    fn on_object_end(&mut self) {
        self.level -= 1;
        self.result.push('\n');
        self.indent();
        self.result.push('}');
        self.element_counts.pop();
        self.types.pop();
    }

    fn on_array_begin(&mut self) {
        self.on_value();
        self.result.push_str("[\n");
        self.level += 1;
        self.indent();
        self.element_counts.push(0);
        self.types.push(Type::Array);
    }

    fn on_array_end(&mut self) {
        self.level -= 1;
        self.result.push('\n');
        self.indent();
        self.result.push(']');
        self.element_counts.pop();
        self.types.pop();
    }

    fn on_name(&mut self, name: &str) {
        if let Some(last) = self.element_counts.last() {
            if *last > 0 {
                self.result.push_str(",\n");
                self.indent();
            }
        }

        self.result.push('"');
        self.result.push_str(name);
        self.result.push_str("\": ");

        if let Some(last) = self.element_counts.pop() {
            self.element_counts.push(last + 1);
        }
    }

    fn on_value(&mut self) {
        if let Some(Type::Array) = self.types.last() {
            if let Some(last) = self.element_counts.pop() {
                if last > 0 {
                    self.result.push_str(", ");
                }
                self.element_counts.push(last + 1);
            }
        }
    }

    fn on_value_string(&mut self, value: &str) {
        self.on_value();
        self.result.push('"');
        self.result.push_str(value);
        self.result.push('"');
    }

    fn on_value_int(&mut self, value: i64) {
        self.on_value();
        self.result.push_str(&value.to_string());
    }

    fn on_value_float(&mut self, value: f64) {
        self.on_value();
        self.result.push_str(&value.to_string());
    }

    fn on_value_bool(&mut self, value: bool) {
        self.on_value();
        self.result.push_str(&value.to_string());
    }

    fn on_value_null(&mut self) {
        self.on_value();
        self.result.push_str("null");
    }

    pub fn on_event(
        &mut self,
        event: JsonEvent,
        parser: &JsonPullParser,
    ) -> Result<(), PrettyPrintError> {
        match event {
            JsonEvent::ObjectBegin => self.on_object_begin(),
            JsonEvent::ObjectEnd => self.on_object_end(),
            JsonEvent::ArrayBegin => self.on_array_begin(),
            JsonEvent::ArrayEnd => self.on_array_end(),
            JsonEvent::Name => {
                let name = parser.name_str()?.unwrap_or_default().to_string();
                self.on_name(&name);
            }
            JsonEvent::Value => match parser.value_type() {
                ValueType::String => {
                    let value = parser.string_value_str()?.unwrap_or_default().to_string();
                    self.on_value_string(&value);
                }
                ValueType::Integer => self.on_value_int(parser.integer_value().unwrap_or_default()),
                ValueType::Float => self.on_value_float(parser.float_value().unwrap_or_default()),
                ValueType::Boolean => self.on_value_bool(parser.bool_value().unwrap_or_default()),
                ValueType::Null | ValueType::None => self.on_value_null(),
            },
            JsonEvent::EndOfDocument => {}
        }
        Ok(())
    }

    pub fn get_result(&self) -> &str {
        &self.result
    }
}
