//! # jsonpull
//!
//! An incremental, zero-allocation JSON pull parser.
//!
//! The parser allocates no memory of its own: it is constructed over a
//! single caller-owned byte buffer that serves both as the object/array
//! nesting stack and as the storage for the latest name and string value
//! handed back to the caller. Input arrives as byte slices of any size, and
//! every call to [`JsonPullParser::parse()`] returns exactly one event
//! (object/array begin and end, names, and typed scalar values) or one
//! error. Both "out of input" and "out of buffer" are recoverable
//! conditions: supply the next slice, or a larger buffer, and parsing
//! continues exactly where it stopped — even in the middle of a multi-byte
//! character.
//!
//! Input may be UTF-8 (with or without a byte-order mark), UTF-16LE or
//! UTF-16BE (with a byte-order mark), or any byte stream that keeps the
//! JSON structure in ASCII.
//!
//! ## Examples
//!
//! ### Parsing a slice of bytes
//!
//! When the whole document is at hand, pass the same slice until
//! [`JsonEvent::EndOfDocument`] is returned.
//!
//! ```
//! use jsonpull::{JsonEvent, JsonPullParser};
//!
//! let json = br#"{"name": "Elvis", "age": 42}"#;
//!
//! let mut buffer = [0u8; 256];
//! let mut parser = JsonPullParser::new(&mut buffer);
//!
//! let mut names = Vec::new();
//! loop {
//!     match parser.parse(json).unwrap() {
//!         JsonEvent::Name => names.push(parser.name_str().unwrap().unwrap().to_string()),
//!         JsonEvent::EndOfDocument => break,
//!         _ => {}
//!     }
//! }
//!
//! assert_eq!(names, ["name", "age"]);
//! ```
//!
//! ### Feeding input in chunks
//!
//! The document does not need to be in memory in its entirety. Whenever the
//! current slice is exhausted mid-document, the parser reports
//! [`ErrorKind::UnexpectedEof`]; hand it the next slice and it picks up
//! where it stopped, reassembling characters split across slices.
//!
//! ```
//! use jsonpull::{ErrorKind, JsonEvent, JsonPullParser};
//!
//! let chunks: [&[u8]; 2] = [br#"{"k": "ab"#, br#"cd" }"#];
//!
//! let mut buffer = [0u8; 64];
//! let mut parser = JsonPullParser::new(&mut buffer);
//!
//! let mut i = 0;
//! let mut values = Vec::new();
//! loop {
//!     match parser.parse(chunks[i]) {
//!         Ok(JsonEvent::Value) => {
//!             values.push(parser.string_value_str().unwrap().unwrap().to_string());
//!         }
//!         Ok(JsonEvent::EndOfDocument) => break,
//!         Ok(_) => {}
//!         Err(e) if e.kind == ErrorKind::UnexpectedEof => i += 1,
//!         Err(e) => panic!("{e}"),
//!     }
//! }
//!
//! assert_eq!(values, ["abcd"]);
//! ```
//!
//! ### Growing the working buffer
//!
//! The buffer is sized by the caller, and the parser never writes outside
//! it. If it fills up, [`ErrorKind::InsufficientMemory`] is reported;
//! [`JsonPullParser::reallocate()`] moves the parser to a larger buffer and
//! the character that did not fit is parsed again.
//!
//! ```
//! use jsonpull::{ErrorKind, JsonEvent, JsonPullParser};
//!
//! let json = br#"[10, 20, 30]"#;
//!
//! let mut small = [0u8; 16];
//! let mut large = [0u8; 256];
//!
//! let mut parser = JsonPullParser::new(&mut small);
//! assert_eq!(parser.parse(json).unwrap(), JsonEvent::ArrayBegin);
//!
//! // The first element does not fit into the 16-byte buffer
//! let e = parser.parse(json).unwrap_err();
//! assert_eq!(e.kind, ErrorKind::InsufficientMemory);
//!
//! // Move the parser to the larger buffer and continue
//! let mut parser = parser.reallocate(&mut large);
//! let mut sum = 0;
//! loop {
//!     match parser.parse(json).unwrap() {
//!         JsonEvent::Value => sum += parser.integer_value().unwrap(),
//!         JsonEvent::EndOfDocument => break,
//!         _ => {}
//!     }
//! }
//!
//! assert_eq!(sum, 60);
//! ```
//!
//! ### Parsing into a Serde JSON Value
//!
//! For testing and compatibility reasons, the crate can parse a byte slice
//! into a [Serde JSON](https://github.com/serde-rs/json) `Value` — enable
//! the `serde_json` feature and call `jsonpull::serde_json::from_slice()`.
//! If you find yourself doing this, the document evidently fits into memory
//! and you are most likely better off using Serde JSON directly.
mod encoding;
mod error;
mod event;
mod options;
mod parser;
mod stack;

#[cfg(feature = "serde_json")]
pub mod serde_json;

pub use encoding::Encoding;
pub use error::{ErrorKind, InvalidStringValueError, ParseError};
pub use event::{JsonEvent, ValueType};
pub use options::{JsonPullParserOptions, JsonPullParserOptionsBuilder};
pub use parser::JsonPullParser;
