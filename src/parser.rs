use std::str::from_utf8;

use crate::encoding::{self, Character, Decoded, Encoding};
use crate::error::{ErrorKind, InvalidStringValueError, ParseError};
use crate::options::JsonPullParserOptions;
use crate::stack::{self, *};
use crate::{JsonEvent, ValueType};

/// Tokenization states
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
enum State {
    /// Initial state, no JSON content has been found yet
    #[default]
    None,
    /// The first byte of a UTF-8 byte-order mark was found
    Utf8Bom1,
    /// The second byte of a UTF-8 byte-order mark was found
    Utf8Bom2,
    /// The first byte of a UTF-16BE byte-order mark was found
    Utf16BeBom,
    /// The first byte of a UTF-16LE byte-order mark was found
    Utf16LeBom,
    /// A name is expected after beginning an object or after a comma
    NameExpected,
    /// A name was started by a double quote and characters are being appended
    Name,
    /// A name was ended by a double quote and a colon is expected
    PostName,
    /// A value is expected after a colon or inside an array
    ValueExpected,
    /// A double quote started a string value
    StringValue,
    /// A backslash was found and an escaped character is expected
    Escape,
    /// `\u` notation: the first hex digit is expected
    Unicode1,
    /// `\u` notation: the second hex digit is expected
    Unicode2,
    /// `\u` notation: the third hex digit is expected
    Unicode3,
    /// `\u` notation: the fourth hex digit is expected
    Unicode4,
    /// A digit or minus sign started a number value
    NumberValue,
    /// `t` was found, `r` is expected
    TrueT,
    /// `tr` was found, `u` is expected
    TrueR,
    /// `tru` was found, `e` is expected
    TrueU,
    /// `f` was found, `a` is expected
    FalseF,
    /// `fa` was found, `l` is expected
    FalseA,
    /// `fal` was found, `s` is expected
    FalseL,
    /// `fals` was found, `e` is expected
    FalseS,
    /// `n` was found, `u` is expected
    NullN,
    /// `nu` was found, `l` is expected
    NullU,
    /// `nul` was found, another `l` is expected
    NullL,
    /// A value was found, a comma or closing token is expected
    PostValue,
    /// The root object or array has closed
    Done,
}

/// A region of the working buffer holding an exported name or string value
#[derive(Copy, Clone, Debug)]
struct Span {
    offset: u32,
    len: u32,
}

fn is_newline(value: u32) -> bool {
    value == 0x0A || value == 0x0D
}

fn is_whitespace(value: u32) -> bool {
    value == 0x20 || value == 0x09 || is_newline(value)
}

fn is_digit(value: u32) -> bool {
    (0x30..=0x39).contains(&value)
}

fn hex_digit(value: u32) -> Option<u32> {
    match value {
        0x30..=0x39 => Some(value - 0x30),
        0x61..=0x66 => Some(value - 0x61 + 10),
        0x41..=0x46 => Some(value - 0x41 + 10),
        _ => None,
    }
}

/// An incremental, zero-allocation JSON pull parser.
///
/// The parser is constructed over a single caller-owned byte buffer that
/// serves both as the object/array nesting stack and as the storage for the
/// latest name and string value handed back to the caller. Feed it input
/// slices with [`parse()`](Self::parse()); each call returns one
/// [`JsonEvent`] or one [`ParseError`]. When the input slice is exhausted or
/// the buffer is full, a recoverable error is returned and parsing continues
/// exactly where it stopped once the caller supplies more input or a larger
/// buffer.
pub struct JsonPullParser<'buf> {
    buffer: &'buf mut [u8],

    // Fields readable by the caller after each event
    name: Option<Span>,
    string_value: Option<Span>,
    integer_value: i64,
    float_value: f64,
    bool_value: bool,
    value_type: ValueType,
    line: u32,
    column: u32,
    depth: u32,

    // Parsing state
    encoding: Encoding,
    state: State,
    escape_return_state: State,
    halt: Option<ErrorKind>,
    stack_top: Option<u32>,
    stack_depth: usize,
    max_depth: usize,

    // Input iteration. The stream register holds the bytes of a character
    // stranded at the end of a previous input slice.
    input_addr: usize,
    input_len: usize,
    pos: usize,
    stream: [u8; 4],
    stream_len: usize,

    // Snapshot taken before each decoded character so the character can be
    // un-consumed, either to re-parse a number terminator or to re-decode
    // the character that exhausted the buffer
    last_stream: [u8; 4],
    last_stream_len: usize,
    last_advance: usize,
    last_line: u32,
    last_column: u32,

    // The first of LF or CR observed; the sole line-increment trigger
    newline: u32,
    unicode_scalar: u32,
    pending_high_surrogate: Option<u16>,
    // Scratch offset at which the value currently being assembled begins
    value_start: u32,
}

impl<'buf> JsonPullParser<'buf> {
    /// Create a new parser over the given working buffer. The buffer is
    /// zeroed and owned by the caller for the parser's entire lifetime.
    ///
    /// An empty or undersized buffer is not an error: the first character
    /// that does not fit reports [`ErrorKind::InsufficientMemory`], which is
    /// recovered by [`reallocate()`](Self::reallocate()).
    pub fn new(buffer: &'buf mut [u8]) -> Self {
        Self::new_with_options(buffer, JsonPullParserOptions::default())
    }

    /// Create a new parser over the given working buffer and with the given
    /// [`JsonPullParserOptions`]
    pub fn new_with_options(buffer: &'buf mut [u8], options: JsonPullParserOptions) -> Self {
        buffer.fill(0);
        JsonPullParser {
            buffer,
            name: None,
            string_value: None,
            integer_value: 0,
            float_value: 0.0,
            bool_value: false,
            value_type: ValueType::None,
            line: 1,
            column: 0,
            depth: 0,
            encoding: Encoding::Unknown,
            state: State::None,
            escape_return_state: State::None,
            halt: None,
            stack_top: None,
            stack_depth: 0,
            max_depth: options.max_depth,
            input_addr: 0,
            input_len: 0,
            pos: 0,
            stream: [0; 4],
            stream_len: 0,
            last_stream: [0; 4],
            last_stream_len: 0,
            last_advance: 0,
            last_line: 1,
            last_column: 0,
            newline: 0,
            unicode_scalar: 0,
            pending_high_surrogate: None,
            value_start: 0,
        }
    }

    /// Move the parser to a new, strictly larger working buffer, copying the
    /// old buffer's contents. All parsing state survives: if the parser had
    /// reported [`ErrorKind::InsufficientMemory`], the next
    /// [`parse()`](Self::parse()) call resumes with the character that did
    /// not fit.
    ///
    /// The old buffer may be reused or freed afterwards.
    ///
    /// # Panics
    ///
    /// Panics if `new_buffer` is not longer than the current buffer.
    pub fn reallocate<'new>(mut self, new_buffer: &'new mut [u8]) -> JsonPullParser<'new> {
        assert!(
            new_buffer.len() > self.buffer.len(),
            "the new buffer must be strictly larger than the current one"
        );
        new_buffer[..self.buffer.len()].copy_from_slice(self.buffer);
        new_buffer[self.buffer.len()..].fill(0);
        if self.halt == Some(ErrorKind::InsufficientMemory) {
            self.halt = None;
        }
        JsonPullParser {
            buffer: new_buffer,
            name: self.name,
            string_value: self.string_value,
            integer_value: self.integer_value,
            float_value: self.float_value,
            bool_value: self.bool_value,
            value_type: self.value_type,
            line: self.line,
            column: self.column,
            depth: self.depth,
            encoding: self.encoding,
            state: self.state,
            escape_return_state: self.escape_return_state,
            halt: self.halt,
            stack_top: self.stack_top,
            stack_depth: self.stack_depth,
            max_depth: self.max_depth,
            input_addr: self.input_addr,
            input_len: self.input_len,
            pos: self.pos,
            stream: self.stream,
            stream_len: self.stream_len,
            last_stream: self.last_stream,
            last_stream_len: self.last_stream_len,
            last_advance: self.last_advance,
            last_line: self.last_line,
            last_column: self.last_column,
            newline: self.newline,
            unicode_scalar: self.unicode_scalar,
            pending_high_surrogate: self.pending_high_surrogate,
            value_start: self.value_start,
        }
    }

    /// Return the parser to the state it was in when it was constructed,
    /// keeping the same working buffer. Clears pinned errors.
    pub fn reset(&mut self) {
        self.buffer.fill(0);
        self.name = None;
        self.string_value = None;
        self.integer_value = 0;
        self.float_value = 0.0;
        self.bool_value = false;
        self.value_type = ValueType::None;
        self.line = 1;
        self.column = 0;
        self.depth = 0;
        self.encoding = Encoding::Unknown;
        self.state = State::None;
        self.escape_return_state = State::None;
        self.halt = None;
        self.stack_top = None;
        self.stack_depth = 0;
        self.input_addr = 0;
        self.input_len = 0;
        self.pos = 0;
        self.stream = [0; 4];
        self.stream_len = 0;
        self.last_stream = [0; 4];
        self.last_stream_len = 0;
        self.last_advance = 0;
        self.last_line = 1;
        self.last_column = 0;
        self.newline = 0;
        self.unicode_scalar = 0;
        self.pending_high_surrogate = None;
        self.value_start = 0;
    }

    /// Begin or continue parsing the given input slice and return the next
    /// event.
    ///
    /// One event is returned per call, and the exported fields ([`name()`](Self::name()),
    /// the value accessors, [`depth()`](Self::depth())) describe that event
    /// until the next event-producing call recycles them.
    ///
    /// The input does not need to hold the document in its entirety. When
    /// the slice is exhausted mid-document, [`ErrorKind::UnexpectedEof`] is
    /// returned; calling again with the next slice continues where parsing
    /// stopped, even in the middle of a multi-byte character. Passing a
    /// slice at a different address restarts iteration at that slice's
    /// first byte; passing the same slice again continues inside it.
    pub fn parse(&mut self, input: &[u8]) -> Result<JsonEvent, ParseError> {
        if input.is_empty() {
            return Err(self.current_error(ErrorKind::InvalidInput));
        }

        // Work deferred from the previous event: the caller had to be able
        // to observe the name, value, and depth of the event before the
        // fields and the closed node could be recycled.
        if let Some(top) = self.stack_top {
            let mut flags = stack::flags(self.buffer, top);
            if flags & FLAG_INCREMENT_DEPTH != 0 {
                self.depth += 1;
                flags &= !FLAG_INCREMENT_DEPTH;
                stack::set_flags(self.buffer, top, flags);
            }
            if flags & FLAG_DECREMENT_DEPTH != 0 {
                self.depth -= 1;
                flags &= !FLAG_DECREMENT_DEPTH;
                stack::set_flags(self.buffer, top, flags);
            }
            if flags & FLAG_MUST_POP != 0 {
                let parent = stack::pop_node(self.buffer, top);
                self.stack_top = parent;
                self.stack_depth -= 1;
                if parent.is_none() {
                    self.state = State::Done;
                    return Ok(JsonEvent::EndOfDocument);
                }
            }
            if let Some(top) = self.stack_top {
                let flags = stack::flags(self.buffer, top);
                if flags & FLAG_POST_VALUE_CLEANUP != 0 {
                    let len = stack::scratch_len(self.buffer, top) as usize;
                    if len > 0 {
                        let start = stack::scratch_start(top);
                        self.buffer[start..start + len].fill(0);
                        stack::set_scratch_len(self.buffer, top, 0);
                    }
                    stack::set_name_len(self.buffer, top, 0);
                    stack::set_flags(self.buffer, top, flags & !VALUE_FLAGS);
                    self.name = None;
                    self.string_value = None;
                    self.integer_value = 0;
                    self.float_value = 0.0;
                    self.bool_value = false;
                    self.value_type = ValueType::None;
                }
            }
        }

        match self.halt {
            // Recoverable: the caller may have new input now. Resume; the
            // loop below reports the condition again if still starved.
            Some(ErrorKind::UnexpectedEof) => self.halt = None,
            Some(kind) => return Err(self.current_error(kind)),
            None => {}
        }
        if self.state == State::Done {
            return Ok(JsonEvent::EndOfDocument);
        }

        if self.input_addr != input.as_ptr() as usize {
            self.input_addr = input.as_ptr() as usize;
            self.input_len = input.len();
            self.pos = 0;
        }

        loop {
            if self.state_needs_node() && self.stack_top.is_none() {
                return Err(self.fail(ErrorKind::Internal));
            }
            let Some(c) = self.decode_next(input) else {
                return Err(self.fail(ErrorKind::UnexpectedEof));
            };
            if let Some(event) = self.dispatch(c)? {
                return Ok(event);
            }
        }
    }

    /// The name of the current name-value pair, in the document's encoding,
    /// or `None` when the current event has no associated name (values
    /// inside arrays, the root object or array itself). Valid until the
    /// next event-producing [`parse()`](Self::parse()) call.
    pub fn name(&self) -> Option<&[u8]> {
        self.name.map(|s| self.span_bytes(s))
    }

    /// Like [`name()`](Self::name()) but as UTF-8 text. Fails for documents
    /// in an encoding other than UTF-8 or its unknown-encoding superset.
    pub fn name_str(&self) -> Result<Option<&str>, InvalidStringValueError> {
        Ok(self.name().map(from_utf8).transpose()?)
    }

    /// The bytes of the current string value, in the document's encoding.
    /// Populated when [`value_type()`](Self::value_type()) is
    /// [`ValueType::String`]. Valid until the next event-producing
    /// [`parse()`](Self::parse()) call.
    pub fn string_value(&self) -> Option<&[u8]> {
        self.string_value.map(|s| self.span_bytes(s))
    }

    /// Like [`string_value()`](Self::string_value()) but as UTF-8 text
    pub fn string_value_str(&self) -> Result<Option<&str>, InvalidStringValueError> {
        Ok(self.string_value().map(from_utf8).transpose()?)
    }

    /// The current integer value, when [`value_type()`](Self::value_type())
    /// is [`ValueType::Integer`]
    pub fn integer_value(&self) -> Option<i64> {
        (self.value_type == ValueType::Integer).then_some(self.integer_value)
    }

    /// The current floating-point value, when [`value_type()`](Self::value_type())
    /// is [`ValueType::Float`]
    pub fn float_value(&self) -> Option<f64> {
        (self.value_type == ValueType::Float).then_some(self.float_value)
    }

    /// The current boolean value, when [`value_type()`](Self::value_type())
    /// is [`ValueType::Boolean`]
    pub fn bool_value(&self) -> Option<bool> {
        (self.value_type == ValueType::Boolean).then_some(self.bool_value)
    }

    /// The type of the most recently reported value
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The line currently being parsed, starting at 1. Lines are counted by
    /// the first kind of line break observed, so CRLF line endings do not
    /// count double.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The column, on the current line, of the character last parsed.
    /// Byte-order marks do not count as columns.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// The nesting level: 0 above the root, 1 inside the root object or
    /// array, and so on. Begin and end events report the level enclosing
    /// the container; the level inside it becomes visible with the next
    /// call.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The document encoding, as sniffed from the byte-order mark
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Length of the current working buffer in bytes
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn span_bytes(&self, span: Span) -> &[u8] {
        &self.buffer[span.offset as usize..(span.offset + span.len) as usize]
    }

    fn current_error(&self, kind: ErrorKind) -> ParseError {
        ParseError {
            kind,
            line: self.line,
            column: self.column,
        }
    }

    /// Record `kind` as the parser's pinned condition and build the error
    fn fail(&mut self, kind: ErrorKind) -> ParseError {
        self.halt = Some(kind);
        self.current_error(kind)
    }

    fn state_needs_node(&self) -> bool {
        !matches!(
            self.state,
            State::None
                | State::Utf8Bom1
                | State::Utf8Bom2
                | State::Utf16BeBom
                | State::Utf16LeBom
                | State::Done
        )
    }

    fn top_node(&mut self) -> Result<u32, ParseError> {
        match self.stack_top {
            Some(top) => Ok(top),
            None => Err(self.fail(ErrorKind::Internal)),
        }
    }

    /// Decode the next character from the stream register plus the current
    /// input slice. Returns `None` when there are not enough bytes; the
    /// available fragment is then stashed in the stream register so the
    /// character can be reassembled from the next slice.
    fn decode_next(&mut self, input: &[u8]) -> Option<Character> {
        let effective = self.input_len.min(input.len());
        let remaining = effective.saturating_sub(self.pos);
        let mut window = [0u8; 4];
        window[..self.stream_len].copy_from_slice(&self.stream[..self.stream_len]);
        let take = remaining.min(4 - self.stream_len);
        window[self.stream_len..self.stream_len + take]
            .copy_from_slice(&input[self.pos..self.pos + take]);
        let available = self.stream_len + take;

        match encoding::decode_character(&window, available, self.encoding) {
            Decoded::Char(c) => {
                self.last_stream = self.stream;
                self.last_stream_len = self.stream_len;
                self.last_line = self.line;
                self.last_column = self.column;
                let from_stream = c.bytes.min(self.stream_len);
                self.last_advance = c.bytes - from_stream;
                self.pos += self.last_advance;
                if from_stream < self.stream_len {
                    self.stream.copy_within(from_stream..self.stream_len, 0);
                    self.stream_len -= from_stream;
                } else {
                    self.stream_len = 0;
                }
                if is_newline(c.value) {
                    if self.newline == 0 {
                        self.newline = c.value;
                    }
                    if c.value == self.newline {
                        self.line += 1;
                    }
                    self.column = 0;
                } else {
                    self.column += 1;
                }
                Some(c)
            }
            Decoded::Incomplete => {
                self.stream = window;
                self.stream_len = available;
                self.pos += take;
                None
            }
        }
    }

    /// Un-consume the last decoded character so it is decoded again, either
    /// by the surrounding state in this call or after the caller recovers
    /// from a buffer-exhaustion error
    fn stay(&mut self) {
        self.pos -= self.last_advance;
        self.stream = self.last_stream;
        self.stream_len = self.last_stream_len;
        self.line = self.last_line;
        self.column = self.last_column;
    }

    /// Process one decoded character. Returns an event if the character
    /// completed one.
    fn dispatch(&mut self, c: Character) -> Result<Option<JsonEvent>, ParseError> {
        let v = c.value;
        match self.state {
            State::None => match v {
                0x7B | 0x5B => return self.begin_token(v).map(Some),
                0xEF => {
                    self.state = State::Utf8Bom1;
                    self.column -= 1;
                }
                0xFE => {
                    self.state = State::Utf16BeBom;
                    self.column -= 1;
                }
                0xFF => {
                    self.state = State::Utf16LeBom;
                    self.column -= 1;
                }
                _ if is_whitespace(v) => {}
                _ => return Err(self.fail(ErrorKind::Syntax)),
            },

            State::Utf8Bom1 => {
                self.column -= 1;
                if v == 0xBB {
                    self.state = State::Utf8Bom2;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf8Bom2 => {
                self.column -= 1;
                if v == 0xBF {
                    self.state = State::None;
                    self.encoding = Encoding::Utf8;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf16BeBom => {
                self.column -= 1;
                if v == 0xFF {
                    self.state = State::None;
                    self.encoding = Encoding::Utf16Be;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf16LeBom => {
                self.column -= 1;
                if v == 0xFE {
                    self.state = State::None;
                    self.encoding = Encoding::Utf16Le;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }

            State::NameExpected => match v {
                0x22 => {
                    let top = self.top_node()?;
                    let flags = stack::flags(self.buffer, top);
                    stack::set_flags(self.buffer, top, flags | FLAG_HAS_NAME);
                    self.state = State::Name;
                }
                0x7D | 0x5D => return self.end_token(v).map(Some),
                _ if is_whitespace(v) => {}
                _ => return Err(self.fail(ErrorKind::Syntax)),
            },

            State::Name => {
                if self.pending_high_surrogate.is_some() && v != 0x5C {
                    return Err(self.fail(ErrorKind::Syntax));
                }
                match v {
                    0x22 => {
                        let top = self.top_node()?;
                        let terminator = [0u8; 2];
                        self.append_scratch(&terminator[..self.encoding.terminator_len()])?;
                        let name_len = stack::scratch_len(self.buffer, top)
                            - self.encoding.terminator_len() as u32;
                        stack::set_name_len(self.buffer, top, name_len);
                        self.name = Some(Span {
                            offset: stack::scratch_start(top) as u32,
                            len: name_len,
                        });
                        self.state = State::PostName;
                        return Ok(Some(JsonEvent::Name));
                    }
                    0x5C => {
                        self.escape_return_state = State::Name;
                        self.state = State::Escape;
                    }
                    _ => self.append_scratch(c.raw_bytes())?,
                }
            }

            State::PostName => match v {
                0x3A => self.state = State::ValueExpected,
                _ if is_whitespace(v) => {}
                _ => return Err(self.fail(ErrorKind::Syntax)),
            },

            State::ValueExpected => match v {
                0x22 => {
                    let top = self.top_node()?;
                    self.value_start = stack::scratch_len(self.buffer, top);
                    self.state = State::StringValue;
                }
                _ if is_digit(v) || v == 0x2D => {
                    let top = self.top_node()?;
                    self.value_start = stack::scratch_len(self.buffer, top);
                    // Number characters are ASCII in every supported
                    // encoding, so the scratch form is byte-per-character
                    // and feeds the conversions directly.
                    self.append_scratch(&[v as u8])?;
                    self.state = State::NumberValue;
                }
                0x74 => self.state = State::TrueT,
                0x66 => self.state = State::FalseF,
                0x6E => self.state = State::NullN,
                0x7B | 0x5B => return self.begin_token(v).map(Some),
                0x7D | 0x5D => return self.end_token(v).map(Some),
                _ if is_whitespace(v) => {}
                _ => return Err(self.fail(ErrorKind::Syntax)),
            },

            State::StringValue => {
                if self.pending_high_surrogate.is_some() && v != 0x5C {
                    return Err(self.fail(ErrorKind::Syntax));
                }
                match v {
                    0x22 => {
                        let top = self.top_node()?;
                        let len = stack::scratch_len(self.buffer, top);
                        self.string_value = Some(Span {
                            offset: stack::scratch_start(top) as u32 + self.value_start,
                            len: len - self.value_start,
                        });
                        self.value_type = ValueType::String;
                        return self.finish_value().map(Some);
                    }
                    0x5C => {
                        self.escape_return_state = State::StringValue;
                        self.state = State::Escape;
                    }
                    _ => self.append_scratch(c.raw_bytes())?,
                }
            }

            State::Escape => {
                if self.pending_high_surrogate.is_some() && v != 0x75 {
                    return Err(self.fail(ErrorKind::Syntax));
                }
                let mapped = match v {
                    0x22 => 0x22,
                    0x5C => 0x5C,
                    0x2F => 0x2F,
                    0x62 => 0x08,
                    0x66 => 0x0C,
                    0x6E => 0x0A,
                    0x72 => 0x0D,
                    0x74 => 0x09,
                    0x75 => {
                        self.state = State::Unicode1;
                        return Ok(None);
                    }
                    _ => return Err(self.fail(ErrorKind::Syntax)),
                };
                self.append_encoded(mapped)?;
                self.state = self.escape_return_state;
                self.escape_return_state = State::None;
            }

            State::Unicode1 => match hex_digit(v) {
                Some(h) => {
                    self.unicode_scalar = h * 4096;
                    self.state = State::Unicode2;
                }
                None => return Err(self.fail(ErrorKind::Syntax)),
            },
            State::Unicode2 => match hex_digit(v) {
                Some(h) => {
                    self.unicode_scalar += h * 256;
                    self.state = State::Unicode3;
                }
                None => return Err(self.fail(ErrorKind::Syntax)),
            },
            State::Unicode3 => match hex_digit(v) {
                Some(h) => {
                    self.unicode_scalar += h * 16;
                    self.state = State::Unicode4;
                }
                None => return Err(self.fail(ErrorKind::Syntax)),
            },
            State::Unicode4 => {
                let Some(h) = hex_digit(v) else {
                    return Err(self.fail(ErrorKind::Syntax));
                };
                // The scalar is only committed once the append succeeded:
                // if the buffer runs out, this digit is re-decoded after
                // reallocation and the addition must not happen twice.
                let scalar = self.unicode_scalar + h;
                if (0xD800..=0xDBFF).contains(&scalar) {
                    if self.pending_high_surrogate.is_some() {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    self.pending_high_surrogate = Some(scalar as u16);
                } else if (0xDC00..=0xDFFF).contains(&scalar) {
                    let Some(high) = self.pending_high_surrogate else {
                        return Err(self.fail(ErrorKind::Syntax));
                    };
                    let combined = 0x10000 + (((high as u32 - 0xD800) << 10) | (scalar - 0xDC00));
                    self.append_encoded(combined)?;
                    self.pending_high_surrogate = None;
                } else {
                    if self.pending_high_surrogate.is_some() {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    self.append_encoded(scalar)?;
                }
                self.unicode_scalar = 0;
                self.state = self.escape_return_state;
                self.escape_return_state = State::None;
            }

            State::NumberValue => {
                let top = self.top_node()?;
                let flags = stack::flags(self.buffer, top);
                match v {
                    _ if is_digit(v) => self.append_scratch(&[v as u8])?,
                    0x2E => {
                        if flags & FLAG_NUMBER_HAS_DECIMAL != 0 {
                            return Err(self.fail(ErrorKind::Syntax));
                        }
                        self.append_scratch(&[b'.'])?;
                        let flags = stack::flags(self.buffer, top);
                        stack::set_flags(self.buffer, top, flags | FLAG_NUMBER_HAS_DECIMAL);
                    }
                    0x65 | 0x45 => {
                        if flags & FLAG_NUMBER_HAS_EXPONENT != 0 {
                            return Err(self.fail(ErrorKind::Syntax));
                        }
                        self.append_scratch(&[v as u8])?;
                        let flags = stack::flags(self.buffer, top);
                        stack::set_flags(self.buffer, top, flags | FLAG_NUMBER_HAS_EXPONENT);
                    }
                    0x2B | 0x2D => {
                        if flags & FLAG_NUMBER_HAS_EXPONENT == 0
                            || flags & FLAG_NUMBER_HAS_SIGN_IN_EXPONENT != 0
                        {
                            return Err(self.fail(ErrorKind::Syntax));
                        }
                        self.append_scratch(&[v as u8])?;
                        let flags = stack::flags(self.buffer, top);
                        stack::set_flags(
                            self.buffer,
                            top,
                            flags | FLAG_NUMBER_HAS_SIGN_IN_EXPONENT,
                        );
                    }
                    _ if is_whitespace(v) || v == 0x2C || v == 0x5D || v == 0x7D => {
                        return self.finish_number(v).map(Some);
                    }
                    _ => return Err(self.fail(ErrorKind::Syntax)),
                }
            }

            State::TrueT => return self.expect_keyword_char(v, 0x72, State::TrueR),
            State::TrueR => return self.expect_keyword_char(v, 0x75, State::TrueU),
            State::TrueU => {
                if v != 0x65 {
                    return Err(self.fail(ErrorKind::Syntax));
                }
                self.value_type = ValueType::Boolean;
                self.bool_value = true;
                return self.finish_value().map(Some);
            }
            State::FalseF => return self.expect_keyword_char(v, 0x61, State::FalseA),
            State::FalseA => return self.expect_keyword_char(v, 0x6C, State::FalseL),
            State::FalseL => return self.expect_keyword_char(v, 0x73, State::FalseS),
            State::FalseS => {
                if v != 0x65 {
                    return Err(self.fail(ErrorKind::Syntax));
                }
                self.value_type = ValueType::Boolean;
                self.bool_value = false;
                return self.finish_value().map(Some);
            }
            State::NullN => return self.expect_keyword_char(v, 0x75, State::NullU),
            State::NullU => return self.expect_keyword_char(v, 0x6C, State::NullL),
            State::NullL => {
                if v != 0x6C {
                    return Err(self.fail(ErrorKind::Syntax));
                }
                self.value_type = ValueType::Null;
                return self.finish_value().map(Some);
            }

            State::PostValue => match v {
                0x7D | 0x5D => return self.end_token(v).map(Some),
                0x2C => {
                    let top = self.top_node()?;
                    let flags = stack::flags(self.buffer, top);
                    if flags & FLAG_COMMA != 0 {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    stack::set_flags(self.buffer, top, flags | FLAG_COMMA);
                    self.state = if flags & FLAG_IS_ARRAY != 0 {
                        State::ValueExpected
                    } else {
                        State::NameExpected
                    };
                }
                _ if is_whitespace(v) => {}
                _ => return Err(self.fail(ErrorKind::Syntax)),
            },

            State::Done => return Ok(Some(JsonEvent::EndOfDocument)),
        }
        Ok(None)
    }

    fn expect_keyword_char(
        &mut self,
        value: u32,
        expected: u32,
        next: State,
    ) -> Result<Option<JsonEvent>, ParseError> {
        if value == expected {
            self.state = next;
            Ok(None)
        } else {
            Err(self.fail(ErrorKind::Syntax))
        }
    }

    /// An object or array opened: export the name the enclosing node holds
    /// for it, push a node, and emit the begin event
    fn begin_token(&mut self, token: u32) -> Result<JsonEvent, ParseError> {
        self.name = match self.stack_top {
            Some(top) if stack::flags(self.buffer, top) & FLAG_HAS_NAME != 0 => Some(Span {
                offset: stack::scratch_start(top) as u32,
                len: stack::name_len(self.buffer, top),
            }),
            _ => None,
        };
        self.string_value = None;
        self.integer_value = 0;
        self.float_value = 0.0;
        self.bool_value = false;

        let top = self.push_node()?;
        let mut flags = FLAG_POST_VALUE_CLEANUP | FLAG_INCREMENT_DEPTH;
        if token == 0x5B {
            flags |= FLAG_IS_ARRAY;
        }
        stack::set_flags(self.buffer, top, flags);

        if token == 0x7B {
            self.state = State::NameExpected;
            Ok(JsonEvent::ObjectBegin)
        } else {
            self.state = State::ValueExpected;
            Ok(JsonEvent::ArrayBegin)
        }
    }

    /// An object or array closed: validate the bracket, flag the node for
    /// the deferred pop, and emit the end event with the container's name
    fn end_token(&mut self, token: u32) -> Result<JsonEvent, ParseError> {
        let top = self.top_node()?;
        let flags = stack::flags(self.buffer, top);
        let is_array = flags & FLAG_IS_ARRAY != 0;
        if (is_array && token != 0x5D) || (!is_array && token != 0x7D) {
            return Err(self.fail(ErrorKind::TokenMismatch));
        }
        if flags & FLAG_COMMA != 0 {
            // The container ended immediately after a comma
            return Err(self.fail(ErrorKind::Syntax));
        }

        self.state = State::PostValue;
        self.name = None;

        // The node cannot be popped yet: its name must remain addressable
        // until the caller has read it.
        stack::set_flags(
            self.buffer,
            top,
            flags | FLAG_MUST_POP | FLAG_DECREMENT_DEPTH,
        );

        if let Some(parent) = stack::parent(self.buffer, top) {
            let parent_flags = stack::flags(self.buffer, parent);
            if parent_flags & FLAG_HAS_NAME != 0 {
                self.name = Some(Span {
                    offset: stack::scratch_start(parent) as u32,
                    len: stack::name_len(self.buffer, parent),
                });
            }
            stack::set_flags(self.buffer, parent, parent_flags | FLAG_POST_VALUE_CLEANUP);
        }

        Ok(if is_array {
            JsonEvent::ArrayEnd
        } else {
            JsonEvent::ObjectEnd
        })
    }

    /// Convert the assembled number and emit the value event. The
    /// terminating character is put back unless it was whitespace, so the
    /// surrounding state consumes it on the next iteration.
    fn finish_number(&mut self, terminator: u32) -> Result<JsonEvent, ParseError> {
        let top = self.top_node()?;
        let flags = stack::flags(self.buffer, top);
        let start = stack::scratch_start(top) + self.value_start as usize;
        let end = stack::scratch_start(top) + stack::scratch_len(self.buffer, top) as usize;
        let is_float = flags & (FLAG_NUMBER_HAS_DECIMAL | FLAG_NUMBER_HAS_EXPONENT) != 0;

        enum Converted {
            Integer(i64),
            Float(f64),
            Malformed,
        }
        let converted = {
            let scratch = &self.buffer[start..end];
            if matches!(scratch.last(), None | Some(b'.' | b'e' | b'E' | b'+' | b'-')) {
                // A dangling fraction, exponent, or sign
                Converted::Malformed
            } else if is_float {
                match from_utf8(scratch).ok().and_then(|s| s.parse::<f64>().ok()) {
                    Some(f) => Converted::Float(f),
                    None => Converted::Malformed,
                }
            } else {
                match btoi::btoi::<i64>(scratch) {
                    Ok(i) => Converted::Integer(i),
                    Err(_) => Converted::Malformed,
                }
            }
        };
        match converted {
            Converted::Integer(i) => {
                self.integer_value = i;
                self.value_type = ValueType::Integer;
            }
            Converted::Float(f) => {
                self.float_value = f;
                self.value_type = ValueType::Float;
            }
            Converted::Malformed => return Err(self.fail(ErrorKind::Syntax)),
        }
        self.string_value = None;

        if !is_whitespace(terminator) {
            self.stay();
        }
        self.finish_value()
    }

    /// Common tail of every value: flag the top node for cleanup on the
    /// next call and emit the value event
    fn finish_value(&mut self) -> Result<JsonEvent, ParseError> {
        let top = self.top_node()?;
        let flags = stack::flags(self.buffer, top);
        stack::set_flags(self.buffer, top, flags | FLAG_POST_VALUE_CLEANUP);
        self.state = State::PostValue;
        Ok(JsonEvent::Value)
    }

    /// Push a node for a newly opened object or array
    fn push_node(&mut self) -> Result<u32, ParseError> {
        if self.stack_depth >= self.max_depth {
            return Err(self.fail(ErrorKind::Syntax));
        }
        let offset = match self.stack_top {
            None => 0,
            Some(top) => {
                stack::scratch_start(top) + stack::scratch_len(self.buffer, top) as usize
            }
        };
        if offset + HEADER_LEN > self.buffer.len() {
            self.stay();
            return Err(self.fail(ErrorKind::InsufficientMemory));
        }
        stack::init_node(self.buffer, offset as u32, self.stack_top);
        self.stack_top = Some(offset as u32);
        self.stack_depth += 1;
        Ok(offset as u32)
    }

    /// Append bytes to the top node's scratch region
    fn append_scratch(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        let top = self.top_node()?;
        let len = stack::scratch_len(self.buffer, top);
        let start = stack::scratch_start(top) + len as usize;
        if start + bytes.len() > self.buffer.len() {
            self.stay();
            return Err(self.fail(ErrorKind::InsufficientMemory));
        }
        self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
        stack::set_scratch_len(self.buffer, top, len + bytes.len() as u32);
        Ok(())
    }

    /// Encode a scalar into the document's encoding and append it
    fn append_encoded(&mut self, value: u32) -> Result<(), ParseError> {
        match encoding::encode_character(value, self.encoding) {
            Some(c) => self.append_scratch(c.raw_bytes()),
            None => Err(self.fail(ErrorKind::Syntax)),
        }
    }
}
