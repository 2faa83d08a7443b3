use jsonpull::{ErrorKind, JsonEvent, JsonPullParser};

#[macro_use]
extern crate afl;

const CHUNK: usize = 7;

fn drive(mut parser: JsonPullParser<'_>, data: &[u8], mut offset: usize) {
    loop {
        let end = (offset + CHUNK).min(data.len());
        match parser.parse(&data[offset..end]) {
            Ok(JsonEvent::EndOfDocument) => return,
            Ok(JsonEvent::Name) => {
                let _ = parser.name();
            }
            Ok(JsonEvent::Value) => {
                let _ = parser.string_value();
                let _ = parser.integer_value();
                let _ = parser.float_value();
            }
            Ok(_) => {}
            Err(e) if e.kind == ErrorKind::UnexpectedEof && end < data.len() => offset = end,
            Err(e) if e.kind == ErrorKind::InsufficientMemory => {
                let mut bigger = vec![0u8; parser.buffer_len() * 2 + 16];
                let parser = parser.reallocate(&mut bigger);
                return drive(parser, data, offset);
            }
            Err(_) => return,
        }
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        if data.is_empty() {
            return;
        }
        let mut buffer = [0u8; 32];
        let parser = JsonPullParser::new(&mut buffer);
        drive(parser, data, 0);
    });
}
