use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jsonpull::{JsonEvent, JsonPullParser, ValueType};
use serde_json::Value;

fn make_large(json: &str) -> String {
    let mut large = String::from("{");
    for i in 0..10000 {
        if large.len() > 1 {
            large.push(',');
        }
        large.push_str(&format!(r#""{}":"#, i));
        large.push_str(json);
    }
    large.push('}');
    large
}

fn jsonpull_parse(json_bytes: &[u8], buffer: &mut [u8]) {
    let mut parser = JsonPullParser::new(buffer);
    loop {
        match parser.parse(json_bytes) {
            Ok(JsonEvent::EndOfDocument) => break,
            Ok(JsonEvent::Name) => {
                black_box(parser.name());
            }
            Ok(JsonEvent::Value) => match parser.value_type() {
                ValueType::String => {
                    black_box(parser.string_value());
                }
                ValueType::Integer => {
                    black_box(parser.integer_value());
                }
                ValueType::Float => {
                    black_box(parser.float_value());
                }
                _ => {}
            },
            Ok(_) => {}
            Err(e) => panic!("parse error: {e}"),
        }
    }
}

fn serde_parse(json_bytes: &[u8]) {
    let value: Value = serde_json::from_slice(json_bytes).unwrap();
    black_box(value);
}

fn criterion_benchmark(c: &mut Criterion) {
    let json = make_large(r#"{"first name": "John", "age": 30, "scores": [1.25, 2.5, null, true]}"#);
    let json_bytes = json.as_bytes();
    // Generous enough that the parser never has to ask for a larger buffer
    let mut buffer = vec![0u8; json_bytes.len()];

    c.bench_function("jsonpull", |b| {
        b.iter(|| jsonpull_parse(json_bytes, &mut buffer))
    });
    c.bench_function("serde", |b| b.iter(|| serde_parse(json_bytes)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
