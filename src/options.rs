/// Options for [`JsonPullParser`](crate::JsonPullParser). Use
/// [`JsonPullParserOptionsBuilder`] to create instances of this struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonPullParserOptions {
    /// The maximum number of nested objects and arrays
    pub(crate) max_depth: usize,
}

impl Default for JsonPullParserOptions {
    fn default() -> Self {
        Self { max_depth: 2048 }
    }
}

impl JsonPullParserOptions {
    /// Returns the maximum nesting depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// A builder for [`JsonPullParserOptions`]
///
/// ```rust
/// use jsonpull::{JsonPullParser, JsonPullParserOptionsBuilder};
///
/// let mut buffer = [0u8; 512];
/// let parser = JsonPullParser::new_with_options(
///     &mut buffer,
///     JsonPullParserOptionsBuilder::default()
///         .with_max_depth(16)
///         .build(),
/// );
/// ```
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct JsonPullParserOptionsBuilder {
    options: JsonPullParserOptions,
}

impl JsonPullParserOptionsBuilder {
    /// Set the maximum nesting depth. Documents nesting objects or arrays
    /// deeper than this are rejected with a syntax error, regardless of how
    /// much buffer space is left.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Create a new [`JsonPullParserOptions`] object
    pub fn build(self) -> JsonPullParserOptions {
        self.options
    }
}
