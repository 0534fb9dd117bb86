/// Runtime configuration for the tokenizer, object parser, and file parser.
///
/// The distilled specification repeatedly distinguishes "strict mode" from
/// "lenient mode" behavior without pinning down how callers select between
/// them; this crate resolves that as a single runtime switch rather than a
/// compile-time feature, defaulting to lenient so that the wide variety of
/// slightly-broken real-world PDF files parse the way production readers
/// expect them to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
    /// When `true`, violations that lenient mode tolerates (digit-count
    /// mismatches in xref lines, bare-CR stream EOLs, >5 fractional digits
    /// in a real literal, integer overflow) become hard errors instead.
    pub strict: bool,

    /// Capacity, in bytes, of the stream reader's internal read-ahead
    /// buffer. Must be at least 256.
    pub stream_reader_buffer_size: usize,

    /// Capacity, in bytes, of a filter's internal decode buffer. Must be at
    /// least 256.
    pub filter_buffer_size: usize,

    /// Capacity of the LRU cache the file parser uses for resolved indirect
    /// objects.
    pub object_cache_capacity: usize,

    /// Maximum number of leading garbage bytes tolerated before the `%PDF-`
    /// header in lenient mode.
    pub max_header_garbage: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            strict: false,
            stream_reader_buffer_size: 256,
            filter_buffer_size: 256,
            object_cache_capacity: 1000,
            max_header_garbage: 1024,
        }
    }
}

impl ParserConfig {
    pub fn strict() -> Self {
        ParserConfig {
            strict: true,
            ..Self::default()
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_lenient_with_256_byte_buffers() {
        let cfg = ParserConfig::default();
        assert!(!cfg.strict);
        assert_eq!(cfg.stream_reader_buffer_size, 256);
        assert_eq!(cfg.filter_buffer_size, 256);
    }
}
