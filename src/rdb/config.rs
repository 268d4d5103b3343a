/// Redis compresses strings longer than this
const DEFAULT_COMPRESSION_THRESHOLD: usize = 4;

/// Configuration for the RDB decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Decode uncompressed sorted sets (type 3). If disabled they fail with an
    /// unsupported encoding error. Default: true
    pub decode_sorted_sets: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            decode_sorted_sets: true,
        }
    }
}

/// Configuration for the RDB encoder
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Try LZF compression for long strings. Default: true
    pub compress: bool,
    /// Only strings longer than this many bytes are compressed. Default: 4
    pub compression_threshold: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            compress: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}
