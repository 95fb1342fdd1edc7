//! Text cache for compact result encoding
//!
//! Log texts repeat a lot (keyword names, messages), so results refer to
//! them by index into a string table. Raw entries are stored with a `*`
//! prefix; long texts are stored zlib-compressed and base64-encoded when
//! that is clearly shorter. Index 0 is always the empty text.

use std::collections::HashMap;
use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Compression must make the entry at least this much shorter
const USE_COMPRESSED_RATIO: f64 = 1.1;

/// Prefix marking an uncompressed entry
const RAW_PREFIX: char = '*';

/// Deduplicating string table
#[derive(Debug, Clone)]
pub struct TextCache {
    texts: HashMap<String, usize>,
    compress_threshold: usize,
}

impl Default for TextCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCache {
    /// Cache compressing texts of 20 characters or more
    pub fn new() -> Self {
        Self::with_threshold(20)
    }

    /// Cache compressing texts whose raw entry reaches `compress_threshold`
    pub fn with_threshold(compress_threshold: usize) -> Self {
        let mut texts = HashMap::new();
        texts.insert(RAW_PREFIX.to_string(), 0);
        Self { texts, compress_threshold }
    }

    /// Add `text` and return its id.
    pub fn add(&mut self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let encoded = self.encode(text);
        let next = self.texts.len();
        *self.texts.entry(encoded).or_insert(next)
    }

    fn encode(&self, text: &str) -> String {
        let raw = format!("{}{}", RAW_PREFIX, text);
        if self.texts.contains_key(&raw) || raw.len() < self.compress_threshold {
            return raw;
        }
        match compress(text) {
            Some(compressed) if (compressed.len() as f64) * USE_COMPRESSED_RATIO < raw.len() as f64 => compressed,
            _ => raw,
        }
    }

    /// Number of entries, including the empty text
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.len() <= 1
    }

    /// Entries ordered by id.
    pub fn dump(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &usize)> = self.texts.iter().collect();
        entries.sort_by_key(|(_, &id)| id);
        entries.into_iter().map(|(text, _)| text.clone()).collect()
    }
}

fn compress(text: &str) -> Option<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(text.as_bytes()).ok()?;
    let bytes = encoder.finish().ok()?;
    Some(STANDARD.encode(bytes))
}

/// Decode a string table entry back into its text.
pub fn decode_text(entry: &str) -> Result<String, String> {
    if let Some(raw) = entry.strip_prefix(RAW_PREFIX) {
        return Ok(raw.to_string());
    }
    let bytes = STANDARD.decode(entry).map_err(|e| format!("invalid base64: {}", e))?;
    let mut text = String::new();
    ZlibDecoder::new(bytes.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| format!("invalid compressed text: {}", e))?;
    Ok(text)
}
