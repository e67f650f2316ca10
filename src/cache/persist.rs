//! Queue of learned translations and the append-only output log.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

use anyhow::Context;
use tracing::{debug, info};

use super::TranslationCache;
use crate::codec::encode_entry;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Pairs waiting to be appended, in the order they were first queued.
#[derive(Debug, Default)]
pub(super) struct PendingTranslations {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl PendingTranslations {
    fn push(&mut self, key: &str, value: &str) {
        if self
            .values
            .insert(key.to_string(), value.to_string())
            .is_none()
        {
            self.order.push(key.to_string());
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v.as_str())))
    }

    fn clear(&mut self) {
        self.order.clear();
        self.values.clear();
    }
}

impl TranslationCache {
    pub(super) fn queue_for_disk(&self, key: &str, value: &str) {
        self.pending.lock().push(key, value);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Appends every queued pair to the output log and empties the queue. Returns how many
    /// pairs were written. On I/O failure the queue is left intact.
    pub fn flush(&self) -> anyhow::Result<usize> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Ok(0);
        }

        let path = &self.settings.output_file;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open output file: {}", path.display()))?;
        let is_new = file
            .metadata()
            .with_context(|| format!("Failed to stat output file: {}", path.display()))?
            .len()
            == 0;

        let mut writer = BufWriter::new(file);
        if is_new {
            writer.write_all(UTF8_BOM)?;
        }
        for (key, value) in pending.entries() {
            debug!("Persisting '{key}'");
            writeln!(writer, "{}", encode_entry(key, value))
                .with_context(|| format!("Failed to write to: {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush: {}", path.display()))?;

        let written = pending.len();
        pending.clear();
        info!("Wrote {written} new translation(s) to {}", path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;
    use crate::store::{Scope, TranslationType};

    #[test]
    fn queue_keeps_first_order_and_last_value() {
        let mut q = PendingTranslations::default();
        q.push("b", "1");
        q.push("a", "2");
        q.push("b", "3");
        let entries: Vec<_> = q.entries().collect();
        assert_eq!(entries, vec![("b", "3"), ("a", "2")]);
    }

    #[test]
    fn flush_appends_and_drains() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = CacheSettings::in_dir(dir.path());
        settings.use_static_translations = false;
        let mut cache = TranslationCache::new(settings);

        assert_eq!(cache.flush().unwrap(), 0);
        assert!(!cache.settings().output_file.exists());

        cache.add_translation_to_cache("a=b", "x\ny", true, TranslationType::Full, Scope::Global);
        assert_eq!(cache.flush().unwrap(), 1);
        assert_eq!(cache.pending_count(), 0);

        cache.add_translation_to_cache("c", "d", true, TranslationType::Full, Scope::Global);
        assert_eq!(cache.flush().unwrap(), 1);

        let bytes = std::fs::read(&cache.settings().output_file).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "a\\x3Db=x\\ny\nc=d\n");
    }

    #[test]
    fn failed_flush_keeps_queue() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = CacheSettings::in_dir(dir.path());
        settings.use_static_translations = false;
        settings.output_file = dir.path().join("log-dir");
        std::fs::create_dir_all(&settings.output_file).unwrap();
        let mut cache = TranslationCache::new(settings);

        cache.add_translation_to_cache("a", "b", true, TranslationType::Full, Scope::Global);
        cache.add_translation_to_cache("c", "d", true, TranslationType::Full, Scope::Global);
        assert!(cache.flush().is_err());
        assert_eq!(cache.pending_count(), 2);
        assert!(cache.flush().is_err());
        assert_eq!(cache.pending_count(), 2);
    }
}
