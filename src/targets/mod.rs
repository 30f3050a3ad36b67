use std::sync::{PoisonError, RwLock};

/// Whether `url` is something the probe executor can GET.
pub fn is_probeable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Ordered, deduplicated set of URLs probed every round.
///
/// Entries are only ever added: a working fallback URL discovered during a round
/// is appended and probed directly from the next round on.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    urls: RwLock<Vec<String>>,
}

impl TargetRegistry {
    /// Build the initial set from the primary URL followed by the backups.
    /// Empty entries and anything without an http(s) scheme are dropped, duplicates keep
    /// their first position.
    pub fn new(primary: Option<&str>, backups: &[String]) -> Self {
        let mut urls: Vec<String> = Vec::new();

        let candidates = primary.into_iter().chain(backups.iter().map(String::as_str));
        for url in candidates.map(str::trim) {
            if is_probeable(url) && !urls.iter().any(|known| known == url) {
                urls.push(url.to_string());
            }
        }

        Self {
            urls: RwLock::new(urls),
        }
    }

    /// Adds `url` unless it is already present. Returns whether it was added.
    pub fn append(&self, url: &str) -> bool {
        let mut urls = self.urls.write().unwrap_or_else(PoisonError::into_inner);
        if urls.iter().any(|known| known == url) {
            return false;
        }
        urls.push(url.to_string());
        true
    }

    /// Copy of the current entries, in insertion order.
    pub fn snapshot(&self) -> Vec<String> {
        self.urls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.urls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
