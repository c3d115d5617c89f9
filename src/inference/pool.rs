/// Ordered pool of quota-scoped credentials for the inference service.
///
/// Position is priority: index 0 is tried first, rotation only ever moves
/// forward. Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CredentialPool {
    credentials: Vec<String>,
}

/// Values that mean "slot not really configured".
const PLACEHOLDER_MARKERS: &[&str] = &["your_api_key", "changeme", "placeholder"];

impl CredentialPool {
    /// Build from an ordered, possibly sparse slot list, dropping entries
    /// that are empty after trim or an obvious placeholder.
    pub fn from_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let credentials = slots
            .into_iter()
            .filter_map(|s| {
                let trimmed = s.as_ref().trim();
                if trimmed.is_empty() || is_placeholder(trimmed) {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();
        Self { credentials }
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.credentials.get(index).map(String::as_str)
    }
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lower == *m)
}
