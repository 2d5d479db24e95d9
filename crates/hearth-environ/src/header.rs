/// An HTTP header as a name-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered collection of request headers.
///
/// Preserves arrival order and supports repeated header names
/// (e.g., `Accept` sent twice).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<Header>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Header::new(name, value));
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Get all header values matching `name` (case-insensitive), in arrival order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Distinct header names in first-seen order.
    ///
    /// Names differing only in ASCII case are the same header; the spelling
    /// of the first occurrence is reported.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for header in &self.entries {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&header.name)) {
                names.push(&header.name);
            }
        }
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Header> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| Header::new(n, v))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_insert_and_get() {
        let mut map = HeaderMap::new();
        map.insert("Content-Type", "text/html");
        assert_eq!(map.get("content-type"), Some("text/html"));
        assert_eq!(map.get("Content-Type"), Some("text/html"));
    }

    #[test]
    fn header_map_get_missing() {
        let map = HeaderMap::new();
        assert_eq!(map.get("X-Missing"), None);
        assert!(map.get_all("X-Missing").is_empty());
    }

    #[test]
    fn header_map_repeated_headers_keep_order() {
        let mut map = HeaderMap::new();
        map.insert("Accept", "x");
        map.insert("Host", "example.com");
        map.insert("accept", "y");

        assert_eq!(map.get("Accept"), Some("x"));
        assert_eq!(map.get_all("ACCEPT"), vec!["x", "y"]);
    }

    #[test]
    fn header_map_names_are_distinct_first_spelling() {
        let mut map = HeaderMap::new();
        map.insert("Accept", "x");
        map.insert("X-Foo", "1");
        map.insert("ACCEPT", "y");
        map.insert("X_Foo", "2");

        assert_eq!(map.names(), vec!["Accept", "X-Foo", "X_Foo"]);
    }

    #[test]
    fn header_map_len_and_empty() {
        let mut map = HeaderMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);

        map.insert("X-Test", "1");
        assert!(!map.is_empty());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn header_map_from_iterator() {
        let map: HeaderMap = vec![
            ("Host".to_string(), "example.com".to_string()),
            ("Accept".to_string(), "*/*".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("host"), Some("example.com"));
        assert_eq!(map.iter().next().map(|h| h.name.as_str()), Some("Host"));
    }
}
