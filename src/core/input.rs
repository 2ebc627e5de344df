/// Default bindings, left to right.
pub const DEFAULT_KEYS: [char; 4] = ['d', 'f', 'j', 'k'];

/// Maps keyboard characters to lane indices. Keys outside the map are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMap {
    keys: Vec<char>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self { keys: DEFAULT_KEYS.to_vec() }
    }
}

impl KeyMap {
    pub fn new(keys: impl IntoIterator<Item = char>) -> Self {
        Self {
            keys: keys.into_iter().map(|c| c.to_ascii_lowercase()).collect(),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.keys.len()
    }

    #[inline(always)]
    pub fn lane_for(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_lowercase();
        self.keys.iter().position(|&k| k == key)
    }

    pub fn key_for(&self, lane: usize) -> Option<char> {
        self.keys.get(lane).copied()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.keys.is_empty() {
            return Err("Keys must bind at least one lane".to_string());
        }
        let duplicate = self.keys.iter().enumerate().find(|(i, k)| self.keys[..*i].contains(k));
        if let Some((i, key)) = duplicate {
            return Err(format!("Key '{}' is bound twice (lane {})", key, i));
        }
        Ok(())
    }
}

impl std::fmt::Display for KeyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: String = self.keys.iter().collect();
        f.write_str(&keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_cover_four_lanes() {
        let map = KeyMap::default();
        assert_eq!(map.lane_count(), 4);
        for (i, key) in DEFAULT_KEYS.iter().enumerate() {
            assert_eq!(map.lane_for(*key), Some(i));
            assert_eq!(map.key_for(i), Some(*key));
        }
        assert_eq!(map.key_for(4), None);
    }

    #[test]
    fn keys_are_case_insensitive_and_unknown_keys_dropped() {
        let map = KeyMap::default();
        assert_eq!(map.lane_for('J'), Some(2));
        assert_eq!(map.lane_for('a'), None);
        assert_eq!(map.lane_for(' '), None);
    }

    #[test]
    fn custom_layout() {
        let map = KeyMap::new("SDFJKL".chars());
        assert_eq!(map.lane_count(), 6);
        assert_eq!(map.lane_for('l'), Some(5));
        assert_eq!(map.lane_for('d'), Some(1));
        assert_eq!(map.to_string(), "sdfjkl");
    }

    #[test]
    fn duplicate_bindings_are_rejected() {
        assert!(KeyMap::new("dfjd".chars()).validate().is_err());
        assert!(KeyMap::new("".chars()).validate().is_err());
        assert!(KeyMap::default().validate().is_ok());
    }
}
