use regex::Regex;

/// Ordered (pattern, value) rows matched against a lower-cased image name.
/// Patterns overlap, so the first matching row wins.
pub struct PatternTable<T> {
    rows: Vec<(Regex, T)>,
}

impl<T> PatternTable<T> {
    pub fn new(rows: impl IntoIterator<Item = (&'static str, T)>) -> Self {
        let rows = rows
            .into_iter()
            .map(|(pattern, value)| (Regex::new(pattern).expect("static image pattern"), value))
            .collect();
        Self { rows }
    }

    pub fn lookup(&self, image: &str) -> Option<&T> {
        let image = image.to_lowercase();
        self.rows.iter().find(|(re, _)| re.is_match(&image)).map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let table = PatternTable::new([("arch", 1), ("blackarch", 2)]);
        assert_eq!(table.lookup("docker.io/BlackArch/blackarch"), Some(&1));
        assert_eq!(table.lookup("fedora"), None);
    }
}
