/// Per-rule classification result: rule id to the items that rule matched.
///
/// Entries follow rule order and items follow input order. Rules with no
/// matches are omitted.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Classified<'m, T> {
    entries: Vec<(String, Vec<&'m T>)>,
}

impl<T> Default for Classified<'_, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<'m, T> Classified<'m, T> {
    /// Record a rule's matches. Empty buckets are dropped.
    pub(crate) fn push(&mut self, rule_id: &str, items: Vec<&'m T>) {
        if !items.is_empty() {
            self.entries.push((rule_id.to_owned(), items));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn get(&self, rule_id: &str) -> Option<&[&'m T]> {
        self.entries
            .iter()
            .find(|(id, _)| id == rule_id)
            .map(|(_, items)| items.as_slice())
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[&'m T])> {
        self.entries
            .iter()
            .map(|(id, items)| (id.as_str(), items.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buckets_are_dropped() {
        let a = 1;
        let mut classified: Classified<'_, i32> = Classified::default();
        classified.push("none", Vec::new());
        classified.push("one", vec![&a]);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified.get("one"), Some(&[&a][..]));
        assert_eq!(classified.get("none"), None);
        assert_eq!(classified.rule_ids().collect::<Vec<_>>(), vec!["one"]);
    }
}
