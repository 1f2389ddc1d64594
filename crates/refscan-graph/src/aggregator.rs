use crate::ErrorRecord;

/// Ordered, append-only collection of captured records.
///
/// Report lines are rendered when a record is captured, so they stay valid
/// after the host tears down the objects the record was taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAggregator {
    errors: Vec<ErrorRecord>,
    msgs: Vec<String>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, record: ErrorRecord) {
        self.msgs.push(record.to_line());
        self.errors.push(record);
    }

    /// Appends `other` after the records already held.
    pub fn merge(&mut self, other: ErrorAggregator) {
        self.errors.extend(other.errors);
        self.msgs.extend(other.msgs);
    }

    pub fn messages(&self) -> &[String] {
        &self.msgs
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ErrorRecord, &str)> {
        self.errors
            .iter()
            .zip(self.msgs.iter().map(String::as_str))
    }
}

impl Extend<ErrorRecord> for ErrorAggregator {
    fn extend<T: IntoIterator<Item = ErrorRecord>>(&mut self, iter: T) {
        for record in iter {
            self.capture(record);
        }
    }
}

impl FromIterator<ErrorRecord> for ErrorAggregator {
    fn from_iter<T: IntoIterator<Item = ErrorRecord>>(iter: T) -> Self {
        let mut errors = ErrorAggregator::new();
        errors.extend(iter);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeSnapshot;
    use refscan_core::ObjectId;

    fn template_record(name: &str) -> ErrorRecord {
        ErrorRecord::MissingTemplate {
            node: NodeSnapshot {
                id: ObjectId(1),
                name: name.to_string(),
                full_path: name.to_string(),
                asset_path: String::new(),
                root_asset_path: String::new(),
            },
            template_label: "Assets/A.prefab".into(),
        }
    }

    #[test]
    fn capture_renders_immediately() {
        let mut errors = ErrorAggregator::new();
        errors.capture(template_record("Crate"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.messages()[0], "Assets/A.prefab\tMissing prefab Crate\t");
    }

    #[test]
    fn merge_keeps_relative_order() {
        let mut a: ErrorAggregator = ["a1", "a2", "a3"].into_iter().map(template_record).collect();
        let b: ErrorAggregator = ["b1", "b2"].into_iter().map(template_record).collect();

        a.merge(b);

        let names: Vec<_> = a.records().iter().map(|r| r.node().name.as_str()).collect();
        assert_eq!(names, vec!["a1", "a2", "a3", "b1", "b2"]);
        assert_eq!(a.messages().len(), 5);
        assert!(a.messages()[3].contains("b1"));
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let mut a: ErrorAggregator = ["a1"].into_iter().map(template_record).collect();
        let before = a.clone();
        a.merge(ErrorAggregator::new());
        assert_eq!(a, before);
    }
}
