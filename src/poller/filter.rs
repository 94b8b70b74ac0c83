use crate::platform::types::WorkItem;
use crate::store::ProcessedSet;

/// Why an item was or was not selected for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    /// Authored by someone other than the configured actor.
    ForeignAuthor,
    /// Already recorded in the processed set for its kind.
    AlreadyProcessed,
}

/// Label and author jointly mark an item as ours; the processed set keeps
/// it from being handled twice.
pub fn classify(item: &WorkItem, actor: &str, processed: &ProcessedSet) -> Verdict {
    if item.author != actor {
        Verdict::ForeignAuthor
    } else if processed.contains(item.kind, item.number) {
        Verdict::AlreadyProcessed
    } else {
        Verdict::Eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::types::ItemKind;

    fn item(number: u64, kind: ItemKind, author: &str) -> WorkItem {
        WorkItem {
            number,
            kind,
            author: author.to_string(),
            title: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_foreign_author_rejected_even_if_unprocessed() {
        let processed = ProcessedSet::default();
        assert_eq!(
            classify(&item(1, ItemKind::Issue, "mallory"), "me", &processed),
            Verdict::ForeignAuthor
        );
        assert_eq!(
            classify(&item(1, ItemKind::PullRequest, "Me"), "me", &processed),
            Verdict::ForeignAuthor
        );
    }

    #[test]
    fn test_processed_lookup_is_per_kind() {
        let mut processed = ProcessedSet::default();
        processed.issues.insert(42);

        assert_eq!(
            classify(&item(42, ItemKind::Issue, "me"), "me", &processed),
            Verdict::AlreadyProcessed
        );
        assert_eq!(
            classify(&item(42, ItemKind::PullRequest, "me"), "me", &processed),
            Verdict::Eligible
        );
    }
}
