use std::fmt;

use common::text::searchable_text;
use normalizer::ActivityEntity;
use once_cell::sync::Lazy;
use regex::RegexSet;
use serde::Serialize;

use crate::keywords;

macro_rules! tag_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tag_enum!(BugType {
    FunctionalError => "functional_error",
    Performance => "performance",
    Compatibility => "compatibility",
    Security => "security",
    Crash => "crash",
    Ui => "ui",
    Build => "build",
    Data => "data",
    Other => "other",
});

tag_enum!(Component {
    Frontend => "frontend",
    Backend => "backend",
    Database => "database",
    Auth => "auth",
    BuildSystem => "build_system",
    Docs => "docs",
    Test => "test",
    Other => "other",
});

tag_enum!(Severity {
    Critical => "critical",
    Medium => "medium",
    Minor => "minor",
    Unspecified => "unspecified",
});

tag_enum!(Priority {
    P0 => "P0",
    P1 => "P1",
    P2 => "P2",
    P3 => "P3",
    Unspecified => "unspecified",
});

tag_enum!(CommitKind {
    Fix => "fix",
    Feature => "feature",
    Docs => "docs",
    Test => "test",
    Refactor => "refactor",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    pub bug_type: BugType,
    pub component: Component,
    pub severity: Severity,
    pub priority: Priority,
    pub has_reproduction: bool,
}

/// One ordered keyword table compiled into a single set of alternations.
struct KeywordRules<T: 'static> {
    categories: Vec<T>,
    set: RegexSet,
}

impl<T: Copy> KeywordRules<T> {
    fn new(table: &[(T, &[&str])]) -> Self {
        let patterns = table.iter().map(|(_, words)| {
            words
                .iter()
                .map(|word| regex::escape(word))
                .collect::<Vec<_>>()
                .join("|")
        });
        Self {
            categories: table.iter().map(|(category, _)| *category).collect(),
            set: RegexSet::new(patterns).expect("keyword tables are valid patterns"),
        }
    }

    /// Index of the earliest row with a substring hit. `SetMatches` iterates ascending.
    fn first_index(&self, haystack: &str) -> Option<usize> {
        self.set.matches(haystack).iter().next()
    }

    fn first_match(&self, haystack: &str) -> Option<T> {
        self.first_index(haystack).map(|idx| self.categories[idx])
    }

    /// Earliest row matching any of the haystacks.
    fn first_match_any<'h>(&self, haystacks: impl IntoIterator<Item = &'h str>) -> Option<T> {
        haystacks
            .into_iter()
            .filter_map(|haystack| self.first_index(haystack))
            .min()
            .map(|idx| self.categories[idx])
    }
}

static BUG_TYPES: Lazy<KeywordRules<BugType>> = Lazy::new(|| KeywordRules::new(keywords::BUG_TYPES));
static COMPONENTS: Lazy<KeywordRules<Component>> =
    Lazy::new(|| KeywordRules::new(keywords::COMPONENTS));
static SEVERITIES: Lazy<KeywordRules<Severity>> =
    Lazy::new(|| KeywordRules::new(keywords::SEVERITIES));
static PRIORITIES: Lazy<KeywordRules<Priority>> =
    Lazy::new(|| KeywordRules::new(keywords::PRIORITIES));
static COMMIT_KINDS: Lazy<KeywordRules<CommitKind>> =
    Lazy::new(|| KeywordRules::new(keywords::COMMIT_KINDS));

/// Tags an issue-like record from its text and labels. Total and deterministic.
pub fn classify<I, S>(title: &str, body: &str, labels: I) -> Classification
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let text = searchable_text(title, body);
    let labels: Vec<String> = labels
        .into_iter()
        .map(|label| label.as_ref().to_lowercase())
        .collect();

    Classification {
        bug_type: BUG_TYPES.first_match(&text).unwrap_or(BugType::Other),
        component: COMPONENTS.first_match(&text).unwrap_or(Component::Other),
        severity: SEVERITIES
            .first_match_any(labels.iter().map(String::as_str))
            .unwrap_or(Severity::Unspecified),
        priority: PRIORITIES
            .first_match_any(labels.iter().map(String::as_str))
            .unwrap_or(Priority::Unspecified),
        has_reproduction: has_reproduction(body),
    }
}

/// Issues and pull requests are classified; comments and reviews are not.
pub fn classify_entity(entity: &ActivityEntity) -> Option<Classification> {
    entity
        .kind()
        .is_issue_like()
        .then(|| classify(&entity.title, &entity.body, &entity.labels))
}

pub fn has_reproduction(body: &str) -> bool {
    if body.is_empty() {
        return false;
    }
    let lower = body.to_lowercase();
    keywords::REPRODUCTION_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

pub fn classify_commit_message(message: &str) -> CommitKind {
    COMMIT_KINDS
        .first_match(&message.to_lowercase())
        .unwrap_or(CommitKind::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LABELS: [&str; 0] = [];

    #[test]
    fn security_is_checked_before_crash() {
        let result = classify(
            "Vulnerability in parser",
            "throws an exception on crafted input",
            NO_LABELS,
        );
        assert_eq!(result.bug_type, BugType::Security);
    }

    #[test]
    fn functional_error_wins_over_everything_after_it() {
        let result = classify("Feature broken", "slow and crashes with error", NO_LABELS);
        assert_eq!(result.bug_type, BugType::FunctionalError);
    }

    #[test]
    fn unmatched_text_is_other() {
        let result = classify("Hello", "just saying hi", NO_LABELS);
        assert_eq!(result.bug_type, BugType::Other);
        assert_eq!(result.component, Component::Other);
        assert_eq!(result.severity, Severity::Unspecified);
        assert_eq!(result.priority, Priority::Unspecified);
        assert!(!result.has_reproduction);
    }

    #[test]
    fn empty_input_is_still_classified() {
        let result = classify("", "", NO_LABELS);
        assert_eq!(result.bug_type, BugType::Other);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        // "fail" outranks "build"; "ui" hides inside "building".
        let result = classify("BUILDING fails", "", NO_LABELS);
        assert_eq!(result.bug_type, BugType::Crash);
        assert_eq!(result.component, Component::Frontend);
    }

    #[test]
    fn component_order_is_respected() {
        let result = classify("Server returns 500", "sql query in the backend", NO_LABELS);
        assert_eq!(result.component, Component::Backend);
        let result = classify("Login page", "cannot sign in", NO_LABELS);
        assert_eq!(result.component, Component::Auth);
    }

    #[test]
    fn severity_takes_first_tier_across_all_labels() {
        let result = classify("", "", ["Severity: Low", "impact/HIGH"]);
        assert_eq!(result.severity, Severity::Critical);
        let result = classify("", "", ["normal"]);
        assert_eq!(result.severity, Severity::Medium);
    }

    #[test]
    fn priority_tiers_overlap_with_severity_words() {
        let result = classify("", "", ["critical"]);
        assert_eq!(result.priority, Priority::P0);
        assert_eq!(result.severity, Severity::Critical);
        let result = classify("", "", ["minor"]);
        assert_eq!(result.priority, Priority::P3);
        assert_eq!(result.severity, Severity::Minor);
        let result = classify("", "", ["P2"]);
        assert_eq!(result.priority, Priority::P2);
    }

    #[test]
    fn reproduction_markers_are_detected() {
        assert!(has_reproduction("Steps to Reproduce\n1. open"));
        assert!(has_reproduction("reproduce: run `cargo test`"));
        assert!(!has_reproduction("it just broke"));
        assert!(!has_reproduction(""));
    }

    #[test]
    fn classification_is_deterministic() {
        let labels = ["bug", "P1", "area/ui"];
        let first = classify("Memory leak", "steps: open and wait", labels);
        for _ in 0..10 {
            assert_eq!(classify("Memory leak", "steps: open and wait", labels), first);
        }
        assert_eq!(first.bug_type, BugType::Performance);
        assert!(first.has_reproduction);
    }

    #[test]
    fn commit_messages_are_bucketed() {
        assert_eq!(classify_commit_message("Fix null deref"), CommitKind::Fix);
        assert_eq!(classify_commit_message("feat: add cache"), CommitKind::Feature);
        assert_eq!(classify_commit_message("docs: readme"), CommitKind::Docs);
        assert_eq!(classify_commit_message("add tests"), CommitKind::Test);
        assert_eq!(classify_commit_message("Refactor pager"), CommitKind::Refactor);
        assert_eq!(classify_commit_message("bump version"), CommitKind::Other);
    }
}
