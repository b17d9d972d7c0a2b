//! Ordered keyword tables. Earlier rows win when a text matches several rows,
//! so the order of each table is part of its meaning.

use crate::classify::{BugType, CommitKind, Component, Priority, Severity};

pub const BUG_TYPES: &[(BugType, &[&str])] = &[
    (
        BugType::FunctionalError,
        &["function", "feature", "not working", "doesn't work", "broken", "incorrect"],
    ),
    (
        BugType::Performance,
        &["performance", "slow", "memory", "cpu", "leak", "timeout"],
    ),
    (
        BugType::Compatibility,
        &["compatibility", "version", "platform", "browser", "dependency"],
    ),
    (
        BugType::Security,
        &["security", "vulnerability", "exploit", "auth", "permission"],
    ),
    (BugType::Crash, &["crash", "exception", "error", "fail", "null"]),
    (
        BugType::Ui,
        &["ui", "interface", "display", "visual", "style", "layout"],
    ),
    (
        BugType::Build,
        &["build", "compile", "install", "deploy", "package"],
    ),
    (
        BugType::Data,
        &["data", "database", "storage", "corrupt", "invalid"],
    ),
];

pub const COMPONENTS: &[(Component, &[&str])] = &[
    (
        Component::Frontend,
        &["frontend", "ui", "interface", "css", "html", "javascript", "web"],
    ),
    (
        Component::Backend,
        &["backend", "server", "api", "service", "endpoint"],
    ),
    (
        Component::Database,
        &["database", "db", "sql", "storage", "data"],
    ),
    (
        Component::Auth,
        &["auth", "login", "permission", "security", "access"],
    ),
    (
        Component::BuildSystem,
        &["build", "ci", "pipeline", "deploy", "package"],
    ),
    (
        Component::Docs,
        &["doc", "documentation", "example", "comment"],
    ),
    (
        Component::Test,
        &["test", "testing", "unittest", "integration test"],
    ),
];

pub const SEVERITIES: &[(Severity, &[&str])] = &[
    (Severity::Critical, &["critical", "severe", "major", "high"]),
    (Severity::Medium, &["medium", "moderate", "normal"]),
    (Severity::Minor, &["minor", "low", "trivial"]),
];

pub const PRIORITIES: &[(Priority, &[&str])] = &[
    (Priority::P0, &["p0", "critical", "blocker"]),
    (Priority::P1, &["p1", "high", "important"]),
    (Priority::P2, &["p2", "medium", "normal"]),
    (Priority::P3, &["p3", "low", "minor"]),
];

pub const REPRODUCTION_MARKERS: &[&str] = &[
    "steps to reproduce",
    "reproduction steps",
    "how to reproduce",
    "to reproduce",
    "steps:",
    "reproduce:",
];

pub const COMMIT_KINDS: &[(CommitKind, &[&str])] = &[
    (CommitKind::Fix, &["fix", "bug"]),
    (CommitKind::Feature, &["feat", "feature"]),
    (CommitKind::Docs, &["docs", "documentation"]),
    (CommitKind::Test, &["test"]),
    (CommitKind::Refactor, &["refactor"]),
];
