use crate::task::TaskGroup;

pub const BUILD_KEYWORDS: &[&str] = &["build", "compile", "watch"];
pub const TEST_KEYWORDS: &[&str] = &["test"];

/// Group a task by keyword containment, ignoring case.
///
/// Build keywords are checked first, so a name matching both sets is Build.
pub fn classify(identifier: &str) -> Option<TaskGroup> {
    let name = identifier.to_lowercase();
    if BUILD_KEYWORDS.iter().any(|k| name.contains(k)) {
        Some(TaskGroup::Build)
    } else if TEST_KEYWORDS.iter().any(|k| name.contains(k)) {
        Some(TaskGroup::Test)
    } else {
        None
    }
}
