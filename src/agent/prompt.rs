/// Task for an issue: the issue body verbatim.
pub fn task_for_issue(issue_body: &str) -> String {
    issue_body.to_string()
}

/// Task for reviewing a pull request against its fetched diff.
pub fn task_for_review(
    pr_number: u64,
    pr_title: &str,
    pr_body: &str,
    diff: &str,
    review_file: &str,
) -> String {
    format!(
        "Pull Request #{pr_number}: {pr_title}\n\n{pr_body}\n\nDiff:\n{diff}\n\nThis is a code review task. Please review the changes and put any comments in {review_file}."
    )
}
