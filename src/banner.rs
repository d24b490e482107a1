use console::{measure_text_width, style};
use std::iter;

use crate::rewrite::Operation;

/// Prints a framed, colorized warning describing the rewrite about to run.
///
/// The box is sized to the widest **visible** line, using
/// [`console::measure_text_width`] so ANSI codes in the content do not skew
/// the padding. Borders are styled independently from the content.
pub fn print_banner(repo: &str, operation: Operation, commits: usize) {
    let lines = banner_lines(repo, operation, commits);

    let max_width = lines
        .iter()
        .map(|l| measure_text_width(l)) // ignore ANSI in content
        .max()
        .unwrap_or(0)
        + 2;

    let border = "═".repeat(max_width);
    let top = style(format!("╔{}╗", border)).blue().bold();
    let bottom = style(format!("╚{}╝", border)).blue().bold();
    let left = style("║ ").blue().bold().to_string();
    let right = style("║").blue().bold().to_string();

    println!();
    println!("{top}");
    for line in lines {
        let visible = measure_text_width(&line);
        let pad = max_width - visible; // includes the one space after left border
        println!("{}{}{}{}", left, line, " ".repeat(pad - 1), right);
    }
    println!("{bottom}");
    println!();
}

fn describe(operation: Operation) -> &'static str {
    match operation {
        Operation::Authors => "Change commit authors",
        Operation::Messages => "Replace commit messages with generated ones",
        Operation::Dates => "Spread commit dates over a new range",
    }
}

/// Lines of the banner, some carrying ANSI styling.
fn banner_lines(repo: &str, operation: Operation, commits: usize) -> Vec<String> {
    let top = ["fakit: rewrite git history with git filter-branch", ""]
        .into_iter()
        .map(|s| s.to_string());

    let summary = [
        format!("Repository: {repo}"),
        format!("Operation:  {}", describe(operation)),
        format!("Commits:    {commits} (all refs)"),
    ]
    .into_iter();

    let warning = iter::once(String::new())
        .chain(iter::once(
            style("WARNING: this is destructive! Make a backup first.")
                .yellow()
                .bold()
                .to_string(),
        ))
        .chain(iter::once(
            style("Old commits stay under refs/original/ until cleanup.")
                .yellow()
                .to_string(),
        ))
        .chain(iter::once(
            "Remember to force-push if the repository has a remote.".to_string(),
        ));

    top.chain(summary).chain(warning).collect()
}

#[cfg(test)]
mod tests {
    use super::banner_lines;
    use crate::rewrite::Operation;

    #[test]
    fn banner_names_repo_operation_and_count() {
        let lines = banner_lines("/tmp/project", Operation::Dates, 12);
        let s = lines.join("\n");

        assert!(s.contains("Repository: /tmp/project"));
        assert!(s.contains("Spread commit dates over a new range"));
        assert!(s.contains("Commits:    12 (all refs)"));
        assert!(s.contains("Make a backup first."));
    }

    #[test]
    fn banner_describes_each_operation() {
        for (op, text) in [
            (Operation::Authors, "Change commit authors"),
            (Operation::Messages, "Replace commit messages"),
        ] {
            let s = banner_lines("repo", op, 1).join("\n");
            assert!(s.contains(text));
        }
    }
}
