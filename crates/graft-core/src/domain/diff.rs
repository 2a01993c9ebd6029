//! Line-based unified diffs of planned file changes.

use serde::Serialize;

use crate::domain::entities::changeset::FileChange;
use crate::domain::entities::common::RelativePath;

/// Above this many cells the LCS table is skipped and the changed middle is
/// shown as one replace hunk.
const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Created,
    Modified,
}

/// Rendered diff of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub path: RelativePath,
    pub status: DiffStatus,
    pub insertions: usize,
    pub deletions: usize,
    pub unified: String,
}

impl FileDiff {
    pub fn of(change: &FileChange, context: usize) -> Self {
        let name = change.path.to_string();
        let (old_label, status) = match change.before {
            Some(_) => (format!("a/{name}"), DiffStatus::Modified),
            None => ("/dev/null".to_string(), DiffStatus::Created),
        };
        let before = change.before.as_deref().unwrap_or("");
        let ops = edit_script(&lines(before), &lines(&change.after));

        let mut unified = format!("--- {old_label}\n+++ b/{name}\n");
        unified.push_str(&render_hunks(&ops, context));

        Self {
            path: change.path.clone(),
            status,
            insertions: ops.iter().filter(|o| o.tag == Tag::Insert).count(),
            deletions: ops.iter().filter(|o| o.tag == Tag::Delete).count(),
            unified,
        }
    }
}

fn lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Equal,
    Delete,
    Insert,
}

/// One line of the edit script. `old`/`new` count the lines of each side
/// consumed before this one.
#[derive(Debug, Clone, Copy)]
struct Op<'a> {
    tag: Tag,
    old: usize,
    new: usize,
    line: &'a str,
}

fn edit_script<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Op<'a>> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (am, bm) = (&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]);

    let mut ops = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    let mut push = |tag, line, i: &mut usize, j: &mut usize| {
        ops.push(Op { tag, old: *i, new: *j, line });
        match tag {
            Tag::Equal => {
                *i += 1;
                *j += 1;
            }
            Tag::Delete => *i += 1,
            Tag::Insert => *j += 1,
        }
    };

    for line in &a[..prefix] {
        push(Tag::Equal, *line, &mut i, &mut j);
    }

    if am.len().saturating_mul(bm.len()) <= MAX_LCS_CELLS {
        // lcs[x][y] = LCS length of am[x..] and bm[y..]
        let width = bm.len() + 1;
        let mut lcs = vec![0u32; (am.len() + 1) * width];
        for x in (0..am.len()).rev() {
            for y in (0..bm.len()).rev() {
                lcs[x * width + y] = if am[x] == bm[y] {
                    lcs[(x + 1) * width + y + 1] + 1
                } else {
                    lcs[(x + 1) * width + y].max(lcs[x * width + y + 1])
                };
            }
        }
        let (mut x, mut y) = (0, 0);
        while x < am.len() || y < bm.len() {
            if x < am.len() && y < bm.len() && am[x] == bm[y] {
                push(Tag::Equal, am[x], &mut i, &mut j);
                x += 1;
                y += 1;
            } else if x < am.len()
                && (y == bm.len() || lcs[(x + 1) * width + y] >= lcs[x * width + y + 1])
            {
                push(Tag::Delete, am[x], &mut i, &mut j);
                x += 1;
            } else {
                push(Tag::Insert, bm[y], &mut i, &mut j);
                y += 1;
            }
        }
    } else {
        for line in am {
            push(Tag::Delete, *line, &mut i, &mut j);
        }
        for line in bm {
            push(Tag::Insert, *line, &mut i, &mut j);
        }
    }

    for line in &a[a.len() - suffix..] {
        push(Tag::Equal, *line, &mut i, &mut j);
    }
    ops
}

fn render_hunks(ops: &[Op<'_>], context: usize) -> String {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, o)| o.tag != Tag::Equal)
        .map(|(k, _)| k)
        .collect();

    let mut out = String::new();
    let mut k = 0;
    while k < changes.len() {
        let mut last = changes[k];
        let mut next = k + 1;
        while next < changes.len() && changes[next] - last <= 2 * context + 1 {
            last = changes[next];
            next += 1;
        }
        let start = changes[k].saturating_sub(context);
        let end = (last + context + 1).min(ops.len());
        write_hunk(&mut out, &ops[start..end]);
        k = next;
    }
    out
}

fn write_hunk(out: &mut String, hunk: &[Op<'_>]) {
    let Some(first) = hunk.first() else { return };
    let old_len = hunk.iter().filter(|o| o.tag != Tag::Insert).count();
    let new_len = hunk.iter().filter(|o| o.tag != Tag::Delete).count();
    // An empty range is reported at the line before it.
    let start = |at: usize, len: usize| if len == 0 { at } else { at + 1 };
    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        start(first.old, old_len),
        old_len,
        start(first.new, new_len),
        new_len
    ));
    for op in hunk {
        out.push(match op.tag {
            Tag::Equal => ' ',
            Tag::Delete => '-',
            Tag::Insert => '+',
        });
        out.push_str(op.line);
        if !op.line.ends_with('\n') {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(before: Option<&str>, after: &str) -> FileChange {
        FileChange {
            path: RelativePath::try_new("cfg.json").unwrap(),
            before: before.map(String::from),
            after: after.to_string(),
            operations: Vec::new(),
        }
    }

    #[test]
    fn single_inserted_line() {
        let diff = FileDiff::of(&change(Some("a\nb\nc\n"), "a\nb\nX\nc\n"), 1);
        assert_eq!(
            diff.unified,
            "--- a/cfg.json\n+++ b/cfg.json\n@@ -2,2 +2,3 @@\n b\n+X\n c\n"
        );
        assert_eq!((diff.insertions, diff.deletions), (1, 0));
        assert_eq!(diff.status, DiffStatus::Modified);
    }

    #[test]
    fn new_file_diffs_against_dev_null() {
        let diff = FileDiff::of(&change(None, "one\ntwo\n"), 3);
        assert_eq!(
            diff.unified,
            "--- /dev/null\n+++ b/cfg.json\n@@ -0,0 +1,2 @@\n+one\n+two\n"
        );
        assert_eq!(diff.status, DiffStatus::Created);
    }

    #[test]
    fn missing_final_newline_is_marked() {
        let diff = FileDiff::of(&change(Some("a"), "b"), 3);
        assert_eq!(
            diff.unified,
            "--- a/cfg.json\n+++ b/cfg.json\n@@ -1,1 +1,1 @@\n-a\n\\ No newline at end of file\n+b\n\\ No newline at end of file\n"
        );
    }

    #[test]
    fn distant_changes_make_separate_hunks() {
        let before: String = (0..20).map(|i| format!("{i}\n")).collect();
        let after: String = (0..20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                17 => "seventeen\n".to_string(),
                _ => format!("{i}\n"),
            })
            .collect();
        let diff = FileDiff::of(&change(Some(&before), &after), 2);
        assert_eq!(diff.unified.matches("@@ -").count(), 2);
        assert_eq!((diff.insertions, diff.deletions), (2, 2));
    }
}
