//! Line-oriented unified diff between two summary versions
//!
//! The output is context for the oracle, not a patch format anyone parses,
//! but it follows the usual `---`/`+++`/`@@` layout so models read it well.

const FROM_FILE: &str = "initial_summary.txt";
const TO_FILE: &str = "edited_summary.txt";
const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// One line of the edit script, with positions in `before` and `after`
#[derive(Debug, Clone, Copy)]
struct Edit {
    op: Op,
    old: usize,
    new: usize,
}

/// Compute a unified-diff style delta from `before` to `after`.
///
/// Returns an empty string when the two texts have identical lines.
pub fn compute_delta(before: &str, after: &str) -> String {
    let old: Vec<&str> = before.split_inclusive('\n').collect();
    let new: Vec<&str> = after.split_inclusive('\n').collect();

    let edits = edit_script(&old, &new);
    if edits.iter().all(|e| e.op == Op::Equal) {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("--- {}\n+++ {}\n", FROM_FILE, TO_FILE));

    for (start, end) in hunks(&edits) {
        let slice = &edits[start..end];
        let old_start = slice.iter().map(|e| e.old).min().unwrap_or(0);
        let new_start = slice.iter().map(|e| e.new).min().unwrap_or(0);
        let old_len = slice.iter().filter(|e| e.op != Op::Insert).count();
        let new_len = slice.iter().filter(|e| e.op != Op::Delete).count();

        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        ));

        for edit in slice {
            let (marker, line) = match edit.op {
                Op::Equal => (' ', old[edit.old]),
                Op::Delete => ('-', old[edit.old]),
                Op::Insert => ('+', new[edit.new]),
            };
            out.push(marker);
            out.push_str(line.trim_end_matches(['\n', '\r']));
            out.push('\n');
        }
    }

    out
}

/// `start,len` in 1-based form; a single line omits the length and an empty
/// range points at the line before it.
fn format_range(start: usize, len: usize) -> String {
    let beginning = start + 1;
    match len {
        1 => beginning.to_string(),
        0 => format!("{},0", beginning - 1),
        _ => format!("{},{}", beginning, len),
    }
}

/// Longest-common-subsequence edit script. Summaries are a handful of
/// lines, so the quadratic table is fine.
fn edit_script(old: &[&str], new: &[&str]) -> Vec<Edit> {
    let (n, m) = (old.len(), new.len());
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            edits.push(Edit { op: Op::Equal, old: i, new: j });
            i += 1;
            j += 1;
        } else if j < m && (i == n || lcs[i][j + 1] > lcs[i + 1][j]) {
            edits.push(Edit { op: Op::Insert, old: i, new: j });
            j += 1;
        } else {
            edits.push(Edit { op: Op::Delete, old: i, new: j });
            i += 1;
        }
    }
    edits
}

/// Group changes into hunks with surrounding context, as `[start, end)`
/// index ranges into the edit script.
fn hunks(edits: &[Edit]) -> Vec<(usize, usize)> {
    let changed: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, e)| e.op != Op::Equal)
        .map(|(i, _)| i)
        .collect();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for idx in changed {
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = (idx + CONTEXT_LINES + 1).min(edits.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => ranges.push((start, end)),
        }
    }
    ranges
}
