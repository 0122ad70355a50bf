use crate::textprep::to_simplified;
use plagscan_core::Snippet;

/// Length of the longest common contiguous run of characters in `a` and `b`.
///
/// Same result as scanning every start pair `(i, j)` and extending while `a[i+k] == b[j+k]`,
/// computed with a rolling DP row over the shorter string. Case-sensitive; counts chars.
pub fn longest_aligned_run(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if short.is_empty() {
        return 0;
    }

    // prev[j + 1] = length of the common run ending at (previous long char, short[j]).
    let mut prev = vec![0usize; short.len() + 1];
    let mut cur = vec![0usize; short.len() + 1];
    let mut best = 0usize;
    for x in long {
        for (j, y) in short.iter().enumerate() {
            cur[j + 1] = if x == y { prev[j] + 1 } else { 0 };
            best = best.max(cur[j + 1]);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Strict: a run equal to the threshold does not flag.
pub fn exceeds_threshold(run_length: usize, length_threshold: usize) -> bool {
    run_length > length_threshold
}

/// Score one fragment/snippet pair after simplified-script normalization of both sides.
pub fn normalized_run(fragment: &str, snippet: &str) -> usize {
    longest_aligned_run(&to_simplified(fragment), &to_simplified(snippet))
}

/// First snippet (in result order) whose run against `fragment` exceeds the threshold.
pub fn first_match<'a>(
    fragment: &str,
    snippets: &'a [Snippet],
    length_threshold: usize,
) -> Option<(&'a Snippet, usize)> {
    let simple_fragment = to_simplified(fragment);
    for s in snippets {
        let run = longest_aligned_run(&simple_fragment, &to_simplified(&s.text));
        if exceeds_threshold(run, length_threshold) {
            return Some((s, run));
        }
    }
    None
}
