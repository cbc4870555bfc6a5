//! Pulls code and test cases out of free-form stage output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One input/expected pair found in stage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Call arguments, rendered as a parenthesized tuple.
    pub input: String,
    /// Expected return value.
    pub expected: String,
}

impl TestCase {
    /// Creates a test case.
    #[must_use]
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n?```").expect("valid regex"))
}

fn test_list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"test_cases\s*=\s*\[").expect("valid regex"))
}

fn comment_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#\s*Input:[ \t]*(.*?)[ \t]*\r?\n(?:[ \t]*\r?\n)*[ \t]*#\s*Expected Output:[ \t]*(.*?)[ \t]*\r?$")
            .expect("valid regex")
    })
}

fn assert_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*assert\s+[\w.]+\s*\((.*)\)\s*==\s*(.*?)(?:\s*,\s*["'].*)?[ \t]*\r?$"#)
            .expect("valid regex")
    })
}

/// Returns the trimmed body of the first fenced code block.
#[must_use]
pub fn extract_solution(text: &str) -> Option<String> {
    code_block_re()
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|code| !code.is_empty())
}

/// Returns every fenced code block body, in order.
#[must_use]
pub fn code_blocks(text: &str) -> Vec<&str> {
    code_block_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Extracts test cases from stage output.
///
/// Sources are tried in order and the first one that yields anything wins:
/// a `test_cases = [...]` list inside a code block, then `# Input:` /
/// `# Expected Output:` comment pairs, then `assert f(...) == expected`
/// lines.
#[must_use]
pub fn extract_test_cases(text: &str) -> Vec<TestCase> {
    let from_lists: Vec<TestCase> = code_blocks(text)
        .into_iter()
        .flat_map(test_cases_from_list)
        .collect();
    if !from_lists.is_empty() {
        return from_lists;
    }

    let from_comments: Vec<TestCase> = comment_pair_re()
        .captures_iter(text)
        .map(|caps| TestCase::new(caps[1].trim(), caps[2].trim()))
        .filter(|case| !case.input.is_empty() && !case.expected.is_empty())
        .collect();
    if !from_comments.is_empty() {
        return from_comments;
    }

    assert_re()
        .captures_iter(text)
        .map(|caps| TestCase::new(format!("({})", caps[1].trim()), caps[2].trim()))
        .collect()
}

/// Parses the tuples of a `test_cases = [...]` list.
///
/// Each tuple's last element is the expected value; the rest are the input.
fn test_cases_from_list(block: &str) -> Vec<TestCase> {
    let Some(found) = test_list_re().find(block) else {
        return Vec::new();
    };
    let Some(body) = balanced(&block[found.end() - 1..], '[', ']') else {
        return Vec::new();
    };

    split_top_level(body)
        .into_iter()
        .filter_map(|item| {
            let inner = item.strip_prefix('(')?.strip_suffix(')')?;
            let mut parts = split_top_level(inner);
            if parts.len() < 2 {
                return None;
            }
            let expected = parts.pop()?;
            Some(TestCase::new(format!("({})", parts.join(", ")), expected))
        })
        .collect()
}

/// Returns the text between an opening delimiter at the start of `text` and
/// its matching close.
fn balanced(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[open.len_utf8()..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on commas that are not nested in brackets or quotes.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_solution_python_fence() {
        let text = "Here is the code:\n```python\ndef add(a, b):\n    return a + b\n```\nDone.";
        assert_eq!(
            extract_solution(text).as_deref(),
            Some("def add(a, b):\n    return a + b")
        );
    }

    #[test]
    fn test_extract_solution_first_block_wins() {
        let text = "```\nfirst()\n```\n\n```python\nsecond()\n```";
        assert_eq!(extract_solution(text).as_deref(), Some("first()"));
    }

    #[test]
    fn test_extract_solution_none() {
        assert_eq!(extract_solution("no code here"), None);
        assert_eq!(extract_solution("```\n\n```"), None);
    }

    #[test]
    fn test_test_cases_from_list() {
        let text = "```python\ntest_cases = [\n    ([2, 7, 11, 15], 9, [0, 1]),\n    ([3, 2, 4], 6, [1, 2]),\n    (\"a,b\", ','),\n]\n```";
        let cases = extract_test_cases(text);

        assert_eq!(
            cases,
            vec![
                TestCase::new("([2, 7, 11, 15], 9)", "[0, 1]"),
                TestCase::new("([3, 2, 4], 6)", "[1, 2]"),
                TestCase::new("(\"a,b\")", "','"),
            ]
        );
    }

    #[test]
    fn test_test_cases_from_comments() {
        let text = "```python\n# Input: [2, 7, 11, 15], target = 9\n# Expected Output: [0, 1]\nprint(twoSum([2, 7, 11, 15], 9))\n\n# Input: [3, 3], target = 6\n# Expected Output: [0, 1]\n```";
        let cases = extract_test_cases(text);

        assert_eq!(
            cases,
            vec![
                TestCase::new("[2, 7, 11, 15], target = 9", "[0, 1]"),
                TestCase::new("[3, 3], target = 6", "[0, 1]"),
            ]
        );
    }

    #[test]
    fn test_test_cases_from_asserts() {
        let text = "assert is_match(\"aa\", \"a*\") == True\nassert reverse([1, 2]) == [2, 1], \"reverse failed\"\nassert solve((1, 2)) == 3";
        let cases = extract_test_cases(text);

        assert_eq!(
            cases,
            vec![
                TestCase::new("(\"aa\", \"a*\")", "True"),
                TestCase::new("([1, 2])", "[2, 1]"),
                TestCase::new("((1, 2))", "3"),
            ]
        );
    }

    #[test]
    fn test_list_takes_priority() {
        let text = "```python\ntest_cases = [(1, 2)]\n```\n# Input: 5\n# Expected Output: 6";
        assert_eq!(extract_test_cases(text), vec![TestCase::new("(1)", "2")]);
    }

    #[test]
    fn test_no_test_cases() {
        assert!(extract_test_cases("nothing to see").is_empty());
    }

    #[test]
    fn test_split_top_level_nesting() {
        assert_eq!(
            split_top_level("[1, 2], {'a': (3, 4)}, 'x,y'"),
            vec!["[1, 2]", "{'a': (3, 4)}", "'x,y'"]
        );
    }
}
