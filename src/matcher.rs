use crate::error::{Error, Result};

/// Resource pattern, classified once at parse time.
///
/// The four shapes are mutually exclusive:
///
/// - `Global`: the pattern `*`, matching any candidate including across
///   segment boundaries.
/// - `Multi`: a pattern containing exactly one `**`, matched by literal
///   prefix/suffix comparison. The wildcard may absorb zero or more
///   segments.
/// - `Glob`: any other pattern containing wildcard characters; each
///   dot-delimited segment is glob-matched independently, so `*` and `?`
///   never cross a `.`.
/// - `Literal`: no wildcard characters, exact string equality.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResourcePattern {
    Global,
    Multi {
        prefix: String,
        suffix: String,
        /// Candidate form with the separator around `**` collapsed,
        /// used when the wildcard absorbs zero segments.
        collapsed: Option<String>,
    },
    Glob(Vec<String>),
    Literal(String),
}

impl ResourcePattern {
    /// Parses and validates a pattern string.
    ///
    /// Rejects patterns with more than one `**` occurrence and malformed
    /// glob segments (unbalanced brackets, dangling escapes). Malformed
    /// authorization data must surface as an error, never as a silent
    /// mismatch.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            return Ok(Self::Global);
        }

        let multi_count = pattern.match_indices("**").count();
        if multi_count > 1 {
            return Err(Error::InvalidPattern(format!(
                "at most one `**` is supported: {pattern}"
            )));
        }
        if multi_count == 1 {
            let (prefix, suffix) = pattern
                .split_once("**")
                .expect("occurrence count checked above");
            let collapsed = match (prefix.strip_suffix('.'), suffix.strip_prefix('.')) {
                (Some(head), _) => Some(format!("{head}{suffix}")),
                (None, Some(tail)) => Some(format!("{prefix}{tail}")),
                (None, None) => None,
            };
            return Ok(Self::Multi {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
                collapsed,
            });
        }

        if pattern.contains(['*', '?', '[', '\\']) {
            let segments: Vec<String> = pattern.split('.').map(str::to_string).collect();
            for segment in &segments {
                validate_segment(segment)
                    .map_err(|reason| Error::InvalidPattern(format!("{reason}: {pattern}")))?;
            }
            return Ok(Self::Glob(segments));
        }

        Ok(Self::Literal(pattern.to_string()))
    }

    /// Tests whether the pattern covers a concrete resource path.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Global => true,
            Self::Multi {
                prefix,
                suffix,
                collapsed,
            } => {
                if candidate.starts_with(prefix.as_str())
                    && candidate.ends_with(suffix.as_str())
                    && candidate.len() >= prefix.len() + suffix.len()
                {
                    return true;
                }
                collapsed.as_deref() == Some(candidate)
            }
            Self::Glob(segments) => {
                let parts: Vec<&str> = candidate.split('.').collect();
                parts.len() == segments.len()
                    && segments
                        .iter()
                        .zip(&parts)
                        .all(|(segment, part)| segment_matches(segment, part))
            }
            Self::Literal(literal) => literal == candidate,
        }
    }
}

/// Checks a single glob segment for structural validity.
fn validate_segment(segment: &str) -> std::result::Result<(), &'static str> {
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if i + 1 >= chars.len() {
                    return Err("dangling escape");
                }
                i += 2;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => i = end,
                None => return Err("unbalanced bracket expression"),
            },
            _ => i += 1,
        }
    }
    Ok(())
}

/// Returns the index just past the `]` closing the class at `start`,
/// or `None` if the class never closes. An empty class is malformed;
/// `]` as the first item is literal.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if i < chars.len() && matches!(chars[i], '^' | '!') {
        i += 1;
    }
    let mut items = 0;
    while i < chars.len() {
        match chars[i] {
            ']' if items > 0 => return Some(i + 1),
            '\\' => {
                if i + 1 >= chars.len() {
                    return None;
                }
                i += 2;
                items += 1;
            }
            _ => {
                i += 1;
                items += 1;
            }
        }
    }
    None
}

/// Matches one character against the class starting at `start`.
/// Returns (matched, index past the class).
fn class_matches(chars: &[char], start: usize, ch: char) -> Option<(bool, usize)> {
    let end = class_end(chars, start)?;
    let items_end = end - 1;
    let mut i = start + 1;
    let mut negated = false;
    if matches!(chars[i], '^' | '!') {
        negated = true;
        i += 1;
    }

    let mut matched = false;
    while i < items_end {
        let lo = if chars[i] == '\\' {
            i += 1;
            chars[i]
        } else {
            chars[i]
        };
        i += 1;
        if i + 1 < items_end && chars[i] == '-' {
            i += 1;
            let hi = if chars[i] == '\\' {
                i += 1;
                chars[i]
            } else {
                chars[i]
            };
            i += 1;
            if lo <= ch && ch <= hi {
                matched = true;
            }
        } else if ch == lo {
            matched = true;
        }
    }

    Some((matched != negated, end))
}

/// Shell-glob match of a single dot-free segment: `*` matches any run of
/// characters, `?` any single character, `[...]` a bracket class with
/// optional `^`/`!` negation and ranges, `\` escapes the next character.
fn segment_matches(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    let mut pi = 0;
    let mut ti = 0;
    // Most recent `*`: pattern position after it and the text position
    // it will retry from.
    let mut star: Option<(usize, usize)> = None;

    while ti < txt.len() {
        if pi < pat.len() {
            match pat[pi] {
                '*' => {
                    star = Some((pi + 1, ti));
                    pi += 1;
                    continue;
                }
                '?' => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = class_matches(&pat, pi, txt[ti]) {
                        if matched {
                            pi = next;
                            ti += 1;
                            continue;
                        }
                    }
                }
                '\\' => {
                    if pi + 1 < pat.len() && pat[pi + 1] == txt[ti] {
                        pi += 2;
                        ti += 1;
                        continue;
                    }
                }
                literal => {
                    if literal == txt[ti] {
                        pi += 1;
                        ti += 1;
                        continue;
                    }
                }
            }
        }
        match star {
            Some((after_star, from)) => {
                pi = after_star;
                ti = from + 1;
                star = Some((after_star, from + 1));
            }
            None => return false,
        }
    }

    while pi < pat.len() && pat[pi] == '*' {
        pi += 1;
    }
    pi == pat.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(pattern: &str) -> ResourcePattern {
        ResourcePattern::parse(pattern).expect("valid pattern")
    }

    #[test]
    fn global_wildcard_matches_everything() {
        let pattern = parsed("*");
        assert_eq!(pattern, ResourcePattern::Global);
        assert!(pattern.matches("survey"));
        assert!(pattern.matches("any.resource.name"));
        assert!(pattern.matches(""));
    }

    #[test]
    fn literal_matches_only_identical_string() {
        let pattern = parsed("survey");
        assert_eq!(pattern, ResourcePattern::Literal("survey".into()));
        assert!(pattern.matches("survey"));
        assert!(!pattern.matches("surveys"));
        assert!(!pattern.matches("survey.foo"));
    }

    #[test]
    fn single_segment_wildcard_is_segment_bounded() {
        let pattern = parsed("survey.*.test");
        assert!(pattern.matches("survey.foo.test"));
        assert!(pattern.matches("survey.bar.test"));
        assert!(!pattern.matches("survey.foo.bar.test"));
        assert!(!pattern.matches("surveys.foo.test"));
        assert!(!pattern.matches("survey.foo.tests"));
    }

    #[test]
    fn single_segment_wildcard_matches_partial_segment() {
        let pattern = parsed("survey.f*o.test");
        assert!(pattern.matches("survey.foo.test"));
        assert!(pattern.matches("survey.fo.test"));
        assert!(!pattern.matches("survey.bar.test"));
    }

    #[test]
    fn question_mark_matches_single_character() {
        let pattern = parsed("survey.fo?.test");
        assert!(pattern.matches("survey.foo.test"));
        assert!(!pattern.matches("survey.fo.test"));
        assert!(!pattern.matches("survey.fooo.test"));
    }

    #[test]
    fn bracket_class_matches_listed_characters() {
        let pattern = parsed("survey.[fb]oo.test");
        assert!(pattern.matches("survey.foo.test"));
        assert!(pattern.matches("survey.boo.test"));
        assert!(!pattern.matches("survey.zoo.test"));
    }

    #[test]
    fn bracket_range_and_negation() {
        let range = parsed("v[0-9]");
        assert!(range.matches("v7"));
        assert!(!range.matches("vx"));

        let negated = parsed("v[^0-9]");
        assert!(negated.matches("vx"));
        assert!(!negated.matches("v7"));
    }

    #[test]
    fn multi_segment_wildcard_absorbs_zero_or_more_segments() {
        let pattern = parsed("survey.**.test");
        assert!(pattern.matches("survey.test"));
        assert!(pattern.matches("survey.foo.test"));
        assert!(pattern.matches("survey.foo.bar.test"));
        assert!(!pattern.matches("surveys.foo.test"));
        assert!(!pattern.matches("survey.foo.tests"));
    }

    #[test]
    fn multi_segment_wildcard_at_pattern_edges() {
        let trailing = parsed("survey.**");
        assert!(trailing.matches("survey.foo"));
        assert!(trailing.matches("survey.foo.bar"));
        assert!(trailing.matches("survey"));
        assert!(!trailing.matches("other"));

        let leading = parsed("**.test");
        assert!(leading.matches("foo.test"));
        assert!(leading.matches("foo.bar.test"));
        assert!(leading.matches("test"));
        assert!(!leading.matches("testing"));
    }

    #[test]
    fn multi_segment_wildcard_guards_short_candidates() {
        // Prefix and suffix must not overlap on a candidate shorter than
        // both combined.
        let pattern = parsed("survey.foo**foo.test");
        assert!(pattern.matches("survey.foo.bar.foo.test"));
        assert!(!pattern.matches("survey.foo.test"));
    }

    #[test]
    fn double_multi_wildcard_is_rejected() {
        let err = ResourcePattern::parse("a.**.b.**.c").expect_err("must reject");
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn unbalanced_bracket_is_rejected() {
        let err = ResourcePattern::parse("survey.[foo.test").expect_err("must reject");
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn empty_bracket_class_is_rejected() {
        let err = ResourcePattern::parse("survey.[].test").expect_err("must reject");
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn dangling_escape_is_rejected() {
        let err = ResourcePattern::parse("survey.foo\\").expect_err("must reject");
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn escape_matches_wildcard_literally() {
        let pattern = parsed("survey.\\*.test");
        assert!(pattern.matches("survey.*.test"));
        assert!(!pattern.matches("survey.foo.test"));
    }

    #[test]
    fn leading_close_bracket_is_literal_class_item() {
        let pattern = parsed("survey.[]x]oo.test");
        assert!(pattern.matches("survey.]oo.test"));
        assert!(pattern.matches("survey.xoo.test"));
        assert!(!pattern.matches("survey.zoo.test"));
    }

    #[test]
    fn star_backtracks_within_segment() {
        let pattern = parsed("*ab*ab");
        assert!(pattern.matches("xabyabab"));
        assert!(!pattern.matches("xabyba"));
    }
}
