//! Glob-style key patterns for KEYS
//!
//! Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes.

/// A compiled glob pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: Vec<u8>,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Self {
        Self {
            raw: pattern.as_bytes().to_vec(),
        }
    }

    /// True if `key` matches the whole pattern
    pub fn is_match(&self, key: &str) -> bool {
        glob_match(&self.raw, key.as_bytes())
    }
}

/// Iterative matcher; backtracks only to the most recent `*`
fn glob_match(pat: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pat.len() {
            match pat[p] {
                b'*' => {
                    star = Some((p, t));
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'[' => {
                    if let Some((matched, next)) = match_class(pat, p, text[t]) {
                        if matched {
                            p = next;
                            t += 1;
                            continue;
                        }
                    }
                }
                b'\\' if p + 1 < pat.len() => {
                    if pat[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }
        match star {
            Some((star_p, star_t)) => {
                p = star_p + 1;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pat[p..].iter().all(|&c| c == b'*')
}

/// Match one byte against the class opening at `pat[start] == b'['`
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` for an unterminated class.
fn match_class(pat: &[u8], start: usize, c: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = pat.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pat.len() && pat[i] != b']' {
        if pat[i] == b'\\' && i + 1 < pat.len() {
            matched |= pat[i + 1] == c;
            i += 2;
        } else if i + 2 < pat.len() && pat[i + 1] == b'-' && pat[i + 2] != b']' {
            let (lo, hi) = if pat[i] <= pat[i + 2] {
                (pat[i], pat[i + 2])
            } else {
                (pat[i + 2], pat[i])
            };
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= pat[i] == c;
            i += 1;
        }
    }

    if i >= pat.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}
