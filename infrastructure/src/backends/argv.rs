//! Quote-aware command line splitting.
//!
//! Follows POSIX shell word rules for quoting only: whitespace separates
//! words, single quotes are literal, double quotes allow `\"`, `\\`, `\$`
//! and `` \` `` escapes, and a backslash outside quotes escapes the next
//! character. No expansion, globbing, pipes or redirection happen; `|` and
//! `>` are ordinary characters.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgvError {
    #[error("empty command")]
    Empty,

    #[error("unbalanced {0} quote")]
    UnbalancedQuote(char),

    #[error("trailing backslash")]
    TrailingBackslash,
}

pub fn split_command(line: &str) -> Result<Vec<String>, ArgvError> {
    let mut words = Vec::new();
    let mut current = String::new();
    // a word exists even when it is empty (`''`)
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(ArgvError::UnbalancedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some('\n') => {}
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(ArgvError::UnbalancedQuote('"')),
                        },
                        Some(c) => current.push(c),
                        None => return Err(ArgvError::UnbalancedQuote('"')),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(c) => {
                    in_word = true;
                    current.push(c);
                }
                None => return Err(ArgvError::TrailingBackslash),
            },
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    if words.is_empty() {
        return Err(ArgvError::Empty);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(
            split_command("  ls   -la /tmp ").unwrap(),
            vec!["ls", "-la", "/tmp"]
        );
    }

    #[test]
    fn test_quotes_group_words() {
        assert_eq!(
            split_command(r#"grep -r "hello world" 'it''s' src"#).unwrap(),
            vec!["grep", "-r", "hello world", "its", "src"]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            split_command(r#"echo a\ b "say \"hi\"" 'no\escape'"#).unwrap(),
            vec!["echo", "a b", r#"say "hi""#, r"no\escape"]
        );
        assert_eq!(split_command(r#"echo "\n""#).unwrap(), vec!["echo", r"\n"]);
    }

    #[test]
    fn test_empty_quoted_word_is_kept() {
        assert_eq!(split_command("printf ''").unwrap(), vec!["printf", ""]);
    }

    #[test]
    fn test_shell_operators_are_literal() {
        assert_eq!(
            split_command("echo hi | rm -rf /").unwrap(),
            vec!["echo", "hi", "|", "rm", "-rf", "/"]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(split_command("   "), Err(ArgvError::Empty));
        assert_eq!(split_command("echo 'open"), Err(ArgvError::UnbalancedQuote('\'')));
        assert_eq!(split_command("echo \"open"), Err(ArgvError::UnbalancedQuote('"')));
        assert_eq!(split_command("echo oops\\"), Err(ArgvError::TrailingBackslash));
    }
}
