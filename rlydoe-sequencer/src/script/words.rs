//! Splitting of one logical command into expanded words.
use crate::{arith, error::ScriptError};
use std::collections::BTreeMap;

/// A word after quote removal and expansion.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Word {
    pub(super) text: String,

    /// Length of `NAME` when the word is written `NAME=value` in the source.
    name_len: Option<usize>,
}

impl Word {
    /// `(name, value)` if the word is a variable assignment.
    pub(super) fn assignment(&self) -> Option<(&str, &str)> {
        self.name_len
            .map(|len| (&self.text[..len], &self.text[len + 1..]))
    }
}

/// Splits `text` into words, expanding variables from `vars`.
pub(super) fn split(
    text: &str,
    line: usize,
    vars: &BTreeMap<String, String>,
) -> Result<Vec<Word>, ScriptError> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut words = Vec::new();
    let mut i = 0;

    loop {
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= n || chars[i] == '#' {
            break;
        }

        let mut text = String::new();
        let name_len = assignment_name_len(&chars[i..]);
        if let Some(len) = name_len {
            text.extend(&chars[i..=i + len]);
            i += len + 1;
        }

        while i < n && !chars[i].is_whitespace() {
            match chars[i] {
                '\'' => {
                    let close = find(&chars, i + 1, '\'')
                        .ok_or(ScriptError::UnterminatedQuote { line })?;
                    text.extend(&chars[i + 1..close]);
                    i = close + 1;
                }
                '"' => {
                    i += 1;
                    loop {
                        match chars.get(i) {
                            None => return Err(ScriptError::UnterminatedQuote { line }),
                            Some('"') => {
                                i += 1;
                                break;
                            }
                            Some('\\')
                                if matches!(chars.get(i + 1), Some('"' | '\\' | '$' | '`')) =>
                            {
                                text.push(chars[i + 1]);
                                i += 2;
                            }
                            Some('$') => i = expand(&chars, i, line, vars, &mut text)?,
                            Some('`') => return Err(unsupported(line, "`")),
                            Some(&c) => {
                                text.push(c);
                                i += 1;
                            }
                        }
                    }
                }
                '\\' => {
                    if let Some(&c) = chars.get(i + 1) {
                        text.push(c);
                    }
                    i += 2;
                }
                '$' => i = expand(&chars, i, line, vars, &mut text)?,
                '|' | ';' | '&' | '<' | '>' | '`' | '(' | ')' => {
                    let end = operator_end(&chars, i);
                    let syntax: String = chars[i..end].iter().collect();
                    return Err(unsupported(line, &syntax));
                }
                c => {
                    text.push(c);
                    i += 1;
                }
            }
        }

        words.push(Word { text, name_len });
    }

    Ok(words)
}

fn unsupported(line: usize, syntax: &str) -> ScriptError {
    ScriptError::Unsupported {
        line,
        syntax: syntax.to_string(),
    }
}

fn find(chars: &[char], from: usize, c: char) -> Option<usize> {
    chars[from..].iter().position(|&x| x == c).map(|p| p + from)
}

fn operator_end(chars: &[char], i: usize) -> usize {
    match (chars[i], chars.get(i + 1)) {
        ('|', Some('|')) | ('&', Some('&')) | ('>', Some('>')) | (';', Some(';')) => i + 2,
        _ => i + 1,
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(super) fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if is_name_start(c)) && chars.all(is_name_char)
}

fn assignment_name_len(chars: &[char]) -> Option<usize> {
    if !is_name_start(*chars.first()?) {
        return None;
    }
    let len = chars.iter().take_while(|&&c| is_name_char(c)).count();
    (chars.get(len) == Some(&'=')).then(|| len)
}

/// Expands the `$` at `chars[i]` into `out`, returning the index after it.
fn expand(
    chars: &[char],
    i: usize,
    line: usize,
    vars: &BTreeMap<String, String>,
    out: &mut String,
) -> Result<usize, ScriptError> {
    let lookup = |name: &str| -> Result<String, ScriptError> {
        vars.get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UndefinedVariable {
                line,
                name: name.to_string(),
            })
    };

    match (chars.get(i + 1), chars.get(i + 2)) {
        (Some('('), Some('(')) => {
            let start = i + 3;
            let mut depth = 0usize;
            let mut j = start;
            let end = loop {
                match chars.get(j) {
                    None => {
                        return Err(ScriptError::Arithmetic {
                            line,
                            expr: chars[start..].iter().collect(),
                            reason: "missing `))`".to_string(),
                        })
                    }
                    Some('(') => depth += 1,
                    Some(')') if depth == 0 && chars.get(j + 1) == Some(&')') => break j,
                    Some(')') => depth = depth.saturating_sub(1),
                    Some(_) => {}
                }
                j += 1;
            };
            let expr: String = chars[start..end].iter().collect();
            let value = arith::eval(&expr, &|name: &str| vars.get(name).cloned())
                .map_err(|reason| ScriptError::Arithmetic {
                    line,
                    expr: expr.trim().to_string(),
                    reason,
                })?;
            out.push_str(&value.to_string());
            Ok(end + 2)
        }
        (Some('('), _) => Err(unsupported(line, "$(")),
        (Some('{'), _) => {
            let close = find(chars, i + 2, '}').ok_or_else(|| unsupported(line, "${"))?;
            let name: String = chars[i + 2..close].iter().collect();
            if !is_name(&name) {
                return Err(unsupported(line, &format!("${{{}}}", name)));
            }
            out.push_str(&lookup(&name)?);
            Ok(close + 1)
        }
        (Some(&c), _) if is_name_start(c) => {
            let len = chars[i + 1..]
                .iter()
                .take_while(|&&c| is_name_char(c))
                .count();
            let name: String = chars[i + 1..i + 1 + len].iter().collect();
            out.push_str(&lookup(&name)?);
            Ok(i + 1 + len)
        }
        _ => {
            out.push('$');
            Ok(i + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.text.as_str()).collect()
    }

    #[test]
    fn test_quotes_and_expansion() {
        let vars = BTreeMap::from([("STEPS".to_string(), "1000".to_string())]);
        let words = split(
            r#"python 'a b' "x $STEPS" ${STEPS}0 '$STEPS' it\'s"#,
            1,
            &vars,
        )
        .unwrap();
        assert_eq!(
            texts(&words),
            vec!["python", "a b", "x 1000", "10000", "$STEPS", "it's"]
        );
    }

    #[test]
    fn test_assignments() {
        let vars = BTreeMap::new();
        let words = split("N=$((40 * 1000000)) learner.x=1 cmd", 3, &vars).unwrap();
        assert_eq!(words[0].assignment(), Some(("N", "40000000")));
        assert_eq!(words[1].assignment(), None);
        assert_eq!(words[2].assignment(), None);
    }

    #[test]
    fn test_comment_after_command() {
        let words = split("cmd arg # trailing", 1, &BTreeMap::new()).unwrap();
        assert_eq!(texts(&words), vec!["cmd", "arg"]);
    }

    #[test]
    fn test_errors() {
        let vars = BTreeMap::new();
        assert_eq!(
            split("echo $MISSING", 4, &vars),
            Err(ScriptError::UndefinedVariable {
                line: 4,
                name: "MISSING".to_string()
            })
        );
        assert_eq!(
            split("echo 'open", 2, &vars),
            Err(ScriptError::UnterminatedQuote { line: 2 })
        );
        assert_eq!(
            split("a && b", 1, &vars),
            Err(ScriptError::Unsupported {
                line: 1,
                syntax: "&&".to_string()
            })
        );
        assert!(matches!(
            split("echo $(date)", 1, &vars),
            Err(ScriptError::Unsupported { .. })
        ));
        assert!(matches!(
            split("N=$((1 / 0))", 1, &vars),
            Err(ScriptError::Arithmetic { .. })
        ));
    }
}
