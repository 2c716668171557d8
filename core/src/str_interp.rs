//! `#{name}` placeholder substitution for command and path templates.
//!
//! `##` stands for a literal `#`. A `#` not followed by `{` or `#` is kept as is.

use std::{borrow::Borrow, collections::HashMap, ffi::OsStr, hash::Hash};

pub type Result = std::result::Result<String, InterpError>;

/// Positions are 1-based char offsets into the template.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("Undefined variable '{name}' at {pos}")]
    UndefinedVar { name: String, pos: usize },

    #[error("Unclosed brace (opened at {0})")]
    UnclosedBrace(usize),
}

pub fn interp<K, V>(template: &str, variables: &HashMap<K, V>) -> Result
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<OsStr>,
{
    let mut out = String::with_capacity(template.len() * 2);
    let mut chars = template.chars().enumerate().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '#' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '#')) => {
                chars.next();
                out.push('#');
            }
            Some(&(open_at, '{')) => {
                chars.next();
                let mut name = String::new();
                let closed = loop {
                    match chars.next() {
                        Some((_, '}')) => break true,
                        Some((_, c)) => name.push(c),
                        None => break false,
                    }
                };
                if !closed {
                    return Err(InterpError::UnclosedBrace(open_at + 1));
                }
                let Some(value) = variables.get(name.as_str()) else {
                    return Err(InterpError::UndefinedVar { name, pos: i + 1 });
                };
                out += &value.as_ref().to_string_lossy();
            }
            _ => out.push('#'),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    fn vars() -> HashMap<&'static str, &'static str> {
        let mut m = HashMap::new();
        m.insert("contestNumber", "395");
        m.insert("problemId", "C");
        m.insert("filePath", "./395C.py");
        m
    }

    #[test]
    fn interp_ok() {
        let v = vars();
        assert_eq!(interp("plain", &v).unwrap(), "plain");
        assert_eq!(interp("#{contestNumber}#{problemId}.py", &v).unwrap(), "395C.py");
        assert_eq!(
            interp("python3 #{filePath} < in", &v).unwrap(),
            "python3 ./395C.py < in"
        );
        assert_eq!(interp("echo ${HOME} {x}", &v).unwrap(), "echo ${HOME} {x}");
        assert_eq!(interp("# comment #x", &v).unwrap(), "# comment #x");
        assert_eq!(interp("##{problemId}", &v).unwrap(), "#{problemId}");
        assert_eq!(interp("#", &v).unwrap(), "#");
        assert_eq!(interp("##", &v).unwrap(), "#");
        assert_eq!(interp("###", &v).unwrap(), "##");
        assert_eq!(interp("日本#{problemId}語", &v).unwrap(), "日本C語");
    }

    #[test]
    fn interp_ng() {
        let v = vars();
        assert_eq!(
            interp("run #{fileName}", &v).unwrap_err(),
            InterpError::UndefinedVar {
                name: "fileName".to_owned(),
                pos: 5
            }
        );
        assert_eq!(
            interp("#{problemId} #{contest", &v).unwrap_err(),
            InterpError::UnclosedBrace(15)
        );
    }
}
