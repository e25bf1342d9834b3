//! Username template parsing
//!
//! Grammar:
//!
//! ```text
//! template  := (literal | "{{" action "}}")*
//! action    := source ("|" transform)*
//! source    := ".DisplayName" | ".RoleName" | "random" N | "unix_time" | "unix_time_millis"
//! transform := "truncate" N | "uppercase" | "lowercase" | "replace" STRING STRING
//! ```
//!
//! Everything is resolved here, so rendering never meets an unknown name.

use super::MAX_IDENTIFIER_LEN;
use crate::{Error, Result};

/// Metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    DisplayName,
    RoleName,
}

/// Value producer at the head of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    Field(Field),
    Random(usize),
    UnixTime,
    UnixTimeMillis,
}

/// Pipeline stage applied to the produced value
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transform {
    Truncate(usize),
    Uppercase,
    Lowercase,
    Replace(String, String),
}

/// Compiled template segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Action {
        source: Source,
        transforms: Vec<Transform>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Word(String),
    Str(String),
}

/// Parse a template string into segments
pub(crate) fn parse(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| invalid(format!("unclosed action at byte {}", template.len() - rest.len() + open)))?;
        segments.push(parse_action(after[..close].trim())?);
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }

    Ok(segments)
}

fn parse_action(action: &str) -> Result<Segment> {
    if action.is_empty() {
        return Err(invalid("empty action".into()));
    }

    let mut stages = split_pipeline(action)?.into_iter();
    let head = stages.next().unwrap_or_default();
    let source = parse_source(&head)?;
    let transforms = stages
        .map(|stage| parse_transform(&stage))
        .collect::<Result<Vec<_>>>()?;

    Ok(Segment::Action { source, transforms })
}

fn parse_source(stage: &[Arg]) -> Result<Source> {
    let (name, args) = split_name(stage)?;
    let source = match name {
        ".DisplayName" => Source::Field(Field::DisplayName),
        ".RoleName" => Source::Field(Field::RoleName),
        "random" => Source::Random(positive(name, args)?),
        "unix_time" => Source::UnixTime,
        "unix_time_millis" => Source::UnixTimeMillis,
        other if other.starts_with('.') => {
            return Err(invalid(format!("unknown field '{}'", other)))
        }
        other => return Err(invalid(format!("unknown generator '{}'", other))),
    };
    if !matches!(source, Source::Random(_)) && !args.is_empty() {
        return Err(invalid(format!("'{}' takes no arguments", name)));
    }
    Ok(source)
}

fn parse_transform(stage: &[Arg]) -> Result<Transform> {
    let (name, args) = split_name(stage)?;
    let transform = match name {
        "truncate" => return Ok(Transform::Truncate(count(name, args)?)),
        "uppercase" => Transform::Uppercase,
        "lowercase" => Transform::Lowercase,
        "replace" => {
            return match args {
                [Arg::Str(from), Arg::Str(to)] if !from.is_empty() => {
                    Ok(Transform::Replace(from.clone(), to.clone()))
                }
                _ => Err(invalid(
                    "replace expects two quoted strings, the first non-empty".into(),
                )),
            }
        }
        other => return Err(invalid(format!("unknown transform '{}'", other))),
    };
    if !args.is_empty() {
        return Err(invalid(format!("'{}' takes no arguments", name)));
    }
    Ok(transform)
}

fn split_name(stage: &[Arg]) -> Result<(&str, &[Arg])> {
    match stage.split_first() {
        Some((Arg::Word(name), args)) => Ok((name.as_str(), args)),
        Some((Arg::Str(s), _)) => Err(invalid(format!("unexpected string \"{}\"", s))),
        None => Err(invalid("empty pipeline stage".into())),
    }
}

fn count(name: &str, args: &[Arg]) -> Result<usize> {
    match args {
        [Arg::Word(n)] => n
            .parse::<usize>()
            .map_err(|_| invalid(format!("'{}' expects a number, got '{}'", name, n))),
        _ => Err(invalid(format!("'{}' expects exactly one number", name))),
    }
}

/// Generator length in `1..=MAX_IDENTIFIER_LEN`; longer output could never be a role name
fn positive(name: &str, args: &[Arg]) -> Result<usize> {
    match count(name, args)? {
        0 => Err(invalid(format!("'{}' length must be positive", name))),
        n if n > MAX_IDENTIFIER_LEN => Err(invalid(format!(
            "'{}' length {} exceeds {}",
            name, n, MAX_IDENTIFIER_LEN
        ))),
        n => Ok(n),
    }
}

/// Tokenize an action and split it into `|`-separated stages
fn split_pipeline(action: &str) -> Result<Vec<Vec<Arg>>> {
    let mut stages = vec![Vec::new()];
    let mut chars = action.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                stages.push(Vec::new());
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => return Err(invalid("unterminated string".into())),
                        },
                        Some('"') => break,
                        Some(other) => s.push(other),
                        None => return Err(invalid("unterminated string".into())),
                    }
                }
                push_arg(&mut stages, Arg::Str(s));
            }
            _ => {
                let mut word = String::new();
                while let Some(&w) = chars.peek() {
                    if w.is_whitespace() || w == '|' || w == '"' {
                        break;
                    }
                    word.push(w);
                    chars.next();
                }
                push_arg(&mut stages, Arg::Word(word));
            }
        }
    }

    if stages.iter().any(Vec::is_empty) {
        return Err(invalid("empty pipeline stage".into()));
    }
    Ok(stages)
}

fn push_arg(stages: &mut [Vec<Arg>], arg: Arg) {
    if let Some(stage) = stages.last_mut() {
        stage.push(arg);
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidTemplate(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_only() {
        assert_eq!(
            parse("foo-bar").unwrap(),
            vec![Segment::Literal("foo-bar".into())]
        );
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_field_with_transforms() {
        let segments = parse("x{{ .RoleName | truncate 8 | uppercase }}y").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("x".into()),
                Segment::Action {
                    source: Source::Field(Field::RoleName),
                    transforms: vec![Transform::Truncate(8), Transform::Uppercase],
                },
                Segment::Literal("y".into()),
            ]
        );
    }

    #[test]
    fn test_generators() {
        let segments = parse("{{random 20}}{{unix_time}}{{unix_time_millis}}").unwrap();
        let sources: Vec<_> = segments
            .into_iter()
            .map(|s| match s {
                Segment::Action { source, .. } => source,
                Segment::Literal(_) => panic!("unexpected literal"),
            })
            .collect();
        assert_eq!(
            sources,
            vec![Source::Random(20), Source::UnixTime, Source::UnixTimeMillis]
        );
    }

    #[test]
    fn test_replace_with_escaped_quote() {
        let segments = parse(r#"{{.DisplayName | replace "\"" "_"}}"#).unwrap();
        assert_eq!(
            segments,
            vec![Segment::Action {
                source: Source::Field(Field::DisplayName),
                transforms: vec![Transform::Replace("\"".into(), "_".into())],
            }]
        );
    }

    #[test]
    fn test_unknown_names() {
        for (template, needle) in [
            ("{{.Nope}}", "unknown field"),
            ("{{uuid}}", "unknown generator"),
            ("{{.RoleName | reverse}}", "unknown transform"),
        ] {
            match parse(template) {
                Err(Error::InvalidTemplate(msg)) => assert!(msg.contains(needle), "{}", msg),
                other => panic!("{} should fail, got {:?}", template, other),
            }
        }
    }

    #[test]
    fn test_bad_arguments() {
        for template in [
            "{{random}}",
            "{{random 0}}",
            "{{random 64}}",
            "{{random 18446744073709551615}}",
            "{{random 18446744073709551616}}",
            "{{random x}}",
            "{{unix_time 3}}",
            "{{.RoleName | truncate}}",
            "{{.RoleName | uppercase 2}}",
            "{{.RoleName | replace \"a\"}}",
            "{{.RoleName | }}",
            "{{ }}",
            "{{.RoleName",
            "{{\"lit\"}}",
        ] {
            assert!(
                matches!(parse(template), Err(Error::InvalidTemplate(_))),
                "{} should fail",
                template
            );
        }
    }
}
