//! Use-expression parser.
//!
//! Expressions are parsed once into a [`UseExpr`] tree. The shape of a
//! member is decided by the first bracket that appears outside any nesting:
//!
//! - `{` - group, `root{members}`
//! - `[` - collection, `path[members]`
//! - `(` - self-matching pattern, `name(key=value)`
//! - none - attribute when the text contains `::`, scalar otherwise
//!
//! A `>` outside any nesting separates the member from its alias.

use super::ast::{SelfMatchKey, UseExpr};
use super::error::UseExprError;
use std::str::FromStr;

/// Parser for use-expression strings.
///
/// Each parser works on a slice of the full expression and remembers where
/// that slice starts, so errors report positions in the original text.
pub struct Parser<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given expression.
    pub fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    /// Parses a single use-expression.
    pub fn parse(expr: &str) -> Result<UseExpr, UseExprError> {
        Parser::new(expr).parse_member()
    }

    /// Parses a comma-separated list of use-expressions.
    pub fn parse_list(csv: &str) -> Result<Vec<UseExpr>, UseExprError> {
        Parser::new(csv).parse_members()
    }

    fn at(input: &'a str, offset: usize) -> Self {
        Self { input, offset }
    }

    fn slice(&self, start: usize, end: usize) -> Parser<'a> {
        Parser::at(&self.input[start..end], self.offset + start)
    }

    fn trimmed(&self) -> Parser<'a> {
        let lead = self.input.len() - self.input.trim_start().len();
        Parser::at(self.input.trim(), self.offset + lead)
    }

    /// Finds characters accepted by `target` that sit outside any nesting,
    /// validating that every `{`, `[` and `(` is properly closed.
    fn top_level<F>(&self, target: F) -> Result<Vec<(usize, char)>, UseExprError>
    where
        F: Fn(char) -> bool,
    {
        let mut open: Vec<(char, usize)> = Vec::new();
        let mut found = Vec::new();

        for (i, ch) in self.input.char_indices() {
            if open.is_empty() && target(ch) {
                found.push((i, ch));
            }
            match ch {
                '{' | '[' | '(' => open.push((ch, i)),
                '}' | ']' | ')' => match open.pop() {
                    Some((opener, _)) if closer(opener) == ch => {}
                    Some((opener, _)) => {
                        return Err(UseExprError::UnexpectedToken {
                            position: self.offset + i,
                            found: ch,
                            expected: format!("'{}'", closer(opener)),
                        })
                    }
                    None => {
                        return Err(UseExprError::UnexpectedToken {
                            position: self.offset + i,
                            found: ch,
                            expected: "no closing character".to_string(),
                        })
                    }
                },
                _ => {}
            }
        }

        match open.pop() {
            Some((opener, position)) => Err(UseExprError::Unclosed {
                open: opener,
                position: self.offset + position,
            }),
            None => Ok(found),
        }
    }

    /// Returns the offset of the character closing the opener at `start`.
    ///
    /// Only called on input that `top_level` has already validated.
    fn matching_close(&self, start: usize) -> Result<usize, UseExprError> {
        let mut depth = 0usize;
        for (i, ch) in self.input[start..].char_indices() {
            match ch {
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(start + i);
                    }
                }
                _ => {}
            }
        }
        Err(UseExprError::Unclosed {
            open: self.input[start..].chars().next().unwrap_or('{'),
            position: self.offset + start,
        })
    }

    /// Splits on commas outside any nesting.
    fn split_members(&self) -> Result<Vec<Parser<'a>>, UseExprError> {
        let commas = self.top_level(|ch| ch == ',')?;
        let mut parts = Vec::with_capacity(commas.len() + 1);
        let mut start = 0;
        for (pos, _) in commas {
            parts.push(self.slice(start, pos));
            start = pos + 1;
        }
        parts.push(self.slice(start, self.input.len()));
        Ok(parts)
    }

    fn parse_members(&self) -> Result<Vec<UseExpr>, UseExprError> {
        self.split_members()?
            .iter()
            .map(|member| member.parse_member())
            .collect()
    }

    /// Parses one member, splitting off a trailing `>alias`.
    fn parse_member(&self) -> Result<UseExpr, UseExprError> {
        let member = self.trimmed();
        let arrows = member.top_level(|ch| ch == '>')?;

        match arrows.first() {
            Some(&(pos, _)) => {
                let alias = member.slice(pos + 1, member.input.len()).trimmed();
                validate_alias(alias.input)?;
                member
                    .slice(0, pos)
                    .trimmed()
                    .parse_body(Some(alias.input.to_string()))
            }
            None => member.parse_body(None),
        }
    }

    fn parse_body(&self, alias: Option<String>) -> Result<UseExpr, UseExprError> {
        let openers = self.top_level(|ch| matches!(ch, '{' | '[' | '('))?;

        match openers.first() {
            Some(&(pos, '{')) => self.parse_group(pos, alias),
            Some(&(pos, '[')) => self.parse_collection(pos, alias),
            Some(&(pos, _)) => self.parse_self_match(pos, alias),
            None => self.parse_path(alias),
        }
    }

    /// `root{members}`
    fn parse_group(&self, open: usize, alias: Option<String>) -> Result<UseExpr, UseExprError> {
        let close = self.expect_final_close(open)?;
        let root = self.slice(0, open).trimmed().input.to_string();
        if root.is_empty() {
            return Err(UseExprError::InvalidSyntax {
                message: format!("group at position {} has no root name", self.offset + open),
            });
        }

        let members = self.slice(open + 1, close).parse_members()?;
        let alias = alias.unwrap_or_else(|| root.clone());

        Ok(UseExpr::Group {
            root,
            alias,
            members,
        })
    }

    /// `path[members]` or `path/namespace[members]`
    fn parse_collection(
        &self,
        open: usize,
        alias: Option<String>,
    ) -> Result<UseExpr, UseExprError> {
        let close = self.expect_final_close(open)?;
        let head = self.slice(0, open).trimmed().input;

        let (path, namespace) = match head.split_once('/') {
            Some((path, ns)) => (path.trim().to_string(), Some(ns.trim().to_string())),
            None => (head.to_string(), None),
        };

        let members = self.slice(open + 1, close).parse_members()?;

        Ok(UseExpr::Collection {
            path,
            namespace,
            members,
            alias,
        })
    }

    /// `name(key=value)`
    fn parse_self_match(
        &self,
        open: usize,
        alias: Option<String>,
    ) -> Result<UseExpr, UseExprError> {
        let close = self.expect_final_close(open)?;
        let name = self.slice(0, open).trimmed().input.to_string();

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
        if !valid_name {
            return Err(UseExprError::InvalidSyntax {
                message: format!("invalid self-matching name '{}'", name),
            });
        }

        let inner = self.slice(open + 1, close);
        let (split, _) = inner
            .top_level(|ch| ch == '=')?
            .last()
            .copied()
            .ok_or_else(|| UseExprError::InvalidSyntax {
                message: format!("self-matching pattern '{}' needs key=value", self.input),
            })?;

        let key_part = inner.slice(0, split).trimmed();
        let key = if key_part.input == "@" {
            SelfMatchKey::Item
        } else {
            SelfMatchKey::Expr(Box::new(key_part.parse_member()?))
        };
        let value = Box::new(inner.slice(split + 1, inner.input.len()).parse_member()?);

        // An alias equal to the name means "merge into the record"
        let alias = alias.filter(|a| *a != name);

        Ok(UseExpr::SelfMatch {
            name,
            key,
            value,
            alias,
        })
    }

    /// `path::attribute` or a plain dot-path
    fn parse_path(&self, alias: Option<String>) -> Result<UseExpr, UseExprError> {
        match self.input.split_once("::") {
            Some((path, attribute)) => {
                let attribute = attribute.trim();
                if attribute.is_empty() {
                    return Err(UseExprError::InvalidSyntax {
                        message: format!("attribute name missing in '{}'", self.input),
                    });
                }
                Ok(UseExpr::Attribute {
                    path: path.trim().to_string(),
                    attribute: attribute.to_string(),
                    alias,
                })
            }
            None => Ok(UseExpr::Scalar {
                path: self.input.to_string(),
                alias,
            }),
        }
    }

    /// Finds the closer for the opener at `open` and requires it to end the input.
    fn expect_final_close(&self, open: usize) -> Result<usize, UseExprError> {
        let close = self.matching_close(open)?;
        let rest = &self.input[close + 1..];
        if !rest.trim().is_empty() {
            return Err(UseExprError::TrailingInput {
                position: self.offset + close + 1,
                found: rest.to_string(),
            });
        }
        Ok(close)
    }
}

fn closer(opener: char) -> char {
    match opener {
        '{' => '}',
        '[' => ']',
        _ => ')',
    }
}

fn validate_alias(alias: &str) -> Result<(), UseExprError> {
    if alias.is_empty() {
        return Err(UseExprError::InvalidSyntax {
            message: "empty alias after '>'".to_string(),
        });
    }
    if let Some(ch) = alias
        .chars()
        .find(|ch| matches!(ch, '>' | ',' | '{' | '}' | '[' | ']' | '(' | ')'))
    {
        return Err(UseExprError::InvalidSyntax {
            message: format!("alias '{}' contains '{}'", alias, ch),
        });
    }
    Ok(())
}

/// Splits an expression list into its top-level members.
///
/// Commas inside `{}`, `[]` or `()` never split. Empty input yields a single
/// empty member.
///
/// ```
/// use xmlquill::usepath::tokenize;
///
/// assert_eq!(tokenize("a,b{c,d},e").unwrap(), vec!["a", "b{c,d}", "e"]);
/// assert_eq!(tokenize("").unwrap(), vec![""]);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<String>, UseExprError> {
    Ok(Parser::new(input)
        .split_members()?
        .into_iter()
        .map(|member| member.input.to_string())
        .collect())
}

impl FromStr for UseExpr {
    type Err = UseExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(path: &str, alias: Option<&str>) -> UseExpr {
        UseExpr::Scalar {
            path: path.to_string(),
            alias: alias.map(str::to_string),
        }
    }

    #[test]
    fn test_tokenize_depth_correct() {
        assert_eq!(tokenize("a,b{c,d},e").unwrap(), vec!["a", "b{c,d}", "e"]);
        assert_eq!(
            tokenize("x[a,b],p(k=v),g{h{i,j},k}").unwrap(),
            vec!["x[a,b]", "p(k=v)", "g{h{i,j},k}"]
        );
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert_eq!(tokenize("").unwrap(), vec![""]);
    }

    #[test]
    fn test_tokenize_unbalanced_fails() {
        assert!(tokenize("a,b{c,d").is_err());
        assert!(tokenize("a}").is_err());
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(Parser::parse("user.id").unwrap(), scalar("user.id", None));
        assert_eq!(Parser::parse("@").unwrap(), scalar("@", None));
    }

    #[test]
    fn test_parse_scalar_with_alias() {
        assert_eq!(
            Parser::parse("name>fullname").unwrap(),
            scalar("name", Some("fullname"))
        );
        assert_eq!(
            Parser::parse(" name > fullname ").unwrap(),
            scalar("name", Some("fullname"))
        );
    }

    #[test]
    fn test_parse_attribute() {
        assert_eq!(
            Parser::parse("user.email::type").unwrap(),
            UseExpr::Attribute {
                path: "user.email".to_string(),
                attribute: "type".to_string(),
                alias: None,
            }
        );
        assert_eq!(
            Parser::parse("::ID>id").unwrap(),
            UseExpr::Attribute {
                path: String::new(),
                attribute: "ID".to_string(),
                alias: Some("id".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_collection() {
        let expr = Parser::parse("user[id,name>fullname]").unwrap();
        assert_eq!(
            expr,
            UseExpr::Collection {
                path: "user".to_string(),
                namespace: None,
                members: vec![scalar("id", None), scalar("name", Some("fullname"))],
                alias: None,
            }
        );
    }

    #[test]
    fn test_parse_collection_with_namespace_and_alias() {
        match Parser::parse("channel.item/g[id,price]>items").unwrap() {
            UseExpr::Collection {
                path,
                namespace,
                members,
                alias,
            } => {
                assert_eq!(path, "channel.item");
                assert_eq!(namespace.as_deref(), Some("g"));
                assert_eq!(members.len(), 2);
                assert_eq!(alias.as_deref(), Some("items"));
            }
            other => panic!("Expected collection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_group_defaults_alias_to_root() {
        match Parser::parse("MIME_INFO{MIME_TYPE>mime_type,MIME_SOURCE}").unwrap() {
            UseExpr::Group {
                root,
                alias,
                members,
            } => {
                assert_eq!(root, "MIME_INFO");
                assert_eq!(alias, "MIME_INFO");
                assert_eq!(
                    members,
                    vec![
                        scalar("MIME_TYPE", Some("mime_type")),
                        scalar("MIME_SOURCE", None)
                    ]
                );
            }
            other => panic!("Expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_groups() {
        let expr = Parser::parse("A{B{C>alias}>b}").unwrap();
        let UseExpr::Group {
            root,
            alias,
            members,
        } = expr
        else {
            panic!("Expected group");
        };
        assert_eq!(root, "A");
        assert_eq!(alias, "A");
        assert_eq!(members.len(), 1);

        match &members[0] {
            UseExpr::Group {
                root,
                alias,
                members,
            } => {
                assert_eq!(root, "B");
                assert_eq!(alias, "b");
                assert_eq!(members, &vec![scalar("C", Some("alias"))]);
            }
            other => panic!("Expected nested group, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_self_match_item() {
        assert_eq!(
            Parser::parse("tag(@=@)").unwrap(),
            UseExpr::SelfMatch {
                name: "tag".to_string(),
                key: SelfMatchKey::Item,
                value: Box::new(scalar("@", None)),
                alias: None,
            }
        );
    }

    #[test]
    fn test_parse_self_match_keyed_with_alias() {
        match Parser::parse("properties.property(::name=value)>meta").unwrap() {
            UseExpr::SelfMatch {
                name,
                key,
                value,
                alias,
            } => {
                assert_eq!(name, "properties.property");
                assert_eq!(
                    key,
                    SelfMatchKey::Expr(Box::new(UseExpr::Attribute {
                        path: String::new(),
                        attribute: "name".to_string(),
                        alias: None,
                    }))
                );
                assert_eq!(*value, scalar("value", None));
                assert_eq!(alias.as_deref(), Some("meta"));
            }
            other => panic!("Expected self-match, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_self_match_alias_equal_to_name_merges() {
        match Parser::parse("property(::id=@)>property").unwrap() {
            UseExpr::SelfMatch { alias, .. } => assert_eq!(alias, None),
            other => panic!("Expected self-match, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_list() {
        let members = Parser::parse_list("::ID>id, name ,properties.property(::name=value)").unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members[1], scalar("name", None));
        assert!(matches!(members[2], UseExpr::SelfMatch { .. }));
    }

    #[test]
    fn test_display_round_trips_canonical_text() {
        let text = "PRODUCT[NODE_ID>node_id,FEATURES{FEATURE{FNAME>name}>feature}>features,tag(@=@)]";
        assert_eq!(Parser::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_parse_unclosed_brace_fails() {
        assert_eq!(
            Parser::parse("A{B,C"),
            Err(UseExprError::Unclosed {
                open: '{',
                position: 1
            })
        );
    }

    #[test]
    fn test_parse_mismatched_closer_fails() {
        assert_eq!(
            Parser::parse("user[id}"),
            Err(UseExprError::UnexpectedToken {
                position: 7,
                found: '}',
                expected: "']'".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_trailing_input_fails() {
        assert!(matches!(
            Parser::parse("user[id]extra"),
            Err(UseExprError::TrailingInput { .. })
        ));
        assert!(matches!(
            Parser::parse("A{B}C"),
            Err(UseExprError::TrailingInput { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_syntax() {
        let invalid_cases = vec!["{a,b}", "tag(@)", "bad name(k=v)", "user::", "a>", "a>b>c"];

        for invalid in invalid_cases {
            assert!(
                matches!(Parser::parse(invalid), Err(UseExprError::InvalidSyntax { .. })),
                "Expected syntax error for: {}",
                invalid
            );
        }
    }

    #[test]
    fn test_error_positions_are_absolute() {
        assert_eq!(
            Parser::parse("outer[a,inner[b}]"),
            Err(UseExprError::UnexpectedToken {
                position: 15,
                found: '}',
                expected: "']'".to_string(),
            })
        );
    }

    #[test]
    fn test_from_str() {
        let expr: UseExpr = "user::followers".parse().unwrap();
        assert_eq!(expr.output_key(), "user::followers");
    }
}
