/*
Copyright 2020 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    /// auto used types that does not need fully qualified paths.
    static ref PRELUDE_V1: HashMap<String, String> = {
        let mut m = HashMap::<String, String>::new();
        m.insert("Object".into(), "java.lang.Object".into());
        m.insert("String".into(), "java.lang.String".into());
        m.insert("Integer".into(), "java.lang.Integer".into());
        m.insert("Long".into(), "java.lang.Long".into());
        m.insert("Number".into(), "java.lang.Number".into());
        m.insert("Boolean".into(), "java.lang.Boolean".into());
        m.insert("CharSequence".into(), "java.lang.CharSequence".into());
        m.insert("Set".into(), "java.util.Set".into());
        m.insert("Map".into(), "java.util.Map".into());
        m.insert("List".into(), "java.util.List".into());
        m.insert("Collection".into(), "java.util.Collection".into());
        m.insert("Optional".into(), "java.util.Optional".into());
        m.insert("Provider".into(), "javax.inject.Provider".into());
        m.insert("Lazy".into(), "dagger.Lazy".into());
        m.insert("MembersInjector".into(), "dagger.MembersInjector".into());
        m.insert("Producer".into(), "dagger.producers.Producer".into());
        m.insert("Produced".into(), "dagger.producers.Produced".into());
        m.insert("ListenableFuture".into(), "com.google.common.util.concurrent.ListenableFuture".into());
        m.insert("Named".into(), "javax.inject.Named".into());
        m.insert("Singleton".into(), "javax.inject.Singleton".into());
        m.insert("Reusable".into(), "dagger.Reusable".into());
        m.insert("StringKey".into(), "dagger.multibindings.StringKey".into());
        m.insert("IntKey".into(), "dagger.multibindings.IntKey".into());
        m.insert("LongKey".into(), "dagger.multibindings.LongKey".into());
        m.insert("ClassKey".into(), "dagger.multibindings.ClassKey".into());
        m
    };
}

lazy_static! {
    /// primitive data types with no path
    static ref PRIMITIVES: HashSet<String> = {
        let mut m = HashSet::<String>::new();
        m.insert("boolean".to_owned());
        m.insert("byte".to_owned());
        m.insert("short".to_owned());
        m.insert("char".to_owned());
        m.insert("int".to_owned());
        m.insert("long".to_owned());
        m.insert("float".to_owned());
        m.insert("double".to_owned());
        m.insert("void".to_owned());
        m
    };
}

/// Path used for an unbounded wildcard (`?`).
pub const WILDCARD: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Variance {
    #[default]
    Invariant,
    /// `? extends T`
    Extends,
    /// `? super T`
    Super,
    /// `?`
    Unbounded,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("cannot parse type `{input}`: {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub reason: String,
}

/// A declared type as seen by the front-end, e.g. `java.util.Map<java.lang.String, ? extends test.Foo>`.
///
/// Equality is structural. Whether wildcards are significant is decided by
/// [crate::key::KeyFactory], not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct TypeData {
    pub path: String,
    pub args: Vec<TypeData>,
    pub variance: Variance,
}

impl TypeData {
    pub fn new(path: &str) -> Self {
        TypeData {
            path: expand_prelude(path),
            args: Vec::new(),
            variance: Variance::Invariant,
        }
    }

    pub fn with_args(path: &str, args: Vec<TypeData>) -> Self {
        TypeData {
            path: expand_prelude(path),
            args,
            variance: Variance::Invariant,
        }
    }

    pub fn wildcard() -> Self {
        TypeData {
            path: WILDCARD.to_owned(),
            args: Vec::new(),
            variance: Variance::Unbounded,
        }
    }

    /// Full path of the type, including type arguments.
    ///
    /// Arguments are joined without spaces so the text is stable no matter
    /// how the front-end formatted it.
    pub fn canonical_string_path(&self) -> String {
        let base = self.path_with_args();
        match self.variance {
            Variance::Invariant => base,
            Variance::Extends => format!("? extends {}", base),
            Variance::Super => format!("? super {}", base),
            Variance::Unbounded => WILDCARD.to_owned(),
        }
    }

    /// Full path of the type without type arguments.
    pub fn canonical_string_path_without_args(&self) -> String {
        self.path.clone()
    }

    fn path_with_args(&self) -> String {
        if self.args.is_empty() {
            return self.path.clone();
        }
        format!(
            "{}<{}>",
            self.path,
            self.args
                .iter()
                .map(|arg| arg.canonical_string_path())
                .collect::<Vec<String>>()
                .join(",")
        )
    }

    /// The type with all wildcard bounds replaced by the bound itself, recursively.
    ///
    /// `Foo<? extends Bar>` becomes `Foo<Bar>` and `Foo<?>` becomes `Foo<java.lang.Object>`.
    pub fn without_variance(&self) -> TypeData {
        let path = if self.variance == Variance::Unbounded {
            "java.lang.Object".to_owned()
        } else {
            self.path.clone()
        };
        TypeData {
            path,
            args: self.args.iter().map(|arg| arg.without_variance()).collect(),
            variance: Variance::Invariant,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.variance != Variance::Invariant
    }

    pub fn has_wildcard_args(&self) -> bool {
        self.args.iter().any(|arg| arg.is_wildcard())
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.path)
    }

    /// Last segment of the path, e.g. `C` for `test.Outer.C`.
    pub fn simple_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Every type mentioned by this type, outermost first.
    pub fn walk(&self) -> Vec<&TypeData> {
        let mut result = vec![self];
        for arg in &self.args {
            result.extend(arg.walk());
        }
        result
    }
}

impl Display for TypeData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string_path())
    }
}

impl FromStr for TypeData {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser {
            input: s,
            tokens: tokenize(s),
            pos: 0,
        };
        let result = parser.parse_type()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(result)
    }
}

impl TryFrom<String> for TypeData {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeData> for String {
    fn from(value: TypeData) -> Self {
        value.canonical_string_path()
    }
}

/// Canonical text of an annotation such as a qualifier or scope.
///
/// `Named( "foo" )` becomes `javax.inject.Named("foo")`; a leading `@` is dropped.
pub fn canonical_annotation(annotation: &str) -> String {
    let annotation = annotation.trim().trim_start_matches('@');
    match annotation.find('(') {
        Some(index) => {
            let (name, args) = annotation.split_at(index);
            let args = args.trim();
            let inner = args
                .trim_start_matches('(')
                .trim_end_matches(')')
                .trim();
            format!("{}({})", expand_prelude(name.trim()), inner)
        }
        None => expand_prelude(annotation),
    }
}

fn expand_prelude(path: &str) -> String {
    if path.contains('.') {
        return path.to_owned();
    }
    PRELUDE_V1
        .get(path)
        .cloned()
        .unwrap_or_else(|| path.to_owned())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Open,
    Close,
    Comma,
    Question,
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        let token = match c {
            '<' => Some(Token::Open),
            '>' => Some(Token::Close),
            ',' => Some(Token::Comma),
            '?' => Some(Token::Question),
            c if c.is_whitespace() => None,
            c => {
                current.push(c);
                continue;
            }
        };
        if !current.is_empty() {
            tokens.push(Token::Ident(std::mem::take(&mut current)));
        }
        if let Some(token) = token {
            tokens.push(token);
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Ident(current));
    }
    tokens
}

struct TypeParser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl TypeParser<'_> {
    fn error(&self, reason: &str) -> TypeParseError {
        TypeParseError {
            input: self.input.to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_type(&mut self) -> Result<TypeData, TypeParseError> {
        match self.next() {
            Some(Token::Question) => self.parse_wildcard(),
            Some(Token::Ident(name)) => {
                if !is_valid_path(&name) {
                    return Err(self.error(&format!("invalid type name `{}`", name)));
                }
                let mut type_ = TypeData::new(&name);
                if self.peek() == Some(&Token::Open) {
                    self.pos += 1;
                    loop {
                        type_.args.push(self.parse_type()?);
                        match self.next() {
                            Some(Token::Comma) => continue,
                            Some(Token::Close) => break,
                            _ => return Err(self.error("unterminated type arguments")),
                        }
                    }
                }
                Ok(type_)
            }
            _ => Err(self.error("expected a type")),
        }
    }

    fn parse_wildcard(&mut self) -> Result<TypeData, TypeParseError> {
        let variance = match self.peek() {
            Some(Token::Ident(word)) if word == "extends" => Variance::Extends,
            Some(Token::Ident(word)) if word == "super" => Variance::Super,
            _ => return Ok(TypeData::wildcard()),
        };
        self.pos += 1;
        let mut bound = self.parse_type()?;
        if bound.is_wildcard() {
            return Err(self.error("wildcard bound may not be a wildcard"));
        }
        bound.variance = variance;
        Ok(bound)
    }
}

fn is_valid_path(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '[' || c == ']')
}
