//! The string strategy: plain text, pattern-directed text, emails and urls.
//!
//! Logical length bounds come from `StringLength`; on top of them sits a
//! physical limit that caps generation regardless of what the contract
//! declares. Email and url production aims for structural diversity, not RFC
//! strictness.

use covenant_type_graph::{names, EmailRule, PatternRule, UrlRule, Value, ValueKind};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{extend_unique, GenerationStrategy, Regen},
};

/// Hard cap on generated string length, independent of the logical contract.
pub const PHYSICAL_STRING_LIMIT: usize = 10_000;

const ALPHANUMERIC: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J',
    'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1',
    '2', '3', '4', '5', '6', '7', '8', '9',
];

const LOCAL_PARTS: &[&str] = &["ada", "grace.h", "linus", "edsger+tag", "barbara.liskov"];
const DOMAINS: &[&str] = &["example.com", "mail.example.org", "dev.internal", "post.io"];
const HOSTS: &[&str] = &["example.com", "api.example.org", "localhost", "files.internal"];
const PATHS: &[&str] = &["", "/", "/index", "/a/b/c", "/search?q=term", "/res#frag"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Lengths {
    min: usize,
    max: usize,
}

enum StringKind {
    Plain,
    Email(EmailRule),
    Url(UrlRule),
    Pattern(PatternRule),
}

fn kind_of(request: &GenerationRequest) -> StringKind {
    if let Some(rule) = request.annotations.email() {
        StringKind::Email(rule)
    } else if let Some(rule) = request.annotations.url() {
        StringKind::Url(rule)
    } else if let Some(rule) = request.annotations.pattern() {
        StringKind::Pattern(rule)
    } else {
        StringKind::Plain
    }
}

fn lengths(request: &GenerationRequest) -> Lengths {
    let declared = request.annotations.string_length();
    let mut min = declared.map(|bounds| bounds.min.max(0) as usize).unwrap_or(0);
    let mut max = declared
        .map(|bounds| bounds.max.clamp(0, PHYSICAL_STRING_LIMIT as i64) as usize)
        .unwrap_or(32);
    // Clamp to the physical limit no matter what the contract says.
    min = min.min(PHYSICAL_STRING_LIMIT);
    max = max.min(PHYSICAL_STRING_LIMIT).max(min);
    if request.annotations.has(names::NOT_BLANK) && min == 0 {
        min = 1;
    }
    Lengths { min, max }
}

fn random_text(ctx: &mut GenerationContext, len: usize) -> String {
    (0..len).map(|_| ctx.random_char_from(ALPHANUMERIC)).collect()
}

fn text_of(len: usize) -> String {
    "a".repeat(len)
}

pub struct StringStrategy;

impl StringStrategy {
    fn generate_email(ctx: &mut GenerationContext, rule: &EmailRule) -> String {
        let local = LOCAL_PARTS[ctx.pick_index(LOCAL_PARTS.len())];
        let domain = if rule.allow.is_empty() {
            DOMAINS[ctx.pick_index(DOMAINS.len())].to_owned()
        } else {
            rule.allow[ctx.pick_index(rule.allow.len())].clone()
        };
        format!("{local}@{domain}")
    }

    fn generate_url(ctx: &mut GenerationContext, rule: &UrlRule) -> String {
        let protocol = if rule.protocols.is_empty() {
            if ctx.chance(0.5) { "https" } else { "http" }.to_owned()
        } else {
            rule.protocols[ctx.pick_index(rule.protocols.len())].clone()
        };
        let host = if rule.host_allow.is_empty() {
            HOSTS[ctx.pick_index(HOSTS.len())].to_owned()
        } else {
            rule.host_allow[ctx.pick_index(rule.host_allow.len())].clone()
        };
        let path = PATHS[ctx.pick_index(PATHS.len())];
        format!("{protocol}://{host}{path}")
    }
}

impl GenerationStrategy for StringStrategy {
    fn name(&self) -> &'static str {
        "StringStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Str))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let text = match kind_of(request) {
            StringKind::Email(rule) => Self::generate_email(ctx, &rule),
            StringKind::Url(rule) => Self::generate_url(ctx, &rule),
            StringKind::Pattern(rule) => {
                pattern::synthesize(&rule.regexp, ctx).map_err(|reason| {
                    GenerationError::InvalidAnnotationValue {
                        subject: request.name.clone(),
                        reason: format!("unsupported pattern `{}`: {reason}", rule.regexp),
                    }
                })?
            }
            StringKind::Plain => {
                let bounds = lengths(request);
                if ctx.chance(0.10) {
                    let edges = self.edge_cases(request, ctx, regen);
                    if !edges.is_empty() {
                        return Ok(edges[ctx.pick_index(edges.len())].clone());
                    }
                }
                let len = ctx.next_long_inclusive(bounds.min as i64, bounds.max as i64) as usize;
                random_text(ctx, len)
            }
        };
        Ok(Value::Str(text))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        match kind_of(request) {
            StringKind::Plain => {}
            // Structured kinds have no meaningful length boundaries.
            _ => return Vec::new(),
        }
        let Lengths { min, max } = lengths(request);
        let mut candidate_lengths = vec![min, max];
        if min < max {
            candidate_lengths.push(min + 1);
            candidate_lengths.push(max - 1);
        }
        if min == 0 {
            candidate_lengths.push(0);
        }
        if (min..=max).contains(&PHYSICAL_STRING_LIMIT) {
            candidate_lengths.push(PHYSICAL_STRING_LIMIT);
        }
        let mut edges = Vec::new();
        extend_unique(
            &mut edges,
            candidate_lengths
                .into_iter()
                .map(|len| Value::Str(text_of(len)))
                .collect(),
        );
        edges
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let mut samples = Vec::new();
        match kind_of(request) {
            StringKind::Email(rule) => {
                samples.push(Value::Str("plain-address".into()));
                samples.push(Value::Str("@missing-local.example.com".into()));
                samples.push(Value::Str("double@@example.com".into()));
                samples.push(Value::Str("trailing@".into()));
                if let Some(blocked) = rule.block.first() {
                    samples.push(Value::Str(format!("user@{blocked}")));
                }
            }
            StringKind::Url(rule) => {
                samples.push(Value::Str("gopher://example.com".into()));
                samples.push(Value::Str("example.com/no-protocol".into()));
                samples.push(Value::Str("https://".into()));
                if let Some(blocked) = rule.host_block.first() {
                    samples.push(Value::Str(format!("https://{blocked}/x")));
                }
            }
            StringKind::Pattern(rule) => {
                if let Some(sample) = pattern::counterexample(&rule.regexp, ctx) {
                    samples.push(Value::Str(sample));
                }
            }
            StringKind::Plain => {
                let Lengths { min, max } = lengths(request);
                if min > 0 {
                    samples.push(Value::Str(text_of(min - 1)));
                }
                if max < PHYSICAL_STRING_LIMIT {
                    samples.push(Value::Str(text_of(max + 1)));
                }
                if request.annotations.has(names::NOT_BLANK) {
                    samples.push(Value::Str(" ".repeat(min.max(1))));
                }
            }
        }
        samples
    }
}

/// A small pattern synthesizer covering the subset of regular expressions
/// contracts actually use: literals, `.`, escape classes, bracket classes,
/// groups, alternation and bounded quantifiers.
mod pattern {
    use super::GenerationContext;

    const DIGITS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
    const WORD: &[char] = &[
        'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'x', 'y', 'z', 'A', 'B', 'Z', '0', '5', '9', '_',
    ];
    const SPACE: &[char] = &[' ', '\t'];
    const ANY: &[char] = &['a', 'z', 'Q', '3', '-', '_', '~'];

    /// Unbounded quantifiers are sampled up to this repetition count.
    const REPEAT_CAP: u32 = 3;

    #[derive(Debug)]
    enum Node {
        Seq(Vec<Node>),
        Alt(Vec<Node>),
        Class(Vec<char>),
        Repeat(Box<Node>, u32, u32),
    }

    struct Parser<'a> {
        chars: Vec<char>,
        pos: usize,
        pattern: &'a str,
    }

    impl Parser<'_> {
        fn peek(&self) -> Option<char> {
            self.chars.get(self.pos).copied()
        }

        fn bump(&mut self) -> Option<char> {
            let ch = self.peek();
            if ch.is_some() {
                self.pos += 1;
            }
            ch
        }

        fn parse_alt(&mut self) -> Result<Node, String> {
            let mut branches = vec![self.parse_seq()?];
            while self.peek() == Some('|') {
                self.bump();
                branches.push(self.parse_seq()?);
            }
            if branches.len() == 1 {
                Ok(branches.pop().expect("single branch"))
            } else {
                Ok(Node::Alt(branches))
            }
        }

        fn parse_seq(&mut self) -> Result<Node, String> {
            let mut items = Vec::new();
            while let Some(ch) = self.peek() {
                if ch == '|' || ch == ')' {
                    break;
                }
                let atom = self.parse_atom()?;
                items.push(self.parse_quantifier(atom)?);
            }
            Ok(Node::Seq(items))
        }

        fn parse_atom(&mut self) -> Result<Node, String> {
            match self.bump() {
                Some('(') => {
                    let inner = self.parse_alt()?;
                    if self.bump() != Some(')') {
                        return Err("unclosed group".into());
                    }
                    Ok(inner)
                }
                Some('[') => self.parse_class(),
                Some('\\') => self.parse_escape(),
                Some('.') => Ok(Node::Class(ANY.to_vec())),
                Some('^') | Some('$') => Ok(Node::Seq(Vec::new())),
                Some(ch) if !"*+?{}".contains(ch) => Ok(Node::Class(vec![ch])),
                Some(ch) => Err(format!("unexpected `{ch}` in `{}`", self.pattern)),
                None => Err("unexpected end of pattern".into()),
            }
        }

        fn parse_escape(&mut self) -> Result<Node, String> {
            match self.bump() {
                Some('d') => Ok(Node::Class(DIGITS.to_vec())),
                Some('w') => Ok(Node::Class(WORD.to_vec())),
                Some('s') => Ok(Node::Class(SPACE.to_vec())),
                Some(ch) if !ch.is_alphanumeric() => Ok(Node::Class(vec![ch])),
                Some(ch) => Err(format!("unsupported escape `\\{ch}`")),
                None => Err("dangling escape".into()),
            }
        }

        fn parse_class(&mut self) -> Result<Node, String> {
            if self.peek() == Some('^') {
                return Err("negated classes are unsupported".into());
            }
            let mut alphabet = Vec::new();
            loop {
                match self.bump() {
                    Some(']') => break,
                    Some('\\') => match self.parse_escape()? {
                        Node::Class(chars) => alphabet.extend(chars),
                        _ => return Err("bad class escape".into()),
                    },
                    Some(start) => {
                        if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
                            self.bump();
                            let end = self.bump().ok_or("unterminated range")?;
                            if end < start {
                                return Err(format!("inverted range `{start}-{end}`"));
                            }
                            alphabet.extend(start..=end);
                        } else {
                            alphabet.push(start);
                        }
                    }
                    None => return Err("unterminated class".into()),
                }
            }
            if alphabet.is_empty() {
                return Err("empty class".into());
            }
            Ok(Node::Class(alphabet))
        }

        fn parse_count(&mut self) -> Result<u32, String> {
            let mut digits = String::new();
            while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
                digits.push(self.bump().expect("digit"));
            }
            digits.parse().map_err(|_| "bad repetition count".to_owned())
        }

        fn parse_quantifier(&mut self, atom: Node) -> Result<Node, String> {
            let (min, max) = match self.peek() {
                Some('?') => (0, 1),
                Some('*') => (0, REPEAT_CAP),
                Some('+') => (1, REPEAT_CAP),
                Some('{') => {
                    self.bump();
                    let low = self.parse_count()?;
                    let high = match self.bump() {
                        Some('}') => low,
                        Some(',') => {
                            let high = match self.peek() {
                                Some(ch) if ch.is_ascii_digit() => self.parse_count()?,
                                _ => low + REPEAT_CAP,
                            };
                            if self.bump() != Some('}') {
                                return Err("unclosed repetition".into());
                            }
                            high
                        }
                        _ => return Err("unclosed repetition".into()),
                    };
                    if high < low {
                        return Err("inverted repetition".into());
                    }
                    return Ok(Node::Repeat(Box::new(atom), low, high));
                }
                _ => return Ok(atom),
            };
            self.bump();
            Ok(Node::Repeat(Box::new(atom), min, max))
        }
    }

    fn sample(node: &Node, ctx: &mut GenerationContext, out: &mut String) {
        match node {
            Node::Seq(items) => {
                for item in items {
                    sample(item, ctx, out);
                }
            }
            Node::Alt(branches) => {
                let pick = ctx.pick_index(branches.len());
                sample(&branches[pick], ctx, out);
            }
            Node::Class(alphabet) => out.push(alphabet[ctx.pick_index(alphabet.len())]),
            Node::Repeat(inner, min, max) => {
                let count = ctx.next_long_inclusive(i64::from(*min), i64::from(*max));
                for _ in 0..count {
                    sample(inner, ctx, out);
                }
            }
        }
    }

    /// Produces a string matching `regexp`, or an error naming the
    /// unsupported construct.
    pub fn synthesize(regexp: &str, ctx: &mut GenerationContext) -> Result<String, String> {
        let mut parser = Parser {
            chars: regexp.chars().collect(),
            pos: 0,
            pattern: regexp,
        };
        let ast = parser.parse_alt()?;
        if parser.pos != parser.chars.len() {
            return Err(format!("trailing input at offset {}", parser.pos));
        }
        let mut out = String::new();
        sample(&ast, ctx, &mut out);
        Ok(out)
    }

    /// Best-effort non-matching string for the `invalid` set.
    pub fn counterexample(regexp: &str, ctx: &mut GenerationContext) -> Option<String> {
        let compiled = regex::Regex::new(&format!("^(?:{regexp})$")).ok()?;
        let candidates = ["!!!", "", "§§", "0", "zzz zzz zzz"];
        for candidate in candidates {
            if !compiled.is_match(candidate) {
                return Some(candidate.to_owned());
            }
        }
        // Mutate a matching sample until it stops matching.
        let base = synthesize(regexp, ctx).ok()?;
        let mutated = format!("{base}!!!{base}");
        (!compiled.is_match(&mutated)).then_some(mutated)
    }
}
