//! Inline values and the codec registry
//!
//! A scalar on disk is a short piece of tagged text (`12L`, `1.5F`, `'x'C`,
//! `base64(AAA=)`). Each tag belongs to one [`InlineCodec`], and the
//! [`ValueRegistry`] resolves ambiguous text by probing every registered codec
//! in registration order, first match wins. The string codec accepts every
//! input and is always tried last, so resolution cannot fail to find a codec.
//!
//! Registration order is therefore part of the grammar: registering a codec
//! earlier makes it shadow later ones for any text both would accept. This is
//! deliberate and must not be replaced with a "most specific match" heuristic.

use crate::error::CodecError;
use crate::node::SectionNode;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A single primitive configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    String(String),
}

/// Discriminant of [`Value`], used as the registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Bytes,
    Uuid,
    String,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Byte(_) => ValueKind::Byte,
            Value::Short(_) => ValueKind::Short,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Char(_) => ValueKind::Char,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::String(_) => ValueKind::String,
        }
    }
}

/// Untagged textual form, used only when no codec is registered for a kind
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "{}", BASE64.encode(v)),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Extraction of a typed value out of a [`Value`], used by the typed getters
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        })*
    };
}

impl_from_value! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    String => String,
}

/// Bidirectional text <-> value converter for one scalar kind
///
/// `matches` is the recognizer probed during resolution; `parse` may still
/// fail with a [`CodecError`], which the format engines convert into a
/// per-line diagnostic.
pub trait InlineCodec {
    /// The value kind this codec produces and renders
    fn kind(&self) -> ValueKind;

    fn matches(&self, text: &str) -> bool;

    fn parse(&self, text: &str) -> Result<Value, CodecError>;

    /// Render a value of this codec's kind; `None` for any other variant
    fn render(&self, value: &Value) -> Option<String>;
}

fn strip_suffix<'a>(text: &'a str, suffix: char) -> Option<&'a str> {
    text.strip_suffix(suffix)
}

/// `true` / `false`, case-insensitive; renders capitalized
pub struct BoolCodec;

impl InlineCodec for BoolCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn matches(&self, text: &str) -> bool {
        text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false")
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        if text.eq_ignore_ascii_case("true") {
            Ok(Value::Bool(true))
        } else if text.eq_ignore_ascii_case("false") {
            Ok(Value::Bool(false))
        } else {
            Err(CodecError::new(format!("not a boolean: '{}'", text)))
        }
    }

    fn render(&self, value: &Value) -> Option<String> {
        match value {
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            _ => None,
        }
    }
}

macro_rules! suffixed_number_codec {
    ($name:ident, $kind:ident, $ty:ty, $suffix:literal, $label:literal) => {
        #[doc = concat!("Numeric text with a trailing `", $suffix, "` tag")]
        pub struct $name;

        impl InlineCodec for $name {
            fn kind(&self) -> ValueKind {
                ValueKind::$kind
            }

            fn matches(&self, text: &str) -> bool {
                strip_suffix(text, $suffix)
                    .map(|rest| rest.parse::<$ty>().is_ok())
                    .unwrap_or(false)
            }

            fn parse(&self, text: &str) -> Result<Value, CodecError> {
                let rest = strip_suffix(text, $suffix).ok_or_else(|| {
                    CodecError::new(format!(
                        concat!("missing '", $suffix, "' suffix on ", $label, ": '{}'"),
                        text
                    ))
                })?;
                rest.parse::<$ty>()
                    .map(Value::$kind)
                    .map_err(|e| CodecError::new(format!(concat!("invalid ", $label, " '{}': {}"), text, e)))
            }

            fn render(&self, value: &Value) -> Option<String> {
                match value {
                    Value::$kind(v) => Some(format!(concat!("{}", $suffix), v)),
                    _ => None,
                }
            }
        }
    };
}

suffixed_number_codec!(ByteCodec, Byte, i8, 'B', "byte");
suffixed_number_codec!(ShortCodec, Short, i16, 'S', "short");
suffixed_number_codec!(LongCodec, Long, i64, 'L', "long");
suffixed_number_codec!(FloatCodec, Float, f32, 'F', "float");
suffixed_number_codec!(DoubleCodec, Double, f64, 'D', "double");

/// Plain integer text, no suffix
pub struct IntCodec;

impl InlineCodec for IntCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Int
    }

    fn matches(&self, text: &str) -> bool {
        text.parse::<i32>().is_ok()
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        text.parse::<i32>()
            .map(Value::Int)
            .map_err(|e| CodecError::new(format!("invalid integer '{}': {}", text, e)))
    }

    fn render(&self, value: &Value) -> Option<String> {
        match value {
            Value::Int(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

/// Exactly four characters, wrapped `'x'C`
pub struct CharCodec;

impl InlineCodec for CharCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Char
    }

    fn matches(&self, text: &str) -> bool {
        text.chars().count() == 4 && text.starts_with('\'') && text.ends_with("'C")
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        if !self.matches(text) {
            return Err(CodecError::new(format!("invalid character literal: '{}'", text)));
        }
        text.chars()
            .nth(1)
            .map(Value::Char)
            .ok_or_else(|| CodecError::new(format!("invalid character literal: '{}'", text)))
    }

    fn render(&self, value: &Value) -> Option<String> {
        match value {
            Value::Char(v) => Some(format!("'{}'C", v)),
            _ => None,
        }
    }
}

/// `base64(...)` wrapper around a standard base64 payload
pub struct BytesCodec;

impl InlineCodec for BytesCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Bytes
    }

    fn matches(&self, text: &str) -> bool {
        text.starts_with("base64(") && text.ends_with(')')
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        let payload = text
            .strip_prefix("base64(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| CodecError::new(format!("invalid byte sequence: '{}'", text)))?;
        BASE64
            .decode(payload)
            .map(Value::Bytes)
            .map_err(|e| CodecError::new(format!("invalid base64 payload '{}': {}", payload, e)))
    }

    fn render(&self, value: &Value) -> Option<String> {
        match value {
            Value::Bytes(v) => Some(format!("base64({})", BASE64.encode(v))),
            _ => None,
        }
    }
}

/// `uuid(...)` wrapper around canonical UUID text
pub struct UuidCodec;

impl InlineCodec for UuidCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::Uuid
    }

    fn matches(&self, text: &str) -> bool {
        text.strip_prefix("uuid(")
            .and_then(|rest| rest.strip_suffix(')'))
            .map(|payload| Uuid::parse_str(payload).is_ok())
            .unwrap_or(false)
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        let payload = text
            .strip_prefix("uuid(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| CodecError::new(format!("invalid uuid literal: '{}'", text)))?;
        Uuid::parse_str(payload)
            .map(Value::Uuid)
            .map_err(|e| CodecError::new(format!("invalid uuid '{}': {}", payload, e)))
    }

    fn render(&self, value: &Value) -> Option<String> {
        match value {
            Value::Uuid(v) => Some(format!("uuid({})", v)),
            _ => None,
        }
    }
}

/// The fallback codec: accepts any text, strips surrounding quotes on parse
pub struct StringCodec;

impl InlineCodec for StringCodec {
    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn matches(&self, _text: &str) -> bool {
        true
    }

    fn parse(&self, text: &str) -> Result<Value, CodecError> {
        let unquoted = if text.len() >= 2
            && ((text.starts_with('\'') && text.ends_with('\''))
                || (text.starts_with('"') && text.ends_with('"')))
        {
            &text[1..text.len() - 1]
        } else {
            text
        };
        Ok(Value::String(unquoted.to_string()))
    }

    fn render(&self, value: &Value) -> Option<String> {
        match value {
            Value::String(v) => Some(format!("'{}'", v)),
            _ => None,
        }
    }
}

/// Bidirectional converter between an application type and a section subtree
///
/// Structured codecs are the hook for mapping whole `SectionNode` subtrees
/// to user-defined types. The engine only stores and retrieves them; the
/// mapping logic itself lives in the closures the caller provides.
pub struct StructuredCodec<T> {
    decode: Box<dyn Fn(&SectionNode) -> Option<T>>,
    encode: Box<dyn Fn(&T, &mut SectionNode)>,
}

impl<T> StructuredCodec<T> {
    pub fn new(
        decode: impl Fn(&SectionNode) -> Option<T> + 'static,
        encode: impl Fn(&T, &mut SectionNode) + 'static,
    ) -> Self {
        StructuredCodec {
            decode: Box::new(decode),
            encode: Box::new(encode),
        }
    }

    pub fn decode(&self, section: &SectionNode) -> Option<T> {
        (self.decode)(section)
    }

    pub fn encode(&self, value: &T, section: &mut SectionNode) {
        (self.encode)(value, section)
    }
}

/// Lookup table from value kinds to inline codecs and from application types
/// to structured codecs
///
/// Inline codecs keep their registration order; re-registering a kind
/// replaces the codec in place without moving it. No parsing logic lives
/// here beyond the first-match probe in [`ValueRegistry::resolve`].
pub struct ValueRegistry {
    inline: Vec<Box<dyn InlineCodec>>,
    structured: HashMap<TypeId, Box<dyn Any>>,
}

impl ValueRegistry {
    pub fn new() -> Self {
        ValueRegistry {
            inline: Vec::new(),
            structured: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in codecs, string fallback last
    pub fn with_defaults() -> Self {
        let mut registry = ValueRegistry::new();
        registry
            .register_inline(Box::new(BytesCodec))
            .register_inline(Box::new(BoolCodec))
            .register_inline(Box::new(ByteCodec))
            .register_inline(Box::new(ShortCodec))
            .register_inline(Box::new(IntCodec))
            .register_inline(Box::new(DoubleCodec))
            .register_inline(Box::new(FloatCodec))
            .register_inline(Box::new(LongCodec))
            .register_inline(Box::new(UuidCodec))
            .register_inline(Box::new(CharCodec))
            .register_inline(Box::new(StringCodec));
        registry
    }

    /// Install a codec; a codec already registered for the same kind is
    /// silently replaced, keeping its position in probe order
    pub fn register_inline(&mut self, codec: Box<dyn InlineCodec>) -> &mut Self {
        match self.inline.iter_mut().find(|c| c.kind() == codec.kind()) {
            Some(slot) => *slot = codec,
            None => self.inline.push(codec),
        }
        self
    }

    pub fn inline(&self, kind: ValueKind) -> Option<&dyn InlineCodec> {
        self.inline.iter().find(|c| c.kind() == kind).map(|c| c.as_ref())
    }

    /// Inline codecs in registration (probe) order
    pub fn inline_codecs(&self) -> impl Iterator<Item = &dyn InlineCodec> {
        self.inline.iter().map(|c| c.as_ref())
    }

    /// Resolve inline text to a value by first-match probing
    ///
    /// Every codec except the string fallback is tried in registration
    /// order; the first whose recognizer accepts the text parses it. The
    /// string codec accepts anything and runs last.
    pub fn resolve(&self, text: &str) -> Result<Value, CodecError> {
        for codec in &self.inline {
            if codec.kind() == ValueKind::String {
                continue;
            }
            if codec.matches(text) {
                return codec.parse(text);
            }
        }
        match self.inline(ValueKind::String) {
            Some(fallback) => fallback.parse(text),
            None => Ok(Value::String(text.to_string())),
        }
    }

    /// Render a value through its codec, falling back to the untagged form
    /// when no codec is registered for its kind
    pub fn render(&self, value: &Value) -> String {
        self.inline(value.kind())
            .and_then(|codec| codec.render(value))
            .unwrap_or_else(|| value.to_string())
    }

    /// Install a structured codec for `T`, replacing any earlier one
    pub fn register_structured<T: 'static>(&mut self, codec: StructuredCodec<T>) -> &mut Self {
        self.structured.insert(TypeId::of::<T>(), Box::new(codec));
        self
    }

    pub fn structured<T: 'static>(&self) -> Option<&StructuredCodec<T>> {
        self.structured
            .get(&TypeId::of::<T>())
            .and_then(|any| any.downcast_ref::<StructuredCodec<T>>())
    }

    /// Decode a section subtree into `T` via its registered codec
    pub fn decode_section<T: 'static>(&self, section: &SectionNode) -> Option<T> {
        self.structured::<T>().and_then(|codec| codec.decode(section))
    }

    /// Encode `T` into a section subtree; returns false when no codec is
    /// registered for the type
    pub fn encode_section<T: 'static>(&self, value: &T, section: &mut SectionNode) -> bool {
        match self.structured::<T>() {
            Some(codec) => {
                codec.encode(value, section);
                true
            }
            None => false,
        }
    }
}

impl Default for ValueRegistry {
    fn default() -> Self {
        ValueRegistry::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", Value::Bool(true))]
    #[case("FALSE", Value::Bool(false))]
    #[case("12B", Value::Byte(12))]
    #[case("12S", Value::Short(12))]
    #[case("12", Value::Int(12))]
    #[case("12L", Value::Long(12))]
    #[case("1.5F", Value::Float(1.5))]
    #[case("1.5D", Value::Double(1.5))]
    #[case("'x'C", Value::Char('x'))]
    #[case("base64(AAA=)", Value::Bytes(vec![0, 0]))]
    #[case("'text'", Value::String("text".to_string()))]
    #[case("\"text\"", Value::String("text".to_string()))]
    #[case("bare", Value::String("bare".to_string()))]
    fn resolves_tagged_text(#[case] text: &str, #[case] expected: Value) {
        let registry = ValueRegistry::with_defaults();
        assert_eq!(registry.resolve(text).unwrap(), expected);
    }

    #[rstest]
    #[case(Value::Bool(true), "True")]
    #[case(Value::Byte(12), "12B")]
    #[case(Value::Short(12), "12S")]
    #[case(Value::Int(12), "12")]
    #[case(Value::Long(12), "12L")]
    #[case(Value::Float(1.5), "1.5F")]
    #[case(Value::Double(1.5), "1.5D")]
    #[case(Value::Char('x'), "'x'C")]
    #[case(Value::Bytes(vec![0, 0]), "base64(AAA=)")]
    #[case(Value::String("text".to_string()), "'text'")]
    fn renders_tagged_text(#[case] value: Value, #[case] expected: &str) {
        let registry = ValueRegistry::with_defaults();
        assert_eq!(registry.render(&value), expected);
    }

    #[test]
    fn uuid_round_trips() {
        let registry = ValueRegistry::with_defaults();
        let id = Uuid::new_v4();
        let rendered = registry.render(&Value::Uuid(id));
        assert_eq!(rendered, format!("uuid({})", id));
        assert_eq!(registry.resolve(&rendered).unwrap(), Value::Uuid(id));
    }

    #[test]
    fn numeric_overflow_falls_through_to_string() {
        // 300 doesn't fit an i8, so the recognizer rejects it and the text
        // lands on the string fallback.
        let registry = ValueRegistry::with_defaults();
        assert_eq!(
            registry.resolve("300B").unwrap(),
            Value::String("300B".to_string())
        );
    }

    #[test]
    fn malformed_base64_is_a_codec_error() {
        let registry = ValueRegistry::with_defaults();
        assert!(registry.resolve("base64(!!)").is_err());
    }

    #[test]
    fn registration_order_decides_ambiguity() {
        // A custom codec that also accepts plain integers, registered before
        // the built-ins, wins the probe.
        struct GreedyCodec;
        impl InlineCodec for GreedyCodec {
            fn kind(&self) -> ValueKind {
                ValueKind::Long
            }
            fn matches(&self, text: &str) -> bool {
                text.parse::<i64>().is_ok()
            }
            fn parse(&self, text: &str) -> Result<Value, CodecError> {
                text.parse::<i64>()
                    .map(Value::Long)
                    .map_err(|e| CodecError::new(e.to_string()))
            }
            fn render(&self, value: &Value) -> Option<String> {
                match value {
                    Value::Long(v) => Some(format!("{}L", v)),
                    _ => None,
                }
            }
        }

        let mut registry = ValueRegistry::new();
        registry
            .register_inline(Box::new(GreedyCodec))
            .register_inline(Box::new(IntCodec))
            .register_inline(Box::new(StringCodec));
        assert_eq!(registry.resolve("12").unwrap(), Value::Long(12));

        let mut registry = ValueRegistry::new();
        registry
            .register_inline(Box::new(IntCodec))
            .register_inline(Box::new(GreedyCodec))
            .register_inline(Box::new(StringCodec));
        assert_eq!(registry.resolve("12").unwrap(), Value::Int(12));
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = ValueRegistry::with_defaults();
        let before: Vec<ValueKind> = registry.inline_codecs().map(|c| c.kind()).collect();
        registry.register_inline(Box::new(IntCodec));
        let after: Vec<ValueKind> = registry.inline_codecs().map(|c| c.kind()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn string_fallback_accepts_everything() {
        let registry = ValueRegistry::with_defaults();
        assert_eq!(
            registry.resolve("not at all a number").unwrap(),
            Value::String("not at all a number".to_string())
        );
    }
}
