//! The stock codecs.
//!
//! Wire shapes:
//!
//! | codec     | native shape                                  |
//! |-----------|-----------------------------------------------|
//! | `boolean` | `Bool`                                        |
//! | `string`  | `String` (scalars coerced)                    |
//! | `integer` | `Int`                                         |
//! | `number`  | `Float`                                       |
//! | `natural` | `Int`, non-negative (clamped), rounded        |
//! | `choice`  | `String`, limited to the declared arguments   |
//! | `color`   | `[r, g, b, a]`, each 0-255                    |
//! | `font`    | `[[families], size, bold, italic]`            |
//! | `image`   | `[src, width, height, scale]` (0 = unset)     |
//! | `proxy`   | the referenced object's id string             |

use std::collections::BTreeMap;

use crate::error::{CodecError, CodecResult};
use crate::value::{Cid, Value};

use super::Codec;

/// The identity codec.
pub struct AnyCodec;

impl Codec for AnyCodec {
    fn name(&self) -> &'static str {
        "any"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        Ok(value.clone())
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        value.clone()
    }
}

/// Booleans.
pub struct BooleanCodec;

impl Codec for BooleanCodec {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| CodecError::invalid("boolean", format!("expected a boolean, got {value}")))
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        match value {
            Value::Bool(_) => value.clone(),
            Value::Int(n) => Value::Bool(*n != 0),
            other => other.clone(),
        }
    }
}

/// Strings; numeric and boolean scalars are coerced.
pub struct StringCodec;

impl Codec for StringCodec {
    fn name(&self) -> &'static str {
        "string"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::Int(n) => Ok(Value::String(n.to_string())),
            Value::Float(n) => Ok(Value::String(n.to_string())),
            other => Err(CodecError::invalid(
                "string",
                format!("expected a string, got {other}"),
            )),
        }
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        value.clone()
    }
}

/// Signed integers.
pub struct IntegerCodec;

impl Codec for IntegerCodec {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        value
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| CodecError::invalid("integer", format!("expected an integer, got {value}")))
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        value.as_i64().map(Value::Int).unwrap_or_else(|| value.clone())
    }
}

/// Floating point numbers.
pub struct NumberCodec;

impl Codec for NumberCodec {
    fn name(&self) -> &'static str {
        "number"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        match value.as_f64() {
            Some(n) if n.is_finite() => Ok(Value::Float(n)),
            _ => Err(CodecError::invalid(
                "number",
                format!("expected a finite number, got {value}"),
            )),
        }
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        value.as_f64().map(Value::Float).unwrap_or_else(|| value.clone())
    }
}

/// Non-negative integers; fractional input is rounded, negative clamped to 0.
pub struct NaturalCodec;

impl Codec for NaturalCodec {
    fn name(&self) -> &'static str {
        "natural"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        match value.as_f64() {
            Some(n) if n.is_finite() => Ok(Value::Int(n.round().max(0.0) as i64)),
            _ => Err(CodecError::invalid(
                "natural",
                format!("expected a finite number, got {value}"),
            )),
        }
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        value.as_i64().map(Value::Int).unwrap_or_else(|| value.clone())
    }
}

/// One of a fixed set of strings; the allowed values are the codec's static
/// arguments.
pub struct ChoiceCodec;

impl Codec for ChoiceCodec {
    fn name(&self) -> &'static str {
        "choice"
    }

    fn encode(&self, value: &Value, args: &[Value]) -> CodecResult<Value> {
        let choice = value
            .as_str()
            .ok_or_else(|| CodecError::invalid("choice", format!("expected a string, got {value}")))?;
        if args.iter().any(|a| a.as_str() == Some(choice)) {
            Ok(value.clone())
        } else {
            Err(CodecError::invalid(
                "choice",
                format!("'{choice}' is not an accepted value"),
            ))
        }
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        value.clone()
    }
}

const NAMED_COLORS: &[(&str, [i64; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("transparent", [0, 0, 0, 0]),
];

/// Colors. Encodes hex strings, a small named table, `rgb()`/`rgba()`
/// notations and numeric triples/quadruples to the `[r, g, b, a]` 4-tuple.
pub struct ColorCodec;

impl ColorCodec {
    fn parse_hex(hex: &str) -> Option<[i64; 4]> {
        let hex = hex.strip_prefix('#')?;
        let expand = |c: &str| u8::from_str_radix(&c.repeat(2), 16).ok().map(i64::from);
        let pair = |c: &str| u8::from_str_radix(c, 16).ok().map(i64::from);
        match hex.len() {
            3 => Some([
                expand(&hex[0..1])?,
                expand(&hex[1..2])?,
                expand(&hex[2..3])?,
                255,
            ]),
            4 => Some([
                expand(&hex[0..1])?,
                expand(&hex[1..2])?,
                expand(&hex[2..3])?,
                expand(&hex[3..4])?,
            ]),
            6 => Some([pair(&hex[0..2])?, pair(&hex[2..4])?, pair(&hex[4..6])?, 255]),
            8 => Some([
                pair(&hex[0..2])?,
                pair(&hex[2..4])?,
                pair(&hex[4..6])?,
                pair(&hex[6..8])?,
            ]),
            _ => None,
        }
    }

    fn parse_functional(text: &str) -> Option<[i64; 4]> {
        let (name, rest) = text.split_once('(')?;
        let body = rest.strip_suffix(')')?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        match (name.trim(), parts.as_slice()) {
            ("rgb", [r, g, b]) => Some([
                r.parse().ok()?,
                g.parse().ok()?,
                b.parse().ok()?,
                255,
            ]),
            ("rgba", [r, g, b, a]) => {
                let alpha: f64 = a.parse().ok()?;
                Some([
                    r.parse().ok()?,
                    g.parse().ok()?,
                    b.parse().ok()?,
                    (alpha.clamp(0.0, 1.0) * 255.0).round() as i64,
                ])
            }
            _ => None,
        }
    }

    fn channels(value: &Value) -> Option<[i64; 4]> {
        let list = value.as_list()?;
        match list {
            [r, g, b] => Some([r.as_i64()?, g.as_i64()?, b.as_i64()?, 255]),
            [r, g, b, a] => Some([r.as_i64()?, g.as_i64()?, b.as_i64()?, a.as_i64()?]),
            _ => None,
        }
    }
}

impl Codec for ColorCodec {
    fn name(&self) -> &'static str {
        "color"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        let channels = match value {
            Value::String(text) => {
                let text = text.trim();
                Self::parse_hex(text)
                    .or_else(|| Self::parse_functional(text))
                    .or_else(|| {
                        NAMED_COLORS
                            .iter()
                            .find(|(name, _)| *name == text)
                            .map(|(_, c)| *c)
                    })
            }
            list @ Value::List(_) => Self::channels(list),
            _ => None,
        };
        let [r, g, b, a] = channels
            .ok_or_else(|| CodecError::invalid("color", format!("not a valid color: {value}")))?;
        if ![r, g, b, a].iter().all(|c| (0..=255).contains(c)) {
            return Err(CodecError::invalid(
                "color",
                format!("channel out of range: {value}"),
            ));
        }
        Ok(Value::List(vec![r.into(), g.into(), b.into(), a.into()]))
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        match Self::channels(value) {
            Some([r, g, b, 255]) => Value::String(format!("#{r:02x}{g:02x}{b:02x}")),
            Some([r, g, b, a]) => {
                let alpha = ((a as f64) / 255.0 * 100.0).round() / 100.0;
                Value::String(format!("rgba({r}, {g}, {b}, {alpha})"))
            }
            None => value.clone(),
        }
    }
}

/// Fonts. Encodes `"[italic] [bold] <size>px <family, ...>"` strings (or an
/// equivalent map) to `[[families], size, bold, italic]`.
pub struct FontCodec;

impl FontCodec {
    fn parse(text: &str) -> Option<(Vec<String>, f64, bool, bool)> {
        let mut bold = false;
        let mut italic = false;
        let mut size = None;
        let mut tokens = text.split_whitespace().peekable();

        while let Some(&token) = tokens.peek() {
            match token {
                "bold" => bold = true,
                "italic" => italic = true,
                _ => break,
            }
            tokens.next();
        }

        if let Some(token) = tokens.next() {
            let number = token.strip_suffix("px")?;
            size = number.parse::<f64>().ok();
        }
        let size = size.filter(|s| s.is_finite() && *s > 0.0)?;

        let families: Vec<String> = tokens
            .collect::<Vec<_>>()
            .join(" ")
            .split(',')
            .map(|f| f.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if families.is_empty() {
            return None;
        }
        Some((families, size, bold, italic))
    }
}

impl Codec for FontCodec {
    fn name(&self) -> &'static str {
        "font"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        let parsed = match value {
            Value::String(text) => Self::parse(text),
            Value::Map(map) => {
                let families = match map.get("family") {
                    Some(Value::String(f)) => Some(vec![f.clone()]),
                    Some(Value::List(list)) => Some(
                        list.iter()
                            .filter_map(|f| f.as_str().map(str::to_string))
                            .collect(),
                    ),
                    _ => None,
                };
                let size = map.get("size").and_then(Value::as_f64);
                match (families, size) {
                    (Some(families), Some(size)) if !families.is_empty() && size > 0.0 => Some((
                        families,
                        size,
                        map.get("bold").and_then(Value::as_bool).unwrap_or(false),
                        map.get("italic").and_then(Value::as_bool).unwrap_or(false),
                    )),
                    _ => None,
                }
            }
            _ => None,
        };
        let (families, size, bold, italic) = parsed
            .ok_or_else(|| CodecError::invalid("font", format!("not a valid font: {value}")))?;
        Ok(Value::List(vec![
            Value::List(families.into_iter().map(Value::String).collect()),
            Value::Float(size),
            Value::Bool(bold),
            Value::Bool(italic),
        ]))
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        let Some([families, size, bold, italic]) = value.as_list().and_then(|l| {
            <&[Value; 4]>::try_from(l).ok()
        }) else {
            return value.clone();
        };
        let families: Vec<&str> = families
            .as_list()
            .map(|l| l.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let Some(size) = size.as_f64() else {
            return value.clone();
        };
        let mut out = String::new();
        if italic.as_bool().unwrap_or(false) {
            out.push_str("italic ");
        }
        if bold.as_bool().unwrap_or(false) {
            out.push_str("bold ");
        }
        if size.fract() == 0.0 {
            out.push_str(&format!("{}px ", size as i64));
        } else {
            out.push_str(&format!("{size}px "));
        }
        out.push_str(&families.join(", "));
        Value::String(out)
    }
}

/// Images. Encodes a source path or a `{src, width?, height?, scale?}` map
/// to `[src, width, height, scale]`, with 0 marking an unset dimension.
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn name(&self) -> &'static str {
        "image"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        let (src, width, height, scale) = match value {
            Value::String(src) if !src.is_empty() => (src.clone(), 0, 0, 1.0),
            Value::Map(map) => {
                let src = map
                    .get("src")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| CodecError::invalid("image", "missing 'src'"))?;
                (
                    src.to_string(),
                    map.get("width").and_then(Value::as_i64).unwrap_or(0),
                    map.get("height").and_then(Value::as_i64).unwrap_or(0),
                    map.get("scale").and_then(Value::as_f64).unwrap_or(1.0),
                )
            }
            other => {
                return Err(CodecError::invalid(
                    "image",
                    format!("not a valid image: {other}"),
                ))
            }
        };
        Ok(Value::List(vec![
            Value::String(src),
            Value::Int(width),
            Value::Int(height),
            Value::Float(scale),
        ]))
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        let Some([src, width, height, scale]) =
            value.as_list().and_then(|l| <&[Value; 4]>::try_from(l).ok())
        else {
            return value.clone();
        };
        let mut map = BTreeMap::new();
        map.insert("src".to_string(), src.clone());
        if width.as_i64().unwrap_or(0) > 0 {
            map.insert("width".to_string(), width.clone());
        }
        if height.as_i64().unwrap_or(0) > 0 {
            map.insert("height".to_string(), height.clone());
        }
        map.insert("scale".to_string(), scale.clone());
        Value::Map(map)
    }
}

/// Object references. Encodes a [`Value::Reference`] (or a bare id string)
/// to the id string; decodes id strings back to references.
pub struct ProxyCodec;

impl Codec for ProxyCodec {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn encode(&self, value: &Value, _args: &[Value]) -> CodecResult<Value> {
        match value {
            Value::Reference(cid) => Ok(Value::String(cid.as_str().to_string())),
            Value::String(id) if !id.is_empty() => Ok(value.clone()),
            Value::Null => Ok(Value::Null),
            other => Err(CodecError::invalid(
                "proxy",
                format!("expected an object reference, got {other}"),
            )),
        }
    }

    fn decode(&self, value: &Value, _args: &[Value]) -> Value {
        match value {
            Value::String(id) => Value::Reference(Cid::new(id)),
            other => other.clone(),
        }
    }
}
