//! Canonical, byte-exact encoding for sigchain statements and keyring items.
//!
//! The shape is a JSON object whose keys are sorted in ASCII order, with keys
//! omitted entirely when their value is absent, byte fields base64-encoded
//! (standard alphabet, padded), integers written without leading zeros, and
//! no insignificant whitespace. Two implementations of this encoder that
//! disagree on a single byte will disagree about every signature in a chain,
//! so this crate is deliberately hand-rolled rather than leaning on
//! `serde_json`'s default formatting, which does not make the same
//! guarantees about key order or number rendering across versions.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// One field of a canonical object. Sorting by key happens in
/// [`CanonicalObject::finish`], not at push time, so callers may push
/// fields in whatever order is convenient.
enum Field<'a> {
	Bytes(&'static str, &'a [u8]),
	Str(&'static str, &'a str),
	UInt(&'static str, u64),
}

impl Field<'_> {
	fn key(&self) -> &'static str {
		match self {
			Field::Bytes(k, _) | Field::Str(k, _) | Field::UInt(k, _) => k,
		}
	}
}

/// Builder for a single canonical JSON object.
#[derive(Default)]
pub struct CanonicalObject<'a> {
	fields: Vec<Field<'a>>,
}

impl<'a> CanonicalObject<'a> {
	pub fn new() -> Self {
		Self { fields: Vec::new() }
	}

	/// Pushes a base64-encoded byte field. No-op if `value` is `None`.
	pub fn bytes(mut self, key: &'static str, value: Option<&'a [u8]>) -> Self {
		if let Some(v) = value {
			self.fields.push(Field::Bytes(key, v));
		}
		self
	}

	/// Pushes a string field. No-op if `value` is `None`.
	pub fn str(mut self, key: &'static str, value: Option<&'a str>) -> Self {
		if let Some(v) = value {
			self.fields.push(Field::Str(key, v));
		}
		self
	}

	/// Pushes an unsigned integer field. No-op if `value` is `None`.
	pub fn uint(mut self, key: &'static str, value: Option<u64>) -> Self {
		if let Some(v) = value {
			self.fields.push(Field::UInt(key, v));
		}
		self
	}

	/// Renders the canonical bytes: keys sorted ASCII-ascending, no whitespace.
	pub fn finish(mut self) -> Vec<u8> {
		self.fields.sort_by(|a, b| a.key().cmp(b.key()));

		let mut out = Vec::new();
		out.push(b'{');
		for (i, field) in self.fields.iter().enumerate() {
			if i > 0 {
				out.push(b',');
			}
			write_json_string(&mut out, field.key());
			out.push(b':');
			match field {
				Field::Bytes(_, v) => write_json_string(&mut out, &BASE64.encode(v)),
				Field::Str(_, v) => write_json_string(&mut out, v),
				Field::UInt(_, v) => out.extend(v.to_string().into_bytes()),
			}
		}
		out.push(b'}');
		out
	}
}

fn write_json_string(out: &mut Vec<u8>, s: &str) {
	out.push(b'"');
	for c in s.chars() {
		match c {
			'"' => out.extend(b"\\\""),
			'\\' => out.extend(b"\\\\"),
			'\n' => out.extend(b"\\n"),
			'\r' => out.extend(b"\\r"),
			'\t' => out.extend(b"\\t"),
			c if (c as u32) < 0x20 => {
				out.extend(format!("\\u{:04x}", c as u32).into_bytes())
			}
			c => {
				let mut buf = [0u8; 4];
				out.extend(c.encode_utf8(&mut buf).as_bytes());
			}
		}
	}
	out.push(b'"');
}

/// Errors decoding a canonical object back into typed fields.
#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum CanonicalDecodeError {
	#[error("malformed canonical json: {0}")]
	Malformed(&'static str),
	#[error("unknown field {0:?}")]
	UnknownField(String),
	#[error("field {0:?} had the wrong type")]
	WrongType(&'static str),
	#[error("field {0:?} was not valid base64: {1}")]
	Base64(&'static str, base64::DecodeError),
	#[error("integer field {0:?} overflowed")]
	IntOverflow(&'static str),
}

enum RawValue {
	Str(String),
	Num(u64),
}

/// A minimal, allocation-light JSON object parser good for exactly the shapes
/// this crate produces: a flat object of string/number values. Deliberately
/// strict: trailing data, nested objects/arrays, and floats are rejected
/// rather than silently accepted, since a lenient parser would let two
/// implementations of the format quietly diverge.
pub struct CanonicalParser {
	pairs: Vec<(String, RawValue)>,
}

/// Byte-index cursor over a UTF-8 string. We only ever step forward to the
/// next char boundary, so slicing by saved indices is always safe.
struct Cursor<'a> {
	s: &'a str,
	pos: usize,
}

impl<'a> Cursor<'a> {
	fn new(s: &'a str) -> Self {
		Self { s, pos: 0 }
	}

	fn peek(&self) -> Option<char> {
		self.s[self.pos..].chars().next()
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += c.len_utf8();
		Some(c)
	}

	fn skip_ws(&mut self) {
		while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
			self.pos += 1;
		}
	}

	fn expect(&mut self, expected: char) -> Result<(), CanonicalDecodeError> {
		match self.bump() {
			Some(c) if c == expected => Ok(()),
			_ => Err(CanonicalDecodeError::Malformed("unexpected character")),
		}
	}

	fn parse_json_string(&mut self) -> Result<String, CanonicalDecodeError> {
		self.expect('"')?;
		let mut out = String::new();
		loop {
			match self.bump() {
				None => {
					return Err(CanonicalDecodeError::Malformed("unterminated string"));
				}
				Some('"') => break,
				Some('\\') => match self.bump() {
					Some('"') => out.push('"'),
					Some('\\') => out.push('\\'),
					Some('/') => out.push('/'),
					Some('n') => out.push('\n'),
					Some('t') => out.push('\t'),
					Some('r') => out.push('\r'),
					Some('u') => {
						let mut hex = String::new();
						for _ in 0..4 {
							match self.bump() {
								Some(c) => hex.push(c),
								None => {
									return Err(CanonicalDecodeError::Malformed(
										"truncated \\u escape",
									));
								}
							}
						}
						let cp = u32::from_str_radix(&hex, 16).map_err(|_| {
							CanonicalDecodeError::Malformed("bad \\u escape")
						})?;
						out.push(char::from_u32(cp).ok_or(
							CanonicalDecodeError::Malformed("bad \\u escape"),
						)?);
					}
					_ => return Err(CanonicalDecodeError::Malformed("bad escape")),
				},
				Some(c) => out.push(c),
			}
		}
		Ok(out)
	}

	fn parse_number(&mut self) -> Result<u64, CanonicalDecodeError> {
		let start = self.pos;
		if matches!(self.peek(), Some('-')) {
			return Err(CanonicalDecodeError::Malformed(
				"negative numbers are not part of the canonical format",
			));
		}
		while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
			self.pos += 1;
		}
		let digits = &self.s[start..self.pos];
		if digits.is_empty() {
			return Err(CanonicalDecodeError::Malformed("expected a number"));
		}
		if digits.len() > 1 && digits.starts_with('0') {
			return Err(CanonicalDecodeError::Malformed(
				"leading zero in canonical integer",
			));
		}
		digits
			.parse()
			.map_err(|_| CanonicalDecodeError::Malformed("integer overflow"))
	}

	fn parse_value(&mut self) -> Result<RawValue, CanonicalDecodeError> {
		match self.peek() {
			Some('"') => Ok(RawValue::Str(self.parse_json_string()?)),
			Some(c) if c.is_ascii_digit() => Ok(RawValue::Num(self.parse_number()?)),
			_ => Err(CanonicalDecodeError::Malformed("unexpected value")),
		}
	}
}

impl CanonicalParser {
	pub fn parse(input: &[u8]) -> Result<Self, CanonicalDecodeError> {
		let s = core::str::from_utf8(input)
			.map_err(|_| CanonicalDecodeError::Malformed("not valid utf-8"))?;
		let mut cur = Cursor::new(s);
		let mut pairs = Vec::new();

		cur.expect('{')?;
		cur.skip_ws();
		if cur.peek() == Some('}') {
			cur.bump();
		} else {
			loop {
				cur.skip_ws();
				let key = cur.parse_json_string()?;
				cur.skip_ws();
				cur.expect(':')?;
				cur.skip_ws();
				let value = cur.parse_value()?;
				pairs.push((key, value));
				cur.skip_ws();
				match cur.bump() {
					Some(',') => continue,
					Some('}') => break,
					_ => {
						return Err(CanonicalDecodeError::Malformed(
							"expected ',' or '}'",
						));
					}
				}
			}
		}
		cur.skip_ws();
		if cur.pos != s.len() {
			return Err(CanonicalDecodeError::Malformed("trailing data"));
		}

		Ok(Self { pairs })
	}

	/// Fails if any field name in `self` is not present in `known`.
	pub fn deny_unknown_fields(
		&self,
		known: &[&'static str],
	) -> Result<(), CanonicalDecodeError> {
		for (k, _) in &self.pairs {
			if !known.contains(&k.as_str()) {
				return Err(CanonicalDecodeError::UnknownField(k.clone()));
			}
		}
		Ok(())
	}

	pub fn get_bytes(
		&self,
		key: &'static str,
	) -> Result<Option<Vec<u8>>, CanonicalDecodeError> {
		match self.find(key) {
			None => Ok(None),
			Some(RawValue::Str(s)) => BASE64
				.decode(s)
				.map(Some)
				.map_err(|e| CanonicalDecodeError::Base64(key, e)),
			Some(RawValue::Num(_)) => Err(CanonicalDecodeError::WrongType(key)),
		}
	}

	pub fn get_str(
		&self,
		key: &'static str,
	) -> Result<Option<String>, CanonicalDecodeError> {
		match self.find(key) {
			None => Ok(None),
			Some(RawValue::Str(s)) => Ok(Some(s.clone())),
			Some(RawValue::Num(_)) => Err(CanonicalDecodeError::WrongType(key)),
		}
	}

	pub fn get_uint(
		&self,
		key: &'static str,
	) -> Result<Option<u64>, CanonicalDecodeError> {
		match self.find(key) {
			None => Ok(None),
			Some(RawValue::Num(n)) => Ok(Some(*n)),
			Some(RawValue::Str(_)) => Err(CanonicalDecodeError::WrongType(key)),
		}
	}

	fn find(&self, key: &str) -> Option<&RawValue> {
		self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn empty_object_round_trips() {
		let bytes = CanonicalObject::new().finish();
		assert_eq!(bytes, b"{}");
		let parsed = CanonicalParser::parse(&bytes).unwrap();
		assert!(parsed.pairs.is_empty());
	}

	#[test]
	fn keys_sort_ascii_ascending_regardless_of_push_order() {
		let bytes = CanonicalObject::new()
			.uint("seq", Some(1))
			.str("type", Some("test"))
			.bytes("data", Some(b"hi"))
			.str(".sig", Some("sig"))
			.finish();
		assert_eq!(
			bytes,
			br#"{".sig":"sig","data":"aGk=","seq":1,"type":"test"}"#
		);
	}

	#[test]
	fn absent_fields_are_omitted_not_null() {
		let bytes = CanonicalObject::new()
			.bytes("data", None)
			.uint("seq", Some(1))
			.finish();
		assert_eq!(bytes, br#"{"seq":1}"#);
	}

	#[test]
	fn parser_rejects_unknown_fields() {
		let bytes = br#"{"seq":1,"bogus":"x"}"#;
		let parsed = CanonicalParser::parse(bytes).unwrap();
		assert_eq!(
			parsed.deny_unknown_fields(&["seq"]),
			Err(CanonicalDecodeError::UnknownField("bogus".to_string()))
		);
	}

	#[test]
	fn parser_rejects_leading_zero() {
		let bytes = br#"{"seq":01}"#;
		assert!(CanonicalParser::parse(bytes).is_err());
	}

	#[test]
	fn parser_rejects_trailing_data() {
		let bytes = br#"{"seq":1}garbage"#;
		assert!(CanonicalParser::parse(bytes).is_err());
	}

	#[test]
	fn round_trip_bytes_and_ints() {
		let original = CanonicalObject::new()
			.bytes("data", Some(b"hello world"))
			.uint("seq", Some(42))
			.str("type", Some("t"))
			.finish();
		let parsed = CanonicalParser::parse(&original).unwrap();
		assert_eq!(parsed.get_bytes("data").unwrap().unwrap(), b"hello world");
		assert_eq!(parsed.get_uint("seq").unwrap().unwrap(), 42);
		assert_eq!(parsed.get_str("type").unwrap().unwrap(), "t");
	}
}
