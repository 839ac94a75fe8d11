use crate::error::PropertyFormatError;
use std::collections::HashMap;

/// A single typed `<property>` value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `type="bool"`
    Bool(bool),
    /// `type="int"` (and `object` references)
    I64(i64),
    /// `type="float"`
    F32(f32),
    /// Untyped, `string`, `file` and `color` properties
    String(String),
}

impl PropertyValue {
    /// Parses `literal` according to the declared Tiled `type` attribute.
    ///
    /// Missing type means string. Numbers and booleans are parsed strictly:
    /// `"1"` is not a bool, `"3.0"` is not an int and floats must be finite.
    pub fn parse(name: &str, kind: Option<&str>, literal: &str) -> Result<Self, PropertyFormatError> {
        let malformed = |kind: &'static str| PropertyFormatError::Malformed {
            name: name.to_owned(),
            kind,
            value: literal.to_owned(),
        };

        match kind {
            None | Some("string") | Some("file") | Some("color") => {
                Ok(PropertyValue::String(literal.to_owned()))
            }
            Some("int") | Some("object") => literal
                .parse::<i64>()
                .map(PropertyValue::I64)
                .map_err(|_| malformed("int")),
            Some("float") => match literal.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(PropertyValue::F32(v)),
                _ => Err(malformed("float")),
            },
            Some("bool") => match literal {
                "true" => Ok(PropertyValue::Bool(true)),
                "false" => Ok(PropertyValue::Bool(false)),
                _ => Err(malformed("bool")),
            },
            Some(other) => Err(PropertyFormatError::UnsupportedType {
                name: name.to_owned(),
                kind: other.to_owned(),
            }),
        }
    }
}

/// Name-keyed, immutable property set attached to maps, tile sets, tiles, layers,
/// object groups and objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTable {
    values: HashMap<String, PropertyValue>,
}

impl PropertyTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Returns the value if it is a bool.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is an int.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is an int that fits in an `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// Returns the value if it is a float. Ints are widened.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            PropertyValue::F32(v) => Some(*v),
            PropertyValue::I64(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Returns the value if it is a string.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Whether a property with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no properties.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Later entries with the same name replace earlier ones.
impl FromIterator<(String, PropertyValue)> for PropertyTable {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_values_stay_verbatim() {
        let v = PropertyValue::parse("msg", None, " 42 ").unwrap();
        assert_eq!(v, PropertyValue::String(" 42 ".into()));
    }

    #[test]
    fn typed_values_parse_strictly() {
        assert_eq!(
            PropertyValue::parse("n", Some("int"), "-7").unwrap(),
            PropertyValue::I64(-7)
        );
        assert_eq!(
            PropertyValue::parse("f", Some("float"), "0.5").unwrap(),
            PropertyValue::F32(0.5)
        );
        assert_eq!(
            PropertyValue::parse("b", Some("bool"), "false").unwrap(),
            PropertyValue::Bool(false)
        );

        for (kind, literal) in [("int", "3.0"), ("int", "x"), ("float", "fast"), ("float", "NaN"), ("float", "inf"), ("float", "-infinity"), ("bool", "1"), ("bool", "TRUE")] {
            let err = PropertyValue::parse("p", Some(kind), literal).unwrap_err();
            assert!(matches!(err, PropertyFormatError::Malformed { .. }), "{kind} {literal}");
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = PropertyValue::parse("p", Some("vector"), "1,2").unwrap_err();
        assert_eq!(
            err,
            PropertyFormatError::UnsupportedType {
                name: "p".into(),
                kind: "vector".into()
            }
        );
    }

    #[test]
    fn getters_check_the_variant() {
        let table: PropertyTable = [
            ("solid".to_string(), PropertyValue::Bool(true)),
            ("hp".to_string(), PropertyValue::I64(5_000_000_000)),
            ("speed".to_string(), PropertyValue::I64(3)),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.get_bool("solid"), Some(true));
        assert_eq!(table.get_string("solid"), None);
        assert_eq!(table.get_i64("hp"), Some(5_000_000_000));
        assert_eq!(table.get_i32("hp"), None);
        assert_eq!(table.get_f32("speed"), Some(3.0));
        assert_eq!(table.len(), 3);
    }
}
