use std::fmt::Display;
use std::hash::{
    Hash,
    Hasher,
};

use serde::{
    Deserialize,
    Serialize,
};

use super::dataset::Dataset;

/// A single cell value lifted out of a polars column.
///
/// Used as grouping key and as the scalar case of a nested payload. Floats
/// compare and hash by bit pattern so that every value can key a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl PartialEq for ScalarValue {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => true,
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Int(a), ScalarValue::Int(b)) => a == b,
            (ScalarValue::Float(a), ScalarValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ScalarValue::Str(a), ScalarValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        std::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::Null => {},
            ScalarValue::Bool(v) => v.hash(state),
            ScalarValue::Int(v) => v.hash(state),
            ScalarValue::Float(v) => v.to_bits().hash(state),
            ScalarValue::Str(v) => v.hash(state),
        }
    }
}

impl Display for ScalarValue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl ScalarValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! scalar_from {
    ($variant: ident, $($t: ty => $conv: expr),+) => {
        $(
            impl From<$t> for ScalarValue {
                fn from(value: $t) -> Self {
                    ScalarValue::$variant($conv(value))
                }
            }
        )+
    };
}

scalar_from!(Bool, bool => std::convert::identity);
scalar_from!(Int, i64 => std::convert::identity, i32 => i64::from, u32 => i64::from);
scalar_from!(Float, f64 => std::convert::identity, f32 => f64::from);
scalar_from!(Str, String => std::convert::identity, &str => str::to_owned);

impl From<usize> for ScalarValue {
    fn from(value: usize) -> Self {
        ScalarValue::Int(value as i64)
    }
}

/// Output of a renderer: opaque bytes plus a media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub media_type: String,
    pub bytes:      Vec<u8>,
}

impl Artifact {
    pub fn new(
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// One slot of a nested-table column.
///
/// Results of a per-group map are heterogeneous, so every slot records which
/// case it holds.
#[derive(Debug, Clone)]
pub enum Payload {
    Dataset(Dataset),
    Scalar(ScalarValue),
    Artifact(Artifact),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Dataset(_) => "dataset",
            Payload::Scalar(_) => "scalar",
            Payload::Artifact(_) => "artifact",
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Payload::Dataset(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Payload::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Payload::Artifact(a) => Some(a),
            _ => None,
        }
    }

    /// One-line description used when a nested table is rendered.
    pub fn summary(&self) -> String {
        match self {
            Payload::Dataset(d) => {
                format!("<dataset [{} × {}]>", d.n_features(), d.n_cells())
            },
            Payload::Scalar(s) => s.to_string(),
            Payload::Artifact(a) => {
                format!("<artifact {} ({} bytes)>", a.media_type, a.bytes.len())
            },
        }
    }
}

impl From<Dataset> for Payload {
    fn from(value: Dataset) -> Self {
        Payload::Dataset(value)
    }
}

impl From<Artifact> for Payload {
    fn from(value: Artifact) -> Self {
        Payload::Artifact(value)
    }
}

macro_rules! payload_from_scalar {
    ($($t: ty),+) => {
        $(
            impl From<$t> for Payload {
                fn from(value: $t) -> Self {
                    Payload::Scalar(value.into())
                }
            }
        )+
    };
}

payload_from_scalar!(ScalarValue, bool, i64, i32, u32, usize, f64, f32, String, &str);

#[cfg(test)]
mod tests {
    use hashbrown::HashSet;

    use super::*;

    #[test]
    fn test_float_keys_hash_by_bits() {
        let set: HashSet<ScalarValue> =
            [1.5f64.into(), 1.5f64.into(), ScalarValue::Null, "a".into()]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 3);
        assert_ne!(ScalarValue::Int(1), ScalarValue::Float(1.0));
    }

    #[test]
    fn test_payload_summary() {
        assert_eq!(Payload::from(42usize).summary(), "42");
        let artifact = Payload::from(Artifact::new("image/png", vec![0; 8]));
        assert_eq!(artifact.kind(), "artifact");
        assert_eq!(artifact.summary(), "<artifact image/png (8 bytes)>");
    }

    #[test]
    fn test_scalar_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            ScalarValue::from(3i64),
            ScalarValue::from("T"),
            ScalarValue::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[3,"T",null]"#);
    }
}
