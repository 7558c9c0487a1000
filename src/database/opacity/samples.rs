//! JSON encoding of opacity samples
//!
//! JSON has no literal for infinities or NaN, and `serde_json` would write
//! them as `null`. Finite samples are written as plain numbers; every other
//! sample is written as the hex text of its IEEE-754 bits (`"0x7ff0000000000000"`),
//! so each curve reads back bit for bit. `"inf"`, `"-inf"` and `"nan"` are
//! also accepted when reading.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Text form of a non-finite sample
pub fn encode_non_finite(value: f64) -> String {
    format!("0x{:016x}", value.to_bits())
}

/// Parse the text form of a sample
pub fn decode_sample_text(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).ok().map(f64::from_bits);
    }
    match text.to_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

/// Serialize a curve (use with `#[serde(with = "samples")]`)
pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        if value.is_finite() {
            seq.serialize_element(value)?;
        } else {
            seq.serialize_element(&encode_non_finite(*value))?;
        }
    }
    seq.end()
}

/// Deserialize a curve written by [`serialize`]
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let samples = Vec::<Sample>::deserialize(deserializer)?;
    Ok(samples.into_iter().map(|s| s.0).collect())
}

/// One sample, read from a JSON number or its text form
struct Sample(f64);

impl<'de> Deserialize<'de> for Sample {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SampleVisitor;

        impl Visitor<'_> for SampleVisitor {
            type Value = Sample;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number or the text form of a non-finite sample")
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Sample(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Sample(value as f64))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Sample(value as f64))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                decode_sample_text(value)
                    .map(Sample)
                    .ok_or_else(|| E::custom(format!("invalid opacity sample '{}'", value)))
            }
        }

        deserializer.deserialize_any(SampleVisitor)
    }
}

struct Curve<'a>(&'a [f64]);

impl Serialize for Curve<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize(self.0, serializer)
    }
}

#[derive(Deserialize)]
struct OwnedCurve(#[serde(deserialize_with = "deserialize")] Vec<f64>);

/// `molecule -> condition -> curve` maps (use with `#[serde(with = "samples::groups")]`)
pub mod groups {
    use super::*;

    type Groups = BTreeMap<String, BTreeMap<String, Vec<f64>>>;

    pub fn serialize<S>(groups: &Groups, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (molecule, curves) in groups {
            let curves: BTreeMap<&String, Curve<'_>> =
                curves.iter().map(|(key, c)| (key, Curve(c))).collect();
            map.serialize_entry(molecule, &curves)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Groups, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, BTreeMap<String, OwnedCurve>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(molecule, curves)| {
                (
                    molecule,
                    curves.into_iter().map(|(key, c)| (key, c.0)).collect(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        values: Vec<f64>,
    }

    fn bits(values: &[f64]) -> Vec<u64> {
        values.iter().map(|v| v.to_bits()).collect()
    }

    #[test]
    fn test_non_finite_written_as_text() {
        let wrapper = Wrapper {
            values: vec![0.0, f64::INFINITY, f64::NAN, -1.5e-30],
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert!(!json.contains("null"));
        assert!(json.contains("\"0x7ff0000000000000\""));

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(bits(&back.values), bits(&wrapper.values));
    }

    #[test]
    fn test_nan_payload_survives() {
        let odd_nan = f64::from_bits(0x7ff8_0000_dead_beef);
        let wrapper = Wrapper {
            values: vec![odd_nan, f64::NEG_INFINITY, -0.0],
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(bits(&back.values), bits(&wrapper.values));
    }

    #[test]
    fn test_readable_names_and_integers() {
        let back: Wrapper =
            serde_json::from_str(r#"{"values":[300,"inf","-inf","NaN",-2]}"#).unwrap();
        assert_eq!(back.values[0], 300.0);
        assert_eq!(back.values[1], f64::INFINITY);
        assert_eq!(back.values[2], f64::NEG_INFINITY);
        assert!(back.values[3].is_nan());
        assert_eq!(back.values[4], -2.0);
    }

    #[test]
    fn test_invalid_text_rejected() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"values":["warm"]}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"values":[null]}"#).is_err());
    }
}
