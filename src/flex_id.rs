use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Integer identifier that the backend may send as a JSON number or as a
/// numeric string. Serializes back as a plain number.
macro_rules! flex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_i64(self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserialize_flex_i64(deserializer).map($name)
            }
        }
    };
}

flex_id!(
    /// Stable lineup channel identity.
    ChannelId
);
flex_id!(
    /// Identity of one channel-to-stream binding; distinct from the stream id.
    MappingId
);
flex_id!(
    /// Provider (Xtream) stream identity.
    StreamId
);

/// Deserialize an `i64` from a number or a numeric string
pub fn deserialize_flex_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct FlexIntVisitor;

    impl<'de> Visitor<'de> for FlexIntVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or a numeric string")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            i64::try_from(v).map_err(|_| E::custom("id out of range"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.fract() == 0.0 && v.is_finite() {
                Ok(v as i64)
            } else {
                Err(E::custom("id must be an integer"))
            }
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            v.trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("invalid numeric id: {v:?}")))
        }
    }

    deserializer.deserialize_any(FlexIntVisitor)
}

/// Deserialize an `f32` from a number, a numeric string, or null (0.0).
/// Confidence scores arrive in all three shapes depending on backend version.
pub fn deserialize_flex_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0) as f32),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom("invalid float")),
        serde_json::Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!("unexpected value {other}"))),
    }
}
