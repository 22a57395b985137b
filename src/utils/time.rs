use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

// Formatos ISO 8601 UTC aceitos no endpoint de summary: RFC3339 com
// offset, "YYYY-MM-DDTHH:MM:SS[.sss]Z", o mesmo sem timezone (assumido
// UTC) e "YYYY-MM-DD".
pub fn parse_flexible(raw: &str) -> Result<DateTime<Utc>, InvalidTimestamp> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(parsed.and_time(NaiveTime::MIN).and_utc());
    }
    Err(InvalidTimestamp(raw.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("invalid ISO UTC date '{0}' (expected e.g. 2020-07-10T12:34:56.000Z)")]
pub struct InvalidTimestamp(String);

// Serde fixando RFC3339 com precisão de nanosegundos, a forma usada nos
// registros persistidos e no payload dos Payment Processors.
pub mod rfc3339_nanos {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// Same thing for optional fields
pub mod rfc3339_nanos_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Nanos, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| Some(parsed.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
