use super::{ProtocolError, parse_leading_float};

pub const TEMPERATURE_TAG: &str = "T:";
pub const HUMIDITY_TAG: &str = "H:";

/// Parses a `T:<celsius>` payload
pub fn parse_temperature(data: &str) -> Result<f64, ProtocolError> {
    parse_tagged_reading(data, TEMPERATURE_TAG)
}

/// Parses an `H:<percent>` payload
pub fn parse_humidity(data: &str) -> Result<f64, ProtocolError> {
    parse_tagged_reading(data, HUMIDITY_TAG)
}

fn parse_tagged_reading(data: &str, tag: &'static str) -> Result<f64, ProtocolError> {
    let value = data
        .trim()
        .strip_prefix(tag)
        .ok_or_else(|| ProtocolError::MissingTag {
            expected: tag,
            payload: data.to_string(),
        })?;
    parse_leading_float(value).ok_or_else(|| ProtocolError::InvalidNumber(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_readings() {
        assert_eq!(parse_temperature("T:24.5"), Ok(24.5));
        assert_eq!(parse_temperature("T:-2"), Ok(-2.0));
        assert_eq!(parse_humidity("H:55.1\0"), Ok(55.1));
        assert_eq!(parse_humidity(" H: 61 "), Ok(61.0));
    }

    #[test]
    fn test_wrong_tag_is_rejected() {
        assert_eq!(
            parse_temperature("H:55.1"),
            Err(ProtocolError::MissingTag {
                expected: "T:",
                payload: "H:55.1".to_string()
            })
        );
        assert!(parse_humidity("55.1").is_err());
    }

    #[test]
    fn test_missing_number_is_rejected() {
        assert_eq!(parse_temperature("T:--"), Err(ProtocolError::InvalidNumber("--".to_string())));
        assert_eq!(parse_humidity("H:"), Err(ProtocolError::InvalidNumber(String::new())));
    }
}
