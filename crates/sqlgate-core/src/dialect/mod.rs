//! SQL dialect support

use sqlparser::dialect::{Dialect, GenericDialect, SnowflakeDialect};
use std::str::FromStr;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Snowflake,
    Generic,
}

impl SqlDialect {
    /// Get the sqlparser dialect for parsing
    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Snowflake => Box::new(SnowflakeDialect {}),
            SqlDialect::Generic => Box::new(GenericDialect {}),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snowflake" | "sf" => Ok(SqlDialect::Snowflake),
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            _ => Err(format!(
                "Unknown dialect: '{}'. Supported dialects: snowflake, generic.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::Snowflake => write!(f, "snowflake"),
            SqlDialect::Generic => write!(f, "generic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!("Snowflake".parse::<SqlDialect>(), Ok(SqlDialect::Snowflake));
        assert_eq!("ansi".parse::<SqlDialect>(), Ok(SqlDialect::Generic));
        assert!("oracle".parse::<SqlDialect>().is_err());
    }
}
