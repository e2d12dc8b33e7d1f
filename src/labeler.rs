//! Food-desert classification of census tracts.
//!
//! A tract is a food desert when any of the four USDA ERS "low income, low
//! access" measures flags it. New measures are added as further OR terms.

use serde::Serialize;

use crate::error::IndicatorError;

pub const LILA_1_AND_10: &str = "LILATracts_1And10";
pub const LILA_HALF_AND_10: &str = "LILATracts_halfAnd10";
pub const LILA_1_AND_20: &str = "LILATracts_1And20";
pub const LILA_VEHICLE: &str = "LILATracts_Vehicle";

/// Indicator columns in the order they are checked.
pub const INDICATOR_COLUMNS: [&str; 4] = [LILA_1_AND_10, LILA_HALF_AND_10, LILA_1_AND_20, LILA_VEHICLE];

/// Name of the derived label column.
pub const LABEL_COLUMN: &str = "food_desert_label";

/// The four LILA flags of a tract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Indicators {
    pub lila_1_and_10: bool,
    pub lila_half_and_10: bool,
    pub lila_1_and_20: bool,
    pub lila_vehicle: bool,
}

impl Indicators {
    pub fn new(lila_1_and_10: bool, lila_half_and_10: bool, lila_1_and_20: bool, lila_vehicle: bool) -> Self {
        Self {
            lila_1_and_10,
            lila_half_and_10,
            lila_1_and_20,
            lila_vehicle,
        }
    }

    /// Parses raw cell values given in [`INDICATOR_COLUMNS`] order.
    pub fn parse(raw: [&str; 4]) -> Result<Self, IndicatorError> {
        Ok(Self {
            lila_1_and_10: parse_flag(LILA_1_AND_10, raw[0])?,
            lila_half_and_10: parse_flag(LILA_HALF_AND_10, raw[1])?,
            lila_1_and_20: parse_flag(LILA_1_AND_20, raw[2])?,
            lila_vehicle: parse_flag(LILA_VEHICLE, raw[3])?,
        })
    }

    pub fn as_array(&self) -> [bool; 4] {
        [
            self.lila_1_and_10,
            self.lila_half_and_10,
            self.lila_1_and_20,
            self.lila_vehicle,
        ]
    }
}

/// Parses a single indicator cell. Only `0` and `1` (including `0.0`/`1.0`)
/// are accepted; anything else would corrupt the label counts.
pub fn parse_flag(column: &'static str, raw: &str) -> Result<bool, IndicatorError> {
    match raw.trim() {
        "0" | "0.0" => Ok(false),
        "1" | "1.0" => Ok(true),
        _ => Err(IndicatorError {
            column,
            value: raw.to_string(),
        }),
    }
}

/// Returns `1` if at least one indicator is set, else `0`.
pub fn label(indicators: &Indicators) -> u8 {
    u8::from(indicators.as_array().iter().any(|&flag| flag))
}

/// Records that carry the four LILA indicators.
pub trait Classify {
    fn indicators(&self) -> &Indicators;
}

/// A record together with its derived food-desert label.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled<T> {
    pub record: T,
    pub food_desert_label: u8,
}

impl<T: Classify> Labeled<T> {
    pub fn new(record: T) -> Self {
        let food_desert_label = label(record.indicators());
        Self {
            record,
            food_desert_label,
        }
    }
}

/// Labels every record exactly once.
pub fn label_all<T: Classify>(records: Vec<T>) -> Vec<Labeled<T>> {
    records.into_iter().map(Labeled::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_all_sixteen_combinations() {
        for bits in 0u8..16 {
            let ind = Indicators::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            let expected = if bits == 0 { 0 } else { 1 };
            assert_eq!(label(&ind), expected, "indicators {:?}", ind.as_array());
        }
    }

    #[test]
    fn test_label_only_zero_for_no_flags() {
        assert_eq!(label(&Indicators::default()), 0);
        assert_eq!(label(&Indicators::new(false, false, false, true)), 1);
    }

    #[test]
    fn test_parse_flag_accepts_integer_and_float_forms() {
        assert_eq!(parse_flag(LILA_1_AND_10, "1"), Ok(true));
        assert_eq!(parse_flag(LILA_1_AND_10, "0"), Ok(false));
        assert_eq!(parse_flag(LILA_1_AND_10, " 1.0 "), Ok(true));
        assert_eq!(parse_flag(LILA_1_AND_10, "0.0"), Ok(false));
    }

    #[test]
    fn test_parse_flag_rejects_out_of_domain() {
        for raw in ["2", "-1", "0.5", "", "yes", "NaN", "1e0", "+1", "-0", "1.00"] {
            let err = parse_flag(LILA_VEHICLE, raw).unwrap_err();
            assert_eq!(err.column, LILA_VEHICLE);
            assert_eq!(err.value, raw);
        }
    }

    #[test]
    fn test_parse_reports_first_bad_column() {
        let err = Indicators::parse(["0", "x", "3", "0"]).unwrap_err();
        assert_eq!(err.column, LILA_HALF_AND_10);
    }

    #[test]
    fn test_label_all_keeps_records() {
        struct Tract(Indicators);
        impl Classify for Tract {
            fn indicators(&self) -> &Indicators {
                &self.0
            }
        }

        let labeled = label_all(vec![
            Tract(Indicators::new(true, false, false, false)),
            Tract(Indicators::default()),
        ]);
        let labels: Vec<u8> = labeled.iter().map(|l| l.food_desert_label).collect();
        assert_eq!(labels, vec![1, 0]);
    }
}
