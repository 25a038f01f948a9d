use std::fmt::{Display, Formatter};

use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const DARK_THRESHOLD: f64 = 128.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub const BLACK: &'static str = "#000000";
    pub const WHITE: &'static str = "#FFFFFF";

    pub fn parse(input: &str) -> Result<Self, PlannerError> {
        let value = input.trim();
        let digits = value
            .strip_prefix('#')
            .ok_or_else(|| PlannerError::InvalidColor(input.to_string()))?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PlannerError::InvalidColor(input.to_string()));
        }
        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }

    pub fn random() -> Self {
        let mut rng = thread_rng();
        let mut value = String::with_capacity(7);
        value.push('#');
        for _ in 0..6 {
            value.push(HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char);
        }
        Self(value)
    }

    pub fn black() -> Self {
        Self(Self::BLACK.to_string())
    }

    pub fn white() -> Self {
        Self(Self::WHITE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&self.0[range], 16).unwrap_or_default()
        };
        (channel(1..3), channel(3..5), channel(5..7))
    }

    pub fn brightness(&self) -> f64 {
        let (r, g, b) = self.rgb();
        0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
    }

    pub fn is_dark(&self) -> bool {
        self.brightness() < DARK_THRESHOLD
    }

    pub fn contrast_text(&self) -> HexColor {
        if self.is_dark() {
            Self::white()
        } else {
            Self::black()
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = PlannerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

impl Display for HexColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::HexColor;

    #[test]
    fn parses_and_normalizes_case() {
        let color = HexColor::parse("#ff0080").expect("color should parse");
        assert_eq!(color.as_str(), "#FF0080");
        assert_eq!(color.rgb(), (255, 0, 128));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(HexColor::parse("ff0080").is_err());
        assert!(HexColor::parse("#ff008").is_err());
        assert!(HexColor::parse("#gg0080").is_err());
    }

    #[test]
    fn random_colors_are_well_formed() {
        for _ in 0..64 {
            let color = HexColor::random();
            assert_eq!(HexColor::parse(color.as_str()).expect("valid"), color);
        }
    }

    #[test]
    fn picks_contrasting_text() {
        assert!(HexColor::black().is_dark());
        assert!(!HexColor::white().is_dark());
        assert_eq!(HexColor::parse("#1E3A8A").unwrap().contrast_text(), HexColor::white());
        assert_eq!(HexColor::parse("#FDE68A").unwrap().contrast_text(), HexColor::black());
        // 0.587 * 218 = 127.97 sits just under the threshold
        assert!(HexColor::parse("#00DA00").unwrap().is_dark());
    }
}
