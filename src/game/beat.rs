use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A beat position as authored in a chart: `whole + numerator / denominator`.
///
/// Runtime math works on `f64` beats; this type survives only so that notes
/// landing on the same musical position can be grouped without float noise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "[i64; 3]", into = "[i64; 3]")]
pub struct BeatFraction {
    pub whole: i64,
    pub numerator: i64,
    pub denominator: i64,
}

impl BeatFraction {
    pub const fn new(whole: i64, numerator: i64, denominator: i64) -> Self {
        Self { whole, numerator, denominator }
    }

    pub const fn whole(beat: i64) -> Self {
        Self::new(beat, 0, 1)
    }

    #[inline(always)]
    fn is_plain(self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    pub fn to_beat(self) -> f64 {
        if self.is_plain() {
            self.whole as f64
        } else {
            self.whole as f64 + self.numerator as f64 / self.denominator as f64
        }
    }

    /// The value as a single fraction `(n, d)` with `d > 0`.
    fn as_ratio(self) -> (i128, i128) {
        if self.is_plain() {
            return (self.whole as i128, 1);
        }
        let (mut num, mut den) = (self.numerator as i128, self.denominator as i128);
        if den < 0 {
            num = -num;
            den = -den;
        }
        (self.whole as i128 * den + num, den)
    }

    /// Two authored beats that name the same instant, e.g. `4 1/4` and `4 25/100`.
    pub fn is_simultaneous(self, other: BeatFraction) -> bool {
        let (an, ad) = self.as_ratio();
        let (bn, bd) = other.as_ratio();
        an * bd == bn * ad
    }
}

impl PartialEq for BeatFraction {
    fn eq(&self, other: &Self) -> bool {
        self.is_simultaneous(*other)
    }
}

impl Eq for BeatFraction {}

impl PartialOrd for BeatFraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeatFraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.as_ratio();
        let (bn, bd) = other.as_ratio();
        (an * bd).cmp(&(bn * ad))
    }
}

impl From<[i64; 3]> for BeatFraction {
    fn from(parts: [i64; 3]) -> Self {
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl From<BeatFraction> for [i64; 3] {
    fn from(beat: BeatFraction) -> Self {
        [beat.whole, beat.numerator, beat.denominator]
    }
}

impl fmt::Display for BeatFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_plain() {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}:{}/{}", self.whole, self.numerator, self.denominator)
        }
    }
}

impl FromStr for BeatFraction {
    type Err = String;

    /// Accepts `4`, `4:1/4`, or the three comma-separated parts `4,1,4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Beat value is empty".to_string());
        }

        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("Beat '{}' has a non-integer part '{}'", trimmed, part.trim()))
        };

        if let Some((whole, frac)) = trimmed.split_once(':') {
            let (num, den) = frac
                .split_once('/')
                .ok_or_else(|| format!("Beat '{}' is missing a '/' in its fraction", trimmed))?;
            return Ok(Self::new(parse(whole)?, parse(num)?, parse(den)?));
        }

        let parts: Vec<&str> = trimmed.split(',').collect();
        match parts.as_slice() {
            [whole] => Ok(Self::whole(parse(whole)?)),
            [whole, num, den] => Ok(Self::new(parse(whole)?, parse(num)?, parse(den)?)),
            _ => Err(format!("Beat '{}' must have one or three parts", trimmed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_past_four_in_two_spellings_is_simultaneous() {
        let a = BeatFraction::new(4, 1, 4);
        let b = BeatFraction::new(4, 25, 100);
        assert!(a.is_simultaneous(b));
        assert_eq!(a, b);
        assert_eq!(a.to_beat(), 4.25);
    }

    #[test]
    fn fraction_overflowing_a_whole_beat_still_groups() {
        assert!(BeatFraction::new(4, 5, 4).is_simultaneous(BeatFraction::new(5, 1, 4)));
        assert!(!BeatFraction::new(4, 1, 3).is_simultaneous(BeatFraction::new(4, 1, 4)));
    }

    #[test]
    fn zero_denominator_collapses_to_whole_beat() {
        let beat = BeatFraction::new(7, 3, 0);
        assert_eq!(beat.to_beat(), 7.0);
        assert_eq!(beat, BeatFraction::whole(7));
    }

    #[test]
    fn ordering_follows_rational_value() {
        let mut beats = vec![
            BeatFraction::new(1, 1, 2),
            BeatFraction::new(0, 3, 4),
            BeatFraction::new(1, 1, 3),
        ];
        beats.sort();
        let floats: Vec<f64> = beats.iter().map(|b| b.to_beat()).collect();
        assert_eq!(floats[0], 0.75);
        assert!(floats[1] < floats[2]);
    }

    #[test]
    fn parses_both_text_forms() {
        assert_eq!("4:1/4".parse::<BeatFraction>(), Ok(BeatFraction::new(4, 1, 4)));
        assert_eq!("4, 1, 4".parse::<BeatFraction>(), Ok(BeatFraction::new(4, 1, 4)));
        assert_eq!("12".parse::<BeatFraction>(), Ok(BeatFraction::whole(12)));
        assert!("4:1".parse::<BeatFraction>().is_err());
        assert!("a,b,c".parse::<BeatFraction>().is_err());
    }

    #[test]
    fn deserializes_from_triple() {
        let beat: BeatFraction = serde_json::from_str("[2, 1, 2]").unwrap();
        assert_eq!(beat.to_beat(), 2.5);
        assert_eq!(serde_json::to_string(&beat).unwrap(), "[2,1,2]");
    }
}
