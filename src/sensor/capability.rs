use serde::Serialize;
use strum_macros::Display;

/// Coarse classification of which sensor inputs are live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapabilityLevel {
    Full,
    NoHeading,
    NoPosition,
    NoOrientation,
    Off,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Liveness {
    pub absolute: bool,
    pub relative: bool,
    pub geolocation: bool,
}

impl Liveness {
    pub fn classify(&self) -> CapabilityLevel {
        classify(self)
    }
}

/// Checked in a fixed order; the first match wins. When geolocation and
/// orientation are both missing pieces, `NoPosition` is reported.
pub fn classify(live: &Liveness) -> CapabilityLevel {
    let any_orientation = live.absolute || live.relative;
    if live.absolute && live.geolocation {
        CapabilityLevel::Full
    } else if !any_orientation && !live.geolocation {
        CapabilityLevel::Off
    } else if !live.geolocation {
        CapabilityLevel::NoPosition
    } else if live.relative && !live.absolute {
        CapabilityLevel::NoHeading
    } else {
        CapabilityLevel::NoOrientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(absolute: bool, relative: bool, geolocation: bool) -> Liveness {
        Liveness {
            absolute,
            relative,
            geolocation,
        }
    }

    #[test]
    fn precedence_table() {
        assert_eq!(classify(&live(true, false, true)), CapabilityLevel::Full);
        assert_eq!(classify(&live(true, true, true)), CapabilityLevel::Full);
        assert_eq!(classify(&live(false, false, false)), CapabilityLevel::Off);
        assert_eq!(classify(&live(true, false, false)), CapabilityLevel::NoPosition);
        assert_eq!(classify(&live(false, true, true)), CapabilityLevel::NoHeading);
        assert_eq!(classify(&live(false, false, true)), CapabilityLevel::NoOrientation);
    }

    #[test]
    fn position_gap_wins_over_orientation_gap() {
        assert_eq!(classify(&live(false, true, false)), CapabilityLevel::NoPosition);
    }

    #[test]
    fn labels_match_wire_names() {
        assert_eq!(CapabilityLevel::NoHeading.to_string(), "NO_HEADING");
        assert_eq!(
            serde_json::to_string(&CapabilityLevel::Full).unwrap(),
            "\"FULL\""
        );
    }
}
