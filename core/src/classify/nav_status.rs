use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse navigational status grouping used by the map filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneralStatus {
    Underway,
    #[serde(rename = "at anchor")]
    AtAnchor,
    Restricted,
    Moored,
    Aground,
    Fishing,
    Unknown,
}

const DETAILED: [&str; 18] = [
    "under way using engine",
    "at anchor",
    "not under command",
    "restricted manoeuvrability",
    "constrained by her draught",
    "moored",
    "aground",
    "engaged in fishing",
    "under way sailing",
    "reserved for future amendment (DG/HS/MP C, HSC)",
    "reserved for future amendment (DG/HS/MP A, WIG)",
    "reserved for future use",
    "reserved for future use",
    "reserved for future use",
    "AIS-SART (active)",
    "not defined",
    "default",
    "AIS-SART under test",
];

impl GeneralStatus {
    pub const ALL: [GeneralStatus; 7] = [
        GeneralStatus::Underway,
        GeneralStatus::AtAnchor,
        GeneralStatus::Restricted,
        GeneralStatus::Moored,
        GeneralStatus::Aground,
        GeneralStatus::Fishing,
        GeneralStatus::Unknown,
    ];

    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(0) | Some(8) => GeneralStatus::Underway,
            Some(1) => GeneralStatus::AtAnchor,
            Some(2) | Some(3) | Some(4) | Some(9) | Some(10) => GeneralStatus::Restricted,
            Some(5) => GeneralStatus::Moored,
            Some(6) => GeneralStatus::Aground,
            Some(7) => GeneralStatus::Fishing,
            _ => GeneralStatus::Unknown,
        }
    }

    /// Status codes grouped under this general status.
    pub fn codes(&self) -> &'static [u8] {
        match self {
            GeneralStatus::Underway => &[0, 8],
            GeneralStatus::AtAnchor => &[1],
            GeneralStatus::Restricted => &[2, 3, 4, 9, 10],
            GeneralStatus::Moored => &[5],
            GeneralStatus::Aground => &[6],
            GeneralStatus::Fishing => &[7],
            GeneralStatus::Unknown => &[11, 12, 13, 14, 15, 16, 17],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneralStatus::Underway => "underway",
            GeneralStatus::AtAnchor => "at anchor",
            GeneralStatus::Restricted => "restricted",
            GeneralStatus::Moored => "moored",
            GeneralStatus::Aground => "aground",
            GeneralStatus::Fishing => "fishing",
            GeneralStatus::Unknown => "unknown",
        }
    }
}

/// Full AIS wording of a navigational status code.
pub fn describe(code: u8) -> &'static str {
    DETAILED.get(code as usize).copied().unwrap_or("not defined")
}

/// Status code behind a textual description, as the bounds endpoint serves
/// it. `"Unknown"` and unrecognised wording have no code.
pub fn code_of(description: &str) -> Option<u8> {
    let wanted = description.trim();
    if let Some(index) = DETAILED
        .iter()
        .position(|detail| detail.eq_ignore_ascii_case(wanted))
    {
        return Some(index as u8);
    }
    let lower = wanted.to_ascii_lowercase();
    if lower.starts_with("reserved for future amendment") {
        return Some(if lower.contains("dangerous goods") || lower.contains("hsc") {
            10
        } else {
            9
        });
    }
    None
}

impl fmt::Display for GeneralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        GeneralStatus::ALL
            .into_iter()
            .find(|status| status.as_str().replace(' ', "").eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown status `{}`", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_group_into_general_statuses() {
        assert_eq!(GeneralStatus::from_code(Some(8)), GeneralStatus::Underway);
        assert_eq!(GeneralStatus::from_code(Some(3)), GeneralStatus::Restricted);
        assert_eq!(GeneralStatus::from_code(Some(16)), GeneralStatus::Unknown);
        assert_eq!(GeneralStatus::from_code(None), GeneralStatus::Unknown);
        for status in GeneralStatus::ALL {
            for &code in status.codes() {
                assert_eq!(GeneralStatus::from_code(Some(code)), status);
            }
        }
    }

    #[test]
    fn detailed_description_covers_table_and_beyond() {
        assert_eq!(describe(5), "moored");
        assert_eq!(describe(14), "AIS-SART (active)");
        assert_eq!(describe(200), "not defined");
    }

    #[test]
    fn status_parses_with_or_without_spaces() {
        assert_eq!("atanchor".parse::<GeneralStatus>(), Ok(GeneralStatus::AtAnchor));
        assert_eq!("At Anchor".parse::<GeneralStatus>(), Ok(GeneralStatus::AtAnchor));
        assert!("drifting".parse::<GeneralStatus>().is_err());
    }

    #[test]
    fn backend_wording_maps_back_to_codes() {
        assert_eq!(code_of("Under way using engine"), Some(0));
        assert_eq!(code_of("Moored"), Some(5));
        assert_eq!(code_of("Not defined"), Some(15));
        assert_eq!(code_of("reserved for future use"), Some(11));
        assert_eq!(
            code_of("reserved for future amendment of navigational status for ships carrying DG"),
            Some(9)
        );
        assert_eq!(
            code_of("reserved for future amendment of navigational status for ships carrying dangerous goods (DG)"),
            Some(10)
        );
        assert_eq!(code_of("Unknown"), None);
        assert_eq!(code_of("drifting"), None);
    }

    #[test]
    fn at_anchor_serializes_with_a_space() {
        assert_eq!(
            serde_json::to_string(&GeneralStatus::AtAnchor).unwrap(),
            r#""at anchor""#
        );
        assert_eq!(
            serde_json::from_str::<GeneralStatus>(r#""at anchor""#).unwrap(),
            GeneralStatus::AtAnchor
        );
        assert_eq!(
            serde_json::to_string(&GeneralStatus::Underway).unwrap(),
            r#""underway""#
        );
    }
}
