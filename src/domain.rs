use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Star count reported when a repository could not be fetched
pub const STARS_UNAVAILABLE: i64 = -1;

/// `GET /rate_limit` payload, reduced to the fields the badge needs.
///
/// Every level is optional so a response missing nested telemetry yields a
/// zero snapshot instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitResponse {
    pub resources: Option<RateLimitResources>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitResources {
    pub core: Option<RateLimitCore>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitCore {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub remaining: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub limit: Option<u64>,
}

/// Anything other than an unsigned integer reads as absent
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_u64()))
}

impl RateLimitResponse {
    pub fn snapshot(&self) -> RateLimitSnapshot {
        let core = self
            .resources
            .as_ref()
            .and_then(|r| r.core.as_ref());

        RateLimitSnapshot {
            remaining: core.and_then(|c| c.remaining).unwrap_or(0),
            limit: core.and_then(|c| c.limit).unwrap_or(0),
        }
    }
}

/// `GET /repos/{owner}/{name}` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryDetails {
    pub stargazers_count: Option<Value>,
}

impl RepositoryDetails {
    /// Star count as an integer, accepting numbers and numeric strings.
    ///
    /// Strings are read up to the first non-digit, so `"42 stars"` is 42.
    /// Negative or non-numeric values yield `None`.
    pub fn star_count(&self) -> Option<i64> {
        match self.stargazers_count.as_ref()? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .filter(|count| *count >= 0),
            Value::String(s) => parse_leading_int(s).filter(|count| *count >= 0),
            _ => None,
        }
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Remaining and total API quota
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub remaining: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    /// Quota could not be read
    Unavailable,
    Normal,
}

impl BadgeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeColor::Unavailable => "#FF0000",
            BadgeColor::Normal => "#0366D6",
        }
    }
}

/// Compact quota summary shown on the extension's toolbar badge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeState {
    pub text: CompactString,
    pub color: BadgeColor,
}

impl Serialize for BadgeState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("BadgeState", 2)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("color", self.color.as_str())?;
        state.end()
    }
}

impl BadgeState {
    pub const UNAVAILABLE_TEXT: &'static str = "N/A";

    pub fn unavailable() -> Self {
        Self {
            text: Self::UNAVAILABLE_TEXT.into(),
            color: BadgeColor::Unavailable,
        }
    }

    /// One decimal at or above 1000 remaining calls, none below.
    pub fn for_remaining(remaining: u64) -> Self {
        let decimals = if remaining < 1000 { 0 } else { 1 };
        Self {
            text: abbreviate(remaining, decimals),
            color: BadgeColor::Normal,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.color == BadgeColor::Unavailable
    }
}

const MAGNITUDES: [(f64, &str); 4] = [(1e12, "t"), (1e9, "b"), (1e6, "m"), (1e3, "k")];

/// Abbreviate a count with k/m/b/t suffixes, rounding half away from zero.
///
/// A value that rounds up to 1000 of one unit is promoted to the next unit,
/// so 999 950 with one decimal reads `1.0m` rather than `1000.0k`.
pub fn abbreviate(value: u64, decimals: usize) -> CompactString {
    let factor = 10f64.powi(decimals as i32);
    let scaled = |unit: f64| (value as f64 * factor / unit).round() / factor;

    let mut index = MAGNITUDES
        .iter()
        .position(|(unit, _)| value as f64 >= *unit);

    if let Some(i) = index
        && i > 0
        && scaled(MAGNITUDES[i].0) >= 1000.0
    {
        index = Some(i - 1);
    }

    match index {
        Some(i) => {
            let (unit, suffix) = MAGNITUDES[i];
            format_compact!("{:.*}{}", decimals, scaled(unit), suffix)
        },
        None => format_compact!("{:.*}", decimals, scaled(1.0)),
    }
}
