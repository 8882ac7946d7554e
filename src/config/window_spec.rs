//! Declarative window description edited by the user
//!
//! Size and position values arrive from JSON as numbers or loosely formatted
//! strings. They are parsed into closed enums here so the resolver never sees
//! raw strings; anything unparseable lands in a documented fallback instead of
//! producing an error.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Raw JSON value accepted for size and position fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawToken {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Width or height: absolute pixels or a percentage of the work area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawToken", into = "RawToken")]
pub enum SizeSpec {
    Pixels(u32),
    Percent(f64),
}

/// Horizontal placement rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawToken", into = "RawToken")]
pub enum PositionX {
    Left,
    Center,
    CenterBottom,
    Right,
    Absolute(i32),
    /// Any other token; resolves like `Center`
    Unrecognized(String),
}

/// Vertical placement rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawToken", into = "RawToken")]
pub enum PositionY {
    Top,
    Center,
    Bottom,
    Absolute(i32),
    /// Any other token; resolves like `Bottom`
    Unrecognized(String),
}

/// Coarse stacking policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WindowLevel {
    #[default]
    Default,
    AlwaysOnTop,
    StayBehind,
}

/// Fine-grained platform stacking hint, only meaningful with `AlwaysOnTop`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlatformLevel {
    Normal,
    Floating,
    TornOffMenu,
    ModalPanel,
    MainMenu,
    Status,
    PopUpMenu,
    ScreenSaver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionSpec {
    pub x: PositionX,
    pub y: PositionY,
    pub offset_x: i32,
    pub offset_y: i32,
}

/// Geometry and behavior of one widget window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowSpec {
    pub width: SizeSpec,
    pub height: SizeSpec,
    pub position: PositionSpec,
    /// Advisory floor, applied as a WM size hint rather than by the resolver
    pub min_width: u32,
    pub min_height: u32,
    pub window_level: WindowLevel,
    #[serde(deserialize_with = "deserialize_level_lenient", skip_serializing_if = "Option::is_none")]
    pub level: Option<PlatformLevel>,
    pub resizable: bool,
    pub movable: bool,
    pub visible_on_all_workspaces: bool,
    pub fullscreenable: bool,
    /// When false the window never takes keyboard focus
    pub focusable: bool,
}

impl Default for PositionSpec {
    fn default() -> Self {
        Self {
            x: PositionX::CenterBottom,
            y: PositionY::Bottom,
            offset_x: 0,
            offset_y: -50,
        }
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            width: SizeSpec::Pixels(400),
            height: SizeSpec::Pixels(600),
            position: PositionSpec::default(),
            min_width: 300,
            min_height: 400,
            window_level: WindowLevel::Default,
            level: None,
            resizable: true,
            movable: true,
            visible_on_all_workspaces: true,
            fullscreenable: false,
            focusable: true,
        }
    }
}

/// Parse the leading decimal number of `s` the way a lenient float parser does:
/// optional whitespace and sign, digits, optional fraction and exponent.
/// Trailing garbage is ignored.
pub fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if frac_end > frac_start || digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // An exponent only counts when at least one digit follows it ("1e" is 1)
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

/// Integer truncation of the leading number (`"400.9px"` -> 400)
fn leading_integer(s: &str) -> Option<i64> {
    leading_number(s).map(|n| n.trunc() as i64)
}

fn clamp_u32(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

fn clamp_i32(n: i64) -> i32 {
    n.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl SizeSpec {
    /// Parse a user-typed size (`"400"`, `"80%"`)
    pub fn parse(text: &str) -> Self {
        Self::from(RawToken::Text(text.to_string()))
    }
}

impl From<RawToken> for SizeSpec {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Int(n) => SizeSpec::Pixels(clamp_u32(n)),
            RawToken::Float(f) => SizeSpec::Pixels(clamp_u32(f.trunc() as i64)),
            RawToken::Text(text) => {
                let text = text.trim();
                if let Some(number) = text.strip_suffix('%') {
                    // Unparseable percentages become 0% rather than an error
                    SizeSpec::Percent(leading_number(number).unwrap_or(0.0))
                } else {
                    SizeSpec::Pixels(leading_integer(text).map(clamp_u32).unwrap_or(0))
                }
            }
        }
    }
}

impl From<SizeSpec> for RawToken {
    fn from(size: SizeSpec) -> Self {
        match size {
            SizeSpec::Pixels(n) => RawToken::Int(n as i64),
            SizeSpec::Percent(p) => RawToken::Text(format!("{p}%")),
        }
    }
}

impl std::fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeSpec::Pixels(n) => write!(f, "{n}"),
            SizeSpec::Percent(p) => write!(f, "{p}%"),
        }
    }
}

impl From<RawToken> for PositionX {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Int(n) => PositionX::Absolute(clamp_i32(n)),
            RawToken::Float(f) => PositionX::Absolute(clamp_i32(f.round() as i64)),
            RawToken::Text(text) => match text.as_str() {
                "left" => PositionX::Left,
                "center" => PositionX::Center,
                "center-bottom" => PositionX::CenterBottom,
                "right" => PositionX::Right,
                _ => PositionX::Unrecognized(text),
            },
        }
    }
}

impl From<PositionX> for RawToken {
    fn from(x: PositionX) -> Self {
        match x {
            PositionX::Left => RawToken::Text("left".into()),
            PositionX::Center => RawToken::Text("center".into()),
            PositionX::CenterBottom => RawToken::Text("center-bottom".into()),
            PositionX::Right => RawToken::Text("right".into()),
            PositionX::Absolute(n) => RawToken::Int(n as i64),
            PositionX::Unrecognized(text) => RawToken::Text(text),
        }
    }
}

impl From<RawToken> for PositionY {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Int(n) => PositionY::Absolute(clamp_i32(n)),
            RawToken::Float(f) => PositionY::Absolute(clamp_i32(f.round() as i64)),
            RawToken::Text(text) => match text.as_str() {
                "top" => PositionY::Top,
                "center" => PositionY::Center,
                "bottom" => PositionY::Bottom,
                _ => PositionY::Unrecognized(text),
            },
        }
    }
}

impl From<PositionY> for RawToken {
    fn from(y: PositionY) -> Self {
        match y {
            PositionY::Top => RawToken::Text("top".into()),
            PositionY::Center => RawToken::Text("center".into()),
            PositionY::Bottom => RawToken::Text("bottom".into()),
            PositionY::Absolute(n) => RawToken::Int(n as i64),
            PositionY::Unrecognized(text) => RawToken::Text(text),
        }
    }
}

impl WindowLevel {
    pub const ALL: [WindowLevel; 3] = [WindowLevel::Default, WindowLevel::AlwaysOnTop, WindowLevel::StayBehind];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowLevel::Default => "default",
            WindowLevel::AlwaysOnTop => "alwaysOnTop",
            WindowLevel::StayBehind => "stayBehind",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == text)
    }
}

impl From<String> for WindowLevel {
    fn from(text: String) -> Self {
        Self::parse(&text).unwrap_or_else(|| {
            warn!(window_level = %text, "Unknown windowLevel, using default");
            WindowLevel::Default
        })
    }
}

impl From<WindowLevel> for String {
    fn from(level: WindowLevel) -> Self {
        level.as_str().to_string()
    }
}

impl PlatformLevel {
    pub const ALL: [PlatformLevel; 8] = [
        PlatformLevel::Normal,
        PlatformLevel::Floating,
        PlatformLevel::TornOffMenu,
        PlatformLevel::ModalPanel,
        PlatformLevel::MainMenu,
        PlatformLevel::Status,
        PlatformLevel::PopUpMenu,
        PlatformLevel::ScreenSaver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformLevel::Normal => "normal",
            PlatformLevel::Floating => "floating",
            PlatformLevel::TornOffMenu => "torn-off-menu",
            PlatformLevel::ModalPanel => "modal-panel",
            PlatformLevel::MainMenu => "main-menu",
            PlatformLevel::Status => "status",
            PlatformLevel::PopUpMenu => "pop-up-menu",
            PlatformLevel::ScreenSaver => "screen-saver",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == text)
    }
}

impl TryFrom<String> for PlatformLevel {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text).ok_or_else(|| format!("unknown platform level '{text}'"))
    }
}

impl From<PlatformLevel> for String {
    fn from(level: PlatformLevel) -> Self {
        level.as_str().to_string()
    }
}

impl std::fmt::Display for PlatformLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown fine levels are dropped with a warning instead of failing the whole config
fn deserialize_level_lenient<'de, D>(deserializer: D) -> Result<Option<PlatformLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|text| {
        let level = PlatformLevel::parse(&text);
        if level.is_none() {
            warn!(level = %text, "Unknown platform level, ignoring");
        }
        level
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(json: &str) -> SizeSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_size_number_is_pixels() {
        assert_eq!(size("400"), SizeSpec::Pixels(400));
    }

    #[test]
    fn test_size_numeric_string_truncates() {
        assert_eq!(size("\"400\""), SizeSpec::Pixels(400));
        assert_eq!(size("\"400.9\""), SizeSpec::Pixels(400));
        assert_eq!(size("\"250px\""), SizeSpec::Pixels(250));
    }

    #[test]
    fn test_size_garbage_string_is_zero() {
        assert_eq!(size("\"wide\""), SizeSpec::Pixels(0));
    }

    #[test]
    fn test_size_percent() {
        assert_eq!(size("\"80%\""), SizeSpec::Percent(80.0));
        assert_eq!(size("\"12.5%\""), SizeSpec::Percent(12.5));
    }

    #[test]
    fn test_size_unparseable_percent_is_zero_percent() {
        assert_eq!(size("\"abc%\""), SizeSpec::Percent(0.0));
        assert_eq!(size("\"%\""), SizeSpec::Percent(0.0));
    }

    #[test]
    fn test_size_serializes_back_to_user_form() {
        assert_eq!(serde_json::to_string(&SizeSpec::Pixels(400)).unwrap(), "400");
        assert_eq!(serde_json::to_string(&SizeSpec::Percent(50.0)).unwrap(), "\"50%\"");
    }

    #[test]
    fn test_position_tokens() {
        let x: PositionX = serde_json::from_str("\"center-bottom\"").unwrap();
        assert_eq!(x, PositionX::CenterBottom);
        let x: PositionX = serde_json::from_str("120").unwrap();
        assert_eq!(x, PositionX::Absolute(120));
        let y: PositionY = serde_json::from_str("-40").unwrap();
        assert_eq!(y, PositionY::Absolute(-40));
    }

    #[test]
    fn test_unknown_position_token_is_kept() {
        let x: PositionX = serde_json::from_str("\"middle\"").unwrap();
        assert_eq!(x, PositionX::Unrecognized("middle".to_string()));
        assert_eq!(serde_json::to_string(&x).unwrap(), "\"middle\"");
    }

    #[test]
    fn test_numeric_string_position_is_not_absolute() {
        let y: PositionY = serde_json::from_str("\"100\"").unwrap();
        assert_eq!(y, PositionY::Unrecognized("100".to_string()));
    }

    #[test]
    fn test_window_level_unknown_falls_back_to_default() {
        let level: WindowLevel = serde_json::from_str("\"sometimes\"").unwrap();
        assert_eq!(level, WindowLevel::Default);
        let level: WindowLevel = serde_json::from_str("\"stayBehind\"").unwrap();
        assert_eq!(level, WindowLevel::StayBehind);
    }

    #[test]
    fn test_platform_level_names() {
        for level in PlatformLevel::ALL {
            assert_eq!(PlatformLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(PlatformLevel::parse("desktop"), None);
    }

    #[test]
    fn test_spec_partial_json_uses_defaults() {
        let spec: WindowSpec = serde_json::from_str(r#"{"width": "50%", "level": "status"}"#).unwrap();
        assert_eq!(spec.width, SizeSpec::Percent(50.0));
        assert_eq!(spec.height, SizeSpec::Pixels(600));
        assert_eq!(spec.position, PositionSpec::default());
        assert_eq!(spec.level, Some(PlatformLevel::Status));
    }

    #[test]
    fn test_spec_unknown_level_dropped() {
        let spec: WindowSpec = serde_json::from_str(r#"{"level": "desktop"}"#).unwrap();
        assert_eq!(spec.level, None);
    }

    #[test]
    fn test_spec_camel_case_keys() {
        let json = serde_json::to_value(WindowSpec::default()).unwrap();
        assert_eq!(json["position"]["offsetY"], -50);
        assert_eq!(json["position"]["x"], "center-bottom");
        assert_eq!(json["windowLevel"], "default");
        assert_eq!(json["visibleOnAllWorkspaces"], true);
        assert_eq!(json["focusable"], true);
        assert!(json.get("level").is_none());
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("  42abc"), Some(42.0));
        assert_eq!(leading_number("-3.5"), Some(-3.5));
        assert_eq!(leading_number(".5"), Some(0.5));
        assert_eq!(leading_number("7."), Some(7.0));
        assert_eq!(leading_number("."), None);
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_leading_number_exponent() {
        assert_eq!(leading_number("1e2"), Some(100.0));
        assert_eq!(leading_number("2.5E-1px"), Some(0.25));
        assert_eq!(leading_number("3e+1"), Some(30.0));
        assert_eq!(leading_number("1e"), Some(1.0));
        assert_eq!(leading_number("1e-"), Some(1.0));
        assert_eq!(size("\"1e2%\""), SizeSpec::Percent(100.0));
        assert_eq!(size("\"4e2\""), SizeSpec::Pixels(400));
    }
}
