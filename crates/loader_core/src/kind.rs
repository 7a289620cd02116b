use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SCRIPT_ANCHORED: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\.(?:js|es6|es|jsx)$"));
static STYLE_ANCHORED: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\.(?:css|less)$"));
static SCRIPT_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\.(?:js|es6|es|jsx)"));
static STYLE_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\.(?:css|less)"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extension pattern is a valid regex")
}

/// Resource kind derived from a URL's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Style,
    Script,
    Unknown,
}

/// Where the extension pattern has to appear in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// The extension must terminate the URL, so `report?type=css` stays unknown.
    #[default]
    Anchored,
    /// The extension may appear anywhere in the URL.
    Anywhere,
}

/// Classifies `url` with the default [`MatchPolicy::Anchored`] policy.
pub fn classify(url: &str) -> Kind {
    classify_with(url, MatchPolicy::Anchored)
}

/// Classifies `url`; the script pattern wins when both would match.
pub fn classify_with(url: &str, policy: MatchPolicy) -> Kind {
    let (script, style) = match policy {
        MatchPolicy::Anchored => (&*SCRIPT_ANCHORED, &*STYLE_ANCHORED),
        MatchPolicy::Anywhere => (&*SCRIPT_ANYWHERE, &*STYLE_ANYWHERE),
    };
    if script.is_match(url) {
        Kind::Script
    } else if style.is_match(url) {
        Kind::Style
    } else {
        Kind::Unknown
    }
}
