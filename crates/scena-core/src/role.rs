//! Semantic classification of attribute and style property names.
//!
//! [`classify`] is a pure, case-insensitive lookup over a fixed name table.
//! It has no hidden state: the same name always maps to the same role.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The visual meaning of an attribute or style property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    PositionX,
    PositionY,
    Size,
    Color,
    Velocity,
    Timing,
    Rotation,
    Opacity,
    /// Any name outside the lookup table.
    Generic,
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticRole::PositionX => "position-x",
            SemanticRole::PositionY => "position-y",
            SemanticRole::Size => "size",
            SemanticRole::Color => "color",
            SemanticRole::Velocity => "velocity",
            SemanticRole::Timing => "timing",
            SemanticRole::Rotation => "rotation",
            SemanticRole::Opacity => "opacity",
            SemanticRole::Generic => "generic",
        };
        write!(f, "{name}")
    }
}

/// Classify an attribute name into its semantic role.
///
/// The lookup is case-insensitive and total: unmatched names classify as
/// [`SemanticRole::Generic`].
///
/// # Examples
///
/// ```
/// use scena_core::role::{classify, SemanticRole};
///
/// assert_eq!(classify("translateX"), SemanticRole::PositionX);
/// assert_eq!(classify("FILL"), SemanticRole::Color);
/// assert_eq!(classify("flavor"), SemanticRole::Generic);
/// ```
pub fn classify(name: &str) -> SemanticRole {
    match name.to_ascii_lowercase().as_str() {
        "x" | "left" | "translatex" | "cx" | "dx" | "posx" => SemanticRole::PositionX,
        "y" | "top" | "translatey" | "cy" | "dy" | "posy" => SemanticRole::PositionY,
        "size" | "width" | "height" | "radius" | "r" | "scale" | "fontsize" => SemanticRole::Size,
        "color" | "fill" | "hue" | "stroke" | "tint" => SemanticRole::Color,
        "vx" | "vy" | "velocity" | "speed" => SemanticRole::Velocity,
        "delay" | "duration" | "phase" | "stagger" => SemanticRole::Timing,
        "rotation" | "rotate" | "angle" | "spin" => SemanticRole::Rotation,
        "opacity" | "alpha" | "fade" => SemanticRole::Opacity,
        _ => SemanticRole::Generic,
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn classify_is_total_and_case_insensitive(name in "[a-zA-Z_][a-zA-Z0-9_]{0,20}") {
            let lower = classify(&name.to_ascii_lowercase());
            let upper = classify(&name.to_ascii_uppercase());
            prop_assert_eq!(classify(&name), lower);
            prop_assert_eq!(lower, upper);
        }
    }
}
