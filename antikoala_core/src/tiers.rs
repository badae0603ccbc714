//! Status lookup tables for capacity usage and legal BAC limits.
//!
//! Both tables are ordinal: the first threshold matched from the most severe
//! down wins, and there is no interpolation between tiers.

use serde::Serialize;

/// Display colour of a tier, rendered by the front end
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierColor {
    Gray,
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
}

/// Colour for a capacity-usage percentage
pub fn capacity_color(percentage: f64) -> TierColor {
    if percentage > 80.0 {
        TierColor::Red
    } else if percentage > 60.0 {
        TierColor::Orange
    } else if percentage > 40.0 {
        TierColor::Yellow
    } else if percentage > 20.0 {
        TierColor::Green
    } else {
        TierColor::Blue
    }
}

/// Motivational message for a capacity-usage percentage
///
/// Empty when nothing has been drunk.
pub fn capacity_message(percentage: f64) -> &'static str {
    const MESSAGES: [(f64, &str); 8] = [
        (140.0, "정신은 안드로메다에..."),
        (120.0, "넌 이미 죽어있다."),
        (100.0, "지금 먹는 술은 술이 먹는 술이야"),
        (80.0, "이제부터는 택시도 고려해야"),
        (60.0, "귀가 타이밍을 잡아요"),
        (40.0, "이제부터는 취했다고 보면 돼요"),
        (20.0, "가장 즐거운 시간"),
        (0.0, "이제 시작입니다."),
    ];

    MESSAGES
        .iter()
        .find(|(threshold, _)| percentage > *threshold)
        .map(|(_, message)| *message)
        .unwrap_or("")
}

/// Legal consequence tier for a BAC value (Korean road traffic law)
///
/// Variants are declared from least to most severe, so `Ord` follows severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalStatus {
    Clear,
    Detected,
    Suspension,
    Revocation,
    SevereRevocation,
}

impl LegalStatus {
    /// Classify a BAC percentage
    pub fn from_bac(bac: f64) -> Self {
        if bac >= 0.2 {
            LegalStatus::SevereRevocation
        } else if bac >= 0.08 {
            LegalStatus::Revocation
        } else if bac >= 0.03 {
            LegalStatus::Suspension
        } else if bac > 0.0 {
            LegalStatus::Detected
        } else {
            LegalStatus::Clear
        }
    }

    pub fn color(&self) -> TierColor {
        match self {
            LegalStatus::SevereRevocation | LegalStatus::Revocation => TierColor::Red,
            LegalStatus::Suspension => TierColor::Yellow,
            LegalStatus::Detected => TierColor::Blue,
            LegalStatus::Clear => TierColor::Gray,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LegalStatus::SevereRevocation => "면허 취소: 2~5년 징역 또는 1~2천만원 벌금",
            LegalStatus::Revocation => "면허 취소: 1~2년 징역 또는 500~1천만원 벌금",
            LegalStatus::Suspension => "면허 정지: 1년 이하 징역 또는 500만원 이하 벌금",
            LegalStatus::Detected => "알코올이 검출되었습니다. 숙취 운전도 음주운전입니다.",
            LegalStatus::Clear => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_colors_use_strict_thresholds() {
        assert_eq!(capacity_color(0.0), TierColor::Blue);
        assert_eq!(capacity_color(20.0), TierColor::Blue);
        assert_eq!(capacity_color(20.1), TierColor::Green);
        assert_eq!(capacity_color(48.6), TierColor::Yellow);
        assert_eq!(capacity_color(60.5), TierColor::Orange);
        assert_eq!(capacity_color(250.0), TierColor::Red);
    }

    #[test]
    fn test_capacity_message_empty_at_zero() {
        assert_eq!(capacity_message(0.0), "");
        assert_eq!(capacity_message(0.5), "이제 시작입니다.");
        assert_eq!(capacity_message(48.6), "이제부터는 취했다고 보면 돼요");
        assert_eq!(capacity_message(141.0), "정신은 안드로메다에...");
    }

    #[test]
    fn test_legal_status_boundaries() {
        assert_eq!(LegalStatus::from_bac(0.0), LegalStatus::Clear);
        assert_eq!(LegalStatus::from_bac(0.001), LegalStatus::Detected);
        assert_eq!(LegalStatus::from_bac(0.03), LegalStatus::Suspension);
        assert_eq!(LegalStatus::from_bac(0.098), LegalStatus::Revocation);
        assert_eq!(LegalStatus::from_bac(0.2), LegalStatus::SevereRevocation);
        assert_eq!(LegalStatus::from_bac(0.0).message(), "");
    }

    #[test]
    fn test_legal_status_is_monotonic() {
        let mut previous = LegalStatus::from_bac(0.0);
        for step in 0..=400 {
            let bac = step as f64 * 0.001;
            let status = LegalStatus::from_bac(bac);
            assert!(status >= previous, "tier dropped at bac {}", bac);
            previous = status;
        }
    }

    #[test]
    fn test_capacity_color_is_monotonic() {
        let rank = |c: TierColor| match c {
            TierColor::Gray | TierColor::Blue => 0,
            TierColor::Green => 1,
            TierColor::Yellow => 2,
            TierColor::Orange => 3,
            TierColor::Red => 4,
        };
        let mut previous = 0;
        for pct in 0..=200 {
            let current = rank(capacity_color(pct as f64));
            assert!(current >= previous);
            previous = current;
        }
    }
}
