use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Intensity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// 0 | 1..=5 | 6..=10 | 11..=20 | >20
pub fn bucket(count: usize) -> Intensity {
    match count {
        0 => Intensity::None,
        1..=5 => Intensity::Low,
        6..=10 => Intensity::Medium,
        11..=20 => Intensity::High,
        _ => Intensity::Critical,
    }
}

impl Intensity {
    pub fn color(&self) -> &'static str {
        match self {
            Intensity::None => "green",
            Intensity::Low => "yellow",
            Intensity::Medium => "orange",
            Intensity::High => "red",
            Intensity::Critical => "critical",
        }
    }
}
