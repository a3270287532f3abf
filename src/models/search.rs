//! 搜索组合与经验等级

use std::collections::HashSet;
use std::fmt::Display;

use phf::phf_map;
use rand::seq::SliceRandom;
use rand::Rng;

/// LinkedIn `f_E` 参数的经验等级代码
static EXPERIENCE_LEVELS: phf::Map<u8, &'static str> = phf_map! {
    1u8 => "Entry level",
    2u8 => "Associate",
    3u8 => "Mid-Senior level",
    4u8 => "Director",
    5u8 => "Executive",
    6u8 => "Internship",
};

/// 经验等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExperienceLevel(u8);

impl ExperienceLevel {
    /// 从代码解析，未知代码返回 None
    pub fn from_code(code: u8) -> Option<Self> {
        EXPERIENCE_LEVELS.contains_key(&code).then_some(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        EXPERIENCE_LEVELS.get(&self.0).copied().unwrap_or("Unknown")
    }
}

/// 一个 (职位, 地点) 搜索组合
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchCombination {
    pub position: String,
    pub location: String,
}

impl SearchCombination {
    pub fn new(position: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            location: location.into(),
        }
    }

    /// 职位 × 地点 的笛卡尔积，打乱顺序后最多取 `cap` 个
    ///
    /// 每个组合恰好出现一次。
    pub fn shuffled<R: Rng + ?Sized>(
        positions: &[String],
        locations: &[String],
        cap: usize,
        rng: &mut R,
    ) -> Vec<Self> {
        let mut combos: Vec<Self> = positions
            .iter()
            .flat_map(|p| locations.iter().map(move |l| Self::new(p.clone(), l.clone())))
            .collect();
        let mut seen = HashSet::new();
        combos.retain(|c| seen.insert(c.clone()));
        combos.shuffle(rng);
        combos.truncate(cap);
        combos
    }
}

impl Display for SearchCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.position, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shuffled_covers_every_pair_once() {
        let positions = strings(&["Rust Engineer", "Backend Engineer", "SRE"]);
        let locations = strings(&["Remote", "Berlin"]);
        let mut rng = StdRng::seed_from_u64(7);

        let combos = SearchCombination::shuffled(&positions, &locations, 500, &mut rng);

        assert_eq!(combos.len(), 6);
        let unique: HashSet<_> = combos.iter().cloned().collect();
        assert_eq!(unique.len(), 6);
        assert!(unique.contains(&SearchCombination::new("SRE", "Berlin")));
    }

    #[test]
    fn test_shuffled_respects_cap() {
        let positions = strings(&["A", "B", "C"]);
        let locations = strings(&["X", "Y"]);
        let mut rng = StdRng::seed_from_u64(1);

        let combos = SearchCombination::shuffled(&positions, &locations, 4, &mut rng);
        assert_eq!(combos.len(), 4);
    }

    #[test]
    fn test_experience_level_labels() {
        assert_eq!(ExperienceLevel::from_code(3).map(|l| l.label()), Some("Mid-Senior level"));
        assert!(ExperienceLevel::from_code(0).is_none());
        assert!(ExperienceLevel::from_code(7).is_none());
    }
}
