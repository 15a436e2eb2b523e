use crate::model::{
    constants::{DIVISIONS_PER_TIER, TOP_TIER_DISPLAY_CEILING},
    structures::{division::Division, rank::Rank}
};

/// A band of the LP axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankTier {
    pub rank: Rank,
    pub min_lp: u32,
    /// `None` for the unbounded top tier
    pub max_lp: Option<u32>,
    pub display_name: &'static str,
    pub description: &'static str
}

impl RankTier {
    /// Upper bound used for progress display. The top tier has no real
    /// ceiling, so a fixed display bound stands in for it.
    pub fn display_max_lp(&self) -> u32 {
        self.max_lp.unwrap_or(TOP_TIER_DISPLAY_CEILING)
    }

    pub fn contains(&self, lp: u32) -> bool {
        lp >= self.min_lp && self.max_lp.map_or(true, |max| lp <= max)
    }

    pub fn is_top(&self) -> bool {
        self.max_lp.is_none()
    }
}

/// Contiguous, ordered and covering `[0, ∞)`.
pub static TIERS: [RankTier; 6] = [
    RankTier {
        rank: Rank::Untrained,
        min_lp: 0,
        max_lp: Some(499),
        display_name: "Untrained",
        description: "Just getting started. Every session counts."
    },
    RankTier {
        rank: Rank::Conditioned,
        min_lp: 500,
        max_lp: Some(999),
        display_name: "Conditioned",
        description: "A routine is forming and the body is adapting."
    },
    RankTier {
        rank: Rank::Strong,
        min_lp: 1000,
        max_lp: Some(1499),
        display_name: "Strong",
        description: "Consistent training with real volume behind it."
    },
    RankTier {
        rank: Rank::Athletic,
        min_lp: 1500,
        max_lp: Some(1999),
        display_name: "Athletic",
        description: "Training, intensity and recovery in balance."
    },
    RankTier {
        rank: Rank::Elite,
        min_lp: 2000,
        max_lp: Some(2499),
        display_name: "Elite",
        description: "Week after week near the top of the scale."
    },
    RankTier {
        rank: Rank::Forged,
        min_lp: 2500,
        max_lp: None,
        display_name: "Forged",
        description: "The top of the ladder. Stay here."
    }
];

fn tier_index(lp: u32) -> usize {
    TIERS
        .iter()
        .rposition(|tier| lp >= tier.min_lp)
        .unwrap_or(0)
}

/// The tier whose range contains `lp`.
pub fn tier_for(lp: u32) -> &'static RankTier {
    &TIERS[tier_index(lp)]
}

pub fn tier_of(rank: Rank) -> &'static RankTier {
    &TIERS[rank as usize]
}

/// The tier above the one containing `lp`, if any.
pub fn next_tier(lp: u32) -> Option<&'static RankTier> {
    TIERS.get(tier_index(lp) + 1)
}

/// Fraction of the current tier already covered, in `[0, 1]`.
pub fn progress(lp: u32) -> f64 {
    let tier = tier_for(lp);
    let span = (tier.display_max_lp() - tier.min_lp + 1) as f64;
    let into = (lp - tier.min_lp) as f64;

    (into / span).min(1.0)
}

/// Resolves the rank and division for an LP value.
///
/// Bounded tiers are split into three contiguous thirds using integer
/// division: III is the entry third, I the promotion third. The top tier
/// has no divisions.
pub fn placement(lp: u32) -> (Rank, Option<Division>) {
    let tier = tier_for(lp);
    let Some(max_lp) = tier.max_lp else {
        return (tier.rank, None);
    };

    let range = max_lp - tier.min_lp + 1;
    let into = lp - tier.min_lp;

    let division = if into < range / DIVISIONS_PER_TIER {
        Division::III
    } else if into < 2 * range / DIVISIONS_PER_TIER {
        Division::II
    } else {
        Division::I
    };

    (tier.rank, Some(division))
}

/// The inclusive LP range covered by a division of a bounded tier.
/// Returns `None` for the top tier, which has no divisions.
pub fn division_range(rank: Rank, division: Division) -> Option<(u32, u32)> {
    let tier = tier_of(rank);
    let max_lp = tier.max_lp?;
    let range = max_lp - tier.min_lp + 1;

    let lower_third = tier.min_lp + range / DIVISIONS_PER_TIER;
    let upper_third = tier.min_lp + 2 * range / DIVISIONS_PER_TIER;

    Some(match division {
        Division::III => (tier.min_lp, lower_third - 1),
        Division::II => (lower_third, upper_third - 1),
        Division::I => (upper_third, max_lp)
    })
}
