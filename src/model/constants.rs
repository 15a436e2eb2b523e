// Rating constants
pub const DEFAULT_MMR: i32 = 1000;
pub const DEFAULT_LP: u32 = 0;
pub const BASELINE_MMR: f64 = 1000.0;
pub const BASELINE_EXPECTED_SCORE: f64 = 50.0;
/// MMR points per point of expected score
pub const MMR_PER_EXPECTED_POINT: f64 = 20.0;
pub const EXPECTED_SCORE_FLOOR: f64 = 20.0;
pub const EXPECTED_SCORE_CEILING: f64 = 85.0;

/// Volatility bands keyed by the lower LP bound (inclusive), highest first
pub const VOLATILITY_BANDS: [(u32, f64); 5] = [(3600, 0.6), (2100, 0.7), (1000, 0.8), (300, 1.0), (0, 1.2)];

// Rank constants
pub const DIVISIONS_PER_TIER: u32 = 3;
/// Display-only upper bound for the unbounded top tier
pub const TOP_TIER_DISPLAY_CEILING: u32 = 2999;

// Score constants
pub const CONSISTENCY_MAX: u32 = 40;
pub const CONSISTENCY_DAY_CAP: u32 = 5;
pub const CONSISTENCY_POINTS_PER_DAY: u32 = 8;

pub const VOLUME_MAX: u32 = 25;
pub const VOLUME_MINUTES_CAP: f64 = 250.0;
/// 0.1 points per minute
pub const MINUTES_PER_VOLUME_POINT: f64 = 10.0;

pub const INTENSITY_MAX: u32 = 25;
pub const INTENSITY_KCAL_CAP: f64 = 1000.0;
/// 0.025 points per kcal
pub const KCAL_PER_INTENSITY_POINT: f64 = 40.0;

pub const RECOVERY_MAX: u32 = 10;
pub const RECOVERY_NIGHT_CAP: u32 = 5;
pub const RECOVERY_POINTS_PER_NIGHT: u32 = 2;
pub const RESTFUL_NIGHT_MINUTES: i64 = 390;

pub const MAX_SCORE: u32 = CONSISTENCY_MAX + VOLUME_MAX + INTENSITY_MAX + RECOVERY_MAX;

// Processing constants
pub const DAYS_PER_WEEK: i64 = 7;
pub const MAX_CONFLICT_RETRIES: u32 = 3;
