use crate::model::{
    constants::{DEFAULT_LP, DEFAULT_MMR},
    rank_catalog,
    structures::{division::Division, rank::Rank}
};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRating {
    #[error("lp {0} is negative")]
    NegativeLp(i64),

    #[error("mmr {0} does not fit the rating range")]
    MmrOutOfRange(i64),

    #[error("unknown rank tag '{0}'")]
    UnknownRank(String),

    #[error("unknown division {0}")]
    UnknownDivision(i16),

    #[error("stored placement {rank:?}/{division:?} does not match lp {lp}")]
    Inconsistent {
        lp: u32,
        rank: Rank,
        division: Option<Division>
    }
}

/// The rating a week's LP delta is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RatingBaseline {
    pub mmr: i32,
    pub lp: u32
}

/// A user's persistent ladder state.
///
/// `rank` and `division` are never set directly: every constructor
/// resolves them from `lp` through the rank catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rating {
    user_id: Uuid,
    mmr: i32,
    lp: u32,
    rank: Rank,
    division: Option<Division>,
    /// Start of the last week applied to this rating
    scored_week: Option<NaiveDate>,
    updated_at: DateTime<Utc>
}

impl Rating {
    /// The rating every newly onboarded user starts from
    pub fn initial(user_id: Uuid, now: DateTime<Utc>) -> Rating {
        Rating::new(user_id, DEFAULT_MMR, DEFAULT_LP, None, now)
    }

    pub fn new(
        user_id: Uuid,
        mmr: i32,
        lp: u32,
        scored_week: Option<NaiveDate>,
        updated_at: DateTime<Utc>
    ) -> Rating {
        let (rank, division) = rank_catalog::placement(lp);

        Rating {
            user_id,
            mmr,
            lp,
            rank,
            division,
            scored_week,
            // Storage keeps microseconds; truncating keeps optimistic checks exact
            updated_at: updated_at.trunc_subsecs(6)
        }
    }

    /// Rebuilds a rating from persisted columns, rejecting rows that break
    /// the ladder invariants instead of repairing them.
    pub fn from_stored(
        user_id: Uuid,
        mmr: i64,
        lp: i64,
        rank_tag: &str,
        division: Option<i16>,
        scored_week: Option<NaiveDate>,
        updated_at: DateTime<Utc>
    ) -> Result<Rating, InvalidRating> {
        let lp = u32::try_from(lp).map_err(|_| InvalidRating::NegativeLp(lp))?;
        let mmr = i32::try_from(mmr).map_err(|_| InvalidRating::MmrOutOfRange(mmr))?;
        let rank = Rank::from_str(rank_tag).map_err(|_| InvalidRating::UnknownRank(rank_tag.to_string()))?;
        let division = match division {
            Some(d) => Some(Division::try_from(d).map_err(|_| InvalidRating::UnknownDivision(d))?),
            None => None
        };

        let rating = Rating::new(user_id, mmr, lp, scored_week, updated_at);
        if rating.rank != rank || rating.division != division {
            return Err(InvalidRating::Inconsistent { lp, rank, division });
        }

        Ok(rating)
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn mmr(&self) -> i32 {
        self.mmr
    }

    pub fn lp(&self) -> u32 {
        self.lp
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn division(&self) -> Option<Division> {
        self.division
    }

    pub fn scored_week(&self) -> Option<NaiveDate> {
        self.scored_week
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn baseline(&self) -> RatingBaseline {
        RatingBaseline {
            mmr: self.mmr,
            lp: self.lp
        }
    }
}
