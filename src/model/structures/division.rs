use serde_repr::{Deserialize_repr, Serialize_repr};
use std::{convert::TryFrom, fmt};

/// Sub-band within a bounded tier. `III` is the entry third of a tier,
/// `I` the third closest to promotion.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Division {
    I = 1,
    II = 2,
    III = 3
}

impl Division {
    pub fn number(&self) -> i16 {
        *self as i16
    }
}

impl TryFrom<i16> for Division {
    type Error = ();

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Division::I),
            2 => Ok(Division::II),
            3 => Ok(Division::III),
            _ => Err(())
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numeral = match self {
            Division::I => "I",
            Division::II => "II",
            Division::III => "III"
        };

        write!(f, "{}", numeral)
    }
}
