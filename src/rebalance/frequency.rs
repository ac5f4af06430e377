//! Calendar rebalance frequencies.
//!
//! A [`Frequency`] is a calendar unit (week, month, quarter, year) times a
//! positive multiple. Dates are assigned to periods as follows: the first
//! date's calendar unit is period 0, and every later period spans `multiple`
//! consecutive units. With a multiple of one this is plain calendar
//! bucketing (weeks end on Sunday, quarters in Mar/Jun/Sep/Dec, years in
//! December).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::{AllocError, Result};

/// Calendar unit of a [`Frequency`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrequencyUnit {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl FrequencyUnit {
    fn code(self) -> &'static str {
        match self {
            FrequencyUnit::Weekly => "W",
            FrequencyUnit::Monthly => "M",
            FrequencyUnit::Quarterly => "Q",
            FrequencyUnit::Annual => "A",
        }
    }

    /// Sequential index of the calendar unit containing `date`.
    fn index(self, date: NaiveDate) -> i64 {
        let months = i64::from(date.year()) * 12 + i64::from(date.month0());
        match self {
            FrequencyUnit::Weekly => {
                let monday = i64::from(date.num_days_from_ce())
                    - i64::from(date.weekday().num_days_from_monday());
                monday.div_euclid(7)
            }
            FrequencyUnit::Monthly => months,
            FrequencyUnit::Quarterly => months.div_euclid(3),
            FrequencyUnit::Annual => i64::from(date.year()),
        }
    }
}

/// How often a portfolio is rebalanced.
///
/// Parsed from pandas-style offset tokens:
///
/// ```
/// use nanoalloc::{Frequency, FrequencyUnit};
///
/// let f: Frequency = "6M".parse().unwrap();
/// assert_eq!(f.unit(), FrequencyUnit::Monthly);
/// assert_eq!(f.multiple(), 6);
/// assert_eq!("quarterly".parse::<Frequency>().unwrap(), Frequency::quarterly());
/// assert!("6X".parse::<Frequency>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Frequency {
    unit: FrequencyUnit,
    multiple: u32,
}

impl Frequency {
    /// `multiple` units per period; zero is rejected.
    pub fn new(unit: FrequencyUnit, multiple: u32) -> Result<Self> {
        if multiple == 0 {
            return Err(AllocError::InvalidFrequency(format!(
                "0{}",
                unit.code()
            )));
        }
        Ok(Self { unit, multiple })
    }

    pub const fn weekly() -> Self {
        Self {
            unit: FrequencyUnit::Weekly,
            multiple: 1,
        }
    }

    pub const fn monthly() -> Self {
        Self {
            unit: FrequencyUnit::Monthly,
            multiple: 1,
        }
    }

    pub const fn quarterly() -> Self {
        Self {
            unit: FrequencyUnit::Quarterly,
            multiple: 1,
        }
    }

    /// Every six months.
    pub const fn semiannual() -> Self {
        Self {
            unit: FrequencyUnit::Monthly,
            multiple: 6,
        }
    }

    pub const fn annual() -> Self {
        Self {
            unit: FrequencyUnit::Annual,
            multiple: 1,
        }
    }

    #[inline]
    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    #[inline]
    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    /// Period number of `date` relative to the series starting at `first`.
    ///
    /// `first`'s own unit is period 0; `ceil((unit - first_unit) / multiple)`
    /// otherwise.
    pub fn period_index(&self, first: NaiveDate, date: NaiveDate) -> i64 {
        let diff = self.unit.index(date) - self.unit.index(first);
        let k = i64::from(self.multiple);
        // ceil division, valid for negative diffs too
        -((-diff).div_euclid(k))
    }

    /// Indices of the last date of every non-empty period.
    ///
    /// `dates` must be sorted ascending. The last index is always included
    /// when `dates` is non-empty.
    pub fn period_ends(&self, dates: &[NaiveDate]) -> Vec<usize> {
        let Some(&first) = dates.first() else {
            return Vec::new();
        };

        let periods: Vec<i64> = dates.iter().map(|d| self.period_index(first, *d)).collect();
        let mut ends: Vec<usize> = periods
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .map(|(i, _)| i)
            .collect();
        ends.push(dates.len() - 1);
        ends
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::semiannual()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiple == 1 {
            f.write_str(self.unit.code())
        } else {
            write!(f, "{}{}", self.multiple, self.unit.code())
        }
    }
}

impl FromStr for Frequency {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        let invalid = || AllocError::InvalidFrequency(s.to_string());

        match token.to_ascii_lowercase().as_str() {
            "weekly" => return Ok(Self::weekly()),
            "monthly" => return Ok(Self::monthly()),
            "quarterly" => return Ok(Self::quarterly()),
            "semiannual" | "semi-annual" => return Ok(Self::semiannual()),
            "annual" | "yearly" => return Ok(Self::annual()),
            _ => {}
        }

        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (digits, code) = token.split_at(split);

        let multiple = if digits.is_empty() {
            1
        } else {
            digits.parse::<u32>().map_err(|_| invalid())?
        };

        let unit = match code.to_ascii_uppercase().as_str() {
            "W" => FrequencyUnit::Weekly,
            "M" | "ME" => FrequencyUnit::Monthly,
            "Q" | "QE" => FrequencyUnit::Quarterly,
            "A" | "Y" | "YE" => FrequencyUnit::Annual,
            _ => return Err(invalid()),
        };

        if multiple == 0 {
            return Err(invalid());
        }
        Ok(Self { unit, multiple })
    }
}

impl TryFrom<String> for Frequency {
    type Error = AllocError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Frequency> for String {
    fn from(f: Frequency) -> Self {
        f.to_string()
    }
}
