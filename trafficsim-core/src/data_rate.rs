use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};

/// Transmission speed of a link, in **bits** per second.
///
/// Units are decimal, as for network equipment: `1kbps` is 1 000 bits
/// per second, `1mbps` is 1 000 000.
///
/// ```
/// # use trafficsim_core::DataRate;
/// # use std::time::Duration;
/// let rate: DataRate = "100Mbps".parse().unwrap();
///
/// // a 1500 bytes frame occupies the link for 120µs
/// assert_eq!(rate.transmission_time(1_500), Duration::from_micros(120));
/// assert_eq!(rate.to_string(), "100mbps");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataRate(u64);

const K: u64 = 1_000;
const M: u64 = 1_000 * K;
const G: u64 = 1_000 * M;

const NANOS_PER_SEC: u128 = 1_000_000_000;

impl DataRate {
    pub const fn from_bps(bits_per_second: u64) -> Self {
        Self(bits_per_second)
    }

    pub const fn from_mbps(megabits_per_second: u64) -> Self {
        Self(megabits_per_second.saturating_mul(M))
    }

    #[inline]
    pub fn bits_per_second(&self) -> u64 {
        self.0
    }

    /// Time needed to put `bytes` on the wire, rounded up to the next
    /// nanosecond. A zero rate never finishes and returns [`Duration::MAX`].
    pub fn transmission_time(&self, bytes: u64) -> Duration {
        if self.0 == 0 {
            return Duration::MAX;
        }

        let bits = bytes as u128 * 8;
        let nanos = (bits * NANOS_PER_SEC).div_ceil(self.0 as u128);

        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .unwrap_or(Duration::MAX)
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;

        if v < K || v % K != 0 {
            write!(f, "{v}bps")
        } else if v < M || v % M != 0 {
            write!(f, "{}kbps", v / K)
        } else if v < G || v % G != 0 {
            write!(f, "{}mbps", v / M)
        } else {
            write!(f, "{}gbps", v / G)
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum DataRateToken {
    #[regex("[bB]ps")]
    Bps,
    #[regex("[kK]bps")]
    Kbps,
    #[regex("[mM]bps")]
    Mbps,
    #[regex("[gG]bps")]
    Gbps,

    #[regex("[0-9]+")]
    Value,
}

impl FromStr for DataRate {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, DataRateToken>::new(s);

        let Some(Ok(DataRateToken::Value)) = lex.next() else {
            bail!("Expecting to parse a number")
        };
        let number: u64 = lex.slice().parse()?;
        let Some(Ok(token)) = lex.next() else {
            bail!("Expecting to parse a unit")
        };
        let factor = match token {
            DataRateToken::Bps => 1,
            DataRateToken::Kbps => K,
            DataRateToken::Mbps => M,
            DataRateToken::Gbps => G,
            DataRateToken::Value => bail!("Expecting to parse a unit (bps, kbps, ...)"),
        };

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a data rate"
        );

        let Some(bps) = number.checked_mul(factor) else {
            bail!("Data rate `{s}' is too large")
        };

        Ok(Self(bps))
    }
}
