use logos::{Lexer, Logos};
use std::{
    fmt,
    num::ParseIntError,
    ops::Add,
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

/// An instant on the simulated timeline.
///
/// [`SimTime::ZERO`] is the start of the simulation. The clock only
/// advances when the [`Scheduler`] delivers an event, it has nothing
/// to do with the wall-clock time.
///
/// ```
/// # use trafficsim_core::time::SimTime;
/// # use std::time::Duration;
/// let start: SimTime = "1s".parse().unwrap();
/// let next = start + Duration::from_millis(250);
///
/// assert_eq!(next.saturating_duration_since(start), Duration::from_millis(250));
/// assert_eq!(next.to_string(), "1.25s");
/// ```
///
/// [`Scheduler`]: crate::scheduler::Scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(Duration);

impl SimTime {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub const MAX: Self = Self(Duration::MAX);

    /// the instant `since_start` after the beginning of the simulation
    #[inline]
    pub const fn from_duration(since_start: Duration) -> Self {
        Self(since_start)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// how much simulated time elapsed since [`SimTime::ZERO`]
    #[inline]
    pub fn elapsed(self) -> Duration {
        self.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration))
    }

    #[inline]
    pub fn saturating_duration_since(self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl From<Duration> for SimTime {
    fn from(value: Duration) -> Self {
        Self::from_duration(value)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl FromStr for SimTime {
    type Err = DurationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Self)
    }
}

/// Error returned when a human readable duration cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("Failed to parse `{0}'")]
    Lexer(String),
    #[error("Expecting duration to start with a number. Cannot parse `{0}'")]
    MissingNumber(String),
    #[error("Expecting a measure after the number. Cannot parse `{0}'")]
    MissingMeasure(String),
    #[error("Invalid number: {0}")]
    Number(#[from] ParseIntError),
    #[error("Duration `{0}' is too large")]
    Overflow(String),
    #[error("Empty duration")]
    Empty,
}

/// Parse a human readable duration such as `"10s"`, `"300ns"` or
/// `"1s 2000ms 3000000us"` (the parts are summed).
///
/// ```
/// # use trafficsim_core::time::parse_duration;
/// # use std::time::Duration;
/// assert_eq!(parse_duration("1s 500ms").unwrap(), Duration::from_millis(1_500));
/// assert!(parse_duration("10").is_err());
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let mut lex = Lexer::<'_, Token>::new(s);

    let mut total: Option<Duration> = None;

    while let Some(next) = lex.next() {
        let number = next.map_err(|()| DurationParseError::Lexer(s.to_owned()))?;

        if number != Token::Value {
            return Err(DurationParseError::MissingNumber(s.to_owned()));
        }
        let number: u64 = lex.slice().parse()?;

        let Some(Ok(measure)) = lex.next() else {
            return Err(DurationParseError::MissingMeasure(s.to_owned()));
        };
        let duration = match measure {
            Token::NanoSeconds => Duration::from_nanos(number),
            Token::MicroSeconds => Duration::from_micros(number),
            Token::MilliSeconds => Duration::from_millis(number),
            Token::Seconds => Duration::from_secs(number),
            Token::Minutes => number
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| DurationParseError::Overflow(s.to_owned()))?,
            Token::Value => return Err(DurationParseError::MissingMeasure(s.to_owned())),
        };

        total = Some(
            total
                .unwrap_or_default()
                .checked_add(duration)
                .ok_or_else(|| DurationParseError::Overflow(s.to_owned()))?,
        );
    }

    total.ok_or(DurationParseError::Empty)
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|µs|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logos_lexer() {
        let mut lex = Token::lexer("1ns");

        assert_eq!(lex.next(), Some(Ok(Token::Value)));
        assert_eq!(lex.span(), 0..1);
        assert_eq!(lex.slice(), "1");

        assert_eq!(lex.next(), Some(Ok(Token::NanoSeconds)));
        assert_eq!(lex.span(), 1..3);
        assert_eq!(lex.slice(), "ns");
    }

    #[test]
    fn parse() {
        let duration = parse_duration("123ms").unwrap();
        assert_eq!(duration.as_millis(), 123);

        let duration = parse_duration("1s 2000ms 3000000us").unwrap();
        assert_eq!(duration.as_secs(), 6);

        let duration = parse_duration("300ns").unwrap();
        assert_eq!(duration, Duration::from_nanos(300));

        let duration = parse_duration("2m").unwrap();
        assert_eq!(duration, Duration::from_secs(120));
    }

    #[test]
    fn parse_micro_sign() {
        assert_eq!(parse_duration("5µs").unwrap(), Duration::from_micros(5));
    }

    #[test]
    fn parse_invalid_strings() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        assert!(matches!(
            parse_duration("150"),
            Err(DurationParseError::MissingMeasure(_))
        ));
        assert!(matches!(
            parse_duration("ms"),
            Err(DurationParseError::MissingNumber(_))
        ));
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn sim_time_arithmetic() {
        let t = SimTime::from_secs(1) + Duration::from_millis(500);
        assert_eq!(t.elapsed(), Duration::from_millis(1_500));
        assert_eq!(
            t.saturating_duration_since(SimTime::from_secs(2)),
            Duration::ZERO
        );
        assert_eq!(SimTime::MAX + Duration::from_secs(1), SimTime::MAX);
    }

    #[test]
    fn sim_time_display() {
        assert_eq!(SimTime::from_millis(150).to_string(), "150ms");
        assert_eq!(SimTime::ZERO.to_string(), "0ns");
    }
}
