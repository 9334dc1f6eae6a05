/// All date-time shapes TOML distinguishes, determined by which of
/// {date, time, offset} are present in the literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateTime {
    OffsetDateTime(Date, Time, Offset),
    LocalDateTime(Date, Time),
    LocalDate(Date),
    LocalTime(Time),
}

impl DateTime {
    pub fn from_optional_offset(date: Date, time: Time, offset: Option<Offset>) -> Self {
        match offset {
            Some(o) => Self::OffsetDateTime(date, time, o),
            None => Self::LocalDateTime(date, time),
        }
    }

    pub fn date(&self) -> Option<Date> {
        match self {
            DateTime::OffsetDateTime(d, _, _) => Some(*d),
            DateTime::LocalDateTime(d, _) => Some(*d),
            DateTime::LocalDate(d) => Some(*d),
            DateTime::LocalTime(_) => None,
        }
    }

    pub fn time(&self) -> Option<Time> {
        match self {
            DateTime::OffsetDateTime(_, t, _) => Some(*t),
            DateTime::LocalDateTime(_, t) => Some(*t),
            DateTime::LocalDate(_) => None,
            DateTime::LocalTime(t) => Some(*t),
        }
    }

    pub fn offset(&self) -> Option<Offset> {
        match self {
            DateTime::OffsetDateTime(_, _, o) => Some(*o),
            _ => None,
        }
    }
}

/// Renders the normalized RFC 3339 form: `T` between date and time,
/// uppercase `Z`, sub-seconds only when present.
impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateTime::OffsetDateTime(date, time, offset) => {
                write!(f, "{date}T{time}{offset}")
            }
            DateTime::LocalDateTime(date, time) => write!(f, "{date}T{time}"),
            DateTime::LocalDate(date) => write!(f, "{date}"),
            DateTime::LocalTime(time) => write!(f, "{time}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }
}

impl std::fmt::Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanos: u32,
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8, nanos: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            nanos,
        }
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.nanos != 0 {
            let mut frac = format!("{:09}", self.nanos);
            while frac.ends_with('0') {
                frac.pop();
            }
            write!(f, ".{frac}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offset {
    /// Z
    Utc,
    /// Minutes east of UTC
    Custom(i16),
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Offset::Utc => f.write_str("Z"),
            Offset::Custom(minutes) => {
                let sign = if *minutes < 0 { '-' } else { '+' };
                let abs = minutes.unsigned_abs();
                write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateTimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    OffsetHour,
    OffsetMinute,
}

impl std::fmt::Display for DateTimeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateTimeField::Year => f.write_str("year"),
            DateTimeField::Month => f.write_str("month"),
            DateTimeField::Day => f.write_str("day"),
            DateTimeField::Hour => f.write_str("hour"),
            DateTimeField::Minute => f.write_str("minute"),
            DateTimeField::Second => f.write_str("second"),
            DateTimeField::OffsetHour => f.write_str("offset-hour"),
            DateTimeField::OffsetMinute => f.write_str("offset-minute"),
        }
    }
}
