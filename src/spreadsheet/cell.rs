use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveTime;

/// Epoch of serial date numbers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DateSystem {
    Excel1900,
    Excel1904,
}

/// What a serial number formatted as a date actually carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SerialKind {
    Date,
    DateTime,
    Time,
}

/// Storage kind of a cell value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// `1` / `0`
    Boolean,
    Number,
    /// Number with a date/time number format
    Serial(SerialKind, DateSystem),
    /// ISO 8601 date or datetime text
    IsoDateTime,
    /// ISO 8601 duration text (ODS time cells)
    IsoDuration,
    Text,
    /// Index into the shared string table, resolved while reading
    SharedString,
    Error,
}

impl CellType {
    /// Classifies built-in number format ids.
    pub(crate) fn builtin_number_format(id: &str, system: DateSystem) -> Option<Self> {
        let kind = match id {
            "22" => SerialKind::DateTime,
            "14" | "15" | "16" | "17" => SerialKind::Date,
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => SerialKind::Time,
            _ => return None,
        };
        Some(Self::Serial(kind, system))
    }

    /// Classifies a custom number format code by looking for date and time
    /// tokens outside of quoted literals, escapes and bracketed sections.
    pub(crate) fn custom_number_format(format: &str, system: DateSystem) -> Self {
        let mut escaped = false;
        let mut literal = false;
        let mut bracket = false;
        let mut date = false;
        let mut time = false;
        for character in format.chars() {
            match character {
                _ if escaped => escaped = false,
                '_' | '\\' => escaped = true,
                '"' if !bracket => literal = !literal,
                '[' if !literal => bracket = true,
                ']' if bracket => bracket = false,
                _ if literal || bracket => (),
                'Y' | 'y' | 'D' | 'd' => date = true,
                'H' | 'h' | 'S' | 's' => time = true,
                _ => (),
            }
        }

        match (date, time) {
            (true, true) => Self::Serial(SerialKind::DateTime, system),
            (true, false) => Self::Serial(SerialKind::Date, system),
            (false, true) => Self::Serial(SerialKind::Time, system),
            (false, false) => Self::Number,
        }
    }
}

/// A single non-empty cell of a sheet.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw value as stored in the workbook
    pub(crate) value: String,
}

impl Cell {
    /// Display text of the cell, `None` for empty and error cells.
    /// Serial dates render as ISO text, booleans as `true` / `false`.
    pub(crate) fn text(&self) -> Option<String> {
        match self.kind {
            CellType::Empty | CellType::Error => None,
            CellType::Boolean => Some(if self.value == "1" { "true" } else { "false" }.to_owned()),
            CellType::Serial(kind, system) => serial_to_string(&self.value, kind, system)
                .or_else(|| Some(self.value.to_owned())),
            CellType::IsoDateTime => Some(self.value.replace('T', " ")),
            CellType::IsoDuration => Some(
                self.value
                    .replace("PT", "")
                    .replace('H', ":")
                    .replace('M', ":")
                    .replace('S', ""),
            ),
            CellType::Number | CellType::Text | CellType::SharedString => Some(self.value.to_owned()),
        }
    }
}

/// Renders a serial date number as ISO date, time or datetime text.
fn serial_to_string(value: &str, kind: SerialKind, system: DateSystem) -> Option<String> {
    let serial = value.trim().parse::<f64>().ok()?;
    let days = serial.trunc() as i64;
    // Lotus 1-2-3 leap year bug: serial 60 is the phantom 1900-02-29
    let offset = match system {
        DateSystem::Excel1904 => 1462,
        DateSystem::Excel1900 if days < 60 => 1,
        DateSystem::Excel1900 => 0,
    };
    let days = Duration::try_days(days.checked_add(offset)?)?;
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(days)?;
    let seconds = (serial.fract().abs() * 86_400f64).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)?;
    Some(match kind {
        SerialKind::Date => date.format("%Y-%m-%d").to_string(),
        SerialKind::Time => time.format("%H:%M:%S").to_string(),
        SerialKind::DateTime => format!("{} {}", date.format("%Y-%m-%d"), time.format("%H:%M:%S")),
    })
}
