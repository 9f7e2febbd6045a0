//! Deterministic, configurable textual rendering of a [`CanFrame`], ported
//! field-for-field from the CAN message monitor this crate's wire format
//! was distilled from: prompt, counter, time-stamp, channel, identifier,
//! flags, DLC and data bytes, with an optional ASCII column.

use std::fmt::Write as _;

use crate::frame::CanFrame;

/// Numeric base used to render identifiers, DLC and data bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberBase {
    Hex,
    Decimal,
    Octal,
}

/// How a frame's time-stamp is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampMode {
    /// Subtract the very first timestamp seen and hold that reference.
    Zero,
    /// Print the frame's own timestamp unmodified.
    Absolute,
    /// Subtract the previously formatted frame's timestamp.
    Relative,
}

/// How the chosen time value is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLayout {
    /// `HH:MM:SS`, wrapping at 24 hours.
    HhMmSs,
    /// Whole and fractional seconds: `SSS.ffffff`.
    Seconds,
    /// Fraction of a day: `D.ffffffffffff`.
    FractionalDays,
}

/// Bracket style wrapped around the rendered DLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlcBrackets {
    None,
    Paren,
    Square,
}

/// Field separator between bytes/columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Spaces,
    Tabs,
}

impl Separator {
    fn major(&self) -> &'static str {
        match self {
            Separator::Spaces => "  ",
            Separator::Tabs => "\t",
        }
    }

    fn minor(&self) -> &'static str {
        match self {
            Separator::Spaces => " ",
            Separator::Tabs => "\t",
        }
    }
}

/// All the knobs the original monitor exposed for one line of output.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Printed as the line's first field, verbatim. Rejected by
    /// [`FormatterConfig::set_prompt`] if longer than 6 characters.
    pub prompt: Option<String>,
    pub show_counter: bool,
    pub timestamp_mode: TimestampMode,
    pub time_layout: TimeLayout,
    pub show_usec: bool,
    pub show_channel: bool,
    pub id_base: NumberBase,
    pub dlc_base: NumberBase,
    pub dlc_brackets: DlcBrackets,
    pub show_flags: bool,
    pub data_base: NumberBase,
    pub show_ascii: bool,
    pub ascii_substitute: char,
    pub separator: Separator,
    /// Data bytes wrap onto a new, column-aligned line after this many;
    /// `0` disables wrapping.
    pub wraparound: usize,
    pub show_eol: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        FormatterConfig {
            prompt: None,
            show_counter: true,
            timestamp_mode: TimestampMode::Absolute,
            time_layout: TimeLayout::HhMmSs,
            show_usec: true,
            show_channel: false,
            id_base: NumberBase::Hex,
            dlc_base: NumberBase::Decimal,
            dlc_brackets: DlcBrackets::None,
            show_flags: true,
            data_base: NumberBase::Hex,
            show_ascii: false,
            ascii_substitute: '.',
            separator: Separator::Spaces,
            wraparound: 8,
            show_eol: true,
        }
    }
}

impl FormatterConfig {
    /// Sets `rx_prompt`/`tx_prompt`. Rejects prompts over 6 characters,
    /// leaving the configuration unchanged, matching the original setters'
    /// "reject out of domain, keep prior value" contract.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> Result<(), ()> {
        let prompt = prompt.into();
        if prompt.chars().count() > 6 {
            return Err(());
        }
        self.prompt = Some(prompt);
        Ok(())
    }
}

/// Renders [`CanFrame`]s to text according to a [`FormatterConfig`].
///
/// Stateful only insofar as [`TimestampMode::Relative`] and
/// [`TimestampMode::Zero`] need a reference timestamp from earlier calls.
pub struct Formatter {
    config: FormatterConfig,
    reference_timestamp: Option<crate::frame::CanTimestamp>,
}

impl Formatter {
    pub fn new(config: FormatterConfig) -> Self {
        Formatter {
            config,
            reference_timestamp: None,
        }
    }

    /// Formats one frame. `counter` is the caller-maintained message
    /// sequence number; `channel` identifies which bus the frame arrived on.
    pub fn format(&mut self, frame: &CanFrame, counter: u64, channel: u8) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(6);

        if let Some(prompt) = &self.config.prompt {
            parts.push(prompt.clone());
        }

        if self.config.show_counter {
            parts.push(format!("{counter:<7}"));
        }

        let displayed_timestamp = match self.config.timestamp_mode {
            TimestampMode::Zero => {
                let reference = *self.reference_timestamp.get_or_insert(frame.timestamp());
                frame.timestamp().saturating_sub(reference)
            }
            TimestampMode::Absolute => frame.timestamp(),
            TimestampMode::Relative => {
                let delta = match self.reference_timestamp {
                    Some(last) => frame.timestamp().saturating_sub(last),
                    None => crate::frame::CanTimestamp::ZERO,
                };
                self.reference_timestamp = Some(frame.timestamp());
                delta
            }
        };
        parts.push(render_timestamp(
            displayed_timestamp,
            self.config.time_layout,
            self.config.show_usec,
        ));

        if self.config.show_channel {
            parts.push(format!("{channel}"));
        }

        parts.push(render_number(
            frame.raw_id(),
            self.config.id_base,
            id_width(frame, self.config.id_base),
        ));

        if self.config.show_flags {
            let mut flags = String::new();
            flags.push(if frame.is_extended() { 'X' } else { 'S' });
            if frame.is_remote() {
                flags.push('R');
            }
            if frame.is_error_frame() {
                flags.push('E');
            }
            let dlc = render_dlc(frame.dlc(), self.config.dlc_base, self.config.dlc_brackets);
            parts.push(format!("{flags}{}{dlc}", self.config.separator.minor()));
        } else {
            parts.push(render_dlc(frame.dlc(), self.config.dlc_base, self.config.dlc_brackets));
        }

        if !frame.data().is_empty() {
            parts.push(render_data(frame.data(), &self.config));
        }

        if self.config.show_ascii && !frame.data().is_empty() {
            parts.push(render_ascii(frame.data(), self.config.ascii_substitute));
        }

        let mut line = parts.join(self.config.separator.major());
        if self.config.show_eol {
            line.push('\n');
        }
        line
    }
}

fn id_width(frame: &CanFrame, base: NumberBase) -> usize {
    match (frame.is_extended(), base) {
        (false, NumberBase::Hex) => 3,
        (true, NumberBase::Hex) => 8,
        (false, NumberBase::Decimal) => 4,
        (true, NumberBase::Decimal) => 9,
        (false, NumberBase::Octal) => 4,
        (true, NumberBase::Octal) => 10,
    }
}

fn render_number(value: u32, base: NumberBase, width: usize) -> String {
    let mut out = String::new();
    match base {
        NumberBase::Hex => {
            let _ = write!(out, "{value:0width$X}", width = width);
        }
        // Decimal fields are left-justified and space-padded (`%-Nu`), not
        // zero-filled, matching the printf-style format strings they mirror.
        NumberBase::Decimal => {
            let _ = write!(out, "{value:<width$}", width = width);
        }
        NumberBase::Octal => {
            let _ = write!(out, "{value:0width$o}", width = width);
        }
    }
    out
}

fn render_dlc(dlc: u8, base: NumberBase, brackets: DlcBrackets) -> String {
    let digits = render_number(dlc as u32, base, 0);
    match brackets {
        DlcBrackets::None => digits,
        DlcBrackets::Paren => format!("({digits})"),
        DlcBrackets::Square => format!("[{digits}]"),
    }
}

fn byte_width(base: NumberBase) -> usize {
    match base {
        NumberBase::Hex => 2,
        NumberBase::Decimal => 3,
        NumberBase::Octal => 3,
    }
}

fn render_data(data: &[u8], config: &FormatterConfig) -> String {
    let wrap = config.wraparound;
    let sep = config.separator.minor();
    let mut out = String::new();
    for (i, &byte) in data.iter().enumerate() {
        if i > 0 {
            if wrap != 0 && i % wrap == 0 {
                out.push('\n');
            } else {
                out.push_str(sep);
            }
        }
        out.push_str(&render_number(byte as u32, config.data_base, byte_width(config.data_base)));
    }
    out
}

fn render_ascii(data: &[u8], substitute: char) -> String {
    let mut out = String::from("'");
    for &byte in data {
        if (0x20..0x7f).contains(&byte) {
            out.push(byte as char);
        } else {
            out.push(substitute);
        }
    }
    out.push('\'');
    out
}

/// Fractional-digit count for a sub-second rendering: microsecond precision
/// when `show_usec`, 0.1 ms precision otherwise.
fn render_timestamp(ts: crate::frame::CanTimestamp, layout: TimeLayout, show_usec: bool) -> String {
    let (fraction, digits) = if show_usec {
        (ts.nanos / 1_000, 6)
    } else {
        (ts.nanos / 100_000, 4)
    };
    let mut out = String::new();
    match layout {
        TimeLayout::HhMmSs => {
            let total_secs = ts.secs % 86_400;
            let h = total_secs / 3600;
            let m = (total_secs % 3600) / 60;
            let s = total_secs % 60;
            let _ = write!(out, "{h:02}:{m:02}:{s:02}.{fraction:0digits$}", digits = digits);
        }
        TimeLayout::Seconds => {
            let _ = write!(out, "{}.{fraction:0digits$}", ts.secs, digits = digits);
        }
        TimeLayout::FractionalDays => {
            let day_fraction = (ts.secs % 86_400) as f64 / 86_400.0
                + (ts.nanos as f64 / 1_000_000_000.0) / 86_400.0;
            let _ = write!(out, "{day_fraction:.12}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CanTimestamp;
    use embedded_can::StandardId;

    fn frame_at(secs: u64, nanos: u32) -> CanFrame {
        CanFrame::new_data(StandardId::new(0x123).unwrap(), &[0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04])
            .unwrap()
            .with_timestamp(CanTimestamp::new(secs, nanos))
    }

    /// Scenario 6: the formatter's documented exact-string contract.
    #[test]
    fn formats_the_documented_scenario_exactly() {
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Zero,
            time_layout: TimeLayout::Seconds,
            show_usec: false,
            id_base: NumberBase::Hex,
            dlc_base: NumberBase::Decimal,
            data_base: NumberBase::Hex,
            show_ascii: false,
            show_counter: true,
            separator: Separator::Spaces,
            show_eol: false,
            ..Default::default()
        });
        let line = formatter.format(&frame_at(0, 0), 42, 0);
        assert_eq!(
            line,
            "42       0.0000  123  S 8  DE AD BE EF 01 02 03 04"
        );
    }

    #[test]
    fn absolute_timestamp_renders_hhmmss_with_microseconds() {
        let mut formatter = Formatter::new(FormatterConfig::default());
        let line = formatter.format(&frame_at(3_723, 500_000_000), 1, 0);
        assert!(line.contains("01:02:03.500000"));
        assert!(line.contains("123  S 8  DE AD BE EF 01 02 03 04"));
    }

    #[test]
    fn relative_mode_reports_zero_delta_on_first_frame() {
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Relative,
            time_layout: TimeLayout::Seconds,
            ..Default::default()
        });
        let line = formatter.format(&frame_at(10, 0), 1, 0);
        assert!(line.contains("0.000000"));
    }

    #[test]
    fn relative_mode_reports_delta_between_frames() {
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Relative,
            time_layout: TimeLayout::Seconds,
            ..Default::default()
        });
        formatter.format(&frame_at(10, 0), 1, 0);
        let line = formatter.format(&frame_at(12, 500_000_000), 2, 0);
        assert!(line.contains("2.500000"));
    }

    #[test]
    fn data_wraps_at_configured_width() {
        let frame = CanFrame::new_data(StandardId::new(0x1).unwrap(), &[1, 2, 3, 4, 5]).unwrap();
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Zero,
            wraparound: 3,
            ..Default::default()
        });
        let line = formatter.format(&frame, 0, 0);
        assert!(line.contains("01 02 03\n04 05"));
    }

    #[test]
    fn ascii_column_renders_printable_bytes_and_substitute() {
        let frame = CanFrame::new_data(StandardId::new(0x1).unwrap(), b"Hi\x01").unwrap();
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Zero,
            show_ascii: true,
            ..Default::default()
        });
        let line = formatter.format(&frame, 0, 0);
        assert!(line.contains("'Hi.'"));
    }

    #[test]
    fn remote_and_extended_flags_combine_with_dlc() {
        let frame = CanFrame::new_remote(embedded_can::ExtendedId::new(0x1ABCDE).unwrap(), 0).unwrap();
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Zero,
            ..Default::default()
        });
        let line = formatter.format(&frame, 0, 0);
        assert!(line.contains("XR 0"));
    }

    #[test]
    fn decimal_id_width_is_left_justified_and_space_padded() {
        let standard = CanFrame::new_data(StandardId::new(0x123).unwrap(), &[]).unwrap();
        let extended =
            CanFrame::new_data(embedded_can::ExtendedId::new(0x1ABCDE).unwrap(), &[]).unwrap();

        assert_eq!(id_width(&standard, NumberBase::Decimal), 4);
        assert_eq!(id_width(&extended, NumberBase::Decimal), 9);

        assert_eq!(render_number(0x123, NumberBase::Decimal, 4), "291 ");
        assert_eq!(render_number(0x1ABCDE, NumberBase::Decimal, 9), "1751006  ");
    }

    #[test]
    fn decimal_data_byte_is_left_justified_in_a_three_wide_field() {
        assert_eq!(render_number(1, NumberBase::Decimal, byte_width(NumberBase::Decimal)), "1  ");
        assert_eq!(render_number(222, NumberBase::Decimal, byte_width(NumberBase::Decimal)), "222");
    }

    #[test]
    fn formats_with_decimal_id_and_data_base() {
        let frame = CanFrame::new_data(StandardId::new(0x123).unwrap(), &[1, 2]).unwrap();
        let mut formatter = Formatter::new(FormatterConfig {
            timestamp_mode: TimestampMode::Zero,
            id_base: NumberBase::Decimal,
            data_base: NumberBase::Decimal,
            ..Default::default()
        });
        let line = formatter.format(&frame, 0, 0);
        assert!(line.contains("291   S 2  1   2  "));
    }

    #[test]
    fn set_prompt_rejects_strings_over_six_characters() {
        let mut config = FormatterConfig::default();
        assert!(config.set_prompt("toolong!").is_err());
        assert!(config.prompt.is_none());
        assert!(config.set_prompt("rx>").is_ok());
        assert_eq!(config.prompt.as_deref(), Some("rx>"));
    }
}
