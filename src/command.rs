//! Line based command interface
//!
//! Commands are newline terminated ASCII lines:
//!
//! * `GET:TYPE`, `GET:FREQ`, `GET:AMP`, `GET:ALL` request an analysis report.
//! * `SET:TYPE:<0|1|2>` selects the DAC waveform (sine, square, triangle).
//! * `SET:FREQ:<hz>` sets the DAC waveform frequency.
//! * `SET:AMP:<mV>` sets the DAC peak-to-peak amplitude.
//!
//! Replies are rendered as text lines or as JSON.
use core::fmt::Write;

use heapless::{String, Vec};
use signal_generator::{Generator, Signal, MAX_AMPLITUDE_MV};

use crate::instrument::{QueryKind, Report};

/// A text reply line.
pub type Reply = String<128>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unknown command")]
    UnknownCommand,
    #[error("Unknown query")]
    UnknownQuery,
    #[error("Unknown parameter")]
    UnknownParameter,
    #[error("Missing value")]
    MissingValue,
    #[error("Invalid value")]
    InvalidValue,
    #[error("Command too long")]
    Overflow,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Setting {
    Signal(Signal),
    /// Waveform frequency in Hz.
    Frequency(u32),
    /// Peak-to-peak amplitude in mV.
    Amplitude(u16),
}

impl Setting {
    /// Apply the setting to the DAC.
    pub fn apply(&self, dac: &mut Generator) -> Result<(), signal_generator::Error> {
        match *self {
            Self::Signal(signal) => dac.set_signal(signal),
            Self::Frequency(frequency) => dac.set_frequency(frequency),
            Self::Amplitude(vpp) => dac.set_amplitude(vpp / 2),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Get(QueryKind),
    Set(Setting),
}

impl core::str::FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Error> {
        let line = line.trim();
        if let Some(query) = line.strip_prefix("GET:") {
            let query = query.parse().map_err(|_| Error::UnknownQuery)?;
            return Ok(Self::Get(query));
        }

        let Some(setting) = line.strip_prefix("SET:") else {
            return Err(Error::UnknownCommand);
        };
        let (parameter, value) =
            setting.split_once(':').ok_or(Error::MissingValue)?;
        if value.is_empty() {
            return Err(Error::MissingValue);
        }

        let setting = match parameter {
            "TYPE" => {
                let code: u8 = value.parse().map_err(|_| Error::InvalidValue)?;
                Setting::Signal(Signal::try_from(code).map_err(|_| Error::InvalidValue)?)
            }
            "FREQ" => match value.parse::<u32>() {
                Ok(frequency) if frequency > 0 => Setting::Frequency(frequency),
                _ => return Err(Error::InvalidValue),
            },
            "AMP" => match value.parse::<u16>() {
                Ok(vpp) if (1..=MAX_AMPLITUDE_MV).contains(&(vpp / 2)) => {
                    Setting::Amplitude(vpp)
                }
                _ => return Err(Error::InvalidValue),
            },
            _ => return Err(Error::UnknownParameter),
        };
        Ok(Self::Set(setting))
    }
}

/// Render a report as the text reply for its query.
pub fn render(report: &Report) -> Result<Reply, core::fmt::Error> {
    let info = &report.info;
    let mut reply = Reply::new();
    match report.query {
        QueryKind::Type => write!(reply, "Waveform type: {}", info.waveform_type)?,
        QueryKind::Frequency => {
            write!(reply, "Frequency: {:.0} Hz", info.frequency)?
        }
        QueryKind::Vpp => write!(reply, "Vpp: {:.0} mV", info.vpp * 1000.0)?,
        QueryKind::All => write!(
            reply,
            "Type: {}, frequency: {:.0} Hz, Vpp: {:.3} V, DAC rate: {} Hz",
            info.waveform_type, info.frequency, info.vpp, report.update_frequency
        )?,
    }
    Ok(reply)
}

/// Render a report as a JSON object.
pub fn render_json<const N: usize>(
    report: &Report,
) -> Result<String<N>, serde_json_core::ser::Error> {
    serde_json_core::to_string(report)
}

/// Render the acknowledgement of an applied setting.
pub fn acknowledge(setting: &Setting) -> Result<Reply, core::fmt::Error> {
    let mut reply = Reply::new();
    match setting {
        Setting::Signal(signal) => write!(reply, "Waveform set to {signal:?}")?,
        Setting::Frequency(hz) => write!(reply, "Frequency set to {hz} Hz")?,
        Setting::Amplitude(mv) => write!(reply, "Amplitude set to {mv} mVpp")?,
    }
    Ok(reply)
}

/// Assembles received bytes into command lines.
pub struct Server {
    data: Vec<u8, 64>,
    discard: bool,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            discard: false,
        }
    }

    /// Feed received bytes.
    ///
    /// # Args
    /// * `bytes` - Received data, possibly containing several or partial lines.
    /// * `f` - Called with the parse result of every complete non-empty line.
    pub fn receive<F>(&mut self, bytes: &[u8], mut f: F)
    where
        F: FnMut(Result<Command, Error>),
    {
        for &byte in bytes {
            if byte != b'\n' {
                if !self.discard && self.data.push(byte).is_err() {
                    self.discard = true;
                    self.data.clear();
                }
                continue;
            }

            if self.discard {
                self.discard = false;
                log::warn!("Discarding overlong command");
                f(Err(Error::Overflow));
            } else {
                match core::str::from_utf8(&self.data) {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => f(line.parse()),
                    Err(_) => f(Err(Error::UnknownCommand)),
                }
            }
            self.data.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{WaveformInfo, WaveformType};
    use signal_generator::{AdcSync, Config};

    #[test]
    fn parse() {
        assert_eq!("GET:ALL".parse::<Command>(), Ok(Command::Get(QueryKind::All)));
        assert_eq!("GET:FREQ\r".parse::<Command>(), Ok(Command::Get(QueryKind::Frequency)));
        assert_eq!(
            "SET:TYPE:2".parse::<Command>(),
            Ok(Command::Set(Setting::Signal(Signal::Triangle)))
        );
        assert_eq!("SET:FREQ:1500".parse::<Command>(), Ok(Command::Set(Setting::Frequency(1500))));
        assert_eq!("SET:AMP:2000".parse::<Command>(), Ok(Command::Set(Setting::Amplitude(2000))));
    }

    #[test]
    fn parse_errors() {
        let parse = |s: &str| s.parse::<Command>();
        assert_eq!(parse("PING"), Err(Error::UnknownCommand));
        assert_eq!(parse("GET:PHASE"), Err(Error::UnknownQuery));
        assert_eq!(parse("SET:GAIN:2"), Err(Error::UnknownParameter));
        assert_eq!(parse("SET:FREQ"), Err(Error::MissingValue));
        assert_eq!(parse("SET:FREQ:"), Err(Error::MissingValue));
        assert_eq!(parse("SET:FREQ:0"), Err(Error::InvalidValue));
        assert_eq!(parse("SET:FREQ:-5"), Err(Error::InvalidValue));
        assert_eq!(parse("SET:TYPE:3"), Err(Error::InvalidValue));
        assert_eq!(parse("SET:AMP:1"), Err(Error::InvalidValue));
        assert_eq!(parse("SET:AMP:3302"), Err(Error::InvalidValue));
        assert_eq!(parse("SET:AMP:3301"), Ok(Command::Set(Setting::Amplitude(3301))));
    }

    #[test]
    fn apply() {
        let mut dac = Generator::new(Config::default(), AdcSync::default()).unwrap();
        Setting::Amplitude(3000).apply(&mut dac).unwrap();
        assert_eq!(dac.config().amplitude, 1500);
        Setting::Frequency(2000).apply(&mut dac).unwrap();
        assert_eq!(dac.update_frequency_hz(), 512_000);
        Setting::Signal(Signal::Square).apply(&mut dac).unwrap();
        assert_eq!(dac.config().signal, Signal::Square);
    }

    #[test]
    fn server_lines() {
        let mut server = Server::new();
        let mut seen = std::vec::Vec::new();
        server.receive(b"GET:TY", |r| seen.push(r));
        assert!(seen.is_empty());
        server.receive(b"PE\n\nSET:FREQ:10\r\nBAD\n", |r| seen.push(r));
        assert_eq!(
            seen,
            [
                Ok(Command::Get(QueryKind::Type)),
                Ok(Command::Set(Setting::Frequency(10))),
                Err(Error::UnknownCommand),
            ]
        );

        seen.clear();
        server.receive(&[b'X'; 100], |r| seen.push(r));
        server.receive(b"\nGET:ALL\n", |r| seen.push(r));
        assert_eq!(seen, [Err(Error::Overflow), Ok(Command::Get(QueryKind::All))]);
    }

    #[test]
    fn replies() {
        let report = Report {
            query: QueryKind::Type,
            generation: 3,
            sample_rate: 256_000.0,
            update_frequency: 256_000,
            info: WaveformInfo {
                waveform_type: WaveformType::Square,
                frequency: 1000.0,
                vpp: 2.0,
                ..Default::default()
            },
        };
        assert_eq!(render(&report).unwrap(), "Waveform type: Square");
        let report = Report {
            query: QueryKind::Frequency,
            ..report
        };
        assert_eq!(render(&report).unwrap(), "Frequency: 1000 Hz");
        let report = Report {
            query: QueryKind::Vpp,
            ..report
        };
        assert_eq!(render(&report).unwrap(), "Vpp: 2000 mV");
        let report = Report {
            query: QueryKind::All,
            ..report
        };
        assert_eq!(
            render(&report).unwrap(),
            "Type: Square, frequency: 1000 Hz, Vpp: 2.000 V, DAC rate: 256000 Hz"
        );

        let json: String<1024> = render_json(&report).unwrap();
        assert!(json.starts_with("{\"query\":\"All\",\"generation\":3,"));
        assert!(json.contains("\"waveform_type\":\"Square\""));

        assert_eq!(acknowledge(&Setting::Signal(Signal::Sine)).unwrap(), "Waveform set to Sine");
        assert_eq!(acknowledge(&Setting::Amplitude(500)).unwrap(), "Amplitude set to 500 mVpp");
    }
}
