//! Command-line front end: pick a device and line settings from the config
//! file and flags, then show, send, read or probe.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::port::{BaudRate, CharacterSize, FlowControl, LineSettings, OpenMode, Parity, StopBits};
use crate::stream::{SerialStreamBuf, UnbufferedStream};

#[derive(Debug, Parser)]
#[command(
    name = "serial-stream",
    version,
    about = "Configure a serial device and move raw bytes over it"
)]
pub struct Cli {
    /// Config file (default: <config dir>/serial-stream/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Port profile from the config file
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Serial device path, overrides the profile
    #[arg(short, long, global = true)]
    pub device: Option<PathBuf>,

    /// Baud rate in bits per second
    #[arg(short, long, global = true, value_parser = parse_baud)]
    pub baud: Option<BaudRate>,

    /// Data bits per character (5-8)
    #[arg(long, global = true, value_parser = parse_char_size)]
    pub char_size: Option<CharacterSize>,

    /// Parity: none, odd or even
    #[arg(long, global = true)]
    pub parity: Option<Parity>,

    /// Stop bits (1 or 2)
    #[arg(long, global = true, value_parser = parse_stop_bits)]
    pub stop_bits: Option<StopBits>,

    /// Flow control: none, software or hardware
    #[arg(long, global = true)]
    pub flow_control: Option<FlowControl>,

    /// Minimum bytes per read (0-255)
    #[arg(long, global = true)]
    pub vmin: Option<u8>,

    /// Read timeout in deciseconds (0-255)
    #[arg(long, global = true)]
    pub vtime: Option<u8>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the line settings after applying the profile and flags
    Show,
    /// Write data to the device
    Send {
        data: String,
        /// Treat DATA as hex bytes, e.g. "41 42 0d"
        #[arg(long)]
        hex: bool,
    },
    /// Read up to COUNT bytes and print them
    Read {
        #[arg(short = 'n', long, default_value_t = 64)]
        count: usize,
    },
    /// Report whether input is waiting
    Probe,
}

fn parse_baud(s: &str) -> std::result::Result<BaudRate, String> {
    let bits: u32 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    BaudRate::try_from(bits).map_err(|e| e.to_string())
}

fn parse_char_size(s: &str) -> std::result::Result<CharacterSize, String> {
    let bits: u8 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    CharacterSize::try_from(bits).map_err(|e| e.to_string())
}

fn parse_stop_bits(s: &str) -> std::result::Result<StopBits, String> {
    let count: u8 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    StopBits::try_from(count).map_err(|e| e.to_string())
}

impl Cli {
    /// Device and line settings: profile first, flags on top.
    pub fn resolve(&self, config: &Config) -> Result<(PathBuf, LineSettings)> {
        let profile = match &self.profile {
            Some(name) => match config.profile(name) {
                Some(profile) => Some(profile),
                None => bail!("Profile '{}' not found in config", name),
            },
            None => config.default_profile().map(|(_, profile)| profile),
        };

        let device = match (&self.device, profile) {
            (Some(device), _) => device.clone(),
            (None, Some(profile)) => profile.device.clone(),
            (None, None) => bail!("No device given: pass --device or configure a profile"),
        };

        let mut line = profile.map(|p| p.line).unwrap_or_default();
        if let Some(baud) = self.baud {
            line.baud_rate = baud;
        }
        if let Some(size) = self.char_size {
            line.character_size = size;
        }
        if let Some(parity) = self.parity {
            line.parity = parity;
        }
        if let Some(stop_bits) = self.stop_bits {
            line.stop_bits = stop_bits;
        }
        if let Some(flow) = self.flow_control {
            line.flow_control = flow;
        }
        if let Some(vmin) = self.vmin {
            line.vmin = vmin;
        }
        if let Some(vtime) = self.vtime {
            line.vtime = vtime;
        }

        Ok((device, line))
    }

    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        Ok(config)
    }
}

fn open_stream(device: &Path, mode: OpenMode, line: &LineSettings) -> Result<SerialStreamBuf> {
    let mut stream = SerialStreamBuf::new();
    stream.open(device, mode)?;
    stream
        .port_mut()
        .configure(line)
        .with_context(|| format!("Failed to configure {}", device.display()))?;
    tracing::info!(device = %device.display(), %line, "Port ready");
    Ok(stream)
}

pub fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let (device, line) = cli.resolve(&config)?;
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Command::Show => {
            let stream = open_stream(&device, OpenMode::READ, &line)?;
            let port = stream.port();
            let current = port.line_settings()?;
            writeln!(stdout, "device:         {}", device.display())?;
            writeln!(stdout, "baud rate:      {}", current.baud_rate)?;
            writeln!(stdout, "character size: {}", current.character_size)?;
            writeln!(stdout, "parity:         {}", current.parity)?;
            writeln!(stdout, "stop bits:      {}", current.stop_bits)?;
            writeln!(stdout, "flow control:   {}", current.flow_control)?;
            writeln!(stdout, "vmin:           {}", current.vmin)?;
            writeln!(stdout, "vtime:          {}", current.vtime)?;
            writeln!(stdout, "blocking:       {}", port.is_blocking()?)?;
        }
        Command::Send { data, hex } => {
            let bytes = if *hex {
                parse_hex(data)?
            } else {
                data.as_bytes().to_vec()
            };
            let mut stream = open_stream(&device, OpenMode::WRITE, &line)?;
            let written = send_all(&mut stream, &bytes)?;
            writeln!(stdout, "wrote {} bytes", written)?;
        }
        Command::Read { count } => {
            let mut stream = open_stream(&device, OpenMode::READ, &line)?;
            let mut buf = vec![0u8; *count];
            let read = stream.read_bytes(&mut buf)?;
            writeln!(stdout, "{}", buf[..read].escape_ascii())?;
        }
        Command::Probe => {
            let mut stream = open_stream(&device, OpenMode::READ_WRITE, &line)?;
            let ready = stream.bytes_ready()?;
            writeln!(stdout, "bytes ready:    {}", ready)?;
            writeln!(
                stdout,
                "data available: {}",
                stream.port().is_data_available()?
            )?;
        }
    }
    Ok(())
}

/// Keep writing until everything is out or the device takes nothing.
fn send_all(stream: &mut SerialStreamBuf, bytes: &[u8]) -> Result<usize> {
    let mut sent = 0;
    while sent < bytes.len() {
        let written = stream.write_bytes(&bytes[sent..])?;
        if written == 0 {
            bail!("Device accepted only {} of {} bytes", sent, bytes.len());
        }
        sent += written;
    }
    Ok(sent)
}

fn parse_hex(data: &str) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(data.len());
    for c in data.chars().filter(|c| !c.is_whitespace()) {
        if !c.is_ascii_hexdigit() {
            bail!("Invalid hex digit '{}'", c);
        }
        digits.push(c as u8);
    }
    if digits.len() % 2 != 0 {
        bail!("Hex data must have an even number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).context("Hex digits are ASCII")?;
            u8::from_str_radix(text, 16).with_context(|| format!("Invalid hex byte '{}'", text))
        })
        .collect()
}
