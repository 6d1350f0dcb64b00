//! Command line and environment configuration

use clap::Parser;

use crate::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::events::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TOPIC};

/// Largest window edge accepted on the command line
pub const MAX_DIMENSION: u32 = 16384;

#[derive(Debug, Clone, Parser)]
#[command(name = "pyrocast")]
#[command(about = "Stream overlay that bursts chat events into fireworks")]
pub struct Config {
    /// Modules to load, comma separated
    #[arg(long, env = "PYROCAST_MODULES", value_delimiter = ',', default_value = "gg")]
    pub modules: Vec<String>,

    /// MQTT broker host
    #[arg(long, env = "PYROCAST_MQTT_HOST", default_value = DEFAULT_HOST)]
    pub mqtt_host: String,

    /// MQTT broker port
    #[arg(long, env = "PYROCAST_MQTT_PORT", default_value_t = DEFAULT_PORT)]
    pub mqtt_port: u16,

    /// Topic carrying `{ module, data }` envelopes
    #[arg(long, env = "PYROCAST_TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Run without a broker (keyboard and demo triggers only)
    #[arg(long)]
    pub no_mqtt: bool,

    /// Window width
    #[arg(short, long, default_value_t = DEFAULT_WIDTH,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_DIMENSION)))]
    pub width: u32,

    /// Window height
    #[arg(long, default_value_t = DEFAULT_HEIGHT,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_DIMENSION)))]
    pub height: u32,

    /// Window size as WxH, e.g. 1920x1080 (overrides --width/--height)
    #[arg(short, long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Disable VSync for uncapped framerate
    #[arg(long)]
    pub no_vsync: bool,

    /// Canvas clear colour as RRGGBB
    #[arg(long, value_parser = parse_color, default_value = "000000")]
    pub background: (u8, u8, u8),

    /// Seed for particle randomness (clock based when absent)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Launch a firework every --demo-interval milliseconds
    #[arg(long)]
    pub demo: bool,

    #[arg(long, default_value_t = 1500)]
    pub demo_interval: u64,
}

impl Config {
    /// Requested window size in pixels
    pub fn window_size(&self) -> (u32, u32) {
        self.resolution.unwrap_or((self.width, self.height))
    }
}

/// Parse `WxH`
pub fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("invalid width: {}", e))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("invalid height: {}", e))?;
    if w == 0 || h == 0 {
        return Err("resolution must be non-zero".to_string());
    }
    if w > MAX_DIMENSION || h > MAX_DIMENSION {
        return Err(format!("resolution is limited to {0}x{0}", MAX_DIMENSION));
    }
    Ok((w, h))
}

/// Parse `RRGGBB`, with or without a leading '#'
pub fn parse_color(s: &str) -> Result<(u8, u8, u8), String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("expected RRGGBB, got '{}'", s));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("invalid colour '{}': {}", s, e))
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}
