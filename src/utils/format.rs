use anyhow::{bail, Context, Result};

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes.max(0.0);
    let mut unit_idx = 0usize;
    while value >= 1024.0 && unit_idx < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit_idx += 1;
    }
    format!("{value:.2} {}", BYTE_UNITS[unit_idx])
}

pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub fn format_eta(eta_secs: Option<u64>) -> String {
    match eta_secs {
        Some(0) => "00:00".to_string(),
        Some(secs) => format_duration(secs),
        None => "--:--".to_string(),
    }
}

pub fn format_commas(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

/// Parses a byte size such as `500000`, `750MB`, `1.5 GB` or `2g`.
///
/// Units are binary (1 KB = 1024 bytes) so that values round-trip with
/// [`format_bytes`].
pub fn parse_byte_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("byte size must not be empty");
    }

    let split_at = trimmed
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '_'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split_at);
    let number = number.replace('_', "");
    let unit = unit.trim().to_ascii_uppercase();

    let multiplier: u64 = match unit.trim_end_matches("IB").trim_end_matches('B') {
        "" => 1,
        "K" => 1 << 10,
        "M" => 1 << 20,
        "G" => 1 << 30,
        "T" => 1 << 40,
        "P" => 1 << 50,
        _ => bail!("unknown byte unit '{unit}' in '{trimmed}'"),
    };

    if number.contains('.') {
        let value: f64 = number
            .parse()
            .with_context(|| format!("invalid byte size '{trimmed}'"))?;
        if !value.is_finite() || value < 0.0 {
            bail!("invalid byte size '{trimmed}'");
        }
        let bytes = value * multiplier as f64;
        if bytes > u64::MAX as f64 {
            bail!("byte size '{trimmed}' is too large");
        }
        return Ok(bytes.round() as u64);
    }

    let value: u64 = number
        .parse()
        .with_context(|| format!("invalid byte size '{trimmed}'"))?;
    value
        .checked_mul(multiplier)
        .with_context(|| format!("byte size '{trimmed}' is too large"))
}
