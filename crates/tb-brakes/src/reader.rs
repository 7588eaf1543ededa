//! Value readers handed to `parse` callbacks during vehicle loading.
//!
//! The vehicle-file tokenizer lives outside this crate.  When it meets a key
//! a brake component may care about it calls `parse(token, reader)`; the
//! component pulls the value it expects through the [`ValueReader`] trait so
//! unit handling stays in one place.
//!
//! [`TokenValueReader`] is the implementation used by the rest of the
//! workspace and by tests: it reads a single value with an optional unit
//! suffix, e.g. `"64psi"`, `"( 3.5bar )"`, `"0.07m^3"`, `"21inHg"`.

use tb_core::units::{M3_PER_FT3, M3_PER_LITRE, M_PER_INCH, PSI_PER_BAR, PSI_PER_INHG, PSI_PER_KPA};

use crate::{BrakeError, BrakeResult};

/// Source of typed values for [`BrakeParams::parse`][crate::BrakeParams::parse].
pub trait ValueReader {
    /// A pressure or pressure difference, returned in psi.
    fn read_pressure_psi(&mut self) -> BrakeResult<f32>;

    /// A pressure rate, returned in psi per second.
    fn read_rate_psi_per_s(&mut self) -> BrakeResult<f32>;

    /// A volume, returned in cubic metres.
    fn read_volume_m3(&mut self) -> BrakeResult<f32>;

    /// A length, returned in metres.
    fn read_length_m(&mut self) -> BrakeResult<f32>;

    /// A time, returned in seconds.
    fn read_time_s(&mut self) -> BrakeResult<f32>;

    /// A dimensionless number.
    fn read_f32(&mut self) -> BrakeResult<f32>;

    /// `0`/`1`, `true`/`false`, `yes`/`no`.
    fn read_bool(&mut self) -> BrakeResult<bool>;

    /// Raw text with surrounding brackets and whitespace removed.
    fn read_string(&mut self) -> BrakeResult<String>;
}

// ── TokenValueReader ──────────────────────────────────────────────────────────

/// Reads one value from a text fragment.
pub struct TokenValueReader {
    text: String,
}

impl TokenValueReader {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn body(&self) -> &str {
        self.text
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim()
    }

    /// Split `"3.5bar/s"` into `(3.5, "bar/s")`, lower-casing the unit.
    fn number_and_unit(&self, what: &'static str) -> BrakeResult<(f32, String)> {
        let body = self.body();
        let split = body
            .char_indices()
            .find(|&(i, c)| {
                !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && starts_number(body, i))
                    || ((c == 'e' || c == 'E') && looks_like_exponent(body, i)))
            })
            .map(|(i, _)| i)
            .unwrap_or(body.len());
        let (num, unit) = body.split_at(split);
        let value: f32 = num.trim().parse().map_err(|_| BrakeError::BadValue {
            what,
            text: self.text.clone(),
        })?;
        if !value.is_finite() {
            return Err(BrakeError::BadValue { what, text: self.text.clone() });
        }
        Ok((value, unit.trim().to_ascii_lowercase()))
    }
}

/// `e` at `i` starts an exponent only if digits precede it and a digit or
/// sign follows.
fn looks_like_exponent(body: &str, i: usize) -> bool {
    let bytes = body.as_bytes();
    i > 0
        && bytes[i - 1].is_ascii_digit()
        && bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_digit() || *b == b'-' || *b == b'+')
}

/// A sign is part of the number at the start or right after an exponent.
fn starts_number(body: &str, i: usize) -> bool {
    i == 0 || (matches!(body.as_bytes()[i - 1], b'e' | b'E') && looks_like_exponent(body, i - 1))
}

fn bad_unit(what: &'static str, unit: &str) -> BrakeError {
    BrakeError::BadUnit { what, unit: unit.to_owned() }
}

impl ValueReader for TokenValueReader {
    fn read_pressure_psi(&mut self) -> BrakeResult<f32> {
        let (v, unit) = self.number_and_unit("pressure")?;
        match unit.as_str() {
            "" | "psi"     => Ok(v),
            "bar"          => Ok(v * PSI_PER_BAR),
            "kpa"          => Ok(v * PSI_PER_KPA),
            "inhg"         => Ok(v * PSI_PER_INHG),
            other          => Err(bad_unit("pressure", other)),
        }
    }

    fn read_rate_psi_per_s(&mut self) -> BrakeResult<f32> {
        let (v, unit) = self.number_and_unit("pressure rate")?;
        match unit.as_str() {
            "" | "psi/s"   => Ok(v),
            "bar/s"        => Ok(v * PSI_PER_BAR),
            "kpa/s"        => Ok(v * PSI_PER_KPA),
            "inhg/s"       => Ok(v * PSI_PER_INHG),
            "psi/min"      => Ok(v / 60.0),
            other          => Err(bad_unit("pressure rate", other)),
        }
    }

    fn read_volume_m3(&mut self) -> BrakeResult<f32> {
        let (v, unit) = self.number_and_unit("volume")?;
        match unit.as_str() {
            "" | "m^3" | "m3" => Ok(v),
            "ft^3" | "ft3"    => Ok(v * M3_PER_FT3),
            "l" | "litre"     => Ok(v * M3_PER_LITRE),
            other             => Err(bad_unit("volume", other)),
        }
    }

    fn read_length_m(&mut self) -> BrakeResult<f32> {
        let (v, unit) = self.number_and_unit("length")?;
        match unit.as_str() {
            "" | "m"    => Ok(v),
            "in"        => Ok(v * M_PER_INCH),
            "ft"        => Ok(v * 12.0 * M_PER_INCH),
            "mm"        => Ok(v * 0.001),
            other       => Err(bad_unit("length", other)),
        }
    }

    fn read_time_s(&mut self) -> BrakeResult<f32> {
        let (v, unit) = self.number_and_unit("time")?;
        match unit.as_str() {
            "" | "s"    => Ok(v),
            "min"       => Ok(v * 60.0),
            other       => Err(bad_unit("time", other)),
        }
    }

    fn read_f32(&mut self) -> BrakeResult<f32> {
        let (v, unit) = self.number_and_unit("number")?;
        if unit.is_empty() { Ok(v) } else { Err(bad_unit("number", &unit)) }
    }

    fn read_bool(&mut self) -> BrakeResult<bool> {
        match self.body().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes"  => Ok(true),
            "0" | "false" | "no"  => Ok(false),
            _ => Err(BrakeError::BadValue { what: "flag", text: self.text.clone() }),
        }
    }

    fn read_string(&mut self) -> BrakeResult<String> {
        Ok(self.body().trim_matches('"').to_owned())
    }
}
