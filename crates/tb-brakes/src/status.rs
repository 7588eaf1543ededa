//! HUD status strings.

use std::fmt;

/// Ordered key/value pairs describing one car's brakes for the HUD.
///
/// | Key         | Meaning                                  |
/// |-------------|------------------------------------------|
/// | `BC`        | brake cylinder                           |
/// | `BP`        | brake pipe                               |
/// | `AR`        | auxiliary reservoir                      |
/// | `ER`        | emergency reservoir                      |
/// | `CR`        | control reservoir (distributors)         |
/// | `MRP`       | main-reservoir pipe (twin pipe)          |
/// | `VR`        | vacuum reservoir                         |
/// | `EC`        | engine brake cylinder (line 3)           |
/// | `Valve`     | triple valve / distributor state         |
/// | `Holding`   | EP holding valve state                   |
/// | `EP`        | line 4 demand                            |
/// | `Retainer`  | retainer position                        |
/// | `Handbrake` | handbrake percentage                     |
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrakeStatus(pub Vec<(&'static str, String)>);

impl BrakeStatus {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.push((key, value.into()));
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BrakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("  ")?;
            }
            write!(f, "{k} {v}")?;
        }
        Ok(())
    }
}
