//! Brake system variants and their names in rolling-stock files.

use std::fmt;

use tb_core::BrakeFamily;

use crate::{BrakeError, BrakeResult};

/// Which brake equipment a car carries.  Selected once at construction; the
/// matching [`BrakeModel`][crate::BrakeModel] strategy is looked up from it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrakeKind {
    /// Automatic air brake, brake pipe only.
    #[default]
    AirSinglePipe,
    /// Automatic air brake plus a main-reservoir pipe (line 2).
    AirTwinPipe,
    /// Electro-pneumatic: twin pipe, cylinder demand on line 4.
    Ep,
    /// Electrically controlled straight air: twin pipe, cylinder fed from
    /// the main-reservoir pipe, demand on line 4.
    Sme,
    /// Automatic vacuum brake with a vacuum reservoir.
    VacuumSinglePipe,
    /// Straight vacuum: cylinder follows the brake pipe directly.
    StraightVacuumSinglePipe,
    /// Unbraked stock with an air brake pipe running through.
    AirPiped,
    /// Unbraked stock with a vacuum brake pipe running through.
    VacuumPiped,
    /// Hand-wound brake (brake vans), with a piped-through air pipe.
    ManualBraking,
}

impl BrakeKind {
    /// Parse a brake system name as written in vehicle files.  Matching is
    /// case-insensitive and ignores `_`, `-` and spaces.
    pub fn from_name(name: &str) -> BrakeResult<BrakeKind> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let kind = match key.as_str() {
            "airsinglepipe" | "air" | "triplevalve" | "distributor" => BrakeKind::AirSinglePipe,
            "airtwinpipe" | "twinpipe"                             => BrakeKind::AirTwinPipe,
            "ep" | "epsinglepipe" | "ecp"                          => BrakeKind::Ep,
            "sme"                                                  => BrakeKind::Sme,
            "vacuumsinglepipe" | "vacuum" | "vacuumtwinpipe"       => BrakeKind::VacuumSinglePipe,
            "straightvacuumsinglepipe" | "straightvacuum"          => BrakeKind::StraightVacuumSinglePipe,
            "airpiped"                                             => BrakeKind::AirPiped,
            "vacuumpiped"                                          => BrakeKind::VacuumPiped,
            "manualbraking" | "handbrake"                          => BrakeKind::ManualBraking,
            _ => return Err(BrakeError::UnknownBrakeSystem(name.to_owned())),
        };
        Ok(kind)
    }

    /// Working medium of the pipe this kind connects to.
    ///
    /// `ManualBraking` defaults to an air pipe; see
    /// [`BrakeParams::pipe_family`][crate::BrakeParams::pipe_family].
    pub fn family(self) -> BrakeFamily {
        match self {
            BrakeKind::VacuumSinglePipe
            | BrakeKind::StraightVacuumSinglePipe
            | BrakeKind::VacuumPiped => BrakeFamily::Vacuum,
            _ => BrakeFamily::Air,
        }
    }

    /// Carries line 2 (main-reservoir pipe).
    pub fn is_twin_pipe(self) -> bool {
        matches!(self, BrakeKind::AirTwinPipe | BrakeKind::Ep | BrakeKind::Sme)
    }

    /// Responds to line 4 demand.
    pub fn is_electric(self) -> bool {
        matches!(self, BrakeKind::Ep | BrakeKind::Sme)
    }

    /// No cylinder driven by the pipe.
    pub fn is_pipe_only(self) -> bool {
        matches!(self, BrakeKind::AirPiped | BrakeKind::VacuumPiped | BrakeKind::ManualBraking)
    }

    pub fn name(self) -> &'static str {
        match self {
            BrakeKind::AirSinglePipe            => "air_single_pipe",
            BrakeKind::AirTwinPipe              => "air_twin_pipe",
            BrakeKind::Ep                       => "ep",
            BrakeKind::Sme                      => "sme",
            BrakeKind::VacuumSinglePipe         => "vacuum_single_pipe",
            BrakeKind::StraightVacuumSinglePipe => "straight_vacuum_single_pipe",
            BrakeKind::AirPiped                 => "air_piped",
            BrakeKind::VacuumPiped              => "vacuum_piped",
            BrakeKind::ManualBraking            => "manual_braking",
        }
    }
}

impl fmt::Display for BrakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
