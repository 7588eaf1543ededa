//! Unit tests for tb-brakes.

#[cfg(test)]
mod helpers {
    use tb_core::BrakeOptions;
    use tb_core::units::psia_from_vacuum_inhg;

    use crate::{BrakeKind, BrakeParams, BrakeSoundEvent, BrakeSystem, CarContext};

    pub const CAR_LENGTH_M: f32 = 15.0;

    /// Air brake with the pipe at 90 psi, charged and released.
    pub fn charged_air(kind: BrakeKind) -> BrakeSystem {
        charged_air_with(BrakeParams::new(kind))
    }

    pub fn charged_air_with(params: BrakeParams) -> BrakeSystem {
        let mut b = BrakeSystem::new(params, BrakeOptions::default(), CAR_LENGTH_M);
        b.state.line1_psi = 90.0;
        b.initialize(false, 90.0, 64.0, false);
        b
    }

    /// Vacuum brake with the pipe at 21 inHg, charged and released.
    pub fn charged_vacuum(kind: BrakeKind) -> BrakeSystem {
        let mut b = BrakeSystem::with_kind(kind, BrakeOptions::default(), CAR_LENGTH_M);
        let released = psia_from_vacuum_inhg(21.0);
        b.state.line1_psi = released;
        b.initialize(false, released, psia_from_vacuum_inhg(0.0), true);
        b
    }

    /// Set the brake pipe as if it had been there since the last update.
    pub fn set_pipe(b: &mut BrakeSystem, psi: f32) {
        b.state.line1_psi = psi;
        b.state.prev_line1_psi = psi;
    }

    pub fn run(b: &mut BrakeSystem, ctx: &CarContext, secs: f32, dt: f32) -> Vec<BrakeSoundEvent> {
        let steps = (secs / dt).round() as usize;
        let mut events = Vec::new();
        for _ in 0..steps {
            events.extend(b.update(ctx, dt));
        }
        events
    }
}

#[cfg(test)]
mod kind_tests {
    use tb_core::BrakeFamily;

    use crate::{BrakeError, BrakeKind};

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(BrakeKind::from_name("Air_Single_Pipe").unwrap(), BrakeKind::AirSinglePipe);
        assert_eq!(BrakeKind::from_name("air_twin_pipe").unwrap(), BrakeKind::AirTwinPipe);
        assert_eq!(BrakeKind::from_name("EP").unwrap(), BrakeKind::Ep);
        assert_eq!(BrakeKind::from_name("straight_vacuum_single_pipe").unwrap(), BrakeKind::StraightVacuumSinglePipe);
        assert_eq!(BrakeKind::from_name("Vacuum Piped").unwrap(), BrakeKind::VacuumPiped);
        assert_eq!(BrakeKind::from_name("manual_braking").unwrap(), BrakeKind::ManualBraking);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = BrakeKind::from_name("hydraulic").unwrap_err();
        assert!(matches!(err, BrakeError::UnknownBrakeSystem(ref n) if n == "hydraulic"));
    }

    #[test]
    fn display_matches_name_table() {
        for kind in [
            BrakeKind::AirSinglePipe,
            BrakeKind::Sme,
            BrakeKind::VacuumSinglePipe,
            BrakeKind::ManualBraking,
        ] {
            assert_eq!(BrakeKind::from_name(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn families_and_capabilities() {
        assert_eq!(BrakeKind::VacuumPiped.family(), BrakeFamily::Vacuum);
        assert_eq!(BrakeKind::Sme.family(), BrakeFamily::Air);
        assert!(BrakeKind::Ep.is_twin_pipe());
        assert!(!BrakeKind::AirSinglePipe.is_twin_pipe());
        assert!(BrakeKind::Sme.is_electric());
        assert!(BrakeKind::AirPiped.is_pipe_only());
    }
}

#[cfg(test)]
mod reader_tests {
    use crate::{BrakeError, TokenValueReader, ValueReader};

    fn r(s: &str) -> TokenValueReader {
        TokenValueReader::new(s)
    }

    #[test]
    fn pressures_convert_to_psi() {
        assert_eq!(r("64psi").read_pressure_psi().unwrap(), 64.0);
        assert_eq!(r("( 64 )").read_pressure_psi().unwrap(), 64.0);
        assert!((r("5bar").read_pressure_psi().unwrap() - 72.518_87).abs() < 1e-3);
        assert!((r("21inHg").read_pressure_psi().unwrap() - 10.314).abs() < 1e-2);
        assert!((r("100kPa").read_pressure_psi().unwrap() - 14.504).abs() < 1e-2);
    }

    #[test]
    fn rates_volumes_lengths() {
        assert!((r("0.1bar/s").read_rate_psi_per_s().unwrap() - 1.450_377).abs() < 1e-4);
        assert!((r("2ft^3").read_volume_m3().unwrap() - 0.056_634).abs() < 1e-5);
        assert!((r("70l").read_volume_m3().unwrap() - 0.07).abs() < 1e-6);
        assert!((r("10in").read_length_m().unwrap() - 0.254).abs() < 1e-6);
        assert_eq!(r("1e-3").read_f32().unwrap(), 0.001);
        assert_eq!(r("2min").read_time_s().unwrap(), 120.0);
    }

    #[test]
    fn flags_and_strings() {
        assert!(r("1").read_bool().unwrap());
        assert!(!r("( false )").read_bool().unwrap());
        assert_eq!(r("( \"Air_Twin_Pipe\" )").read_string().unwrap(), "Air_Twin_Pipe");
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(r("abc").read_pressure_psi(), Err(BrakeError::BadValue { .. })));
        assert!(matches!(r("5furlongs").read_length_m(), Err(BrakeError::BadUnit { .. })));
        assert!(matches!(r("3psi").read_f32(), Err(BrakeError::BadUnit { .. })));
        assert!(matches!(r("maybe").read_bool(), Err(BrakeError::BadValue { .. })));
    }
}

#[cfg(test)]
mod params_tests {
    use tb_core::BrakeFamily;

    use crate::{BrakeKind, BrakeParams, TokenValueReader, ValveMode};

    fn parse(p: &mut BrakeParams, token: &str, value: &str) -> bool {
        p.parse(token, &mut TokenValueReader::new(value))
    }

    #[test]
    fn recognised_tokens_update_fields() {
        let mut p = BrakeParams::default();
        assert!(parse(&mut p, "wagon(brakecylinderpressureformaxbrakebrakeforce", "50psi"));
        assert!(parse(&mut p, "wagon(triplevalveratio", "2.0"));
        assert!(parse(&mut p, "wagon(maxreleaserate", "2.5psi/s"));
        assert!(parse(&mut p, "wagon(ortsnumberbrakecylinders", "4"));
        assert!(parse(&mut p, "wagon(ortsdistributortype", "distributor"));
        assert!(parse(&mut p, "wagon(ortswheelslidedumpvalve", "1"));
        assert_eq!(p.max_cylinder_psi, 50.0);
        assert_eq!(p.aux_cyl_volume_ratio, 2.0);
        assert_eq!(p.max_release_rate, 2.5);
        assert_eq!(p.num_cylinders, 4);
        assert_eq!(p.valve_mode, ValveMode::Distributor);
        assert!(p.wheel_slide_dump_valve);
        assert!((p.aux_res_volume() - 4.0 * p.cylinder_volume_m3 * 2.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let mut p = BrakeParams::default();
        let before = p.clone();
        assert!(!parse(&mut p, "wagon(mass", "80t"));
        assert_eq!(p, before);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let mut p = BrakeParams::default();
        let before = p.clone();
        assert!(parse(&mut p, "wagon(maxapplicationrate", "fast"));
        assert!(parse(&mut p, "wagon(brakecylinderpressureformaxbrakebrakeforce", "-5psi"));
        assert!(parse(&mut p, "wagon(brakesystemtype", "hydraulic"));
        assert!(parse(&mut p, "wagon(ortsdistributortype", "magic"));
        assert_eq!(p, before);
    }

    #[test]
    fn brake_system_type_switches_family() {
        let mut p = BrakeParams::default();
        assert!(parse(&mut p, "wagon(brakesystemtype", "\"vacuum_single_pipe\""));
        assert_eq!(p.kind, BrakeKind::VacuumSinglePipe);
        assert_eq!(p.pipe_family, BrakeFamily::Vacuum);
    }

    #[test]
    fn pipe_volume_floor_and_override() {
        let mut p = BrakeParams::default();
        let short = p.brake_pipe_volume(0.0);
        let floor = std::f32::consts::PI * 0.032 * 0.032 / 4.0 * 5.0;
        assert!((short - floor).abs() < 1e-7);
        assert!(p.brake_pipe_volume(20.0) > short);
        assert!(parse(&mut p, "wagon(brakepipevolume", "0.5ft^3"));
        assert!((p.brake_pipe_volume(20.0) - 0.014_158).abs() < 1e-5);
    }

    #[test]
    fn emergency_volume_multiplier_scales_aux() {
        let mut p = BrakeParams::default();
        assert!(parse(&mut p, "wagon(emergencyresvolumemultiplier", "2"));
        assert!((p.emerg_res_volume_m3 - 2.0 * p.aux_res_volume()).abs() < 1e-6);
    }
}

#[cfg(test)]
mod valve_tests {
    use crate::valve::{
        ValveInputs, distributor_next, distributor_target, retainer_limits, triple_valve_next,
    };
    use crate::{RetainerSetting, ValveState};

    fn inputs(pipe: f32, aux: f32) -> ValveInputs {
        ValveInputs {
            pipe_psi:       pipe,
            prev_pipe_psi:  pipe,
            aux_psi:        aux,
            control_psi:    90.0,
            cyl_psi:        0.0,
            dt:             0.1,
            deadband_psi:   1.0,
            emergency_rate: 15.0,
            max_cyl_psi:    64.0,
            aux_cyl_ratio:  2.5,
            high_pressure:  false,
        }
    }

    #[test]
    fn triple_valve_transitions() {
        use ValveState::*;
        assert_eq!(triple_valve_next(Release, &inputs(85.0, 90.0)), Apply);
        assert_eq!(triple_valve_next(Release, &inputs(89.5, 90.0)), Release);
        assert_eq!(triple_valve_next(Apply, &inputs(85.0, 85.0)), Lap);
        assert_eq!(triple_valve_next(Lap, &inputs(85.0, 85.5)), Lap);
        assert_eq!(triple_valve_next(Lap, &inputs(80.0, 85.0)), Apply);
        assert_eq!(triple_valve_next(Lap, &inputs(87.0, 85.0)), Release);
    }

    #[test]
    fn fast_drop_selects_emergency() {
        let mut inp = inputs(60.0, 90.0);
        inp.prev_pipe_psi = 90.0;
        assert_eq!(triple_valve_next(ValveState::Release, &inp), ValveState::Emergency);
        assert_eq!(distributor_next(ValveState::Release, &inp), ValveState::Emergency);

        // A service-rate drop is not an emergency.
        inp.prev_pipe_psi = 60.5;
        assert_eq!(triple_valve_next(ValveState::Release, &inp), ValveState::Apply);

        // Emergency holds until the pipe is back above the reservoir.
        let held = inputs(50.0, 60.0);
        assert_eq!(triple_valve_next(ValveState::Emergency, &held), ValveState::Emergency);
        assert_eq!(triple_valve_next(ValveState::Emergency, &inputs(61.0, 60.0)), ValveState::Release);
    }

    #[test]
    fn distributor_follows_control_reservoir() {
        assert_eq!(distributor_target(90.0, 80.0, 2.5, 64.0), 25.0);
        assert_eq!(distributor_target(90.0, 0.0, 2.5, 64.0), 64.0);
        assert_eq!(distributor_target(90.0, 95.0, 2.5, 64.0), 0.0);

        let mut inp = inputs(80.0, 80.0);
        inp.cyl_psi = 10.0;
        assert_eq!(distributor_next(ValveState::Lap, &inp), ValveState::Apply);
        inp.cyl_psi = 25.5;
        assert_eq!(distributor_next(ValveState::Apply, &inp), ValveState::Lap);
        // Partial release: pipe up to 85 lowers the target to 12.5.
        inp.pipe_psi = 85.0;
        inp.prev_pipe_psi = 85.0;
        assert_eq!(distributor_next(ValveState::Lap, &inp), ValveState::Release);
    }

    #[test]
    fn high_pressure_rule_releases_near_control() {
        let mut inp = inputs(88.0, 88.0);
        inp.cyl_psi = 5.0;
        assert_eq!(distributor_next(ValveState::Lap, &inp), ValveState::Lap);
        inp.high_pressure = true;
        assert_eq!(distributor_next(ValveState::Lap, &inp), ValveState::Release);
    }

    #[test]
    fn retainer_positions() {
        assert_eq!(retainer_limits(RetainerSetting::Exhaust, 4, 1.86), (0.0, 1.86));
        assert_eq!(retainer_limits(RetainerSetting::HighPressure, 4, 1.86).0, 20.0);
        assert_eq!(retainer_limits(RetainerSetting::LowPressure, 4, 1.86).0, 10.0);
        // A three-position valve has no low-pressure setting.
        assert_eq!(retainer_limits(RetainerSetting::LowPressure, 3, 1.86).0, 20.0);
        assert_eq!(retainer_limits(RetainerSetting::HighPressure, 0, 1.86), (0.0, 1.86));
        let (thr, rate) = retainer_limits(RetainerSetting::SlowDirect, 4, 1.86);
        assert_eq!(thr, 0.0);
        assert!(rate < 1.0);
    }
}

#[cfg(test)]
mod air_tests {
    use super::helpers::{charged_air, charged_air_with, run, set_pipe};
    use crate::{BrakeKind, BrakeParams, BrakeSystem, CarContext, EpDemand, RetainerSetting, ValveState};

    /// Run with the pipe held at `psi`, as a charged train would hold it.
    fn hold_pipe(b: &mut BrakeSystem, ctx: &CarContext, psi: f32, secs: f32) {
        for _ in 0..(secs / 0.1).round() as usize {
            set_pipe(b, psi);
            b.update(ctx, 0.1);
        }
    }

    #[test]
    fn initialize_at_full_pipe_is_released() {
        let b = charged_air(BrakeKind::AirSinglePipe);
        assert_eq!(b.state.auto_cyl_psi, 0.0);
        assert_eq!(b.state.aux_res_psi, 90.0);
        assert_eq!(b.state.emerg_res_psi, 90.0);
        assert_eq!(b.state.control_res_psi, 90.0);
        assert_eq!(b.state.valve, ValveState::Release);
    }

    #[test]
    fn initialize_at_reduced_pipe_is_applied() {
        let mut b = BrakeSystem::with_kind(BrakeKind::AirSinglePipe, Default::default(), 15.0);
        b.state.line1_psi = 80.0;
        b.initialize(false, 90.0, 64.0, false);
        assert_eq!(b.state.auto_cyl_psi, 25.0);
        assert_eq!(b.state.aux_res_psi, 80.0);
        assert_eq!(b.state.valve, ValveState::Lap);
    }

    #[test]
    fn initialize_tolerates_degenerate_volumes() {
        let mut params = BrakeParams::new(BrakeKind::AirSinglePipe);
        params.cylinder_volume_m3 = 0.0;
        params.aux_cyl_volume_ratio = 0.0;
        let mut b = BrakeSystem::new(params, Default::default(), 0.0);
        b.state.line1_psi = 70.0;
        b.initialize(true, 90.0, 64.0, false);
        run(&mut b, &CarContext::wagon(), 5.0, 0.1);
        assert!(b.state.cyl_psi.is_finite());
        assert!(b.state.aux_res_psi.is_finite());
    }

    #[test]
    fn service_reduction_gives_two_and_a_half_to_one() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        set_pipe(&mut b, 80.0);
        run(&mut b, &CarContext::wagon(), 40.0, 0.1);
        assert_eq!(b.state.valve, ValveState::Lap);
        assert!((b.state.cyl_psi - 25.0).abs() < 0.5, "cyl {}", b.state.cyl_psi);
    }

    #[test]
    fn pipe_rise_releases_and_recharges() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        set_pipe(&mut b, 80.0);
        run(&mut b, &CarContext::wagon(), 40.0, 0.1);
        set_pipe(&mut b, 90.0);
        run(&mut b, &CarContext::wagon(), 20.0, 0.1);
        assert_eq!(b.state.valve, ValveState::Release);
        assert_eq!(b.state.cyl_psi, 0.0);
        assert!(b.state.aux_res_psi > 80.0);
    }

    #[test]
    fn release_is_monotonic_to_zero() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        b.state.auto_cyl_psi = 64.0;
        b.state.aux_res_psi = 60.0;
        b.state.valve = ValveState::Lap;
        set_pipe(&mut b, 70.0);

        let ctx = CarContext::wagon();
        let mut prev = 64.0;
        for _ in 0..400 {
            b.update(&ctx, 0.1);
            let cyl = b.state.cyl_psi;
            if prev > 0.0 {
                assert!(cyl < prev, "cylinder rose or stalled: {prev} -> {cyl}");
            } else {
                assert_eq!(cyl, 0.0);
            }
            prev = cyl;
        }
        assert_eq!(prev, 0.0);
    }

    #[test]
    fn high_pressure_retainer_holds_twenty() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        b.set_retainer(RetainerSetting::HighPressure);
        b.state.auto_cyl_psi = 64.0;
        b.state.aux_res_psi = 60.0;
        b.state.valve = ValveState::Lap;
        set_pipe(&mut b, 70.0);

        let ctx = CarContext::wagon();
        let mut prev = 64.0;
        for _ in 0..500 {
            b.update(&ctx, 0.5);
            let cyl = b.state.cyl_psi;
            if prev > 20.0 {
                assert!(cyl < prev);
            } else {
                assert_eq!(cyl, 20.0);
            }
            prev = cyl;
        }
        assert_eq!(b.state.cyl_psi, 20.0);
        assert_eq!(b.state.retainer, RetainerSetting::HighPressure);
    }

    #[test]
    fn emergency_applies_harder_than_service() {
        let mut service = charged_air(BrakeKind::AirSinglePipe);
        let mut emergency = charged_air(BrakeKind::AirSinglePipe);
        set_pipe(&mut service, 64.0);
        emergency.state.line1_psi = 0.0;

        let ctx = CarContext::wagon();
        for _ in 0..100 {
            service.update(&ctx, 0.1);
            emergency.update(&ctx, 0.1);
            assert!(emergency.state.cyl_psi >= service.state.cyl_psi);
        }
        assert_eq!(emergency.state.valve, ValveState::Emergency);
        run(&mut emergency, &ctx, 20.0, 0.1);
        assert!(emergency.state.cyl_psi > 60.0);
        assert_eq!(emergency.state.line1_psi, 0.0);
        assert_eq!(emergency.state.emergency_timer_s, 0.0);
    }

    #[test]
    fn quick_action_opens_for_its_timer() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        b.state.prev_line1_psi = 90.0;
        b.state.line1_psi = 60.0;
        b.update(&CarContext::wagon(), 0.1);
        assert_eq!(b.state.valve, ValveState::Emergency);
        // The valve only holds the vent open; the train vents the pipe.
        assert_eq!(b.state.line1_psi, 60.0);
        let open = b.params().quick_action_time_s - 0.1;
        assert!((b.state.emergency_timer_s - open).abs() < 1e-5);

        run(&mut b, &CarContext::wagon(), 3.0, 0.1);
        assert_eq!(b.state.emergency_timer_s, 0.0);
    }

    #[test]
    fn bleed_off_drains_everything() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        b.state.auto_cyl_psi = 30.0;
        b.set_bleed_off(true);
        run(&mut b, &CarContext::wagon(), 30.0, 0.1);
        assert_eq!(b.state.aux_res_psi, 0.0);
        assert_eq!(b.state.emerg_res_psi, 0.0);
        assert_eq!(b.state.control_res_psi, 0.0);
        assert_eq!(b.state.cyl_psi, 0.0);
    }

    #[test]
    fn dump_valve_vents_then_locks_out() {
        let mut params = BrakeParams::new(BrakeKind::AirSinglePipe);
        params.wheel_slide_dump_valve = true;
        let mut b = charged_air_with(params);
        b.state.auto_cyl_psi = 50.0;
        b.state.aux_res_psi = 70.0;
        b.state.valve = ValveState::Lap;
        set_pipe(&mut b, 70.0);
        b.set_wheel_slide(true);

        let ctx = CarContext::wagon();
        run(&mut b, &ctx, 2.0, 0.1);
        assert!(b.state.cyl_psi < 25.0);
        assert!(!b.state.dump_valve_locked);

        run(&mut b, &ctx, 6.0, 0.1);
        assert!(b.state.dump_valve_locked);
        assert_eq!(b.state.cyl_psi, 0.0);

        // Locked out: a new application is no longer dumped.
        set_pipe(&mut b, 60.0);
        run(&mut b, &ctx, 1.0, 0.1);
        assert!(b.state.cyl_psi > 0.5);

        b.set_wheel_slide(false);
        b.update(&ctx, 0.1);
        assert!(!b.state.dump_valve_locked);
        assert_eq!(b.state.dump_valve_timer_s, 0.0);
    }

    #[test]
    fn twin_pipe_recharges_faster() {
        let mut single = charged_air(BrakeKind::AirSinglePipe);
        let mut twin = charged_air(BrakeKind::AirTwinPipe);
        for b in [&mut single, &mut twin] {
            b.state.aux_res_psi = 50.0;
            b.state.line2_psi = 130.0;
            set_pipe(b, 90.0);
        }
        let ctx = CarContext::wagon();
        run(&mut single, &ctx, 1.0, 0.1);
        run(&mut twin, &ctx, 1.0, 0.1);
        assert!(twin.state.aux_res_psi > single.state.aux_res_psi + 1.0);
        assert!(twin.state.line2_psi < 130.0);
        assert_eq!(single.state.line2_psi, 130.0);
    }

    #[test]
    fn ep_holding_valve_laps_at_target() {
        let mut b = charged_air(BrakeKind::Ep);
        b.state.line4 = EpDemand::demand(0.5);
        let ctx = CarContext::wagon();
        run(&mut b, &ctx, 6.0, 0.1);
        assert!((b.state.cyl_psi - 32.0).abs() < 0.1, "cyl {}", b.state.cyl_psi);
        assert_eq!(b.state.holding_valve, ValveState::Lap);

        // Held while the demand is unchanged.
        let held = b.state.cyl_psi;
        run(&mut b, &ctx, 3.0, 0.1);
        assert_eq!(b.state.cyl_psi, held);

        b.state.line4 = EpDemand::demand(0.0);
        run(&mut b, &ctx, 20.0, 0.1);
        assert_eq!(b.state.cyl_psi, 0.0);
    }

    #[test]
    fn ep_inactive_falls_back_to_pneumatic() {
        let mut b = charged_air(BrakeKind::Ep);
        b.state.line4 = EpDemand::Inactive;
        set_pipe(&mut b, 80.0);
        run(&mut b, &CarContext::wagon(), 40.0, 0.1);
        assert!((b.state.cyl_psi - 25.0).abs() < 0.5);
        assert_eq!(b.state.holding_valve, ValveState::Release);
    }

    #[test]
    fn sme_feeds_cylinder_from_main_reservoir_pipe() {
        let mut b = charged_air(BrakeKind::Sme);
        b.state.line2_psi = 130.0;
        b.state.line4 = EpDemand::demand(1.0);
        run(&mut b, &CarContext::wagon(), 15.0, 0.1);
        assert!(b.state.cyl_psi > 63.9);
        assert!(b.state.line2_psi < 80.0);
        assert_eq!(b.state.aux_res_psi, 90.0);
    }

    #[test]
    fn demand_is_clamped() {
        assert_eq!(EpDemand::demand(1.7), EpDemand::Demand(1.0));
        assert_eq!(EpDemand::demand(f32::NAN), EpDemand::Demand(0.0));
        assert_eq!(EpDemand::Inactive.fraction(), None);
    }

    #[test]
    fn locomotive_combines_engine_brake() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        b.state.line3_psi = 40.0;
        let loco = CarContext::locomotive();
        b.update(&loco, 0.1);
        assert_eq!(b.state.cyl_psi, 40.0);
        assert!((b.force_fraction(&loco) - 40.0 / 64.0).abs() < 1e-6);

        // A wagon ignores line 3.
        b.update(&CarContext::wagon(), 0.1);
        assert_eq!(b.state.cyl_psi, 0.0);
    }

    #[test]
    fn bail_off_vents_automatic_component() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        b.state.auto_cyl_psi = 30.0;
        b.state.aux_res_psi = 80.0;
        b.state.valve = ValveState::Lap;
        set_pipe(&mut b, 80.0);
        b.set_bail_off(true);
        run(&mut b, &CarContext::locomotive(), 20.0, 0.1);
        assert_eq!(b.state.auto_cyl_psi, 0.0);
        assert_eq!(b.state.cyl_psi, 0.0);
    }

    #[test]
    fn graduated_release_follows_pipe_steps() {
        let mut params = BrakeParams::new(BrakeKind::AirSinglePipe);
        params.valve_mode = crate::ValveMode::Distributor;
        let mut b = charged_air_with(params);
        let ctx = CarContext::wagon();

        hold_pipe(&mut b, &ctx, 80.0, 40.0);
        let applied = b.state.cyl_psi;
        assert!((applied - 25.0).abs() < 1.5, "cyl {applied}");

        // Half the reduction restored: roughly half the cylinder pressure stays.
        hold_pipe(&mut b, &ctx, 85.0, 30.0);
        assert!(b.state.cyl_psi > 10.0 && b.state.cyl_psi < 14.5, "cyl {}", b.state.cyl_psi);
    }
}

#[cfg(test)]
mod vacuum_tests {
    use tb_core::units::{ATM_PSI, psia_from_vacuum_inhg};

    use super::helpers::{charged_vacuum, run, set_pipe};
    use crate::vacuum::straight_vacuum_min_psia;
    use crate::{BrakeKind, BrakeParams, CarContext, ValveState};

    #[test]
    fn charged_vacuum_is_released() {
        let b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        assert_eq!(b.force_fraction(&CarContext::wagon()), 0.0);
        assert_eq!(b.vac_res_pressure_psi(), psia_from_vacuum_inhg(21.0));
        assert_eq!(b.status().get("BP"), Some("21 inHg"));
    }

    #[test]
    fn destroying_vacuum_applies_then_restoring_releases() {
        let mut b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        let ctx = CarContext::wagon();
        set_pipe(&mut b, ATM_PSI);
        b.update(&ctx, 0.1);
        assert_eq!(b.state.valve, ValveState::Apply);
        run(&mut b, &ctx, 10.0, 0.1);
        let f = b.force_fraction(&ctx);
        assert!(f > 0.85 && f < 1.0, "fraction {f}");
        // Reservoir is isolated by the ball valve.
        assert_eq!(b.state.vac_res_psi, psia_from_vacuum_inhg(21.0));
        assert!(b.cylinder_volume_m3() > b.params().total_cylinder_volume());

        set_pipe(&mut b, psia_from_vacuum_inhg(21.0));
        run(&mut b, &ctx, 15.0, 0.1);
        assert_eq!(b.force_fraction(&ctx), 0.0);
    }

    #[test]
    fn adjusted_reservoir_pressure_rises_with_travel() {
        let mut b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        let released = b.vac_res_pressure_psi();
        b.state.auto_cyl_psi = ATM_PSI;
        assert!(b.vac_res_pressure_psi() > released);
    }

    #[test]
    fn pipe_evacuates_reservoir() {
        let mut b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        b.state.vac_res_psi = ATM_PSI;
        let ctx = CarContext::wagon();
        let target = psia_from_vacuum_inhg(21.0);
        let mut prev = ATM_PSI;
        for _ in 0..150 {
            set_pipe(&mut b, target);
            b.update(&ctx, 0.1);
            assert!(b.state.vac_res_psi <= prev);
            assert!(b.state.vac_res_psi >= target - 1e-4);
            prev = b.state.vac_res_psi;
        }
        assert!(prev < target + 1.0);
    }

    #[test]
    fn straight_vacuum_applies_by_evacuating() {
        let mut b = charged_vacuum(BrakeKind::StraightVacuumSinglePipe);
        let ctx = CarContext::wagon();
        set_pipe(&mut b, ATM_PSI);
        run(&mut b, &ctx, 1.0, 0.1);
        assert_eq!(b.force_fraction(&ctx), 0.0);

        let min_psia = straight_vacuum_min_psia(b.params(), 0.0);
        set_pipe(&mut b, min_psia);
        run(&mut b, &ctx, 10.0, 0.1);
        assert!(b.force_fraction(&ctx) > 0.95);

        set_pipe(&mut b, ATM_PSI);
        run(&mut b, &ctx, 15.0, 0.1);
        assert!(b.force_fraction(&ctx) < 0.01);
    }

    #[test]
    fn altitude_reduces_achievable_vacuum() {
        let p = BrakeParams::new(BrakeKind::StraightVacuumSinglePipe);
        let sea = straight_vacuum_min_psia(&p, 0.0);
        assert!((sea - psia_from_vacuum_inhg(21.0)).abs() < 1e-3);
        let atm_high = tb_core::units::atmospheric_psi_at(2_000.0);
        let high = straight_vacuum_min_psia(&p, 2_000.0);
        assert!(atm_high - high < ATM_PSI - sea);
        assert!(high < sea);
    }

    #[test]
    fn steam_brake_on_vacuum_locomotive() {
        let mut b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        b.state.line3_psi = 25.0;
        let loco = CarContext::locomotive();
        b.update(&loco, 0.1);
        assert!((b.force_fraction(&loco) - 0.5).abs() < 1e-6);
        assert_eq!(b.force_fraction(&CarContext::wagon()), 0.0);
    }
}

#[cfg(test)]
mod transfer_tests {
    use super::helpers::run;
    use crate::{BrakeKind, BrakeSystem, CarContext};

    #[test]
    fn piped_stock_only_has_handbrake() {
        let mut b = BrakeSystem::with_kind(BrakeKind::AirPiped, Default::default(), 12.0);
        b.state.line1_psi = 90.0;
        b.initialize(true, 90.0, 64.0, false);
        let ctx = CarContext::wagon();
        assert_eq!(b.force_fraction(&ctx), 0.0);
        assert_eq!(b.brake_force_n(&ctx, 50_000.0, 10_000.0), 10_000.0);
        b.set_handbrake(0.0);
        assert_eq!(b.brake_force_n(&ctx, 50_000.0, 10_000.0), 0.0);

        let c = b.contribution();
        assert_eq!(c.reservoir_volume_m3, 0.0);
        assert_eq!(c.cylinder_volume_m3, 0.0);
        assert_eq!(b.num_cylinders(), 0);
        assert_eq!(b.state.line1_psi, 90.0);
    }

    #[test]
    fn vacuum_piped_uses_vacuum_pipe() {
        let b = BrakeSystem::with_kind(BrakeKind::VacuumPiped, Default::default(), 12.0);
        let air = BrakeSystem::with_kind(BrakeKind::AirPiped, Default::default(), 12.0);
        assert_eq!(b.contribution().family, tb_core::BrakeFamily::Vacuum);
        assert!(b.brake_pipe_volume_m3() > air.brake_pipe_volume_m3());
        assert_eq!(b.state.line1_psi, tb_core::units::ATM_PSI);
    }

    #[test]
    fn manual_brake_winds_on_gradually() {
        let mut b = BrakeSystem::with_kind(BrakeKind::ManualBraking, Default::default(), 10.0);
        b.initialize(false, 90.0, 64.0, true);
        b.set_manual_brake(1.0);
        let ctx = CarContext::wagon();
        run(&mut b, &ctx, 5.0, 0.1);
        assert!((b.force_fraction(&ctx) - 0.5).abs() < 0.01);
        run(&mut b, &ctx, 10.0, 0.1);
        assert_eq!(b.force_fraction(&ctx), 1.0);
        assert_eq!(b.status().get("Manual"), Some("100%"));
    }
}

#[cfg(test)]
mod system_tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use tb_core::{BrakeFamily, BrakeOptions, PressureUnit};

    use super::helpers::{charged_air, charged_vacuum, run, set_pipe};
    use crate::{BrakeKind, BrakeParams, BrakeSystem, CarContext, EpDemand, RetainerSetting};

    #[test]
    fn zero_or_invalid_dt_changes_nothing() {
        let mut b = charged_air(BrakeKind::Ep);
        b.state.line4 = EpDemand::demand(0.3);
        b.state.line1_psi = 70.0;
        let before = b.state.clone();
        for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(b.update(&CarContext::wagon(), dt).is_empty());
            assert_eq!(b.state, before);
        }
    }

    #[test]
    fn snapshot_restore_round_trips_exactly() {
        let mut b = charged_air(BrakeKind::AirTwinPipe);
        b.state.line2_psi = 120.0;
        b.state.line1_psi = 40.0;
        b.set_retainer(RetainerSetting::LowPressure);
        b.set_handbrake(35.0);
        b.set_wheel_slide(true);
        run(&mut b, &CarContext::wagon(), 1.3, 0.1);
        assert!(b.state.emergency_timer_s > 0.0);

        let record = b.snapshot();
        let mut restored = BrakeSystem::with_kind(BrakeKind::AirTwinPipe, BrakeOptions::default(), 15.0);
        restored.restore(&record);
        assert_eq!(restored.state, b.state);
        assert_eq!(restored.snapshot(), record);

        // Both continue identically.
        run(&mut b, &CarContext::wagon(), 1.0, 0.1);
        run(&mut restored, &CarContext::wagon(), 1.0, 0.1);
        assert_eq!(restored.state, b.state);
    }

    #[test]
    fn vacuum_round_trip() {
        let mut b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        set_pipe(&mut b, 10.0);
        run(&mut b, &CarContext::wagon(), 2.0, 0.1);
        let mut restored = BrakeSystem::with_kind(BrakeKind::VacuumSinglePipe, BrakeOptions::default(), 15.0);
        restored.restore(&b.snapshot());
        assert_eq!(restored.state, b.state);
    }

    #[test]
    fn ai_percent_interpolates_service_range() {
        let b = charged_air(BrakeKind::AirSinglePipe);
        assert_eq!(b.ai_set_percent(0.0), 90.0);
        assert_eq!(b.ai_set_percent(50.0), 77.0);
        assert_eq!(b.ai_set_percent(100.0), 64.0);
        assert_eq!(b.ai_set_percent(250.0), 64.0);
        assert_eq!(b.ai_set_percent(f32::NAN), 90.0);
    }

    #[test]
    fn brake_force_takes_larger_of_cylinder_and_handbrake() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        let ctx = CarContext::wagon();
        b.state.cyl_psi = 32.0;
        b.set_handbrake(25.0);
        assert_eq!(b.brake_force_n(&ctx, 100_000.0, 40_000.0), 50_000.0);
        b.set_handbrake(200.0);
        assert_eq!(b.state.handbrake_percent, 100.0);
        assert_eq!(b.brake_force_n(&ctx, 100_000.0, 60_000.0), 60_000.0);
    }

    #[test]
    fn cars_without_handbrake_ignore_it() {
        let mut params = BrakeParams::new(BrakeKind::AirSinglePipe);
        params.handbrake_present = false;
        let mut b = BrakeSystem::new(params, BrakeOptions::default(), 15.0);
        b.set_handbrake(100.0);
        assert_eq!(b.state.handbrake_percent, 0.0);
    }

    #[test]
    fn retainer_ignored_on_vacuum() {
        let mut b = charged_vacuum(BrakeKind::VacuumSinglePipe);
        b.set_retainer(RetainerSetting::HighPressure);
        assert_eq!(b.state.retainer, RetainerSetting::Exhaust);
    }

    #[test]
    fn accessors() {
        let b = charged_air(BrakeKind::AirSinglePipe);
        assert_eq!(b.num_cylinders(), 1);
        assert_eq!(b.cylinder_volume_m3(), b.params().total_cylinder_volume());
        assert_eq!(b.vac_res_volume_m3(), 0.0);
        let v = charged_vacuum(BrakeKind::VacuumSinglePipe);
        assert_eq!(v.vac_res_volume_m3(), v.params().vac_res_volume_m3);
        let c = b.contribution();
        assert!(c.total_volume_m3() > c.pipe_volume_m3);
    }

    #[test]
    fn status_in_configured_unit() {
        let b = charged_air(BrakeKind::Ep);
        let s = b.status();
        assert_eq!(s.get("BC"), Some("0 psi"));
        assert_eq!(s.get("BP"), Some("90 psi"));
        assert_eq!(s.get("Valve"), Some("Release"));
        assert_eq!(s.get("EP"), Some("off"));
        assert!(s.get("ER").is_some());
        assert!(s.get("MRP").is_some());
        assert!(s.get("VR").is_none());

        let options = BrakeOptions { pressure_unit: PressureUnit::Bar, ..BrakeOptions::default() };
        let mut bar = BrakeSystem::with_kind(BrakeKind::AirSinglePipe, options, 15.0);
        bar.state.line1_psi = 72.518_87;
        bar.initialize(false, 72.518_87, 50.0, true);
        assert_eq!(bar.status().get("BP"), Some("5.00 bar"));
        assert!(bar.status().to_string().starts_with("BC 0.00 bar  BP 5.00 bar"));
    }

    #[test]
    fn pressures_stay_in_range_under_random_inputs() {
        let mut rng = SmallRng::seed_from_u64(11);
        let kinds = [
            BrakeKind::AirSinglePipe,
            BrakeKind::AirTwinPipe,
            BrakeKind::Ep,
            BrakeKind::Sme,
            BrakeKind::VacuumSinglePipe,
            BrakeKind::StraightVacuumSinglePipe,
            BrakeKind::ManualBraking,
        ];
        for kind in kinds {
            let mut b = if kind.family() == BrakeFamily::Air {
                charged_air(kind)
            } else {
                charged_vacuum(kind)
            };
            let range = b.family().range();
            for i in 0..2_000 {
                b.state.line1_psi = if i % 97 == 0 { f32::NAN } else { rng.gen_range(-50.0..300.0) };
                b.state.line2_psi = rng.gen_range(-10.0..250.0);
                b.state.line4 = if rng.gen_bool(0.5) { EpDemand::demand(rng.gen_range(-0.5..1.5)) } else { EpDemand::Inactive };
                b.set_wheel_slide(rng.gen_bool(0.1));
                let ctx = if rng.gen_bool(0.5) { CarContext::locomotive() } else { CarContext::wagon() };
                b.update(&ctx, rng.gen_range(0.01..0.5));
                for p in [b.state.line1_psi, b.state.aux_res_psi, b.state.cyl_psi, b.state.vac_res_psi] {
                    assert!(range.contains(p), "{kind}: {p} out of range");
                }
                let f = b.force_fraction(&ctx);
                assert!((0.0..=1.0).contains(&f));
            }
        }
    }
}

#[cfg(test)]
mod sound_tests {
    use tb_core::BrakeOptions;

    use super::helpers::{charged_air, run, set_pipe};
    use crate::{BrakeKind, BrakeSoundEvent, CarContext, SoundTracker};

    #[test]
    fn one_event_per_direction_change() {
        let mut t = SoundTracker::default();
        t.reset(0.0, 90.0);
        let mut events = Vec::new();
        let mut cyl = 0.0;
        for _ in 0..50 {
            cyl += 0.1;
            t.sample(0.1, 0.5, cyl, 90.0, &mut events);
        }
        assert_eq!(events, [BrakeSoundEvent::BrakePressureIncrease]);

        events.clear();
        for _ in 0..20 {
            t.sample(0.1, 0.5, cyl, 90.0, &mut events);
        }
        assert_eq!(events, [BrakeSoundEvent::BrakePressureStoppedChanging]);
    }

    #[test]
    fn checked_at_coarse_interval() {
        let mut t = SoundTracker::default();
        t.reset(0.0, 90.0);
        let mut events = Vec::new();
        t.sample(0.1, 0.5, 5.0, 80.0, &mut events);
        assert!(events.is_empty());
        t.sample(0.45, 0.5, 5.0, 80.0, &mut events);
        assert_eq!(events, [
            BrakeSoundEvent::BrakePressureIncrease,
            BrakeSoundEvent::BrakePipePressureDecrease,
        ]);
    }

    #[test]
    fn service_application_sounds_once() {
        let mut b = charged_air(BrakeKind::AirSinglePipe);
        assert_eq!(b.options().sound_check_interval_s, BrakeOptions::default().sound_check_interval_s);
        set_pipe(&mut b, 80.0);
        let events = run(&mut b, &CarContext::wagon(), 40.0, 0.1);
        let increases = events.iter().filter(|e| **e == BrakeSoundEvent::BrakePressureIncrease).count();
        let stops = events.iter().filter(|e| **e == BrakeSoundEvent::BrakePressureStoppedChanging).count();
        assert_eq!(increases, 1);
        assert_eq!(stops, 1);
    }
}
