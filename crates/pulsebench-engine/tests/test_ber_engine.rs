mod common;

use pulsebench_core::math::{bpsk_awgn_ber, q_function};
use pulsebench_core::ratio::db_to_power;
use pulsebench_core::{BerError, PowerRatio};
use pulsebench_engine::params::DEFAULT_MAX_TAPS;
use pulsebench_engine::pulse::Btrc;
use pulsebench_engine::{
    BerMethod, CciLayout, InterferenceMode, InterferenceSampler, PhaseRealization, PulseKind, PulseShape, compute_ber,
    evaluate_ber,
};
use common::{assert_rel_eq, default_test_params, default_test_shape};

#[test]
fn test_empty_interference_is_awgn() {
    let shape = default_test_shape();
    let sampler = InterferenceSampler::new(&shape);
    let isi = sampler.sample(0.0, 0).unwrap();
    assert!(isi.is_empty());

    for snr_db in [-3.0, 0.0, 4.0, 9.6] {
        let params = default_test_params().with_window(0).unwrap().with_snr(PowerRatio::Db(snr_db)).unwrap();
        let res = compute_ber(&isi, &[], &params).unwrap();
        assert_eq!(res.mode(), InterferenceMode::Awgn);
        assert_rel_eq(res.ber(), bpsk_awgn_ber(db_to_power(snr_db)), 1e-12, "awgn");
    }
}

#[test]
fn test_linear_snr_matches_db() {
    let shape = default_test_shape();
    let params_db = default_test_params().with_tau(0.2).unwrap().with_snr(PowerRatio::Db(10.0)).unwrap();
    let params_lin = params_db.clone().with_snr(PowerRatio::Linear(10.0)).unwrap();
    let a = evaluate_ber(&shape, &params_db).unwrap().ber();
    let b = evaluate_ber(&shape, &params_lin).unwrap().ber();
    assert_rel_eq(a, b, 1e-12, "linear vs dB");
}

#[test]
fn test_monotone_in_snr() {
    for kind in [PulseKind::raised_cosine(0.22).unwrap(), PulseKind::iplcp(0.35).unwrap()] {
        let shape = PulseShape::with_defaults(kind).unwrap();
        let mut previous = f64::INFINITY;
        for snr_db in [-5.0, 0.0, 5.0, 10.0, 15.0, 20.0] {
            let params = default_test_params()
                .with_alpha(shape.alpha())
                .unwrap()
                .with_tau(0.25)
                .unwrap()
                .with_snr(PowerRatio::Db(snr_db))
                .unwrap();
            let ber = evaluate_ber(&shape, &params).unwrap().ber();
            assert!(ber <= previous, "BER rose to {} at {} dB", ber, snr_db);
            previous = ber;
        }
    }
}

#[test]
fn test_symmetric_in_tau() {
    let kinds = [PulseKind::raised_cosine(0.35).unwrap(), PulseKind::Btrc(Btrc::new(0.22, 1.0).unwrap())];
    for kind in kinds {
        let shape = PulseShape::with_defaults(kind).unwrap();
        for tau in [0.05, 0.1, 0.2, 0.25, 0.5] {
            let base = default_test_params().with_alpha(shape.alpha()).unwrap();
            let pos = evaluate_ber(&shape, &base.clone().with_tau(tau).unwrap()).unwrap().ber();
            let neg = evaluate_ber(&shape, &base.with_tau(-tau).unwrap()).unwrap().ber();
            assert_rel_eq(neg, pos, 1e-9, "tau symmetry");
        }
    }
}

#[test]
fn test_non_decreasing_in_tau() {
    let shape = default_test_shape();
    let mut previous = 0.0;
    for tau in [0.0, 0.05, 0.1, 0.2, 0.25, 0.4, 0.5] {
        let ber = evaluate_ber(&shape, &default_test_params().with_tau(tau).unwrap()).unwrap().ber();
        assert!(ber >= previous, "BER fell to {} at tau={}", ber, tau);
        previous = ber;
    }
}

#[test]
fn test_non_decreasing_in_interferers() {
    let shape = default_test_shape();
    let base = default_test_params()
        .with_tau(0.1)
        .unwrap()
        .with_window(3)
        .unwrap()
        .with_sir(PowerRatio::Db(15.0))
        .unwrap()
        .with_cci(CciLayout { tau: 0.2, phases: PhaseRealization::Fixed(vec![0.4, 1.1, 2.0]), freq_offset: 0.0 })
        .unwrap()
        .with_cci_window(1)
        .unwrap();
    let mut previous = 0.0;
    for interferers in 0..=3 {
        let ber = evaluate_ber(&shape, &base.clone().with_interferers(interferers).unwrap()).unwrap().ber();
        assert!(ber >= previous, "BER fell to {} with {} interferers", ber, interferers);
        previous = ber;
    }
}

#[test]
fn test_enumeration_matches_series() {
    let shape = default_test_shape();
    let enumerated = default_test_params()
        .with_tau(0.2)
        .unwrap()
        .with_window(3)
        .unwrap()
        .with_snr(PowerRatio::Db(8.0))
        .unwrap()
        .with_sir(PowerRatio::Db(10.0))
        .unwrap()
        .with_cci(CciLayout { tau: 0.1, phases: PhaseRealization::Fixed(vec![0.3]), freq_offset: 0.02 })
        .unwrap()
        .with_cci_window(1)
        .unwrap()
        .with_interferers(2)
        .unwrap();
    let series = enumerated.clone().with_method(BerMethod::series()).unwrap();

    let a = evaluate_ber(&shape, &enumerated).unwrap();
    let b = evaluate_ber(&shape, &series).unwrap();
    assert_eq!(a.mode(), InterferenceMode::Joint);
    assert_eq!(a.enumerated_taps(), 6 + 2 * 3);
    assert_rel_eq(b.ber(), a.ber(), 1e-6, "series vs enumeration");
}

#[test]
fn test_series_handles_wide_windows() {
    let shape = default_test_shape();
    let params = default_test_params()
        .with_tau(0.25)
        .unwrap()
        .with_window(9)
        .unwrap()
        .with_method(BerMethod::series())
        .unwrap();
    let series = evaluate_ber(&shape, &params).unwrap().ber();
    assert_eq!(evaluate_ber(&shape, &params).unwrap().enumerated_taps(), 18);

    // 18 taps is still within reach of enumeration
    let enumerated = evaluate_ber(&shape, &params.with_method(BerMethod::Enumeration { max_taps: 18 }).unwrap())
        .unwrap()
        .ber();
    assert_rel_eq(series, enumerated, 1e-6, "wide window");
}

#[test]
fn test_resource_limit_above_ceiling() {
    let shape = default_test_shape();
    let params = default_test_params()
        .with_tau(0.1)
        .unwrap()
        .with_window(4)
        .unwrap()
        .with_method(BerMethod::Enumeration { max_taps: 6 })
        .unwrap();
    match evaluate_ber(&shape, &params) {
        Err(BerError::ResourceLimit { taps, limit }) => {
            assert_eq!(taps, 8);
            assert_eq!(limit, 6);
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_truncation_order_never_silently_dropped() {
    let shape = default_test_shape();
    let base = default_test_params().with_tau(0.25).unwrap().with_snr(PowerRatio::Db(8.0)).unwrap();
    assert_eq!(base.clone().with_window(usize::MAX).unwrap_err().kind(), "ResourceLimitError");

    // One step past the default ceiling of 24 taps fails before any sampling
    let params = base.clone().with_window(DEFAULT_MAX_TAPS / 2 + 1).unwrap();
    assert_eq!(
        evaluate_ber(&shape, &params).unwrap_err(),
        BerError::ResourceLimit { taps: DEFAULT_MAX_TAPS + 2, limit: DEFAULT_MAX_TAPS }
    );
    let at_ceiling = base.with_window(DEFAULT_MAX_TAPS / 2).unwrap();
    assert!(at_ceiling.check_tap_budget().is_ok());
    assert_eq!(at_ceiling.interfering_taps(), DEFAULT_MAX_TAPS);
}

#[test]
fn test_numeric_domain_errors() {
    let shape = default_test_shape();
    assert_eq!(
        default_test_params().with_snr(PowerRatio::Db(f64::NAN)).unwrap_err().kind(),
        "NumericDomainError"
    );

    // 40 dB puts the decision distance past the series half-period for omega = 0.1
    let params = default_test_params()
        .with_snr(PowerRatio::Db(40.0))
        .unwrap()
        .with_method(BerMethod::series())
        .unwrap();
    match evaluate_ber(&shape, &params) {
        Err(BerError::NumericDomain { quantity, .. }) => assert_eq!(quantity, "decision_excursion"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_end_to_end_rc_isi() {
    let shape = default_test_shape();
    let mut previous = f64::INFINITY;
    for snr_db in 0..=15 {
        let snr_db = snr_db as f64;
        let params = default_test_params().with_snr(PowerRatio::Db(snr_db)).unwrap();
        let res = evaluate_ber(&shape, &params).unwrap();
        let ber = res.ber();

        assert_eq!(res.mode(), InterferenceMode::IsiOnly);
        assert!(ber < previous, "not strictly decreasing at {} dB", snr_db);
        assert_rel_eq(ber, q_function((2.0 * db_to_power(snr_db)).sqrt()), 1e-9, "Q reference");
        if snr_db == 0.0 {
            assert!(ber > 1e-2);
        }
        if snr_db == 15.0 {
            assert!(ber < 1e-6);
        }
        previous = ber;
    }
}

#[test]
fn test_result_serializes() {
    let shape = default_test_shape();
    let res = evaluate_ber(&shape, &default_test_params().with_tau(0.1).unwrap()).unwrap();
    let json = serde_json::to_value(&res).unwrap();
    assert_eq!(json["mode"], "isi_only");
    assert_eq!(json["params"]["tau"], 0.1);
    assert_eq!(json["params"]["snr"]["db"], 10.0);
    assert_eq!(json["enumerated_taps"], 10);
}
