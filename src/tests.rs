use crate::bb84::{
    measure, prepare, reconcile, sample_and_compare, Verification, DEFAULT_SAMPLE_FRACTION,
};
use crate::bb84_protocol::{batch, raw_key, run, run_batch, run_with, BatchConfig, SimConfig};
use crate::bb84_states::{ParticleState, SharedIndexSet};
use crate::observer::{LogObserver, NullObserver, Party, ProtocolObserver};
use crate::privacy_amplification::amplify;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        events: Vec<String>,
    }

    impl ProtocolObserver for RecordingObserver {
        fn prepared(&mut self, party: Party, state: &ParticleState) {
            self.events.push(format!("prepared {} {}", party, state.len()));
        }

        fn measured(&mut self, party: Party, state: &ParticleState) {
            self.events.push(format!("measured {} {}", party, state.len()));
        }

        fn reconciled(&mut self, _a: &ParticleState, _b: &ParticleState, shared: &SharedIndexSet) {
            self.events.push(format!("reconciled {}", shared.len()));
        }

        fn verified(&mut self, verification: &Verification) {
            self.events
                .push(format!("verified {}", verification.interference_detected()));
        }

        fn key_established(&mut self, key: &[bool]) {
            self.events.push(format!("key {}", key.len()));
        }
    }

    #[test]
    fn test_self_reconciliation_keeps_every_position() {
        let mut rng = StdRng::seed_from_u64(31);
        for count in [0, 1, 10, 257] {
            let state = prepare(count, &mut rng);
            let shared = reconcile(&state, &state).unwrap();
            assert_eq!(shared.indices(), (0..count).collect::<Vec<_>>().as_slice());
        }
    }

    #[test]
    fn test_sender_and_receiver_agree_on_sifted_key() {
        let mut rng = StdRng::seed_from_u64(44);
        let sender = prepare(500, &mut rng);
        let receiver = measure(&sender, &mut rng);
        let shared = reconcile(&sender, &receiver).unwrap();
        for &i in shared.iter() {
            assert_eq!(sender.get(i), receiver.get(i), "Sifted bit {} differs", i);
        }
    }

    #[test]
    fn test_sifted_fraction_is_about_half() {
        let mut rng = StdRng::seed_from_u64(45);
        let sender = prepare(10_000, &mut rng);
        let receiver = measure(&sender, &mut rng);
        let shared = reconcile(&sender, &receiver).unwrap();
        let fraction = shared.len() as f64 / sender.len() as f64;
        assert!(
            (fraction - 0.5).abs() < 0.03,
            "Sifted fraction should be near 0.5, got {}",
            fraction
        );
    }

    #[test]
    fn test_intercept_resend_error_rate_is_about_a_quarter() {
        let mut rng = StdRng::seed_from_u64(46);
        let sender = prepare(20_000, &mut rng);
        let intercepted = measure(&sender, &mut rng);
        let receiver = measure(&intercepted, &mut rng);
        let shared = reconcile(&sender, &receiver).unwrap();
        let verification = sample_and_compare(&shared, &sender, &receiver, 1.0, &mut rng).unwrap();
        let qber = verification.error_rate();
        assert!(
            (qber - 0.25).abs() < 0.03,
            "Intercept-resend QBER should be near 25%, got {:.3}",
            qber
        );
    }

    #[test]
    fn test_eavesdropping_detected_more_often_than_clean_channel() {
        let runs = 40;
        let with_eve = batch(runs, &[100], true).unwrap()[0];
        let without_eve = batch(runs, &[100], false).unwrap()[0];
        assert!(
            with_eve > without_eve,
            "Eavesdropping failure rate {} should exceed clean rate {}",
            with_eve,
            without_eve
        );
    }

    #[test]
    fn test_detection_grows_with_particle_count() {
        let config = BatchConfig {
            run_count: 60,
            particle_counts: vec![3, 100],
            seed: Some(5),
            ..BatchConfig::default()
        };
        let rates: Vec<f64> = run_batch(&config)
            .unwrap()
            .iter()
            .map(|point| point.failure_rate)
            .collect();
        assert!(rates[1] >= 0.9, "100 particles should expose Eve, got {}", rates[1]);
        assert!(
            rates[0] < rates[1],
            "3 particles ({}) should be flagged less often than 100 ({})",
            rates[0],
            rates[1]
        );
    }

    #[test]
    fn test_clean_channel_large_runs_pass() {
        let rates = batch(30, &[200, 400], false).unwrap();
        assert_eq!(rates, vec![0.0, 0.0]);
    }

    #[test]
    fn test_insufficient_key_is_detection() {
        assert_eq!(batch(25, &[1], false).unwrap(), vec![1.0]);
        assert!(run(1, true, DEFAULT_SAMPLE_FRACTION).unwrap());
    }

    #[test]
    fn test_amplified_keys_agree_on_clean_channel() {
        let mut rng = StdRng::seed_from_u64(61);
        let sender = prepare(300, &mut rng);
        let receiver = measure(&sender, &mut rng);
        let shared = reconcile(&sender, &receiver).unwrap();
        let verification =
            sample_and_compare(&shared, &sender, &receiver, DEFAULT_SAMPLE_FRACTION, &mut rng)
                .unwrap();
        assert!(!verification.interference_detected());

        let sender_raw = raw_key(&shared, &verification, &sender);
        let receiver_raw = raw_key(&shared, &verification, &receiver);
        assert_eq!(sender_raw.len(), shared.len() - verification.sample_size());
        assert!(!sender_raw.is_empty());

        let output_len = sender_raw.len() / 2;
        let sender_key = amplify(&sender_raw, output_len, &mut StdRng::seed_from_u64(9)).unwrap();
        let receiver_key =
            amplify(&receiver_raw, output_len, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(sender_key.len(), output_len);
        assert_eq!(sender_key, receiver_key);
    }

    #[test]
    fn test_default_config_key_is_not_amplified() {
        let mut recorder = RecordingObserver::default();
        let outcome = run_with(
            &SimConfig::new(500, false),
            &mut StdRng::seed_from_u64(23),
            &mut recorder,
        )
        .unwrap();
        let raw_len = outcome.sifted_len - outcome.sample_size();
        assert_eq!(outcome.key.as_ref().map(Vec::len), Some(raw_len));
        assert_eq!(recorder.events.last(), Some(&format!("key {}", raw_len)));
    }

    #[test]
    fn test_observer_does_not_change_outcome() {
        let config = SimConfig::new(150, true);
        let silent = run_with(&config, &mut StdRng::seed_from_u64(77), &mut NullObserver).unwrap();
        let logged = run_with(&config, &mut StdRng::seed_from_u64(77), &mut LogObserver).unwrap();
        let mut recorder = RecordingObserver::default();
        let recorded = run_with(&config, &mut StdRng::seed_from_u64(77), &mut recorder).unwrap();
        assert_eq!(silent, logged);
        assert_eq!(silent, recorded);
    }

    #[test]
    fn test_observer_sees_stages_in_order() {
        let mut recorder = RecordingObserver::default();
        let outcome = run_with(
            &SimConfig::new(200, false),
            &mut StdRng::seed_from_u64(3),
            &mut recorder,
        )
        .unwrap();

        let key_len = outcome.key.as_ref().map(Vec::len).unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "prepared Alice 200".to_string(),
                "measured Bob 200".to_string(),
                format!("reconciled {}", outcome.sifted_len),
                "verified false".to_string(),
                format!("key {}", key_len),
            ]
        );
    }

    #[test]
    fn test_eavesdropper_is_reported_before_receiver() {
        let mut recorder = RecordingObserver::default();
        run_with(
            &SimConfig::new(8, true),
            &mut StdRng::seed_from_u64(12),
            &mut recorder,
        )
        .unwrap();
        assert_eq!(recorder.events[1], "measured Eve 8");
        assert_eq!(recorder.events[2], "measured Bob 8");
    }

    #[test]
    fn test_observer_as_trait_object() {
        let mut observer: Box<dyn ProtocolObserver> = Box::new(NullObserver);
        let outcome = run_with(
            &SimConfig::new(20, false),
            &mut StdRng::seed_from_u64(1),
            observer.as_mut(),
        );
        assert!(outcome.is_ok());
    }
}
